extern crate regex;
use self::regex::Regex;

// legacy TDAT/TIME payloads are DDMM/HHMM fields; anything else gets dropped
pub fn is_four_digits(input: &str) -> bool {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"^[0-9]{4}$").unwrap();
    }
    RE.is_match(input)
}
