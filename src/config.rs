use crate::encoding::Encoding;

/// Options applied to a single parse or render call; nothing here is
/// mutated by the library.
#[derive(Debug, Clone)]
pub struct Config {
    // written when force_default_version is set, and for v2.2 tags,
    // which always upgrade
    pub default_version: u8,
    pub force_default_version: bool,
    // encoding used for frames created by this library
    pub default_encoding: Encoding,
    // iTunes needs this set to eng
    pub default_language: [u8; 3],
    // consumed by genre-aware frame types, not by the structural codec
    pub use_numeric_genres: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            default_version: 4,
            force_default_version: false,
            default_encoding: Encoding::Utf8,
            default_language: *b"eng",
            use_numeric_genres: true,
        }
    }
}

impl Config {
    // this library never writes v2.2, so renders of v2.2 tags upgrade
    pub(crate) fn render_version(&self, header_version: u8) -> u8 {
        let version = if self.force_default_version || header_version < 3 {
            self.default_version
        } else {
            header_version
        };
        if version < 3 {
            3
        } else {
            version
        }
    }
}
