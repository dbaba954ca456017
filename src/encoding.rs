extern crate encoding;
use self::encoding::{DecoderTrap, EncoderTrap, Encoding as _};

// text encoding as carried in a frame's encoding byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Latin1,
    Utf16,
    Utf16Be,
    Utf8,
}

impl Encoding {
    pub fn from_byte(b: u8) -> Encoding {
        match b {
            0x00 => Encoding::Latin1,
            0x01 => Encoding::Utf16,
            0x02 => Encoding::Utf16Be,
            _ => Encoding::Utf8,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Encoding::Latin1 => 0x00,
            Encoding::Utf16 => 0x01,
            Encoding::Utf16Be => 0x02,
            Encoding::Utf8 => 0x03,
        }
    }

    pub fn terminator_len(self) -> usize {
        match self {
            Encoding::Latin1 | Encoding::Utf8 => 1,
            Encoding::Utf16 | Encoding::Utf16Be => 2,
        }
    }
}

pub fn decode_string(input: &[u8], enc: Encoding) -> String {
    match enc {
        Encoding::Latin1 => decode_iso_8859_1(input),
        Encoding::Utf16 => decode_utf16(input),
        Encoding::Utf16Be => decode_utf16_be(input),
        Encoding::Utf8 => decode_utf8(input),
    }
}

pub fn encode_string(input: &str, enc: Encoding) -> Vec<u8> {
    match enc {
        Encoding::Latin1 => {
            use self::encoding::all::ISO_8859_1;
            ISO_8859_1
                .encode(input, EncoderTrap::Replace)
                .unwrap_or_default()
        }
        Encoding::Utf16 => {
            use self::encoding::all::UTF_16LE;
            let mut vec = vec![0xFF, 0xFE];
            vec.append(
                &mut UTF_16LE
                    .encode(input, EncoderTrap::Replace)
                    .unwrap_or_default(),
            );
            vec
        }
        Encoding::Utf16Be => {
            use self::encoding::all::UTF_16BE;
            UTF_16BE
                .encode(input, EncoderTrap::Replace)
                .unwrap_or_default()
        }
        Encoding::Utf8 => input.as_bytes().to_vec(),
    }
}

fn decode_iso_8859_1(input: &[u8]) -> String {
    use self::encoding::all::ISO_8859_1;
    ISO_8859_1
        .decode(input, DecoderTrap::Replace)
        .unwrap_or_default()
        .trim_end_matches('\0')
        .to_string()
}

fn decode_utf8(input: &[u8]) -> String {
    use self::encoding::all::UTF_8;
    UTF_8
        .decode(input, DecoderTrap::Replace)
        .unwrap_or_default()
        .trim_end_matches('\0')
        .to_string()
}

fn decode_utf16(input: &[u8]) -> String {
    use self::encoding::all::{UTF_16BE, UTF_16LE};
    if input.len() < 2 {
        return "".to_string();
    }
    match &input[0..2] {
        [0xFF, 0xFE] => UTF_16LE.decode(&input[2..], DecoderTrap::Replace),
        [0xFE, 0xFF] => UTF_16BE.decode(&input[2..], DecoderTrap::Replace),
        // in case of no BOM, assume big endian
        _ => UTF_16BE.decode(input, DecoderTrap::Replace),
    }
    .unwrap_or_default()
    .trim_end_matches('\0')
    .to_string()
}

fn decode_utf16_be(input: &[u8]) -> String {
    use self::encoding::all::UTF_16BE;
    UTF_16BE
        .decode(input, DecoderTrap::Replace)
        .unwrap_or_default()
        .trim_end_matches('\0')
        .to_string()
}
