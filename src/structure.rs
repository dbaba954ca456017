use crate::tools::{
    decode_int_be_u32, decode_synch_int, encode_synch_int, format_error,
};
use crate::Error;

pub const HEADER_SIZE: u32 = 10;
pub const FOOTER_SIZE: u32 = 10;

/// The fixed 10-byte structure at the front of every ID3v2 tag.
/// `tag_size` excludes the header itself and any footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    major_version: u8,
    revision_number: u8,
    unsynchronized: bool,
    extended_header: bool,
    experimental: bool,
    footer_present: bool,
    tag_size: u32,
}

impl Default for Header {
    fn default() -> Header {
        Header {
            major_version: 4,
            revision_number: 0,
            unsynchronized: false,
            extended_header: false,
            experimental: false,
            footer_present: false,
            tag_size: 0,
        }
    }
}

// flag bits that must be zero for each major version
fn illegal_flag_mask(major_version: u8) -> u8 {
    match major_version {
        2 => 0x7F,
        3 => 0x0F,
        _ => 0x07,
    }
}

fn parse_fields(data: &[u8], ident: &[u8; 3]) -> Result<Header, Error> {
    if data.len() < HEADER_SIZE as usize {
        return Err(format_error("ID3v2 tag header is shorter than 10 bytes"));
    }
    if &data[0..3] != ident {
        return Err(format_error("ID3v2 tag header identifier not found"));
    }

    let major_version = data[3];
    if major_version < 2 || major_version > 4 {
        return Err(Error::FormatError(format!(
            "ID3v2.{} is not supported",
            major_version
        )));
    }
    let revision_number = data[4];
    if revision_number == 0xFF {
        return Err(format_error("Invalid ID3v2 revision number"));
    }

    let flags = data[5];
    if flags & illegal_flag_mask(major_version) != 0 {
        return Err(Error::FormatError(format!(
            "Flags {:#04X} are not valid for ID3v2.{}",
            flags, major_version
        )));
    }

    let tag_size = decode_synch_int(&data[6..10])?;

    Ok(Header {
        major_version,
        revision_number,
        unsynchronized: flags & 0b1000_0000 != 0,
        extended_header: major_version >= 3 && flags & 0b0100_0000 != 0,
        experimental: major_version >= 3 && flags & 0b0010_0000 != 0,
        // the footer bit only exists in v2.4
        footer_present: major_version == 4 && flags & 0b0001_0000 != 0,
        tag_size,
    })
}

impl Header {
    pub fn parse(data: &[u8]) -> Result<Header, Error> {
        parse_fields(data, b"ID3")
    }

    pub fn render(&self) -> Vec<u8> {
        self.render_as(b"ID3")
    }

    fn render_as(&self, ident: &[u8; 3]) -> Vec<u8> {
        let mut vec = Vec::with_capacity(HEADER_SIZE as usize);
        vec.extend_from_slice(ident);
        vec.push(self.major_version);
        vec.push(self.revision_number);
        let mut flags = 0u8;
        if self.unsynchronized {
            flags |= 0b1000_0000;
        }
        if self.extended_header {
            flags |= 0b0100_0000;
        }
        if self.experimental {
            flags |= 0b0010_0000;
        }
        if self.footer_present {
            flags |= 0b0001_0000;
        }
        vec.push(flags);
        vec.extend_from_slice(&encode_synch_int(self.tag_size));
        vec
    }

    pub fn major_version(&self) -> u8 {
        self.major_version
    }

    pub fn revision_number(&self) -> u8 {
        self.revision_number
    }

    pub fn tag_size(&self) -> u32 {
        self.tag_size
    }

    pub fn is_unsynchronized(&self) -> bool {
        self.unsynchronized
    }

    pub fn has_extended_header(&self) -> bool {
        self.extended_header
    }

    pub fn is_experimental(&self) -> bool {
        self.experimental
    }

    pub fn has_footer(&self) -> bool {
        self.footer_present
    }

    pub fn set_major_version(&mut self, version: u8) -> Result<(), Error> {
        if version < 2 || version > 4 {
            return Err(Error::RangeError(format!(
                "ID3v2.{} is not a supported version",
                version
            )));
        }
        if version < 3 && (self.extended_header || self.experimental) {
            return Err(Error::RangeError(format!(
                "ID3v2.{} cannot carry an extended header or the experimental flag",
                version
            )));
        }
        if version < 4 && self.footer_present {
            return Err(Error::RangeError(format!(
                "ID3v2.{} cannot carry a footer",
                version
            )));
        }
        self.major_version = version;
        Ok(())
    }

    pub fn set_revision_number(&mut self, revision: u8) -> Result<(), Error> {
        if revision == 0xFF {
            return Err(Error::RangeError(
                "0xFF is not a valid revision number".to_string(),
            ));
        }
        self.revision_number = revision;
        Ok(())
    }

    pub fn set_unsynchronized(&mut self, on: bool) {
        self.unsynchronized = on;
    }

    pub fn set_extended_header(&mut self, on: bool) -> Result<(), Error> {
        if on && self.major_version < 3 {
            return Err(Error::RangeError(
                "Extended headers require ID3v2.3 or newer".to_string(),
            ));
        }
        self.extended_header = on;
        Ok(())
    }

    pub fn set_experimental(&mut self, on: bool) -> Result<(), Error> {
        if on && self.major_version < 3 {
            return Err(Error::RangeError(
                "The experimental flag requires ID3v2.3 or newer".to_string(),
            ));
        }
        self.experimental = on;
        Ok(())
    }

    pub fn set_footer_present(&mut self, on: bool) -> Result<(), Error> {
        if on && self.major_version < 4 {
            return Err(Error::RangeError(
                "Footers require ID3v2.4".to_string(),
            ));
        }
        self.footer_present = on;
        Ok(())
    }

    pub fn set_tag_size(&mut self, size: u32) -> Result<(), Error> {
        // 28 bits is all a synch-safe size field can hold
        if size >= 1 << 28 {
            return Err(Error::RangeError(format!(
                "Tag size {} does not fit in a synch-safe integer",
                size
            )));
        }
        self.tag_size = size;
        Ok(())
    }
}

// the footer is essentially the header again, identified by "3DI"; only
// v2.4 defines it, and it lets a reader find a tag from the end of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    header: Header,
}

impl Footer {
    pub fn parse(data: &[u8]) -> Result<Footer, Error> {
        let header = parse_fields(data, b"3DI")?;
        if header.major_version() != 4 {
            return Err(Error::FormatError(format!(
                "ID3v2.{} does not define a footer",
                header.major_version()
            )));
        }
        Ok(Footer { header })
    }

    pub fn from_header(header: &Header) -> Footer {
        Footer {
            header: header.clone(),
        }
    }

    pub fn render(&self) -> Vec<u8> {
        self.header.render_as(b"3DI")
    }

    pub fn major_version(&self) -> u8 {
        self.header.major_version()
    }

    pub fn set_major_version(&mut self, version: u8) -> Result<(), Error> {
        if version != 4 {
            return Err(Error::RangeError(format!(
                "ID3v2.{} does not define a footer",
                version
            )));
        }
        self.header.set_major_version(version)
    }

    pub fn revision_number(&self) -> u8 {
        self.header.revision_number()
    }

    pub fn tag_size(&self) -> u32 {
        self.header.tag_size()
    }

    pub fn is_unsynchronized(&self) -> bool {
        self.header.is_unsynchronized()
    }

    pub fn has_extended_header(&self) -> bool {
        self.header.has_extended_header()
    }

    // frame data plus both fixed structures
    pub fn complete_tag_size(&self) -> u32 {
        self.header.tag_size() + HEADER_SIZE + FOOTER_SIZE
    }
}

/// Optional structure between the header and the frame data. Only `size`
/// matters for offset accounting; the decoded sub-fields are kept for
/// callers that want them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedHeader {
    size: u32,
    tag_is_update: bool,
    crc32: Option<u32>,
    restrictions: Option<u8>,
}

impl ExtendedHeader {
    pub fn parse(data: &[u8], major_version: u8) -> Result<ExtendedHeader, Error> {
        match major_version {
            3 => ExtendedHeader::parse_v3(data),
            4 => ExtendedHeader::parse_v4(data),
            _ => Err(Error::FormatError(format!(
                "ID3v2.{} does not define an extended header",
                major_version
            ))),
        }
    }

    // v2.3: size(4, plain int, excludes itself) flags(2) padding(4) [crc(4)]
    fn parse_v3(data: &[u8]) -> Result<ExtendedHeader, Error> {
        if data.len() < 10 {
            return Err(format_error("Extended header is truncated"));
        }
        let declared = decode_int_be_u32(&data[0..4]);
        let flags = decode_int_be_u32(&data[4..6]);
        let crc32 = if flags & 0x8000 != 0 && data.len() >= 14 {
            Some(decode_int_be_u32(&data[10..14]))
        } else {
            None
        };
        Ok(ExtendedHeader {
            size: declared + 4,
            tag_is_update: false,
            crc32,
            restrictions: None,
        })
    }

    // v2.4: size(4, synch-safe, includes everything) flag-byte-count(1)
    // flags(1), then one length-prefixed data block per set flag
    fn parse_v4(data: &[u8]) -> Result<ExtendedHeader, Error> {
        if data.len() < 6 {
            return Err(format_error("Extended header is truncated"));
        }
        let size = decode_synch_int(&data[0..4])?;
        let flags = data[5];

        let mut pos = 6;
        let mut tag_is_update = false;
        let mut crc32 = None;
        let mut restrictions = None;

        if flags & 0x40 != 0 {
            tag_is_update = true;
            pos += 1;
        }
        if flags & 0x20 != 0 {
            if data.len() >= pos + 6 {
                crc32 = Some(decode_synch_int(&data[pos + 1..pos + 6])?);
            }
            pos += 6;
        }
        if flags & 0x10 != 0 && data.len() >= pos + 2 {
            restrictions = Some(data[pos + 1]);
        }

        Ok(ExtendedHeader {
            size,
            tag_is_update,
            crc32,
            restrictions,
        })
    }

    // bytes this structure occupies at the front of the frame region
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_update(&self) -> bool {
        self.tag_is_update
    }

    pub fn crc32(&self) -> Option<u32> {
        self.crc32
    }

    pub fn restrictions(&self) -> Option<u8> {
        self.restrictions
    }
}
