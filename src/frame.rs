use crate::tools::{
    decode_frame_id, decode_int_be_u32, decode_synch_int, encode_frame_id, encode_int_be_u32,
    encode_synch_int, format_error,
};
use crate::Error;

pub fn frame_header_size(major_version: u8) -> usize {
    if major_version == 2 {
        6
    } else {
        10
    }
}

// `size` is the content size in bytes, excluding the header itself; parsed
// frames keep their decoded content, so after parsing it reflects the
// content as held in memory, not the stuffed on-disk form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameHeader {
    pub id: String,
    pub size: u32,

    pub drop_after_tag_alteration: bool,
    pub drop_after_file_alteration: bool,
    pub is_read_only: bool,
    pub has_grouping: bool,
    pub is_compressed: bool,
    pub is_encrypted: bool,
    pub is_unsynchronized: bool,
    pub has_data_length: bool,
}

impl FrameHeader {
    pub fn parse(data: &[u8], major_version: u8) -> Result<FrameHeader, Error> {
        if data.len() < frame_header_size(major_version) {
            return Err(format_error("Frame header is truncated"));
        }

        // id3v2.2 squeezes everything into six bytes and has no flags
        if major_version == 2 {
            return Ok(FrameHeader {
                id: decode_frame_id(&data[0..3])?,
                size: decode_int_be_u32(&data[3..6]),
                ..Default::default()
            });
        }

        // 4: Frame ID      $xx xx xx xx  (four characters)
        // 4: Size          4 * %0xxxxxxx in 2.4 / $xx in 2.3
        // 2: Flags         $xx xx
        let size = match major_version {
            3 => decode_int_be_u32(&data[4..8]),
            4 => decode_synch_int(&data[4..8])?,
            _ => return Err(format_error("Unknown ID3v2 version")),
        };
        let flags1 = data[8];
        let flags2 = data[9];

        let mut header = FrameHeader {
            id: decode_frame_id(&data[0..4])?,
            size,
            ..Default::default()
        };

        // the two flag bytes moved around between v2.3 and v2.4
        if major_version == 3 {
            header.drop_after_tag_alteration = flags1 & 0b1000_0000 != 0;
            header.drop_after_file_alteration = flags1 & 0b0100_0000 != 0;
            header.is_read_only = flags1 & 0b0010_0000 != 0;
            header.is_compressed = flags2 & 0b1000_0000 != 0;
            header.is_encrypted = flags2 & 0b0100_0000 != 0;
            header.has_grouping = flags2 & 0b0010_0000 != 0;
        } else {
            header.drop_after_tag_alteration = flags1 & 0b0100_0000 != 0;
            header.drop_after_file_alteration = flags1 & 0b0010_0000 != 0;
            header.is_read_only = flags1 & 0b0001_0000 != 0;
            header.has_grouping = flags2 & 0b0100_0000 != 0;
            header.is_compressed = flags2 & 0b0000_1000 != 0;
            header.is_encrypted = flags2 & 0b0000_0100 != 0;
            header.is_unsynchronized = flags2 & 0b0000_0010 != 0;
            header.has_data_length = flags2 & 0b0000_0001 != 0;
        }

        Ok(header)
    }

    pub fn render(&self, major_version: u8, content_size: u32) -> Result<Vec<u8>, Error> {
        // this library reads v2.2 but never writes it
        if major_version < 3 {
            return Err(Error::NotImplemented(
                "Rendering ID3v2.2 frames is not supported".to_string(),
            ));
        }
        if self.id.len() != 4 {
            return Err(Error::NotImplemented(format!(
                "Frame \"{}\" has no ID3v2.{} representation",
                self.id, major_version
            )));
        }

        let mut vec = encode_frame_id(&self.id)?;
        match major_version {
            3 => vec.extend_from_slice(&encode_int_be_u32(content_size)),
            _ => vec.extend_from_slice(&encode_synch_int(content_size)),
        }

        let mut flags1 = 0u8;
        let mut flags2 = 0u8;
        if major_version == 3 {
            if self.drop_after_tag_alteration {
                flags1 |= 0b1000_0000;
            }
            if self.drop_after_file_alteration {
                flags1 |= 0b0100_0000;
            }
            if self.is_read_only {
                flags1 |= 0b0010_0000;
            }
            if self.is_compressed {
                flags2 |= 0b1000_0000;
            }
            if self.is_encrypted {
                flags2 |= 0b0100_0000;
            }
            if self.has_grouping {
                flags2 |= 0b0010_0000;
            }
        } else {
            if self.drop_after_tag_alteration {
                flags1 |= 0b0100_0000;
            }
            if self.drop_after_file_alteration {
                flags1 |= 0b0010_0000;
            }
            if self.is_read_only {
                flags1 |= 0b0001_0000;
            }
            if self.has_grouping {
                flags2 |= 0b0100_0000;
            }
            if self.is_compressed {
                flags2 |= 0b0000_1000;
            }
            if self.is_encrypted {
                flags2 |= 0b0000_0100;
            }
            if self.is_unsynchronized {
                flags2 |= 0b0000_0010;
            }
            if self.has_data_length {
                flags2 |= 0b0000_0001;
            }
        }
        vec.push(flags1);
        vec.push(flags2);
        Ok(vec)
    }
}

/// The capability set the tag container depends on. Concrete frame kinds
/// live outside the container and plug in through this trait.
pub trait Frame {
    fn header(&self) -> &FrameHeader;
    fn header_mut(&mut self) -> &mut FrameHeader;

    // serializes the complete frame, header included, for the target
    // version; NotImplemented means the frame has no representation there
    // and the container leaves it out
    fn render(&self, major_version: u8) -> Result<Vec<u8>, Error>;

    fn boxed_clone(&self) -> Box<dyn Frame>;

    fn id(&self) -> &str {
        &self.header().id
    }

    fn size(&self) -> u32 {
        self.header().size
    }

    fn text(&self) -> Option<String> {
        None
    }

    fn set_text(&mut self, _text: &str) {}

    // all text values of a multi-valued frame, in stored order
    fn value_list(&self) -> Vec<String> {
        self.text().map(|t| vec![t]).unwrap_or_default()
    }
}

impl Clone for Box<dyn Frame> {
    fn clone(&self) -> Box<dyn Frame> {
        self.boxed_clone()
    }
}

impl std::fmt::Debug for dyn Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Frame({}, {} bytes)", self.id(), self.size())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    // a feature this library does not decode
    NotImplemented,
    // the frame's own data is damaged; the rest of the tag is fine
    Corrupt,
}

/// One step of the frame scan. `consumed` is how far the scan advances.
pub enum FrameStep {
    Frame {
        frame: Box<dyn Frame>,
        consumed: usize,
    },
    Skip {
        consumed: usize,
        reason: SkipReason,
    },
    // padding or the end of the region; the scan stops here
    End,
}

/// Builds frames out of a tag's frame region. `data` starts at the frame
/// to decode and runs to the end of the region; errors other than the
/// skip/end outcomes abort the whole parse.
pub trait FrameFactory {
    fn create_frame(
        &self,
        data: &[u8],
        major_version: u8,
        tag_unsynchronized: bool,
    ) -> Result<FrameStep, Error>;
}
