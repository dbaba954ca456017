use log::debug;

use crate::encoding::{decode_string, encode_string, Encoding};
use crate::frame::{
    frame_header_size, Frame, FrameFactory, FrameHeader, FrameStep, SkipReason,
};
use crate::tools::{decode_synch_int, resynch, unsynch};
use crate::Error;

// v2.2 identifiers and their four-character successors
const ID_UPGRADES: [(&str, &str); 21] = [
    ("TT2", "TIT2"),
    ("TAL", "TALB"),
    ("TP1", "TPE1"),
    ("TP2", "TPE2"),
    ("TCM", "TCOM"),
    ("TT1", "TIT1"),
    ("TCO", "TCON"),
    ("TYE", "TYER"),
    ("TDA", "TDAT"),
    ("TIM", "TIME"),
    ("TRK", "TRCK"),
    ("TPA", "TPOS"),
    ("TBP", "TBPM"),
    ("TCP", "TCMP"),
    ("COM", "COMM"),
    ("ULT", "USLT"),
    ("TST", "TSOT"),
    ("TSA", "TSOA"),
    ("TSP", "TSOP"),
    ("TS2", "TSO2"),
    ("TSC", "TSOC"),
];

fn upgrade_id(id: &str) -> Option<&'static str> {
    ID_UPGRADES
        .iter()
        .find(|(old, _)| *old == id)
        .map(|(_, new)| *new)
}

// v2.3 only knows latin1 and BOM'd utf16
fn effective_encoding(major_version: u8, enc: Encoding) -> Encoding {
    if major_version < 4 {
        match enc {
            Encoding::Utf8 | Encoding::Utf16Be => Encoding::Utf16,
            e => e,
        }
    } else {
        enc
    }
}

fn push_terminator(vec: &mut Vec<u8>, enc: Encoding) {
    for _ in 0..enc.terminator_len() {
        vec.push(0x00);
    }
}

// split off a terminated string, decoding both halves; no terminator means
// the whole buffer is the trailing half
fn split_terminated(data: &[u8], enc: Encoding) -> (String, String) {
    let step = enc.terminator_len();
    let mut i = 0;
    while i + step <= data.len() {
        if data[i..i + step].iter().all(|&b| b == 0) {
            return (
                decode_string(&data[..i], enc),
                decode_string(&data[i + step..], enc),
            );
        }
        i += step;
    }
    ("".to_string(), decode_string(data, enc))
}

// header render + optional per-frame byte stuffing, shared by all kinds
fn finish_frame(header: &FrameHeader, major_version: u8, body: Vec<u8>) -> Result<Vec<u8>, Error> {
    let body = if major_version >= 4 && header.is_unsynchronized {
        unsynch(&body)
    } else {
        body
    };
    let mut vec = header.render(major_version, body.len() as u32)?;
    vec.extend_from_slice(&body);
    Ok(vec)
}

/// A text information frame: an encoding byte followed by one or more
/// terminator-separated values.
#[derive(Debug, Clone)]
pub struct TextFrame {
    header: FrameHeader,
    encoding: Encoding,
    values: Vec<String>,
}

impl TextFrame {
    pub fn new(id: &str, text: &str, encoding: Encoding) -> TextFrame {
        TextFrame {
            header: FrameHeader {
                id: id.to_string(),
                ..Default::default()
            },
            encoding,
            values: vec![text.to_string()],
        }
    }

    pub fn parse(header: FrameHeader, content: &[u8]) -> Result<TextFrame, Error> {
        if content.is_empty() {
            return Ok(TextFrame {
                header,
                encoding: Encoding::Utf8,
                values: Vec::new(),
            });
        }
        let encoding = Encoding::from_byte(content[0]);
        let decoded = decode_string(&content[1..], encoding);
        let values = decoded
            .split('\0')
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
            .collect();
        Ok(TextFrame {
            header,
            encoding,
            values,
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn set_values(&mut self, values: Vec<String>) {
        self.values = values;
    }
}

impl Frame for TextFrame {
    fn header(&self) -> &FrameHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut FrameHeader {
        &mut self.header
    }

    fn render(&self, major_version: u8) -> Result<Vec<u8>, Error> {
        let enc = effective_encoding(major_version, self.encoding);
        let mut body = vec![enc.to_byte()];
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                push_terminator(&mut body, enc);
            }
            body.extend_from_slice(&encode_string(value, enc));
        }
        push_terminator(&mut body, enc);
        finish_frame(&self.header, major_version, body)
    }

    fn boxed_clone(&self) -> Box<dyn Frame> {
        Box::new(self.clone())
    }

    fn text(&self) -> Option<String> {
        Some(self.values.join(" / "))
    }

    fn set_text(&mut self, text: &str) {
        self.values = vec![text.to_string()];
    }

    fn value_list(&self) -> Vec<String> {
        self.values.clone()
    }
}

// a comment (COMM) or lyrics (USLT) frame: encoding, language, terminated
// description, then the text itself
#[derive(Debug, Clone)]
pub struct CommentFrame {
    header: FrameHeader,
    encoding: Encoding,
    language: [u8; 3],
    description: String,
    text: String,
}

impl CommentFrame {
    pub fn new(id: &str, language: [u8; 3], text: &str, encoding: Encoding) -> CommentFrame {
        CommentFrame {
            header: FrameHeader {
                id: id.to_string(),
                ..Default::default()
            },
            encoding,
            language,
            description: "".to_string(),
            text: text.to_string(),
        }
    }

    pub fn parse(header: FrameHeader, content: &[u8]) -> Result<CommentFrame, Error> {
        if content.len() < 4 {
            return Err(Error::FormatError(format!(
                "{} frame is shorter than its fixed fields",
                header.id
            )));
        }
        let encoding = Encoding::from_byte(content[0]);
        let mut language = [0; 3];
        language.copy_from_slice(&content[1..4]);
        let (description, text) = split_terminated(&content[4..], encoding);
        Ok(CommentFrame {
            header,
            encoding,
            language,
            description,
            text,
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn language(&self) -> [u8; 3] {
        self.language
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Frame for CommentFrame {
    fn header(&self) -> &FrameHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut FrameHeader {
        &mut self.header
    }

    fn render(&self, major_version: u8) -> Result<Vec<u8>, Error> {
        let enc = effective_encoding(major_version, self.encoding);
        let mut body = vec![enc.to_byte()];
        body.extend_from_slice(&self.language);
        body.extend_from_slice(&encode_string(&self.description, enc));
        push_terminator(&mut body, enc);
        body.extend_from_slice(&encode_string(&self.text, enc));
        push_terminator(&mut body, enc);
        finish_frame(&self.header, major_version, body)
    }

    fn boxed_clone(&self) -> Box<dyn Frame> {
        Box::new(self.clone())
    }

    fn text(&self) -> Option<String> {
        Some(self.text.clone())
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }
}

// any frame this library has no decoder for; the body is carried through
// verbatim
#[derive(Debug, Clone)]
pub struct UnknownFrame {
    header: FrameHeader,
    data: Vec<u8>,
}

impl UnknownFrame {
    pub fn new(header: FrameHeader, data: Vec<u8>) -> UnknownFrame {
        UnknownFrame { header, data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Frame for UnknownFrame {
    fn header(&self) -> &FrameHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut FrameHeader {
        &mut self.header
    }

    fn render(&self, major_version: u8) -> Result<Vec<u8>, Error> {
        finish_frame(&self.header, major_version, self.data.clone())
    }

    fn boxed_clone(&self) -> Box<dyn Frame> {
        Box::new(self.clone())
    }
}

/// The factory used when a caller doesn't bring their own: text and
/// comment frames get decoded, everything else is carried as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardFrameFactory;

impl FrameFactory for StandardFrameFactory {
    fn create_frame(
        &self,
        data: &[u8],
        major_version: u8,
        tag_unsynchronized: bool,
    ) -> Result<FrameStep, Error> {
        let header_len = frame_header_size(major_version);
        if data.len() < header_len {
            return Ok(FrameStep::End);
        }
        // padding starts with a zero byte where an identifier should be
        if data[0] == 0x00 {
            return Ok(FrameStep::End);
        }

        let mut header = match FrameHeader::parse(&data[..header_len], major_version) {
            Ok(h) => h,
            // not a frame header at all; treat it like padding
            Err(_) => return Ok(FrameStep::End),
        };

        let total = header_len + header.size as usize;
        if total > data.len() {
            debug!(
                "{} frame overruns its region ({} of {} bytes)",
                header.id,
                total,
                data.len()
            );
            return Ok(FrameStep::Skip {
                consumed: data.len(),
                reason: SkipReason::Corrupt,
            });
        }

        if header.size == 0 {
            return Ok(FrameStep::Frame {
                frame: Box::new(UnknownFrame::new(header, Vec::new())),
                consumed: header_len,
            });
        }

        if header.is_compressed || header.is_encrypted {
            debug!(
                "skipping {} frame: compressed or encrypted frames are not supported",
                header.id
            );
            return Ok(FrameStep::Skip {
                consumed: total,
                reason: SkipReason::NotImplemented,
            });
        }

        let mut content = data[header_len..total].to_vec();

        // v2.4 stuffs per frame; a tag-wide unsynchronized v2.4 tag means
        // every frame is stuffed individually
        if major_version >= 4 {
            if tag_unsynchronized {
                header.is_unsynchronized = true;
            }
            if header.has_data_length {
                if content.len() < 4 || decode_synch_int(&content[..4]).is_err() {
                    return Ok(FrameStep::Skip {
                        consumed: total,
                        reason: SkipReason::Corrupt,
                    });
                }
                content = content.split_off(4);
            }
            if header.is_unsynchronized {
                content = resynch(&content);
            }
        }

        // the stored body is now decoded; the flags described the old bytes
        header.is_unsynchronized = false;
        header.has_data_length = false;
        header.size = content.len() as u32;

        if major_version == 2 {
            if let Some(new_id) = upgrade_id(&header.id) {
                header.id = new_id.to_string();
            }
        }

        let id = header.id.clone();
        let frame: Box<dyn Frame> = if id.starts_with('T') && id != "TXXX" && id != "TXX" {
            match TextFrame::parse(header, &content) {
                Ok(f) => Box::new(f),
                Err(_) => {
                    return Ok(FrameStep::Skip {
                        consumed: total,
                        reason: SkipReason::Corrupt,
                    })
                }
            }
        } else if id == "COMM" || id == "USLT" {
            match CommentFrame::parse(header, &content) {
                Ok(f) => Box::new(f),
                Err(_) => {
                    return Ok(FrameStep::Skip {
                        consumed: total,
                        reason: SkipReason::Corrupt,
                    })
                }
            }
        } else {
            Box::new(UnknownFrame::new(header, content))
        };

        Ok(FrameStep::Frame {
            frame,
            consumed: total,
        })
    }
}
