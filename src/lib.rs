// Structural codec for ID3v2 tags: header, extended header, frames and
// footer, in and out of bytes, across v2.2/v2.3/v2.4.

#[macro_use]
extern crate lazy_static;

mod config;
mod encoding;
mod frame;
mod frames;
mod regex;
mod structure;
mod tag;
mod tools;

#[cfg(test)]
mod tests;

pub use crate::config::Config;
pub use crate::encoding::Encoding;
pub use crate::frame::{Frame, FrameFactory, FrameHeader, FrameStep, SkipReason};
pub use crate::frames::{CommentFrame, StandardFrameFactory, TextFrame, UnknownFrame};
pub use crate::structure::{ExtendedHeader, Footer, Header};
pub use crate::tag::{ReadStyle, Tag};

use std::io;

#[derive(Debug)]
pub enum Error {
    IOError(io::Error),
    // a fixed structure did not decode: bad identifier, illegal flags,
    // non-synch-safe size byte
    FormatError(String),
    // a setter was handed a value outside its allowed bounds
    RangeError(String),
    // a feature this library does not support, e.g. compressed frames
    NotImplemented(String),
}

use std::fmt;
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::IOError(ref e) => write!(f, "IO error: {}", e),
            Error::FormatError(ref e) => write!(f, "Malformed tag data: {}", e),
            Error::RangeError(ref e) => write!(f, "Value out of range: {}", e),
            Error::NotImplemented(ref e) => write!(f, "Not implemented: {}", e),
        }
    }
}

use std::error;
impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::IOError(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IOError(err)
    }
}
