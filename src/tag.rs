use std::io::prelude::*;
use std::io::SeekFrom;

use crc::crc32::checksum_ieee;
use log::{debug, warn};

use crate::config::Config;
use crate::frame::{frame_header_size, Frame, FrameFactory, FrameHeader, FrameStep};
use crate::frames::{CommentFrame, StandardFrameFactory};
use crate::regex::is_four_digits;
use crate::structure::{ExtendedHeader, Footer, Header, FOOTER_SIZE, HEADER_SIZE};
use crate::tools::{format_error, read_block, resynch, unsynch};
use crate::Error;

// below this, reading the whole tag in one go beats per-frame seeks
const SMALL_TAG_THRESHOLD: u32 = 1024;
const PADDING_BLOCK: usize = 1024;

/// How much of the tag body to pull into memory up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStyle {
    // read frames one at a time from the source where the layout allows
    Normal,
    // materialize the whole tag so picture data stays addressable for
    // deferred decoding
    LazyPictures,
}

impl Default for ReadStyle {
    fn default() -> ReadStyle {
        ReadStyle::Normal
    }
}

/// An ID3v2 tag: header, optional extended header and an ordered frame
/// list. Frame order is both iteration and render order.
#[derive(Clone)]
pub struct Tag {
    header: Header,
    extended_header: Option<ExtendedHeader>,
    frames: Vec<Box<dyn Frame>>,
    performers_role: Option<Vec<(String, String)>>,
}

impl Default for Tag {
    fn default() -> Tag {
        Tag::new()
    }
}

impl Tag {
    pub fn new() -> Tag {
        Tag {
            header: Header::default(),
            extended_header: None,
            frames: Vec::new(),
            performers_role: None,
        }
    }

    /// Reads a tag whose header starts at `position`.
    pub fn read<T: Read + Seek>(
        input: &mut T,
        position: u64,
        style: ReadStyle,
    ) -> Result<Tag, Error> {
        Tag::read_with(input, position, style, &StandardFrameFactory)
    }

    pub fn read_with<T: Read + Seek>(
        input: &mut T,
        position: u64,
        style: ReadStyle,
        factory: &dyn FrameFactory,
    ) -> Result<Tag, Error> {
        input.seek(SeekFrom::Start(position))?;
        let header_data = read_block(input, HEADER_SIZE as usize)?;
        let header = Header::parse(&header_data)?;

        let mut tag = Tag {
            header,
            extended_header: None,
            frames: Vec::new(),
            performers_role: None,
        };

        // a valid tag must contain at least one frame
        if tag.header.tag_size() == 0 {
            return Ok(tag);
        }

        tag.parse_frames(input, position, style, factory)?;
        Ok(tag)
    }

    /// Locates and reads a tag that ends at `end_position` via its footer.
    pub fn read_from_footer<T: Read + Seek>(
        input: &mut T,
        end_position: u64,
        style: ReadStyle,
    ) -> Result<Tag, Error> {
        if end_position < (HEADER_SIZE + FOOTER_SIZE) as u64 {
            return Err(format_error("No room for an ID3v2 tag before this position"));
        }
        input.seek(SeekFrom::Start(end_position - FOOTER_SIZE as u64))?;
        let data = read_block(input, FOOTER_SIZE as usize)?;
        let footer = Footer::parse(&data)?;
        let start = match end_position.checked_sub(footer.complete_tag_size() as u64) {
            Some(s) => s,
            None => {
                return Err(format_error(
                    "Footer declares a tag larger than the data before it",
                ))
            }
        };
        Tag::read(input, start, style)
    }

    fn parse_frames<T: Read + Seek>(
        &mut self,
        input: &mut T,
        position: u64,
        style: ReadStyle,
        factory: &dyn FrameFactory,
    ) -> Result<(), Error> {
        let version = self.header.major_version();
        let tag_size = self.header.tag_size() as usize;
        let header_len = frame_header_size(version);

        let tag_unsynchronized = self.header.is_unsynchronized();
        // with older versions the whole tag is stuffed at once;
        // v2.4 stuffs per frame instead
        let whole_tag_stuffed = tag_unsynchronized && version < 4;

        let eager = whole_tag_stuffed
            || self.header.tag_size() < SMALL_TAG_THRESHOLD
            || style == ReadStyle::LazyPictures
            || self.header.has_extended_header();

        if eager {
            let mut data = read_block(input, tag_size)?;
            if whole_tag_stuffed {
                data = resynch(&data);
            }

            let mut pos = 0usize;
            if self.header.has_extended_header() {
                match ExtendedHeader::parse(&data, version) {
                    Ok(ext) => {
                        let ext_size = ext.size() as usize;
                        if ext_size <= data.len() {
                            pos += ext_size;
                            self.verify_crc(&ext, &data[pos..]);
                            self.extended_header = Some(ext);
                        } else {
                            debug!(
                                "extended header claims {} of {} available bytes; ignoring it",
                                ext_size,
                                data.len()
                            );
                        }
                    }
                    Err(e) => debug!("unreadable extended header: {}", e),
                }
            }

            let region_end = data.len();
            let limit = region_end.saturating_sub(header_len);
            while pos < limit {
                match factory.create_frame(&data[pos..region_end], version, tag_unsynchronized)? {
                    FrameStep::Frame { frame, consumed } => {
                        pos += consumed;
                        self.push_parsed(frame);
                    }
                    FrameStep::Skip { consumed, reason } => {
                        debug!("skipped frame data at offset {}: {:?}", pos, reason);
                        if consumed == 0 {
                            break;
                        }
                        pos += consumed;
                    }
                    FrameStep::End => break,
                }
            }
        } else {
            // lazy: pull one frame at a time from the backing source
            let region_start = position + HEADER_SIZE as u64;
            let region_end = region_start + tag_size as u64;
            let limit = region_end - header_len as u64;
            let mut offset = region_start;
            while offset < limit {
                input.seek(SeekFrom::Start(offset))?;
                let mut chunk = read_block(input, header_len)?;
                if chunk.len() < header_len || chunk[0] == 0x00 {
                    break;
                }
                let frame_header = match FrameHeader::parse(&chunk, version) {
                    Ok(h) => h,
                    // ran into padding or garbage
                    Err(_) => break,
                };
                let room = (region_end - offset - header_len as u64) as usize;
                let content_len = (frame_header.size as usize).min(room);
                chunk.append(&mut read_block(input, content_len)?);

                match factory.create_frame(&chunk, version, tag_unsynchronized)? {
                    FrameStep::Frame { frame, consumed } => {
                        offset += consumed as u64;
                        self.push_parsed(frame);
                    }
                    FrameStep::Skip { consumed, reason } => {
                        debug!("skipped frame data at offset {}: {:?}", offset, reason);
                        if consumed == 0 {
                            break;
                        }
                        offset += consumed as u64;
                    }
                    FrameStep::End => break,
                }
            }
        }

        if version < 4 {
            self.fold_legacy_dates();
        }
        Ok(())
    }

    fn push_parsed(&mut self, frame: Box<dyn Frame>) {
        // empty frames carry no information
        if frame.size() == 0 {
            debug!("discarding empty {} frame", frame.id());
            return;
        }
        self.performers_role = None;
        self.frames.push(frame);
    }

    fn verify_crc(&self, ext: &ExtendedHeader, frame_data: &[u8]) {
        if let Some(expected) = ext.crc32() {
            let actual = checksum_ieee(frame_data);
            if actual != expected {
                warn!(
                    "extended header CRC mismatch: stored {:#010X}, computed {:#010X}",
                    expected, actual
                );
            }
        }
    }

    // v2.3 spreads the recording date over TYER/TDAT/TIME; fold those into
    // the single timestamp field newer readers expect
    fn fold_legacy_dates(&mut self) {
        let mut year: Option<usize> = None;
        let mut date: Option<usize> = None;
        let mut time: Option<usize> = None;
        for (i, frame) in self.frames.iter().enumerate() {
            match frame.id() {
                "TDRC" | "TYER" if year.is_none() => year = Some(i),
                "TDAT" if date.is_none() => date = Some(i),
                "TIME" if time.is_none() => time = Some(i),
                _ => (),
            }
        }
        let (year_idx, date_idx) = match (year, date) {
            (Some(y), Some(d)) => (y, d),
            _ => return,
        };
        let year_text = match self.frames[year_idx].text() {
            Some(t) => t,
            None => return,
        };
        if year_text.len() != 4 {
            return;
        }
        let date_text = match self.frames[date_idx].text() {
            Some(t) => t,
            None => return,
        };
        if !is_four_digits(&date_text) {
            return;
        }

        let mut stamp = format!(
            "{}-{}-{}",
            year_text,
            &date_text[0..2],
            &date_text[2..4]
        );
        if let Some(time_idx) = time {
            if let Some(time_text) = self.frames[time_idx].text() {
                if is_four_digits(&time_text) {
                    stamp = format!("{}T{}:{}", stamp, &time_text[0..2], &time_text[2..4]);
                }
            }
        }

        self.frames[year_idx].set_text(&stamp);
        self.frames.remove(date_idx);
        self.performers_role = None;
    }

    /// Serializes the whole tag: header, frame data, padding or footer.
    pub fn render(&mut self, config: &Config) -> Result<Vec<u8>, Error> {
        // a tag carrying a footer is necessarily v2.4
        let version = if self.header.has_footer() {
            4
        } else {
            config.render_version(self.header.major_version())
        };
        self.header.set_major_version(version)?;
        // extended headers are never written back
        self.header.set_extended_header(false)?;

        let tag_unsynchronized = self.header.is_unsynchronized();

        let mut data = Vec::new();
        for frame in self.frames.iter_mut() {
            if tag_unsynchronized && version >= 4 {
                frame.header_mut().is_unsynchronized = true;
            }
            if frame.header().drop_after_tag_alteration {
                debug!("dropping {} frame marked discard-on-alteration", frame.id());
                continue;
            }
            match frame.render(version) {
                Ok(bytes) => data.extend_from_slice(&bytes),
                Err(Error::NotImplemented(reason)) => {
                    debug!("frame left out of rendered tag: {}", reason);
                }
                Err(e) => return Err(e),
            }
        }

        if tag_unsynchronized && version < 4 {
            data = unsynch(&data);
        }

        if self.header.has_footer() {
            // the footer marks the exact end of the tag, so no padding
            self.header.set_tag_size(data.len() as u32)?;
            let mut vec = self.header.render();
            vec.append(&mut data);
            vec.extend_from_slice(&Footer::from_header(&self.header).render());
            return Ok(vec);
        }

        // reuse the old on-disk size when the new data still fits,
        // otherwise open up a fresh block of padding
        if data.len() < self.header.tag_size() as usize {
            data.resize(self.header.tag_size() as usize, 0);
        } else {
            data.resize(data.len() + PADDING_BLOCK, 0);
        }

        self.header.set_tag_size(data.len() as u32)?;
        let mut vec = self.header.render();
        vec.append(&mut data);
        Ok(vec)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn extended_header(&self) -> Option<&ExtendedHeader> {
        self.extended_header.as_ref()
    }

    // the version this tag resolves to under `config`
    pub fn version(&self, config: &Config) -> u8 {
        if config.force_default_version {
            config.default_version
        } else {
            self.header.major_version()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Box<dyn Frame>] {
        &self.frames
    }

    pub fn frames_by_id(&self, id: &str) -> Vec<&dyn Frame> {
        self.frames
            .iter()
            .filter(|f| f.id() == id)
            .map(|f| f.as_ref())
            .collect()
    }

    pub fn add_frame(&mut self, frame: Box<dyn Frame>) {
        self.performers_role = None;
        self.frames.push(frame);
    }

    pub fn remove_frame(&mut self, index: usize) -> Option<Box<dyn Frame>> {
        if index >= self.frames.len() {
            return None;
        }
        self.performers_role = None;
        Some(self.frames.remove(index))
    }

    pub fn remove_frames(&mut self, id: &str) {
        self.performers_role = None;
        self.frames.retain(|f| f.id() != id);
    }

    // swaps out the first frame sharing the identifier, or appends
    pub fn replace_frame(&mut self, frame: Box<dyn Frame>) {
        self.performers_role = None;
        match self.frames.iter().position(|f| f.id() == frame.id()) {
            Some(i) => self.frames[i] = frame,
            None => self.frames.push(frame),
        }
    }

    // clones every frame into `target`; overwrite clears its list first
    pub fn copy_to(&self, target: &mut Tag, overwrite: bool) {
        if overwrite {
            target.frames.clear();
        }
        target.performers_role = None;
        for frame in &self.frames {
            target.frames.push(frame.boxed_clone());
        }
    }

    // role/person pairs from the TMCL and TIPL frames, computed once and
    // cached until a frame mutation invalidates it
    pub fn performers_role(&mut self) -> &[(String, String)] {
        let frames = &self.frames;
        self.performers_role
            .get_or_insert_with(|| {
                let mut roles = Vec::new();
                for frame in frames {
                    match frame.id() {
                        "TMCL" | "TIPL" => {
                            let values = frame.value_list();
                            for pair in values.chunks(2) {
                                if pair.len() == 2 && !pair[1].is_empty() {
                                    roles.push((pair[0].clone(), pair[1].clone()));
                                }
                            }
                        }
                        _ => (),
                    }
                }
                roles
            })
            .as_slice()
    }

    pub fn comment(&self) -> Option<String> {
        self.frames
            .iter()
            .find(|f| f.id() == "COMM")
            .and_then(|f| f.text())
    }

    pub fn lyrics(&self) -> Option<String> {
        self.frames
            .iter()
            .find(|f| f.id() == "USLT")
            .and_then(|f| f.text())
    }

    pub fn set_comment(&mut self, text: Option<&str>, config: &Config) {
        self.set_comment_like("COMM", text, config);
    }

    pub fn set_lyrics(&mut self, text: Option<&str>, config: &Config) {
        self.set_comment_like("USLT", text, config);
    }

    fn set_comment_like(&mut self, id: &str, text: Option<&str>, config: &Config) {
        self.performers_role = None;
        let text = match text {
            Some(t) if !t.is_empty() => t,
            _ => {
                self.frames.retain(|f| f.id() != id);
                return;
            }
        };
        if let Some(frame) = self.frames.iter_mut().find(|f| f.id() == id) {
            frame.set_text(text);
            return;
        }
        self.frames.push(Box::new(CommentFrame::new(
            id,
            config.default_language,
            text,
            config.default_encoding,
        )));
    }
}
