mod structure;

use std::io::Cursor;

use crate::encoding::Encoding;
use crate::frame::{Frame, FrameFactory, FrameStep};
use crate::frames::TextFrame;
use crate::tag::{ReadStyle, Tag};
use crate::tools::{encode_int_be_u32, encode_synch_int, unsynch};
use crate::Config;
use crate::Error;

fn frame_bytes(version: u8, id: &str, flags1: u8, flags2: u8, content: &[u8]) -> Vec<u8> {
    let mut vec = id.as_bytes().to_vec();
    if version == 2 {
        vec.extend_from_slice(&encode_int_be_u32(content.len() as u32)[1..]);
    } else if version == 3 {
        vec.extend_from_slice(&encode_int_be_u32(content.len() as u32));
        vec.push(flags1);
        vec.push(flags2);
    } else {
        vec.extend_from_slice(&encode_synch_int(content.len() as u32));
        vec.push(flags1);
        vec.push(flags2);
    }
    vec.extend_from_slice(content);
    vec
}

fn text_frame_bytes(version: u8, id: &str, text: &str) -> Vec<u8> {
    let mut content = vec![0x03];
    content.extend_from_slice(text.as_bytes());
    content.push(0x00);
    frame_bytes(version, id, 0x00, 0x00, &content)
}

fn tag_bytes(version: u8, flags: u8, frames: &[Vec<u8>], padding: usize) -> Vec<u8> {
    let mut body = Vec::new();
    for f in frames {
        body.extend_from_slice(f);
    }
    body.resize(body.len() + padding, 0);
    let mut vec = b"ID3".to_vec();
    vec.push(version);
    vec.push(0x00);
    vec.push(flags);
    vec.extend_from_slice(&encode_synch_int(body.len() as u32));
    vec.append(&mut body);
    vec
}

fn parse(data: &[u8]) -> Tag {
    Tag::read(&mut Cursor::new(data), 0, ReadStyle::Normal).unwrap()
}

#[test]
fn v3_read_test() {
    let data = tag_bytes(
        3,
        0,
        &[
            text_frame_bytes(3, "TIT2", "example song"),
            text_frame_bytes(3, "TPE1", "example artist"),
        ],
        40,
    );
    let tag = parse(&data);
    assert_eq!(tag.frames().len(), 2);
    assert_eq!(tag.frames()[0].id(), "TIT2");
    assert_eq!(tag.frames()[0].text().unwrap(), "example song");
    assert_eq!(tag.frames_by_id("TPE1")[0].text().unwrap(), "example artist");
    assert_eq!(tag.header().major_version(), 3);
}

#[test]
fn v2_read_test() {
    let data = tag_bytes(
        2,
        0,
        &[
            text_frame_bytes(2, "TT2", "example song"),
            text_frame_bytes(2, "TAL", "example album"),
        ],
        12,
    );
    let tag = parse(&data);
    assert_eq!(tag.frames().len(), 2);
    // three-character identifiers upgrade on the way in
    assert_eq!(tag.frames()[0].id(), "TIT2");
    assert_eq!(tag.frames()[1].id(), "TALB");
    assert_eq!(tag.frames()[1].text().unwrap(), "example album");
}

#[test]
fn empty_tag_test() {
    let data = tag_bytes(4, 0, &[], 0);
    let tag = parse(&data);
    assert!(tag.is_empty());
    assert_eq!(tag.header().tag_size(), 0);
}

#[test]
fn bad_header_test() {
    assert!(Tag::read(&mut Cursor::new(b"not a tag at all"), 0, ReadStyle::Normal).is_err());
}

#[test]
fn read_at_position_test() {
    let mut data = vec![0x55; 321];
    data.extend(tag_bytes(3, 0, &[text_frame_bytes(3, "TIT2", "offset")], 0));
    let tag = Tag::read(&mut Cursor::new(&data), 321, ReadStyle::Normal).unwrap();
    assert_eq!(tag.frames()[0].text().unwrap(), "offset");
}

#[test]
fn skip_unsupported_frame_test() {
    // an encrypted frame between two good ones only loses itself
    let data = tag_bytes(
        3,
        0,
        &[
            text_frame_bytes(3, "TIT2", "first"),
            frame_bytes(3, "APIC", 0x00, 0b0100_0000, &[0x01, 0x02, 0x03, 0x04]),
            text_frame_bytes(3, "TALB", "last"),
        ],
        0,
    );
    let tag = parse(&data);
    assert_eq!(tag.frames().len(), 2);
    assert_eq!(tag.frames()[0].text().unwrap(), "first");
    assert_eq!(tag.frames()[1].text().unwrap(), "last");
}

#[test]
fn corrupt_frame_overrun_test() {
    // declares more content than the region holds
    let mut bad = b"PRIV".to_vec();
    bad.extend_from_slice(&encode_synch_int(50_000));
    bad.extend_from_slice(&[0x00, 0x00]);
    bad.extend_from_slice(&[0xAA; 4]);
    let data = tag_bytes(4, 0, &[text_frame_bytes(4, "TIT2", "ok"), bad], 0);
    let tag = parse(&data);
    assert_eq!(tag.frames().len(), 1);
    assert_eq!(tag.frames()[0].id(), "TIT2");
}

#[test]
fn empty_frame_dropped_test() {
    let data = tag_bytes(
        3,
        0,
        &[
            frame_bytes(3, "APIC", 0x00, 0x00, &[]),
            text_frame_bytes(3, "TIT2", "kept"),
        ],
        0,
    );
    let tag = parse(&data);
    assert_eq!(tag.frames().len(), 1);
    assert_eq!(tag.frames()[0].id(), "TIT2");
}

struct FailingFactory;
impl FrameFactory for FailingFactory {
    fn create_frame(&self, _: &[u8], _: u8, _: bool) -> Result<FrameStep, Error> {
        Err(Error::FormatError("boom".to_string()))
    }
}

#[test]
fn factory_error_aborts_parse_test() {
    let data = tag_bytes(3, 0, &[text_frame_bytes(3, "TIT2", "x")], 0);
    let result = Tag::read_with(
        &mut Cursor::new(&data),
        0,
        ReadStyle::Normal,
        &FailingFactory,
    );
    assert!(matches!(result, Err(Error::FormatError(_))));
}

#[test]
fn legacy_date_folding_test() {
    let data = tag_bytes(
        3,
        0,
        &[
            text_frame_bytes(3, "TYER", "1999"),
            text_frame_bytes(3, "TDAT", "1225"),
        ],
        0,
    );
    let tag = parse(&data);
    assert_eq!(tag.frames().len(), 1);
    assert_eq!(tag.frames()[0].id(), "TYER");
    assert_eq!(tag.frames()[0].text().unwrap(), "1999-12-25");
    assert!(tag.frames_by_id("TDAT").is_empty());
}

#[test]
fn legacy_date_folding_time_test() {
    let data = tag_bytes(
        3,
        0,
        &[
            text_frame_bytes(3, "TYER", "1999"),
            text_frame_bytes(3, "TDAT", "1225"),
            text_frame_bytes(3, "TIME", "0930"),
        ],
        0,
    );
    let tag = parse(&data);
    assert_eq!(
        tag.frames_by_id("TYER")[0].text().unwrap(),
        "1999-12-25T09:30"
    );
    assert!(tag.frames_by_id("TDAT").is_empty());
    // the time frame itself stays
    assert_eq!(tag.frames_by_id("TIME").len(), 1);
}

#[test]
fn no_folding_without_date_test() {
    let data = tag_bytes(3, 0, &[text_frame_bytes(3, "TYER", "1999")], 0);
    let tag = parse(&data);
    assert_eq!(tag.frames()[0].text().unwrap(), "1999");
}

#[test]
fn no_folding_with_bad_fields_test() {
    // a TDAT that isn't four digits is left alone
    let data = tag_bytes(
        3,
        0,
        &[
            text_frame_bytes(3, "TYER", "1999"),
            text_frame_bytes(3, "TDAT", "12X5"),
        ],
        0,
    );
    let tag = parse(&data);
    assert_eq!(tag.frames().len(), 2);
    assert_eq!(tag.frames_by_id("TYER")[0].text().unwrap(), "1999");
}

#[test]
fn v4_keeps_legacy_frames_test() {
    let data = tag_bytes(
        4,
        0,
        &[
            text_frame_bytes(4, "TYER", "1999"),
            text_frame_bytes(4, "TDAT", "1225"),
        ],
        0,
    );
    let tag = parse(&data);
    assert_eq!(tag.frames().len(), 2);
}

#[test]
fn v3_unsynchronized_read_test() {
    let mut body = frame_bytes(3, "PRIV", 0x00, 0x00, &[0xFF, 0x00, 0xFF, 0xE2, 0x01]);
    body.extend(text_frame_bytes(3, "TIT2", "title"));
    let stuffed = unsynch(&body);
    assert_ne!(stuffed.len(), body.len());

    let mut data = b"ID3\x03\x00\x80".to_vec();
    data.extend_from_slice(&encode_synch_int(stuffed.len() as u32));
    data.extend_from_slice(&stuffed);

    let tag = parse(&data);
    assert!(tag.header().is_unsynchronized());
    assert_eq!(tag.frames().len(), 2);
    assert_eq!(tag.frames_by_id("PRIV")[0].size(), 5);
    assert_eq!(tag.frames_by_id("TIT2")[0].text().unwrap(), "title");
}

#[test]
fn v4_frame_unsynchronization_test() {
    let stuffed = unsynch(&[0xFF, 0x00, 0x01]);
    let frame = frame_bytes(4, "PRIV", 0x00, 0b0000_0010, &stuffed);
    let data = tag_bytes(4, 0, &[frame, text_frame_bytes(4, "TIT2", "x")], 0);
    let tag = parse(&data);
    assert_eq!(tag.frames().len(), 2);
    // the stuffed body came back out at its original size
    assert_eq!(tag.frames_by_id("PRIV")[0].size(), 3);
}

#[test]
fn extended_header_read_test() {
    let ext = vec![0x00, 0x00, 0x00, 0x06, 0x01, 0x00];
    let mut region = ext.clone();
    region.extend(text_frame_bytes(4, "TIT2", "x"));

    let mut data = b"ID3\x04\x00\x40".to_vec();
    data.extend_from_slice(&encode_synch_int(region.len() as u32));
    data.extend_from_slice(&region);

    let mut tag = parse(&data);
    assert_eq!(tag.extended_header().map(|e| e.size()), Some(6));
    assert_eq!(tag.frames().len(), 1);

    // rendering never writes the extended header back
    let rendered = tag.render(&Config::default()).unwrap();
    let reparsed = parse(&rendered);
    assert!(!reparsed.header().has_extended_header());
    assert!(reparsed.extended_header().is_none());
    assert_eq!(reparsed.frames().len(), 1);
}

#[test]
fn render_fresh_tag_test() {
    let mut tag = Tag::new();
    tag.add_frame(Box::new(TextFrame::new("TIT2", "Test Name", Encoding::Utf8)));
    let config = Config::default();
    let data = tag.render(&config).unwrap();

    // fresh tags pad with a whole block
    let frame_len = tag.frames()[0].render(4).unwrap().len();
    assert_eq!(data.len(), 10 + frame_len + 1024);

    let reparsed = Tag::read(&mut Cursor::new(&data), 0, ReadStyle::Normal).unwrap();
    assert_eq!(reparsed.frames().len(), 1);
    assert_eq!(reparsed.frames()[0].text().unwrap(), "Test Name");
    assert_eq!(reparsed.header().tag_size() as usize, data.len() - 10);
}

#[test]
fn render_padding_reuse_test() {
    let data = tag_bytes(3, 0, &[text_frame_bytes(3, "TIT2", "Test")], 1900);
    let mut tag = parse(&data);
    let old_size = tag.header().tag_size();

    let rendered = tag.render(&Config::default()).unwrap();
    // the new frame data is smaller, so the old size is reused
    assert_eq!(rendered.len() as u32, 10 + old_size);
    assert_eq!(tag.header().tag_size(), old_size);

    // and rendering again changes nothing
    let again = tag.render(&Config::default()).unwrap();
    assert_eq!(again, rendered);
}

#[test]
fn render_padding_grow_test() {
    let data = tag_bytes(4, 0, &[text_frame_bytes(4, "TIT2", "Test")], 0);
    let mut tag = parse(&data);
    let talb = "A".repeat(100);
    tag.add_frame(Box::new(TextFrame::new("TALB", &talb, Encoding::Utf8)));

    let rendered = tag.render(&Config::default()).unwrap();
    // 16 bytes of TIT2, 112 of TALB, one full block of padding
    assert_eq!(rendered.len() - 10, 16 + 112 + 1024);
}

#[test]
fn render_with_footer_test() {
    let mut tag = Tag::new();
    tag.header_mut().set_footer_present(true).unwrap();
    tag.add_frame(Box::new(TextFrame::new("TIT2", "Streamed", Encoding::Utf8)));
    let data = tag.render(&Config::default()).unwrap();

    // no padding; the footer mirrors the header at the tail
    let frame_len = tag.frames()[0].render(4).unwrap().len();
    assert_eq!(data.len(), 10 + frame_len + 10);
    assert_eq!(&data[data.len() - 10..data.len() - 7], b"3DI");

    let tag2 = Tag::read_from_footer(
        &mut Cursor::new(&data),
        data.len() as u64,
        ReadStyle::Normal,
    )
    .unwrap();
    assert_eq!(tag2.frames().len(), 1);
    assert_eq!(tag2.frames()[0].text().unwrap(), "Streamed");
}

#[test]
fn render_drops_flagged_frames_test() {
    let doomed = frame_bytes(3, "TOWN", 0b1000_0000, 0x00, &[0x03, b'x', 0x00]);
    let data = tag_bytes(3, 0, &[doomed, text_frame_bytes(3, "TIT2", "stay")], 0);
    let mut tag = parse(&data);
    assert_eq!(tag.frames().len(), 2);

    let rendered = tag.render(&Config::default()).unwrap();
    let reparsed = parse(&rendered);
    assert_eq!(reparsed.frames().len(), 1);
    assert_eq!(reparsed.frames()[0].id(), "TIT2");
}

#[test]
fn render_unsynchronized_v3_test() {
    let data = tag_bytes(
        3,
        0,
        &[frame_bytes(3, "PRIV", 0x00, 0x00, &[0xFF, 0xE1, 0xFF, 0x00])],
        1500,
    );
    let mut tag = parse(&data);
    tag.header_mut().set_unsynchronized(true);

    let rendered = tag.render(&Config::default()).unwrap();
    let reparsed = parse(&rendered);
    assert!(reparsed.header().is_unsynchronized());
    assert_eq!(reparsed.frames_by_id("PRIV")[0].size(), 4);
}

#[test]
fn render_unsynchronized_v4_test() {
    let data = tag_bytes(4, 0, &[frame_bytes(4, "PRIV", 0x00, 0x00, &[0xFF, 0xE1, 0x01])], 0);
    let mut tag = parse(&data);
    tag.header_mut().set_unsynchronized(true);

    let rendered = tag.render(&Config::default()).unwrap();
    // stuffing is per frame for v2.4, marked in the frame's own flags
    assert_eq!(rendered[19] & 0b0000_0010, 0b0000_0010);

    let reparsed = parse(&rendered);
    assert!(reparsed.header().is_unsynchronized());
    assert_eq!(reparsed.frames_by_id("PRIV")[0].size(), 3);
}

#[test]
fn v3_to_v4_render_test() {
    let data = tag_bytes(3, 0, &[text_frame_bytes(3, "TIT2", "Test")], 0);
    let mut tag = parse(&data);
    let config = Config {
        force_default_version: true,
        ..Default::default()
    };
    assert_eq!(tag.version(&config), 4);

    let rendered = tag.render(&config).unwrap();
    let reparsed = parse(&rendered);
    assert_eq!(reparsed.header().major_version(), 4);
    assert_eq!(reparsed.frames()[0].text().unwrap(), "Test");
}

#[test]
fn v2_render_upgrades_test() {
    let data = tag_bytes(
        2,
        0,
        &[
            text_frame_bytes(2, "TT2", "old"),
            frame_bytes(2, "XYZ", 0x00, 0x00, &[0x01, 0x02, 0x03]),
        ],
        0,
    );
    let mut tag = parse(&data);
    assert_eq!(tag.frames().len(), 2);

    let rendered = tag.render(&Config::default()).unwrap();
    let reparsed = parse(&rendered);
    // upgraded text survives; the unknown three-character frame has no
    // v2.4 representation and is left out
    assert_eq!(reparsed.header().major_version(), 4);
    assert_eq!(reparsed.frames().len(), 1);
    assert_eq!(reparsed.frames()[0].id(), "TIT2");
    assert_eq!(reparsed.frames()[0].text().unwrap(), "old");
}

#[test]
fn lazy_and_eager_agree_test() {
    let frames = vec![
        text_frame_bytes(4, "TIT2", "Test Name"),
        frame_bytes(4, "PRIV", 0x00, 0x00, &vec![0xAB; 1200]),
        text_frame_bytes(4, "TALB", "Test Album"),
    ];
    let data = tag_bytes(4, 0, &frames, 300);

    let lazy = Tag::read(&mut Cursor::new(&data), 0, ReadStyle::Normal).unwrap();
    let eager = Tag::read(&mut Cursor::new(&data), 0, ReadStyle::LazyPictures).unwrap();
    assert_eq!(lazy.frames().len(), 3);
    assert_eq!(eager.frames().len(), 3);
    for (a, b) in lazy.frames().iter().zip(eager.frames()) {
        assert_eq!(a.id(), b.id());
        assert_eq!(a.size(), b.size());
    }
}

#[test]
fn frame_mutation_test() {
    let mut tag = Tag::new();
    tag.add_frame(Box::new(TextFrame::new("TIT2", "one", Encoding::Utf8)));
    tag.add_frame(Box::new(TextFrame::new("TPE1", "two", Encoding::Utf8)));

    tag.replace_frame(Box::new(TextFrame::new("TIT2", "three", Encoding::Utf8)));
    assert_eq!(tag.frames().len(), 2);
    assert_eq!(tag.frames()[0].text().unwrap(), "three");

    let removed = tag.remove_frame(1).unwrap();
    assert_eq!(removed.id(), "TPE1");
    assert!(tag.remove_frame(5).is_none());

    tag.add_frame(Box::new(TextFrame::new("TPE1", "again", Encoding::Utf8)));
    tag.remove_frames("TPE1");
    assert_eq!(tag.frames().len(), 1);
}

#[test]
fn copy_to_test() {
    let mut a = Tag::new();
    a.add_frame(Box::new(TextFrame::new("TIT2", "copied", Encoding::Utf8)));

    let mut b = Tag::new();
    b.add_frame(Box::new(TextFrame::new("TALB", "doomed", Encoding::Utf8)));
    a.copy_to(&mut b, true);
    assert_eq!(b.frames().len(), 1);
    assert_eq!(b.frames()[0].text().unwrap(), "copied");

    let mut c = Tag::new();
    c.add_frame(Box::new(TextFrame::new("TALB", "kept", Encoding::Utf8)));
    a.copy_to(&mut c, false);
    assert_eq!(c.frames().len(), 2);
}

#[test]
fn performers_role_test() {
    let mut tag = Tag::new();
    let mut frame = TextFrame::new("TMCL", "", Encoding::Utf8);
    frame.set_values(vec![
        "violin".to_string(),
        "Alice".to_string(),
        "cello".to_string(),
        "Bob".to_string(),
    ]);
    tag.add_frame(Box::new(frame));

    assert_eq!(tag.performers_role().len(), 2);
    assert_eq!(
        tag.performers_role()[0],
        ("violin".to_string(), "Alice".to_string())
    );

    // mutation invalidates the cache
    tag.remove_frames("TMCL");
    assert!(tag.performers_role().is_empty());
}

#[test]
fn comment_accessor_test() {
    let config = Config::default();
    let mut tag = Tag::new();
    assert_eq!(tag.comment(), None);

    tag.set_comment(Some("Test Comments"), &config);
    assert_eq!(tag.comment().unwrap(), "Test Comments");

    // a second set updates the existing frame instead of stacking another
    tag.set_comment(Some("Updated"), &config);
    assert_eq!(tag.frames_by_id("COMM").len(), 1);
    assert_eq!(tag.comment().unwrap(), "Updated");

    tag.set_comment(None, &config);
    assert!(tag.comment().is_none());

    tag.set_lyrics(Some("la la la"), &config);
    assert_eq!(tag.lyrics().unwrap(), "la la la");
    tag.set_lyrics(Some(""), &config);
    assert!(tag.lyrics().is_none());
}

#[test]
fn comment_round_trip_test() {
    let config = Config::default();
    let mut tag = Tag::new();
    tag.set_comment(Some("Test Comments"), &config);

    let rendered = tag.render(&config).unwrap();
    let reparsed = parse(&rendered);
    assert_eq!(reparsed.comment().unwrap(), "Test Comments");
}
