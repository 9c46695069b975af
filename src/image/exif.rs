//! JPEG segment walking and a minimal TIFF/IFD reader.
//!
//! Covers what the cleaning pipeline needs from Exif: the orientation
//! flag from IFD0, the embedded thumbnail from IFD1, a JSON dump of
//! IFD0, the Exif and GPS sub-IFDs, and IFD1, and a rewrite that
//! drops the Exif APP1 while keeping the orientation of rotated
//! images.

use std::collections::BTreeMap;

use super::errors::{ImageError, ImageResult};

/// First two bytes of every JPEG
pub const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];

const APP1: u8 = 0xE1;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;

const EXIF_HEADER: &[u8] = b"Exif\0\0";

const ORIENTATION_TAG: u16 = 0x0112;
const EXIF_POINTER_TAG: u16 = 0x8769;
const GPS_POINTER_TAG: u16 = 0x8825;
const THUMBNAIL_OFFSET_TAG: u16 = 0x0201;
const THUMBNAIL_LENGTH_TAG: u16 = 0x0202;

// TIFF field types
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;
const TYPE_SLONG: u16 = 9;
const TYPE_SRATIONAL: u16 = 10;

/// What one tag decoded to
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Text(String),
    Bytes(Vec<u8>),
    Number(i64),
    Numbers(Vec<i64>),
    Rational(i64, i64),
    Rationals(Vec<(i64, i64)>),
}

impl TagValue {
    /// JSON rendering: text as strings, numbers as numbers, rationals
    /// as `[num, den]`, raw bytes as UTF-8 where possible and a fixed
    /// placeholder otherwise.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(text) => serde_json::Value::from(text.as_str()),
            Self::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => serde_json::Value::from(text),
                Err(_) => serde_json::Value::from("XXXXXXXXX"),
            },
            Self::Number(n) => serde_json::Value::from(*n),
            Self::Numbers(ns) => serde_json::Value::from(ns.clone()),
            Self::Rational(num, den) => serde_json::json!([num, den]),
            Self::Rationals(pairs) => serde_json::Value::Array(
                pairs
                    .iter()
                    .map(|(num, den)| serde_json::json!([num, den]))
                    .collect(),
            ),
        }
    }
}

type TagMap = BTreeMap<u16, TagValue>;

/// Decoded Exif payload of one image
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExifData {
    pub zeroth: TagMap,
    pub exif: TagMap,
    pub gps: TagMap,
    pub first: TagMap,
    pub thumbnail: Option<Vec<u8>>,
}

impl ExifData {
    /// Orientation flag from IFD0; 1 (upright) when absent
    pub fn orientation(&self) -> u16 {
        match self.zeroth.get(&ORIENTATION_TAG) {
            Some(TagValue::Number(n)) => u16::try_from(*n).unwrap_or(1),
            Some(TagValue::Numbers(ns)) => ns
                .first()
                .and_then(|n| u16::try_from(*n).ok())
                .unwrap_or(1),
            _ => 1,
        }
    }

    /// True when the orientation flag says the image is rotated
    pub fn rotated(&self) -> bool {
        self.orientation() > 1
    }

    pub fn is_empty(&self) -> bool {
        self.zeroth.is_empty()
            && self.exif.is_empty()
            && self.gps.is_empty()
            && self.first.is_empty()
            && self.thumbnail.is_none()
    }

    /// Dump every IFD except the thumbnail bytes, keyed the way the
    /// artifact consumers expect: `0th`, `Exif`, `GPS`, `1st`, with
    /// numeric tag ids as string keys.
    pub fn to_json(&self) -> serde_json::Value {
        fn ifd_json(tags: &TagMap) -> serde_json::Value {
            let map: serde_json::Map<String, serde_json::Value> = tags
                .iter()
                .map(|(tag, value)| (tag.to_string(), value.to_json()))
                .collect();
            serde_json::Value::Object(map)
        }

        serde_json::json!({
            "0th": ifd_json(&self.zeroth),
            "Exif": ifd_json(&self.exif),
            "GPS": ifd_json(&self.gps),
            "1st": ifd_json(&self.first),
        })
    }
}

fn ensure_jpeg(data: &[u8]) -> ImageResult<()> {
    if data.len() < 2 || data[0..2] != JPEG_MAGIC {
        return Err(ImageError::NotAJpeg);
    }
    Ok(())
}

/// One marker segment; `end` is one past the payload. The SOS segment
/// swallows the entropy-coded rest of the stream.
struct Segment {
    marker: u8,
    start: usize,
    end: usize,
}

impl Segment {
    fn is_exif(&self, data: &[u8]) -> bool {
        self.marker == APP1
            && self.end >= self.start + 10
            && &data[self.start + 4..self.start + 10] == EXIF_HEADER
    }
}

fn scan_segments(data: &[u8]) -> ImageResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut pos = 2;

    while pos + 2 <= data.len() {
        if data[pos] != 0xFF {
            return Err(ImageError::Malformed("expected segment marker"));
        }
        let marker = data[pos + 1];
        if marker == 0xFF {
            // fill byte
            pos += 1;
            continue;
        }
        if marker == SOS {
            segments.push(Segment {
                marker,
                start: pos,
                end: data.len(),
            });
            break;
        }
        if marker == EOI {
            segments.push(Segment {
                marker,
                start: pos,
                end: pos + 2,
            });
            break;
        }
        if pos + 4 > data.len() {
            return Err(ImageError::Malformed("truncated segment header"));
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if length < 2 || pos + 2 + length > data.len() {
            return Err(ImageError::Malformed("segment length out of bounds"));
        }
        segments.push(Segment {
            marker,
            start: pos,
            end: pos + 2 + length,
        });
        pos += 2 + length;
    }
    Ok(segments)
}

/// Endian-aware view over one TIFF block
struct Tiff<'a> {
    data: &'a [u8],
    little_endian: bool,
}

impl<'a> Tiff<'a> {
    fn parse(data: &'a [u8]) -> ImageResult<Self> {
        if data.len() < 8 {
            return Err(ImageError::Malformed("truncated TIFF header"));
        }
        let little_endian = match &data[0..2] {
            b"II" => true,
            b"MM" => false,
            _ => return Err(ImageError::Malformed("unknown TIFF byte order")),
        };
        let tiff = Self {
            data,
            little_endian,
        };
        if tiff.u16_at(2)? != 42 {
            return Err(ImageError::Malformed("bad TIFF magic"));
        }
        Ok(tiff)
    }

    fn bytes_at(&self, offset: usize, len: usize) -> ImageResult<&'a [u8]> {
        let end = offset
            .checked_add(len)
            .ok_or(ImageError::Malformed("TIFF offset overflow"))?;
        if end > self.data.len() {
            return Err(ImageError::Malformed("TIFF read out of bounds"));
        }
        Ok(&self.data[offset..end])
    }

    fn u16_at(&self, offset: usize) -> ImageResult<u16> {
        let bytes = self.bytes_at(offset, 2)?;
        let raw = [bytes[0], bytes[1]];
        Ok(if self.little_endian {
            u16::from_le_bytes(raw)
        } else {
            u16::from_be_bytes(raw)
        })
    }

    fn u32_at(&self, offset: usize) -> ImageResult<u32> {
        let bytes = self.bytes_at(offset, 4)?;
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        Ok(if self.little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        })
    }

    fn type_size(kind: u16) -> usize {
        match kind {
            TYPE_SHORT => 2,
            TYPE_LONG | TYPE_SLONG => 4,
            TYPE_RATIONAL | TYPE_SRATIONAL => 8,
            _ => 1,
        }
    }

    fn entry(&self, offset: usize) -> ImageResult<(u16, TagValue)> {
        let tag = self.u16_at(offset)?;
        let kind = self.u16_at(offset + 2)?;
        let count = self.u32_at(offset + 4)? as usize;
        let size = Self::type_size(kind)
            .checked_mul(count)
            .ok_or(ImageError::Malformed("tag count overflow"))?;
        let data_offset = if size <= 4 {
            offset + 8
        } else {
            self.u32_at(offset + 8)? as usize
        };
        let raw = self.bytes_at(data_offset, size)?;
        Ok((tag, self.decode(kind, count, raw)))
    }

    fn decode(&self, kind: u16, count: usize, raw: &[u8]) -> TagValue {
        let u16_of = |chunk: &[u8]| {
            let bytes = [chunk[0], chunk[1]];
            if self.little_endian {
                u16::from_le_bytes(bytes)
            } else {
                u16::from_be_bytes(bytes)
            }
        };
        let u32_of = |chunk: &[u8]| {
            let bytes = [chunk[0], chunk[1], chunk[2], chunk[3]];
            if self.little_endian {
                u32::from_le_bytes(bytes)
            } else {
                u32::from_be_bytes(bytes)
            }
        };

        match kind {
            TYPE_ASCII => match std::str::from_utf8(raw) {
                Ok(text) => TagValue::Text(text.trim_end_matches('\0').to_string()),
                Err(_) => TagValue::Bytes(raw.to_vec()),
            },
            TYPE_SHORT => {
                let numbers: Vec<i64> =
                    raw.chunks_exact(2).map(|c| i64::from(u16_of(c))).collect();
                Self::collapse(numbers, count)
            }
            TYPE_LONG => {
                let numbers: Vec<i64> =
                    raw.chunks_exact(4).map(|c| i64::from(u32_of(c))).collect();
                Self::collapse(numbers, count)
            }
            TYPE_SLONG => {
                let numbers: Vec<i64> = raw
                    .chunks_exact(4)
                    .map(|c| i64::from(u32_of(c) as i32))
                    .collect();
                Self::collapse(numbers, count)
            }
            TYPE_RATIONAL => {
                let pairs: Vec<(i64, i64)> = raw
                    .chunks_exact(8)
                    .map(|c| (i64::from(u32_of(&c[0..4])), i64::from(u32_of(&c[4..8]))))
                    .collect();
                Self::collapse_rationals(pairs, count)
            }
            TYPE_SRATIONAL => {
                let pairs: Vec<(i64, i64)> = raw
                    .chunks_exact(8)
                    .map(|c| {
                        (
                            i64::from(u32_of(&c[0..4]) as i32),
                            i64::from(u32_of(&c[4..8]) as i32),
                        )
                    })
                    .collect();
                Self::collapse_rationals(pairs, count)
            }
            _ => TagValue::Bytes(raw.to_vec()),
        }
    }

    fn collapse(mut numbers: Vec<i64>, count: usize) -> TagValue {
        if count == 1 && numbers.len() == 1 {
            TagValue::Number(numbers.remove(0))
        } else {
            TagValue::Numbers(numbers)
        }
    }

    fn collapse_rationals(mut pairs: Vec<(i64, i64)>, count: usize) -> TagValue {
        if count == 1 && pairs.len() == 1 {
            let (num, den) = pairs.remove(0);
            TagValue::Rational(num, den)
        } else {
            TagValue::Rationals(pairs)
        }
    }

    /// Read one IFD; returns its tags and the offset of the next IFD
    fn ifd(&self, offset: usize) -> ImageResult<(TagMap, usize)> {
        let count = self.u16_at(offset)? as usize;
        let mut tags = TagMap::new();
        for index in 0..count {
            let (tag, value) = self.entry(offset + 2 + index * 12)?;
            tags.insert(tag, value);
        }
        let next = self.u32_at(offset + 2 + count * 12)? as usize;
        Ok((tags, next))
    }
}

fn pointer_offset(tags: &TagMap, tag: u16) -> Option<usize> {
    match tags.get(&tag) {
        Some(TagValue::Number(n)) => usize::try_from(*n).ok(),
        _ => None,
    }
}

/// Decode the Exif payload of a JPEG. An image without an Exif APP1
/// decodes to empty data.
///
/// # Errors
///
/// `NotAJpeg` when the magic bytes are wrong, `Malformed` when the
/// segment stream or TIFF block is inconsistent.
pub fn parse(data: &[u8]) -> ImageResult<ExifData> {
    ensure_jpeg(data)?;
    let segments = scan_segments(data)?;
    let Some(segment) = segments.iter().find(|s| s.is_exif(data)) else {
        return Ok(ExifData::default());
    };

    let tiff = Tiff::parse(&data[segment.start + 10..segment.end])?;
    let mut decoded = ExifData::default();

    let ifd0_offset = tiff.u32_at(4)? as usize;
    let (zeroth, next) = tiff.ifd(ifd0_offset)?;

    if let Some(offset) = pointer_offset(&zeroth, EXIF_POINTER_TAG) {
        decoded.exif = tiff.ifd(offset)?.0;
    }
    if let Some(offset) = pointer_offset(&zeroth, GPS_POINTER_TAG) {
        decoded.gps = tiff.ifd(offset)?.0;
    }
    decoded.zeroth = zeroth;

    if next != 0 {
        let (first, _) = tiff.ifd(next)?;
        if let (Some(offset), Some(length)) = (
            pointer_offset(&first, THUMBNAIL_OFFSET_TAG),
            pointer_offset(&first, THUMBNAIL_LENGTH_TAG),
        ) {
            decoded.thumbnail = Some(tiff.bytes_at(offset, length)?.to_vec());
        }
        decoded.first = first;
    }

    Ok(decoded)
}

/// Minimal APP1 holding only the orientation flag, little-endian
fn orientation_app1(orientation: u16) -> Vec<u8> {
    let mut segment = Vec::with_capacity(36);
    segment.extend_from_slice(&[0xFF, APP1, 0x00, 0x22]);
    segment.extend_from_slice(EXIF_HEADER);
    segment.extend_from_slice(b"II");
    segment.extend_from_slice(&42u16.to_le_bytes());
    segment.extend_from_slice(&8u32.to_le_bytes());
    segment.extend_from_slice(&1u16.to_le_bytes());
    segment.extend_from_slice(&ORIENTATION_TAG.to_le_bytes());
    segment.extend_from_slice(&TYPE_SHORT.to_le_bytes());
    segment.extend_from_slice(&1u32.to_le_bytes());
    segment.extend_from_slice(&orientation.to_le_bytes());
    segment.extend_from_slice(&[0x00, 0x00]);
    segment.extend_from_slice(&0u32.to_le_bytes());
    segment
}

/// Rebuild the JPEG without its Exif APP1 segments. A rotated image
/// gets a minimal APP1 back holding only the orientation flag.
///
/// # Errors
///
/// Same conditions as [`parse`].
pub fn strip_preserving_orientation(data: &[u8]) -> ImageResult<Vec<u8>> {
    let orientation = parse(data)?.orientation();
    let segments = scan_segments(data)?;

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&JPEG_MAGIC);
    if orientation > 1 {
        out.extend_from_slice(&orientation_app1(orientation));
    }
    for segment in &segments {
        if segment.is_exif(data) {
            continue;
        }
        out.extend_from_slice(&data[segment.start..segment.end]);
    }
    Ok(out)
}
