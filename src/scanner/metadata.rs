//! Duration extraction for video files.
//!
//! Only container headers are read: the MP4/QuickTime `mvhd` box and the
//! Matroska/WebM segment `Info` element. Anything else yields `None` and the
//! player reports the real duration at playback time.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{debug, trace};

/// Bytes scanned at the start of a Matroska file.
const MATROSKA_HEAD_BYTES: usize = 64 * 1024;

/// Matroska default TimecodeScale (1ms in nanoseconds).
const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

/// Upper bound on MP4 boxes visited before giving up.
const MAX_MP4_BOXES: usize = 4096;

const EBML_DURATION: [u8; 2] = [0x44, 0x89];
const EBML_TIMECODE_SCALE: [u8; 3] = [0x2A, 0xD7, 0xB1];

/// Reads video durations from container headers.
pub struct DurationProbe;

impl DurationProbe {
    /// Duration in milliseconds, or `None` when it cannot be determined.
    pub fn probe(path: &Path) -> Option<u64> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let result = match ext.as_str() {
            "mp4" | "m4v" | "mov" | "3gp" => Self::probe_mp4(path),
            "mkv" | "webm" => Self::probe_matroska(path),
            _ => {
                trace!("No duration parser for {:?}", path);
                return None;
            }
        };

        match result {
            Ok(duration) => duration,
            Err(e) => {
                debug!("Could not read duration of {:?}: {:#}", path, e);
                None
            }
        }
    }

    fn probe_mp4(path: &Path) -> Result<Option<u64>> {
        let file = File::open(path).context("Failed to open video file")?;
        let len = file.metadata()?.len();
        mp4_duration_ms(&mut BufReader::new(file), len)
    }

    fn probe_matroska(path: &Path) -> Result<Option<u64>> {
        let file = File::open(path).context("Failed to open video file")?;
        let mut buffer = Vec::with_capacity(MATROSKA_HEAD_BYTES);
        file.take(MATROSKA_HEAD_BYTES as u64)
            .read_to_end(&mut buffer)?;
        Ok(matroska_duration_ms(&buffer))
    }
}

/// Walks top-level boxes to `moov/mvhd` and converts its duration.
pub fn mp4_duration_ms<R: Read + Seek>(reader: &mut R, len: u64) -> Result<Option<u64>> {
    let Some((moov_start, moov_end)) = find_box(reader, 0, len, b"moov")? else {
        return Ok(None);
    };
    let Some((mvhd_start, mvhd_end)) = find_box(reader, moov_start, moov_end, b"mvhd")? else {
        return Ok(None);
    };

    reader.seek(SeekFrom::Start(mvhd_start))?;
    let mut version = [0u8; 4];
    reader.read_exact(&mut version)?;

    let (timescale, duration) = if version[0] == 1 {
        if mvhd_end - mvhd_start < 32 {
            bail!("mvhd v1 too short");
        }
        reader.seek(SeekFrom::Current(16))?;
        let timescale = read_u32(reader)? as u64;
        let duration = read_u64(reader)?;
        (timescale, duration)
    } else {
        if mvhd_end - mvhd_start < 20 {
            bail!("mvhd v0 too short");
        }
        reader.seek(SeekFrom::Current(8))?;
        let timescale = read_u32(reader)? as u64;
        let duration = read_u32(reader)? as u64;
        (timescale, duration)
    };

    if timescale == 0 || duration == u64::MAX || duration == u32::MAX as u64 {
        return Ok(None);
    }
    Ok(Some(duration.saturating_mul(1000) / timescale))
}

/// Returns the payload range of the first `kind` box within `start..end`.
fn find_box<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    end: u64,
    kind: &[u8; 4],
) -> Result<Option<(u64, u64)>> {
    let mut pos = start;
    for _ in 0..MAX_MP4_BOXES {
        if pos + 8 > end {
            return Ok(None);
        }
        reader.seek(SeekFrom::Start(pos))?;
        let size = read_u32(reader)? as u64;
        let mut box_type = [0u8; 4];
        reader.read_exact(&mut box_type)?;

        let (header, box_size) = match size {
            0 => (8, end - pos),
            1 => (16, read_u64(reader)?),
            n => (8, n),
        };
        if box_size < header {
            bail!("invalid box size {} at offset {}", box_size, pos);
        }

        let box_end = pos.saturating_add(box_size).min(end);
        if pos + header > box_end {
            bail!("truncated {:?} box header at offset {}", box_type, pos);
        }
        if &box_type == kind {
            return Ok(Some((pos + header, box_end)));
        }
        pos = box_end;
    }
    Ok(None)
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

/// Searches the head of a Matroska file for `Info/Duration`.
///
/// This is a pattern search rather than a full EBML parse, which is enough
/// for files that put segment info before the clusters (all muxers we know).
pub fn matroska_duration_ms(buffer: &[u8]) -> Option<u64> {
    let scale = find_element(buffer, &EBML_TIMECODE_SCALE)
        .and_then(|data| read_ebml_uint(data))
        .filter(|&scale| scale > 0)
        .unwrap_or(DEFAULT_TIMECODE_SCALE);

    let duration = find_element(buffer, &EBML_DURATION).and_then(read_ebml_float)?;
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    Some((duration * scale as f64 / 1_000_000.0).round() as u64)
}

/// Locates an element by id and returns its data bytes.
fn find_element<'a>(buffer: &'a [u8], id: &[u8]) -> Option<&'a [u8]> {
    let mut i = 0;
    while i + id.len() < buffer.len() {
        if &buffer[i..i + id.len()] == id {
            let size_start = i + id.len();
            if let Some((size, width)) = read_vint(&buffer[size_start..]) {
                let data_start = size_start + width;
                let data_end = data_start.checked_add(size as usize)?;
                if size > 0 && size <= 8 && data_end <= buffer.len() {
                    return Some(&buffer[data_start..data_end]);
                }
            }
        }
        i += 1;
    }
    None
}

/// Decodes an EBML variable-length size, returning (value, width).
fn read_vint(data: &[u8]) -> Option<(u64, usize)> {
    let first = *data.first()?;
    if first == 0 {
        return None;
    }
    let width = first.leading_zeros() as usize + 1;
    if data.len() < width {
        return None;
    }
    let mut value = (first as u64) & ((1u64 << (8 - width)) - 1);
    for &byte in &data[1..width] {
        value = (value << 8) | byte as u64;
    }
    Some((value, width))
}

fn read_ebml_uint(data: &[u8]) -> Option<u64> {
    if data.is_empty() || data.len() > 8 {
        return None;
    }
    Some(data.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

fn read_ebml_float(data: &[u8]) -> Option<f64> {
    match data.len() {
        4 => Some(f32::from_be_bytes(data.try_into().ok()?) as f64),
        8 => Some(f64::from_be_bytes(data.try_into().ok()?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn mp4_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(payload);
        out
    }

    fn mvhd_v0(timescale: u32, duration: u32) -> Vec<u8> {
        let mut payload = vec![0u8; 4]; // version + flags
        payload.extend_from_slice(&[0u8; 8]); // creation + modification
        payload.extend_from_slice(&timescale.to_be_bytes());
        payload.extend_from_slice(&duration.to_be_bytes());
        payload.extend_from_slice(&[0u8; 80]);
        mp4_box(b"mvhd", &payload)
    }

    #[test]
    fn test_mp4_duration_v0() {
        let mut file = mp4_box(b"ftyp", b"isom\0\0\0\0");
        let mut moov_payload = mp4_box(b"udta", &[0u8; 4]);
        moov_payload.extend(mvhd_v0(1000, 90_500));
        file.extend(mp4_box(b"moov", &moov_payload));
        file.extend(mp4_box(b"mdat", &[0u8; 32]));

        let len = file.len() as u64;
        let duration = mp4_duration_ms(&mut Cursor::new(file), len).unwrap();
        assert_eq!(duration, Some(90_500));
    }

    #[test]
    fn test_mp4_duration_v1() {
        let mut payload = vec![1u8, 0, 0, 0];
        payload.extend_from_slice(&[0u8; 16]);
        payload.extend_from_slice(&600u32.to_be_bytes());
        payload.extend_from_slice(&(600u64 * 42).to_be_bytes());
        let file = mp4_box(b"moov", &mp4_box(b"mvhd", &payload));

        let len = file.len() as u64;
        let duration = mp4_duration_ms(&mut Cursor::new(file), len).unwrap();
        assert_eq!(duration, Some(42_000));
    }

    #[test]
    fn test_mp4_without_moov() {
        let file = mp4_box(b"ftyp", b"isom");
        let len = file.len() as u64;
        assert_eq!(mp4_duration_ms(&mut Cursor::new(file), len).unwrap(), None);
    }

    #[test]
    fn test_mp4_truncated_largesize_box() {
        // mvhd claims a 64-bit size but moov ends inside its header
        let mut file = 16u32.to_be_bytes().to_vec();
        file.extend_from_slice(b"moov");
        file.extend_from_slice(&1u32.to_be_bytes());
        file.extend_from_slice(b"mvhd");
        file.extend_from_slice(&64u64.to_be_bytes());
        file.extend_from_slice(&[0u8; 32]);

        let len = file.len() as u64;
        assert!(mp4_duration_ms(&mut Cursor::new(file), len).is_err());
    }

    #[test]
    fn test_matroska_duration_default_scale() {
        let mut head = vec![0x1A, 0x45, 0xDF, 0xA3, 0x80];
        head.extend_from_slice(&EBML_DURATION);
        head.push(0x88); // size 8
        head.extend_from_slice(&12_345.0f64.to_be_bytes());
        assert_eq!(matroska_duration_ms(&head), Some(12_345));
    }

    #[test]
    fn test_matroska_duration_custom_scale() {
        let mut head = Vec::new();
        head.extend_from_slice(&EBML_TIMECODE_SCALE);
        head.push(0x83); // size 3
        head.extend_from_slice(&[0x0F, 0x42, 0x40]); // 1_000_000
        head.extend_from_slice(&EBML_DURATION);
        head.push(0x84); // size 4
        head.extend_from_slice(&2_000.0f32.to_be_bytes());
        head.push(0x00);
        assert_eq!(matroska_duration_ms(&head), Some(2_000));
    }

    #[test]
    fn test_read_vint() {
        assert_eq!(read_vint(&[0x81]), Some((1, 1)));
        assert_eq!(read_vint(&[0x40, 0x02]), Some((2, 2)));
        assert_eq!(read_vint(&[0x00]), None);
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(DurationProbe::probe(Path::new("/nope/clip.avi")), None);
    }
}
