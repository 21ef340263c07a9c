//! Minimal RIFF/WebP container reader.
//!
//! Only the chunk headers are parsed: canvas size, the animation flag and the duration
//! of every `ANMF` frame. Pixel data is never decoded.

use crate::error::AssetError;

const VP8X_ANIMATION_FLAG: u8 = 0x02;

/// Container facts needed to check a sticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebpInfo {
    pub width: u32,
    pub height: u32,
    pub animated: bool,
    /// Display duration of each animation frame in milliseconds. Empty for still images.
    pub frame_durations: Vec<u32>,
}

impl WebpInfo {
    pub fn still(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            animated: false,
            frame_durations: Vec::new(),
        }
    }

    pub fn frame_count(&self) -> usize {
        if self.animated {
            self.frame_durations.len()
        } else {
            1
        }
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.frame_durations.iter().map(|d| u64::from(*d)).sum()
    }
}

/// Parses the chunk headers of a WebP file.
pub fn inspect_webp(bytes: &[u8]) -> Result<WebpInfo, AssetError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WEBP" {
        return Err(malformed("missing RIFF/WEBP header"));
    }

    let mut canvas: Option<(u32, u32)> = None;
    let mut frame: Option<(u32, u32)> = None;
    let mut animated = false;
    let mut frame_durations = Vec::new();

    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let fourcc = &bytes[offset..offset + 4];
        let size = le_u32(&bytes[offset + 4..offset + 8]) as usize;
        let start = offset + 8;
        let end = start
            .checked_add(size)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| malformed("chunk runs past end of file"))?;
        let payload = &bytes[start..end];

        match fourcc {
            b"VP8X" => {
                if payload.len() < 10 {
                    return Err(malformed("short VP8X chunk"));
                }
                animated = payload[0] & VP8X_ANIMATION_FLAG != 0;
                canvas = Some((1 + le_u24(&payload[4..7]), 1 + le_u24(&payload[7..10])));
            }
            b"ANMF" => {
                if payload.len() < 16 {
                    return Err(malformed("short ANMF chunk"));
                }
                frame_durations.push(le_u24(&payload[12..15]));
            }
            b"VP8 " if frame.is_none() => frame = Some(vp8_dimensions(payload)?),
            b"VP8L" if frame.is_none() => frame = Some(vp8l_dimensions(payload)?),
            _ => {}
        }

        // Chunks are padded to an even size
        offset = end + (size & 1);
    }

    let (width, height) = canvas
        .or(frame)
        .ok_or_else(|| malformed("no image chunk"))?;
    if animated && frame_durations.is_empty() {
        return Err(malformed("animation flag set without frames"));
    }

    Ok(WebpInfo {
        width,
        height,
        animated,
        frame_durations,
    })
}

fn vp8_dimensions(payload: &[u8]) -> Result<(u32, u32), AssetError> {
    if payload.len() < 10 || payload[3..6] != [0x9d, 0x01, 0x2a] {
        return Err(malformed("bad VP8 frame header"));
    }
    let width = u32::from(u16::from_le_bytes([payload[6], payload[7]]) & 0x3fff);
    let height = u32::from(u16::from_le_bytes([payload[8], payload[9]]) & 0x3fff);
    Ok((width, height))
}

fn vp8l_dimensions(payload: &[u8]) -> Result<(u32, u32), AssetError> {
    if payload.len() < 5 || payload[0] != 0x2f {
        return Err(malformed("bad VP8L signature"));
    }
    let bits = le_u32(&payload[1..5]);
    Ok(((bits & 0x3fff) + 1, ((bits >> 14) & 0x3fff) + 1))
}

fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn le_u24(b: &[u8]) -> u32 {
    u32::from(b[0]) | (u32::from(b[1]) << 8) | (u32::from(b[2]) << 16)
}

fn malformed(msg: &str) -> AssetError {
    AssetError::MalformedWebp(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn chunk(fourcc: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = fourcc.to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn u24(v: u32) -> [u8; 3] {
        [v as u8, (v >> 8) as u8, (v >> 16) as u8]
    }

    fn riff(chunks: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = chunks.concat();
        let mut out = b"RIFF".to_vec();
        out.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
        out.extend_from_slice(b"WEBP");
        out.extend_from_slice(&body);
        out
    }

    fn animated(width: u32, height: u32, durations: &[u32]) -> Vec<u8> {
        let mut vp8x = vec![VP8X_ANIMATION_FLAG, 0, 0, 0];
        vp8x.extend_from_slice(&u24(width - 1));
        vp8x.extend_from_slice(&u24(height - 1));
        let mut chunks = vec![chunk(b"VP8X", &vp8x), chunk(b"ANIM", &[0; 6])];
        for d in durations {
            let mut anmf = vec![0u8; 12];
            anmf.extend_from_slice(&u24(*d));
            anmf.push(0);
            chunks.push(chunk(b"ANMF", &anmf));
        }
        riff(&chunks)
    }

    #[test]
    fn test_animated_container() {
        let info = inspect_webp(&animated(512, 512, &[40, 40, 100])).unwrap();
        assert!(info.animated);
        assert_eq!((info.width, info.height), (512, 512));
        assert_eq!(info.frame_count(), 3);
        assert_eq!(info.total_duration_ms(), 180);
    }

    #[test]
    fn test_still_image_from_encoder() {
        let img = RgbaImage::from_pixel(512, 256, Rgba([10, 20, 30, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::WebP).unwrap();

        let info = inspect_webp(buf.get_ref()).unwrap();
        assert!(!info.animated);
        assert_eq!((info.width, info.height), (512, 256));
        assert_eq!(info.frame_count(), 1);
    }

    #[test]
    fn test_lossy_frame_header() {
        let mut vp8 = vec![0, 0, 0, 0x9d, 0x01, 0x2a];
        vp8.extend_from_slice(&200u16.to_le_bytes());
        vp8.extend_from_slice(&100u16.to_le_bytes());
        let info = inspect_webp(&riff(&[chunk(b"VP8 ", &vp8)])).unwrap();
        assert_eq!(info, WebpInfo::still(200, 100));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(inspect_webp(b"GIF89a....").is_err());
        assert!(inspect_webp(&riff(&[chunk(b"EXIF", &[1, 2])])).is_err());

        let mut truncated = animated(512, 512, &[40]);
        truncated.truncate(truncated.len() - 4);
        assert!(inspect_webp(&truncated).is_err());
    }
}
