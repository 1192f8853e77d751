//! Minimal ID3v2 reader: just enough to pull the `TIT2` (title) frame out of
//! the first chunk of an mp3.

use super::html::collapse_whitespace;

const HEADER_LEN: usize = 10;
const FRAME_HEADER_LEN: usize = 10;
const TITLE_FRAME: &[u8; 4] = b"TIT2";

fn synchsafe(b: &[u8]) -> usize {
    ((b[0] as usize & 0x7F) << 21)
        | ((b[1] as usize & 0x7F) << 14)
        | ((b[2] as usize & 0x7F) << 7)
        | (b[3] as usize & 0x7F)
}

fn big_endian(b: &[u8]) -> usize {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize
}

/// Returns the whitespace-collapsed `TIT2` text, or `None` if the buffer
/// has no ID3v2 tag, no title frame, or an empty title.
pub fn read_title(data: &[u8]) -> Option<String> {
    if data.len() < HEADER_LEN || !data.starts_with(b"ID3") {
        return None;
    }

    let major_version = data[3];
    let tag_size = synchsafe(&data[6..10]);
    let tag_end = (HEADER_LEN + tag_size).min(data.len());
    let tag = &data[HEADER_LEN..tag_end];

    let mut offset = 0;
    while offset + FRAME_HEADER_LEN <= tag.len() {
        let frame_id = &tag[offset..offset + 4];
        if frame_id == [0, 0, 0, 0] {
            // padding
            break;
        }

        let size_bytes = &tag[offset + 4..offset + 8];
        let frame_size = if major_version >= 4 {
            synchsafe(size_bytes)
        } else {
            big_endian(size_bytes)
        };
        if frame_size == 0 {
            break;
        }

        let start = offset + FRAME_HEADER_LEN;
        let end = (start + frame_size).min(tag.len());
        if frame_id == TITLE_FRAME {
            return decode_text_frame(&tag[start..end]);
        }

        offset = start + frame_size;
    }

    None
}

fn decode_text_frame(payload: &[u8]) -> Option<String> {
    let (&encoding, text) = payload.split_first()?;

    let decoded = match encoding {
        0 => {
            let raw = text.split(|b| *b == 0).next().unwrap_or(&[]);
            raw.iter().map(|&b| b as char).collect::<String>()
        }
        1 => match text {
            [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, false),
            [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, true),
            _ => decode_utf16(text, false),
        },
        2 => decode_utf16(text, true),
        _ => String::from_utf8_lossy(text).into_owned(),
    };

    let first = decoded.split('\0').next().unwrap_or("");
    let cleaned = collapse_whitespace(first);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| {
            if big_endian {
                u16::from_be_bytes([c[0], c[1]])
            } else {
                u16::from_le_bytes([c[0], c[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_synchsafe(n: usize) -> [u8; 4] {
        [
            ((n >> 21) & 0x7F) as u8,
            ((n >> 14) & 0x7F) as u8,
            ((n >> 7) & 0x7F) as u8,
            (n & 0x7F) as u8,
        ]
    }

    fn frame(id: &[u8; 4], payload: &[u8], major: u8) -> Vec<u8> {
        let mut out = id.to_vec();
        if major >= 4 {
            out.extend_from_slice(&encode_synchsafe(payload.len()));
        } else {
            out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        }
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(payload);
        out
    }

    fn tag(major: u8, frames: &[Vec<u8>], padding: usize) -> Vec<u8> {
        let body: Vec<u8> = frames
            .iter()
            .flatten()
            .copied()
            .chain(std::iter::repeat(0).take(padding))
            .collect();
        let mut out = b"ID3".to_vec();
        out.extend_from_slice(&[major, 0, 0]);
        out.extend_from_slice(&encode_synchsafe(body.len()));
        out.extend_from_slice(&body);
        // audio data after the tag must be ignored
        out.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
        out
    }

    fn utf16(s: &str, big_endian: bool) -> Vec<u8> {
        s.encode_utf16()
            .flat_map(|u| {
                if big_endian {
                    u.to_be_bytes()
                } else {
                    u.to_le_bytes()
                }
            })
            .collect()
    }

    #[test]
    fn test_latin1_title() {
        let mut payload = vec![0u8];
        payload.extend_from_slice(b"  Caf\xe9   Shiur \0ignored");
        let data = tag(3, &[frame(b"TIT2", &payload, 3)], 16);
        assert_eq!(read_title(&data).as_deref(), Some("Café Shiur"));
    }

    #[test]
    fn test_utf16_with_bom_title() {
        let mut payload = vec![1u8, 0xFF, 0xFE];
        payload.extend(utf16("Hilchos  Shabbos\n", false));
        payload.extend_from_slice(&[0, 0]);
        let data = tag(3, &[frame(b"TIT2", &payload, 3)], 0);
        assert_eq!(read_title(&data).as_deref(), Some("Hilchos Shabbos"));
    }

    #[test]
    fn test_utf16_big_endian_title() {
        let mut payload = vec![2u8];
        payload.extend(utf16("שיעור בגמרא", true));
        let data = tag(4, &[frame(b"TIT2", &payload, 4)], 8);
        assert_eq!(read_title(&data).as_deref(), Some("שיעור בגמרא"));
    }

    #[test]
    fn test_utf8_title_after_other_frames() {
        let artist = {
            let mut p = vec![3u8];
            p.extend_from_slice("Rabbi A".as_bytes());
            p
        };
        let mut title = vec![3u8];
        title.extend_from_slice(" Q&A  on   Emunah ".as_bytes());
        let data = tag(
            4,
            &[frame(b"TPE1", &artist, 4), frame(b"TIT2", &title, 4)],
            32,
        );
        assert_eq!(read_title(&data).as_deref(), Some("Q&A on Emunah"));
    }

    #[test]
    fn test_v4_synchsafe_frame_size_over_127() {
        let text = "x".repeat(200);
        let mut payload = vec![3u8];
        payload.extend_from_slice(text.as_bytes());
        let data = tag(
            4,
            &[frame(b"COMM", &payload, 4), frame(b"TIT2", b"\x03Title", 4)],
            0,
        );
        assert_eq!(read_title(&data).as_deref(), Some("Title"));
    }

    #[test]
    fn test_no_tag_or_no_title() {
        assert_eq!(read_title(b""), None);
        assert_eq!(read_title(b"\xFF\xFB\x90\x00 not a tag"), None);

        let data = tag(3, &[frame(b"TPE1", b"\x00Someone", 3)], 10);
        assert_eq!(read_title(&data), None);

        let data = tag(3, &[frame(b"TIT2", b"\x00   ", 3)], 0);
        assert_eq!(read_title(&data), None);
    }

    #[test]
    fn test_truncated_buffer_does_not_panic() {
        let mut payload = vec![3u8];
        payload.extend_from_slice(b"A long title that gets cut");
        let mut data = tag(3, &[frame(b"TIT2", &payload, 3)], 0);
        data.truncate(HEADER_LEN + FRAME_HEADER_LEN + 7);
        assert_eq!(read_title(&data).as_deref(), Some("A long"));
    }
}
