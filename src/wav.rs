//! RIFF/WAVE container parsing and header generation.
//!
//! Shared by the playback path (find the PCM payload in an arbitrary
//! WAV file) and the record path (emit a 44-byte canonical header).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::stream::StreamError;

/// Length of the canonical header written by [`build_header`].
pub const HEADER_LEN: usize = 44;

/// Payload location and sample format discovered by [`read_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavInfo {
    /// Absolute file offset of the first `data` payload byte.
    pub data_offset: u64,
    /// Declared size of the `data` chunk in bytes.
    pub data_size: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

/// Parse the RIFF/WAVE chunk structure and locate the first `data` chunk.
///
/// Unknown chunks are skipped by their declared size (plus one pad byte
/// when the size is odd). The `fmt ` chunk must declare PCM; further
/// restrictions (mono, 16-bit) are enforced by the playback stream.
pub fn read_info<R: Read + Seek>(reader: &mut R) -> Result<WavInfo, StreamError> {
    reader.seek(SeekFrom::Start(0))?;

    let mut tag = [0u8; 4];
    reader.read_exact(&mut tag)?;
    if &tag != b"RIFF" {
        return Err(StreamError::Format("not a RIFF file"));
    }

    let file_size = read_u32le(reader)? as u64 + 8;

    reader.read_exact(&mut tag)?;
    if &tag != b"WAVE" {
        return Err(StreamError::Format("not a WAVE file"));
    }

    let mut pos: u64 = 12;
    let mut fmt: Option<(u32, u16, u16)> = None;

    while pos < file_size {
        reader.seek(SeekFrom::Start(pos))?;
        let mut id = [0u8; 4];
        match reader.read_exact(&mut id) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let chunk_size = match read_u32le(reader) {
            Ok(n) => n,
            Err(StreamError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        };

        match &id {
            b"fmt " => {
                if chunk_size < 16 {
                    return Err(StreamError::Format("fmt chunk too short"));
                }
                let mut body = [0u8; 16];
                reader.read_exact(&mut body)?;
                let audio_format = u16::from_le_bytes([body[0], body[1]]);
                if audio_format != 1 {
                    return Err(StreamError::Format("only PCM supported"));
                }
                let channels = u16::from_le_bytes([body[2], body[3]]);
                let sample_rate = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
                let bits_per_sample = u16::from_le_bytes([body[14], body[15]]);
                fmt = Some((sample_rate, channels, bits_per_sample));
            }
            b"data" => {
                let (sample_rate, channels, bits_per_sample) =
                    fmt.ok_or(StreamError::Format("fmt chunk missing before data"))?;
                return Ok(WavInfo {
                    data_offset: pos + 8,
                    data_size: chunk_size,
                    sample_rate,
                    channels,
                    bits_per_sample,
                });
            }
            _ => {}
        }

        pos += 8 + chunk_size as u64;
        if chunk_size % 2 == 1 {
            pos += 1;
        }
    }

    Err(StreamError::Format("no data chunk found"))
}

/// Parse a WAV file on disk. Convenience wrapper over [`read_info`].
pub fn info(path: &Path) -> Result<WavInfo, StreamError> {
    let mut file = File::open(path)?;
    read_info(&mut file)
}

/// Build a canonical 44-byte WAV header for a 16-bit PCM payload.
pub fn build_header(
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    data_size: u32,
) -> [u8; HEADER_LEN] {
    let bytes_per_sample = bits_per_sample / 8;
    let byte_rate = sample_rate * channels as u32 * bytes_per_sample as u32;
    let block_align = channels * bytes_per_sample;
    let file_size = data_size + 36;

    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&file_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

fn read_u32le<R: Read>(reader: &mut R) -> Result<u32, StreamError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_with_data(data: &[u8]) -> Vec<u8> {
        let mut file = build_header(16000, 1, 16, data.len() as u32).to_vec();
        file.extend_from_slice(data);
        file
    }

    #[test]
    fn header_round_trip() {
        let header = build_header(16000, 1, 16, 12345);
        assert_eq!(u32::from_le_bytes(header[24..28].try_into().unwrap()), 16000);
        assert_eq!(u32::from_le_bytes(header[40..44].try_into().unwrap()), 12345);

        let info = read_info(&mut Cursor::new(header_with_data(&[0u8; 64]))).unwrap();
        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.channels, 1);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.data_size, 64);
        assert_eq!(info.data_offset, HEADER_LEN as u64);
    }

    #[test]
    fn skips_unknown_chunks() {
        // RIFF / WAVE / fmt / LIST (odd-sized, padded) / data
        let mut file = Vec::new();
        file.extend_from_slice(b"RIFF");
        file.extend_from_slice(&0u32.to_le_bytes()); // patched below
        file.extend_from_slice(b"WAVE");
        file.extend_from_slice(b"fmt ");
        file.extend_from_slice(&16u32.to_le_bytes());
        file.extend_from_slice(&1u16.to_le_bytes());
        file.extend_from_slice(&1u16.to_le_bytes());
        file.extend_from_slice(&8000u32.to_le_bytes());
        file.extend_from_slice(&16000u32.to_le_bytes());
        file.extend_from_slice(&2u16.to_le_bytes());
        file.extend_from_slice(&16u16.to_le_bytes());
        file.extend_from_slice(b"LIST");
        file.extend_from_slice(&3u32.to_le_bytes());
        file.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0x00]); // 3 bytes + pad
        file.extend_from_slice(b"data");
        file.extend_from_slice(&4u32.to_le_bytes());
        file.extend_from_slice(&[1, 2, 3, 4]);
        let total = file.len() as u32 - 8;
        file[4..8].copy_from_slice(&total.to_le_bytes());

        let info = read_info(&mut Cursor::new(file)).unwrap();
        assert_eq!(info.sample_rate, 8000);
        assert_eq!(info.data_size, 4);
    }

    #[test]
    fn rejects_non_riff() {
        let err = read_info(&mut Cursor::new(b"JUNKJUNKJUNK".to_vec())).unwrap_err();
        assert!(matches!(err, StreamError::Format("not a RIFF file")));
    }

    #[test]
    fn rejects_non_pcm() {
        let mut file = header_with_data(&[0u8; 8]);
        // audio_format lives at offset 20
        file[20..22].copy_from_slice(&3u16.to_le_bytes());
        let err = read_info(&mut Cursor::new(file)).unwrap_err();
        assert!(matches!(err, StreamError::Format("only PCM supported")));
    }

    #[test]
    fn missing_data_chunk() {
        let mut file = build_header(16000, 1, 16, 64).to_vec();
        // drop the data chunk header entirely
        file.truncate(36);
        let riff_len = (file.len() as u32) - 8;
        file[4..8].copy_from_slice(&riff_len.to_le_bytes());
        let err = read_info(&mut Cursor::new(file)).unwrap_err();
        assert!(matches!(err, StreamError::Format("no data chunk found")));
    }
}
