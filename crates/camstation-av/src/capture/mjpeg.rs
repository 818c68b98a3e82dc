//! MJPEG byte stream splitting and multipart framing.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

/// Multipart boundary token used between frames.
pub const BOUNDARY: &str = "frame";

/// Content type of a live stream response.
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Largest frame accepted before the stream is treated as corrupt.
const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Wrap one JPEG image as a multipart part.
pub fn multipart_chunk(jpeg: &[u8]) -> Bytes {
    let header = format!("--{BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n");
    let mut buf = BytesMut::with_capacity(header.len() + jpeg.len() + 2);
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(jpeg);
    buf.extend_from_slice(b"\r\n");
    buf.freeze()
}

fn find_marker(haystack: &[u8], marker: [u8; 2], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(2)
        .position(|w| w == marker)
        .map(|p| p + from)
}

/// Splits concatenated JPEG images (ffmpeg `-f mjpeg` output) into frames
/// running from an SOI marker to the next EOI marker.
///
/// Bytes before an SOI are discarded.
#[derive(Debug)]
pub struct JpegFrameCodec {
    max_frame_len: usize,
    /// Offset already scanned for EOI in the pending frame.
    scanned: usize,
}

impl JpegFrameCodec {
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            max_frame_len,
            scanned: 0,
        }
    }
}

impl Default for JpegFrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for JpegFrameCodec {
    type Item = Bytes;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, Self::Error> {
        let Some(start) = find_marker(src, SOI, 0) else {
            // Keep a trailing 0xFF, it may be the first half of an SOI.
            let keep = usize::from(src.last() == Some(&0xFF));
            let discard = src.len() - keep;
            src.advance(discard);
            self.scanned = 0;
            return Ok(None);
        };

        if start > 0 {
            src.advance(start);
            self.scanned = 0;
        }

        match find_marker(src, EOI, self.scanned.max(SOI.len())) {
            Some(end) => {
                self.scanned = 0;
                Ok(Some(src.split_to(end + EOI.len()).freeze()))
            }
            None => {
                if src.len() > self.max_frame_len {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("JPEG frame exceeds {} bytes", self.max_frame_len),
                    ));
                }
                // Re-check the last byte next time in case EOI straddles reads.
                self.scanned = src.len().saturating_sub(1);
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                // A truncated trailing frame is dropped.
                src.clear();
                Ok(None)
            }
        }
    }
}
