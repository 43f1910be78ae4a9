//! Incremental isolation of one JPEG image from a multipart MJPEG stream.
//!
//! The device's multipart framing is not trusted: the extractor only looks
//! for the JPEG start-of-image and end-of-image markers, using the part's
//! `Content-Length` header as a hint when it shows up.

use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tracing::{debug, error, warn};

pub const JPEG_START: [u8; 2] = [0xFF, 0xD8];
pub const JPEG_END: [u8; 2] = [0xFF, 0xD9];
pub const DEFAULT_MAX_FRAME_BYTES: usize = 2 * 1024 * 1024;

const CONTENT_LENGTH_HEADER: &[u8] = b"Content-Length:";
const CONTENT_LENGTH_SLACK: usize = 1000;
const MAX_HEADER_VALUE: usize = 32;

/// Single-use frame extractor. Feed it chunks with [`push`](Self::push)
/// until it yields a frame, or hand it a whole stream with
/// [`extract_one_frame`](Self::extract_one_frame).
pub struct MjpegFrameExtractor {
    buffer: BytesMut,
    max_bytes: usize,
    content_length: Option<usize>,
    in_frame: bool,
    /// Offset where the next marker search resumes
    scan_from: usize,
    /// Offset where the next `Content-Length:` search resumes
    header_scan_from: usize,
    /// Offset where the content-length valve's end-marker search resumes
    loose_end_from: usize,
    exhausted: bool,
}

impl MjpegFrameExtractor {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            max_bytes,
            content_length: None,
            in_frame: false,
            scan_from: 0,
            header_scan_from: 0,
            loose_end_from: 0,
            exhausted: false,
        }
    }

    /// Content length announced by the part header, if one was parsed
    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// True once the extractor gave up on this stream
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Append a chunk and return the first complete frame, if any.
    pub fn push(&mut self, chunk: &[u8]) -> Option<Vec<u8>> {
        if self.exhausted {
            return None;
        }

        self.buffer.extend_from_slice(chunk);

        if !self.in_frame {
            if self.content_length.is_none() {
                self.content_length = self.scan_content_length();
            }

            match find_marker(&self.buffer, &JPEG_START, self.scan_from) {
                Some(start) => {
                    self.buffer.advance(start);
                    self.in_frame = true;
                    self.scan_from = JPEG_START.len();
                }
                None => self.scan_from = self.buffer.len().saturating_sub(JPEG_START.len() - 1),
            }
        }

        if self.in_frame {
            if let Some(end) = find_marker(&self.buffer, &JPEG_END, self.scan_from) {
                return Some(self.take_frame(end));
            }
            // A marker may straddle the next chunk boundary
            self.scan_from = self.buffer.len().saturating_sub(1).max(JPEG_START.len());
        } else if let Some(length) = self.content_length {
            // The announced part is long over but no start marker showed up;
            // settle for whatever ends in an end marker.
            if self.buffer.len() >= length.saturating_add(CONTENT_LENGTH_SLACK) {
                if let Some(end) = find_marker(&self.buffer, &JPEG_END, self.loose_end_from) {
                    debug!("Content length {} exceeded, returning partial frame", length);
                    return Some(self.take_frame(end));
                }
                self.loose_end_from = self.buffer.len().saturating_sub(JPEG_END.len() - 1);
            }
        }

        if self.buffer.len() > self.max_bytes {
            warn!(
                "Buffer exceeded {} bytes without finding complete frame",
                self.max_bytes
            );
            self.exhausted = true;
            self.buffer.clear();
        }

        None
    }

    /// Drive a byte stream until one frame is found. EOF, a chunk error or
    /// the buffer ceiling all yield `None`.
    pub async fn extract_one_frame<S, E>(mut self, stream: S) -> Option<Vec<u8>>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        futures::pin_mut!(stream);

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    error!("Error extracting MJPEG frame: {}", e);
                    return None;
                }
            };

            if let Some(frame) = self.push(&chunk) {
                debug!("Extracted JPEG frame of {} bytes", frame.len());
                return Some(frame);
            }

            if self.exhausted {
                return None;
            }
        }

        debug!(
            "MJPEG stream ended after {} buffered bytes without a complete frame",
            self.buffer.len()
        );
        None
    }

    /// Look for a complete `Content-Length: <n>\r\n` line past the last
    /// searched offset. Lengths above the buffer ceiling are ignored.
    fn scan_content_length(&mut self) -> Option<usize> {
        let Some(header) = find_marker(&self.buffer, CONTENT_LENGTH_HEADER, self.header_scan_from)
        else {
            self.header_scan_from = self
                .buffer
                .len()
                .saturating_sub(CONTENT_LENGTH_HEADER.len() - 1);
            return None;
        };

        let value_start = header + CONTENT_LENGTH_HEADER.len();
        let value = &self.buffer[value_start..];
        let Some(line_end) = find_marker(value, b"\r\n", 0) else {
            // Wait for the rest of the line, but not forever
            self.header_scan_from = if value.len() > MAX_HEADER_VALUE {
                header + 1
            } else {
                header
            };
            return None;
        };
        self.header_scan_from = value_start + line_end;

        match parse_content_length(&value[..line_end]) {
            Some(length) if length <= self.max_bytes => Some(length),
            Some(length) => {
                warn!(
                    "Ignoring Content-Length {} above the {} byte ceiling",
                    length, self.max_bytes
                );
                None
            }
            None => None,
        }
    }

    fn take_frame(&mut self, end: usize) -> Vec<u8> {
        self.exhausted = true;
        self.buffer.split_to(end + JPEG_END.len()).to_vec()
    }
}

impl Default for MjpegFrameExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

fn find_marker(haystack: &[u8], marker: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(marker.len())
        .position(|window| window == marker)
        .map(|position| position + from)
}

/// Parse the value part of a `Content-Length:` header line
fn parse_content_length(value: &[u8]) -> Option<usize> {
    std::str::from_utf8(value).ok()?.trim().parse().ok()
}
