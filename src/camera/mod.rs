mod mjpeg;
mod processing;
mod source;

pub use mjpeg::{MjpegFrameExtractor, DEFAULT_MAX_FRAME_BYTES, JPEG_END, JPEG_START};
pub use processing::FrameProcessor;
pub use source::{CachedFrame, RateLimitedCameraSource};
