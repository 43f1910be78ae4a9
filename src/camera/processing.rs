use crate::config::Rotation;
use crate::error::CameraError;
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;

impl Rotation {
    /// Clockwise rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Upright => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }
}

/// Rotates and re-encodes captured JPEG frames
#[derive(Debug, Clone, Copy)]
pub struct FrameProcessor {
    rotation: Rotation,
    quality: u8,
}

impl FrameProcessor {
    pub fn new(rotation: Rotation, quality: u8) -> Self {
        Self {
            rotation,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Decode, rotate clockwise and re-encode as baseline RGB JPEG.
    ///
    /// CPU bound; call it from a blocking task.
    pub fn process(&self, jpeg: &[u8]) -> Result<Vec<u8>, CameraError> {
        let img = image::load_from_memory(jpeg).map_err(|e| CameraError::Decode {
            details: e.to_string(),
        })?;

        let rotated = match self.rotation {
            Rotation::Upright => img,
            Rotation::Rotate90 => img.rotate90(),
            Rotation::Rotate180 => img.rotate180(),
            Rotation::Rotate270 => img.rotate270(),
        };

        // JPEG has no alpha channel; flatten whatever the decoder produced
        let rgb = rotated.to_rgb8();
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, self.quality)
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| CameraError::Encode {
                details: e.to_string(),
            })?;

        Ok(buf)
    }

    /// [`process`](Self::process) on the blocking thread pool
    pub async fn process_blocking(&self, jpeg: Vec<u8>) -> Result<Vec<u8>, CameraError> {
        let processor = *self;
        tokio::task::spawn_blocking(move || processor.process(&jpeg))
            .await
            .map_err(|e| CameraError::Task {
                details: e.to_string(),
            })?
    }
}
