use super::mjpeg::MjpegFrameExtractor;
use super::processing::FrameProcessor;
use crate::client::{PrinterClient, ENDPOINT_CAMERA};
use crate::config::CameraConfig;
use crate::error::{ApiError, CameraError};
use crate::events::{EventBus, MonitorEvent};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Last processed frame handed out by the camera source
#[derive(Debug, Clone)]
pub struct CachedFrame {
    pub data: Arc<Vec<u8>>,
    pub captured_at: Instant,
    pub captured_wall: DateTime<Utc>,
}

impl CachedFrame {
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}

/// Still-image source on top of the printer's MJPEG stream.
///
/// At most one stream request is made per frame interval; calls inside the
/// interval get the cached frame. Failures are logged and answered with the
/// cached frame (or `None` before the first success).
pub struct RateLimitedCameraSource {
    client: PrinterClient,
    processor: FrameProcessor,
    frame_interval: Duration,
    stream_timeout: Duration,
    max_frame_bytes: usize,
    cache: RwLock<Option<CachedFrame>>,
    fetch_lock: tokio::sync::Mutex<()>,
    fetch_count: AtomicU64,
    events: Option<Arc<EventBus>>,
}

impl RateLimitedCameraSource {
    pub fn new(client: PrinterClient, camera: &CameraConfig) -> Self {
        Self {
            client,
            processor: FrameProcessor::new(camera.rotation, camera.jpeg_quality),
            frame_interval: camera.frame_interval(),
            stream_timeout: camera.stream_timeout(),
            max_frame_bytes: camera.max_frame_bytes,
            cache: RwLock::new(None),
            fetch_lock: tokio::sync::Mutex::new(()),
            fetch_count: AtomicU64::new(0),
            events: None,
        }
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn cached_frame(&self) -> Option<CachedFrame> {
        self.cache.read().clone()
    }

    /// Number of stream requests made so far
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Latest camera image as rotated JPEG bytes.
    pub async fn get_image(&self) -> Option<Arc<Vec<u8>>> {
        let _guard = self.fetch_lock.lock().await;

        if let Some(frame) = self.fresh_frame() {
            debug!(
                "Returning cached frame ({:?} old, interval {:?})",
                frame.age(),
                self.frame_interval
            );
            return Some(frame.data);
        }

        // The rate limit counts from when the request went out
        let requested_at = Instant::now();
        let requested_wall = Utc::now();

        match self.capture().await {
            Ok(jpeg) => {
                let frame = CachedFrame {
                    data: Arc::new(jpeg),
                    captured_at: requested_at,
                    captured_wall: requested_wall,
                };
                let data = Arc::clone(&frame.data);

                if let Some(events) = &self.events {
                    events.publish(MonitorEvent::FrameCaptured {
                        bytes: data.len(),
                        timestamp: frame.captured_wall,
                    });
                }

                *self.cache.write() = Some(frame);
                Some(data)
            }
            Err(CameraError::NoFrame) => {
                warn!("No image data extracted from MJPEG stream");
                self.cached_frame().map(|frame| frame.data)
            }
            Err(e) => {
                error!("Error getting camera image: {}", e);
                self.cached_frame().map(|frame| frame.data)
            }
        }
    }

    fn fresh_frame(&self) -> Option<CachedFrame> {
        self.cache
            .read()
            .as_ref()
            .filter(|frame| frame.age() < self.frame_interval)
            .cloned()
    }

    async fn capture(&self) -> Result<Vec<u8>, CameraError> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        let jpeg = tokio::time::timeout(self.stream_timeout, self.read_frame())
            .await
            .map_err(|_| {
                CameraError::Stream(ApiError::Timeout {
                    url: self.client.url(ENDPOINT_CAMERA),
                })
            })??;

        debug!("Processing JPEG image of {} bytes", jpeg.len());
        self.processor.process_blocking(jpeg).await
    }

    async fn read_frame(&self) -> Result<Vec<u8>, CameraError> {
        let response = self.client.open_camera_stream().await?;

        MjpegFrameExtractor::new(self.max_frame_bytes)
            .extract_one_frame(response.bytes_stream())
            .await
            .ok_or(CameraError::NoFrame)
    }
}
