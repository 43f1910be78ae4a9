use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_SCAN_INTERVAL: u64 = 30;
pub const MIN_SCAN_INTERVAL: u64 = 10;
pub const MAX_SCAN_INTERVAL: u64 = 300;
pub const DEFAULT_CAMERA_FPS: f64 = 1.0;
pub const MIN_CAMERA_FPS: f64 = 0.1;
pub const MAX_CAMERA_FPS: f64 = 5.0;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AthenaConfig {
    pub printer: PrinterConfig,
    pub polling: PollingConfig,
    pub camera: CameraConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrinterConfig {
    /// Printer hostname or IP address
    #[serde(default)]
    pub host: String,

    /// Printer HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Timeout for print control commands in milliseconds
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollingConfig {
    /// Seconds between status refreshes (10-300)
    #[serde(default = "default_scan_interval")]
    pub scan_interval_seconds: u64,

    /// Timeout for the /status request in milliseconds
    #[serde(default = "default_status_timeout_ms")]
    pub status_timeout_ms: u64,

    /// Timeout for each analytic metric request in milliseconds
    #[serde(default = "default_analytic_timeout_ms")]
    pub analytic_timeout_ms: u64,

    /// Maximum analytic requests in flight at once
    #[serde(default = "default_analytic_concurrency")]
    pub analytic_concurrency: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Maximum camera frames fetched per second (0.1-5)
    #[serde(default = "default_camera_fps")]
    pub fps: f64,

    /// Timeout for one stream request, body read included, in milliseconds
    #[serde(default = "default_stream_timeout_ms")]
    pub stream_timeout_ms: u64,

    /// JPEG quality used when re-encoding rotated frames
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Largest buffered stream prefix before frame extraction gives up
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Rotation applied to every captured frame
    #[serde(default = "default_camera_rotation")]
    pub rotation: Rotation,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// IP address to bind the local API to
    #[serde(default = "default_server_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Upright,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl AthenaConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("athena.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("printer.host", "")?
            .set_default("printer.port", default_port())?
            .set_default("printer.command_timeout_ms", default_command_timeout_ms())?
            .set_default("polling.scan_interval_seconds", default_scan_interval())?
            .set_default("polling.status_timeout_ms", default_status_timeout_ms())?
            .set_default("polling.analytic_timeout_ms", default_analytic_timeout_ms())?
            .set_default(
                "polling.analytic_concurrency",
                default_analytic_concurrency() as i64,
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.stream_timeout_ms", default_stream_timeout_ms())?
            .set_default("camera.jpeg_quality", default_jpeg_quality() as i64)?
            .set_default("camera.max_frame_bytes", default_max_frame_bytes() as i64)?
            .set_default("camera.rotation", "Rotate90")?
            .set_default("server.ip", default_server_ip())?
            .set_default("server.port", default_server_port())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // ATHENA_PRINTER__HOST, ATHENA_CAMERA__FPS, ...
            .add_source(
                Environment::with_prefix("ATHENA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: AthenaConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.printer.host.trim().is_empty() {
            return Err(ConfigError::Message(
                "Printer host must be specified".to_string(),
            ));
        }

        if self.printer.port == 0 {
            return Err(ConfigError::Message(
                "Printer port must be greater than 0".to_string(),
            ));
        }

        if self.printer.command_timeout_ms == 0
            || self.polling.status_timeout_ms == 0
            || self.polling.analytic_timeout_ms == 0
            || self.camera.stream_timeout_ms == 0
        {
            return Err(ConfigError::Message(
                "Request timeouts must be greater than 0".to_string(),
            ));
        }

        if self.polling.analytic_concurrency == 0 {
            return Err(ConfigError::Message(
                "Analytic concurrency must be greater than 0".to_string(),
            ));
        }

        if !self.camera.fps.is_finite() || self.camera.fps <= 0.0 {
            return Err(ConfigError::Message(
                "Camera fps must be a positive number".to_string(),
            ));
        }

        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(ConfigError::Message(
                "Camera jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        if self.camera.max_frame_bytes == 0 {
            return Err(ConfigError::Message(
                "Camera max_frame_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Default configuration pointed at a specific printer
    pub fn for_host<S: Into<String>>(host: S, port: u16) -> Self {
        let mut config = Self::default();
        config.printer.host = host.into();
        config.printer.port = port;
        config
    }
}

impl PrinterConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl PollingConfig {
    /// Poll interval clamped to the supported 10-300 second range
    pub fn scan_interval(&self) -> Duration {
        let clamped = self
            .scan_interval_seconds
            .clamp(MIN_SCAN_INTERVAL, MAX_SCAN_INTERVAL);
        if clamped != self.scan_interval_seconds {
            warn!(
                "Scan interval {}s outside {}-{}s, using {}s",
                self.scan_interval_seconds, MIN_SCAN_INTERVAL, MAX_SCAN_INTERVAL, clamped
            );
        }
        Duration::from_secs(clamped)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn analytic_timeout(&self) -> Duration {
        Duration::from_millis(self.analytic_timeout_ms)
    }
}

impl CameraConfig {
    /// Frame rate clamped to the supported 0.1-5 fps range
    pub fn effective_fps(&self) -> f64 {
        if !self.fps.is_finite() {
            warn!("Camera fps {} is not finite, using default", self.fps);
            return DEFAULT_CAMERA_FPS;
        }
        let clamped = self.fps.clamp(MIN_CAMERA_FPS, MAX_CAMERA_FPS);
        if clamped != self.fps {
            warn!(
                "Camera fps {} outside {}-{}, using {}",
                self.fps, MIN_CAMERA_FPS, MAX_CAMERA_FPS, clamped
            );
        }
        clamped
    }

    /// Minimum time between two stream fetches
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.effective_fps())
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_timeout_ms)
    }
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            printer: PrinterConfig {
                host: String::new(),
                port: default_port(),
                command_timeout_ms: default_command_timeout_ms(),
            },
            polling: PollingConfig {
                scan_interval_seconds: default_scan_interval(),
                status_timeout_ms: default_status_timeout_ms(),
                analytic_timeout_ms: default_analytic_timeout_ms(),
                analytic_concurrency: default_analytic_concurrency(),
            },
            camera: CameraConfig {
                fps: default_camera_fps(),
                stream_timeout_ms: default_stream_timeout_ms(),
                jpeg_quality: default_jpeg_quality(),
                max_frame_bytes: default_max_frame_bytes(),
                rotation: default_camera_rotation(),
            },
            server: ServerConfig {
                ip: default_server_ip(),
                port: default_server_port(),
            },
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_command_timeout_ms() -> u64 {
    10_000
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL
}
fn default_status_timeout_ms() -> u64 {
    10_000
}
fn default_analytic_timeout_ms() -> u64 {
    5_000
}
fn default_analytic_concurrency() -> usize {
    4
}

fn default_camera_fps() -> f64 {
    DEFAULT_CAMERA_FPS
}
fn default_stream_timeout_ms() -> u64 {
    15_000
}
fn default_jpeg_quality() -> u8 {
    85
}
fn default_max_frame_bytes() -> usize {
    2 * 1024 * 1024
}
fn default_camera_rotation() -> Rotation {
    Rotation::Rotate90
}

fn default_server_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_server_port() -> u16 {
    8123
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_requires_host() {
        let config = AthenaConfig::default();
        assert!(config.validate().is_err());

        let config = AthenaConfig::for_host("192.168.1.50", 80);
        assert!(config.validate().is_ok());
        assert_eq!(config.printer.base_url(), "http://192.168.1.50:80");
    }

    #[test]
    fn test_scan_interval_is_clamped() {
        let mut config = AthenaConfig::for_host("printer", 80);
        assert_eq!(config.polling.scan_interval(), Duration::from_secs(30));

        config.polling.scan_interval_seconds = 2;
        assert_eq!(config.polling.scan_interval(), Duration::from_secs(10));

        config.polling.scan_interval_seconds = 3600;
        assert_eq!(config.polling.scan_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_camera_fps_is_clamped() {
        let mut config = AthenaConfig::for_host("printer", 80);
        assert_eq!(config.camera.frame_interval(), Duration::from_secs(1));

        config.camera.fps = 50.0;
        assert_eq!(config.camera.effective_fps(), MAX_CAMERA_FPS);
        assert_eq!(config.camera.frame_interval(), Duration::from_millis(200));

        config.camera.fps = 0.01;
        assert_eq!(config.camera.effective_fps(), MIN_CAMERA_FPS);
        assert_eq!(config.camera.frame_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_validation() {
        let mut config = AthenaConfig::for_host("printer", 80);

        config.camera.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.camera.jpeg_quality = 85;

        config.polling.analytic_timeout_ms = 0;
        assert!(config.validate().is_err());
        config.polling.analytic_timeout_ms = 5_000;

        config.camera.fps = f64::NAN;
        assert!(config.validate().is_err());
        config.camera.fps = 2.0;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[printer]
host = "athena.local"
port = 8080

[polling]
scan_interval_seconds = 15

[camera]
fps = 2.5
rotation = "Rotate180"
"#
        )
        .unwrap();

        let config = AthenaConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.printer.host, "athena.local");
        assert_eq!(config.printer.port, 8080);
        assert_eq!(config.polling.scan_interval_seconds, 15);
        assert_eq!(config.polling.analytic_timeout_ms, 5_000);
        assert_eq!(config.camera.fps, 2.5);
        assert_eq!(config.camera.rotation, Rotation::Rotate180);
        assert_eq!(config.camera.jpeg_quality, 85);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = AthenaConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[printer]"));
        assert!(rendered.contains("scan_interval_seconds = 30"));
        assert!(rendered.contains("rotation = \"Rotate90\""));
    }
}
