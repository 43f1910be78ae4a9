use crate::config::PrinterConfig;
use crate::error::{ApiError, AthenaError, Result};
use crate::snapshot::STATUS_FIELD;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

pub const ENDPOINT_STATUS: &str = "/status";
pub const ENDPOINT_ANALYTIC_VALUE: &str = "/analytic/value";
pub const ENDPOINT_CAMERA: &str = "/athena-camera/stream";

/// Identity reported by a reachable printer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrinterInfo {
    pub hostname: String,
    pub version: String,
}

/// Thin HTTP client for the printer's plain-HTTP API.
///
/// Every call is bounded by the timeout passed in by the caller; nothing
/// here retries.
#[derive(Clone)]
pub struct PrinterClient {
    http: reqwest::Client,
    host: String,
    port: u16,
    base_url: String,
}

impl PrinterClient {
    pub fn new(config: &PrinterConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AthenaError::system(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_http(http, config))
    }

    /// Build on top of an existing reqwest client (shared connection pool)
    pub fn with_http(http: reqwest::Client, config: &PrinterConfig) -> Self {
        Self {
            http,
            host: config.host.clone(),
            port: config.port,
            base_url: config.base_url(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET /status and decode the JSON object.
    pub async fn fetch_status(&self, timeout: Duration) -> std::result::Result<Map<String, Value>, ApiError> {
        let url = self.url(ENDPOINT_STATUS);
        trace!("Fetching status from {}", url);

        let body = bounded(&url, timeout, async {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| ApiError::from_reqwest(&url, e))?;

            response
                .text()
                .await
                .map_err(|e| ApiError::from_reqwest(&url, e))
        })
        .await?;

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(other) => Err(ApiError::InvalidJson {
                url,
                details: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
            Err(e) => Err(ApiError::InvalidJson {
                url,
                details: e.to_string(),
            }),
        }
    }

    /// GET /analytic/value/{id} and parse the plain-text number.
    pub async fn fetch_analytic(&self, metric_id: u8, timeout: Duration) -> std::result::Result<f64, ApiError> {
        let url = format!("{}{}/{}", self.base_url, ENDPOINT_ANALYTIC_VALUE, metric_id);

        let body = bounded(&url, timeout, async {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| ApiError::from_reqwest(&url, e))?;

            if response.status() != reqwest::StatusCode::OK {
                return Err(ApiError::HttpStatus {
                    url: url.clone(),
                    status: response.status().as_u16(),
                });
            }

            response
                .text()
                .await
                .map_err(|e| ApiError::from_reqwest(&url, e))
        })
        .await?;

        body.trim().parse::<f64>().map_err(|e| ApiError::InvalidBody {
            url: url.clone(),
            details: format!("{:?}: {}", body, e),
        })
    }

    /// Open the MJPEG stream. The caller bounds the whole read, headers and
    /// body, with its own timeout.
    pub async fn open_camera_stream(&self) -> std::result::Result<reqwest::Response, ApiError> {
        let url = self.url(ENDPOINT_CAMERA);
        debug!("Opening camera stream {}", url);

        self.http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApiError::from_reqwest(&url, e))
    }

    /// GET a control endpoint; any 2xx counts as success and the body is
    /// ignored.
    pub async fn get_path(&self, path: &str, timeout: Duration) -> std::result::Result<(), ApiError> {
        let url = self.url(path);
        debug!("Sending control request {}", url);

        bounded(&url, timeout, async {
            self.http
                .get(&url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map(|_| ())
                .map_err(|e| ApiError::from_reqwest(&url, e))
        })
        .await
    }

    /// Check that the printer answers with a usable status payload.
    pub async fn probe(&self, timeout: Duration) -> std::result::Result<PrinterInfo, ApiError> {
        let status = self.fetch_status(timeout).await?;

        if !status.contains_key(STATUS_FIELD) {
            return Err(ApiError::MissingField {
                field: STATUS_FIELD.to_string(),
            });
        }

        let text = |key: &str| {
            status
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string()
        };

        Ok(PrinterInfo {
            hostname: text("Hostname"),
            version: text("Version"),
        })
    }
}

async fn bounded<T, F>(url: &str, timeout: Duration, request: F) -> std::result::Result<T, ApiError>
where
    F: Future<Output = std::result::Result<T, ApiError>>,
{
    tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| ApiError::Timeout {
            url: url.to_string(),
        })?
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{AnalyticReply, FakePrinter, StatusReply};
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn test_fetch_status_decodes_object() {
        let printer = FakePrinter::start().await;
        let client = PrinterClient::new(&printer.config().printer).unwrap();

        let status = client.fetch_status(TIMEOUT).await.unwrap();
        assert_eq!(status["Status"], json!("Idle"));
        assert_eq!(printer.status_hits(), 1);
    }

    #[tokio::test]
    async fn test_fetch_status_classifies_failures() {
        let printer = FakePrinter::start().await;
        let client = PrinterClient::new(&printer.config().printer).unwrap();

        printer.set_status(StatusReply::Raw(500, "boom".to_string()));
        assert!(matches!(
            client.fetch_status(TIMEOUT).await,
            Err(ApiError::HttpStatus { status: 500, .. })
        ));

        printer.set_status(StatusReply::Raw(200, "<html>".to_string()));
        assert!(matches!(
            client.fetch_status(TIMEOUT).await,
            Err(ApiError::InvalidJson { .. })
        ));

        printer.set_status(StatusReply::Raw(200, "[1, 2]".to_string()));
        assert!(matches!(
            client.fetch_status(TIMEOUT).await,
            Err(ApiError::InvalidJson { .. })
        ));

        printer.set_status(StatusReply::Delayed(
            Duration::from_secs(2),
            json!({"Status": "Idle"}),
        ));
        assert!(matches!(
            client.fetch_status(Duration::from_millis(100)).await,
            Err(ApiError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_analytic_parses_trimmed_text() {
        let printer = FakePrinter::start().await;
        let client = PrinterClient::new(&printer.config().printer).unwrap();

        printer.set_analytic(18, AnalyticReply::Body(" 24.75\n".to_string()));
        assert_eq!(client.fetch_analytic(18, TIMEOUT).await.unwrap(), 24.75);

        printer.set_analytic(6, AnalyticReply::Body("nan-ish".to_string()));
        assert!(matches!(
            client.fetch_analytic(6, TIMEOUT).await,
            Err(ApiError::InvalidBody { .. })
        ));

        printer.set_analytic(7, AnalyticReply::Status(204));
        assert!(matches!(
            client.fetch_analytic(7, TIMEOUT).await,
            Err(ApiError::HttpStatus { status: 204, .. })
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let printer = FakePrinter::start().await;
        let config = printer.config();
        printer.shutdown().await;

        let client = PrinterClient::new(&config.printer).unwrap();
        let err = client.fetch_status(TIMEOUT).await.unwrap_err();
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn test_probe_reports_identity() {
        let printer = FakePrinter::start().await;
        let client = PrinterClient::new(&printer.config().printer).unwrap();

        printer.set_status(StatusReply::Json(json!({
            "Status": "Idle",
            "Hostname": "athena-01",
        })));
        let info = client.probe(TIMEOUT).await.unwrap();
        assert_eq!(info.hostname, "athena-01");
        assert_eq!(info.version, "Unknown");

        printer.set_status(StatusReply::Json(json!({"Hostname": "athena-01"})));
        let err = client.probe(TIMEOUT).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingField { .. }));
        assert!(!err.is_connectivity());
    }
}
