use super::*;
use crate::camera::RateLimitedCameraSource;
use crate::client::PrinterClient;
use crate::commands::CommandDispatcher;
use crate::coordinator::PollingCoordinator;
use crate::events::EventBus;
use crate::registry::{DeviceRegistry, PrinterDevice};
use crate::test_support::{mjpeg_part, tiny_jpeg, FakePrinter, StatusReply};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

const DEVICE: &str = "athena-1";

struct Harness {
    printer: FakePrinter,
    coordinator: Arc<PollingCoordinator>,
    addr: SocketAddr,
    http: reqwest::Client,
}

impl Harness {
    async fn start() -> Self {
        let printer = FakePrinter::start().await;
        let config = printer.config();
        let client = PrinterClient::new(&config.printer).unwrap();
        let events = Arc::new(EventBus::default());

        let coordinator = Arc::new(PollingCoordinator::new(
            client.clone(),
            &config.polling,
            Arc::clone(&events),
        ));
        let camera = Arc::new(RateLimitedCameraSource::new(client, &config.camera));

        let registry = Arc::new(DeviceRegistry::new());
        registry.register(PrinterDevice::new(DEVICE, Arc::clone(&coordinator), camera));
        let dispatcher = Arc::new(
            CommandDispatcher::new(registry, config.printer.command_timeout()).with_event_bus(events),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(ServerState::new(dispatcher, DEVICE));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            printer,
            coordinator,
            addr,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.http.get(self.url(path)).send().await.unwrap()
    }

    async fn post(&self, path: &str) -> reqwest::Response {
        self.http.post(self.url(path)).send().await.unwrap()
    }
}

#[test]
fn test_server_builder_validation() {
    assert!(ApiServerBuilder::new().build().is_err());
}

#[tokio::test]
async fn test_health_reports_availability() {
    let harness = Harness::start().await;

    let body: Value = harness.get("/health").await.json().await.unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["available"], false);

    harness.coordinator.refresh().await.unwrap();
    let body: Value = harness.get("/health").await.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["poll_stats"]["refresh_count"], 1);
}

#[tokio::test]
async fn test_snapshot_route() {
    let harness = Harness::start().await;
    assert_eq!(harness.get("/api/snapshot").await.status(), 503);

    harness.coordinator.refresh().await.unwrap();
    let body: Value = harness.get("/api/snapshot").await.json().await.unwrap();

    assert_eq!(body["device"], DEVICE);
    assert_eq!(body["fields"]["Status"], "Idle");
    assert_eq!(body["fields"]["disk"], 49.0);
}

#[tokio::test]
async fn test_sensors_route() {
    let harness = Harness::start().await;
    harness.coordinator.refresh().await.unwrap();

    let body: Value = harness.get("/api/sensors").await.json().await.unwrap();

    assert_eq!(body["device"]["name"], format!("Athena II ({})", harness.coordinator.host()));
    assert_eq!(body["device"]["sw_version"], "2.1.0");
    assert_eq!(body["sensors"].as_array().unwrap().len(), 47);
    assert_eq!(body["binary_sensors"].as_array().unwrap().len(), 8);

    let height = body["sensors"]
        .as_array()
        .unwrap()
        .iter()
        .find(|sensor| sensor["key"] == "current_height")
        .unwrap();
    assert_eq!(height["value"], 42.55);
    assert_eq!(height["unit"], "mm");
}

#[tokio::test]
async fn test_camera_route() {
    let harness = Harness::start().await;
    harness.printer.set_stream(vec![mjpeg_part(&tiny_jpeg(16, 8))]);

    // Unavailable until the first successful poll
    assert_eq!(harness.get("/api/camera.jpg").await.status(), 503);

    harness.coordinator.refresh().await.unwrap();
    let response = harness.get("/api/camera.jpg").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "image/jpeg");

    let jpeg = response.bytes().await.unwrap();
    let img = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((img.width(), img.height()), (8, 16));
}

#[tokio::test]
async fn test_camera_route_without_frame() {
    let harness = Harness::start().await;
    harness.printer.set_stream(vec![b"no markers here".to_vec()]);
    harness.coordinator.refresh().await.unwrap();

    assert_eq!(harness.get("/api/camera.jpg").await.status(), 503);
}

#[tokio::test]
async fn test_command_route() {
    let harness = Harness::start().await;

    let response = harness.post("/api/command/start_print?plate_id=17").await;
    assert_eq!(response.status(), 200);
    assert_eq!(harness.printer.commands(), vec!["/printer/start/17".to_string()]);
    assert!(harness.coordinator.is_available());

    let response = harness.post("/api/command/set_auto_shutdown?enabled=true").await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        harness.printer.commands().last().unwrap(),
        "/printer/auto-shutdown/enable"
    );
}

#[tokio::test]
async fn test_command_route_errors() {
    let harness = Harness::start().await;

    assert_eq!(harness.post("/api/command/explode").await.status(), 400);
    assert_eq!(harness.post("/api/command/start_print").await.status(), 400);

    harness.printer.set_command_status(500);
    assert_eq!(harness.post("/api/command/pause_print").await.status(), 502);

    harness.printer.set_status(StatusReply::Raw(500, String::new()));
    harness.printer.set_command_status(200);
    // Command accepted even though the follow-up refresh fails
    assert_eq!(harness.post("/api/command/reboot").await.status(), 200);
}
