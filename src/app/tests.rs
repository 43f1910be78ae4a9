use super::*;
use crate::commands::PrinterCommand;
use crate::config::AthenaConfig;
use crate::error::AthenaError;
use crate::test_support::FakePrinter;
use std::time::Duration;

#[test]
fn test_runtime_rejects_invalid_config() {
    let result = MonitorRuntime::new(AthenaConfig::default());
    assert!(matches!(result, Err(AthenaError::Config(_))));
}

#[tokio::test]
async fn test_runtime_polls_and_stops() {
    let printer = FakePrinter::start().await;
    let mut runtime = MonitorRuntime::new(printer.config()).unwrap();

    runtime.start_polling().await;
    assert!(runtime.coordinator().is_available());
    assert_eq!(runtime.coordinator().stats().refresh_count, 1);

    // The loop waits a full scan interval after the initial refresh
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(printer.status_hits(), 1);

    assert_eq!(runtime.shutdown().await, 0);
}

#[tokio::test]
async fn test_runtime_registers_device_for_commands() {
    let printer = FakePrinter::start().await;
    let runtime = MonitorRuntime::new(printer.config()).unwrap();

    let registry = runtime.dispatcher().registry();
    assert_eq!(registry.device_ids(), vec![runtime.device_id().to_string()]);

    runtime
        .dispatcher()
        .execute(runtime.device_id(), &PrinterCommand::Resume)
        .await
        .unwrap();
    assert_eq!(printer.commands(), vec!["/printer/unpause".to_string()]);
}

#[tokio::test]
async fn test_run_until_shutdown_honours_cancellation() {
    let printer = FakePrinter::start().await;
    let mut runtime = MonitorRuntime::new(printer.config()).unwrap();
    runtime.start_polling().await;

    let token = runtime.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    assert_eq!(runtime.run_until_shutdown().await, ShutdownReason::Cancelled);
    assert_eq!(runtime.shutdown().await, 0);
}
