use crate::error::CommandError;
use crate::events::{EventBus, MonitorEvent};
use crate::registry::DeviceRegistry;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const ENDPOINT_PAUSE: &str = "/printer/pause";
pub const ENDPOINT_UNPAUSE: &str = "/printer/unpause";
pub const ENDPOINT_STOP: &str = "/printer/stop";
pub const ENDPOINT_START_PRINT: &str = "/printer/start/";
pub const ENDPOINT_AUTO_SHUTDOWN_ENABLE: &str = "/printer/auto-shutdown/enable";
pub const ENDPOINT_AUTO_SHUTDOWN_DISABLE: &str = "/printer/auto-shutdown/disable";
pub const ENDPOINT_SHUTDOWN: &str = "/printer/off";
pub const ENDPOINT_REBOOT: &str = "/printer/restart";

/// Print control actions the printer accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterCommand {
    Pause,
    Resume,
    Cancel,
    SetAutoShutdown { enabled: bool },
    StartPrint { plate_id: String },
    Shutdown,
    Reboot,
}

impl PrinterCommand {
    pub const SERVICE_NAMES: [&'static str; 7] = [
        "pause_print",
        "resume_print",
        "cancel_print",
        "set_auto_shutdown",
        "start_print",
        "shutdown",
        "reboot",
    ];

    /// Build a command from its service name. `argument` carries the plate
    /// id for `start_print` and the enabled flag for `set_auto_shutdown`
    /// (off when absent).
    pub fn parse(name: &str, argument: Option<&str>) -> Result<Self, CommandError> {
        match name {
            "pause_print" => Ok(PrinterCommand::Pause),
            "resume_print" => Ok(PrinterCommand::Resume),
            "cancel_print" => Ok(PrinterCommand::Cancel),
            "set_auto_shutdown" => Ok(PrinterCommand::SetAutoShutdown {
                enabled: argument.map(parse_flag).transpose()?.unwrap_or(false),
            }),
            "start_print" => Ok(PrinterCommand::StartPrint {
                plate_id: argument.unwrap_or_default().to_string(),
            }),
            "shutdown" => Ok(PrinterCommand::Shutdown),
            "reboot" => Ok(PrinterCommand::Reboot),
            _ => Err(CommandError::UnknownCommand {
                name: name.to_string(),
            }),
        }
    }

    pub fn service_name(&self) -> &'static str {
        match self {
            PrinterCommand::Pause => "pause_print",
            PrinterCommand::Resume => "resume_print",
            PrinterCommand::Cancel => "cancel_print",
            PrinterCommand::SetAutoShutdown { .. } => "set_auto_shutdown",
            PrinterCommand::StartPrint { .. } => "start_print",
            PrinterCommand::Shutdown => "shutdown",
            PrinterCommand::Reboot => "reboot",
        }
    }

    /// Human-readable action used in log and error messages
    pub fn action(&self) -> &'static str {
        match self {
            PrinterCommand::Pause => "pause print",
            PrinterCommand::Resume => "resume print",
            PrinterCommand::Cancel => "cancel print",
            PrinterCommand::SetAutoShutdown { .. } => "set auto shutdown",
            PrinterCommand::StartPrint { .. } => "start print",
            PrinterCommand::Shutdown => "shutdown printer",
            PrinterCommand::Reboot => "reboot printer",
        }
    }

    /// Request path on the printer
    pub fn path(&self) -> Result<String, CommandError> {
        let path = match self {
            PrinterCommand::Pause => ENDPOINT_PAUSE.to_string(),
            PrinterCommand::Resume => ENDPOINT_UNPAUSE.to_string(),
            PrinterCommand::Cancel => ENDPOINT_STOP.to_string(),
            PrinterCommand::SetAutoShutdown { enabled: true } => {
                ENDPOINT_AUTO_SHUTDOWN_ENABLE.to_string()
            }
            PrinterCommand::SetAutoShutdown { enabled: false } => {
                ENDPOINT_AUTO_SHUTDOWN_DISABLE.to_string()
            }
            PrinterCommand::StartPrint { plate_id } => {
                if plate_id.trim().is_empty() {
                    return Err(CommandError::InvalidArgument {
                        details: "plate_id parameter is required".to_string(),
                    });
                }
                format!("{}{}", ENDPOINT_START_PRINT, urlencoding::encode(plate_id))
            }
            PrinterCommand::Shutdown => ENDPOINT_SHUTDOWN.to_string(),
            PrinterCommand::Reboot => ENDPOINT_REBOOT.to_string(),
        };
        Ok(path)
    }

    fn success_message(&self) -> String {
        match self {
            PrinterCommand::Pause => "Print paused successfully".to_string(),
            PrinterCommand::Resume => "Print resumed successfully".to_string(),
            PrinterCommand::Cancel => "Print cancelled successfully".to_string(),
            PrinterCommand::SetAutoShutdown { enabled } => format!(
                "Auto shutdown {} successfully",
                if *enabled { "enabled" } else { "disabled" }
            ),
            PrinterCommand::StartPrint { plate_id } => {
                format!("Print started successfully for plate_id: {}", plate_id)
            }
            PrinterCommand::Shutdown => "Printer shutdown initiated successfully".to_string(),
            PrinterCommand::Reboot => "Printer reboot initiated successfully".to_string(),
        }
    }
}

fn parse_flag(text: &str) -> Result<bool, CommandError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" | "enable" | "enabled" => Ok(true),
        "false" | "off" | "no" | "0" | "disable" | "disabled" => Ok(false),
        other => Err(CommandError::InvalidArgument {
            details: format!("expected a boolean, got {:?}", other),
        }),
    }
}

/// Sends print control commands to registered devices
pub struct CommandDispatcher {
    registry: Arc<DeviceRegistry>,
    timeout: Duration,
    events: Option<Arc<EventBus>>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<DeviceRegistry>, timeout: Duration) -> Self {
        Self {
            registry,
            timeout,
            events: None,
        }
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Send `command` to the device and refresh its snapshot on success.
    ///
    /// A refresh failure after an accepted command is logged only; the
    /// command itself already went through.
    pub async fn execute(&self, device_id: &str, command: &PrinterCommand) -> Result<(), CommandError> {
        let device = self
            .registry
            .get(device_id)
            .ok_or_else(|| CommandError::UnknownDevice {
                device_id: device_id.to_string(),
            })?;

        let path = command.path()?;
        let coordinator = device.coordinator();

        let result = coordinator
            .client()
            .get_path(&path, self.timeout)
            .await
            .map_err(|e| CommandError::from_api(command.action(), e));

        self.publish(device_id, command, result.is_ok());

        if let Err(e) = &result {
            error!("Failed to {} on {}: {}", command.action(), device_id, e);
            return result;
        }

        info!("{}", command.success_message());

        if let Err(e) = coordinator.refresh().await {
            warn!(
                "Refresh after {} on {} failed: {}",
                command.service_name(),
                device_id,
                e
            );
        }

        Ok(())
    }

    fn publish(&self, device_id: &str, command: &PrinterCommand, success: bool) {
        if let Some(events) = &self.events {
            events.publish(MonitorEvent::CommandExecuted {
                device_id: device_id.to_string(),
                command: command.service_name().to_string(),
                success,
                timestamp: Utc::now(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::RateLimitedCameraSource;
    use crate::client::PrinterClient;
    use crate::coordinator::PollingCoordinator;
    use crate::registry::PrinterDevice;
    use crate::test_support::FakePrinter;

    const DEVICE: &str = "athena-1";

    fn dispatcher_for(printer: &FakePrinter) -> (CommandDispatcher, Arc<PollingCoordinator>) {
        let config = printer.config();
        let client = PrinterClient::new(&config.printer).unwrap();
        let coordinator = Arc::new(PollingCoordinator::new(
            client.clone(),
            &config.polling,
            Arc::new(EventBus::default()),
        ));
        let camera = Arc::new(RateLimitedCameraSource::new(client, &config.camera));

        let registry = Arc::new(DeviceRegistry::new());
        registry.register(PrinterDevice::new(DEVICE, Arc::clone(&coordinator), camera));

        (
            CommandDispatcher::new(registry, config.printer.command_timeout()),
            coordinator,
        )
    }

    #[test]
    fn test_parse_service_names() {
        for name in PrinterCommand::SERVICE_NAMES {
            let command = PrinterCommand::parse(name, Some("1")).unwrap();
            assert_eq!(command.service_name(), name);
        }

        assert_eq!(
            PrinterCommand::parse("set_auto_shutdown", None).unwrap(),
            PrinterCommand::SetAutoShutdown { enabled: false }
        );
        assert_eq!(
            PrinterCommand::parse("set_auto_shutdown", Some("on")).unwrap(),
            PrinterCommand::SetAutoShutdown { enabled: true }
        );
        assert!(matches!(
            PrinterCommand::parse("set_auto_shutdown", Some("maybe")),
            Err(CommandError::InvalidArgument { .. })
        ));
        assert!(matches!(
            PrinterCommand::parse("explode", None),
            Err(CommandError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn test_command_paths() {
        assert_eq!(PrinterCommand::Pause.path().unwrap(), "/printer/pause");
        assert_eq!(PrinterCommand::Resume.path().unwrap(), "/printer/unpause");
        assert_eq!(PrinterCommand::Cancel.path().unwrap(), "/printer/stop");
        assert_eq!(PrinterCommand::Shutdown.path().unwrap(), "/printer/off");
        assert_eq!(PrinterCommand::Reboot.path().unwrap(), "/printer/restart");
        assert_eq!(
            PrinterCommand::SetAutoShutdown { enabled: false }.path().unwrap(),
            "/printer/auto-shutdown/disable"
        );
        assert_eq!(
            PrinterCommand::StartPrint {
                plate_id: "plate 7/a".to_string()
            }
            .path()
            .unwrap(),
            "/printer/start/plate%207%2Fa"
        );
        assert!(matches!(
            PrinterCommand::StartPrint {
                plate_id: String::new()
            }
            .path(),
            Err(CommandError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_sends_command_and_refreshes() {
        let printer = FakePrinter::start().await;
        let (dispatcher, coordinator) = dispatcher_for(&printer);

        dispatcher.execute(DEVICE, &PrinterCommand::Pause).await.unwrap();

        assert_eq!(printer.commands(), vec!["/printer/pause".to_string()]);
        assert_eq!(printer.status_hits(), 1);
        assert!(coordinator.snapshot().is_some());
    }

    #[tokio::test]
    async fn test_execute_start_print_with_plate_id() {
        let printer = FakePrinter::start().await;
        let (dispatcher, _) = dispatcher_for(&printer);

        let command = PrinterCommand::parse("start_print", Some("42")).unwrap();
        dispatcher.execute(DEVICE, &command).await.unwrap();

        assert_eq!(printer.commands(), vec!["/printer/start/42".to_string()]);
    }

    #[tokio::test]
    async fn test_execute_rejects_missing_plate_id() {
        let printer = FakePrinter::start().await;
        let (dispatcher, _) = dispatcher_for(&printer);

        let command = PrinterCommand::parse("start_print", None).unwrap();
        let err = dispatcher.execute(DEVICE, &command).await.unwrap_err();

        assert!(matches!(err, CommandError::InvalidArgument { .. }));
        assert!(printer.commands().is_empty());
    }

    #[tokio::test]
    async fn test_execute_unknown_device() {
        let printer = FakePrinter::start().await;
        let (dispatcher, _) = dispatcher_for(&printer);

        let err = dispatcher
            .execute("missing", &PrinterCommand::Reboot)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::UnknownDevice {
                device_id: "missing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_execute_http_error_skips_refresh() {
        let printer = FakePrinter::start().await;
        printer.set_command_status(500);
        let (dispatcher, _) = dispatcher_for(&printer);

        let err = dispatcher
            .execute(DEVICE, &PrinterCommand::Cancel)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CommandError::HttpStatus {
                command: "cancel print".to_string(),
                status: 500
            }
        );
        assert_eq!(printer.status_hits(), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_after_command_is_not_an_error() {
        let printer = FakePrinter::start().await;
        printer.set_status(crate::test_support::StatusReply::Raw(500, String::new()));
        let (dispatcher, coordinator) = dispatcher_for(&printer);

        dispatcher
            .execute(DEVICE, &PrinterCommand::SetAutoShutdown { enabled: true })
            .await
            .unwrap();

        assert_eq!(
            printer.commands(),
            vec!["/printer/auto-shutdown/enable".to_string()]
        );
        assert!(!coordinator.is_available());
    }
}
