use super::api::ServerState;
use crate::commands::PrinterCommand;
use crate::entities::{binary_sensor_states, sensor_states};
use crate::error::CommandError;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

/// Query parameters accepted by the command route
#[derive(Debug, Default, Deserialize)]
pub struct CommandParams {
    pub plate_id: Option<String>,
    pub enabled: Option<String>,
}

fn unavailable(message: &str) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": message })),
    )
        .into_response()
}

fn device_missing(state: &ServerState) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("Athena II device not found: {}", state.device_id) })),
    )
        .into_response()
}

/// Handler for health check endpoint
pub async fn health_handler(State(state): State<ServerState>) -> Response {
    let Some(device) = state.device() else {
        return device_missing(&state);
    };
    let coordinator = device.coordinator();
    let stats = coordinator.stats();

    let health_info = json!({
        "status": if coordinator.is_available() { "healthy" } else { "degraded" },
        "device": device.id(),
        "host": coordinator.host(),
        "available": coordinator.is_available(),
        "poll_stats": stats,
        "camera": {
            "fetches": device.camera().fetch_count(),
            "frame_cached": device.camera().cached_frame().is_some(),
        },
        "server_info": {
            "subscribers": coordinator.events().subscriber_count(),
            "devices": state.registry.len(),
        }
    });

    (StatusCode::OK, Json(health_info)).into_response()
}

/// Last published snapshot, stale or not
pub async fn snapshot_handler(State(state): State<ServerState>) -> Response {
    let Some(device) = state.device() else {
        return device_missing(&state);
    };
    let coordinator = device.coordinator();

    match coordinator.snapshot() {
        Some(snapshot) => Json(json!({
            "device": device.id(),
            "available": coordinator.is_available(),
            "fetched_at": snapshot.fetched_at(),
            "fields": snapshot.fields(),
        }))
        .into_response(),
        None => unavailable("No snapshot has been fetched yet"),
    }
}

pub async fn sensors_handler(State(state): State<ServerState>) -> Response {
    let Some(device) = state.device() else {
        return device_missing(&state);
    };
    let coordinator = device.coordinator();
    let snapshot = coordinator.snapshot();
    let available = coordinator.is_available();

    Json(json!({
        "device": device.device_info(),
        "available": available,
        "sensors": sensor_states(snapshot.as_deref(), available),
        "binary_sensors": binary_sensor_states(snapshot.as_deref(), available),
    }))
    .into_response()
}

/// Latest rotated camera still
pub async fn camera_handler(State(state): State<ServerState>) -> Response {
    let Some(device) = state.device() else {
        return device_missing(&state);
    };

    if !device.coordinator().is_available() {
        return unavailable("Printer is unavailable");
    }

    match device.camera().get_image().await {
        Some(jpeg) => {
            debug!("Serving camera frame ({} bytes)", jpeg.len());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "image/jpeg"),
                    (header::CACHE_CONTROL, "no-cache, private"),
                ],
                jpeg.as_ref().clone(),
            )
                .into_response()
        }
        None => unavailable("No camera frame available"),
    }
}

pub async fn command_handler(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    Query(params): Query<CommandParams>,
) -> Response {
    let argument = match name.as_str() {
        "start_print" => params.plate_id.as_deref(),
        "set_auto_shutdown" => params.enabled.as_deref(),
        _ => None,
    };

    let result = match PrinterCommand::parse(&name, argument) {
        Ok(command) => {
            info!("API request: {}", command.service_name());
            state.dispatcher.execute(&state.device_id, &command).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Json(json!({ "status": "ok", "command": name })).into_response(),
        Err(e) => (command_status(&e), Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

fn command_status(error: &CommandError) -> StatusCode {
    match error {
        CommandError::UnknownCommand { .. } | CommandError::InvalidArgument { .. } => {
            StatusCode::BAD_REQUEST
        }
        CommandError::UnknownDevice { .. } => StatusCode::NOT_FOUND,
        CommandError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        CommandError::HttpStatus { .. } | CommandError::Failed { .. } => StatusCode::BAD_GATEWAY,
    }
}
