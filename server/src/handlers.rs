//! HTTP handlers for reading ingestion and queries

use crate::store::{StoredReading, DEFAULT_QUERY_LIMIT};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use iotmon_shared::{codec, now_ms, normalize_timestamp_ms, validation, SensorField};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

type JsonResponse = (StatusCode, Json<Value>);

fn bad_request(error: &str, details: impl Into<String>) -> JsonResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": error, "details": details.into() })),
    )
}

fn iso_from_ms(ms: u64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(ms as i64).map(|dt| dt.to_rfc3339())
}

/// POST /data - validate and store one reading
pub async fn receive_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> JsonResponse {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);
    if !is_json {
        warn!("[INGEST] Rejected request without JSON content type");
        return bad_request(
            "Content-Type must be application/json",
            "Send readings as JSON with header 'Content-Type: application/json'",
        );
    }

    let payload = match codec::decode(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!("[INGEST] Undecodable payload: {}", e);
            return bad_request("Invalid JSON", e.to_string());
        }
    };

    debug!(
        "[INGEST] {} = {} @ {}",
        payload.sensor_type, payload.sensor_value, payload.timestamp
    );

    let field = match validation::validate(&payload) {
        Ok(f) => f,
        Err(e) => {
            warn!("[INGEST] Validation failed: {}", e);
            return bad_request("Invalid sensor data", e.to_string());
        }
    };

    let received_at_ms = now_ms();
    let timestamp_ms = match payload.timestamp {
        0 => received_at_ms,
        raw => normalize_timestamp_ms(raw),
    };

    let reading = StoredReading {
        id: state.store.next_id(),
        sensor_id: payload.sensor_id,
        device_id: payload.device_id,
        sensor_type: field,
        sensor_value: payload.sensor_value,
        timestamp_ms,
        received_at_ms,
    };
    info!(
        "[INGEST] Stored #{} {} = {} from {}",
        reading.id,
        field,
        reading.sensor_value,
        reading.device_id.as_deref().unwrap_or("unknown")
    );
    state.store.insert(reading).await;

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Reading received and stored",
            "data": {
                "sensor_type": field,
                "sensor_value": payload.sensor_value,
                "timestamp": timestamp_ms,
                "datetime": iso_from_ms(timestamp_ms),
            }
        })),
    )
}

/// Query parameters for GET /sensors
#[derive(Debug, Deserialize)]
pub struct SensorQuery {
    pub sensor_type: Option<String>,
    pub limit: Option<usize>,
}

/// GET /sensors - newest readings first
pub async fn list_sensors(
    State(state): State<AppState>,
    Query(query): Query<SensorQuery>,
) -> JsonResponse {
    let field = match query.sensor_type.as_deref().map(str::parse::<SensorField>) {
        Some(Ok(f)) => Some(f),
        Some(Err(e)) => return bad_request("Invalid sensor_type", e.to_string()),
        None => None,
    };

    let readings = state
        .store
        .query(field, query.limit.unwrap_or(DEFAULT_QUERY_LIMIT))
        .await;

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "count": readings.len(),
            "data": readings,
        })),
    )
}

/// GET /health - liveness probe used by node discovery
pub async fn health(State(state): State<AppState>) -> JsonResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "stored": state.store.len().await,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
