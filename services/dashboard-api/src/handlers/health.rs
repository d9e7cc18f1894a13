use axum::{extract::State, response::Json};
use clearcoa_database::postgres_health_check;
use serde_json::{json, Value};

use crate::AppState;

pub async fn detailed_health_check(State(state): State<AppState>) -> Json<Value> {
    let mut health_status = json!({
        "status": "healthy",
        "service": "clearcoa-dashboard-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {}
    });

    // Check PostgreSQL
    let postgres_status = match postgres_health_check(&state.pool).await {
        Ok(_) => json!({"status": "healthy", "message": "Connected"}),
        Err(e) => json!({"status": "unhealthy", "message": e.to_string()}),
    };
    health_status["checks"]["postgres"] = postgres_status;

    // Check object storage
    let storage_status = match state.storage.health_check().await {
        Ok(_) => json!({"status": "healthy", "message": format!("Bucket {} reachable", state.storage.bucket())}),
        Err(e) => json!({"status": "unhealthy", "message": e.to_string()}),
    };
    health_status["checks"]["storage"] = storage_status;

    // Determine overall status
    let all_healthy = health_status["checks"]
        .as_object()
        .map(|checks| checks.values().all(|check| check["status"] == "healthy"))
        .unwrap_or(false);

    if !all_healthy {
        health_status["status"] = json!("degraded");
    }

    Json(health_status)
}
