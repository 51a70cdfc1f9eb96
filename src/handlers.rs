use crate::errors::DispenserEngineError;
use crate::models::CreateDispenserRequest;
use crate::services::DispenserService;
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "dispenser-engine",
        "version": "1.0.0"
    }))
}

/// Register a new dispenser
pub async fn create_dispenser(
    service: web::Data<Arc<DispenserService>>,
    request: web::Json<CreateDispenserRequest>,
) -> Result<HttpResponse, DispenserEngineError> {
    let dispenser = service.create_dispenser(request.flow_volume).await?;
    Ok(HttpResponse::Created().json(dispenser))
}

/// List all registered dispensers
pub async fn list_dispensers(
    service: web::Data<Arc<DispenserService>>,
) -> Result<HttpResponse, DispenserEngineError> {
    let dispensers = service.list_dispensers().await?;
    Ok(HttpResponse::Ok().json(dispensers))
}

/// Open the tap of a dispenser.
///
/// A `false` outcome from the service means the tap is already open; that is
/// mapped to 404 so callers can tell a no-op transition apart from a storage
/// failure (500).
pub async fn open_tap(
    service: web::Data<Arc<DispenserService>>,
    dispenser_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispenserEngineError> {
    if service.open_tap(*dispenser_id).await? {
        return Ok(HttpResponse::Ok().json(json!({
            "dispenser_id": *dispenser_id,
            "status": "open"
        })));
    }

    warn!("Dispenser {} tap is already open", dispenser_id);
    Ok(HttpResponse::NotFound().json(json!({
        "error": {
            "code": 404,
            "message": format!("Tap for dispenser {} is already open", dispenser_id),
            "type": "tap_already_open"
        }
    })))
}

/// Close the tap of a dispenser.
pub async fn close_tap(
    service: web::Data<Arc<DispenserService>>,
    dispenser_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispenserEngineError> {
    if service.close_tap(*dispenser_id).await? {
        return Ok(HttpResponse::Ok().json(json!({
            "dispenser_id": *dispenser_id,
            "status": "closed"
        })));
    }

    warn!("Dispenser {} tap is already closed or not in use", dispenser_id);
    Ok(HttpResponse::NotFound().json(json!({
        "error": {
            "code": 404,
            "message": format!("Tap for dispenser {} is already closed or not in use", dispenser_id),
            "type": "tap_already_closed"
        }
    })))
}

/// List every usage session recorded for a dispenser
pub async fn list_sessions(
    service: web::Data<Arc<DispenserService>>,
    dispenser_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispenserEngineError> {
    let sessions = service.list_sessions(*dispenser_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "dispenser_id": *dispenser_id,
        "total_sessions": sessions.len(),
        "sessions": sessions
    })))
}

/// Usage reports for all registered dispensers
pub async fn usage_reports(
    service: web::Data<Arc<DispenserService>>,
) -> Result<HttpResponse, DispenserEngineError> {
    let reports = service.usage_reports().await?;
    Ok(HttpResponse::Ok().json(reports))
}

/// Configure routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/dispensers")
            .route("/health", web::get().to(health_check))
            .route("/usage-info", web::get().to(usage_reports))
            .route("", web::post().to(create_dispenser))
            .route("", web::get().to(list_dispensers))
            .route("/{id}/open", web::post().to(open_tap))
            .route("/{id}/close", web::post().to(close_tap))
            .route("/{id}/sessions", web::get().to(list_sessions)),
    );
}
