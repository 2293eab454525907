use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AppointmentTypeConfig, BlockedSlotRequest, DateRange, GenerationRequest, GenerationState,
    SchedulingError, WeekendDecision, WindowConflict,
};
use crate::services::calendar;
use crate::services::conflict::validate_windows;
use crate::services::generation::SlotGenerationOrchestrator;
use crate::services::remote::{CalendarApi, CalendarClient};

// Query / request payloads

#[derive(Debug, Deserialize)]
pub struct SlotPreviewRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub configs: Vec<AppointmentTypeConfig>,
}

#[derive(Debug, Deserialize)]
pub struct SlotGenerateRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub configs: Vec<AppointmentTypeConfig>,
    #[serde(default)]
    pub blocked_slots: Vec<BlockedSlotRequest>,
    pub weekend_decision: Option<WeekendDecision>,
}

#[derive(Debug, Deserialize)]
pub struct WeekendQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTypesRequest {
    pub types: Vec<AppointmentTypeConfig>,
}

fn conflict_message(conflicts: &[WindowConflict]) -> String {
    conflicts
        .iter()
        .map(|c| {
            format!(
                "{} ({}) overlaps {} ({})",
                c.first_type, c.first_window, c.second_type, c.second_window
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// ==============================================================================
// SLOT GENERATION HANDLERS
// ==============================================================================

/// Dry-run validation: window errors, conflicting pairs and the weekend days
/// a generation over this range would ask about. No remote calls.
#[axum::debug_handler]
pub async fn preview_slot_generation(
    Path(_doctor_id): Path<Uuid>,
    Json(request): Json<SlotPreviewRequest>,
) -> Result<Json<Value>, AppError> {
    let validation = validate_windows(&request.configs);
    let weekends = calendar::find_weekends(request.start_date, request.end_date);

    let multi_day = request.start_date < request.end_date;
    let requires_weekend_decision = validation.is_clean() && multi_day && !weekends.is_empty();

    Ok(Json(json!({
        "errors": validation.errors,
        "conflicts": validation.conflicts,
        "weekends": weekends,
        "requires_weekend_decision": requires_weekend_decision,
    })))
}

/// Drive a full generation attempt. When the range needs a weekend decision
/// and the request does not carry one, the response asks for it and nothing
/// is generated.
#[axum::debug_handler]
pub async fn generate_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<SlotGenerateRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let calendar_client: Arc<dyn CalendarApi> = Arc::new(CalendarClient::new(&state));
    let mut orchestrator = SlotGenerationOrchestrator::new(calendar_client);

    let generation_request = GenerationRequest {
        doctor_id,
        range: DateRange {
            start: request.start_date,
            end: request.end_date,
        },
        configs: request.configs,
        blocked_slots: request.blocked_slots,
    };

    orchestrator
        .begin(generation_request, token)
        .await
        .map_err(|e| match e {
            SchedulingError::ValidationError(msg) => AppError::BadRequest(msg),
            SchedulingError::InvalidState(msg) => AppError::BadRequest(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    if matches!(
        orchestrator.state(),
        GenerationState::WeekendConfirmPending { .. }
    ) {
        match request.weekend_decision {
            Some(decision) => {
                orchestrator
                    .resolve_weekends(decision, token)
                    .await
                    .map_err(|e| AppError::Internal(e.to_string()))?;
            }
            None => {
                if let GenerationState::WeekendConfirmPending { weekends } = orchestrator.state() {
                    return Ok(Json(json!({
                        "success": false,
                        "requires_weekend_decision": true,
                        "weekends": weekends,
                        "message": "The selected range includes weekend days",
                    })));
                }
            }
        }
    }

    match orchestrator.state() {
        GenerationState::ConflictBlocked { errors, conflicts } => Ok(Json(json!({
            "success": false,
            "blocked": true,
            "errors": errors,
            "conflicts": conflicts,
            "message": "Resolve conflicting time windows before generating slots",
        }))),
        GenerationState::Idle => Ok(Json(json!({
            "success": false,
            "cancelled": true,
            "message": "Slot generation cancelled",
        }))),
        GenerationState::Completed { summary } => Ok(Json(json!({
            "success": true,
            "summary": summary,
            "message": format!(
                "Generated {} slots across {} appointment types",
                summary.total_generated,
                summary.per_type.len()
            ),
        }))),
        GenerationState::Failed { message, .. } => {
            Err(AppError::ExternalService(message.clone()))
        }
        _ => Err(AppError::Internal("Unexpected generation state".to_string())),
    }
}

/// List the weekend days inside a range. An inverted range yields an empty
/// list, matching the expander.
#[axum::debug_handler]
pub async fn list_weekends(
    Path(_doctor_id): Path<Uuid>,
    Query(query): Query<WeekendQuery>,
) -> Result<Json<Value>, AppError> {
    let weekends = calendar::find_weekends(query.start, query.end);

    Ok(Json(json!({
        "count": weekends.len(),
        "weekends": weekends,
    })))
}

#[axum::debug_handler]
pub async fn add_blocked_slot(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<BlockedSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if request.start_time >= request.end_time {
        return Err(AppError::BadRequest(
            "Blocked slot start time must be before end time".to_string(),
        ));
    }

    let calendar_client = CalendarClient::new(&state);
    calendar_client
        .add_blocked_slot(doctor_id, &request, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Blocked slot created",
    })))
}

/// Persist edited appointment-type windows, refusing edits that would leave
/// the doctor's windows in conflict.
#[axum::debug_handler]
pub async fn update_appointment_types(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateTypesRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if request.types.is_empty() {
        return Err(AppError::BadRequest(
            "At least one appointment type is required".to_string(),
        ));
    }

    let validation = validate_windows(&request.types);
    if !validation.conflicts.is_empty() {
        return Err(AppError::Conflict(conflict_message(&validation.conflicts)));
    }
    if !validation.errors.is_empty() {
        return Err(AppError::ValidationError(validation.errors.join("; ")));
    }

    let calendar_client = CalendarClient::new(&state);
    calendar_client
        .update_appointment_types(doctor_id, &request.types, token)
        .await
        .map_err(|e| match e {
            SchedulingError::DatabaseError(msg) if msg.contains("not found") => {
                AppError::NotFound(msg)
            }
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "updated": request.types.len(),
        "message": "Appointment types updated",
    })))
}
