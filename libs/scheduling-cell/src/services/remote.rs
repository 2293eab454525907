use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AppointmentTypeConfig, BlockedSlotRequest, GenerateSlotsRequest, SchedulingError, SlotBatch,
};

/// Remote calendar collaborator consumed by the orchestrator and handlers.
/// Slot generation itself happens on the other side of this seam; the cell
/// only drives it.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Generate slots for one appointment type over a date range. The time
    /// window and slot duration are parameters of the call itself.
    async fn generate_slots(
        &self,
        request: &GenerateSlotsRequest,
        auth_token: &str,
    ) -> Result<SlotBatch, SchedulingError>;

    /// Register a blocked slot (lunch break, admin time, ...).
    async fn add_blocked_slot(
        &self,
        doctor_id: Uuid,
        request: &BlockedSlotRequest,
        auth_token: &str,
    ) -> Result<(), SchedulingError>;

    /// Persist edited appointment-type windows and durations.
    async fn update_appointment_types(
        &self,
        doctor_id: Uuid,
        types: &[AppointmentTypeConfig],
        auth_token: &str,
    ) -> Result<(), SchedulingError>;
}

pub struct CalendarClient {
    supabase: SupabaseClient,
}

impl CalendarClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl CalendarApi for CalendarClient {
    async fn generate_slots(
        &self,
        request: &GenerateSlotsRequest,
        auth_token: &str,
    ) -> Result<SlotBatch, SchedulingError> {
        debug!(
            "Requesting slot generation for type {} from {} to {}",
            request.appointment_type_id, request.start_date, request.end_date
        );

        let body = json!({
            "doctor_id": request.doctor_id,
            "start_date": request.start_date.to_string(),
            "end_date": request.end_date.to_string(),
            "appointment_type_id": request.appointment_type_id,
            "include_weekends": request.include_weekends,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
            "duration_minutes": request.duration_minutes,
        });

        let batch: SlotBatch = self
            .supabase
            .request(
                Method::POST,
                "/rest/v1/rpc/generate_slots",
                Some(auth_token),
                Some(body),
            )
            .await
            .map_err(|e| SchedulingError::RemoteError(e.to_string()))?;

        debug!(
            "Remote generated {} slots for type {}",
            batch.slots.len(),
            request.appointment_type_id
        );

        Ok(batch)
    }

    async fn add_blocked_slot(
        &self,
        doctor_id: Uuid,
        request: &BlockedSlotRequest,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        debug!(
            "Blocking slot for doctor {} from {} to {}",
            doctor_id, request.start_time, request.end_time
        );

        let blocked_data = json!({
            "doctor_id": doctor_id,
            "start_time": request.start_time.to_rfc3339(),
            "end_time": request.end_time.to_rfc3339(),
            "reason": request.reason,
            "created_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/blocked_slots",
                Some(auth_token),
                Some(blocked_data),
                Some(headers),
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(SchedulingError::DatabaseError(
                "Failed to create blocked slot".to_string(),
            ));
        }

        Ok(())
    }

    async fn update_appointment_types(
        &self,
        doctor_id: Uuid,
        types: &[AppointmentTypeConfig],
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        debug!(
            "Updating {} appointment types for doctor {}",
            types.len(),
            doctor_id
        );

        for config in types {
            let update_data = json!({
                "name": config.type_name,
                "duration_minutes": config.duration_minutes,
                "start_time": config.start_time.format("%H:%M:%S").to_string(),
                "end_time": config.end_time.format("%H:%M:%S").to_string(),
                "updated_at": Utc::now().to_rfc3339(),
            });

            let path = format!(
                "/rest/v1/appointment_types?id=eq.{}&doctor_id=eq.{}",
                config.type_id, doctor_id
            );

            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                "Prefer",
                reqwest::header::HeaderValue::from_static("return=representation"),
            );

            let result: Vec<Value> = self
                .supabase
                .request_with_headers(
                    Method::PATCH,
                    &path,
                    Some(auth_token),
                    Some(update_data),
                    Some(headers),
                )
                .await
                .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

            if result.is_empty() {
                return Err(SchedulingError::DatabaseError(format!(
                    "Appointment type {} not found",
                    config.type_id
                )));
            }
        }

        Ok(())
    }
}
