// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// APPOINTMENT TYPE CONFIGURATION
// ==============================================================================

/// One appointment type staged for a slot-generation batch: a daily time
/// window plus the duration of each slot inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentTypeConfig {
    pub type_id: Uuid,
    pub type_name: String,
    pub duration_minutes: i32,
    #[serde(with = "window_time")]
    pub start_time: NaiveTime,
    #[serde(with = "window_time")]
    pub end_time: NaiveTime,
}

impl AppointmentTypeConfig {
    /// Minutes between window start and end. Negative for inverted windows.
    pub fn available_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Human-readable window, e.g. "09:00 - 12:00".
    pub fn window_label(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

/// Window times travel as zero-padded "HH:MM" strings ("HH:MM:SS" is also
/// accepted on input).
pub mod window_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
            .map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// DATE RANGE AND VALIDATION MODELS
// ==============================================================================

/// Inclusive calendar range at day granularity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

/// One overlapping pair of appointment-type windows, ready for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowConflict {
    pub first_type: String,
    pub first_window: String,
    pub second_type: String,
    pub second_window: String,
}

/// Outcome of window validation: per-config errors plus pairwise conflicts.
/// Conflicts take surfacing priority, but errors are always carried along.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WindowValidation {
    pub errors: Vec<String>,
    pub conflicts: Vec<WindowConflict>,
}

impl WindowValidation {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.conflicts.is_empty()
    }
}

// ==============================================================================
// GENERATION REQUEST / RESULT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedSlotRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Everything needed for one generation attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub doctor_id: Uuid,
    pub range: DateRange,
    pub configs: Vec<AppointmentTypeConfig>,
    #[serde(default)]
    pub blocked_slots: Vec<BlockedSlotRequest>,
}

/// One per-type call to the remote calendar collaborator. The time window
/// travels with the call itself, so no persisted type configuration has to
/// be staged or restored around generation.
#[derive(Debug, Clone)]
pub struct GenerateSlotsRequest {
    pub doctor_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub appointment_type_id: Uuid,
    pub include_weekends: bool,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotBatch {
    pub slots: Vec<GeneratedSlot>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TypeSummary {
    pub type_name: String,
    pub count: usize,
    pub time_window: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GenerationSummary {
    pub total_generated: usize,
    pub include_weekends: bool,
    pub per_type: Vec<TypeSummary>,
}

// ==============================================================================
// ORCHESTRATOR STATE MACHINE
// ==============================================================================

/// Decision taken at the weekend confirmation checkpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WeekendDecision {
    Include,
    Exclude,
    Cancel,
}

/// States of a single slot-generation attempt. `WeekendConfirmPending` is
/// the one suspension point that waits for external input; `ConflictBlocked`,
/// `Completed` and `Failed` are stable until the caller resets.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GenerationState {
    Idle,
    Validating,
    ConflictBlocked {
        errors: Vec<String>,
        conflicts: Vec<WindowConflict>,
    },
    WeekendConfirmPending {
        weekends: Vec<NaiveDate>,
    },
    Generating,
    Completed {
        summary: GenerationSummary,
    },
    Failed {
        message: String,
        partial: GenerationSummary,
    },
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Time windows conflict between appointment types")]
    ConflictDetected,

    #[error("Invalid generation state: {0}")]
    InvalidState(String),

    #[error("Remote generation error: {0}")]
    RemoteError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
