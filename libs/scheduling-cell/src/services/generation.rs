use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::{
    GenerateSlotsRequest, GenerationRequest, GenerationState, GenerationSummary, SchedulingError,
    TypeSummary, WeekendDecision,
};
use crate::services::calendar::{expand_range, find_weekends};
use crate::services::conflict::validate_windows;
use crate::services::remote::CalendarApi;

/// Drives one slot-generation attempt through its state machine:
///
/// ```text
/// Idle -> Validating -> ConflictBlocked
///                    -> WeekendConfirmPending -> Generating -> Completed
///                    -> Generating             (cancel -> Idle)    Failed
/// ```
///
/// The weekend checkpoint is the only suspension point: a multi-day range
/// touching a weekend waits for an include/exclude/cancel decision before
/// any call leaves the process. Single-day ranges always include their day,
/// even a Saturday. Per-type calls run one at a time; a rejection leaves
/// already-generated slots in place and surfaces the first error.
pub struct SlotGenerationOrchestrator {
    calendar: Arc<dyn CalendarApi>,
    state: GenerationState,
    pending: Option<GenerationRequest>,
}

impl SlotGenerationOrchestrator {
    pub fn new(calendar: Arc<dyn CalendarApi>) -> Self {
        Self {
            calendar,
            state: GenerationState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    /// Return to `Idle`, dropping any suspended request.
    pub fn reset(&mut self) {
        self.state = GenerationState::Idle;
        self.pending = None;
    }

    /// Validate the request and either suspend at the weekend checkpoint or
    /// run the generation batch to a terminal state.
    pub async fn begin(
        &mut self,
        request: GenerationRequest,
        auth_token: &str,
    ) -> Result<&GenerationState, SchedulingError> {
        if !matches!(self.state, GenerationState::Idle) {
            return Err(SchedulingError::InvalidState(
                "a generation attempt is already underway".to_string(),
            ));
        }

        if request.configs.is_empty() {
            return Err(SchedulingError::ValidationError(
                "at least one appointment type is required".to_string(),
            ));
        }

        self.state = GenerationState::Validating;
        debug!(
            "Validating {} appointment types for doctor {} over {} - {}",
            request.configs.len(),
            request.doctor_id,
            request.range.start,
            request.range.end
        );

        let validation = validate_windows(&request.configs);
        if !validation.is_clean() {
            warn!(
                "Generation blocked for doctor {}: {} errors, {} conflicts",
                request.doctor_id,
                validation.errors.len(),
                validation.conflicts.len()
            );
            self.state = GenerationState::ConflictBlocked {
                errors: validation.errors,
                conflicts: validation.conflicts,
            };
            return Ok(&self.state);
        }

        let days = expand_range(request.range.start, request.range.end);
        if days.is_empty() {
            // Inverted range: nothing to generate, nothing to call.
            self.state = GenerationState::Completed {
                summary: GenerationSummary::default(),
            };
            return Ok(&self.state);
        }

        if days.len() == 1 {
            // Single-day ranges never prompt; the day counts even on a weekend.
            self.run_generation(request, true, auth_token).await;
            return Ok(&self.state);
        }

        let weekends = find_weekends(request.range.start, request.range.end);
        if weekends.is_empty() {
            self.run_generation(request, true, auth_token).await;
            return Ok(&self.state);
        }

        debug!(
            "Range {} - {} contains {} weekend days, awaiting decision",
            request.range.start,
            request.range.end,
            weekends.len()
        );
        self.pending = Some(request);
        self.state = GenerationState::WeekendConfirmPending { weekends };
        Ok(&self.state)
    }

    /// Resume a run suspended at the weekend checkpoint.
    pub async fn resolve_weekends(
        &mut self,
        decision: WeekendDecision,
        auth_token: &str,
    ) -> Result<&GenerationState, SchedulingError> {
        if !matches!(self.state, GenerationState::WeekendConfirmPending { .. }) {
            return Err(SchedulingError::InvalidState(
                "no weekend decision is pending".to_string(),
            ));
        }

        let request = self.pending.take().ok_or_else(|| {
            SchedulingError::InvalidState("no suspended generation request".to_string())
        })?;

        match decision {
            WeekendDecision::Cancel => {
                debug!("Generation cancelled at weekend checkpoint");
                self.state = GenerationState::Idle;
            }
            WeekendDecision::Include => {
                self.run_generation(request, true, auth_token).await;
            }
            WeekendDecision::Exclude => {
                self.run_generation(request, false, auth_token).await;
            }
        }

        Ok(&self.state)
    }

    /// Issue one generation call per configured type, strictly in sequence.
    /// Ends in `Completed` or, on the first rejection, in `Failed` with the
    /// breakdown of what was already created (no rollback).
    async fn run_generation(
        &mut self,
        request: GenerationRequest,
        include_weekends: bool,
        auth_token: &str,
    ) {
        self.state = GenerationState::Generating;

        // Blocked slots are registered before any slots exist to land in them.
        for blocked in &request.blocked_slots {
            if let Err(e) = self
                .calendar
                .add_blocked_slot(request.doctor_id, blocked, auth_token)
                .await
            {
                warn!("Failed to register blocked slot: {}", e);
                self.state = GenerationState::Failed {
                    message: e.to_string(),
                    partial: GenerationSummary {
                        include_weekends,
                        ..GenerationSummary::default()
                    },
                };
                return;
            }
        }

        let mut summary = GenerationSummary {
            total_generated: 0,
            include_weekends,
            per_type: Vec::new(),
        };

        for config in &request.configs {
            let call = GenerateSlotsRequest {
                doctor_id: request.doctor_id,
                start_date: request.range.start,
                end_date: request.range.end,
                appointment_type_id: config.type_id,
                include_weekends,
                start_time: config.start_time,
                end_time: config.end_time,
                duration_minutes: config.duration_minutes,
            };

            match self.calendar.generate_slots(&call, auth_token).await {
                Ok(batch) => {
                    summary.total_generated += batch.slots.len();
                    summary.per_type.push(TypeSummary {
                        type_name: config.type_name.clone(),
                        count: batch.slots.len(),
                        time_window: config.window_label(),
                    });
                }
                Err(e) => {
                    warn!(
                        "Slot generation failed for type {} ({} types already done): {}",
                        config.type_name,
                        summary.per_type.len(),
                        e
                    );
                    self.state = GenerationState::Failed {
                        message: e.to_string(),
                        partial: summary,
                    };
                    return;
                }
            }
        }

        debug!(
            "Generated {} slots across {} appointment types",
            summary.total_generated,
            summary.per_type.len()
        );
        self.state = GenerationState::Completed { summary };
    }
}
