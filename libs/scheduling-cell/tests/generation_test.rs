// libs/scheduling-cell/tests/generation_test.rs
//
// State machine coverage for the slot generation orchestrator, driven
// against an in-process fake of the remote calendar collaborator.

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use scheduling_cell::models::{
    AppointmentTypeConfig, BlockedSlotRequest, DateRange, GenerateSlotsRequest, GenerationRequest,
    GenerationState, GeneratedSlot, SchedulingError, SlotBatch, WeekendDecision,
};
use scheduling_cell::services::generation::SlotGenerationOrchestrator;
use scheduling_cell::services::remote::CalendarApi;

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

#[derive(Default)]
struct FakeCalendar {
    generate_calls: Mutex<Vec<GenerateSlotsRequest>>,
    call_log: Mutex<Vec<String>>,
    slots_per_call: usize,
    fail_on_type: Option<Uuid>,
    fail_blocked_slots: bool,
}

impl FakeCalendar {
    fn with_slots(slots_per_call: usize) -> Self {
        Self {
            slots_per_call,
            ..Self::default()
        }
    }
}

#[async_trait]
impl CalendarApi for FakeCalendar {
    async fn generate_slots(
        &self,
        request: &GenerateSlotsRequest,
        _auth_token: &str,
    ) -> Result<SlotBatch, SchedulingError> {
        self.generate_calls.lock().unwrap().push(request.clone());
        self.call_log
            .lock()
            .unwrap()
            .push(format!("generate:{}", request.appointment_type_id));

        if self.fail_on_type == Some(request.appointment_type_id) {
            return Err(SchedulingError::RemoteError(
                "slot generation rejected".to_string(),
            ));
        }

        let base = Utc::now();
        let slots = (0..self.slots_per_call)
            .map(|i| GeneratedSlot {
                start_time: base + Duration::minutes(30 * i as i64),
                end_time: base + Duration::minutes(30 * (i + 1) as i64),
            })
            .collect();

        Ok(SlotBatch { slots })
    }

    async fn add_blocked_slot(
        &self,
        _doctor_id: Uuid,
        _request: &BlockedSlotRequest,
        _auth_token: &str,
    ) -> Result<(), SchedulingError> {
        self.call_log.lock().unwrap().push("blocked".to_string());

        if self.fail_blocked_slots {
            return Err(SchedulingError::DatabaseError(
                "blocked slot insert failed".to_string(),
            ));
        }
        Ok(())
    }

    async fn update_appointment_types(
        &self,
        _doctor_id: Uuid,
        _types: &[AppointmentTypeConfig],
        _auth_token: &str,
    ) -> Result<(), SchedulingError> {
        Ok(())
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn config(name: &str, start: &str, end: &str, duration: i32) -> AppointmentTypeConfig {
    AppointmentTypeConfig {
        type_id: Uuid::new_v4(),
        type_name: name.to_string(),
        duration_minutes: duration,
        start_time: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
        end_time: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
    }
}

fn request(start: NaiveDate, end: NaiveDate, configs: Vec<AppointmentTypeConfig>) -> GenerationRequest {
    GenerationRequest {
        doctor_id: Uuid::new_v4(),
        range: DateRange { start, end },
        configs,
        blocked_slots: vec![],
    }
}

// ==============================================================================
// VALIDATION PATHS
// ==============================================================================

#[tokio::test]
async fn test_empty_configs_are_rejected() {
    let fake = Arc::new(FakeCalendar::with_slots(4));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake);

    let result = orchestrator
        .begin(request(date(2024, 6, 3), date(2024, 6, 7), vec![]), "token")
        .await;

    assert_matches!(result, Err(SchedulingError::ValidationError(_)));
}

#[tokio::test]
async fn test_conflicting_windows_block_generation() {
    let fake = Arc::new(FakeCalendar::with_slots(4));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake.clone());

    orchestrator
        .begin(
            request(
                date(2024, 6, 3),
                date(2024, 6, 7),
                vec![
                    config("A", "09:00", "12:00", 30),
                    config("B", "11:00", "13:00", 30),
                ],
            ),
            "token",
        )
        .await
        .unwrap();

    match orchestrator.state() {
        GenerationState::ConflictBlocked { conflicts, .. } => {
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].first_type, "A");
            assert_eq!(conflicts[0].second_type, "B");
        }
        other => panic!("expected ConflictBlocked, got {:?}", other),
    }

    // Blocked before anything left the process.
    assert!(fake.generate_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_window_errors_block_generation_without_conflicts() {
    let fake = Arc::new(FakeCalendar::with_slots(4));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake.clone());

    orchestrator
        .begin(
            request(
                date(2024, 6, 3),
                date(2024, 6, 7),
                vec![config("A", "09:00", "09:00", 30)],
            ),
            "token",
        )
        .await
        .unwrap();

    match orchestrator.state() {
        GenerationState::ConflictBlocked { errors, conflicts } => {
            assert_eq!(errors.len(), 1);
            assert!(conflicts.is_empty());
        }
        other => panic!("expected ConflictBlocked, got {:?}", other),
    }
    assert!(fake.generate_calls.lock().unwrap().is_empty());
}

// ==============================================================================
// WEEKEND CHECKPOINT
// ==============================================================================

#[tokio::test]
async fn test_single_day_saturday_generates_without_prompt() {
    let fake = Arc::new(FakeCalendar::with_slots(6));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake.clone());

    // 2024-06-08 is a Saturday.
    orchestrator
        .begin(
            request(
                date(2024, 6, 8),
                date(2024, 6, 8),
                vec![config("Consultation", "09:00", "12:00", 30)],
            ),
            "token",
        )
        .await
        .unwrap();

    assert_matches!(orchestrator.state(), GenerationState::Completed { .. });

    let calls = fake.generate_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].include_weekends);
}

#[tokio::test]
async fn test_multi_day_without_weekends_skips_prompt() {
    let fake = Arc::new(FakeCalendar::with_slots(6));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake.clone());

    // Monday to Friday.
    orchestrator
        .begin(
            request(
                date(2024, 6, 3),
                date(2024, 6, 7),
                vec![config("Consultation", "09:00", "12:00", 30)],
            ),
            "token",
        )
        .await
        .unwrap();

    assert_matches!(orchestrator.state(), GenerationState::Completed { .. });
    assert_eq!(fake.generate_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_weekend_range_suspends_for_decision() {
    let fake = Arc::new(FakeCalendar::with_slots(6));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake.clone());

    orchestrator
        .begin(
            request(
                date(2024, 6, 3),
                date(2024, 6, 9),
                vec![config("Consultation", "09:00", "12:00", 30)],
            ),
            "token",
        )
        .await
        .unwrap();

    match orchestrator.state() {
        GenerationState::WeekendConfirmPending { weekends } => {
            assert_eq!(weekends, &vec![date(2024, 6, 8), date(2024, 6, 9)]);
        }
        other => panic!("expected WeekendConfirmPending, got {:?}", other),
    }
    assert!(fake.generate_calls.lock().unwrap().is_empty());

    orchestrator
        .resolve_weekends(WeekendDecision::Include, "token")
        .await
        .unwrap();

    assert_matches!(orchestrator.state(), GenerationState::Completed { .. });
    assert!(fake.generate_calls.lock().unwrap()[0].include_weekends);
}

#[tokio::test]
async fn test_weekend_exclusion_is_passed_through() {
    let fake = Arc::new(FakeCalendar::with_slots(6));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake.clone());

    orchestrator
        .begin(
            request(
                date(2024, 6, 3),
                date(2024, 6, 9),
                vec![config("Consultation", "09:00", "12:00", 30)],
            ),
            "token",
        )
        .await
        .unwrap();
    orchestrator
        .resolve_weekends(WeekendDecision::Exclude, "token")
        .await
        .unwrap();

    assert_matches!(orchestrator.state(), GenerationState::Completed { .. });
    assert!(!fake.generate_calls.lock().unwrap()[0].include_weekends);
}

#[tokio::test]
async fn test_cancel_returns_to_idle_without_calls() {
    let fake = Arc::new(FakeCalendar::with_slots(6));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake.clone());

    orchestrator
        .begin(
            request(
                date(2024, 6, 3),
                date(2024, 6, 9),
                vec![config("Consultation", "09:00", "12:00", 30)],
            ),
            "token",
        )
        .await
        .unwrap();
    orchestrator
        .resolve_weekends(WeekendDecision::Cancel, "token")
        .await
        .unwrap();

    assert_matches!(orchestrator.state(), GenerationState::Idle);
    assert!(fake.generate_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_resolve_without_pending_decision_is_invalid() {
    let fake = Arc::new(FakeCalendar::with_slots(6));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake);

    let result = orchestrator
        .resolve_weekends(WeekendDecision::Include, "token")
        .await;

    assert_matches!(result, Err(SchedulingError::InvalidState(_)));
}

// ==============================================================================
// GENERATION BATCH
// ==============================================================================

#[tokio::test]
async fn test_summary_aggregates_per_type_counts() {
    let fake = Arc::new(FakeCalendar::with_slots(5));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake.clone());

    let configs = vec![
        config("Consultation", "09:00", "12:00", 30),
        config("Follow-up", "13:00", "17:00", 20),
    ];

    orchestrator
        .begin(request(date(2024, 6, 3), date(2024, 6, 7), configs), "token")
        .await
        .unwrap();

    match orchestrator.state() {
        GenerationState::Completed { summary } => {
            assert_eq!(summary.total_generated, 10);
            assert_eq!(summary.per_type.len(), 2);
            assert_eq!(summary.per_type[0].type_name, "Consultation");
            assert_eq!(summary.per_type[0].count, 5);
            assert_eq!(summary.per_type[0].time_window, "09:00 - 12:00");
            assert_eq!(summary.per_type[1].type_name, "Follow-up");
        }
        other => panic!("expected Completed, got {:?}", other),
    }

    // One sequential call per type, in the staged order.
    let calls = fake.generate_calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0].start_time,
        NaiveTime::parse_from_str("09:00", "%H:%M").unwrap()
    );
    assert_eq!(calls[0].duration_minutes, 30);
    assert_eq!(calls[1].duration_minutes, 20);
}

#[tokio::test]
async fn test_failure_keeps_earlier_types_and_surfaces_first_error() {
    let mut fake = FakeCalendar::with_slots(3);
    let configs = vec![
        config("Consultation", "09:00", "12:00", 30),
        config("Follow-up", "13:00", "15:00", 20),
        config("Check-in", "15:00", "17:00", 15),
    ];
    fake.fail_on_type = Some(configs[1].type_id);
    let fake = Arc::new(fake);

    let mut orchestrator = SlotGenerationOrchestrator::new(fake.clone());
    orchestrator
        .begin(request(date(2024, 6, 3), date(2024, 6, 7), configs), "token")
        .await
        .unwrap();

    match orchestrator.state() {
        GenerationState::Failed { message, partial } => {
            assert!(message.contains("slot generation rejected"));
            assert_eq!(partial.per_type.len(), 1);
            assert_eq!(partial.per_type[0].type_name, "Consultation");
            assert_eq!(partial.total_generated, 3);
        }
        other => panic!("expected Failed, got {:?}", other),
    }

    // The third type is never attempted after the rejection.
    assert_eq!(fake.generate_calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_blocked_slots_are_registered_before_generation() {
    let fake = Arc::new(FakeCalendar::with_slots(2));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake.clone());

    let mut req = request(
        date(2024, 6, 3),
        date(2024, 6, 7),
        vec![config("Consultation", "09:00", "12:00", 30)],
    );
    req.blocked_slots.push(BlockedSlotRequest {
        start_time: Utc::now(),
        end_time: Utc::now() + Duration::hours(1),
        reason: Some("Lunch".to_string()),
    });

    orchestrator.begin(req, "token").await.unwrap();

    assert_matches!(orchestrator.state(), GenerationState::Completed { .. });

    let log = fake.call_log.lock().unwrap();
    assert_eq!(log[0], "blocked");
    assert!(log[1].starts_with("generate:"));
}

#[tokio::test]
async fn test_blocked_slot_failure_fails_the_run() {
    let mut fake = FakeCalendar::with_slots(2);
    fake.fail_blocked_slots = true;
    let fake = Arc::new(fake);

    let mut orchestrator = SlotGenerationOrchestrator::new(fake.clone());
    let mut req = request(
        date(2024, 6, 3),
        date(2024, 6, 7),
        vec![config("Consultation", "09:00", "12:00", 30)],
    );
    req.blocked_slots.push(BlockedSlotRequest {
        start_time: Utc::now(),
        end_time: Utc::now() + Duration::hours(1),
        reason: None,
    });

    orchestrator.begin(req, "token").await.unwrap();

    assert_matches!(orchestrator.state(), GenerationState::Failed { .. });
    assert!(fake.generate_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_inverted_range_completes_empty_without_calls() {
    let fake = Arc::new(FakeCalendar::with_slots(2));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake.clone());

    orchestrator
        .begin(
            request(
                date(2024, 6, 9),
                date(2024, 6, 3),
                vec![config("Consultation", "09:00", "12:00", 30)],
            ),
            "token",
        )
        .await
        .unwrap();

    match orchestrator.state() {
        GenerationState::Completed { summary } => {
            assert_eq!(summary.total_generated, 0);
            assert!(summary.per_type.is_empty());
        }
        other => panic!("expected Completed, got {:?}", other),
    }
    assert!(fake.generate_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_begin_requires_idle_and_reset_recovers() {
    let fake = Arc::new(FakeCalendar::with_slots(2));
    let mut orchestrator = SlotGenerationOrchestrator::new(fake);

    let configs = vec![config("Consultation", "09:00", "12:00", 30)];
    orchestrator
        .begin(
            request(date(2024, 6, 3), date(2024, 6, 7), configs.clone()),
            "token",
        )
        .await
        .unwrap();
    assert_matches!(orchestrator.state(), GenerationState::Completed { .. });

    let again = orchestrator
        .begin(
            request(date(2024, 6, 3), date(2024, 6, 7), configs.clone()),
            "token",
        )
        .await;
    assert_matches!(again, Err(SchedulingError::InvalidState(_)));

    orchestrator.reset();
    orchestrator
        .begin(request(date(2024, 6, 3), date(2024, 6, 7), configs), "token")
        .await
        .unwrap();
    assert_matches!(orchestrator.state(), GenerationState::Completed { .. });
}
