use tracing::debug;

use crate::models::{AppointmentTypeConfig, WindowConflict, WindowValidation};

/// Validate the staged appointment-type windows against each other.
///
/// Per-config checks come first (inverted window, window too narrow for one
/// slot), then every unordered pair is tested for overlap. Windows are
/// half-open `[start, end)`, so back-to-back windows sharing a boundary do
/// not conflict.
pub fn validate_windows(configs: &[AppointmentTypeConfig]) -> WindowValidation {
    let mut validation = WindowValidation::default();

    for config in configs {
        if config.start_time >= config.end_time {
            validation.errors.push(format!(
                "{}: end time must be after start time",
                config.type_name
            ));
            continue;
        }

        if config.available_minutes() < config.duration_minutes as i64 {
            validation.errors.push(format!(
                "{}: window {} is too short for a single {}-minute slot",
                config.type_name,
                config.window_label(),
                config.duration_minutes
            ));
        }
    }

    for i in 0..configs.len() {
        for j in (i + 1)..configs.len() {
            let first = &configs[i];
            let second = &configs[j];

            if first.start_time < second.end_time && second.start_time < first.end_time {
                validation.conflicts.push(WindowConflict {
                    first_type: first.type_name.clone(),
                    first_window: first.window_label(),
                    second_type: second.type_name.clone(),
                    second_window: second.window_label(),
                });
            }
        }
    }

    if !validation.is_clean() {
        debug!(
            "Window validation found {} errors and {} conflicts across {} configs",
            validation.errors.len(),
            validation.conflicts.len(),
            configs.len()
        );
    }

    validation
}
