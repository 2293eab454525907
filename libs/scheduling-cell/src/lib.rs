pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export the core types and entry points for external use
pub use models::*;
pub use services::calendar::{expand_range, find_weekends, is_weekend};
pub use services::conflict::validate_windows;
pub use services::generation::SlotGenerationOrchestrator;
pub use services::remote::{CalendarApi, CalendarClient};
