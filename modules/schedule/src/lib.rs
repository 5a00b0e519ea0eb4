//! Personal class schedule and exam tracker: accounts, weekly courses,
//! exams, dashboard statistics, import/export and administration.

// === PUBLIC CONTRACT ===
pub mod contract;

// === MODULE DEFINITION ===
pub mod config;
pub mod module;
pub use config::ScheduleConfig;
pub use module::ScheduleModule;

// === INTERNAL MODULES ===
// Exposed for the integration tests under tests/.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;

pub use domain::insights::compute_schedule_insights;
