use serde::{Deserialize, Serialize};

/// Configuration for the schedule module, read from `modules.schedule`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_upcoming_exam_window_days")]
    pub upcoming_exam_window_days: u32,
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
    /// Adds `Secure` to the session cookie; enable behind HTTPS.
    #[serde(default)]
    pub cookie_secure: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
            bcrypt_cost: default_bcrypt_cost(),
            upcoming_exam_window_days: default_upcoming_exam_window_days(),
            max_title_length: default_max_title_length(),
            cookie_secure: false,
        }
    }
}

fn default_session_ttl_hours() -> u32 {
    24 * 7
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_upcoming_exam_window_days() -> u32 {
    30
}

fn default_max_title_length() -> usize {
    200
}
