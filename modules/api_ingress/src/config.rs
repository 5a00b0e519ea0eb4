use serde::{Deserialize, Serialize};

/// HTTP ingress configuration, read from `modules.api_ingress`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiIngressConfig {
    #[serde(default)]
    pub cors_enabled: bool,
    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            cors_enabled: false,
            request_timeout_sec: default_request_timeout_sec(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

fn default_request_timeout_sec() -> u64 {
    30
}

fn default_body_limit_bytes() -> usize {
    16 * 1024 * 1024
}
