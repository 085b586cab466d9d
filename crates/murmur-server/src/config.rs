//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the murmur server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// API key; when set, every non-health request must present it.
    pub api_key: Option<String>,
    /// Max request body size in bytes (uploads included).
    pub body_limit: usize,
    /// Timeout for ordinary requests.
    #[serde(with = "secs")]
    pub request_timeout: Duration,
    /// Timeout for long audio paths (stop, uploads, job submit).
    #[serde(with = "secs")]
    pub long_request_timeout: Duration,
    /// Max WebSocket message size in bytes.
    pub max_ws_message_bytes: usize,
    /// WebSocket idle timeout.
    #[serde(with = "secs")]
    pub ws_idle_timeout: Duration,
    /// Whether fixed-window rate limiting is enforced.
    pub rate_limit_enabled: bool,
    /// In-flight recognition width inside one pipeline invocation.
    pub pipeline_concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            api_key: None,
            body_limit: 64 * 1024 * 1024, // 64 MB uploads
            request_timeout: Duration::from_secs(30),
            long_request_timeout: Duration::from_secs(300),
            max_ws_message_bytes: 8 * 1024 * 1024,
            ws_idle_timeout: Duration::from_secs(300),
            rate_limit_enabled: true,
            pipeline_concurrency: 1,
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
