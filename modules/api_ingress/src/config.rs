use serde::{Deserialize, Serialize};

/// 1 MiB request body cap.
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// HTTP host configuration, derived from `server.*` of the app config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiIngressConfig {
    pub bind_addr: String,
    /// Handler timeout in seconds; 0 disables the timeout layer.
    #[serde(default)]
    pub timeout_sec: u64,
    #[serde(default)]
    pub cors_enabled: bool,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT_BYTES
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            timeout_sec: 30,
            cors_enabled: false,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

impl From<&runtime::ServerConfig> for ApiIngressConfig {
    fn from(server: &runtime::ServerConfig) -> Self {
        Self {
            bind_addr: format!("{}:{}", server.host, server.port),
            timeout_sec: server.timeout_sec,
            cors_enabled: server.cors_enabled,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_from_server_config() {
        let server = runtime::ServerConfig {
            host: "0.0.0.0".into(),
            port: 8081,
            timeout_sec: 5,
            cors_enabled: true,
            ..Default::default()
        };

        let cfg = ApiIngressConfig::from(&server);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8081");
        assert_eq!(cfg.timeout_sec, 5);
        assert!(cfg.cors_enabled);
        assert_eq!(cfg.body_limit_bytes, DEFAULT_BODY_LIMIT_BYTES);
    }
}
