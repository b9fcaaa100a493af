use anyhow::Result;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub core_api: CoreApiConfig,
    pub video: VideoConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Identity service reachable over HTTP. Tokens are resolved and profiles
/// fetched against this base URL.
#[derive(Clone, Debug)]
pub struct CoreApiConfig {
    pub base_url: String,
}

/// Video-room provider credentials. The signing key pair may be left empty
/// at startup; issuing a room access credential without it is a fatal
/// misconfiguration surfaced at call time.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    pub api_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub api_key_sid: String,
    pub api_key_secret: String,
}

fn get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(AppConfig {
            server: ServerConfig {
                host: get_str("SERVER_HOST", "0.0.0.0"),
                port: get_u16("SERVER_PORT", 8080),
            },
            core_api: CoreApiConfig {
                base_url: get_str("CORE_API_URL", "http://localhost:3000"),
            },
            video: VideoConfig {
                api_url: get_str("VIDEO_API_URL", "https://video.twilio.com"),
                account_sid: get_str("TWILIO_ACCOUNT_SID", ""),
                auth_token: get_str("TWILIO_AUTH_TOKEN", ""),
                api_key_sid: get_str("TWILIO_API_KEY_SID", ""),
                api_key_secret: get_str("TWILIO_API_KEY_SECRET", ""),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        std::env::remove_var("SERVER_HOST");
        std::env::remove_var("SERVER_PORT");
        let cfg = AppConfig::from_env().expect("config");
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8080);
        assert!(!cfg.core_api.base_url.is_empty());
    }
}
