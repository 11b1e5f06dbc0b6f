//! Client configuration loaded from environment variables.
//!
//! All settings have defaults so the client runs with zero configuration
//! against a local development backend.

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the hosted backend.
    /// Env: `SALON_SERVICE_URL`
    /// Default: `http://localhost:54321`
    pub service_url: String,

    /// Publishable API key presented with every request.
    /// Env: `SALON_API_KEY`
    /// Default: empty (development only).
    pub api_key: String,

    /// Blob-store bucket for user avatars.
    /// Env: `SALON_AVATAR_BUCKET`
    /// Default: `avatars`
    pub avatar_bucket: String,

    /// Blob-store bucket for server icons.
    /// Env: `SALON_ICON_BUCKET`
    /// Default: `server-icons`
    pub icon_bucket: String,

    /// Maximum accepted image upload size in bytes.
    /// Env: `SALON_MAX_UPLOAD_BYTES`
    /// Default: 8 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            avatar_bucket: "avatars".to_string(),
            icon_bucket: "server-icons".to_string(),
            max_upload_bytes: 8 * 1024 * 1024,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("SALON_SERVICE_URL") {
            config.service_url = url;
        }

        if let Ok(key) = std::env::var("SALON_API_KEY") {
            config.api_key = key;
        }

        if let Ok(bucket) = std::env::var("SALON_AVATAR_BUCKET") {
            config.avatar_bucket = bucket;
        }

        if let Ok(bucket) = std::env::var("SALON_ICON_BUCKET") {
            config.icon_bucket = bucket;
        }

        if let Ok(val) = std::env::var("SALON_MAX_UPLOAD_BYTES") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_upload_bytes = n;
            } else {
                tracing::warn!(value = %val, "Invalid SALON_MAX_UPLOAD_BYTES, using default");
            }
        }

        config
    }
}
