//! Spotify application identity configuration
//!
//! The client id and secret identify the Reprise application to the Spotify
//! accounts service. They are loaded once at startup and injected into the
//! components that need them; nothing reads them from module-level state.

use url::Url;

use crate::{get_required_env, ConfigError, ConfigResult};

/// Default redirect URI for the authorization-code callback
const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/auth/callback";

/// Spotify application credentials and OAuth settings
#[derive(Clone)]
pub struct SpotifyConfig {
    /// OAuth client id issued by the Spotify developer dashboard
    pub client_id: String,

    /// OAuth client secret paired with the client id
    pub client_secret: String,

    /// Redirect URI registered for the authorization-code flow
    pub redirect_uri: String,
}

impl std::fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl SpotifyConfig {
    /// Load Spotify application configuration from environment variables
    ///
    /// `SPOTIFY_CLIENT_ID` and `SPOTIFY_CLIENT_SECRET` are required;
    /// `SPOTIFY_REDIRECT_URI` falls back to the local development callback.
    pub fn from_env() -> ConfigResult<Self> {
        let client_id = get_required_env("SPOTIFY_CLIENT_ID")?;
        let client_secret = get_required_env("SPOTIFY_CLIENT_SECRET")?;

        if client_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "SPOTIFY_CLIENT_ID".to_string(),
                "client id cannot be empty".to_string(),
            ));
        }
        if client_secret.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "SPOTIFY_CLIENT_SECRET".to_string(),
                "client secret cannot be empty".to_string(),
            ));
        }

        let redirect_uri = std::env::var("SPOTIFY_REDIRECT_URI")
            .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string());
        Url::parse(&redirect_uri)
            .map_err(|e| ConfigError::InvalidUrl("SPOTIFY_REDIRECT_URI".to_string(), e.to_string()))?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    /// Create a configuration with explicit credentials (useful for testing)
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config() {
        let config = SpotifyConfig::new("app-id", "app-secret");
        assert_eq!(config.client_id, "app-id");
        assert_eq!(config.client_secret, "app-secret");
        assert_eq!(config.redirect_uri, DEFAULT_REDIRECT_URI);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = SpotifyConfig::new("app-id", "very-secret");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("very-secret"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
