//! Opaque credential supply for the Google clients.

use std::env;

/// Supplies a bearer token for outgoing Google API requests. OAuth refresh
/// mechanics live behind this seam, outside the engine.
pub trait AccessTokenProvider: Send + Sync {
    fn access_token(&self) -> Result<String, String>;
}

/// Reads the token from an environment variable (`GOOGLE_ACCESS_TOKEN` by
/// default). Good enough for deployments where a sidecar keeps the variable
/// fresh.
pub struct EnvAccessToken {
    var: String,
}

impl EnvAccessToken {
    pub fn new() -> Self {
        EnvAccessToken {
            var: "GOOGLE_ACCESS_TOKEN".to_string(),
        }
    }

    pub fn from_var(var: impl Into<String>) -> Self {
        EnvAccessToken { var: var.into() }
    }
}

impl Default for EnvAccessToken {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessTokenProvider for EnvAccessToken {
    fn access_token(&self) -> Result<String, String> {
        env::var(&self.var)
            .map_err(|_| format!("variable de entorno {} no definida", self.var))
    }
}
