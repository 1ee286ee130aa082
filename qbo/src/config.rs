use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const SANDBOX_API_BASE_URL: &str = "https://sandbox-quickbooks.api.intuit.com";
pub const PRODUCTION_API_BASE_URL: &str = "https://quickbooks.api.intuit.com";
pub const AUTHORIZE_URL: &str = "https://appcenter.intuit.com/connect/oauth2";
pub const TOKEN_URL: &str = "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer";
pub const REVOKE_URL: &str = "https://developer.api.intuit.com/v2/oauth2/tokens/revoke";

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum QboEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl QboEnvironment {
    #[must_use]
    pub fn api_base_url(self) -> &'static str {
        match self {
            QboEnvironment::Sandbox => SANDBOX_API_BASE_URL,
            QboEnvironment::Production => PRODUCTION_API_BASE_URL,
        }
    }
}

impl fmt::Display for QboEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QboEnvironment::Sandbox => write!(f, "sandbox"),
            QboEnvironment::Production => write!(f, "production"),
        }
    }
}

impl FromStr for QboEnvironment {
    type Err = String;

    /// Anything but `production` is treated as the sandbox
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("production") {
            Ok(QboEnvironment::Production)
        } else {
            Ok(QboEnvironment::Sandbox)
        }
    }
}

/// The `[qbo]` section of the application configuration
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct QboClientConfiguration {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub environment: QboEnvironment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorize_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoke_url: Option<String>,
}

impl Default for QboClientConfiguration {
    fn default() -> Self {
        QboClientConfiguration {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:3000/api/qbo/callback".into(),
            environment: QboEnvironment::Sandbox,
            api_base_url: None,
            authorize_url: None,
            token_url: None,
            revoke_url: None,
        }
    }
}

impl QboClientConfiguration {
    #[must_use]
    pub fn api_base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.api_base_url())
    }

    #[must_use]
    pub fn authorize_url(&self) -> &str {
        self.authorize_url.as_deref().unwrap_or(AUTHORIZE_URL)
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        self.token_url.as_deref().unwrap_or(TOKEN_URL)
    }

    #[must_use]
    pub fn revoke_url(&self) -> &str {
        self.revoke_url.as_deref().unwrap_or(REVOKE_URL)
    }
}
