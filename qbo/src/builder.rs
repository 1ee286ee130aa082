//!
//! ```rust,ignore
//! let qbo = QuickBooks::builder()
//!     .environment(QboEnvironment::Production)
//!     .realm_id("9130357")
//!     .bearer_auth(access_token)
//!     .timeout(30)
//!     .build()?;
//! ```
use std::time::Duration;

use log::debug;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::config::QboEnvironment;
use crate::{Credentials, QuickBooks};

#[derive(Error, Debug)]
pub enum QuickBooksBuilderError {
    #[error("{0} is required to create a QuickBooks client")]
    MissingField(&'static str),

    #[error("URL parsing error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("QuickBooks client initialization error: {0}")]
    ClientInitError(String),

    #[error("Timeout must be positive")]
    InvalidTimeout,
}

#[derive(Default)]
pub struct QuickBooksBuilder {
    environment: QboEnvironment,
    base_url: Option<String>,
    realm_id: Option<String>,
    credentials: Option<Credentials>,
    timeout: Option<Duration>,
}

impl QuickBooksBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn environment(mut self, environment: QboEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Overrides the base URL implied by the environment
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn realm_id(mut self, realm_id: impl Into<String>) -> Self {
        self.realm_id = Some(realm_id.into());
        self
    }

    #[must_use]
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::Bearer(token.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(Duration::from_secs(seconds));
        self
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn build(self) -> Result<QuickBooks, QuickBooksBuilderError> {
        let realm_id = self
            .realm_id
            .filter(|r| !r.is_empty())
            .ok_or(QuickBooksBuilderError::MissingField("realm id"))?;
        let credentials = self
            .credentials
            .ok_or(QuickBooksBuilderError::MissingField("access token"))?;
        let base = self
            .base_url
            .unwrap_or_else(|| self.environment.api_base_url().to_string());
        let base = Url::parse(&base)?;

        let mut client_builder = Client::builder();
        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(QuickBooksBuilderError::InvalidTimeout);
            }
            client_builder = client_builder.timeout(timeout);
        }
        let client = client_builder
            .build()
            .map_err(|e| QuickBooksBuilderError::ClientInitError(e.to_string()))?;

        let qbo = QuickBooks {
            base,
            realm_id,
            credentials,
            client,
        };
        debug!("Created QuickBooks client for {} realm {}", qbo.base, qbo.realm_id);
        Ok(qbo)
    }
}
