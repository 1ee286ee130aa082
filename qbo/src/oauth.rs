//! Intuit OAuth2 authorization code flow: building the consent URL, exchanging the
//! authorization code, refreshing and revoking tokens.
use log::debug;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{header::ACCEPT, Client};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::QboClientConfiguration;
use crate::{Credentials, QboError, Result};

pub const SCOPE_ACCOUNTING: &str = "com.intuit.quickbooks.accounting";
pub const SCOPE_PAYROLL: &str = "com.intuit.quickbooks.payroll";

const STATE_LENGTH: usize = 26;

/// Body of a successful response from the token endpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
    /// Seconds until the refresh token expires
    pub x_refresh_token_expires_in: i64,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Clone, Debug)]
pub struct OAuthClient {
    config: QboClientConfiguration,
    client: Client,
}

/// The space separated scopes requested when connecting
#[must_use]
pub fn scopes() -> String {
    format!("{SCOPE_ACCOUNTING} {SCOPE_PAYROLL}")
}

/// Random CSRF state for the authorization request
#[must_use]
pub fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

impl OAuthClient {
    #[must_use]
    pub fn new(config: QboClientConfiguration) -> Self {
        OAuthClient {
            config,
            client: Client::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &QboClientConfiguration {
        &self.config
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn authorization_uri(&self, state: &str) -> Result<Url> {
        let scope = scopes();
        let url = Url::parse_with_params(
            self.config.authorize_url(),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("state", state),
            ],
        )?;
        Ok(url)
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ])
        .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn revoke(&self, token: &str) -> Result<()> {
        let request = self
            .client
            .post(self.config.revoke_url())
            .header(ACCEPT, "application/json")
            .json(&serde_json::json!({ "token": token }));
        let response = self.credentials().apply(request).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(QboError::Fault {
                code: status,
                body: response.text().await?,
            })
        }
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let request = self
            .client
            .post(self.config.token_url())
            .header(ACCEPT, "application/json")
            .form(form);
        let response = self.credentials().apply(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("token endpoint status {status:?}");
        if !status.is_success() {
            return Err(QboError::Fault { code: status, body });
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn credentials(&self) -> Credentials {
        Credentials::Basic(self.config.client_id.clone(), self.config.client_secret.clone())
    }
}
