//! Keeps the QuickBooks OAuth tokens in the database and hands out clients holding a
//! valid access token. Tokens are refreshed shortly before they expire.
use crate::error::FloconError;
use crate::repository::token_repository::TokenRepository;
use crate::types::{ConnectionStatus, QboToken, TokenUpsert};
use chrono::{Duration, Utc};
use log::{debug, info, warn};
use qbo::oauth::{self, OAuthClient, TokenResponse};
use qbo::QuickBooks;
use std::sync::Arc;

/// Access tokens closer than this to their expiry are refreshed before use
pub const REFRESH_WINDOW_MINUTES: i64 = 5;

/// Upper bound for a single QuickBooks API call, reports included
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

pub struct TokenService {
    repo: Arc<dyn TokenRepository>,
    oauth: OAuthClient,
}

impl TokenService {
    pub fn new(repo: Arc<dyn TokenRepository>, oauth: OAuthClient) -> Self {
        Self { repo, oauth }
    }

    #[must_use]
    pub fn oauth_client(&self) -> &OAuthClient {
        &self.oauth
    }

    /// The most recently connected active token, if any
    ///
    /// # Errors
    /// Returns an error if the database can not be read
    pub async fn stored_token(&self) -> Result<Option<QboToken>, FloconError> {
        self.repo.find_active().await
    }

    /// Stores the tokens of a token endpoint response for the given company.
    ///
    /// # Errors
    /// Returns an error if the database write fails
    pub async fn save_tokens(
        &self,
        realm_id: &str,
        response: &TokenResponse,
        scope: Option<&str>,
    ) -> Result<(), FloconError> {
        let now = Utc::now();
        let token = TokenUpsert {
            realm_id: realm_id.to_string(),
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            token_type: response.token_type.clone(),
            expires_at: now + Duration::seconds(response.expires_in),
            refresh_expires_at: now + Duration::seconds(response.x_refresh_token_expires_in),
            scope: scope.map(ToString::to_string),
            is_active: true,
            last_refreshed_at: now,
        };
        self.repo
            .upsert(&token)
            .await
            .map_err(|e| FloconError::Database(format!("Failed to save tokens: {e}")))
    }

    /// Exchanges the stored refresh token for a new pair of tokens.
    ///
    /// # Errors
    /// `NotConnected` without a stored token, otherwise any OAuth or database error
    pub async fn refresh(&self) -> Result<QboToken, FloconError> {
        let stored = self.stored_token().await?.ok_or(FloconError::NotConnected)?;
        info!("Refreshing access token of realm {}", stored.realm_id);
        let response = self.oauth.refresh(&stored.refresh_token).await?;
        self.save_tokens(&stored.realm_id, &response, stored.scope.as_deref())
            .await?;
        self.stored_token()
            .await?
            .ok_or_else(|| FloconError::Qbo("Failed to refresh token".to_string()))
    }

    /// The stored token, refreshed first if it is about to expire.
    ///
    /// # Errors
    /// `NotConnected` without a stored token, or the error of a failed refresh
    pub async fn valid_token(&self) -> Result<QboToken, FloconError> {
        let token = self.stored_token().await?.ok_or(FloconError::NotConnected)?;
        if token.expires_at - Utc::now() < Duration::minutes(REFRESH_WINDOW_MINUTES) {
            debug!("Access token expired or expiring soon, refreshing...");
            return self.refresh().await;
        }
        Ok(token)
    }

    /// Revokes the connection at Intuit and marks the stored token inactive.
    /// Without a stored token there is nothing to do.
    ///
    /// # Errors
    /// Returns an error if the database can not be updated. Failing to revoke at Intuit
    /// is only logged.
    pub async fn revoke(&self) -> Result<(), FloconError> {
        let Some(token) = self.stored_token().await? else {
            return Ok(());
        };
        if let Err(e) = self.oauth.revoke(&token.refresh_token).await {
            warn!("Error revoking token: {e}");
        }
        self.repo.deactivate(&token.realm_id).await
    }

    /// A QuickBooks client for the connected company, holding a valid access token
    ///
    /// # Errors
    /// See [`TokenService::valid_token`]
    pub async fn authenticated_client(&self) -> Result<QuickBooks, FloconError> {
        let token = self.valid_token().await?;
        Ok(QuickBooks::builder()
            .base_url(self.oauth.config().api_base_url())
            .realm_id(token.realm_id)
            .bearer_auth(token.access_token)
            .timeout(REQUEST_TIMEOUT_SECS)
            .build()?)
    }

    /// # Errors
    /// Returns an error if the database can not be read
    pub async fn connection_status(&self) -> Result<ConnectionStatus, FloconError> {
        let Some(token) = self.stored_token().await? else {
            return Ok(ConnectionStatus::default());
        };
        let now = Utc::now();
        let refresh_token_expired = token.refresh_expires_at < now;
        Ok(ConnectionStatus {
            connected: true,
            realm_id: Some(token.realm_id),
            expires_at: Some(token.expires_at),
            refresh_expires_at: Some(token.refresh_expires_at),
            access_token_expired: token.expires_at < now,
            refresh_token_expired,
            needs_reauthorization: refresh_token_expired,
        })
    }

    /// Where to send the user to grant access, with a fresh CSRF state
    ///
    /// # Errors
    /// Returns an error if the configured authorization URL is invalid
    pub fn connect_uri(&self) -> Result<String, FloconError> {
        let state = oauth::random_state();
        Ok(self.oauth.authorization_uri(&state)?.to_string())
    }

    /// Completes the OAuth flow by exchanging the authorization code for tokens
    ///
    /// # Errors
    /// Returns the error of the token exchange or of saving the tokens
    pub async fn complete_authorization(&self, code: &str, realm_id: &str) -> Result<(), FloconError> {
        let response = self.oauth.exchange_code(code).await?;
        self.save_tokens(realm_id, &response, Some(&oauth::scopes()))
            .await?;
        info!("Connected to QuickBooks company {realm_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::mocks::MockTokenRepo;
    use mockito::{Matcher, Server};
    use qbo::config::QboClientConfiguration;

    fn stored(expires_in_minutes: i64) -> QboToken {
        let now = Utc::now();
        QboToken {
            id: Some("t1".into()),
            realm_id: "9341".into(),
            access_token: "old-access".into(),
            refresh_token: "old-refresh".into(),
            token_type: Some("bearer".into()),
            expires_at: now + Duration::minutes(expires_in_minutes),
            refresh_expires_at: now + Duration::days(90),
            scope: Some(oauth::SCOPE_ACCOUNTING.into()),
            is_active: true,
            connected_at: Some(now),
            last_refreshed_at: Some(now),
        }
    }

    fn oauth_client(server_url: &str) -> OAuthClient {
        OAuthClient::new(QboClientConfiguration {
            client_id: "client".into(),
            client_secret: "secret".into(),
            token_url: Some(format!("{server_url}/tokens")),
            revoke_url: Some(format!("{server_url}/revoke")),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn valid_token_without_connection_fails() {
        let mut repo = MockTokenRepo::new();
        repo.expect_find_active().returning(|| Ok(None));
        let service = TokenService::new(Arc::new(repo), oauth_client("http://localhost:1"));

        let err = service.valid_token().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Not connected to QuickBooks. Please authorize first."
        );
    }

    #[tokio::test]
    async fn fresh_token_is_used_as_is() {
        let mut repo = MockTokenRepo::new();
        repo.expect_find_active().returning(|| Ok(Some(stored(30))));
        repo.expect_upsert().never();
        let service = TokenService::new(Arc::new(repo), oauth_client("http://localhost:1"));

        let token = service.valid_token().await.unwrap();
        assert_eq!(token.access_token, "old-access");
    }

    #[tokio::test]
    async fn token_expiring_within_five_minutes_is_refreshed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/tokens")
            .match_body(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
            .with_status(200)
            .with_body(
                r#"{"access_token":"new-access","refresh_token":"new-refresh","token_type":"bearer","expires_in":3600,"x_refresh_token_expires_in":8726400}"#,
            )
            .create_async()
            .await;

        let mut repo = MockTokenRepo::new();
        let mut calls = 0;
        repo.expect_find_active().times(3).returning(move || {
            calls += 1;
            if calls < 3 {
                Ok(Some(stored(4)))
            } else {
                Ok(Some(QboToken {
                    access_token: "new-access".into(),
                    ..stored(60)
                }))
            }
        });
        repo.expect_upsert()
            .times(1)
            .withf(|token: &TokenUpsert| {
                token.access_token == "new-access"
                    && token.realm_id == "9341"
                    && token.scope.as_deref() == Some(oauth::SCOPE_ACCOUNTING)
            })
            .returning(|_| Ok(()));

        let service = TokenService::new(Arc::new(repo), oauth_client(&server.url()));
        let token = service.valid_token().await.unwrap();

        mock.assert_async().await;
        assert_eq!(token.access_token, "new-access");
    }

    #[tokio::test]
    async fn revoke_failure_still_deactivates() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/revoke")
            .with_status(400)
            .with_body("invalid_token")
            .create_async()
            .await;

        let mut repo = MockTokenRepo::new();
        repo.expect_find_active().returning(|| Ok(Some(stored(30))));
        repo.expect_deactivate()
            .times(1)
            .returning(|realm_id| {
                assert_eq!(realm_id, "9341");
                Ok(())
            });

        let service = TokenService::new(Arc::new(repo), oauth_client(&server.url()));
        service.revoke().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn status_reports_expired_refresh_token() {
        let mut repo = MockTokenRepo::new();
        repo.expect_find_active().returning(|| {
            Ok(Some(QboToken {
                refresh_expires_at: Utc::now() - Duration::days(1),
                ..stored(-10)
            }))
        });
        let service = TokenService::new(Arc::new(repo), oauth_client("http://localhost:1"));

        let status = service.connection_status().await.unwrap();
        assert!(status.connected);
        assert!(status.access_token_expired);
        assert!(status.needs_reauthorization);
        assert_eq!(status.realm_id.as_deref(), Some("9341"));
    }

    #[tokio::test]
    async fn status_without_token_is_disconnected() {
        let mut repo = MockTokenRepo::new();
        repo.expect_find_active().returning(|| Ok(None));
        let service = TokenService::new(Arc::new(repo), oauth_client("http://localhost:1"));

        let status = service.connection_status().await.unwrap();
        assert!(!status.connected);
        assert!(!status.needs_reauthorization);
    }
}
