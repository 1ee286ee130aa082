use flocon::config::AppConfiguration;
use flocon::error::FloconError;
use flocon::{ApplicationRuntime, ApplicationRuntimeBuilder};
use mockito::Matcher;
use qbo::config::QboClientConfiguration;
use qbo::oauth::TokenResponse;
use std::time::Duration;

pub const REALM_ID: &str = "9341";

/// Creates a runtime with an in memory database, talking to QuickBooks at `server_url`
pub fn create_test_runtime(server_url: &str) -> Result<ApplicationRuntime, FloconError> {
    let _ = env_logger::builder().is_test(true).try_init();

    let config = AppConfiguration {
        qbo: QboClientConfiguration {
            client_id: "test-client".into(),
            client_secret: "test-secret".into(),
            api_base_url: Some(server_url.to_string()),
            token_url: Some(format!("{server_url}/oauth2/v1/tokens/bearer")),
            revoke_url: Some(format!("{server_url}/v2/oauth2/tokens/revoke")),
            ..Default::default()
        },
        ..Default::default()
    };

    ApplicationRuntimeBuilder::new()
        .with_config(config)
        .use_in_memory_db()
        .with_bulk_delay(Duration::ZERO)
        .build()
}

/// Stores tokens that stay valid for an hour, as if the OAuth flow had just completed
pub async fn connect(runtime: &ApplicationRuntime) {
    let response = TokenResponse {
        access_token: "test-access".into(),
        refresh_token: "test-refresh".into(),
        token_type: "bearer".into(),
        expires_in: 3600,
        x_refresh_token_expires_in: 8_726_400,
    };
    runtime
        .token_service()
        .save_tokens(REALM_ID, &response, None)
        .await
        .expect("Failed to store test tokens");
}

/// Path of the QuickBooks query endpoint
pub fn query_path() -> String {
    format!("/v3/company/{REALM_ID}/query")
}

pub fn entity_path(entity: &str) -> String {
    format!("/v3/company/{REALM_ID}/{entity}")
}

/// Matches the query parameter of a QuickBooks query
pub fn query(sql: &str) -> Matcher {
    Matcher::UrlEncoded("query".into(), sql.into())
}
