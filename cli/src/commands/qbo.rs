use chrono::{DateTime, Local, Utc};
use flocon::error::FloconError;

use crate::cli::{Connect, QboCommand};
use crate::get_runtime;

fn local(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub async fn execute(cmd: QboCommand) -> Result<(), FloconError> {
    let runtime = get_runtime();
    let tokens = runtime.token_service();

    match cmd {
        QboCommand::Status => {
            let status = tokens.connection_status().await?;
            if !status.connected {
                println!("Not connected to QuickBooks. Use 'flocon qbo connect' to authorize");
                return Ok(());
            }
            println!("Connected to company {}", status.realm_id.unwrap_or_default());
            if let Some(expires_at) = status.expires_at {
                let state = if status.access_token_expired { "expired" } else { "valid" };
                println!("Access token {state}, expires {}", local(expires_at));
            }
            if let Some(refresh_expires_at) = status.refresh_expires_at {
                println!("Refresh token expires {}", local(refresh_expires_at));
            }
            if status.needs_reauthorization {
                println!("The refresh token has expired, please connect again");
            }
        }
        QboCommand::Connect(Connect {
            code: Some(code),
            realm_id: Some(realm_id),
        }) => {
            tokens.complete_authorization(&code, &realm_id).await?;
            println!("Connected to QuickBooks company {realm_id}");
        }
        QboCommand::Connect(_) => {
            println!("Open this URL in a browser to authorize access to QuickBooks:\n");
            println!("{}", tokens.connect_uri()?);
            println!("\nThen run 'flocon qbo connect --code <code> --realm-id <realmId>'");
        }
        QboCommand::Refresh => {
            let token = tokens.refresh().await?;
            println!(
                "Access token for company {} refreshed, expires {}",
                token.realm_id,
                local(token.expires_at)
            );
        }
        QboCommand::Disconnect => {
            tokens.revoke().await?;
            println!("Disconnected from QuickBooks");
        }
        QboCommand::Query { query } => {
            let result = runtime.qbo_query(&query).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}
