//! Account management commands.

use std::sync::Arc;

use azlaunch_accounts::{LoginFlow, LoginResult};
use azlaunch_auth::AzAuthClient;
use azlaunch_core::{Account, AuthError};

use crate::{AccountsAction, AppContext};

/// Format an account for display.
fn format_account(account: &Account, selected: bool) -> String {
    let marker = if selected { "*" } else { " " };
    let role = account
        .user_info
        .role
        .as_ref()
        .map(|r| r.name.as_str())
        .unwrap_or("-");
    format!(
        "{} {} {} [{}] {} pts, token {}",
        marker,
        account.name,
        account.uuid,
        role,
        account.user_info.balance,
        account.token_hint()
    )
}

pub async fn handle(action: AccountsAction, ctx: &Arc<AppContext>) -> anyhow::Result<()> {
    match action {
        AccountsAction::List => list_accounts(ctx).await?,
        AccountsAction::Current => match ctx.lifecycle.current().await? {
            Some(account) => println!("{}", format_account(&account, true)),
            None => println!("No account selected. Log in with 'azlaunch accounts login'."),
        },
        AccountsAction::Select { uuid } => {
            let account = ctx.lifecycle.select(&uuid).await?;
            println!("Selected {} ({})", account.name, account.uuid);
        }
        AccountsAction::Remove { uuid } => match ctx.lifecycle.remove(&uuid).await? {
            Some(next) => println!("Removed {}. Selected account: {}", uuid, next),
            None => println!("Removed {}. No accounts left.", uuid),
        },
        AccountsAction::Login {
            identifier,
            password,
            code,
        } => login(ctx, &identifier, &password, code.as_deref()).await?,
    }
    Ok(())
}

async fn list_accounts(ctx: &AppContext) -> anyhow::Result<()> {
    let accounts = ctx.lifecycle.accounts().await?;
    if accounts.is_empty() {
        println!("No accounts. Log in with 'azlaunch accounts login'.");
        return Ok(());
    }

    let selected = ctx.lifecycle.selected_uuid().await?;
    for account in &accounts {
        let is_selected = selected.as_deref() == Some(account.uuid.as_str());
        println!("{}", format_account(account, is_selected));
    }
    Ok(())
}

async fn login(
    ctx: &AppContext,
    identifier: &str,
    password: &str,
    code: Option<&str>,
) -> anyhow::Result<()> {
    let client = Arc::new(AzAuthClient::from_config(&ctx.config.auth)?);
    let flow = LoginFlow::from_config(ctx.lifecycle.clone(), client, &ctx.config);

    match flow.login(identifier, password, code).await? {
        LoginResult::Added(account) => {
            println!("Logged in as {} ({})", account.name, account.uuid);
            Ok(())
        }
        LoginResult::SecondFactorRequired => {
            println!("Two-factor authentication is enabled. Run again with --code <CODE>.");
            Ok(())
        }
        LoginResult::Rejected { reason, message } => {
            Err(reason.to_auth_error(identifier, &message).into())
        }
        LoginResult::Offline { message } => Err(AuthError::NetworkUnavailable { message }.into()),
        LoginResult::VerificationRequired => Err(AuthError::VerificationRequired {
            uuid: identifier.to_string(),
        }
        .into()),
    }
}
