//! Print the options the launch engine would receive.

use std::sync::Arc;

use azlaunch_accounts::LaunchOptions;

use crate::AppContext;

pub async fn run(ctx: &Arc<AppContext>) -> anyhow::Result<()> {
    let mut options = LaunchOptions::assemble(&ctx.lifecycle, &ctx.settings, &ctx.config).await?;
    // Never print credentials.
    options.account.access_token = options.account.token_hint();

    println!("{}", serde_json::to_string_pretty(&options)?);
    Ok(())
}
