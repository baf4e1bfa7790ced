//! Startup reconciliation command.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use azlaunch_accounts::{
    AccountOutcome, AccountReconciler, ReconcilePolicy, ReconcileState, SessionState,
};
use azlaunch_auth::AzAuthClient;

use crate::AppContext;

fn describe(outcome: &AccountOutcome) -> String {
    match outcome {
        AccountOutcome::Refreshed { uuid, name } => format!("✓ {} ({}) refreshed", name, uuid),
        AccountOutcome::Kept { uuid } => format!("~ {} kept (offline)", uuid),
        AccountOutcome::RemovedStaleType { uuid } => {
            format!("✗ {} removed: not an AZauth account", uuid)
        }
        AccountOutcome::RemovedRejected { uuid, message, .. } => {
            format!("✗ {} removed: {}", uuid, message)
        }
        AccountOutcome::RemovedUnverified { uuid } => {
            format!("✗ {} removed: email not verified", uuid)
        }
        AccountOutcome::StoreFailure { uuid, message } => {
            format!("! {} not updated: {}", uuid, message)
        }
        AccountOutcome::Skipped { uuid } => format!("- {} skipped", uuid),
    }
}

pub async fn run(ctx: &Arc<AppContext>) -> anyhow::Result<()> {
    let client = Arc::new(AzAuthClient::from_config(&ctx.config.auth)?);

    // Ctrl-C stops after the account being verified.
    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let reconciler = AccountReconciler::new(
        ctx.lifecycle.clone(),
        client,
        ReconcilePolicy::from_config(&ctx.config),
    )
    .with_cancellation(cancel_token);

    let mut progress = reconciler.subscribe();
    let printer = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = *progress.borrow_and_update();
            match state {
                ReconcileState::Verifying { index, total } => {
                    eprintln!("Verifying account {}/{}...", index + 1, total);
                }
                ReconcileState::Done => break,
                _ => {}
            }
        }
    });

    let report = reconciler.reconcile().await?;
    drop(reconciler);
    let _ = printer.await;

    for outcome in &report.outcomes {
        println!("{}", describe(outcome));
    }
    if report.offline {
        println!("\nAuthentication server unreachable. Cached accounts were kept.");
    }
    if report.cancelled {
        println!("\nCancelled before every account was verified.");
    }

    match (report.state, report.selected) {
        (SessionState::NoAccounts, _) => {
            println!("\nNo accounts left. Log in with 'azlaunch accounts login'.");
        }
        (SessionState::Ready, Some(uuid)) => println!("\nSelected account: {}", uuid),
        (SessionState::Ready, None) => {}
    }
    Ok(())
}
