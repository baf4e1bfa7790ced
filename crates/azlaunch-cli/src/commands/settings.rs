//! Settings commands.

use std::sync::Arc;

use azlaunch_core::CloseBehavior;

use crate::{AppContext, SettingsAction};

pub async fn handle(action: SettingsAction, ctx: &Arc<AppContext>) -> anyhow::Result<()> {
    let settings = &ctx.settings;

    match action {
        SettingsAction::Show => show(ctx).await?,
        SettingsAction::Ram { min, max } => {
            let ram = settings.set_ram(&min, &max).await?;
            println!("RAM: {} GB min, {} GB max", ram.min, ram.max);
        }
        SettingsAction::Screen { width, height } => {
            let screen = settings.set_screen(&width, &height).await?;
            match screen.fixed() {
                Some(res) => println!("Screen: {}x{}", res.width, res.height),
                None => println!("Screen: chosen by the game"),
            }
        }
        SettingsAction::Close { behavior } => {
            let close: CloseBehavior = behavior.parse().map_err(anyhow::Error::msg)?;
            settings.set_close_behavior(close).await?;
            println!("On launch: {}", close.as_str());
        }
        SettingsAction::JavaPath { path } => {
            let java = settings.set_java_path(path).await?;
            println!("Java: {}", java.path.as_deref().unwrap_or("bundled runtime"));
        }
        SettingsAction::JavaArgs { args } => {
            let java = settings.set_java_args(args).await?;
            println!("JVM arguments: {}", java.args.join(" "));
        }
    }
    Ok(())
}

async fn show(ctx: &AppContext) -> anyhow::Result<()> {
    let settings = &ctx.settings;
    let ram = settings.ram().await?;
    let screen = settings.screen().await?;
    let launcher = settings.launcher().await?;
    let java_path = settings.java_path().await?;
    let java_args = settings.java_args().await?;

    println!("RAM:       {} GB min, {} GB max", ram.min, ram.max);
    match screen.fixed() {
        Some(res) => println!("Screen:    {}x{}", res.width, res.height),
        None => println!("Screen:    auto"),
    }
    println!("On launch: {}", launcher.launcher.close.as_str());
    println!(
        "Java:      {}",
        java_path.path.as_deref().unwrap_or("bundled runtime")
    );
    if java_args.args.is_empty() {
        println!("JVM args:  (none)");
    } else {
        println!("JVM args:  {}", java_args.args.join(" "));
    }
    Ok(())
}
