// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SuperApp — demo host.
//
// Entry point. Initialises logging, loads the bridge configuration, starts
// the UI loop and runs one mini-app session over the chosen surface.

mod session;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use superapp_bridge::Platform;
use superapp_core::config::BridgeConfig;
use superapp_core::error::Result;
use superapp_host::ChannelUi;

use session::Session;

/// SuperApp host shell running a mini-app over a simulated WebView.
#[derive(Debug, Parser)]
#[command(name = "superapp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "SuperApp bridge demo host", long_about = None)]
struct Cli {
    /// Which host surface to simulate.
    #[arg(short, long, value_enum, default_value_t = Surface::Android)]
    platform: Surface,

    /// Bridge configuration file (JSON). Defaults apply when absent.
    #[arg(short, long, env = "SUPERAPP_CONFIG")]
    config: Option<PathBuf>,

    /// Mini-app to load, by catalog name.
    #[arg(short, long, default_value = "demo-app1")]
    app: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Surface {
    Android,
    Ios,
    Web,
}

impl From<Surface> for Platform {
    fn from(surface: Surface) -> Self {
        match surface {
            Surface::Android => Platform::Android,
            Surface::Ios => Platform::Ios,
            Surface::Web => Platform::Web,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<BridgeConfig> {
    match path {
        Some(path) => BridgeConfig::load(path),
        None => Ok(BridgeConfig::default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .init();

    tracing::info!(platform = ?cli.platform, app = %cli.app, "SuperApp starting");

    let (ui, ui_loop) = ChannelUi::channel();
    let ui_task = tokio::spawn(ui_loop.run());

    let session = Session::open(cli.platform.into(), &cli.app, &config, Arc::new(ui))?;
    session.run_demo().await?;
    let report = session.close();

    // Every UI handle went away with the session.
    let ui_tasks = ui_task.await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "UI loop aborted");
        0
    });

    tracing::info!(
        platform = %report.platform,
        url = %report.url,
        user = ?report.user.as_ref().map(|u| &u.name),
        ui_tasks,
        host_diagnostics = ?report.host_diagnostics,
        client_diagnostics = ?report.client_diagnostics,
        "session closed"
    );
    Ok(())
}
