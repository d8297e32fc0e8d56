// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use opaque_server::keypair::KeyPair;
use opaque_server::{Server, ServerConfig, UserStore};
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct CliArgs {
    listen: String,
    help: bool,
}

fn parse_args() -> CliArgs {
    let mut out = CliArgs {
        listen: ":9999".to_string(),
        help: false,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-l" => {
                if let Some(addr) = args.next() {
                    out.listen = addr;
                }
            }
            "-h" | "--help" => out.help = true,
            _ => {}
        }
    }
    out
}

fn print_help() {
    eprintln!(
        r#"opaque-server - example server for the OPAQUE aPAKE protocol

USAGE:
    opaque-server [OPTIONS]

OPTIONS:
    -l <addr>    Address to listen on (default: :9999)
    -h, --help   Print this help

ENVIRONMENT VARIABLES:
    RUST_LOG     Log filter (default: opaque_server=info)
"#
    );
}

/// A bare `:port` listens on all interfaces, as the reference server does.
fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();
    if args.help {
        print_help();
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opaque_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let keypair = KeyPair::generate_random(&mut OsRng).context("server key generation failed")?;
    let addr = normalize_addr(&args.listen);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "server listening");

    let server = Arc::new(Server::new(keypair, UserStore::new(), ServerConfig::default()));

    tokio::select! {
        _ = server.run(listener) => {}
        _ = shutdown_signal() => {
            tracing::info!("graceful shutdown initiated");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
