// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Demo server answering message edits with Turbo Stream responses

mod opts;
pub mod routes;
pub mod server;
pub mod views;

use std::pin::pin;
use std::sync::Arc;

use anyhow::Context;
use hyper::body::Incoming;
use tokio::net::TcpListener;
use tokio::select;
use tracing::{info, warn};

use turbo_stream::TurboStreams;

pub use opts::{Config, Opts};
pub use server::Server;
pub use views::PartialDirectory;

/// Serve `config` until told to stop.
///
/// The first `SIGINT` stops accepting connections and lets open requests finish. A second
/// `SIGINT`, or any `SIGTERM`, stops at once.
///
/// **BEWARE:** this permanently registers signal handlers through [`tokio`].
pub async fn run(config: Config) -> anyhow::Result<()> {
    let partials = Arc::new(PartialDirectory::new(&config.partials_dir));
    if !partials.root().is_dir() {
        warn!(
            "Partials directory {:?} doesn't exist; every render will fail",
            partials.root()
        );
    }
    let respond = TurboStreams::new(partials).wrap(routes::respond::<Incoming>);

    let listener = TcpListener::bind(config.address)
        .await
        .with_context(|| format!("Couldn't listen on {}", config.address))?;
    info!("Listening on {}", config.address);
    let connections = futures::stream::unfold(listener, |listener| async {
        Some((listener.accept().await, listener))
    });

    let server = Server::new(config.max_connections);
    let mut serving = pin!(server.serve(connections, respond));

    select! {
        _ = serving.as_mut() => return Ok(()),
        interrupt = interrupted() => interrupt?,
        term = terminated() => {
            term?;
            info!("Terminated; stopping now");
            return Ok(());
        }
    }

    info!("Interrupted; finishing open requests (interrupt again to stop now)");
    select! {
        _ = futures::future::join(serving, server.graceful_shutdown()) => {
            info!("Open requests finished");
        }
        interrupt = interrupted() => {
            interrupt?;
            info!("Interrupted again; stopping now");
        }
        term = terminated() => {
            term?;
            info!("Terminated; stopping now");
        }
    }
    Ok(())
}

async fn interrupted() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Couldn't listen for SIGINT")
}

#[cfg(unix)]
async fn terminated() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).context("Couldn't listen for SIGTERM")?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminated() -> anyhow::Result<()> {
    std::future::pending().await
}
