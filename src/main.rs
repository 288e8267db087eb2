#![deny(clippy::expect_used, clippy::unwrap_used, unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::io;

use clap::Parser;
use taskmaster::{TaskmasterArgs, server};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), io::Error> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = TaskmasterArgs::parse();

    let listener = TcpListener::bind(format!("127.0.0.1:{}", args.port))
        .await
        .map_err(io::Error::other)?;
    tracing::info!(port = args.port, "listening");

    let app = server(args).await?;

    axum::serve(listener, app).await
}
