// Copyright 2026 Marmalade Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! marmalade - encrypted GFS backups to an object-locked S3 bucket.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use marmalade_core::{calculate_retention, RetentionSchedule, SIDECAR_SUFFIX};
use marmalade_s3::Client;

mod config;
mod encrypt;

use config::Config;

#[derive(Parser)]
#[command(name = "marmalade", about = "Encrypted GFS backups to an object-locked S3 bucket")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encrypt a file, ship it to the bucket and prune old backups
    Backup {
        /// Path to back up
        #[arg(short = 'f')]
        file: PathBuf,
    },
    /// Show which remote backups the schedule would keep, changing nothing
    WouldRetain,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "marmalade=info,marmalade_core=info,marmalade_s3=info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    let schedule = marmalade_core::parse_schedule(&config.schedule).context("parse schedule")?;
    let client = Client::new(config.s3_config()).context("create s3 client")?;

    match cli.command {
        Command::Backup { file } => backup(&client, &schedule, &config, &file).await,
        Command::WouldRetain => would_retain(&client, &schedule).await,
    }
}

/// Encrypts the input when a recipient is configured, then runs the
/// backup. The working directory holding the ciphertext is removed when
/// the run finishes.
async fn backup(
    client: &Client,
    schedule: &RetentionSchedule,
    config: &Config,
    file: &Path,
) -> Result<()> {
    let mut _working: Option<tempfile::TempDir> = None;
    let upload_path = match config.age_public_key.as_deref() {
        Some(recipient) => {
            let working = tempfile::tempdir().context("make working directory")?;
            let encrypted = encrypt::encrypt_file(recipient, file, working.path())?;
            _working = Some(working);
            encrypted
        }
        None => {
            info!("no age recipient configured, shipping file as-is");
            file.to_path_buf()
        }
    };

    marmalade_core::backup(client, schedule, Utc::now(), &upload_path)
        .await
        .context("backup")?;

    Ok(())
}

/// Lists the bucket and prints the per-tier survivors the schedule would
/// keep right now.
async fn would_retain(client: &Client, schedule: &RetentionSchedule) -> Result<()> {
    let listing = client
        .list_object_versions("", "", "", 500)
        .await
        .context("list object versions")?;
    if listing.is_truncated {
        bail!("list object versions: listing is truncated, bucket exceeds one page");
    }

    let present: Vec<String> = listing
        .versions
        .iter()
        .filter(|v| v.is_latest && !v.key.ends_with(SIDECAR_SUFFIX))
        .map(|v| v.key.clone())
        .collect();

    let retained = calculate_retention(&present, schedule);
    let tiers = [
        ("daily", &retained.daily),
        ("monthly", &retained.monthly),
        ("yearly", &retained.yearly),
    ];
    for (tier, files) in tiers {
        println!("{tier}:");
        for file in files {
            println!("  {file}");
        }
    }

    Ok(())
}
