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

//! Configuration from `MARMALADE_*` environment variables.

use anyhow::{bail, Result};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub region: String,
    pub key_id: String,
    pub key_secret: String,
    pub bucket: String,
    /// Storage class for uploads; empty means the server default.
    pub storage_class: String,
    /// Raw schedule string; parsed separately so schedule errors are
    /// reported with their own message.
    pub schedule: String,
    /// age X25519 recipient (`age1...`). When unset the input file is
    /// shipped unencrypted.
    pub age_public_key: Option<String>,
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// Required: `MARMALADE_S3_URL`, `MARMALADE_S3_REGION`,
    /// `MARMALADE_S3_KEY_ID`, `MARMALADE_S3_KEY_SECRET`,
    /// `MARMALADE_S3_BUCKET`. Optional: `MARMALADE_S3_STORAGE_CLASS`,
    /// `MARMALADE_SCHEDULE`, `MARMALADE_AGE_PUBLIC_KEY`.
    pub fn from_env() -> Result<Self> {
        let config = Config {
            url: env_or_empty("MARMALADE_S3_URL"),
            region: env_or_empty("MARMALADE_S3_REGION"),
            key_id: env_or_empty("MARMALADE_S3_KEY_ID"),
            key_secret: env_or_empty("MARMALADE_S3_KEY_SECRET"),
            bucket: env_or_empty("MARMALADE_S3_BUCKET"),
            storage_class: env_or_empty("MARMALADE_S3_STORAGE_CLASS"),
            schedule: env_or_empty("MARMALADE_SCHEDULE"),
            age_public_key: non_empty(env_or_empty("MARMALADE_AGE_PUBLIC_KEY")),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("MARMALADE_S3_URL", &self.url),
            ("MARMALADE_S3_REGION", &self.region),
            ("MARMALADE_S3_KEY_ID", &self.key_id),
            ("MARMALADE_S3_KEY_SECRET", &self.key_secret),
            ("MARMALADE_S3_BUCKET", &self.bucket),
        ];
        for (name, value) in required {
            if value.is_empty() {
                bail!("{name} must be set");
            }
        }
        Ok(())
    }

    /// The S3 client configuration derived from this config.
    pub fn s3_config(&self) -> marmalade_s3::Config {
        marmalade_s3::Config {
            url: self.url.clone(),
            region: self.region.clone(),
            key_id: self.key_id.clone(),
            key_secret: self.key_secret.clone(),
            bucket: self.bucket.clone(),
            storage_class: self.storage_class.clone(),
            insecure: false,
        }
    }
}

fn env_or_empty(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
