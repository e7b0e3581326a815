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

//! Bounded retry for transient request failures.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::error::S3ClientError;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(250);

/// Runs `operation` up to [`MAX_ATTEMPTS`] times, backing off
/// exponentially with jitter between attempts. Only errors reporting
/// themselves as retriable are retried.
pub(crate) async fn with_retries<T, F, Fut>(mut operation: F) -> Result<T, S3ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, S3ClientError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retriable() && attempt < MAX_ATTEMPTS => {
                let backoff = BASE_DELAY * 2u32.pow(attempt - 1);
                let jitter_ms = rand::thread_rng().gen_range(0..=backoff.as_millis() as u64 / 2);
                let delay = backoff + Duration::from_millis(jitter_ms);
                debug!("attempt {attempt} failed, retrying in {delay:?}: {err}");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
