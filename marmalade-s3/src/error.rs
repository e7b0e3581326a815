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

//! S3 client error types.

use thiserror::Error;

/// Errors from the S3 client.
///
/// Transport failures and 5xx responses are transient and retried by the
/// client; everything else, a mismatched signature (403) included, is
/// terminal.
#[derive(Error, Debug)]
pub enum S3ClientError {
    /// The server answered with an unexpected status. The response body is
    /// carried verbatim.
    #[error("{operation} failed with status: {status}, response: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The response body could not be parsed.
    #[error("failed to parse {operation} XML: {message}")]
    Xml {
        operation: &'static str,
        message: String,
    },

    /// Connection, DNS or timeout failure below the HTTP layer.
    #[error("http transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// The client was configured with an unusable endpoint or produced an
    /// unsignable request.
    #[error("invalid request: {0}")]
    Config(String),
}

impl S3ClientError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            S3ClientError::Status { status, .. } => *status >= 500,
            S3ClientError::Transport(_) => true,
            S3ClientError::Xml { .. } | S3ClientError::Config(_) => false,
        }
    }
}
