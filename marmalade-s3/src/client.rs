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

//! Typed client for the four S3 operations this tool needs.
//!
//! Path-style addressing only: `<endpoint>/<bucket>/<key>`. Each call is a
//! single signed HTTP/1.1 request, wrapped in bounded retry for transport
//! failures and 5xx responses.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::Utc;
use md5::Md5;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use sha2::Digest;
use std::time::Duration;
use url::Url;

use crate::error::S3ClientError;
use crate::retry::with_retries;
use crate::sigv4::{payload_sha256, sign_request, Credentials};
use crate::types::{
    DeleteObjectsResult, ListObjectVersionsResult, ObjectIdentifier, ObjectLockRetention,
};
use crate::xml;

/// Request timeout for each attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Endpoint host, with optional port: `s3.example.com` or
    /// `127.0.0.1:9000`.
    pub url: String,
    pub region: String,
    pub key_id: String,
    pub key_secret: String,
    pub bucket: String,
    /// Storage class for uploads; empty means the server default.
    pub storage_class: String,
    /// Use plain HTTP instead of HTTPS.
    pub insecure: bool,
}

/// An S3 client bound to a single bucket.
pub struct Client {
    config: Config,
    credentials: Credentials,
    http: reqwest::Client,
}

impl Client {
    pub fn new(config: Config) -> Result<Self, S3ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(S3ClientError::Transport)?;

        let credentials = Credentials {
            access_key_id: config.key_id.clone(),
            secret_access_key: config.key_secret.clone(),
        };

        Ok(Client {
            config,
            credentials,
            http,
        })
    }

    /// Lists object versions and delete markers in the bucket.
    ///
    /// Empty marker or prefix arguments are omitted from the request. The
    /// caller is responsible for reacting to `is_truncated`.
    pub async fn list_object_versions(
        &self,
        prefix: &str,
        key_marker: &str,
        version_id_marker: &str,
        max_keys: u32,
    ) -> Result<ListObjectVersionsResult, S3ClientError> {
        let mut url = self.build_url(None)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_key_only("versions");
            if !prefix.is_empty() {
                query.append_pair("prefix", prefix);
            }
            if !key_marker.is_empty() {
                query.append_pair("key-marker", key_marker);
            }
            if !version_id_marker.is_empty() {
                query.append_pair("version-id-marker", version_id_marker);
            }
            if max_keys > 0 {
                query.append_pair("max-keys", &max_keys.to_string());
            }
        }

        let url = &url;
        let headers = &HeaderMap::new();
        let body = &Bytes::new();
        with_retries(move || async move {
            let response = self
                .send("ListObjectVersions", Method::GET, url, headers, body, &[200])
                .await?;
            xml::parse_list_object_versions(&response)
        })
        .await
    }

    /// Uploads an object, optionally placing it under Object Lock.
    pub async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        retention: Option<&ObjectLockRetention>,
    ) -> Result<(), S3ClientError> {
        let url = self.build_url(Some(key))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        insert_content_md5(&mut headers, &body)?;
        if let Some(retention) = retention {
            headers.insert(
                "x-amz-object-lock-mode",
                header_value(retention.mode.as_str())?,
            );
            headers.insert(
                "x-amz-object-lock-retain-until-date",
                header_value(&rfc3339(retention))?,
            );
        }
        if !self.config.storage_class.is_empty() {
            headers.insert(
                "x-amz-storage-class",
                header_value(&self.config.storage_class)?,
            );
        }

        let url = &url;
        let headers = &headers;
        let body = &body;
        with_retries(move || async move {
            self.send("PutObject", Method::PUT, url, headers, body, &[200, 201, 204])
                .await?;
            Ok(())
        })
        .await
    }

    /// Applies a retention period to the latest version of `key`. Servers
    /// reject attempts to shorten an existing COMPLIANCE period, so this
    /// is only useful to extend.
    pub async fn put_object_retention(
        &self,
        key: &str,
        retention: &ObjectLockRetention,
    ) -> Result<(), S3ClientError> {
        let mut url = self.build_url(Some(key))?;
        url.set_query(Some("retention"));

        let body = Bytes::from(xml::retention_to_xml(retention));
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
        insert_content_md5(&mut headers, &body)?;

        let url = &url;
        let headers = &headers;
        let body = &body;
        with_retries(move || async move {
            self.send("PutObjectRetention", Method::PUT, url, headers, body, &[200])
                .await?;
            Ok(())
        })
        .await
    }

    /// Deletes a batch of object versions. Per-object failures come back
    /// in the result and do not fail the call.
    pub async fn delete_objects(
        &self,
        objects: &[ObjectIdentifier],
    ) -> Result<DeleteObjectsResult, S3ClientError> {
        let mut url = self.build_url(None)?;
        url.set_query(Some("delete"));

        let body = Bytes::from(xml::delete_objects_request(objects));
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
        insert_content_md5(&mut headers, &body)?;

        let url = &url;
        let headers = &headers;
        let body = &body;
        with_retries(move || async move {
            let response = self
                .send("DeleteObjects", Method::POST, url, headers, body, &[200])
                .await?;
            xml::parse_delete_result(&response)
        })
        .await
    }

    /// Signs and sends one request, returning the response body. Statuses
    /// outside `accept` become errors, retriable when 5xx.
    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        url: &Url,
        headers: &HeaderMap,
        body: &Bytes,
        accept: &[u16],
    ) -> Result<String, S3ClientError> {
        let mut headers = headers.clone();
        sign_request(
            method.as_str(),
            url,
            &mut headers,
            &payload_sha256(body),
            &self.config.region,
            &self.credentials,
            Utc::now(),
        )?;

        let response = self
            .http
            .request(method, url.clone())
            .headers(headers)
            .body(body.clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        if !accept.contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(S3ClientError::Status {
                operation,
                status,
                body,
            });
        }

        Ok(response.text().await?)
    }

    fn build_url(&self, key: Option<&str>) -> Result<Url, S3ClientError> {
        let scheme = if self.config.insecure { "http" } else { "https" };
        let mut url = Url::parse(&format!("{scheme}://{}", self.config.url))
            .map_err(|e| S3ClientError::Config(format!("endpoint {}: {e}", self.config.url)))?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| S3ClientError::Config("endpoint cannot be a base URL".to_string()))?;
            segments.push(&self.config.bucket);
            if let Some(key) = key {
                segments.push(key);
            }
        }

        Ok(url)
    }
}

fn rfc3339(retention: &ObjectLockRetention) -> String {
    retention
        .until
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn insert_content_md5(headers: &mut HeaderMap, body: &Bytes) -> Result<(), S3ClientError> {
    let digest = Md5::digest(body);
    headers.insert("content-md5", header_value(&BASE64.encode(digest))?);
    Ok(())
}

fn header_value(value: &str) -> Result<HeaderValue, S3ClientError> {
    HeaderValue::from_str(value)
        .map_err(|_| S3ClientError::Config(format!("invalid header value: {value}")))
}
