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

//! Axum routing and handlers for the fake S3 server.

use axum::{
    body::{Body, Bytes},
    extract::{OriginalUri, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::{get, put},
    Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use md5::{Digest, Md5};
use tracing::debug;
use uuid::Uuid;

use crate::sigv4::verify_request;
use crate::xml;
use crate::{ObjectVersion, Retention, SharedState};

pub(crate) fn router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/:bucket",
            get(list_object_versions).post(delete_objects).put(put_bucket_unsupported),
        )
        .route("/:bucket/*key", put(put_object))
        .with_state(state)
}

/// GET `/{bucket}?versions`: list every version and delete marker.
async fn list_object_versions(
    State(state): State<SharedState>,
    Path(bucket): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    let state = state.lock().expect("fake s3 state poisoned");

    if let Err(message) = verify_request(
        &state.credentials,
        "GET",
        uri.path(),
        uri.query(),
        &headers,
        b"",
    ) {
        return signature_error(&message);
    }
    if bucket != state.bucket {
        return s3_error(StatusCode::NOT_FOUND, "NoSuchBucket", "The specified bucket does not exist");
    }
    let query = uri.query().unwrap_or("");
    if !query_has_key(query, "versions") {
        return s3_error(
            StatusCode::BAD_REQUEST,
            "InvalidRequest",
            "only the versions listing is supported",
        );
    }

    let max_keys: usize = query_value(query, "max-keys")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1000);

    // Sorted by key, newest version first within a key.
    let mut entries: Vec<&ObjectVersion> = state.objects.iter().collect();
    entries.sort_by(|a, b| {
        a.key
            .cmp(&b.key)
            .then_with(|| version_sequence(&b.version_id).cmp(&version_sequence(&a.version_id)))
    });

    let is_truncated = state.force_truncated || entries.len() > max_keys;
    entries.truncate(max_keys);

    let body = xml::list_object_versions_response(&state.bucket, max_keys, is_truncated, &entries, |entry| {
        state.is_latest(entry)
    });
    xml_response(StatusCode::OK, body)
}

/// PUT `/{bucket}/{key}`: store a new version, or apply retention when the
/// `retention` query is present.
async fn put_object(
    State(state): State<SharedState>,
    Path((bucket, key)): Path<(String, String)>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut state = state.lock().expect("fake s3 state poisoned");

    if let Err(message) = verify_request(
        &state.credentials,
        "PUT",
        uri.path(),
        uri.query(),
        &headers,
        &body,
    ) {
        return signature_error(&message);
    }
    if bucket != state.bucket {
        return s3_error(StatusCode::NOT_FOUND, "NoSuchBucket", "The specified bucket does not exist");
    }

    if query_has_key(uri.query().unwrap_or(""), "retention") {
        return put_object_retention(&mut state, &key, &body);
    }

    // Content-MD5 is an end-to-end check on the uploaded bytes.
    if let Some(content_md5) = headers.get("content-md5").and_then(|v| v.to_str().ok()) {
        if content_md5 != BASE64.encode(Md5::digest(&body)) {
            return s3_error(
                StatusCode::BAD_REQUEST,
                "BadDigest",
                "The Content-MD5 you specified did not match what we received",
            );
        }
    }

    let retention = match parse_lock_headers(&headers) {
        Ok(retention) => retention,
        Err(response) => return response,
    };

    let version_id = state.next_version_id();
    let now = state.now();
    let storage_class = headers
        .get("x-amz-storage-class")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("STANDARD")
        .to_string();

    debug!("put {key} as {version_id}");
    state.objects.push(ObjectVersion {
        key,
        version_id,
        content: body.to_vec(),
        last_modified: now,
        storage_class,
        delete_marker: false,
        retention,
    });

    empty_response(StatusCode::OK)
}

/// PUT `/{bucket}/{key}?retention`: set or extend retention on the latest
/// version. COMPLIANCE periods can never be shortened.
fn put_object_retention(
    state: &mut crate::BucketState,
    key: &str,
    body: &[u8],
) -> Response {
    let (mode, until) = match xml::parse_retention_request(&String::from_utf8_lossy(body)) {
        Ok(parsed) => parsed,
        Err(message) => return s3_error(StatusCode::BAD_REQUEST, "MalformedXML", &message),
    };

    let Some(target) = state
        .objects
        .iter_mut()
        .filter(|o| o.key == key && !o.delete_marker)
        .max_by_key(|o| version_sequence(&o.version_id))
    else {
        return s3_error(StatusCode::NOT_FOUND, "NoSuchKey", "The specified key does not exist");
    };

    if let Some(existing) = &target.retention {
        if existing.mode == "COMPLIANCE" && until < existing.until {
            return s3_error(
                StatusCode::FORBIDDEN,
                "AccessDenied",
                "COMPLIANCE retention cannot be shortened",
            );
        }
    }

    target.retention = Some(Retention { mode, until });
    empty_response(StatusCode::OK)
}

/// POST `/{bucket}?delete`: batch delete. Locked versions produce per-item
/// errors, unknown versions succeed silently, keyless entries become
/// delete markers.
async fn delete_objects(
    State(state): State<SharedState>,
    Path(bucket): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut state = state.lock().expect("fake s3 state poisoned");

    if let Err(message) = verify_request(
        &state.credentials,
        "POST",
        uri.path(),
        uri.query(),
        &headers,
        &body,
    ) {
        return signature_error(&message);
    }
    if bucket != state.bucket {
        return s3_error(StatusCode::NOT_FOUND, "NoSuchBucket", "The specified bucket does not exist");
    }
    if !query_has_key(uri.query().unwrap_or(""), "delete") {
        return s3_error(
            StatusCode::BAD_REQUEST,
            "InvalidRequest",
            "only batch deletion is supported",
        );
    }

    let identifiers = match xml::parse_delete_request(&String::from_utf8_lossy(&body)) {
        Ok(identifiers) => identifiers,
        Err(message) => return s3_error(StatusCode::BAD_REQUEST, "MalformedXML", &message),
    };

    let now = state.now();
    let mut deleted: Vec<(String, Option<String>)> = Vec::new();
    let mut errors: Vec<(String, Option<String>, &'static str, &'static str)> = Vec::new();

    for (key, version_id) in identifiers {
        match version_id {
            Some(version_id) => {
                let position = state
                    .objects
                    .iter()
                    .position(|o| o.key == key && o.version_id == version_id);
                match position {
                    Some(position) => {
                        let object = &state.objects[position];
                        let locked = !object.delete_marker
                            && object.retention.as_ref().is_some_and(|r| r.until > now);
                        if locked {
                            errors.push((key, Some(version_id), "AccessDenied", "Object is locked"));
                        } else {
                            debug!("delete {key} version {version_id}");
                            state.objects.remove(position);
                            deleted.push((key, Some(version_id)));
                        }
                    }
                    // Unknown key or version: deletion is idempotent.
                    None => deleted.push((key, Some(version_id))),
                }
            }
            None => {
                let version_id = state.next_version_id();
                debug!("delete marker for {key} as {version_id}");
                state.objects.push(ObjectVersion {
                    key: key.clone(),
                    version_id: version_id.clone(),
                    content: Vec::new(),
                    last_modified: now,
                    storage_class: String::new(),
                    delete_marker: true,
                    retention: None,
                });
                deleted.push((key, Some(version_id)));
            }
        }
    }

    xml_response(StatusCode::OK, xml::delete_objects_response(&deleted, &errors))
}

async fn put_bucket_unsupported() -> Response {
    s3_error(
        StatusCode::NOT_IMPLEMENTED,
        "NotImplemented",
        "bucket operations are not supported",
    )
}

/// Numeric part of a `v{n}` version id, for ordering.
fn version_sequence(version_id: &str) -> u64 {
    version_id
        .strip_prefix('v')
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn parse_lock_headers(headers: &HeaderMap) -> Result<Option<Retention>, Response> {
    let Some(mode) = headers
        .get("x-amz-object-lock-mode")
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(None);
    };

    if mode != "COMPLIANCE" && mode != "GOVERNANCE" {
        return Err(s3_error(
            StatusCode::BAD_REQUEST,
            "InvalidRequest",
            "invalid object lock mode",
        ));
    }

    let until = headers
        .get("x-amz-object-lock-retain-until-date")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| chrono::DateTime::parse_from_rfc3339(v).ok());
    let Some(until) = until else {
        return Err(s3_error(
            StatusCode::BAD_REQUEST,
            "InvalidRequest",
            "missing or invalid retain-until date",
        ));
    };

    Ok(Some(Retention {
        mode: mode.to_string(),
        until: until.with_timezone(&chrono::Utc),
    }))
}

fn query_has_key(query: &str, name: &str) -> bool {
    query
        .split('&')
        .any(|pair| pair.splitn(2, '=').next() == Some(name))
}

fn query_value<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        if parts.next() == Some(name) {
            parts.next()
        } else {
            None
        }
    })
}

fn xml_response(status: StatusCode, body: String) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/xml")
        .header("x-amz-request-id", Uuid::new_v4().to_string())
        .body(Body::from(body))
        .expect("static response")
}

fn empty_response(status: StatusCode) -> Response {
    Response::builder()
        .status(status)
        .header("x-amz-request-id", Uuid::new_v4().to_string())
        .body(Body::empty())
        .expect("static response")
}

fn s3_error(status: StatusCode, code: &str, message: &str) -> Response {
    let request_id = Uuid::new_v4().to_string();
    xml_response(status, xml::error_response(code, message, "", &request_id))
}

fn signature_error(message: &str) -> Response {
    s3_error(StatusCode::FORBIDDEN, "SignatureDoesNotMatch", message)
}
