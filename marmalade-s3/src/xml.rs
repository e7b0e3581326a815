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

//! XML parsing and generation for the S3 wire protocol.
//!
//! Responses are parsed with an event reader; request bodies are small
//! enough to build as strings.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::S3ClientError;
use crate::types::{
    DeleteError, DeleteMarkerInfo, DeleteObjectsResult, DeletedObject, ListObjectVersionsResult,
    ObjectIdentifier, ObjectLockRetention, VersionInfo,
};

/// Parses a `ListVersionsResult` document.
pub fn parse_list_object_versions(xml: &str) -> Result<ListObjectVersionsResult, S3ClientError> {
    let xml_error = |message: String| S3ClientError::Xml {
        operation: "ListObjectVersions",
        message,
    };

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut result = ListObjectVersionsResult::default();
    let mut current_element = String::new();
    let mut buf = Vec::new();

    // Containers being filled; Key/VersionId/IsLatest are only meaningful
    // inside one of them.
    let mut version: Option<VersionInfo> = None;
    let mut delete_marker: Option<DeleteMarkerInfo> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if current_element == "Version" {
                    version = Some(VersionInfo::default());
                } else if current_element == "DeleteMarker" {
                    delete_marker = Some(DeleteMarkerInfo::default());
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| xml_error(e.to_string()))?
                    .to_string();

                if let Some(v) = version.as_mut() {
                    match current_element.as_str() {
                        "Key" => v.key = text,
                        "VersionId" => v.version_id = text,
                        "IsLatest" => v.is_latest = text == "true",
                        _ => {}
                    }
                } else if let Some(m) = delete_marker.as_mut() {
                    match current_element.as_str() {
                        "Key" => m.key = text,
                        "VersionId" => m.version_id = text,
                        "IsLatest" => m.is_latest = text == "true",
                        _ => {}
                    }
                } else {
                    match current_element.as_str() {
                        "IsTruncated" => result.is_truncated = text == "true",
                        "NextKeyMarker" => result.next_key_marker = Some(text),
                        "NextVersionIdMarker" => result.next_version_id_marker = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "Version" {
                    if let Some(v) = version.take() {
                        result.versions.push(v);
                    }
                } else if name == "DeleteMarker" {
                    if let Some(m) = delete_marker.take() {
                        result.delete_markers.push(m);
                    }
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(result)
}

/// Parses a `DeleteResult` document.
pub fn parse_delete_result(xml: &str) -> Result<DeleteObjectsResult, S3ClientError> {
    let xml_error = |message: String| S3ClientError::Xml {
        operation: "DeleteObjects",
        message,
    };

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut result = DeleteObjectsResult::default();
    let mut current_element = String::new();
    let mut buf = Vec::new();

    let mut deleted: Option<DeletedObject> = None;
    let mut error: Option<DeleteError> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if current_element == "Deleted" {
                    deleted = Some(DeletedObject {
                        key: String::new(),
                        version_id: None,
                    });
                } else if current_element == "Error" {
                    error = Some(DeleteError {
                        key: String::new(),
                        version_id: None,
                        code: String::new(),
                        message: String::new(),
                    });
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| xml_error(e.to_string()))?
                    .to_string();

                if let Some(d) = deleted.as_mut() {
                    match current_element.as_str() {
                        "Key" => d.key = text,
                        "VersionId" => d.version_id = Some(text),
                        _ => {}
                    }
                } else if let Some(err) = error.as_mut() {
                    match current_element.as_str() {
                        "Key" => err.key = text,
                        "VersionId" => err.version_id = Some(text),
                        "Code" => err.code = text,
                        "Message" => err.message = text,
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "Deleted" {
                    if let Some(d) = deleted.take() {
                        result.deleted.push(d);
                    }
                } else if name == "Error" {
                    if let Some(err) = error.take() {
                        result.errors.push(err);
                    }
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(result)
}

/// Generates the `<Retention>` body for `PutObjectRetention`.
pub fn retention_to_xml(retention: &ObjectLockRetention) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Retention xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Mode>{}</Mode>
  <RetainUntilDate>{}</RetainUntilDate>
</Retention>"#,
        retention.mode.as_str(),
        escape_xml(&retention.until.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    )
}

/// Generates the `<Delete>` body for `DeleteObjects`.
pub fn delete_objects_request(objects: &[ObjectIdentifier]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Delete xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
"#,
    );

    for object in objects {
        xml.push_str("  <Object>\n");
        xml.push_str(&format!("    <Key>{}</Key>\n", escape_xml(&object.key)));
        if let Some(ref version_id) = object.version_id {
            xml.push_str(&format!(
                "    <VersionId>{}</VersionId>\n",
                escape_xml(version_id)
            ));
        }
        xml.push_str("  </Object>\n");
    }

    xml.push_str("</Delete>");
    xml
}

/// Escapes special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
