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

//! S3-compatible XML for the fake server: response generation and request
//! body parsing.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::ObjectVersion;

/// Generates a `ListVersionsResult` document.
pub(crate) fn list_object_versions_response(
    bucket: &str,
    max_keys: usize,
    is_truncated: bool,
    entries: &[&ObjectVersion],
    latest: impl Fn(&ObjectVersion) -> bool,
) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListVersionsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>{}</Name>
  <Prefix></Prefix>
  <MaxKeys>{}</MaxKeys>
  <IsTruncated>{}</IsTruncated>
"#,
        escape_xml(bucket),
        max_keys,
        is_truncated
    );

    if is_truncated {
        if let Some(last) = entries.last() {
            xml.push_str(&format!(
                "  <NextKeyMarker>{}</NextKeyMarker>\n",
                escape_xml(&last.key)
            ));
            xml.push_str(&format!(
                "  <NextVersionIdMarker>{}</NextVersionIdMarker>\n",
                escape_xml(&last.version_id)
            ));
        }
    }

    for &entry in entries {
        let last_modified = format_timestamp(entry.last_modified);
        if entry.delete_marker {
            xml.push_str(&format!(
                r#"  <DeleteMarker>
    <Key>{}</Key>
    <VersionId>{}</VersionId>
    <IsLatest>{}</IsLatest>
    <LastModified>{}</LastModified>
  </DeleteMarker>
"#,
                escape_xml(&entry.key),
                escape_xml(&entry.version_id),
                latest(entry),
                last_modified
            ));
        } else {
            xml.push_str(&format!(
                r#"  <Version>
    <Key>{}</Key>
    <VersionId>{}</VersionId>
    <IsLatest>{}</IsLatest>
    <LastModified>{}</LastModified>
    <ETag>"{}"</ETag>
    <Size>{}</Size>
    <StorageClass>{}</StorageClass>
  </Version>
"#,
                escape_xml(&entry.key),
                escape_xml(&entry.version_id),
                latest(entry),
                last_modified,
                hex::encode(md5_digest(&entry.content)),
                entry.content.len(),
                escape_xml(&entry.storage_class)
            ));
        }
    }

    xml.push_str("</ListVersionsResult>");
    xml
}

/// Generates a `DeleteResult` document.
pub(crate) fn delete_objects_response(
    deleted: &[(String, Option<String>)],
    errors: &[(String, Option<String>, &'static str, &'static str)],
) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<DeleteResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
"#,
    );

    for (key, version_id) in deleted {
        xml.push_str("  <Deleted>\n");
        xml.push_str(&format!("    <Key>{}</Key>\n", escape_xml(key)));
        if let Some(version_id) = version_id {
            xml.push_str(&format!(
                "    <VersionId>{}</VersionId>\n",
                escape_xml(version_id)
            ));
        }
        xml.push_str("  </Deleted>\n");
    }

    for (key, version_id, code, message) in errors {
        xml.push_str("  <Error>\n");
        xml.push_str(&format!("    <Key>{}</Key>\n", escape_xml(key)));
        if let Some(version_id) = version_id {
            xml.push_str(&format!(
                "    <VersionId>{}</VersionId>\n",
                escape_xml(version_id)
            ));
        }
        xml.push_str(&format!("    <Code>{code}</Code>\n"));
        xml.push_str(&format!("    <Message>{message}</Message>\n"));
        xml.push_str("  </Error>\n");
    }

    xml.push_str("</DeleteResult>");
    xml
}

/// Generates an S3 `Error` document.
pub(crate) fn error_response(code: &str, message: &str, resource: &str, request_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
  <Code>{}</Code>
  <Message>{}</Message>
  <Resource>{}</Resource>
  <RequestId>{}</RequestId>
</Error>"#,
        escape_xml(code),
        escape_xml(message),
        escape_xml(resource),
        escape_xml(request_id)
    )
}

/// Parses a `<Retention>` request body into (mode, retain-until).
pub(crate) fn parse_retention_request(xml: &str) -> Result<(String, DateTime<Utc>), String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut current_element = String::new();
    let mut buf = Vec::new();

    let mut mode: Option<String> = None;
    let mut retain_until: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|_| "invalid XML escape sequence")?
                    .to_string();

                match current_element.as_str() {
                    "Mode" => mode = Some(text),
                    "RetainUntilDate" => retain_until = Some(text),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return Err("invalid XML".to_string()),
            _ => {}
        }
        buf.clear();
    }

    let mode = mode.ok_or("missing Mode element")?;
    if mode != "COMPLIANCE" && mode != "GOVERNANCE" {
        return Err(format!("invalid retention mode: {mode}"));
    }

    let retain_until = retain_until.ok_or("missing RetainUntilDate element")?;
    let until = DateTime::parse_from_rfc3339(&retain_until)
        .map_err(|_| format!("invalid RetainUntilDate: {retain_until}"))?
        .with_timezone(&Utc);

    Ok((mode, until))
}

/// Parses a `<Delete>` request body into (key, version id) pairs.
pub(crate) fn parse_delete_request(xml: &str) -> Result<Vec<(String, Option<String>)>, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut current_element = String::new();
    let mut buf = Vec::new();

    let mut objects: Vec<(String, Option<String>)> = Vec::new();
    let mut current: Option<(String, Option<String>)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if current_element == "Object" {
                    current = Some((String::new(), None));
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|_| "invalid XML escape sequence")?
                    .to_string();

                if let Some(object) = current.as_mut() {
                    match current_element.as_str() {
                        "Key" => object.0 = text,
                        "VersionId" => object.1 = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"Object" {
                    if let Some(object) = current.take() {
                        objects.push(object);
                    }
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(_) => return Err("invalid XML".to_string()),
            _ => {}
        }
        buf.clear();
    }

    Ok(objects)
}

fn md5_digest(content: &[u8]) -> Vec<u8> {
    use md5::Digest;
    md5::Md5::digest(content).to_vec()
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S.000Z").to_string()
}

/// Escapes special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_retention_request() {
        let xml = r#"<Retention>
  <Mode>COMPLIANCE</Mode>
  <RetainUntilDate>2025-03-05T05:00:00Z</RetainUntilDate>
</Retention>"#;

        let (mode, until) = parse_retention_request(xml).unwrap();
        assert_eq!(mode, "COMPLIANCE");
        assert_eq!(until, Utc.with_ymd_and_hms(2025, 3, 5, 5, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_retention_request_invalid() {
        assert!(parse_retention_request("<Retention><Mode>BAD</Mode></Retention>").is_err());
        assert!(parse_retention_request("<Retention><Mode>COMPLIANCE</Mode></Retention>").is_err());
    }

    #[test]
    fn test_parse_delete_request() {
        let xml = r#"<Delete>
  <Object><Key>a.txt</Key><VersionId>v1</VersionId></Object>
  <Object><Key>b.txt</Key></Object>
</Delete>"#;

        let objects = parse_delete_request(xml).unwrap();
        assert_eq!(
            objects,
            vec![
                ("a.txt".to_string(), Some("v1".to_string())),
                ("b.txt".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_error_response() {
        let xml = error_response("NoSuchBucket", "The bucket does not exist", "/bucket", "req1");
        assert!(xml.contains("<Code>NoSuchBucket</Code>"));
        assert!(xml.contains("<RequestId>req1</RequestId>"));
    }
}
