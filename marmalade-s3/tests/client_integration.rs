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

//! Integration tests for the S3 client against the in-process fake
//! server. Every request is SigV4-signed and verified server-side.

use bytes::Bytes;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use marmalade_fake_s3::{FakeS3, ObjectVersion, Retention};
use marmalade_s3::{
    Client, Config, DeleteMarkerInfo, ObjectIdentifier, ObjectLockRetention, RetentionMode,
    S3ClientError, VersionInfo,
};

async fn setup() -> (Client, FakeS3) {
    let fake = FakeS3::new("my-bucket", "keyid", "shh");
    let endpoint = fake.start_server().await;

    let client = Client::new(Config {
        url: endpoint,
        region: "my-region".to_string(),
        key_id: "keyid".to_string(),
        key_secret: "shh".to_string(),
        bucket: "my-bucket".to_string(),
        storage_class: String::new(),
        insecure: true,
    })
    .unwrap();

    (client, fake)
}

fn now() -> DateTime<Utc> {
    // Retain-until dates travel as RFC 3339 with whole seconds.
    Utc::now().trunc_subsecs(0)
}

#[tokio::test]
async fn test_can_put_and_list_objects() {
    let (client, fake) = setup().await;
    let now = now();
    fake.set_now(now);

    client
        .put_object("my-file.txt", Bytes::from_static(b"abc"), None)
        .await
        .unwrap();

    let versions = fake.get_versions("my-file.txt");
    assert_eq!(versions.len(), 1);
    assert_eq!(
        versions[0],
        ObjectVersion {
            key: "my-file.txt".to_string(),
            version_id: "v1".to_string(),
            content: b"abc".to_vec(),
            last_modified: now,
            storage_class: "STANDARD".to_string(),
            delete_marker: false,
            retention: None,
        }
    );

    let result = client.list_object_versions("", "", "", 500).await.unwrap();
    assert!(!result.is_truncated);
    assert_eq!(result.delete_markers.len(), 0);
    assert_eq!(
        result.versions,
        vec![VersionInfo {
            key: "my-file.txt".to_string(),
            version_id: "v1".to_string(),
            is_latest: true,
        }]
    );
}

#[tokio::test]
async fn test_deletion() {
    let (client, fake) = setup().await;
    let now = now();
    fake.set_now(now);

    client
        .put_object("my-file.txt", Bytes::from_static(b"abc"), None)
        .await
        .unwrap();

    // Delete the specific version.
    let result = client
        .delete_objects(&[ObjectIdentifier {
            key: "my-file.txt".to_string(),
            version_id: Some("v1".to_string()),
        }])
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 0);
    assert_eq!(fake.get_versions("my-file.txt").len(), 0);

    // Put it back, then delete without a version to create a marker.
    client
        .put_object("my-file.txt", Bytes::from_static(b"abc"), None)
        .await
        .unwrap();
    let result = client
        .delete_objects(&[ObjectIdentifier {
            key: "my-file.txt".to_string(),
            version_id: None,
        }])
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 0);

    let versions = fake.get_versions("my-file.txt");
    assert_eq!(versions.len(), 2);
    assert!(!versions[0].delete_marker);
    assert_eq!(versions[0].version_id, "v2");
    assert!(versions[1].delete_marker);
    assert_eq!(versions[1].version_id, "v3");

    let result = client.list_object_versions("", "", "", 500).await.unwrap();
    assert!(!result.is_truncated);
    assert_eq!(
        result.delete_markers,
        vec![DeleteMarkerInfo {
            key: "my-file.txt".to_string(),
            version_id: "v3".to_string(),
            is_latest: true,
        }]
    );
    assert_eq!(
        result.versions,
        vec![VersionInfo {
            key: "my-file.txt".to_string(),
            version_id: "v2".to_string(),
            is_latest: false,
        }]
    );

    // Deleting an unknown key or version silently moves on.
    let result = client
        .delete_objects(&[ObjectIdentifier {
            key: "no-such-file.txt".to_string(),
            version_id: Some("blah".to_string()),
        }])
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 0);

    let result = client
        .delete_objects(&[ObjectIdentifier {
            key: "my-file.txt".to_string(),
            version_id: Some("blah".to_string()),
        }])
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 0);

    // Delete all versions, marker included.
    let result = client
        .delete_objects(&[
            ObjectIdentifier {
                key: "my-file.txt".to_string(),
                version_id: Some("v2".to_string()),
            },
            ObjectIdentifier {
                key: "my-file.txt".to_string(),
                version_id: Some("v3".to_string()),
            },
        ])
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 0);
    assert_eq!(fake.get_versions("my-file.txt").len(), 0);
}

#[tokio::test]
async fn test_multiple_versions() {
    let (client, fake) = setup().await;
    fake.set_now(now());

    client
        .put_object("my-file.txt", Bytes::from_static(b"abc"), None)
        .await
        .unwrap();
    client
        .put_object("my-file.txt", Bytes::from_static(b"abc"), None)
        .await
        .unwrap();

    let result = client.list_object_versions("", "", "", 500).await.unwrap();
    assert!(!result.is_truncated);
    assert_eq!(result.delete_markers.len(), 0);
    assert_eq!(
        result.versions,
        vec![
            VersionInfo {
                key: "my-file.txt".to_string(),
                version_id: "v2".to_string(),
                is_latest: true,
            },
            VersionInfo {
                key: "my-file.txt".to_string(),
                version_id: "v1".to_string(),
                is_latest: false,
            },
        ]
    );
}

#[tokio::test]
async fn test_object_retention() {
    let (client, fake) = setup().await;
    let now = now();
    fake.set_now(now);

    client
        .put_object(
            "my-file.txt",
            Bytes::from_static(b"abc"),
            Some(&ObjectLockRetention {
                mode: RetentionMode::Compliance,
                until: now + Duration::hours(1),
            }),
        )
        .await
        .unwrap();

    let result = client
        .delete_objects(&[ObjectIdentifier {
            key: "my-file.txt".to_string(),
            version_id: Some("v1".to_string()),
        }])
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].message, "Object is locked");

    // Two hours later the lock has expired.
    fake.set_now(now + Duration::hours(2));
    let result = client
        .delete_objects(&[ObjectIdentifier {
            key: "my-file.txt".to_string(),
            version_id: Some("v1".to_string()),
        }])
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 0);
}

#[tokio::test]
async fn test_put_object_retention() {
    let (client, fake) = setup().await;
    let now = now();
    fake.set_now(now);

    client
        .put_object("my-file.txt", Bytes::from_static(b"abc"), None)
        .await
        .unwrap();

    let until = now + Duration::hours(1);
    client
        .put_object_retention(
            "my-file.txt",
            &ObjectLockRetention {
                mode: RetentionMode::Compliance,
                until,
            },
        )
        .await
        .unwrap();

    let versions = fake.get_versions("my-file.txt");
    assert_eq!(
        versions[0].retention,
        Some(Retention {
            mode: "COMPLIANCE".to_string(),
            until,
        })
    );

    let result = client
        .delete_objects(&[ObjectIdentifier {
            key: "my-file.txt".to_string(),
            version_id: Some("v1".to_string()),
        }])
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].message, "Object is locked");
}

#[tokio::test]
async fn test_retention_cannot_be_shortened() {
    let (client, fake) = setup().await;
    let now = now();
    fake.set_now(now);

    client
        .put_object(
            "my-file.txt",
            Bytes::from_static(b"abc"),
            Some(&ObjectLockRetention {
                mode: RetentionMode::Compliance,
                until: now + Duration::hours(4),
            }),
        )
        .await
        .unwrap();

    let err = client
        .put_object_retention(
            "my-file.txt",
            &ObjectLockRetention {
                mode: RetentionMode::Compliance,
                until: now + Duration::hours(1),
            },
        )
        .await
        .unwrap_err();
    match err {
        S3ClientError::Status { status, .. } => assert_eq!(status, 403),
        other => panic!("expected status error, got {other}"),
    }

    // Extending is allowed.
    client
        .put_object_retention(
            "my-file.txt",
            &ObjectLockRetention {
                mode: RetentionMode::Compliance,
                until: now + Duration::hours(8),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_object_retention_with_delete_marker() {
    let (client, fake) = setup().await;
    let now = now();
    fake.set_now(now);

    client
        .put_object(
            "my-file.txt",
            Bytes::from_static(b"abc"),
            Some(&ObjectLockRetention {
                mode: RetentionMode::Compliance,
                until: now + Duration::hours(1),
            }),
        )
        .await
        .unwrap();

    // A keyless delete hides the version behind a marker.
    let result = client
        .delete_objects(&[ObjectIdentifier {
            key: "my-file.txt".to_string(),
            version_id: None,
        }])
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 0);

    let result = client.list_object_versions("", "", "", 500).await.unwrap();
    assert_eq!(
        result.delete_markers,
        vec![DeleteMarkerInfo {
            key: "my-file.txt".to_string(),
            version_id: "v2".to_string(),
            is_latest: true,
        }]
    );
    assert_eq!(
        result.versions,
        vec![VersionInfo {
            key: "my-file.txt".to_string(),
            version_id: "v1".to_string(),
            is_latest: false,
        }]
    );

    // The marker deletes, the locked version does not.
    let result = client
        .delete_objects(&[
            ObjectIdentifier {
                key: "my-file.txt".to_string(),
                version_id: Some("v1".to_string()),
            },
            ObjectIdentifier {
                key: "my-file.txt".to_string(),
                version_id: Some("v2".to_string()),
            },
        ])
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].message, "Object is locked");

    let result = client.list_object_versions("", "", "", 500).await.unwrap();
    assert_eq!(result.delete_markers.len(), 0);
    assert_eq!(
        result.versions,
        vec![VersionInfo {
            key: "my-file.txt".to_string(),
            version_id: "v1".to_string(),
            is_latest: true,
        }]
    );

    // Lock expires, everything goes.
    fake.set_now(now + Duration::hours(2));
    let result = client
        .delete_objects(&[
            ObjectIdentifier {
                key: "my-file.txt".to_string(),
                version_id: Some("v1".to_string()),
            },
            ObjectIdentifier {
                key: "my-file.txt".to_string(),
                version_id: Some("v2".to_string()),
            },
        ])
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 0);

    let result = client.list_object_versions("", "", "", 500).await.unwrap();
    assert_eq!(result.delete_markers.len(), 0);
    assert_eq!(result.versions.len(), 0);
    assert_eq!(fake.get_versions("my-file.txt").len(), 0);
}

#[tokio::test]
async fn test_storage_class_is_forwarded() {
    let fake = FakeS3::new("my-bucket", "keyid", "shh");
    let endpoint = fake.start_server().await;

    let client = Client::new(Config {
        url: endpoint,
        region: "my-region".to_string(),
        key_id: "keyid".to_string(),
        key_secret: "shh".to_string(),
        bucket: "my-bucket".to_string(),
        storage_class: "GLACIER".to_string(),
        insecure: true,
    })
    .unwrap();

    client
        .put_object("my-file.txt", Bytes::from_static(b"abc"), None)
        .await
        .unwrap();

    assert_eq!(fake.get_versions("my-file.txt")[0].storage_class, "GLACIER");
}

#[tokio::test]
async fn test_bad_signature_is_rejected() {
    let fake = FakeS3::new("my-bucket", "keyid", "shh");
    let endpoint = fake.start_server().await;

    let client = Client::new(Config {
        url: endpoint,
        region: "my-region".to_string(),
        key_id: "keyid".to_string(),
        key_secret: "wrong-secret".to_string(),
        bucket: "my-bucket".to_string(),
        storage_class: String::new(),
        insecure: true,
    })
    .unwrap();

    let err = client
        .list_object_versions("", "", "", 500)
        .await
        .unwrap_err();
    match err {
        S3ClientError::Status { status, .. } => assert_eq!(status, 403),
        other => panic!("expected status error, got {other}"),
    }
    assert!(!err.is_retriable());
}
