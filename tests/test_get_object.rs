mod helpers;

use bytes::Bytes;
use helpers::{TEST_BUCKET, TestService};
use kodo_bridge::ClientError;

#[tokio::test]
async fn test_get_object_through_private_download_url() {
    let test = TestService::start(TEST_BUCKET);
    test.seed(&["test-file.txt"]).await;

    let body = test
        .service
        .get_object(TEST_BUCKET, "test-file.txt")
        .await
        .unwrap();
    assert_eq!(body, Bytes::from("Content of test-file.txt"));

    let requests = test.transport().requests().await;
    let url = requests[0].url().unwrap();
    assert_eq!(url.host_str(), Some("io.test.local"));
    assert!(url.query().unwrap().contains("token="));
}

#[tokio::test]
async fn test_get_object_with_special_characters_in_key() {
    let test = TestService::start(TEST_BUCKET);
    let key = "photos/summer 2024/beach+sunset.jpg";
    test.transport()
        .insert_object(TEST_BUCKET, key, vec![0xFF, 0xD8, 0xFF], "image/jpeg")
        .await;

    let body = test.service.get_object(TEST_BUCKET, key).await.unwrap();
    assert_eq!(body, Bytes::from_static(&[0xFF, 0xD8, 0xFF]));
}

#[tokio::test]
async fn test_get_object_with_reserved_url_characters_in_key() {
    let test = TestService::start(TEST_BUCKET);
    for key in ["notes#1.txt", "what?.txt", "reports/q1#draft?.pdf"] {
        test.transport()
            .insert_object(TEST_BUCKET, key, key.as_bytes().to_vec(), "text/plain")
            .await;

        let body = test
            .service
            .get_object(TEST_BUCKET, key)
            .await
            .unwrap_or_else(|e| panic!("Download of {:?} failed: {}", key, e));
        assert_eq!(body, Bytes::copy_from_slice(key.as_bytes()));
    }
}

#[tokio::test]
async fn test_get_nonexistent_object() {
    let test = TestService::start(TEST_BUCKET);

    let err = test
        .service
        .get_object(TEST_BUCKET, "nonexistent.txt")
        .await
        .unwrap_err();

    match err {
        ClientError::Provider(e) => {
            assert_eq!(e.status, 404);
            assert_eq!(e.message, "Document not found");
            assert!(e.request_id.starts_with("emu-"));
        }
        other => panic!("Expected a provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_object_metadata() {
    let test = TestService::start(TEST_BUCKET);
    test.transport()
        .insert_object(TEST_BUCKET, "report.pdf", vec![0u8; 2048], "application/pdf")
        .await;

    let metadata = test
        .service
        .get_object_metadata(TEST_BUCKET, "report.pdf")
        .await
        .unwrap();

    assert_eq!(metadata.key, "report.pdf");
    assert_eq!(metadata.content_length, 2048);
    assert_eq!(metadata.content_type, "application/pdf");
    assert!(!metadata.etag.is_empty());

    let age = chrono::Utc::now() - metadata.last_modified;
    assert!(age.num_seconds() < 60, "putTime should convert to a recent timestamp");
}

#[tokio::test]
async fn test_get_object_metadata_missing() {
    let test = TestService::start(TEST_BUCKET);

    let err = test
        .service
        .get_object_metadata(TEST_BUCKET, "missing.txt")
        .await
        .unwrap_err();

    match err {
        ClientError::Provider(e) => {
            assert_eq!(e.status, 612);
            assert_eq!(e.code, "612");
            assert_eq!(e.message, "no such file or directory");
        }
        other => panic!("Expected a provider error, got {:?}", other),
    }
}
