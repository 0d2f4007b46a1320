//! Multipart uploads through the request normalizer.

#[cfg(test)]
mod tests {
    use lambda_events_core::LambdaEventsConfig;
    use lambda_events_restapi::{MultipartError, RawEvent, Request};
    use serde_json::json;

    use crate::{multipart_body, multipart_event, request};

    const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

    #[tokio::test]
    async fn test_should_decode_fields_and_files() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();
        let body = multipart_body(
            BOUNDARY,
            &[
                ("title", None, b"holiday"),
                ("photo", Some("beach.jpg"), &payload),
            ],
        );
        let mut req = request(multipart_event(BOUNDARY, &body, true));

        let photo = req.file("photo").await.expect("decode").expect("photo");
        assert_eq!(photo.filename(), "beach.jpg");
        assert_eq!(photo.mime_type(), "application/octet-stream");
        assert_eq!(photo.len(), payload.len());
        assert_eq!(photo.data().as_ref(), payload.as_slice());

        assert_eq!(req.input("title"), json!("holiday"));
        assert_eq!(req.files().await.expect("files").len(), 1);
    }

    #[tokio::test]
    async fn test_should_validate_multipart_fields_after_decode() {
        let body = multipart_body(BOUNDARY, &[("name", None, b"John")]);
        let mut req = request(multipart_event(BOUNDARY, &body, false));
        assert!(req.file("missing").await.expect("decode").is_none());

        let result = req.validate(
            |s| [("name", s.string().required())].into(),
            lambda_events_validation::ValidationOptions::default(),
        );
        assert!(!result.error(), "{:?}", result.details());
    }

    #[tokio::test]
    async fn test_should_not_expose_empty_file_field() {
        let body = multipart_body(BOUNDARY, &[("photo", Some("empty.jpg"), b"")]);
        let mut req = request(multipart_event(BOUNDARY, &body, true));
        assert!(req.file("photo").await.expect("decode").is_none());
    }

    #[tokio::test]
    async fn test_should_reject_truncated_body_without_partial_files() {
        let mut body = multipart_body(BOUNDARY, &[("photo", Some("a.bin"), b"abcdef")]);
        body.truncate(body.len() - 12);
        let mut req = request(multipart_event(BOUNDARY, &body, true));
        assert_eq!(req.file("photo").await.err(), Some(MultipartError::UnexpectedEnd));
        assert_eq!(req.file("photo").await.err(), Some(MultipartError::UnexpectedEnd));
    }

    #[tokio::test]
    async fn test_should_enforce_configured_field_limit() {
        let config = LambdaEventsConfig {
            multipart_max_field_bytes: 3,
            ..LambdaEventsConfig::default()
        };
        let body = multipart_body(BOUNDARY, &[("comment", None, b"too long")]);
        let event = RawEvent::from_value(multipart_event(BOUNDARY, &body, false)).expect("event");
        let mut req = Request::with_config(event, config);
        assert_eq!(
            req.file("comment").await.err(),
            Some(MultipartError::FieldTooLarge {
                name: "comment".to_owned(),
                limit: 3,
            })
        );
    }

    #[tokio::test]
    async fn test_should_ignore_non_multipart_requests() {
        let mut req = request(json!({
            "headers": { "content-type": "application/json" },
            "body": "{\"photo\":\"inline\"}",
        }));
        assert!(!req.is_multipart());
        assert!(req.file("photo").await.expect("decode").is_none());
        assert_eq!(req.input("photo"), json!("inline"));
    }
}
