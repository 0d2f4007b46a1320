//! Response envelopes built from request outcomes.

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use lambda_events_restapi::Response;
    use lambda_events_validation::ValidationOptions;
    use serde_json::{Value, json};

    use crate::request;

    #[test]
    fn test_should_report_validation_failure() {
        let req = request(json!({ "body": { "description": "x" } }));
        let result = req.validate(
            |s| [("name", s.string().required())].into(),
            ValidationOptions::default(),
        );
        let output = Response::new()
            .with_cors(true)
            .json(&result, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(output.status_code, 422);
        assert!(output.headers.contains_key("Access-Control-Allow-Origin"));

        let body: Value = serde_json::from_str(&output.body).expect("json body");
        assert_eq!(body["error"], json!(true));
        assert_eq!(body["details"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_should_build_not_found() {
        let output = Response::new().not_found("user not found");
        assert_eq!(output.status_code, 404);
        assert_eq!(output.body, r#"{"error":"user not found"}"#);
        assert!(!output.headers.contains_key("Access-Control-Allow-Origin"));
    }
}
