//! Parameter access and validation over whole events.

#[cfg(test)]
mod tests {
    use lambda_events_validation::{Presence, ValidationOptions};
    use serde_json::{Value, json};

    use crate::request;

    #[test]
    fn test_should_expose_every_parameter_source() {
        let req = request(json!({
            "resource": "/users/{name}",
            "headers": { "Authorization": "Bearer t" },
            "pathParameters": { "name": "%E4%B8%AD%E6%96%87" },
            "queryStringParameters": { "search": "value" },
            "body": "{\"name\":\"John\"}",
        }));
        assert_eq!(req.header("authorization"), Some("Bearer t"));
        assert_eq!(req.parameter("name"), json!("中文"));
        assert_eq!(req.get("search"), json!("value"));
        assert_eq!(req.input("name"), json!("John"));
        assert_eq!(req.parameters().raw().get("name"), json!("%E4%B8%AD%E6%96%87"));
    }

    #[test]
    fn test_should_merge_body_over_query() {
        let req = request(json!({
            "queryStringParameters": { "query": "value" },
            "body": "{\"name\":\"John\"}",
        }));
        assert_eq!(
            Value::Object(req.inputs(["name", "age", "query"])),
            json!({ "name": "John", "age": null, "query": "value" })
        );
    }

    #[test]
    fn test_should_tolerate_malformed_json_body() {
        let req = request(json!({ "body": "Invalid JSON string" }));
        assert!(req.body().is_empty());
        assert_eq!(req.input("anything"), Value::Null);
    }

    #[test]
    fn test_should_treat_missing_sources_as_empty() {
        let req = request(Value::Null);
        assert!(!req.has("name"));
        assert_eq!(req.get_or("page", 1), json!(1));
        assert_eq!(req.parameter("id"), Value::Null);
        assert!(req.header("content-type").is_none());
    }

    #[test]
    fn test_should_pass_matching_schema() {
        let req = request(json!({
            "body": { "name": "John", "email": "john@example.com", "tags": ["a", "b"] },
        }));
        let result = req.validate(
            |s| {
                [
                    ("name", s.string().required()),
                    ("email", s.extension("email").required()),
                    ("tags", s.array().items(s.string()).max(5)),
                ]
                .into()
            },
            ValidationOptions::default(),
        );
        assert!(!result.error());
        assert!(result.details().is_empty());
    }

    #[test]
    fn test_should_reject_undeclared_field() {
        let req = request(json!({ "body": { "name": "John", "description": "x" } }));
        let result = req.validate(
            |s| [("name", s.string().required())].into(),
            ValidationOptions::default(),
        );
        assert!(result.error());
        assert_eq!(result.details().len(), 1);
        let detail = &result.details()[0];
        assert_eq!(detail.key, "description");
        assert_eq!(detail.value, json!("x"));
        assert!(detail.message.contains("is not allowed"));
    }

    #[test]
    fn test_should_collect_every_violation() {
        let req = request(json!({
            "queryStringParameters": { "page": "zero" },
            "body": { "email": "not-an-email" },
        }));
        let result = req.validate(
            |s| {
                [
                    ("name", s.string().required()),
                    ("email", s.extension("email")),
                    ("page", s.integer()),
                ]
                .into()
            },
            ValidationOptions::default(),
        );
        let mut keys: Vec<_> = result.details().iter().map(|d| d.key.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["email", "name", "page"]);
    }

    #[test]
    fn test_should_accept_undeclared_fields_when_allowed() {
        let req = request(json!({ "body": { "name": "John", "extra": 1 } }));
        let options = ValidationOptions {
            allow_unknown: true,
            presence: Presence::Required,
            ..ValidationOptions::default()
        };
        let result = req.validate(|s| [("name", s.string())].into(), options);
        assert!(!result.error(), "{:?}", result.details());
    }

    #[test]
    fn test_should_make_set_values_visible() {
        let mut req = request(json!({}));
        req.body_mut().set("name", "John");
        assert_eq!(req.input("name"), json!("John"));
        assert!(req.has("name"));
    }
}
