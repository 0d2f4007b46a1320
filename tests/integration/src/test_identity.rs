//! Caller identity resolution across authorizer shapes.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lambda_events_core::{LambdaEventsConfig, LookupFailurePolicy};
    use lambda_events_restapi::{IdentityError, RawEvent, Request, StaticUserDirectory};
    use serde_json::{Value, json};

    use crate::{
        POOL_ID, USER_SUB, fixture_directory, iam_event, legacy_identity_event, request,
    };

    fn strict(event: Value, directory: Arc<StaticUserDirectory>) -> Request {
        let config = LambdaEventsConfig {
            lookup_failure: LookupFailurePolicy::Error,
            ..LambdaEventsConfig::default()
        };
        Request::with_config(RawEvent::from_value(event).expect("event"), config)
            .with_directory(directory)
    }

    fn expected_directory_identity() -> Value {
        json!({
            "username": USER_SUB,
            "enabled": true,
            "status": "CONFIRMED",
            "sub": USER_SUB,
            "name": "test",
            "phone_number": "+886227935578",
            "email": "test@example.com",
            "email_verified": "true",
        })
    }

    #[tokio::test]
    async fn test_should_resolve_identity_from_claims() {
        let req = request(json!({
            "requestContext": {
                "authorizer": {
                    "claims": format!("{{\"sub\":\"{USER_SUB}\"}}"),
                    "identity": "default",
                },
            },
        }));
        let user = req.user().await.expect("user").expect("identity");
        assert_eq!(
            Value::from(user),
            json!({ "username": USER_SUB, "sub": USER_SUB, "identity": "default" })
        );
    }

    #[tokio::test]
    async fn test_should_resolve_identity_through_iam_authorizer() {
        let directory = fixture_directory();
        let req = request(iam_event("authenticated", USER_SUB)).with_directory(directory.clone());
        let user = req.user().await.expect("user").expect("identity");
        assert_eq!(Value::from(user), expected_directory_identity());
        assert_eq!(
            directory.queries(),
            vec![(POOL_ID.to_owned(), USER_SUB.to_owned())]
        );
    }

    #[tokio::test]
    async fn test_should_resolve_identity_through_legacy_identity() {
        let directory = fixture_directory();
        let req = request(legacy_identity_event("authenticated", USER_SUB))
            .with_directory(directory.clone());
        let user = req.user().await.expect("user").expect("identity");
        assert_eq!(Value::from(user), expected_directory_identity());
    }

    #[tokio::test]
    async fn test_should_not_query_directory_for_unauthenticated_caller() {
        let directory = fixture_directory();
        let req = request(iam_event("unauthenticated", USER_SUB)).with_directory(directory.clone());
        assert!(req.user().await.expect("user").is_none());

        let req = request(legacy_identity_event("unauthenticated", USER_SUB))
            .with_directory(directory.clone());
        assert!(req.user().await.expect("user").is_none());

        assert!(directory.queries().is_empty());
    }

    #[tokio::test]
    async fn test_should_resolve_anonymous_without_context() {
        let req = request(json!({})).with_directory(fixture_directory());
        assert!(req.user().await.expect("user").is_none());
    }

    #[tokio::test]
    async fn test_should_fail_on_malformed_sign_in_reference() {
        let req = request(json!({
            "requestContext": {
                "identity": {
                    "cognitoAuthenticationType": "authenticated",
                    "cognitoAuthenticationProvider": "no-sign-in-here",
                },
            },
        }))
        .with_directory(fixture_directory());
        assert!(matches!(
            req.user().await,
            Err(IdentityError::MalformedProvider(_))
        ));
    }

    #[tokio::test]
    async fn test_should_degrade_to_anonymous_by_default() {
        let req = request(iam_event("authenticated", "unknown-sub"))
            .with_directory(fixture_directory());
        assert!(req.user().await.expect("user").is_none());

        let req = request(iam_event("authenticated", USER_SUB))
            .with_directory(Arc::new(StaticUserDirectory::failing("service unavailable")));
        assert!(req.user().await.expect("user").is_none());
    }

    #[tokio::test]
    async fn test_should_surface_lookup_failures_when_strict() {
        let req = strict(iam_event("authenticated", "unknown-sub"), fixture_directory());
        assert!(matches!(
            req.user().await,
            Err(IdentityError::UserNotFound { .. })
        ));

        let req = strict(
            iam_event("authenticated", USER_SUB),
            Arc::new(StaticUserDirectory::failing("service unavailable")),
        );
        assert!(matches!(req.user().await, Err(IdentityError::Directory(_))));
    }

    #[tokio::test]
    async fn test_should_resolve_fresh_identity_on_every_call() {
        let directory = fixture_directory();
        let req = request(iam_event("authenticated", USER_SUB)).with_directory(directory.clone());
        let first = req.user().await.expect("user");
        let second = req.user().await.expect("user");
        assert_eq!(first, second);
        assert_eq!(directory.queries().len(), 2);
    }
}
