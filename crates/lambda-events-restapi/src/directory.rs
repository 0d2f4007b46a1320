//! User directory lookups by subject identifier.
//!
//! [`UserDirectory`] is the seam between identity resolution and the backing
//! user store. [`CognitoUserDirectory`] queries a Cognito user pool through
//! the AWS SDK; [`StaticUserDirectory`] serves a fixed set of users and is
//! meant for tests and local development.

use std::collections::HashMap;

use aws_config::BehaviorVersion;
use aws_sdk_cognitoidentityprovider::config::Region;
use aws_sdk_cognitoidentityprovider::error::DisplayErrorContext;
use aws_sdk_cognitoidentityprovider::types::UserType;
use lambda_events_core::AwsRegion;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::DirectoryError;

/// A user record returned by a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    /// Directory user name.
    pub username: String,
    /// Whether the account is enabled.
    pub enabled: bool,
    /// Account status, e.g. `CONFIRMED`.
    pub status: Option<String>,
    /// Attribute name/value pairs, in directory order.
    pub attributes: Vec<(String, String)>,
}

impl DirectoryUser {
    /// Create an enabled, confirmed user with the given attributes.
    pub fn new<I, K, V>(username: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            username: username.into(),
            enabled: true,
            status: Some("CONFIRMED".to_owned()),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Set the enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the account status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Value of the attribute `name`, if present.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Trait for looking up users by their stable subject identifier.
///
/// Uses `#[async_trait]` so that resolvers can hold an
/// `Arc<dyn UserDirectory>`.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug {
    /// Return every user in `pool_id` whose `sub` attribute equals `sub`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Service`] if the backing store fails.
    async fn find_users_by_sub(
        &self,
        pool_id: &str,
        sub: &str,
    ) -> Result<Vec<DirectoryUser>, DirectoryError>;
}

/// Directory backed by a Cognito user pool (`ListUsers` with a `sub` filter).
#[derive(Debug, Clone)]
pub struct CognitoUserDirectory {
    client: aws_sdk_cognitoidentityprovider::Client,
}

impl CognitoUserDirectory {
    /// Wrap an existing SDK client.
    #[must_use]
    pub fn new(client: aws_sdk_cognitoidentityprovider::Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS configuration (credentials chain,
    /// profile, environment) pinned to `region`.
    pub async fn from_env(region: &AwsRegion) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.as_str().to_owned()))
            .load()
            .await;
        Self::new(aws_sdk_cognitoidentityprovider::Client::new(&config))
    }
}

#[async_trait::async_trait]
impl UserDirectory for CognitoUserDirectory {
    async fn find_users_by_sub(
        &self,
        pool_id: &str,
        sub: &str,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        debug!(pool_id, sub, "listing Cognito users by sub");
        let output = self
            .client
            .list_users()
            .user_pool_id(pool_id)
            .filter(sub_filter(sub))
            .send()
            .await
            .map_err(|e| DirectoryError::Service(DisplayErrorContext(&e).to_string()))?;

        Ok(output.users().iter().map(user_from_sdk).collect())
    }
}

/// `ListUsers` filter expression matching the `sub` attribute exactly.
fn sub_filter(sub: &str) -> String {
    format!("sub = \"{}\"", sub.replace('"', "\\\""))
}

fn user_from_sdk(user: &UserType) -> DirectoryUser {
    DirectoryUser {
        username: user.username().unwrap_or_default().to_owned(),
        enabled: user.enabled(),
        status: user.user_status().map(|s| s.as_str().to_owned()),
        attributes: user
            .attributes()
            .iter()
            .filter_map(|a| a.value().map(|v| (a.name().to_owned(), v.to_owned())))
            .collect(),
    }
}

/// In-memory directory keyed by `(pool_id, sub)`.
///
/// Records every query so tests can assert whether a lookup happened. A
/// directory built with [`StaticUserDirectory::failing`] rejects every query.
#[derive(Debug, Default)]
pub struct StaticUserDirectory {
    users: HashMap<(String, String), Vec<DirectoryUser>>,
    failure: Option<String>,
    queries: Mutex<Vec<(String, String)>>,
}

impl StaticUserDirectory {
    /// Create a directory from `(pool_id, user)` pairs. Each user is indexed
    /// by its `sub` attribute, falling back to its user name.
    pub fn new(users: impl IntoIterator<Item = (String, DirectoryUser)>) -> Self {
        let mut index: HashMap<(String, String), Vec<DirectoryUser>> = HashMap::new();
        for (pool_id, user) in users {
            let sub = user
                .attribute("sub")
                .unwrap_or(user.username.as_str())
                .to_owned();
            index.entry((pool_id, sub)).or_default().push(user);
        }
        Self {
            users: index,
            ..Self::default()
        }
    }

    /// Create a directory whose every query fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// The `(pool_id, sub)` pairs queried so far.
    #[must_use]
    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().clone()
    }
}

#[async_trait::async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn find_users_by_sub(
        &self,
        pool_id: &str,
        sub: &str,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        self.queries.lock().push((pool_id.to_owned(), sub.to_owned()));
        if let Some(message) = &self.failure {
            return Err(DirectoryError::Service(message.clone()));
        }
        Ok(self
            .users
            .get(&(pool_id.to_owned(), sub.to_owned()))
            .cloned()
            .unwrap_or_default())
    }
}
