//! Process-wide registry of custom rule extensions.
//!
//! Extensions are installed once, before the first request is normalized.
//! Later installation attempts are no-ops, so cold-start code may call
//! [`install_extensions`] unconditionally.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

type Check = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A named string predicate usable through [`crate::SchemaBuilder::extension`].
#[derive(Clone)]
pub struct Extension {
    name: String,
    message: String,
    check: Check,
}

impl Extension {
    /// Create an extension.
    ///
    /// `message` completes the sentence `"<label>" must be ...`, e.g. `a valid email`.
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        check: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            check: Arc::new(check),
        }
    }

    /// Extension name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Message suffix used when the check fails.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Run the check against a JSON value. Non-strings never pass.
    #[must_use]
    pub fn check(&self, value: &Value) -> bool {
        value.as_str().is_some_and(|s| (self.check)(s))
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

static REGISTRY: OnceCell<HashMap<String, Extension>> = OnceCell::new();

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("valid uuid pattern")
});

static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{1,14}$").expect("valid phone pattern"));

/// Extensions available without any installation.
#[must_use]
pub fn builtin_extensions() -> Vec<Extension> {
    vec![
        Extension::new("email", "a valid email", |s| EMAIL.is_match(s)),
        Extension::new("uuid", "a valid GUID", |s| UUID.is_match(s)),
        Extension::new("phone", "a valid E.164 phone number", |s| PHONE.is_match(s)),
    ]
}

/// Install the built-in extensions plus `extensions`.
///
/// Returns `true` if this call populated the registry and `false` if it was
/// already initialized, in which case `extensions` are dropped.
pub fn install_extensions(extensions: impl IntoIterator<Item = Extension>) -> bool {
    let mut installed = false;
    REGISTRY.get_or_init(|| {
        installed = true;
        let registry: HashMap<String, Extension> = builtin_extensions()
            .into_iter()
            .chain(extensions)
            .map(|ext| (ext.name.clone(), ext))
            .collect();
        debug!(count = registry.len(), "installed validation extensions");
        registry
    });
    installed
}

/// Make sure the registry is initialized, installing only the built-ins if needed.
pub fn ensure_initialized() {
    install_extensions(std::iter::empty());
}

/// Look up an installed extension by name.
#[must_use]
pub fn extension(name: &str) -> Option<&'static Extension> {
    ensure_initialized();
    REGISTRY.get().and_then(|registry| registry.get(name))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_should_resolve_builtin_extensions() {
        let email = extension("email").expect("email extension");
        assert!(email.check(&json!("john@example.com")));
        assert!(!email.check(&json!("john@")));
        assert!(!email.check(&json!(42)));

        let uuid = extension("uuid").expect("uuid extension");
        assert!(uuid.check(&json!("461b4f73-8aed-4fcd-bdc3-7da9711e2d1d")));
        assert!(!uuid.check(&json!("461b4f73")));

        let phone = extension("phone").expect("phone extension");
        assert!(phone.check(&json!("+886227935578")));
        assert!(!phone.check(&json!("02-2793-5578")));
    }

    #[test]
    fn test_should_ignore_repeated_installation() {
        ensure_initialized();
        let installed = install_extensions([Extension::new("late", "late", |_| true)]);
        assert!(!installed);
        assert!(extension("late").is_none());
    }

    #[test]
    fn test_should_return_none_for_unknown_extension() {
        assert!(extension("does-not-exist").is_none());
    }

    #[test]
    fn test_should_hide_closure_in_debug_output() {
        let ext = Extension::new("even", "an even-length string", |s| s.len() % 2 == 0);
        let rendered = format!("{ext:?}");
        assert!(rendered.contains("even"));
        assert!(ext.check(&json!("ab")));
        assert!(!ext.check(&json!("abc")));
    }
}
