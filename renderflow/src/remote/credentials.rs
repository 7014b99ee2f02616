//! API credential resolution.

use crate::config::RenderflowConfig;
use crate::errors::RenderError;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// An API key. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the raw key for the wire.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chars: Vec<char> = self.0.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        write!(f, "Credential(***{tail})")
    }
}

/// Resolves the credential used for remote calls.
pub trait CredentialProvider: Send + Sync {
    /// Returns the current credential or [`RenderError::MissingCredential`].
    fn resolve(&self) -> Result<Credential, RenderError>;

    /// Drops the current selection so the user is asked to pick again.
    fn invalidate(&self) {}
}

/// A provider holding one explicitly selected key.
#[derive(Debug, Default)]
pub struct StaticCredentialProvider {
    key: RwLock<Option<Credential>>,
}

impl StaticCredentialProvider {
    /// Creates a provider with a selected key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: RwLock::new(Some(Credential::new(key))),
        }
    }

    /// Creates a provider with no key selected.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Selects a new key.
    pub fn select(&self, key: impl Into<String>) {
        *self.key.write() = Some(Credential::new(key));
    }

    /// Returns true if a key is selected.
    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.key.read().is_some()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn resolve(&self) -> Result<Credential, RenderError> {
        self.key
            .read()
            .clone()
            .ok_or_else(|| RenderError::MissingCredential("no API key selected".to_string()))
    }

    fn invalidate(&self) {
        tracing::warn!("Clearing selected API key");
        *self.key.write() = None;
    }
}

/// A provider reading the key from environment variables, in order.
#[derive(Debug)]
pub struct EnvCredentialProvider {
    vars: Vec<String>,
    invalidated: AtomicBool,
}

impl EnvCredentialProvider {
    /// Creates a provider reading the given variables in order.
    #[must_use]
    pub fn new(vars: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
            invalidated: AtomicBool::new(false),
        }
    }

    /// Creates a provider from the configured variable names.
    #[must_use]
    pub fn from_config(config: &RenderflowConfig) -> Self {
        Self::new(config.credential_env_vars.iter().cloned())
    }

    /// Accepts the environment key again after an invalidation.
    pub fn reselect(&self) {
        self.invalidated.store(false, Ordering::SeqCst);
    }

    fn resolve_with<F>(&self, lookup: F) -> Result<Credential, RenderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.invalidated.load(Ordering::SeqCst) {
            return Err(RenderError::MissingCredential(
                "the configured API key was invalidated; select a key again".to_string(),
            ));
        }

        self.vars
            .iter()
            .find_map(|var| lookup(var).filter(|value| !value.trim().is_empty()))
            .map(Credential::new)
            .ok_or_else(|| {
                RenderError::MissingCredential(format!(
                    "none of [{}] is set",
                    self.vars.join(", ")
                ))
            })
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn resolve(&self) -> Result<Credential, RenderError> {
        self.resolve_with(|var| std::env::var(var).ok())
    }

    fn invalidate(&self) {
        tracing::warn!(vars = ?self.vars, "Invalidating environment API key");
        self.invalidated.store(true, Ordering::SeqCst);
    }
}
