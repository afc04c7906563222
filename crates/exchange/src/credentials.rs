//! Credential resolution
//!
//! Credentials are looked up through an explicit, ordered list of resolvers.
//! The first resolver that yields a valid value wins; later ones are never
//! consulted. Exchanges declare their default order via
//! [`CredentialHelper::default_resolvers`].

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Credential resolution errors
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No resolver produced a usable value
    #[error("No credentials found (tried: {tried})")]
    Missing {
        /// Human-readable list of the sources that were consulted
        tried: String,
    },
}

/// One place credentials may come from
#[cfg_attr(test, mockall::automock)]
pub trait CredentialResolver: Send + Sync {
    /// Description of the source, for error messages and logs
    fn source(&self) -> String;

    /// Raw credential value, if this source has one
    fn resolve(&self) -> Option<String>;
}

/// Reads credentials from an environment variable
#[derive(Debug, Clone)]
pub struct EnvVarResolver {
    var: String,
}

impl EnvVarResolver {
    /// Create a resolver for the given variable name
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialResolver for EnvVarResolver {
    fn source(&self) -> String {
        format!("${}", self.var)
    }

    fn resolve(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }
}

/// Reads credentials from a local file
///
/// A leading `~/` is expanded to `$HOME`. A missing file resolves to nothing.
#[derive(Debug, Clone)]
pub struct FileResolver {
    path: PathBuf,
}

impl FileResolver {
    /// Create a resolver for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path after home-directory expansion
    pub fn expanded_path(&self) -> PathBuf {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        expand_home(&self.path, home.as_deref())
    }
}

impl CredentialResolver for FileResolver {
    fn source(&self) -> String {
        self.path.display().to_string()
    }

    fn resolve(&self) -> Option<String> {
        let path = self.expanded_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to read credential file: {}", e);
                None
            }
        }
    }
}

fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Credentials an exchange knows how to build and validate
pub trait CredentialHelper: Sized + Send + Sync {
    /// Build credentials from a raw secret string
    fn from_secret(secret: &str) -> Self;

    /// Whether these credentials are usable
    fn are_valid(&self) -> bool;

    /// Resolvers consulted by [`CredentialHelper::get`], in order
    fn default_resolvers() -> Vec<Box<dyn CredentialResolver>>;

    /// Resolve credentials from the given resolvers, first valid value wins
    fn resolve_with(resolvers: &[Box<dyn CredentialResolver>]) -> Result<Self, CredentialError> {
        for resolver in resolvers {
            let Some(raw) = resolver.resolve() else {
                continue;
            };
            let credentials = Self::from_secret(&raw);
            if credentials.are_valid() {
                tracing::debug!(source = %resolver.source(), "Resolved credentials");
                return Ok(credentials);
            }
        }

        Err(CredentialError::Missing {
            tried: resolvers
                .iter()
                .map(|r| r.source())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Resolve credentials from the default resolvers
    fn get() -> Result<Self, CredentialError> {
        Self::resolve_with(&Self::default_resolvers())
    }
}
