//! Sources for the bearer secret sent with each call.
//!
//! The client asks its provider once per logical call, before any request is
//! sent. Implement [`CredentialProvider`] (or pass a closure) to plug in a
//! secret store or key rotation.

use std::fmt;

/// Error returned by a [`CredentialProvider`].
pub type CredentialError = Box<dyn std::error::Error + Send + Sync>;

/// Supplies the API key for a call.
pub trait CredentialProvider: Send + Sync {
    fn api_key(&self) -> Result<String, CredentialError>;
}

impl<F> CredentialProvider for F
where
    F: Fn() -> Result<String, CredentialError> + Send + Sync,
{
    fn api_key(&self) -> Result<String, CredentialError> {
        self()
    }
}

/// A fixed API key.
#[derive(Clone)]
pub struct StaticKey(String);

impl StaticKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Debug for StaticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticKey(<redacted>)")
    }
}

impl CredentialProvider for StaticKey {
    fn api_key(&self) -> Result<String, CredentialError> {
        Ok(self.0.clone())
    }
}

/// Reads the API key from an environment variable on every call.
///
/// The variable is looked up lazily, so a key exported after the client was
/// built is still picked up.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnvKey {
    var: String,
}

impl EnvKey {
    /// Name of the variable read by [`EnvKey::default`].
    pub const DEFAULT_VAR: &'static str = "OPENAI_API_KEY";

    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvKey {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VAR)
    }
}

impl CredentialProvider for EnvKey {
    fn api_key(&self) -> Result<String, CredentialError> {
        let value = std::env::var(&self.var)
            .map_err(|_| format!("missing {} environment variable", self.var))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("{} is set but empty", self.var).into());
        }
        Ok(value.to_owned())
    }
}
