// Anti-forgery token sources.
//
// The request client attaches a token to every mutating request but never
// mints one. Whoever owns the session (page bootstrap, login flow, config)
// injects a provider.

use secrecy::{ExposeSecret, SecretString};

/// Supplies the anti-forgery token for mutating requests.
pub trait TokenProvider: Send + Sync {
    /// The current token, or `None` when no session token is available.
    fn token(&self) -> Option<SecretString>;
}

/// Provider for deployments without mutating requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenProvider for NoToken {
    fn token(&self) -> Option<SecretString> {
        None
    }
}

/// A fixed token, typically resolved from configuration at startup.
#[derive(Debug, Clone)]
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: impl Into<SecretString>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<SecretString> {
        if self.0.expose_secret().is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<SecretString> + Send + Sync,
{
    fn token(&self) -> Option<SecretString> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_static_token_is_treated_as_absent() {
        let provider = StaticToken::new(String::new());
        assert!(provider.token().is_none());
    }

    #[test]
    fn closures_are_providers() {
        let provider = || Some(SecretString::from("rotating".to_string()));
        let token = provider.token().map(|t| t.expose_secret().to_owned());
        assert_eq!(token.as_deref(), Some("rotating"));
    }
}
