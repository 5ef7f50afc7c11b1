//! Explicit AWS credentials for the object-storage driver.
//!
//! Credential acquisition (profiles, IMDS, SSO) is out of scope; callers
//! obtain credentials however they like and inject them here.

/// An AWS credential triple plus region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Access key id.
    pub aws_access_key_id: String,
    /// Secret access key.
    pub aws_secret_access_key: String,
    /// Session token for temporary credentials.
    pub aws_session_token: Option<String>,
}

impl Credentials {
    /// Build a credential set from a static key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            aws_access_key_id: access_key_id.into(),
            aws_secret_access_key: secret_access_key.into(),
            aws_session_token: None,
        }
    }

    /// Attach a session token.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.aws_session_token = Some(token.into());
        self
    }
}
