//! Operator credentials
//!
//! The password is read from the terminal without echo and kept in a buffer
//! that is zeroed when dropped. [`Credentials`] is consumed by
//! [`FlowQuerySession::authenticate`](crate::session::FlowQuerySession::authenticate),
//! so the secret does not outlive the authentication call.

use crate::error::{Error, Result};
use zeroize::Zeroizing;

/// Username and password for the analytics service
pub struct Credentials {
    username: String,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Create credentials from an already-obtained secret
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Prompt for the password of `username` on the controlling terminal
    pub fn prompt(username: impl Into<String>) -> Result<Self> {
        let username = username.into();
        let password = prompt_password(&format!("Password for {username}: "))?;
        Ok(Self { username, password })
    }

    /// The account name
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Read a secret from the terminal without echoing it
pub fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    rpassword::prompt_password(prompt)
        .map(Zeroizing::new)
        .map_err(Error::Prompt)
}
