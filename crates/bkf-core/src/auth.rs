//! Credentials and the authorization attached to every request.
//!
//! `Authorization` is derived once at startup and handed to the transport by
//! value; nothing mutates it afterwards.

use std::fmt;

/// Username and API token as supplied by the user.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub api_token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_token: api_token.into(),
        }
    }

    /// Combine into the opaque value the transport sends as HTTP Basic auth.
    pub fn authorization(&self) -> Authorization {
        Authorization {
            user: self.username.clone(),
            secret: self.api_token.clone(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// HTTP Basic authorization for the export service.
#[derive(Clone, PartialEq, Eq)]
pub struct Authorization {
    user: String,
    secret: String,
}

impl Authorization {
    /// Configure basic auth on a curl handle. libcurl builds the header itself.
    pub(crate) fn apply(&self, easy: &mut curl::easy::Easy) -> Result<(), curl::Error> {
        let mut auth = curl::easy::Auth::new();
        auth.basic(true);
        easy.http_auth(&auth)?;
        easy.username(&self.user)?;
        easy.password(&self.secret)?;
        Ok(())
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Authorization(Basic {}:<redacted>)", self.user)
    }
}
