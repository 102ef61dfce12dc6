//! Registry login and the authorization token used for pull and push

use crate::{engine::Engine, error::*};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Basic authentication info for a registry
///
/// Serialized in the form the Docker engine accepts as auth config.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
    #[serde(rename = "serveraddress")]
    pub server_address: String,
}

// Never print password into logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"***")
            .field("server_address", &self.server_address)
            .finish()
    }
}

impl Credential {
    /// Encode as the value of `X-Registry-Auth` header
    pub fn auth_token(&self) -> Result<AuthToken> {
        let json = serde_json::to_vec(self)?;
        Ok(AuthToken(base64::encode_config(json, base64::URL_SAFE)))
    }
}

/// Opaque authorization string passed to every pull and push
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Response of `POST /auth`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub identity_token: String,
}

/// Login to the registry, and returns the token for following requests.
///
/// Errors of the engine are returned as is, and never retried.
pub fn login(engine: &mut impl Engine, credential: &Credential) -> Result<AuthToken> {
    let status = engine.registry_login(credential)?;
    log::info!(
        "Login to {} as {}: {}",
        credential.server_address,
        credential.username,
        status.status
    );
    credential.auth_token()
}
