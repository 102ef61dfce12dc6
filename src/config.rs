//! Inputs of the publishing step, resolved once from the environment

use crate::{auth::Credential, error::*};
use chrono::NaiveDateTime;
use std::collections::HashMap;

pub const INPUT_NAME: &str = "INPUT_NAME";
pub const INPUT_USERNAME: &str = "INPUT_USERNAME";
pub const INPUT_PASSWORD: &str = "INPUT_PASSWORD";
pub const INPUT_REGISTRY: &str = "INPUT_REGISTRY";
pub const INPUT_CACHE: &str = "INPUT_CACHE";
pub const INPUT_SNAPSHOT: &str = "INPUT_SNAPSHOT";
pub const INPUT_DOCKERFILE: &str = "INPUT_DOCKERFILE";
pub const GITHUB_REF: &str = "GITHUB_REF";
pub const GITHUB_SHA: &str = "GITHUB_SHA";

/// Registry used when `INPUT_REGISTRY` is not set
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Source of configuration values
///
/// An empty value must be treated in the same way as an absent one.
pub trait ConfigProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProvider;

impl ConfigProvider for EnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.is_empty())
    }
}

impl ConfigProvider for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key)
            .filter(|value| !value.is_empty())
            .cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    pub image_name: String,
    pub username: String,
    pub password: String,
    pub registry: String,
    pub cache: bool,
    pub snapshot: bool,
    pub dockerfile: Option<String>,
    pub source_ref: String,
    pub commit_sha: String,
    pub build_time: NaiveDateTime,
}

impl PublishConfig {
    /// Read all inputs from `provider`.
    ///
    /// Mandatory inputs are checked in the order name, username, password,
    /// and only the first missing one is reported.
    pub fn resolve(provider: &impl ConfigProvider, build_time: NaiveDateTime) -> Result<Self> {
        let image_name = provider
            .get(INPUT_NAME)
            .ok_or(Error::MissingInput("name"))?;
        let username = provider
            .get(INPUT_USERNAME)
            .ok_or(Error::MissingInput("username"))?;
        let password = provider
            .get(INPUT_PASSWORD)
            .ok_or(Error::MissingInput("password"))?;
        let source_ref = provider
            .get(GITHUB_REF)
            .ok_or(Error::MissingEnv(GITHUB_REF))?;
        Ok(PublishConfig {
            image_name,
            username,
            password,
            registry: provider
                .get(INPUT_REGISTRY)
                .unwrap_or_else(|| DEFAULT_REGISTRY.to_string()),
            cache: provider.get(INPUT_CACHE).is_some(),
            snapshot: provider.get(INPUT_SNAPSHOT).is_some(),
            dockerfile: provider.get(INPUT_DOCKERFILE),
            source_ref,
            commit_sha: provider.get(GITHUB_SHA).unwrap_or_default(),
            build_time,
        })
    }

    pub fn credential(&self) -> Credential {
        Credential {
            username: self.username.clone(),
            password: self.password.clone(),
            server_address: self.registry.clone(),
        }
    }
}
