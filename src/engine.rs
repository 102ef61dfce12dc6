//! Capabilities of the container engine used for publishing

use crate::{
    auth::{AuthToken, Credential, LoginStatus},
    error::*,
};
use std::io::Read;

/// Build file name used when no custom one is configured
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// Response body of a streaming engine call
///
/// Dropping it releases the underlying connection.
pub type LogStream = Box<dyn Read + Send>;

/// Options of a single image build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Fully qualified references, `<registry>/<name>:<tag>`
    pub tags: Vec<String>,
    /// References whose layers can be reused, at most one
    pub cache_from: Vec<String>,
    /// Path of the build file in the build context
    pub dockerfile: Option<String>,
}

impl BuildOptions {
    pub fn dockerfile_path(&self) -> &str {
        self.dockerfile.as_deref().unwrap_or(DEFAULT_DOCKERFILE)
    }
}

/// Container engine, e.g. Docker daemon
///
/// Every call blocks until the engine responds. Streams are returned unread,
/// and it is the caller's responsibility to consume them.
pub trait Engine {
    fn registry_login(&mut self, credential: &Credential) -> Result<LoginStatus>;
    fn image_pull(&mut self, reference: &str, auth: &AuthToken) -> Result<LogStream>;
    fn image_build(
        &mut self,
        context: Box<dyn Read + Send>,
        options: &BuildOptions,
    ) -> Result<LogStream>;
    fn image_push(&mut self, reference: &str, auth: &AuthToken) -> Result<LogStream>;
}
