//! docker-publish
//! ===============
//!
//! Build a container image from a CI checkout, and publish it to a registry.
//!
//! Inputs are read from the environment (see [config]), the image is tagged
//! by the git ref and optionally by a snapshot tag (see [tag]), and then built
//! and pushed through a container [engine::Engine].

pub mod auth;
pub mod config;
pub mod context;
pub mod docker;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod tag;

pub use config::PublishConfig;
pub use error::{Error, Result};
pub use pipeline::publish;
pub use tag::TagPlan;
