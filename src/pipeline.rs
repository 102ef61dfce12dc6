//! Build an image and publish its tags
//!
//! The pipeline runs strictly forward:
//!
//! ```text
//! Validated -> Authenticated -> [CacheProbed] -> Built -> Pushed(n/N) -> Done
//! ```
//!
//! and stops at the first error, which is returned unchanged.
//! Only a failure of the cache pull is recovered, by building without cache.

use crate::{
    auth::{self, AuthToken},
    config::PublishConfig,
    context,
    engine::{BuildOptions, Engine},
    error::*,
    progress::{relay, relay_lines, BuildLog, StatusLog},
    tag::TagPlan,
};
use std::{fmt, io::Write, path::Path};

/// Stage of the pipeline, used for reporting where it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Authenticate,
    SeedCache,
    Build,
    Push { index: usize, total: usize },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Validate => write!(f, "validate"),
            Stage::Authenticate => write!(f, "authenticate"),
            Stage::SeedCache => write!(f, "seed cache"),
            Stage::Build => write!(f, "build"),
            Stage::Push { index, total } => write!(f, "push ({}/{})", index + 1, total),
        }
    }
}

fn at<T>(stage: Stage, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        log::debug!("Failed at {}: {:?}", stage, e);
    }
    result
}

/// Build options derived from tags, cache pull result, and custom build file
pub fn build_options(
    plan: &TagPlan,
    cache_from: Option<String>,
    dockerfile: Option<String>,
) -> BuildOptions {
    BuildOptions {
        tags: plan.references(),
        cache_from: cache_from.into_iter().collect(),
        dockerfile,
    }
}

/// Pull `primary` to warm the build cache
///
/// Pull progress is relayed line by line without decoding.
/// Returns the reference to be used as cache source, or `None` if the pull fails for any reason.
pub fn seed_cache(
    engine: &mut impl Engine,
    primary: &str,
    token: &AuthToken,
    sink: &mut dyn Write,
) -> Option<String> {
    match engine.image_pull(primary, token) {
        Ok(stream) => {
            relay_lines(stream, sink);
            log::info!("Use {} as cache", primary);
            Some(primary.to_string())
        }
        Err(e) => {
            log::info!("Build without cache, {} is not available: {}", primary, e);
            None
        }
    }
}

/// Build image from `context_dir`, and relay the build log into `sink`
pub fn build(
    engine: &mut impl Engine,
    context_dir: &Path,
    options: &BuildOptions,
    sink: &mut dyn Write,
) -> Result<()> {
    let context = context::pack(context_dir)?;
    let stream = engine.image_build(Box::new(context), options)?;
    relay::<BuildLog>(stream, sink);
    Ok(())
}

/// Push every reference in order. The first failure stops the remaining pushes.
pub fn push_all(
    engine: &mut impl Engine,
    references: &[String],
    token: &AuthToken,
    sink: &mut dyn Write,
) -> Result<()> {
    let total = references.len();
    for (index, reference) in references.iter().enumerate() {
        log::info!("Push {}", reference);
        let stream = at(
            Stage::Push { index, total },
            engine.image_push(reference, token),
        )?;
        relay::<StatusLog>(stream, sink);
    }
    Ok(())
}

/// Run the whole pipeline for a resolved configuration
pub fn publish(
    engine: &mut impl Engine,
    config: &PublishConfig,
    context_dir: &Path,
    sink: &mut dyn Write,
) -> Result<()> {
    let plan = at(
        Stage::Validate,
        TagPlan::new(
            &config.registry,
            &config.image_name,
            &config.source_ref,
            &config.build_time,
            &config.commit_sha,
            config.snapshot,
        ),
    )?;

    let credential = config.credential();
    let token = at(Stage::Authenticate, auth::login(engine, &credential))?;

    let cache_from = if config.cache {
        log::debug!("Enter {}", Stage::SeedCache);
        seed_cache(engine, &plan.primary(), &token, sink)
    } else {
        None
    };

    let options = build_options(&plan, cache_from, config.dockerfile.clone());
    log::info!("Build {}", options.tags.join(", "));
    at(Stage::Build, build(engine, context_dir, &options, sink))?;

    push_all(engine, &options.tags, &token, sink)
}
