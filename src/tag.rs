//! Derive image tags from the source-control reference

use crate::error::*;
use chrono::NaiveDateTime;

/// Reference of the default branch, published as `latest`
pub const DEFAULT_BRANCH_REF: &str = "refs/heads/master";
/// Every git tag is published as `latest`
pub const TAG_REF_PREFIX: &str = "refs/tags";
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

pub const LATEST: &str = "latest";

/// Format of the timestamp part of a snapshot tag, e.g. `20200102030405`
pub const SNAPSHOT_TIME_FORMAT: &str = "%Y%m%d%H%M%S";
/// Length of the commit hash part of a snapshot tag
pub const SHORT_SHA_LEN: usize = 6;

/// Translate a git ref into an image tag
///
/// ```
/// use docker_publish::tag::ref_to_tag;
///
/// assert_eq!(ref_to_tag("refs/heads/master"), "latest");
/// assert_eq!(ref_to_tag("refs/tags/v1.0.0"), "latest");
/// assert_eq!(ref_to_tag("refs/heads/feature-x"), "feature-x");
/// ```
///
/// Branch names are not sanitized, a name which is not a valid tag passes through as is.
pub fn ref_to_tag(git_ref: &str) -> &str {
    if git_ref == DEFAULT_BRANCH_REF || git_ref.starts_with(TAG_REF_PREFIX) {
        return LATEST;
    }
    git_ref.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(git_ref)
}

/// Tag for point-in-time traceability, build time followed by a short commit hash
pub fn snapshot_tag(build_time: &NaiveDateTime, commit_sha: &str) -> Result<String> {
    let short_sha = commit_sha
        .char_indices()
        .nth(SHORT_SHA_LEN)
        .map(|(end, _)| &commit_sha[..end])
        .unwrap_or(commit_sha);
    if short_sha.chars().count() < SHORT_SHA_LEN {
        return Err(Error::ShortCommitSha(commit_sha.to_string()));
    }
    Ok(format!(
        "{}{}",
        build_time.format(SNAPSHOT_TIME_FORMAT),
        short_sha
    ))
}

/// Image name and ordered tags to be built and pushed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPlan {
    /// `<registry>/<image name>` without tag
    pub canonical_name: String,
    /// The tag from git ref comes first, and snapshot tag follows if enabled
    pub tags: Vec<String>,
}

impl TagPlan {
    pub fn new(
        registry: &str,
        image_name: &str,
        git_ref: &str,
        build_time: &NaiveDateTime,
        commit_sha: &str,
        snapshot: bool,
    ) -> Result<Self> {
        let mut tags = vec![ref_to_tag(git_ref).to_string()];
        if snapshot {
            tags.push(snapshot_tag(build_time, commit_sha)?);
        }
        Ok(TagPlan {
            canonical_name: format!("{}/{}", registry, image_name),
            tags,
        })
    }

    /// Fully qualified `<canonical name>:<tag>` in plan order
    pub fn references(&self) -> Vec<String> {
        self.tags
            .iter()
            .map(|tag| format!("{}:{}", self.canonical_name, tag))
            .collect()
    }

    /// Reference of the first tag, used as the cache source
    pub fn primary(&self) -> String {
        format!("{}:{}", self.canonical_name, self.tags[0])
    }
}
