// ABOUTME: Deterministic names derived from deployment and owner ids.
// ABOUTME: Workspace path, image tag, container name, url, and resource labels.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::types::{ContainerId, DeploymentId, OwnerId};

pub const LABEL_MANAGED: &str = "skiff.managed";
pub const LABEL_DEPLOYMENT: &str = "skiff.deployment";
pub const LABEL_OWNER: &str = "skiff.owner";

/// Characters of the container reference used in the deployment url.
pub const URL_PREFIX_LEN: usize = 12;

const PREFIX: &str = "skiff";

pub fn workspace_dir(repos_root: &Path, id: &DeploymentId) -> PathBuf {
    repos_root.join(id.as_str())
}

/// `skiff-<id>:latest`. Rebuilds reuse the tag.
pub fn image_tag(id: &DeploymentId) -> String {
    format!("{}-{}:latest", PREFIX, id.as_str().to_ascii_lowercase())
}

/// `skiff-<owner>-<id>`, with the owner reduced to characters the runtime
/// accepts in names.
pub fn container_name(owner: &OwnerId, id: &DeploymentId) -> String {
    format!("{}-{}-{}", PREFIX, sanitize(owner.as_str()), id)
}

pub fn deployment_url(container: &ContainerId, domain: &str) -> String {
    format!("{}.{}", container.short(URL_PREFIX_LEN), domain)
}

pub fn labels(id: &DeploymentId, owner: &OwnerId) -> HashMap<String, String> {
    HashMap::from([
        (LABEL_MANAGED.to_string(), "true".to_string()),
        (LABEL_DEPLOYMENT.to_string(), id.to_string()),
        (LABEL_OWNER.to_string(), owner.to_string()),
    ])
}

fn sanitize(owner: &str) -> String {
    let cleaned: String = owner
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn container_name_sanitizes_owner() {
        let name = container_name(&OwnerId::new("Alice Smith@corp"), &DeploymentId::new("abc"));
        assert_eq!(name, "skiff-alice-smith-corp-abc");
    }

    #[test]
    fn url_uses_twelve_char_prefix() {
        let id = ContainerId::new("0123456789abcdef0123");
        assert_eq!(deployment_url(&id, "apps.example.com"), "0123456789ab.apps.example.com");
    }

    #[test]
    fn image_tag_is_lowercase() {
        assert_eq!(image_tag(&DeploymentId::new("ABC")), "skiff-abc:latest");
    }

    #[test]
    fn workspace_is_named_by_id() {
        let dir = workspace_dir(Path::new("/srv/repos"), &DeploymentId::new("d1"));
        assert_eq!(dir, PathBuf::from("/srv/repos/d1"));
    }

    proptest! {
        #[test]
        fn container_names_use_runtime_safe_characters(owner in ".{0,40}") {
            let id = DeploymentId::generate();
            let name = container_name(&OwnerId::new(owner), &id);
            let allowed = |c: char| {
                c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-')
            };
            prop_assert!(name.chars().all(allowed));
        }

        #[test]
        fn image_tags_parse_as_image_refs(_seed in 0u8..8) {
            let tag = image_tag(&DeploymentId::generate());
            prop_assert!(crate::types::ImageRef::parse(&tag).is_ok());
        }
    }
}
