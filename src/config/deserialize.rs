// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Validates image references and branch names while keeping their string form.

use serde::Deserialize;

use crate::types::{BranchName, ImageRef};

pub fn deserialize_image_ref<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ImageRef::parse(&s)
        .map(|image| image.to_string())
        .map_err(serde::de::Error::custom)
}

pub fn deserialize_branch<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BranchName::new(&s)
        .map(|branch| branch.as_str().to_string())
        .map_err(serde::de::Error::custom)
}
