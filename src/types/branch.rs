// ABOUTME: Git branch name validation.
// ABOUTME: Applies the subset of git-check-ref-format rules that matter for clone.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    pub fn new(value: &str) -> Result<Self, ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::EmptyBranch);
        }

        let invalid = |reason| ValidationError::InvalidBranch {
            name: value.to_string(),
            reason,
        };

        if value.len() > 255 {
            return Err(invalid("exceeds 255 characters"));
        }
        if value.starts_with('-') {
            return Err(invalid("cannot start with a hyphen"));
        }
        if value.starts_with('/') || value.ends_with('/') {
            return Err(invalid("cannot start or end with '/'"));
        }
        if value.ends_with('.') || value.ends_with(".lock") {
            return Err(invalid("cannot end with '.' or '.lock'"));
        }
        if value.contains("..") || value.contains("//") || value.contains("@{") {
            return Err(invalid("contains a forbidden sequence"));
        }

        for c in value.chars() {
            if c.is_whitespace()
                || c.is_control()
                || matches!(c, '~' | '^' | ':' | '?' | '*' | '[' | '\\')
            {
                return Err(invalid("contains a forbidden character"));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for BranchName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BranchName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        BranchName::new(&s).map_err(serde::de::Error::custom)
    }
}
