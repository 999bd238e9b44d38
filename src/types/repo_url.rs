// ABOUTME: Repository reference parsing and validation.
// ABOUTME: Accepts URL forms git understands plus scp-like `user@host:path`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use url::Url;

use super::ValidationError;

const SCHEMES: &[&str] = &["https", "http", "ssh", "git", "file"];
const LOCAL_PREFIX: &str = "file://";

/// A validated repository location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoUrl(String);

impl RepoUrl {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ValidationError::EmptyRepoUrl);
        }

        let invalid = |reason: &str| ValidationError::InvalidRepoUrl {
            url: input.to_string(),
            reason: reason.to_string(),
        };

        // A leading hyphen would be read by git as an option
        if input.starts_with('-') {
            return Err(invalid("cannot start with '-'"));
        }
        if let Some(c) = input.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid(&format!("contains {c:?}")));
        }

        if !input.contains("://") {
            return Self::parse_scp_like(input).ok_or_else(|| invalid("not a url"));
        }

        let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
        if !SCHEMES.contains(&url.scheme()) {
            return Err(ValidationError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.scheme() != "file" && url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }
        if url.path().trim_matches('/').is_empty() {
            return Err(invalid("missing repository path"));
        }

        Ok(Self(input.to_string()))
    }

    /// `git@github.com:org/repo.git` style references.
    fn parse_scp_like(input: &str) -> Option<Self> {
        let (user_host, path) = input.split_once(':')?;
        let host = match user_host.split_once('@') {
            Some((user, host)) if !user.is_empty() => host,
            Some(_) => return None,
            None => user_host,
        };

        let host_ok = !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
        // A host without a dot or user is far more likely a typo than a server
        let qualified = host.contains('.') || user_host.contains('@') || host == "localhost";

        if host_ok && qualified && !path.is_empty() && !path.starts_with('/') {
            Some(Self(input.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the repository lives on this host's filesystem.
    pub fn is_local(&self) -> bool {
        self.0
            .get(..LOCAL_PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(LOCAL_PREFIX))
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RepoUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RepoUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RepoUrl::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_url() {
        let url = RepoUrl::parse("https://github.com/a/b").unwrap();
        assert_eq!(url.as_str(), "https://github.com/a/b");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let url = RepoUrl::parse("  https://github.com/a/b.git\n").unwrap();
        assert_eq!(url.as_str(), "https://github.com/a/b.git");
    }

    #[test]
    fn accepts_scp_like_reference() {
        assert!(RepoUrl::parse("git@github.com:org/repo.git").is_ok());
    }

    #[test]
    fn accepts_file_url() {
        let url = RepoUrl::parse("file:///srv/git/repo.git").unwrap();
        assert!(url.is_local());
    }

    #[test]
    fn only_file_urls_are_local() {
        assert!(RepoUrl::parse("FILE:///srv/git/repo.git").unwrap().is_local());
        assert!(!RepoUrl::parse("https://github.com/a/b").unwrap().is_local());
        assert!(!RepoUrl::parse("git@github.com:a/b.git").unwrap().is_local());
    }

    #[test]
    fn rejects_bare_word() {
        assert!(matches!(
            RepoUrl::parse("not-a-url"),
            Err(ValidationError::InvalidRepoUrl { .. })
        ));
    }

    #[test]
    fn rejects_option_injection() {
        assert!(RepoUrl::parse("--upload-pack=evil").is_err());
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(matches!(
            RepoUrl::parse("ftp://example.com/repo"),
            Err(ValidationError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn rejects_url_without_path() {
        assert!(RepoUrl::parse("https://github.com/").is_err());
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(RepoUrl::parse("   "), Err(ValidationError::EmptyRepoUrl));
    }
}
