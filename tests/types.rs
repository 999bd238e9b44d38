// ABOUTME: Integration tests for type-safe identifiers and validated types.
// ABOUTME: Tests parsing, validation, and type safety properties.

use proptest::prelude::*;
use skiff::types::*;
use std::collections::BTreeMap;

mod image_ref_tests {
    use super::*;

    #[test]
    fn parse_simple_name() {
        let img = ImageRef::parse("node").unwrap();
        assert_eq!(img.name(), "node");
        assert_eq!(img.tag(), Some("latest"));
        assert!(img.registry().is_none());
        assert!(img.digest().is_none());
    }

    #[test]
    fn parse_deployment_tag() {
        let img = ImageRef::parse("skiff-0b6f1c2e:latest").unwrap();
        assert_eq!(img.name(), "skiff-0b6f1c2e");
        assert_eq!(img.tag(), Some("latest"));
    }

    #[test]
    fn parse_registry_with_port() {
        let img = ImageRef::parse("localhost:5000/team/app:v2").unwrap();
        assert_eq!(img.registry(), Some("localhost:5000"));
        assert_eq!(img.name(), "team/app");
        assert_eq!(img.tag(), Some("v2"));
        assert_eq!(img.repository(), "localhost:5000/team/app");
    }

    #[test]
    fn parse_with_digest() {
        let img = ImageRef::parse("node@sha256:abc123").unwrap();
        assert_eq!(img.digest(), Some("sha256:abc123"));
        assert!(img.tag().is_none());
    }

    #[test]
    fn parse_empty_returns_error() {
        assert!(ImageRef::parse("").is_err());
    }

    #[test]
    fn parse_uppercase_returns_error() {
        assert!(ImageRef::parse("Skiff-App:latest").is_err());
    }

    #[test]
    fn display_formats_correctly() {
        let img = ImageRef::parse("ghcr.io/org/repo:v1").unwrap();
        assert_eq!(img.to_string(), "ghcr.io/org/repo:v1");
    }
}

mod repo_url_tests {
    use super::*;

    #[test]
    fn accepts_common_forms() {
        for url in [
            "https://github.com/a/b",
            "https://github.com/a/b.git",
            "http://git.internal:8080/team/app",
            "ssh://git@github.com/a/b.git",
            "git://example.com/a/b",
            "git@github.com:a/b.git",
        ] {
            assert!(RepoUrl::parse(url).is_ok(), "{url} should parse");
        }
    }

    #[test]
    fn not_a_url_is_rejected() {
        assert!(matches!(
            RepoUrl::parse("not-a-url"),
            Err(ValidationError::InvalidRepoUrl { .. })
        ));
    }

    #[test]
    fn embedded_whitespace_is_rejected() {
        assert!(RepoUrl::parse("https://github.com/a/b c").is_err());
    }

    #[test]
    fn serde_validates_on_the_way_in() {
        let ok: RepoUrl = serde_json::from_str("\"https://github.com/a/b\"").unwrap();
        assert_eq!(ok.as_str(), "https://github.com/a/b");
        assert!(serde_json::from_str::<RepoUrl>("\"not-a-url\"").is_err());
    }
}

mod branch_tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["main", "feature/login", "release-1.2", "v2_hotfix"] {
            assert!(BranchName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn empty_returns_error() {
        assert_eq!(BranchName::new(""), Err(ValidationError::EmptyBranch));
    }

    #[test]
    fn option_like_name_returns_error() {
        assert!(BranchName::new("--upload-pack=x").is_err());
    }

    #[test]
    fn forbidden_sequences_return_error() {
        for name in ["a..b", "a//b", "a@{1}", "topic.lock", "ends.", "/lead", "trail/"] {
            assert!(BranchName::new(name).is_err(), "{name} should be invalid");
        }
    }

    #[test]
    fn forbidden_characters_return_error() {
        for name in ["a b", "a~b", "a^b", "a:b", "a?b", "a*b", "a[b", "a\\b"] {
            assert!(BranchName::new(name).is_err(), "{name} should be invalid");
        }
    }
}

mod env_tests {
    use super::*;

    #[test]
    fn valid_keys() {
        for key in ["PORT", "_PRIVATE", "node_env", "A1"] {
            assert!(validate_env_key(key).is_ok(), "{key} should be valid");
        }
    }

    #[test]
    fn invalid_keys() {
        assert_eq!(validate_env_key(""), Err(ValidationError::EmptyEnvKey));
        for key in ["1PORT", "MY-VAR", "A B", "A=B"] {
            assert!(validate_env_key(key).is_err(), "{key} should be invalid");
        }
    }

    #[test]
    fn validate_env_checks_every_key() {
        let env = BTreeMap::from([
            ("PORT".to_string(), "8080".to_string()),
            ("BAD-KEY".to_string(), "x".to_string()),
        ]);
        assert_eq!(
            validate_env(&env),
            Err(ValidationError::InvalidEnvKey("BAD-KEY".to_string()))
        );
    }

    #[test]
    fn parse_pair_keeps_equals_in_value() {
        assert_eq!(
            parse_env_pair("DATABASE_URL=postgres://u:p@h/db?x=1").unwrap(),
            (
                "DATABASE_URL".to_string(),
                "postgres://u:p@h/db?x=1".to_string()
            )
        );
    }

    #[test]
    fn parse_pair_requires_equals() {
        assert!(parse_env_pair("PORT").is_err());
    }
}

mod id_tests {
    use super::*;

    #[test]
    fn container_id_stores_value() {
        let id = ContainerId::new("abc123".to_string());
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn short_is_bounded_by_length() {
        let id = ContainerId::new("abc");
        assert_eq!(id.short(12), "abc");
        let id = ContainerId::new("0123456789abcdef");
        assert_eq!(id.short(12), "0123456789ab");
    }

    #[test]
    fn generated_deployment_ids_are_unique() {
        let a = DeploymentId::generate();
        let b = DeploymentId::generate();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = OwnerId::new("alice");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"alice\"");
    }
}

proptest! {
    #[test]
    fn valid_env_keys_are_accepted(key in "[A-Za-z_][A-Za-z0-9_]{0,30}") {
        prop_assert!(validate_env_key(&key).is_ok());
    }

    #[test]
    fn keys_with_leading_digit_are_rejected(key in "[0-9][A-Za-z0-9_]{0,30}") {
        prop_assert!(validate_env_key(&key).is_err());
    }

    #[test]
    fn simple_branch_names_are_accepted(name in "[a-z][a-z0-9_-]{0,20}(/[a-z0-9][a-z0-9_-]{0,20})?") {
        prop_assert!(BranchName::new(&name).is_ok());
    }

    #[test]
    fn github_https_urls_are_accepted(org in "[a-z][a-z0-9-]{0,15}", repo in "[a-z][a-z0-9_.-]{0,15}") {
        let url = format!("https://github.com/{org}/{repo}");
        prop_assert!(RepoUrl::parse(&url).is_ok());
    }
}
