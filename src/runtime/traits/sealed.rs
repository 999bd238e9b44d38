// ABOUTME: Sealed trait pattern for runtime traits.
// ABOUTME: Prevents external implementations, allowing non-breaking evolution.

/// Sealed trait to prevent external implementations.
///
/// Only the crate's own runtimes (bollard-backed and the in-memory mock)
/// can implement the runtime traits, so methods can be added without a
/// semver break.
pub trait Sealed {}
