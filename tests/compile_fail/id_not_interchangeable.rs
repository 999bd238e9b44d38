// ABOUTME: Compile-fail test verifying DeploymentId and OwnerId are not interchangeable.
// ABOUTME: This test should fail to compile, validating type safety.

use skiff::types::{DeploymentId, OwnerId};

fn takes_deployment_id(_id: DeploymentId) {}

fn main() {
    let owner = OwnerId::new("alice");
    takes_deployment_id(owner); // ERROR: expected DeploymentId, found OwnerId
}
