//! Shared test utilities for domain testing.
//!
//! - [`TestDatabase`]: PostgreSQL container with migrations applied
//!   (feature: `postgres`, the default)
//! - [`TestDataBuilder`]: deterministic test data generation
//! - [`NullCluster`]: no-op [`kubernetes::ClusterProvider`] for service tests
//! - [`NullVirt`]: canned-answer [`proxmox::VirtualizationProvider`]

mod cluster;
mod virt;

#[cfg(feature = "postgres")]
mod postgres;

pub use cluster::NullCluster;
pub use virt::NullVirt;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;

use uuid::Uuid;

/// Deterministic test data derived from the test name.
///
/// Seeding from the test name keeps parallel tests collision-free while
/// making failures reproducible.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn from_test_name(name: &str) -> Self {
        let seed = name
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
                (acc ^ u64::from(b)).wrapping_mul(0x100_0000_01b3)
            });
        Self { seed }
    }

    /// Stable UUID for the "user" of this test.
    pub fn user_id(&self) -> Uuid {
        Uuid::from_u64_pair(self.seed, 0x75736572)
    }

    /// Stable UUID for the "organization" of this test.
    pub fn org_id(&self) -> Uuid {
        Uuid::from_u64_pair(self.seed, 0x6f7267)
    }

    /// Deterministic unique name: `<kind>-<suffix>-<seed fragment>`.
    pub fn name(&self, kind: &str, suffix: &str) -> String {
        format!("{}-{}-{:08x}", kind, suffix, self.seed as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_is_deterministic() {
        let a = TestDataBuilder::from_test_name("some_test");
        let b = TestDataBuilder::from_test_name("some_test");
        assert_eq!(a.user_id(), b.user_id());
        assert_eq!(a.name("ws", "x"), b.name("ws", "x"));
    }

    #[test]
    fn test_different_tests_get_different_ids() {
        let a = TestDataBuilder::from_test_name("test_a");
        let b = TestDataBuilder::from_test_name("test_b");
        assert_ne!(a.user_id(), b.user_id());
    }
}
