//! Test factories for generating test data
//!
//! Factories create randomized test data, useful when each test needs its
//! own unique users or key codes.

use std::sync::atomic::{AtomicU64, Ordering};

use fake::faker::internet::en::Username;
use fake::Fake;
use rand::Rng;

use keygate::models::{Actor, RoleRef};

/// Factory for creating unique actors
pub struct ActorFactory {
    counter: AtomicU64,
}

impl Default for ActorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorFactory {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Create a unique actor with a snowflake-like id
    pub fn create(&self) -> TestActorBuilder {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let id = 500_000_000_000_000_000u64 + n * 1_000 + rand::thread_rng().gen_range(0..1_000);
        TestActorBuilder {
            id: id.to_string(),
            display_name: Username().fake(),
            roles: vec![],
        }
    }
}

/// Builder for test actors
pub struct TestActorBuilder {
    pub id: String,
    pub display_name: String,
    pub roles: Vec<RoleRef>,
}

impl TestActorBuilder {
    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = name.to_string();
        self
    }

    pub fn with_role(mut self, id: &str, name: &str) -> Self {
        self.roles.push(RoleRef {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn build(self) -> Actor {
        Actor {
            id: self.id,
            display_name: self.display_name,
            roles: self.roles,
        }
    }
}

/// Unique key code for a manager-created key
pub fn unique_key_code(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(100_000..999_999);
    format!("{}-{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_creates_unique_actors() {
        let factory = ActorFactory::new();
        let a = factory.create().build();
        let b = factory.create().with_role("1", "Manager").build();
        assert_ne!(a.id, b.id);
        assert!(b.has_role_named("Manager"));
    }
}
