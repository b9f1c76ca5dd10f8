use uuid::Uuid;

/// Prefix of synthetic local usernames.
pub const SYNTHETIC_USERNAME_PREFIX: &str = "user-";

/// Source of synthetic usernames for new federated accounts.
pub trait UsernameGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// `user-` followed by the first 8 hex chars of a v4 UUID. Collisions are
/// not checked against the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomUsernameGenerator;

impl UsernameGenerator for RandomUsernameGenerator {
    fn generate(&self) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("{SYNTHETIC_USERNAME_PREFIX}{}", &hex[..8])
    }
}

/// Deterministic generators for tests and doc examples
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Always returns the same username.
    pub struct FixedUsernameGenerator(pub String);

    impl UsernameGenerator for FixedUsernameGenerator {
        fn generate(&self) -> String { self.0.clone() }
    }

    /// `user-00000001`, `user-00000002`, ...
    #[derive(Default)]
    pub struct SequentialUsernameGenerator {
        next: AtomicU32,
    }

    impl UsernameGenerator for SequentialUsernameGenerator {
        fn generate(&self) -> String {
            let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
            format!("{SYNTHETIC_USERNAME_PREFIX}{n:08x}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_usernames_have_eight_hex_chars() {
        let name = RandomUsernameGenerator.generate();
        let suffix = name.strip_prefix(SYNTHETIC_USERNAME_PREFIX).unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn sequential_generator_counts_up() {
        let g = mock::SequentialUsernameGenerator::default();
        assert_eq!(g.generate(), "user-00000001");
        assert_eq!(g.generate(), "user-00000002");
    }
}
