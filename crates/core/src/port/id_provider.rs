// ID Provider Port (for deterministic testing)

/// Random token source for user IDs
pub trait IdProvider: Send + Sync {
    /// Generate a short random token (lowercase alphanumeric)
    fn generate_id(&self) -> String;
}

/// Length of generated tokens
pub const TOKEN_LEN: usize = 9;

/// UUID v4 provider (production)
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        let mut token = uuid::Uuid::new_v4().simple().to_string();
        token.truncate(TOKEN_LEN);
        token
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Deterministic tokens: `tok000001`, `tok000002`, ...
    #[derive(Default)]
    pub struct SequentialIdProvider {
        counter: AtomicU64,
    }

    impl SequentialIdProvider {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl IdProvider for SequentialIdProvider {
        fn generate_id(&self) -> String {
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            format!("tok{:06}", n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_token_shape() {
        let token = UuidProvider.generate_id();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, UuidProvider.generate_id());
    }
}
