//! Key generation for entities that do not carry a natural key.

use uuid::Uuid;

/// Source of unique, stable entity keys.
pub trait KeyGenerator {
    fn next_key(&mut self) -> String;
}

/// Random UUID v4 keys in simple (hyphenless) form.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidKeys;

impl KeyGenerator for UuidKeys {
    fn next_key(&mut self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Deterministic `<prefix><n>` keys counting up from `next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceKeys {
    pub prefix: String,
    pub next: u64,
}

impl SequenceKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl KeyGenerator for SequenceKeys {
    fn next_key(&mut self) -> String {
        let key = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sequence_keys_count_up() {
        let mut keys = SequenceKeys::new("n");
        assert_eq!(keys.next_key(), "n0");
        assert_eq!(keys.next_key(), "n1");
        assert_eq!(keys.next, 2);
    }

    #[test]
    fn test_uuid_keys_are_unique() {
        let mut keys = UuidKeys;
        let generated: HashSet<String> = (0..100).map(|_| keys.next_key()).collect();
        assert_eq!(generated.len(), 100);
        assert!(generated.iter().all(|k| k.len() == 32));
    }
}
