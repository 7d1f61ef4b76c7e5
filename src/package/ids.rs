//! Short element identifiers for one package build.

/// Prefix shared by every allocated identifier.
const ID_PREFIX: char = 'U';

/// Issues `U0`, `U1`, `U2`, ... in order.
///
/// One allocator lives inside each [`Package`](super::Package); identifiers are
/// unique within that package only.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Creates an allocator whose first identifier is `U0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh identifier.
    pub fn next_id(&mut self) -> String {
        let id = format!("{ID_PREFIX}{}", self.next);
        self.next += 1;
        id
    }

    /// Number of identifiers issued so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_start_at_zero_and_increase() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_id(), "U0");
        assert_eq!(ids.next_id(), "U1");
        assert_eq!(ids.next_id(), "U2");
        assert_eq!(ids.issued(), 3);
    }

    #[test]
    fn test_ids_never_repeat() {
        let mut ids = IdAllocator::new();
        let issued: HashSet<String> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(issued.len(), 1000);
    }
}
