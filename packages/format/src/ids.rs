//! Suffix generators for synthesized incident IDs.

/// Produces the suffix appended to synthesized incident IDs.
///
/// The default [`RandomIdGenerator`] makes IDs unique across batches; tests
/// and callers that need reproducible output use [`SequentialIdGenerator`].
pub trait IdGenerator {
    /// Returns the next suffix.
    fn next_suffix(&mut self) -> String;
}

/// Random 8-hex-digit suffixes from a v4 UUID.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_suffix(&mut self) -> String {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(8);
        id
    }
}

/// Deterministic zero-padded hex counter.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialIdGenerator {
    next: u32,
}

impl SequentialIdGenerator {
    /// Creates a generator whose first suffix is `start`.
    #[must_use]
    pub const fn starting_at(start: u32) -> Self {
        Self { next: start }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_suffix(&mut self) -> String {
        let suffix = format!("{:08x}", self.next);
        self.next = self.next.wrapping_add(1);
        suffix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_suffixes_are_short_hex() {
        let suffix = RandomIdGenerator.next_suffix();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn sequential_suffixes_count_up() {
        let mut ids = SequentialIdGenerator::starting_at(9);
        assert_eq!(ids.next_suffix(), "00000009");
        assert_eq!(ids.next_suffix(), "0000000a");
    }
}
