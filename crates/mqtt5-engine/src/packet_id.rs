use std::sync::atomic::{AtomicU16, Ordering};

/// Hands out message identifiers 1..=65535, wrapping back to 1.
#[derive(Debug)]
pub struct PacketIdGenerator {
    next: AtomicU16,
}

impl Default for PacketIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicU16::new(1),
        }
    }

    #[must_use]
    pub fn starting_at(id: u16) -> Self {
        Self {
            next: AtomicU16::new(id.max(1)),
        }
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn next(&self) -> u16 {
        let previous = self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |id| {
                Some(if id == u16::MAX { 1 } else { id + 1 })
            });
        // The closure never returns None.
        match previous {
            Ok(id) | Err(id) => id,
        }
    }

    pub fn reset(&self) {
        self.next.store(1, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sequence_starts_at_one() {
        let generator = PacketIdGenerator::new();
        assert_eq!(generator.next(), 1);
        assert_eq!(generator.next(), 2);
        assert_eq!(generator.next(), 3);
    }

    #[test]
    fn test_wraps_past_zero() {
        let generator = PacketIdGenerator::starting_at(u16::MAX - 1);
        assert_eq!(generator.next(), u16::MAX - 1);
        assert_eq!(generator.next(), u16::MAX);
        assert_eq!(generator.next(), 1);
    }

    #[test]
    fn test_starting_at_zero_is_clamped() {
        assert_eq!(PacketIdGenerator::starting_at(0).next(), 1);
    }

    #[test]
    fn test_reset() {
        let generator = PacketIdGenerator::new();
        let _ = generator.next();
        let _ = generator.next();
        generator.reset();
        assert_eq!(generator.next(), 1);
    }

    #[test]
    fn test_concurrent_ids_are_distinct() {
        let generator = Arc::new(PacketIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                thread::spawn(move || (0..1000).map(|_| generator.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
