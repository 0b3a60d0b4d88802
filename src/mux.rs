//! Multiplexer cycle tracking.
//!
//! The external addressable multiplexer rotates through `multiplexer_channels`
//! selections per analog input channel; one full rotation yields
//! `multiplexer_channels × analog_in_channels` fresh samples. The engine's
//! named table is refilled exactly once per completed rotation, as a single
//! bulk copy — never partially.

/// Position within one multiplexer rotation, advanced once per analog frame.
#[derive(Debug, Clone, Copy)]
pub struct MultiplexerCycle {
    cycle_length: usize,
    position: usize,
}

impl MultiplexerCycle {
    /// `None` when no multiplexer is fitted (`multiplexer_channels == 0`) or
    /// there are no analog inputs to rotate through.
    pub fn new(multiplexer_channels: usize, analog_in_channels: usize) -> Option<Self> {
        let cycle_length = multiplexer_channels * analog_in_channels;
        (cycle_length > 0).then_some(Self {
            cycle_length,
            position: 0,
        })
    }

    pub fn cycle_length(&self) -> usize {
        self.cycle_length
    }

    /// Advance one analog frame. Once complete, the position holds until
    /// `refill` succeeds, deferring the table copy rather than splitting it.
    pub fn tick(&mut self) {
        if self.position < self.cycle_length {
            self.position += 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.position >= self.cycle_length
    }

    /// Bulk-copy the current multiplexer sample set into `table` and restart
    /// the cycle. Returns false (and copies nothing) when the full set is not
    /// yet available or the table is undersized.
    pub fn refill(&mut self, samples: &[f32], table: &mut [f32]) -> bool {
        if samples.len() < self.cycle_length || table.len() < self.cycle_length {
            return false;
        }
        table[..self.cycle_length].copy_from_slice(&samples[..self.cycle_length]);
        self.position = 0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_without_multiplexer_or_analog() {
        assert!(MultiplexerCycle::new(0, 8).is_none());
        assert!(MultiplexerCycle::new(8, 0).is_none());
    }

    #[test]
    fn completes_exactly_once_per_cycle_length() {
        let mut cycle = MultiplexerCycle::new(8, 2).unwrap();
        let samples = vec![0.25; 16];
        let mut table = vec![0.0; 16];
        let mut refills = 0;
        for _ in 0..64 {
            cycle.tick();
            if cycle.is_complete() && cycle.refill(&samples, &mut table) {
                refills += 1;
            }
        }
        assert_eq!(refills, 4);
        assert!(table.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn partial_sample_set_defers_the_copy() {
        let mut cycle = MultiplexerCycle::new(4, 2).unwrap();
        let mut table = vec![0.0; 8];
        for _ in 0..8 {
            cycle.tick();
        }
        assert!(cycle.is_complete());
        // Not enough samples yet: nothing written, cycle still complete.
        assert!(!cycle.refill(&[1.0; 3], &mut table));
        assert!(cycle.is_complete());
        assert!(table.iter().all(|&s| s == 0.0));
        // Ticking past completion holds position; the next full set lands.
        cycle.tick();
        assert!(cycle.refill(&[1.0; 8], &mut table));
        assert!(!cycle.is_complete());
        assert!(table.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn copy_matches_sample_set_at_completion() {
        let mut cycle = MultiplexerCycle::new(2, 2).unwrap();
        let samples: Vec<f32> = (0..4).map(|i| i as f32 * 0.1).collect();
        let mut table = vec![0.0; 4];
        for _ in 0..4 {
            cycle.tick();
        }
        assert!(cycle.refill(&samples, &mut table));
        assert_eq!(table, samples);
    }
}
