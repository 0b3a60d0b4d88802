//! Sensor debouncing.
//!
//! Binary sensor lines (key matrix contacts, auxiliary switches) bounce: a
//! single press produces a burst of level changes. Each line carries a small
//! state machine that reports a rising edge immediately but holds the logical
//! level high for a configurable number of inactive samples before reporting
//! the falling edge. Every active sample fully re-arms the hold, so chatter
//! during a press never leaks through as extra edges.
//!
//! The piezo hit sensor is continuous rather than binary and needs a long
//! refractory period; `HitDetector` models it with asymmetric thresholds.

/// A logical level transition on one debounced line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    /// The stable level after the transition, as sent on the wire.
    pub fn level(self) -> f32 {
        match self {
            Edge::Rising => 1.0,
            Edge::Falling => 0.0,
        }
    }
}

/// Hysteresis state for one binary line.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebounceLine {
    raw: bool,
    stable: bool,
    hold: u32,
}

impl DebounceLine {
    /// Feed one raw sample. Returns an edge on the exact sample the stable
    /// level changes, and never more than once per transition.
    pub fn update(&mut self, raw: bool, hold_samples: u32) -> Option<Edge> {
        self.raw = raw;
        if raw {
            // Full re-arm on every active sample, not just the rising edge.
            self.hold = hold_samples;
            if !self.stable {
                self.stable = true;
                return Some(Edge::Rising);
            }
        } else if self.stable {
            if self.hold == 0 {
                self.stable = false;
                return Some(Edge::Falling);
            }
            self.hold -= 1;
        }
        None
    }

    pub fn stable(&self) -> bool {
        self.stable
    }

    pub fn raw(&self) -> bool {
        self.raw
    }
}

/// Per-line wiring flags.
#[derive(Debug, Clone, Copy)]
struct SensorLine {
    enabled: bool,
    /// Most lines pull low when active; a few are wired the other way round.
    active_low: bool,
    state: DebounceLine,
}

/// Fixed-capacity 2-D grid of debounced sensor lines, indexed by
/// (row, column). The auxiliary 1-D array is a grid with one row.
#[derive(Debug, Clone)]
pub struct SensorGrid<const R: usize, const C: usize> {
    lines: [[SensorLine; C]; R],
    hold_samples: u32,
}

impl<const R: usize, const C: usize> SensorGrid<R, C> {
    /// All lines enabled and active-low.
    pub fn new(hold_samples: u32) -> Self {
        Self {
            lines: [[SensorLine {
                enabled: true,
                active_low: true,
                state: DebounceLine::default(),
            }; C]; R],
            hold_samples,
        }
    }

    pub const fn rows(&self) -> usize {
        R
    }

    pub const fn columns(&self) -> usize {
        C
    }

    pub fn set_enabled(&mut self, row: usize, column: usize, enabled: bool) {
        self.lines[row][column].enabled = enabled;
    }

    pub fn set_active_low(&mut self, row: usize, column: usize, active_low: bool) {
        self.lines[row][column].active_low = active_low;
    }

    /// Feed one raw hardware level for (row, column): polarity is applied,
    /// disabled lines read as inactive, and the line's debounce state
    /// advances by one sample.
    pub fn sample(&mut self, row: usize, column: usize, level: bool) -> Option<Edge> {
        debug_assert!(row < R && column < C);
        let line = &mut self.lines[row][column];
        let raw = if line.enabled {
            level != line.active_low
        } else {
            false
        };
        line.state.update(raw, self.hold_samples)
    }

    pub fn stable(&self, row: usize, column: usize) -> bool {
        self.lines[row][column].state.stable()
    }
}

/// Thresholds and refractory hold for the hit sensor. The defaults are the
/// values the instrument was calibrated with; their physical meaning depends
/// on the sensor, so they stay configurable rather than hard-coded.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitDetectorConfig {
    /// A sample below this triggers a hit.
    pub trigger_below: f32,
    /// Samples above this drain the refractory hold.
    pub release_above: f32,
    /// Refractory hold, in analog frames.
    pub hold_frames: u32,
}

impl Default for HitDetectorConfig {
    fn default() -> Self {
        Self {
            trigger_below: 0.1,
            release_above: 0.4,
            hold_frames: 1024,
        }
    }
}

/// Momentary-impact detector with asymmetric hysteresis: a dip below the low
/// threshold fires once, then a long hold must drain — decremented only while
/// the signal sits above the high threshold — before the next hit can fire.
/// Samples between the thresholds hold state.
#[derive(Debug, Clone, Copy)]
pub struct HitDetector {
    config: HitDetectorConfig,
    hold: u32,
}

impl HitDetector {
    pub fn new(config: HitDetectorConfig) -> Self {
        Self { config, hold: 0 }
    }

    /// Feed one analog sample; true means a hit fired on this sample.
    pub fn sample(&mut self, value: f32) -> bool {
        if value < self.config.trigger_below {
            let fired = self.hold == 0;
            self.hold = self.config.hold_frames;
            fired
        } else {
            if value > self.config.release_above && self.hold > 0 {
                self.hold -= 1;
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_edge_is_immediate() {
        let mut line = DebounceLine::default();
        assert_eq!(line.update(true, 4), Some(Edge::Rising));
        assert!(line.stable());
    }

    #[test]
    fn edges_fire_once_per_transition() {
        let mut line = DebounceLine::default();
        assert_eq!(line.update(true, 0), Some(Edge::Rising));
        assert_eq!(line.update(true, 0), None);
        assert_eq!(line.update(false, 0), Some(Edge::Falling));
        assert_eq!(line.update(false, 0), None);
    }

    #[test]
    fn falling_edge_waits_exactly_hold_samples() {
        let hold = 5;
        let mut line = DebounceLine::default();
        line.update(true, hold);
        // Stays stable-high for exactly `hold` inactive samples...
        for _ in 0..hold {
            assert_eq!(line.update(false, hold), None);
            assert!(line.stable());
        }
        // ...and transitions on the next one.
        assert_eq!(line.update(false, hold), Some(Edge::Falling));
    }

    #[test]
    fn active_sample_rearms_mid_hold() {
        // Active for 3 samples, inactive for hold-1, active again: one rising
        // edge, zero falling edges.
        let hold = 6;
        let mut line = DebounceLine::default();
        let mut rising = 0;
        let mut falling = 0;
        let pattern = [true, true, true]
            .into_iter()
            .chain(std::iter::repeat(false).take(hold as usize - 1))
            .chain([true]);
        for raw in pattern {
            match line.update(raw, hold) {
                Some(Edge::Rising) => rising += 1,
                Some(Edge::Falling) => falling += 1,
                None => {}
            }
        }
        assert_eq!((rising, falling), (1, 0));
        assert!(line.stable());
    }

    #[test]
    fn zero_hold_falls_immediately() {
        let mut line = DebounceLine::default();
        line.update(true, 0);
        assert_eq!(line.update(false, 0), Some(Edge::Falling));
    }

    #[test]
    fn events_track_stable_level_exactly() {
        // Edge events if and only if the stable level changes.
        let mut line = DebounceLine::default();
        let noise = [
            true, false, true, true, false, false, false, true, false, false, false, false,
        ];
        for raw in noise {
            let before = line.stable();
            let edge = line.update(raw, 3);
            match edge {
                Some(Edge::Rising) => assert!(!before && line.stable()),
                Some(Edge::Falling) => assert!(before && !line.stable()),
                None => assert_eq!(before, line.stable()),
            }
        }
    }

    #[test]
    fn grid_applies_polarity() {
        let mut grid: SensorGrid<2, 2> = SensorGrid::new(0);
        // Active-low (default): a low level is a press.
        assert_eq!(grid.sample(0, 0, false), Some(Edge::Rising));
        grid.set_active_low(1, 1, false);
        assert_eq!(grid.sample(1, 1, true), Some(Edge::Rising));
        assert_eq!(grid.sample(1, 1, false), Some(Edge::Falling));
    }

    #[test]
    fn disabled_line_reads_inactive() {
        let mut grid: SensorGrid<1, 2> = SensorGrid::new(0);
        grid.set_enabled(0, 1, false);
        assert_eq!(grid.sample(0, 1, false), None);
        assert!(!grid.stable(0, 1));
        // Disabling a held line releases it through the normal hold path.
        assert_eq!(grid.sample(0, 0, false), Some(Edge::Rising));
        grid.set_enabled(0, 0, false);
        assert_eq!(grid.sample(0, 0, false), Some(Edge::Falling));
    }

    #[test]
    fn hit_fires_once_then_holds_off() {
        let mut hit = HitDetector::new(HitDetectorConfig {
            trigger_below: 0.1,
            release_above: 0.4,
            hold_frames: 3,
        });
        assert!(hit.sample(0.05));
        // Retriggers during the refractory window are swallowed.
        assert!(!hit.sample(0.05));
        // Mid-band samples hold state without draining.
        assert!(!hit.sample(0.2));
        for _ in 0..3 {
            assert!(!hit.sample(0.9));
        }
        assert!(hit.sample(0.01));
    }

    #[test]
    fn retrigger_during_hold_rearms() {
        let mut hit = HitDetector::new(HitDetectorConfig {
            trigger_below: 0.1,
            release_above: 0.4,
            hold_frames: 2,
        });
        assert!(hit.sample(0.0));
        assert!(!hit.sample(0.9));
        // Dipping low again re-arms the full hold without firing.
        assert!(!hit.sample(0.0));
        assert!(!hit.sample(0.9));
        assert!(!hit.sample(0.9));
        assert!(hit.sample(0.0));
    }
}
