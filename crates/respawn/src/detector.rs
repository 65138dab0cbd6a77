use std::time::Duration;

use crate::config::{ConfigSnapshot, DEFAULT_FLOAT_TOLERANCE};

pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorTick {
    Baseline,
    Idle,
    Changed,
    Waiting,
    Deferred,
    Fire,
}

#[derive(Debug, Clone)]
pub struct ConfigChangeDetector {
    window: Duration,
    tolerance: f32,
    last: Option<ConfigSnapshot>,
    armed: bool,
    quiet_for: Duration,
}

impl Default for ConfigChangeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW, DEFAULT_FLOAT_TOLERANCE)
    }
}

impl ConfigChangeDetector {
    pub fn new(window: Duration, tolerance: f32) -> Self {
        Self {
            window,
            tolerance: tolerance.abs(),
            last: None,
            armed: false,
            quiet_for: Duration::ZERO,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn last_snapshot(&self) -> Option<ConfigSnapshot> {
        self.last
    }

    pub fn observe(&mut self, snapshot: ConfigSnapshot, dt: Duration, blocked: bool) -> DetectorTick {
        let Some(last) = self.last else {
            self.last = Some(snapshot);
            return DetectorTick::Baseline;
        };

        if !last.approx_eq(&snapshot, self.tolerance) {
            self.last = Some(snapshot);
            self.armed = true;
            self.quiet_for = Duration::ZERO;
            return DetectorTick::Changed;
        }

        if !self.armed {
            return DetectorTick::Idle;
        }

        self.quiet_for = self.quiet_for.saturating_add(dt);
        if self.quiet_for < self.window {
            return DetectorTick::Waiting;
        }
        if blocked {
            return DetectorTick::Deferred;
        }

        self.armed = false;
        self.quiet_for = Duration::ZERO;
        DetectorTick::Fire
    }

    pub fn rearm(&mut self) {
        self.armed = true;
        self.quiet_for = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(16);

    fn with_drop(drop_multiplier: f32) -> ConfigSnapshot {
        ConfigSnapshot {
            drop_multiplier,
            ..ConfigSnapshot::default()
        }
    }

    fn run_idle_ticks(
        detector: &mut ConfigChangeDetector,
        snapshot: ConfigSnapshot,
        ticks: usize,
        blocked: bool,
    ) -> usize {
        (0..ticks)
            .filter(|_| detector.observe(snapshot, TICK, blocked) == DetectorTick::Fire)
            .count()
    }

    #[test]
    fn first_snapshot_is_baseline_only() {
        let mut detector = ConfigChangeDetector::default();
        assert_eq!(
            detector.observe(with_drop(1.0), TICK, false),
            DetectorTick::Baseline
        );
        assert_eq!(run_idle_ticks(&mut detector, with_drop(1.0), 20, false), 0);
    }

    #[test]
    fn burst_of_edits_fires_exactly_once() {
        let mut detector = ConfigChangeDetector::default();
        detector.observe(with_drop(1.0), TICK, false);

        for step in 1..=5 {
            assert_eq!(
                detector.observe(with_drop(1.0 + step as f32), TICK, false),
                DetectorTick::Changed
            );
        }

        assert_eq!(run_idle_ticks(&mut detector, with_drop(6.0), 30, false), 1);
        assert!(!detector.is_armed());
    }

    #[test]
    fn edit_inside_window_restarts_it() {
        let mut detector = ConfigChangeDetector::new(Duration::from_millis(100), 0.001);
        detector.observe(with_drop(1.0), TICK, false);
        detector.observe(with_drop(2.0), TICK, false);

        assert_eq!(run_idle_ticks(&mut detector, with_drop(2.0), 5, false), 0);
        detector.observe(with_drop(3.0), TICK, false);
        assert_eq!(run_idle_ticks(&mut detector, with_drop(3.0), 6, false), 0);
        assert_eq!(run_idle_ticks(&mut detector, with_drop(3.0), 1, false), 1);
    }

    #[test]
    fn float_noise_does_not_arm() {
        let mut detector = ConfigChangeDetector::default();
        detector.observe(with_drop(2.0), TICK, false);
        assert_eq!(
            detector.observe(with_drop(2.0004), TICK, false),
            DetectorTick::Idle
        );
        assert!(!detector.is_armed());
    }

    #[test]
    fn boolean_toggle_arms() {
        let mut detector = ConfigChangeDetector::default();
        detector.observe(ConfigSnapshot::default(), TICK, false);
        let disabled = ConfigSnapshot {
            enabled: false,
            ..ConfigSnapshot::default()
        };
        assert_eq!(detector.observe(disabled, TICK, false), DetectorTick::Changed);
    }

    #[test]
    fn rearmed_edit_fires_again_after_a_full_window() {
        let mut detector = ConfigChangeDetector::default();
        detector.observe(with_drop(1.0), TICK, false);
        detector.observe(with_drop(5.0), TICK, false);
        assert_eq!(run_idle_ticks(&mut detector, with_drop(5.0), 10, false), 1);

        detector.rearm();
        assert!(detector.is_armed());
        assert_eq!(run_idle_ticks(&mut detector, with_drop(5.0), 6, false), 0);
        assert_eq!(run_idle_ticks(&mut detector, with_drop(5.0), 1, false), 1);
    }

    #[test]
    fn blocked_window_defers_until_unblocked() {
        let mut detector = ConfigChangeDetector::default();
        detector.observe(with_drop(1.0), TICK, false);
        detector.observe(with_drop(5.0), TICK, false);

        assert_eq!(run_idle_ticks(&mut detector, with_drop(5.0), 20, true), 0);
        assert!(detector.is_armed());
        assert_eq!(
            detector.observe(with_drop(5.0), TICK, true),
            DetectorTick::Deferred
        );
        assert_eq!(
            detector.observe(with_drop(5.0), TICK, false),
            DetectorTick::Fire
        );
    }
}
