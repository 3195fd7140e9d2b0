//! Tick-driven visual transitions: the sleep fade and the saving indicator.
//!
//! Both are plain values advanced by the cycle controller each tick; the
//! UI only reads them.

use serde::{Deserialize, Serialize};

/// Linear alpha tween of the full-screen overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenFade {
    from:     f32,
    to:       f32,
    duration: f32,
    elapsed:  f32,
}

impl Default for ScreenFade {
    fn default() -> Self {
        Self { from: 0.0, to: 0.0, duration: 0.0, elapsed: 0.0 }
    }
}

impl ScreenFade {
    pub fn start(&mut self, from: f32, to: f32, duration: f32) {
        *self = Self { from, to, duration: duration.max(0.0), elapsed: 0.0 };
    }

    pub fn tick(&mut self, dt: f32) {
        self.elapsed = (self.elapsed + dt).min(self.duration);
    }

    pub fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn alpha(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = (self.elapsed / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }
}

/// Repeating 1 -> 0 blink. `stop` lets the current sweep finish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BlinkIndicator {
    half_period: f32,
    phase:       f32,
    active:      bool,
    stopping:    bool,
}

impl BlinkIndicator {
    pub fn new(half_period: f32) -> Self {
        Self { half_period, ..Self::default() }
    }

    pub fn start(&mut self) {
        self.phase = 0.0;
        self.active = true;
        self.stopping = false;
    }

    pub fn stop(&mut self) {
        if self.active {
            self.stopping = true;
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if !self.active {
            return;
        }
        if self.half_period <= 0.0 {
            self.active = !self.stopping;
            return;
        }
        self.phase += dt;
        if self.phase >= self.half_period {
            if self.stopping {
                self.active = false;
                self.stopping = false;
            }
            self.phase %= self.half_period;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn alpha(&self) -> f32 {
        if !self.active || self.half_period <= 0.0 {
            return 0.0;
        }
        1.0 - (self.phase / self.half_period).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_reaches_target_and_reports_done() {
        let mut fade = ScreenFade::default();
        fade.start(0.0, 1.0, 2.0);
        fade.tick(1.0);
        assert_eq!(fade.alpha(), 0.5);
        assert!(!fade.is_done());
        fade.tick(5.0);
        assert_eq!(fade.alpha(), 1.0);
        assert!(fade.is_done());
    }

    #[test]
    fn blink_finishes_its_sweep_after_stop() {
        let mut blink = BlinkIndicator::new(0.25);
        blink.start();
        blink.tick(0.1);
        blink.stop();
        assert!(blink.is_active());
        blink.tick(0.2);
        assert!(!blink.is_active());
        assert_eq!(blink.alpha(), 0.0);
    }
}
