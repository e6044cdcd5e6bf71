use serde::{Deserialize, Serialize};

/// Monotonic animation clock in milliseconds, advanced by the host.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AnimationClock {
    pub now_ms: f64,
}

impl AnimationClock {
    pub fn reset(&mut self) {
        self.now_ms = 0.0;
    }

    pub fn advance(&mut self, delta_ms: f64) {
        self.now_ms = (self.now_ms + delta_ms.max(0.0)).max(0.0);
    }
}

/// Visual state of a single mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkState {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
}

impl MarkState {
    pub fn lerp(&self, to: &MarkState, t: f64) -> MarkState {
        MarkState {
            cx: self.cx + (to.cx - self.cx) * t,
            cy: self.cy + (to.cy - self.cy) * t,
            r: self.r + (to.r - self.r) * t,
        }
    }
}

/// Eased animation between two mark states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: MarkState,
    pub to: MarkState,
    /// Clock time at which the animation starts moving.
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl Transition {
    pub fn new(from: MarkState, to: MarkState, start_ms: f64, duration_ms: f64) -> Self {
        Self {
            from,
            to,
            start_ms,
            duration_ms,
        }
    }

    /// State at clock time `now_ms`.
    pub fn sample(&self, now_ms: f64) -> MarkState {
        match self.progress(now_ms) {
            t if t <= 0.0 => self.from.clone(),
            t if t >= 1.0 => self.to.clone(),
            t => self.from.lerp(&self.to, ease_cubic_in_out(t)),
        }
    }

    pub fn progress(&self, now_ms: f64) -> f64 {
        if now_ms <= self.start_ms {
            0.0
        } else if self.duration_ms <= 0.0 || now_ms >= self.end_ms() {
            1.0
        } else {
            (now_ms - self.start_ms) / self.duration_ms
        }
    }

    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.duration_ms.max(0.0)
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        now_ms >= self.end_ms()
    }

    /// Replaces the target. The new animation starts from wherever this one
    /// is at `now_ms`, so an in-flight target is simply overridden.
    pub fn retarget(&self, now_ms: f64, to: MarkState, start_ms: f64, duration_ms: f64) -> Self {
        Self::new(self.sample(now_ms), to, start_ms, duration_ms)
    }
}

pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}
