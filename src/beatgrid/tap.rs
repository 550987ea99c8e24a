use std::collections::VecDeque;
use std::time::Instant;

/// Taps kept in the rolling window.
pub const MAX_TAPS: usize = 4;
/// A gap longer than this starts a new tapping session.
pub const TAP_TIMEOUT_MS: u64 = 2000;

/// Tap-tempo BPM estimator over a short rolling window.
#[derive(Debug)]
pub struct TapTempo {
    origin: Instant,
    taps: VecDeque<u64>,
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new()
    }
}

impl TapTempo {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            taps: VecDeque::with_capacity(MAX_TAPS + 1),
        }
    }

    /// Register a tap now. Returns the rounded BPM once two taps are in.
    pub fn tap(&mut self) -> Option<u32> {
        let now_ms = self.origin.elapsed().as_millis() as u64;
        self.tap_at(now_ms)
    }

    /// Register a tap at an explicit timestamp in milliseconds.
    pub fn tap_at(&mut self, now_ms: u64) -> Option<u32> {
        if let Some(&last) = self.taps.back() {
            if now_ms.saturating_sub(last) > TAP_TIMEOUT_MS {
                self.taps.clear();
            }
        }

        self.taps.push_back(now_ms);
        if self.taps.len() > MAX_TAPS {
            self.taps.pop_front();
        }

        self.bpm()
    }

    /// Current estimate without registering a tap.
    pub fn bpm(&self) -> Option<u32> {
        let (first, last) = (*self.taps.front()?, *self.taps.back()?);
        let intervals = self.taps.len().checked_sub(1).filter(|&n| n > 0)?;
        // Mean of consecutive intervals is the span over their count
        let mean_ms = last.saturating_sub(first) as f64 / intervals as f64;
        if mean_ms <= 0.0 {
            return None;
        }
        Some((60_000.0 / mean_ms).round() as u32)
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }
}
