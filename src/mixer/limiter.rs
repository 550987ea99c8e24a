use super::MixerError;
use super::backend::AudioBackend;

pub const MIN_THRESHOLD_DB: f64 = -20.0;
pub const MAX_THRESHOLD_DB: f64 = 0.0;
pub const MIN_RATIO: f64 = 1.0;
pub const MAX_RATIO: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterParams {
    pub threshold_db: f64,
    pub ratio: f64,
    /// Seconds.
    pub attack: f64,
    /// Seconds.
    pub release: f64,
}

impl Default for LimiterParams {
    fn default() -> Self {
        Self {
            threshold_db: -1.0,
            ratio: 20.0,
            attack: 0.003,
            release: 0.25,
        }
    }
}

impl LimiterParams {
    /// Static gain reduction for a steady input level, dB (positive = quieter).
    pub fn gain_reduction_db(&self, input_db: f64) -> f64 {
        let over = input_db - self.threshold_db;
        if over <= 0.0 {
            0.0
        } else {
            over * (1.0 - 1.0 / self.ratio)
        }
    }
}

/// Brick-wall limiter on the master bus.
#[derive(Debug, Clone, Default)]
pub struct MasterLimiter {
    params: LimiterParams,
}

impl MasterLimiter {
    pub fn params(&self) -> LimiterParams {
        self.params
    }

    pub fn apply<B: AudioBackend + ?Sized>(&self, backend: &mut B) -> Result<(), MixerError> {
        backend.set_limiter(&self.params)
    }

    pub fn set_threshold<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        db: f64,
    ) -> Result<f64, MixerError> {
        self.params.threshold_db = db.clamp(MIN_THRESHOLD_DB, MAX_THRESHOLD_DB);
        self.apply(backend)?;
        Ok(self.params.threshold_db)
    }

    pub fn set_ratio<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        ratio: f64,
    ) -> Result<f64, MixerError> {
        self.params.ratio = ratio.clamp(MIN_RATIO, MAX_RATIO);
        self.apply(backend)?;
        Ok(self.params.ratio)
    }
}
