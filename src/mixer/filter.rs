use super::MixerError;
use super::backend::{AudioBackend, FilterKind};

pub const MIN_FREQUENCY: f64 = 20.0;
pub const MAX_FREQUENCY: f64 = 20_000.0;
/// High-pass counts as engaged above this cutoff, Hz.
pub const HPF_ACTIVE_ABOVE: f64 = 25.0;
/// Low-pass counts as engaged below this cutoff, Hz.
pub const LPF_ACTIVE_BELOW: f64 = 19_000.0;
pub const DEFAULT_RESONANCE: f64 = 1.0;

/// Map a linear slider position in [0, 1] onto 20 Hz .. 20 kHz logarithmically.
pub fn slider_to_frequency(slider: f64) -> f64 {
    MIN_FREQUENCY * (MAX_FREQUENCY / MIN_FREQUENCY).powf(slider.clamp(0.0, 1.0))
}

pub fn frequency_to_slider(hz: f64) -> f64 {
    let hz = hz.clamp(MIN_FREQUENCY, MAX_FREQUENCY);
    (hz / MIN_FREQUENCY).ln() / (MAX_FREQUENCY / MIN_FREQUENCY).ln()
}

/// "440 Hz" below a kilohertz, "2.5 kHz" above.
pub fn format_frequency(hz: f64) -> String {
    if hz >= 1_000.0 {
        format!("{:.1} kHz", hz / 1_000.0)
    } else {
        format!("{hz:.0} Hz")
    }
}

/// Master high-pass and low-pass filter knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterKnobs {
    pub hpf_hz: f64,
    pub lpf_hz: f64,
    pub resonance: f64,
}

impl Default for FilterKnobs {
    fn default() -> Self {
        Self {
            hpf_hz: MIN_FREQUENCY,
            lpf_hz: MAX_FREQUENCY,
            resonance: DEFAULT_RESONANCE,
        }
    }
}

impl FilterKnobs {
    pub fn set_frequency<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        kind: FilterKind,
        hz: f64,
    ) -> Result<f64, MixerError> {
        let hz = hz.clamp(MIN_FREQUENCY, MAX_FREQUENCY);
        backend.set_filter_frequency(kind, hz, self.resonance)?;
        match kind {
            FilterKind::HighPass => self.hpf_hz = hz,
            FilterKind::LowPass => self.lpf_hz = hz,
        }
        Ok(hz)
    }

    pub fn set_slider<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        kind: FilterKind,
        slider: f64,
    ) -> Result<f64, MixerError> {
        self.set_frequency(backend, kind, slider_to_frequency(slider))
    }

    pub fn is_active(&self, kind: FilterKind) -> bool {
        match kind {
            FilterKind::HighPass => self.hpf_hz > HPF_ACTIVE_ABOVE,
            FilterKind::LowPass => self.lpf_hz < LPF_ACTIVE_BELOW,
        }
    }

    /// Open both filters fully.
    pub fn reset<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) -> Result<(), MixerError> {
        self.set_frequency(backend, FilterKind::HighPass, MIN_FREQUENCY)?;
        self.set_frequency(backend, FilterKind::LowPass, MAX_FREQUENCY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::backend::{Automation, RecordingBackend};

    #[test]
    fn test_slider_mapping() {
        assert!((slider_to_frequency(0.0) - 20.0).abs() < 1e-9);
        assert!((slider_to_frequency(1.0) - 20_000.0).abs() < 1e-6);
        assert!((slider_to_frequency(0.5) - 632.455_532).abs() < 1e-3);
        assert!((frequency_to_slider(632.455_532) - 0.5).abs() < 1e-6);
        assert_eq!(slider_to_frequency(-1.0), slider_to_frequency(0.0));
    }

    #[test]
    fn test_format() {
        assert_eq!(format_frequency(440.0), "440 Hz");
        assert_eq!(format_frequency(2_500.0), "2.5 kHz");
        assert_eq!(format_frequency(20_000.0), "20.0 kHz");
    }

    #[test]
    fn test_active_thresholds() {
        let mut backend = RecordingBackend::new();
        let mut knobs = FilterKnobs::default();
        assert!(!knobs.is_active(FilterKind::HighPass));
        assert!(!knobs.is_active(FilterKind::LowPass));

        knobs.set_frequency(&mut backend, FilterKind::HighPass, 200.0).unwrap();
        knobs.set_slider(&mut backend, FilterKind::LowPass, 0.9).unwrap();
        assert!(knobs.is_active(FilterKind::HighPass));
        assert!(knobs.is_active(FilterKind::LowPass));

        knobs.reset(&mut backend).unwrap();
        assert_eq!(knobs, FilterKnobs::default());
        assert_eq!(
            backend.log.last(),
            Some(&Automation::Filter {
                kind: FilterKind::LowPass,
                hz: MAX_FREQUENCY,
                resonance: DEFAULT_RESONANCE
            })
        );
    }
}
