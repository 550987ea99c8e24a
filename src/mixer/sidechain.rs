use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::MixerError;
use super::backend::AudioBackend;

/// Time constant used to bring music back when ducking is switched off.
pub const RESTORE_TIME_CONSTANT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SidechainPreset {
    Subtle,
    #[default]
    Moderate,
    Aggressive,
    Radio,
}

impl SidechainPreset {
    pub const ALL: [SidechainPreset; 4] = [
        Self::Subtle,
        Self::Moderate,
        Self::Aggressive,
        Self::Radio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subtle => "subtle",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
            Self::Radio => "radio",
        }
    }

    /// Threshold, ratio, attack and release for this preset.
    fn values(self) -> (f64, f64, f64, f64) {
        match self {
            Self::Subtle => (0.15, 0.5, 0.02, 0.8),
            Self::Moderate => (0.1, 0.3, 0.01, 0.5),
            Self::Aggressive => (0.05, 0.15, 0.005, 0.3),
            Self::Radio => (0.08, 0.2, 0.005, 0.6),
        }
    }
}

impl fmt::Display for SidechainPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SidechainPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown sidechain preset '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SidechainConfig {
    pub enabled: bool,
    /// Mic level (0..1) above which the music ducks.
    pub threshold: f64,
    /// Music gain while ducked (0..1).
    pub ratio: f64,
    pub attack: f64,
    pub release: f64,
}

impl Default for SidechainConfig {
    fn default() -> Self {
        Self::from_preset(SidechainPreset::Moderate, false)
    }
}

impl SidechainConfig {
    pub fn from_preset(preset: SidechainPreset, enabled: bool) -> Self {
        let (threshold, ratio, attack, release) = preset.values();
        Self {
            enabled,
            threshold,
            ratio,
            attack,
            release,
        }
    }
}

/// Root mean square of a block of samples.
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / samples.len() as f64).sqrt()
}

/// Mic-triggered ducking of the music bus.
#[derive(Debug, Clone)]
pub struct Sidechain {
    config: SidechainConfig,
    monitoring: bool,
    ducking: bool,
    /// Local model of the music gain the backend is approaching.
    gain: f64,
}

impl Default for Sidechain {
    fn default() -> Self {
        Self::new(SidechainConfig::default())
    }
}

impl Sidechain {
    pub fn new(config: SidechainConfig) -> Self {
        Self {
            config,
            monitoring: false,
            ducking: false,
            gain: 1.0,
        }
    }

    pub fn config(&self) -> SidechainConfig {
        self.config
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    pub fn is_ducking(&self) -> bool {
        self.ducking
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Open the mic and start monitoring. A refused mic leaves music unducked.
    pub fn connect_microphone<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<(), MixerError> {
        if self.monitoring {
            return Ok(());
        }
        backend.open_microphone()?;
        self.monitoring = true;
        Ok(())
    }

    pub fn disconnect_microphone<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.monitoring {
            self.monitoring = false;
            backend.close_microphone();
        }
    }

    /// Feed one frame of mic samples covering `dt` seconds.
    pub fn process_frame<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        samples: &[f32],
        dt: f64,
    ) -> Result<(), MixerError> {
        if !self.monitoring || !self.config.enabled {
            return Ok(());
        }

        let duck = rms(samples) > self.config.threshold;
        let (target, tau) = if duck {
            (self.config.ratio, self.config.attack)
        } else {
            (1.0, self.config.release)
        };
        backend.set_duck_target(target, tau)?;
        self.ducking = duck;
        self.follow(target, tau, dt);
        Ok(())
    }

    fn follow(&mut self, target: f64, tau: f64, dt: f64) {
        let alpha = if tau > 0.0 { 1.0 - (-dt.max(0.0) / tau).exp() } else { 1.0 };
        self.gain += (target - self.gain) * alpha;
    }

    pub fn set_enabled<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        enabled: bool,
    ) -> Result<(), MixerError> {
        self.config.enabled = enabled;
        if !enabled {
            backend.set_duck_target(1.0, RESTORE_TIME_CONSTANT)?;
            self.ducking = false;
            self.gain = 1.0;
        }
        Ok(())
    }

    /// Swap in a preset's parameters, keeping the enabled flag.
    pub fn apply_preset(&mut self, preset: SidechainPreset) {
        self.config = SidechainConfig::from_preset(preset, self.config.enabled);
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.config.threshold = threshold.clamp(0.0, 1.0);
    }

    pub fn set_ratio(&mut self, ratio: f64) {
        self.config.ratio = ratio.clamp(0.0, 1.0);
    }

    pub fn set_attack(&mut self, attack: f64) {
        self.config.attack = attack.clamp(0.001, 1.0);
    }

    pub fn set_release(&mut self, release: f64) {
        self.config.release = release.clamp(0.001, 5.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::backend::{Automation, RecordingBackend};

    fn armed() -> (RecordingBackend, Sidechain) {
        let mut backend = RecordingBackend::new();
        let mut sc = Sidechain::new(SidechainConfig::from_preset(SidechainPreset::Moderate, true));
        sc.connect_microphone(&mut backend).unwrap();
        (backend, sc)
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_duck_and_release() {
        let (mut backend, mut sc) = armed();
        sc.process_frame(&mut backend, &[0.4; 64], 0.016).unwrap();
        assert!(sc.is_ducking());
        assert_eq!(
            backend.log.last(),
            Some(&Automation::DuckTarget { gain: 0.3, time_constant: 0.01 })
        );
        // 16 ms is well past the 10 ms attack
        assert!(sc.gain() < 0.5);

        sc.process_frame(&mut backend, &[0.01; 64], 0.016).unwrap();
        assert!(!sc.is_ducking());
        assert_eq!(
            backend.log.last(),
            Some(&Automation::DuckTarget { gain: 1.0, time_constant: 0.5 })
        );
        assert!(sc.gain() < 1.0);
    }

    #[test]
    fn test_disabled_does_nothing() {
        let mut backend = RecordingBackend::new();
        let mut sc = Sidechain::default();
        sc.connect_microphone(&mut backend).unwrap();
        sc.process_frame(&mut backend, &[0.9; 16], 0.016).unwrap();
        assert!(!sc.is_ducking());
        assert_eq!(backend.log, [Automation::MicOpened]);
    }

    #[test]
    fn test_disable_restores_music() {
        let (mut backend, mut sc) = armed();
        sc.process_frame(&mut backend, &[0.4; 64], 0.016).unwrap();
        sc.set_enabled(&mut backend, false).unwrap();
        assert!(!sc.is_ducking());
        assert_eq!(sc.gain(), 1.0);
        assert_eq!(
            backend.log.last(),
            Some(&Automation::DuckTarget { gain: 1.0, time_constant: RESTORE_TIME_CONSTANT })
        );
    }

    #[test]
    fn test_mic_denied_is_recoverable() {
        let mut backend = RecordingBackend::without_microphone();
        let mut sc = Sidechain::new(SidechainConfig::from_preset(SidechainPreset::Radio, true));
        let err = sc.connect_microphone(&mut backend).unwrap_err();
        assert!(matches!(err, MixerError::MicUnavailable(_)));
        assert!(!sc.is_monitoring());
        sc.process_frame(&mut backend, &[0.9; 16], 0.016).unwrap();
        assert!(backend.log.is_empty());
    }

    #[test]
    fn test_disconnect_stops_monitoring() {
        let (mut backend, mut sc) = armed();
        sc.disconnect_microphone(&mut backend);
        assert!(!sc.is_monitoring());
        sc.process_frame(&mut backend, &[0.9; 16], 0.016).unwrap();
        assert_eq!(backend.log, [Automation::MicOpened, Automation::MicClosed]);
    }

    #[test]
    fn test_clamps_and_presets() {
        let mut sc = Sidechain::default();
        sc.set_threshold(2.0);
        sc.set_ratio(-1.0);
        sc.set_attack(0.0);
        sc.set_release(10.0);
        let c = sc.config();
        assert_eq!((c.threshold, c.ratio, c.attack, c.release), (1.0, 0.0, 0.001, 5.0));

        sc.apply_preset("aggressive".parse().unwrap());
        assert_eq!(sc.config().ratio, 0.15);
        assert!(!sc.config().enabled);
    }
}
