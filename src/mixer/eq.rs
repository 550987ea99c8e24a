use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::MixerError;
use super::backend::{AudioBackend, Band, Channel, Ramp};

/// Gain used for a killed band.
pub const KILL_DB: f64 = -100.0;
pub const MAX_GAIN_DB: f64 = 12.0;
/// Time constant for ordinary gain moves, seconds.
pub const GAIN_RAMP: f64 = 0.05;
/// Interpolation steps for a bass swap.
pub const BASS_SWAP_STEPS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EqPreset {
    Flat,
    Club,
    Radio,
    BassBoost,
    Vocal,
}

impl EqPreset {
    pub const ALL: [EqPreset; 5] = [
        Self::Flat,
        Self::Club,
        Self::Radio,
        Self::BassBoost,
        Self::Vocal,
    ];

    /// Low, mid and high gains in dB.
    pub fn gains(self) -> [f64; 3] {
        match self {
            Self::Flat => [0.0, 0.0, 0.0],
            Self::Club => [6.0, -2.0, 4.0],
            Self::Radio => [-6.0, 3.0, 2.0],
            Self::BassBoost => [9.0, 0.0, 0.0],
            Self::Vocal => [-3.0, 6.0, 2.0],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Club => "club",
            Self::Radio => "radio",
            Self::BassBoost => "bass-boost",
            Self::Vocal => "vocal",
        }
    }
}

impl fmt::Display for EqPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EqPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown EQ preset '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandState {
    /// Last gain the user asked for, kept while the band is killed.
    pub gain_db: f64,
    pub killed: bool,
}

/// Per-deck three-band peaking EQ with kill switches.
#[derive(Debug, Clone)]
pub struct ThreeBandEq {
    channel: Channel,
    bands: [BandState; 3],
}

fn index(band: Band) -> usize {
    match band {
        Band::Low => 0,
        Band::Mid => 1,
        Band::High => 2,
    }
}

impl ThreeBandEq {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            bands: [BandState::default(); 3],
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn band(&self, band: Band) -> BandState {
        self.bands[index(band)]
    }

    /// Clamp to [-100, +12] dB and ramp there. Setting a gain clears any kill.
    pub fn set_gain<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        band: Band,
        db: f64,
    ) -> Result<f64, MixerError> {
        let now = backend.current_time();
        self.set_gain_at(backend, band, db, now, GAIN_RAMP)
    }

    fn set_gain_at<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        band: Band,
        db: f64,
        at: f64,
        ramp: f64,
    ) -> Result<f64, MixerError> {
        let db = db.clamp(KILL_DB, MAX_GAIN_DB);
        backend.set_band_gain(self.channel, band, db, at, Ramp::TimeConstant(ramp))?;
        self.bands[index(band)] = BandState {
            gain_db: db,
            killed: false,
        };
        Ok(db)
    }

    /// Drop the band to -100 dB immediately, remembering its gain.
    pub fn kill<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        band: Band,
    ) -> Result<(), MixerError> {
        let now = backend.current_time();
        backend.set_band_gain(self.channel, band, KILL_DB, now, Ramp::Instant)?;
        self.bands[index(band)].killed = true;
        Ok(())
    }

    /// Bring a killed band back to its remembered gain. No-op otherwise.
    pub fn restore<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        band: Band,
    ) -> Result<(), MixerError> {
        let state = self.bands[index(band)];
        if !state.killed {
            return Ok(());
        }
        self.set_gain(backend, band, state.gain_db)?;
        Ok(())
    }

    /// Returns the new killed state.
    pub fn toggle_kill<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        band: Band,
    ) -> Result<bool, MixerError> {
        if self.bands[index(band)].killed {
            self.restore(backend, band)?;
            Ok(false)
        } else {
            self.kill(backend, band)?;
            Ok(true)
        }
    }

    pub fn apply_preset<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        preset: EqPreset,
    ) -> Result<(), MixerError> {
        for (band, db) in Band::ALL.into_iter().zip(preset.gains()) {
            self.set_gain(backend, band, db)?;
        }
        Ok(())
    }

    pub fn reset<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) -> Result<(), MixerError> {
        self.apply_preset(backend, EqPreset::Flat)
    }
}

/// Low-band gains for each step of a swap, `steps + 1` pairs from
/// `(a, b)` to `(b, a)`.
pub fn bass_swap_curve(a: f64, b: f64, steps: u32) -> Vec<(f64, f64)> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| {
            let p = f64::from(i) / f64::from(steps);
            (a * (1.0 - p) + b * p, b * (1.0 - p) + a * p)
        })
        .collect()
}

/// Exchange the low-band gains of two decks over `duration` seconds.
pub fn bass_swap<B: AudioBackend + ?Sized>(
    deck_a: &mut ThreeBandEq,
    deck_b: &mut ThreeBandEq,
    backend: &mut B,
    duration: f64,
) -> Result<(), MixerError> {
    let (a, b) = (deck_a.band(Band::Low).gain_db, deck_b.band(Band::Low).gain_db);
    let step = duration.max(0.0) / f64::from(BASS_SWAP_STEPS);
    let start = backend.current_time();

    for (i, (gain_a, gain_b)) in bass_swap_curve(a, b, BASS_SWAP_STEPS).into_iter().enumerate() {
        let at = start + i as f64 * step;
        deck_a.set_gain_at(backend, Band::Low, gain_a, at, step)?;
        deck_b.set_gain_at(backend, Band::Low, gain_b, at, step)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::backend::{Automation, RecordingBackend};

    fn last_gain(backend: &RecordingBackend, band: Band) -> Option<(f64, Ramp)> {
        backend.log.iter().rev().find_map(|a| match *a {
            Automation::BandGain { band: b, db, ramp, .. } if b == band => Some((db, ramp)),
            _ => None,
        })
    }

    #[test]
    fn test_gain_clamped() {
        let mut backend = RecordingBackend::new();
        let mut eq = ThreeBandEq::new(Channel::A);
        assert_eq!(eq.set_gain(&mut backend, Band::Mid, 30.0).unwrap(), 12.0);
        assert_eq!(eq.set_gain(&mut backend, Band::Mid, -500.0).unwrap(), -100.0);
        assert_eq!(
            last_gain(&backend, Band::Mid),
            Some((-100.0, Ramp::TimeConstant(GAIN_RAMP)))
        );
    }

    #[test]
    fn test_kill_and_restore() {
        let mut backend = RecordingBackend::new();
        let mut eq = ThreeBandEq::new(Channel::A);
        eq.set_gain(&mut backend, Band::Low, 4.0).unwrap();

        assert!(eq.toggle_kill(&mut backend, Band::Low).unwrap());
        assert_eq!(last_gain(&backend, Band::Low), Some((KILL_DB, Ramp::Instant)));
        assert_eq!(eq.band(Band::Low).gain_db, 4.0);

        assert!(!eq.toggle_kill(&mut backend, Band::Low).unwrap());
        assert_eq!(last_gain(&backend, Band::Low).map(|g| g.0), Some(4.0));
        assert!(!eq.band(Band::Low).killed);
    }

    #[test]
    fn test_restore_without_kill_is_noop() {
        let mut backend = RecordingBackend::new();
        let mut eq = ThreeBandEq::new(Channel::B);
        eq.restore(&mut backend, Band::High).unwrap();
        assert!(backend.log.is_empty());
    }

    #[test]
    fn test_presets() {
        let mut backend = RecordingBackend::new();
        let mut eq = ThreeBandEq::new(Channel::A);
        eq.apply_preset(&mut backend, "club".parse().unwrap()).unwrap();
        assert_eq!(eq.band(Band::Low).gain_db, 6.0);
        assert_eq!(eq.band(Band::Mid).gain_db, -2.0);
        assert_eq!(eq.band(Band::High).gain_db, 4.0);

        eq.reset(&mut backend).unwrap();
        assert!(Band::ALL.iter().all(|&b| eq.band(b).gain_db == 0.0));
        assert_eq!("Bass-Boost".parse::<EqPreset>().unwrap(), EqPreset::BassBoost);
        assert!("loud".parse::<EqPreset>().is_err());
    }

    #[test]
    fn test_bass_swap() {
        let curve = bass_swap_curve(0.0, -100.0, BASS_SWAP_STEPS);
        assert_eq!(curve.len(), 21);
        assert_eq!(curve[0], (0.0, -100.0));
        assert_eq!(curve[10], (-50.0, -50.0));
        assert_eq!(curve[20], (-100.0, 0.0));

        let mut backend = RecordingBackend::new();
        backend.advance(5.0);
        let mut a = ThreeBandEq::new(Channel::A);
        let mut b = ThreeBandEq::new(Channel::B);
        b.set_gain(&mut backend, Band::Low, -12.0).unwrap();
        backend.log.clear();

        bass_swap(&mut a, &mut b, &mut backend, 2.0).unwrap();
        assert_eq!(backend.log.len(), 42);
        assert_eq!(a.band(Band::Low).gain_db, -12.0);
        assert_eq!(b.band(Band::Low).gain_db, 0.0);
        match backend.log.last() {
            Some(Automation::BandGain { channel, at, .. }) => {
                assert_eq!(*channel, Channel::B);
                assert!((at - 7.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
