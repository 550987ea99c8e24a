pub mod backend;
pub mod crossfade;
pub mod cue;
pub mod eq;
pub mod filter;
pub mod limiter;
pub mod loop_roll;
pub mod sidechain;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::beatgrid::quantize::{NoteLength, TempoGrid};
use backend::{AudioBackend, Band, Channel, FilterKind, Input, SourceHandle};
use crossfade::{CrossfadeConfig, Crossfader};
use cue::{CueRouting, HeadphoneCue};
use eq::{EqPreset, ThreeBandEq};
use filter::FilterKnobs;
use limiter::MasterLimiter;
use loop_roll::LoopRoll;
use sidechain::{Sidechain, SidechainConfig, SidechainPreset};

#[derive(Debug, Error)]
pub enum MixerError {
    #[error("microphone unavailable: {0}")]
    MicUnavailable(String),

    #[error("no audio source to connect to {0:?}")]
    NullSource(Input),
}

/// `[mixer]` section of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    pub crossfade_enabled: bool,
    pub crossfade_secs: f64,
    pub sidechain_enabled: bool,
    pub sidechain_preset: SidechainPreset,
    pub limiter_threshold_db: f64,
    pub eq_preset: EqPreset,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            crossfade_enabled: true,
            crossfade_secs: crossfade::DEFAULT_CROSSFADE_SECS,
            sidechain_enabled: false,
            sidechain_preset: SidechainPreset::default(),
            limiter_threshold_db: limiter::LimiterParams::default().threshold_db,
            eq_preset: EqPreset::Flat,
        }
    }
}

/// The full two-deck chain: per-deck EQ, master filters and limiter,
/// mic ducking, crossfader, loop roll and headphone cue.
///
/// Sub-chains fail independently: an error from one is returned to the
/// caller and leaves the others as they were.
pub struct SignalChain<B: AudioBackend> {
    backend: B,
    settings: MixerSettings,
    eq_a: ThreeBandEq,
    eq_b: ThreeBandEq,
    filters: FilterKnobs,
    limiter: MasterLimiter,
    sidechain: Sidechain,
    crossfader: Crossfader,
    loop_roll: LoopRoll,
    cue: HeadphoneCue,
    torn_down: bool,
}

impl<B: AudioBackend> SignalChain<B> {
    pub fn new(backend: B, settings: &MixerSettings) -> Self {
        Self {
            backend,
            settings: settings.clone(),
            eq_a: ThreeBandEq::new(Channel::A),
            eq_b: ThreeBandEq::new(Channel::B),
            filters: FilterKnobs::default(),
            limiter: MasterLimiter::default(),
            sidechain: Sidechain::new(SidechainConfig::from_preset(
                settings.sidechain_preset,
                settings.sidechain_enabled,
            )),
            crossfader: Crossfader::new(CrossfadeConfig::new(
                settings.crossfade_enabled,
                settings.crossfade_secs,
            )),
            loop_roll: LoopRoll::default(),
            cue: HeadphoneCue::default(),
            torn_down: false,
        }
    }

    /// Push initial state to every sub-chain. Failures are logged and
    /// returned; the remaining sub-chains are still set up.
    pub fn prime(&mut self) -> Vec<MixerError> {
        let preset = self.settings.eq_preset;
        let threshold = self.settings.limiter_threshold_db;
        let results = [
            self.eq_a.apply_preset(&mut self.backend, preset),
            self.eq_b.apply_preset(&mut self.backend, preset),
            self.filters.reset(&mut self.backend),
            self.limiter.set_threshold(&mut self.backend, threshold).map(drop),
            if self.settings.sidechain_enabled {
                self.sidechain.connect_microphone(&mut self.backend)
            } else {
                Ok(())
            },
        ];

        let errors: Vec<MixerError> = results.into_iter().filter_map(Result::err).collect();
        for e in &errors {
            log::warn!("Signal chain: {e}");
        }
        errors
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn eq(&self, channel: Channel) -> &ThreeBandEq {
        match channel {
            Channel::A => &self.eq_a,
            Channel::B => &self.eq_b,
        }
    }

    fn eq_mut(&mut self, channel: Channel) -> (&mut ThreeBandEq, &mut B) {
        match channel {
            Channel::A => (&mut self.eq_a, &mut self.backend),
            Channel::B => (&mut self.eq_b, &mut self.backend),
        }
    }

    pub fn filters(&self) -> &FilterKnobs {
        &self.filters
    }

    pub fn limiter(&self) -> &MasterLimiter {
        &self.limiter
    }

    pub fn sidechain(&self) -> &Sidechain {
        &self.sidechain
    }

    pub fn crossfader(&self) -> &Crossfader {
        &self.crossfader
    }

    pub fn loop_roll(&self) -> &LoopRoll {
        &self.loop_roll
    }

    pub fn cue(&self) -> &HeadphoneCue {
        &self.cue
    }

    // EQ and filters

    pub fn set_eq_gain(
        &mut self,
        channel: Channel,
        band: Band,
        db: f64,
    ) -> Result<f64, MixerError> {
        let (eq, backend) = self.eq_mut(channel);
        eq.set_gain(backend, band, db)
    }

    pub fn toggle_kill(&mut self, channel: Channel, band: Band) -> Result<bool, MixerError> {
        let (eq, backend) = self.eq_mut(channel);
        eq.toggle_kill(backend, band)
    }

    pub fn apply_eq_preset(
        &mut self,
        channel: Channel,
        preset: EqPreset,
    ) -> Result<(), MixerError> {
        let (eq, backend) = self.eq_mut(channel);
        eq.apply_preset(backend, preset)
    }

    /// Flatten a deck's EQ and open the master filters.
    pub fn reset_eq(&mut self, channel: Channel) -> Result<(), MixerError> {
        let (eq, backend) = self.eq_mut(channel);
        eq.reset(backend)?;
        self.filters.reset(&mut self.backend)
    }

    pub fn bass_swap(&mut self, duration: f64) -> Result<(), MixerError> {
        eq::bass_swap(&mut self.eq_a, &mut self.eq_b, &mut self.backend, duration)
    }

    pub fn set_filter_slider(&mut self, kind: FilterKind, slider: f64) -> Result<f64, MixerError> {
        self.filters.set_slider(&mut self.backend, kind, slider)
    }

    pub fn set_limiter_threshold(&mut self, db: f64) -> Result<f64, MixerError> {
        self.limiter.set_threshold(&mut self.backend, db)
    }

    // Sidechain

    pub fn connect_microphone(&mut self) -> Result<(), MixerError> {
        self.sidechain.connect_microphone(&mut self.backend)
    }

    pub fn disconnect_microphone(&mut self) {
        self.sidechain.disconnect_microphone(&mut self.backend);
    }

    pub fn mic_frame(&mut self, samples: &[f32], dt: f64) -> Result<(), MixerError> {
        self.sidechain.process_frame(&mut self.backend, samples, dt)
    }

    pub fn set_sidechain_enabled(&mut self, enabled: bool) -> Result<(), MixerError> {
        self.sidechain.set_enabled(&mut self.backend, enabled)
    }

    // Transport

    /// Start a track, crossfading from whatever is live.
    pub fn play(&mut self, source: Option<&SourceHandle>) -> Result<Channel, MixerError> {
        self.crossfader.start_playback(&mut self.backend, source, true)
    }

    /// Preload `source` and arm a crossfade `delay` seconds from now.
    pub fn queue_next(&mut self, source: SourceHandle, delay: f64) -> bool {
        self.crossfader.preload(source);
        self.crossfader.schedule(&self.backend, delay)
    }

    /// Fire any due scheduled crossfade.
    pub fn poll(&mut self) -> Result<Option<Channel>, MixerError> {
        self.crossfader.poll(&mut self.backend)
    }

    pub fn engage_loop_roll(
        &mut self,
        grid: &TempoGrid,
        length: NoteLength,
    ) -> Result<(f64, f64), MixerError> {
        self.loop_roll.engage(&mut self.backend, grid, length)
    }

    pub fn release_loop_roll(&mut self) -> Result<Option<f64>, MixerError> {
        self.loop_roll.release(&mut self.backend)
    }

    // Headphones

    pub fn load_cue(&mut self, source: Option<SourceHandle>) -> Result<(), MixerError> {
        self.cue.load(&mut self.backend, source)
    }

    pub fn set_cue_enabled(&mut self, enabled: bool) -> Result<CueRouting, MixerError> {
        self.cue.set_enabled(&mut self.backend, enabled)
    }

    pub fn set_cue_mix(&mut self, level: f64) -> Result<CueRouting, MixerError> {
        self.cue.set_mix_level(&mut self.backend, level)
    }

    /// Stop monitoring, silence the decks and drop every connection.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.sidechain.disconnect_microphone(&mut self.backend);
        if let Err(e) = self.loop_roll.release(&mut self.backend) {
            log::warn!("Releasing loop roll: {e}");
        }
        if let Err(e) = self.crossfader.stop(&mut self.backend) {
            log::warn!("Stopping decks: {e}");
        }
        self.backend.disconnect_all();
    }
}

impl<B: AudioBackend> Drop for SignalChain<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
