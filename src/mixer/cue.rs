use super::MixerError;
use super::backend::{AudioBackend, Input, SourceHandle};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueConfig {
    pub enabled: bool,
    /// 0 = all cue, 1 = all master. Ignored in split mode.
    pub mix_level: f64,
    /// Left ear cue, right ear master.
    pub split_cue: bool,
    pub volume: f64,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mix_level: 0.0,
            split_cue: true,
            volume: 0.8,
        }
    }
}

/// Gains the backend applies to the headphone bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueRouting {
    pub split: bool,
    pub cue_gain: f64,
    pub master_gain: f64,
    pub headphone_gain: f64,
}

impl CueConfig {
    pub fn routing(&self) -> CueRouting {
        let (cue_gain, master_gain) = if self.split_cue {
            (1.0, 1.0)
        } else {
            (1.0 - self.mix_level, self.mix_level)
        };
        CueRouting {
            split: self.split_cue,
            cue_gain,
            master_gain,
            headphone_gain: if self.enabled { self.volume } else { 0.0 },
        }
    }
}

/// Pre-listen routing for the DJ's headphones.
#[derive(Debug, Clone, Default)]
pub struct HeadphoneCue {
    config: CueConfig,
    source: Option<SourceHandle>,
}

impl HeadphoneCue {
    pub fn config(&self) -> CueConfig {
        self.config
    }

    pub fn source(&self) -> Option<&SourceHandle> {
        self.source.as_ref()
    }

    fn push<B: AudioBackend + ?Sized>(&self, backend: &mut B) -> Result<CueRouting, MixerError> {
        let routing = self.config.routing();
        backend.set_cue_routing(&routing)?;
        Ok(routing)
    }

    pub fn set_enabled<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        enabled: bool,
    ) -> Result<CueRouting, MixerError> {
        self.config.enabled = enabled;
        self.push(backend)
    }

    pub fn set_mix_level<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        level: f64,
    ) -> Result<CueRouting, MixerError> {
        self.config.mix_level = level.clamp(0.0, 1.0);
        self.push(backend)
    }

    pub fn set_split_cue<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        split: bool,
    ) -> Result<CueRouting, MixerError> {
        self.config.split_cue = split;
        self.push(backend)
    }

    pub fn set_volume<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        volume: f64,
    ) -> Result<CueRouting, MixerError> {
        self.config.volume = volume.clamp(0.0, 1.0);
        self.push(backend)
    }

    /// Route a track into the cue bus for preview.
    pub fn load<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        source: Option<SourceHandle>,
    ) -> Result<(), MixerError> {
        backend.connect_source(Input::Cue, source.as_ref())?;
        self.source = source;
        self.push(backend)?;
        Ok(())
    }
}
