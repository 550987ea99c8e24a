use super::MixerError;
use super::backend::AudioBackend;
use crate::beatgrid::quantize::{NoteLength, TempoGrid};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slip {
    started_at: f64,
    start_position: f64,
}

/// Keeps a virtual playhead running while the audible one is diverted.
#[derive(Debug, Clone, Default)]
pub struct SlipMode {
    slip: Option<Slip>,
}

impl SlipMode {
    pub fn is_slipping(&self) -> bool {
        self.slip.is_some()
    }

    /// Returns false if already slipping.
    pub fn enter<B: AudioBackend + ?Sized>(&mut self, backend: &B) -> bool {
        if self.slip.is_some() {
            return false;
        }
        self.slip = Some(Slip {
            started_at: backend.current_time(),
            start_position: backend.playback_position(),
        });
        true
    }

    /// Where the track would be had it never slipped.
    pub fn virtual_position<B: AudioBackend + ?Sized>(&self, backend: &B) -> Option<f64> {
        self.slip
            .map(|s| s.start_position + (backend.current_time() - s.started_at))
    }

    /// How far the audible playhead trails the virtual one.
    pub fn offset<B: AudioBackend + ?Sized>(&self, backend: &B) -> f64 {
        self.virtual_position(backend)
            .map_or(0.0, |v| v - backend.playback_position())
    }

    /// Seek to the virtual position. `Ok(None)` if not slipping.
    pub fn exit<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<Option<f64>, MixerError> {
        let Some(target) = self.virtual_position(backend) else {
            return Ok(None);
        };
        backend.seek(target)?;
        self.slip = None;
        Ok(Some(target))
    }

    pub fn toggle<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<bool, MixerError> {
        if self.is_slipping() {
            Ok(self.exit(backend)?.is_some())
        } else {
            Ok(self.enter(backend))
        }
    }
}

/// Momentary beat-length loop that slips back to the running timeline on release.
#[derive(Debug, Clone, Default)]
pub struct LoopRoll {
    slip: SlipMode,
    region: Option<(f64, f64)>,
}

impl LoopRoll {
    pub fn is_active(&self) -> bool {
        self.region.is_some()
    }

    pub fn region(&self) -> Option<(f64, f64)> {
        self.region
    }

    /// Loop `length` starting at the grid line at or before the playhead.
    /// Engaging again while rolling just changes the loop length.
    pub fn engage<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        grid: &TempoGrid,
        length: NoteLength,
    ) -> Result<(f64, f64), MixerError> {
        let position = backend.playback_position();
        let start = grid.previous(position, length).max(0.0);
        let region = (start, start + length.seconds(grid.bpm()));
        backend.set_loop_region(Some(region))?;
        self.slip.enter(backend);
        self.region = Some(region);
        log::debug!("Loop roll {length} at {:.3}s", region.0);
        Ok(region)
    }

    /// Drop the loop and jump to where playback would have been.
    pub fn release<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<Option<f64>, MixerError> {
        if self.region.is_none() {
            return Ok(None);
        }
        backend.set_loop_region(None)?;
        self.region = None;
        self.slip.exit(backend)
    }
}
