use super::MixerError;
use super::backend::{AudioBackend, Channel, Input, SourceHandle};

pub const MAX_CROSSFADE_SECS: f64 = 10.0;
pub const DEFAULT_CROSSFADE_SECS: f64 = 5.0;
/// Tail window searched for a natural fade-out, seconds.
pub const ANALYZE_WINDOW_SECS: f64 = 10.0;
pub const SILENCE_THRESHOLD: f32 = 0.01;
/// Silence must last this long to count as the end of the track, seconds.
pub const SILENCE_MIN_SECS: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossfadeConfig {
    pub enabled: bool,
    pub duration: f64,
}

impl Default for CrossfadeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: DEFAULT_CROSSFADE_SECS,
        }
    }
}

impl CrossfadeConfig {
    pub fn new(enabled: bool, duration: f64) -> Self {
        Self {
            enabled,
            duration: clamp_duration(duration),
        }
    }
}

fn clamp_duration(secs: f64) -> f64 {
    if secs.is_finite() { secs.clamp(0.0, MAX_CROSSFADE_SECS) } else { 0.0 }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fade {
    outgoing: Channel,
    from_gain: f64,
    start: f64,
    end: f64,
}

/// Two-deck transition manager with linear gain ramps.
#[derive(Debug, Clone)]
pub struct Crossfader {
    config: CrossfadeConfig,
    live: Channel,
    playing: bool,
    fade: Option<Fade>,
    next: Option<SourceHandle>,
    scheduled_at: Option<f64>,
}

impl Crossfader {
    pub fn new(config: CrossfadeConfig) -> Self {
        Self {
            config,
            live: Channel::A,
            playing: false,
            fade: None,
            next: None,
            scheduled_at: None,
        }
    }

    pub fn config(&self) -> CrossfadeConfig {
        self.config
    }

    pub fn set_duration(&mut self, secs: f64) -> f64 {
        self.config.duration = clamp_duration(secs);
        self.config.duration
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// The deck currently carrying the programme.
    pub fn live_channel(&self) -> Channel {
        self.live
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn scheduled_at(&self) -> Option<f64> {
        self.scheduled_at
    }

    /// Deck gain at backend time `t`, following any fade in progress.
    pub fn channel_gain(&self, channel: Channel, t: f64) -> f64 {
        if !self.playing {
            return 0.0;
        }
        match self.fade {
            Some(f) if t < f.end => {
                let p = ((t - f.start) / (f.end - f.start)).clamp(0.0, 1.0);
                if channel == f.outgoing {
                    f.from_gain * (1.0 - p)
                } else {
                    p
                }
            }
            _ if channel == self.live => 1.0,
            _ => 0.0,
        }
    }

    pub fn is_fading(&self, t: f64) -> bool {
        self.fade.is_some_and(|f| t < f.end)
    }

    /// Start `source` on the idle deck. With `crossfade` set and a track
    /// already playing, the two decks ramp across; otherwise the new deck
    /// cuts in at full gain.
    pub fn start_playback<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        source: Option<&SourceHandle>,
        crossfade: bool,
    ) -> Result<Channel, MixerError> {
        let now = backend.current_time();
        let incoming = if self.playing { self.live.other() } else { self.live };
        backend.connect_source(Input::Deck(incoming), source)?;

        let duration = self.config.duration;
        if crossfade && self.playing && self.config.enabled && duration > 0.0 {
            let outgoing = self.live;
            let from_gain = self.channel_gain(outgoing, now);
            let end = now + duration;
            backend.ramp_channel_gain(outgoing, from_gain, 0.0, now, end)?;
            backend.ramp_channel_gain(incoming, 0.0, 1.0, now, end)?;
            self.fade = Some(Fade {
                outgoing,
                from_gain,
                start: now,
                end,
            });
            log::info!("Crossfading {outgoing:?} -> {incoming:?} over {duration:.1}s");
        } else {
            backend.ramp_channel_gain(incoming, 1.0, 1.0, now, now)?;
            if self.playing {
                backend.ramp_channel_gain(self.live, 0.0, 0.0, now, now)?;
            }
            self.fade = None;
        }

        self.live = incoming;
        self.playing = true;
        Ok(incoming)
    }

    /// Hold the next track until a scheduled transition fires.
    pub fn preload(&mut self, source: SourceHandle) {
        self.next = Some(source);
    }

    /// Arm a crossfade `delay` seconds from now. Needs crossfading enabled
    /// and a preloaded track; re-scheduling replaces the earlier time.
    pub fn schedule<B: AudioBackend + ?Sized>(&mut self, backend: &B, delay: f64) -> bool {
        if !self.config.enabled || self.next.is_none() {
            return false;
        }
        self.scheduled_at = Some(backend.current_time() + delay.max(0.0));
        true
    }

    /// Fire a due scheduled crossfade. Returns the deck that took over.
    pub fn poll<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<Option<Channel>, MixerError> {
        match self.scheduled_at {
            Some(at) if backend.current_time() >= at => {
                self.scheduled_at = None;
                let Some(next) = self.next.take() else {
                    return Ok(None);
                };
                self.start_playback(backend, Some(&next), true).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Silence both decks and drop anything scheduled.
    pub fn stop<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) -> Result<(), MixerError> {
        self.scheduled_at = None;
        self.next = None;
        self.fade = None;
        if self.playing {
            let now = backend.current_time();
            self.playing = false;
            backend.ramp_channel_gain(Channel::A, 0.0, 0.0, now, now)?;
            backend.ramp_channel_gain(Channel::B, 0.0, 0.0, now, now)?;
        }
        Ok(())
    }
}

/// Where a crossfade out of this track should begin, in seconds.
///
/// Looks for half a second of near-silence in the last ten seconds of the
/// first channel and ends the fade where it starts; without one, the fade
/// ends with the track.
pub fn find_crossfade_point(samples: &[f32], sample_rate: u32, crossfade_secs: f64) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    let sr = f64::from(sample_rate);
    let duration = samples.len() as f64 / sr;
    let window = ANALYZE_WINDOW_SECS.min(duration);
    let start = ((duration - window) * sr).floor().max(0.0) as usize;
    let required = ((sr * SILENCE_MIN_SECS) as usize).max(1);

    let mut silent = 0usize;
    let mut fade_out = duration;
    for (i, s) in samples.iter().enumerate().skip(start) {
        if s.abs() < SILENCE_THRESHOLD {
            silent += 1;
            if silent >= required {
                fade_out = (i + 1 - required) as f64 / sr;
                break;
            }
        } else {
            silent = 0;
        }
    }
    (fade_out - crossfade_secs).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::backend::{Automation, RecordingBackend};

    fn source(name: &str) -> SourceHandle {
        SourceHandle { name: name.into() }
    }

    #[test]
    fn test_first_track_cuts_in() {
        let mut backend = RecordingBackend::new();
        let mut xf = Crossfader::new(CrossfadeConfig::default());
        let deck = xf.start_playback(&mut backend, Some(&source("one")), true).unwrap();
        assert_eq!(deck, Channel::A);
        assert_eq!(xf.channel_gain(Channel::A, 0.0), 1.0);
        assert!(!xf.is_fading(0.0));
    }

    #[test]
    fn test_linear_crossfade() {
        let mut backend = RecordingBackend::new();
        let mut xf = Crossfader::new(CrossfadeConfig::new(true, 4.0));
        xf.start_playback(&mut backend, Some(&source("one")), false).unwrap();
        backend.advance(100.0);

        let deck = xf.start_playback(&mut backend, Some(&source("two")), true).unwrap();
        assert_eq!(deck, Channel::B);
        assert_eq!(
            backend.log.last(),
            Some(&Automation::ChannelRamp {
                channel: Channel::B,
                from: 0.0,
                to: 1.0,
                start: 100.0,
                end: 104.0,
            })
        );
        assert_eq!(xf.channel_gain(Channel::A, 101.0), 0.75);
        assert_eq!(xf.channel_gain(Channel::B, 101.0), 0.25);
        assert!(xf.is_fading(103.9));
        assert_eq!(xf.channel_gain(Channel::A, 104.0), 0.0);
        assert_eq!(xf.channel_gain(Channel::B, 104.0), 1.0);
    }

    #[test]
    fn test_disabled_is_direct() {
        let mut backend = RecordingBackend::new();
        let mut xf = Crossfader::new(CrossfadeConfig::new(false, 4.0));
        xf.start_playback(&mut backend, Some(&source("one")), false).unwrap();
        xf.start_playback(&mut backend, Some(&source("two")), true).unwrap();
        assert!(!xf.is_fading(0.0));
        assert_eq!(xf.channel_gain(Channel::B, 0.0), 1.0);
        assert_eq!(xf.channel_gain(Channel::A, 0.0), 0.0);
    }

    #[test]
    fn test_schedule_and_poll() {
        let mut backend = RecordingBackend::new();
        let mut xf = Crossfader::new(CrossfadeConfig::default());
        xf.start_playback(&mut backend, Some(&source("one")), false).unwrap();

        assert!(!xf.schedule(&backend, 10.0), "nothing preloaded");
        xf.preload(source("two"));
        assert!(xf.schedule(&backend, 10.0));

        backend.advance(9.0);
        assert_eq!(xf.poll(&mut backend).unwrap(), None);
        backend.advance(1.0);
        assert_eq!(xf.poll(&mut backend).unwrap(), Some(Channel::B));
        assert!(xf.is_fading(backend.current_time()));
        assert_eq!(xf.poll(&mut backend).unwrap(), None);
    }

    #[test]
    fn test_null_source_leaves_state() {
        let mut backend = RecordingBackend::new();
        let mut xf = Crossfader::new(CrossfadeConfig::default());
        assert!(xf.start_playback(&mut backend, None, false).is_err());
        assert!(!xf.is_playing());
    }

    #[test]
    fn test_duration_clamped() {
        assert_eq!(CrossfadeConfig::new(true, 25.0).duration, 10.0);
        let mut xf = Crossfader::new(CrossfadeConfig::default());
        assert_eq!(xf.set_duration(-1.0), 0.0);
    }

    #[test]
    fn test_find_crossfade_point() {
        let sr = 100;
        let mut samples = vec![0.5f32; 15 * sr as usize];
        samples.extend(vec![0.0f32; 5 * sr as usize]);
        assert!((find_crossfade_point(&samples, sr, 5.0) - 10.0).abs() < 1e-9);

        let loud = vec![0.5f32; 20 * sr as usize];
        assert!((find_crossfade_point(&loud, sr, 5.0) - 15.0).abs() < 1e-9);

        // Silence before the analysed tail is ignored
        let mut early = vec![0.0f32; 5 * sr as usize];
        early.extend(vec![0.5f32; 15 * sr as usize]);
        assert!((find_crossfade_point(&early, sr, 5.0) - 15.0).abs() < 1e-9);

        assert_eq!(find_crossfade_point(&[0.5; 300], sr, 5.0), 0.0);
    }
}
