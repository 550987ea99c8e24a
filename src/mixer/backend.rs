use super::MixerError;
use super::cue::CueRouting;
use super::limiter::LimiterParams;

type Result<T> = std::result::Result<T, MixerError>;

/// One of the two playback decks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    A,
    B,
}

impl Channel {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Low,
    Mid,
    High,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Low, Band::Mid, Band::High];

    /// Centre frequency of the peaking stage, Hz.
    pub fn frequency(self) -> f64 {
        match self {
            Self::Low => 100.0,
            Self::Mid => 1_000.0,
            Self::High => 10_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    HighPass,
    LowPass,
}

/// How a parameter reaches its new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ramp {
    Instant,
    /// Exponential approach with this time constant, seconds.
    TimeConstant(f64),
}

/// Where an audio source plugs into the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    Deck(Channel),
    Cue,
}

/// Opaque handle to a decodable audio source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHandle {
    pub name: String,
}

/// The real-time audio graph the mixing logic drives.
///
/// Implementations own the actual DSP; this side only schedules parameter
/// changes against the backend's clock.
pub trait AudioBackend {
    /// Backend clock, seconds.
    fn current_time(&self) -> f64;
    /// Position of the master deck within its track, seconds.
    fn playback_position(&self) -> f64;

    fn set_band_gain(
        &mut self,
        channel: Channel,
        band: Band,
        db: f64,
        at: f64,
        ramp: Ramp,
    ) -> Result<()>;
    fn set_filter_frequency(&mut self, kind: FilterKind, hz: f64, resonance: f64) -> Result<()>;
    fn set_limiter(&mut self, params: &LimiterParams) -> Result<()>;
    /// Music gain target for sidechain ducking.
    fn set_duck_target(&mut self, gain: f64, time_constant: f64) -> Result<()>;
    /// Linear gain ramp on a deck between two backend times.
    fn ramp_channel_gain(
        &mut self,
        channel: Channel,
        from: f64,
        to: f64,
        start: f64,
        end: f64,
    ) -> Result<()>;
    fn set_loop_region(&mut self, region: Option<(f64, f64)>) -> Result<()>;
    fn seek(&mut self, position: f64) -> Result<()>;
    fn connect_source(&mut self, input: Input, source: Option<&SourceHandle>) -> Result<()>;
    fn set_cue_routing(&mut self, routing: &CueRouting) -> Result<()>;
    /// Start capturing the microphone. Fails when access is denied.
    fn open_microphone(&mut self) -> Result<()>;
    fn close_microphone(&mut self);
    /// Tear down every edge in the graph.
    fn disconnect_all(&mut self);
}

/// A scheduled parameter change, as seen by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Automation {
    BandGain { channel: Channel, band: Band, db: f64, at: f64, ramp: Ramp },
    Filter { kind: FilterKind, hz: f64, resonance: f64 },
    Limiter(LimiterParams),
    DuckTarget { gain: f64, time_constant: f64 },
    ChannelRamp { channel: Channel, from: f64, to: f64, start: f64, end: f64 },
    LoopRegion(Option<(f64, f64)>),
    Seek(f64),
    Connect { input: Input, source: String },
    CueRouting(CueRouting),
    MicOpened,
    MicClosed,
    Disconnected,
}

/// In-memory backend with a manual clock. Records every automation call
/// and tracks playback position as the clock advances.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    now: f64,
    position: f64,
    loop_region: Option<(f64, f64)>,
    mic_denied: bool,
    pub log: Vec<Automation>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose microphone permission is refused.
    pub fn without_microphone() -> Self {
        Self {
            mic_denied: true,
            ..Self::default()
        }
    }

    /// Move the clock forward; playback follows, wrapping inside an active loop.
    pub fn advance(&mut self, secs: f64) {
        self.now += secs;
        self.position += secs;
        if let Some((start, end)) = self.loop_region {
            let len = end - start;
            if len > 0.0 && self.position >= end {
                self.position = start + (self.position - start) % len;
            }
        }
    }

    pub fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    pub fn loop_region(&self) -> Option<(f64, f64)> {
        self.loop_region
    }

    /// Most recent automation entries matching `pred`.
    pub fn last_matching(&self, pred: impl Fn(&Automation) -> bool) -> Option<&Automation> {
        self.log.iter().rev().find(|a| pred(a))
    }
}

impl AudioBackend for RecordingBackend {
    fn current_time(&self) -> f64 {
        self.now
    }

    fn playback_position(&self) -> f64 {
        self.position
    }

    fn set_band_gain(
        &mut self,
        channel: Channel,
        band: Band,
        db: f64,
        at: f64,
        ramp: Ramp,
    ) -> Result<()> {
        self.log.push(Automation::BandGain { channel, band, db, at, ramp });
        Ok(())
    }

    fn set_filter_frequency(&mut self, kind: FilterKind, hz: f64, resonance: f64) -> Result<()> {
        self.log.push(Automation::Filter { kind, hz, resonance });
        Ok(())
    }

    fn set_limiter(&mut self, params: &LimiterParams) -> Result<()> {
        self.log.push(Automation::Limiter(*params));
        Ok(())
    }

    fn set_duck_target(&mut self, gain: f64, time_constant: f64) -> Result<()> {
        self.log.push(Automation::DuckTarget { gain, time_constant });
        Ok(())
    }

    fn ramp_channel_gain(
        &mut self,
        channel: Channel,
        from: f64,
        to: f64,
        start: f64,
        end: f64,
    ) -> Result<()> {
        self.log.push(Automation::ChannelRamp { channel, from, to, start, end });
        Ok(())
    }

    fn set_loop_region(&mut self, region: Option<(f64, f64)>) -> Result<()> {
        self.loop_region = region;
        self.log.push(Automation::LoopRegion(region));
        Ok(())
    }

    fn seek(&mut self, position: f64) -> Result<()> {
        self.position = position;
        self.log.push(Automation::Seek(position));
        Ok(())
    }

    fn connect_source(&mut self, input: Input, source: Option<&SourceHandle>) -> Result<()> {
        let source = source.ok_or(MixerError::NullSource(input))?;
        self.log.push(Automation::Connect {
            input,
            source: source.name.clone(),
        });
        Ok(())
    }

    fn set_cue_routing(&mut self, routing: &CueRouting) -> Result<()> {
        self.log.push(Automation::CueRouting(*routing));
        Ok(())
    }

    fn open_microphone(&mut self) -> Result<()> {
        if self.mic_denied {
            return Err(MixerError::MicUnavailable("permission denied".into()));
        }
        self.log.push(Automation::MicOpened);
        Ok(())
    }

    fn close_microphone(&mut self) {
        self.log.push(Automation::MicClosed);
    }

    fn disconnect_all(&mut self) {
        self.loop_region = None;
        self.log.push(Automation::Disconnected);
    }
}
