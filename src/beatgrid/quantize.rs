use std::fmt;
use std::str::FromStr;

use super::BeatGrid;

/// Musical snap/loop length, measured in beats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteLength {
    ThirtySecond,
    Sixteenth,
    Eighth,
    #[default]
    Quarter,
    Half,
    One,
    Two,
    Four,
}

impl NoteLength {
    pub const ALL: [NoteLength; 8] = [
        Self::ThirtySecond,
        Self::Sixteenth,
        Self::Eighth,
        Self::Quarter,
        Self::Half,
        Self::One,
        Self::Two,
        Self::Four,
    ];

    pub fn beats(self) -> f64 {
        match self {
            Self::ThirtySecond => 1.0 / 32.0,
            Self::Sixteenth => 1.0 / 16.0,
            Self::Eighth => 1.0 / 8.0,
            Self::Quarter => 0.25,
            Self::Half => 0.5,
            Self::One => 1.0,
            Self::Two => 2.0,
            Self::Four => 4.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ThirtySecond => "1/32",
            Self::Sixteenth => "1/16",
            Self::Eighth => "1/8",
            Self::Quarter => "1/4",
            Self::Half => "1/2",
            Self::One => "1",
            Self::Two => "2",
            Self::Four => "4",
        }
    }

    pub fn seconds(self, bpm: f64) -> f64 {
        beats_to_seconds(self.beats(), bpm)
    }
}

impl fmt::Display for NoteLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| format!("unknown note length '{s}' (expected 1/32 .. 4)"))
    }
}

pub fn beat_interval(bpm: f64) -> f64 {
    60.0 / bpm
}

pub fn beats_to_seconds(beats: f64, bpm: f64) -> f64 {
    beats * beat_interval(bpm)
}

/// A constant-tempo timeline: BPM plus first-beat offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoGrid {
    bpm: f64,
    offset: f64,
}

impl TempoGrid {
    /// `None` unless BPM is positive and both values are finite.
    pub fn new(bpm: f64, offset: f64) -> Option<Self> {
        (bpm.is_finite() && bpm > 0.0 && offset.is_finite()).then_some(Self { bpm, offset })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    fn snap(&self, time: f64, snap: NoteLength, round: fn(f64) -> f64) -> f64 {
        let step = snap.seconds(self.bpm);
        round((time - self.offset) / step) * step + self.offset
    }

    pub fn nearest(&self, time: f64, snap: NoteLength) -> f64 {
        self.snap(time, snap, f64::round)
    }

    /// Never earlier than `time`.
    pub fn next(&self, time: f64, snap: NoteLength) -> f64 {
        self.snap(time, snap, f64::ceil)
    }

    /// Never later than `time`.
    pub fn previous(&self, time: f64, snap: NoteLength) -> f64 {
        self.snap(time, snap, f64::floor)
    }

    /// Whole beats elapsed since the offset (negative before it).
    pub fn current_beat(&self, time: f64) -> i64 {
        ((time - self.offset) / beat_interval(self.bpm)).floor() as i64
    }

    pub fn time_until_next_beat(&self, time: f64) -> f64 {
        self.next(time, NoteLength::One) - time
    }

    pub fn is_on_beat(&self, time: f64, tolerance: f64) -> bool {
        (self.nearest(time, NoteLength::One) - time).abs() <= tolerance
    }

    /// Beat times in `[0, duration)`.
    pub fn beat_markers(&self, duration: f64) -> Vec<f64> {
        let interval = beat_interval(self.bpm);
        let first = (-self.offset / interval).ceil().max(0.0) as u64;
        (first..)
            .map(|i| self.offset + i as f64 * interval)
            .take_while(|&t| t < duration)
            .collect()
    }
}

impl BeatGrid {
    pub fn tempo_grid(&self) -> Option<TempoGrid> {
        TempoGrid::new(self.bpm, self.offset)
    }
}

/// Default tolerance for `is_on_beat`, seconds.
pub const ON_BEAT_TOLERANCE: f64 = 0.05;
/// Default tolerance for `are_tracks_matched`, BPM.
pub const MATCH_TOLERANCE_BPM: f64 = 2.0;

/// Two decks are matched when their tempos agree and they sit on the same beat count.
pub fn are_tracks_matched(time1: f64, bpm1: f64, time2: f64, bpm2: f64, tolerance: f64) -> bool {
    if (bpm1 - bpm2).abs() > tolerance {
        return false;
    }
    match (TempoGrid::new(bpm1, 0.0), TempoGrid::new(bpm2, 0.0)) {
        (Some(a), Some(b)) => a.current_beat(time1) == b.current_beat(time2),
        _ => false,
    }
}
