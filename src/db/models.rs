use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a track is in the background analysis lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Analyzing,
    Complete,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Analyzing => "analyzing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "analyzing" => Ok(Self::Analyzing),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown analysis status '{other}'")),
        }
    }
}

/// Data for inserting a catalog entry (scan or manual add).
#[derive(Debug, Clone, Default)]
pub struct NewTrack {
    pub file_path: Option<String>,
    pub title: String,
    pub artist: Option<String>,
    pub duration_secs: f64,
    pub bpm: Option<f64>,
    pub musical_key: Option<String>,
    pub energy_level: Option<u8>,
}

impl NewTrack {
    /// Tracks arriving with every analysis field already filled (from tags
    /// or by hand) skip the pending state.
    pub fn initial_status(&self) -> AnalysisStatus {
        if self.bpm.is_some() && self.musical_key.is_some() && self.energy_level.is_some() {
            AnalysisStatus::Complete
        } else {
            AnalysisStatus::Pending
        }
    }
}

/// A catalog track read from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub title: String,
    pub artist: Option<String>,
    pub file_path: Option<String>,
    /// Seconds.
    pub duration: f64,
    pub bpm: Option<f64>,
    pub musical_key: Option<String>,
    /// 1-10.
    pub energy_level: Option<u8>,
    pub analysis_status: AnalysisStatus,
}

impl Track {
    /// Complete analysis with BPM, key and energy all present.
    pub fn is_scorable(&self) -> bool {
        self.analysis_status == AnalysisStatus::Complete
            && self.bpm.is_some_and(|b| b > 0.0)
            && self.musical_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            && self.energy_level.is_some_and(|e| e > 0)
    }

    /// "Artist - Title", or just the title.
    pub fn display_name(&self) -> String {
        match &self.artist {
            Some(artist) if !artist.is_empty() => format!("{} - {}", artist, self.title),
            _ => self.title.clone(),
        }
    }
}

/// Analysis results written back onto a track.
#[derive(Debug, Clone, Default)]
pub struct TrackAnalysis {
    pub bpm: Option<f64>,
    pub musical_key: Option<String>,
    pub energy_level: Option<u8>,
}

/// One row of play history. Never mutated once written.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayHistoryEntry {
    pub track_id: i64,
    pub played_at: DateTime<Utc>,
    pub auto_selected: bool,
}

/// Library statistics.
#[derive(Debug)]
pub struct LibraryStats {
    pub total_tracks: i64,
    pub scorable_tracks: i64,
    pub total_duration_hours: f64,
    pub plays: i64,
    pub auto_selected_plays: i64,
    pub by_status: Vec<(String, i64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzed() -> Track {
        Track {
            id: 1,
            title: "Night Drive".into(),
            artist: Some("Kavinsky".into()),
            file_path: None,
            duration: 240.0,
            bpm: Some(124.0),
            musical_key: Some("A Minor".into()),
            energy_level: Some(6),
            analysis_status: AnalysisStatus::Complete,
        }
    }

    #[test]
    fn test_scorable_requires_all_fields() {
        assert!(analyzed().is_scorable());

        let mut t = analyzed();
        t.analysis_status = AnalysisStatus::Analyzing;
        assert!(!t.is_scorable());

        let mut t = analyzed();
        t.bpm = None;
        assert!(!t.is_scorable());

        let mut t = analyzed();
        t.musical_key = Some("  ".into());
        assert!(!t.is_scorable());

        let mut t = analyzed();
        t.energy_level = Some(0);
        assert!(!t.is_scorable());
    }

    #[test]
    fn test_initial_status() {
        let mut t = NewTrack {
            title: "x".into(),
            bpm: Some(120.0),
            musical_key: Some("C Major".into()),
            ..Default::default()
        };
        assert_eq!(t.initial_status(), AnalysisStatus::Pending);
        t.energy_level = Some(4);
        assert_eq!(t.initial_status(), AnalysisStatus::Complete);
    }

    #[test]
    fn test_status_roundtrip_strings() {
        for s in ["pending", "analyzing", "complete", "failed"] {
            assert_eq!(s.parse::<AnalysisStatus>().unwrap().as_str(), s);
        }
        assert!("done".parse::<AnalysisStatus>().is_err());
    }
}
