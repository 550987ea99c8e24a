pub mod energy;
pub mod key;
pub mod recency;
pub mod tempo;

use std::cmp::Ordering;

use serde::Serialize;

use crate::db::models::{PlayHistoryEntry, Track};
use crate::settings::{AutoDjSettings, ScoringProfile};

/// Reason given when a track is scored against itself.
pub const CURRENTLY_PLAYING: &str = "Currently playing";

/// A candidate with its composite score and per-axis breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTrack {
    pub track: Track,
    pub total_score: u8,
    pub harmonic_score: u8,
    pub bpm_score: u8,
    pub energy_score: u8,
    pub recency_score: u8,
    /// "harmonic | bpm | energy".
    pub reason: String,
    pub harmonic_reason: String,
    pub bpm_reason: String,
    pub energy_reason: String,
}

impl ScoredTrack {
    fn currently_playing(track: &Track) -> Self {
        Self {
            track: track.clone(),
            total_score: 0,
            harmonic_score: 0,
            bpm_score: 0,
            energy_score: 0,
            recency_score: 0,
            reason: CURRENTLY_PLAYING.to_string(),
            harmonic_reason: String::new(),
            bpm_reason: String::new(),
            energy_reason: String::new(),
        }
    }
}

fn to_score(v: f64) -> u8 {
    v.round().clamp(0.0, 100.0) as u8
}

/// Score one candidate against the current track.
pub fn score_track(
    current: &Track,
    candidate: &Track,
    history: &[PlayHistoryEntry],
    settings: &AutoDjSettings,
) -> ScoredTrack {
    score_with_profile(current, candidate, history, &settings.profile())
}

pub fn score_with_profile(
    current: &Track,
    candidate: &Track,
    history: &[PlayHistoryEntry],
    profile: &ScoringProfile,
) -> ScoredTrack {
    if candidate.id == current.id {
        return ScoredTrack::currently_playing(candidate);
    }

    let from_key = current.musical_key.as_deref();
    let to_key = candidate.musical_key.as_deref();
    let harmonic = key::key_compatibility_score(from_key, to_key);

    let from_bpm = current.bpm.unwrap_or(0.0);
    let to_bpm = candidate.bpm.unwrap_or(0.0);
    // Unknown BPM counts as 0 for the strict cap
    let bpm = profile
        .bpm_policy
        .apply(tempo::bpm_compatibility_score(from_bpm, to_bpm), (to_bpm - from_bpm).abs());

    let from_energy = current.energy_level.unwrap_or(0);
    let to_energy = candidate.energy_level.unwrap_or(0);
    let energy = energy::energy_flow_score(from_energy, to_energy, profile.energy_style);

    let recency = recency::recency_score(candidate.id, history, profile.recency_limit);

    let w = profile.weights.weights();
    let total = harmonic * w.harmonic + bpm * w.bpm + energy * w.energy + recency * w.recency;

    let harmonic_reason = key::key_compatibility_reason(from_key, to_key);
    let bpm_reason = tempo::bpm_compatibility_reason(from_bpm, to_bpm);
    let energy_reason = energy::energy_flow_reason(from_energy, to_energy, profile.energy_style);

    ScoredTrack {
        track: candidate.clone(),
        total_score: to_score(total),
        harmonic_score: to_score(harmonic),
        bpm_score: to_score(bpm),
        energy_score: to_score(energy),
        recency_score: to_score(recency),
        reason: format!("{harmonic_reason} | {bpm_reason} | {energy_reason}"),
        harmonic_reason,
        bpm_reason,
        energy_reason,
    }
}

/// Best first. Equal totals go to the fresher track, then the better
/// harmonic fit, then the lower id.
fn rank_order(a: &ScoredTrack, b: &ScoredTrack) -> Ordering {
    b.total_score
        .cmp(&a.total_score)
        .then_with(|| b.recency_score.cmp(&a.recency_score))
        .then_with(|| b.harmonic_score.cmp(&a.harmonic_score))
        .then_with(|| a.track.id.cmp(&b.track.id))
}

/// Score every analysed candidate other than the current track, best first.
pub fn score_all_tracks(
    current: &Track,
    catalog: &[Track],
    history: &[PlayHistoryEntry],
    settings: &AutoDjSettings,
) -> Vec<ScoredTrack> {
    let profile = settings.profile();
    let mut scored: Vec<ScoredTrack> = catalog
        .iter()
        .filter(|t| t.id != current.id && t.is_scorable())
        .map(|t| score_with_profile(current, t, history, &profile))
        .collect();
    scored.sort_by(rank_order);
    scored
}

/// Highest ranked entry whose energy is within ±1 of `target`.
pub fn pick_by_energy(ranked: &[ScoredTrack], target: u8) -> Option<&ScoredTrack> {
    ranked.iter().find(|st| {
        st.track
            .energy_level
            .is_some_and(|e| (e as i32 - target as i32).abs() <= 1)
    })
}

pub fn find_track_by_energy(
    current: &Track,
    catalog: &[Track],
    history: &[PlayHistoryEntry],
    settings: &AutoDjSettings,
    target: u8,
) -> Option<ScoredTrack> {
    let ranked = score_all_tracks(current, catalog, history, settings);
    pick_by_energy(&ranked, target).cloned()
}
