use thiserror::Error;

use crate::db::models::{PlayHistoryEntry, Track};
use crate::db::{Database, DbError};
use crate::scoring::{self, ScoredTrack};
use crate::settings::AutoDjSettings;

/// Suggest once playback passes this fraction of the track.
pub const SUGGEST_AT: f64 = 0.50;
/// Commit once playback passes this fraction...
pub const COMMIT_AT: f64 = 0.90;
/// ...or this many seconds remain.
pub const COMMIT_REMAINING_SECS: f64 = 10.0;
/// Minimum number of history rows read for scoring.
const HISTORY_FETCH_MIN: usize = 20;

pub const LOCKED_REASON: &str = "Custom locked track";

/// Operator-facing conditions. None of these are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DjNotice {
    #[error("No track is playing")]
    NoCurrentTrack,
    #[error("Next track already queued")]
    AlreadyQueued,
    #[error("No alternative suggestion available")]
    NoAlternative,
    #[error("No tracks found at energy level {0}")]
    NoTracksAtEnergy(u8),
    #[error("Track {0} cannot be locked (currently playing or not analysed)")]
    NotLockable(i64),
}

/// Where the controller is within the current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DjState {
    Idle,
    SuggestionPending,
    Suggested,
    Queued,
}

impl DjState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SuggestionPending => "suggestion-pending",
            Self::Suggested => "suggested",
            Self::Queued => "queued",
        }
    }
}

/// Source of recent plays, and sink for committed ones.
pub trait PlayHistoryStore {
    type Error: std::fmt::Display;

    /// Most recent first.
    fn recent_plays(&self, limit: usize) -> Result<Vec<PlayHistoryEntry>, Self::Error>;
    fn append_play(&self, track_id: i64, auto_selected: bool) -> Result<(), Self::Error>;
}

impl PlayHistoryStore for Database {
    type Error = DbError;

    fn recent_plays(&self, limit: usize) -> Result<Vec<PlayHistoryEntry>, DbError> {
        self.recent_history(limit)
    }

    fn append_play(&self, track_id: i64, auto_selected: bool) -> Result<(), DbError> {
        self.record_play(track_id, auto_selected).map(|_| ())
    }
}

impl<T: PlayHistoryStore + ?Sized> PlayHistoryStore for &T {
    type Error = T::Error;

    fn recent_plays(&self, limit: usize) -> Result<Vec<PlayHistoryEntry>, T::Error> {
        (**self).recent_plays(limit)
    }

    fn append_play(&self, track_id: i64, auto_selected: bool) -> Result<(), T::Error> {
        (**self).append_play(track_id, auto_selected)
    }
}

/// Receives each committed decision: the next track, why, and its score.
pub trait QueueSink {
    fn queue(&mut self, track: &Track, reason: &str, score: u8);
}

impl<F: FnMut(&Track, &str, u8)> QueueSink for F {
    fn queue(&mut self, track: &Track, reason: &str, score: u8) {
        self(track, reason, score)
    }
}

/// One playback-progress observation.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackTick<'a> {
    pub track: Option<&'a Track>,
    pub is_playing: bool,
    /// Seconds.
    pub position: f64,
    /// Seconds.
    pub duration: f64,
}

/// What a tick changed, for display.
#[derive(Debug, Clone, PartialEq)]
pub enum DjEvent {
    Suggested(ScoredTrack),
    Queued { next: ScoredTrack, reason: String },
    /// Commit point reached with nothing to play next.
    NothingToQueue,
}

/// Decision state for the track currently playing.
#[derive(Debug)]
struct TrackSession {
    track: Track,
    state: DjState,
    ranked: Vec<ScoredTrack>,
    suggestion: Option<ScoredTrack>,
    locked: Option<ScoredTrack>,
}

impl TrackSession {
    fn new(track: Track) -> Self {
        Self {
            track,
            state: DjState::Idle,
            ranked: Vec::new(),
            suggestion: None,
            locked: None,
        }
    }

    /// Suggestion has been generated for this track (or skipped due to a lock).
    fn past_suggest_point(&self) -> bool {
        matches!(self.state, DjState::Suggested | DjState::Queued)
    }
}

/// Per-track Auto-DJ state machine.
///
/// Each track id gets a fresh session; generation and commit fire at most
/// once per session no matter how many ticks arrive. Settings are passed on
/// every call and never cached.
pub struct AutoDj<S, Q> {
    store: S,
    sink: Q,
    session: Option<TrackSession>,
}

impl<S: PlayHistoryStore, Q: QueueSink> AutoDj<S, Q> {
    pub fn new(store: S, sink: Q) -> Self {
        Self {
            store,
            sink,
            session: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &Q {
        &self.sink
    }

    pub fn state(&self) -> DjState {
        self.session.as_ref().map_or(DjState::Idle, |s| s.state)
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.session.as_ref().map(|s| &s.track)
    }

    pub fn suggestion(&self) -> Option<&ScoredTrack> {
        self.session.as_ref()?.suggestion.as_ref()
    }

    pub fn locked(&self) -> Option<&ScoredTrack> {
        self.session.as_ref()?.locked.as_ref()
    }

    pub fn ranked(&self) -> &[ScoredTrack] {
        self.session.as_ref().map_or(&[][..], |s| s.ranked.as_slice())
    }

    /// Feed one progress tick through the state machine.
    pub fn handle_tick(
        &mut self,
        tick: &PlaybackTick<'_>,
        catalog: &[Track],
        settings: &AutoDjSettings,
    ) -> Vec<DjEvent> {
        let Some(track) = tick.track else {
            self.session = None;
            return Vec::new();
        };

        if self.session.as_ref().is_none_or(|s| s.track.id != track.id) {
            log::debug!("Auto-DJ: new track {} ({})", track.id, track.title);
            self.session = Some(TrackSession::new(track.clone()));
        }

        if !settings.enabled || !tick.is_playing || !(tick.duration > 0.0) {
            return Vec::new();
        }

        let progress = tick.position / tick.duration;
        let remaining = tick.duration - tick.position;
        let mut events = Vec::new();

        if progress >= SUGGEST_AT && self.state() == DjState::Idle {
            events.extend(self.enter_suggestion(catalog, settings));
        }

        if (progress >= COMMIT_AT || remaining <= COMMIT_REMAINING_SECS)
            && self.state() != DjState::Queued
        {
            // Short tracks can hit the commit point before the suggest point
            if self.state() == DjState::Idle {
                events.extend(self.enter_suggestion(catalog, settings));
            }
            events.push(self.commit());
        }

        events
    }

    fn enter_suggestion(
        &mut self,
        catalog: &[Track],
        settings: &AutoDjSettings,
    ) -> Option<DjEvent> {
        let session = self.session.as_mut()?;
        session.state = DjState::SuggestionPending;

        if session.locked.is_some() {
            session.state = DjState::Suggested;
            return None;
        }

        let event = self.generate(catalog, settings);
        if let Some(session) = self.session.as_mut() {
            session.state = DjState::Suggested;
        }
        event
    }

    /// Rank the catalog against the current track and keep the best.
    fn generate(&mut self, catalog: &[Track], settings: &AutoDjSettings) -> Option<DjEvent> {
        let history = self.history(settings);
        let session = self.session.as_mut()?;

        session.ranked = scoring::score_all_tracks(&session.track, catalog, &history, settings);
        session.suggestion = session.ranked.first().cloned();

        match &session.suggestion {
            Some(best) => {
                log::info!(
                    "Auto-DJ suggestion: {} (score {})",
                    best.track.display_name(),
                    best.total_score
                );
                Some(DjEvent::Suggested(best.clone()))
            }
            None => {
                log::warn!("Auto-DJ: no analysed candidates for '{}'", session.track.title);
                None
            }
        }
    }

    /// Record the chosen track in history, then hand it to the sink.
    fn commit(&mut self) -> DjEvent {
        let Some(session) = self.session.as_mut() else {
            return DjEvent::NothingToQueue;
        };
        session.state = DjState::Queued;

        let (next, reason, auto_selected) = match (&session.locked, &session.suggestion) {
            (Some(locked), _) => (locked.clone(), LOCKED_REASON.to_string(), false),
            (None, Some(suggested)) => (suggested.clone(), suggested.reason.clone(), true),
            (None, None) => {
                log::warn!("Auto-DJ: nothing to queue after '{}'", session.track.title);
                return DjEvent::NothingToQueue;
            }
        };

        // A lost row only weakens future recency scoring; playback goes on
        if let Err(e) = self.store.append_play(next.track.id, auto_selected) {
            log::error!(
                "Failed to record play history for track {}: {}",
                next.track.id,
                e
            );
        }

        self.sink.queue(&next.track, &reason, next.total_score);
        log::info!("Auto-DJ queued: {}", next.track.display_name());

        DjEvent::Queued { next, reason }
    }

    fn history(&self, settings: &AutoDjSettings) -> Vec<PlayHistoryEntry> {
        let limit = settings.recency_limit.max(HISTORY_FETCH_MIN);
        self.store.recent_plays(limit).unwrap_or_else(|e| {
            log::warn!("Failed to read play history, scoring without it: {}", e);
            Vec::new()
        })
    }

    fn open_session(&mut self) -> Result<&mut TrackSession, DjNotice> {
        let session = self.session.as_mut().ok_or(DjNotice::NoCurrentTrack)?;
        if session.state == DjState::Queued {
            return Err(DjNotice::AlreadyQueued);
        }
        Ok(session)
    }

    /// Confirm the pending suggestion. It is queued at the commit point regardless.
    pub fn accept_suggestion(&self) -> Option<&ScoredTrack> {
        let suggestion = self.suggestion()?;
        log::info!("Suggestion accepted: {}", suggestion.track.display_name());
        Some(suggestion)
    }

    /// Promote the runner-up of the last ranking. Does not re-score.
    pub fn skip(&mut self) -> Result<&ScoredTrack, DjNotice> {
        let session = self.open_session()?;
        let next_best = session.ranked.get(1).cloned().ok_or(DjNotice::NoAlternative)?;
        log::info!(
            "Skipped to next best: {} (score {})",
            next_best.track.display_name(),
            next_best.total_score
        );
        Ok(session.suggestion.insert(next_best))
    }

    /// Pin a specific track as the next one, suppressing auto-suggestion.
    pub fn lock_custom_track(
        &mut self,
        track: &Track,
        settings: &AutoDjSettings,
    ) -> Result<&ScoredTrack, DjNotice> {
        self.open_session()?;
        let history = self.history(settings);
        let session = self.open_session()?;

        let scored = scoring::score_all_tracks(
            &session.track,
            std::slice::from_ref(track),
            &history,
            settings,
        )
        .into_iter()
        .next()
        .ok_or(DjNotice::NotLockable(track.id))?;

        log::info!("Locked custom track: {}", track.display_name());
        session.suggestion = None;
        Ok(session.locked.insert(scored))
    }

    /// Clear the pin. If the suggest point has passed, suggest afresh.
    pub fn unlock_custom_track(
        &mut self,
        catalog: &[Track],
        settings: &AutoDjSettings,
    ) -> Result<Option<&ScoredTrack>, DjNotice> {
        let session = self.open_session()?;
        session.locked = None;
        let regenerate = session.past_suggest_point();
        log::info!("Unlocked custom track");

        if regenerate {
            self.generate(catalog, settings);
        }
        Ok(self.suggestion())
    }

    /// Suggest the best ranked track within ±1 of `target` energy.
    pub fn request_energy(
        &mut self,
        target: u8,
        catalog: &[Track],
        settings: &AutoDjSettings,
    ) -> Result<&ScoredTrack, DjNotice> {
        self.open_session()?;
        let history = self.history(settings);
        let session = self.open_session()?;

        let ranked = scoring::score_all_tracks(&session.track, catalog, &history, settings);
        let found = scoring::pick_by_energy(&ranked, target)
            .cloned()
            .ok_or(DjNotice::NoTracksAtEnergy(target))?;

        log::info!(
            "Energy request: {} at E{}",
            found.track.display_name(),
            target
        );
        session.ranked = ranked;
        session.state = DjState::Suggested;
        Ok(session.suggestion.insert(found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AnalysisStatus;
    use chrono::Utc;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryStore {
        plays: RefCell<Vec<PlayHistoryEntry>>,
        fail_writes: bool,
        fail_reads: bool,
    }

    impl PlayHistoryStore for MemoryStore {
        type Error = String;

        fn recent_plays(&self, limit: usize) -> Result<Vec<PlayHistoryEntry>, String> {
            if self.fail_reads {
                return Err("read failed".into());
            }
            Ok(self.plays.borrow().iter().rev().take(limit).cloned().collect())
        }

        fn append_play(&self, track_id: i64, auto_selected: bool) -> Result<(), String> {
            if self.fail_writes {
                return Err("disk full".into());
            }
            self.plays.borrow_mut().push(PlayHistoryEntry {
                track_id,
                played_at: Utc::now(),
                auto_selected,
            });
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorded(Vec<(i64, String, u8)>);

    impl QueueSink for Recorded {
        fn queue(&mut self, track: &Track, reason: &str, score: u8) {
            self.0.push((track.id, reason.to_string(), score));
        }
    }

    fn track(id: i64, bpm: f64, key: &str, energy: u8) -> Track {
        Track {
            id,
            title: format!("Track {id}"),
            artist: None,
            file_path: None,
            duration: 200.0,
            bpm: Some(bpm),
            musical_key: Some(key.to_string()),
            energy_level: Some(energy),
            analysis_status: AnalysisStatus::Complete,
        }
    }

    fn catalog() -> Vec<Track> {
        vec![
            track(1, 128.0, "A Minor", 6),
            track(2, 128.5, "C Major", 7),
            track(3, 126.0, "F# Minor", 6),
            track(4, 100.0, "D Minor", 2),
        ]
    }

    fn tick(track: &Track, position: f64) -> PlaybackTick<'_> {
        PlaybackTick {
            track: Some(track),
            is_playing: true,
            position,
            duration: track.duration,
        }
    }

    fn dj() -> AutoDj<MemoryStore, Recorded> {
        AutoDj::new(MemoryStore::default(), Recorded::default())
    }

    #[test]
    fn test_full_cycle() {
        let cat = catalog();
        let settings = AutoDjSettings::default();
        let mut dj = dj();

        assert!(dj.handle_tick(&tick(&cat[0], 10.0), &cat, &settings).is_empty());
        assert_eq!(dj.state(), DjState::Idle);

        let events = dj.handle_tick(&tick(&cat[0], 100.0), &cat, &settings);
        assert!(matches!(&events[..], [DjEvent::Suggested(s)] if s.track.id == 2));
        assert_eq!(dj.state(), DjState::Suggested);

        let events = dj.handle_tick(&tick(&cat[0], 185.0), &cat, &settings);
        assert!(matches!(&events[..], [DjEvent::Queued { next, .. }] if next.track.id == 2));
        assert_eq!(dj.state(), DjState::Queued);

        let plays = dj.store().plays.borrow();
        assert_eq!(plays.len(), 1);
        assert_eq!(plays[0].track_id, 2);
        assert!(plays[0].auto_selected);
        assert_eq!(dj.sink().0.len(), 1);
        assert_eq!(dj.sink().0[0].0, 2);
    }

    #[test]
    fn test_repeated_ticks_fire_once() {
        let cat = catalog();
        let settings = AutoDjSettings::default();
        let mut dj = dj();

        for pos in [100.0, 110.0, 120.0, 185.0, 190.0, 195.0, 199.0] {
            dj.handle_tick(&tick(&cat[0], pos), &cat, &settings);
        }
        assert_eq!(dj.store().plays.borrow().len(), 1);
        assert_eq!(dj.sink().0.len(), 1);
    }

    #[test]
    fn test_commit_by_remaining_time() {
        let cat = catalog();
        let settings = AutoDjSettings::default();
        let mut dj = dj();
        let one_minute = Track {
            duration: 60.0,
            ..cat[0].clone()
        };
        assert_eq!(dj.handle_tick(&tick(&one_minute, 30.0), &cat, &settings).len(), 1);
        // 84% through, but under ten seconds left
        let events = dj.handle_tick(&tick(&one_minute, 50.5), &cat, &settings);
        assert!(matches!(&events[..], [DjEvent::Queued { .. }]));
    }

    #[test]
    fn test_short_track_generates_and_commits_together() {
        let cat = catalog();
        let settings = AutoDjSettings::default();
        let mut dj = dj();
        let short = Track {
            duration: 12.0,
            ..cat[0].clone()
        };
        let events = dj.handle_tick(&tick(&short, 3.0), &cat, &settings);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], DjEvent::Suggested(_)));
        assert!(matches!(events[1], DjEvent::Queued { .. }));
    }

    #[test]
    fn test_disabled_or_paused_does_nothing() {
        let cat = catalog();
        let mut dj = dj();
        let off = AutoDjSettings {
            enabled: false,
            ..Default::default()
        };
        assert!(dj.handle_tick(&tick(&cat[0], 190.0), &cat, &off).is_empty());

        let paused = PlaybackTick {
            is_playing: false,
            ..tick(&cat[0], 190.0)
        };
        assert!(
            dj.handle_tick(&paused, &cat, &AutoDjSettings::default())
                .is_empty()
        );
        assert_eq!(dj.state(), DjState::Idle);
        assert!(dj.sink().0.is_empty());
    }

    #[test]
    fn test_track_change_resets() {
        let cat = catalog();
        let settings = AutoDjSettings::default();
        let mut dj = dj();

        dj.handle_tick(&tick(&cat[0], 190.0), &cat, &settings);
        assert_eq!(dj.state(), DjState::Queued);

        dj.handle_tick(&tick(&cat[1], 5.0), &cat, &settings);
        assert_eq!(dj.state(), DjState::Idle);
        assert!(dj.suggestion().is_none());
        assert_eq!(dj.current_track().map(|t| t.id), Some(2));

        dj.handle_tick(&tick(&cat[1], 190.0), &cat, &settings);
        assert_eq!(dj.sink().0.len(), 2);
    }

    #[test]
    fn test_history_write_failure_still_queues() {
        let cat = catalog();
        let mut dj = AutoDj::new(
            MemoryStore {
                fail_writes: true,
                fail_reads: true,
                ..Default::default()
            },
            Recorded::default(),
        );
        dj.handle_tick(&tick(&cat[0], 190.0), &cat, &AutoDjSettings::default());
        assert_eq!(dj.sink().0.len(), 1);
        assert_eq!(dj.state(), DjState::Queued);
    }

    #[test]
    fn test_recency_sees_committed_track() {
        let cat = catalog();
        let settings = AutoDjSettings::default();
        let mut dj = dj();

        dj.handle_tick(&tick(&cat[0], 190.0), &cat, &settings);
        assert_eq!(dj.sink().0[0].0, 2);

        // Back on track 1: track 2 was just committed and must now rank lower
        dj.handle_tick(&tick(&cat[2], 0.0), &cat, &settings);
        dj.handle_tick(&tick(&cat[0], 100.0), &cat, &settings);
        let two = dj.ranked().iter().find(|s| s.track.id == 2).unwrap();
        assert_eq!(two.recency_score, 0);
    }

    #[test]
    fn test_skip_promotes_runner_up() {
        let cat = catalog();
        let settings = AutoDjSettings::default();
        let mut dj = dj();

        assert_eq!(dj.skip().unwrap_err(), DjNotice::NoCurrentTrack);
        dj.handle_tick(&tick(&cat[0], 100.0), &cat, &settings);
        let runner_up = dj.ranked()[1].track.id;
        assert_eq!(dj.skip().unwrap().track.id, runner_up);

        dj.handle_tick(&tick(&cat[0], 190.0), &cat, &settings);
        assert_eq!(dj.sink().0[0].0, runner_up);
        assert_eq!(dj.skip().unwrap_err(), DjNotice::AlreadyQueued);
    }

    #[test]
    fn test_skip_needs_two_candidates() {
        let cat = vec![track(1, 128.0, "A Minor", 6), track(2, 128.0, "A Minor", 6)];
        let mut dj = dj();
        dj.handle_tick(&tick(&cat[0], 100.0), &cat, &AutoDjSettings::default());
        assert_eq!(dj.skip().unwrap_err(), DjNotice::NoAlternative);
        assert_eq!(dj.suggestion().unwrap().track.id, 2);
    }

    #[test]
    fn test_lock_overrides_and_is_not_auto_selected() {
        let cat = catalog();
        let settings = AutoDjSettings::default();
        let mut dj = dj();

        dj.handle_tick(&tick(&cat[0], 20.0), &cat, &settings);
        let locked = dj.lock_custom_track(&cat[3], &settings).unwrap();
        assert_eq!(locked.track.id, 4);

        // Lock suppresses auto-suggestion at the suggest point
        let events = dj.handle_tick(&tick(&cat[0], 100.0), &cat, &settings);
        assert!(events.is_empty());
        assert!(dj.suggestion().is_none());

        dj.handle_tick(&tick(&cat[0], 190.0), &cat, &settings);
        let (id, reason, _) = &dj.sink().0[0];
        assert_eq!(*id, 4);
        assert_eq!(reason, LOCKED_REASON);
        assert!(!dj.store().plays.borrow()[0].auto_selected);
    }

    #[test]
    fn test_cannot_lock_current_or_unanalysed() {
        let cat = catalog();
        let settings = AutoDjSettings::default();
        let mut dj = dj();
        dj.handle_tick(&tick(&cat[0], 20.0), &cat, &settings);

        assert_eq!(
            dj.lock_custom_track(&cat[0], &settings).unwrap_err(),
            DjNotice::NotLockable(1)
        );
        let mut pending = cat[1].clone();
        pending.analysis_status = AnalysisStatus::Pending;
        assert!(dj.lock_custom_track(&pending, &settings).is_err());
    }

    #[test]
    fn test_unlock_regenerates_after_suggest_point() {
        let cat = catalog();
        let settings = AutoDjSettings::default();
        let mut dj = dj();

        dj.handle_tick(&tick(&cat[0], 20.0), &cat, &settings);
        dj.lock_custom_track(&cat[3], &settings).unwrap();
        // Before the suggest point: nothing to regenerate yet
        assert!(dj.unlock_custom_track(&cat, &settings).unwrap().is_none());

        dj.lock_custom_track(&cat[3], &settings).unwrap();
        dj.handle_tick(&tick(&cat[0], 100.0), &cat, &settings);
        let regenerated = dj.unlock_custom_track(&cat, &settings).unwrap();
        assert_eq!(regenerated.map(|s| s.track.id), Some(2));
        assert!(dj.locked().is_none());
    }

    #[test]
    fn test_request_energy() {
        let cat = catalog();
        let settings = AutoDjSettings::default();
        let mut dj = dj();
        dj.handle_tick(&tick(&cat[0], 20.0), &cat, &settings);

        assert_eq!(dj.request_energy(2, &cat, &settings).unwrap().track.id, 4);
        assert_eq!(dj.state(), DjState::Suggested);
        assert_eq!(
            dj.request_energy(10, &cat, &settings).unwrap_err(),
            DjNotice::NoTracksAtEnergy(10)
        );
        // The earlier pick survives a failed request
        assert_eq!(dj.suggestion().unwrap().track.id, 4);
    }

    #[test]
    fn test_settings_read_per_call() {
        let cat = catalog();
        let mut dj = dj();
        let harmonic = AutoDjSettings::default();
        let tempo = AutoDjSettings {
            prefer_harmonic: false,
            ..Default::default()
        };

        dj.handle_tick(&tick(&cat[0], 100.0), &cat, &harmonic);
        let before = dj.suggestion().unwrap().total_score;
        dj.handle_tick(&tick(&cat[1], 0.0), &cat, &harmonic);
        dj.handle_tick(&tick(&cat[0], 100.0), &cat, &tempo);
        let after = dj.suggestion().unwrap();
        assert_ne!(before, after.total_score);
    }

    #[test]
    fn test_closure_sink() {
        let cat = catalog();
        let mut queued = Vec::new();
        {
            let mut dj = AutoDj::new(MemoryStore::default(), |t: &Track, _: &str, s: u8| {
                queued.push((t.id, s))
            });
            dj.handle_tick(&tick(&cat[0], 190.0), &cat, &AutoDjSettings::default());
        }
        assert_eq!(queued.len(), 1);
    }

    #[test]
    fn test_database_store() {
        let db = Database::open_in_memory().unwrap();
        let a = db
            .upsert_track(&crate::db::models::NewTrack {
                title: "A".into(),
                ..Default::default()
            })
            .unwrap();
        let store = &db;
        store.append_play(a, true).unwrap();
        assert_eq!(store.recent_plays(5).unwrap()[0].track_id, a);
    }
}
