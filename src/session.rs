use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::autodj::{AutoDj, DjEvent, PlaybackTick, QueueSink};
use crate::config::SessionConfig;
use crate::db::models::Track;
use crate::db::{Database, DbError};
use crate::mixer::backend::{RecordingBackend, SourceHandle};
use crate::mixer::{MixerError, MixerSettings, SignalChain};
use crate::settings::AutoDjSettings;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),
    #[error("Mixer error: {0}")]
    Mixer(#[from] MixerError),
    #[error("No analysed track with a known duration to start from")]
    NoStartTrack,
    #[error("Playback speed must be a positive number, got {0}")]
    InvalidSpeed(f64),
    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// First track; defaults to the lowest-id analysed track.
    pub start: Option<Track>,
    /// Stop once this many tracks have played.
    pub max_tracks: usize,
    pub tick: Duration,
    /// Track seconds per wall-clock second.
    pub speed: f64,
}

impl SessionOptions {
    /// An unusable configured speed falls back to real time.
    pub fn from_config(config: &SessionConfig, max_tracks: usize) -> Self {
        let speed = if is_valid_speed(config.speed) {
            config.speed
        } else {
            log::warn!("Ignoring session speed {} from config, using 1.0", config.speed);
            1.0
        };
        Self {
            start: None,
            max_tracks,
            tick: Duration::from_millis(config.tick_ms.max(1)),
            speed,
        }
    }
}

/// A speed the playout clock can advance with.
pub fn is_valid_speed(speed: f64) -> bool {
    speed.is_finite() && speed > 0.0
}

#[derive(Debug, Default)]
pub struct SessionReport {
    pub played: Vec<Track>,
    pub ticks: u64,
}

fn source_for(track: &Track) -> SourceHandle {
    SourceHandle {
        name: track.file_path.clone().unwrap_or_else(|| track.title.clone()),
    }
}

/// Play the catalog out on a simulated clock, letting the Auto-DJ choose
/// each next track and the signal chain crossfade into it.
pub fn run<Q: QueueSink>(
    db: &Database,
    defaults: &AutoDjSettings,
    mixer: &MixerSettings,
    opts: &SessionOptions,
    sink: Q,
) -> Result<SessionReport, SessionError> {
    if !is_valid_speed(opts.speed) {
        return Err(SessionError::InvalidSpeed(opts.speed));
    }
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    rt.block_on(playout(db, defaults, mixer, opts, sink))
}

async fn playout<Q: QueueSink>(
    db: &Database,
    defaults: &AutoDjSettings,
    mixer: &MixerSettings,
    opts: &SessionOptions,
    sink: Q,
) -> Result<SessionReport, SessionError> {
    let mut catalog = db.get_all_tracks()?;
    let mut current = match &opts.start {
        Some(t) => t.clone(),
        None => catalog
            .iter()
            .find(|t| t.is_scorable() && t.duration > 0.0)
            .cloned()
            .ok_or(SessionError::NoStartTrack)?,
    };
    if !(current.duration > 0.0) {
        return Err(SessionError::NoStartTrack);
    }

    let mut chain = SignalChain::new(RecordingBackend::new(), mixer);
    chain.prime();
    chain.play(Some(&source_for(&current)))?;
    db.record_play(current.id, false)?;
    log::info!("Session start: {}", current.display_name());

    let mut dj = AutoDj::new(db, sink);
    let mut report = SessionReport {
        played: vec![current.clone()],
        ticks: 0,
    };
    let mut position = 0.0;
    let mut queued: Option<Track> = None;
    let step = opts.tick.as_secs_f64() * opts.speed;

    let mut interval = tokio::time::interval(opts.tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        report.ticks += 1;
        position += step;
        chain.backend_mut().advance(step);

        // Operator changes take effect on the next tick
        let settings = db.load_settings_or(defaults)?;
        let tick = PlaybackTick {
            track: Some(&current),
            is_playing: true,
            position: position.min(current.duration),
            duration: current.duration,
        };

        for event in dj.handle_tick(&tick, &catalog, &settings) {
            if let DjEvent::Queued { next, .. } = event {
                let lead = chain.crossfader().config().duration;
                let delay = (current.duration - position - lead).max(0.0);
                if !chain.queue_next(source_for(&next.track), delay) {
                    log::debug!("Crossfade off; cutting to next track at the end");
                }
                queued = Some(next.track);
            }
        }

        let switched = match chain.poll()? {
            Some(_) => true,
            None if position >= current.duration => {
                let Some(next) = &queued else {
                    log::warn!("Nothing queued after '{}', ending session", current.title);
                    break;
                };
                chain.play(Some(&source_for(next)))?;
                true
            }
            None => false,
        };

        if switched {
            let Some(next) = queued.take() else {
                break;
            };
            if report.played.len() >= opts.max_tracks {
                break;
            }
            log::info!("Now playing: {}", next.display_name());
            current = next;
            position = 0.0;
            report.played.push(current.clone());
            catalog = db.get_all_tracks()?;
        }
    }

    chain.teardown();
    Ok(report)
}
