use anyhow::{Context, Result};
use autodj::beatgrid::quantize::{NoteLength, ON_BEAT_TOLERANCE, TempoGrid};
use autodj::beatgrid::tap::TapTempo;
use autodj::beatgrid::{self, BeatGrid, REMOVE_TOLERANCE};
use autodj::db::Database;
use autodj::db::models::{AnalysisStatus, NewTrack, Track, TrackAnalysis};
use autodj::scoring::ScoredTrack;
use autodj::settings::{AutoDjSettings, EnergyStyle};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "autodj",
    version,
    about = "Harmonic Auto-DJ and beat-grid toolkit for livestreams"
)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan directories for audio files and add them to the catalog
    Scan {
        /// Directories to scan (defaults to config file music_dirs)
        paths: Vec<PathBuf>,

        /// Re-read tags for files already in the catalog
        #[arg(long)]
        force: bool,
    },

    /// Add a track by hand
    Add {
        title: String,

        #[arg(long)]
        artist: Option<String>,

        /// Audio file backing this track
        #[arg(long)]
        file: Option<PathBuf>,

        /// Duration in seconds
        #[arg(long, default_value = "0")]
        duration: f64,

        #[arg(long)]
        bpm: Option<f64>,

        /// Musical key, Camelot ("8A") or standard ("Am")
        #[arg(long)]
        key: Option<String>,

        /// Energy level 1-10
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        energy: Option<u8>,
    },

    /// Record BPM, key and energy for a track
    Analyze {
        /// Track id or title
        track: String,

        #[arg(long)]
        bpm: Option<f64>,

        #[arg(long)]
        key: Option<String>,

        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        energy: Option<u8>,

        /// Re-read BPM, key and energy from the file's tags
        #[arg(long)]
        from_tags: bool,
    },

    /// List catalog tracks
    Tracks {
        /// Only tracks with this analysis status (pending, analyzing, complete, failed)
        #[arg(long)]
        status: Option<AnalysisStatus>,
    },

    /// Remove a track with its history and beat grid
    Remove {
        track: String,
    },

    /// Rank the best next tracks after the given one
    Suggest {
        /// Track currently playing (id or title)
        track: String,

        /// Number of results
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Best next track near an energy level
    Energy {
        /// Track currently playing (id or title)
        track: String,

        #[arg(value_parser = clap::value_parser!(u8).range(1..=10))]
        level: u8,
    },

    /// Record that a track was played
    Played {
        track: String,

        /// Mark as chosen by the Auto-DJ
        #[arg(long)]
        auto: bool,
    },

    /// Show recent play history
    History {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Show or change Auto-DJ settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Edit a track's beat grid
    Grid {
        #[command(subcommand)]
        action: GridAction,
    },

    /// Tap along on Enter to measure BPM
    Tap,

    /// Snap a time to a tempo grid
    Quantize {
        bpm: f64,

        /// Time in seconds
        time: f64,

        /// First-beat offset in seconds
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        offset: f64,

        /// Snap length: 1/32, 1/16, 1/8, 1/4, 1/2, 1, 2 or 4 beats
        #[arg(long, default_value = "1/4")]
        snap: NoteLength,
    },

    /// Play the catalog out on a simulated clock with the Auto-DJ in control
    Session {
        /// First track (id or title)
        #[arg(long)]
        start: Option<String>,

        /// Stop after this many tracks
        #[arg(short = 'n', long, default_value = "10")]
        tracks: usize,

        /// Track seconds per real second (overrides config)
        #[arg(long, value_parser = parse_speed)]
        speed: Option<f64>,
    },

    /// Show catalog statistics
    Stats,
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        enabled: Option<bool>,

        #[arg(long)]
        prefer_harmonic: Option<bool>,

        #[arg(long)]
        strict_bpm: Option<bool>,

        /// gradual, peak-valley or chill
        #[arg(long)]
        energy_style: Option<EnergyStyle>,

        #[arg(long)]
        recency_limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum GridAction {
    /// Build a constant-tempo grid (kept if the stored grid is locked)
    Generate {
        track: String,

        /// Defaults to the track's analysed BPM
        #[arg(long)]
        bpm: Option<f64>,

        #[arg(long, default_value = "0")]
        offset: f64,

        #[arg(long, default_value = "4")]
        beats_per_bar: u32,

        /// Replace even a locked grid
        #[arg(long)]
        force: bool,
    },

    Show {
        track: String,

        /// List downbeats only
        #[arg(long)]
        downbeats: bool,
    },

    /// Shift every marker by DELTA seconds
    Nudge {
        track: String,

        #[arg(allow_negative_numbers = true)]
        delta: f64,
    },

    /// Re-lay the grid at a new BPM
    Bpm {
        track: String,
        bpm: f64,

        #[arg(long, default_value = "4")]
        beats_per_bar: u32,
    },

    /// Insert a marker and renumber the bars
    Add {
        track: String,
        time: f64,

        #[arg(long, default_value = "4")]
        beats_per_bar: u32,
    },

    /// Delete the marker nearest TIME
    Remove {
        track: String,
        time: f64,

        #[arg(long, default_value_t = REMOVE_TOLERANCE)]
        tolerance: f64,
    },

    /// Toggle the grid lock
    Lock {
        track: String,
    },

    /// Write the grid as JSON
    Export {
        track: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace the grid from a JSON file
    Import {
        track: String,
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = autodj::config::AppConfig::load();

    let db_path = config.resolve_db_path(cli.db_path);
    log::info!("Database: {}", db_path.display());

    let db = Database::open(&db_path).context("Failed to open database")?;

    // A fresh store starts from the config file's Auto-DJ settings
    if db.load_settings().context("Failed to read settings")?.is_none() {
        db.save_settings(&config.autodj).context("Failed to seed settings")?;
    }

    match cli.command {
        Commands::Scan { paths, force } => {
            // Resolve scan paths: CLI args > config music_dirs
            let scan_paths = if !paths.is_empty() {
                paths
            } else if !config.music_dirs.is_empty() {
                config.music_dirs.clone()
            } else {
                anyhow::bail!(
                    "No directories to scan. Pass paths as arguments or set music_dirs in config."
                );
            };

            let result = autodj::scanner::scan(&db, &scan_paths, force).context("Scan failed")?;
            println!(
                "Scan complete: {} scanned, {} new, {} updated, {} skipped, {} errors",
                result.scanned, result.new, result.updated, result.skipped, result.errors
            );
        }

        Commands::Add { title, artist, file, duration, bpm, key, energy } => {
            let new_track = NewTrack {
                file_path: file.map(|p| p.to_string_lossy().into_owned()),
                title,
                artist,
                duration_secs: duration,
                bpm,
                musical_key: key,
                energy_level: energy,
            };
            let id = db.upsert_track(&new_track).context("Failed to add track")?;
            println!("Added track {} ({})", id, new_track.initial_status());
        }

        Commands::Analyze { track, bpm, key, energy, from_tags } => {
            let track = resolve(&db, &track)?;
            let analysis = if from_tags {
                let path = track
                    .file_path
                    .as_deref()
                    .with_context(|| format!("Track {} has no file to read tags from", track.id))?;
                db.set_analysis_status(track.id, AnalysisStatus::Analyzing)?;
                let tags = autodj::scanner::metadata::read_tags(std::path::Path::new(path));
                TrackAnalysis {
                    bpm: bpm.or(tags.bpm),
                    musical_key: key.or(tags.musical_key),
                    energy_level: energy.or(tags.energy_level),
                }
            } else {
                TrackAnalysis {
                    bpm: bpm.or(track.bpm),
                    musical_key: key.or_else(|| track.musical_key.clone()),
                    energy_level: energy.or(track.energy_level),
                }
            };

            let updated = db
                .update_analysis(track.id, &analysis)
                .inspect_err(|_| {
                    db.set_analysis_status(track.id, AnalysisStatus::Failed).ok();
                })
                .context("Failed to save analysis")?;
            println!(
                "{}: {} BPM, key {}, energy {} ({})",
                updated.display_name(),
                fmt_opt(updated.bpm.map(|b| format!("{b:.1}"))),
                fmt_opt(updated.musical_key.clone()),
                fmt_opt(updated.energy_level.map(|e| e.to_string())),
                updated.analysis_status
            );
        }

        Commands::Tracks { status } => {
            let tracks = match status {
                Some(s) => db.get_tracks_by_status(s),
                None => db.get_all_tracks(),
            }
            .context("Query failed")?;

            if tracks.is_empty() {
                println!("No tracks.");
                return Ok(());
            }
            print_track_table(&tracks);
        }

        Commands::Remove { track } => {
            let track = resolve(&db, &track)?;
            if db.remove_track(track.id)? {
                println!("Removed {}", track.display_name());
            }
        }

        Commands::Suggest { track, limit, json } => {
            let current = resolve(&db, &track)?;
            let settings = db.load_settings_or(&config.autodj)?;
            let catalog = db.get_all_tracks()?;
            let history = db.recent_history(settings.recency_limit.max(20))?;
            let mut ranked =
                autodj::scoring::score_all_tracks(&current, &catalog, &history, &settings);
            ranked.truncate(limit);

            if json {
                println!("{}", serde_json::to_string_pretty(&ranked)?);
                return Ok(());
            }
            if ranked.is_empty() {
                println!("No analysed candidates. Run `autodj analyze` first.");
                return Ok(());
            }

            println!("After \"{}\" ({}):", current.display_name(), settings.energy_style);
            println!();
            print_suggestions(&ranked);
        }

        Commands::Energy { track, level } => {
            let current = resolve(&db, &track)?;
            let settings = db.load_settings_or(&config.autodj)?;
            let catalog = db.get_all_tracks()?;
            let history = db.recent_history(settings.recency_limit.max(20))?;

            let found = autodj::scoring::find_track_by_energy(
                &current, &catalog, &history, &settings, level,
            );
            match found {
                Some(found) => print_suggestions(std::slice::from_ref(&found)),
                None => println!("{}", autodj::autodj::DjNotice::NoTracksAtEnergy(level)),
            }
        }

        Commands::Played { track, auto } => {
            let track = resolve(&db, &track)?;
            let entry = db.record_play(track.id, auto)?;
            println!(
                "Recorded {} at {}",
                track.display_name(),
                entry.played_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        Commands::History { limit } => {
            let history = db.recent_history(limit)?;
            if history.is_empty() {
                println!("No plays recorded.");
                return Ok(());
            }
            for entry in &history {
                let name = db
                    .get_track(entry.track_id)?
                    .map(|t| t.display_name())
                    .unwrap_or_else(|| format!("#{}", entry.track_id));
                println!(
                    "{}  {}  {}",
                    entry.played_at.format("%Y-%m-%d %H:%M:%S"),
                    if entry.auto_selected { "auto  " } else { "manual" },
                    name
                );
            }
        }

        Commands::Settings { action } => {
            let mut settings = db.load_settings_or(&config.autodj)?;
            if let SettingsAction::Set {
                enabled,
                prefer_harmonic,
                strict_bpm,
                energy_style,
                recency_limit,
            } = action
            {
                // Build the whole record, then replace it
                settings = AutoDjSettings {
                    enabled: enabled.unwrap_or(settings.enabled),
                    prefer_harmonic: prefer_harmonic.unwrap_or(settings.prefer_harmonic),
                    strict_bpm: strict_bpm.unwrap_or(settings.strict_bpm),
                    energy_style: energy_style.unwrap_or(settings.energy_style),
                    recency_limit: recency_limit.unwrap_or(settings.recency_limit),
                };
                db.save_settings(&settings).context("Failed to save settings")?;
            }
            println!("enabled:         {}", settings.enabled);
            println!("prefer_harmonic: {}", settings.prefer_harmonic);
            println!("strict_bpm:      {}", settings.strict_bpm);
            println!("energy_style:    {}", settings.energy_style);
            println!("recency_limit:   {}", settings.recency_limit);
        }

        Commands::Grid { action } => run_grid(&db, action)?,

        Commands::Tap => {
            println!("Press Enter on each beat. Type q and Enter to finish.");
            let mut tapper = TapTempo::new();
            for line in std::io::stdin().lock().lines() {
                let line = line?;
                if line.trim().eq_ignore_ascii_case("q") {
                    break;
                }
                match tapper.tap() {
                    Some(bpm) => println!("{} BPM ({} taps)", bpm, tapper.tap_count()),
                    None => println!("..."),
                }
            }
        }

        Commands::Quantize { bpm, time, offset, snap } => {
            let grid = TempoGrid::new(bpm, offset).context("BPM must be positive and finite")?;
            println!("Nearest {snap}:  {:.3}s", grid.nearest(time, snap));
            println!("Previous {snap}: {:.3}s", grid.previous(time, snap));
            println!("Next {snap}:     {:.3}s", grid.next(time, snap));
            println!(
                "Beat {} ({:.3}s to next{})",
                grid.current_beat(time),
                grid.time_until_next_beat(time),
                if grid.is_on_beat(time, ON_BEAT_TOLERANCE) { ", on beat" } else { "" }
            );
        }

        Commands::Session { start, tracks, speed } => {
            let mut opts = autodj::session::SessionOptions::from_config(&config.session, tracks);
            if let Some(s) = speed {
                opts.speed = s;
            }
            if let Some(q) = start {
                opts.start = Some(resolve(&db, &q)?);
            }

            let report = autodj::session::run(
                &db,
                &config.autodj,
                &config.mixer,
                &opts,
                |t: &Track, reason: &str, score: u8| {
                    println!("  next: {} [{}] {}", t.display_name(), score, reason);
                },
            )
            .context("Session failed")?;

            println!();
            println!("Played {} tracks in {} ticks:", report.played.len(), report.ticks);
            for (i, t) in report.played.iter().enumerate() {
                println!("{:>3}. {}", i + 1, t.display_name());
            }
        }

        Commands::Stats => {
            let stats = db.stats().context("Failed to get stats")?;
            println!("Catalog Statistics");
            println!("==================");
            println!("Total tracks:    {}", stats.total_tracks);
            println!("Scorable tracks: {}", stats.scorable_tracks);
            println!("Total duration:  {:.1} hours", stats.total_duration_hours);
            println!(
                "Plays:           {} ({} auto-selected)",
                stats.plays, stats.auto_selected_plays
            );
            if !stats.by_status.is_empty() {
                println!();
                println!("By analysis status:");
                for (status, count) in &stats.by_status {
                    println!("  {:<10} {}", status, count);
                }
            }
        }
    }

    Ok(())
}

fn parse_speed(raw: &str) -> std::result::Result<f64, String> {
    let speed: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if autodj::session::is_valid_speed(speed) {
        Ok(speed)
    } else {
        Err(format!("speed must be a positive number, got {raw}"))
    }
}

fn resolve(db: &Database, query: &str) -> Result<Track> {
    db.resolve_track(query)
        .context("Track lookup failed")?
        .with_context(|| format!("No track matching \"{query}\""))
}

/// Stored grid, or an error naming the track.
fn load_grid(db: &Database, track: &Track) -> Result<BeatGrid> {
    db.load_beat_grid(track.id)?
        .with_context(|| {
            format!(
                "No beat grid for {}. Run `autodj grid generate` first.",
                track.display_name()
            )
        })
}

fn run_grid(db: &Database, action: GridAction) -> Result<()> {
    match action {
        GridAction::Generate { track, bpm, offset, beats_per_bar, force } => {
            let track = resolve(db, &track)?;
            let bpm = bpm
                .or(track.bpm)
                .with_context(|| format!("{} has no BPM; pass --bpm", track.display_name()))?;
            let detected = beatgrid::generate_beat_grid(bpm, offset, track.duration, beats_per_bar);

            let grid = match db.load_beat_grid(track.id)? {
                Some(mut existing) if !force => {
                    if !existing.merge_detected(detected) {
                        println!("Grid is locked; keeping it (use --force to replace).");
                    }
                    existing
                }
                _ => detected,
            };
            db.save_beat_grid(track.id, &grid)?;
            println!("{} beats at {:.2} BPM", grid.beats.len(), grid.bpm);
        }

        GridAction::Show { track, downbeats } => {
            let track = resolve(db, &track)?;
            let grid = load_grid(db, &track)?;
            println!(
                "{}: {:.2} BPM, offset {:.3}s, {} beats{}",
                track.display_name(),
                grid.bpm,
                grid.offset,
                grid.beats.len(),
                if grid.is_locked { ", locked" } else { "" }
            );
            let markers: Vec<_> = if downbeats {
                grid.downbeats().collect()
            } else {
                grid.beats.iter().collect()
            };
            for m in markers {
                let bar = if m.is_downbeat { " |" } else { "" };
                println!("{:>9.3}s  {}{}", m.time, m.beat_number, bar);
            }
        }

        GridAction::Nudge { track, delta } => {
            let track = resolve(db, &track)?;
            let mut grid = load_grid(db, &track)?;
            grid.nudge(delta);
            db.save_beat_grid(track.id, &grid)?;
            println!("Offset now {:.3}s", grid.offset);
        }

        GridAction::Bpm { track, bpm, beats_per_bar } => {
            let track = resolve(db, &track)?;
            let mut grid = load_grid(db, &track)?;
            grid.set_bpm(bpm, track.duration, beats_per_bar);
            db.save_beat_grid(track.id, &grid)?;
            println!("{} beats at {:.2} BPM", grid.beats.len(), grid.bpm);
        }

        GridAction::Add { track, time, beats_per_bar } => {
            let track = resolve(db, &track)?;
            let mut grid = load_grid(db, &track)?;
            grid.add_beat_marker(time, beats_per_bar);
            db.save_beat_grid(track.id, &grid)?;
            println!("{} beats, {:.2} BPM", grid.beats.len(), grid.bpm);
        }

        GridAction::Remove { track, time, tolerance } => {
            let track = resolve(db, &track)?;
            let mut grid = load_grid(db, &track)?;
            match grid.remove_beat_marker(time, tolerance) {
                Some(m) => {
                    db.save_beat_grid(track.id, &grid)?;
                    println!("Removed marker at {:.3}s", m.time);
                }
                None => println!("No marker within {tolerance}s of {time}s"),
            }
        }

        GridAction::Lock { track } => {
            let track = resolve(db, &track)?;
            let mut grid = load_grid(db, &track)?;
            let locked = grid.toggle_lock();
            db.save_beat_grid(track.id, &grid)?;
            println!("Grid {}", if locked { "locked" } else { "unlocked" });
        }

        GridAction::Export { track, out } => {
            let track = resolve(db, &track)?;
            let json = beatgrid::export_beat_grid(&load_grid(db, &track)?);
            match out {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{json}"),
            }
        }

        GridAction::Import { track, file } => {
            let track = resolve(db, &track)?;
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let grid = beatgrid::import_beat_grid(&json)
                .with_context(|| format!("{} is not a valid beat grid", file.display()))?;
            db.save_beat_grid(track.id, &grid)?;
            println!("Imported {} beats at {:.2} BPM", grid.beats.len(), grid.bpm);
        }
    }
    Ok(())
}

fn fmt_opt(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let cut: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

fn print_track_table(tracks: &[Track]) {
    println!(
        "{:>5}  {:<36} {:>6} {:>6} {:>4} {:>6}  {}",
        "Id", "Track", "BPM", "Key", "E", "Min", "Status"
    );
    println!("{}", "-".repeat(82));
    for t in tracks {
        println!(
            "{:>5}  {:<36} {:>6} {:>6} {:>4} {:>6.1}  {}",
            t.id,
            truncate(&t.display_name(), 36),
            fmt_opt(t.bpm.map(|b| format!("{b:.1}"))),
            fmt_opt(t.musical_key.clone()),
            fmt_opt(t.energy_level.map(|e| e.to_string())),
            t.duration / 60.0,
            t.analysis_status
        );
    }
}

fn print_suggestions(ranked: &[ScoredTrack]) {
    println!(
        "{:>3}  {:<36} {:>5}  {:>4} {:>4} {:>4} {:>4}",
        "#", "Track", "Score", "Key", "BPM", "Nrg", "Rec"
    );
    println!("{}", "-".repeat(68));
    for (i, st) in ranked.iter().enumerate() {
        println!(
            "{:>3}  {:<36} {:>5}  {:>4} {:>4} {:>4} {:>4}",
            i + 1,
            truncate(&st.track.display_name(), 36),
            st.total_score,
            st.harmonic_score,
            st.bpm_score,
            st.energy_score,
            st.recency_score
        );
        println!("     {}", st.reason);
    }
}
