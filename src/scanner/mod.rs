pub mod metadata;

use crate::SUPPORTED_EXTENSIONS;
use crate::db::Database;
use crate::db::models::NewTrack;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Db(#[from] crate::db::DbError),
    #[error("Progress template error: {0}")]
    Template(#[from] indicatif::style::TemplateError),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub scanned: u64,
    pub new: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Every supported audio file under `paths`, sorted.
pub fn collect_audio_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = paths
        .iter()
        .flat_map(|p| WalkDir::new(p).follow_links(true).into_iter().filter_map(|e| e.ok()))
        .filter(|e| e.file_type().is_file() && is_supported(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Build a catalog entry from tags, falling back to the file stem for the title.
pub fn track_from_tags(path: &Path, tags: metadata::TagInfo) -> NewTrack {
    let title = tags.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    });
    NewTrack {
        file_path: Some(path.to_string_lossy().into_owned()),
        title,
        artist: tags.artist,
        duration_secs: tags.duration_secs.unwrap_or(0.0),
        bpm: tags.bpm,
        musical_key: tags.musical_key,
        energy_level: tags.energy_level,
    }
}

/// Scan directories for audio files and insert/update tracks in the database.
/// Known files are skipped unless `force` is set.
pub fn scan(
    db: &Database,
    paths: &[PathBuf],
    force: bool,
) -> std::result::Result<ScanResult, ScanError> {
    let audio_files = collect_audio_files(paths);
    let mut result = ScanResult {
        scanned: audio_files.len() as u64,
        ..ScanResult::default()
    };

    let mut pending = Vec::with_capacity(audio_files.len());
    for path in audio_files {
        match db.track_id_by_path(&path.to_string_lossy())? {
            Some(_) if !force => result.skipped += 1,
            existing => pending.push((path, existing.is_some())),
        }
    }

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) ({eta}) {msg}",
        )?
            .progress_chars("#>-"),
    );
    pb.set_message("Reading tags...");

    // Tag reads are I/O bound and independent; inserts stay on this thread
    let tracks: Vec<(NewTrack, bool)> = pending
        .par_iter()
        .map(|(path, known)| {
            let tags = metadata::read_tags(path);
            pb.inc(1);
            (track_from_tags(path, tags), *known)
        })
        .collect();

    // Wrap all inserts in a single transaction
    let tx = db.conn.unchecked_transaction().map_err(crate::db::DbError::from)?;
    for (track, known) in &tracks {
        match db.upsert_track(track) {
            Ok(_) if *known => result.updated += 1,
            Ok(_) => result.new += 1,
            Err(e) => {
                log::warn!("Error saving {}: {}", track.file_path.as_deref().unwrap_or("?"), e);
                result.errors += 1;
            }
        }
    }
    tx.commit().map_err(crate::db::DbError::from)?;

    pb.finish_with_message(format!(
        "Done: {} new, {} updated, {} skipped, {} errors",
        result.new, result.updated, result.skipped, result.errors
    ));
    log::info!(
        "Scanned {} files: {} new, {} updated, {} skipped",
        result.scanned,
        result.new,
        result.updated,
        result.skipped
    );

    Ok(result)
}
