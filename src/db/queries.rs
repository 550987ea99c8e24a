use super::models::{
    AnalysisStatus, LibraryStats, NewTrack, PlayHistoryEntry, Track, TrackAnalysis,
};
use super::{Database, DbError, Result};
use crate::beatgrid::{self, BeatGrid};
use crate::settings::{AutoDjSettings, EnergyStyle};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, params};

const TRACK_COLUMNS: &str =
    "id, title, artist, file_path, duration_secs, bpm, musical_key, energy_level, analysis_status";

fn track_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Track> {
    let status: String = row.get(8)?;
    let analysis_status = status.parse::<AnalysisStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(Track {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        file_path: row.get(3)?,
        duration: row.get(4)?,
        bpm: row.get(5)?,
        musical_key: row.get(6)?,
        energy_level: row.get(7)?,
        analysis_status,
    })
}

fn history_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlayHistoryEntry> {
    let played_at: String = row.get(1)?;
    let played_at = DateTime::parse_from_rfc3339(&played_at)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(PlayHistoryEntry {
        track_id: row.get(0)?,
        played_at,
        auto_selected: row.get(2)?,
    })
}

/// Fixed-width RFC 3339 so lexical order in SQLite matches time order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    /// Insert a track, or refresh it when the file path is already known.
    /// Existing analysis fields survive a rescan that carries no analysis.
    /// Returns the track id.
    pub fn upsert_track(&self, t: &NewTrack) -> Result<i64> {
        let id: i64 = self.conn.query_row(
            "INSERT INTO tracks (
                file_path, title, artist, duration_secs,
                bpm, musical_key, energy_level, analysis_status,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime('now'))
            ON CONFLICT(file_path) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                duration_secs = excluded.duration_secs,
                bpm = COALESCE(excluded.bpm, tracks.bpm),
                musical_key = COALESCE(excluded.musical_key, tracks.musical_key),
                energy_level = COALESCE(excluded.energy_level, tracks.energy_level),
                analysis_status = CASE
                    WHEN excluded.analysis_status = 'complete' THEN 'complete'
                    ELSE tracks.analysis_status
                END,
                updated_at = datetime('now')
            RETURNING id",
            params![
                t.file_path,
                t.title,
                t.artist,
                t.duration_secs,
                t.bpm,
                t.musical_key,
                t.energy_level,
                t.initial_status().as_str(),
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Write analysis results onto a track. The status becomes `complete`
    /// once BPM, key and energy are all present, otherwise `pending`.
    pub fn update_analysis(&self, track_id: i64, a: &TrackAnalysis) -> Result<Track> {
        let changed = self.conn.execute(
            "UPDATE tracks SET
                bpm = COALESCE(?2, bpm),
                musical_key = COALESCE(?3, musical_key),
                energy_level = COALESCE(?4, energy_level),
                updated_at = datetime('now')
             WHERE id = ?1",
            params![track_id, a.bpm, a.musical_key, a.energy_level],
        )?;
        if changed == 0 {
            return Err(DbError::TrackNotFound(track_id));
        }

        self.conn.execute(
            "UPDATE tracks SET analysis_status = CASE
                WHEN bpm IS NOT NULL AND musical_key IS NOT NULL AND energy_level IS NOT NULL
                THEN 'complete' ELSE 'pending' END
             WHERE id = ?1",
            params![track_id],
        )?;

        self.get_track(track_id)?.ok_or(DbError::TrackNotFound(track_id))
    }

    pub fn set_analysis_status(&self, track_id: i64, status: AnalysisStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tracks SET analysis_status = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![track_id, status.as_str()],
        )?;
        if changed == 0 {
            return Err(DbError::TrackNotFound(track_id));
        }
        Ok(())
    }

    pub fn get_track(&self, track_id: i64) -> Result<Option<Track>> {
        let sql = format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?1");
        let track = self
            .conn
            .query_row(&sql, params![track_id], track_from_row)
            .optional()?;
        Ok(track)
    }

    pub fn track_id_by_path(&self, file_path: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM tracks WHERE file_path = ?1",
                params![file_path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// The whole catalog, in id order.
    pub fn get_all_tracks(&self) -> Result<Vec<Track>> {
        let sql = format!("SELECT {TRACK_COLUMNS} FROM tracks ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let tracks = stmt
            .query_map([], track_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    pub fn get_tracks_by_status(&self, status: AnalysisStatus) -> Result<Vec<Track>> {
        let sql =
            format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE analysis_status = ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let tracks = stmt
            .query_map(params![status.as_str()], track_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    /// Look a track up by numeric id, or by case-insensitive title substring.
    pub fn resolve_track(&self, query: &str) -> Result<Option<Track>> {
        if let Ok(id) = query.trim().parse::<i64>() {
            return self.get_track(id);
        }
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM tracks
             WHERE title LIKE '%' || ?1 || '%' COLLATE NOCASE
             ORDER BY length(title), id
             LIMIT 1"
        );
        let track = self
            .conn
            .query_row(&sql, params![query.trim()], track_from_row)
            .optional()?;
        Ok(track)
    }

    /// Remove a track with its history and beat grid. Returns false if it did not exist.
    pub fn remove_track(&self, track_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM tracks WHERE id = ?1", params![track_id])?;
        Ok(changed > 0)
    }

    /// Append a play-history row stamped now.
    pub fn record_play(&self, track_id: i64, auto_selected: bool) -> Result<PlayHistoryEntry> {
        self.record_play_at(track_id, auto_selected, Utc::now())
    }

    pub fn record_play_at(
        &self,
        track_id: i64,
        auto_selected: bool,
        played_at: DateTime<Utc>,
    ) -> Result<PlayHistoryEntry> {
        self.conn.execute(
            "INSERT INTO play_history (track_id, played_at, auto_selected) VALUES (?1, ?2, ?3)",
            params![track_id, format_timestamp(played_at), auto_selected],
        )?;
        Ok(PlayHistoryEntry {
            track_id,
            played_at,
            auto_selected,
        })
    }

    /// Most recent plays first.
    pub fn recent_history(&self, limit: usize) -> Result<Vec<PlayHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT track_id, played_at, auto_selected FROM play_history
             ORDER BY played_at DESC, id DESC
             LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit as i64], history_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// The stored settings record, if one has been saved.
    pub fn load_settings(&self) -> Result<Option<AutoDjSettings>> {
        let row = self
            .conn
            .query_row(
                "SELECT enabled, prefer_harmonic, strict_bpm, energy_style, recency_limit
                 FROM auto_dj_settings WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, bool>(0)?,
                        row.get::<_, bool>(1)?,
                        row.get::<_, bool>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((enabled, prefer_harmonic, strict_bpm, style, recency_limit)) = row else {
            return Ok(None);
        };
        let energy_style = style
            .parse::<EnergyStyle>()
            .map_err(|message| DbError::CorruptRow {
                table: "auto_dj_settings",
                message,
            })?;

        Ok(Some(AutoDjSettings {
            enabled,
            prefer_harmonic,
            strict_bpm,
            energy_style,
            recency_limit: recency_limit.max(0) as usize,
        }))
    }

    /// Stored settings, or `fallback` when none have been saved yet.
    pub fn load_settings_or(&self, fallback: &AutoDjSettings) -> Result<AutoDjSettings> {
        Ok(self.load_settings()?.unwrap_or_else(|| fallback.clone()))
    }

    /// Replace the whole settings record.
    pub fn save_settings(&self, s: &AutoDjSettings) -> Result<()> {
        self.conn.execute(
            "INSERT INTO auto_dj_settings (
                id, enabled, prefer_harmonic, strict_bpm, energy_style, recency_limit, updated_at
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                enabled = excluded.enabled,
                prefer_harmonic = excluded.prefer_harmonic,
                strict_bpm = excluded.strict_bpm,
                energy_style = excluded.energy_style,
                recency_limit = excluded.recency_limit,
                updated_at = datetime('now')",
            params![
                s.enabled,
                s.prefer_harmonic,
                s.strict_bpm,
                s.energy_style.as_str(),
                s.recency_limit as i64,
            ],
        )?;
        Ok(())
    }

    pub fn save_beat_grid(&self, track_id: i64, grid: &BeatGrid) -> Result<()> {
        let json = beatgrid::export_beat_grid(grid);
        self.conn.execute(
            "INSERT INTO beat_grids (track_id, grid_json, is_locked, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(track_id) DO UPDATE SET
                grid_json = excluded.grid_json,
                is_locked = excluded.is_locked,
                updated_at = datetime('now')",
            params![track_id, json, grid.is_locked],
        )?;
        Ok(())
    }

    pub fn load_beat_grid(&self, track_id: i64) -> Result<Option<BeatGrid>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT grid_json FROM beat_grids WHERE track_id = ?1",
                params![track_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            None => Ok(None),
            Some(json) => beatgrid::import_beat_grid(&json)
                .map(Some)
                .ok_or_else(|| DbError::CorruptRow {
                    table: "beat_grids",
                    message: format!("grid for track {track_id} failed validation"),
                }),
        }
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        let total_tracks: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))?;

        let scorable_tracks: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tracks
             WHERE analysis_status = 'complete'
               AND bpm IS NOT NULL AND musical_key IS NOT NULL AND energy_level IS NOT NULL",
            [],
            |r| r.get(0),
        )?;

        let total_secs: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(duration_secs), 0) FROM tracks",
            [],
            |r| r.get(0),
        )?;

        let (plays, auto_selected_plays): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(auto_selected), 0) FROM play_history",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT analysis_status, COUNT(*) FROM tracks
             GROUP BY analysis_status ORDER BY COUNT(*) DESC",
        )?;
        let by_status = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(LibraryStats {
            total_tracks,
            scorable_tracks,
            total_duration_hours: total_secs / 3600.0,
            plays,
            auto_selected_plays,
            by_status,
        })
    }
}
