pub mod models;
pub mod queries;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: &'static str, message: String },
    #[error("Track {0} not found")]
    TrackNotFound(i64),
}

pub type Result<T> = std::result::Result<T, DbError>;

const SCHEMA_VERSION: i32 = 2;

pub struct Database {
    pub conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        // WAL mode for better concurrent read performance
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.migrate()?;
        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if version > SCHEMA_VERSION {
            return Err(DbError::Migration(format!(
                "database schema v{version} is newer than this build (v{SCHEMA_VERSION})"
            )));
        }

        if version < 1 {
            self.migrate_v1()?;
        }
        if version < 2 {
            self.migrate_v2()?;
        }

        self.conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// V1: catalog + play history
    fn migrate_v1(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tracks (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                file_path       TEXT UNIQUE,
                title           TEXT NOT NULL,
                artist          TEXT,
                duration_secs   REAL NOT NULL DEFAULT 0,

                -- Filled by analysis
                bpm             REAL,
                musical_key     TEXT,
                energy_level    INTEGER CHECK (energy_level BETWEEN 1 AND 10),
                analysis_status TEXT NOT NULL DEFAULT 'pending',

                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_tracks_status ON tracks(analysis_status);
            CREATE INDEX IF NOT EXISTS idx_tracks_bpm ON tracks(bpm);
            CREATE INDEX IF NOT EXISTS idx_tracks_energy ON tracks(energy_level);

            CREATE TABLE IF NOT EXISTS play_history (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                track_id        INTEGER NOT NULL REFERENCES tracks(id) ON DELETE CASCADE,
                played_at       TEXT NOT NULL,
                auto_selected   INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_history_played ON play_history(played_at);
            CREATE INDEX IF NOT EXISTS idx_history_track ON play_history(track_id);
            ",
        )?;
        Ok(())
    }

    /// V2: Auto-DJ settings row + stored beat grids
    fn migrate_v2(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- Single settings record, id pinned to 1
            CREATE TABLE IF NOT EXISTS auto_dj_settings (
                id               INTEGER PRIMARY KEY CHECK (id = 1),
                enabled          INTEGER NOT NULL,
                prefer_harmonic  INTEGER NOT NULL,
                strict_bpm       INTEGER NOT NULL,
                energy_style     TEXT NOT NULL,
                recency_limit    INTEGER NOT NULL,
                updated_at       TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Beat grid per track, stored as exported JSON
            CREATE TABLE IF NOT EXISTS beat_grids (
                track_id    INTEGER PRIMARY KEY REFERENCES tracks(id) ON DELETE CASCADE,
                grid_json   TEXT NOT NULL,
                is_locked   INTEGER NOT NULL DEFAULT 0,
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )?;
        Ok(())
    }
}
