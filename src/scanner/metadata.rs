use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::scoring::key::parse_key;

/// "Energy 7", "energy: 7", "8A - Energy 6" as written by DJ tagging tools.
static ENERGY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\benergy\s*[:=\-]?\s*(?P<level>\d{1,2})\b").unwrap()
});

/// Tags extracted from audio file metadata.
#[derive(Debug, Default)]
pub struct TagInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration_secs: Option<f64>,
    pub bpm: Option<f64>,
    pub musical_key: Option<String>,
    pub energy_level: Option<u8>,
}

/// Read tags from an audio file. Returns empty tags on failure.
pub fn read_tags(path: &Path) -> TagInfo {
    let tagged_file = match lofty::read_from_path(path) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("Could not read tags from {}: {}", path.display(), e);
            return TagInfo::default();
        }
    };

    let duration_secs = {
        let secs = tagged_file.properties().duration().as_secs_f64();
        if secs > 0.0 { Some(secs) } else { None }
    };

    // Try primary tag, then fall back
    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        return TagInfo {
            duration_secs,
            ..TagInfo::default()
        };
    };

    let bpm = tag
        .get_string(&ItemKey::Bpm)
        .or_else(|| tag.get_string(&ItemKey::IntegerBpm))
        .and_then(parse_bpm);
    let musical_key = tag.get_string(&ItemKey::InitialKey).and_then(normalize_key);
    let energy_level = tag.get_string(&ItemKey::Comment).and_then(parse_energy);

    TagInfo {
        title: tag.title().map(|s| s.to_string()),
        artist: tag.artist().map(|s| s.to_string()),
        duration_secs,
        bpm,
        musical_key,
        energy_level,
    }
}

/// Positive, finite BPM from a tag value like "128" or "127.95".
pub fn parse_bpm(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|b| b.is_finite() && *b > 0.0)
}

/// Keep a key tag only if it maps onto the Camelot wheel.
pub fn normalize_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    match parse_key(raw) {
        Some(_) => Some(raw.to_string()),
        None => {
            log::debug!("Ignoring unrecognised key tag '{raw}'");
            None
        }
    }
}

/// Energy 1-10 from a comment tag.
pub fn parse_energy(comment: &str) -> Option<u8> {
    let caps = ENERGY_RE.captures(comment)?;
    let level: u8 = caps.name("level")?.as_str().parse().ok()?;
    (1..=10).contains(&level).then_some(level)
}
