pub mod quantize;
pub mod tap;

use serde::{Deserialize, Serialize};

/// BPM reported for a grid with fewer than two markers.
pub const DEFAULT_BPM: f64 = 120.0;
/// How far from a marker `remove_beat_marker` will reach, in seconds.
pub const REMOVE_TOLERANCE: f64 = 0.1;
/// How far from a marker `beat_at` will reach, in seconds.
pub const LOOKUP_TOLERANCE: f64 = 0.05;
/// Upper bound on markers in a generated grid.
pub const MAX_GENERATED_BEATS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatMarker {
    /// Seconds from track start.
    pub time: f64,
    /// Position in the bar, from 1.
    pub beat_number: u32,
    pub is_downbeat: bool,
}

/// A track's beat timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatGrid {
    pub bpm: f64,
    /// Time of the first beat, seconds.
    pub offset: f64,
    pub beats: Vec<BeatMarker>,
    /// Locked grids are kept over fresh auto-detection.
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

/// Lay beats at a fixed `60 / bpm` interval from `offset` up to `duration`.
/// Beats before the track start are skipped but keep their bar position.
/// A non-positive BPM yields an empty grid.
pub fn generate_beat_grid(bpm: f64, offset: f64, duration: f64, beats_per_bar: u32) -> BeatGrid {
    let beats_per_bar = beats_per_bar.max(1) as u64;
    let mut beats = Vec::new();

    let interval = 60.0 / bpm;
    if interval.is_finite() && interval > 0.0 && offset.is_finite() && duration.is_finite() {
        let first = if offset < 0.0 { (-offset / interval).ceil() } else { 0.0 };
        let last = ((duration - offset) / interval).ceil();
        let mut count = (last - first).max(0.0);
        if count > MAX_GENERATED_BEATS as f64 {
            log::warn!(
                "Beat grid at {bpm} BPM over {duration}s truncated to {MAX_GENERATED_BEATS} beats"
            );
            count = MAX_GENERATED_BEATS as f64;
        }
        let first = first as u64;

        // Multiply rather than accumulate so long tracks don't drift
        for i in first..first + count as u64 {
            let time = offset + i as f64 * interval;
            if time < 0.0 {
                continue;
            }
            if time >= duration {
                break;
            }
            let beat_number = (i % beats_per_bar) as u32 + 1;
            beats.push(BeatMarker {
                time,
                beat_number,
                is_downbeat: beat_number == 1,
            });
        }
    }

    BeatGrid {
        bpm,
        offset,
        beats,
        is_locked: false,
        confidence: 1.0,
    }
}

impl BeatGrid {
    fn closest_beat_index(&self, time: f64) -> Option<usize> {
        self.beats
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.time - time)
                    .abs()
                    .total_cmp(&(b.time - time).abs())
            })
            .map(|(i, _)| i)
    }

    /// Mean of consecutive marker intervals, as BPM.
    fn recompute_bpm(&mut self) {
        let n = self.beats.len();
        if n < 2 {
            self.bpm = DEFAULT_BPM;
            return;
        }
        let mean_interval = (self.beats[n - 1].time - self.beats[0].time) / (n - 1) as f64;
        if mean_interval > 0.0 {
            self.bpm = 60.0 / mean_interval;
        }
    }

    /// Insert a marker in time order. Its bar position follows the marker
    /// before it.
    pub fn add_beat_marker(&mut self, time: f64, beats_per_bar: u32) {
        let beats_per_bar = beats_per_bar.max(1);
        let index = self
            .beats
            .iter()
            .position(|b| b.time > time)
            .unwrap_or(self.beats.len());

        let beat_number = match index.checked_sub(1).map(|i| &self.beats[i]) {
            Some(prev) => prev.beat_number % beats_per_bar + 1,
            None => 1,
        };
        self.beats.insert(
            index,
            BeatMarker {
                time,
                beat_number,
                is_downbeat: beat_number == 1,
            },
        );
        self.recompute_bpm();
    }

    /// Remove the marker nearest `time` if it lies within `tolerance`.
    /// Returns the removed marker.
    pub fn remove_beat_marker(&mut self, time: f64, tolerance: f64) -> Option<BeatMarker> {
        let index = self.closest_beat_index(time)?;
        if (self.beats[index].time - time).abs() > tolerance {
            return None;
        }
        let removed = self.beats.remove(index);
        self.recompute_bpm();
        Some(removed)
    }

    /// Shift the whole grid by `delta` seconds.
    pub fn nudge(&mut self, delta: f64) {
        self.offset += delta;
        for beat in &mut self.beats {
            beat.time += delta;
        }
    }

    /// Rebuild the grid at a new tempo from the same offset. The lock flag
    /// and confidence carry over.
    pub fn set_bpm(&mut self, bpm: f64, duration: f64, beats_per_bar: u32) {
        let rebuilt = generate_beat_grid(bpm, self.offset, duration, beats_per_bar);
        self.bpm = rebuilt.bpm;
        self.beats = rebuilt.beats;
    }

    pub fn toggle_lock(&mut self) -> bool {
        self.is_locked = !self.is_locked;
        self.is_locked
    }

    /// The marker within `tolerance` of `time`, if any.
    pub fn beat_at(&self, time: f64, tolerance: f64) -> Option<&BeatMarker> {
        let beat = &self.beats[self.closest_beat_index(time)?];
        ((beat.time - time).abs() <= tolerance).then_some(beat)
    }

    /// Snap to the nearest existing marker; an empty grid leaves `time` alone.
    pub fn quantize_to_grid(&self, time: f64) -> f64 {
        self.closest_beat_index(time)
            .map_or(time, |i| self.beats[i].time)
    }

    /// Take a freshly detected grid unless this one is locked.
    /// Returns whether the grid was replaced.
    pub fn merge_detected(&mut self, detected: BeatGrid) -> bool {
        if self.is_locked {
            log::debug!("Keeping locked beat grid over detected {:.2} BPM", detected.bpm);
            return false;
        }
        *self = detected;
        true
    }

    pub fn downbeats(&self) -> impl Iterator<Item = &BeatMarker> {
        self.beats.iter().filter(|b| b.is_downbeat)
    }

    fn is_valid(&self) -> bool {
        let finite = self.bpm.is_finite()
            && self.offset.is_finite()
            && self.confidence.is_finite()
            && self.beats.iter().all(|b| b.time.is_finite());
        finite
            && self.bpm > 0.0
            && self.beats.iter().all(|b| b.beat_number >= 1)
            && self.beats.windows(2).all(|w| w[0].time <= w[1].time)
    }
}

pub fn export_beat_grid(grid: &BeatGrid) -> String {
    // Serializing plain numbers and bools cannot fail
    serde_json::to_string_pretty(grid).unwrap_or_default()
}

/// Parse and validate an exported grid. Malformed input gives `None`.
pub fn import_beat_grid(json: &str) -> Option<BeatGrid> {
    let grid: BeatGrid = match serde_json::from_str(json) {
        Ok(grid) => grid,
        Err(e) => {
            log::warn!("Failed to import beat grid: {}", e);
            return None;
        }
    };
    if !grid.is_valid() {
        log::warn!("Rejected beat grid: non-finite, unordered or non-positive values");
        return None;
    }
    Some(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_120() {
        let grid = generate_beat_grid(120.0, 0.0, 2.0, 4);
        let times: Vec<f64> = grid.beats.iter().map(|b| b.time).collect();
        let numbers: Vec<u32> = grid.beats.iter().map(|b| b.beat_number).collect();
        let downbeats: Vec<bool> = grid.beats.iter().map(|b| b.is_downbeat).collect();
        assert_eq!(times, [0.0, 0.5, 1.0, 1.5]);
        assert_eq!(numbers, [1, 2, 3, 4]);
        assert_eq!(downbeats, [true, false, false, false]);
        assert!(!grid.is_locked);
    }

    #[test]
    fn test_one_downbeat_per_bar() {
        let grid = generate_beat_grid(128.0, 0.2, 60.0, 4);
        assert!(grid.beats.windows(2).all(|w| w[0].time < w[1].time));
        for bar in grid.beats.chunks(4) {
            assert_eq!(bar.iter().filter(|b| b.is_downbeat).count(), 1);
            assert!(bar[0].is_downbeat);
        }
        assert_eq!(grid.downbeats().count(), grid.beats.len().div_ceil(4));
    }

    #[test]
    fn test_generate_rejects_bad_bpm() {
        assert!(generate_beat_grid(0.0, 0.0, 10.0, 4).beats.is_empty());
        assert!(generate_beat_grid(f64::NAN, 0.0, 10.0, 4).beats.is_empty());
    }

    #[test]
    fn test_negative_offset_skips_pre_roll() {
        // Beats at -0.25 and 0.0 from offset -0.25: the first is dropped
        let grid = generate_beat_grid(240.0, -0.25, 1.0, 4);
        let times: Vec<f64> = grid.beats.iter().map(|b| b.time).collect();
        assert_eq!(times, vec![0.0, 0.25, 0.5, 0.75]);
        assert!(grid.beats.iter().all(|b| b.time >= 0.0));
        // Bar position is counted from the offset
        assert_eq!(grid.beats[0].beat_number, 2);
        assert!(grid.beats[3].is_downbeat);
        assert_eq!(grid.offset, -0.25);

        // Offset past the end leaves nothing
        assert!(generate_beat_grid(120.0, 20.0, 10.0, 4).beats.is_empty());
    }

    #[test]
    fn test_extreme_grid_is_bounded() {
        let grid = generate_beat_grid(1.0e9, 0.0, 600.0, 4);
        assert_eq!(grid.beats.len(), MAX_GENERATED_BEATS);
        assert!(grid.beats.windows(2).all(|w| w[0].time < w[1].time));

        let grid = generate_beat_grid(120.0, -1.0e12, 10.0, 4);
        assert_eq!(grid.beats.len(), 20);
    }

    #[test]
    fn test_add_marker_follows_predecessor() {
        let mut grid = generate_beat_grid(120.0, 0.0, 2.0, 4);
        grid.add_beat_marker(2.0, 4);
        let last = grid.beats.last().unwrap();
        assert_eq!(last.beat_number, 1);
        assert!(last.is_downbeat);
        assert!((grid.bpm - 120.0).abs() < 1e-9);

        grid.add_beat_marker(0.75, 4);
        assert_eq!(grid.beats[2].time, 0.75);
        assert_eq!(grid.beats[2].beat_number, 3);
        // Six markers over two seconds
        assert!((grid.bpm - 150.0).abs() < 1e-9);

        let mut empty = generate_beat_grid(0.0, 0.0, 0.0, 4);
        empty.add_beat_marker(1.0, 4);
        assert_eq!(empty.beats[0].beat_number, 1);
        assert_eq!(empty.bpm, DEFAULT_BPM);
    }

    #[test]
    fn test_remove_within_tolerance() {
        let mut grid = generate_beat_grid(120.0, 0.0, 2.0, 4);
        assert!(grid.remove_beat_marker(0.8, REMOVE_TOLERANCE).is_none());
        assert_eq!(grid.beats.len(), 4);

        let removed = grid.remove_beat_marker(1.46, REMOVE_TOLERANCE).unwrap();
        assert_eq!(removed.time, 1.5);
        assert_eq!(grid.beats.len(), 3);
        assert!((grid.bpm - 120.0).abs() < 1e-9);

        grid.remove_beat_marker(0.0, REMOVE_TOLERANCE);
        grid.remove_beat_marker(0.5, REMOVE_TOLERANCE);
        assert_eq!(grid.bpm, DEFAULT_BPM);
    }

    #[test]
    fn test_nudge_and_set_bpm() {
        let mut grid = generate_beat_grid(120.0, 0.1, 2.0, 4);
        grid.nudge(0.01);
        assert!((grid.offset - 0.11).abs() < 1e-12);
        assert!((grid.beats[1].time - 0.61).abs() < 1e-12);

        grid.toggle_lock();
        grid.set_bpm(60.0, 4.0, 4);
        assert_eq!(grid.bpm, 60.0);
        assert!((grid.beats[1].time - 1.11).abs() < 1e-12);
        assert_eq!(grid.beats.len(), 4);
        assert!(grid.is_locked);
    }

    #[test]
    fn test_lookup_and_snap() {
        let grid = generate_beat_grid(120.0, 0.0, 4.0, 4);
        assert_eq!(grid.beat_at(1.03, LOOKUP_TOLERANCE).map(|b| b.time), Some(1.0));
        assert!(grid.beat_at(1.2, LOOKUP_TOLERANCE).is_none());
        assert_eq!(grid.quantize_to_grid(1.3), 1.5);
        let empty = generate_beat_grid(0.0, 0.0, 0.0, 4);
        assert_eq!(empty.quantize_to_grid(1.3), 1.3);
    }

    #[test]
    fn test_locked_grid_survives_detection() {
        let mut grid = generate_beat_grid(120.0, 0.0, 4.0, 4);
        grid.toggle_lock();
        assert!(!grid.merge_detected(generate_beat_grid(126.0, 0.0, 4.0, 4)));
        assert_eq!(grid.bpm, 120.0);

        grid.toggle_lock();
        assert!(grid.merge_detected(generate_beat_grid(126.0, 0.0, 4.0, 4)));
        assert_eq!(grid.bpm, 126.0);
    }

    #[test]
    fn test_export_import_exact() {
        let mut grid = generate_beat_grid(127.93, 0.0371, 30.0, 3);
        grid.nudge(-0.013);
        grid.add_beat_marker(11.111_111_111, 3);
        grid.confidence = 0.8137;
        grid.toggle_lock();

        let json = export_beat_grid(&grid);
        assert!(json.contains("\"beatNumber\""));
        assert!(json.contains("\"isLocked\": true"));
        let back = import_beat_grid(&json).unwrap();
        assert_eq!(back, grid);
        for (a, b) in back.beats.iter().zip(&grid.beats) {
            assert_eq!(a.time.to_bits(), b.time.to_bits());
        }
        assert_eq!(back.bpm.to_bits(), grid.bpm.to_bits());
    }

    #[test]
    fn test_import_rejects_malformed() {
        assert!(import_beat_grid("not json").is_none());
        assert!(import_beat_grid("{}").is_none());
        assert!(import_beat_grid(r#"{"bpm": "fast", "offset": 0, "beats": []}"#).is_none());
        assert!(import_beat_grid(r#"{"bpm": 120, "offset": 0, "beats": 3}"#).is_none());
        assert!(import_beat_grid(r#"{"bpm": -5, "offset": 0, "beats": []}"#).is_none());
        assert!(
            import_beat_grid(
                r#"{"bpm": 120, "offset": 0, "beats": [
                    {"time": 1.0, "beatNumber": 1, "isDownbeat": true},
                    {"time": 0.5, "beatNumber": 2, "isDownbeat": false}
                ]}"#
            )
            .is_none()
        );
        assert!(
            import_beat_grid(
                r#"{"bpm": 120, "offset": 0, "beats": [
                    {"time": 0.0, "beatNumber": 0, "isDownbeat": true}
                ]}"#
            )
            .is_none()
        );
    }

    #[test]
    fn test_import_defaults() {
        let grid = import_beat_grid(r#"{"bpm": 120, "offset": 0.5, "beats": []}"#).unwrap();
        assert!(!grid.is_locked);
        assert_eq!(grid.confidence, 1.0);
    }
}
