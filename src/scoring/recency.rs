use crate::db::models::PlayHistoryEntry;

/// Replay fitness, 0-100, from where the track sits in the most-recent-first
/// history. Never played scores 100; the last two plays score 0.
pub fn recency_score(track_id: i64, history: &[PlayHistoryEntry], recency_limit: usize) -> f64 {
    let Some(index) = history.iter().position(|e| e.track_id == track_id) else {
        return 100.0;
    };
    let position = index + 1;

    if position <= 2 {
        return 0.0;
    }
    if position <= 4 {
        return 10.0;
    }
    if position <= 9 {
        return 50.0;
    }
    if position >= recency_limit {
        return 80.0;
    }

    // Ease from 50 at position 9 up to 80 at the limit
    let range = (recency_limit - 9) as f64;
    50.0 + (position - 9) as f64 / range * 30.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn history_with_target_at(position: usize, len: usize) -> Vec<PlayHistoryEntry> {
        (1..=len)
            .map(|p| PlayHistoryEntry {
                track_id: if p == position { 42 } else { 1000 + p as i64 },
                played_at: Utc::now(),
                auto_selected: true,
            })
            .collect()
    }

    #[test]
    fn test_never_played() {
        assert_eq!(recency_score(42, &[], 20), 100.0);
        assert_eq!(recency_score(42, &history_with_target_at(0, 5), 20), 100.0);
    }

    #[test]
    fn test_buckets() {
        let at = |p| recency_score(42, &history_with_target_at(p, 30), 20);
        assert_eq!(at(1), 0.0);
        assert_eq!(at(2), 0.0);
        assert_eq!(at(3), 10.0);
        assert_eq!(at(4), 10.0);
        assert_eq!(at(5), 50.0);
        assert_eq!(at(9), 50.0);
        assert!((at(15) - (50.0 + 6.0 / 11.0 * 30.0)).abs() < 1e-9);
        assert_eq!(at(20), 80.0);
        assert_eq!(at(25), 80.0);
    }

    #[test]
    fn test_first_occurrence_counts() {
        let mut history = history_with_target_at(12, 15);
        history[0].track_id = 42;
        assert_eq!(recency_score(42, &history, 20), 0.0);
    }

    #[test]
    fn test_penalty_eases_with_rank() {
        for limit in [5, 9, 10, 20, 50] {
            let mut last = -1.0;
            for p in 1..=60 {
                let s = recency_score(42, &history_with_target_at(p, 60), limit);
                assert!(s >= last, "limit {limit}: rank {p} scored {s} < {last}");
                assert!((0.0..=100.0).contains(&s));
                last = s;
            }
        }
    }
}
