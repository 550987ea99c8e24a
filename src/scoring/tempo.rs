/// Drift (BPM) → score breakpoints, linearly interpolated between points.
const DRIFT_CURVE: [(f64, f64); 6] = [
    (1.0, 100.0),
    (3.0, 90.0),
    (6.0, 60.0),
    (10.0, 30.0),
    (20.0, 10.0),
    (40.0, 0.0),
];

/// Half/double-time matches earn this share of a direct match.
const HALF_DOUBLE_FACTOR: f64 = 0.8;

fn known(bpm: f64) -> bool {
    bpm.is_finite() && bpm > 0.0
}

fn drift_score(drift: f64) -> f64 {
    let (first_d, first_s) = DRIFT_CURVE[0];
    if drift <= first_d {
        return first_s;
    }
    for pair in DRIFT_CURVE.windows(2) {
        let (d0, s0) = pair[0];
        let (d1, s1) = pair[1];
        if drift <= d1 {
            return s0 + (s1 - s0) * (drift - d0) / (d1 - d0);
        }
    }
    0.0
}

/// Drift of `candidate` from double or half of `current`, whichever is closer.
fn half_double_drift(current: f64, candidate: f64) -> f64 {
    (candidate - current * 2.0)
        .abs()
        .min((candidate - current / 2.0).abs())
}

/// BPM fit, 0-100. Unknown tempo (≤ 0) on either side is neutral.
pub fn bpm_compatibility_score(current: f64, candidate: f64) -> f64 {
    if !known(current) || !known(candidate) {
        return 50.0;
    }
    let direct = drift_score((current - candidate).abs());
    let related = drift_score(half_double_drift(current, candidate)) * HALF_DOUBLE_FACTOR;
    direct.max(related)
}

fn fmt_bpm(v: f64) -> String {
    if (v - v.round()).abs() < 0.05 {
        format!("{:.0}", v)
    } else {
        format!("{:.1}", v)
    }
}

pub fn bpm_compatibility_reason(current: f64, candidate: f64) -> String {
    if !known(current) || !known(candidate) {
        return "BPM data unavailable".to_string();
    }
    let drift = (current - candidate).abs();
    if drift < 0.05 {
        return "Exact BPM match".to_string();
    }

    let direct = drift_score(drift);
    let related = drift_score(half_double_drift(current, candidate)) * HALF_DOUBLE_FACTOR;
    if related > direct {
        return format!(
            "Half/double time ({} → {})",
            fmt_bpm(current),
            fmt_bpm(candidate)
        );
    }
    if drift <= 10.0 {
        format!("±{} BPM", fmt_bpm(drift))
    } else {
        format!("Large BPM jump (±{})", fmt_bpm(drift))
    }
}
