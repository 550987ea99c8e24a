use crate::settings::EnergyStyle;

/// Energy transition fit, 0-100. Energy 0 means the level is unknown.
pub fn energy_flow_score(from: u8, to: u8, style: EnergyStyle) -> f64 {
    if from == 0 || to == 0 {
        return 50.0;
    }
    let change = to as i32 - from as i32;
    let score = match style {
        EnergyStyle::Gradual => gradual_score(change),
        EnergyStyle::PeakValley => peak_valley_score(change, from),
        EnergyStyle::Chill => chill_score(change, to),
    };
    score.clamp(0.0, 100.0)
}

/// Small builds are ideal, small drops tolerated.
fn gradual_score(change: i32) -> f64 {
    match change {
        1..=2 => 100.0,
        0 => 85.0,
        -1 => 70.0,
        3..=4 => 60.0,
        -3..=-2 => 50.0,
        5..=6 => 35.0,
        -5..=-4 => 30.0,
        c if c.abs() >= 7 => 10.0,
        _ => 40.0,
    }
}

/// Rewards big swings, especially building into or dropping from a peak.
fn peak_valley_score(change: i32, from: u8) -> f64 {
    match change.abs() {
        3..=5 => 100.0,
        2 => 80.0,
        a if a >= 6 => {
            if change > 0 && from >= 5 {
                90.0
            } else if change < 0 && from >= 8 {
                85.0
            } else {
                70.0
            }
        }
        1 => 60.0,
        0 => 40.0,
        _ => 50.0,
    }
}

/// Low and steady. Landing in 1-5 earns a bonus on the non-ideal branches.
fn chill_score(change: i32, to: u8) -> f64 {
    let range_bonus = if (1..=5).contains(&to) { 20.0 } else { 0.0 };
    match change {
        -1..=1 => 100.0,
        -2 => 85.0 + range_bonus,
        2 => 70.0 + range_bonus,
        -3 | 3 => 50.0 + range_bonus,
        c if c.abs() >= 4 => {
            if to > 6 {
                (30.0 - (to as f64 - 6.0) * 5.0).max(0.0)
            } else {
                30.0
            }
        }
        _ => 40.0 + range_bonus,
    }
}

/// Direction and magnitude of the energy move, worded for the style.
pub fn energy_flow_reason(from: u8, to: u8, style: EnergyStyle) -> String {
    if from == 0 || to == 0 {
        return "Energy data unavailable".to_string();
    }
    let change = to as i32 - from as i32;
    if change == 0 {
        return match style {
            EnergyStyle::Chill => format!("Steady energy (E{to})"),
            _ => format!("No energy change (E{to})"),
        };
    }

    let direction = if change > 0 { "build" } else { "drop" };
    let change_text = format!("{change:+}");
    let magnitude = match (style, change.abs()) {
        (EnergyStyle::Gradual, 1..=2) => "Gradual",
        (EnergyStyle::Gradual, 3..=4) => "Moderate",
        (EnergyStyle::Gradual, _) => "Large",
        (EnergyStyle::PeakValley, a) if a >= 3 => "Dynamic",
        (EnergyStyle::PeakValley, _) => "Subtle",
        (EnergyStyle::Chill, 1) => "Gentle",
        (EnergyStyle::Chill, 2) => "Mild",
        (EnergyStyle::Chill, _) => "Noticeable",
    };
    format!("{magnitude} {direction} ({change_text})")
}
