use std::fmt;

/// Camelot wheel letter: A is minor, B is major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Minor,
    Major,
}

impl Mode {
    pub fn letter(self) -> char {
        match self {
            Self::Minor => 'A',
            Self::Major => 'B',
        }
    }

    fn flipped(self) -> Self {
        match self {
            Self::Minor => Self::Major,
            Self::Major => Self::Minor,
        }
    }
}

/// A position on the Camelot wheel, 1-12 plus mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CamelotKey {
    pub number: u8,
    pub mode: Mode,
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.mode.letter())
    }
}

impl CamelotKey {
    pub fn new(number: u8, mode: Mode) -> Option<Self> {
        (1..=12).contains(&number).then_some(Self { number, mode })
    }

    /// Step `delta` positions around the wheel, keeping the mode.
    fn rotate(self, delta: i32) -> Self {
        let n = (self.number as i32 - 1 + delta).rem_euclid(12) + 1;
        Self {
            number: n as u8,
            mode: self.mode,
        }
    }
}

/// How well a neighbouring key mixes, for operator display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Perfect,
    Excellent,
    Good,
}

impl Compatibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Excellent => "excellent",
            Self::Good => "good",
        }
    }
}

/// Parse a key in any common spelling: Camelot code ("8A"), full name
/// ("A Minor"), or short form ("Am", "C#m", "Ebmaj").
pub fn parse_key(raw: &str) -> Option<CamelotKey> {
    parse_camelot_code(raw).or_else(|| standard_key_to_camelot(raw))
}

pub fn parse_camelot_code(raw: &str) -> Option<CamelotKey> {
    let trimmed = raw.trim().to_ascii_uppercase();
    if trimmed.len() < 2 || !trimmed.is_ascii() {
        return None;
    }
    let (number, letter) = trimmed.split_at(trimmed.len() - 1);
    let mode = match letter {
        "A" => Mode::Minor,
        "B" => Mode::Major,
        _ => return None,
    };
    CamelotKey::new(number.parse().ok()?, mode)
}

fn standard_key_to_camelot(raw: &str) -> Option<CamelotKey> {
    let normalized = raw
        .trim()
        .replace('\u{266F}', "#")
        .replace('\u{266D}', "b");
    if normalized.is_empty() || !normalized.is_ascii() {
        return None;
    }
    let lower = normalized.to_ascii_lowercase();
    let len = normalized.len();

    let (root_raw, mode) = if lower.ends_with("minor") && len > 5 {
        (&normalized[..len - 5], Mode::Minor)
    } else if lower.ends_with("min") && len > 3 {
        (&normalized[..len - 3], Mode::Minor)
    } else if lower.ends_with('m') && len > 1 {
        (&normalized[..len - 1], Mode::Minor)
    } else if lower.ends_with("major") && len > 5 {
        (&normalized[..len - 5], Mode::Major)
    } else if lower.ends_with("maj") && len > 3 {
        (&normalized[..len - 3], Mode::Major)
    } else {
        (normalized.as_str(), Mode::Major)
    };
    let root = normalize_key_root(root_raw)?;

    let number = match (mode, root.as_str()) {
        (Mode::Minor, "G#" | "Ab") => 1,
        (Mode::Minor, "D#" | "Eb") => 2,
        (Mode::Minor, "A#" | "Bb") => 3,
        (Mode::Minor, "F") => 4,
        (Mode::Minor, "C") => 5,
        (Mode::Minor, "G") => 6,
        (Mode::Minor, "D") => 7,
        (Mode::Minor, "A") => 8,
        (Mode::Minor, "E") => 9,
        (Mode::Minor, "B") => 10,
        (Mode::Minor, "F#" | "Gb") => 11,
        (Mode::Minor, "C#" | "Db") => 12,
        (Mode::Major, "B") => 1,
        (Mode::Major, "F#" | "Gb") => 2,
        (Mode::Major, "C#" | "Db") => 3,
        (Mode::Major, "G#" | "Ab") => 4,
        (Mode::Major, "D#" | "Eb") => 5,
        (Mode::Major, "A#" | "Bb") => 6,
        (Mode::Major, "F") => 7,
        (Mode::Major, "C") => 8,
        (Mode::Major, "G") => 9,
        (Mode::Major, "D") => 10,
        (Mode::Major, "A") => 11,
        (Mode::Major, "E") => 12,
        _ => return None,
    };
    CamelotKey::new(number, mode)
}

fn normalize_key_root(root: &str) -> Option<String> {
    let stripped: String = root.chars().filter(|ch| !ch.is_whitespace()).collect();
    let mut chars = stripped.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if !matches!(letter, 'A'..='G') {
        return None;
    }

    let accidental = chars.next();
    if chars.next().is_some() {
        return None;
    }

    match accidental {
        Some('#') => Some(format!("{letter}#")),
        Some('b') | Some('B') => Some(format!("{letter}b")),
        Some(_) => None,
        None => Some(letter.to_string()),
    }
}

/// Canonical key name for a wheel position.
pub fn camelot_to_key(key: CamelotKey) -> &'static str {
    const MINOR: [&str; 12] = [
        "Ab Minor", "Eb Minor", "Bb Minor", "F Minor", "C Minor", "G Minor",
        "D Minor", "A Minor", "E Minor", "B Minor", "F# Minor", "C# Minor",
    ];
    const MAJOR: [&str; 12] = [
        "B Major", "Gb Major", "Db Major", "Ab Major", "Eb Major", "Bb Major",
        "F Major", "C Major", "G Major", "D Major", "A Major", "E Major",
    ];
    let idx = (key.number - 1) as usize;
    match key.mode {
        Mode::Minor => MINOR[idx],
        Mode::Major => MAJOR[idx],
    }
}

/// The same key, its relative, and the ±1 / ±2 neighbours in the same mode.
pub fn compatible_keys(key: CamelotKey) -> Vec<(CamelotKey, Compatibility)> {
    vec![
        (key, Compatibility::Perfect),
        (
            CamelotKey {
                number: key.number,
                mode: key.mode.flipped(),
            },
            Compatibility::Excellent,
        ),
        (key.rotate(1), Compatibility::Excellent),
        (key.rotate(-1), Compatibility::Excellent),
        (key.rotate(2), Compatibility::Good),
        (key.rotate(-2), Compatibility::Good),
    ]
}

/// Shortest distance around the wheel, 0-6.
pub fn wheel_distance(a: CamelotKey, b: CamelotKey) -> u8 {
    let diff = (a.number as i32 - b.number as i32).unsigned_abs() as u8;
    diff.min(12 - diff)
}

/// Harmonic fit between two wheel positions, 0-100.
pub fn camelot_score(from: CamelotKey, to: CamelotKey) -> f64 {
    if from == to {
        return 100.0;
    }
    let distance = wheel_distance(from, to);
    if from.mode != to.mode && distance == 0 {
        return 90.0;
    }
    if from.mode == to.mode {
        return match distance {
            1 => 80.0,
            2 => 70.0,
            3 => 60.0,
            4 => 45.0,
            5 => 30.0,
            _ => 0.0,
        };
    }
    // Mode mismatch on a different root
    let base = (70.0 - distance as f64 * 10.0).max(0.0);
    (base - 20.0).max(0.0)
}

fn known_key(raw: Option<&str>) -> Option<CamelotKey> {
    raw.filter(|k| !k.eq_ignore_ascii_case("unknown"))
        .and_then(parse_key)
}

/// Harmonic fit between two key names. Missing or unmapped keys score 50.
pub fn key_compatibility_score(from: Option<&str>, to: Option<&str>) -> f64 {
    match (known_key(from), known_key(to)) {
        (Some(a), Some(b)) => camelot_score(a, b),
        _ => 50.0,
    }
}

pub fn key_compatibility_reason(from: Option<&str>, to: Option<&str>) -> String {
    let (Some(a), Some(b)) = (known_key(from), known_key(to)) else {
        return "Key data unavailable".to_string();
    };
    if a == b {
        return format!("Perfect match ({a})");
    }

    let distance = wheel_distance(a, b);
    if distance == 0 {
        let relative = match a.mode {
            Mode::Major => "minor",
            Mode::Minor => "major",
        };
        return format!("Relative {relative} ({a} → {b})");
    }
    if a.mode == b.mode {
        return match distance {
            1 => format!("±1 semitone ({a} → {b})"),
            2 => format!("±2 semitones ({a} → {b})"),
            6 => format!("Tritone - avoid ({a} → {b})"),
            d => format!("{d} semitones ({a} → {b})"),
        };
    }
    format!("Different mode, {distance} semitones ({a} → {b})")
}
