use std::fmt;

use serde::{Deserialize, Serialize};

/// 성취도 letter. Also used as the letter-equivalent axis for rank grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AchievementLevel {
    A,
    B,
    C,
    D,
    E,
}

impl AchievementLevel {
    pub fn normalized(self) -> f64 {
        match self {
            AchievementLevel::A => 1.0,
            AchievementLevel::B => 0.75,
            AchievementLevel::C => 0.5,
            AchievementLevel::D => 0.25,
            AchievementLevel::E => 0.0,
        }
    }

    /// Maps a normalized score back onto the letter axis, rounding to the nearest band.
    pub fn from_normalized(score: f64) -> Self {
        match score {
            s if s >= 0.875 => AchievementLevel::A,
            s if s >= 0.625 => AchievementLevel::B,
            s if s >= 0.375 => AchievementLevel::C,
            s if s >= 0.125 => AchievementLevel::D,
            _ => AchievementLevel::E,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "A" => Some(AchievementLevel::A),
            "B" => Some(AchievementLevel::B),
            "C" => Some(AchievementLevel::C),
            "D" => Some(AchievementLevel::D),
            "E" => Some(AchievementLevel::E),
            _ => None,
        }
    }
}

impl fmt::Display for AchievementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            AchievementLevel::A => "A",
            AchievementLevel::B => "B",
            AchievementLevel::C => "C",
            AchievementLevel::D => "D",
            AchievementLevel::E => "E",
        };
        f.write_str(letter)
    }
}

/// A subject grade as exported by the school record system.
///
/// Two scales coexist in real exports: the A–E 성취도 and the 1–9 석차등급
/// (1 is best). Both are projected onto `[0, 1]` by [`Grade::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scale", content = "value", rename_all = "snake_case")]
pub enum Grade {
    Achievement(AchievementLevel),
    Rank(u8),
}

pub const MIN_RANK: u8 = 1;
pub const MAX_RANK: u8 = 9;

impl Grade {
    /// Parses a single grade token: `A`..`E` (any case) or `1`..`9`,
    /// optionally suffixed with `등급`.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if let Some(level) = AchievementLevel::from_token(token) {
            return Some(Grade::Achievement(level));
        }
        let digits = token.strip_suffix("등급").unwrap_or(token).trim();
        match digits.parse::<u8>() {
            Ok(rank) if (MIN_RANK..=MAX_RANK).contains(&rank) => Some(Grade::Rank(rank)),
            _ => None,
        }
    }

    pub fn normalized(self) -> f64 {
        match self {
            Grade::Achievement(level) => level.normalized(),
            Grade::Rank(rank) => f64::from(MAX_RANK - rank) / f64::from(MAX_RANK - MIN_RANK),
        }
    }

    pub fn letter(self) -> AchievementLevel {
        match self {
            Grade::Achievement(level) => level,
            Grade::Rank(_) => AchievementLevel::from_normalized(self.normalized()),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Achievement(level) => write!(f, "{level}"),
            Grade::Rank(rank) => write!(f, "{rank}등급"),
        }
    }
}
