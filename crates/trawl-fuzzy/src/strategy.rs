use std::fmt;
use std::str::FromStr;

use crate::phonetic;

/// How a word is turned into comparable codes before distance matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Direct,
    DoubleMetaphone,
    Metaphone,
    Caverphone,
    Soundex,
    RefinedSoundex,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Strategy::Direct,
        Strategy::DoubleMetaphone,
        Strategy::Metaphone,
        Strategy::Caverphone,
        Strategy::Soundex,
        Strategy::RefinedSoundex,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::DoubleMetaphone => "double_metaphone",
            Self::Metaphone => "metaphone",
            Self::Caverphone => "caverphone",
            Self::Soundex => "soundex",
            Self::RefinedSoundex => "refined_soundex",
        }
    }

    /// Codes for `word`, never containing an empty code. Direct yields the
    /// lowercased word; Double Metaphone may yield two codes.
    pub fn encode(self, word: &str) -> Vec<String> {
        let word = word.trim();
        if word.is_empty() {
            return Vec::new();
        }

        let codes = match self {
            Self::Direct => vec![word.to_lowercase()],
            Self::DoubleMetaphone => return phonetic::double_metaphone(word).codes(),
            Self::Metaphone => vec![phonetic::metaphone(word)],
            Self::Caverphone => vec![phonetic::caverphone(word)],
            Self::Soundex => vec![phonetic::soundex(word)],
            Self::RefinedSoundex => vec![phonetic::refined_soundex(word)],
        };
        codes.into_iter().filter(|code| !code.is_empty()).collect()
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or_else(|| {
                let expected = Self::ALL
                    .iter()
                    .map(|strategy| strategy.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "invalid strategy '{}', expected one of: {expected}",
                    value.trim()
                )
            })
    }
}
