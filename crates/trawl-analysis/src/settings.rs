use trawl_config::TrawlConfig;
use trawl_fuzzy::Strategy;

use crate::AnalysisError;

// Wider ids no longer fit an i64.
const MAX_SUPPORTED_ID_DIGITS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSettings {
    pub strategy: Strategy,
    pub distance: usize,
}

impl MatchSettings {
    pub fn new(strategy: Strategy, distance: usize) -> Self {
        Self { strategy, distance }
    }

    pub fn encode(&self, word: &str) -> Vec<String> {
        self.strategy.encode(word)
    }

    fn resolve(section: &str, strategy: &str, distance: i64) -> Result<Self, AnalysisError> {
        let strategy = strategy
            .parse::<Strategy>()
            .map_err(|err| AnalysisError::InvalidSettings(format!("{section}.strategy: {err}")))?;
        let distance = usize::try_from(distance).map_err(|_| {
            AnalysisError::InvalidSettings(format!(
                "{section}.distance must not be negative, got {distance}"
            ))
        })?;
        Ok(Self { strategy, distance })
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self::new(Strategy::Direct, 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkingSettings {
    pub min_id_digits: usize,
    pub max_id_digits: usize,
    pub extra_keywords: Vec<String>,
}

impl Default for LinkingSettings {
    fn default() -> Self {
        Self {
            min_id_digits: trawl_config::DEFAULT_MIN_ID_DIGITS as usize,
            max_id_digits: trawl_config::DEFAULT_MAX_ID_DIGITS as usize,
            extra_keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub interlink: Option<MatchSettings>,
    pub merge_colocated: bool,
    pub attribution: MatchSettings,
    pub linking: LinkingSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            interlink: Some(MatchSettings::default()),
            merge_colocated: true,
            attribution: MatchSettings::default(),
            linking: LinkingSettings::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &TrawlConfig) -> Result<Self, AnalysisError> {
        let interlink = match config.interlink.fuzzy_strategy() {
            Some(strategy) => Some(MatchSettings::resolve(
                "interlink",
                strategy,
                config.interlink.distance,
            )?),
            None => None,
        };
        let attribution = MatchSettings::resolve(
            "attribution",
            &config.attribution.strategy,
            config.attribution.distance,
        )?;

        let linking = &config.linking;
        if linking.min_id_digits == 0 || linking.min_id_digits > linking.max_id_digits {
            return Err(AnalysisError::InvalidSettings(format!(
                "linking digit bounds must satisfy 1 <= min_id_digits <= max_id_digits, got {}..{}",
                linking.min_id_digits, linking.max_id_digits
            )));
        }
        if linking.max_id_digits > MAX_SUPPORTED_ID_DIGITS {
            return Err(AnalysisError::InvalidSettings(format!(
                "linking.max_id_digits must be at most {MAX_SUPPORTED_ID_DIGITS}, got {}",
                linking.max_id_digits
            )));
        }

        Ok(Self {
            interlink,
            merge_colocated: config.interlink.merge_colocated,
            attribution,
            linking: LinkingSettings {
                min_id_digits: linking.min_id_digits as usize,
                max_id_digits: linking.max_id_digits as usize,
                extra_keywords: linking.extra_keywords.clone(),
            },
        })
    }
}
