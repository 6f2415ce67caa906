use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};
use trawl_config::load_workspace_config;
use trawl_store::{CommitLinkRecord, SqliteStore, Store};

use crate::settings::{EngineSettings, LinkingSettings};
use crate::{AnalysisError, require_project};

pub const LINK_CERTAINTY: i64 = i64::MAX;

const BUG_KEYWORDS: &[&str] = &[
    "bug",
    "bugs",
    "fix",
    "fixes",
    "fixed",
    "fixing",
    "close",
    "closes",
    "closed",
    "closing",
    "resolve",
    "resolves",
    "resolved",
    "resolving",
    "reopen",
    "reopens",
    "reopened",
    "reopening",
    "issue",
    "issues",
    "ticket",
    "tickets",
    "regression",
    "regressions",
];

static BUG_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/show_bug\.cgi\?id=(\d+)").expect("valid bug link regex"));
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n)+").expect("valid paragraph break regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Word,
    BugKeyword,
    Numeric(i64),
    Link(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BugReference {
    pub number: i64,
    /// Keywords seen before the number in its paragraph, plus one; links
    /// carry [`LINK_CERTAINTY`].
    pub certainty: i64,
}

#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    keywords: HashSet<String>,
    min_digits: usize,
    max_digits: usize,
}

impl ReferenceExtractor {
    pub fn new(settings: &LinkingSettings) -> Self {
        let keywords = BUG_KEYWORDS
            .iter()
            .map(|keyword| (*keyword).to_owned())
            .chain(
                settings
                    .extra_keywords
                    .iter()
                    .map(|keyword| normalize_token(keyword))
                    .filter(|keyword| !keyword.is_empty()),
            )
            .collect();
        Self {
            keywords,
            min_digits: settings.min_id_digits,
            max_digits: settings.max_id_digits,
        }
    }

    pub fn classify(&self, raw: &str) -> Token {
        let normalized = normalize_token(raw);
        if self.keywords.contains(&normalized) {
            return Token::BugKeyword;
        }

        if let Some(number) = BUG_LINK
            .captures(raw)
            .and_then(|captures| captures[1].parse::<i64>().ok())
        {
            return Token::Link(number);
        }

        let digits = normalized.len();
        if (self.min_digits..=self.max_digits).contains(&digits)
            && normalized.bytes().all(|byte| byte.is_ascii_digit())
        {
            if let Ok(number) = normalized.parse::<i64>() {
                return Token::Numeric(number);
            }
        }

        Token::Word
    }

    pub fn extract(&self, message: &str) -> Vec<BugReference> {
        let message = message.replace("\r\n", "\n");
        let mut references: Vec<BugReference> = Vec::new();

        for paragraph in PARAGRAPH_BREAK.split(&message) {
            let mut score: i64 = 0;
            for raw in paragraph.split_whitespace() {
                let accepted = match self.classify(raw) {
                    Token::BugKeyword => {
                        score += 1;
                        None
                    }
                    Token::Link(number) => Some(BugReference {
                        number,
                        certainty: LINK_CERTAINTY,
                    }),
                    Token::Numeric(number) if score + 1 > 1 => Some(BugReference {
                        number,
                        certainty: score + 1,
                    }),
                    Token::Numeric(_) | Token::Word => None,
                };

                if let Some(reference) = accepted {
                    match references
                        .iter_mut()
                        .find(|existing| existing.number == reference.number)
                    {
                        Some(existing) => {
                            existing.certainty = existing.certainty.max(reference.certainty)
                        }
                        None => references.push(reference),
                    }
                }
            }
        }

        references
    }
}

fn normalize_token(raw: &str) -> String {
    raw.trim_matches(|ch: char| !ch.is_alphanumeric())
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitLinkOutcome {
    pub project: String,
    pub links_cleared: usize,
    pub commits_scanned: usize,
    pub references_found: usize,
    pub links_written: usize,
    pub unresolved_references: usize,
}

pub struct CommitLinkAnalyzer {
    workspace: PathBuf,
    extractor: ReferenceExtractor,
}

impl CommitLinkAnalyzer {
    pub fn new(workspace: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let workspace = workspace.as_ref().to_path_buf();
        let config = load_workspace_config(&workspace)?;
        let settings = EngineSettings::from_config(&config)?;
        Ok(Self::with_settings(workspace, &settings))
    }

    pub fn with_settings(workspace: impl AsRef<Path>, settings: &EngineSettings) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
            extractor: ReferenceExtractor::new(&settings.linking),
        }
    }

    pub fn run(&self, project: &str) -> Result<CommitLinkOutcome, AnalysisError> {
        let store = SqliteStore::open(&self.workspace)?;
        let project = require_project(&store, project)?;

        let mut outcome = CommitLinkOutcome {
            project: project.name.clone(),
            links_cleared: store.clear_commit_links(project.id)?,
            commits_scanned: 0,
            references_found: 0,
            links_written: 0,
            unresolved_references: 0,
        };

        for commit in store.list_commits(project.id)? {
            outcome.commits_scanned += 1;
            for reference in self.extractor.extract(&commit.message) {
                outcome.references_found += 1;
                let Some(bug) = store.find_bug(project.id, reference.number)? else {
                    debug!(
                        commit = %commit.hash,
                        bug = reference.number,
                        "referenced bug is not imported"
                    );
                    outcome.unresolved_references += 1;
                    continue;
                };

                store.insert_commit_link(CommitLinkRecord {
                    commit_id: commit.id,
                    bug_id: bug.id,
                    certainty: reference.certainty,
                })?;
                outcome.links_written += 1;
            }
        }

        info!(
            project = %project.name,
            commits = outcome.commits_scanned,
            references = outcome.references_found,
            links = outcome.links_written,
            unresolved = outcome.unresolved_references,
            "linked commits to bugs"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ReferenceExtractor {
        ReferenceExtractor::new(&LinkingSettings::default())
    }

    fn numbers(message: &str) -> Vec<(i64, i64)> {
        extractor()
            .extract(message)
            .into_iter()
            .map(|reference| (reference.number, reference.certainty))
            .collect()
    }

    #[test]
    fn keyword_before_number_links() {
        assert_eq!(numbers("see bug 1234"), vec![(1234, 2)]);
        assert!(numbers("1234").is_empty());
    }

    #[test]
    fn bug_tracker_url_links_without_keywords() {
        assert_eq!(
            numbers("landed https://bugzilla.example.org/show_bug.cgi?id=5678"),
            vec![(5678, LINK_CERTAINTY)]
        );
    }

    #[test]
    fn keyword_must_precede_number_in_the_same_paragraph() {
        assert!(numbers("1234 fixed").is_empty());
        assert!(numbers("Fixes the crash.\n\nSee 1234 for details").is_empty());
        assert_eq!(numbers("Fixes the crash\nsee 1234"), vec![(1234, 2)]);
    }

    #[test]
    fn duplicates_keep_the_highest_certainty() {
        assert_eq!(
            numbers("Bug 1234, fixes bug #1234; also 99999"),
            vec![(1234, 4), (99999, 4)]
        );
    }

    #[test]
    fn digit_bounds_filter_numbers() {
        assert!(numbers("fixes 123").is_empty());
        assert!(numbers("fixes 1234567").is_empty());

        let wide = ReferenceExtractor::new(&LinkingSettings {
            min_id_digits: 3,
            max_id_digits: 7,
            extra_keywords: Vec::new(),
        });
        assert_eq!(
            wide.extract("fixes 123 and 1234567"),
            vec![
                BugReference {
                    number: 123,
                    certainty: 2
                },
                BugReference {
                    number: 1234567,
                    certainty: 2
                },
            ]
        );
    }

    #[test]
    fn tokens_are_classified_after_trimming_punctuation() {
        let extractor = extractor();
        assert_eq!(extractor.classify("Fixes:"), Token::BugKeyword);
        assert_eq!(extractor.classify("(#12345)."), Token::Numeric(12345));
        assert_eq!(
            extractor.classify("<https://example.org/show_bug.cgi?id=42>"),
            Token::Link(42)
        );
        assert_eq!(extractor.classify("xshow_bug.cgi?id=5"), Token::Word);
        assert_eq!(extractor.classify("v1.2"), Token::Word);
        assert_eq!(extractor.classify("12ab"), Token::Word);
        assert_eq!(extractor.classify("--"), Token::Word);
    }

    #[test]
    fn extra_keywords_extend_the_vocabulary() {
        let extractor = ReferenceExtractor::new(&LinkingSettings {
            extra_keywords: vec!["Backout".to_owned(), "  ".to_owned()],
            ..LinkingSettings::default()
        });
        assert_eq!(extractor.classify("backout"), Token::BugKeyword);
        assert_eq!(
            extractor.extract("Backout 4321"),
            vec![BugReference {
                number: 4321,
                certainty: 2
            }]
        );
    }
}
