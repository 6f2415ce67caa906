mod attribution;
mod parser;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;
use trawl_config::load_workspace_config;
use trawl_core::CommentId;
use trawl_store::{CommentFragmentRecord, FragmentKind, SqliteStore, Store};

use crate::settings::{EngineSettings, MatchSettings};
use crate::{AnalysisError, require_project};

pub use attribution::attribute_thread;
pub use parser::{ContentNode, ParagraphNode, ParsedComment, QuoteNode, parse_comment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributionOutcome {
    pub project: String,
    pub strategy: String,
    pub bugs: usize,
    pub comments: usize,
    pub nodes: usize,
    pub attributed: usize,
}

pub struct AttributionAnalyzer {
    workspace: PathBuf,
    matcher: MatchSettings,
}

impl AttributionAnalyzer {
    pub fn new(workspace: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let workspace = workspace.as_ref().to_path_buf();
        let config = load_workspace_config(&workspace)?;
        let settings = EngineSettings::from_config(&config)?;
        Ok(Self::with_settings(workspace, &settings))
    }

    pub fn with_settings(workspace: impl AsRef<Path>, settings: &EngineSettings) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
            matcher: settings.attribution,
        }
    }

    pub fn run(&self, project: &str) -> Result<AttributionOutcome, AnalysisError> {
        let store = SqliteStore::open(&self.workspace)?;
        let project = require_project(&store, project)?;
        let identities = store
            .list_identities(project.id)?
            .into_iter()
            .map(|identity| (identity.id, identity))
            .collect::<HashMap<_, _>>();

        let mut outcome = AttributionOutcome {
            project: project.name.clone(),
            strategy: self.matcher.strategy.as_str().to_owned(),
            bugs: 0,
            comments: 0,
            nodes: 0,
            attributed: 0,
        };

        for bug in store.list_bugs(project.id)? {
            let comments = store.list_comments(bug.id)?;
            if comments.is_empty() {
                continue;
            }
            let attachments = store.list_attachments(bug.id)?;
            let thread = attribute_thread(&comments, &attachments, &identities, &self.matcher);

            for (comment, parsed) in comments.iter().zip(&thread) {
                store.replace_comment_fragments(comment.id, &fragment_records(comment.id, parsed))?;
                outcome.nodes += parsed.nodes.len();
                outcome.attributed += parsed.attributed();
            }
            outcome.bugs += 1;
            outcome.comments += comments.len();
        }

        info!(
            project = %project.name,
            bugs = outcome.bugs,
            comments = outcome.comments,
            nodes = outcome.nodes,
            attributed = outcome.attributed,
            "attributed comment fragments"
        );
        Ok(outcome)
    }
}

fn fragment_records(comment_id: CommentId, parsed: &ParsedComment) -> Vec<CommentFragmentRecord> {
    parsed
        .nodes
        .iter()
        .enumerate()
        .map(|(position, node)| {
            let (kind, blank_lines_before, back_reference) = match node {
                ContentNode::Quote(quote) => (
                    FragmentKind::Quote,
                    0,
                    quote
                        .back_reference
                        .and_then(|ordinal| i64::try_from(ordinal).ok()),
                ),
                ContentNode::Paragraph(paragraph) => (
                    FragmentKind::Paragraph,
                    i64::try_from(paragraph.blank_lines_before).unwrap_or(i64::MAX),
                    None,
                ),
            };
            CommentFragmentRecord {
                comment_id,
                position: position as i64,
                kind,
                text: node.text(),
                blank_lines_before,
                back_reference,
                speaker_id: node.speaker(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_follow_node_order_and_kind() {
        let mut parsed = parse_comment("(In reply to comment #2)\n> a\n>\n> b\n\n\nreply");
        parsed.nodes[1].set_speaker(Some(9));

        let records = fragment_records(5, &parsed);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].kind, FragmentKind::Quote);
        assert_eq!(records[0].text, "a\n\nb");
        assert_eq!(records[0].back_reference, Some(2));
        assert_eq!(records[0].speaker_id, None);

        assert_eq!(records[1].position, 1);
        assert_eq!(records[1].kind, FragmentKind::Paragraph);
        assert_eq!(records[1].blank_lines_before, 2);
        assert_eq!(records[1].speaker_id, Some(9));
        assert!(records.iter().all(|record| record.comment_id == 5));
    }
}
