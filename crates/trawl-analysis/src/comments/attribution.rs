use std::collections::{BTreeSet, HashMap};

use tracing::debug;
use trawl_core::{Attachment, Comment, Identity, IdentityId};
use trawl_fuzzy::MetricIndex;

use super::parser::{ContentNode, ParsedComment, collapse_whitespace, parse_comment};
use crate::fragments::{name_fragments, split_fragments};
use crate::settings::MatchSettings;

/// Parses every comment of one issue and attributes each node. `comments`
/// must be in thread order; `identities` resolves participant ids to their
/// records and may hold more than the participants.
pub fn attribute_thread(
    comments: &[Comment],
    attachments: &[Attachment],
    identities: &HashMap<IdentityId, Identity>,
    matcher: &MatchSettings,
) -> Vec<ParsedComment> {
    let participants = Participants::new(comments, attachments, identities, matcher);
    let mut history: Vec<PriorComment> = Vec::with_capacity(comments.len());
    let mut parsed_thread = Vec::with_capacity(comments.len());

    for comment in comments {
        let mut parsed = parse_comment(&comment.text);
        let global = parsed
            .attachment_hint
            .and_then(|number| attachments.iter().find(|attachment| attachment.number == number))
            .map(|attachment| attachment.submitter_id)
            .or_else(|| participants.counterpart(comment.author_id));

        let mut last: Option<IdentityId> = None;
        for node in &mut parsed.nodes {
            let speaker = match node {
                ContentNode::Quote(quote) => {
                    let referenced = quote.back_reference.and_then(|ordinal| {
                        let ordinal = i64::try_from(ordinal).ok()?;
                        history
                            .iter()
                            .find(|prior| prior.ordinal == ordinal)
                            .map(|prior| prior.author_id)
                    });
                    referenced
                        .or_else(|| quoted_author(&quote.fragments, &history))
                        .or(global)
                }
                ContentNode::Paragraph(paragraph) => {
                    if paragraph.blank_lines_before > 1 {
                        last = None;
                    }
                    if global.is_some() {
                        global
                    } else if participants.len() <= 1 {
                        None
                    } else if last.is_some() {
                        last
                    } else {
                        participants.mentioned_in(&paragraph.text, comment.author_id, matcher)
                    }
                }
            };
            node.set_speaker(speaker);
            last = speaker;
        }

        debug!(
            comment = comment.id,
            nodes = parsed.nodes.len(),
            attributed = parsed.attributed(),
            "attributed comment"
        );
        history.push(PriorComment::new(comment, &parsed));
        parsed_thread.push(parsed);
    }

    parsed_thread
}

fn quoted_author(fragments: &[String], history: &[PriorComment]) -> Option<IdentityId> {
    let anchor = fragments
        .iter()
        .map(|fragment| collapse_whitespace(fragment))
        .filter(|fragment| !fragment.is_empty())
        .max_by_key(|fragment| fragment.len())?;

    history
        .iter()
        .rev()
        .find(|prior| {
            prior
                .paragraphs
                .iter()
                .any(|paragraph| paragraph.contains(anchor.as_str()))
        })
        .map(|prior| prior.author_id)
}

struct PriorComment {
    ordinal: i64,
    author_id: IdentityId,
    paragraphs: Vec<String>,
}

impl PriorComment {
    fn new(comment: &Comment, parsed: &ParsedComment) -> Self {
        let paragraphs = parsed
            .nodes
            .iter()
            .filter_map(|node| match node {
                ContentNode::Paragraph(paragraph) => Some(collapse_whitespace(&paragraph.text)),
                ContentNode::Quote(_) => None,
            })
            .collect();
        Self {
            ordinal: comment.ordinal,
            author_id: comment.author_id,
            paragraphs,
        }
    }
}

struct Participants {
    ids: BTreeSet<IdentityId>,
    index: MetricIndex<IdentityId>,
}

impl Participants {
    fn new(
        comments: &[Comment],
        attachments: &[Attachment],
        identities: &HashMap<IdentityId, Identity>,
        matcher: &MatchSettings,
    ) -> Self {
        let ids = comments
            .iter()
            .map(|comment| comment.author_id)
            .chain(attachments.iter().map(|attachment| attachment.submitter_id))
            .collect::<BTreeSet<_>>();

        let mut index = MetricIndex::new();
        for identity in ids.iter().filter_map(|id| identities.get(id)) {
            for fragment in name_fragments(identity) {
                for code in matcher.encode(&fragment) {
                    index.insert(code, identity.id);
                }
            }
        }

        Self { ids, index }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn counterpart(&self, author_id: IdentityId) -> Option<IdentityId> {
        if self.ids.len() != 2 {
            return None;
        }
        self.ids.iter().copied().find(|&id| id != author_id)
    }

    fn mentioned_in(
        &self,
        text: &str,
        author_id: IdentityId,
        matcher: &MatchSettings,
    ) -> Option<IdentityId> {
        let mut mentioned = BTreeSet::new();
        for word in split_fragments(text) {
            let codes = matcher.encode(&word);
            mentioned.extend(self.index.query_any(&codes, matcher.distance));
        }
        mentioned.remove(&author_id);

        let mut mentioned = mentioned.into_iter();
        match (mentioned.next(), mentioned.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use trawl_core::IdentityContext;

    use super::*;
    use crate::comments::parser::{ParagraphNode, QuoteNode};

    fn identity(id: IdentityId, name: &str) -> (IdentityId, Identity) {
        (
            id,
            Identity {
                id,
                project_id: 1,
                context: IdentityContext::Bug,
                name: Some(name.to_owned()),
                email: None,
            },
        )
    }

    fn comment(ordinal: i64, author_id: IdentityId, text: &str) -> Comment {
        Comment {
            id: 100 + ordinal,
            bug_id: 1,
            ordinal,
            author_id,
            text: text.to_owned(),
        }
    }

    fn people() -> HashMap<IdentityId, Identity> {
        HashMap::from([
            identity(1, "Alice Walker"),
            identity(2, "Bob Marley"),
            identity(3, "Carol King"),
        ])
    }

    fn speakers(parsed: &ParsedComment) -> Vec<Option<IdentityId>> {
        parsed.nodes.iter().map(ContentNode::speaker).collect()
    }

    #[test]
    fn back_reference_attributes_quote_to_referenced_author() {
        let comments = vec![
            comment(0, 1, "hello"),
            comment(1, 2, "(In reply to comment #0)\n> hello"),
        ];
        let parsed = attribute_thread(&comments, &[], &people(), &MatchSettings::default());

        assert_eq!(
            parsed[1].nodes,
            vec![ContentNode::Quote(QuoteNode {
                fragments: vec!["hello".to_owned()],
                back_reference: Some(0),
                speaker: Some(1),
            })]
        );
    }

    #[test]
    fn out_of_range_back_reference_falls_back_to_verbatim_search() {
        let comments = vec![
            comment(0, 1, "The parser   crashes on empty input."),
            comment(1, 3, "Unrelated."),
            comment(2, 2, "(In reply to comment #7)\n> short\n>\n> The parser crashes\n> on empty input."),
        ];
        let parsed = attribute_thread(&comments, &[], &people(), &MatchSettings::default());
        assert_eq!(speakers(&parsed[2])[0], Some(1));
    }

    #[test]
    fn verbatim_search_prefers_the_most_recent_comment() {
        let comments = vec![
            comment(0, 1, "same words"),
            comment(1, 3, "same words"),
            comment(2, 2, "> same words"),
        ];
        let parsed = attribute_thread(&comments, &[], &people(), &MatchSettings::default());
        assert_eq!(speakers(&parsed[2]), vec![Some(3)]);
    }

    #[test]
    fn review_marker_makes_the_patch_author_global() {
        let attachments = vec![Attachment {
            id: 1,
            bug_id: 1,
            number: 77,
            submitter_id: 3,
        }];
        let comments = vec![
            comment(0, 1, "Patch attached."),
            comment(1, 2, "Hi."),
            comment(2, 2, "Review of attachment 77:\n\nPlease rename this.\n\n\nAlso this."),
        ];
        let parsed = attribute_thread(&comments, &attachments, &people(), &MatchSettings::default());
        assert_eq!(speakers(&parsed[2]), vec![Some(3), Some(3)]);
        assert_eq!(parsed[2].attachment_hint, Some(77));
    }

    #[test]
    fn two_participants_default_to_the_other_one() {
        let comments = vec![comment(0, 1, "Crash on start."), comment(1, 2, "Cannot reproduce.")];
        let parsed = attribute_thread(&comments, &[], &people(), &MatchSettings::default());
        assert_eq!(speakers(&parsed[0]), vec![Some(2)]);
        assert_eq!(speakers(&parsed[1]), vec![Some(1)]);
    }

    #[test]
    fn single_participant_leaves_paragraphs_unattributed() {
        let comments = vec![comment(0, 1, "Note to self.\n\nAlice again.")];
        let parsed = attribute_thread(&comments, &[], &people(), &MatchSettings::default());
        assert_eq!(speakers(&parsed[0]), vec![None, None]);
    }

    #[test]
    fn paragraph_names_a_unique_other_participant() {
        let comments = vec![
            comment(0, 1, "Broken."),
            comment(1, 3, "Works here."),
            comment(
                2,
                2,
                "Carol, which version?\n\n\nBob and Alice disagree.\n\nThanks everyone.",
            ),
        ];
        let parsed = attribute_thread(&comments, &[], &people(), &MatchSettings::default());

        // Bob wrote the comment, so only Alice remains in the second paragraph.
        assert_eq!(speakers(&parsed[2]), vec![Some(3), Some(1), Some(1)]);
    }

    #[test]
    fn two_blank_lines_reset_the_carried_speaker() {
        let comments = vec![
            comment(0, 1, "Broken."),
            comment(1, 3, "Works here."),
            comment(2, 2, "Alice, which version?\n\nStill there.\n\n\nAnyone?"),
        ];
        let parsed = attribute_thread(&comments, &[], &people(), &MatchSettings::default());
        assert_eq!(speakers(&parsed[2]), vec![Some(1), Some(1), None]);

        let ContentNode::Paragraph(ParagraphNode {
            blank_lines_before, ..
        }) = &parsed[2].nodes[2]
        else {
            panic!("expected a paragraph");
        };
        assert_eq!(*blank_lines_before, 2);
    }

    #[test]
    fn ambiguous_mentions_stay_unattributed() {
        let comments = vec![
            comment(0, 1, "Broken."),
            comment(1, 3, "Works here."),
            comment(2, 2, "Alice and Carol should talk."),
        ];
        let parsed = attribute_thread(&comments, &[], &people(), &MatchSettings::default());
        assert_eq!(speakers(&parsed[2]), vec![None]);
    }
}
