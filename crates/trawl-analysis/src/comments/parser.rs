use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use trawl_core::IdentityId;

static ATTACHMENT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\A\s*(?:review\s+of|comment\s+on|\(\s*from\s+update\s+of)\s+attachment\s+(\d+)[^\n]*(?:\n|\z)",
    )
    .expect("valid attachment marker regex")
});
static QUOTE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)(?:^[ \t]*\(in reply to[^\n]*\)[^\n]*\n(?:[ \t]*\n)*)?(?:^[ \t]*>[^\n]*(?:\n|\z))+",
    )
    .expect("valid quote block regex")
});
static REPLY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\(in reply to\b").expect("valid reply line regex"));
static BACK_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)comment\s*#?\s*(\d+)").expect("valid back reference regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteNode {
    pub fragments: Vec<String>,
    pub back_reference: Option<usize>,
    pub speaker: Option<IdentityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParagraphNode {
    pub text: String,
    pub blank_lines_before: usize,
    pub speaker: Option<IdentityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentNode {
    Quote(QuoteNode),
    Paragraph(ParagraphNode),
}

impl ContentNode {
    pub fn speaker(&self) -> Option<IdentityId> {
        match self {
            Self::Quote(quote) => quote.speaker,
            Self::Paragraph(paragraph) => paragraph.speaker,
        }
    }

    pub(crate) fn set_speaker(&mut self, speaker: Option<IdentityId>) {
        match self {
            Self::Quote(quote) => quote.speaker = speaker,
            Self::Paragraph(paragraph) => paragraph.speaker = speaker,
        }
    }

    pub fn text(&self) -> String {
        match self {
            Self::Quote(quote) => quote.fragments.join("\n\n"),
            Self::Paragraph(paragraph) => paragraph.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedComment {
    pub attachment_hint: Option<i64>,
    pub nodes: Vec<ContentNode>,
}

impl ParsedComment {
    pub fn attributed(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.speaker().is_some())
            .count()
    }
}

/// Splits comment text into quote blocks and the paragraphs around them. Total
/// over any input; nothing is attributed yet.
pub fn parse_comment(text: &str) -> ParsedComment {
    let text = text.replace("\r\n", "\n");

    let (attachment_hint, body) = match ATTACHMENT_MARKER.captures(&text) {
        Some(captures) => (
            captures
                .get(1)
                .and_then(|number| number.as_str().parse::<i64>().ok()),
            &text[captures.get(0).map_or(0, |marker| marker.end())..],
        ),
        None => (None, text.as_str()),
    };

    let mut nodes = Vec::new();
    let mut cursor = 0;
    for block in QUOTE_BLOCK.find_iter(body) {
        push_paragraphs(&body[cursor..block.start()], &mut nodes);
        nodes.push(ContentNode::Quote(parse_quote(block.as_str())));
        cursor = block.end();
    }
    push_paragraphs(&body[cursor..], &mut nodes);

    ParsedComment {
        attachment_hint,
        nodes,
    }
}

fn parse_quote(block: &str) -> QuoteNode {
    let mut back_reference = None;
    let mut fragments = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in block.lines() {
        let line = line.trim_start();
        let Some(quoted) = line.strip_prefix('>') else {
            if REPLY_LINE.is_match(line) {
                back_reference = BACK_REFERENCE
                    .captures(line)
                    .and_then(|captures| captures[1].parse::<usize>().ok());
            }
            continue;
        };

        let content = quoted.trim_start_matches(|ch: char| ch == '>' || ch.is_whitespace());
        if REPLY_LINE.is_match(content) {
            continue;
        }
        if content.trim().is_empty() {
            flush_fragment(&mut current, &mut fragments);
        } else {
            current.push(content);
        }
    }
    flush_fragment(&mut current, &mut fragments);

    QuoteNode {
        fragments,
        back_reference,
        speaker: None,
    }
}

fn flush_fragment(lines: &mut Vec<&str>, fragments: &mut Vec<String>) {
    if lines.is_empty() {
        return;
    }
    fragments.push(collapse_whitespace(&lines.join(" ")));
    lines.clear();
}

fn push_paragraphs(segment: &str, nodes: &mut Vec<ContentNode>) {
    let mut blank_lines = 0;
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_lines_before = 0;

    for line in segment.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !lines.is_empty() {
                nodes.push(paragraph(&lines, blank_lines_before));
                lines.clear();
            }
            blank_lines += 1;
            continue;
        }
        if lines.is_empty() {
            blank_lines_before = blank_lines;
            blank_lines = 0;
        }
        lines.push(line);
    }

    if !lines.is_empty() {
        nodes.push(paragraph(&lines, blank_lines_before));
    }
}

fn paragraph(lines: &[&str], blank_lines_before: usize) -> ContentNode {
    ContentNode::Paragraph(ParagraphNode {
        text: lines.join("\n"),
        blank_lines_before,
        speaker: None,
    })
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
