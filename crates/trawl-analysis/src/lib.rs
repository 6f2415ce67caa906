mod comments;
mod commits;
mod fragments;
mod import;
mod interlink;
mod settings;

use thiserror::Error;
use trawl_store::{ProjectRecord, Store, StoreError};

pub use comments::{
    AttributionAnalyzer, AttributionOutcome, ContentNode, ParagraphNode, ParsedComment,
    QuoteNode, attribute_thread, parse_comment,
};
pub use commits::{
    BugReference, CommitLinkAnalyzer, CommitLinkOutcome, LINK_CERTAINTY, ReferenceExtractor, Token,
};
pub use fragments::{name_fragments, split_fragments};
pub use import::{
    AttachmentEntry, BugDocument, BugEntry, BugImportOutcome, CommentEntry, GitImportOutcome,
    GitImportRequest, Importer, PersonEntry,
};
pub use interlink::{InterlinkAnalyzer, InterlinkOutcome, Resolution, resolve_identities};
pub use settings::{EngineSettings, LinkingSettings, MatchSettings};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("config error: {0}")]
    Config(#[from] trawl_config::ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("git error: {0}")]
    Git(#[from] trawl_core::GitError),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("{0}")]
    Message(String),
}

fn require_project(store: &impl Store, name: &str) -> Result<ProjectRecord, AnalysisError> {
    store
        .find_project(name)?
        .ok_or_else(|| AnalysisError::Message(format!("unknown project '{}'", name.trim())))
}
