use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use trawl_core::{GitContext, IdentityContext, IdentityId, ProjectId, normalize_optional};
use trawl_store::{SqliteStore, Store};

use crate::AnalysisError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugDocument {
    #[serde(default)]
    pub bugs: Vec<BugEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugEntry {
    pub number: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentEntry>,
    #[serde(default)]
    pub comments: Vec<CommentEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentEntry {
    pub number: i64,
    pub submitter: PersonEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEntry {
    pub author: PersonEntry,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BugImportOutcome {
    pub project: String,
    pub bugs: usize,
    pub comments: usize,
    pub attachments: usize,
    pub identities: usize,
    pub skipped_anonymous: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GitImportRequest {
    pub project: String,
    pub repository: Option<PathBuf>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitImportOutcome {
    pub project: String,
    pub git_repo_found: bool,
    pub head_commit_hash: Option<String>,
    pub commits_imported: usize,
    pub identities: usize,
}

pub struct Importer {
    workspace: PathBuf,
}

impl Importer {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }

    pub fn import_git(&self, request: GitImportRequest) -> Result<GitImportOutcome, AnalysisError> {
        let store = SqliteStore::open(&self.workspace)?;
        let project = store.ensure_project(&request.project)?;
        let repository = request
            .repository
            .clone()
            .unwrap_or_else(|| self.workspace.clone());

        let Some(git) = GitContext::open(&repository) else {
            warn!(path = %repository.display(), "no git repository found");
            return Ok(GitImportOutcome {
                project: project.name,
                git_repo_found: false,
                head_commit_hash: None,
                commits_imported: 0,
                identities: 0,
            });
        };

        let history = git.history(request.limit)?;

        let mut identities = BTreeSet::new();
        for commit in &history {
            let author = person_identity(
                &store,
                project.id,
                IdentityContext::Source,
                Some(commit.author_name.as_str()),
                Some(commit.author_email.as_str()),
            )?;
            identities.extend(author);
            store.upsert_commit(
                project.id,
                &commit.hash,
                author,
                &commit.message,
                commit.timestamp,
            )?;
        }

        info!(
            project = %project.name,
            commits = history.len(),
            identities = identities.len(),
            "imported git history"
        );
        Ok(GitImportOutcome {
            project: project.name,
            git_repo_found: true,
            head_commit_hash: git.head_commit_hash(),
            commits_imported: history.len(),
            identities: identities.len(),
        })
    }

    pub fn import_bugs(
        &self,
        project: &str,
        path: impl AsRef<Path>,
    ) -> Result<BugImportOutcome, AnalysisError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let document: BugDocument = serde_json::from_str(&raw)?;
        self.import_bug_document(project, &document)
    }

    pub fn import_bug_document(
        &self,
        project: &str,
        document: &BugDocument,
    ) -> Result<BugImportOutcome, AnalysisError> {
        let store = SqliteStore::open(&self.workspace)?;
        let project = store.ensure_project(project)?;

        let mut identities = BTreeSet::new();
        let mut outcome = BugImportOutcome {
            project: project.name.clone(),
            bugs: 0,
            comments: 0,
            attachments: 0,
            identities: 0,
            skipped_anonymous: 0,
        };

        for bug in &document.bugs {
            let bug_id = store.upsert_bug(project.id, bug.number, bug.title.trim())?;
            outcome.bugs += 1;

            for attachment in &bug.attachments {
                let Some(submitter) = bug_person(&store, project.id, &attachment.submitter)? else {
                    warn!(
                        bug = bug.number,
                        attachment = attachment.number,
                        "attachment without submitter"
                    );
                    outcome.skipped_anonymous += 1;
                    continue;
                };
                identities.insert(submitter);
                store.upsert_attachment(bug_id, attachment.number, submitter)?;
                outcome.attachments += 1;
            }

            for (ordinal, comment) in bug.comments.iter().enumerate() {
                let Some(author) = bug_person(&store, project.id, &comment.author)? else {
                    warn!(bug = bug.number, ordinal, "comment without author");
                    outcome.skipped_anonymous += 1;
                    continue;
                };
                identities.insert(author);
                store.upsert_comment(bug_id, ordinal as i64, author, &comment.text)?;
                outcome.comments += 1;
            }
        }
        outcome.identities = identities.len();

        info!(
            project = %project.name,
            bugs = outcome.bugs,
            comments = outcome.comments,
            attachments = outcome.attachments,
            "imported bug document"
        );
        Ok(outcome)
    }
}

fn bug_person(
    store: &impl Store,
    project_id: ProjectId,
    person: &PersonEntry,
) -> Result<Option<IdentityId>, AnalysisError> {
    person_identity(
        store,
        project_id,
        IdentityContext::Bug,
        person.name.as_deref(),
        person.email.as_deref(),
    )
}

fn person_identity(
    store: &impl Store,
    project_id: ProjectId,
    context: IdentityContext,
    name: Option<&str>,
    email: Option<&str>,
) -> Result<Option<IdentityId>, AnalysisError> {
    let name = normalize_optional(name);
    let email = normalize_optional(email);
    if name.is_none() && email.is_none() {
        return Ok(None);
    }

    let id = store.insert_identity(project_id, context, name.as_deref(), email.as_deref())?;
    Ok(Some(id))
}
