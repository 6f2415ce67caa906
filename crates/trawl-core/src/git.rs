use std::path::Path;

use thiserror::Error;

pub struct GitContext {
    repo: gix::Repository,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    pub timestamp: i64,
}

#[derive(Debug, Error)]
pub enum GitError {
    #[error("revision walk failed: {0}")]
    Walk(String),
}

impl GitContext {
    pub fn open(workspace: &Path) -> Option<Self> {
        gix::discover(workspace).ok().map(|repo| Self { repo })
    }

    pub fn head_commit_hash(&self) -> Option<String> {
        let head_id = self.repo.head_id().ok()?.detach();
        Some(head_id.to_string().to_ascii_lowercase())
    }

    /// Commits reachable from HEAD, newest first. An unborn HEAD has no
    /// history.
    pub fn history(&self, limit: Option<usize>) -> Result<Vec<CommitInfo>, GitError> {
        if limit == Some(0) {
            return Ok(Vec::new());
        }

        let Ok(head_id) = self.repo.head_id() else {
            return Ok(Vec::new());
        };
        let head_id = head_id.detach();

        let walk = self
            .repo
            .rev_walk([head_id])
            .sorting(gix::revision::walk::Sorting::ByCommitTime(
                gix::traverse::commit::simple::CommitTimeOrder::NewestFirst,
            ))
            .all()
            .map_err(|err| GitError::Walk(err.to_string()))?;

        let mut commits = Vec::new();
        for entry in walk {
            let info = entry.map_err(|err| GitError::Walk(err.to_string()))?;
            if let Some(commit) = self.commit_info(info.id) {
                commits.push(commit);
            }
            if limit.is_some_and(|limit| commits.len() >= limit) {
                break;
            }
        }

        Ok(commits)
    }

    fn commit_info(&self, id: gix::ObjectId) -> Option<CommitInfo> {
        let commit = self.repo.find_commit(id).ok()?;

        let (author_name, author_email) = commit
            .author()
            .ok()
            .map(|signature| {
                (
                    decode_text(signature.name.as_ref()),
                    decode_text(signature.email.as_ref()),
                )
            })
            .unwrap_or_default();

        let message = decode_text(commit.message_raw_sloppy().as_ref());
        let timestamp = commit.time().ok().map(|time| time.seconds).unwrap_or(0);

        Some(CommitInfo {
            hash: id.to_string().to_ascii_lowercase(),
            author_name,
            author_email,
            message,
            timestamp,
        })
    }
}

fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_owned()
}
