use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use thiserror::Error;
use trawl_core::{
    Attachment, Bug, BugId, Comment, CommentId, Commit, CommitId, Identity, IdentityContext,
    IdentityId, ProjectId, UserId, normalize_optional,
};

pub const DATABASE_FILE_NAME: &str = "trawl.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub identity_ids: Vec<IdentityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub project_id: ProjectId,
    pub name: String,
    pub identity_ids: Vec<IdentityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommitLinkRecord {
    pub commit_id: CommitId,
    pub bug_id: BugId,
    pub certainty: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Quote,
    Paragraph,
}

impl FragmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Paragraph => "paragraph",
        }
    }
}

impl std::str::FromStr for FragmentKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "quote" => Ok(Self::Quote),
            "paragraph" => Ok(Self::Paragraph),
            other => Err(format!(
                "invalid fragment kind '{other}', expected one of: quote, paragraph"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentFragmentRecord {
    pub comment_id: CommentId,
    pub position: i64,
    pub kind: FragmentKind,
    pub text: String,
    pub blank_lines_before: i64,
    pub back_reference: Option<i64>,
    pub speaker_id: Option<IdentityId>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid data: {0}")]
    Invalid(String),
}

pub trait Store {
    fn ensure_project(&self, name: &str) -> Result<ProjectRecord, StoreError>;
    fn find_project(&self, name: &str) -> Result<Option<ProjectRecord>, StoreError>;

    /// Returns the existing identity with the same context, name and email,
    /// creating it when absent.
    fn insert_identity(
        &self,
        project_id: ProjectId,
        context: IdentityContext,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<IdentityId, StoreError>;
    fn list_identities(&self, project_id: ProjectId) -> Result<Vec<Identity>, StoreError>;

    /// Atomically drops the project's users and identity links, then writes
    /// `users`. Nothing changes when any write fails.
    fn replace_users(
        &self,
        project_id: ProjectId,
        users: &[NewUser],
    ) -> Result<Vec<UserId>, StoreError>;
    fn list_users(&self, project_id: ProjectId) -> Result<Vec<UserRecord>, StoreError>;

    fn upsert_bug(&self, project_id: ProjectId, number: i64, title: &str)
    -> Result<BugId, StoreError>;
    fn find_bug(&self, project_id: ProjectId, number: i64) -> Result<Option<Bug>, StoreError>;
    fn list_bugs(&self, project_id: ProjectId) -> Result<Vec<Bug>, StoreError>;

    fn upsert_attachment(
        &self,
        bug_id: BugId,
        number: i64,
        submitter_id: IdentityId,
    ) -> Result<i64, StoreError>;
    fn list_attachments(&self, bug_id: BugId) -> Result<Vec<Attachment>, StoreError>;

    fn upsert_comment(
        &self,
        bug_id: BugId,
        ordinal: i64,
        author_id: IdentityId,
        text: &str,
    ) -> Result<CommentId, StoreError>;
    fn list_comments(&self, bug_id: BugId) -> Result<Vec<Comment>, StoreError>;

    fn replace_comment_fragments(
        &self,
        comment_id: CommentId,
        fragments: &[CommentFragmentRecord],
    ) -> Result<(), StoreError>;
    fn list_comment_fragments(
        &self,
        comment_id: CommentId,
    ) -> Result<Vec<CommentFragmentRecord>, StoreError>;

    fn upsert_commit(
        &self,
        project_id: ProjectId,
        hash: &str,
        author_id: Option<IdentityId>,
        message: &str,
        committed_at: i64,
    ) -> Result<CommitId, StoreError>;
    fn list_commits(&self, project_id: ProjectId) -> Result<Vec<Commit>, StoreError>;

    fn clear_commit_links(&self, project_id: ProjectId) -> Result<usize, StoreError>;
    fn insert_commit_link(&self, link: CommitLinkRecord) -> Result<(), StoreError>;
    fn list_commit_links(&self, project_id: ProjectId)
    -> Result<Vec<CommitLinkRecord>, StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
    trawl_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(workspace_root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let trawl_dir = trawl_config::trawl_dir(workspace_root);
        let sqlite_path = trawl_dir.join(DATABASE_FILE_NAME);

        fs::create_dir_all(&trawl_dir)?;

        let conn = Connection::open(sqlite_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        run_migrations(&conn)?;

        Ok(Self { conn, trawl_dir })
    }

    pub fn trawl_dir(&self) -> &Path {
        &self.trawl_dir
    }

    fn identity_ids_for_user(&self, user_id: UserId) -> Result<Vec<IdentityId>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM identities WHERE user_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl Store for SqliteStore {
    fn ensure_project(&self, name: &str) -> Result<ProjectRecord, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("project name must not be empty".to_owned()));
        }

        self.conn.execute(
            "INSERT INTO projects (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            params![name],
        )?;
        self.find_project(name)?
            .ok_or_else(|| StoreError::Invalid(format!("project '{name}' vanished after insert")))
    }

    fn find_project(&self, name: &str) -> Result<Option<ProjectRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                "SELECT id, name FROM projects WHERE name = ?1",
                params![name.trim()],
                |row| {
                    Ok(ProjectRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn insert_identity(
        &self,
        project_id: ProjectId,
        context: IdentityContext,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<IdentityId, StoreError> {
        let name = normalize_optional(name);
        let email = normalize_optional(email);
        if name.is_none() && email.is_none() {
            return Err(StoreError::Invalid(
                "identity needs a name or an email".to_owned(),
            ));
        }

        let existing = self
            .conn
            .query_row(
                r#"
                SELECT id FROM identities
                WHERE project_id = ?1 AND context = ?2 AND name IS ?3 AND email IS ?4
                "#,
                params![project_id, context.as_str(), name, email],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO identities (project_id, context, name, email) VALUES (?1, ?2, ?3, ?4)",
            params![project_id, context.as_str(), name, email],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_identities(&self, project_id: ProjectId) -> Result<Vec<Identity>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, project_id, context, name, email
            FROM identities
            WHERE project_id = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            Ok((
                row.get::<_, IdentityId>(0)?,
                row.get::<_, ProjectId>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut identities = Vec::new();
        for row in rows {
            let (id, project_id, context, name, email) = row?;
            let context = context.parse::<IdentityContext>().map_err(StoreError::Invalid)?;
            identities.push(Identity {
                id,
                project_id,
                context,
                name,
                email,
            });
        }
        Ok(identities)
    }

    fn replace_users(
        &self,
        project_id: ProjectId,
        users: &[NewUser],
    ) -> Result<Vec<UserId>, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE identities SET user_id = NULL WHERE project_id = ?1",
            params![project_id],
        )?;
        let removed = tx.execute("DELETE FROM users WHERE project_id = ?1", params![project_id])?;

        let mut user_ids = Vec::with_capacity(users.len());
        for user in users {
            tx.execute(
                "INSERT INTO users (project_id, name) VALUES (?1, ?2)",
                params![project_id, user.name],
            )?;
            let user_id = tx.last_insert_rowid();

            for identity_id in &user.identity_ids {
                let linked = tx.execute(
                    "UPDATE identities SET user_id = ?1 WHERE id = ?2 AND project_id = ?3",
                    params![user_id, identity_id, project_id],
                )?;
                if linked == 0 {
                    return Err(StoreError::Invalid(format!(
                        "identity {identity_id} does not belong to project {project_id}"
                    )));
                }
            }
            user_ids.push(user_id);
        }

        tx.commit()?;
        tracing::debug!(
            project_id,
            removed,
            written = user_ids.len(),
            "replaced project users"
        );
        Ok(user_ids)
    }

    fn list_users(&self, project_id: ProjectId) -> Result<Vec<UserRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, name FROM users WHERE project_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            Ok((
                row.get::<_, UserId>(0)?,
                row.get::<_, ProjectId>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, project_id, name)| {
                Ok(UserRecord {
                    id,
                    project_id,
                    name,
                    identity_ids: self.identity_ids_for_user(id)?,
                })
            })
            .collect()
    }

    fn upsert_bug(
        &self,
        project_id: ProjectId,
        number: i64,
        title: &str,
    ) -> Result<BugId, StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO bugs (project_id, number, title) VALUES (?1, ?2, ?3)
            ON CONFLICT(project_id, number) DO UPDATE SET title = excluded.title
            "#,
            params![project_id, number, title],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM bugs WHERE project_id = ?1 AND number = ?2",
            params![project_id, number],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn find_bug(&self, project_id: ProjectId, number: i64) -> Result<Option<Bug>, StoreError> {
        let bug = self
            .conn
            .query_row(
                "SELECT id, project_id, number, title FROM bugs WHERE project_id = ?1 AND number = ?2",
                params![project_id, number],
                bug_from_row,
            )
            .optional()?;
        Ok(bug)
    }

    fn list_bugs(&self, project_id: ProjectId) -> Result<Vec<Bug>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, number, title FROM bugs WHERE project_id = ?1 ORDER BY number",
        )?;
        let rows = stmt.query_map(params![project_id], bug_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn upsert_attachment(
        &self,
        bug_id: BugId,
        number: i64,
        submitter_id: IdentityId,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO attachments (bug_id, number, submitter_id) VALUES (?1, ?2, ?3)
            ON CONFLICT(bug_id, number) DO UPDATE SET submitter_id = excluded.submitter_id
            "#,
            params![bug_id, number, submitter_id],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM attachments WHERE bug_id = ?1 AND number = ?2",
            params![bug_id, number],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn list_attachments(&self, bug_id: BugId) -> Result<Vec<Attachment>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, bug_id, number, submitter_id
            FROM attachments
            WHERE bug_id = ?1
            ORDER BY number
            "#,
        )?;
        let rows = stmt.query_map(params![bug_id], |row| {
            Ok(Attachment {
                id: row.get(0)?,
                bug_id: row.get(1)?,
                number: row.get(2)?,
                submitter_id: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn upsert_comment(
        &self,
        bug_id: BugId,
        ordinal: i64,
        author_id: IdentityId,
        text: &str,
    ) -> Result<CommentId, StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO comments (bug_id, ordinal, author_id, text) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(bug_id, ordinal) DO UPDATE SET
                author_id = excluded.author_id,
                text = excluded.text
            "#,
            params![bug_id, ordinal, author_id, text],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM comments WHERE bug_id = ?1 AND ordinal = ?2",
            params![bug_id, ordinal],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn list_comments(&self, bug_id: BugId) -> Result<Vec<Comment>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, bug_id, ordinal, author_id, text
            FROM comments
            WHERE bug_id = ?1
            ORDER BY ordinal
            "#,
        )?;
        let rows = stmt.query_map(params![bug_id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                bug_id: row.get(1)?,
                ordinal: row.get(2)?,
                author_id: row.get(3)?,
                text: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn replace_comment_fragments(
        &self,
        comment_id: CommentId,
        fragments: &[CommentFragmentRecord],
    ) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM comment_fragments WHERE comment_id = ?1",
            params![comment_id],
        )?;

        for fragment in fragments {
            if fragment.comment_id != comment_id {
                return Err(StoreError::Invalid(format!(
                    "fragment for comment {} written under comment {comment_id}",
                    fragment.comment_id
                )));
            }
            tx.execute(
                r#"
                INSERT INTO comment_fragments (
                    comment_id, position, kind, text, blank_lines_before, back_reference, speaker_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    fragment.comment_id,
                    fragment.position,
                    fragment.kind.as_str(),
                    fragment.text,
                    fragment.blank_lines_before,
                    fragment.back_reference,
                    fragment.speaker_id,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_comment_fragments(
        &self,
        comment_id: CommentId,
    ) -> Result<Vec<CommentFragmentRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT comment_id, position, kind, text, blank_lines_before, back_reference, speaker_id
            FROM comment_fragments
            WHERE comment_id = ?1
            ORDER BY position
            "#,
        )?;
        let rows = stmt.query_map(params![comment_id], |row| {
            Ok((
                row.get::<_, CommentId>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<i64>>(5)?,
                row.get::<_, Option<IdentityId>>(6)?,
            ))
        })?;

        let mut fragments = Vec::new();
        for row in rows {
            let (comment_id, position, kind, text, blank_lines_before, back_reference, speaker_id) =
                row?;
            fragments.push(CommentFragmentRecord {
                comment_id,
                position,
                kind: kind.parse().map_err(StoreError::Invalid)?,
                text,
                blank_lines_before,
                back_reference,
                speaker_id,
            });
        }
        Ok(fragments)
    }

    fn upsert_commit(
        &self,
        project_id: ProjectId,
        hash: &str,
        author_id: Option<IdentityId>,
        message: &str,
        committed_at: i64,
    ) -> Result<CommitId, StoreError> {
        let hash = hash.trim().to_ascii_lowercase();
        if hash.is_empty() {
            return Err(StoreError::Invalid("commit hash must not be empty".to_owned()));
        }

        self.conn.execute(
            r#"
            INSERT INTO commits (project_id, hash, author_id, message, committed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(project_id, hash) DO UPDATE SET
                author_id = excluded.author_id,
                message = excluded.message,
                committed_at = excluded.committed_at
            "#,
            params![project_id, hash, author_id, message, committed_at],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM commits WHERE project_id = ?1 AND hash = ?2",
            params![project_id, hash],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn list_commits(&self, project_id: ProjectId) -> Result<Vec<Commit>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, project_id, hash, author_id, message, committed_at
            FROM commits
            WHERE project_id = ?1
            ORDER BY committed_at DESC, id
            "#,
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            Ok(Commit {
                id: row.get(0)?,
                project_id: row.get(1)?,
                hash: row.get(2)?,
                author_id: row.get(3)?,
                message: row.get(4)?,
                committed_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn clear_commit_links(&self, project_id: ProjectId) -> Result<usize, StoreError> {
        let removed = self.conn.execute(
            r#"
            DELETE FROM commit_bug_links
            WHERE commit_id IN (SELECT id FROM commits WHERE project_id = ?1)
            "#,
            params![project_id],
        )?;
        Ok(removed)
    }

    fn insert_commit_link(&self, link: CommitLinkRecord) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO commit_bug_links (commit_id, bug_id, certainty) VALUES (?1, ?2, ?3)
            ON CONFLICT(commit_id, bug_id) DO UPDATE SET
                certainty = MAX(certainty, excluded.certainty)
            "#,
            params![link.commit_id, link.bug_id, link.certainty],
        )?;
        Ok(())
    }

    fn list_commit_links(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<CommitLinkRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT l.commit_id, l.bug_id, l.certainty
            FROM commit_bug_links l
            JOIN commits c ON c.id = l.commit_id
            WHERE c.project_id = ?1
            ORDER BY l.commit_id, l.bug_id
            "#,
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            Ok(CommitLinkRecord {
                commit_id: row.get(0)?,
                bug_id: row.get(1)?,
                certainty: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn bug_from_row(row: &Row<'_>) -> rusqlite::Result<Bug> {
    Ok(Bug {
        id: row.get(0)?,
        project_id: row.get(1)?,
        number: row.get(2)?,
        title: row.get(3)?,
    })
}

fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS identities (
            id INTEGER PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            context TEXT NOT NULL,
            name TEXT,
            email TEXT,
            user_id INTEGER REFERENCES users(id)
        );

        CREATE INDEX IF NOT EXISTS idx_identities_project ON identities(project_id);
        CREATE INDEX IF NOT EXISTS idx_identities_user ON identities(user_id);

        CREATE TABLE IF NOT EXISTS bugs (
            id INTEGER PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            number INTEGER NOT NULL,
            title TEXT NOT NULL,
            UNIQUE(project_id, number)
        );

        CREATE TABLE IF NOT EXISTS attachments (
            id INTEGER PRIMARY KEY,
            bug_id INTEGER NOT NULL REFERENCES bugs(id),
            number INTEGER NOT NULL,
            submitter_id INTEGER NOT NULL REFERENCES identities(id),
            UNIQUE(bug_id, number)
        );

        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY,
            bug_id INTEGER NOT NULL REFERENCES bugs(id),
            ordinal INTEGER NOT NULL,
            author_id INTEGER NOT NULL REFERENCES identities(id),
            text TEXT NOT NULL,
            UNIQUE(bug_id, ordinal)
        );

        CREATE TABLE IF NOT EXISTS comment_fragments (
            comment_id INTEGER NOT NULL REFERENCES comments(id),
            position INTEGER NOT NULL,
            kind TEXT NOT NULL,
            text TEXT NOT NULL,
            blank_lines_before INTEGER NOT NULL DEFAULT 0,
            back_reference INTEGER,
            speaker_id INTEGER REFERENCES identities(id),
            PRIMARY KEY (comment_id, position)
        );

        CREATE TABLE IF NOT EXISTS commits (
            id INTEGER PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            hash TEXT NOT NULL,
            author_id INTEGER REFERENCES identities(id),
            message TEXT NOT NULL,
            committed_at INTEGER NOT NULL,
            UNIQUE(project_id, hash)
        );

        CREATE TABLE IF NOT EXISTS commit_bug_links (
            commit_id INTEGER NOT NULL REFERENCES commits(id),
            bug_id INTEGER NOT NULL REFERENCES bugs(id),
            certainty INTEGER NOT NULL,
            PRIMARY KEY (commit_id, bug_id)
        );
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn open_with_project() -> (tempfile::TempDir, SqliteStore, ProjectId) {
        let temp = tempdir().expect("tempdir");
        let store = SqliteStore::open(temp.path()).expect("open store");
        let project = store.ensure_project("mozilla").expect("project");
        (temp, store, project.id)
    }

    #[test]
    fn open_creates_database_and_is_reentrant() {
        let temp = tempdir().expect("tempdir");
        {
            let store = SqliteStore::open(temp.path()).expect("open store");
            assert!(store.trawl_dir().join(DATABASE_FILE_NAME).exists());
            store.ensure_project("demo").expect("project");
        }

        let reopened = SqliteStore::open(temp.path()).expect("reopen store");
        let project = reopened.find_project("demo").expect("find project");
        assert_eq!(project.map(|record| record.name), Some("demo".to_owned()));
    }

    #[test]
    fn ensure_project_is_idempotent_and_rejects_blank_names() {
        let (_temp, store, project_id) = open_with_project();
        let again = store.ensure_project(" mozilla ").expect("project again");
        assert_eq!(again.id, project_id);

        let err = store.ensure_project("   ").expect_err("blank name");
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn insert_identity_deduplicates_per_context() {
        let (_temp, store, project_id) = open_with_project();

        let source = store
            .insert_identity(
                project_id,
                IdentityContext::Source,
                Some(" Jane Doe "),
                Some("jane@example.org"),
            )
            .expect("source identity");
        let same = store
            .insert_identity(
                project_id,
                IdentityContext::Source,
                Some("Jane Doe"),
                Some("jane@example.org"),
            )
            .expect("same identity");
        let bug = store
            .insert_identity(
                project_id,
                IdentityContext::Bug,
                Some("Jane Doe"),
                Some("jane@example.org"),
            )
            .expect("bug identity");
        let email_only = store
            .insert_identity(project_id, IdentityContext::Bug, Some(""), Some("x@example.org"))
            .expect("email-only identity");

        assert_eq!(source, same);
        assert_ne!(source, bug);

        let identities = store.list_identities(project_id).expect("list identities");
        assert_eq!(identities.len(), 3);
        assert_eq!(identities[0].name.as_deref(), Some("Jane Doe"));
        assert_eq!(identities[1].context, IdentityContext::Bug);
        assert_eq!(identities[2].id, email_only);
        assert_eq!(identities[2].name, None);

        let err = store
            .insert_identity(project_id, IdentityContext::Bug, None, Some("  "))
            .expect_err("empty identity");
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn replace_users_swaps_previous_users() {
        let (_temp, store, project_id) = open_with_project();
        let a = store
            .insert_identity(project_id, IdentityContext::Source, Some("A"), None)
            .expect("a");
        let b = store
            .insert_identity(project_id, IdentityContext::Bug, Some("B"), None)
            .expect("b");

        store
            .replace_users(
                project_id,
                &[
                    NewUser {
                        name: "A".to_owned(),
                        identity_ids: vec![a],
                    },
                    NewUser {
                        name: "B".to_owned(),
                        identity_ids: vec![b],
                    },
                ],
            )
            .expect("first replace");
        assert_eq!(store.list_users(project_id).expect("users").len(), 2);

        let ids = store
            .replace_users(
                project_id,
                &[NewUser {
                    name: "A".to_owned(),
                    identity_ids: vec![a, b],
                }],
            )
            .expect("second replace");

        let users = store.list_users(project_id).expect("users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, ids[0]);
        assert_eq!(users[0].identity_ids, vec![a, b]);
    }

    #[test]
    fn replace_users_rolls_back_on_foreign_identity() {
        let (_temp, store, project_id) = open_with_project();
        let other = store.ensure_project("other").expect("other project").id;
        let mine = store
            .insert_identity(project_id, IdentityContext::Source, Some("Mine"), None)
            .expect("mine");
        let theirs = store
            .insert_identity(other, IdentityContext::Source, Some("Theirs"), None)
            .expect("theirs");

        store
            .replace_users(
                project_id,
                &[NewUser {
                    name: "Mine".to_owned(),
                    identity_ids: vec![mine],
                }],
            )
            .expect("initial users");

        let err = store
            .replace_users(
                project_id,
                &[NewUser {
                    name: "Broken".to_owned(),
                    identity_ids: vec![mine, theirs],
                }],
            )
            .expect_err("foreign identity must fail");
        assert!(matches!(err, StoreError::Invalid(_)));

        let users = store.list_users(project_id).expect("users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Mine");
        assert_eq!(users[0].identity_ids, vec![mine]);
    }

    #[test]
    fn bugs_comments_and_attachments_round_trip() {
        let (_temp, store, project_id) = open_with_project();
        let author = store
            .insert_identity(project_id, IdentityContext::Bug, Some("Reporter"), None)
            .expect("author");

        let bug_id = store.upsert_bug(project_id, 4321, "Crash").expect("bug");
        let same = store
            .upsert_bug(project_id, 4321, "Crash on start")
            .expect("bug again");
        assert_eq!(bug_id, same);

        let bug = store
            .find_bug(project_id, 4321)
            .expect("find bug")
            .expect("bug exists");
        assert_eq!(bug.title, "Crash on start");
        assert!(store.find_bug(project_id, 1).expect("find missing").is_none());

        store.upsert_comment(bug_id, 1, author, "second").expect("c1");
        store.upsert_comment(bug_id, 0, author, "first").expect("c0");
        let comments = store.list_comments(bug_id).expect("comments");
        assert_eq!(
            comments.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(),
            vec!["first", "second"]
        );

        store.upsert_attachment(bug_id, 77, author).expect("attachment");
        let attachments = store.list_attachments(bug_id).expect("attachments");
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].submitter_id, author);
    }

    #[test]
    fn comment_fragments_are_replaced_per_comment() {
        let (_temp, store, project_id) = open_with_project();
        let author = store
            .insert_identity(project_id, IdentityContext::Bug, Some("Reporter"), None)
            .expect("author");
        let bug_id = store.upsert_bug(project_id, 1000, "Bug").expect("bug");
        let comment_id = store
            .upsert_comment(bug_id, 0, author, "> quoted\n\nreply")
            .expect("comment");

        let quote = CommentFragmentRecord {
            comment_id,
            position: 0,
            kind: FragmentKind::Quote,
            text: "quoted".to_owned(),
            blank_lines_before: 0,
            back_reference: Some(0),
            speaker_id: Some(author),
        };
        let paragraph = CommentFragmentRecord {
            comment_id,
            position: 1,
            kind: FragmentKind::Paragraph,
            text: "reply".to_owned(),
            blank_lines_before: 1,
            back_reference: None,
            speaker_id: None,
        };

        store
            .replace_comment_fragments(comment_id, &[quote.clone(), paragraph.clone()])
            .expect("write fragments");
        store
            .replace_comment_fragments(comment_id, &[paragraph.clone()])
            .expect("rewrite fragments");

        let fragments = store.list_comment_fragments(comment_id).expect("fragments");
        assert_eq!(fragments, vec![paragraph]);
    }

    #[test]
    fn commit_links_keep_highest_certainty_and_clear_per_project() {
        let (_temp, store, project_id) = open_with_project();
        let bug_id = store.upsert_bug(project_id, 12345, "Bug").expect("bug");
        let commit_id = store
            .upsert_commit(project_id, "ABCDEF", None, "Fix bug 12345", 1_700_000_000)
            .expect("commit");

        let commits = store.list_commits(project_id).expect("commits");
        assert_eq!(commits[0].hash, "abcdef");

        for certainty in [2, 5, 3] {
            store
                .insert_commit_link(CommitLinkRecord {
                    commit_id,
                    bug_id,
                    certainty,
                })
                .expect("link");
        }

        let links = store.list_commit_links(project_id).expect("links");
        assert_eq!(
            links,
            vec![CommitLinkRecord {
                commit_id,
                bug_id,
                certainty: 5,
            }]
        );

        assert_eq!(store.clear_commit_links(project_id).expect("clear"), 1);
        assert!(store.list_commit_links(project_id).expect("links").is_empty());
    }
}
