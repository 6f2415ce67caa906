mod git;

use serde::{Deserialize, Serialize};

pub use git::{CommitInfo, GitContext, GitError};

pub type ProjectId = i64;
pub type IdentityId = i64;
pub type UserId = i64;
pub type BugId = i64;
pub type CommentId = i64;
pub type CommitId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum IdentityContext {
    Source,
    Bug,
}

impl IdentityContext {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Bug => "bug",
        }
    }
}

impl std::str::FromStr for IdentityContext {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "source" => Ok(Self::Source),
            "bug" => Ok(Self::Bug),
            other => Err(format!(
                "invalid identity context '{other}', expected one of: source, bug"
            )),
        }
    }
}

/// One account as observed in exactly one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub project_id: ProjectId,
    pub context: IdentityContext,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    /// Email used for exact matching: the explicit address, or the display
    /// name when the name is itself an address. Lower-cased.
    pub fn match_email(&self) -> Option<String> {
        if let Some(email) = self.email.as_deref().filter(|value| is_valid_email(value)) {
            return Some(normalize_email(email));
        }

        self.name
            .as_deref()
            .filter(|value| is_valid_email(value))
            .map(normalize_email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    pub id: BugId,
    pub project_id: ProjectId,
    pub number: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub bug_id: BugId,
    pub number: i64,
    pub submitter_id: IdentityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub bug_id: BugId,
    pub ordinal: i64,
    pub author_id: IdentityId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: CommitId,
    pub project_id: ProjectId,
    pub hash: String,
    pub author_id: Option<IdentityId>,
    pub message: String,
    pub committed_at: i64,
}

pub fn normalize_optional(input: Option<&str>) -> Option<String> {
    input
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn email_local_part(email: &str) -> &str {
    email
        .trim()
        .split_once('@')
        .map(|(local, _)| local)
        .unwrap_or_else(|| email.trim())
}

pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels = domain.split('.').collect::<Vec<_>>();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label
                    .chars()
                    .all(|ch| ch.is_alphanumeric() || ch == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: Option<&str>, email: Option<&str>) -> Identity {
        Identity {
            id: 1,
            project_id: 1,
            context: IdentityContext::Bug,
            name: name.map(str::to_owned),
            email: email.map(str::to_owned),
        }
    }

    #[test]
    fn email_validation_accepts_addresses_and_rejects_names() {
        assert!(is_valid_email("jane.doe@example.org"));
        assert!(is_valid_email(" dev+bugs@mail.example.co.uk "));
        assert!(!is_valid_email("Jane Doe"));
        assert!(!is_valid_email("jane@localhost"));
        assert!(!is_valid_email("@example.org"));
        assert!(!is_valid_email("jane@@example.org"));
        assert!(!is_valid_email("jane doe@example.org"));
        assert!(!is_valid_email("jane@example..org"));
    }

    #[test]
    fn match_email_prefers_explicit_address_then_name() {
        let explicit = identity(Some("Jane"), Some("Jane@Example.org"));
        assert_eq!(explicit.match_email().as_deref(), Some("jane@example.org"));

        let from_name = identity(Some("JDoe@Example.org"), None);
        assert_eq!(from_name.match_email().as_deref(), Some("jdoe@example.org"));

        let none = identity(Some("Jane Doe"), None);
        assert_eq!(none.match_email(), None);
    }

    #[test]
    fn email_local_part_handles_missing_domain() {
        assert_eq!(email_local_part("jane.doe@example.org"), "jane.doe");
        assert_eq!(email_local_part("  plain "), "plain");
    }

    #[test]
    fn identity_context_round_trips_through_str() {
        for context in [IdentityContext::Source, IdentityContext::Bug] {
            assert_eq!(context.as_str().parse::<IdentityContext>(), Ok(context));
        }
        assert!("vcs".parse::<IdentityContext>().is_err());
    }
}
