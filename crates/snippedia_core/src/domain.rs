//! crates/snippedia_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::DomainError;

/// A local account, created on the first successful provider login.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    /// The identity provider's id for this account. Unique across all users.
    pub github_id: i64,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
    pub bio: String,
    pub github_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub badges: Vec<String>,
    pub bookmarked_ids: Vec<Uuid>,
}

/// Identity data fetched from the provider after the token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteProfile {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub avatar_url: String,
    pub bio: String,
    pub html_url: String,
}

/// The three named reactions a snippet can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    Useful,
    Smart,
    Refactored,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 3] = [
        ReactionKind::Useful,
        ReactionKind::Smart,
        ReactionKind::Refactored,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::Useful => "useful",
            ReactionKind::Smart => "smart",
            ReactionKind::Refactored => "refactored",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "useful" => Ok(ReactionKind::Useful),
            "smart" => Ok(ReactionKind::Smart),
            "refactored" => Ok(ReactionKind::Refactored),
            other => Err(DomainError::InvalidInput(format!(
                "unknown reaction type '{}', expected one of useful, smart, refactored",
                other
            ))),
        }
    }
}

/// One user's reaction, embedded in a snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub user_id: Uuid,
    pub kind: ReactionKind,
}

/// A comment embedded in a snippet.
///
/// The author fields are a snapshot taken when the comment is created and are
/// not updated when the author later changes their profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub author_username: String,
    pub avatar_url: Option<String>,
    pub github_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_reply: bool,
    pub parent_id: Option<Uuid>,
}

/// A shared code snippet together with all of its interaction state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub code: String,
    pub language: String,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub useful: i64,
    pub smart: i64,
    pub refactored: i64,
    pub bookmarked_by: Vec<Uuid>,
    pub comments: Vec<Comment>,
    pub reactions: Vec<Reaction>,
}

impl Snippet {
    /// Builds a fresh snippet with zeroed counters and no interactions.
    pub fn new(id: Uuid, author_id: Uuid, draft: SnippetDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            code: draft.code,
            language: draft.language,
            tags: draft.tags,
            author_id,
            created_at: now,
            updated_at: now,
            useful: 0,
            smart: 0,
            refactored: 0,
            bookmarked_by: Vec::new(),
            comments: Vec::new(),
            reactions: Vec::new(),
        }
    }

    pub fn counter(&self, kind: ReactionKind) -> i64 {
        match kind {
            ReactionKind::Useful => self.useful,
            ReactionKind::Smart => self.smart,
            ReactionKind::Refactored => self.refactored,
        }
    }

    pub fn counter_mut(&mut self, kind: ReactionKind) -> &mut i64 {
        match kind {
            ReactionKind::Useful => &mut self.useful,
            ReactionKind::Smart => &mut self.smart,
            ReactionKind::Refactored => &mut self.refactored,
        }
    }

    /// The reaction `user_id` currently has on this snippet, if any.
    pub fn reaction_of(&self, user_id: Uuid) -> Option<ReactionKind> {
        self.reactions
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.kind)
    }

    pub fn is_bookmarked_by(&self, user_id: Uuid) -> bool {
        self.bookmarked_by.contains(&user_id)
    }
}

/// The user-supplied fields of a new snippet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetDraft {
    pub title: String,
    pub description: String,
    pub code: String,
    pub language: String,
    pub tags: Vec<String>,
}

/// Author details attached to snippets in read views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorSummary {
    pub username: String,
    pub avatar_url: String,
    pub github_url: String,
    pub bio: String,
}

impl From<&User> for AuthorSummary {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            avatar_url: user.avatar_url.clone(),
            github_url: user.github_url.clone(),
            bio: user.bio.clone(),
        }
    }
}
