//! crates/snippedia_core/src/interactions.rs
//!
//! Reactions, bookmarks, comments and ownership-gated deletion on snippets.
//!
//! Every mutation is expressed as one or more atomic single-document updates on
//! the snippet store. The reaction switch is several such updates issued in
//! sequence without a surrounding lock, so two overlapping requests from the same
//! user can briefly leave a counter out of step with the embedded reactions.
//! Requests from different users never interfere.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{AuthorSummary, Comment, Reaction, ReactionKind, Snippet, SnippetDraft, User};
use crate::error::{DomainError, DomainResult};
use crate::ports::{PortError, SnippetStore, UserStore};

/// What `set_reaction` did to the snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    /// The user already had this reaction.
    Unchanged,
    Added,
    Switched { from: ReactionKind },
}

#[derive(Clone)]
pub struct InteractionEngine {
    snippets: Arc<dyn SnippetStore>,
    users: Arc<dyn UserStore>,
}

impl InteractionEngine {
    pub fn new(snippets: Arc<dyn SnippetStore>, users: Arc<dyn UserStore>) -> Self {
        Self { snippets, users }
    }

    //=====================================================================================
    // Snippet Documents
    //=====================================================================================

    /// Publishes a new snippet owned by `acting`.
    pub async fn create_snippet(&self, acting: &User, draft: SnippetDraft) -> DomainResult<Snippet> {
        if draft.title.trim().is_empty() {
            return Err(DomainError::InvalidInput("title must not be empty".to_string()));
        }
        if draft.code.trim().is_empty() {
            return Err(DomainError::InvalidInput("code must not be empty".to_string()));
        }

        let snippet = self
            .snippets
            .create_snippet(acting.id, draft, Utc::now())
            .await
            .map_err(store_error)?;
        info!("User {} created snippet {}", acting.id, snippet.id);
        Ok(snippet)
    }

    pub async fn get_snippet(&self, snippet_id: &str) -> DomainResult<Snippet> {
        let id = parse_id(snippet_id)?;
        self.load(id).await
    }

    pub async fn list_snippets(&self) -> DomainResult<Vec<Snippet>> {
        self.snippets.list_snippets().await.map_err(store_error)
    }

    pub async fn list_authored_by(&self, user: &User) -> DomainResult<Vec<Snippet>> {
        self.snippets
            .list_snippets_by_author(user.id)
            .await
            .map_err(store_error)
    }

    pub async fn list_bookmarked_by(&self, user: &User) -> DomainResult<Vec<Snippet>> {
        self.snippets
            .list_snippets_bookmarked_by(user.id)
            .await
            .map_err(store_error)
    }

    /// Author details for read views. A deleted author yields `None`.
    pub async fn author_summary(&self, author_id: Uuid) -> DomainResult<Option<AuthorSummary>> {
        match self.users.get_user_by_id(author_id).await {
            Ok(user) => Ok(Some(AuthorSummary::from(&user))),
            Err(PortError::NotFound(_)) => Ok(None),
            Err(e) => Err(DomainError::Store(e.to_string())),
        }
    }

    /// Deletes the snippet if `acting` is its author. Embedded comments and
    /// reactions go with the document.
    pub async fn delete_snippet(&self, snippet_id: &str, acting: &User) -> DomainResult<()> {
        let id = parse_id(snippet_id)?;
        let snippet = self.load(id).await?;

        if snippet.author_id != acting.id {
            return Err(DomainError::Forbidden);
        }

        self.snippets
            .delete_snippet(id)
            .await
            .map_err(snippet_error)?;
        info!("User {} deleted snippet {}", acting.id, id);
        Ok(())
    }

    //=====================================================================================
    // Interactions
    //=====================================================================================

    /// Sets the acting user's reaction on a snippet.
    ///
    /// Re-applying the reaction the user already has is a no-op, not a removal.
    pub async fn set_reaction(
        &self,
        snippet_id: &str,
        acting: &User,
        kind: ReactionKind,
    ) -> DomainResult<ReactionChange> {
        let id = parse_id(snippet_id)?;
        let snippet = self.load(id).await?;
        let previous = snippet.reaction_of(acting.id);

        if previous == Some(kind) {
            debug!("User {} already reacted {} on {}", acting.id, kind, id);
            return Ok(ReactionChange::Unchanged);
        }

        if let Some(old) = previous {
            self.snippets
                .increment_reaction(id, old, -1, None)
                .await
                .map_err(snippet_error)?;
        }
        self.snippets
            .pull_reaction(id, acting.id)
            .await
            .map_err(snippet_error)?;
        self.snippets
            .push_reaction(
                id,
                Reaction {
                    user_id: acting.id,
                    kind,
                },
            )
            .await
            .map_err(snippet_error)?;
        self.snippets
            .increment_reaction(id, kind, 1, Some(Utc::now()))
            .await
            .map_err(snippet_error)?;

        Ok(match previous {
            Some(from) => {
                info!("User {} switched reaction on {} from {} to {}", acting.id, id, from, kind);
                ReactionChange::Switched { from }
            }
            None => {
                info!("User {} reacted {} on {}", acting.id, kind, id);
                ReactionChange::Added
            }
        })
    }

    /// Flips the acting user's bookmark on a snippet and returns the new state.
    ///
    /// The result is derived from the membership read before the update, so two
    /// racing toggles by one user can both report the same state.
    pub async fn toggle_bookmark(&self, snippet_id: &str, acting: &User) -> DomainResult<bool> {
        let id = parse_id(snippet_id)?;
        let snippet = self.load(id).await?;
        let was_bookmarked = snippet.is_bookmarked_by(acting.id);

        let update = if was_bookmarked {
            self.snippets.remove_bookmark(id, acting.id).await
        } else {
            self.snippets.add_bookmark(id, acting.id).await
        };
        update.map_err(snippet_error)?;

        debug!("User {} bookmark on {} is now {}", acting.id, id, !was_bookmarked);
        Ok(!was_bookmarked)
    }

    /// Appends a comment authored by `acting`.
    ///
    /// `parent_id` only has to be well formed; it is not checked against the
    /// existing comments. An empty parent id means a top-level comment.
    pub async fn add_comment(
        &self,
        snippet_id: &str,
        acting: &User,
        content: &str,
        parent_id: Option<&str>,
    ) -> DomainResult<Comment> {
        let id = parse_id(snippet_id)?;
        if content.trim().is_empty() {
            return Err(DomainError::InvalidInput("comment must not be empty".to_string()));
        }
        let parent_id = match parent_id.filter(|p| !p.is_empty()) {
            Some(raw) => Some(parse_id(raw)?),
            None => None,
        };

        let comment = Comment {
            id: Uuid::new_v4(),
            content: content.to_string(),
            author_id: acting.id,
            author_username: acting.username.clone(),
            avatar_url: non_empty(&acting.avatar_url),
            github_url: non_empty(&acting.github_url),
            created_at: Utc::now(),
            is_reply: parent_id.is_some(),
            parent_id,
        };

        self.snippets
            .push_comment(id, comment.clone())
            .await
            .map_err(snippet_error)?;
        info!("User {} commented on {}", acting.id, id);
        Ok(comment)
    }

    async fn load(&self, id: Uuid) -> DomainResult<Snippet> {
        self.snippets.get_snippet(id).await.map_err(snippet_error)
    }
}

fn parse_id(raw: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| DomainError::InvalidIdentifier(raw.to_string()))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn snippet_error(err: PortError) -> DomainError {
    DomainError::from_store(err, DomainError::SnippetNotFound)
}

fn store_error(err: PortError) -> DomainError {
    DomainError::Store(err.to_string())
}
