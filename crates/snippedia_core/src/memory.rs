//! crates/snippedia_core/src/memory.rs
//!
//! An in-process implementation of the store ports.
//!
//! Each port call takes the lock once, so every mutation is atomic per document
//! exactly like the database adapter's single-statement updates. Used by the
//! tests of both workspace members.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{Comment, Reaction, ReactionKind, RemoteProfile, Snippet, SnippetDraft, User};
use crate::ports::{PortError, PortResult, SnippetStore, UserStore};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    snippets: HashMap<Uuid, Snippet>,
    #[cfg(test)]
    hidden_github_lookups: usize,
}

impl Inner {
    fn snippet_mut(&mut self, snippet_id: Uuid) -> PortResult<&mut Snippet> {
        self.snippets
            .get_mut(&snippet_id)
            .ok_or_else(|| PortError::NotFound(format!("Snippet {} not found", snippet_id)))
    }

    #[cfg(test)]
    fn skip_github_lookup(&mut self) -> bool {
        if self.hidden_github_lookups > 0 {
            self.hidden_github_lookups -= 1;
            return true;
        }
        false
    }

    #[cfg(not(test))]
    fn skip_github_lookup(&mut self) -> bool {
        false
    }

    fn collect_snippets(&self, filter: impl Fn(&Snippet) -> bool) -> Vec<Snippet> {
        let mut found: Vec<Snippet> = self.snippets.values().filter(|s| filter(s)).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.inner.lock().await.users.len()
    }

    /// Deletes a user outright, as an administrator would.
    pub async fn remove_user(&self, user_id: Uuid) -> Option<User> {
        self.inner.lock().await.users.remove(&user_id)
    }

    /// Makes the next `count` lookups by provider id miss, which reproduces a
    /// lookup that ran just before a concurrent insert landed.
    #[cfg(test)]
    pub(crate) async fn hide_github_lookups(&self, count: usize) {
        self.inner.lock().await.hidden_github_lookups = count;
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.inner
            .lock()
            .await
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_github_id(&self, github_id: i64) -> PortResult<User> {
        let mut inner = self.inner.lock().await;
        if inner.skip_github_lookup() {
            return Err(PortError::NotFound(format!("GitHub user {} not found", github_id)));
        }
        inner
            .users
            .values()
            .find(|u| u.github_id == github_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("GitHub user {} not found", github_id)))
    }

    async fn insert_user(&self, profile: &RemoteProfile, now: DateTime<Utc>) -> PortResult<User> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|u| u.github_id == profile.id) {
            return Err(PortError::Conflict(format!(
                "duplicate key github_id = {}",
                profile.id
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            github_id: profile.id,
            username: profile.login.clone(),
            email: profile.email.clone(),
            avatar_url: profile.avatar_url.clone(),
            bio: profile.bio.clone(),
            github_url: profile.html_url.clone(),
            created_at: now,
            updated_at: now,
            badges: Vec::new(),
            bookmarked_ids: Vec::new(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        profile: &RemoteProfile,
        now: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        user.username = profile.login.clone();
        user.email = profile.email.clone();
        user.avatar_url = profile.avatar_url.clone();
        user.bio = profile.bio.clone();
        user.github_url = profile.html_url.clone();
        user.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl SnippetStore for InMemoryStore {
    async fn create_snippet(
        &self,
        author_id: Uuid,
        draft: SnippetDraft,
        now: DateTime<Utc>,
    ) -> PortResult<Snippet> {
        let snippet = Snippet::new(Uuid::new_v4(), author_id, draft, now);
        self.inner
            .lock()
            .await
            .snippets
            .insert(snippet.id, snippet.clone());
        Ok(snippet)
    }

    async fn get_snippet(&self, snippet_id: Uuid) -> PortResult<Snippet> {
        self.inner
            .lock()
            .await
            .snippet_mut(snippet_id)
            .map(|s| s.clone())
    }

    async fn list_snippets(&self) -> PortResult<Vec<Snippet>> {
        Ok(self.inner.lock().await.collect_snippets(|_| true))
    }

    async fn list_snippets_by_author(&self, author_id: Uuid) -> PortResult<Vec<Snippet>> {
        Ok(self
            .inner
            .lock()
            .await
            .collect_snippets(|s| s.author_id == author_id))
    }

    async fn list_snippets_bookmarked_by(&self, user_id: Uuid) -> PortResult<Vec<Snippet>> {
        Ok(self
            .inner
            .lock()
            .await
            .collect_snippets(|s| s.is_bookmarked_by(user_id)))
    }

    async fn delete_snippet(&self, snippet_id: Uuid) -> PortResult<()> {
        self.inner
            .lock()
            .await
            .snippets
            .remove(&snippet_id)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("Snippet {} not found", snippet_id)))
    }

    async fn increment_reaction(
        &self,
        snippet_id: Uuid,
        kind: ReactionKind,
        delta: i64,
        touched_at: Option<DateTime<Utc>>,
    ) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        let snippet = inner.snippet_mut(snippet_id)?;
        *snippet.counter_mut(kind) += delta;
        if let Some(at) = touched_at {
            snippet.updated_at = at;
        }
        Ok(())
    }

    async fn pull_reaction(&self, snippet_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        inner
            .snippet_mut(snippet_id)?
            .reactions
            .retain(|r| r.user_id != user_id);
        Ok(())
    }

    async fn push_reaction(&self, snippet_id: Uuid, reaction: Reaction) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        inner.snippet_mut(snippet_id)?.reactions.push(reaction);
        Ok(())
    }

    async fn add_bookmark(&self, snippet_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        let snippet = inner.snippet_mut(snippet_id)?;
        if !snippet.bookmarked_by.contains(&user_id) {
            snippet.bookmarked_by.push(user_id);
        }
        Ok(())
    }

    async fn remove_bookmark(&self, snippet_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        inner
            .snippet_mut(snippet_id)?
            .bookmarked_by
            .retain(|id| *id != user_id);
        Ok(())
    }

    async fn push_comment(&self, snippet_id: Uuid, comment: Comment) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        inner.snippet_mut(snippet_id)?.comments.push(comment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: i64) -> RemoteProfile {
        RemoteProfile {
            id,
            login: format!("user{}", id),
            email: String::new(),
            avatar_url: String::new(),
            bio: String::new(),
            html_url: String::new(),
        }
    }

    #[tokio::test]
    async fn hidden_lookups_miss_then_resume() {
        let store = InMemoryStore::new();
        let user = store.insert_user(&profile(9), Utc::now()).await.unwrap();

        store.hide_github_lookups(1).await;
        assert!(matches!(
            store.get_user_by_github_id(9).await,
            Err(PortError::NotFound(_))
        ));
        assert_eq!(store.get_user_by_github_id(9).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn duplicate_provider_id_conflicts() {
        let store = InMemoryStore::new();
        store.insert_user(&profile(9), Utc::now()).await.unwrap();
        assert!(matches!(
            store.insert_user(&profile(9), Utc::now()).await,
            Err(PortError::Conflict(_))
        ));
        assert_eq!(store.user_count().await, 1);
    }
}
