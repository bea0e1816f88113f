//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `UserStore` and `SnippetStore` ports from the `core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.
//!
//! A snippet row carries its whole interaction state (counters, bookmarks,
//! comments, reactions), and every mutation below is a single `UPDATE`, so each
//! one is atomic for that snippet.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snippedia_core::domain::{
    Comment, Reaction, ReactionKind, RemoteProfile, Snippet, SnippetDraft, User,
};
use snippedia_core::ports::{PortError, PortResult, SnippetStore, UserStore};
use sqlx::postgres::{PgPoolOptions, PgQueryResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use uuid::Uuid;

/// Upper bound for acquiring a connection, including the startup check.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_COLUMNS: &str = "id, github_id, username, email, avatar_url, bio, github_url, \
     created_at, updated_at, badges, bookmarked_ids";

const SNIPPET_COLUMNS: &str = "id, title, description, code, language, tags, author_id, \
     created_at, updated_at, useful, smart, refactored, bookmarked_by, comments, reactions";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the process-wide pool and checks that the database answers.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(database_url)
            .await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(Self::new(pool))
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    github_id: i64,
    username: String,
    email: String,
    avatar_url: String,
    bio: String,
    github_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    badges: Vec<String>,
    bookmarked_ids: Vec<Uuid>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            github_id: self.github_id,
            username: self.username,
            email: self.email,
            avatar_url: self.avatar_url,
            bio: self.bio,
            github_url: self.github_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
            badges: self.badges,
            bookmarked_ids: self.bookmarked_ids,
        }
    }
}

/// A reaction as stored inside the `reactions` JSONB array.
#[derive(Serialize, Deserialize)]
struct ReactionRecord {
    user_id: Uuid,
    #[serde(rename = "type")]
    kind: String,
}
impl ReactionRecord {
    fn from_domain(reaction: &Reaction) -> Self {
        Self {
            user_id: reaction.user_id,
            kind: reaction.kind.as_str().to_string(),
        }
    }

    fn to_domain(self) -> PortResult<Reaction> {
        let kind = self
            .kind
            .parse::<ReactionKind>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Reaction {
            user_id: self.user_id,
            kind,
        })
    }
}

/// A comment as stored inside the `comments` JSONB array.
#[derive(Serialize, Deserialize)]
struct CommentRecord {
    id: Uuid,
    content: String,
    author_id: Uuid,
    author_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    github_url: Option<String>,
    created_at: DateTime<Utc>,
    is_reply: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<Uuid>,
}
impl CommentRecord {
    fn from_domain(comment: Comment) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            author_id: comment.author_id,
            author_username: comment.author_username,
            avatar_url: comment.avatar_url,
            github_url: comment.github_url,
            created_at: comment.created_at,
            is_reply: comment.is_reply,
            parent_id: comment.parent_id,
        }
    }

    fn to_domain(self) -> Comment {
        Comment {
            id: self.id,
            content: self.content,
            author_id: self.author_id,
            author_username: self.author_username,
            avatar_url: self.avatar_url,
            github_url: self.github_url,
            created_at: self.created_at,
            is_reply: self.is_reply,
            parent_id: self.parent_id,
        }
    }
}

#[derive(FromRow)]
struct SnippetRecord {
    id: Uuid,
    title: String,
    description: String,
    code: String,
    language: String,
    tags: Vec<String>,
    author_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    useful: i64,
    smart: i64,
    refactored: i64,
    bookmarked_by: Vec<Uuid>,
    comments: Json<Vec<CommentRecord>>,
    reactions: Json<Vec<ReactionRecord>>,
}
impl SnippetRecord {
    fn to_domain(self) -> PortResult<Snippet> {
        let reactions = self
            .reactions
            .0
            .into_iter()
            .map(ReactionRecord::to_domain)
            .collect::<PortResult<Vec<_>>>()?;

        Ok(Snippet {
            id: self.id,
            title: self.title,
            description: self.description,
            code: self.code,
            language: self.language,
            tags: self.tags,
            author_id: self.author_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            useful: self.useful,
            smart: self.smart,
            refactored: self.refactored,
            bookmarked_by: self.bookmarked_by,
            comments: self.comments.0.into_iter().map(CommentRecord::to_domain).collect(),
            reactions,
        })
    }
}

//=========================================================================================
// Error Helpers
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

/// Turns an `UPDATE`/`DELETE` that matched no row into `NotFound`.
fn expect_snippet_row(
    result: Result<PgQueryResult, sqlx::Error>,
    snippet_id: Uuid,
) -> PortResult<()> {
    match result.map_err(unexpected)?.rows_affected() {
        0 => Err(PortError::NotFound(format!("Snippet {} not found", snippet_id))),
        _ => Ok(()),
    }
}

fn records_to_domain(records: Vec<SnippetRecord>) -> PortResult<Vec<Snippet>> {
    records.into_iter().map(SnippetRecord::to_domain).collect()
}

/// The counter column for a reaction kind. Only these fixed names are ever
/// interpolated into SQL.
fn counter_column(kind: ReactionKind) -> &'static str {
    match kind {
        ReactionKind::Useful => "useful",
        ReactionKind::Smart => "smart",
        ReactionKind::Refactored => "refactored",
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for DbAdapter {
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_github_id(&self, github_id: i64) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE github_id = $1",
            USER_COLUMNS
        ))
        .bind(github_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("GitHub user {} not found", github_id)))?;
        Ok(record.to_domain())
    }

    async fn insert_user(&self, profile: &RemoteProfile, now: DateTime<Utc>) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (github_id, username, email, avatar_url, bio, github_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(profile.id)
        .bind(&profile.login)
        .bind(&profile.email)
        .bind(&profile.avatar_url)
        .bind(&profile.bio)
        .bind(&profile.html_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict(db.message().to_string())
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        profile: &RemoteProfile,
        now: DateTime<Utc>,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET username = $2, email = $3, avatar_url = $4, bio = $5, \
             github_url = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(user_id)
        .bind(&profile.login)
        .bind(&profile.email)
        .bind(&profile.avatar_url)
        .bind(&profile.bio)
        .bind(&profile.html_url)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `SnippetStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SnippetStore for DbAdapter {
    async fn create_snippet(
        &self,
        author_id: Uuid,
        draft: SnippetDraft,
        now: DateTime<Utc>,
    ) -> PortResult<Snippet> {
        let record = sqlx::query_as::<_, SnippetRecord>(&format!(
            "INSERT INTO snippets (title, description, code, language, tags, author_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING {}",
            SNIPPET_COLUMNS
        ))
        .bind(draft.title)
        .bind(draft.description)
        .bind(draft.code)
        .bind(draft.language)
        .bind(draft.tags)
        .bind(author_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_snippet(&self, snippet_id: Uuid) -> PortResult<Snippet> {
        let record = sqlx::query_as::<_, SnippetRecord>(&format!(
            "SELECT {} FROM snippets WHERE id = $1",
            SNIPPET_COLUMNS
        ))
        .bind(snippet_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Snippet {} not found", snippet_id)))?;
        record.to_domain()
    }

    async fn list_snippets(&self) -> PortResult<Vec<Snippet>> {
        let records = sqlx::query_as::<_, SnippetRecord>(&format!(
            "SELECT {} FROM snippets ORDER BY created_at DESC",
            SNIPPET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records_to_domain(records)
    }

    async fn list_snippets_by_author(&self, author_id: Uuid) -> PortResult<Vec<Snippet>> {
        let records = sqlx::query_as::<_, SnippetRecord>(&format!(
            "SELECT {} FROM snippets WHERE author_id = $1 ORDER BY created_at DESC",
            SNIPPET_COLUMNS
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records_to_domain(records)
    }

    async fn list_snippets_bookmarked_by(&self, user_id: Uuid) -> PortResult<Vec<Snippet>> {
        let records = sqlx::query_as::<_, SnippetRecord>(&format!(
            "SELECT {} FROM snippets WHERE $1 = ANY(bookmarked_by) ORDER BY created_at DESC",
            SNIPPET_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records_to_domain(records)
    }

    async fn delete_snippet(&self, snippet_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM snippets WHERE id = $1")
            .bind(snippet_id)
            .execute(&self.pool)
            .await;
        expect_snippet_row(result, snippet_id)
    }

    async fn increment_reaction(
        &self,
        snippet_id: Uuid,
        kind: ReactionKind,
        delta: i64,
        touched_at: Option<DateTime<Utc>>,
    ) -> PortResult<()> {
        let column = counter_column(kind);
        let sql = format!(
            "UPDATE snippets SET {col} = {col} + $2, updated_at = COALESCE($3, updated_at) WHERE id = $1",
            col = column
        );
        let result = sqlx::query(&sql)
            .bind(snippet_id)
            .bind(delta)
            .bind(touched_at)
            .execute(&self.pool)
            .await;
        expect_snippet_row(result, snippet_id)
    }

    async fn pull_reaction(&self, snippet_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE snippets SET reactions = COALESCE(\
                 (SELECT jsonb_agg(e.r ORDER BY e.i) \
                  FROM jsonb_array_elements(reactions) WITH ORDINALITY AS e(r, i) \
                  WHERE e.r->>'user_id' <> $2), \
                 '[]'::jsonb) \
             WHERE id = $1",
        )
        .bind(snippet_id)
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await;
        expect_snippet_row(result, snippet_id)
    }

    async fn push_reaction(&self, snippet_id: Uuid, reaction: Reaction) -> PortResult<()> {
        let result = sqlx::query("UPDATE snippets SET reactions = reactions || $2 WHERE id = $1")
            .bind(snippet_id)
            .bind(Json(vec![ReactionRecord::from_domain(&reaction)]))
            .execute(&self.pool)
            .await;
        expect_snippet_row(result, snippet_id)
    }

    async fn add_bookmark(&self, snippet_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE snippets SET bookmarked_by = CASE \
                 WHEN $2 = ANY(bookmarked_by) THEN bookmarked_by \
                 ELSE array_append(bookmarked_by, $2) END \
             WHERE id = $1",
        )
        .bind(snippet_id)
        .bind(user_id)
        .execute(&self.pool)
        .await;
        expect_snippet_row(result, snippet_id)
    }

    async fn remove_bookmark(&self, snippet_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let result =
            sqlx::query("UPDATE snippets SET bookmarked_by = array_remove(bookmarked_by, $2) WHERE id = $1")
                .bind(snippet_id)
                .bind(user_id)
                .execute(&self.pool)
                .await;
        expect_snippet_row(result, snippet_id)
    }

    async fn push_comment(&self, snippet_id: Uuid, comment: Comment) -> PortResult<()> {
        let result = sqlx::query("UPDATE snippets SET comments = comments || $2 WHERE id = $1")
            .bind(snippet_id)
            .bind(Json(vec![CommentRecord::from_domain(comment)]))
            .execute(&self.pool)
            .await;
        expect_snippet_row(result, snippet_id)
    }
}
