use async_trait::async_trait;
use sqlx::Row;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use time::{Date, OffsetDateTime};

use crate::app::errors::CatalogError;
use crate::domain::engagement::DateRange;
use crate::domain::post::{NewPost, Post, PostId};
use crate::infra::db::{is_unique_violation, Db};

/// Posts and the likes attached to them.
///
/// Per `(post, user)` pair a like is either present or absent. `like` moves
/// absent to present and `unlike` moves it back; the opposite moves fail with
/// [`CatalogError::AlreadyLiked`] and [`CatalogError::NotLiked`]. The post's
/// author can never move their own pair out of the absent state.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn make_post(&self, author: &str, post: NewPost) -> Result<PostId, CatalogError>;

    async fn get(&self, post_id: PostId) -> Result<Option<Post>, CatalogError>;

    async fn has_like(&self, post_id: PostId, username: &str) -> Result<bool, CatalogError>;

    async fn like(&self, post_id: PostId, username: &str) -> Result<(), CatalogError>;

    async fn unlike(&self, post_id: PostId, username: &str) -> Result<(), CatalogError>;

    /// Number of likes dated inside `range`, bounds inclusive.
    async fn analytics(&self, range: DateRange) -> Result<i64, CatalogError>;
}

pub type CatalogPtr = Arc<dyn Catalog>;

#[derive(Clone)]
pub struct PgCatalog {
    db: Db,
}

impl PgCatalog {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn make_post(&self, author: &str, post: NewPost) -> Result<PostId, CatalogError> {
        let id: PostId = sqlx::query_scalar(
            "INSERT INTO posts (author, title, description) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(author)
        .bind(post.title)
        .bind(post.description)
        .fetch_one(self.db.pool())
        .await?;

        Ok(id)
    }

    async fn get(&self, post_id: PostId) -> Result<Option<Post>, CatalogError> {
        let row = sqlx::query("SELECT id, author, title, description FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|row| Post {
            id: row.get("id"),
            author: row.get("author"),
            title: row.get("title"),
            description: row.get("description"),
        }))
    }

    async fn has_like(&self, post_id: PostId, username: &str) -> Result<bool, CatalogError> {
        let liked: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE post = $1 AND \"user\" = $2)",
        )
        .bind(post_id)
        .bind(username)
        .fetch_one(self.db.pool())
        .await?;

        Ok(liked)
    }

    async fn like(&self, post_id: PostId, username: &str) -> Result<(), CatalogError> {
        let mut tx = self.db.pool().begin().await?;

        let author: Option<String> = sqlx::query_scalar("SELECT author FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?;
        let author = author.ok_or(CatalogError::NotFound)?;

        if author == username {
            return Err(CatalogError::AuthorLiked);
        }

        // The unique key decides concurrent likers; there is no pre-check.
        let inserted = sqlx::query("INSERT INTO likes (\"user\", post) VALUES ($1, $2)")
            .bind(username)
            .bind(post_id)
            .execute(&mut *tx)
            .await;

        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => return Err(CatalogError::AlreadyLiked),
            Err(err) => return Err(err.into()),
        }

        tx.commit().await?;
        Ok(())
    }

    async fn unlike(&self, post_id: PostId, username: &str) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM likes WHERE post = $1 AND \"user\" = $2")
            .bind(post_id)
            .bind(username)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotLiked);
        }
        Ok(())
    }

    async fn analytics(&self, range: DateRange) -> Result<i64, CatalogError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM likes \
             WHERE ($1::date IS NULL OR date >= $1) \
               AND ($2::date IS NULL OR date <= $2)",
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_one(self.db.pool())
        .await?;

        Ok(count)
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    posts: BTreeMap<PostId, Post>,
    likes: HashMap<(PostId, String), Date>,
    last_id: PostId,
}

/// In-process catalog with the same contract as [`PgCatalog`].
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a like on an arbitrary date, skipping the like protocol.
    /// Returns `false` if the pair was already liked.
    pub fn seed_like(&self, post_id: PostId, username: &str, date: Date) -> bool {
        match self.lock().likes.entry((post_id, username.to_string())) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(date);
                true
            }
        }
    }

    pub fn like_count(&self) -> usize {
        self.lock().likes.len()
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn make_post(&self, author: &str, post: NewPost) -> Result<PostId, CatalogError> {
        let mut state = self.lock();
        state.last_id += 1;
        let id = state.last_id;
        state.posts.insert(
            id,
            Post {
                id,
                author: author.to_string(),
                title: post.title,
                description: post.description,
            },
        );
        Ok(id)
    }

    async fn get(&self, post_id: PostId) -> Result<Option<Post>, CatalogError> {
        Ok(self.lock().posts.get(&post_id).cloned())
    }

    async fn has_like(&self, post_id: PostId, username: &str) -> Result<bool, CatalogError> {
        Ok(self
            .lock()
            .likes
            .contains_key(&(post_id, username.to_string())))
    }

    async fn like(&self, post_id: PostId, username: &str) -> Result<(), CatalogError> {
        let mut state = self.lock();

        let post = state.posts.get(&post_id).ok_or(CatalogError::NotFound)?;
        if post.author == username {
            return Err(CatalogError::AuthorLiked);
        }

        match state.likes.entry((post_id, username.to_string())) {
            Entry::Occupied(_) => Err(CatalogError::AlreadyLiked),
            Entry::Vacant(slot) => {
                slot.insert(OffsetDateTime::now_utc().date());
                Ok(())
            }
        }
    }

    async fn unlike(&self, post_id: PostId, username: &str) -> Result<(), CatalogError> {
        self.lock()
            .likes
            .remove(&(post_id, username.to_string()))
            .map(|_| ())
            .ok_or(CatalogError::NotLiked)
    }

    async fn analytics(&self, range: DateRange) -> Result<i64, CatalogError> {
        let count = self
            .lock()
            .likes
            .values()
            .filter(|date| range.contains(**date))
            .count();
        Ok(count as i64)
    }
}
