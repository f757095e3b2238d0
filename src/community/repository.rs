// Community store - posts, comments and likes.
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::sync::Arc;

use crate::db::models::{CommentId, CommentView, FeedPost, PostId, ProfileId};
use crate::db::StoreError;
use crate::state::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeToggle {
    Liked,
    Unliked,
}

#[async_trait]
pub trait CommunityStore: Send + Sync {
    async fn create_post(
        &self,
        owner: ProfileId,
        content: &str,
        image: Option<&str>,
    ) -> Result<PostId, StoreError>;

    async fn post_owner(&self, post: PostId) -> Result<Option<ProfileId>, StoreError>;

    async fn update_post_content(&self, post: PostId, content: &str)
        -> Result<bool, StoreError>;

    /// Remove a post along with its comments and likes, atomically.
    async fn delete_post(&self, post: PostId) -> Result<bool, StoreError>;

    async fn get_post(
        &self,
        post: PostId,
        viewer: Option<ProfileId>,
    ) -> Result<Option<FeedPost>, StoreError>;

    /// Newest first. `liked_by_me` is computed for `viewer`.
    async fn list_posts(&self, viewer: Option<ProfileId>) -> Result<Vec<FeedPost>, StoreError>;

    async fn add_comment(
        &self,
        post: PostId,
        author: ProfileId,
        text: &str,
    ) -> Result<CommentId, StoreError>;

    async fn list_comments(&self, post: PostId) -> Result<Vec<CommentView>, StoreError>;

    /// Flip the (post, profile) like in one transaction.
    async fn toggle_like(&self, post: PostId, profile: ProfileId)
        -> Result<LikeToggle, StoreError>;
}

pub type DynCommunityStore = Arc<dyn CommunityStore>;

pub struct SqliteCommunityStore {
    pool: DbPool,
}

impl SqliteCommunityStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const FEED_SELECT: &str = "
    SELECT p.id, p.profile_id, p.content, p.image, p.created_at,
           pr.full_name, pr.photo,
           (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count,
           EXISTS(SELECT 1 FROM likes l2 WHERE l2.post_id = p.id AND l2.profile_id = ?1) AS liked_by_me
    FROM posts p
    JOIN profiles pr ON pr.id = p.profile_id";

fn feed_post_from_row(row: &Row<'_>) -> rusqlite::Result<FeedPost> {
    Ok(FeedPost {
        post_id: row.get(0)?,
        profile_id: row.get(1)?,
        content: row.get(2)?,
        image: row.get(3)?,
        created_at: row.get(4)?,
        full_name: row.get(5)?,
        profile_photo: row.get(6)?,
        like_count: row.get(7)?,
        comment_count: row.get(8)?,
        liked_by_me: row.get(9)?,
    })
}

/// Run `f` inside `BEGIN IMMEDIATE`, committing on success.
fn immediate<T>(
    conn: &Connection,
    f: impl FnOnce() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    conn.execute_batch("BEGIN IMMEDIATE")?;
    match f() {
        Ok(value) => {
            conn.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(e) => {
            conn.execute_batch("ROLLBACK")?;
            Err(e)
        }
    }
}

#[async_trait]
impl CommunityStore for SqliteCommunityStore {
    async fn create_post(
        &self,
        owner: ProfileId,
        content: &str,
        image: Option<&str>,
    ) -> Result<PostId, StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO posts (profile_id, content, image) VALUES (?1, ?2, ?3)",
            params![owner, content, image],
        )?;
        Ok(PostId(conn.last_insert_rowid()))
    }

    async fn post_owner(&self, post: PostId) -> Result<Option<ProfileId>, StoreError> {
        let conn = self.pool.get()?;
        let owner = conn
            .query_row(
                "SELECT profile_id FROM posts WHERE id = ?1",
                params![post],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    async fn update_post_content(
        &self,
        post: PostId,
        content: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE posts SET content = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![content, post],
        )?;
        Ok(rows > 0)
    }

    async fn delete_post(&self, post: PostId) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        immediate(&conn, || {
            conn.execute("DELETE FROM comments WHERE post_id = ?1", params![post])?;
            conn.execute("DELETE FROM likes WHERE post_id = ?1", params![post])?;
            let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![post])?;
            Ok(rows > 0)
        })
    }

    async fn get_post(
        &self,
        post: PostId,
        viewer: Option<ProfileId>,
    ) -> Result<Option<FeedPost>, StoreError> {
        let conn = self.pool.get()?;
        let found = conn
            .query_row(
                &format!("{FEED_SELECT} WHERE p.id = ?2"),
                params![viewer, post],
                feed_post_from_row,
            )
            .optional()?;
        Ok(found)
    }

    async fn list_posts(&self, viewer: Option<ProfileId>) -> Result<Vec<FeedPost>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare(&format!("{FEED_SELECT} ORDER BY p.created_at DESC, p.id DESC"))?;
        let posts = stmt
            .query_map(params![viewer], feed_post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn add_comment(
        &self,
        post: PostId,
        author: ProfileId,
        text: &str,
    ) -> Result<CommentId, StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO comments (post_id, profile_id, comment) VALUES (?1, ?2, ?3)",
            params![post, author, text],
        )?;
        Ok(CommentId(conn.last_insert_rowid()))
    }

    async fn list_comments(&self, post: PostId) -> Result<Vec<CommentView>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.comment, c.created_at, pr.id, pr.full_name, pr.photo
             FROM comments c
             JOIN profiles pr ON pr.id = c.profile_id
             WHERE c.post_id = ?1
             ORDER BY c.created_at ASC, c.id ASC",
        )?;
        let comments = stmt
            .query_map(params![post], |row| {
                Ok(CommentView {
                    comment_id: row.get(0)?,
                    comment: row.get(1)?,
                    created_at: row.get(2)?,
                    profile_id: row.get(3)?,
                    full_name: row.get(4)?,
                    profile_photo: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    async fn toggle_like(
        &self,
        post: PostId,
        profile: ProfileId,
    ) -> Result<LikeToggle, StoreError> {
        let conn = self.pool.get()?;
        immediate(&conn, || {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO likes (post_id, profile_id) VALUES (?1, ?2)",
                params![post, profile],
            )?;
            if inserted > 0 {
                return Ok(LikeToggle::Liked);
            }
            conn.execute(
                "DELETE FROM likes WHERE post_id = ?1 AND profile_id = ?2",
                params![post, profile],
            )?;
            Ok(LikeToggle::Unliked)
        })
    }
}
