// Explore feed: read-only travel posts with their place and photo.
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use crate::db::models::ExplorePost;
use crate::db::StoreError;
use crate::state::DbPool;

#[async_trait]
pub trait ExploreStore: Send + Sync {
    /// Posts that have both a place and a photo, newest first.
    async fn list(&self) -> Result<Vec<ExplorePost>, StoreError>;

    async fn get(&self, post_id: i64) -> Result<Option<ExplorePost>, StoreError>;
}

pub type DynExploreStore = Arc<dyn ExploreStore>;

pub struct SqliteExploreStore {
    pool: DbPool,
}

impl SqliteExploreStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str = "
    tp.id, tp.caption, tp.created_at,
    pl.id, pl.name, pl.description, pl.rating,
    ph.id, ph.image_url, ph.upload_date";

fn explore_post_from_row(row: &Row<'_>) -> rusqlite::Result<ExplorePost> {
    Ok(ExplorePost {
        post_id: row.get(0)?,
        caption: row.get(1)?,
        created_at: row.get(2)?,
        place_id: row.get(3)?,
        place_name: row.get(4)?,
        place_description: row.get(5)?,
        place_rating: row.get(6)?,
        photo_id: row.get(7)?,
        image_url: row.get(8)?,
        upload_date: row.get(9)?,
    })
}

#[async_trait]
impl ExploreStore for SqliteExploreStore {
    async fn list(&self) -> Result<Vec<ExplorePost>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS}
             FROM travel_posts tp
             JOIN places pl ON pl.id = tp.place_id
             JOIN photos ph ON ph.id = tp.photo_id
             ORDER BY tp.created_at DESC, tp.id DESC"
        ))?;
        let posts = stmt
            .query_map([], explore_post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn get(&self, post_id: i64) -> Result<Option<ExplorePost>, StoreError> {
        let conn = self.pool.get()?;
        let post = conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS}
                     FROM travel_posts tp
                     LEFT JOIN places pl ON pl.id = tp.place_id
                     LEFT JOIN photos ph ON ph.id = tp.photo_id
                     WHERE tp.id = ?1"
                ),
                params![post_id],
                explore_post_from_row,
            )
            .optional()?;
        Ok(post)
    }
}
