use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::profile::{LikeState, LinkType, Post, ProfileLink};
use crate::user::{Identity, NewIdentity, ProfileUpdate};

const IDENTITY_COLUMNS: &str =
    "id, username, email, password_hash, image, tagline, verified, admin, created_at";

#[tracing::instrument(skip(database_url), err)]
pub async fn setup_db_pool(database_url: &str) -> color_eyre::Result<PgPool> {
    const MIGRATION_LOCK_ID: i64 = 0xF1_7C_4E_C4;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&pool)
        .await?;

    sqlx::migrate!("../migrations").run(&pool).await?;

    let unlocked: bool = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .fetch_one(&pool)
        .await?;

    if unlocked {
        info!("Migration lock unlocked");
    } else {
        info!("Failed to unlock migration lock");
    }

    Ok(pool)
}

/// Postgres-backed [`Store`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    id: Uuid,
    url: String,
    kind: String,
}

impl From<LinkRow> for ProfileLink {
    fn from(row: LinkRow) -> Self {
        ProfileLink {
            id: row.id,
            url: row.url,
            kind: row.kind.parse().unwrap_or(LinkType::Other),
        }
    }
}

fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("users_username_key") => return StoreError::UsernameTaken,
                Some("users_email_key") => return StoreError::EmailTaken,
                _ => {}
            }
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn find_identity(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        let query = format!("SELECT {IDENTITY_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, Identity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let query = format!("SELECT {IDENTITY_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, Identity>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_identity_by_username(&self, username: &str) -> StoreResult<Option<Identity>> {
        let query = format!("SELECT {IDENTITY_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, Identity>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    #[tracing::instrument(skip(self), err)]
    async fn create_identity(&self, new: NewIdentity) -> StoreResult<Identity> {
        let query = format!(
            "INSERT INTO users (id, username, email, password_hash, admin)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {IDENTITY_COLUMNS}"
        );
        let identity = sqlx::query_as::<_, Identity>(&query)
            .bind(Uuid::new_v4())
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.admin)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)?;

        info!("Created new user with ID: {}", identity.id);
        Ok(identity)
    }

    #[tracing::instrument(skip(self), err)]
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> StoreResult<Identity> {
        let current = self
            .find_identity(id)
            .await?
            .ok_or(StoreError::NotFound("user"))?;
        let username = update.username.clone().unwrap_or(current.username.clone());
        let tagline = update.stored_tagline(current.tagline.clone());

        let query = format!(
            "UPDATE users SET username = $1, tagline = $2
             WHERE id = $3
             RETURNING {IDENTITY_COLUMNS}"
        );
        sqlx::query_as::<_, Identity>(&query)
            .bind(&username)
            .bind(&tagline)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique_violation)?
            .ok_or(StoreError::NotFound("user"))
    }

    async fn set_image(&self, id: Uuid, image: Option<&str>) -> StoreResult<Identity> {
        let query = format!("UPDATE users SET image = $1 WHERE id = $2 RETURNING {IDENTITY_COLUMNS}");
        sqlx::query_as::<_, Identity>(&query)
            .bind(image)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("user"))
    }

    async fn delete_identity(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_links(&self, owner: Uuid) -> StoreResult<Vec<ProfileLink>> {
        let rows = sqlx::query_as::<_, LinkRow>(
            "SELECT id, url, kind FROM links WHERE owner_id = $1 ORDER BY created_at, id",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ProfileLink::from).collect())
    }

    async fn add_link(&self, owner: Uuid, url: &str, kind: LinkType) -> StoreResult<ProfileLink> {
        let row = sqlx::query_as::<_, LinkRow>(
            "INSERT INTO links (id, owner_id, url, kind) VALUES ($1, $2, $3, $4)
             RETURNING id, url, kind",
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(url)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn delete_link(&self, owner: Uuid, link: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1 AND owner_id = $2")
            .bind(link)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_like(&self, liker: Uuid, target: Uuid) -> StoreResult<LikeState> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM likes WHERE liker_id = $1 AND target_id = $2")
            .bind(liker)
            .bind(target)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            sqlx::query("INSERT INTO likes (liker_id, target_id) VALUES ($1, $2)")
                .bind(liker)
                .bind(target)
                .execute(&mut *tx)
                .await?;
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE target_id = $1")
            .bind(target)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(LikeState {
            liked: removed == 0,
            count,
        })
    }

    async fn like_state(&self, viewer: Option<Uuid>, target: Uuid) -> StoreResult<LikeState> {
        let (count, liked): (i64, bool) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(BOOL_OR(liker_id = $2), FALSE)
             FROM likes WHERE target_id = $1",
        )
        .bind(target)
        .bind(viewer)
        .fetch_one(&self.pool)
        .await?;
        Ok(LikeState { liked, count })
    }

    async fn create_post(
        &self,
        author: Uuid,
        image: &str,
        caption: Option<&str>,
    ) -> StoreResult<Post> {
        Ok(sqlx::query_as::<_, Post>(
            "INSERT INTO posts (id, author_id, image, caption) VALUES ($1, $2, $3, $4)
             RETURNING id, author_id, image, caption, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(author)
        .bind(image)
        .bind(caption)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_posts(&self, author: Uuid) -> StoreResult<Vec<Post>> {
        Ok(sqlx::query_as::<_, Post>(
            "SELECT id, author_id, image, caption, created_at FROM posts
             WHERE author_id = $1 ORDER BY created_at DESC",
        )
        .bind(author)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        Ok(sqlx::query_as::<_, Post>(
            "SELECT id, author_id, image, caption, created_at FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn report_post(&self, reporter: Uuid, post: Uuid) -> StoreResult<bool> {
        if self.find_post(post).await?.is_none() {
            return Err(StoreError::NotFound("post"));
        }
        let result = sqlx::query(
            "INSERT INTO post_reports (reporter_id, post_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(reporter)
        .bind(post)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
