use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{FavoriteRecipe, Review, User};

/// Persistence seam for user accounts and their recipe collections.
///
/// Collection mutations must be atomic per call: implementations may not
/// read the collection, modify it and write it back.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Insert an active user. Returns `None` when the email is already taken.
    async fn create(&self, name: &str, email: &str, password_hash: &str)
        -> anyhow::Result<Option<User>>;

    /// The `set_*` and `deactivate` calls return `false` when no user has `id`.
    async fn set_name(&self, id: Uuid, name: &str) -> anyhow::Result<bool>;
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool>;
    async fn deactivate(&self, id: Uuid) -> anyhow::Result<bool>;

    /// Add-to-set keyed by `recipe_id`; an existing entry is left untouched.
    async fn add_favorite(&self, id: Uuid, favorite: &FavoriteRecipe) -> anyhow::Result<()>;
    async fn remove_favorite(&self, id: Uuid, recipe_id: &str) -> anyhow::Result<()>;
    /// Insert or replace the review for `(id, review.recipe_id)`.
    async fn upsert_review(&self, id: Uuid, review: &Review) -> anyhow::Result<()>;

    async fn list_favorites(
        &self,
        id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<FavoriteRecipe>>;
    async fn list_reviews(&self, id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Review>>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str = "id, email, name, password_hash, status, created_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, status)
            VALUES ($1, $2, $3, TRUE)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn set_name(&self, id: Uuid, name: &str) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE users SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&self.db)
            .await
            .context("update user name")?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await
            .context("update user password")?;
        Ok(res.rows_affected() > 0)
    }

    async fn deactivate(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE users SET status = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("deactivate user")?;
        Ok(res.rows_affected() > 0)
    }

    async fn add_favorite(&self, id: Uuid, favorite: &FavoriteRecipe) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO favorite_recipes (user_id, recipe_id, title)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, recipe_id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(&favorite.recipe_id)
        .bind(&favorite.title)
        .execute(&self.db)
        .await
        .context("insert favorite recipe")?;
        Ok(())
    }

    async fn remove_favorite(&self, id: Uuid, recipe_id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM favorite_recipes WHERE user_id = $1 AND recipe_id = $2")
            .bind(id)
            .bind(recipe_id)
            .execute(&self.db)
            .await
            .context("delete favorite recipe")?;
        Ok(())
    }

    async fn upsert_review(&self, id: Uuid, review: &Review) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (user_id, recipe_id, title, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, recipe_id) DO UPDATE
               SET title      = EXCLUDED.title,
                   rating     = EXCLUDED.rating,
                   comment    = EXCLUDED.comment,
                   updated_at = now()
            "#,
        )
        .bind(id)
        .bind(&review.recipe_id)
        .bind(&review.title)
        .bind(review.rating)
        .bind(&review.comment)
        .execute(&self.db)
        .await
        .context("upsert review")?;
        Ok(())
    }

    async fn list_favorites(
        &self,
        id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<FavoriteRecipe>> {
        let rows = sqlx::query_as::<_, FavoriteRecipe>(
            r#"
            SELECT recipe_id, title
              FROM favorite_recipes
             WHERE user_id = $1
             ORDER BY seq ASC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list favorite recipes")?;
        Ok(rows)
    }

    async fn list_reviews(&self, id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(
            r#"
            SELECT recipe_id, title, rating, comment
              FROM reviews
             WHERE user_id = $1
             ORDER BY seq ASC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list reviews")?;
        Ok(rows)
    }
}
