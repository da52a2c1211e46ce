use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{
        CreateFavoriteRequest, CreateReviewRequest, CreateUserRequest, Pagination, RecipeSummary,
    },
    repo::UserRepository,
    repo_types::{FavoriteRecipe, Review, SafeUser},
};
use crate::{
    auth::password::hash_password,
    error::{AppError, AppResult},
};

const MIN_PASSWORD_LEN: usize = 6;
const MAX_PAGE_SIZE: i64 = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("Password too short"));
    }
    Ok(())
}

fn non_blank<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(value)
}

/// Validated `(limit, offset)`. `limit` is capped, zero yields an empty page.
fn page_bounds(p: &Pagination) -> AppResult<(i64, i64)> {
    if p.limit < 0 || p.offset < 0 {
        return Err(AppError::validation("limit and offset must be non-negative"));
    }
    Ok((p.limit.min(MAX_PAGE_SIZE), p.offset))
}

async fn ensure_exists(repo: &dyn UserRepository, id: Uuid) -> AppResult<()> {
    match repo.find_by_id(id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("User")),
    }
}

fn found(updated: bool) -> AppResult<()> {
    if updated {
        Ok(())
    } else {
        Err(AppError::NotFound("User"))
    }
}

pub async fn create_user(repo: &dyn UserRepository, req: CreateUserRequest) -> AppResult<SafeUser> {
    let name = non_blank(&req.name, "name")?;
    let email = req.email.trim();
    if !is_valid_email(email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    validate_password(&req.password)?;

    let hash = hash_password(email, &req.password)?;
    let user = repo
        .create(name, email, &hash)
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "email already registered");
            AppError::Conflict("Email already registered".into())
        })?;

    info!(user_id = %user.id, "user registered");
    Ok(SafeUser::from(user))
}

pub async fn update_name(repo: &dyn UserRepository, id: Uuid, name: &str) -> AppResult<()> {
    let name = non_blank(name, "name")?;
    found(repo.set_name(id, name).await?)
}

pub async fn update_password(repo: &dyn UserRepository, id: Uuid, password: &str) -> AppResult<()> {
    validate_password(password)?;
    let user = repo.find_by_id(id).await?.ok_or(AppError::NotFound("User"))?;
    // email is immutable, so the prefix stays consistent with validate_user
    let hash = hash_password(&user.email, password)?;
    found(repo.set_password_hash(id, &hash).await?)?;
    info!(user_id = %id, "password updated");
    Ok(())
}

pub async fn add_favorite(
    repo: &dyn UserRepository,
    id: Uuid,
    req: CreateFavoriteRequest,
) -> AppResult<()> {
    let favorite = FavoriteRecipe {
        recipe_id: non_blank(&req.recipe_id, "recipeId")?.to_string(),
        title: non_blank(&req.title, "title")?.to_string(),
    };
    ensure_exists(repo, id).await?;
    repo.add_favorite(id, &favorite).await?;
    Ok(())
}

pub async fn remove_favorite(repo: &dyn UserRepository, id: Uuid, recipe_id: &str) -> AppResult<()> {
    ensure_exists(repo, id).await?;
    repo.remove_favorite(id, recipe_id).await?;
    Ok(())
}

pub async fn add_review(
    repo: &dyn UserRepository,
    id: Uuid,
    recipe_id: &str,
    req: CreateReviewRequest,
) -> AppResult<()> {
    if !(1..=5).contains(&req.rating) {
        return Err(AppError::validation("rating must be between 1 and 5"));
    }
    let review = Review {
        recipe_id: non_blank(recipe_id, "recipeId")?.to_string(),
        title: non_blank(&req.title, "title")?.to_string(),
        rating: req.rating,
        comment: req
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    };
    ensure_exists(repo, id).await?;
    repo.upsert_review(id, &review).await?;
    Ok(())
}

pub async fn list_favorites(
    repo: &dyn UserRepository,
    id: Uuid,
    page: &Pagination,
) -> AppResult<Vec<RecipeSummary>> {
    let (limit, offset) = page_bounds(page)?;
    ensure_exists(repo, id).await?;
    let rows = repo.list_favorites(id, limit, offset).await?;
    Ok(rows.into_iter().map(RecipeSummary::from).collect())
}

pub async fn list_reviews(
    repo: &dyn UserRepository,
    id: Uuid,
    page: &Pagination,
) -> AppResult<Vec<RecipeSummary>> {
    let (limit, offset) = page_bounds(page)?;
    ensure_exists(repo, id).await?;
    let rows = repo.list_reviews(id, limit, offset).await?;
    Ok(rows.into_iter().map(RecipeSummary::from).collect())
}

/// Soft delete: the record and its collections are kept.
pub async fn deactivate(repo: &dyn UserRepository, id: Uuid) -> AppResult<()> {
    found(repo.deactivate(id).await?)?;
    info!(user_id = %id, "user deactivated");
    Ok(())
}
