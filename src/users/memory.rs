use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::UserRepository;
use super::repo_types::{FavoriteRecipe, Review, User};

#[derive(Debug, Clone)]
struct Entry {
    user: User,
    favorites: Vec<FavoriteRecipe>,
    reviews: Vec<Review>,
}

/// Process-local store used for tests and for running without `DATABASE_URL`.
/// Every mutation happens under a single write lock.
#[derive(Default)]
pub struct InMemoryUserRepository {
    entries: RwLock<HashMap<Uuid, Entry>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T: Clone>(items: &[T], limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.iter().skip(offset).take(limit).cloned().collect()
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .find(|e| e.user.email == email)
            .map(|e| e.user.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.entries.read().await.get(&id).map(|e| e.user.clone()))
    }

    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let mut entries = self.entries.write().await;
        if entries.values().any(|e| e.user.email == email) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            status: true,
            created_at: OffsetDateTime::now_utc(),
        };
        entries.insert(
            user.id,
            Entry {
                user: user.clone(),
                favorites: Vec::new(),
                reviews: Vec::new(),
            },
        );
        Ok(Some(user))
    }

    async fn set_name(&self, id: Uuid, name: &str) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .get_mut(&id)
            .map(|e| e.user.name = name.to_string())
            .is_some())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .get_mut(&id)
            .map(|e| e.user.password_hash = password_hash.to_string())
            .is_some())
    }

    async fn deactivate(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries.get_mut(&id).map(|e| e.user.status = false).is_some())
    }

    async fn add_favorite(&self, id: Uuid, favorite: &FavoriteRecipe) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("user {id} does not exist"))?;
        if !entry
            .favorites
            .iter()
            .any(|f| f.recipe_id == favorite.recipe_id)
        {
            entry.favorites.push(favorite.clone());
        }
        Ok(())
    }

    async fn remove_favorite(&self, id: Uuid, recipe_id: &str) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(&id) {
            entry.favorites.retain(|f| f.recipe_id != recipe_id);
        }
        Ok(())
    }

    async fn upsert_review(&self, id: Uuid, review: &Review) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("user {id} does not exist"))?;
        let existing = entry
            .reviews
            .iter()
            .position(|r| r.recipe_id == review.recipe_id);
        match existing {
            Some(i) => entry.reviews[i] = review.clone(),
            None => entry.reviews.push(review.clone()),
        }
        Ok(())
    }

    async fn list_favorites(
        &self,
        id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<FavoriteRecipe>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&id)
            .map(|e| page(&e.favorites, limit, offset))
            .unwrap_or_default())
    }

    async fn list_reviews(&self, id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Review>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&id)
            .map(|e| page(&e.reviews, limit, offset))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn fav(id: &str) -> FavoriteRecipe {
        FavoriteRecipe {
            recipe_id: id.into(),
            title: format!("Recipe {id}"),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let repo = InMemoryUserRepository::new();
        assert!(repo.create("A", "a@x.com", "h").await.unwrap().is_some());
        assert!(repo.create("B", "a@x.com", "h").await.unwrap().is_none());
        // stored case is significant
        assert!(repo.create("C", "A@x.com", "h").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_favorite_adds_are_not_lost() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let user_id = repo.create("A", "a@x.com", "h").await.unwrap().unwrap().id;

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.add_favorite(user_id, &fav(&i.to_string())).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        let all = repo.list_favorites(user_id, 100, 0).await.unwrap();
        assert_eq!(all.len(), 16);
    }

    #[tokio::test]
    async fn upsert_keeps_position_of_first_submission() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create("A", "a@x.com", "h").await.unwrap().unwrap();
        for id in ["r1", "r2"] {
            let review = Review {
                recipe_id: id.into(),
                title: id.into(),
                rating: 3,
                comment: None,
            };
            repo.upsert_review(user.id, &review).await.unwrap();
        }
        let updated = Review {
            recipe_id: "r1".into(),
            title: "r1".into(),
            rating: 5,
            comment: Some("better".into()),
        };
        repo.upsert_review(user.id, &updated).await.unwrap();

        let reviews = repo.list_reviews(user.id, 10, 0).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0], updated);
        assert_eq!(reviews[1].recipe_id, "r2");
    }

    #[test]
    fn page_handles_out_of_range() {
        let items = vec![1, 2, 3];
        assert_eq!(page(&items, 2, 2), vec![3]);
        assert!(page(&items, 2, 10).is_empty());
        assert!(page(&items, 0, 0).is_empty());
    }
}
