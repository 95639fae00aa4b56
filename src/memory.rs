use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::models::{
    Article, CreateArticleRequest, NewUser, PageContent, UpdateArticleRequest, UpsertPageRequest,
    User,
};
use crate::repository::Repository;

/// InMemoryRepository
///
/// A process-local `Repository`. Used by the test suite and by local runs without
/// `DATABASE_URL`; everything is lost on restart.
///
/// A single `RwLock` guards all tables, so each write (including its uniqueness
/// check) is atomic.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<i64, User>,
    articles: HashMap<i64, Article>,
    pages: BTreeMap<String, PageContent>,
    next_user_id: i64,
    next_article_id: i64,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn slug_taken(&self, slug: &str, except: Option<i64>) -> bool {
        self.articles
            .values()
            .any(|a| a.slug == slug && Some(a.id) != except)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StorageError::Conflict("Username already exists".into()));
        }
        tables.next_user_id += 1;
        let created = User {
            id: tables.next_user_id,
            username: user.username,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_password(&self, id: i64, password_hash: String) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_articles(&self, published_only: bool) -> Result<Vec<Article>, StorageError> {
        let tables = self.tables.read().await;
        let mut articles: Vec<Article> = tables
            .articles
            .values()
            .filter(|a| !published_only || a.published)
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(articles)
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>, StorageError> {
        Ok(self.tables.read().await.articles.get(&id).cloned())
    }

    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.articles.values().find(|a| a.slug == slug).cloned())
    }

    async fn create_article(&self, req: CreateArticleRequest) -> Result<Article, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.slug_taken(&req.slug, None) {
            return Err(StorageError::Conflict("Slug already in use".into()));
        }
        tables.next_article_id += 1;
        let now = Utc::now();
        let article = Article {
            id: tables.next_article_id,
            slug: req.slug,
            title: req.title,
            excerpt: req.excerpt,
            content: req.content,
            published: req.published,
            created_at: now,
            updated_at: now,
        };
        tables.articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn update_article(
        &self,
        id: i64,
        req: UpdateArticleRequest,
    ) -> Result<Option<Article>, StorageError> {
        let mut tables = self.tables.write().await;
        if let Some(slug) = &req.slug {
            if tables.slug_taken(slug, Some(id)) {
                return Err(StorageError::Conflict("Slug already in use".into()));
            }
        }
        let Some(existing) = tables.articles.get(&id).cloned() else {
            return Ok(None);
        };
        let mut updated = req.apply_to(existing);
        updated.updated_at = Utc::now();
        tables.articles.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_article(&self, id: i64) -> Result<bool, StorageError> {
        Ok(self.tables.write().await.articles.remove(&id).is_some())
    }

    async fn list_pages(&self) -> Result<Vec<PageContent>, StorageError> {
        Ok(self.tables.read().await.pages.values().cloned().collect())
    }

    async fn get_page(&self, key: &str) -> Result<Option<PageContent>, StorageError> {
        Ok(self.tables.read().await.pages.get(key).cloned())
    }

    async fn upsert_page(
        &self,
        key: &str,
        req: UpsertPageRequest,
    ) -> Result<PageContent, StorageError> {
        let page = PageContent {
            key: key.to_string(),
            title: req.title,
            content: req.content,
            updated_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .pages
            .insert(page.key.clone(), page.clone());
        Ok(page)
    }
}
