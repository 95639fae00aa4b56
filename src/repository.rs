use crate::error::StorageError;
use crate::models::{
    Article, CreateArticleRequest, NewUser, PageContent, UpdateArticleRequest, UpsertPageRequest,
    User,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// Repository Trait
///
/// The persistence contract the handlers and the auth layer depend on. Backends are
/// swapped behind `Arc<dyn Repository>`: Postgres in deployment, `InMemoryRepository`
/// for tests and database-less local runs.
///
/// Each write is atomic per record. Uniqueness violations surface as
/// `StorageError::Conflict`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;
    /// Returns false when no user has that id.
    async fn update_password(&self, id: i64, password_hash: String) -> Result<bool, StorageError>;

    // --- Articles ---
    /// Newest first. `published_only` hides drafts.
    async fn list_articles(&self, published_only: bool) -> Result<Vec<Article>, StorageError>;
    async fn get_article(&self, id: i64) -> Result<Option<Article>, StorageError>;
    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StorageError>;
    async fn create_article(&self, req: CreateArticleRequest) -> Result<Article, StorageError>;
    /// Returns `None` when no article has that id.
    async fn update_article(
        &self,
        id: i64,
        req: UpdateArticleRequest,
    ) -> Result<Option<Article>, StorageError>;
    /// Returns false when no article has that id.
    async fn delete_article(&self, id: i64) -> Result<bool, StorageError>;

    // --- Page content ---
    async fn list_pages(&self) -> Result<Vec<PageContent>, StorageError>;
    async fn get_page(&self, key: &str) -> Result<Option<PageContent>, StorageError>;
    async fn upsert_page(&self, key: &str, req: UpsertPageRequest)
    -> Result<PageContent, StorageError>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

const ARTICLE_COLUMNS: &str =
    "id, slug, title, excerpt, content, published, created_at, updated_at";

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations. Called once at startup.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (username, password_hash)
               VALUES ($1, $2)
               RETURNING id, username, password_hash, created_at"#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match StorageError::from(e) {
            StorageError::Conflict(_) => StorageError::Conflict("Username already exists".into()),
            other => other,
        })
    }

    async fn update_password(&self, id: i64, password_hash: String) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_articles(&self, published_only: bool) -> Result<Vec<Article>, StorageError> {
        let sql = if published_only {
            format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles WHERE published = true ORDER BY created_at DESC, id DESC"
            )
        } else {
            format!("SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY created_at DESC, id DESC")
        };
        let articles = sqlx::query_as::<_, Article>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(articles)
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>, StorageError> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
        let article = sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(article)
    }

    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StorageError> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE slug = $1");
        let article = sqlx::query_as::<_, Article>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(article)
    }

    async fn create_article(&self, req: CreateArticleRequest) -> Result<Article, StorageError> {
        let sql = format!(
            r#"INSERT INTO articles (slug, title, excerpt, content, published, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
               RETURNING {ARTICLE_COLUMNS}"#
        );
        sqlx::query_as::<_, Article>(&sql)
            .bind(&req.slug)
            .bind(&req.title)
            .bind(&req.excerpt)
            .bind(&req.content)
            .bind(req.published)
            .fetch_one(&self.pool)
            .await
            .map_err(slug_conflict)
    }

    /// Partial update via COALESCE: a `None` field keeps the stored column.
    async fn update_article(
        &self,
        id: i64,
        req: UpdateArticleRequest,
    ) -> Result<Option<Article>, StorageError> {
        let sql = format!(
            r#"UPDATE articles
               SET slug = COALESCE($2, slug),
                   title = COALESCE($3, title),
                   excerpt = COALESCE($4, excerpt),
                   content = COALESCE($5, content),
                   published = COALESCE($6, published),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING {ARTICLE_COLUMNS}"#
        );
        sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .bind(req.slug)
            .bind(req.title)
            .bind(req.excerpt)
            .bind(req.content)
            .bind(req.published)
            .fetch_optional(&self.pool)
            .await
            .map_err(slug_conflict)
    }

    async fn delete_article(&self, id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_pages(&self) -> Result<Vec<PageContent>, StorageError> {
        let pages = sqlx::query_as::<_, PageContent>(
            "SELECT key, title, content, updated_at FROM pages ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(pages)
    }

    async fn get_page(&self, key: &str) -> Result<Option<PageContent>, StorageError> {
        let page = sqlx::query_as::<_, PageContent>(
            "SELECT key, title, content, updated_at FROM pages WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(page)
    }

    async fn upsert_page(
        &self,
        key: &str,
        req: UpsertPageRequest,
    ) -> Result<PageContent, StorageError> {
        let page = sqlx::query_as::<_, PageContent>(
            r#"INSERT INTO pages (key, title, content, updated_at)
               VALUES ($1, $2, $3, NOW())
               ON CONFLICT (key) DO UPDATE
               SET title = EXCLUDED.title, content = EXCLUDED.content, updated_at = NOW()
               RETURNING key, title, content, updated_at"#,
        )
        .bind(key)
        .bind(&req.title)
        .bind(&req.content)
        .fetch_one(&self.pool)
        .await?;
        Ok(page)
    }
}

fn slug_conflict(err: sqlx::Error) -> StorageError {
    match StorageError::from(err) {
        StorageError::Conflict(_) => StorageError::Conflict("Slug already in use".into()),
        other => other,
    }
}
