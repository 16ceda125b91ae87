//! Category repository for database operations.

use sqlx::PgPool;

use crate::entities::CategoryEntity;
use crate::metrics::QueryTimer;

/// Repository for category-related database operations.
#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a category. Duplicate slugs fail with a unique violation.
    pub async fn create(
        &self,
        name: &str,
        slug: &str,
        parent_id: Option<i64>,
    ) -> Result<CategoryEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_category");
        let result = sqlx::query_as::<_, CategoryEntity>(
            r#"
            INSERT INTO categories (name, slug, parent_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List all categories ordered by name.
    pub async fn list_all(&self) -> Result<Vec<CategoryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_categories");
        let result = sqlx::query_as::<_, CategoryEntity>(
            "SELECT * FROM categories ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
