//! # Kitchen Repository

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::search_pattern;
use aria_core::{Kitchen, ProductStatus};

const FILTER_SQL: &str = r#"
    WHERE (?1 IS NULL OR name REGEXP ?1 OR slug REGEXP ?1)
      AND (?2 IS NULL OR status = ?2)
      AND (?3 IS NULL OR supplier_id = ?3)
"#;

#[derive(Debug, Clone)]
pub struct KitchenRepository {
    pool: SqlitePool,
}

impl KitchenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        KitchenRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Kitchen>> {
        let kitchen = sqlx::query_as::<_, Kitchen>("SELECT * FROM kitchens WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(kitchen)
    }

    pub async fn get_by_slug(&self, slug: &str) -> DbResult<Option<Kitchen>> {
        let kitchen = sqlx::query_as::<_, Kitchen>("SELECT * FROM kitchens WHERE slug = ?1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(kitchen)
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        status: Option<ProductStatus>,
        supplier_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Kitchen>> {
        let sql =
            format!("SELECT * FROM kitchens {FILTER_SQL} ORDER BY name, id LIMIT ?4 OFFSET ?5");

        let kitchens = sqlx::query_as::<_, Kitchen>(&sql)
            .bind(search_pattern(search))
            .bind(status)
            .bind(supplier_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(kitchens)
    }

    pub async fn count(
        &self,
        search: Option<&str>,
        status: Option<ProductStatus>,
        supplier_id: Option<&str>,
    ) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM kitchens {FILTER_SQL}");

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(search_pattern(search))
            .bind(status)
            .bind(supplier_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn insert<'e, E>(&self, executor: E, kitchen: &Kitchen) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(slug = %kitchen.slug, "Inserting kitchen");

        sqlx::query(
            r#"
            INSERT INTO kitchens (
                id, name, slug, supplier_id, status, description, extra_description,
                price_range_min_cents, price_range_max_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&kitchen.id)
        .bind(&kitchen.name)
        .bind(&kitchen.slug)
        .bind(&kitchen.supplier_id)
        .bind(kitchen.status)
        .bind(&kitchen.description)
        .bind(&kitchen.extra_description)
        .bind(kitchen.price_range_min_cents)
        .bind(kitchen.price_range_max_cents)
        .bind(kitchen.created_at)
        .bind(kitchen.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn update<'e, E>(&self, executor: E, kitchen: &Kitchen) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE kitchens SET
                name = ?2,
                slug = ?3,
                supplier_id = ?4,
                status = ?5,
                description = ?6,
                extra_description = ?7,
                price_range_min_cents = ?8,
                price_range_max_cents = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&kitchen.id)
        .bind(&kitchen.name)
        .bind(&kitchen.slug)
        .bind(&kitchen.supplier_id)
        .bind(kitchen.status)
        .bind(&kitchen.description)
        .bind(&kitchen.extra_description)
        .bind(kitchen.price_range_min_cents)
        .bind(kitchen.price_range_max_cents)
        .bind(kitchen.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Kitchen", &kitchen.id));
        }

        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, id: &str) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM kitchens WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Kitchen", id));
        }

        Ok(())
    }
}
