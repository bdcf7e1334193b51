//! # Attribute Repository
//!
//! Variants, sizes, colors and shapes: the small lookup tables products and
//! options point at. All of them are created once and reused, so there is
//! no update or delete here.

use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::placeholders;
use aria_core::{Color, Shape, Size, Variant};

#[derive(Debug, Clone)]
pub struct AttributeRepository {
    pool: SqlitePool,
}

impl AttributeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AttributeRepository { pool }
    }

    /// Row count of one attribute table.
    async fn count_table(&self, table: &str) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// The subset of `ids` present in one attribute table.
    async fn existing_in(&self, table: &str, ids: &[String]) -> DbResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT id FROM {table} WHERE id IN ({})", placeholders(ids.len()));
        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    // =========================================================================
    // Variants
    // =========================================================================

    pub async fn get_variant(&self, id: &str) -> DbResult<Option<Variant>> {
        let variant = sqlx::query_as::<_, Variant>("SELECT * FROM variants WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(variant)
    }

    pub async fn list_variants(&self, limit: i64, offset: i64) -> DbResult<Vec<Variant>> {
        let variants = sqlx::query_as::<_, Variant>(
            "SELECT * FROM variants ORDER BY name, id LIMIT ?1 OFFSET ?2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(variants)
    }

    pub async fn count_variants(&self) -> DbResult<i64> {
        self.count_table("variants").await
    }

    pub async fn insert_variant<'e, E>(&self, executor: E, variant: &Variant) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(name = %variant.name, "Inserting variant");

        sqlx::query("INSERT INTO variants (id, name, is_active) VALUES (?1, ?2, ?3)")
            .bind(&variant.id)
            .bind(&variant.name)
            .bind(variant.is_active)
            .execute(executor)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Sizes
    // =========================================================================

    pub async fn get_size(&self, id: &str) -> DbResult<Option<Size>> {
        let size = sqlx::query_as::<_, Size>("SELECT * FROM sizes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(size)
    }

    pub async fn list_sizes(&self, limit: i64, offset: i64) -> DbResult<Vec<Size>> {
        let sizes = sqlx::query_as::<_, Size>(
            "SELECT * FROM sizes ORDER BY width, height, depth, circumference LIMIT ?1 OFFSET ?2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(sizes)
    }

    pub async fn count_sizes(&self) -> DbResult<i64> {
        self.count_table("sizes").await
    }

    /// Sizes by id, for decorating option lists.
    pub async fn sizes_by_ids(&self, ids: &[String]) -> DbResult<Vec<Size>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT * FROM sizes WHERE id IN ({})", placeholders(ids.len()));
        let mut query = sqlx::query_as::<_, Size>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn variants_by_ids(&self, ids: &[String]) -> DbResult<Vec<Variant>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT * FROM variants WHERE id IN ({})", placeholders(ids.len()));
        let mut query = sqlx::query_as::<_, Variant>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Inserts a size.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the same dimensions already exist
    pub async fn insert_size<'e, E>(&self, executor: E, size: &Size) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(name = %size.name(), "Inserting size");

        sqlx::query(
            "INSERT INTO sizes (id, width, height, depth, circumference) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&size.id)
        .bind(size.width)
        .bind(size.height)
        .bind(size.depth)
        .bind(size.circumference)
        .execute(executor)
        .await?;
        Ok(())
    }

    // =========================================================================
    // Colors
    // =========================================================================

    pub async fn list_colors(&self, limit: i64, offset: i64) -> DbResult<Vec<Color>> {
        let colors = sqlx::query_as::<_, Color>(
            "SELECT * FROM colors ORDER BY name, id LIMIT ?1 OFFSET ?2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(colors)
    }

    pub async fn count_colors(&self) -> DbResult<i64> {
        self.count_table("colors").await
    }

    pub async fn insert_color<'e, E>(&self, executor: E, color: &Color) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT INTO colors (id, name, color_hex) VALUES (?1, ?2, ?3)")
            .bind(&color.id)
            .bind(&color.name)
            .bind(&color.color_hex)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn existing_color_ids(&self, ids: &[String]) -> DbResult<Vec<String>> {
        self.existing_in("colors", ids).await
    }

    pub async fn colors_for_product(&self, product_id: &str) -> DbResult<Vec<Color>> {
        let colors = sqlx::query_as::<_, Color>(
            r#"
            SELECT c.* FROM colors c
            INNER JOIN product_colors pc ON pc.color_id = c.id
            WHERE pc.product_id = ?1
            ORDER BY c.name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(colors)
    }

    pub async fn set_colors_for_product(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        color_ids: &[String],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM product_colors WHERE product_id = ?1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;

        for color_id in color_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO product_colors (product_id, color_id) VALUES (?1, ?2)",
            )
            .bind(product_id)
            .bind(color_id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    // =========================================================================
    // Shapes
    // =========================================================================

    pub async fn list_shapes(&self, limit: i64, offset: i64) -> DbResult<Vec<Shape>> {
        let shapes = sqlx::query_as::<_, Shape>(
            "SELECT * FROM shapes ORDER BY name, id LIMIT ?1 OFFSET ?2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(shapes)
    }

    pub async fn count_shapes(&self) -> DbResult<i64> {
        self.count_table("shapes").await
    }

    pub async fn insert_shape<'e, E>(&self, executor: E, shape: &Shape) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT INTO shapes (id, name) VALUES (?1, ?2)")
            .bind(&shape.id)
            .bind(&shape.name)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn existing_shape_ids(&self, ids: &[String]) -> DbResult<Vec<String>> {
        self.existing_in("shapes", ids).await
    }

    pub async fn shapes_for_product(&self, product_id: &str) -> DbResult<Vec<Shape>> {
        let shapes = sqlx::query_as::<_, Shape>(
            r#"
            SELECT s.* FROM shapes s
            INNER JOIN product_shapes ps ON ps.shape_id = s.id
            WHERE ps.product_id = ?1
            ORDER BY s.name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shapes)
    }

    pub async fn set_shapes_for_product(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        shape_ids: &[String],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM product_shapes WHERE product_id = ?1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;

        for shape_id in shape_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO product_shapes (product_id, shape_id) VALUES (?1, ?2)",
            )
            .bind(product_id)
            .bind(shape_id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
