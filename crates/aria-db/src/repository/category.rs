//! # Category Repository
//!
//! Categories form a tree through `parent_id`. The tree itself is assembled
//! by the caller from [`CategoryRepository::list_all`]; this module only
//! stores rows and product links.

use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{search_pattern, placeholders};
use aria_core::Category;

const FILTER_SQL: &str = r#"
    WHERE (?1 IS NULL OR name REGEXP ?1 OR slug REGEXP ?1)
      AND (?2 IS NULL OR is_active = ?2)
"#;

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    pub async fn get_by_slug(&self, slug: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = ?1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    /// Every category in sibling order.
    pub async fn list_all(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories ORDER BY ordering, name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        is_active: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Category>> {
        let sql = format!(
            "SELECT * FROM categories {FILTER_SQL} ORDER BY ordering, name, id LIMIT ?3 OFFSET ?4"
        );

        let categories = sqlx::query_as::<_, Category>(&sql)
            .bind(search_pattern(search))
            .bind(is_active)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(categories)
    }

    pub async fn count(&self, search: Option<&str>, is_active: Option<bool>) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM categories {FILTER_SQL}");

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(search_pattern(search))
            .bind(is_active)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Active categories flagged for the storefront navigation bar.
    pub async fn navbar(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT * FROM categories
            WHERE display_in_navbar = 1 AND is_active = 1
            ORDER BY ordering, name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn insert<'e, E>(&self, executor: E, category: &Category) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(slug = %category.slug, "Inserting category");

        sqlx::query(
            r#"
            INSERT INTO categories (
                id, name, slug, description, parent_id, ordering,
                display_in_navbar, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.parent_id)
        .bind(category.ordering)
        .bind(category.display_in_navbar)
        .bind(category.is_active)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn update<'e, E>(&self, executor: E, category: &Category) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %category.id, "Updating category");

        let result = sqlx::query(
            r#"
            UPDATE categories SET
                name = ?2,
                slug = ?3,
                description = ?4,
                parent_id = ?5,
                ordering = ?6,
                display_in_navbar = ?7,
                is_active = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.parent_id)
        .bind(category.ordering)
        .bind(category.display_in_navbar)
        .bind(category.is_active)
        .bind(category.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", &category.id));
        }

        Ok(())
    }

    /// Deletes a category. Children become roots, product links disappear.
    pub async fn delete<'e, E>(&self, executor: E, id: &str) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }

    // =========================================================================
    // Product links
    // =========================================================================

    pub async fn for_product(&self, product_id: &str) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.* FROM categories c
            INNER JOIN product_categories pc ON pc.category_id = c.id
            WHERE pc.product_id = ?1
            ORDER BY c.ordering, c.name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Replaces the categories of a product.
    pub async fn set_for_product(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        category_ids: &[String],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM product_categories WHERE product_id = ?1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;

        for category_id in category_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO product_categories (product_id, category_id) VALUES (?1, ?2)",
            )
            .bind(product_id)
            .bind(category_id)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Returns the subset of `ids` that exist.
    pub async fn existing_ids(&self, ids: &[String]) -> DbResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT id FROM categories WHERE id IN ({})", placeholders(ids.len()));
        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_tree_and_navbar() {
        let db = fixtures::test_db().await;
        let repo = db.categories();

        let root = fixtures::category("fliser", None);
        let mut child = fixtures::category("gulvfliser", Some(&root.id));
        child.display_in_navbar = false;
        repo.insert(db.pool(), &root).await.unwrap();
        repo.insert(db.pool(), &child).await.unwrap();

        assert_eq!(repo.list_all().await.unwrap().len(), 2);
        let navbar = repo.navbar().await.unwrap();
        assert_eq!(navbar.len(), 1);
        assert_eq!(navbar[0].slug, "fliser");

        // deleting the parent detaches the child
        repo.delete(db.pool(), &root.id).await.unwrap();
        let orphan = repo.get_by_slug("gulvfliser").await.unwrap().unwrap();
        assert_eq!(orphan.parent_id, None);
    }

    #[tokio::test]
    async fn test_duplicate_slug() {
        let db = fixtures::test_db().await;
        let repo = db.categories();
        repo.insert(db.pool(), &fixtures::category("fliser", None)).await.unwrap();

        let err = repo
            .insert(db.pool(), &fixtures::category("fliser", None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "slug"));
    }

    #[tokio::test]
    async fn test_product_links() {
        let db = fixtures::test_db().await;
        let supplier = fixtures::supplier("Marazzi");
        db.suppliers().insert(db.pool(), &supplier).await.unwrap();
        let product = fixtures::product("hvit-flis", &supplier.id);
        db.products().insert(db.pool(), &product).await.unwrap();

        let repo = db.categories();
        let a = fixtures::category("bad", None);
        let b = fixtures::category("kjokken", None);
        repo.insert(db.pool(), &a).await.unwrap();
        repo.insert(db.pool(), &b).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        repo.set_for_product(&mut conn, &product.id, &[a.id.clone(), b.id.clone()])
            .await
            .unwrap();
        repo.set_for_product(&mut conn, &product.id, &[b.id.clone()])
            .await
            .unwrap();
        drop(conn);

        let linked = repo.for_product(&product.id).await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, b.id);

        let existing = repo
            .existing_ids(&[a.id.clone(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(existing, vec![a.id]);
    }
}
