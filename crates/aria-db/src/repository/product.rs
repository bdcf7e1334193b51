//! # Product Repository
//!
//! Products, their options and the storefront's filtered listing.
//!
//! ## Listing and Pricing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  GET /api/front/products?category=bad&search=hvit&limit=25             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  list(filter, 25, 0)          ← one query, filters in WHERE            │
//! │  count(filter)                ← same WHERE                             │
//! │       │                                                                 │
//! │       ▼  product ids on this page                                      │
//! │  lowest_prices(ids)           ← one MIN(...) GROUP BY query            │
//! │  options_for_products(ids)    ← one IN (...) query                     │
//! │                                                                         │
//! │  Three round trips per page, never one per product.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{search_pattern, placeholders};
use aria_core::{Product, ProductOption, ProductStatus};

/// Filters for product listings. `None` means "don't filter".
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Matched against name, slug and search keywords.
    pub search: Option<String>,
    pub status: Option<ProductStatus>,
    pub supplier_id: Option<String>,
    pub category_id: Option<String>,
    pub color_id: Option<String>,
    pub shape_id: Option<String>,
    /// Only products with at least one available option.
    pub has_available_options: bool,
}

const FILTER_SQL: &str = r#"
    WHERE (?1 IS NULL
           OR p.name REGEXP ?1
           OR p.slug REGEXP ?1
           OR IFNULL(p.search_keywords, '') REGEXP ?1)
      AND (?2 IS NULL OR p.status = ?2)
      AND (?3 IS NULL OR p.supplier_id = ?3)
      AND (?4 IS NULL OR EXISTS (
            SELECT 1 FROM product_categories pc
            WHERE pc.product_id = p.id AND pc.category_id = ?4))
      AND (?5 IS NULL OR EXISTS (
            SELECT 1 FROM product_colors pco
            WHERE pco.product_id = p.id AND pco.color_id = ?5))
      AND (?6 IS NULL OR EXISTS (
            SELECT 1 FROM product_shapes ps
            WHERE ps.product_id = p.id AND ps.shape_id = ?6))
      AND (?7 = 0 OR EXISTS (
            SELECT 1 FROM product_options po
            WHERE po.product_id = p.id AND po.status = 'available'))
"#;

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    pub async fn get_by_slug(&self, slug: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = ?1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists products matching `filter`, newest first.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Product>> {
        debug!(?filter, limit, offset, "Listing products");

        let sql = format!(
            "SELECT p.* FROM products p {FILTER_SQL} ORDER BY p.created_at DESC, p.id LIMIT ?8 OFFSET ?9"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(search_pattern(filter.search.as_deref()))
            .bind(filter.status)
            .bind(&filter.supplier_id)
            .bind(&filter.category_id)
            .bind(&filter.color_id)
            .bind(&filter.shape_id)
            .bind(filter.has_available_options)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    pub async fn count(&self, filter: &ProductFilter) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM products p {FILTER_SQL}");

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(search_pattern(filter.search.as_deref()))
            .bind(filter.status)
            .bind(&filter.supplier_id)
            .bind(&filter.category_id)
            .bind(&filter.color_id)
            .bind(&filter.shape_id)
            .bind(filter.has_available_options)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn total(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - slug already exists
    /// * `Err(DbError::ForeignKeyViolation)` - unknown supplier
    pub async fn insert<'e, E>(&self, executor: E, product: &Product) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(slug = %product.slug, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, slug, supplier_id, status, description, search_keywords,
                unit, vat_rate_bps, display_price, can_be_purchased_online,
                can_be_picked_up, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.supplier_id)
        .bind(product.status)
        .bind(&product.description)
        .bind(&product.search_keywords)
        .bind(product.unit)
        .bind(product.vat_rate_bps)
        .bind(product.display_price)
        .bind(product.can_be_purchased_online)
        .bind(product.can_be_picked_up)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn update<'e, E>(&self, executor: E, product: &Product) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                slug = ?3,
                supplier_id = ?4,
                status = ?5,
                description = ?6,
                search_keywords = ?7,
                unit = ?8,
                vat_rate_bps = ?9,
                display_price = ?10,
                can_be_purchased_online = ?11,
                can_be_picked_up = ?12,
                updated_at = ?13
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.supplier_id)
        .bind(product.status)
        .bind(&product.description)
        .bind(&product.search_keywords)
        .bind(product.unit)
        .bind(product.vat_rate_bps)
        .bind(product.display_price)
        .bind(product.can_be_purchased_online)
        .bind(product.can_be_picked_up)
        .bind(product.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Deletes a product together with its options and join rows.
    pub async fn delete<'e, E>(&self, executor: E, id: &str) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Returns the subset of `ids` that are products.
    pub async fn existing_ids(&self, ids: &[String]) -> DbResult<Vec<String>> {
        self.existing_in("products", ids).await
    }

    /// Returns the subset of `ids` that are product options.
    pub async fn existing_option_ids(&self, ids: &[String]) -> DbResult<Vec<String>> {
        self.existing_in("product_options", ids).await
    }

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
    // Pricing
    // =========================================================================

    /// Lowest gross price among available options, per product.
    ///
    /// Products without an available option are absent from the map.
    pub async fn lowest_prices(&self, product_ids: &[String]) -> DbResult<HashMap<String, i64>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            r#"
            SELECT product_id, MIN(gross_price_cents)
            FROM product_options
            WHERE status = 'available' AND product_id IN ({})
            GROUP BY product_id
            "#,
            placeholders(product_ids.len())
        );

        let mut query = sqlx::query_as::<_, (String, i64)>(&sql);
        for id in product_ids {
            query = query.bind(id);
        }

        Ok(query.fetch_all(&self.pool).await?.into_iter().collect())
    }

    // =========================================================================
    // Options
    // =========================================================================

    pub async fn get_option(&self, id: &str) -> DbResult<Option<ProductOption>> {
        let option =
            sqlx::query_as::<_, ProductOption>("SELECT * FROM product_options WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(option)
    }

    /// Options of one product, cheapest first.
    pub async fn options_for_product(&self, product_id: &str) -> DbResult<Vec<ProductOption>> {
        let options = sqlx::query_as::<_, ProductOption>(
            r#"
            SELECT * FROM product_options
            WHERE product_id = ?1
            ORDER BY gross_price_cents, created_at, id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(options)
    }

    /// Options of several products, grouped by product id.
    pub async fn options_for_products(
        &self,
        product_ids: &[String],
    ) -> DbResult<HashMap<String, Vec<ProductOption>>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            r#"
            SELECT * FROM product_options
            WHERE product_id IN ({})
            ORDER BY gross_price_cents, created_at, id
            "#,
            placeholders(product_ids.len())
        );

        let mut query = sqlx::query_as::<_, ProductOption>(&sql);
        for id in product_ids {
            query = query.bind(id);
        }

        let mut grouped: HashMap<String, Vec<ProductOption>> = HashMap::new();
        for option in query.fetch_all(&self.pool).await? {
            grouped.entry(option.product_id.clone()).or_default().push(option);
        }

        Ok(grouped)
    }

    /// Inserts an option.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the product already has an option
    ///   with this (variant, size)
    pub async fn insert_option<'e, E>(&self, executor: E, option: &ProductOption) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(product_id = %option.product_id, "Inserting product option");

        sqlx::query(
            r#"
            INSERT INTO product_options (
                id, product_id, variant_id, size_id, gross_price_cents, status,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&option.id)
        .bind(&option.product_id)
        .bind(&option.variant_id)
        .bind(&option.size_id)
        .bind(option.gross_price_cents)
        .bind(option.status)
        .bind(option.created_at)
        .bind(option.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn update_option<'e, E>(&self, executor: E, option: &ProductOption) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE product_options SET
                variant_id = ?2,
                size_id = ?3,
                gross_price_cents = ?4,
                status = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&option.id)
        .bind(&option.variant_id)
        .bind(&option.size_id)
        .bind(option.gross_price_cents)
        .bind(option.status)
        .bind(option.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ProductOption", &option.id));
        }

        Ok(())
    }

    pub async fn delete_option<'e, E>(&self, executor: E, id: &str) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM product_options WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ProductOption", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use crate::Database;

    async fn seeded() -> (Database, String) {
        let db = fixtures::test_db().await;
        let supplier = fixtures::supplier("Marazzi");
        db.suppliers().insert(db.pool(), &supplier).await.unwrap();
        (db, supplier.id)
    }

    #[tokio::test]
    async fn test_insert_get_update() {
        let (db, supplier_id) = seeded().await;
        let repo = db.products();
        let mut product = fixtures::product("hvit-flis", &supplier_id);

        repo.insert(db.pool(), &product).await.unwrap();
        product.name = "Hvit Flis Blank".to_string();
        product.status = ProductStatus::Hidden;
        repo.update(db.pool(), &product).await.unwrap();

        let stored = repo.get_by_slug("hvit-flis").await.unwrap().unwrap();
        assert_eq!(stored.name, "Hvit Flis Blank");
        assert_eq!(stored.status, ProductStatus::Hidden);
        assert_eq!(stored.unit, product.unit);
    }

    #[tokio::test]
    async fn test_search_folds_norwegian_letters() {
        let (db, supplier_id) = seeded().await;
        let repo = db.products();
        let mut product = fixtures::product("ostfold-flis", &supplier_id);
        product.name = "Østfold Flis".to_string();
        repo.insert(db.pool(), &product).await.unwrap();
        let mut other = fixtures::product("hvit-mosaikk", &supplier_id);
        other.search_keywords = Some("Blåmann 50%".to_string());
        repo.insert(db.pool(), &other).await.unwrap();

        let search = |term: &str| ProductFilter {
            search: Some(term.to_string()),
            ..Default::default()
        };

        assert_eq!(repo.count(&search("Østfold")).await.unwrap(), 1);
        assert_eq!(repo.count(&search("østfold")).await.unwrap(), 1);
        assert_eq!(repo.count(&search("FLIS")).await.unwrap(), 1);
        assert_eq!(repo.count(&search("BLÅMANN")).await.unwrap(), 1);

        // Wildcards and regex syntax are matched literally
        assert_eq!(repo.count(&search("50%")).await.unwrap(), 1);
        assert_eq!(repo.count(&search("%")).await.unwrap(), 1);
        assert_eq!(repo.count(&search("_")).await.unwrap(), 0);
        assert_eq!(repo.count(&search(".*")).await.unwrap(), 0);

        let listed = repo.list(&search("ØSTFOLD"), 10, 0).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].slug, "ostfold-flis");
    }

    #[tokio::test]
    async fn test_unknown_supplier_is_rejected() {
        let (db, _) = seeded().await;
        let err = db
            .products()
            .insert(db.pool(), &fixtures::product("x", "no-such-supplier"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_option_combination_is_unique() {
        let (db, supplier_id) = seeded().await;
        let repo = db.products();
        let product = fixtures::product("hvit-flis", &supplier_id);
        repo.insert(db.pool(), &product).await.unwrap();

        repo.insert_option(db.pool(), &fixtures::option(&product.id, 100, ProductStatus::Available))
            .await
            .unwrap();
        let err = repo
            .insert_option(db.pool(), &fixtures::option(&product.id, 200, ProductStatus::Available))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_options() {
        let (db, supplier_id) = seeded().await;
        let repo = db.products();
        let product = fixtures::product("hvit-flis", &supplier_id);
        repo.insert(db.pool(), &product).await.unwrap();
        let option = fixtures::option(&product.id, 100, ProductStatus::Available);
        repo.insert_option(db.pool(), &option).await.unwrap();

        repo.delete(db.pool(), &product.id).await.unwrap();

        assert!(repo.get_by_id(&product.id).await.unwrap().is_none());
        assert!(repo.get_option(&option.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_existing_ids() {
        let (db, supplier_id) = seeded().await;
        let repo = db.products();
        let product = fixtures::product("hvit-flis", &supplier_id);
        repo.insert(db.pool(), &product).await.unwrap();
        let option = fixtures::option(&product.id, 100, ProductStatus::Available);
        repo.insert_option(db.pool(), &option).await.unwrap();

        let asked = vec![product.id.clone(), option.id.clone(), "missing".to_string()];
        assert_eq!(repo.existing_ids(&asked).await.unwrap(), vec![product.id.clone()]);
        assert_eq!(repo.existing_option_ids(&asked).await.unwrap(), vec![option.id.clone()]);
        assert!(repo.existing_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lowest_prices_only_count_available_options() {
        let (db, supplier_id) = seeded().await;
        let repo = db.products();
        let attributes = db.attributes();

        let a = fixtures::product("a", &supplier_id);
        let b = fixtures::product("b", &supplier_id);
        repo.insert(db.pool(), &a).await.unwrap();
        repo.insert(db.pool(), &b).await.unwrap();

        let sizes: Vec<aria_core::Size> = (1..=3)
            .map(|n| aria_core::Size {
                id: format!("size-{n}"),
                width: 100 * n,
                height: 100 * n,
                depth: None,
                circumference: None,
            })
            .collect();
        for size in &sizes {
            attributes.insert_size(db.pool(), size).await.unwrap();
        }

        let priced = [
            (&a, 500, ProductStatus::Hidden, &sizes[0]),
            (&a, 900, ProductStatus::Available, &sizes[1]),
            (&a, 700, ProductStatus::Available, &sizes[2]),
            (&b, 300, ProductStatus::Draft, &sizes[0]),
        ];
        for (product, price, status, size) in priced {
            let mut option = fixtures::option(&product.id, price, status);
            option.size_id = Some(size.id.clone());
            repo.insert_option(db.pool(), &option).await.unwrap();
        }

        let lowest = repo
            .lowest_prices(&[a.id.clone(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(lowest.get(&a.id), Some(&700));
        assert_eq!(lowest.get(&b.id), None);

        let grouped = repo.options_for_products(&[a.id.clone()]).await.unwrap();
        assert_eq!(grouped[&a.id].len(), 3);
        assert_eq!(grouped[&a.id][0].gross_price_cents, 500);
    }

    #[tokio::test]
    async fn test_filtered_listing() {
        let (db, supplier_id) = seeded().await;
        let repo = db.products();

        let mut white = fixtures::product("hvit-flis", &supplier_id);
        white.search_keywords = Some("marmor baderom".to_string());
        let mut draft = fixtures::product("sort-flis", &supplier_id);
        draft.status = ProductStatus::Draft;
        repo.insert(db.pool(), &white).await.unwrap();
        repo.insert(db.pool(), &draft).await.unwrap();
        repo.insert_option(db.pool(), &fixtures::option(&white.id, 100, ProductStatus::Available))
            .await
            .unwrap();

        let category = fixtures::category("bad", None);
        db.categories().insert(db.pool(), &category).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        db.categories()
            .set_for_product(&mut conn, &white.id, &[category.id.clone()])
            .await
            .unwrap();
        drop(conn);

        let all = ProductFilter::default();
        assert_eq!(repo.count(&all).await.unwrap(), 2);

        let available = ProductFilter {
            status: Some(ProductStatus::Available),
            ..Default::default()
        };
        assert_eq!(repo.list(&available, 10, 0).await.unwrap()[0].id, white.id);

        let by_keyword = ProductFilter {
            search: Some("Marmor".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.count(&by_keyword).await.unwrap(), 1);

        let by_category = ProductFilter {
            category_id: Some(category.id.clone()),
            has_available_options: true,
            ..Default::default()
        };
        assert_eq!(repo.count(&by_category).await.unwrap(), 1);

        let paged = repo.list(&all, 1, 1).await.unwrap();
        assert_eq!(paged.len(), 1);
    }
}
