//! # Discount Repository
//!
//! Discounts and the products / options they target.
//!
//! Activity (window and quantity cap) is never filtered in SQL. Callers load
//! the candidates and let `aria_core::discount` decide, so there is exactly
//! one definition of "active".

use std::collections::HashMap;

use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{search_pattern, placeholders};
use aria_core::Discount;

const FILTER_SQL: &str = r#"
    WHERE (?1 IS NULL OR name REGEXP ?1 OR slug REGEXP ?1)
"#;

/// A discount together with the id of the product or option it came from.
#[derive(Debug, FromRow)]
struct LinkedDiscount {
    link_id: String,
    #[sqlx(flatten)]
    discount: Discount,
}

fn group_linked(rows: Vec<LinkedDiscount>) -> HashMap<String, Vec<Discount>> {
    let mut grouped: HashMap<String, Vec<Discount>> = HashMap::new();
    for row in rows {
        grouped.entry(row.link_id).or_default().push(row.discount);
    }
    grouped
}

#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Discount>> {
        let discount = sqlx::query_as::<_, Discount>("SELECT * FROM discounts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(discount)
    }

    pub async fn get_by_slug(&self, slug: &str) -> DbResult<Option<Discount>> {
        let discount = sqlx::query_as::<_, Discount>("SELECT * FROM discounts WHERE slug = ?1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(discount)
    }

    /// Lists discounts, newest campaign first.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Discount>> {
        let sql = format!(
            "SELECT * FROM discounts {FILTER_SQL} ORDER BY created_at DESC, id LIMIT ?2 OFFSET ?3"
        );

        let discounts = sqlx::query_as::<_, Discount>(&sql)
            .bind(search_pattern(search))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(discounts)
    }

    pub async fn count(&self, search: Option<&str>) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM discounts {FILTER_SQL}");

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(search_pattern(search))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Every discount, newest first. The storefront filters these down to
    /// the active ones.
    pub async fn list_all(&self) -> DbResult<Vec<Discount>> {
        let discounts = sqlx::query_as::<_, Discount>(
            "SELECT * FROM discounts ORDER BY created_at DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(discounts)
    }

    pub async fn insert<'e, E>(&self, executor: E, discount: &Discount) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(slug = %discount.slug, "Inserting discount");

        sqlx::query(
            r#"
            INSERT INTO discounts (
                id, name, slug, description, discount_percentage_bps, fixed_price_cents,
                active_at, active_until, maximum_sold_quantity, total_sold_quantity,
                display_in_navbar, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.name)
        .bind(&discount.slug)
        .bind(&discount.description)
        .bind(discount.discount_percentage_bps)
        .bind(discount.fixed_price_cents)
        .bind(discount.active_at)
        .bind(discount.active_until)
        .bind(discount.maximum_sold_quantity)
        .bind(discount.total_sold_quantity)
        .bind(discount.display_in_navbar)
        .bind(discount.created_at)
        .bind(discount.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Updates a discount. `total_sold_quantity` is owned by
    /// [`Self::record_sale`] and left untouched.
    pub async fn update<'e, E>(&self, executor: E, discount: &Discount) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %discount.id, "Updating discount");

        let result = sqlx::query(
            r#"
            UPDATE discounts SET
                name = ?2,
                slug = ?3,
                description = ?4,
                discount_percentage_bps = ?5,
                fixed_price_cents = ?6,
                active_at = ?7,
                active_until = ?8,
                maximum_sold_quantity = ?9,
                display_in_navbar = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.name)
        .bind(&discount.slug)
        .bind(&discount.description)
        .bind(discount.discount_percentage_bps)
        .bind(discount.fixed_price_cents)
        .bind(discount.active_at)
        .bind(discount.active_until)
        .bind(discount.maximum_sold_quantity)
        .bind(discount.display_in_navbar)
        .bind(discount.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount", &discount.id));
        }

        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, id: &str) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM discounts WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount", id));
        }

        Ok(())
    }

    /// Adds sold units to a discount's running total.
    pub async fn record_sale<'e, E>(&self, executor: E, id: &str, quantity: i64) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE discounts SET total_sold_quantity = total_sold_quantity + ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(quantity)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount", id));
        }

        Ok(())
    }

    // =========================================================================
    // Targets
    // =========================================================================

    pub async fn product_ids(&self, discount_id: &str) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT product_id FROM discount_products WHERE discount_id = ?1 ORDER BY product_id",
        )
        .bind(discount_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    pub async fn option_ids(&self, discount_id: &str) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT product_option_id FROM discount_product_options
            WHERE discount_id = ?1
            ORDER BY product_option_id
            "#,
        )
        .bind(discount_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Replaces the products a discount targets.
    pub async fn set_products(
        &self,
        conn: &mut SqliteConnection,
        discount_id: &str,
        product_ids: &[String],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM discount_products WHERE discount_id = ?1")
            .bind(discount_id)
            .execute(&mut *conn)
            .await?;

        for product_id in product_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO discount_products (discount_id, product_id) VALUES (?1, ?2)",
            )
            .bind(discount_id)
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Replaces the options a discount targets.
    pub async fn set_options(
        &self,
        conn: &mut SqliteConnection,
        discount_id: &str,
        option_ids: &[String],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM discount_product_options WHERE discount_id = ?1")
            .bind(discount_id)
            .execute(&mut *conn)
            .await?;

        for option_id in option_ids {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO discount_product_options (discount_id, product_option_id)
                VALUES (?1, ?2)
                "#,
            )
            .bind(discount_id)
            .bind(option_id)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Discounts attached to one product, newest first.
    pub async fn for_product(&self, product_id: &str) -> DbResult<Vec<Discount>> {
        let discounts = sqlx::query_as::<_, Discount>(
            r#"
            SELECT d.* FROM discounts d
            INNER JOIN discount_products dp ON dp.discount_id = d.id
            WHERE dp.product_id = ?1
            ORDER BY d.created_at DESC, d.id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(discounts)
    }

    /// Discounts attached to several products, grouped by product id.
    pub async fn for_products(
        &self,
        product_ids: &[String],
    ) -> DbResult<HashMap<String, Vec<Discount>>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            r#"
            SELECT dp.product_id AS link_id, d.* FROM discounts d
            INNER JOIN discount_products dp ON dp.discount_id = d.id
            WHERE dp.product_id IN ({})
            ORDER BY d.created_at DESC, d.id
            "#,
            placeholders(product_ids.len())
        );

        let mut query = sqlx::query_as::<_, LinkedDiscount>(&sql);
        for id in product_ids {
            query = query.bind(id);
        }

        Ok(group_linked(query.fetch_all(&self.pool).await?))
    }

    /// Discounts attached to several options, grouped by option id.
    pub async fn for_options(
        &self,
        option_ids: &[String],
    ) -> DbResult<HashMap<String, Vec<Discount>>> {
        if option_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            r#"
            SELECT dpo.product_option_id AS link_id, d.* FROM discounts d
            INNER JOIN discount_product_options dpo ON dpo.discount_id = d.id
            WHERE dpo.product_option_id IN ({})
            ORDER BY d.created_at DESC, d.id
            "#,
            placeholders(option_ids.len())
        );

        let mut query = sqlx::query_as::<_, LinkedDiscount>(&sql);
        for id in option_ids {
            query = query.bind(id);
        }

        Ok(group_linked(query.fetch_all(&self.pool).await?))
    }

    /// Ids of products a discount reaches directly or through an option.
    pub async fn reached_product_ids(&self, discount_id: &str) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT product_id FROM discount_products WHERE discount_id = ?1
            UNION
            SELECT po.product_id FROM discount_product_options dpo
            INNER JOIN product_options po ON po.id = dpo.product_option_id
            WHERE dpo.discount_id = ?1
            ORDER BY 1
            "#,
        )
        .bind(discount_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use aria_core::ProductStatus;

    #[tokio::test]
    async fn test_crud_and_sales() {
        let db = fixtures::test_db().await;
        let repo = db.discounts();
        let mut discount = fixtures::discount("sommersalg", Some(2500), None);

        repo.insert(db.pool(), &discount).await.unwrap();
        discount.maximum_sold_quantity = Some(10);
        repo.update(db.pool(), &discount).await.unwrap();
        repo.record_sale(db.pool(), &discount.id, 3).await.unwrap();

        let stored = repo.get_by_slug("sommersalg").await.unwrap().unwrap();
        assert_eq!(stored.maximum_sold_quantity, Some(10));
        assert_eq!(stored.total_sold_quantity, 3);
        assert_eq!(stored.active_until, discount.active_until);
        assert_eq!(repo.count(Some("sommer")).await.unwrap(), 1);

        repo.delete(db.pool(), &discount.id).await.unwrap();
        assert!(repo.get_by_id(&discount.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_percentage_out_of_range_is_rejected() {
        let db = fixtures::test_db().await;
        let err = db
            .discounts()
            .insert(db.pool(), &fixtures::discount("bad", Some(20_000), None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation(_)));
    }

    #[tokio::test]
    async fn test_targets() {
        let db = fixtures::test_db().await;
        let supplier = fixtures::supplier("Marazzi");
        db.suppliers().insert(db.pool(), &supplier).await.unwrap();
        let a = fixtures::product("a", &supplier.id);
        let b = fixtures::product("b", &supplier.id);
        db.products().insert(db.pool(), &a).await.unwrap();
        db.products().insert(db.pool(), &b).await.unwrap();
        let option_b = fixtures::option(&b.id, 1000, ProductStatus::Available);
        db.products().insert_option(db.pool(), &option_b).await.unwrap();

        let repo = db.discounts();
        let on_product = fixtures::discount("paa-produkt", Some(1000), None);
        let on_option = fixtures::discount("paa-variant", None, Some(500));
        repo.insert(db.pool(), &on_product).await.unwrap();
        repo.insert(db.pool(), &on_option).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        repo.set_products(&mut tx, &on_product.id, &[a.id.clone(), b.id.clone()])
            .await
            .unwrap();
        repo.set_options(&mut tx, &on_option.id, &[option_b.id.clone()])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(repo.for_product(&a.id).await.unwrap().len(), 1);

        let by_product = repo.for_products(&[a.id.clone(), b.id.clone()]).await.unwrap();
        assert_eq!(by_product[&a.id][0].id, on_product.id);
        assert_eq!(by_product[&b.id].len(), 1);

        let by_option = repo.for_options(&[option_b.id.clone()]).await.unwrap();
        assert_eq!(by_option[&option_b.id][0].fixed_price_cents, Some(500));

        assert_eq!(repo.reached_product_ids(&on_option.id).await.unwrap(), vec![b.id.clone()]);
        assert_eq!(repo.product_ids(&on_product.id).await.unwrap().len(), 2);
        assert_eq!(repo.option_ids(&on_option.id).await.unwrap(), vec![option_b.id.clone()]);

        // deleting the product removes the link, not the discount
        db.products().delete(db.pool(), &a.id).await.unwrap();
        assert_eq!(repo.product_ids(&on_product.id).await.unwrap(), vec![b.id]);
    }
}
