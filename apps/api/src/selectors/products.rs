//! Product reads for the back office and the storefront.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aria_core::discount::{lowest_discounted_price, price_option, PricedOption};
use aria_core::{
    Category, Color, Discount, Money, Product, ProductOption, ProductStatus, Shape, Size, Supplier,
    Variant,
};
use aria_db::{Database, ProductFilter};

use super::found;
use crate::error::{ApiResult, ApplicationError};

// =============================================================================
// Response Records
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListItem {
    #[serde(flatten)]
    pub product: Product,
    pub lowest_price_cents: Option<Money>,
    pub lowest_discounted_price_cents: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeDetail {
    #[serde(flatten)]
    pub size: Size,
    pub name: String,
}

impl From<Size> for SizeDetail {
    fn from(size: Size) -> Self {
        let name = size.name();
        SizeDetail { size, name }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDetail {
    #[serde(flatten)]
    pub option: ProductOption,
    pub variant: Option<Variant>,
    pub size: Option<SizeDetail>,
    pub discounted_gross_price_cents: Option<Money>,
    pub discount_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub supplier: Option<Supplier>,
    pub categories: Vec<Category>,
    pub colors: Vec<Color>,
    pub shapes: Vec<Shape>,
    pub options: Vec<OptionDetail>,
    /// Discounts attached to the product itself.
    pub discounts: Vec<Discount>,
    pub lowest_price_cents: Option<Money>,
    pub lowest_discounted_price_cents: Option<Money>,
}

// =============================================================================
// Listing
// =============================================================================

/// One page of products with their lowest prices.
pub async fn product_list(
    db: &Database,
    filter: &ProductFilter,
    limit: i64,
    offset: i64,
) -> ApiResult<(Vec<ProductListItem>, i64)> {
    let products = db.products();
    let rows = products.list(filter, limit, offset).await?;
    let count = products.count(filter).await?;

    let items = with_prices(db, rows, Utc::now()).await?;
    Ok((items, count))
}

/// The storefront listing: available products with something to buy.
pub async fn front_product_list(
    db: &Database,
    filter: ProductFilter,
    limit: i64,
    offset: i64,
) -> ApiResult<(Vec<ProductListItem>, i64)> {
    let filter = ProductFilter {
        status: Some(ProductStatus::Available),
        has_available_options: true,
        ..filter
    };
    product_list(db, &filter, limit, offset).await
}

async fn with_prices(
    db: &Database,
    rows: Vec<Product>,
    now: DateTime<Utc>,
) -> ApiResult<Vec<ProductListItem>> {
    let ids: Vec<String> = rows.iter().map(|p| p.id.clone()).collect();

    let lowest = db.products().lowest_prices(&ids).await?;
    let priced = price_products(db, &ids, now).await?;

    Ok(rows
        .into_iter()
        .map(|product| {
            let options = priced.get(&product.id).map(Vec::as_slice).unwrap_or(&[]);
            ProductListItem {
                lowest_price_cents: lowest.get(&product.id).copied().map(Money::from_cents),
                lowest_discounted_price_cents: lowest_discounted_price(options),
                product,
            }
        })
        .collect())
}

/// Prices every option of the given products, grouped by product id.
async fn price_products(
    db: &Database,
    product_ids: &[String],
    now: DateTime<Utc>,
) -> ApiResult<HashMap<String, Vec<PricedOption>>> {
    let options = db.products().options_for_products(product_ids).await?;
    let option_ids: Vec<String> = options.values().flatten().map(|o| o.id.clone()).collect();

    let discounts = db.discounts();
    let product_discounts = discounts.for_products(product_ids).await?;
    let option_discounts = discounts.for_options(&option_ids).await?;

    Ok(options
        .into_iter()
        .map(|(product_id, options)| {
            let on_product = product_discounts.get(&product_id).map(Vec::as_slice).unwrap_or(&[]);
            let priced = options
                .iter()
                .map(|option| {
                    let on_option =
                        option_discounts.get(&option.id).map(Vec::as_slice).unwrap_or(&[]);
                    price_option(option, on_option, on_product, now)
                })
                .collect();
            (product_id, priced)
        })
        .collect())
}

// =============================================================================
// Detail
// =============================================================================

pub async fn product_detail(db: &Database, id: &str) -> ApiResult<ProductDetail> {
    let product = found(db.products().get_by_id(id).await?, "Product", id)?;
    build_detail(db, product, false, Utc::now()).await
}

/// Storefront detail by slug; only available products and options.
pub async fn front_product_detail(db: &Database, slug: &str) -> ApiResult<ProductDetail> {
    let product = db
        .products()
        .get_by_slug(slug)
        .await?
        .filter(|p| p.status == ProductStatus::Available)
        .ok_or_else(|| ApplicationError::not_found(format!("Product not found: {slug}")))?;

    build_detail(db, product, true, Utc::now()).await
}

async fn build_detail(
    db: &Database,
    product: Product,
    available_only: bool,
    now: DateTime<Utc>,
) -> ApiResult<ProductDetail> {
    let mut options = db.products().options_for_product(&product.id).await?;
    if available_only {
        options.retain(ProductOption::is_available);
    }

    let attributes = db.attributes();
    let variant_ids: Vec<String> = options.iter().filter_map(|o| o.variant_id.clone()).collect();
    let size_ids: Vec<String> = options.iter().filter_map(|o| o.size_id.clone()).collect();
    let variants: HashMap<String, Variant> = attributes
        .variants_by_ids(&variant_ids)
        .await?
        .into_iter()
        .map(|v| (v.id.clone(), v))
        .collect();
    let sizes: HashMap<String, Size> = attributes
        .sizes_by_ids(&size_ids)
        .await?
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();

    let discounts = db.discounts();
    let product_discounts = discounts.for_product(&product.id).await?;
    let option_ids: Vec<String> = options.iter().map(|o| o.id.clone()).collect();
    let option_discounts = discounts.for_options(&option_ids).await?;

    let mut priced = Vec::with_capacity(options.len());
    let mut details = Vec::with_capacity(options.len());
    for option in options {
        let on_option = option_discounts.get(&option.id).map(Vec::as_slice).unwrap_or(&[]);
        let pricing = price_option(&option, on_option, &product_discounts, now);

        details.push(OptionDetail {
            variant: option.variant_id.as_ref().and_then(|id| variants.get(id)).cloned(),
            size: option
                .size_id
                .as_ref()
                .and_then(|id| sizes.get(id))
                .cloned()
                .map(SizeDetail::from),
            discounted_gross_price_cents: pricing.discounted_gross_price,
            discount_id: pricing.discount_id.clone(),
            option,
        });
        priced.push(pricing);
    }

    let lowest_price_cents = db
        .products()
        .lowest_prices(std::slice::from_ref(&product.id))
        .await?
        .get(&product.id)
        .copied()
        .map(Money::from_cents);

    Ok(ProductDetail {
        supplier: db.suppliers().get_by_id(&product.supplier_id).await?,
        categories: db.categories().for_product(&product.id).await?,
        colors: attributes.colors_for_product(&product.id).await?,
        shapes: attributes.shapes_for_product(&product.id).await?,
        options: details,
        discounts: product_discounts,
        lowest_price_cents,
        lowest_discounted_price_cents: lowest_discounted_price(&priced),
        product,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{discount, option, product, seeded_db, supplier};
    use aria_db::DbConfig;

    #[tokio::test]
    async fn test_list_prices_with_option_discount_winning() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let supplier = supplier(&db, "Marazzi").await;
        let tile = product(&db, "hvit-flis", &supplier.id).await;
        let cheap = option(&db, &tile.id, 10_000, ProductStatus::Available).await;
        option(&db, &tile.id, 20_000, ProductStatus::Available).await;
        option(&db, &tile.id, 5_000, ProductStatus::Hidden).await;

        let on_product = discount(&db, "produkt-salg", Some(1000), None).await;
        db.discounts()
            .set_products(
                &mut *db.pool().acquire().await.unwrap(),
                &on_product.id,
                &[tile.id.clone()],
            )
            .await
            .unwrap();
        let on_option = discount(&db, "opsjon-salg", Some(5000), None).await;
        db.discounts()
            .set_options(
                &mut *db.pool().acquire().await.unwrap(),
                &on_option.id,
                &[cheap.id.clone()],
            )
            .await
            .unwrap();

        let (items, count) = product_list(&db, &ProductFilter::default(), 25, 0).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(items[0].lowest_price_cents, Some(Money::from_cents(10_000)));
        // 10 000 at 50% beats 20 000 at 10%
        assert_eq!(items[0].lowest_discounted_price_cents, Some(Money::from_cents(5_000)));

        let detail = product_detail(&db, &tile.id).await.unwrap();
        assert_eq!(detail.options.len(), 3);
        let cheap_detail = detail.options.iter().find(|o| o.option.id == cheap.id).unwrap();
        assert_eq!(cheap_detail.discount_id.as_deref(), Some(on_option.id.as_str()));
        assert_eq!(detail.discounts.len(), 1);
    }

    #[tokio::test]
    async fn test_front_hides_unavailable() {
        let (db, fixture) = seeded_db().await;

        let (items, count) =
            front_product_list(&db, ProductFilter::default(), 25, 0).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(items[0].product.id, fixture.product.id);

        let detail = front_product_detail(&db, &fixture.product.slug).await.unwrap();
        assert!(detail.options.iter().all(|o| o.option.status == ProductStatus::Available));

        let err = front_product_detail(&db, &fixture.draft.slug).await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
    }
}
