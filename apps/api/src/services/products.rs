//! # Product Services
//!
//! Products and their options.
//!
//! ```text
//! product_create / product_update
//!   ├── supplier, categories, colors, shapes must exist   (pool reads)
//!   └── tx: products row + three join replacements + log
//!
//! option_create / option_update
//!   ├── product, variant, size must exist                 (pool reads)
//!   └── tx: product_options row + log
//! ```
//!
//! Every mutation answers with the full [`ProductDetail`] so the back office
//! can redraw the product page from one response.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use aria_core::validation::{validate_name, validate_price_cents, validate_vat_rate_bps};
use aria_core::{
    LogAction, Product, ProductOption, ProductStatus, ProductUnit, ResourceType, User,
};
use aria_db::Database;

use super::{clean, commit, dedup, log_entry, new_id, require_all, resolve_slug};
use crate::error::{ApiResult, ApplicationError};
use crate::selectors::found;
use crate::selectors::products::{product_detail, ProductDetail};

fn default_vat_rate_bps() -> i64 {
    2500
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub supplier_id: String,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub search_keywords: Option<String>,
    #[serde(default)]
    pub unit: ProductUnit,
    #[serde(default = "default_vat_rate_bps")]
    pub vat_rate_bps: i64,
    #[serde(default = "crate::services::default_true")]
    pub display_price: bool,
    #[serde(default)]
    pub can_be_purchased_online: bool,
    #[serde(default)]
    pub can_be_picked_up: bool,
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub color_ids: Vec<String>,
    #[serde(default)]
    pub shape_ids: Vec<String>,
}

/// Join ids that survived validation.
struct ProductLinks {
    category_ids: Vec<String>,
    color_ids: Vec<String>,
    shape_ids: Vec<String>,
}

impl ProductInput {
    async fn apply(self, db: &Database, product: &mut Product) -> ApiResult<ProductLinks> {
        let name = validate_name("name", &self.name)?;
        validate_vat_rate_bps(self.vat_rate_bps)?;

        if db.suppliers().get_by_id(&self.supplier_id).await?.is_none() {
            return Err(ApplicationError::validation("Supplier does not exist")
                .with_field("supplierId", "does not exist"));
        }

        let category_ids = dedup(self.category_ids);
        let color_ids = dedup(self.color_ids);
        let shape_ids = dedup(self.shape_ids);
        let known_categories = db.categories().existing_ids(&category_ids).await?;
        require_all("categoryIds", &category_ids, &known_categories)?;
        let known_colors = db.attributes().existing_color_ids(&color_ids).await?;
        require_all("colorIds", &color_ids, &known_colors)?;
        let known_shapes = db.attributes().existing_shape_ids(&shape_ids).await?;
        require_all("shapeIds", &shape_ids, &known_shapes)?;

        product.slug = resolve_slug(self.slug, &name)?;
        product.name = name;
        product.supplier_id = self.supplier_id;
        product.status = self.status;
        product.description = clean(self.description);
        product.search_keywords = clean(self.search_keywords);
        product.unit = self.unit;
        product.vat_rate_bps = self.vat_rate_bps;
        product.display_price = self.display_price;
        product.can_be_purchased_online = self.can_be_purchased_online;
        product.can_be_picked_up = self.can_be_picked_up;

        Ok(ProductLinks {
            category_ids,
            color_ids,
            shape_ids,
        })
    }
}

// =============================================================================
// Products
// =============================================================================

pub async fn product_create(
    db: &Database,
    actor: &User,
    input: ProductInput,
) -> ApiResult<ProductDetail> {
    let now = Utc::now();
    let mut product = Product {
        id: new_id(),
        name: String::new(),
        slug: String::new(),
        supplier_id: String::new(),
        status: ProductStatus::Draft,
        description: None,
        search_keywords: None,
        unit: ProductUnit::Piece,
        vat_rate_bps: default_vat_rate_bps(),
        display_price: true,
        can_be_purchased_online: false,
        can_be_picked_up: false,
        created_at: now,
        updated_at: now,
    };
    let links = input.apply(db, &mut product).await?;

    let mut tx = db.begin().await?;
    db.products().insert(&mut *tx, &product).await?;
    write_links(db, &mut tx, &product.id, &links).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Product,
                &product.id,
                LogAction::Create,
                format!("Created product {}", product.name),
            ),
        )
        .await?;
    commit(tx).await?;

    info!(id = %product.id, slug = %product.slug, "Product created");
    product_detail(db, &product.id).await
}

pub async fn product_update(
    db: &Database,
    actor: &User,
    id: &str,
    input: ProductInput,
) -> ApiResult<ProductDetail> {
    let mut product = found(db.products().get_by_id(id).await?, "Product", id)?;
    let links = input.apply(db, &mut product).await?;
    product.updated_at = Utc::now();

    let mut tx = db.begin().await?;
    db.products().update(&mut *tx, &product).await?;
    write_links(db, &mut tx, id, &links).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Product,
                id,
                LogAction::Update,
                format!("Updated product {}", product.name),
            ),
        )
        .await?;
    commit(tx).await?;

    product_detail(db, id).await
}

/// Deletes a product; options and join rows go with it.
pub async fn product_delete(db: &Database, actor: &User, id: &str) -> ApiResult<()> {
    let product = found(db.products().get_by_id(id).await?, "Product", id)?;

    let mut tx = db.begin().await?;
    db.products().delete(&mut *tx, id).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Product,
                id,
                LogAction::Delete,
                format!("Deleted product {}", product.name),
            ),
        )
        .await?;
    commit(tx).await?;

    info!(id, "Product deleted");
    Ok(())
}

async fn write_links(
    db: &Database,
    tx: &mut aria_db::Tx,
    product_id: &str,
    links: &ProductLinks,
) -> ApiResult<()> {
    db.categories().set_for_product(&mut **tx, product_id, &links.category_ids).await?;
    db.attributes().set_colors_for_product(&mut **tx, product_id, &links.color_ids).await?;
    db.attributes().set_shapes_for_product(&mut **tx, product_id, &links.shape_ids).await?;
    Ok(())
}

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionInput {
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub size_id: Option<String>,
    pub gross_price_cents: i64,
    #[serde(default)]
    pub status: ProductStatus,
}

impl OptionInput {
    async fn apply(self, db: &Database, option: &mut ProductOption) -> ApiResult<()> {
        validate_price_cents("grossPriceCents", self.gross_price_cents)?;

        let variant_id = clean(self.variant_id);
        if let Some(variant_id) = &variant_id {
            if db.attributes().get_variant(variant_id).await?.is_none() {
                return Err(ApplicationError::validation("Variant does not exist")
                    .with_field("variantId", "does not exist"));
            }
        }
        let size_id = clean(self.size_id);
        if let Some(size_id) = &size_id {
            if db.attributes().get_size(size_id).await?.is_none() {
                return Err(ApplicationError::validation("Size does not exist")
                    .with_field("sizeId", "does not exist"));
            }
        }

        option.variant_id = variant_id;
        option.size_id = size_id;
        option.gross_price_cents = self.gross_price_cents;
        option.status = self.status;
        Ok(())
    }
}

/// Adds an option to a product.
///
/// ## Returns
/// * `409 ALREADY_EXISTS` - the product already has this variant/size pair
pub async fn option_create(
    db: &Database,
    actor: &User,
    product_id: &str,
    input: OptionInput,
) -> ApiResult<ProductDetail> {
    let product = found(db.products().get_by_id(product_id).await?, "Product", product_id)?;

    let now = Utc::now();
    let mut option = ProductOption {
        id: new_id(),
        product_id: product.id.clone(),
        variant_id: None,
        size_id: None,
        gross_price_cents: 0,
        status: ProductStatus::Draft,
        created_at: now,
        updated_at: now,
    };
    input.apply(db, &mut option).await?;

    let mut tx = db.begin().await?;
    db.products().insert_option(&mut *tx, &option).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::ProductOption,
                &option.id,
                LogAction::Create,
                format!("Added option to {} at {}", product.name, option.gross_price()),
            ),
        )
        .await?;
    commit(tx).await?;

    product_detail(db, product_id).await
}

pub async fn option_update(
    db: &Database,
    actor: &User,
    id: &str,
    input: OptionInput,
) -> ApiResult<ProductDetail> {
    let mut option = found(db.products().get_option(id).await?, "Product option", id)?;
    input.apply(db, &mut option).await?;
    option.updated_at = Utc::now();

    let mut tx = db.begin().await?;
    db.products().update_option(&mut *tx, &option).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::ProductOption,
                id,
                LogAction::Update,
                format!("Updated option, price {}", option.gross_price()),
            ),
        )
        .await?;
    commit(tx).await?;

    product_detail(db, &option.product_id).await
}

pub async fn option_delete(db: &Database, actor: &User, id: &str) -> ApiResult<()> {
    let option = found(db.products().get_option(id).await?, "Product option", id)?;

    let mut tx = db.begin().await?;
    db.products().delete_option(&mut *tx, id).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::ProductOption,
                id,
                LogAction::Delete,
                format!("Deleted option of product {}", option.product_id),
            ),
        )
        .await?;
    commit(tx).await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalogue::{self, CategoryInput, ColorInput, SizeInput};
    use crate::test_support;
    use axum::http::StatusCode;

    fn input(name: &str, supplier_id: &str) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            slug: None,
            supplier_id: supplier_id.to_string(),
            status: ProductStatus::Available,
            description: Some("  Blank flis  ".to_string()),
            search_keywords: None,
            unit: ProductUnit::SquareMeter,
            vat_rate_bps: 2500,
            display_price: true,
            can_be_purchased_online: true,
            can_be_picked_up: false,
            category_ids: vec![],
            color_ids: vec![],
            shape_ids: vec![],
        }
    }

    fn option(price: i64) -> OptionInput {
        OptionInput {
            variant_id: None,
            size_id: None,
            gross_price_cents: price,
            status: ProductStatus::Available,
        }
    }

    #[tokio::test]
    async fn test_product_lifecycle_with_links() {
        let db = test_support::db().await;
        let actor = test_support::superuser(&db).await;
        let supplier = test_support::supplier(&db, "Marazzi").await;

        let category = catalogue::category_create(
            &db,
            &actor,
            CategoryInput {
                name: "Gulvflis".to_string(),
                slug: None,
                description: None,
                parent_id: None,
                ordering: 0,
                display_in_navbar: false,
                is_active: true,
            },
        )
        .await
        .unwrap();
        let color = catalogue::color_create(
            &db,
            &actor,
            ColorInput { name: "Hvit".to_string(), color_hex: "#ffffff".to_string() },
        )
        .await
        .unwrap();

        let mut create = input("Hvit Blank 30x60", &supplier.id);
        create.category_ids = vec![category.id.clone(), category.id.clone()];
        create.color_ids = vec![color.id.clone()];
        let detail = product_create(&db, &actor, create).await.unwrap();

        assert_eq!(detail.product.slug, "hvit-blank-30x60");
        assert_eq!(detail.product.description.as_deref(), Some("Blank flis"));
        assert_eq!(detail.categories.len(), 1);
        assert_eq!(detail.colors.len(), 1);
        assert!(detail.options.is_empty());

        let product_id = detail.product.id.clone();
        let renamed = input("Hvit Matt 30x60", &supplier.id);
        let updated = product_update(&db, &actor, &product_id, renamed).await.unwrap();
        assert_eq!(updated.product.slug, "hvit-matt-30x60");
        assert!(updated.categories.is_empty());
        assert!(updated.colors.is_empty());

        product_delete(&db, &actor, &product_id).await.unwrap();
        assert!(db.products().get_by_id(&product_id).await.unwrap().is_none());
        assert_eq!(db.logs().count_for(ResourceType::Product, &product_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unknown_references_are_rejected() {
        let db = test_support::db().await;
        let actor = test_support::superuser(&db).await;

        let err = product_create(&db, &actor, input("Flis", "missing")).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.errors.unwrap().contains_key("supplierId"));

        let supplier = test_support::supplier(&db, "Equipe").await;
        let mut with_color = input("Flis", &supplier.id);
        with_color.color_ids = vec!["nope".to_string()];
        let err = product_create(&db, &actor, with_color).await.unwrap_err();
        assert!(err.errors.unwrap().contains_key("colorIds"));

        let mut bad_vat = input("Flis", &supplier.id);
        bad_vat.vat_rate_bps = 20_000;
        assert_eq!(
            product_create(&db, &actor, bad_vat).await.unwrap_err().status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(db.products().total().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_options() {
        let db = test_support::db().await;
        let actor = test_support::superuser(&db).await;
        let supplier = test_support::supplier(&db, "Marazzi").await;
        let product = test_support::product(&db, "terrazzo", &supplier.id).await;
        let size = catalogue::size_create(
            &db,
            &actor,
            SizeInput { width: 600, height: 600, depth: None, circumference: None },
        )
        .await
        .unwrap();

        let mut first = option(49_900);
        first.size_id = Some(size.id.clone());
        let detail = option_create(&db, &actor, &product.id, first.clone()).await.unwrap();
        assert_eq!(detail.options.len(), 1);
        assert_eq!(detail.lowest_price_cents.map(|m| m.cents()), Some(49_900));

        let duplicate = option_create(&db, &actor, &product.id, first).await.unwrap_err();
        assert_eq!(duplicate.status, StatusCode::CONFLICT);

        let option_id = detail.options[0].option.id.clone();
        let cheaper = option_update(&db, &actor, &option_id, option(39_900)).await.unwrap();
        assert_eq!(cheaper.lowest_price_cents.map(|m| m.cents()), Some(39_900));

        let negative = option_update(&db, &actor, &option_id, option(-1)).await.unwrap_err();
        assert_eq!(negative.status, StatusCode::BAD_REQUEST);

        option_delete(&db, &actor, &option_id).await.unwrap();
        let missing = option_delete(&db, &actor, &option_id).await.unwrap_err();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }
}
