//! Discount mutations.
//!
//! A discount carries exactly one price rule (percentage or fixed price) and
//! targets any mix of whole products and single options. Replacing targets
//! and writing the row happen in one transaction.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use aria_core::validation::{
    validate_discount_kind, validate_discount_window, validate_maximum_sold_quantity, validate_name,
};
use aria_core::{Discount, LogAction, ResourceType, User};
use aria_db::{Database, Tx};

use super::{clean, commit, dedup, log_entry, new_id, require_all, resolve_slug};
use crate::error::ApiResult;
use crate::selectors::discounts::{discount_detail, DiscountDetail};
use crate::selectors::found;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub discount_percentage_bps: Option<i64>,
    #[serde(default)]
    pub fixed_price_cents: Option<i64>,
    /// Defaults to now.
    #[serde(default)]
    pub active_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub maximum_sold_quantity: Option<i64>,
    #[serde(default)]
    pub display_in_navbar: bool,
    #[serde(default)]
    pub product_ids: Vec<String>,
    #[serde(default)]
    pub option_ids: Vec<String>,
}

struct Targets {
    product_ids: Vec<String>,
    option_ids: Vec<String>,
}

impl DiscountInput {
    async fn apply(self, db: &Database, discount: &mut Discount) -> ApiResult<Targets> {
        let name = validate_name("name", &self.name)?;
        validate_discount_kind(self.discount_percentage_bps, self.fixed_price_cents)?;
        let active_at = self.active_at.unwrap_or(discount.active_at);
        validate_discount_window(active_at, self.active_until)?;
        validate_maximum_sold_quantity(self.maximum_sold_quantity)?;

        let product_ids = dedup(self.product_ids);
        let option_ids = dedup(self.option_ids);
        let products = db.products();
        require_all("productIds", &product_ids, &products.existing_ids(&product_ids).await?)?;
        require_all("optionIds", &option_ids, &products.existing_option_ids(&option_ids).await?)?;

        discount.slug = resolve_slug(self.slug, &name)?;
        discount.name = name;
        discount.description = clean(self.description);
        discount.discount_percentage_bps = self.discount_percentage_bps;
        discount.fixed_price_cents = self.fixed_price_cents;
        discount.active_at = active_at;
        discount.active_until = self.active_until;
        discount.maximum_sold_quantity = self.maximum_sold_quantity;
        discount.display_in_navbar = self.display_in_navbar;

        Ok(Targets {
            product_ids,
            option_ids,
        })
    }
}

async fn write_targets(
    db: &Database,
    tx: &mut Tx,
    discount_id: &str,
    targets: &Targets,
) -> ApiResult<()> {
    let discounts = db.discounts();
    discounts.set_products(&mut **tx, discount_id, &targets.product_ids).await?;
    discounts.set_options(&mut **tx, discount_id, &targets.option_ids).await?;
    Ok(())
}

pub async fn discount_create(
    db: &Database,
    actor: &User,
    input: DiscountInput,
) -> ApiResult<DiscountDetail> {
    let now = Utc::now();
    let mut discount = Discount {
        id: new_id(),
        name: String::new(),
        slug: String::new(),
        description: None,
        discount_percentage_bps: None,
        fixed_price_cents: None,
        active_at: now,
        active_until: None,
        maximum_sold_quantity: None,
        total_sold_quantity: 0,
        display_in_navbar: false,
        created_at: now,
        updated_at: now,
    };
    let targets = input.apply(db, &mut discount).await?;

    let mut tx = db.begin().await?;
    db.discounts().insert(&mut *tx, &discount).await?;
    write_targets(db, &mut tx, &discount.id, &targets).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Discount,
                &discount.id,
                LogAction::Create,
                format!("Created discount {}", discount.name),
            ),
        )
        .await?;
    commit(tx).await?;

    info!(
        id = %discount.id,
        slug = %discount.slug,
        products = targets.product_ids.len(),
        options = targets.option_ids.len(),
        "Discount created"
    );
    discount_detail(db, &discount.id).await
}

pub async fn discount_update(
    db: &Database,
    actor: &User,
    id: &str,
    input: DiscountInput,
) -> ApiResult<DiscountDetail> {
    let mut discount = found(db.discounts().get_by_id(id).await?, "Discount", id)?;
    let targets = input.apply(db, &mut discount).await?;
    discount.updated_at = Utc::now();

    let mut tx = db.begin().await?;
    db.discounts().update(&mut *tx, &discount).await?;
    write_targets(db, &mut tx, id, &targets).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Discount,
                id,
                LogAction::Update,
                format!("Updated discount {}", discount.name),
            ),
        )
        .await?;
    commit(tx).await?;

    discount_detail(db, id).await
}

pub async fn discount_delete(db: &Database, actor: &User, id: &str) -> ApiResult<()> {
    let discount = found(db.discounts().get_by_id(id).await?, "Discount", id)?;

    let mut tx = db.begin().await?;
    db.discounts().delete(&mut *tx, id).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Discount,
                id,
                LogAction::Delete,
                format!("Deleted discount {}", discount.name),
            ),
        )
        .await?;
    commit(tx).await?;

    info!(id, "Discount deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::products::product_detail;
    use crate::test_support::{self, option, product};
    use aria_core::ProductStatus;
    use axum::http::StatusCode;
    use chrono::Duration;

    fn input(name: &str) -> DiscountInput {
        DiscountInput {
            name: name.to_string(),
            slug: None,
            description: None,
            discount_percentage_bps: Some(2000),
            fixed_price_cents: None,
            active_at: None,
            active_until: None,
            maximum_sold_quantity: None,
            display_in_navbar: true,
            product_ids: vec![],
            option_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_targets_and_prices() {
        let db = test_support::db().await;
        let actor = test_support::superuser(&db).await;
        let supplier = test_support::supplier(&db, "Marazzi").await;
        let tile = product(&db, "hvit-flis", &supplier.id).await;
        let opt = option(&db, &tile.id, 10_000, ProductStatus::Available).await;

        let mut create = input("Høstsalg");
        create.product_ids = vec![tile.id.clone()];
        let detail = discount_create(&db, &actor, create).await.unwrap();
        assert_eq!(detail.summary.discount.slug, "hostsalg");
        assert!(detail.summary.is_active);
        assert_eq!(detail.product_ids, vec![tile.id.clone()]);

        let priced = product_detail(&db, &tile.id).await.unwrap();
        assert_eq!(priced.lowest_discounted_price_cents.map(|m| m.cents()), Some(8_000));

        // Retarget to the option with a fixed price
        let mut retarget = input("Høstsalg");
        retarget.discount_percentage_bps = None;
        retarget.fixed_price_cents = Some(5_000);
        retarget.option_ids = vec![opt.id.clone()];
        let detail = discount_update(&db, &actor, &detail.summary.discount.id, retarget)
            .await
            .unwrap();
        assert!(detail.product_ids.is_empty());
        assert_eq!(detail.option_ids, vec![opt.id.clone()]);

        let priced = product_detail(&db, &tile.id).await.unwrap();
        assert_eq!(priced.lowest_discounted_price_cents.map(|m| m.cents()), Some(5_000));

        discount_delete(&db, &actor, &detail.summary.discount.id).await.unwrap();
        let priced = product_detail(&db, &tile.id).await.unwrap();
        assert_eq!(priced.lowest_discounted_price_cents.map(|m| m.cents()), Some(10_000));
    }

    #[tokio::test]
    async fn test_invalid_discounts() {
        let db = test_support::db().await;
        let actor = test_support::superuser(&db).await;

        let mut both = input("Begge");
        both.fixed_price_cents = Some(100);
        let err = discount_create(&db, &actor, both).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let mut backwards = input("Baklengs");
        let now = Utc::now();
        backwards.active_at = Some(now);
        backwards.active_until = Some(now - Duration::days(1));
        assert_eq!(
            discount_create(&db, &actor, backwards).await.unwrap_err().status,
            StatusCode::BAD_REQUEST
        );

        let mut unknown = input("Ukjent");
        unknown.option_ids = vec!["missing".to_string()];
        let err = discount_create(&db, &actor, unknown).await.unwrap_err();
        assert!(err.errors.unwrap().contains_key("optionIds"));

        assert_eq!(db.discounts().count(None).await.unwrap(), 0);
    }
}
