//! Kitchen mutations.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use aria_core::validation::{validate_name, validate_price_range};
use aria_core::{Kitchen, LogAction, ProductStatus, ResourceType, User};
use aria_db::Database;

use super::{clean, commit, log_entry, new_id, resolve_slug};
use crate::error::{ApiResult, ApplicationError};
use crate::selectors::found;
use crate::selectors::kitchens::{kitchen_detail, KitchenDetail};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub supplier_id: String,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub extra_description: Option<String>,
    #[serde(default)]
    pub price_range_min_cents: Option<i64>,
    #[serde(default)]
    pub price_range_max_cents: Option<i64>,
}

impl KitchenInput {
    async fn apply(self, db: &Database, kitchen: &mut Kitchen) -> ApiResult<()> {
        let name = validate_name("name", &self.name)?;
        validate_price_range(self.price_range_min_cents, self.price_range_max_cents)?;

        if db.suppliers().get_by_id(&self.supplier_id).await?.is_none() {
            return Err(ApplicationError::validation("Supplier does not exist")
                .with_field("supplierId", "does not exist"));
        }

        kitchen.slug = resolve_slug(self.slug, &name)?;
        kitchen.name = name;
        kitchen.supplier_id = self.supplier_id;
        kitchen.status = self.status;
        kitchen.description = clean(self.description);
        kitchen.extra_description = clean(self.extra_description);
        kitchen.price_range_min_cents = self.price_range_min_cents;
        kitchen.price_range_max_cents = self.price_range_max_cents;
        Ok(())
    }
}

pub async fn kitchen_create(
    db: &Database,
    actor: &User,
    input: KitchenInput,
) -> ApiResult<KitchenDetail> {
    let now = Utc::now();
    let mut kitchen = Kitchen {
        id: new_id(),
        name: String::new(),
        slug: String::new(),
        supplier_id: String::new(),
        status: ProductStatus::Draft,
        description: None,
        extra_description: None,
        price_range_min_cents: None,
        price_range_max_cents: None,
        created_at: now,
        updated_at: now,
    };
    input.apply(db, &mut kitchen).await?;

    let mut tx = db.begin().await?;
    db.kitchens().insert(&mut *tx, &kitchen).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Kitchen,
                &kitchen.id,
                LogAction::Create,
                format!("Created kitchen {}", kitchen.name),
            ),
        )
        .await?;
    commit(tx).await?;

    info!(id = %kitchen.id, slug = %kitchen.slug, "Kitchen created");
    kitchen_detail(db, &kitchen.id, false).await
}

pub async fn kitchen_update(
    db: &Database,
    actor: &User,
    id: &str,
    input: KitchenInput,
) -> ApiResult<KitchenDetail> {
    let mut kitchen = found(db.kitchens().get_by_id(id).await?, "Kitchen", id)?;
    input.apply(db, &mut kitchen).await?;
    kitchen.updated_at = Utc::now();

    let mut tx = db.begin().await?;
    db.kitchens().update(&mut *tx, &kitchen).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Kitchen,
                id,
                LogAction::Update,
                format!("Updated kitchen {}", kitchen.name),
            ),
        )
        .await?;
    commit(tx).await?;

    kitchen_detail(db, id, false).await
}

pub async fn kitchen_delete(db: &Database, actor: &User, id: &str) -> ApiResult<()> {
    let kitchen = found(db.kitchens().get_by_id(id).await?, "Kitchen", id)?;

    let mut tx = db.begin().await?;
    db.kitchens().delete(&mut *tx, id).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Kitchen,
                id,
                LogAction::Delete,
                format!("Deleted kitchen {}", kitchen.name),
            ),
        )
        .await?;
    commit(tx).await?;

    info!(id, "Kitchen deleted");
    Ok(())
}
