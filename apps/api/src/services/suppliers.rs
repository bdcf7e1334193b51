//! Supplier mutations.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use aria_core::validation::{validate_email, validate_name};
use aria_core::{CoreError, LogAction, ResourceType, Supplier, User};
use aria_db::Database;

use super::{clean, commit, log_entry, new_id};
use crate::error::ApiResult;
use crate::selectors::found;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInput {
    pub name: String,
    #[serde(default)]
    pub contact_first_name: Option<String>,
    #[serde(default)]
    pub contact_last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub origin_country: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default = "crate::services::default_true")]
    pub is_active: bool,
}

impl SupplierInput {
    /// Validated and trimmed copy applied onto `supplier`.
    fn apply(self, supplier: &mut Supplier) -> ApiResult<()> {
        supplier.name = validate_name("name", &self.name)?;
        supplier.email = clean(self.email).map(|e| validate_email(&e)).transpose()?;
        supplier.contact_first_name = clean(self.contact_first_name);
        supplier.contact_last_name = clean(self.contact_last_name);
        supplier.phone = clean(self.phone);
        supplier.origin_country = clean(self.origin_country);
        supplier.website = clean(self.website);
        supplier.is_active = self.is_active;
        Ok(())
    }
}

pub async fn supplier_create(
    db: &Database,
    actor: &User,
    input: SupplierInput,
) -> ApiResult<Supplier> {
    let now = Utc::now();
    let mut supplier = Supplier {
        id: new_id(),
        name: String::new(),
        contact_first_name: None,
        contact_last_name: None,
        email: None,
        phone: None,
        origin_country: None,
        website: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    input.apply(&mut supplier)?;

    let mut tx = db.begin().await?;
    db.suppliers().insert(&mut *tx, &supplier).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Supplier,
                &supplier.id,
                LogAction::Create,
                format!("Created supplier {}", supplier.name),
            ),
        )
        .await?;
    commit(tx).await?;

    info!(id = %supplier.id, name = %supplier.name, "Supplier created");
    Ok(supplier)
}

pub async fn supplier_update(
    db: &Database,
    actor: &User,
    id: &str,
    input: SupplierInput,
) -> ApiResult<Supplier> {
    let mut supplier = found(db.suppliers().get_by_id(id).await?, "Supplier", id)?;
    input.apply(&mut supplier)?;
    supplier.updated_at = Utc::now();

    let mut tx = db.begin().await?;
    db.suppliers().update(&mut *tx, &supplier).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Supplier,
                id,
                LogAction::Update,
                format!("Updated supplier {}", supplier.name),
            ),
        )
        .await?;
    commit(tx).await?;

    Ok(supplier)
}

/// Deletes a supplier nothing references any more.
pub async fn supplier_delete(db: &Database, actor: &User, id: &str) -> ApiResult<()> {
    let suppliers = db.suppliers();
    let supplier = found(suppliers.get_by_id(id).await?, "Supplier", id)?;

    let (products, kitchens) = suppliers.dependents(id).await?;
    if products > 0 || kitchens > 0 {
        return Err(CoreError::Conflict(format!(
            "Supplier {} still has {products} product(s) and {kitchens} kitchen(s)",
            supplier.name
        ))
        .into());
    }

    let mut tx = db.begin().await?;
    suppliers.delete(&mut *tx, id).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Supplier,
                id,
                LogAction::Delete,
                format!("Deleted supplier {}", supplier.name),
            ),
        )
        .await?;
    commit(tx).await?;

    info!(id, "Supplier deleted");
    Ok(())
}
