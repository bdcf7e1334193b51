//! Kitchen reads.

use serde::Serialize;

use aria_core::{Kitchen, ProductStatus, Supplier};
use aria_db::Database;

use super::found;
use crate::error::ApiResult;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenDetail {
    #[serde(flatten)]
    pub kitchen: Kitchen,
    pub supplier: Option<Supplier>,
}

pub async fn kitchen_list(
    db: &Database,
    search: Option<&str>,
    status: Option<ProductStatus>,
    supplier_id: Option<&str>,
    limit: i64,
    offset: i64,
) -> ApiResult<(Vec<Kitchen>, i64)> {
    let kitchens = db.kitchens();
    Ok((
        kitchens.list(search, status, supplier_id, limit, offset).await?,
        kitchens.count(search, status, supplier_id).await?,
    ))
}

/// With `available_only`, anything not available reads as missing.
pub async fn kitchen_detail(
    db: &Database,
    id: &str,
    available_only: bool,
) -> ApiResult<KitchenDetail> {
    let kitchen = db
        .kitchens()
        .get_by_id(id)
        .await?
        .filter(|k| !available_only || k.status == ProductStatus::Available);
    let kitchen = found(kitchen, "Kitchen", id)?;

    Ok(KitchenDetail {
        supplier: db.suppliers().get_by_id(&kitchen.supplier_id).await?,
        kitchen,
    })
}
