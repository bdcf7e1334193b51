//! Supplier reads.

use serde::Serialize;

use aria_core::Supplier;
use aria_db::Database;

use super::found;
use crate::error::ApiResult;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierDetail {
    #[serde(flatten)]
    pub supplier: Supplier,
    pub product_count: i64,
    pub kitchen_count: i64,
}

pub async fn supplier_list(
    db: &Database,
    search: Option<&str>,
    is_active: Option<bool>,
    limit: i64,
    offset: i64,
) -> ApiResult<(Vec<Supplier>, i64)> {
    let suppliers = db.suppliers();
    Ok((
        suppliers.list(search, is_active, limit, offset).await?,
        suppliers.count(search, is_active).await?,
    ))
}

pub async fn supplier_detail(db: &Database, id: &str) -> ApiResult<SupplierDetail> {
    let suppliers = db.suppliers();
    let supplier = found(suppliers.get_by_id(id).await?, "Supplier", id)?;
    let (product_count, kitchen_count) = suppliers.dependents(id).await?;

    Ok(SupplierDetail {
        supplier,
        product_count,
        kitchen_count,
    })
}
