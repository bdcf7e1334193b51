//! Discount reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aria_core::Discount;
use aria_db::Database;

use super::found;
use crate::error::ApiResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountSummary {
    #[serde(flatten)]
    pub discount: Discount,
    pub is_active: bool,
}

impl DiscountSummary {
    pub fn at(discount: Discount, now: DateTime<Utc>) -> Self {
        let is_active = discount.has_price_rule() && discount.is_active_at(now);
        DiscountSummary { discount, is_active }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountDetail {
    #[serde(flatten)]
    pub summary: DiscountSummary,
    pub product_ids: Vec<String>,
    pub option_ids: Vec<String>,
}

/// A running campaign and every product it reaches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontDiscount {
    #[serde(flatten)]
    pub discount: Discount,
    pub product_ids: Vec<String>,
}

pub async fn discount_list(
    db: &Database,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> ApiResult<(Vec<DiscountSummary>, i64)> {
    let discounts = db.discounts();
    let now = Utc::now();

    let rows = discounts.list(search, limit, offset).await?;
    let count = discounts.count(search).await?;

    Ok((
        rows.into_iter().map(|d| DiscountSummary::at(d, now)).collect(),
        count,
    ))
}

pub async fn discount_detail(db: &Database, id: &str) -> ApiResult<DiscountDetail> {
    let discounts = db.discounts();
    let discount = found(discounts.get_by_id(id).await?, "Discount", id)?;

    Ok(DiscountDetail {
        product_ids: discounts.product_ids(id).await?,
        option_ids: discounts.option_ids(id).await?,
        summary: DiscountSummary::at(discount, Utc::now()),
    })
}

/// Discounts running at `now`, newest first.
pub async fn active_discounts(db: &Database, now: DateTime<Utc>) -> ApiResult<Vec<FrontDiscount>> {
    let discounts = db.discounts();

    let mut active = Vec::new();
    for discount in discounts.list_all().await? {
        if !(discount.has_price_rule() && discount.is_active_at(now)) {
            continue;
        }
        active.push(FrontDiscount {
            product_ids: discounts.reached_product_ids(&discount.id).await?,
            discount,
        });
    }

    Ok(active)
}
