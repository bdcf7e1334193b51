//! # Discount Resolution
//!
//! Decides which discount applies to a product option and what it costs.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ProductOption (gross 499.00)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  discounts attached to THIS option ── first active? ──► use it         │
//! │       │ none                                                            │
//! │       ▼                                                                 │
//! │  discounts attached to the PRODUCT ── first active? ──► use it         │
//! │       │ none                                                            │
//! │       ▼                                                                 │
//! │  no discount: price stays 499.00                                       │
//! │                                                                         │
//! │  Applying a discount:                                                  │
//! │    fixed price set  → fixed price                                      │
//! │    percentage set   → price * (1 - pct), ROUND_HALF_UP to cents        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! "First" means newest campaign first: candidates are ordered by
//! `created_at` descending, ties broken by id, so the answer never depends
//! on the order rows came back from the database.

use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Discount, ProductOption};

// =============================================================================
// Single Discount Rules
// =============================================================================

impl Discount {
    /// Whether the discount is running at `now`.
    ///
    /// ## Rules
    /// - started: `active_at <= now`
    /// - not ended: `active_until` is unset or `now < active_until`
    /// - not sold out: `maximum_sold_quantity` is unset or
    ///   `total_sold_quantity < maximum_sold_quantity`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if self.active_at > now {
            return false;
        }

        if let Some(until) = self.active_until {
            if now >= until {
                return false;
            }
        }

        if let Some(maximum) = self.maximum_sold_quantity {
            if self.total_sold_quantity >= maximum {
                return false;
            }
        }

        true
    }

    /// Price after this discount, or `None` when the discount carries
    /// neither a fixed price nor a percentage.
    ///
    /// A fixed price wins over a percentage when both are (wrongly) set.
    pub fn discounted_price(&self, price: Money) -> Option<Money> {
        if let Some(fixed) = self.fixed_price_cents {
            return Some(Money::from_cents(fixed));
        }

        self.discount_percentage_bps
            .map(|bps| price.apply_percentage_discount(bps))
    }

    /// Whether this discount can produce a price at all.
    pub fn has_price_rule(&self) -> bool {
        self.fixed_price_cents.is_some() || self.discount_percentage_bps.is_some()
    }
}

// =============================================================================
// Picking a Discount
// =============================================================================

/// Returns the first active discount with a price rule, newest first.
pub fn first_active<'a>(discounts: &'a [Discount], now: DateTime<Utc>) -> Option<&'a Discount> {
    discounts
        .iter()
        .filter(|d| d.has_price_rule() && d.is_active_at(now))
        .max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                // reversed so the smallest id wins a created_at tie
                .then_with(|| b.id.cmp(&a.id))
        })
}

/// Resolves the discount for one option.
///
/// Option-level discounts are consulted first; product-level discounts only
/// when no option-level discount is active.
pub fn resolve_option_discount<'a>(
    option_discounts: &'a [Discount],
    product_discounts: &'a [Discount],
    now: DateTime<Utc>,
) -> Option<&'a Discount> {
    first_active(option_discounts, now).or_else(|| first_active(product_discounts, now))
}

// =============================================================================
// Priced Options
// =============================================================================

/// The outcome of pricing one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedOption {
    pub option_id: String,
    pub gross_price: Money,
    /// `None` when no discount applies.
    pub discounted_gross_price: Option<Money>,
    pub discount_id: Option<String>,
    pub available: bool,
}

impl PricedOption {
    /// What the customer actually pays.
    pub fn effective_price(&self) -> Money {
        self.discounted_gross_price.unwrap_or(self.gross_price)
    }
}

/// Prices an option against its own and its product's discounts.
///
/// ## Example
/// ```rust,ignore
/// let priced = price_option(&option, &option_discounts, &product_discounts, Utc::now());
/// println!("{} → {:?}", priced.gross_price, priced.discounted_gross_price);
/// ```
pub fn price_option(
    option: &ProductOption,
    option_discounts: &[Discount],
    product_discounts: &[Discount],
    now: DateTime<Utc>,
) -> PricedOption {
    let gross_price = option.gross_price();
    let discount = resolve_option_discount(option_discounts, product_discounts, now);

    PricedOption {
        option_id: option.id.clone(),
        gross_price,
        discounted_gross_price: discount.and_then(|d| d.discounted_price(gross_price)),
        discount_id: discount.map(|d| d.id.clone()),
        available: option.is_available(),
    }
}

/// Lowest undiscounted price among available options.
pub fn lowest_price(options: &[PricedOption]) -> Option<Money> {
    options
        .iter()
        .filter(|o| o.available)
        .map(|o| o.gross_price)
        .min()
}

/// Lowest price a customer can pay among available options.
///
/// Options without a discount contribute their gross price.
pub fn lowest_discounted_price(options: &[PricedOption]) -> Option<Money> {
    options
        .iter()
        .filter(|o| o.available)
        .map(PricedOption::effective_price)
        .min()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductStatus;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn discount(id: &str, pct: Option<i64>, fixed: Option<i64>) -> Discount {
        Discount {
            id: id.to_string(),
            name: format!("Campaign {id}"),
            slug: format!("campaign-{id}"),
            description: None,
            discount_percentage_bps: pct,
            fixed_price_cents: fixed,
            active_at: now() - Duration::days(1),
            active_until: Some(now() + Duration::days(1)),
            maximum_sold_quantity: None,
            total_sold_quantity: 0,
            display_in_navbar: false,
            created_at: now() - Duration::days(2),
            updated_at: now() - Duration::days(2),
        }
    }

    fn option(id: &str, price: i64, status: ProductStatus) -> ProductOption {
        ProductOption {
            id: id.to_string(),
            product_id: "product".to_string(),
            variant_id: None,
            size_id: None,
            gross_price_cents: price,
            status,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_activity_window_boundaries() {
        let mut d = discount("a", Some(1000), None);

        d.active_at = now();
        assert!(d.is_active_at(now()), "starts inclusively");

        d.active_until = Some(now());
        assert!(!d.is_active_at(now()), "ends exclusively");

        d.active_until = None;
        assert!(d.is_active_at(now() + Duration::days(365)), "open-ended");

        d.active_at = now() + Duration::seconds(1);
        assert!(!d.is_active_at(now()), "not started");
    }

    #[test]
    fn test_quantity_cap() {
        let mut d = discount("a", Some(1000), None);
        d.maximum_sold_quantity = Some(10);
        d.total_sold_quantity = 9;
        assert!(d.is_active_at(now()));

        d.total_sold_quantity = 10;
        assert!(!d.is_active_at(now()));
    }

    #[test]
    fn test_fixed_price_overrides_percentage() {
        let d = discount("a", Some(5000), Some(19900));
        assert_eq!(
            d.discounted_price(Money::from_cents(49900)),
            Some(Money::from_cents(19900))
        );
    }

    #[test]
    fn test_percentage_price_is_rounded_half_up() {
        let d = discount("a", Some(5000), None);
        assert_eq!(
            d.discounted_price(Money::from_cents(125)),
            Some(Money::from_cents(63))
        );
    }

    #[test]
    fn test_discount_without_rule_never_matches() {
        let empty = discount("a", None, None);
        assert_eq!(empty.discounted_price(Money::from_cents(100)), None);
        assert!(first_active(&[empty], now()).is_none());
    }

    #[test]
    fn test_first_active_prefers_newest() {
        let old = discount("old", Some(1000), None);
        let mut new = discount("new", Some(2000), None);
        new.created_at = now() - Duration::hours(1);
        let mut expired = discount("expired", Some(9000), None);
        expired.created_at = now();
        expired.active_until = Some(now() - Duration::hours(1));

        let all = [old, new, expired];
        assert_eq!(first_active(&all, now()).map(|d| d.id.as_str()), Some("new"));
    }

    #[test]
    fn test_first_active_tie_breaks_on_id() {
        let a = discount("a", Some(1000), None);
        let b = discount("b", Some(2000), None);
        assert_eq!(first_active(&[b.clone(), a.clone()], now()).map(|d| d.id.as_str()), Some("a"));
        assert_eq!(first_active(&[a, b], now()).map(|d| d.id.as_str()), Some("a"));
    }

    #[test]
    fn test_option_discount_beats_product_discount() {
        let opt = option("o1", 10000, ProductStatus::Available);
        let option_level = [discount("opt", None, Some(5000))];
        let product_level = [discount("prod", Some(1000), None)];

        let priced = price_option(&opt, &option_level, &product_level, now());
        assert_eq!(priced.discounted_gross_price, Some(Money::from_cents(5000)));
        assert_eq!(priced.discount_id.as_deref(), Some("opt"));
    }

    #[test]
    fn test_product_discount_used_when_option_discount_inactive() {
        let opt = option("o1", 10000, ProductStatus::Available);
        let mut inactive = discount("opt", None, Some(5000));
        inactive.active_at = now() + Duration::days(3);
        let product_level = [discount("prod", Some(1000), None)];

        let priced = price_option(&opt, &[inactive], &product_level, now());
        assert_eq!(priced.discounted_gross_price, Some(Money::from_cents(9000)));
        assert_eq!(priced.discount_id.as_deref(), Some("prod"));
    }

    #[test]
    fn test_lowest_prices_skip_unavailable_options() {
        let product_level = [discount("prod", Some(5000), None)];
        let priced: Vec<PricedOption> = vec![
            option("cheap-hidden", 100, ProductStatus::Hidden),
            option("mid", 20000, ProductStatus::Available),
            option("high", 30000, ProductStatus::Available),
        ]
        .iter()
        .map(|o| price_option(o, &[], &product_level, now()))
        .collect();

        assert_eq!(lowest_price(&priced), Some(Money::from_cents(20000)));
        assert_eq!(lowest_discounted_price(&priced), Some(Money::from_cents(10000)));
    }

    #[test]
    fn test_lowest_discounted_price_mixes_discounted_and_plain() {
        let opt_a = option("a", 10000, ProductStatus::Available);
        let opt_b = option("b", 6000, ProductStatus::Available);
        let on_a = [discount("only-a", Some(5000), None)];

        let priced = vec![
            price_option(&opt_a, &on_a, &[], now()),
            price_option(&opt_b, &[], &[], now()),
        ];
        assert_eq!(lowest_price(&priced), Some(Money::from_cents(6000)));
        assert_eq!(lowest_discounted_price(&priced), Some(Money::from_cents(5000)));
    }

    #[test]
    fn test_no_options_no_price() {
        assert_eq!(lowest_price(&[]), None);
        assert_eq!(lowest_discounted_price(&[]), None);
    }
}
