//! Product Catalog
//!
//! Static mapping from the opaque product SKUs sold at checkout to the
//! entitlement identifiers the entitlement backend knows about. Multi-pay
//! installment SKUs resolve to the same entitlement as their one-time
//! siblings; only the grant-window policy differs.

use serde::{Deserialize, Serialize};

/// Billing period attached to a subscription purchase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    Monthly,
    Annual,
}

impl BillingPeriod {
    /// Parse the period strings the pricing frontend sends.
    ///
    /// Both `"annually"` and `"annual"` appear in the wild; anything else
    /// is treated as monthly.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "annually" | "annual" | "yearly" => BillingPeriod::Annual,
            _ => BillingPeriod::Monthly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Monthly => "monthly",
            BillingPeriod::Annual => "annual",
        }
    }

    /// ISO-8601 duration label used in response bodies
    pub fn iso_duration(&self) -> &'static str {
        match self {
            BillingPeriod::Monthly => "P1M",
            BillingPeriod::Annual => "P1Y",
        }
    }
}

impl Default for BillingPeriod {
    fn default() -> Self {
        BillingPeriod::Monthly
    }
}

/// How a product is paid for, which decides its grant window
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseKind {
    /// Recurring subscription, renewed by the billing provider
    Subscription,
    /// Single payment, lifetime access
    OneTime,
    /// Fixed number of installments; converted to lifetime after the last one
    MultiPay,
}

/// A catalog entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Product {
    pub sku: &'static str,
    pub entitlement_id: &'static str,
    pub kind: PurchaseKind,
}

const CATALOG: &[Product] = &[
    Product {
        sku: "prod_live",
        entitlement_id: "prod_live",
        kind: PurchaseKind::Subscription,
    },
    Product {
        sku: "prod_premium",
        entitlement_id: "prod_premium",
        kind: PurchaseKind::Subscription,
    },
    Product {
        sku: "prod_elite",
        entitlement_id: "prod_elite",
        kind: PurchaseKind::Subscription,
    },
    Product {
        sku: "prod_mastery",
        entitlement_id: "prod_mastery",
        kind: PurchaseKind::OneTime,
    },
    Product {
        sku: "mastery_multi_pay",
        entitlement_id: "prod_mastery",
        kind: PurchaseKind::MultiPay,
    },
    Product {
        sku: "prod_coach",
        entitlement_id: "prod_coach",
        kind: PurchaseKind::OneTime,
    },
    Product {
        sku: "coach_multi_pay",
        entitlement_id: "prod_coach",
        kind: PurchaseKind::MultiPay,
    },
];

/// Look up a product by SKU. Unknown SKUs are a caller validation error.
pub fn lookup_product(sku: &str) -> Option<&'static Product> {
    CATALOG.iter().find(|p| p.sku == sku)
}

/// The SKUs eligible for multi-pay-to-lifetime conversion
pub fn multi_pay_skus() -> impl Iterator<Item = &'static str> {
    CATALOG
        .iter()
        .filter(|p| p.kind == PurchaseKind::MultiPay)
        .map(|p| p.sku)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parsing() {
        assert_eq!(BillingPeriod::parse("monthly"), BillingPeriod::Monthly);
        assert_eq!(BillingPeriod::parse("annually"), BillingPeriod::Annual);
        assert_eq!(BillingPeriod::parse("annual"), BillingPeriod::Annual);
        assert_eq!(BillingPeriod::parse("ANNUAL"), BillingPeriod::Annual);
        // Unknown or absent periods fall back to monthly, the shorter grant
        assert_eq!(BillingPeriod::parse("weekly"), BillingPeriod::Monthly);
        assert_eq!(BillingPeriod::parse("year"), BillingPeriod::Monthly);
        assert_eq!(BillingPeriod::parse(""), BillingPeriod::Monthly);
    }

    #[test]
    fn test_multi_pay_resolves_to_sibling_entitlement() {
        let one_time = lookup_product("prod_mastery").unwrap();
        let multi = lookup_product("mastery_multi_pay").unwrap();
        assert_eq!(one_time.entitlement_id, multi.entitlement_id);
        assert_eq!(one_time.kind, PurchaseKind::OneTime);
        assert_eq!(multi.kind, PurchaseKind::MultiPay);
    }

    #[test]
    fn test_unknown_sku() {
        assert!(lookup_product("prod_unknown").is_none());
    }

    #[test]
    fn test_multi_pay_skus() {
        let skus: Vec<_> = multi_pay_skus().collect();
        assert_eq!(skus, vec!["mastery_multi_pay", "coach_multi_pay"]);
    }
}
