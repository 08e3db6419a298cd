//! Boundary validation: loosely shaped offer payloads → [`Offer`].
//!
//! Offer storage hands over records whose fields depend on the offer type.
//! Every field the chosen type needs must be present and well formed; a bad
//! record is rejected with `DomainError::Validation` instead of being patched
//! with defaults.

use serde::{Deserialize, Serialize};

use orderkit_core::{DomainError, DomainResult};
use orderkit_products::ProductId;

use crate::offer::{BuyGet, Discount, Offer, OfferId, OfferKind, ProductDiscount, RegularDiscount};
use crate::percent::Percent;

/// Offer payload as stored by the offer-authoring system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    /// `buy_get`, `product_discount` or `regular_discount`.
    pub offer_type: Option<String>,
    /// Absent means active.
    pub is_active: Option<bool>,

    pub linked_product_id: Option<String>,
    pub buy_quantity: Option<i64>,
    pub get_product_id: Option<String>,
    pub get_discount_type: Option<String>,
    pub get_discount_value: Option<f64>,
    /// Absent means one unit per trigger.
    pub per_trigger_qty: Option<i64>,

    pub affected_product_ids: Option<Vec<String>>,
    pub discount_type: Option<String>,
    pub discount_value: Option<f64>,
}

/// Validate a whole offer catalog, failing on the first malformed record.
pub fn validate_catalog(records: impl IntoIterator<Item = OfferRecord>) -> DomainResult<Vec<Offer>> {
    records.into_iter().map(Offer::try_from).collect()
}

impl TryFrom<OfferRecord> for Offer {
    type Error = DomainError;

    fn try_from(record: OfferRecord) -> Result<Self, Self::Error> {
        let id: OfferId = required(&record.id, "id")?.parse()?;
        let ctx = |msg: String| DomainError::validation(format!("offer {id}: {msg}"));

        let name = required(&record.name, "name").map_err(|e| ctx(e.to_string()))?;
        if name.trim().is_empty() {
            return Err(ctx("name cannot be empty".into()));
        }

        let offer_type = required(&record.offer_type, "offer_type").map_err(|e| ctx(e.to_string()))?;
        let kind = match offer_type.as_str() {
            "buy_get" => OfferKind::BuyGet(buy_get(&record).map_err(|e| ctx(e.to_string()))?),
            "product_discount" => {
                let ids = record
                    .affected_product_ids
                    .as_ref()
                    .filter(|ids| !ids.is_empty())
                    .ok_or_else(|| ctx("affected_product_ids must list at least one product".into()))?;
                let affected_product_ids = ids
                    .iter()
                    .map(|s| s.parse::<ProductId>())
                    .collect::<DomainResult<Vec<_>>>()?;
                let discount = flat_discount(&record).map_err(|e| ctx(e.to_string()))?;
                OfferKind::ProductDiscount(ProductDiscount {
                    affected_product_ids,
                    discount,
                })
            }
            "regular_discount" => OfferKind::RegularDiscount(RegularDiscount {
                discount: flat_discount(&record).map_err(|e| ctx(e.to_string()))?,
            }),
            other => return Err(ctx(format!("unknown offer_type '{other}'"))),
        };

        Ok(Offer {
            id,
            name: name.clone(),
            active: record.is_active.unwrap_or(true),
            kind,
        })
    }
}

fn required<'a, T>(field: &'a Option<T>, name: &str) -> DomainResult<&'a T> {
    field
        .as_ref()
        .ok_or_else(|| DomainError::validation(format!("missing field '{name}'")))
}

fn positive_qty(value: i64, name: &str) -> DomainResult<u32> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| DomainError::validation(format!("{name} must be a positive integer, got {value}")))
}

fn buy_get(record: &OfferRecord) -> DomainResult<BuyGet> {
    let linked_product_id = required(&record.linked_product_id, "linked_product_id")?.parse()?;
    let get_product_id = required(&record.get_product_id, "get_product_id")?.parse()?;
    let buy_quantity = positive_qty(*required(&record.buy_quantity, "buy_quantity")?, "buy_quantity")?;
    let per_trigger_qty = match record.per_trigger_qty {
        Some(v) => positive_qty(v, "per_trigger_qty")?,
        None => 1,
    };
    let get_discount = discount(
        required(&record.get_discount_type, "get_discount_type")?,
        record.get_discount_value,
    )?;

    Ok(BuyGet {
        linked_product_id,
        buy_quantity,
        get_product_id,
        get_discount,
        per_trigger_qty,
    })
}

fn flat_discount(record: &OfferRecord) -> DomainResult<Discount> {
    let discount = discount(
        required(&record.discount_type, "discount_type")?,
        record.discount_value,
    )?;
    if discount.is_free() {
        return Err(DomainError::validation(
            "flat discounts must be percentage or fixed",
        ));
    }
    Ok(discount)
}

fn discount(kind: &str, value: Option<f64>) -> DomainResult<Discount> {
    match kind {
        "free" => Ok(Discount::Free),
        "percentage" => {
            let value = value.ok_or_else(|| DomainError::validation("percentage discount needs a value"))?;
            let pct = Percent::from_f64(value)?;
            if pct.basis_points() == 0 {
                return Err(DomainError::validation("percentage discount must be greater than 0"));
            }
            Ok(Discount::Percentage(pct))
        }
        "fixed" => {
            let value = value.ok_or_else(|| DomainError::validation("fixed discount needs a value"))?;
            if !value.is_finite() || value <= 0.0 || value.fract() != 0.0 {
                return Err(DomainError::validation(format!(
                    "fixed discount must be a positive whole amount of minor units, got {value}"
                )));
            }
            Ok(Discount::Fixed(value as u64))
        }
        other => Err(DomainError::validation(format!("unknown discount type '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFER: &str = "00000000-0000-0000-0000-00000000000a";
    const P1: &str = "00000000-0000-0000-0000-000000000001";
    const P2: &str = "00000000-0000-0000-0000-000000000002";

    fn buy_get_record() -> OfferRecord {
        OfferRecord {
            id: Some(OFFER.into()),
            name: Some("Buy 3 get 1".into()),
            offer_type: Some("buy_get".into()),
            linked_product_id: Some(P1.into()),
            buy_quantity: Some(3),
            get_product_id: Some(P2.into()),
            get_discount_type: Some("free".into()),
            ..OfferRecord::default()
        }
    }

    #[test]
    fn valid_buy_get_record_becomes_typed_offer() {
        let offer = Offer::try_from(buy_get_record()).unwrap();
        assert!(offer.active);
        let bg = offer.free_buy_get().unwrap();
        assert_eq!(bg.buy_quantity, 3);
        assert_eq!(bg.per_trigger_qty, 1);
        assert_eq!(bg.get_product_id, ProductId::from_u128(2));
    }

    #[test]
    fn missing_buy_quantity_is_a_validation_error() {
        let record = OfferRecord {
            buy_quantity: None,
            ..buy_get_record()
        };
        let err = Offer::try_from(record).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("buy_quantity")));
    }

    #[test]
    fn zero_or_negative_quantities_are_rejected() {
        for bad in [0, -2] {
            let record = OfferRecord {
                buy_quantity: Some(bad),
                ..buy_get_record()
            };
            assert!(Offer::try_from(record).is_err());
        }
    }

    #[test]
    fn product_discount_requires_products_and_non_free_discount() {
        let base = OfferRecord {
            id: Some(OFFER.into()),
            name: Some("10% off".into()),
            offer_type: Some("product_discount".into()),
            affected_product_ids: Some(vec![P1.into()]),
            discount_type: Some("percentage".into()),
            discount_value: Some(10.0),
            ..OfferRecord::default()
        };
        assert!(Offer::try_from(base.clone()).is_ok());

        let no_products = OfferRecord {
            affected_product_ids: Some(vec![]),
            ..base.clone()
        };
        assert!(Offer::try_from(no_products).is_err());

        let free = OfferRecord {
            discount_type: Some("free".into()),
            ..base
        };
        assert!(Offer::try_from(free).is_err());
    }

    #[test]
    fn fractional_fixed_amount_is_rejected() {
        let record = OfferRecord {
            id: Some(OFFER.into()),
            name: Some("x".into()),
            offer_type: Some("regular_discount".into()),
            discount_type: Some("fixed".into()),
            discount_value: Some(2.5),
            ..OfferRecord::default()
        };
        assert!(Offer::try_from(record).is_err());
    }

    #[test]
    fn unknown_offer_type_names_the_offer() {
        let record = OfferRecord {
            offer_type: Some("bundle".into()),
            ..buy_get_record()
        };
        let err = Offer::try_from(record).unwrap_err();
        assert!(err.to_string().contains(OFFER));
    }

    #[test]
    fn catalog_validation_fails_fast() {
        let bad = OfferRecord {
            get_discount_type: Some("bogus".into()),
            ..buy_get_record()
        };
        assert!(validate_catalog(vec![buy_get_record(), bad]).is_err());
        assert_eq!(validate_catalog(vec![buy_get_record()]).unwrap().len(), 1);
    }

    #[test]
    fn records_deserialize_from_loose_json() {
        let record: OfferRecord = serde_json::from_value(serde_json::json!({
            "id": OFFER,
            "name": "Weekend",
            "offer_type": "regular_discount",
            "discount_type": "percentage",
            "discount_value": 5,
            "unexpected": true
        }))
        .unwrap();
        let offer = Offer::try_from(record).unwrap();
        assert!(offer.flat_discount().is_some());
    }
}
