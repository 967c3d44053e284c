pub mod resolver;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::selection::{RateCardId, SelectionFingerprint};

/// GST is a fixed 18% of the pre-tax amount in this domain.
pub fn gst_rate() -> Decimal {
    Decimal::new(18, 2)
}

/// Two-decimal money rounding, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn gst_amount(pre_tax: Decimal) -> Decimal {
    round_money(pre_tax * gst_rate())
}

/// Raw amounts from the remote pricing function. `item_total` and
/// `gst_amount` are optional so a provider-supplied adjustment can override
/// the local derivation; absent, they derive from `base_price` and quantity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePrice {
    pub base_price: Decimal,
    pub item_total: Option<Decimal>,
    pub gst_amount: Option<Decimal>,
    pub convenience_charge: Decimal,
    pub rate_card_id: Option<RateCardId>,
}

/// Authoritative computed price for one specific selection, tagged with the
/// fingerprint of the selection that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub base_price: Decimal,
    pub item_total: Decimal,
    pub gst_amount: Decimal,
    pub convenience_charge: Decimal,
    pub final_amount: Decimal,
    pub rate_card_id: Option<RateCardId>,
    pub fingerprint: SelectionFingerprint,
}

impl PriceQuote {
    pub fn from_remote(
        remote: RemotePrice,
        quantity: u32,
        fingerprint: SelectionFingerprint,
    ) -> Self {
        let item_total =
            remote.item_total.unwrap_or_else(|| remote.base_price * Decimal::from(quantity));
        let gst = remote.gst_amount.unwrap_or_else(|| gst_amount(item_total));
        let final_amount = round_money(item_total + gst + remote.convenience_charge);

        Self {
            base_price: remote.base_price,
            item_total,
            gst_amount: gst,
            convenience_charge: remote.convenience_charge,
            final_amount,
            rate_card_id: remote.rate_card_id,
            fingerprint,
        }
    }
}

/// Amounts shown to the operator after override reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayAmounts {
    pub unit_price: Decimal,
    pub item_total: Decimal,
    pub gst_amount: Decimal,
    pub convenience_charge: Decimal,
    pub final_amount: Decimal,
    pub rate_card_id: Option<RateCardId>,
    pub overridden: bool,
}

/// Reconciles the resolved quote with a manual override.
///
/// An override greater than zero becomes the effective unit price: GST and
/// the final amount are recomputed from it, not from the resolved base
/// price. The resolved rate card is retained either way, since it records
/// provenance, not price. Clearing the override falls back to the last valid
/// quote unchanged.
pub fn reconcile(
    quote: Option<&PriceQuote>,
    quantity: u32,
    custom_price_override: Option<Decimal>,
) -> Option<DisplayAmounts> {
    let override_unit =
        custom_price_override.filter(|amount| amount.is_sign_positive() && !amount.is_zero());

    if let Some(unit_price) = override_unit {
        let convenience_charge =
            quote.map(|quote| quote.convenience_charge).unwrap_or(Decimal::ZERO);
        let item_total = unit_price * Decimal::from(quantity);
        let gst = gst_amount(item_total);
        return Some(DisplayAmounts {
            unit_price,
            item_total,
            gst_amount: gst,
            convenience_charge,
            final_amount: round_money(item_total + gst + convenience_charge),
            rate_card_id: quote.and_then(|quote| quote.rate_card_id.clone()),
            overridden: true,
        });
    }

    let quote = quote?;
    Some(DisplayAmounts {
        unit_price: quote.base_price,
        item_total: quote.item_total,
        gst_amount: quote.gst_amount,
        convenience_charge: quote.convenience_charge,
        final_amount: quote.final_amount,
        rate_card_id: quote.rate_card_id.clone(),
        overridden: false,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::selection::{RateCardId, SelectionFingerprint};

    use super::{gst_amount, reconcile, round_money, PriceQuote, RemotePrice};

    fn remote(base: i64) -> RemotePrice {
        RemotePrice {
            base_price: Decimal::new(base, 0),
            item_total: None,
            gst_amount: None,
            convenience_charge: Decimal::ZERO,
            rate_card_id: Some(RateCardId("rc-77".into())),
        }
    }

    #[test]
    fn quote_derives_item_total_gst_and_final_amount() {
        let quote = PriceQuote::from_remote(remote(500), 2, SelectionFingerprint(4));

        assert_eq!(quote.item_total, Decimal::new(1000, 0));
        assert_eq!(quote.gst_amount, Decimal::new(18_000, 2));
        assert_eq!(quote.final_amount, Decimal::new(118_000, 2));
        assert_eq!(quote.fingerprint, SelectionFingerprint(4));
    }

    #[test]
    fn provider_supplied_totals_take_precedence_over_local_derivation() {
        let quote = PriceQuote::from_remote(
            RemotePrice {
                item_total: Some(Decimal::new(950, 0)),
                gst_amount: Some(Decimal::new(171, 0)),
                convenience_charge: Decimal::new(49, 0),
                ..remote(500)
            },
            2,
            SelectionFingerprint(1),
        );

        assert_eq!(quote.item_total, Decimal::new(950, 0));
        assert_eq!(quote.final_amount, Decimal::new(117_000, 2));
    }

    #[test]
    fn gst_rounds_half_away_from_zero_at_two_decimals() {
        // 0.18 * 102.25 = 18.405 -> 18.41
        assert_eq!(gst_amount(Decimal::new(10_225, 2)), Decimal::new(1_841, 2));
        assert_eq!(round_money(Decimal::new(11_785, 3)), Decimal::new(1_179, 2));
    }

    #[test]
    fn override_becomes_the_effective_unit_price() {
        let quote = PriceQuote::from_remote(remote(500), 2, SelectionFingerprint(9));
        let amounts = reconcile(Some(&quote), 2, Some(Decimal::new(900, 0)))
            .expect("override display");

        assert!(amounts.overridden);
        assert_eq!(amounts.unit_price, Decimal::new(900, 0));
        assert_eq!(amounts.item_total, Decimal::new(1800, 0));
        assert_eq!(amounts.final_amount, Decimal::new(212_400, 2));
        // Provenance is retained even when the price is overridden.
        assert_eq!(amounts.rate_card_id, Some(RateCardId("rc-77".into())));
    }

    #[test]
    fn clearing_the_override_falls_back_to_the_resolved_base_price() {
        let quote = PriceQuote::from_remote(remote(500), 2, SelectionFingerprint(9));

        let overridden = reconcile(Some(&quote), 2, Some(Decimal::new(900, 0))).expect("display");
        assert_eq!(overridden.final_amount, Decimal::new(212_400, 2));

        let reverted = reconcile(Some(&quote), 2, None).expect("display");
        assert!(!reverted.overridden);
        assert_eq!(reverted.unit_price, Decimal::new(500, 0));
        assert_eq!(reverted.final_amount, Decimal::new(118_000, 2));
    }

    #[test]
    fn zero_override_is_treated_as_unset() {
        let quote = PriceQuote::from_remote(remote(500), 2, SelectionFingerprint(9));
        let amounts = reconcile(Some(&quote), 2, Some(Decimal::ZERO)).expect("display");
        assert!(!amounts.overridden);
        assert_eq!(amounts.unit_price, Decimal::new(500, 0));
    }

    #[test]
    fn override_without_a_resolved_quote_still_produces_amounts() {
        let amounts = reconcile(None, 3, Some(Decimal::new(150, 0))).expect("manual price");
        assert!(amounts.overridden);
        assert_eq!(amounts.item_total, Decimal::new(450, 0));
        assert_eq!(amounts.rate_card_id, None);
    }

    #[test]
    fn no_quote_and_no_override_displays_nothing() {
        assert_eq!(reconcile(None, 1, None), None);
    }
}
