//! Committing a resolved selection and price into an order payload.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::errors::DomainError;
use crate::pricing::resolver::PriceDisplay;
use crate::selection::{RateCardId, SelectionSnapshot, SelectionState};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }
}

/// The committed output of the order-creation form: the selection snapshot
/// plus the reconciled amounts, ready for submission to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub customer_ref: String,
    pub selection: SelectionSnapshot,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub item_total: Decimal,
    pub gst_amount: Decimal,
    pub convenience_charge: Decimal,
    pub final_amount: Decimal,
    pub rate_card_id: Option<RateCardId>,
    pub price_overridden: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_ref: String,
    pub status: OrderStatus,
    pub payload: OrderPayload,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn place(id: OrderId, payload: OrderPayload, now: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_ref: payload.customer_ref.clone(),
            status: OrderStatus::Pending,
            payload,
            created_at: now,
        }
    }
}

/// Validates the selection and the displayed price, then produces the order
/// payload. All checks run locally, before any remote call:
/// an incomplete selection, a missing service address, a non-authoritative
/// price display, or a non-positive final amount each fail with
/// `Validation`.
pub fn commit_order(
    customer_ref: impl Into<String>,
    state: &SelectionState,
    display: &PriceDisplay,
    now: DateTime<Utc>,
) -> Result<OrderPayload, DomainError> {
    if let Some(field) = state.missing_for_pricing().into_iter().next() {
        return Err(DomainError::Validation { field, reason: "required".to_owned() });
    }
    let snapshot = state.pricing_snapshot().expect("eligible selection has a snapshot");

    if snapshot.service_address_id.is_none() {
        return Err(DomainError::Validation {
            field: "service_address",
            reason: "required for order placement".to_owned(),
        });
    }

    let amounts = match display {
        PriceDisplay::Quoted(amounts) => amounts,
        PriceDisplay::Ineligible | PriceDisplay::Recalculating => {
            return Err(DomainError::Validation {
                field: "price",
                reason: "price is not resolved yet".to_owned(),
            });
        }
        PriceDisplay::Stale(_) | PriceDisplay::Failed => {
            return Err(DomainError::Validation {
                field: "price",
                reason: "price computation failed; recalculate before committing".to_owned(),
            });
        }
    };

    if !amounts.final_amount.is_sign_positive() || amounts.final_amount.is_zero() {
        return Err(DomainError::Validation {
            field: "final_amount",
            reason: "must be positive".to_owned(),
        });
    }

    Ok(OrderPayload {
        customer_ref: customer_ref.into(),
        quantity: snapshot.quantity,
        selection: snapshot,
        unit_price: amounts.unit_price,
        item_total: amounts.item_total,
        gst_amount: amounts.gst_amount,
        convenience_charge: amounts.convenience_charge,
        final_amount: amounts.final_amount,
        rate_card_id: amounts.rate_card_id.clone(),
        price_overridden: amounts.overridden,
        created_at: now,
    })
}

/// Audited variant of [`commit_order`]. Emits the committed amounts, or the
/// local validation failure, under the pricing category.
pub fn commit_order_with_audit<S>(
    customer_ref: impl Into<String>,
    state: &SelectionState,
    display: &PriceDisplay,
    sink: &S,
    audit: &AuditContext,
    now: DateTime<Utc>,
) -> Result<OrderPayload, DomainError>
where
    S: AuditSink,
{
    let customer_ref = customer_ref.into();
    let result = commit_order(customer_ref.clone(), state, display, now);

    match &result {
        Ok(payload) => sink.emit(
            AuditEvent::new(
                None,
                audit.correlation_id.clone(),
                "order.price_committed",
                AuditCategory::Pricing,
                audit.actor.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("customer_ref", customer_ref)
            .with_metadata("final_amount", payload.final_amount.to_string())
            .with_metadata("overridden", payload.price_overridden.to_string()),
        ),
        Err(error) => sink.emit(
            AuditEvent::new(
                None,
                audit.correlation_id.clone(),
                "order.price_committed",
                AuditCategory::Pricing,
                audit.actor.clone(),
                AuditOutcome::Rejected,
            )
            .with_metadata("customer_ref", customer_ref)
            .with_metadata("error", error.to_string()),
        ),
    }

    result
}
