pub mod lifecycle;

pub use lifecycle::{
    allowed_actions, apply_with_audit, can_transition, LifecycleAction, QuotationAction,
    QuotationStatus, SendChannel,
};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::pricing::{gst_amount, round_money};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotationId(pub String);

/// One priced line of a quotation. `amount` is always `quantity * rate`; it
/// is recomputed on every mutation and rederived on deserialization, never
/// trusted from stored data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuotationItem {
    item_name: String,
    quantity: u32,
    rate: Decimal,
    amount: Decimal,
}

impl QuotationItem {
    pub fn new(
        item_name: impl Into<String>,
        quantity: u32,
        rate: Decimal,
    ) -> Result<Self, DomainError> {
        if rate.is_sign_negative() {
            return Err(DomainError::Validation {
                field: "rate",
                reason: "must not be negative".to_owned(),
            });
        }
        let mut item =
            Self { item_name: item_name.into(), quantity, rate, amount: Decimal::ZERO };
        item.recompute_amount();
        Ok(item)
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.recompute_amount();
    }

    pub fn set_rate(&mut self, rate: Decimal) -> Result<(), DomainError> {
        if rate.is_sign_negative() {
            return Err(DomainError::Validation {
                field: "rate",
                reason: "must not be negative".to_owned(),
            });
        }
        self.rate = rate;
        self.recompute_amount();
        Ok(())
    }

    fn recompute_amount(&mut self) {
        self.amount = self.rate * Decimal::from(self.quantity);
    }
}

impl<'de> Deserialize<'de> for QuotationItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawItem {
            item_name: String,
            quantity: u32,
            rate: Decimal,
        }

        let raw = RawItem::deserialize(deserializer)?;
        QuotationItem::new(raw.item_name, raw.quantity, raw.rate).map_err(serde::de::Error::custom)
    }
}

/// Raw quotation fields as stored or returned by the backend. Revalidated
/// into an aggregate via [`Quotation::restore`], which rederives all amounts
/// from the items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationRecord {
    pub id: QuotationId,
    pub customer_ref: String,
    pub status: QuotationStatus,
    pub version: u32,
    pub items: Vec<QuotationItem>,
    pub validity_days: u32,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub sent_via: Option<SendChannel>,
    pub negotiation_note: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approval_note: Option<String>,
    pub rejection_reason: Option<String>,
    pub rejection_note: Option<String>,
}

/// A priced proposal document, versioned and status-tracked.
///
/// All derived amounts are recomputed from the items on every substantive
/// edit. Consumers read them; only the aggregate writes them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Quotation {
    id: QuotationId,
    customer_ref: String,
    status: QuotationStatus,
    version: u32,
    items: Vec<QuotationItem>,
    initial_amount: Decimal,
    gst_amount: Decimal,
    total_amount: Decimal,
    final_amount: Decimal,
    validity_days: u32,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    sent_via: Option<SendChannel>,
    negotiation_note: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    approval_note: Option<String>,
    rejection_reason: Option<String>,
    rejection_note: Option<String>,
}

impl Quotation {
    pub fn create(
        id: QuotationId,
        customer_ref: impl Into<String>,
        items: Vec<QuotationItem>,
        validity_days: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_items(&items)?;
        if validity_days == 0 {
            return Err(DomainError::Validation {
                field: "validity_days",
                reason: "must be at least one day".to_owned(),
            });
        }

        let mut quotation = Self {
            id,
            customer_ref: customer_ref.into(),
            status: QuotationStatus::Draft,
            version: 1,
            items,
            initial_amount: Decimal::ZERO,
            gst_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            final_amount: Decimal::ZERO,
            validity_days,
            created_at: now,
            sent_at: None,
            sent_via: None,
            negotiation_note: None,
            approved_at: None,
            approval_note: None,
            rejection_reason: None,
            rejection_note: None,
        };
        quotation.recalculate();
        Ok(quotation)
    }

    /// Rebuilds an aggregate from stored fields, rederiving every amount.
    pub fn restore(record: QuotationRecord) -> Result<Self, DomainError> {
        validate_items(&record.items)?;
        let mut quotation = Self {
            id: record.id,
            customer_ref: record.customer_ref,
            status: record.status,
            version: record.version.max(1),
            items: record.items,
            initial_amount: Decimal::ZERO,
            gst_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            final_amount: Decimal::ZERO,
            validity_days: record.validity_days.max(1),
            created_at: record.created_at,
            sent_at: record.sent_at,
            sent_via: record.sent_via,
            negotiation_note: record.negotiation_note,
            approved_at: record.approved_at,
            approval_note: record.approval_note,
            rejection_reason: record.rejection_reason,
            rejection_note: record.rejection_note,
        };
        quotation.recalculate();
        Ok(quotation)
    }

    pub fn id(&self) -> &QuotationId {
        &self.id
    }

    pub fn customer_ref(&self) -> &str {
        &self.customer_ref
    }

    /// Stored status, without passive expiry applied. Most callers want
    /// [`Quotation::effective_status`].
    pub fn status(&self) -> QuotationStatus {
        self.status
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn items(&self) -> &[QuotationItem] {
        &self.items
    }

    pub fn initial_amount(&self) -> Decimal {
        self.initial_amount
    }

    pub fn gst_amount(&self) -> Decimal {
        self.gst_amount
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn final_amount(&self) -> Decimal {
        self.final_amount
    }

    pub fn validity_days(&self) -> u32 {
        self.validity_days
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    pub fn sent_via(&self) -> Option<SendChannel> {
        self.sent_via
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(QuotationItem::amount).sum()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::days(i64::from(self.validity_days))
    }

    /// Status with passive expiry applied: a non-terminal quotation past its
    /// validity window reads as expired without a write.
    pub fn effective_status(&self, now: DateTime<Utc>) -> QuotationStatus {
        if !self.status.is_terminal() && now > self.expires_at() {
            QuotationStatus::Expired
        } else {
            self.status
        }
    }

    pub fn allowed_actions(&self, now: DateTime<Utc>) -> Vec<QuotationAction> {
        lifecycle::allowed_actions(self.effective_status(now))
    }

    /// Replaces the line items. Permitted only while draft; bumps the
    /// version and recomputes all derived amounts.
    pub fn edit_items(
        &mut self,
        items: Vec<QuotationItem>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let status = self.effective_status(now);
        if status != QuotationStatus::Draft {
            return Err(DomainError::Validation {
                field: "status",
                reason: format!("items can only be edited while draft, not {}", status.as_str()),
            });
        }
        validate_items(&items)?;

        self.items = items;
        self.version += 1;
        self.recalculate();
        Ok(())
    }

    pub fn send(&mut self, channel: SendChannel, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(QuotationStatus::Sent, now)?;
        self.sent_at = Some(now);
        self.sent_via = Some(channel);
        Ok(())
    }

    /// Explicit admin action; nothing enters negotiation automatically.
    pub fn mark_negotiating(
        &mut self,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.transition(QuotationStatus::Negotiating, now)?;
        self.negotiation_note = note;
        Ok(())
    }

    pub fn approve(
        &mut self,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.transition(QuotationStatus::Approved, now)?;
        self.approved_at = Some(now);
        self.approval_note = note;
        Ok(())
    }

    pub fn reject(
        &mut self,
        reason: String,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if reason.trim().is_empty() {
            return Err(DomainError::Validation {
                field: "rejection_reason",
                reason: "must not be empty".to_owned(),
            });
        }
        self.transition(QuotationStatus::Rejected, now)?;
        self.rejection_reason = Some(reason);
        self.rejection_note = note;
        Ok(())
    }

    fn transition(
        &mut self,
        to: QuotationStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let from = self.effective_status(now);
        if !lifecycle::can_transition(from, to) {
            return Err(DomainError::InvalidTransition { from, to });
        }
        self.status = to;
        Ok(())
    }

    fn recalculate(&mut self) {
        let subtotal = self.subtotal();
        self.initial_amount = subtotal;
        self.gst_amount = gst_amount(subtotal);
        self.total_amount = round_money(subtotal * Decimal::new(118, 2));
        self.final_amount = self.total_amount;
    }
}

fn validate_items(items: &[QuotationItem]) -> Result<(), DomainError> {
    if items.is_empty() {
        return Err(DomainError::Validation {
            field: "items",
            reason: "at least one line item is required".to_owned(),
        });
    }
    Ok(())
}
