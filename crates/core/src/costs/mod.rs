//! Supplementary cost line items with independent approval state.
//!
//! Costs hang off exactly one quotation or order. Adding, editing, and
//! removing are gated on the parent's lock status; approving or rejecting a
//! cost is a one-shot action gated on the cost's own status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::errors::DomainError;
use crate::order::{Order, OrderId};
use crate::quotation::{Quotation, QuotationId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdditionalCostId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostStatus {
    Pending,
    Approved,
    Rejected,
}

impl CostStatus {
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// The owning aggregate. Mutually exclusive by construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CostParent {
    Quotation(QuotationId),
    Order(OrderId),
}

impl CostParent {
    pub fn describe(&self) -> String {
        match self {
            Self::Quotation(id) => format!("quotation {}", id.0),
            Self::Order(id) => format!("order {}", id.0),
        }
    }
}

/// Lock view over the owning aggregate. A parent in `approved` or `rejected`
/// status freezes its cost ledger.
pub trait ParentGate {
    fn parent_ref(&self) -> CostParent;
    /// The lock-causing status name, when locked.
    fn lock_status(&self) -> Option<&'static str>;
}

impl ParentGate for Quotation {
    fn parent_ref(&self) -> CostParent {
        CostParent::Quotation(self.id().clone())
    }

    fn lock_status(&self) -> Option<&'static str> {
        match self.status() {
            crate::quotation::QuotationStatus::Approved
            | crate::quotation::QuotationStatus::Rejected => Some(self.status().as_str()),
            _ => None,
        }
    }
}

impl ParentGate for Order {
    fn parent_ref(&self) -> CostParent {
        CostParent::Order(self.id.clone())
    }

    fn lock_status(&self) -> Option<&'static str> {
        match self.status {
            crate::order::OrderStatus::Approved | crate::order::OrderStatus::Rejected => {
                Some(self.status.as_str())
            }
            _ => None,
        }
    }
}

/// Explicit one-shot resolution of a pending cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostResolution {
    Approved,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdditionalCost {
    id: AdditionalCostId,
    parent: CostParent,
    item_name: String,
    description: Option<String>,
    quantity: u32,
    unit_price: Decimal,
    total_amount: Decimal,
    status: CostStatus,
    notes: Option<String>,
    added_by: String,
    added_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
}

impl AdditionalCost {
    pub fn id(&self) -> &AdditionalCostId {
        &self.id
    }

    pub fn parent(&self) -> &CostParent {
        &self.parent
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn status(&self) -> CostStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn added_by(&self) -> &str {
        &self.added_by
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    fn recompute_total(&mut self) {
        self.total_amount = self.unit_price * Decimal::from(self.quantity);
    }
}

/// Raw cost fields as stored or returned by the backend. `total_amount` is
/// rederived on restore, never trusted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalCostRecord {
    pub id: AdditionalCostId,
    pub parent: CostParent,
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub status: CostStatus,
    pub notes: Option<String>,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl AdditionalCost {
    pub fn restore(record: AdditionalCostRecord) -> Result<Self, DomainError> {
        validate_cost_fields(&record.item_name, record.quantity, record.unit_price)?;
        let mut cost = Self {
            id: record.id,
            parent: record.parent,
            item_name: record.item_name,
            description: record.description,
            quantity: record.quantity,
            unit_price: record.unit_price,
            total_amount: Decimal::ZERO,
            status: record.status,
            notes: record.notes,
            added_by: record.added_by,
            added_at: record.added_at,
            approved_at: record.approved_at,
        };
        cost.recompute_total();
        Ok(cost)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalCostDraft {
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub notes: Option<String>,
}

/// Field patch for an existing cost. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CostUpdate {
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub unit_price: Option<Decimal>,
    pub notes: Option<String>,
}

/// The per-parent collection of additional costs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdditionalCostLedger {
    parent: CostParent,
    costs: Vec<AdditionalCost>,
}

impl AdditionalCostLedger {
    pub fn new(parent: CostParent) -> Self {
        Self { parent, costs: Vec::new() }
    }

    pub fn parent(&self) -> &CostParent {
        &self.parent
    }

    pub fn costs(&self) -> &[AdditionalCost] {
        &self.costs
    }

    pub fn get(&self, id: &AdditionalCostId) -> Option<&AdditionalCost> {
        self.costs.iter().find(|cost| &cost.id == id)
    }

    /// Creates a pending cost under the parent. Rejected while the parent is
    /// locked.
    pub fn add(
        &mut self,
        gate: &dyn ParentGate,
        draft: AdditionalCostDraft,
        added_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<&AdditionalCost, DomainError> {
        self.ensure_gate_matches(gate)?;
        self.ensure_unlocked(gate)?;
        validate_cost_fields(&draft.item_name, draft.quantity, draft.unit_price)?;

        let mut cost = AdditionalCost {
            id: AdditionalCostId(Uuid::new_v4().to_string()),
            parent: self.parent.clone(),
            item_name: draft.item_name,
            description: draft.description,
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            total_amount: Decimal::ZERO,
            status: CostStatus::Pending,
            notes: draft.notes,
            added_by: added_by.into(),
            added_at: now,
            approved_at: None,
        };
        cost.recompute_total();
        self.costs.push(cost);
        Ok(self.costs.last().expect("cost was just pushed"))
    }

    /// Edits a cost's fields and rederives its total. Allowed regardless of
    /// the cost's own status; rejected while the parent is locked.
    pub fn update(
        &mut self,
        gate: &dyn ParentGate,
        id: &AdditionalCostId,
        update: CostUpdate,
    ) -> Result<&AdditionalCost, DomainError> {
        self.ensure_gate_matches(gate)?;
        self.ensure_unlocked(gate)?;

        let cost = self
            .costs
            .iter_mut()
            .find(|cost| &cost.id == id)
            .ok_or_else(|| DomainError::UnknownCost(id.0.clone()))?;

        if let Some(item_name) = update.item_name {
            cost.item_name = item_name;
        }
        if let Some(description) = update.description {
            cost.description = Some(description);
        }
        if let Some(quantity) = update.quantity {
            cost.quantity = quantity;
        }
        if let Some(unit_price) = update.unit_price {
            cost.unit_price = unit_price;
        }
        if let Some(notes) = update.notes {
            cost.notes = Some(notes);
        }
        validate_cost_fields(&cost.item_name, cost.quantity, cost.unit_price)?;
        cost.recompute_total();

        Ok(self.get(id).expect("cost was just updated"))
    }

    /// Resolves a pending cost to approved or rejected, exactly once.
    pub fn set_status(
        &mut self,
        id: &AdditionalCostId,
        resolution: CostResolution,
        now: DateTime<Utc>,
    ) -> Result<&AdditionalCost, DomainError> {
        let cost = self
            .costs
            .iter_mut()
            .find(|cost| &cost.id == id)
            .ok_or_else(|| DomainError::UnknownCost(id.0.clone()))?;

        if cost.status.is_resolved() {
            return Err(DomainError::AlreadyResolved {
                cost_id: cost.id.0.clone(),
                status: cost.status,
            });
        }

        match resolution {
            CostResolution::Approved => {
                cost.status = CostStatus::Approved;
                cost.approved_at = Some(now);
            }
            CostResolution::Rejected => {
                cost.status = CostStatus::Rejected;
            }
        }

        Ok(self.get(id).expect("cost was just resolved"))
    }

    /// Audited variant of [`AdditionalCostLedger::set_status`].
    pub fn set_status_with_audit<S>(
        &mut self,
        id: &AdditionalCostId,
        resolution: CostResolution,
        sink: &S,
        audit: &AuditContext,
        now: DateTime<Utc>,
    ) -> Result<&AdditionalCost, DomainError>
    where
        S: AuditSink,
    {
        let event_type = match resolution {
            CostResolution::Approved => "additional_cost.approved",
            CostResolution::Rejected => "additional_cost.rejected",
        };
        let parent_desc = self.parent.describe();
        let result = self.set_status(id, resolution, now);

        match &result {
            Ok(cost) => sink.emit(
                AuditEvent::new(
                    Some(cost.id.0.clone()),
                    audit.correlation_id.clone(),
                    event_type,
                    AuditCategory::Ledger,
                    audit.actor.clone(),
                    AuditOutcome::Success,
                )
                .with_metadata("parent", parent_desc)
                .with_metadata("total_amount", cost.total_amount.to_string()),
            ),
            Err(error) => sink.emit(
                AuditEvent::new(
                    Some(id.0.clone()),
                    audit.correlation_id.clone(),
                    event_type,
                    AuditCategory::Ledger,
                    audit.actor.clone(),
                    AuditOutcome::Rejected,
                )
                .with_metadata("error", error.to_string()),
            ),
        }

        result
    }

    /// Deletes a cost. Rejected while the parent is locked.
    pub fn remove(
        &mut self,
        gate: &dyn ParentGate,
        id: &AdditionalCostId,
    ) -> Result<AdditionalCost, DomainError> {
        self.ensure_gate_matches(gate)?;
        self.ensure_unlocked(gate)?;

        let index = self
            .costs
            .iter()
            .position(|cost| &cost.id == id)
            .ok_or_else(|| DomainError::UnknownCost(id.0.clone()))?;
        Ok(self.costs.remove(index))
    }

    /// Sum of approved cost totals, the additive component of the grand
    /// total.
    pub fn approved_total(&self) -> Decimal {
        self.costs
            .iter()
            .filter(|cost| cost.status == CostStatus::Approved)
            .map(|cost| cost.total_amount)
            .sum()
    }

    fn ensure_unlocked(&self, gate: &dyn ParentGate) -> Result<(), DomainError> {
        if let Some(status) = gate.lock_status() {
            return Err(DomainError::ParentLocked {
                parent: self.parent.describe(),
                status: status.to_owned(),
            });
        }
        Ok(())
    }

    fn ensure_gate_matches(&self, gate: &dyn ParentGate) -> Result<(), DomainError> {
        if gate.parent_ref() != self.parent {
            return Err(DomainError::Validation {
                field: "parent",
                reason: format!(
                    "ledger belongs to {}, not {}",
                    self.parent.describe(),
                    gate.parent_ref().describe()
                ),
            });
        }
        Ok(())
    }
}

/// Quotation total plus all approved additional costs.
pub fn grand_total(quotation: &Quotation, ledger: &AdditionalCostLedger) -> Decimal {
    quotation.total_amount() + ledger.approved_total()
}

fn validate_cost_fields(
    item_name: &str,
    quantity: u32,
    unit_price: Decimal,
) -> Result<(), DomainError> {
    if item_name.trim().is_empty() {
        return Err(DomainError::Validation {
            field: "item_name",
            reason: "must not be empty".to_owned(),
        });
    }
    if quantity == 0 {
        return Err(DomainError::Validation {
            field: "quantity",
            reason: "must be a positive integer".to_owned(),
        });
    }
    if unit_price.is_sign_negative() {
        return Err(DomainError::Validation {
            field: "unit_price",
            reason: "must not be negative".to_owned(),
        });
    }
    Ok(())
}
