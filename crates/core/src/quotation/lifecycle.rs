//! Status machine for the quotation aggregate.
//!
//! `approved`, `rejected`, and `expired` are terminal. Expiry is passive: it
//! is derived on read from the validity window and never written explicitly,
//! so the guard functions here always operate on the effective status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::errors::DomainError;
use crate::quotation::Quotation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    Draft,
    Sent,
    Negotiating,
    Approved,
    Rejected,
    Expired,
}

impl QuotationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Expired)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Negotiating => "negotiating",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendChannel {
    Email,
    Sms,
    Whatsapp,
}

impl SendChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Whatsapp => "whatsapp",
        }
    }
}

pub fn can_transition(from: QuotationStatus, to: QuotationStatus) -> bool {
    use QuotationStatus::{Approved, Draft, Expired, Negotiating, Rejected, Sent};

    matches!(
        (from, to),
        (Draft, Sent)
            | (Negotiating, Sent)
            | (Sent, Negotiating)
            | (Sent, Approved)
            | (Negotiating, Approved)
            | (Sent, Rejected)
            | (Negotiating, Rejected)
            | (Draft, Expired)
            | (Sent, Expired)
            | (Negotiating, Expired)
    )
}

/// Operations legal from a given effective status, for rendering the action
/// row without duplicating the guard table in the UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotationAction {
    Edit,
    Send,
    MarkNegotiating,
    Approve,
    Reject,
}

pub fn allowed_actions(status: QuotationStatus) -> Vec<QuotationAction> {
    use QuotationAction::{Approve, Edit, MarkNegotiating, Reject, Send};

    match status {
        QuotationStatus::Draft => vec![Edit, Send],
        QuotationStatus::Sent => vec![MarkNegotiating, Approve, Reject],
        QuotationStatus::Negotiating => vec![Send, Approve, Reject],
        QuotationStatus::Approved | QuotationStatus::Rejected | QuotationStatus::Expired => {
            Vec::new()
        }
    }
}

/// One admin-initiated lifecycle operation, bundled for the audited entry
/// point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleAction {
    Send(SendChannel),
    MarkNegotiating { note: Option<String> },
    Approve { note: Option<String> },
    Reject { reason: String, note: Option<String> },
}

impl LifecycleAction {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Send(_) => "quotation.sent",
            Self::MarkNegotiating { .. } => "quotation.negotiating",
            Self::Approve { .. } => "quotation.approved",
            Self::Reject { .. } => "quotation.rejected",
        }
    }
}

/// Applies `action` to the quotation and emits an audit event either way.
pub fn apply_with_audit<S>(
    quotation: &mut Quotation,
    action: LifecycleAction,
    sink: &S,
    audit: &AuditContext,
    now: DateTime<Utc>,
) -> Result<(), DomainError>
where
    S: AuditSink,
{
    let from = quotation.effective_status(now);
    let event_type = action.event_type();
    let result = match action {
        LifecycleAction::Send(channel) => quotation.send(channel, now),
        LifecycleAction::MarkNegotiating { note } => quotation.mark_negotiating(note, now),
        LifecycleAction::Approve { note } => quotation.approve(note, now),
        LifecycleAction::Reject { reason, note } => quotation.reject(reason, note, now),
    };

    match &result {
        Ok(()) => sink.emit(
            AuditEvent::new(
                Some(quotation.id().0.clone()),
                audit.correlation_id.clone(),
                event_type,
                AuditCategory::Lifecycle,
                audit.actor.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("from", from.as_str())
            .with_metadata("to", quotation.status().as_str()),
        ),
        Err(error) => sink.emit(
            AuditEvent::new(
                Some(quotation.id().0.clone()),
                audit.correlation_id.clone(),
                event_type,
                AuditCategory::Lifecycle,
                audit.actor.clone(),
                AuditOutcome::Rejected,
            )
            .with_metadata("error", error.to_string()),
        ),
    }

    result
}
