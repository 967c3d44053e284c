//! Quotation endpoints.
//!
//! The console runs the lifecycle state machine locally and mirrors every
//! transition to the backend through these calls. Responses come back as raw
//! records and are revalidated into aggregates, so a backend that returns
//! inconsistent amounts is caught at the boundary instead of leaking into
//! displayed totals.

use rust_decimal::Decimal;
use serde::Serialize;

use marketdesk_core::{Quotation, QuotationId, QuotationItem, QuotationRecord, SendChannel};

use crate::backend::BackendClient;
use crate::error::ClientError;

#[derive(Debug, Serialize)]
pub struct QuotationItemRequest {
    pub item_name: String,
    pub quantity: u32,
    pub rate: Decimal,
}

impl From<&QuotationItem> for QuotationItemRequest {
    fn from(item: &QuotationItem) -> Self {
        Self { item_name: item.item_name().to_owned(), quantity: item.quantity(), rate: item.rate() }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateQuotationRequest {
    pub customer_ref: String,
    pub items: Vec<QuotationItemRequest>,
    pub validity_days: u32,
}

#[derive(Debug, Serialize)]
struct UpdateQuotationRequest {
    items: Vec<QuotationItemRequest>,
}

#[derive(Debug, Serialize)]
struct SendQuotationRequest {
    channel: SendChannel,
}

#[derive(Debug, Serialize)]
struct NegotiateQuotationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApproveQuotationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

#[derive(Debug, Serialize)]
struct RejectQuotationRequest {
    reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl BackendClient {
    pub async fn fetch_quotation(&self, id: &QuotationId) -> Result<Quotation, ClientError> {
        let record: QuotationRecord = self.get_json(&format!("quotations/{}", id.0), &[]).await?;
        restore_quotation(record)
    }

    pub async fn create_quotation(
        &self,
        request: &CreateQuotationRequest,
    ) -> Result<Quotation, ClientError> {
        let record: QuotationRecord = self.post_json("quotations", request).await?;
        restore_quotation(record)
    }

    pub async fn update_quotation(
        &self,
        id: &QuotationId,
        items: &[QuotationItem],
    ) -> Result<Quotation, ClientError> {
        let request = UpdateQuotationRequest {
            items: items.iter().map(QuotationItemRequest::from).collect(),
        };
        let record: QuotationRecord =
            self.put_json(&format!("quotations/{}", id.0), &request).await?;
        restore_quotation(record)
    }

    pub async fn send_quotation(
        &self,
        id: &QuotationId,
        channel: SendChannel,
    ) -> Result<Quotation, ClientError> {
        let record: QuotationRecord = self
            .post_json(&format!("quotations/{}/send", id.0), &SendQuotationRequest { channel })
            .await?;
        restore_quotation(record)
    }

    pub async fn mark_quotation_negotiating(
        &self,
        id: &QuotationId,
        note: Option<String>,
    ) -> Result<Quotation, ClientError> {
        let record: QuotationRecord = self
            .post_json(
                &format!("quotations/{}/negotiate", id.0),
                &NegotiateQuotationRequest { note },
            )
            .await?;
        restore_quotation(record)
    }

    pub async fn approve_quotation(
        &self,
        id: &QuotationId,
        note: Option<String>,
    ) -> Result<Quotation, ClientError> {
        let record: QuotationRecord = self
            .post_json(&format!("quotations/{}/approve", id.0), &ApproveQuotationRequest { note })
            .await?;
        restore_quotation(record)
    }

    pub async fn reject_quotation(
        &self,
        id: &QuotationId,
        reason: String,
        note: Option<String>,
    ) -> Result<Quotation, ClientError> {
        let record: QuotationRecord = self
            .post_json(
                &format!("quotations/{}/reject", id.0),
                &RejectQuotationRequest { reason, note },
            )
            .await?;
        restore_quotation(record)
    }
}

fn restore_quotation(record: QuotationRecord) -> Result<Quotation, ClientError> {
    Quotation::restore(record)
        .map_err(|error| ClientError::Contract { entity: "quotation", message: error.to_string() })
}
