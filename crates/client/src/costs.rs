//! Additional-cost endpoints.
//!
//! Costs are addressed under their owning quotation or order for listing and
//! creation, and directly by id for edits and resolution, matching how the
//! cost manager screens navigate.

use rust_decimal::Decimal;
use serde::Serialize;

use marketdesk_core::{
    AdditionalCost, AdditionalCostDraft, AdditionalCostId, AdditionalCostRecord, CostParent,
    CostResolution, CostUpdate,
};

use crate::backend::BackendClient;
use crate::error::ClientError;

fn parent_path(parent: &CostParent) -> String {
    match parent {
        CostParent::Quotation(id) => format!("quotations/{}/additional-costs", id.0),
        CostParent::Order(id) => format!("orders/{}/additional-costs", id.0),
    }
}

#[derive(Debug, Serialize)]
pub struct CreateAdditionalCostRequest {
    pub item_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub added_by: String,
}

impl CreateAdditionalCostRequest {
    pub fn from_draft(draft: AdditionalCostDraft, added_by: impl Into<String>) -> Self {
        Self {
            item_name: draft.item_name,
            description: draft.description,
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            notes: draft.notes,
            added_by: added_by.into(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateAdditionalCostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<CostUpdate> for UpdateAdditionalCostRequest {
    fn from(update: CostUpdate) -> Self {
        Self {
            item_name: update.item_name,
            description: update.description,
            quantity: update.quantity,
            unit_price: update.unit_price,
            notes: update.notes,
        }
    }
}

#[derive(Debug, Serialize)]
struct SetCostStatusRequest {
    status: CostResolution,
}

impl BackendClient {
    pub async fn list_additional_costs(
        &self,
        parent: &CostParent,
    ) -> Result<Vec<AdditionalCost>, ClientError> {
        let records: Vec<AdditionalCostRecord> =
            self.get_json(&parent_path(parent), &[]).await?;
        records.into_iter().map(restore_cost).collect()
    }

    pub async fn create_additional_cost(
        &self,
        parent: &CostParent,
        request: &CreateAdditionalCostRequest,
    ) -> Result<AdditionalCost, ClientError> {
        let record: AdditionalCostRecord = self.post_json(&parent_path(parent), request).await?;
        restore_cost(record)
    }

    pub async fn update_additional_cost(
        &self,
        id: &AdditionalCostId,
        request: &UpdateAdditionalCostRequest,
    ) -> Result<AdditionalCost, ClientError> {
        let record: AdditionalCostRecord =
            self.put_json(&format!("additional-costs/{}", id.0), request).await?;
        restore_cost(record)
    }

    pub async fn set_additional_cost_status(
        &self,
        id: &AdditionalCostId,
        resolution: CostResolution,
    ) -> Result<AdditionalCost, ClientError> {
        let record: AdditionalCostRecord = self
            .post_json(
                &format!("additional-costs/{}/status", id.0),
                &SetCostStatusRequest { status: resolution },
            )
            .await?;
        restore_cost(record)
    }

    pub async fn delete_additional_cost(&self, id: &AdditionalCostId) -> Result<(), ClientError> {
        self.delete(&format!("additional-costs/{}", id.0)).await
    }
}

fn restore_cost(record: AdditionalCostRecord) -> Result<AdditionalCost, ClientError> {
    AdditionalCost::restore(record).map_err(|error| ClientError::Contract {
        entity: "additional cost",
        message: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use marketdesk_core::{
        AdditionalCostDraft, AdditionalCostRecord, CostParent, CostStatus, CostUpdate, OrderId,
        QuotationId,
    };

    use super::{
        parent_path, restore_cost, CreateAdditionalCostRequest, UpdateAdditionalCostRequest,
    };

    #[test]
    fn costs_are_addressed_under_their_owning_aggregate() {
        assert_eq!(
            parent_path(&CostParent::Quotation(QuotationId("QT-2026-0001".into()))),
            "quotations/QT-2026-0001/additional-costs"
        );
        assert_eq!(
            parent_path(&CostParent::Order(OrderId("ORD-2026-0004".into()))),
            "orders/ORD-2026-0004/additional-costs"
        );
    }

    #[test]
    fn create_requests_carry_the_draft_and_the_actor() {
        let request = CreateAdditionalCostRequest::from_draft(
            AdditionalCostDraft {
                item_name: "Scaffolding rental".into(),
                description: None,
                quantity: 2,
                unit_price: Decimal::new(150, 0),
                notes: None,
            },
            "ops-admin",
        );
        let json = serde_json::to_value(&request).expect("request json");

        assert_eq!(
            json,
            serde_json::json!({
                "item_name": "Scaffolding rental",
                "quantity": 2,
                "unit_price": "150",
                "added_by": "ops-admin",
            })
        );
    }

    #[test]
    fn update_requests_serialize_only_the_changed_fields() {
        let request = UpdateAdditionalCostRequest::from(CostUpdate {
            quantity: Some(3),
            ..CostUpdate::default()
        });
        let json = serde_json::to_value(&request).expect("request json");
        assert_eq!(json, serde_json::json!({"quantity": 3}));
    }

    #[test]
    fn restored_costs_rederive_their_total_from_the_factors() {
        let record: AdditionalCostRecord = serde_json::from_value(serde_json::json!({
            "id": "ac-9",
            "parent": {"kind": "quotation", "id": "QT-2026-0001"},
            "item_name": "Scaffolding rental",
            "description": null,
            "quantity": 2,
            "unit_price": "150",
            "status": "pending",
            "notes": null,
            "added_by": "ops-admin",
            "added_at": "2026-08-01T10:00:00Z",
            "approved_at": null,
        }))
        .expect("record json");

        let cost = restore_cost(record).expect("restore");
        assert_eq!(cost.total_amount(), Decimal::new(300, 0));
        assert_eq!(cost.status(), CostStatus::Pending);
    }
}
