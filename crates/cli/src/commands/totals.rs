//! Offline verification of quotation amounts.
//!
//! Recomputes every derived amount from the stored factors in a JSON file
//! and, when the file declares expected totals, compares them. Runs entirely
//! locally; useful for checking an export or a backend payload without a
//! running backend.

use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use marketdesk_core::{gst_amount, round_money, CostStatus, QuotationItem};

use super::CommandResult;

#[derive(Debug, Deserialize)]
struct TotalsFile {
    items: Vec<QuotationItem>,
    #[serde(default)]
    additional_costs: Vec<CostLine>,
    #[serde(default)]
    expected: Option<ExpectedTotals>,
}

#[derive(Debug, Deserialize)]
struct CostLine {
    item_name: String,
    quantity: u32,
    unit_price: Decimal,
    status: CostStatus,
}

#[derive(Debug, Deserialize)]
struct ExpectedTotals {
    #[serde(default)]
    total_amount: Option<Decimal>,
    #[serde(default)]
    grand_total: Option<Decimal>,
}

pub fn run(path: &Path) -> CommandResult {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "totals",
                "invalid_input",
                format!("could not read `{}`: {error}", path.display()),
                2,
            );
        }
    };

    let file: TotalsFile = match serde_json::from_str(&raw) {
        Ok(file) => file,
        Err(error) => {
            return CommandResult::failure(
                "totals",
                "invalid_input",
                format!("could not parse `{}`: {error}", path.display()),
                2,
            );
        }
    };

    if file.items.is_empty() {
        return CommandResult::failure(
            "totals",
            "invalid_input",
            "at least one line item is required",
            2,
        );
    }

    let subtotal: Decimal = file.items.iter().map(QuotationItem::amount).sum();
    let gst = gst_amount(subtotal);
    let total = round_money(subtotal * Decimal::new(118, 2));
    let approved_costs_total: Decimal = file
        .additional_costs
        .iter()
        .filter(|cost| cost.status == CostStatus::Approved)
        .map(|cost| cost.unit_price * Decimal::from(cost.quantity))
        .sum();
    let grand_total = total + approved_costs_total;

    let mut mismatches = Vec::new();
    if let Some(expected) = &file.expected {
        if let Some(expected_total) = expected.total_amount {
            if expected_total != total {
                mismatches
                    .push(format!("total_amount: expected {expected_total}, computed {total}"));
            }
        }
        if let Some(expected_grand) = expected.grand_total {
            if expected_grand != grand_total {
                mismatches.push(format!(
                    "grand_total: expected {expected_grand}, computed {grand_total}"
                ));
            }
        }
    }

    if !mismatches.is_empty() {
        return CommandResult::failure(
            "totals",
            "totals_mismatch",
            format!("declared totals do not match the factors:\n  - {}", mismatches.join("\n  - ")),
            3,
        );
    }

    let mut lines = vec!["quotation totals verified:".to_string()];
    lines.push(format!("  - items: {}", file.items.len()));
    lines.push(format!("  - subtotal: {subtotal}"));
    lines.push(format!("  - gst_amount: {gst}"));
    lines.push(format!("  - total_amount: {total}"));
    for cost in &file.additional_costs {
        lines.push(format!(
            "  - cost `{}`: {} ({})",
            cost.item_name,
            cost.unit_price * Decimal::from(cost.quantity),
            cost.status.as_str()
        ));
    }
    lines.push(format!("  - approved_costs_total: {approved_costs_total}"));
    lines.push(format!("  - grand_total: {grand_total}"));

    CommandResult::success("totals", lines.join("\n"))
}
