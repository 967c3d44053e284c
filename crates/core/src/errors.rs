use thiserror::Error;

use crate::costs::CostStatus;
use crate::quotation::QuotationStatus;
use crate::selection::SelectionTier;

/// Business-rule violations. These always reach the operator as explicit
/// rejection messages naming the violated rule.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid quotation transition from {from:?} to {to:?}")]
    InvalidTransition { from: QuotationStatus, to: QuotationStatus },
    #[error("additional cost `{cost_id}` is already {status:?}")]
    AlreadyResolved { cost_id: String, status: CostStatus },
    #[error("{parent} is {status} and locked against additional-cost changes")]
    ParentLocked { parent: String, status: String },
    #[error("validation failed for `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("unknown additional cost `{0}`")]
    UnknownCost(String),
}

/// Collaborator failures the resolvers recover from locally. They never halt
/// the cascade: the affected tier falls back to an empty option set and the
/// price display keeps its last valid quote, marked stale.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolverError {
    #[error("catalog fetch failed for {tier:?}: {message}")]
    CatalogFetchFailed { tier: SelectionTier, message: String },
    #[error("price computation failed: {message}")]
    PriceComputationFailed { message: String },
}

/// How a condition renders to the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorPresentation {
    /// "Select more" / "recalculating" affordances; not an error state.
    NeutralAffordance,
    /// Transport or remote failure; retry is meaningful.
    RetryableBanner,
    /// Business-rule rejection; retry without changing inputs is pointless.
    RuleRejection,
}

impl ErrorPresentation {
    pub fn user_message(self) -> &'static str {
        match self {
            Self::NeutralAffordance => "Complete the selection to continue.",
            Self::RetryableBanner => {
                "The marketplace backend is temporarily unavailable. Please retry."
            }
            Self::RuleRejection => "The request was rejected by a business rule.",
        }
    }
}

impl DomainError {
    pub fn presentation(&self) -> ErrorPresentation {
        ErrorPresentation::RuleRejection
    }
}

impl ResolverError {
    pub fn presentation(&self) -> ErrorPresentation {
        ErrorPresentation::RetryableBanner
    }
}

#[cfg(test)]
mod tests {
    use super::{DomainError, ErrorPresentation, ResolverError};
    use crate::quotation::QuotationStatus;
    use crate::selection::SelectionTier;

    #[test]
    fn transition_violations_render_as_rule_rejections() {
        let error = DomainError::InvalidTransition {
            from: QuotationStatus::Draft,
            to: QuotationStatus::Approved,
        };

        assert_eq!(error.presentation(), ErrorPresentation::RuleRejection);
        assert_eq!(error.to_string(), "invalid quotation transition from Draft to Approved");
    }

    #[test]
    fn catalog_failures_render_as_retryable_banners() {
        let error = ResolverError::CatalogFetchFailed {
            tier: SelectionTier::Provider,
            message: "connection reset".to_owned(),
        };

        assert_eq!(error.presentation(), ErrorPresentation::RetryableBanner);
        assert_eq!(
            ErrorPresentation::RetryableBanner.user_message(),
            "The marketplace backend is temporarily unavailable. Please retry."
        );
    }

    #[test]
    fn validation_failures_name_the_offending_field() {
        let error = DomainError::Validation {
            field: "quantity",
            reason: "must be a positive integer".to_owned(),
        };

        assert_eq!(
            error.to_string(),
            "validation failed for `quantity`: must be a positive integer"
        );
    }
}
