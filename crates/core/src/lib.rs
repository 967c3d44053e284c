pub mod audit;
pub mod config;
pub mod costs;
pub mod errors;
pub mod order;
pub mod pricing;
pub mod quotation;
pub mod selection;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use costs::{
    grand_total, AdditionalCost, AdditionalCostDraft, AdditionalCostId, AdditionalCostLedger,
    AdditionalCostRecord, CostParent, CostResolution, CostStatus, CostUpdate, ParentGate,
};
pub use errors::{DomainError, ErrorPresentation, ResolverError};
pub use order::{
    commit_order, commit_order_with_audit, Order, OrderId, OrderPayload, OrderStatus,
};
pub use pricing::resolver::{
    PriceBoard, PriceDisplay, PriceResolver, PricingClient, PricingError,
};
pub use pricing::{gst_amount, reconcile, round_money, DisplayAmounts, PriceQuote, RemotePrice};
pub use quotation::{
    allowed_actions, apply_with_audit, can_transition, LifecycleAction, Quotation,
    QuotationAction, QuotationId, QuotationItem, QuotationRecord, QuotationStatus, SendChannel,
};
pub use selection::resolver::{
    CatalogClient, CatalogError, Category, FilterAttribute, FilterOption, InMemoryCatalogClient,
    Provider, ProviderQuery, Segment, SelectionResolver, ServiceAddress, Subcategory, TierOptions,
};
pub use selection::{
    CategoryId, FilterAttributeId, FilterOptionId, ProviderId, RateCardId, SegmentId,
    SelectionFingerprint, SelectionSnapshot, SelectionState, SelectionTier, SelectionView,
    ServiceAddressId, SubcategoryId, TierChoice,
};
