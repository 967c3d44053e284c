pub mod resolver;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubcategoryId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterAttributeId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterOptionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceAddressId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateCardId(pub String);

/// The seven dependent tiers, in cascade order. Choosing or clearing a tier
/// invalidates everything strictly after it in `ORDER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTier {
    Category,
    Subcategory,
    FilterAttribute,
    FilterOption,
    Segment,
    Provider,
    ServiceAddress,
}

impl SelectionTier {
    pub const ORDER: [SelectionTier; 7] = [
        SelectionTier::Category,
        SelectionTier::Subcategory,
        SelectionTier::FilterAttribute,
        SelectionTier::FilterOption,
        SelectionTier::Segment,
        SelectionTier::Provider,
        SelectionTier::ServiceAddress,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::FilterAttribute => "filter_attribute",
            Self::FilterOption => "filter_option",
            Self::Segment => "segment",
            Self::Provider => "provider",
            Self::ServiceAddress => "service_address",
        }
    }

    fn index(self) -> usize {
        Self::ORDER.iter().position(|tier| *tier == self).unwrap_or(Self::ORDER.len() - 1)
    }

    /// Tiers strictly downstream of `self` in cascade order.
    pub fn downstream(self) -> &'static [SelectionTier] {
        &Self::ORDER[self.index() + 1..]
    }
}

/// A concrete choice for one tier. The carried identifier type pins each
/// choice to its tier, so a subcategory id can never land in the provider
/// slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tier", content = "id", rename_all = "snake_case")]
pub enum TierChoice {
    Category(CategoryId),
    Subcategory(SubcategoryId),
    FilterAttribute(FilterAttributeId),
    FilterOption(FilterOptionId),
    Segment(SegmentId),
    Provider(ProviderId),
    ServiceAddress(ServiceAddressId),
}

impl TierChoice {
    pub fn tier(&self) -> SelectionTier {
        match self {
            Self::Category(_) => SelectionTier::Category,
            Self::Subcategory(_) => SelectionTier::Subcategory,
            Self::FilterAttribute(_) => SelectionTier::FilterAttribute,
            Self::FilterOption(_) => SelectionTier::FilterOption,
            Self::Segment(_) => SelectionTier::Segment,
            Self::Provider(_) => SelectionTier::Provider,
            Self::ServiceAddress(_) => SelectionTier::ServiceAddress,
        }
    }
}

/// Opaque token identifying the exact selection that triggered a price
/// request. Monotonically increasing, so replaying an earlier selection still
/// outranks responses issued before the replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectionFingerprint(pub u64);

/// Snapshot of a price-eligible selection, sent to the remote pricing
/// function. Category, subcategory, and provider are mandatory; the filter
/// and segment tiers narrow the rate card but are optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    pub category_id: CategoryId,
    pub subcategory_id: SubcategoryId,
    pub filter_attribute_id: Option<FilterAttributeId>,
    pub filter_option_id: Option<FilterOptionId>,
    pub segment_id: Option<SegmentId>,
    pub provider_id: ProviderId,
    pub service_address_id: Option<ServiceAddressId>,
    pub quantity: u32,
    pub fingerprint: SelectionFingerprint,
}

/// Cheap owned view of the pricing-relevant parts of a [`SelectionState`],
/// safe to hand to overlapping in-flight recomputations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionView {
    pub fingerprint: SelectionFingerprint,
    pub quantity: u32,
    pub custom_price_override: Option<Decimal>,
    pub snapshot: Option<SelectionSnapshot>,
}

/// The current cascading choice plus quantity and an optional manual price
/// override.
///
/// All mutation goes through the reducer methods below, which enforce the
/// cascade invariant atomically: whenever tier N changes, every tier strictly
/// downstream of N is cleared in the same call. The version counter bumps on
/// every change that can affect the computed price, which is what makes the
/// staleness comparison in the price resolver sound.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    category_id: Option<CategoryId>,
    subcategory_id: Option<SubcategoryId>,
    filter_attribute_id: Option<FilterAttributeId>,
    filter_option_id: Option<FilterOptionId>,
    segment_id: Option<SegmentId>,
    provider_id: Option<ProviderId>,
    service_address_id: Option<ServiceAddressId>,
    quantity: u32,
    custom_price_override: Option<Decimal>,
    version: u64,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            category_id: None,
            subcategory_id: None,
            filter_attribute_id: None,
            filter_option_id: None,
            segment_id: None,
            provider_id: None,
            service_address_id: None,
            quantity: 1,
            custom_price_override: None,
            version: 0,
        }
    }
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category_id(&self) -> Option<&CategoryId> {
        self.category_id.as_ref()
    }

    pub fn subcategory_id(&self) -> Option<&SubcategoryId> {
        self.subcategory_id.as_ref()
    }

    pub fn filter_attribute_id(&self) -> Option<&FilterAttributeId> {
        self.filter_attribute_id.as_ref()
    }

    pub fn filter_option_id(&self) -> Option<&FilterOptionId> {
        self.filter_option_id.as_ref()
    }

    pub fn segment_id(&self) -> Option<&SegmentId> {
        self.segment_id.as_ref()
    }

    pub fn provider_id(&self) -> Option<&ProviderId> {
        self.provider_id.as_ref()
    }

    pub fn service_address_id(&self) -> Option<&ServiceAddressId> {
        self.service_address_id.as_ref()
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn custom_price_override(&self) -> Option<Decimal> {
        self.custom_price_override
    }

    pub fn fingerprint(&self) -> SelectionFingerprint {
        SelectionFingerprint(self.version)
    }

    /// Raw identifier currently held at `tier`, if any.
    pub fn value(&self, tier: SelectionTier) -> Option<&str> {
        match tier {
            SelectionTier::Category => self.category_id.as_ref().map(|id| id.0.as_str()),
            SelectionTier::Subcategory => self.subcategory_id.as_ref().map(|id| id.0.as_str()),
            SelectionTier::FilterAttribute => {
                self.filter_attribute_id.as_ref().map(|id| id.0.as_str())
            }
            SelectionTier::FilterOption => self.filter_option_id.as_ref().map(|id| id.0.as_str()),
            SelectionTier::Segment => self.segment_id.as_ref().map(|id| id.0.as_str()),
            SelectionTier::Provider => self.provider_id.as_ref().map(|id| id.0.as_str()),
            SelectionTier::ServiceAddress => {
                self.service_address_id.as_ref().map(|id| id.0.as_str())
            }
        }
    }

    /// Sets one tier and clears everything strictly downstream of it.
    pub fn choose(&mut self, choice: TierChoice) {
        let tier = choice.tier();
        match choice {
            TierChoice::Category(id) => self.category_id = Some(id),
            TierChoice::Subcategory(id) => self.subcategory_id = Some(id),
            TierChoice::FilterAttribute(id) => self.filter_attribute_id = Some(id),
            TierChoice::FilterOption(id) => self.filter_option_id = Some(id),
            TierChoice::Segment(id) => self.segment_id = Some(id),
            TierChoice::Provider(id) => self.provider_id = Some(id),
            TierChoice::ServiceAddress(id) => self.service_address_id = Some(id),
        }
        self.clear_downstream_of(tier);
        self.version += 1;
    }

    /// Clears one tier and everything strictly downstream of it.
    pub fn clear(&mut self, tier: SelectionTier) {
        self.clear_slot(tier);
        self.clear_downstream_of(tier);
        self.version += 1;
    }

    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::Validation {
                field: "quantity",
                reason: "must be a positive integer".to_owned(),
            });
        }
        self.quantity = quantity;
        self.version += 1;
        Ok(())
    }

    /// Manual per-unit price override. Display-layer reconciliation only: it
    /// does not invalidate the resolved quote, so clearing the override can
    /// fall back to the last valid base price.
    pub fn set_price_override(&mut self, value: Option<Decimal>) -> Result<(), DomainError> {
        if let Some(amount) = value {
            if amount.is_sign_negative() {
                return Err(DomainError::Validation {
                    field: "custom_price_override",
                    reason: "must not be negative".to_owned(),
                });
            }
        }
        self.custom_price_override = value;
        Ok(())
    }

    /// Minimum-field contract for price computation: category, subcategory,
    /// and provider must all be present.
    pub fn is_price_eligible(&self) -> bool {
        self.category_id.is_some() && self.subcategory_id.is_some() && self.provider_id.is_some()
    }

    /// Required pricing fields currently missing, for local validation
    /// messages.
    pub fn missing_for_pricing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.category_id.is_none() {
            missing.push("category");
        }
        if self.subcategory_id.is_none() {
            missing.push("subcategory");
        }
        if self.provider_id.is_none() {
            missing.push("provider");
        }
        missing
    }

    pub fn pricing_snapshot(&self) -> Option<SelectionSnapshot> {
        Some(SelectionSnapshot {
            category_id: self.category_id.clone()?,
            subcategory_id: self.subcategory_id.clone()?,
            filter_attribute_id: self.filter_attribute_id.clone(),
            filter_option_id: self.filter_option_id.clone(),
            segment_id: self.segment_id.clone(),
            provider_id: self.provider_id.clone()?,
            service_address_id: self.service_address_id.clone(),
            quantity: self.quantity,
            fingerprint: self.fingerprint(),
        })
    }

    pub fn view(&self) -> SelectionView {
        SelectionView {
            fingerprint: self.fingerprint(),
            quantity: self.quantity,
            custom_price_override: self.custom_price_override,
            snapshot: self.pricing_snapshot(),
        }
    }

    fn clear_downstream_of(&mut self, tier: SelectionTier) {
        for downstream in tier.downstream() {
            self.clear_slot(*downstream);
        }
    }

    fn clear_slot(&mut self, tier: SelectionTier) {
        match tier {
            SelectionTier::Category => self.category_id = None,
            SelectionTier::Subcategory => self.subcategory_id = None,
            SelectionTier::FilterAttribute => self.filter_attribute_id = None,
            SelectionTier::FilterOption => self.filter_option_id = None,
            SelectionTier::Segment => self.segment_id = None,
            SelectionTier::Provider => self.provider_id = None,
            SelectionTier::ServiceAddress => self.service_address_id = None,
        }
    }
}
