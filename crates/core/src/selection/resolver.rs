//! Option loading for the dependent-selection cascade.
//!
//! The resolver owns the [`SelectionState`] and a cache of valid options per
//! tier. Every tier change goes through it so the downstream-clear invariant
//! and the option refreshes happen in one step, instead of as per-field side
//! effects scattered over the form layer.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::{DomainError, ResolverError};
use crate::selection::{
    CategoryId, FilterAttributeId, FilterOptionId, ProviderId, SelectionState, SelectionTier,
    ServiceAddressId, SubcategoryId, TierChoice,
};

/// Transport-level failure from a catalog collaborator. Empty result sets are
/// not errors; only a failed call is.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct CatalogError(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: SubcategoryId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterAttribute {
    pub id: FilterAttributeId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: FilterOptionId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: crate::selection::SegmentId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAddress {
    pub id: ServiceAddressId,
    pub label: String,
}

/// Inputs of the provider-eligibility dependency. Providers must be
/// re-fetched whenever any of these change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderQuery {
    pub category_id: CategoryId,
    pub subcategory_id: SubcategoryId,
    pub filter_attribute_id: Option<FilterAttributeId>,
    pub filter_option_id: Option<FilterOptionId>,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;
    async fn list_subcategories(
        &self,
        category: &CategoryId,
    ) -> Result<Vec<Subcategory>, CatalogError>;
    async fn list_filter_attributes(
        &self,
        category: &CategoryId,
        subcategory: Option<&SubcategoryId>,
    ) -> Result<Vec<FilterAttribute>, CatalogError>;
    async fn list_filter_options(
        &self,
        attribute: &FilterAttributeId,
    ) -> Result<Vec<FilterOption>, CatalogError>;
    async fn list_segments(
        &self,
        category: &CategoryId,
        subcategory: &SubcategoryId,
    ) -> Result<Vec<Segment>, CatalogError>;
    async fn list_providers(&self, query: &ProviderQuery) -> Result<Vec<Provider>, CatalogError>;
    async fn list_service_addresses(
        &self,
        provider: &ProviderId,
    ) -> Result<Vec<ServiceAddress>, CatalogError>;
}

/// Valid options currently loaded per tier. A list is empty either because
/// nothing has been loaded yet, the collaborator returned nothing, or the
/// last fetch for that tier failed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TierOptions {
    pub categories: Vec<Category>,
    pub subcategories: Vec<Subcategory>,
    pub filter_attributes: Vec<FilterAttribute>,
    pub filter_options: Vec<FilterOption>,
    pub segments: Vec<Segment>,
    pub providers: Vec<Provider>,
    pub service_addresses: Vec<ServiceAddress>,
}

impl TierOptions {
    fn clear_tier(&mut self, tier: SelectionTier) {
        match tier {
            SelectionTier::Category => self.categories.clear(),
            SelectionTier::Subcategory => self.subcategories.clear(),
            SelectionTier::FilterAttribute => self.filter_attributes.clear(),
            SelectionTier::FilterOption => self.filter_options.clear(),
            SelectionTier::Segment => self.segments.clear(),
            SelectionTier::Provider => self.providers.clear(),
            SelectionTier::ServiceAddress => self.service_addresses.clear(),
        }
    }

    fn clear_downstream_of(&mut self, tier: SelectionTier) {
        for downstream in tier.downstream() {
            self.clear_tier(*downstream);
        }
    }

    pub fn count(&self, tier: SelectionTier) -> usize {
        match tier {
            SelectionTier::Category => self.categories.len(),
            SelectionTier::Subcategory => self.subcategories.len(),
            SelectionTier::FilterAttribute => self.filter_attributes.len(),
            SelectionTier::FilterOption => self.filter_options.len(),
            SelectionTier::Segment => self.segments.len(),
            SelectionTier::Provider => self.providers.len(),
            SelectionTier::ServiceAddress => self.service_addresses.len(),
        }
    }
}

pub struct SelectionResolver<C> {
    catalog: C,
    state: SelectionState,
    options: TierOptions,
}

impl<C> SelectionResolver<C>
where
    C: CatalogClient,
{
    pub fn new(catalog: C) -> Self {
        Self { catalog, state: SelectionState::new(), options: TierOptions::default() }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn options(&self) -> &TierOptions {
        &self.options
    }

    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), DomainError> {
        self.state.set_quantity(quantity)
    }

    pub fn set_price_override(
        &mut self,
        value: Option<rust_decimal::Decimal>,
    ) -> Result<(), DomainError> {
        self.state.set_price_override(value)
    }

    /// Sets one tier, clears everything downstream (state and cached
    /// options), and refreshes the option sets that depend on the changed
    /// tier.
    pub async fn choose(&mut self, choice: TierChoice) -> Result<(), ResolverError> {
        let tier = choice.tier();
        self.state.choose(choice);
        self.options.clear_downstream_of(tier);
        self.refresh_dependents_of(tier).await
    }

    /// Clears one tier and everything downstream, then refreshes dependent
    /// option sets (a cleared filter option still changes which providers
    /// are valid).
    pub async fn clear(&mut self, tier: SelectionTier) -> Result<(), ResolverError> {
        self.state.clear(tier);
        self.options.clear_tier(tier);
        self.options.clear_downstream_of(tier);
        self.refresh_dependents_of(tier).await
    }

    /// Loads the valid option set for `tier` from the catalog collaborator,
    /// given the current upstream selection. Missing upstream values yield
    /// an empty set without a remote call.
    pub async fn load_options(&mut self, tier: SelectionTier) -> Result<usize, ResolverError> {
        match tier {
            SelectionTier::Category => {
                let categories = self
                    .catalog
                    .list_categories()
                    .await
                    .map_err(|error| self.fetch_failed(tier, error))?;
                self.options.categories = categories;
            }
            SelectionTier::Subcategory => {
                let Some(category) = self.state.category_id().cloned() else {
                    self.options.subcategories.clear();
                    return Ok(0);
                };
                let subcategories = self
                    .catalog
                    .list_subcategories(&category)
                    .await
                    .map_err(|error| self.fetch_failed(tier, error))?;
                self.options.subcategories = subcategories;
            }
            SelectionTier::FilterAttribute => {
                let Some(category) = self.state.category_id().cloned() else {
                    self.options.filter_attributes.clear();
                    return Ok(0);
                };
                let subcategory = self.state.subcategory_id().cloned();
                let attributes = self
                    .catalog
                    .list_filter_attributes(&category, subcategory.as_ref())
                    .await
                    .map_err(|error| self.fetch_failed(tier, error))?;
                self.options.filter_attributes = attributes;
            }
            SelectionTier::FilterOption => {
                let Some(attribute) = self.state.filter_attribute_id().cloned() else {
                    self.options.filter_options.clear();
                    return Ok(0);
                };
                let filter_options = self
                    .catalog
                    .list_filter_options(&attribute)
                    .await
                    .map_err(|error| self.fetch_failed(tier, error))?;
                self.options.filter_options = filter_options;
            }
            SelectionTier::Segment => {
                let (Some(category), Some(subcategory)) =
                    (self.state.category_id().cloned(), self.state.subcategory_id().cloned())
                else {
                    self.options.segments.clear();
                    return Ok(0);
                };
                let segments = self
                    .catalog
                    .list_segments(&category, &subcategory)
                    .await
                    .map_err(|error| self.fetch_failed(tier, error))?;
                self.options.segments = segments;
            }
            SelectionTier::Provider => return self.refresh_providers().await,
            SelectionTier::ServiceAddress => {
                let Some(provider) = self.state.provider_id().cloned() else {
                    self.options.service_addresses.clear();
                    return Ok(0);
                };
                let addresses = self
                    .catalog
                    .list_service_addresses(&provider)
                    .await
                    .map_err(|error| self.fetch_failed(tier, error))?;
                self.options.service_addresses = addresses;
            }
        }

        Ok(self.options.count(tier))
    }

    async fn refresh_dependents_of(&mut self, tier: SelectionTier) -> Result<(), ResolverError> {
        match tier {
            SelectionTier::Category => {
                self.load_options(SelectionTier::Subcategory).await?;
            }
            SelectionTier::Subcategory => {
                self.load_options(SelectionTier::FilterAttribute).await?;
                self.load_options(SelectionTier::Segment).await?;
                self.refresh_providers().await?;
            }
            SelectionTier::FilterAttribute => {
                self.load_options(SelectionTier::FilterOption).await?;
                self.refresh_providers().await?;
            }
            SelectionTier::FilterOption => {
                self.refresh_providers().await?;
            }
            SelectionTier::Segment => {}
            SelectionTier::Provider => {
                self.load_options(SelectionTier::ServiceAddress).await?;
            }
            SelectionTier::ServiceAddress => {}
        }
        Ok(())
    }

    /// Re-fetches the provider set from the current dependency inputs and
    /// drops the selected provider if it is no longer valid.
    async fn refresh_providers(&mut self) -> Result<usize, ResolverError> {
        let (Some(category), Some(subcategory)) =
            (self.state.category_id().cloned(), self.state.subcategory_id().cloned())
        else {
            self.options.providers.clear();
            return Ok(0);
        };

        let query = ProviderQuery {
            category_id: category,
            subcategory_id: subcategory,
            filter_attribute_id: self.state.filter_attribute_id().cloned(),
            filter_option_id: self.state.filter_option_id().cloned(),
        };

        let providers = match self.catalog.list_providers(&query).await {
            Ok(providers) => providers,
            Err(error) => {
                self.options.providers.clear();
                return Err(self.fetch_failed(SelectionTier::Provider, error));
            }
        };

        if let Some(current) = self.state.provider_id().cloned() {
            if !providers.iter().any(|provider| provider.id == current) {
                self.state.clear(SelectionTier::Provider);
                self.options.clear_downstream_of(SelectionTier::Provider);
            }
        }

        self.options.providers = providers;
        Ok(self.options.providers.len())
    }

    fn fetch_failed(&self, tier: SelectionTier, error: CatalogError) -> ResolverError {
        ResolverError::CatalogFetchFailed { tier, message: error.0 }
    }
}

/// Deterministic catalog backed by in-memory maps. Used by tests; the
/// production implementation lives in the client crate.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalogClient {
    pub categories: Vec<Category>,
    pub subcategories: HashMap<String, Vec<Subcategory>>,
    pub filter_attributes: HashMap<String, Vec<FilterAttribute>>,
    pub filter_options: HashMap<String, Vec<FilterOption>>,
    pub segments: HashMap<String, Vec<Segment>>,
    pub providers: HashMap<String, Vec<Provider>>,
    pub service_addresses: HashMap<String, Vec<ServiceAddress>>,
    pub failing_tiers: HashSet<SelectionTier>,
}

impl InMemoryCatalogClient {
    fn fail_if_configured(&self, tier: SelectionTier) -> Result<(), CatalogError> {
        if self.failing_tiers.contains(&tier) {
            return Err(CatalogError(format!("{} endpoint unavailable", tier.as_str())));
        }
        Ok(())
    }

    fn provider_key(query: &ProviderQuery) -> String {
        [
            query.category_id.0.as_str(),
            query.subcategory_id.0.as_str(),
            query.filter_attribute_id.as_ref().map(|id| id.0.as_str()).unwrap_or(""),
            query.filter_option_id.as_ref().map(|id| id.0.as_str()).unwrap_or(""),
        ]
        .join("/")
    }

    pub fn insert_providers(&mut self, query: &ProviderQuery, providers: Vec<Provider>) {
        self.providers.insert(Self::provider_key(query), providers);
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalogClient {
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.fail_if_configured(SelectionTier::Category)?;
        Ok(self.categories.clone())
    }

    async fn list_subcategories(
        &self,
        category: &CategoryId,
    ) -> Result<Vec<Subcategory>, CatalogError> {
        self.fail_if_configured(SelectionTier::Subcategory)?;
        Ok(self.subcategories.get(&category.0).cloned().unwrap_or_default())
    }

    async fn list_filter_attributes(
        &self,
        category: &CategoryId,
        _subcategory: Option<&SubcategoryId>,
    ) -> Result<Vec<FilterAttribute>, CatalogError> {
        self.fail_if_configured(SelectionTier::FilterAttribute)?;
        Ok(self.filter_attributes.get(&category.0).cloned().unwrap_or_default())
    }

    async fn list_filter_options(
        &self,
        attribute: &FilterAttributeId,
    ) -> Result<Vec<FilterOption>, CatalogError> {
        self.fail_if_configured(SelectionTier::FilterOption)?;
        Ok(self.filter_options.get(&attribute.0).cloned().unwrap_or_default())
    }

    async fn list_segments(
        &self,
        category: &CategoryId,
        subcategory: &SubcategoryId,
    ) -> Result<Vec<Segment>, CatalogError> {
        self.fail_if_configured(SelectionTier::Segment)?;
        let key = format!("{}/{}", category.0, subcategory.0);
        Ok(self.segments.get(&key).cloned().unwrap_or_default())
    }

    async fn list_providers(&self, query: &ProviderQuery) -> Result<Vec<Provider>, CatalogError> {
        self.fail_if_configured(SelectionTier::Provider)?;
        Ok(self.providers.get(&Self::provider_key(query)).cloned().unwrap_or_default())
    }

    async fn list_service_addresses(
        &self,
        provider: &ProviderId,
    ) -> Result<Vec<ServiceAddress>, CatalogError> {
        self.fail_if_configured(SelectionTier::ServiceAddress)?;
        Ok(self.service_addresses.get(&provider.0).cloned().unwrap_or_default())
    }
}
