//! Wire shapes for the marketplace backend.
//!
//! Every payload crossing the wire has an explicit typed shape here; nothing
//! in the core crate deserializes backend JSON directly. Identifiers travel
//! as plain strings and are wrapped into their typed newtypes at the
//! conversion boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketdesk_core::{
    Category, CategoryId, FilterAttribute, FilterAttributeId, FilterOption, FilterOptionId,
    Provider, ProviderId, RateCardId, RemotePrice, SegmentId, SelectionSnapshot, ServiceAddress,
    ServiceAddressId, Subcategory, SubcategoryId,
};

/// Generic id+name row returned by every catalog listing except service
/// addresses.
#[derive(Clone, Debug, Deserialize)]
pub struct CatalogEntryDto {
    pub id: String,
    pub name: String,
}

impl CatalogEntryDto {
    pub fn into_category(self) -> Category {
        Category { id: CategoryId(self.id), name: self.name }
    }

    pub fn into_subcategory(self) -> Subcategory {
        Subcategory { id: SubcategoryId(self.id), name: self.name }
    }

    pub fn into_filter_attribute(self) -> FilterAttribute {
        FilterAttribute { id: FilterAttributeId(self.id), name: self.name }
    }

    pub fn into_filter_option(self) -> FilterOption {
        FilterOption { id: FilterOptionId(self.id), name: self.name }
    }

    pub fn into_segment(self) -> marketdesk_core::Segment {
        marketdesk_core::Segment { id: SegmentId(self.id), name: self.name }
    }

    pub fn into_provider(self) -> Provider {
        Provider { id: ProviderId(self.id), name: self.name }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServiceAddressDto {
    pub id: String,
    pub label: String,
}

impl ServiceAddressDto {
    pub fn into_service_address(self) -> ServiceAddress {
        ServiceAddress { id: ServiceAddressId(self.id), label: self.label }
    }
}

/// Price computation request. The selection fingerprint is a local ordering
/// token and never crosses the wire.
#[derive(Debug, Serialize)]
pub struct ComputePriceRequest<'a> {
    pub category_id: &'a str,
    pub subcategory_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_attribute_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_option_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<&'a str>,
    pub provider_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_address_id: Option<&'a str>,
    pub quantity: u32,
}

impl<'a> From<&'a SelectionSnapshot> for ComputePriceRequest<'a> {
    fn from(snapshot: &'a SelectionSnapshot) -> Self {
        Self {
            category_id: &snapshot.category_id.0,
            subcategory_id: &snapshot.subcategory_id.0,
            filter_attribute_id: snapshot.filter_attribute_id.as_ref().map(|id| id.0.as_str()),
            filter_option_id: snapshot.filter_option_id.as_ref().map(|id| id.0.as_str()),
            segment_id: snapshot.segment_id.as_ref().map(|id| id.0.as_str()),
            provider_id: &snapshot.provider_id.0,
            service_address_id: snapshot.service_address_id.as_ref().map(|id| id.0.as_str()),
            quantity: snapshot.quantity,
        }
    }
}

/// Computed price as returned by the backend. The optional totals let the
/// backend apply provider-specific adjustments; absent, the core derives them
/// from the base price.
#[derive(Clone, Debug, Deserialize)]
pub struct RemotePriceDto {
    pub base_price: Decimal,
    #[serde(default)]
    pub item_total: Option<Decimal>,
    #[serde(default)]
    pub gst_amount: Option<Decimal>,
    #[serde(default)]
    pub convenience_charge: Option<Decimal>,
    #[serde(default)]
    pub rate_card_id: Option<String>,
}

impl From<RemotePriceDto> for RemotePrice {
    fn from(dto: RemotePriceDto) -> Self {
        Self {
            base_price: dto.base_price,
            item_total: dto.item_total,
            gst_amount: dto.gst_amount,
            convenience_charge: dto.convenience_charge.unwrap_or(Decimal::ZERO),
            rate_card_id: dto.rate_card_id.map(RateCardId),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use marketdesk_core::{
        CategoryId, ProviderId, RemotePrice, SelectionState, SubcategoryId, TierChoice,
    };

    use super::{CatalogEntryDto, ComputePriceRequest, RemotePriceDto};

    #[test]
    fn a_minimal_price_payload_fills_in_the_optional_fields() {
        let dto: RemotePriceDto =
            serde_json::from_str(r#"{"base_price":"500"}"#).expect("price json");
        let remote = RemotePrice::from(dto);

        assert_eq!(remote.base_price, Decimal::new(500, 0));
        assert_eq!(remote.item_total, None);
        assert_eq!(remote.convenience_charge, Decimal::ZERO);
        assert_eq!(remote.rate_card_id, None);
    }

    #[test]
    fn a_full_price_payload_keeps_the_backend_totals() {
        let dto: RemotePriceDto = serde_json::from_str(
            r#"{"base_price":"500","item_total":"950","gst_amount":"171","convenience_charge":"49","rate_card_id":"rc-77"}"#,
        )
        .expect("price json");
        let remote = RemotePrice::from(dto);

        assert_eq!(remote.item_total, Some(Decimal::new(950, 0)));
        assert_eq!(remote.rate_card_id.map(|id| id.0), Some("rc-77".to_owned()));
    }

    #[test]
    fn the_price_request_omits_unset_tiers_and_the_fingerprint() {
        let mut state = SelectionState::new();
        state.choose(TierChoice::Category(CategoryId("cat-home".into())));
        state.choose(TierChoice::Subcategory(SubcategoryId("sub-cleaning".into())));
        state.choose(TierChoice::Provider(ProviderId("prov-acme".into())));
        state.set_quantity(2).expect("quantity");
        let snapshot = state.pricing_snapshot().expect("eligible snapshot");

        let request = ComputePriceRequest::from(&snapshot);
        let json = serde_json::to_value(&request).expect("request json");

        assert_eq!(
            json,
            serde_json::json!({
                "category_id": "cat-home",
                "subcategory_id": "sub-cleaning",
                "provider_id": "prov-acme",
                "quantity": 2,
            })
        );
    }

    #[test]
    fn catalog_rows_convert_into_their_tier_types() {
        let dto: CatalogEntryDto =
            serde_json::from_str(r#"{"id":"cat-home","name":"Home"}"#).expect("catalog json");
        let category = dto.clone().into_category();
        assert_eq!(category.id, CategoryId("cat-home".into()));
        assert_eq!(category.name, "Home");

        let provider = dto.into_provider();
        assert_eq!(provider.id, ProviderId("cat-home".into()));
    }
}
