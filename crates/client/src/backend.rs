//! Typed reqwest client for the marketplace backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use marketdesk_core::config::BackendConfig;
use marketdesk_core::{
    CatalogClient, CatalogError, Category, CategoryId, FilterAttribute, FilterAttributeId,
    FilterOption, PricingClient, PricingError, Provider, ProviderId, ProviderQuery, RemotePrice,
    Segment, SelectionSnapshot, ServiceAddress, Subcategory, SubcategoryId,
};

use crate::credentials::{CredentialProvider, StaticCredentials};
use crate::dto::{CatalogEntryDto, ComputePriceRequest, RemotePriceDto, ServiceAddressDto};
use crate::error::ClientError;

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl BackendClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Build { source })?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, base_url, credentials })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, ClientError> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
            Arc::new(StaticCredentials::from_backend(config)),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.credentials.api_token() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    pub(crate) async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let builder = self.http.get(&url).query(query);
        self.execute(builder, url).await
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let builder = self.http.post(&url).json(body);
        self.execute(builder, url).await
    }

    pub(crate) async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let builder = self.http.put(&url).json(body);
        self.execute(builder, url).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let url = self.endpoint(path);
        let builder = self.http.delete(&url);
        self.send_checked(builder, &url).await.map(|_| ())
    }

    /// Lightweight reachability probe used by the CLI doctor command.
    pub async fn ping(&self) -> Result<(), ClientError> {
        let url = self.endpoint("health");
        let builder = self.http.get(&url);
        self.send_checked(builder, &url).await.map(|_| ())
    }

    async fn execute<T>(&self, builder: RequestBuilder, url: String) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let response = self.send_checked(builder, &url).await?;
        response.json().await.map_err(|source| {
            warn!(%url, error = %source, "backend response did not match the expected shape");
            ClientError::Decode { url, source }
        })
    }

    async fn send_checked(
        &self,
        builder: RequestBuilder,
        url: &str,
    ) -> Result<reqwest::Response, ClientError> {
        debug!(%url, "calling marketplace backend");
        let response = self.authorize(builder).send().await.map_err(|source| {
            warn!(%url, error = %source, "backend request failed in transport");
            ClientError::Transport { url: url.to_owned(), source }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, %status, "backend rejected the request");
            return Err(ClientError::Status { url: url.to_owned(), status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl CatalogClient for BackendClient {
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let rows: Vec<CatalogEntryDto> =
            self.get_json("categories", &[]).await.map_err(as_catalog_error)?;
        Ok(rows.into_iter().map(CatalogEntryDto::into_category).collect())
    }

    async fn list_subcategories(
        &self,
        category: &CategoryId,
    ) -> Result<Vec<Subcategory>, CatalogError> {
        let rows: Vec<CatalogEntryDto> = self
            .get_json(&format!("categories/{}/subcategories", category.0), &[])
            .await
            .map_err(as_catalog_error)?;
        Ok(rows.into_iter().map(CatalogEntryDto::into_subcategory).collect())
    }

    async fn list_filter_attributes(
        &self,
        category: &CategoryId,
        subcategory: Option<&SubcategoryId>,
    ) -> Result<Vec<FilterAttribute>, CatalogError> {
        let mut query = vec![("category_id", category.0.as_str())];
        if let Some(subcategory) = subcategory {
            query.push(("subcategory_id", subcategory.0.as_str()));
        }
        let rows: Vec<CatalogEntryDto> =
            self.get_json("filter-attributes", &query).await.map_err(as_catalog_error)?;
        Ok(rows.into_iter().map(CatalogEntryDto::into_filter_attribute).collect())
    }

    async fn list_filter_options(
        &self,
        attribute: &FilterAttributeId,
    ) -> Result<Vec<FilterOption>, CatalogError> {
        let rows: Vec<CatalogEntryDto> = self
            .get_json(&format!("filter-attributes/{}/options", attribute.0), &[])
            .await
            .map_err(as_catalog_error)?;
        Ok(rows.into_iter().map(CatalogEntryDto::into_filter_option).collect())
    }

    async fn list_segments(
        &self,
        category: &CategoryId,
        subcategory: &SubcategoryId,
    ) -> Result<Vec<Segment>, CatalogError> {
        let query =
            [("category_id", category.0.as_str()), ("subcategory_id", subcategory.0.as_str())];
        let rows: Vec<CatalogEntryDto> =
            self.get_json("segments", &query).await.map_err(as_catalog_error)?;
        Ok(rows.into_iter().map(CatalogEntryDto::into_segment).collect())
    }

    async fn list_providers(&self, query: &ProviderQuery) -> Result<Vec<Provider>, CatalogError> {
        let mut params = vec![
            ("category_id", query.category_id.0.as_str()),
            ("subcategory_id", query.subcategory_id.0.as_str()),
        ];
        if let Some(attribute) = &query.filter_attribute_id {
            params.push(("filter_attribute_id", attribute.0.as_str()));
        }
        if let Some(option) = &query.filter_option_id {
            params.push(("filter_option_id", option.0.as_str()));
        }
        let rows: Vec<CatalogEntryDto> =
            self.get_json("providers", &params).await.map_err(as_catalog_error)?;
        Ok(rows.into_iter().map(CatalogEntryDto::into_provider).collect())
    }

    async fn list_service_addresses(
        &self,
        provider: &ProviderId,
    ) -> Result<Vec<ServiceAddress>, CatalogError> {
        let rows: Vec<ServiceAddressDto> = self
            .get_json(&format!("providers/{}/service-addresses", provider.0), &[])
            .await
            .map_err(as_catalog_error)?;
        Ok(rows.into_iter().map(ServiceAddressDto::into_service_address).collect())
    }
}

#[async_trait]
impl PricingClient for BackendClient {
    async fn compute_price(
        &self,
        snapshot: &SelectionSnapshot,
    ) -> Result<RemotePrice, PricingError> {
        let request = ComputePriceRequest::from(snapshot);
        let dto: RemotePriceDto = self
            .post_json("pricing/compute", &request)
            .await
            .map_err(|error| PricingError(error.to_string()))?;
        Ok(RemotePrice::from(dto))
    }
}

fn as_catalog_error(error: ClientError) -> CatalogError {
    CatalogError(error.to_string())
}
