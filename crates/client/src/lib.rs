//! Typed client for the marketplace backend.
//!
//! Implements the core crate's collaborator traits (`CatalogClient` and
//! `PricingClient` from `marketdesk-core`) over reqwest, plus the quotation
//! and additional-cost gateways the console mirrors its local state machines
//! to. Credentials are injected through [`CredentialProvider`]; nothing in
//! this crate reads ambient global state.

pub mod backend;
pub mod costs;
pub mod credentials;
pub mod dto;
pub mod error;
pub mod quotations;

pub use backend::BackendClient;
pub use costs::{CreateAdditionalCostRequest, UpdateAdditionalCostRequest};
pub use credentials::{CredentialProvider, StaticCredentials};
pub use dto::{CatalogEntryDto, ComputePriceRequest, RemotePriceDto, ServiceAddressDto};
pub use error::ClientError;
pub use quotations::{CreateQuotationRequest, QuotationItemRequest};
