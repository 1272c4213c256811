//! LLM integration module
//!
//! This module provides the provider data model, request building,
//! HTTP transport and response normalization for every supported
//! provider kind.

pub mod client;
pub mod keys;
pub mod normalize;
pub mod provider;
pub mod request;

// Provider kind handlers
pub mod providers {
    pub mod anthropic;
    mod custom;
    pub mod openai;

    pub use custom::CustomKindHandler;
}

// Re-exports
pub use client::{ProviderClient, RawResponse, Transport};
pub use keys::{ApiKeySource, EnvKeySource, StaticKeySource};
pub use normalize::{Normalized, ResponseNormalizer};
pub use provider::{
    AggregatedOutcome, DispatchRequest, DispatchResult, DispatchStatus, ProviderConfig,
    ProviderKind,
};
pub use providers::CustomKindHandler;
pub use request::{AuthScheme, PreparedRequest, RequestBuilder, WireRequest};
