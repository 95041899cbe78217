#[allow(clippy::module_inception)]
mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

/// A daemon API call: how to build the HTTP request, and what it answers with.
pub trait ApiRequest {
    type Response: DeserializeOwned;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError>;
}
