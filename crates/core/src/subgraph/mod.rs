//! Access to the exchange's GraphQL subgraphs: typed query documents, the HTTP client
//! and the response shapes.
use std::future::Future;

use serde::de::DeserializeOwned;

pub use client::SubgraphClient;
pub use document::{Document, Field, Fragment, SubgraphId, Value};
pub use queries::BlockRef;

mod client;
pub mod document;
pub mod models;
pub mod queries;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("`{0}` is not a 0x-prefixed 20-byte hex id")]
    InvalidId(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SubgraphError {
    #[error("subgraph request failed")]
    Http(#[from] reqwest::Error),

    #[error("subgraph responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("subgraph returned errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("subgraph response carried no data")]
    MissingData,

    #[error("failed to decode subgraph response")]
    Decode(#[from] serde_json::Error),
}

/// Something that can answer GraphQL documents. Implemented by [`SubgraphClient`] over
/// HTTP; tests answer from canned responses.
pub trait Subgraph {
    fn query<T: DeserializeOwned + Send>(
        &self,
        document: &Document,
        variables: serde_json::Value,
    ) -> impl Future<Output = Result<T, SubgraphError>> + Send;
}
