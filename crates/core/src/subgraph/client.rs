use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, warn};

use super::{Document, Subgraph, SubgraphError};

#[derive(Debug, Clone)]
pub struct SubgraphClient {
    http: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct Request<'a> {
    query: &'a str,
    variables: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct Response<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

impl SubgraphClient {
    pub fn new(url: &str) -> Self {
        Self::with_http(reqwest::Client::new(), url)
    }

    pub fn with_http(http: reqwest::Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Subgraph for SubgraphClient {
    #[instrument(skip_all, fields(operation = document.operation(), url = %self.url))]
    async fn query<T: DeserializeOwned + Send>(
        &self,
        document: &Document,
        variables: serde_json::Value,
    ) -> Result<T, SubgraphError> {
        let query = document.render();
        debug!(%query, %variables, "sending subgraph query");

        let response = self
            .http
            .post(&self.url)
            .json(&Request {
                query: &query,
                variables: &variables,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "subgraph responded with an error status");
            return Err(SubgraphError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let Response { data, errors } = response.json::<Response<T>>().await?;
        decode(data, errors)
    }
}

fn decode<T>(data: Option<T>, errors: Vec<GraphQlError>) -> Result<T, SubgraphError> {
    if !errors.is_empty() {
        return Err(SubgraphError::GraphQl(
            errors.into_iter().map(|e| e.message).collect(),
        ));
    }
    data.ok_or(SubgraphError::MissingData)
}
