use log::{debug, warn};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::auth::Credentials;
use crate::error::{ReportError, Result};

const SCROLL_KEEP_ALIVE: &str = "1m";

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    #[serde(rename = "_scroll_id", default)]
    scroll_id: Option<String>,
    hits: Hits<T>,
}

#[derive(Debug, Deserialize)]
struct Hits<T> {
    hits: Vec<Hit<T>>,
}

#[derive(Debug, Deserialize)]
struct Hit<T> {
    #[serde(rename = "_source")]
    source: T,
}

pub struct OpenSearchClient {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl OpenSearchClient {
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("prowreport/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReportError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut base_url = Url::parse(base_url)
            .map_err(|e| ReportError::Config(format!("Invalid OpenSearch URL: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(credentials) => credentials.apply(request),
            None => request,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ReportError::Config(format!("Invalid OpenSearch endpoint {path}: {e}")))
    }

    async fn page<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<SearchResponse<T>> {
        let response = self.auth_request(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Search {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Runs `query` against `index` and follows the scroll cursor until an
    /// empty page, returning every hit's `_source`.
    pub async fn search_all<T: DeserializeOwned>(
        &self,
        index: &str,
        query: &Value,
    ) -> Result<Vec<T>> {
        let mut url = self.endpoint(&format!("{index}/_search"))?;
        url.set_query(Some(&format!("scroll={SCROLL_KEEP_ALIVE}")));

        let mut page: SearchResponse<T> = self.page(self.client.post(url).json(query)).await?;
        let mut documents = Vec::new();
        let mut scroll_id: Option<String> = None;

        loop {
            if let Some(id) = page.scroll_id.take() {
                scroll_id = Some(id);
            }
            if page.hits.hits.is_empty() {
                break;
            }

            documents.extend(page.hits.hits.into_iter().map(|hit| hit.source));
            debug!("Fetched {} documents from {index}", documents.len());

            let Some(id) = scroll_id.as_deref() else {
                break;
            };
            let body = json!({ "scroll": SCROLL_KEEP_ALIVE, "scroll_id": id });
            let url = self.endpoint("_search/scroll")?;
            page = self.page(self.client.post(url).json(&body)).await?;
        }

        if let Some(id) = scroll_id {
            self.clear_scroll(&id).await;
        }

        Ok(documents)
    }

    async fn clear_scroll(&self, scroll_id: &str) {
        let url = match self.endpoint("_search/scroll") {
            Ok(url) => url,
            Err(e) => {
                warn!("Could not clear scroll context: {e}");
                return;
            }
        };

        let request = self
            .client
            .delete(url)
            .json(&json!({ "scroll_id": [scroll_id] }));

        match self.auth_request(request).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Cleared scroll context");
            }
            Ok(response) => warn!("Clearing scroll context returned {}", response.status()),
            Err(e) => warn!("Could not clear scroll context: {e}"),
        }
    }
}
