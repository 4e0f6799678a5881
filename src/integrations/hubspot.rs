//! HubSpot CRM company lookup

use super::{http_client, response_text};
use crate::error::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

const SERVICE: &str = "HubSpot";
const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";
const PROPERTIES: &[&str] = &["name", "address", "city", "state", "zip", "phone"];
const SEARCH_LIMIT: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub phone: String,
}

impl CustomerRecord {
    /// "street, city, state zip" with blanks skipped
    pub fn job_site(&self) -> String {
        let region = [self.state.as_str(), self.zip.as_str()]
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim())
            .collect::<Vec<_>>()
            .join(" ");
        [self.address.trim(), self.city.trim(), region.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: String,
    #[serde(default)]
    properties: HashMap<String, Option<String>>,
}

pub fn parse_company_search(json: &str) -> Result<Vec<CustomerRecord>> {
    let response: SearchResponse = serde_json::from_str(json)?;
    Ok(response
        .results
        .into_iter()
        .map(|result| {
            let prop = |key: &str| {
                result
                    .properties
                    .get(key)
                    .cloned()
                    .flatten()
                    .unwrap_or_default()
            };
            CustomerRecord {
                name: prop("name"),
                address: prop("address"),
                city: prop("city"),
                state: prop("state"),
                zip: prop("zip"),
                phone: prop("phone"),
                id: result.id.clone(),
            }
        })
        .collect())
}

pub struct HubSpotClient {
    client: Client,
    access_token: String,
    base_url: String,
}

impl HubSpotClient {
    pub fn new(access_token: String, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_seconds)?,
            access_token,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Companies whose name contains `query` as a token
    pub async fn search_companies(&self, query: &str) -> Result<Vec<CustomerRecord>> {
        let url = format!("{}/crm/v3/objects/companies/search", self.base_url.trim_end_matches('/'));
        let body = json!({
            "filterGroups": [{
                "filters": [{
                    "propertyName": "name",
                    "operator": "CONTAINS_TOKEN",
                    "value": query.trim(),
                }]
            }],
            "properties": PROPERTIES,
            "limit": SEARCH_LIMIT,
        });

        tracing::debug!("HubSpot company search: {}", query);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("HubSpot request failed: {}", e);
                e
            })?;

        let text = response_text(SERVICE, response).await?;
        parse_company_search(&text)
    }
}
