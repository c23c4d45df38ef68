use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::WorkshopId;
use crate::error::SyncError;
use crate::save::decode_entities;

const SEARCH_URL: &str = "https://steamcommunity.com/workshop/browse/";

pub trait WorkshopSearch: Send + Sync {
    /// `Ok(None)` when no catalog entry titled exactly `name` exists; an
    /// `Err` is reserved for transport failures.
    fn resolve_by_name(&self, name: &str) -> Result<Option<WorkshopId>, SyncError>;
}

#[derive(Clone)]
pub struct WorkshopHttpClient {
    client: Client,
    app_id: String,
    base_url: String,
}

impl WorkshopHttpClient {
    pub fn new(app_id: &str) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("modsync/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::SearchHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| SyncError::SearchHttp(err.to_string()))?;
        Ok(Self {
            client,
            app_id: app_id.to_string(),
            base_url: SEARCH_URL.to_string(),
        })
    }
}

impl WorkshopSearch for WorkshopHttpClient {
    fn resolve_by_name(&self, name: &str) -> Result<Option<WorkshopId>, SyncError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("appid", self.app_id.as_str()), ("searchtext", name)])
            .send()
            .map_err(|err| SyncError::SearchHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "workshop search failed".to_string());
            return Err(SyncError::SearchStatus { status, message });
        }

        let body = response
            .text()
            .map_err(|err| SyncError::SearchHttp(err.to_string()))?;
        Ok(find_exact_title(&body, name))
    }
}

/// Scans workshop browse HTML for (file id, title) pairs and returns the id
/// of the first entry whose rendered title equals `name`. The search text is
/// never embedded in the pattern, so names containing regex metacharacters
/// compare as plain strings.
pub fn find_exact_title(html: &str, name: &str) -> Option<WorkshopId> {
    let entry_re = Regex::new(
        r#"(?s)sharedfiles/filedetails/\?id=(\d+)[^>]*>\s*<div class="workshopItemTitle[^"]*">([^<]*)</div>"#,
    )
    .unwrap();
    let wanted = name.trim();
    for cap in entry_re.captures_iter(html) {
        if decode_entities(cap[2].trim()) == wanted {
            return cap[1].parse().ok();
        }
    }
    None
}
