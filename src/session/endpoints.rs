//! URL construction for the analytics service endpoints.

use crate::config::ApiConfig;
use crate::types::JobId;

/// Resolved endpoint URLs for one tenant
#[derive(Clone, Debug)]
pub(crate) struct Endpoints {
    base: String,
    queries: String,
}

impl Endpoints {
    pub(crate) fn new(api: &ApiConfig) -> Self {
        let base = api.base_url.trim().trim_end_matches('/').to_string();
        let queries = format!(
            "{}/sw-reporting/v2/tenants/{}/flows/queries",
            base,
            urlencoding::encode(api.tenant.trim())
        );
        Self { base, queries }
    }

    pub(crate) fn authenticate(&self) -> String {
        format!("{}/token/v2/authenticate", self.base)
    }

    pub(crate) fn queries(&self) -> &str {
        &self.queries
    }

    pub(crate) fn query(&self, id: &JobId) -> String {
        format!("{}/{}", self.queries, urlencoding::encode(id.as_str()))
    }

    pub(crate) fn results(&self, id: &JobId) -> String {
        format!("{}/results", self.query(id))
    }
}
