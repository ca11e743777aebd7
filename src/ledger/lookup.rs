use std::collections::HashMap;
use uuid::Uuid;

use super::model::{BusinessProfile, FundingRequest};
use crate::store::LedgerStore;

pub const ANONYMOUS: &str = "Anonymous";
pub const UNKNOWN_BUSINESS: &str = "Unknown Business";
pub const UNTITLED_BUSINESS: &str = "Untitled Business";
pub const NOT_AVAILABLE: &str = "N/A";
pub const PLATFORM: &str = "Platform";

/// Subordinate lookups for one aggregation pass.
///
/// A failed lookup is logged as degraded and answered with `None`; callers
/// substitute the documented fallback text and carry on. Results, failures
/// included, are cached for the lifetime of the pass.
pub struct Lookups<'a> {
    store: &'a dyn LedgerStore,
    names: HashMap<String, Option<String>>,
    requests: HashMap<Uuid, Option<FundingRequest>>,
    businesses: HashMap<Uuid, Option<BusinessProfile>>,
}

impl<'a> Lookups<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self {
            store,
            names: HashMap::new(),
            requests: HashMap::new(),
            businesses: HashMap::new(),
        }
    }

    /// Display name for an identity, or "Anonymous".
    pub async fn display_name(&mut self, user_id: Option<&str>) -> String {
        let user_id = match user_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return ANONYMOUS.to_string(),
        };
        if !self.names.contains_key(user_id) {
            let resolved = match self.store.user_display_name(user_id).await {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "lookup degraded: display name");
                    None
                }
            };
            self.names.insert(user_id.to_string(), resolved);
        }
        self.names
            .get(user_id)
            .cloned()
            .flatten()
            .unwrap_or_else(|| ANONYMOUS.to_string())
    }

    pub async fn request(&mut self, id: Uuid) -> Option<FundingRequest> {
        if !self.requests.contains_key(&id) {
            let resolved = match self.store.get_request(id).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(request_id = %id, error = %e, "lookup degraded: funding request");
                    None
                }
            };
            self.requests.insert(id, resolved);
        }
        self.requests.get(&id).cloned().flatten()
    }

    pub async fn business(&mut self, id: Uuid) -> Option<BusinessProfile> {
        if !self.businesses.contains_key(&id) {
            let resolved = match self.store.get_business(id).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(business_id = %id, error = %e, "lookup degraded: business");
                    None
                }
            };
            self.businesses.insert(id, resolved);
        }
        self.businesses.get(&id).cloned().flatten()
    }

    /// Business name behind a request for the public ledger: "N/A" when the
    /// request cannot be found, "Untitled Business" when it has no name.
    pub async fn ledger_business_name(&mut self, request_id: Uuid) -> String {
        match self.request(request_id).await {
            Some(request) if !request.display_name.trim().is_empty() => request.display_name,
            Some(_) => UNTITLED_BUSINESS.to_string(),
            None => NOT_AVAILABLE.to_string(),
        }
    }
}
