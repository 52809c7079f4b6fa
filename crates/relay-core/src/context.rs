//! Caller identity carried alongside an event.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of whoever submitted an event, captured at dispatch and passed
/// explicitly to every listener and, from there, to pipeline initiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub request_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<String>,
}

impl RequestContext {
    /// A context with no authenticated caller.
    pub fn anonymous() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user: None,
            accounts: Vec::new(),
        }
    }

    pub fn for_user(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            ..Self::anonymous()
        }
    }

    pub fn with_accounts(mut self, accounts: Vec<String>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::anonymous()
    }
}
