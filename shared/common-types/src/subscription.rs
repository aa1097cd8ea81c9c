use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A browser push subscription owned by a user
///
/// `endpoint` identifies one browser installation and is unique across all
/// users: storing a subscription replaces any earlier row for the same endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PushSubscription {
    pub user_id: String,
    /// Push service URL
    pub endpoint: String,
    /// Client public key (base64url, uncompressed P-256 point)
    pub p256dh: String,
    /// Client auth secret (base64url, 16 bytes)
    pub auth: String,
}
