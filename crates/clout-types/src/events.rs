use serde::{Deserialize, Serialize};

/// Storage finalize notification, delivered once per newly stored object.
/// The analyzer filters on `content_type` and the object path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageObjectEvent {
    pub bucket: String,
    /// Object path, e.g. `feed/{post_id}/original.jpg`.
    pub name: String,
    pub content_type: String,
}

/// Checkout provider webhook envelope. Only `checkout.session.completed`
/// carries a grant; everything else is acknowledged and dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutEvent {
    /// Provider-unique event id, the dedup key for replayed deliveries.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: CheckoutEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutEventData {
    pub object: CheckoutSessionObject,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSessionObject {
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

/// Session metadata stamped at creation time and echoed back on settlement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutMetadata {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "priceId")]
    pub price_id: Option<String>,
}
