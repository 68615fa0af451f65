//! Customer orders and their status lifecycle.
//!
//! Orders are written by the storefront, not by the console. The console
//! reads them, shows them newest first, and moves them through statuses:
//!
//! ```text
//! placed ──→ pending ──→ processing ──→ delivered
//!    │          │             │
//!    └──────────┴─────────────┴──────→ cancelled
//! ```
//!
//! `delivered` and `cancelled` are terminal. Any status may be set from a
//! non-terminal one; the console doesn't enforce the arrows above.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{image_or, PLACEHOLDER_THUMBNAIL};
use crate::record::lenient_amount;
use crate::Record;

/// Where an order stands.
///
/// Stored as a lowercase string. Unrecognized values are kept verbatim in
/// [`OrderStatus::Other`] so a round trip never loses them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Placed,
    Pending,
    Processing,
    Delivered,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    /// The statuses an operator can pick from.
    pub const SELECTABLE: [OrderStatus; 5] = [
        OrderStatus::Placed,
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Parses a status, ignoring case.
    pub fn parse(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "placed" => OrderStatus::Placed,
            "pending" => OrderStatus::Pending,
            "processing" => OrderStatus::Processing,
            "delivered" => OrderStatus::Delivered,
            "cancelled" => OrderStatus::Cancelled,
            _ => OrderStatus::Other(status.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Other(status) => status,
        }
    }

    /// `true` for statuses that can't be changed any more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Badge color variant for the status.
    pub fn badge(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "primary",
            OrderStatus::Pending => "warning",
            OrderStatus::Processing => "info",
            OrderStatus::Delivered => "success",
            OrderStatus::Cancelled => "danger",
            OrderStatus::Other(_) => "secondary",
        }
    }
}

impl From<String> for OrderStatus {
    fn from(status: String) -> Self {
        OrderStatus::parse(&status)
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl OrderItem {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown Product")
    }

    /// Quantity, `1` when unset.
    pub fn quantity(&self) -> u32 {
        self.quantity.unwrap_or(1)
    }

    pub fn image(&self) -> &str {
        image_or(self.image_url.as_deref().unwrap_or(""), PLACEHOLDER_THUMBNAIL)
    }
}

/// A customer order.
///
/// Only the fields the console reads are typed; everything else the
/// storefront stored is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    /// RFC 3339 timestamp set by the storefront.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_date: Option<String>,
    /// RFC 3339 timestamp of the last status change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_amount: f64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Order {
    /// Status label, `Unknown` when unset.
    pub fn status_label(&self) -> &str {
        self.status.as_ref().map_or("Unknown", OrderStatus::as_str)
    }

    /// Badge variant for the current status.
    pub fn badge(&self) -> &'static str {
        self.status.as_ref().map_or("secondary", OrderStatus::badge)
    }

    /// `true` when the status can no longer change.
    pub fn is_locked(&self) -> bool {
        self.status.as_ref().is_some_and(OrderStatus::is_terminal)
    }

    /// When the order was placed, if the stored date parses.
    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        let date = self.order_date.as_deref()?;
        DateTime::parse_from_rfc3339(date)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }

    pub fn payment_label(&self) -> &str {
        self.payment_method.as_deref().unwrap_or("N/A")
    }
}

impl Record for Order {
    const COLLECTION: &'static str = "orders";
    const KIND: &'static str = "order";
}

/// Orders newest first. Orders without a readable date go last.
pub(crate) fn newest_first(a: &Option<DateTime<Utc>>, b: &Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The fields written by a status change.
pub(crate) fn status_change(status: &OrderStatus, at: DateTime<Utc>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("status".into(), Value::String(status.as_str().to_string()));
    fields.insert(
        "lastUpdated".into(),
        Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    fields
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_ignores_case() {
        assert_eq!(OrderStatus::parse("Delivered"), OrderStatus::Delivered);
        assert_eq!(OrderStatus::parse("PLACED"), OrderStatus::Placed);
    }

    #[test]
    fn test_unknown_status_kept_verbatim() {
        let status = OrderStatus::parse("On Hold");

        assert_eq!(status, OrderStatus::Other("On Hold".into()));
        assert_eq!(status.as_str(), "On Hold");
        assert_eq!(status.badge(), "secondary");
    }

    #[test]
    fn test_badge_mapping() {
        let badges: Vec<_> = OrderStatus::SELECTABLE.iter().map(OrderStatus::badge).collect();

        assert_eq!(badges, ["primary", "warning", "info", "success", "danger"]);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(!OrderStatus::Other("cancelled-ish".into()).is_terminal());
    }

    #[test]
    fn test_order_preserves_unknown_fields() {
        let doc = json!({
            "status": "placed",
            "orderDate": "2024-05-01T10:00:00.000Z",
            "totalAmount": "120",
            "customer": { "name": "Asha" },
            "items": [{ "title": "Boot", "price": 60, "quantity": 2 }]
        });

        let order: Order = serde_json::from_value(doc).unwrap();

        assert_eq!(order.status, Some(OrderStatus::Placed));
        assert_eq!(order.total_amount, 120.0);
        assert_eq!(order.items[0].quantity(), 2);
        assert_eq!(order.extra.get("customer"), Some(&json!({ "name": "Asha" })));
    }

    #[test]
    fn test_order_defaults_for_sparse_document() {
        let order: Order = serde_json::from_value(json!({})).unwrap();

        assert_eq!(order.status_label(), "Unknown");
        assert_eq!(order.badge(), "secondary");
        assert_eq!(order.payment_label(), "N/A");
        assert!(!order.is_locked());
        assert_eq!(order.placed_at(), None);
    }

    #[test]
    fn test_order_item_fallbacks() {
        let item = OrderItem::default();

        assert_eq!(item.title(), "Unknown Product");
        assert_eq!(item.quantity(), 1);
        assert_eq!(item.image(), PLACEHOLDER_THUMBNAIL);
    }

    #[test]
    fn test_newest_first_puts_undated_last() {
        let early = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let late = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let mut dates = vec![None, early, late];

        dates.sort_by(newest_first);

        assert_eq!(dates, vec![late, early, None]);
    }

    #[test]
    fn test_status_change_fields() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();

        let fields = status_change(&OrderStatus::Processing, at);

        assert_eq!(fields.get("status"), Some(&json!("processing")));
        assert_eq!(fields.get("lastUpdated"), Some(&json!("2024-06-01T12:30:00.000Z")));
    }
}
