//! The order aggregate: one header, one delivery, one payment and its items.
//!
//! Field names serialize exactly as they appear in the inbound JSON
//! documents, so a decoded message and a composed read are the same shape.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// The unit of ingestion, persistence and caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Globally unique order identifier.
    pub order_uid: String,
    /// Tracking number shared by every item of the order.
    pub track_number: String,
    /// Entry point the order came through.
    pub entry: String,
    /// Recipient details.
    pub delivery: Delivery,
    /// Payment details. Inbound orders must carry one; a stored order whose
    /// payment row is missing composes with `None`.
    pub payment: Option<Payment>,
    /// Line items, in the order they were received.
    pub items: Vec<Item>,
    /// Customer locale.
    pub locale: String,
    /// Internal signature; may be empty.
    pub internal_signature: String,
    /// Customer identifier.
    pub customer_id: String,
    /// Delivery service name.
    pub delivery_service: String,
    /// Shard key.
    #[serde(rename = "shardkey")]
    pub shard_key: String,
    /// Service marker identifier.
    pub sm_id: i32,
    /// When the order was created upstream, at microsecond precision.
    pub date_created: DateTime<Utc>,
    /// Out-of-flow shard.
    pub oof_shard: String,
}

/// Recipient of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// Payment for an order. `transaction` equals the owning `order_uid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub transaction: String,
    /// May be empty.
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    /// Unix timestamp, seconds.
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

/// A single line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    pub sale: i32,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i32,
}

impl Order {
    /// Decodes an order from a raw message body.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::MalformedPayload` if the body is not a JSON
    /// document of the order shape.
    pub fn decode(payload: &[u8]) -> Result<Self, crate::error::IngestError> {
        let mut order: Self = serde_json::from_slice(payload)
            .map_err(|e| crate::error::IngestError::MalformedPayload(e.to_string()))?;
        // Storage keeps microseconds; anything finer would not survive a reload.
        order.date_created = order.date_created.trunc_subsecs(6);
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;

    const CANONICAL: &str = r#"{
        "order_uid": "b563feb7b2b84b6test",
        "track_number": "WBILMTESTTRACK",
        "entry": "WBIL",
        "delivery": {
            "name": "Test Testov",
            "phone": "+9720000000",
            "zip": "2639809",
            "city": "Kiryat Mozkin",
            "address": "Ploshad Mira 15",
            "region": "Kraiot",
            "email": "test@gmail.com"
        },
        "payment": {
            "transaction": "b563feb7b2b84b6test",
            "request_id": "",
            "currency": "USD",
            "provider": "wbpay",
            "amount": 1817,
            "payment_dt": 1637907727,
            "bank": "alpha",
            "delivery_cost": 1500,
            "goods_total": 317,
            "custom_fee": 0
        },
        "items": [
            {
                "chrt_id": 9934930,
                "track_number": "WBILMTESTTRACK",
                "price": 453,
                "rid": "ab4219087a764ae0btest",
                "name": "Mascaras",
                "sale": 30,
                "size": "0",
                "total_price": 317,
                "nm_id": 2389212,
                "brand": "Vivienne Sabo",
                "status": 202
            }
        ],
        "locale": "en",
        "internal_signature": "",
        "customer_id": "test",
        "delivery_service": "meest",
        "shardkey": "9",
        "sm_id": 99,
        "date_created": "2021-11-26T06:22:19Z",
        "oof_shard": "1"
    }"#;

    #[test]
    fn test_decode_canonical_document() {
        let order = Order::decode(CANONICAL.as_bytes()).unwrap();

        assert_eq!(order.order_uid, "b563feb7b2b84b6test");
        assert_eq!(order.shard_key, "9");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].chrt_id, 9_934_930);
        assert_eq!(order.payment.as_ref().unwrap().amount, 1817);
        assert_eq!(order.date_created.to_rfc3339(), "2021-11-26T06:22:19+00:00");
    }

    #[test]
    fn test_serialize_uses_wire_field_names() {
        let order = Order::decode(CANONICAL.as_bytes()).unwrap();

        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["shardkey"], "9");
        assert!(json.get("shard_key").is_none());
        assert_eq!(json["date_created"], "2021-11-26T06:22:19Z");
    }

    #[test]
    fn test_decode_truncates_date_created_to_microseconds() {
        let document = CANONICAL.replace("2021-11-26T06:22:19Z", "2021-11-26T06:22:19.123456789Z");

        let order = Order::decode(document.as_bytes()).unwrap();

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["date_created"], "2021-11-26T06:22:19.123456Z");
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let result = Order::decode(b"not json at all");

        assert!(matches!(result, Err(IngestError::MalformedPayload(_))));
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let result = Order::decode(br#"{"order_uid": "o1"}"#);

        assert!(matches!(result, Err(IngestError::MalformedPayload(_))));
    }
}
