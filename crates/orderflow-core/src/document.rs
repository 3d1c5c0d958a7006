//! Serialized form of an order, as stored in the cache and returned to readers.

use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::value::RawValue;

use crate::error::CacheError;
use crate::model::Order;

/// An order serialized once to JSON and shared by reference afterwards.
///
/// Serializing an `OrderDocument` embeds the stored JSON verbatim.
#[derive(Debug, Clone)]
pub struct OrderDocument {
    order_uid: Arc<str>,
    json: Arc<RawValue>,
}

impl OrderDocument {
    /// Serializes `order` into a document.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Serialization` if the order cannot be encoded.
    pub fn from_order(order: &Order) -> Result<Self, CacheError> {
        let raw = serde_json::value::to_raw_value(order).map_err(|e| CacheError::Serialization {
            order_uid: order.order_uid.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            order_uid: Arc::from(order.order_uid.as_str()),
            json: Arc::from(raw),
        })
    }

    /// Identifier of the order this document holds.
    #[must_use]
    pub fn order_uid(&self) -> &str {
        &self.order_uid
    }

    /// The document as a JSON string.
    #[must_use]
    pub fn as_json(&self) -> &str {
        self.json.get()
    }

    /// Decodes the document back into an `Order`.
    ///
    /// # Errors
    ///
    /// Returns the decoder error if the document is not an order, which
    /// cannot happen for documents built with `from_order`.
    pub fn to_order(&self) -> Result<Order, serde_json::Error> {
        serde_json::from_str(self.json.get())
    }
}

impl PartialEq for OrderDocument {
    fn eq(&self, other: &Self) -> bool {
        self.order_uid == other.order_uid && self.as_json() == other.as_json()
    }
}

impl Eq for OrderDocument {}

impl Serialize for OrderDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.json.as_ref().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::model::Delivery;

    fn order(uid: &str) -> Order {
        Order {
            order_uid: uid.to_owned(),
            track_number: "TRACK".to_owned(),
            entry: "WBIL".to_owned(),
            delivery: Delivery {
                name: "n".to_owned(),
                phone: "p".to_owned(),
                zip: "z".to_owned(),
                city: "c".to_owned(),
                address: "a".to_owned(),
                region: "r".to_owned(),
                email: "e".to_owned(),
            },
            payment: None,
            items: Vec::new(),
            locale: "en".to_owned(),
            internal_signature: String::new(),
            customer_id: "test".to_owned(),
            delivery_service: "meest".to_owned(),
            shard_key: "9".to_owned(),
            sm_id: 99,
            date_created: Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19).unwrap(),
            oof_shard: "1".to_owned(),
        }
    }

    #[test]
    fn test_document_decodes_to_the_same_order() {
        let original = order("O1");

        let document = OrderDocument::from_order(&original).unwrap();

        assert_eq!(document.order_uid(), "O1");
        assert_eq!(document.to_order().unwrap(), original);
    }

    #[test]
    fn test_document_embeds_raw_json_when_serialized() {
        let document = OrderDocument::from_order(&order("O1")).unwrap();

        let wrapped = serde_json::to_value(serde_json::json!({ "result": document })).unwrap();

        assert_eq!(wrapped["result"]["order_uid"], "O1");
        assert_eq!(wrapped["result"]["payment"], serde_json::Value::Null);
    }
}
