//! Order fixtures.

use chrono::{TimeZone, Utc};
use orderflow_core::model::{Delivery, Item, Order, Payment};

/// A valid order with one item, modelled on the canonical inbound document.
///
/// # Panics
///
/// Never; the fixed timestamp is valid.
#[must_use]
pub fn sample_order(order_uid: &str) -> Order {
    let track_number = format!("TRACK-{order_uid}");
    Order {
        order_uid: order_uid.to_owned(),
        track_number: track_number.clone(),
        entry: "WBIL".to_owned(),
        delivery: Delivery {
            name: "Test Testov".to_owned(),
            phone: "+9720000000".to_owned(),
            zip: "2639809".to_owned(),
            city: "Kiryat Mozkin".to_owned(),
            address: "Ploshad Mira 15".to_owned(),
            region: "Kraiot".to_owned(),
            email: "test@gmail.com".to_owned(),
        },
        payment: Some(Payment {
            transaction: order_uid.to_owned(),
            request_id: String::new(),
            currency: "USD".to_owned(),
            provider: "wbpay".to_owned(),
            amount: 1817,
            payment_dt: 1_637_907_727,
            bank: "alpha".to_owned(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        }),
        items: vec![Item {
            chrt_id: 9_934_930,
            track_number,
            price: 453,
            rid: "ab4219087a764ae0btest".to_owned(),
            name: "Mascaras".to_owned(),
            sale: 30,
            size: "0".to_owned(),
            total_price: 317,
            nm_id: 2_389_212,
            brand: "Vivienne Sabo".to_owned(),
            status: 202,
        }],
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

/// `order` encoded as an inbound message body.
///
/// # Panics
///
/// Panics if the order cannot be serialized, which derived `Serialize`
/// implementations never do.
#[must_use]
pub fn sample_order_json(order: &Order) -> Vec<u8> {
    serde_json::to_vec(order).expect("order serialization is infallible")
}
