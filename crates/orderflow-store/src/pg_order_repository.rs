//! `PostgreSQL` implementation of the `OrderRepository` trait.
//!
//! An order is written across five tables in one transaction: `orders`,
//! `deliveries`, `payments`, `order_delivery` and `items`. Any failure drops
//! the transaction before commit, which rolls every insert back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};

use orderflow_core::error::StorageError;
use orderflow_core::model::{Delivery, Item, Order, Payment};
use orderflow_core::repository::OrderRepository;

use crate::error::{is_unique_violation, storage_error};

/// PostgreSQL-backed order repository.
#[derive(Debug, Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Creates a new `PgOrderRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    order_uid: String,
    track_number: String,
    entry: String,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i32,
    date_created: DateTime<Utc>,
    oof_shard: String,
}

#[derive(Debug, FromRow)]
struct DeliveryRow {
    name: String,
    phone: String,
    zip: String,
    city: String,
    address: String,
    region: String,
    email: String,
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    transaction: String,
    request_id: String,
    currency: String,
    provider: String,
    amount: i64,
    payment_dt: i64,
    bank: String,
    delivery_cost: i64,
    goods_total: i64,
    custom_fee: i64,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    chrt_id: i64,
    track_number: String,
    price: i64,
    rid: String,
    name: String,
    sale: i32,
    size: String,
    total_price: i64,
    nm_id: i64,
    brand: String,
    status: i32,
}

impl From<DeliveryRow> for Delivery {
    fn from(row: DeliveryRow) -> Self {
        Self {
            name: row.name,
            phone: row.phone,
            zip: row.zip,
            city: row.city,
            address: row.address,
            region: row.region,
            email: row.email,
        }
    }
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            transaction: row.transaction,
            request_id: row.request_id,
            currency: row.currency,
            provider: row.provider,
            amount: row.amount,
            payment_dt: row.payment_dt,
            bank: row.bank,
            delivery_cost: row.delivery_cost,
            goods_total: row.goods_total,
            custom_fee: row.custom_fee,
        }
    }
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            chrt_id: row.chrt_id,
            track_number: row.track_number,
            price: row.price,
            rid: row.rid,
            name: row.name,
            sale: row.sale,
            size: row.size,
            total_price: row.total_price,
            nm_id: row.nm_id,
            brand: row.brand,
            status: row.status,
        }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    #[instrument(skip(self, order), fields(order_uid = %order.order_uid, items = order.items.len()))]
    async fn persist(&self, order: &Order) -> Result<(), StorageError> {
        let Some(payment) = &order.payment else {
            return Err(StorageError::Inconsistent {
                order_uid: order.order_uid.clone(),
                reason: "an order cannot be stored without a payment".to_owned(),
            });
        };

        let mut tx = self.pool.begin().await.map_err(|e| storage_error(&e))?;

        let header = sqlx::query(
            r"INSERT INTO orders
                (order_uid, track_number, entry, locale, internal_signature, customer_id,
                 delivery_service, shardkey, sm_id, date_created, oof_shard)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shard_key)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(&mut *tx)
        .await;
        if let Err(err) = header {
            if is_unique_violation(&err) {
                return Err(StorageError::DuplicateOrder(order.order_uid.clone()));
            }
            return Err(storage_error(&err));
        }

        let delivery_id: i64 = sqlx::query_scalar(
            r"INSERT INTO deliveries (name, phone, zip, city, address, region, email)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              RETURNING id",
        )
        .bind(&order.delivery.name)
        .bind(&order.delivery.phone)
        .bind(&order.delivery.zip)
        .bind(&order.delivery.city)
        .bind(&order.delivery.address)
        .bind(&order.delivery.region)
        .bind(&order.delivery.email)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| storage_error(&e))?;

        sqlx::query(
            r#"INSERT INTO payments
                ("transaction", request_id, currency, provider, amount, payment_dt, bank,
                 delivery_cost, goods_total, custom_fee)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(&payment.transaction)
        .bind(&payment.request_id)
        .bind(&payment.currency)
        .bind(&payment.provider)
        .bind(payment.amount)
        .bind(payment.payment_dt)
        .bind(&payment.bank)
        .bind(payment.delivery_cost)
        .bind(payment.goods_total)
        .bind(payment.custom_fee)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_error(&e))?;

        sqlx::query("INSERT INTO order_delivery (order_uid, delivery_id) VALUES ($1, $2)")
            .bind(&order.order_uid)
            .bind(delivery_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error(&e))?;

        if !order.items.is_empty() {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO items (order_uid, position, chrt_id, track_number, price, rid, \
                 name, sale, size, total_price, nm_id, brand, status) ",
            );
            builder.push_values(order.items.iter().enumerate(), |mut row, (position, item)| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let position = position as i32;
                row.push_bind(order.order_uid.as_str())
                    .push_bind(position)
                    .push_bind(item.chrt_id)
                    .push_bind(item.track_number.as_str())
                    .push_bind(item.price)
                    .push_bind(item.rid.as_str())
                    .push_bind(item.name.as_str())
                    .push_bind(item.sale)
                    .push_bind(item.size.as_str())
                    .push_bind(item.total_price)
                    .push_bind(item.nm_id)
                    .push_bind(item.brand.as_str())
                    .push_bind(item.status);
            });
            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| storage_error(&e))?;
        }

        tx.commit().await.map_err(|e| storage_error(&e))?;
        debug!(delivery_id, "order committed");
        Ok(())
    }

    async fn list_identifiers(&self) -> Result<Vec<String>, StorageError> {
        sqlx::query_scalar("SELECT order_uid FROM orders ORDER BY committed_at, order_uid")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error(&e))
    }

    #[instrument(skip(self))]
    async fn load_by_identifier(&self, order_uid: &str) -> Result<Order, StorageError> {
        let header: Option<OrderRow> = sqlx::query_as(
            r"SELECT order_uid, track_number, entry, locale, internal_signature, customer_id,
                     delivery_service, shardkey, sm_id, date_created, oof_shard
              FROM orders
              WHERE order_uid = $1",
        )
        .bind(order_uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error(&e))?;
        let Some(header) = header else {
            return Err(StorageError::NotFound(order_uid.to_owned()));
        };

        let delivery: Option<DeliveryRow> = sqlx::query_as(
            r"SELECT d.name, d.phone, d.zip, d.city, d.address, d.region, d.email
              FROM order_delivery od
              JOIN deliveries d ON d.id = od.delivery_id
              WHERE od.order_uid = $1",
        )
        .bind(order_uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error(&e))?;
        let Some(delivery) = delivery else {
            return Err(StorageError::Inconsistent {
                order_uid: order_uid.to_owned(),
                reason: "no delivery is linked to the order".to_owned(),
            });
        };

        let payment: Option<PaymentRow> = sqlx::query_as(
            r#"SELECT "transaction", request_id, currency, provider, amount, payment_dt, bank,
                      delivery_cost, goods_total, custom_fee
               FROM payments
               WHERE "transaction" = $1"#,
        )
        .bind(order_uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error(&e))?;

        let items: Vec<ItemRow> = sqlx::query_as(
            r"SELECT chrt_id, track_number, price, rid, name, sale, size, total_price, nm_id,
                     brand, status
              FROM items
              WHERE order_uid = $1
              ORDER BY position",
        )
        .bind(order_uid)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error(&e))?;

        Ok(Order {
            order_uid: header.order_uid,
            track_number: header.track_number,
            entry: header.entry,
            delivery: delivery.into(),
            payment: payment.map(Payment::from),
            items: items.into_iter().map(Item::from).collect(),
            locale: header.locale,
            internal_signature: header.internal_signature,
            customer_id: header.customer_id,
            delivery_service: header.delivery_service,
            shard_key: header.shardkey,
            sm_id: header.sm_id,
            date_created: header.date_created,
            oof_shard: header.oof_shard,
        })
    }
}
