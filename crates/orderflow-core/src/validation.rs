//! Aggregate rules checked after decoding and before any storage write.

use crate::error::IngestError;
use crate::model::Order;

impl Order {
    /// Checks the aggregate rules an inbound order must satisfy.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::InvalidAggregate` naming the first broken rule:
    /// an empty required field, a missing payment, a payment whose
    /// `transaction` differs from `order_uid`, an item whose `track_number`
    /// differs from the order's, or a text field containing a NUL character.
    pub fn validate(&self) -> Result<(), IngestError> {
        let required = [
            ("order_uid", self.order_uid.as_str()),
            ("track_number", self.track_number.as_str()),
            ("entry", self.entry.as_str()),
            ("locale", self.locale.as_str()),
            ("customer_id", self.customer_id.as_str()),
            ("delivery_service", self.delivery_service.as_str()),
            ("shardkey", self.shard_key.as_str()),
            ("oof_shard", self.oof_shard.as_str()),
            ("delivery.name", self.delivery.name.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(self.invalid(format!("{field} must not be empty")));
            }
        }

        let Some(payment) = &self.payment else {
            return Err(self.invalid("payment is required".to_owned()));
        };
        for (field, value) in [
            ("payment.currency", payment.currency.as_str()),
            ("payment.provider", payment.provider.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(self.invalid(format!("{field} must not be empty")));
            }
        }
        if payment.transaction != self.order_uid {
            return Err(self.invalid(format!(
                "payment.transaction {:?} does not match order_uid",
                payment.transaction
            )));
        }

        if let Some((index, item)) = self
            .items
            .iter()
            .enumerate()
            .find(|(_, item)| item.track_number != self.track_number)
        {
            return Err(self.invalid(format!(
                "items[{index}].track_number {:?} does not match order track_number {:?}",
                item.track_number, self.track_number
            )));
        }

        if let Some(field) = self.first_field_with_nul() {
            return Err(self.invalid(format!("{field} contains a NUL character")));
        }

        Ok(())
    }

    /// `PostgreSQL` text cannot hold U+0000, although JSON strings can.
    fn first_field_with_nul(&self) -> Option<String> {
        let delivery = &self.delivery;
        let header = [
            ("order_uid", &self.order_uid),
            ("track_number", &self.track_number),
            ("entry", &self.entry),
            ("locale", &self.locale),
            ("internal_signature", &self.internal_signature),
            ("customer_id", &self.customer_id),
            ("delivery_service", &self.delivery_service),
            ("shardkey", &self.shard_key),
            ("oof_shard", &self.oof_shard),
            ("delivery.name", &delivery.name),
            ("delivery.phone", &delivery.phone),
            ("delivery.zip", &delivery.zip),
            ("delivery.city", &delivery.city),
            ("delivery.address", &delivery.address),
            ("delivery.region", &delivery.region),
            ("delivery.email", &delivery.email),
        ];
        if let Some((field, _)) = header.iter().find(|(_, value)| value.contains('\0')) {
            return Some((*field).to_owned());
        }

        if let Some(payment) = &self.payment {
            let fields = [
                ("payment.transaction", &payment.transaction),
                ("payment.request_id", &payment.request_id),
                ("payment.currency", &payment.currency),
                ("payment.provider", &payment.provider),
                ("payment.bank", &payment.bank),
            ];
            if let Some((field, _)) = fields.iter().find(|(_, value)| value.contains('\0')) {
                return Some((*field).to_owned());
            }
        }

        self.items.iter().enumerate().find_map(|(index, item)| {
            [
                ("track_number", &item.track_number),
                ("rid", &item.rid),
                ("name", &item.name),
                ("size", &item.size),
                ("brand", &item.brand),
            ]
            .iter()
            .find(|(_, value)| value.contains('\0'))
            .map(|(field, _)| format!("items[{index}].{field}"))
        })
    }

    fn invalid(&self, reason: String) -> IngestError {
        IngestError::InvalidAggregate {
            order_uid: self.order_uid.clone(),
            reason,
        }
    }
}
