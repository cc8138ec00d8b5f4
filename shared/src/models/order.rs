//! Order Model

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, AppResult, ErrorCode};
use crate::money::{MAX_AMOUNT, format_euro, line_total, parse_price, within_cap};

/// Conventional table label for takeaway orders
pub const NO_TABLE: &str = "Geen tafel";

/// Order item as stored and printed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub name: String,
    /// Preferred over `name` on the receipt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Unit price as displayed, e.g. `"€12,50"`
    pub price: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

impl OrderItem {
    /// Name shown on the receipt
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.name,
        }
    }
}

/// Paid order waiting in the mailbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub table: String,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub tip: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub printed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

impl Order {
    /// Build a stored order from a validated intake
    pub fn from_intake(intake: OrderIntake, id: String, timestamp: DateTime<Utc>) -> Self {
        let items = intake
            .items
            .into_iter()
            .map(|item| OrderItem {
                name: item.name,
                display_name: item.display_name,
                price: item.price,
                quantity: u32::try_from(item.quantity).unwrap_or(0),
                options: item.options,
            })
            .collect();

        Self {
            id,
            table: intake.table.trim().to_string(),
            items,
            total: intake.total,
            comment: intake.comment,
            tip: intake.tip.unwrap_or(Decimal::ZERO),
            timestamp,
            printed: false,
            payment_id: intake.payment_id,
        }
    }
}

/// Item as submitted by the payment callback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemIntake {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub price: String,
    pub quantity: i64,
    #[serde(default)]
    pub options: Option<String>,
}

/// `POST /orders` body (the OrderPaid event)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIntake {
    /// Numeric table numbers are accepted and kept as text
    #[serde(default, deserialize_with = "table_label")]
    pub table: String,
    #[serde(default)]
    pub items: Vec<OrderItemIntake>,
    pub total: Decimal,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub tip: Option<Decimal>,
    #[serde(default)]
    pub payment_id: Option<String>,
}

impl OrderIntake {
    /// Reject orders that could not be printed meaningfully
    pub fn validate(&self) -> AppResult<()> {
        if self.items.is_empty() {
            return Err(AppError::new(ErrorCode::OrderEmpty));
        }
        if self.table.trim().is_empty() {
            return Err(AppError::new(ErrorCode::OrderTableMissing));
        }
        if self.total <= Decimal::ZERO {
            return Err(AppError::new(ErrorCode::OrderTotalInvalid)
                .with_detail("total", self.total.to_string()));
        }
        if let Some(tip) = self.tip
            && tip < Decimal::ZERO
        {
            return Err(AppError::new(ErrorCode::TipInvalid).with_detail("tip", tip.to_string()));
        }

        for (index, item) in self.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                return Err(AppError::new(ErrorCode::ItemNameMissing).with_detail("index", index));
            }
            if item.quantity <= 0 || item.quantity > i64::from(u32::MAX) {
                return Err(AppError::new(ErrorCode::ItemQuantityInvalid)
                    .with_detail("index", index)
                    .with_detail("quantity", item.quantity));
            }
            let price = parse_price(&item.price).map_err(|e| {
                AppError::with_message(ErrorCode::ItemPriceInvalid, e.to_string())
                    .with_detail("index", index)
            })?;
            let amount = u32::try_from(item.quantity)
                .ok()
                .and_then(|quantity| line_total(price, quantity));
            if !within_cap(price) || !amount.is_some_and(within_cap) {
                return Err(AppError::with_message(
                    ErrorCode::ItemPriceInvalid,
                    format!("price '{}' exceeds {}", item.price, format_euro(MAX_AMOUNT)),
                )
                .with_detail("index", index));
            }
        }
        Ok(())
    }
}

/// `POST /orders/mark-printed` body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPrintedRequest {
    pub order_id: String,
}

/// `order_<unix-millis>_<9 random lowercase alphanumerics>`
pub fn generate_order_id(now: DateTime<Utc>) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("order_{}_{}", now.timestamp_millis(), suffix)
}

fn table_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "table must be a string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intake(value: serde_json::Value) -> OrderIntake {
        serde_json::from_value(value).unwrap()
    }

    fn valid() -> serde_json::Value {
        json!({
            "table": "5",
            "items": [{"name": "Cola", "price": "€2,75", "quantity": 2}],
            "total": 5.5
        })
    }

    fn code_of(value: serde_json::Value) -> ErrorCode {
        intake(value).validate().unwrap_err().code
    }

    #[test]
    fn test_valid_intake() {
        assert!(intake(valid()).validate().is_ok());
    }

    #[test]
    fn test_numeric_table_is_accepted() {
        let mut v = valid();
        v["table"] = json!(12);
        assert_eq!(intake(v).table, "12");
    }

    #[test]
    fn test_validation_errors() {
        let mut v = valid();
        v["items"] = json!([]);
        assert_eq!(code_of(v), ErrorCode::OrderEmpty);

        let mut v = valid();
        v["table"] = json!("  ");
        assert_eq!(code_of(v), ErrorCode::OrderTableMissing);

        let mut v = valid();
        v["total"] = json!(0);
        assert_eq!(code_of(v), ErrorCode::OrderTotalInvalid);

        let mut v = valid();
        v["tip"] = json!(-1);
        assert_eq!(code_of(v), ErrorCode::TipInvalid);

        let mut v = valid();
        v["items"][0]["quantity"] = json!(0);
        assert_eq!(code_of(v), ErrorCode::ItemQuantityInvalid);

        let mut v = valid();
        v["items"][0]["price"] = json!("twee euro");
        assert_eq!(code_of(v), ErrorCode::ItemPriceInvalid);

        let mut v = valid();
        v["items"][0]["name"] = json!("");
        assert_eq!(code_of(v), ErrorCode::ItemNameMissing);
    }

    #[test]
    fn test_prices_above_cap_are_rejected() {
        let mut v = valid();
        v["items"][0]["price"] = json!("€50000000000000000000000000000");
        assert_eq!(code_of(v), ErrorCode::ItemPriceInvalid);

        // Unit price fits, line total does not
        let mut v = valid();
        v["items"][0]["price"] = json!("€60.000,00");
        assert_eq!(code_of(v), ErrorCode::ItemPriceInvalid);

        let mut v = valid();
        v["items"][0]["price"] = json!("€50.000,00");
        assert!(intake(v).validate().is_ok());
    }

    #[test]
    fn test_order_wire_shape() {
        let now = DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let order = Order::from_intake(intake(valid()), "order_1".into(), now);
        let value = serde_json::to_value(&order).unwrap();

        assert_eq!(value["id"], "order_1");
        assert_eq!(value["table"], "5");
        assert_eq!(value["total"], json!(5.5));
        assert_eq!(value["tip"], json!(0.0));
        assert_eq!(value["printed"], false);
        assert_eq!(value["items"][0]["quantity"], 2);
        assert!(value["items"][0].get("displayName").is_none());
        assert!(value.get("paymentId").is_none());
    }

    #[test]
    fn test_item_label_prefers_display_name() {
        let mut item = OrderItem {
            name: "burger_classic".into(),
            display_name: Some("Hamburger Classic".into()),
            price: "€12,50".into(),
            quantity: 1,
            options: None,
        };
        assert_eq!(item.label(), "Hamburger Classic");
        item.display_name = Some(" ".into());
        assert_eq!(item.label(), "burger_classic");
    }

    #[test]
    fn test_generate_order_id() {
        let now = Utc::now();
        let id = generate_order_id(now);
        let prefix = format!("order_{}_", now.timestamp_millis());
        assert!(id.starts_with(&prefix));
        let suffix = &id[prefix.len()..];
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
