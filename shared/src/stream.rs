//! Decoding DynamoDB stream images. Images arrive in DynamoDB JSON
//! (`{"amount": {"N": "100"}}`) once serialized to `serde_json::Value`.

use serde_json::Value;

use crate::error::{FeeError, Result};
use crate::types::{NotificationTrigger, PaymentRecord};

pub const PAYMENT_PREFIX: &str = "PAYMENT#";
pub const NOTIFICATION_TRIGGER_PREFIX: &str = "NOTIFICATION_TRIGGER#";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEntity {
    Payment(String),
    NotificationTrigger(String),
    Other,
}

impl StreamEntity {
    pub fn from_pk(pk: &str) -> Self {
        if let Some(id) = pk.strip_prefix(PAYMENT_PREFIX) {
            StreamEntity::Payment(id.to_string())
        } else if let Some(id) = pk.strip_prefix(NOTIFICATION_TRIGGER_PREFIX) {
            StreamEntity::NotificationTrigger(id.to_string())
        } else {
            StreamEntity::Other
        }
    }
}

/// String attribute, typed (`{"S": ..}`) or already flattened
pub fn image_str(image: &Value, key: &str) -> Option<String> {
    let attr = image.get(key)?;
    attr.get("S")
        .and_then(Value::as_str)
        .or_else(|| attr.as_str())
        .map(|s| s.to_string())
}

/// Number attribute; DynamoDB sends numbers as strings
pub fn image_number(image: &Value, key: &str) -> Option<f64> {
    let attr = image.get(key)?;
    match attr.get("N") {
        Some(n) => n.as_str().and_then(|s| s.parse().ok()),
        None => attr.as_f64(),
    }
}

pub fn payment_from_image(payment_id: &str, image: &Value) -> Result<PaymentRecord> {
    let user_id = image_str(image, "user_id")
        .ok_or_else(|| {
            FeeError::MalformedRecord(format!("payment {} has no user_id", payment_id))
        })?;
    let status = image_str(image, "status")
        .ok_or_else(|| FeeError::MalformedRecord(format!("payment {} has no status", payment_id)))?;

    Ok(PaymentRecord {
        payment_id: payment_id.to_string(),
        user_id,
        amount: image_number(image, "amount").unwrap_or(0.0),
        status,
    })
}

pub fn trigger_from_image(trigger_id: &str, image: &Value) -> Result<NotificationTrigger> {
    let trigger_type = image_str(image, "type")
        .ok_or_else(|| FeeError::MalformedRecord(format!("trigger {} has no type", trigger_id)))?;

    Ok(NotificationTrigger {
        trigger_id: trigger_id.to_string(),
        user_id: image_str(image, "user_id"),
        push_token: image_str(image, "push_token").filter(|t| !t.trim().is_empty()),
        trigger_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_from_pk() {
        assert_eq!(StreamEntity::from_pk("PAYMENT#p1"), StreamEntity::Payment("p1".to_string()));
        assert_eq!(
            StreamEntity::from_pk("NOTIFICATION_TRIGGER#t9"),
            StreamEntity::NotificationTrigger("t9".to_string())
        );
        assert_eq!(StreamEntity::from_pk("USER#u1"), StreamEntity::Other);
    }

    #[test]
    fn test_payment_from_typed_image() {
        let image = json!({
            "PK": {"S": "PAYMENT#p1"},
            "user_id": {"S": "u1"},
            "amount": {"N": "100"},
            "status": {"S": "success"}
        });

        let payment = payment_from_image("p1", &image).unwrap();
        assert_eq!(payment.user_id, "u1");
        assert_eq!(payment.amount, 100.0);
        assert!(payment.is_success());
    }

    #[test]
    fn test_failed_payment_is_decoded_but_not_success() {
        let image = json!({
            "user_id": {"S": "u1"},
            "amount": {"N": "100"},
            "status": {"S": "failed"}
        });
        assert!(!payment_from_image("p2", &image).unwrap().is_success());
    }

    #[test]
    fn test_payment_without_user_is_malformed() {
        let image = json!({"status": {"S": "success"}});
        assert!(matches!(
            payment_from_image("p3", &image),
            Err(FeeError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_trigger_from_image() {
        let image = json!({
            "user_id": {"S": "u1"},
            "push_token": {"S": ""},
            "type": {"S": "MANUAL_REMINDER"}
        });

        let trigger = trigger_from_image("t1", &image).unwrap();
        assert_eq!(trigger.user_id.as_deref(), Some("u1"));
        assert_eq!(trigger.push_token, None);
        assert_eq!(trigger.trigger_type, "MANUAL_REMINDER");
    }
}
