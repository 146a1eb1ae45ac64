use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The mutable, session-scoped workflow record.
///
/// Exactly one registration exists per session identity. Typed workflow
/// columns are struct fields; arbitrary business fields (contact info,
/// verification flags, ...) live in the `fields` bag under internal
/// (snake_case) naming.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Registration {
    pub session_id: String,
    pub current_step: i64,
    pub max_step: i64,
    pub product_id: Option<u32>,
    pub sum: Option<Decimal>,
    pub term: Option<u32>,
    pub ref_id: Option<String>,
    /// Payment-gateway correlation token. Write-once: a later mismatched
    /// value never overwrites it.
    pub order_id: Option<String>,
    /// Open mapping of payment-provider fields. Updates merge by key.
    pub payment: Map<String, Value>,
    pub autosave: bool,
    pub fields: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            current_step: 1,
            max_step: 1,
            product_id: None,
            sum: None,
            term: None,
            ref_id: None,
            order_id: None,
            payment: Map::new(),
            autosave: false,
            fields: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the registration to `step`, raising `max_step` so that
    /// `current_step <= max_step` always holds.
    pub fn set_step(&mut self, step: i64) {
        self.current_step = step;
        if step > self.max_step {
            self.max_step = step;
        }
    }

    /// Assigns one internal-named field, routing typed columns to their
    /// struct fields and everything else to the business-field bag.
    ///
    /// Returns whether the stored value actually changed, which is the
    /// explicit equality check that stands in for ORM dirty tracking.
    /// Values that cannot be coerced into a typed column leave the record
    /// untouched.
    pub fn set_field(&mut self, internal: &str, value: &Value) -> bool {
        match internal {
            // Identity is immutable after creation.
            "session_id" => false,
            "current_step" => match as_i64(value) {
                Some(step) if step != self.current_step => {
                    self.set_step(step);
                    true
                }
                _ => false,
            },
            "max_step" => match as_i64(value) {
                Some(max) if max >= self.current_step && max != self.max_step => {
                    self.max_step = max;
                    true
                }
                _ => false,
            },
            "product_id" => assign(&mut self.product_id, as_u32(value)),
            "sum" => assign(&mut self.sum, as_decimal(value)),
            "term" => assign(&mut self.term, as_u32(value)),
            "ref_id" => assign(&mut self.ref_id, as_string(value)),
            "order_id" => match (&self.order_id, as_string(value)) {
                // Write-once: never overwritten by a later mismatched value.
                (Some(_), _) => false,
                (None, Some(order_id)) => {
                    self.order_id = Some(order_id);
                    true
                }
                (None, None) => false,
            },
            "autosave" => match value.as_bool() {
                Some(autosave) if autosave != self.autosave => {
                    self.autosave = autosave;
                    true
                }
                _ => false,
            },
            // Payment data merges through `merge_payment`, never a plain write.
            "payment" | "payment_data" => false,
            _ => {
                if self.fields.get(internal) == Some(value) {
                    false
                } else {
                    self.fields.insert(internal.to_string(), value.clone());
                    true
                }
            }
        }
    }

    /// Merges incoming payment-provider fields into the stored mapping,
    /// union by key with new values winning on conflict.
    pub fn merge_payment(&mut self, incoming: &Map<String, Value>) -> bool {
        let mut changed = false;
        for (key, value) in incoming {
            if self.payment.get(key) != Some(value) {
                self.payment.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }

    /// The full persisted attribute map under internal naming: typed
    /// columns plus the business-field bag. Projection and exclusion are
    /// the codec's job, not this one's.
    pub fn attributes(&self) -> BTreeMap<String, Value> {
        let mut attrs: BTreeMap<String, Value> = self.fields.clone();
        attrs.insert("session_id".into(), Value::String(self.session_id.clone()));
        attrs.insert("current_step".into(), self.current_step.into());
        attrs.insert("max_step".into(), self.max_step.into());
        attrs.insert("product_id".into(), to_value(&self.product_id));
        attrs.insert("sum".into(), to_value(&self.sum));
        attrs.insert("term".into(), to_value(&self.term));
        attrs.insert("ref_id".into(), to_value(&self.ref_id));
        attrs.insert("order_id".into(), to_value(&self.order_id));
        attrs.insert("payment".into(), Value::Object(self.payment.clone()));
        attrs.insert("autosave".into(), Value::Bool(self.autosave));
        attrs.insert(
            "created_at".into(),
            Value::String(self.created_at.to_rfc3339()),
        );
        attrs.insert(
            "updated_at".into(),
            Value::String(self.updated_at.to_rfc3339()),
        );
        attrs
    }
}

fn assign<T: PartialEq>(slot: &mut Option<T>, incoming: Option<T>) -> bool {
    match incoming {
        Some(value) if slot.as_ref() != Some(&value) => {
            *slot = Some(value);
            true
        }
        _ => false,
    }
}

pub(crate) fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn to_value<T: Serialize>(value: &Option<T>) -> Value {
    match value {
        Some(inner) => serde_json::to_value(inner).unwrap_or(Value::Null),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_new_starts_at_step_one() {
        let reg = Registration::new("s1");
        assert_eq!(reg.current_step, 1);
        assert_eq!(reg.max_step, 1);
        assert!(reg.order_id.is_none());
    }

    #[test]
    fn test_set_step_raises_max_step() {
        let mut reg = Registration::new("s1");
        reg.set_step(3);
        assert_eq!((reg.current_step, reg.max_step), (3, 3));

        // Going back keeps the high-water mark.
        reg.set_step(2);
        assert_eq!((reg.current_step, reg.max_step), (2, 3));
    }

    #[test]
    fn test_order_id_is_write_once() {
        let mut reg = Registration::new("s1");
        assert!(reg.set_field("order_id", &json!("ORD-1")));
        assert!(!reg.set_field("order_id", &json!("ORD-2")));
        assert_eq!(reg.order_id.as_deref(), Some("ORD-1"));
    }

    #[test]
    fn test_set_field_reports_change() {
        let mut reg = Registration::new("s1");
        assert!(reg.set_field("first_name", &json!("Ann")));
        assert!(!reg.set_field("first_name", &json!("Ann")));
        assert!(reg.set_field("sum", &json!("150.0")));
        assert_eq!(reg.sum, Some(dec!(150.0)));
    }

    #[test]
    fn test_session_id_is_immutable() {
        let mut reg = Registration::new("s1");
        assert!(!reg.set_field("session_id", &json!("other")));
        assert_eq!(reg.session_id, "s1");
    }

    #[test]
    fn test_merge_payment_unions_by_key() {
        let mut reg = Registration::new("s1");
        let first = json!({"a": 1}).as_object().unwrap().clone();
        let second = json!({"b": 2, "a": 3}).as_object().unwrap().clone();

        assert!(reg.merge_payment(&first));
        assert!(reg.merge_payment(&second));

        assert_eq!(reg.payment.get("a"), Some(&json!(3)));
        assert_eq!(reg.payment.get("b"), Some(&json!(2)));
    }

    #[test]
    fn test_attributes_carry_bag_and_columns() {
        let mut reg = Registration::new("s1");
        reg.set_field("phone_verified_at", &json!("2026-01-01T00:00:00Z"));

        let attrs = reg.attributes();
        assert_eq!(attrs.get("session_id"), Some(&json!("s1")));
        assert_eq!(attrs.get("current_step"), Some(&json!(1)));
        assert_eq!(
            attrs.get("phone_verified_at"),
            Some(&json!("2026-01-01T00:00:00Z"))
        );
        assert_eq!(attrs.get("product_id"), Some(&Value::Null));
    }
}
