use serde_json::Value;
use std::collections::BTreeMap;

/// Attributes that never leave the engine in a client-facing projection:
/// identity/audit columns, payment data, credentials, and verification codes
/// (verification timestamps are fine).
pub const EXCLUDED_FIELDS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "customer_id",
    "payment",
    "password",
    "session_id",
    "phone_verification_code",
    "email_verification_code",
    "ref_id",
];

/// Bidirectional mapping between the external (camelCase) field naming and
/// the internal (snake_case) storage naming.
///
/// The conversion is purely mechanical, so unknown keys translate without a
/// catalog. Keys that are already in the target convention pass through
/// unchanged, which makes [`FieldCodec::project`] idempotent.
pub struct FieldCodec;

impl FieldCodec {
    /// snake_case -> camelCase.
    pub fn to_external(internal: &str) -> String {
        let mut out = String::with_capacity(internal.len());
        let mut upper_next = false;
        for c in internal.chars() {
            if c == '_' {
                upper_next = true;
            } else if upper_next {
                out.extend(c.to_uppercase());
                upper_next = false;
            } else {
                out.push(c);
            }
        }
        out
    }

    /// camelCase -> snake_case.
    pub fn to_internal(external: &str) -> String {
        let mut out = String::with_capacity(external.len() + 4);
        for c in external.chars() {
            if c.is_uppercase() {
                out.push('_');
                out.extend(c.to_lowercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Client-facing projection of an internal attribute map: drops the
    /// excluded keys, converts the rest to external naming, and substitutes
    /// an empty string for null values.
    pub fn project(
        attributes: &BTreeMap<String, Value>,
        excluded: &[&str],
    ) -> BTreeMap<String, Value> {
        attributes
            .iter()
            .filter(|(key, _)| !excluded.contains(&key.as_str()))
            .map(|(key, value)| {
                let value = match value {
                    Value::Null => Value::String(String::new()),
                    other => other.clone(),
                };
                (Self::to_external(key), value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_camel_round_trip() {
        for key in [
            "phoneVerifiedAt",
            "emailVerifiedAt",
            "firstName",
            "sum",
            "currentStep",
            "passportNumber",
        ] {
            assert_eq!(FieldCodec::to_external(&FieldCodec::to_internal(key)), key);
        }
    }

    #[test]
    fn test_to_internal() {
        assert_eq!(FieldCodec::to_internal("phoneVerifiedAt"), "phone_verified_at");
        assert_eq!(FieldCodec::to_internal("sum"), "sum");
    }

    #[test]
    fn test_project_excludes_and_converts() {
        let mut attrs = BTreeMap::new();
        attrs.insert("first_name".to_string(), json!("Ann"));
        attrs.insert("password".to_string(), json!("secret"));
        attrs.insert("phone_verified_at".to_string(), Value::Null);

        let projected = FieldCodec::project(&attrs, EXCLUDED_FIELDS);

        assert_eq!(projected.get("firstName"), Some(&json!("Ann")));
        assert_eq!(projected.get("phoneVerifiedAt"), Some(&json!("")));
        assert!(!projected.contains_key("password"));
        assert!(!projected.contains_key("first_name"));
    }

    #[test]
    fn test_project_is_idempotent() {
        let mut attrs = BTreeMap::new();
        attrs.insert("first_name".to_string(), json!("Ann"));
        attrs.insert("email_verified_at".to_string(), Value::Null);

        let once = FieldCodec::project(&attrs, EXCLUDED_FIELDS);
        let twice = FieldCodec::project(&once, EXCLUDED_FIELDS);
        assert_eq!(once, twice);
    }
}
