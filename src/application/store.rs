use crate::application::visitors::VisitorProfileResolver;
use crate::domain::calculator::CalculatorCatalog;
use crate::domain::fields::{EXCLUDED_FIELDS, FieldCodec};
use crate::domain::ports::RegistrationRepositoryRef;
use crate::domain::registration::{Registration, as_decimal, as_u32};
use crate::domain::visitor::VisitorProfile;
use crate::error::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Entry-URL parameters that may seed (or re-seed) a registration.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CreationHints {
    pub product_id: Option<u32>,
    pub sum: Option<Decimal>,
    pub term: Option<u32>,
    pub ref_id: Option<String>,
}

/// Finds-or-creates and mutates the one registration record per session.
pub struct RegistrationStore {
    registrations: RegistrationRepositoryRef,
    visitors: VisitorProfileResolver,
    catalog: Arc<CalculatorCatalog>,
}

impl RegistrationStore {
    pub fn new(
        registrations: RegistrationRepositoryRef,
        visitors: VisitorProfileResolver,
        catalog: Arc<CalculatorCatalog>,
    ) -> Self {
        Self {
            registrations,
            visitors,
            catalog,
        }
    }

    pub async fn find(&self, session_id: &str) -> Result<Option<Registration>> {
        self.registrations.find(session_id).await
    }

    /// Returns the session's registration, creating it on first access.
    ///
    /// Re-visiting the entry URL with a `product_id` hint upserts: the
    /// workflow restarts at step 1 and `product_id`/`sum`/`term`/`ref_id`
    /// are re-seeded from the resolved calculator, even on a registration
    /// that had progressed further. Without the hint an existing
    /// registration is returned untouched. Either way the associated
    /// visitor record is guaranteed to exist afterwards.
    pub async fn find_or_create(
        &self,
        session_id: &str,
        hints: &CreationHints,
        profile: &VisitorProfile,
    ) -> Result<Registration> {
        let registration = match (self.registrations.find(session_id).await?, hints.product_id) {
            (Some(existing), None) => existing,
            (Some(mut existing), Some(_)) => {
                self.seed(&mut existing, hints);
                existing.updated_at = Utc::now();
                self.registrations.update(existing.clone()).await?;
                tracing::info!(session_id, product_id = ?existing.product_id, "registration re-seeded");
                existing
            }
            (None, _) => {
                let mut created = Registration::new(session_id);
                self.seed(&mut created, hints);
                self.registrations.insert(created.clone()).await?;
                tracing::info!(session_id, product_id = ?created.product_id, "registration created");
                created
            }
        };

        self.visitors.ensure(session_id, profile).await?;
        Ok(registration)
    }

    fn seed(&self, registration: &mut Registration, hints: &CreationHints) {
        let fields =
            self.catalog
                .derive_creation_fields(hints.product_id, hints.sum, hints.term);
        registration.current_step = 1;
        registration.product_id = Some(fields.product_id);
        registration.sum = Some(fields.sum);
        registration.term = Some(fields.term);
        registration.ref_id = hints.ref_id.clone();
    }

    /// Applies a single-field update coming from the client. A missing or
    /// null value is coerced to an empty string; the write is skipped when
    /// the stored value is already equal. Always succeeds.
    pub async fn apply_field_update(
        &self,
        registration: &mut Registration,
        external_name: &str,
        value: Option<Value>,
    ) -> Result<()> {
        let internal = FieldCodec::to_internal(external_name);
        let value = match value {
            None | Some(Value::Null) => Value::String(String::new()),
            Some(other) => other,
        };

        if self.within_calculator_bounds(registration, &internal, &value)
            && registration.set_field(&internal, &value)
        {
            registration.updated_at = Utc::now();
            self.registrations.update(registration.clone()).await?;
        }
        Ok(())
    }

    /// Applies a multi-field update in one persisted operation. Payment
    /// data merges into the existing mapping; every other key overwrites.
    pub async fn apply_bulk_update(
        &self,
        registration: &mut Registration,
        fields: &BTreeMap<String, Value>,
    ) -> Result<()> {
        let mut changed = false;
        for (external_name, value) in fields {
            let internal = FieldCodec::to_internal(external_name);
            match (internal.as_str(), value) {
                ("payment" | "payment_data", Value::Object(incoming)) => {
                    changed |= registration.merge_payment(incoming);
                }
                _ => {
                    if self.within_calculator_bounds(registration, &internal, value) {
                        changed |= registration.set_field(&internal, value);
                    }
                }
            }
        }

        if changed {
            registration.updated_at = Utc::now();
        }
        self.registrations.update(registration.clone()).await?;
        Ok(())
    }

    // `sum` and `term` must stay inside the resolved calculator's bounds
    // whenever present; out-of-range writes are dropped, same policy as at
    // creation.
    fn within_calculator_bounds(
        &self,
        registration: &Registration,
        internal: &str,
        value: &Value,
    ) -> bool {
        match internal {
            "sum" => match as_decimal(value) {
                Some(sum) => {
                    let calc = self.catalog.resolve(registration.product_id);
                    calc.sum_min <= sum && sum <= calc.sum_max
                }
                None => true,
            },
            "term" => match as_u32(value) {
                Some(term) => {
                    let calc = self.catalog.resolve(registration.product_id);
                    calc.term_min <= term && term <= calc.term_max
                }
                None => true,
            },
            _ => true,
        }
    }

    pub async fn delete(&self, registration: &Registration) -> Result<()> {
        self.registrations.delete(&registration.session_id).await?;
        tracing::info!(session_id = %registration.session_id, "registration deleted");
        Ok(())
    }

    /// Client-facing projection of all persisted fields minus the static
    /// exclusion set, external naming, nulls as empty strings.
    pub fn projected_view(registration: &Registration) -> BTreeMap<String, Value> {
        FieldCodec::project(&registration.attributes(), EXCLUDED_FIELDS)
    }
}
