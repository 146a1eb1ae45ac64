use crate::domain::fields::FieldCodec;
use crate::domain::ports::{RegistrationRepositoryRef, SessionIdentityRef};
use crate::domain::registration::{Registration, as_i64};
use crate::error::Result;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;

/// The payment-in-progress stage.
pub const PAYMENT_STEP: i64 = 4;
/// The last client-driven stage; reaching it hands control to the payment
/// flow.
pub const FINAL_STEP: i64 = 5;

/// Outcome of reconciling the supplied order id against the registration.
///
/// `PollAndContinue` asks the caller to check the payment status with the
/// gateway; the engine performs that call and reports `None` onward.
#[derive(Debug, PartialEq, Clone)]
pub enum Decision {
    None,
    /// Redirect to the request URL with the `order_id` parameter stripped.
    Redirect(String),
    PollAndContinue,
}

/// Interprets the current step and the order-id correlation, and drives the
/// transition into the payment stage.
pub struct StepController {
    registrations: RegistrationRepositoryRef,
    session: SessionIdentityRef,
}

impl StepController {
    pub fn new(registrations: RegistrationRepositoryRef, session: SessionIdentityRef) -> Self {
        Self {
            registrations,
            session,
        }
    }

    /// Whether a bulk update carries `currentStep == FINAL_STEP` and must
    /// therefore trigger the payment-step advancement afterwards.
    pub fn requests_final_step(fields: &BTreeMap<String, Value>) -> bool {
        fields.iter().any(|(external_name, value)| {
            FieldCodec::to_internal(external_name) == "current_step"
                && as_i64(value) == Some(FINAL_STEP)
        })
    }

    /// The controller's own step-set operation: re-drives a registration
    /// that was just persisted at `FINAL_STEP` into the payment stage with
    /// a second write. The two-phase shape is deliberate and observable.
    pub async fn enter_payment_step(&self, registration: &mut Registration) -> Result<()> {
        registration.set_step(PAYMENT_STEP);
        registration.updated_at = Utc::now();
        self.registrations.update(registration.clone()).await?;
        tracing::info!(
            session_id = %registration.session_id,
            "registration entered payment step"
        );
        Ok(())
    }

    /// Order-id reconciliation state machine.
    ///
    /// Presence and match of the order id gate a strict sequence: assign,
    /// poll while the payment stage is pending, then finalize and rotate
    /// the session identity. A stale or forged order id never advances the
    /// flow; it either bounces back to the clean URL or is ignored.
    pub async fn reconcile_order_id(
        &self,
        registration: &Registration,
        supplied_order_id: Option<&str>,
        request_url: &str,
    ) -> Result<Decision> {
        let current_step = registration.current_step;

        // Finalized without a recorded order id: rotate and start clean.
        if registration.order_id.is_none() && current_step == FINAL_STEP {
            self.rotate_session(&registration.session_id).await?;
            return Ok(Decision::Redirect(strip_order_id_param(request_url)));
        }

        let Some(supplied) = supplied_order_id else {
            return Ok(Decision::None);
        };

        // An order id cannot arrive before one was assigned server-side.
        let Some(stored) = registration.order_id.as_deref() else {
            return Ok(Decision::Redirect(strip_order_id_param(request_url)));
        };

        if stored == supplied {
            if current_step == PAYMENT_STEP {
                return Ok(Decision::PollAndContinue);
            }
            if current_step == FINAL_STEP {
                self.rotate_session(&registration.session_id).await?;
                return Ok(Decision::Redirect(strip_order_id_param(request_url)));
            }
        }

        Ok(Decision::None)
    }

    // Rotation must happen before the redirect is issued, else a repeated
    // request with the old identity could re-trigger finalization.
    async fn rotate_session(&self, session_id: &str) -> Result<()> {
        let new_id = self.session.regenerate().await?;
        tracing::info!(session_id, new_id = %new_id, "session identity rotated");
        Ok(())
    }
}

/// Removes the `order_id` query parameter from a request URL.
fn strip_order_id_param(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some("order_id"))
        .collect();

    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, kept.join("&"))
    }
}
