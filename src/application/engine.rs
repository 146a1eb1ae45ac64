use crate::application::files::FileAttachmentManager;
use crate::application::steps::{Decision, StepController};
use crate::application::store::{CreationHints, RegistrationStore};
use crate::application::visitors::VisitorProfileResolver;
use crate::domain::attachment::{AttachmentView, FileBlob};
use crate::domain::calculator::CalculatorCatalog;
use crate::domain::ports::{
    AttachmentStoreRef, LookupOptionsRef, PaymentGatewayRef, RegistrationRepositoryRef,
    SessionIdentityRef, VisitorRepositoryRef,
};
use crate::domain::registration::Registration;
use crate::domain::visitor::VisitorProfile;
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Request-scoped passthroughs owned by the excluded HTTP/security layer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// The requested page URL.
    pub url: String,
    /// Anti-forgery token minted by the security layer.
    pub csrf_token: String,
}

/// The state snapshot rendered into the client on page load.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub current_step: i64,
    pub max_step: i64,
    pub autosave: bool,
    pub is_phone_confirmed: bool,
    pub is_email_confirmed: bool,
    pub token: String,
    pub page: String,
    pub fields: BTreeMap<String, Value>,
    pub files: BTreeMap<String, Vec<AttachmentView>>,
    pub calc: BTreeMap<String, Value>,
    pub options: BTreeMap<String, Value>,
}

/// The main entry point for the registration flow.
///
/// `RegistrationStateEngine` composes the store, the step controller, the
/// attachment manager, and the visitor resolver into the per-request
/// operations the request layer invokes. Mutating operations on the same
/// session are serialized with a per-session lock, so find-or-create,
/// payment-data merges, and file replacement stay race-free.
pub struct RegistrationStateEngine {
    store: RegistrationStore,
    files: FileAttachmentManager,
    steps: StepController,
    catalog: Arc<CalculatorCatalog>,
    gateway: PaymentGatewayRef,
    options: LookupOptionsRef,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RegistrationStateEngine {
    pub fn new(
        registrations: RegistrationRepositoryRef,
        visitors: VisitorRepositoryRef,
        attachments: AttachmentStoreRef,
        session: SessionIdentityRef,
        gateway: PaymentGatewayRef,
        options: LookupOptionsRef,
        catalog: Arc<CalculatorCatalog>,
    ) -> Self {
        Self {
            store: RegistrationStore::new(
                registrations.clone(),
                VisitorProfileResolver::new(visitors),
                catalog.clone(),
            ),
            files: FileAttachmentManager::new(attachments),
            steps: StepController::new(registrations, session),
            catalog,
            gateway,
            options,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves (or creates) the registration/visitor pair and assembles
    /// the full client view.
    pub async fn init_view(
        &self,
        session_id: &str,
        hints: &CreationHints,
        profile: &VisitorProfile,
        request: &RequestContext,
    ) -> Result<ViewModel> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let registration = self.store.find_or_create(session_id, hints, profile).await?;
        let fields = RegistrationStore::projected_view(&registration);
        let files = self.files.list_by_type(session_id).await?;
        let calc = CalculatorCatalog::public_view(self.catalog.resolve(registration.product_id));
        let options = self.options.lists().await?;

        Ok(ViewModel {
            current_step: registration.current_step,
            max_step: registration.max_step,
            autosave: registration.autosave,
            is_phone_confirmed: truthy(fields.get("phoneVerifiedAt")),
            is_email_confirmed: truthy(fields.get("emailVerifiedAt")),
            token: request.csrf_token.clone(),
            page: request.url.clone(),
            fields,
            files,
            calc,
            options,
        })
    }

    /// Normalizes and persists one field update. Always succeeds, even
    /// when the value was unchanged.
    pub async fn update_field(
        &self,
        session_id: &str,
        name: &str,
        value: Option<Value>,
    ) -> Result<()> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut registration = self.locate(session_id).await?;
        self.store
            .apply_field_update(&mut registration, name, value)
            .await
    }

    /// Replaces the attachment of `file_type` with `blob`.
    pub async fn update_file(
        &self,
        session_id: &str,
        file_type: &str,
        blob: FileBlob,
    ) -> Result<()> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        self.locate(session_id).await?;
        self.files.replace(session_id, file_type, blob).await
    }

    /// Applies a multi-field update; reaching the final step hands the
    /// registration over to the payment stage (two-phase write, see
    /// `StepController::enter_payment_step`).
    pub async fn bulk_update(
        &self,
        session_id: &str,
        fields: &BTreeMap<String, Value>,
    ) -> Result<()> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut registration = self.locate(session_id).await?;
        self.store
            .apply_bulk_update(&mut registration, fields)
            .await?;

        if StepController::requests_final_step(fields) {
            self.steps.enter_payment_step(&mut registration).await?;
        }
        Ok(())
    }

    pub async fn delete(&self, session_id: &str) -> Result<()> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        if let Some(registration) = self.store.find(session_id).await? {
            self.store.delete(&registration).await?;
        }
        Ok(())
    }

    /// Reconciles a supplied order id against the registration and resolves
    /// the resulting decision: a pending payment is polled at the gateway
    /// and reported as `Decision::None`, redirects pass through.
    pub async fn control_order_id(
        &self,
        session_id: &str,
        supplied_order_id: Option<&str>,
        request_url: &str,
    ) -> Result<Decision> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let registration = self.locate(session_id).await?;
        let decision = self
            .steps
            .reconcile_order_id(&registration, supplied_order_id, request_url)
            .await?;

        match decision {
            Decision::PollAndContinue => {
                if let Some(order_id) = &registration.order_id {
                    tracing::debug!(session_id, order_id = %order_id, "polling payment status");
                    self.gateway.check_status(order_id).await?;
                }
                Ok(Decision::None)
            }
            other => Ok(other),
        }
    }

    // Non-init operations resolve the registration with empty hints; the
    // profile only matters on first creation.
    async fn locate(&self, session_id: &str) -> Result<Registration> {
        self.store
            .find_or_create(session_id, &CreationHints::default(), &VisitorProfile::default())
            .await
    }

    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(_) => true,
    }
}
