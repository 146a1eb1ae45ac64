use clap::Parser;
use miette::{IntoDiagnostic, Result};
use regflow::application::engine::{RegistrationStateEngine, RequestContext};
use regflow::application::store::CreationHints;
use regflow::domain::attachment::FileBlob;
use regflow::domain::calculator::{CalculatorCatalog, CalculatorConfig};
use regflow::domain::ports::{
    AttachmentStoreRef, LookupOptionsRef, PaymentGatewayRef, RegistrationRepositoryRef,
    SessionIdentityRef, VisitorRepositoryRef,
};
use regflow::domain::visitor::VisitorProfile;
use regflow::infrastructure::in_memory::{
    InMemoryAttachmentStore, InMemoryRegistrationRepository, InMemorySessionIdentity,
    InMemoryVisitorRepository, RecordingPaymentGateway, StaticLookupOptions,
};
use regflow::interfaces::csv::event_reader::{EventOp, FormEvent, FormEventReader};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input form-events CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Calculator catalog JSON file (optional). Defaults to the built-in catalog.
    #[arg(long)]
    calculators: Option<PathBuf>,

    /// Session identity to replay the events under.
    #[arg(long, default_value = "local-session")]
    session: String,
}

/// Creation hints as they appear in an `init` event's JSON payload.
#[derive(serde::Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct InitHints {
    product_id: Option<u32>,
    sum: Option<Decimal>,
    term: Option<u32>,
    ref_id: Option<String>,
}

impl From<InitHints> for CreationHints {
    fn from(hints: InitHints) -> Self {
        Self {
            product_id: hints.product_id,
            sum: hints.sum,
            term: hints.term,
            ref_id: hints.ref_id,
        }
    }
}

type StoragePorts = (
    RegistrationRepositoryRef,
    VisitorRepositoryRef,
    AttachmentStoreRef,
);

fn in_memory_ports() -> StoragePorts {
    (
        Arc::new(InMemoryRegistrationRepository::new()),
        Arc::new(InMemoryVisitorRepository::new()),
        Arc::new(InMemoryAttachmentStore::new()),
    )
}

fn open_storage(db_path: Option<PathBuf>) -> Result<StoragePorts> {
    match db_path {
        Some(db_path) => open_persistent(db_path),
        None => Ok(in_memory_ports()),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_persistent(db_path: PathBuf) -> Result<StoragePorts> {
    let store = regflow::infrastructure::rocksdb::RocksDbStore::open(db_path).into_diagnostic()?;
    Ok((
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store),
    ))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_persistent(db_path: PathBuf) -> Result<StoragePorts> {
    let _ = db_path;
    eprintln!(
        "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
    );
    Ok(in_memory_ports())
}

fn load_catalog(path: Option<PathBuf>) -> Result<CalculatorCatalog> {
    match path {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            let configs: Vec<CalculatorConfig> =
                serde_json::from_reader(file).into_diagnostic()?;
            CalculatorCatalog::new(configs).into_diagnostic()
        }
        None => Ok(CalculatorCatalog::builtin()),
    }
}

fn cli_profile() -> VisitorProfile {
    VisitorProfile {
        ip_address: "127.0.0.1".to_string(),
        user_agent: "regflow-cli".to_string(),
        device: "cli".to_string(),
        platform: std::env::consts::OS.to_string(),
        is_desktop: true,
        ..VisitorProfile::default()
    }
}

const PAGE_URL: &str = "https://localhost/apply";

async fn apply_event(
    engine: &RegistrationStateEngine,
    session: &str,
    event: FormEvent,
) -> regflow::error::Result<()> {
    match event.op {
        EventOp::Init => {
            let hints: InitHints = if event.value.is_empty() {
                InitHints::default()
            } else {
                serde_json::from_str(&event.value)
                    .map_err(|e| regflow::error::RegistrationError::Validation(e.to_string()))?
            };
            let request = RequestContext {
                url: PAGE_URL.to_string(),
                csrf_token: String::new(),
            };
            engine
                .init_view(session, &hints.into(), &cli_profile(), &request)
                .await?;
        }
        EventOp::Field => {
            let value = (!event.value.is_empty()).then(|| Value::String(event.value));
            engine.update_field(session, &event.name, value).await?;
        }
        EventOp::File => {
            let path = PathBuf::from(&event.value);
            let content = std::fs::read(&path)?;
            let blob = FileBlob {
                file_name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| event.value.clone()),
                mime_type: mime_guess::from_path(&path)
                    .first_or_octet_stream()
                    .to_string(),
                content,
            };
            engine.update_file(session, &event.name, blob).await?;
        }
        EventOp::Bulk => {
            let fields: BTreeMap<String, Value> = serde_json::from_str(&event.value)
                .map_err(|e| regflow::error::RegistrationError::Validation(e.to_string()))?;
            engine.bulk_update(session, &fields).await?;
        }
        EventOp::Order => {
            let supplied = (!event.value.is_empty()).then_some(event.value.as_str());
            let url = match supplied {
                Some(order_id) => format!("{PAGE_URL}?order_id={order_id}"),
                None => PAGE_URL.to_string(),
            };
            let decision = engine.control_order_id(session, supplied, &url).await?;
            tracing::info!(?decision, "order id reconciled");
        }
        EventOp::Delete => engine.delete(session).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let (registrations, visitors, attachments) = open_storage(cli.db_path)?;
    let catalog = Arc::new(load_catalog(cli.calculators)?);

    let session_identity: SessionIdentityRef =
        Arc::new(InMemorySessionIdentity::new(cli.session.clone()));
    let gateway: PaymentGatewayRef = Arc::new(RecordingPaymentGateway::new());
    let options: LookupOptionsRef = Arc::new(StaticLookupOptions);

    let engine = RegistrationStateEngine::new(
        registrations,
        visitors,
        attachments,
        session_identity,
        gateway,
        options,
        catalog,
    );

    // Replay the recorded events
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = FormEventReader::new(file);
    for event_result in reader.events() {
        match event_result {
            Ok(event) => {
                if let Err(e) = apply_event(&engine, &cli.session, event).await {
                    eprintln!("Error processing event: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    // Output the final client view
    let request = RequestContext {
        url: PAGE_URL.to_string(),
        csrf_token: String::new(),
    };
    let view = engine
        .init_view(
            &cli.session,
            &CreationHints::default(),
            &cli_profile(),
            &request,
        )
        .await
        .into_diagnostic()?;

    println!(
        "{}",
        serde_json::to_string_pretty(&view).into_diagnostic()?
    );

    Ok(())
}
