// bin/demo.rs - Loopback Lifecycle Demo

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use dsp_connector::config::ConnectorConfig;
use dsp_connector::observability::{
    init_metrics, init_tracing, MetricsConfig, TracingConfig, TracingFormat,
};
use dsp_connector::prelude::*;

/// Drives a consumer negotiation and a consumer transfer through their happy
/// paths against in-memory collaborators, the way the external scheduler
/// would, simulating the counterparty's moves in between.
#[derive(Parser, Debug)]
#[command(name = "dsp-demo")]
#[command(version)]
#[command(about = "Dataspace connector control-plane demo", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (pretty, compact, json)
    #[arg(long, default_value = "pretty")]
    log_format: String,

    /// Enable metrics server
    #[arg(long)]
    metrics: bool,

    /// Metrics listen address
    #[arg(long, default_value = "0.0.0.0:9090")]
    metrics_addr: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ConnectorConfig::load(args.config.as_deref())?;

    init_tracing(TracingConfig {
        filter: format!("{},dsp_connector={}", args.log_level, args.log_level),
        format: match args.log_format.as_str() {
            "json" => TracingFormat::Json,
            "compact" => TracingFormat::Compact,
            _ => TracingFormat::Pretty,
        },
        with_ansi: args.log_format != "json",
        ..TracingConfig::default()
    });

    info!(participant = %config.participant_id, protocol = %config.protocol, "Starting demo connector");

    let _metrics_handle = if args.metrics {
        let metrics_addr: SocketAddr = args.metrics_addr.parse()?;
        match init_metrics(MetricsConfig {
            listen_addr: metrics_addr,
            ..Default::default()
        }) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to initialize metrics");
                None
            }
        }
    } else {
        None
    };

    let webhooks = Arc::new(InMemoryWebhookRegistry::new());
    webhooks.register(&config.protocol, &config.callback_address);
    let dispatcher = Arc::new(LoopbackDispatcher::new("remote-pid-1"));

    run_negotiation(&config, webhooks.clone(), dispatcher.clone()).await?;
    run_transfer(&config, webhooks, dispatcher.clone()).await?;

    info!(
        dispatched = dispatcher.sent_count(),
        "Demo finished; both lifecycles reached their terminal states"
    );
    Ok(())
}

async fn run_negotiation(
    config: &ConnectorConfig,
    webhooks: Arc<InMemoryWebhookRegistry>,
    dispatcher: Arc<LoopbackDispatcher>,
) -> Result<()> {
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = NegotiationOrchestrator::builder(
        &config.participant_id,
        store.clone(),
        dispatcher,
        webhooks,
    )
    .build();

    let offer = ContractOffer::new(
        "offer-demo-1",
        "asset-demo-1",
        Policy::new().with_target("asset-demo-1"),
    );
    let negotiation = Negotiation::initiate_as_consumer(
        "provider-demo",
        "https://provider.example/protocol",
        &config.protocol,
        offer,
    );
    let id = negotiation.id().to_string();
    store.save(&negotiation).await?;
    info!(id = %id, "Consumer negotiation created");

    // The scheduler would fire these; each call pushes one hop.
    orchestrator.handle(&id, NegotiationState::Initial).await?;
    orchestrator.handle(&id, NegotiationState::Requesting).await?;

    // The provider's agreement arrives out-of-band; the consumer then
    // verifies it.
    simulate_negotiation_hop(&store, &id, NegotiationState::Verifying).await?;
    orchestrator.handle(&id, NegotiationState::Verifying).await?;

    // Finalization is announced by the provider.
    simulate_negotiation_hop(&store, &id, NegotiationState::Finalized).await?;

    let done = store.find_by_id(&id).await?.unwrap();
    info!(
        id = %id,
        state = done.state().name(),
        correlation = ?done.correlation_id(),
        "Negotiation lifecycle complete"
    );
    Ok(())
}

async fn run_transfer(
    config: &ConnectorConfig,
    webhooks: Arc<InMemoryWebhookRegistry>,
    dispatcher: Arc<LoopbackDispatcher>,
) -> Result<()> {
    let store = Arc::new(InMemoryStore::new());
    let policies = Arc::new(InMemoryPolicyArchive::new());
    policies.register("contract-demo-1", Policy::new().with_target("asset-demo-1"));

    let orchestrator = TransferOrchestrator::builder(
        store.clone(),
        dispatcher,
        webhooks,
        policies,
        Arc::new(InMemoryAddressResolver::new()),
        Arc::new(StubDataFlowManager::new()),
        Arc::new(InMemoryVault::new()),
    )
    .build();

    let process = TransferProcess::initiate_as_consumer(
        "provider-demo",
        "https://provider.example/protocol",
        &config.protocol,
        "contract-demo-1",
        "asset-demo-1",
        "HttpData-PULL",
        Some(DataAddress::new("HttpData")),
    );
    let id = process.id().to_string();
    store.save(&process).await?;
    info!(id = %id, "Consumer transfer created");

    orchestrator.handle(&id, TransferState::Initial).await?;
    orchestrator.handle(&id, TransferState::Requesting).await?;

    // The provider starts the flow and eventually the data plane drains;
    // completion is then driven locally.
    simulate_transfer_hop(&store, &id, TransferState::Started).await?;
    simulate_transfer_hop(&store, &id, TransferState::Completing).await?;
    orchestrator.handle(&id, TransferState::Completing).await?;

    let done = store.find_by_id(&id).await?.unwrap();
    info!(
        id = %id,
        state = done.state().name(),
        "Transfer lifecycle complete"
    );
    Ok(())
}

/// Stand-in for the incoming-message layer moving a waiting entity onward.
async fn simulate_negotiation_hop(
    store: &Arc<InMemoryStore<Negotiation>>,
    id: &str,
    state: NegotiationState,
) -> Result<()> {
    let mut entity = store.find_by_id(id).await?.unwrap();
    entity.transition_to(state);
    store.save(&entity).await?;
    info!(id, state = state.name(), "Simulated counterparty message");
    Ok(())
}

async fn simulate_transfer_hop(
    store: &Arc<InMemoryStore<TransferProcess>>,
    id: &str,
    state: TransferState,
) -> Result<()> {
    let mut entity = store.find_by_id(id).await?.unwrap();
    entity.transition_to(state);
    store.save(&entity).await?;
    info!(id, state = state.name(), "Simulated counterparty message");
    Ok(())
}
