// ABOUTME: Shared helper for connecting to the local container runtime.
// ABOUTME: Builds the lifecycle manager every runtime-touching command runs through.

use std::sync::Arc;
use std::time::Duration;

use skiff::config::Config;
use skiff::deploy::LifecycleManager;
use skiff::error::Result;
use skiff::events::{BroadcastBus, Envelope};
use skiff::output::Output;
use skiff::runtime::{BollardRuntime, ConnectError, RuntimeInfo, detect_runtime};
use skiff::source::GitCli;
use skiff::store::JsonFileStore;
use tokio::sync::broadcast;

/// Headroom on top of the longest stage bound for each API request.
const REQUEST_SLACK: Duration = Duration::from_secs(30);

/// Connect to the runtime on this host.
///
/// This handles the common pattern of:
/// 1. Detecting the runtime type and socket path
/// 2. Outputting progress messages
/// 3. Establishing and checking the connection
pub async fn connect_to_runtime(config: &Config, output: &Output) -> Result<BollardRuntime> {
    output.progress("  → Detecting runtime...");
    let socket = detect_runtime(Some(&config.runtime)).map_err(ConnectError::from)?;

    output.progress(&format!(
        "  → Found {} at {}",
        socket.runtime_type, socket.socket_path
    ));

    let runtime = BollardRuntime::connect(&socket, config.timeouts.longest() + REQUEST_SLACK)
        .map_err(ConnectError::from)?;
    let rtt = runtime.ping().await.map_err(ConnectError::from)?;
    tracing::debug!(
        runtime = %runtime.runtime_type(),
        rtt_ms = rtt.as_millis() as u64,
        "runtime reachable"
    );

    Ok(runtime)
}

/// A lifecycle manager over the local runtime, the on-disk store, and git,
/// plus a receiver for the events it publishes.
pub async fn open_manager(
    config: &Config,
    output: &Output,
) -> Result<(LifecycleManager<BollardRuntime>, broadcast::Receiver<Envelope>)> {
    let runtime = connect_to_runtime(config, output).await?;
    let bus = BroadcastBus::default();
    let events = bus.subscribe();

    let manager = LifecycleManager::new(
        config,
        Arc::new(runtime),
        Arc::new(JsonFileStore::new(config.store_dir())),
        Arc::new(bus),
        Arc::new(GitCli::default()),
    );
    Ok((manager, events))
}

/// Print every event until the sender side goes away.
pub fn forward_events(
    mut events: broadcast::Receiver<Envelope>,
    output: Output,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(envelope) => output.event(&envelope.event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("event printer lagged by {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
