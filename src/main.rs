/*!
 * Swarm Kernel - Main Entry Point
 *
 * Standalone control-plane daemon:
 * - Entity admission gating (pressure, throttle, circuit breaker)
 * - Per-entity lifecycle management
 * - Host resource monitoring
 * - Session pooling
 */

use std::error::Error;
use std::sync::Arc;
use tracing::info;

use swarm_kernel::{init_tracing, AdmissionController, ControlTask, KernelConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize structured tracing
    init_tracing();

    info!("Swarm kernel starting...");
    info!("================================================");

    info!("Loading configuration...");
    let config = KernelConfig::load();

    info!("Initializing admission controller...");
    let controller = Arc::new(AdmissionController::builder(config.clone()).build());

    info!(
        "Spawning control task ({}ms tick)...",
        config.control_tick().as_millis()
    );
    let control_task = ControlTask::spawn(Arc::clone(&controller), config.control_tick());

    info!("Swarm kernel ready");
    info!("================================================");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    control_task.shutdown().await;
    info!("Swarm kernel stopped");

    Ok(())
}
