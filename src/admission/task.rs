/*!
 * Control Task - Autonomous Periodic Ticking
 *
 * Background task that drives the control tick (resource sampling, breaker
 * evaluation, pool cleanup) so the host does not have to wire the tick into
 * its own loop. Hosts with a simulation loop call
 * `AdmissionController::tick` themselves instead and skip this task.
 */

use crate::admission::controller::AdmissionController;
use log::{info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Control messages for the control task
#[derive(Debug, Clone)]
pub enum ControlCommand {
    /// Change the tick interval
    UpdateInterval(Duration),
    /// Pause automatic ticking
    Pause,
    /// Resume automatic ticking
    Resume,
    /// Run one tick immediately
    Trigger,
    /// Shut the task down
    Shutdown,
}

/// Handle to the control background task
pub struct ControlTask {
    command_tx: mpsc::UnboundedSender<ControlCommand>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ControlTask {
    /// Spawn a task ticking `controller` at `tick_interval`
    #[must_use]
    pub fn spawn(controller: Arc<AdmissionController>, tick_interval: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            run_control_loop(controller, tick_interval, command_rx).await;
        });

        info!(
            "Control task spawned - autonomous ticking every {}ms",
            tick_interval.as_millis()
        );

        Self {
            command_tx,
            handle: Some(handle),
        }
    }

    /// Change the tick interval (takes effect immediately)
    pub fn update_interval(&self, interval: Duration) {
        let _ = self
            .command_tx
            .send(ControlCommand::UpdateInterval(interval));
    }

    /// Pause automatic ticking (the host can still tick manually)
    pub fn pause(&self) {
        let _ = self.command_tx.send(ControlCommand::Pause);
    }

    /// Resume automatic ticking
    pub fn resume(&self) {
        let _ = self.command_tx.send(ControlCommand::Resume);
    }

    /// Run one tick immediately
    pub fn trigger(&self) {
        let _ = self.command_tx.send(ControlCommand::Trigger);
    }

    /// Shut down gracefully
    pub async fn shutdown(mut self) {
        let _ = self.command_tx.send(ControlCommand::Shutdown);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Control task shutdown error: {}", e);
            } else {
                info!("Control task shutdown complete");
            }
        }
    }
}

/// Core control loop
async fn run_control_loop(
    controller: Arc<AdmissionController>,
    tick_interval: Duration,
    mut command_rx: mpsc::UnboundedReceiver<ControlCommand>,
) {
    let mut active = true;
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if active {
                    let now = Instant::now();
                    controller.tick(now - last_tick);
                    last_tick = now;
                }
            }
            command = command_rx.recv() => {
                match command {
                    Some(ControlCommand::UpdateInterval(new_interval)) => {
                        interval = tokio::time::interval(new_interval);
                        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                        info!("Control tick interval updated to {}ms", new_interval.as_millis());
                    }
                    Some(ControlCommand::Pause) => {
                        active = false;
                        info!("Control task paused");
                    }
                    Some(ControlCommand::Resume) => {
                        active = true;
                        last_tick = Instant::now();
                        info!("Control task resumed");
                    }
                    Some(ControlCommand::Trigger) => {
                        let now = Instant::now();
                        controller.tick(now - last_tick);
                        last_tick = now;
                    }
                    Some(ControlCommand::Shutdown) | None => {
                        info!("Control task stopping");
                        break;
                    }
                }
            }
        }
    }
}
