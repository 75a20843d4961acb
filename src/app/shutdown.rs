use super::{ComponentState, TelemetryOrchestrator};
use crate::error::{Result, TelemetryError};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

impl TelemetryOrchestrator {
    /// Perform graceful shutdown of all components
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        // Cancel all background tasks
        self.cancellation_token.cancel();

        let mut exit_code = 0;

        // Stop components in reverse start order
        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                if let Err(e) = self
                    .stop_component("keyboard", Duration::from_secs(2), keyboard_handler.stop())
                    .await
                {
                    error!("Error stopping keyboard: {}", e);
                    exit_code = 1;
                }
            }
        }

        if self.console_enabled {
            let console = self.console();
            if let Err(e) = self
                .stop_component("console", Duration::from_secs(5), async move {
                    console.stop().await;
                    Ok(())
                })
                .await
            {
                error!("Error stopping console: {}", e);
                exit_code = 1;
            }
        }

        // The activation task may be starting the bridge; let it finish first
        self.join_task("activation").await;
        self.set_component_state("activation", ComponentState::Stopped)
            .await;

        let bridge = self.notification_bridge();
        if let Err(e) = self
            .stop_component("bridge", Duration::from_secs(5), async move {
                bridge.stop().await
            })
            .await
        {
            error!("Error stopping bridge: {}", e);
            exit_code = 1;
        }

        self.join_task("commands").await;
        self.set_component_state("commands", ComponentState::Stopped)
            .await;

        let sensors = self.sensors.clone();
        if let Err(e) = self
            .stop_component("sensors", Duration::from_secs(5), async move {
                sensors.stop_all().await;
                Ok(())
            })
            .await
        {
            error!("Error stopping sensors: {}", e);
            exit_code = 1;
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    /// Stop one component with a deadline, tracking its state
    async fn stop_component<F>(&self, component: &str, deadline: Duration, stop: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        match timeout(deadline, stop).await {
            Ok(Ok(())) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("Error stopping {} component: {}", component, e);
                Err(e)
            }
            Err(_) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("{} component stop timeout", component);
                Err(TelemetryError::System {
                    message: format!("{} component stop timeout", component),
                })
            }
        }
    }

    async fn join_task(&self, name: &str) {
        let handles: Vec<_> = {
            let mut tasks = self.tasks.lock().await;
            let (matching, rest): (Vec<_>, Vec<_>) =
                tasks.drain(..).partition(|(task, _)| *task == name);
            *tasks = rest;
            matching
        };

        for (task, handle) in handles {
            match timeout(Duration::from_secs(5), handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("{} task failed: {}", task, e),
                Err(_) => warn!("{} task did not finish in time", task),
            }
        }
    }
}
