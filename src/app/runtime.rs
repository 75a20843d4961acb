use super::orchestrator::ShutdownSlot;
use super::{ShutdownReason, TelemetryOrchestrator};
use crate::error::{Result, TelemetryError};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

impl TelemetryOrchestrator {
    /// Run until a shutdown is requested, then shut down gracefully
    pub async fn run(&mut self) -> Result<i32> {
        info!("Telemetry system is running");

        let shutdown_receiver =
            self.shutdown_receiver
                .take()
                .ok_or_else(|| TelemetryError::System {
                    message: "Shutdown receiver already taken".to_string(),
                })?;

        // Spawn signal handlers
        self.setup_signal_handlers();

        // Wait for shutdown signal
        let shutdown_reason = shutdown_receiver.await.map_err(|_| TelemetryError::System {
            message: "Shutdown channel closed unexpectedly".to_string(),
        })?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("Telemetry system shutdown complete");
        Ok(exit_code)
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self) {
        // Handle SIGTERM - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm: ShutdownSlot = Arc::clone(&self.shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

                if let Some(()) = sigterm.recv().await {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let shutdown_sender_sigint: ShutdownSlot = Arc::clone(&self.shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
            }
        });
    }
}
