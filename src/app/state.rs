use super::{ComponentState, TelemetryOrchestrator};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

pub(super) async fn record_component_state(
    states: &Mutex<HashMap<String, ComponentState>>,
    component: &str,
    state: ComponentState,
) {
    let mut states = states.lock().await;
    states.insert(component.to_string(), state.clone());
    debug!("Component '{}' state changed to: {:?}", component, state);
}

impl TelemetryOrchestrator {
    /// Update component state
    pub async fn set_component_state(&self, component: &str, state: ComponentState) {
        record_component_state(&self.component_states, component, state).await;
    }

    /// Get component state
    pub async fn get_component_state(&self, component: &str) -> Option<ComponentState> {
        let states = self.component_states.lock().await;
        states.get(component).cloned()
    }

    /// Get all component states
    pub async fn get_all_component_states(&self) -> HashMap<String, ComponentState> {
        let states = self.component_states.lock().await;
        states.clone()
    }
}
