//! Role switcher that wires the parent and child views to one shared log.

use std::sync::{Arc, PoisonError, RwLock};

use eldercare_core::config::{ElderCareConfig, GeneralConfig};
use eldercare_core::safety::EmergencyGate;
use eldercare_core::types::{AppState, Message, UserRole};

use crate::dashboard::ChildDashboard;
use crate::device::{Geolocator, Microphone};
use crate::generator::{LlmBackend, ResponseGenerator};
use crate::log_store::{log_store, LogReader};
use crate::parent::ParentController;

/// Top-level application shell.
///
/// The parent controller holds the only log writer; the dashboard and the
/// shell hold readers. Switching roles changes which view is active but keeps
/// both views' state.
pub struct Shell {
    role: RwLock<UserRole>,
    parent_name: String,
    child_name: String,
    parent: Arc<ParentController>,
    dashboard: Arc<ChildDashboard>,
    log: LogReader,
}

impl Shell {
    pub fn new(parent: ParentController, dashboard: ChildDashboard, log: LogReader) -> Self {
        let general = GeneralConfig::default();
        Self {
            role: RwLock::new(UserRole::default()),
            parent_name: general.parent_name,
            child_name: general.child_name,
            parent: Arc::new(parent),
            dashboard: Arc::new(dashboard),
            log,
        }
    }

    /// Build the whole application around one model backend.
    pub fn from_config(
        config: &ElderCareConfig,
        backend: Arc<dyn LlmBackend>,
        microphone: Arc<dyn Microphone>,
        geolocator: Arc<dyn Geolocator>,
    ) -> Self {
        let generator =
            ResponseGenerator::new(backend).with_temperature(config.model.temperature);
        let (writer, reader) = log_store();

        let parent = ParentController::new(generator.clone(), writer)
            .with_config(config.parent.clone())
            .with_gate(EmergencyGate::new(config.safety.clone()))
            .with_microphone(microphone)
            .with_geolocator(geolocator);
        let dashboard = ChildDashboard::new(generator, reader.clone())
            .with_config(config.dashboard.clone());

        tracing::info!(
            model = %config.model.model,
            emergency_gate = config.safety.emergency_gate,
            "Shell initialized"
        );

        let mut shell = Self::new(parent, dashboard, reader);
        shell.parent_name = config.general.parent_name.clone();
        shell.child_name = config.general.child_name.clone();
        shell
    }

    pub fn role(&self) -> UserRole {
        *self.role.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `role` the active view. Returns the previous role.
    pub fn switch_role(&self, role: UserRole) -> UserRole {
        let mut current = self.role.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *current, role);
        if previous != role {
            tracing::info!(from = %previous, to = %role, "Role switched");
        }
        previous
    }

    pub fn parent(&self) -> &Arc<ParentController> {
        &self.parent
    }

    pub fn dashboard(&self) -> &Arc<ChildDashboard> {
        &self.dashboard
    }

    /// Everything the parent has sent, in order.
    pub fn activity_log(&self) -> Vec<Message> {
        self.log.snapshot()
    }

    pub fn log(&self) -> &LogReader {
        &self.log
    }

    /// Snapshot of the whole application state.
    pub fn app_state(&self) -> AppState {
        AppState {
            current_role: self.role(),
            parent_name: self.parent_name.clone(),
            child_name: self.child_name.clone(),
            messages: self.parent.messages(),
            logs: self.dashboard.check_ins(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBackend, MockGeolocator, MockMicrophone};
    use crate::parent::{Outgoing, SendOutcome};

    fn shell(backend: Arc<MockBackend>) -> Shell {
        Shell::from_config(
            &ElderCareConfig::default(),
            backend,
            Arc::new(MockMicrophone::denied()),
            Arc::new(MockGeolocator::at(12.97, 77.59)),
        )
    }

    #[test]
    fn test_default_role_is_parent() {
        let shell = shell(Arc::new(MockBackend::echo()));
        assert_eq!(shell.role(), UserRole::Parent);
        assert!(shell.activity_log().is_empty());
    }

    #[test]
    fn test_switch_role_returns_previous() {
        let shell = shell(Arc::new(MockBackend::echo()));
        assert_eq!(shell.switch_role(UserRole::Child), UserRole::Parent);
        assert_eq!(shell.role(), UserRole::Child);
        assert_eq!(shell.switch_role(UserRole::Child), UserRole::Child);
        assert_eq!(shell.switch_role(UserRole::Parent), UserRole::Child);
    }

    #[tokio::test]
    async fn test_parent_messages_reach_dashboard() {
        let shell = shell(Arc::new(MockBackend::reply("Good")));
        let outcome = shell.parent().send(Outgoing::text("took my medicine")).await;
        assert!(matches!(outcome, SendOutcome::Completed { .. }));

        shell.switch_role(UserRole::Child);
        assert_eq!(shell.activity_log().len(), 1);
        assert_eq!(shell.dashboard().summary().entries, 1);
        assert_eq!(shell.dashboard().medicine_compliance().taken, 1);
    }

    #[tokio::test]
    async fn test_switching_keeps_parent_conversation() {
        let shell = shell(Arc::new(MockBackend::reply("Good")));
        shell.parent().send(Outgoing::text("hello")).await;
        shell.switch_role(UserRole::Child);
        shell.switch_role(UserRole::Parent);
        assert_eq!(shell.parent().messages().len(), 3);
    }

    #[tokio::test]
    async fn test_app_state_snapshot() {
        let shell = shell(Arc::new(MockBackend::reply("ok")));
        shell.parent().send(Outgoing::text("had lunch")).await;
        shell.switch_role(UserRole::Child);

        let state = shell.app_state();
        assert_eq!(state.current_role, UserRole::Child);
        assert_eq!(state.parent_name, "Uncle");
        assert_eq!(state.child_name, "Beta");
        assert_eq!(state.messages.len(), 3);
        assert_eq!(state.logs.len(), 1);
        assert_eq!(state.logs[0].meal.as_deref(), Some("lunch"));
    }

    #[test]
    fn test_config_names_used() {
        let mut config = ElderCareConfig::default();
        config.general.parent_name = "Amma".to_string();
        config.general.child_name = "Priya".to_string();
        let shell = Shell::from_config(
            &config,
            Arc::new(MockBackend::echo()),
            Arc::new(MockMicrophone::denied()),
            Arc::new(MockGeolocator::denied()),
        );
        let state = shell.app_state();
        assert_eq!(state.parent_name, "Amma");
        assert_eq!(state.child_name, "Priya");
    }
}
