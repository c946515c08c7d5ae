//! Verify that a pod reaches a lifecycle phase, optionally printing a log message.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use poller::{InterruptPolicy, Interrupter};
use tracing::{info, warn};

use crate::error::VerifyError;
use crate::settings::Settings;
use crate::source::ResourceSource;
use crate::target::Target;
use crate::wait::{Wait, WaitConfig};

/// Expected pod phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PodPhase {
    #[default]
    Running,
    /// Any terminal phase (`Succeeded` or `Failed`).
    Stopped,
    /// An exact phase name, e.g. `Pending`.
    Other(String),
}

impl PodPhase {
    /// Whether a reported `status.phase` satisfies this expectation.
    #[must_use]
    pub fn matches(&self, phase: &str) -> bool {
        match self {
            Self::Running => phase == "Running",
            Self::Stopped => phase == "Succeeded" || phase == "Failed",
            Self::Other(expected) => phase == expected,
        }
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("Running"),
            Self::Stopped => f.write_str("Stopped"),
            Self::Other(phase) => f.write_str(phase),
        }
    }
}

impl FromStr for PodPhase {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "stopped" => Self::Stopped,
            _ => Self::Other(s.to_string()),
        })
    }
}

/// A pod as seen by one poll attempt.
#[derive(Debug, Clone)]
struct PodObservation {
    pod: Pod,
    logs: Option<String>,
}

fn phase_of(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|s| s.phase.as_deref())
}

/// Waits until a pod is in the expected phase (and has printed a message, if set).
#[derive(Debug, Clone)]
pub struct VerifyPod {
    target: Target,
    namespace: String,
    phase: PodPhase,
    log_message: Option<String>,
    print_logs: bool,
    wait: Wait,
}

impl VerifyPod {
    /// Builder for the pod with the given name.
    #[must_use]
    pub fn named(settings: &Settings, name: impl Into<String>) -> VerifyPodBuilder {
        VerifyPodBuilder::new(settings).name(name)
    }

    /// Builder for the first pod carrying the label `key=value`.
    #[must_use]
    pub fn labeled(
        settings: &Settings,
        key: impl fmt::Display,
        value: impl fmt::Display,
    ) -> VerifyPodBuilder {
        VerifyPodBuilder::new(settings).label(key, value)
    }

    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn phase(&self) -> &PodPhase {
        &self.phase
    }

    #[must_use]
    pub fn policy(&self) -> poller::PollPolicy {
        self.wait.policy
    }

    /// Human readable condition used in logs and errors.
    #[must_use]
    pub fn condition(&self) -> String {
        match &self.log_message {
            Some(message) => format!("{} and printing '{message}'", self.phase),
            None => self.phase.to_string(),
        }
    }

    /// Poll until the pod satisfies the expectation and return it.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Timeout`] when the attempt budget is spent, or the
    /// first error returned by `source`.
    pub async fn execute<S>(&self, source: &S) -> Result<Pod, VerifyError>
    where
        S: ResourceSource + ?Sized,
    {
        let condition = self.condition();
        let observed = self
            .wait
            .poller()
            .poll_async(
                || self.observe(source),
                |observation| self.is_satisfied(observation),
                || self.target.to_string(),
                &condition,
            )
            .await?;

        if self.print_logs {
            self.print(source, &observed).await;
        }

        Ok(observed.pod)
    }

    async fn observe<S>(&self, source: &S) -> Result<Option<PodObservation>, VerifyError>
    where
        S: ResourceSource + ?Sized,
    {
        let pod = match &self.target {
            Target::Name(name) => source.get_pod(&self.namespace, name).await?,
            Target::Label(label) => {
                let mut pods = source.list_pods(&self.namespace, label).await?;
                // prefer a pod that already is in the expected phase
                match pods.iter().position(|p| self.in_phase(p)) {
                    Some(index) => Some(pods.swap_remove(index)),
                    None => pods.into_iter().next(),
                }
            }
        };

        let Some(pod) = pod else {
            return Ok(None);
        };

        let logs = if self.log_message.is_some() && self.in_phase(&pod) {
            Some(source.pod_logs(&self.namespace, &pod.name_any()).await?)
        } else {
            None
        };

        Ok(Some(PodObservation { pod, logs }))
    }

    fn in_phase(&self, pod: &Pod) -> bool {
        phase_of(pod).is_some_and(|phase| self.phase.matches(phase))
    }

    fn is_satisfied(&self, observation: &PodObservation) -> bool {
        if !self.in_phase(&observation.pod) {
            return false;
        }

        match &self.log_message {
            Some(message) => observation
                .logs
                .as_deref()
                .is_some_and(|logs| logs.contains(message.as_str())),
            None => true,
        }
    }

    async fn print<S>(&self, source: &S, observed: &PodObservation)
    where
        S: ResourceSource + ?Sized,
    {
        let name = observed.pod.name_any();
        let logs = match &observed.logs {
            Some(logs) => logs.clone(),
            None => match source.pod_logs(&self.namespace, &name).await {
                Ok(logs) => logs,
                Err(e) => {
                    warn!(pod = %name, error = %e, "Failed to read pod logs");
                    return;
                }
            },
        };

        for line in logs.lines() {
            info!(pod = %name, "{line}");
        }
    }
}

/// Builder for [`VerifyPod`].
#[derive(Debug, Clone)]
pub struct VerifyPodBuilder {
    name: Option<String>,
    label: Option<String>,
    namespace: String,
    phase: PodPhase,
    log_message: Option<String>,
    print_logs: bool,
    wait: WaitConfig,
}

impl VerifyPodBuilder {
    /// Start from the process-wide defaults.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            name: None,
            label: None,
            namespace: settings.namespace.clone(),
            phase: PodPhase::default(),
            log_message: None,
            print_logs: settings.print_pod_logs,
            wait: WaitConfig::new(settings.policy),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn label(mut self, key: impl fmt::Display, value: impl fmt::Display) -> Self {
        self.label = Some(format!("{key}={value}"));
        self
    }

    /// Select by a `key=value` expression.
    #[must_use]
    pub fn label_expression(mut self, expression: impl Into<String>) -> Self {
        self.label = Some(expression.into());
        self
    }

    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn phase(mut self, phase: PodPhase) -> Self {
        self.phase = phase;
        self
    }

    #[must_use]
    pub fn is_running(self) -> Self {
        self.phase(PodPhase::Running)
    }

    #[must_use]
    pub fn is_stopped(self) -> Self {
        self.phase(PodPhase::Stopped)
    }

    /// Also require the pod logs to contain `message`.
    #[must_use]
    pub fn wait_for_log_message(mut self, message: impl Into<String>) -> Self {
        self.log_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn print_logs(mut self, print_logs: bool) -> Self {
        self.print_logs = print_logs;
        self
    }

    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.wait.max_attempts(max_attempts);
        self
    }

    #[must_use]
    pub fn delay_between_attempts(mut self, delay: Duration) -> Self {
        self.wait.delay(delay);
        self
    }

    #[must_use]
    pub fn interrupter(mut self, interrupter: Interrupter) -> Self {
        self.wait.interrupter(interrupter);
        self
    }

    #[must_use]
    pub fn on_interrupt(mut self, on_interrupt: InterruptPolicy) -> Self {
        self.wait.on_interrupt(on_interrupt);
        self
    }

    /// Validate and build the action.
    ///
    /// # Errors
    ///
    /// Returns an error when no target is set, the label is malformed or the
    /// attempt budget is zero.
    pub fn build(self) -> Result<VerifyPod, VerifyError> {
        Ok(VerifyPod {
            target: Target::resolve(self.name.as_deref(), self.label.as_deref())?,
            namespace: self.namespace,
            phase: self.phase,
            log_message: self.log_message,
            print_logs: self.print_logs,
            wait: self.wait.build()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::PodStatus;

    fn pod(phase: &str) -> Pod {
        Pod {
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_phase_matching() {
        assert!(PodPhase::Running.matches("Running"));
        assert!(!PodPhase::Running.matches("Pending"));
        assert!(PodPhase::Stopped.matches("Succeeded"));
        assert!(PodPhase::Stopped.matches("Failed"));
        assert!(!PodPhase::Stopped.matches("Running"));
        assert!(PodPhase::Other("Pending".to_string()).matches("Pending"));
    }

    #[test]
    fn test_phase_from_str() {
        assert_eq!("running".parse::<PodPhase>().unwrap(), PodPhase::Running);
        assert_eq!("Stopped".parse::<PodPhase>().unwrap(), PodPhase::Stopped);
        assert_eq!(
            "Pending".parse::<PodPhase>().unwrap(),
            PodPhase::Other("Pending".to_string())
        );
    }

    #[test]
    fn test_builder_uses_settings_defaults() {
        let settings = Settings::default();
        let action = VerifyPod::named(&settings, "web-0").build().unwrap();
        assert_eq!(action.namespace(), "default");
        assert_eq!(action.phase(), &PodPhase::Running);
        assert_eq!(action.policy(), settings.policy);
        assert_eq!(action.condition(), "Running");
    }

    #[test]
    fn test_builder_overrides() {
        let action = VerifyPod::labeled(&Settings::default(), "app", "web")
            .namespace("staging")
            .is_stopped()
            .max_attempts(3)
            .delay_between_attempts(Duration::from_millis(10))
            .wait_for_log_message("Started")
            .build()
            .unwrap();

        assert_eq!(action.target().to_string(), "app=web");
        assert_eq!(action.namespace(), "staging");
        assert_eq!(action.policy().max_attempts(), 3);
        assert_eq!(action.condition(), "Stopped and printing 'Started'");
    }

    #[test]
    fn test_build_without_target_fails() {
        let result = VerifyPodBuilder::new(&Settings::default()).build();
        assert!(matches!(result, Err(VerifyError::MissingTarget)));
    }

    #[test]
    fn test_satisfied_requires_phase_and_message() {
        let action = VerifyPod::named(&Settings::default(), "web-0")
            .wait_for_log_message("ready to serve")
            .build()
            .unwrap();

        let pending = PodObservation {
            pod: pod("Pending"),
            logs: None,
        };
        let running_quiet = PodObservation {
            pod: pod("Running"),
            logs: Some("booting".to_string()),
        };
        let running_ready = PodObservation {
            pod: pod("Running"),
            logs: Some("booting\nready to serve\n".to_string()),
        };

        assert!(!action.is_satisfied(&pending));
        assert!(!action.is_satisfied(&running_quiet));
        assert!(action.is_satisfied(&running_ready));
    }
}
