//! Process-wide defaults for verification actions.
//!
//! Values come from environment variables:
//!
//! - `KWAIT_MAX_ATTEMPTS`: attempts per verification (default 150)
//! - `KWAIT_DELAY_BETWEEN_ATTEMPTS`: milliseconds between attempts (default 2000)
//! - `KWAIT_NAMESPACE`: namespace to look resources up in
//! - `KWAIT_PRINT_POD_LOGS`: log pod logs after a successful pod verification (default true)
//!
//! Without `KWAIT_NAMESPACE` the in-cluster service account namespace is used,
//! falling back to `default`.

use std::path::Path;

use poller::PollPolicy;
use tracing::{debug, warn};

use crate::error::SettingsError;

pub const ENV_MAX_ATTEMPTS: &str = "KWAIT_MAX_ATTEMPTS";
pub const ENV_DELAY_BETWEEN_ATTEMPTS: &str = "KWAIT_DELAY_BETWEEN_ATTEMPTS";
pub const ENV_NAMESPACE: &str = "KWAIT_NAMESPACE";
pub const ENV_PRINT_POD_LOGS: &str = "KWAIT_PRINT_POD_LOGS";

const DEFAULT_MAX_ATTEMPTS: u32 = 150;
const DEFAULT_DELAY_BETWEEN_ATTEMPTS_MS: u64 = 2000;
const DEFAULT_NAMESPACE: &str = "default";

/// Namespace file mounted into every pod with a service account.
pub const SERVICE_ACCOUNT_NAMESPACE_FILE: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Defaults resolved once and handed to action builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Attempt budget and delay used unless a builder overrides them.
    pub policy: PollPolicy,
    /// Namespace for lookups.
    pub namespace: String,
    /// Whether pod verifications log the pod logs on success.
    pub print_pod_logs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            print_pod_logs: true,
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when a numeric variable is malformed.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when a numeric variable is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_attempts = match lookup(ENV_MAX_ATTEMPTS) {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(SettingsError::Invalid {
                    key: ENV_MAX_ATTEMPTS,
                    value,
                })?,
            None => DEFAULT_MAX_ATTEMPTS,
        };

        let delay_ms = match lookup(ENV_DELAY_BETWEEN_ATTEMPTS) {
            Some(value) => value.trim().parse::<u64>().map_err(|_| SettingsError::Invalid {
                key: ENV_DELAY_BETWEEN_ATTEMPTS,
                value,
            })?,
            None => DEFAULT_DELAY_BETWEEN_ATTEMPTS_MS,
        };

        let policy = PollPolicy::from_millis(max_attempts, delay_ms).map_err(|_| {
            SettingsError::Invalid {
                key: ENV_MAX_ATTEMPTS,
                value: max_attempts.to_string(),
            }
        })?;

        let print_pod_logs = lookup(ENV_PRINT_POD_LOGS)
            .map_or(true, |v| v.eq_ignore_ascii_case("true") || v == "1");

        let namespace = resolve_namespace(
            lookup(ENV_NAMESPACE),
            Path::new(SERVICE_ACCOUNT_NAMESPACE_FILE),
        );

        Ok(Self {
            policy,
            namespace,
            print_pod_logs,
        })
    }
}

fn default_policy() -> PollPolicy {
    PollPolicy::from_millis(DEFAULT_MAX_ATTEMPTS, DEFAULT_DELAY_BETWEEN_ATTEMPTS_MS)
        .unwrap_or_else(|_| unreachable!("default max attempts is non-zero"))
}

/// Pick the namespace: explicit value, then service account file, then `default`.
#[must_use]
pub fn resolve_namespace(explicit: Option<String>, service_account_file: &Path) -> String {
    if let Some(namespace) = explicit.filter(|ns| !ns.trim().is_empty()) {
        return namespace.trim().to_string();
    }

    if service_account_file.exists() {
        match std::fs::read_to_string(service_account_file) {
            Ok(namespace) if !namespace.trim().is_empty() => {
                debug!(path = %service_account_file.display(), "Using service account namespace");
                return namespace.trim().to_string();
            }
            Ok(_) => {}
            Err(e) => {
                warn!(
                    path = %service_account_file.display(),
                    error = %e,
                    "Failed to read Kubernetes namespace from filesystem"
                );
            }
        }
    }

    DEFAULT_NAMESPACE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[(ENV_NAMESPACE, "test")])).unwrap();
        assert_eq!(settings.policy.max_attempts(), 150);
        assert_eq!(
            settings.policy.delay_between_attempts(),
            Duration::from_millis(2000)
        );
        assert_eq!(settings.namespace, "test");
        assert!(settings.print_pod_logs);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_MAX_ATTEMPTS, "10"),
            (ENV_DELAY_BETWEEN_ATTEMPTS, " 500 "),
            (ENV_NAMESPACE, "staging"),
            (ENV_PRINT_POD_LOGS, "False"),
        ]))
        .unwrap();

        assert_eq!(settings.policy.max_attempts(), 10);
        assert_eq!(
            settings.policy.delay_between_attempts(),
            Duration::from_millis(500)
        );
        assert_eq!(settings.namespace, "staging");
        assert!(!settings.print_pod_logs);
    }

    #[test]
    fn test_unrelated_variables_ignored() {
        let plain = Settings::from_lookup(lookup(&[(ENV_NAMESPACE, "test")])).unwrap();
        let noisy = Settings::from_lookup(lookup(&[
            (ENV_NAMESPACE, "test"),
            ("KWAIT_DEFAULT_LABELS", "team=qa"),
            ("KWAIT_UNKNOWN", "1"),
        ]))
        .unwrap();
        assert_eq!(plain, noisy);
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let err = Settings::from_lookup(lookup(&[(ENV_MAX_ATTEMPTS, "many")])).unwrap_err();
        assert_eq!(
            err,
            SettingsError::Invalid {
                key: ENV_MAX_ATTEMPTS,
                value: "many".to_string()
            }
        );

        assert!(Settings::from_lookup(lookup(&[(ENV_MAX_ATTEMPTS, "0")])).is_err());
        assert!(Settings::from_lookup(lookup(&[(ENV_DELAY_BETWEEN_ATTEMPTS, "-1")])).is_err());
    }

    #[test]
    fn test_namespace_from_service_account_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "team-a").unwrap();

        assert_eq!(resolve_namespace(None, file.path()), "team-a");
        assert_eq!(
            resolve_namespace(Some("explicit".to_string()), file.path()),
            "explicit"
        );
    }

    #[test]
    fn test_namespace_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("namespace");
        assert_eq!(resolve_namespace(None, &missing), "default");
        assert_eq!(resolve_namespace(Some("  ".to_string()), &missing), "default");
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var(ENV_MAX_ATTEMPTS, "7");
        std::env::set_var(ENV_NAMESPACE, "from-env");
        let settings = Settings::from_env();
        std::env::remove_var(ENV_MAX_ATTEMPTS);
        std::env::remove_var(ENV_NAMESPACE);

        let settings = settings.unwrap();
        assert_eq!(settings.policy.max_attempts(), 7);
        assert_eq!(settings.namespace, "from-env");
    }
}
