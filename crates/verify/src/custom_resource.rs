//! Verify that a custom resource reports a status condition (e.g. `Ready`).
//!
//! The resource is addressed dynamically through an [`ApiResource`] built from
//! kind, group, version and plural, so no typed client is needed. A resource
//! satisfies condition `C` when `status.conditions` holds an entry with
//! `type == C` and a `status` that reads as boolean true.

use std::fmt;
use std::time::Duration;

use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use poller::{InterruptPolicy, Interrupter};
use serde_json::Value;

use crate::error::VerifyError;
use crate::settings::Settings;
use crate::source::ResourceSource;
use crate::target::Target;
use crate::wait::{Wait, WaitConfig};

const DEFAULT_VERSION: &str = "v1";
const DEFAULT_CONDITION: &str = "Ready";

/// Whether `status.conditions` contains `condition` with a true status.
#[must_use]
pub fn has_condition(data: &Value, condition: &str) -> bool {
    data.get("status")
        .and_then(|status| status.get("conditions"))
        .and_then(Value::as_array)
        .is_some_and(|conditions| {
            conditions.iter().any(|entry| {
                entry.get("type").and_then(Value::as_str) == Some(condition)
                    && is_true(entry.get("status"))
            })
        })
}

fn is_true(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Waits until a custom resource reports the expected condition.
#[derive(Debug, Clone)]
pub struct VerifyCustomResource {
    target: Target,
    namespace: String,
    api_resource: ApiResource,
    condition: String,
    wait: Wait,
}

impl VerifyCustomResource {
    /// Builder for the resource with the given name (`name` or `kind/name`).
    #[must_use]
    pub fn named(settings: &Settings, name: &str) -> VerifyCustomResourceBuilder {
        VerifyCustomResourceBuilder::new(settings).resource_name(name)
    }

    /// Builder for the resources carrying the label `key=value`.
    #[must_use]
    pub fn labeled(
        settings: &Settings,
        key: impl fmt::Display,
        value: impl fmt::Display,
    ) -> VerifyCustomResourceBuilder {
        VerifyCustomResourceBuilder::new(settings).label(key, value)
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
    pub fn api_resource(&self) -> &ApiResource {
        &self.api_resource
    }

    #[must_use]
    pub fn condition(&self) -> &str {
        &self.condition
    }

    #[must_use]
    pub fn policy(&self) -> poller::PollPolicy {
        self.wait.policy
    }

    /// Poll until the resource reports the condition and return it.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Timeout`] when the attempt budget is spent, or the
    /// first error returned by `source`.
    pub async fn execute<S>(&self, source: &S) -> Result<DynamicObject, VerifyError>
    where
        S: ResourceSource + ?Sized,
    {
        let resource = self
            .wait
            .poller()
            .poll_async(
                || self.observe(source),
                |resource: &DynamicObject| has_condition(&resource.data, &self.condition),
                || self.target.to_string(),
                &self.condition,
            )
            .await?;
        Ok(resource)
    }

    async fn observe<S>(&self, source: &S) -> Result<Option<DynamicObject>, VerifyError>
    where
        S: ResourceSource + ?Sized,
    {
        match &self.target {
            Target::Name(name) => {
                source
                    .get_resource(&self.namespace, &self.api_resource, name)
                    .await
            }
            Target::Label(label) => {
                let mut items = source
                    .list_resources(&self.namespace, &self.api_resource, label)
                    .await?;
                let satisfied = items
                    .iter()
                    .position(|item| has_condition(&item.data, &self.condition));
                Ok(match satisfied {
                    Some(index) => Some(items.swap_remove(index)),
                    None => items.into_iter().next(),
                })
            }
        }
    }
}

/// Builder for [`VerifyCustomResource`].
#[derive(Debug, Clone)]
pub struct VerifyCustomResourceBuilder {
    name: Option<String>,
    label: Option<String>,
    resource_type: Option<String>,
    kind: Option<String>,
    group: Option<String>,
    version: String,
    condition: String,
    namespace: String,
    wait: WaitConfig,
}

impl VerifyCustomResourceBuilder {
    /// Start from the process-wide defaults.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            name: None,
            label: None,
            resource_type: None,
            kind: None,
            group: None,
            version: DEFAULT_VERSION.to_string(),
            condition: DEFAULT_CONDITION.to_string(),
            namespace: settings.namespace.clone(),
            wait: WaitConfig::new(settings.policy),
        }
    }

    /// Set the resource name. `kind/name` also sets the kind unless already set.
    #[must_use]
    pub fn resource_name(mut self, name: &str) -> Self {
        match name.split_once('/') {
            Some((kind, name)) => {
                if self.kind.is_none() {
                    self.kind = Some(capitalize(kind));
                }
                self.name = Some(name.to_string());
            }
            None => self.name = Some(name.to_string()),
        }
        self
    }

    /// Set the type as `plural.group/version`. Group and version are derived
    /// when present; an already set group is kept.
    #[must_use]
    pub fn resource_type(mut self, resource_type: &str) -> Self {
        let (plural_group, version) = match resource_type.split_once('/') {
            Some((plural_group, version)) => (plural_group, Some(version)),
            None => (resource_type, None),
        };

        if self.group.is_none() {
            if let Some((_, group)) = plural_group.split_once('.') {
                self.group = Some(group.to_string());
            }
        }
        if let Some(version) = version.filter(|v| !v.is_empty()) {
            self.version = version.to_string();
        }

        self.resource_type = Some(plural_group.to_string());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set group and version from `group/version`; a bare `v1` is the core group.
    #[must_use]
    pub fn api_version(mut self, api_version: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => {
                self.group = Some(group.to_string());
                self.version = version.to_string();
            }
            None => {
                self.group = Some(String::new());
                self.version = api_version.to_string();
            }
        }
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    #[must_use]
    pub fn is_ready(self) -> Self {
        self.condition("Ready")
    }

    #[must_use]
    pub fn is_available(self) -> Self {
        self.condition("Available")
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

    fn api_resource(&self) -> Result<ApiResource, VerifyError> {
        let kind = self
            .kind
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| VerifyError::InvalidResourceType("missing kind".to_string()))?;

        let plural = match self.resource_type.as_deref() {
            Some(resource_type) => resource_type
                .split('.')
                .next()
                .unwrap_or(resource_type)
                .to_string(),
            None => format!("{}s", kind.to_lowercase()),
        };
        if plural.is_empty() {
            return Err(VerifyError::InvalidResourceType(format!(
                "missing plural name for kind {kind}"
            )));
        }

        let group = self.group.clone().unwrap_or_default();
        let api_version = if group.is_empty() {
            self.version.clone()
        } else {
            format!("{group}/{}", self.version)
        };

        Ok(ApiResource {
            group,
            version: self.version.clone(),
            api_version,
            kind,
            plural,
        })
    }

    /// Validate and build the action.
    ///
    /// # Errors
    ///
    /// Returns an error when no target or kind is set, the label is malformed
    /// or the attempt budget is zero.
    pub fn build(self) -> Result<VerifyCustomResource, VerifyError> {
        let api_resource = self.api_resource()?;
        Ok(VerifyCustomResource {
            target: Target::resolve(self.name.as_deref(), self.label.as_deref())?,
            namespace: self.namespace,
            api_resource,
            condition: self.condition,
            wait: self.wait.build()?,
        })
    }
}
