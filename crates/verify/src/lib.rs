//! Kubernetes resource verification.
//!
//! Actions in this crate wait until a pod or custom resource reaches an
//! expected state, polling through [`poller::ConditionPoller`]:
//!
//! - [`VerifyPod`]: pod in a phase (`Running`, stopped, ...), optionally with
//!   a message in its logs
//! - [`VerifyCustomResource`]: custom resource reporting a status condition
//!
//! # Usage
//!
//! ```no_run
//! use verify::{KubeSource, Settings, VerifyCustomResource, VerifyPod};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let source = KubeSource::try_default().await?;
//!
//!     VerifyPod::labeled(&settings, "app", "web")
//!         .wait_for_log_message("Listening on 8080")
//!         .build()?
//!         .execute(&source)
//!         .await?;
//!
//!     VerifyCustomResource::named(&settings, "broker/default")
//!         .resource_type("brokers.eventing.knative.dev/v1")
//!         .is_ready()
//!         .build()?
//!         .execute(&source)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! Resources are read through the [`ResourceSource`] trait; [`KubeSource`]
//! implements it against a live cluster.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod custom_resource;
pub mod error;
pub mod pod;
pub mod settings;
pub mod source;
pub mod target;
mod wait;

pub use custom_resource::{has_condition, VerifyCustomResource, VerifyCustomResourceBuilder};
pub use error::{SettingsError, VerifyError};
pub use pod::{PodPhase, VerifyPod, VerifyPodBuilder};
pub use settings::Settings;
pub use source::{KubeSource, ResourceSource};
pub use target::Target;
