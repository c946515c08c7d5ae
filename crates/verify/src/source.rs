//! Where observed resource state comes from.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DynamicObject, ListParams, LogParams};
use kube::discovery::ApiResource;
use kube::Client;
use poller::LabelExpression;
use tracing::debug;

use crate::error::VerifyError;

/// Read access to the resources a verification observes.
///
/// `get_*` methods return `Ok(None)` when the resource does not exist (yet);
/// any other failure is an error and stops the verification.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, VerifyError>;

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelExpression,
    ) -> Result<Vec<Pod>, VerifyError>;

    async fn pod_logs(&self, namespace: &str, name: &str) -> Result<String, VerifyError>;

    async fn get_resource(
        &self,
        namespace: &str,
        resource: &ApiResource,
        name: &str,
    ) -> Result<Option<DynamicObject>, VerifyError>;

    async fn list_resources(
        &self,
        namespace: &str,
        resource: &ApiResource,
        selector: &LabelExpression,
    ) -> Result<Vec<DynamicObject>, VerifyError>;
}

/// [`ResourceSource`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeSource {
    client: Client,
}

impl KubeSource {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the default kubeconfig or in-cluster configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable configuration is found.
    pub async fn try_default() -> Result<Self, VerifyError> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn dynamic(&self, namespace: &str, resource: &ApiResource) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }
}

fn selector(label: &LabelExpression) -> ListParams {
    ListParams::default().labels(&label.to_string())
}

#[async_trait]
impl ResourceSource for KubeSource {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, VerifyError> {
        debug!(namespace = %namespace, pod = %name, "Fetching pod");
        Ok(self.pods(namespace).get_opt(name).await?)
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector_label: &LabelExpression,
    ) -> Result<Vec<Pod>, VerifyError> {
        debug!(namespace = %namespace, selector = %selector_label, "Listing pods");
        let list = self.pods(namespace).list(&selector(selector_label)).await?;
        Ok(list.items)
    }

    async fn pod_logs(&self, namespace: &str, name: &str) -> Result<String, VerifyError> {
        Ok(self
            .pods(namespace)
            .logs(name, &LogParams::default())
            .await?)
    }

    async fn get_resource(
        &self,
        namespace: &str,
        resource: &ApiResource,
        name: &str,
    ) -> Result<Option<DynamicObject>, VerifyError> {
        debug!(namespace = %namespace, kind = %resource.kind, name = %name, "Fetching resource");
        Ok(self.dynamic(namespace, resource).get_opt(name).await?)
    }

    async fn list_resources(
        &self,
        namespace: &str,
        resource: &ApiResource,
        selector_label: &LabelExpression,
    ) -> Result<Vec<DynamicObject>, VerifyError> {
        debug!(
            namespace = %namespace,
            kind = %resource.kind,
            selector = %selector_label,
            "Listing resources"
        );
        let list = self
            .dynamic(namespace, resource)
            .list(&selector(selector_label))
            .await?;
        Ok(list.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::{Settings, VerifyPod};

    const PODS: &str = "/api/v1/namespaces/test/pods";

    fn source(server: &MockServer) -> KubeSource {
        let mut config = kube::Config::new(server.uri().parse().unwrap());
        // plain http; skip loading native root certificates
        config.root_cert = Some(Vec::new());
        KubeSource::new(Client::try_from(config).unwrap())
    }

    fn status(code: u16, reason: &str, message: &str) -> ResponseTemplate {
        ResponseTemplate::new(code).set_body_json(json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": message,
            "reason": reason,
            "code": code
        }))
    }

    fn pod_json(name: &str, phase: &str) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": name, "labels": { "app": "web" } },
            "status": { "phase": phase }
        })
    }

    #[tokio::test]
    async fn test_missing_pod_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PODS}/web-0")))
            .respond_with(status(404, "NotFound", "pods \"web-0\" not found"))
            .mount(&server)
            .await;

        let pod = source(&server).get_pod("test", "web-0").await.unwrap();
        assert!(pod.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_kube_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PODS}/web-0")))
            .respond_with(status(500, "InternalError", "etcd unavailable"))
            .mount(&server)
            .await;

        let err = source(&server).get_pod("test", "web-0").await.unwrap_err();
        match err {
            VerifyError::Kube(kube::Error::Api(response)) => {
                assert_eq!(response.code, 500);
                assert_eq!(response.reason, "InternalError");
            }
            other => panic!("expected kube api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_label_selector_sent_with_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PODS))
            .and(query_param("labelSelector", "app=web"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "v1",
                "kind": "PodList",
                "metadata": {},
                "items": [pod_json("web-0", "Running")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let label = LabelExpression::parse("app=web").unwrap();
        let pods = source(&server).list_pods("test", &label).await.unwrap();

        assert_eq!(pods.len(), 1);
        assert_eq!(
            pods[0].status.as_ref().and_then(|s| s.phase.as_deref()),
            Some("Running")
        );
    }

    #[tokio::test]
    async fn test_pod_logs_read_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PODS}/web-0/log")))
            .respond_with(ResponseTemplate::new(200).set_body_string("Listening on 8080\n"))
            .mount(&server)
            .await;

        let logs = source(&server).pod_logs("test", "web-0").await.unwrap();
        assert_eq!(logs, "Listening on 8080\n");
    }

    #[tokio::test]
    async fn test_missing_custom_resource_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/apis/eventing.knative.dev/v1/namespaces/test/brokers/default",
            ))
            .respond_with(status(404, "NotFound", "brokers \"default\" not found"))
            .mount(&server)
            .await;

        let broker = ApiResource {
            group: "eventing.knative.dev".to_string(),
            version: "v1".to_string(),
            api_version: "eventing.knative.dev/v1".to_string(),
            kind: "Broker".to_string(),
            plural: "brokers".to_string(),
        };
        let found = source(&server)
            .get_resource("test", &broker, "default")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_verification_retries_until_pod_exists() {
        let server = MockServer::start().await;
        // first lookup misses, later ones find the running pod
        Mock::given(method("GET"))
            .and(path(format!("{PODS}/web-0")))
            .respond_with(status(404, "NotFound", "pods \"web-0\" not found"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{PODS}/web-0")))
            .respond_with(ResponseTemplate::new(200).set_body_json(pod_json("web-0", "Running")))
            .mount(&server)
            .await;

        let settings = Settings {
            namespace: "test".to_string(),
            print_pod_logs: false,
            ..Settings::default()
        };
        let action = VerifyPod::named(&settings, "web-0")
            .max_attempts(3)
            .delay_between_attempts(Duration::from_millis(10))
            .build()
            .unwrap();

        let pod = action.execute(&source(&server)).await.unwrap();
        assert_eq!(kube::ResourceExt::name_any(&pod), "web-0");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}
