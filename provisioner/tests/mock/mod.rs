/*!

This test module provides [`FakePlatform`], an in-memory [`PlatformClient`] that imitates just
enough of OLM and of a workload operator to drive the provisioner without Kubernetes.

- Creating a `Subscription` creates an `InstallPlan`. With automatic approval the CSV is
  installed right away, otherwise once the plan is patched to `approved: true`. The
  subscription's `currentCSV` is set when the plan is created, `installedCSV` once the CSV is
  installed.
- Installing a CSV renders its operator `Deployment`s, with the subscription's `config.env`
  applied to them as OLM does. Replacing the CSV renders them again, and deleting it removes
  them.
- Creating or replacing any other object that has `spec.replicas` reconciles that many `Running`
  pods labeled `app.kubernetes.io/instance=<name>` and sets a `Ready` condition.
- Deleting such an object, or scaling it down, leaves its pods terminating for a configurable
  number of pod queries.

Every mutating call is recorded as `"<verb> <Kind> <name>"`.

!*/

use chrono::{Duration, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::core::DynamicObject;
use kube::discovery::ApiResource;
use olmsys_model::clients::{from_dynamic, to_dynamic, Error, PlatformClient, Result};
use olmsys_model::constants::APP_INSTANCE;
use olmsys_model::olm::{
    set_deployments_env, CatalogSource, CatalogSourceSpec, ClusterServiceVersion,
    ClusterServiceVersionSpec, ClusterServiceVersionStatus, EnvVar, InstallPlan, InstallPlanSpec,
    Subscription, CSV_DEPLOYMENTS_POINTER,
};
use olmsys_model::{ClusterEvent, EventSeverity, InstallPlanApproval};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// (kind, namespace, name)
type Key = (String, String, String);

pub const CSV_VERSION: &str = "v1.0.0";
/// The version offered by the pending upgrade of [`FakePlatform::with_pending_upgrade`].
pub const UPGRADE_VERSION: &str = "v1.1.0";

struct FakePod {
    pod: Pod,
    /// Pod queries left until a terminating pod disappears.
    terminating_for: Option<usize>,
}

/// An install that is waiting for its plan to be approved.
struct PendingInstall {
    subscription: String,
    plan_name: String,
    csv_name: String,
    package: String,
    env: Vec<EnvVar>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<Key, DynamicObject>,
    pods: BTreeMap<(String, String), FakePod>,
    events: Vec<ClusterEvent>,
    calls: Vec<String>,
    pending: BTreeMap<(String, String), PendingInstall>,
    /// The env OLM injects into the operator deployments of each CSV.
    operator_env: BTreeMap<(String, String), Vec<EnvVar>>,
    version: u64,
}

pub struct FakePlatform {
    state: Mutex<State>,
    propagate_env: bool,
    pending_upgrade: bool,
    csv_phase: String,
    pod_termination_polls: usize,
    failing_kinds: BTreeSet<String>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            propagate_env: true,
            pending_upgrade: false,
            csv_phase: "Succeeded".to_string(),
            pod_termination_polls: 0,
            failing_kinds: BTreeSet::new(),
        }
    }

    /// A platform with the default community catalog source in place.
    pub fn with_community_catalog() -> Self {
        Self::new().with_catalog_source("openshift-marketplace", "community-operators")
    }

    pub fn with_catalog_source(self, namespace: &str, name: &str) -> Self {
        let mut catalog = CatalogSource::new(
            name,
            CatalogSourceSpec {
                source_type: Some("grpc".to_string()),
                image: Some("quay.io/example/catalog:latest".to_string()),
                display_name: None,
            },
        );
        catalog.metadata.namespace = Some(namespace.to_string());
        self.with_object(to_dynamic(&catalog).unwrap())
    }

    /// Store an object as if someone else had created it.
    pub fn with_object(self, object: DynamicObject) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let key = key_of(&object);
            state.store(key, object);
        }
        self
    }

    /// OLM ignores the subscription's `config.env`, so the provisioner has to set it on the CSV.
    pub fn without_env_propagation(mut self) -> Self {
        self.propagate_env = false;
        self
    }

    /// Once the first CSV is installed, OLM finds a newer one in the channel and waits for its
    /// install plan to be approved. `currentCSV` moves to the upgrade, `installedCSV` does not.
    pub fn with_pending_upgrade(mut self) -> Self {
        self.pending_upgrade = true;
        self
    }

    /// Installed CSVs stay in `phase`. A `Failed` CSV also gets an `InstallCheckFailed` warning.
    pub fn with_csv_phase(mut self, phase: &str) -> Self {
        self.csv_phase = phase.to_string();
        self
    }

    pub fn with_pod_termination_polls(mut self, polls: usize) -> Self {
        self.pod_termination_polls = polls;
        self
    }

    /// Objects of `kind` never get pods, an `ErrImagePull` event is recorded instead.
    pub fn with_failing_image_pulls(mut self, kind: &str) -> Self {
        self.failing_kinds.insert(kind.to_string());
        self
    }

    pub fn inject_event(&self, event: ClusterEvent) {
        self.state.lock().unwrap().events.push(event);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// The recorded calls that start with `verb`.
    pub fn calls_of(&self, verb: &str) -> Vec<String> {
        let prefix = format!("{} ", verb);
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(&prefix))
            .collect()
    }

    pub fn object(&self, kind: &str, namespace: &str, name: &str) -> Option<DynamicObject> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(kind.to_string(), namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .objects
            .keys()
            .filter(|(k, _, _)| k == kind)
            .count()
    }

    /// All pods that still exist, terminating or not.
    pub fn pod_count(&self) -> usize {
        self.state.lock().unwrap().pods.len()
    }

    pub fn csv(&self, namespace: &str, name: &str) -> Option<ClusterServiceVersion> {
        self.object("ClusterServiceVersion", namespace, name)
            .map(|object| from_dynamic(object).unwrap())
    }

    pub fn install_plan(&self, namespace: &str, name: &str) -> Option<InstallPlan> {
        self.object("InstallPlan", namespace, name)
            .map(|object| from_dynamic(object).unwrap())
    }

    pub fn subscription(&self, namespace: &str, name: &str) -> Option<Subscription> {
        self.object("Subscription", namespace, name)
            .map(|object| from_dynamic(object).unwrap())
    }

    /// The operator `Deployment` OLM rendered for `package`.
    pub fn operator_deployment(&self, namespace: &str, package: &str) -> Option<DynamicObject> {
        self.object("Deployment", namespace, &format!("{}-operator", package))
    }
}

impl State {
    fn store(&mut self, key: Key, mut object: DynamicObject) {
        self.version += 1;
        object.metadata.resource_version = Some(self.version.to_string());
        self.objects.insert(key, object);
    }

    fn install_csv(&mut self, namespace: &str, pending: &PendingInstall, phase: &str) {
        let mut csv = ClusterServiceVersion::new(
            &pending.csv_name,
            ClusterServiceVersionSpec {
                display_name: Some(pending.package.clone()),
                version: pending
                    .csv_name
                    .rsplit(".v")
                    .next()
                    .map(str::to_string),
                install: Some(json!({
                    "strategy": "deployment",
                    "spec": {
                        "deployments": [{
                            "name": format!("{}-operator", pending.package),
                            "spec": {
                                "replicas": 1,
                                "template": {
                                    "spec": {
                                        "serviceAccountName": format!("{}-operator", pending.package),
                                        "containers": [{
                                            "name": "operator",
                                            "image": "quay.io/example/operator:latest",
                                        }]
                                    }
                                }
                            }
                        }]
                    }
                })),
            },
        );
        csv.metadata.namespace = Some(namespace.to_string());
        csv.status = Some(ClusterServiceVersionStatus {
            phase: Some(phase.to_string()),
            reason: Some(
                if phase == "Failed" {
                    "InstallCheckFailed"
                } else {
                    "InstallSucceeded"
                }
                .to_string(),
            ),
            message: None,
        });
        let mut object = to_dynamic(&csv).unwrap();
        // Fields OLM relies on that the provisioner's model does not carry.
        object.data["spec"]["installModes"] = json!([
            { "type": "OwnNamespace", "supported": true },
            { "type": "AllNamespaces", "supported": false },
        ]);
        object.data["spec"]["customresourcedefinitions"] = json!({
            "owned": [{ "name": "brokers.example.com", "version": "v1", "kind": "Broker" }]
        });
        object.data["spec"]["relatedImages"] =
            json!([{ "name": "broker", "image": "quay.io/example/broker:latest" }]);
        self.store(key_of(&object), object);
        self.operator_env.insert(
            (namespace.to_string(), pending.csv_name.clone()),
            pending.env.clone(),
        );
        self.render_operator(namespace, &pending.csv_name);

        if phase == "Failed" {
            self.events.push(ClusterEvent {
                id: format!("{}-install-check", pending.csv_name),
                namespace: namespace.to_string(),
                timestamp: Utc::now(),
                severity: EventSeverity::Warning,
                reason: "InstallCheckFailed".to_string(),
                message: "install timeout".to_string(),
                involved_kind: "ClusterServiceVersion".to_string(),
                involved_name: pending.csv_name.clone(),
            });
        }
    }

    /// Write the operator `Deployment`s of a CSV from its install strategy plus the env OLM
    /// injects from the subscription.
    fn render_operator(&mut self, namespace: &str, csv_name: &str) {
        let key = ("ClusterServiceVersion".to_string(), namespace.to_string(), csv_name.to_string());
        let deployments = match self
            .objects
            .get(&key)
            .and_then(|csv| csv.data.pointer(CSV_DEPLOYMENTS_POINTER))
            .and_then(Value::as_array)
        {
            Some(deployments) => deployments.clone(),
            None => return,
        };
        let env = self
            .operator_env
            .get(&(namespace.to_string(), csv_name.to_string()))
            .cloned()
            .unwrap_or_default();
        for entry in deployments {
            let name = entry["name"].as_str().unwrap_or_default().to_string();
            let mut data = json!({ "spec": entry["spec"].clone() });
            for var in &env {
                set_deployments_env(std::iter::once(&mut data), &var.name, &var.value);
            }
            let mut deployment = DynamicObject::new(&name, &ApiResource::erase::<Deployment>(&()))
                .within(namespace)
                .data(data);
            deployment.metadata.labels = Some(
                vec![("olm.owner".to_string(), csv_name.to_string())]
                    .into_iter()
                    .collect(),
            );
            self.store(key_of(&deployment), deployment);
        }
    }

    /// OLM garbage collects the deployments of a deleted CSV.
    fn remove_operator(&mut self, namespace: &str, csv_name: &str) {
        self.objects.retain(|(kind, ns, _), object| {
            !(kind == "Deployment"
                && ns == namespace
                && object
                    .metadata
                    .labels
                    .as_ref()
                    .and_then(|labels| labels.get("olm.owner"))
                    .map(String::as_str)
                    == Some(csv_name))
        });
        self.operator_env
            .remove(&(namespace.to_string(), csv_name.to_string()));
    }

    fn pods_of(&self, namespace: &str, instance: &str) -> Vec<String> {
        self.pods
            .iter()
            .filter(|((ns, _), pod)| {
                ns == namespace
                    && pod.terminating_for.is_none()
                    && pod
                        .pod
                        .metadata
                        .labels
                        .as_ref()
                        .and_then(|labels| labels.get(APP_INSTANCE))
                        .map(String::as_str)
                        == Some(instance)
            })
            .map(|((_, name), _)| name.clone())
            .collect()
    }

    fn terminate(&mut self, namespace: &str, pod_name: &str, polls: usize) {
        let key = (namespace.to_string(), pod_name.to_string());
        if polls == 0 {
            self.pods.remove(&key);
        } else if let Some(pod) = self.pods.get_mut(&key) {
            pod.terminating_for = Some(polls);
            pod.pod.metadata.deletion_timestamp = Some(Time(Utc::now()));
        }
    }
}

impl FakePlatform {
    fn after_subscription_created(&self, state: &mut State, key: &Key) {
        let (_, namespace, name) = key.clone();
        let subscription: Subscription = match state.objects.get(key) {
            Some(object) => from_dynamic(object.clone()).unwrap(),
            None => return,
        };
        let package = subscription.spec.name.clone();
        let approved = subscription.spec.install_plan_approval != Some(InstallPlanApproval::Manual);
        let env = if self.propagate_env {
            subscription
                .spec
                .config
                .map(|config| config.env)
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        let pending = PendingInstall {
            subscription: name.clone(),
            plan_name: format!("install-{}", name),
            csv_name: format!("{}.{}", package, CSV_VERSION),
            package,
            env,
        };
        self.offer(state, &namespace, pending, approved);
    }

    /// Create the install plan for `pending` and point the subscription's `currentCSV` at it.
    fn offer(&self, state: &mut State, namespace: &str, pending: PendingInstall, approved: bool) {
        let mut plan = InstallPlan::new(
            &pending.plan_name,
            InstallPlanSpec {
                approval: if approved {
                    InstallPlanApproval::Automatic
                } else {
                    InstallPlanApproval::Manual
                },
                approved,
                cluster_service_version_names: vec![pending.csv_name.clone()],
            },
        );
        plan.metadata.namespace = Some(namespace.to_string());
        let plan = to_dynamic(&plan).unwrap();
        state.store(key_of(&plan), plan);

        let key = (
            "Subscription".to_string(),
            namespace.to_string(),
            pending.subscription.clone(),
        );
        if let Some(object) = state.objects.get_mut(&key) {
            let status = &mut object.data["status"];
            if !status.is_object() {
                *status = json!({});
            }
            status["currentCSV"] = json!(pending.csv_name);
            status["installPlanRef"] = json!({ "name": pending.plan_name, "namespace": namespace });
            status["state"] = json!(if approved { "AtLatestKnown" } else { "UpgradePending" });
        }

        if approved {
            self.install(state, namespace, pending);
        } else {
            state
                .pending
                .insert((namespace.to_string(), pending.plan_name.clone()), pending);
        }
    }

    fn install(&self, state: &mut State, namespace: &str, pending: PendingInstall) {
        state.install_csv(namespace, &pending, &self.csv_phase);
        let key = (
            "Subscription".to_string(),
            namespace.to_string(),
            pending.subscription.clone(),
        );
        if let Some(object) = state.objects.get_mut(&key) {
            object.data["status"]["installedCSV"] = json!(pending.csv_name);
            object.data["status"]["state"] = json!("AtLatestKnown");
        }

        if self.pending_upgrade && pending.csv_name.ends_with(CSV_VERSION) {
            let upgrade = PendingInstall {
                subscription: pending.subscription.clone(),
                plan_name: format!("{}-2", pending.plan_name),
                csv_name: format!("{}.{}", pending.package, UPGRADE_VERSION),
                package: pending.package,
                env: pending.env,
            };
            self.offer(state, namespace, upgrade, false);
        }
    }

    fn after_install_plan_patched(&self, state: &mut State, key: &Key) {
        let (_, namespace, name) = key.clone();
        let approved = state
            .objects
            .get(key)
            .and_then(|object| object.data.pointer("/spec/approved"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !approved {
            return;
        }
        if let Some(pending) = state.pending.remove(&(namespace.clone(), name)) {
            self.install(state, &namespace, pending);
        }
    }

    /// Make the pods of a workload match its `spec.replicas`.
    fn reconcile_workload(&self, state: &mut State, key: &Key) {
        let (kind, namespace, name) = key.clone();
        let replicas = match state
            .objects
            .get(key)
            .and_then(|object| object.data.pointer("/spec/replicas"))
            .and_then(Value::as_u64)
        {
            Some(replicas) => replicas as usize,
            None => return,
        };

        if self.failing_kinds.contains(&kind) {
            state.events.push(ClusterEvent {
                id: format!("{}-pull-{}", name, state.version),
                namespace: namespace.clone(),
                timestamp: Utc::now(),
                severity: EventSeverity::Warning,
                reason: "ErrImagePull".to_string(),
                message: "manifest unknown".to_string(),
                involved_kind: "Pod".to_string(),
                involved_name: format!("{}-0", name),
            });
            return;
        }

        let existing = state.pods_of(&namespace, &name);
        for index in 0..replicas {
            let pod_name = format!("{}-{}", name, index);
            if existing.contains(&pod_name) {
                continue;
            }
            let pod = Pod {
                metadata: ObjectMeta {
                    name: Some(pod_name.clone()),
                    namespace: Some(namespace.clone()),
                    labels: Some(
                        vec![(APP_INSTANCE.to_string(), name.clone())]
                            .into_iter()
                            .collect(),
                    ),
                    ..ObjectMeta::default()
                },
                status: Some(PodStatus {
                    phase: Some("Running".to_string()),
                    ..PodStatus::default()
                }),
                ..Pod::default()
            };
            state.pods.insert(
                (namespace.clone(), pod_name),
                FakePod {
                    pod,
                    terminating_for: None,
                },
            );
        }
        for pod_name in existing {
            let index = pod_name
                .rsplit('-')
                .next()
                .and_then(|index| index.parse::<usize>().ok())
                .unwrap_or(0);
            if index >= replicas {
                state.terminate(&namespace, &pod_name, self.pod_termination_polls);
            }
        }

        if let Some(object) = state.objects.get_mut(key) {
            object.data["status"] = json!({
                "conditions": [{ "type": "Ready", "status": "True" }],
                "replicas": replicas,
            });
        }
    }
}

fn key_of(object: &DynamicObject) -> Key {
    (
        object
            .types
            .as_ref()
            .map(|types| types.kind.clone())
            .unwrap_or_default(),
        object.metadata.namespace.clone().unwrap_or_default(),
        object.metadata.name.clone().unwrap_or_default(),
    )
}

fn key(resource: &ApiResource, namespace: &str, name: &str) -> Key {
    (
        resource.kind.clone(),
        namespace.to_string(),
        name.to_string(),
    )
}

fn matches_selector(pod: &Pod, selector: &str) -> bool {
    let labels = pod.metadata.labels.clone().unwrap_or_default();
    selector
        .split(',')
        .filter(|term| !term.trim().is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => labels.get(key.trim()).map(String::as_str) == Some(value.trim()),
            None => labels.contains_key(term.trim()),
        })
}

/// RFC 7386 JSON merge patch.
fn merge(target: &mut Value, patch: &Value) {
    let patch = match patch.as_object() {
        Some(patch) => patch,
        None => {
            *target = patch.clone();
            return;
        }
    };
    if !target.is_object() {
        *target = json!({});
    }
    if let Some(target) = target.as_object_mut() {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

#[async_trait::async_trait]
impl PlatformClient for FakePlatform {
    async fn create(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let mut state = self.state.lock().unwrap();
        let name = object.metadata.name.clone().unwrap_or_default();
        let key = key(resource, namespace, &name);
        if state.objects.contains_key(&key) {
            return Err(Error::conflict("create", resource.kind.clone()));
        }
        state.calls.push(format!("create {} {}", resource.kind, name));
        let mut object = object.clone();
        object.metadata.namespace = Some(namespace.to_string());
        state.store(key.clone(), object);

        match resource.kind.as_str() {
            "Subscription" => self.after_subscription_created(&mut state, &key),
            "InstallPlan" | "ClusterServiceVersion" | "CatalogSource" => {}
            _ => self.reconcile_workload(&mut state, &key),
        }
        Ok(state.objects[&key].clone())
    }

    async fn replace(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let mut state = self.state.lock().unwrap();
        let name = object.metadata.name.clone().unwrap_or_default();
        let key = key(resource, namespace, &name);
        let stored_version = match state.objects.get(&key) {
            Some(stored) => stored.metadata.resource_version.clone(),
            None => return Err(Error::not_found("replace", resource.kind.clone())),
        };
        if object.metadata.resource_version.is_some()
            && object.metadata.resource_version != stored_version
        {
            return Err(Error::conflict("replace", resource.kind.clone()));
        }
        state.calls.push(format!("replace {} {}", resource.kind, name));
        state.store(key.clone(), object.clone());
        if resource.kind == "ClusterServiceVersion" {
            state.render_operator(namespace, &name);
        } else if !resource.group.ends_with("coreos.com") {
            self.reconcile_workload(&mut state, &key);
        }
        Ok(state.objects[&key].clone())
    }

    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .objects
            .get(&key(resource, namespace, name))
            .cloned())
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: &str,
        _label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .objects
            .iter()
            .filter(|((kind, ns, _), _)| kind == &resource.kind && ns == namespace)
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn delete(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete {} {}", resource.kind, name));
        let removed = state.objects.remove(&key(resource, namespace, name)).is_some();
        if resource.kind == "ClusterServiceVersion" {
            state.remove_operator(namespace, name);
        }
        for pod_name in state.pods_of(namespace, name) {
            state.terminate(namespace, &pod_name, self.pod_termination_polls);
        }
        Ok(removed)
    }

    async fn patch_merge(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<DynamicObject> {
        let mut state = self.state.lock().unwrap();
        let key = key(resource, namespace, name);
        let stored = match state.objects.get(&key) {
            Some(stored) => stored.clone(),
            None => return Err(Error::not_found("patch", resource.kind.clone())),
        };
        state.calls.push(format!("patch {} {}", resource.kind, name));
        let mut value = serde_json::to_value(&stored).unwrap();
        merge(&mut value, patch);
        state.store(key.clone(), serde_json::from_value(value).unwrap());
        if resource.kind == "InstallPlan" {
            self.after_install_plan_patched(&mut state, &key);
        }
        Ok(state.objects[&key].clone())
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        let mut state = self.state.lock().unwrap();
        let mut gone = Vec::new();
        for (key, pod) in state.pods.iter_mut() {
            if let Some(left) = pod.terminating_for.as_mut() {
                *left = left.saturating_sub(1);
                if *left == 0 {
                    gone.push(key.clone());
                }
            }
        }
        for key in gone {
            state.pods.remove(&key);
        }
        Ok(state
            .pods
            .iter()
            .filter(|((ns, _), pod)| ns == namespace && matches_selector(&pod.pod, label_selector))
            .map(|(_, pod)| pod.pod.clone())
            .collect())
    }

    async fn list_events(&self, namespace: &str) -> Result<Vec<ClusterEvent>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|event| event.namespace == namespace)
            .cloned()
            .collect())
    }
}

/// A `Warning` event that happened `minutes_ago`.
pub fn old_warning(namespace: &str, reason: &str, involved_name: &str, minutes_ago: i64) -> ClusterEvent {
    ClusterEvent {
        id: format!("{}-{}", involved_name, reason),
        namespace: namespace.to_string(),
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
        severity: EventSeverity::Warning,
        reason: reason.to_string(),
        message: "happened before the test".to_string(),
        involved_kind: "Pod".to_string(),
        involved_name: involved_name.to_string(),
    }
}
