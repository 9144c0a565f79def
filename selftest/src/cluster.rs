use crate::test_settings::TestSettings;
use anyhow::{format_err, Result};
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::{
    api::{DeleteParams, ListParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    core::ObjectMeta,
    Api, Client, Config,
};
use olmsys_model::clients::KubePlatform;
use olmsys_model::constants::{APP_MANAGED_BY, FIELD_MANAGER, POD_PHASE_RUNNING};
use std::convert::TryInto;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub const KUBECONFIG_FILENAME: &str = "kubeconfig.yaml";

/// Represents a `kind` cluster. The `Drop` trait is implemented deleting the `kind` cluster when it
/// goes out of scope, unless `OLMSYS_SELFTEST_KEEP_CLUSTER` is set.
#[derive(Debug)]
pub struct Cluster {
    name: String,
    kubeconfig_dir: TempDir,
}

impl Cluster {
    /// Creates a `Cluster` while initializing a kind cluster. If a cluster named `cluster_name`
    /// already exists, it will be deleted.
    pub fn new(cluster_name: &str) -> Result<Cluster> {
        let kubeconfig_dir = TempDir::new()?;
        Self::delete_kind_cluster(cluster_name)?;
        Self::create_kind_cluster(
            cluster_name,
            &kubeconfig_dir.path().join(KUBECONFIG_FILENAME),
        )?;
        Ok(Self {
            name: cluster_name.into(),
            kubeconfig_dir,
        })
    }

    /// Returns the path to the kubeconfig file in the `TempDir` created for the cluster.
    pub fn kubeconfig(&self) -> PathBuf {
        self.kubeconfig_dir.path().join(KUBECONFIG_FILENAME)
    }

    /// Create the k8s client for the cluster.
    pub async fn k8s_client(&self) -> Result<Client> {
        let kubeconfig = Kubeconfig::read_from(self.kubeconfig())?;
        let config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        Ok(config.try_into()?)
    }

    /// Create a `KubePlatform` that talks to this cluster.
    pub async fn platform(&self) -> Result<KubePlatform> {
        Ok(KubePlatform::new_from_k8s_client(self.k8s_client().await?))
    }

    /// Creates a namespace for a test to work in. Namespaces created here are labelled so they
    /// can be told apart from the ones `kind` creates.
    pub async fn create_namespace(&self, name: &str) -> Result<()> {
        let api = Api::<Namespace>::all(self.k8s_client().await?);
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(
                    [(APP_MANAGED_BY.to_string(), FIELD_MANAGER.to_string())]
                        .into_iter()
                        .collect(),
                ),
                ..Default::default()
            },
            ..Default::default()
        };
        api.create(&PostParams::default(), &namespace).await?;
        Ok(())
    }

    /// Deletes a namespace created with `create_namespace`. Deletion is not awaited.
    pub async fn delete_namespace(&self, name: &str) -> Result<()> {
        let api = Api::<Namespace>::all(self.k8s_client().await?);
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    /// Returns the number of pods matching `selector` in `namespace` that are in the running
    /// phase.
    pub async fn running_pods(&self, namespace: &str, selector: &str) -> Result<usize> {
        let client = self.k8s_client().await?;
        let pod_api = Api::<Pod>::namespaced(client, namespace);
        let pods = pod_api
            .list(&ListParams {
                label_selector: Some(selector.to_string()),
                ..Default::default()
            })
            .await?;
        Ok(pods
            .into_iter()
            .filter(|pod| {
                pod.status
                    .as_ref()
                    .and_then(|status| status.phase.as_deref())
                    == Some(POD_PHASE_RUNNING)
            })
            .count())
    }

    fn create_kind_cluster(name: &str, kubeconfig: &Path) -> Result<()> {
        let output = Command::new(TestSettings::kind_path())
            .arg("--kubeconfig")
            .arg(kubeconfig.to_str().ok_or_else(|| {
                format_err!("non utf-8 path '{}'", kubeconfig.to_string_lossy())
            })?)
            .arg("create")
            .arg("cluster")
            .arg("--name")
            .arg(name)
            .output()?;
        if !output.status.success() {
            return Err(format_err!(
                "'kind create cluster failed' with exit status '{}'\n\n{}\n\n{}",
                output.status.code().unwrap_or(1),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            ));
        }
        Ok(())
    }

    fn delete_kind_cluster(name: &str) -> Result<()> {
        let output = Command::new(TestSettings::kind_path())
            .arg("delete")
            .arg("cluster")
            .arg("--name")
            .arg(name)
            .output()?;
        if !output.status.success() {
            return Err(format_err!(
                "'kind delete cluster' failed with exit status '{}'\n\n{}\n\n{}",
                output.status.code().unwrap_or(1),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            ));
        }
        Ok(())
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        if TestSettings::keep_cluster() {
            eprintln!(
                "leaving kind cluster '{}' running, use 'kind export kubeconfig --name {}'",
                self.name, self.name
            );
            return;
        }
        if let Err(e) = Self::delete_kind_cluster(&self.name) {
            eprintln!("unable to delete kind cluster '{}': {}", self.name, e)
        }
    }
}
