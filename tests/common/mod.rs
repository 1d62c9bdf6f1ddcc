// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use addon_csr_signer::crd::{
    ManagedCluster, ManagedClusterAddOn, ManagedClusterAddOnSpec, ManagedClusterSpec,
};
use addon_csr_signer::labels::{ADDON_NAME_LABEL, CLUSTER_NAME_LABEL};
use k8s_openapi::api::certificates::v1::{CertificateSigningRequest, CertificateSigningRequestSpec};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::client::Client;
use rcgen::{CertificateParams, DistinguishedName, DnType, DnValue, KeyPair};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    match Client::try_default().await {
        Ok(client) => {
            println!("✓ Successfully connected to Kubernetes cluster");
            Some(client)
        }
        Err(e) => {
            eprintln!("⊘ Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Whether the CRD named `name` (e.g. `managedclusters.cluster.open-cluster-management.io`) exists
pub async fn crd_installed(client: &Client, name: &str) -> bool {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    match crds.get_opt(name).await {
        Ok(found) => found.is_some(),
        Err(e) => {
            println!("⚠ Could not check CRD {name}: {e}");
            false
        }
    }
}

/// Create a `ManagedCluster` and the namespace named after it
pub async fn create_managed_cluster(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                "test".to_string(),
                "integration".to_string(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    };
    ignore_conflict(namespaces.create(&PostParams::default(), &ns).await)?;

    let clusters: Api<ManagedCluster> = Api::all(client.clone());
    let cluster = ManagedCluster::new(
        name,
        ManagedClusterSpec {
            hub_accepts_client: true,
            ..Default::default()
        },
    );
    ignore_conflict(clusters.create(&PostParams::default(), &cluster).await)?;

    println!("✓ Created ManagedCluster: {name}");
    Ok(())
}

/// Install add-on `addon` for cluster `cluster`
pub async fn create_cluster_addon(
    client: &Client,
    cluster: &str,
    addon: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let addons: Api<ManagedClusterAddOn> = Api::namespaced(client.clone(), cluster);
    let mut cluster_addon = ManagedClusterAddOn::new(addon, ManagedClusterAddOnSpec::default());
    cluster_addon.metadata.namespace = Some(cluster.to_string());
    ignore_conflict(addons.create(&PostParams::default(), &cluster_addon).await)?;

    println!("✓ Created ManagedClusterAddOn: {cluster}/{addon}");
    Ok(())
}

/// Create a CSR the way an add-on agent would
pub async fn create_addon_csr(
    client: &Client,
    name: &str,
    cluster: &str,
    addon: &str,
    signer_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(
        DnType::CommonName,
        DnValue::Utf8String(format!(
            "system:open-cluster-management:cluster:{cluster}:addon:{addon}:agent:{addon}-agent"
        )),
    );
    params.distinguished_name = dn;
    let key = KeyPair::generate()?;
    let request = params.serialize_request(&key)?.pem()?;

    let csr = CertificateSigningRequest {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([
                (ADDON_NAME_LABEL.to_string(), addon.to_string()),
                (CLUSTER_NAME_LABEL.to_string(), cluster.to_string()),
            ])),
            ..Default::default()
        },
        spec: CertificateSigningRequestSpec {
            request: ByteString(request.into_bytes()),
            signer_name: signer_name.to_string(),
            usages: Some(vec![
                "digital signature".to_string(),
                "key encipherment".to_string(),
                "client auth".to_string(),
            ]),
            ..Default::default()
        },
        status: None,
    };

    let csrs: Api<CertificateSigningRequest> = Api::all(client.clone());
    csrs.create(&PostParams::default(), &csr).await?;

    println!("✓ Created CSR: {name}");
    Ok(())
}

/// Approve a CSR through the approval subresource
pub async fn approve_csr(client: &Client, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let csrs: Api<CertificateSigningRequest> = Api::all(client.clone());
    let patch = json!({
        "status": {
            "conditions": [{
                "type": "Approved",
                "status": "True",
                "reason": "IntegrationTest",
                "message": "Approved by integration test"
            }]
        }
    });
    csrs.patch_approval(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    println!("✓ Approved CSR: {name}");
    Ok(())
}

/// Poll until the CSR carries a certificate, or `timeout` elapses
pub async fn wait_for_certificate(client: &Client, name: &str, timeout: Duration) -> Option<Vec<u8>> {
    let csrs: Api<CertificateSigningRequest> = Api::all(client.clone());
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if let Ok(csr) = csrs.get(name).await {
            if let Some(certificate) = csr
                .status
                .and_then(|status| status.certificate)
                .filter(|certificate| !certificate.0.is_empty())
            {
                return Some(certificate.0);
            }
        }
        sleep(Duration::from_secs(1)).await;
    }

    None
}

/// Delete a CSR, ignoring not-found
pub async fn delete_csr(client: &Client, name: &str) {
    let csrs: Api<CertificateSigningRequest> = Api::all(client.clone());
    match csrs.delete(name, &DeleteParams::default()).await {
        Ok(_) => println!("✓ Deleted CSR: {name}"),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {}
        Err(e) => eprintln!("⚠ Failed to delete CSR {name}: {e}"),
    }
}

/// Delete a `ManagedCluster` and its namespace, ignoring not-found
pub async fn delete_managed_cluster(client: &Client, name: &str) {
    let clusters: Api<ManagedCluster> = Api::all(client.clone());
    match clusters.delete(name, &DeleteParams::default()).await {
        Ok(_) => println!("✓ Deleted ManagedCluster: {name}"),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {}
        Err(e) => eprintln!("⚠ Failed to delete ManagedCluster {name}: {e}"),
    }

    let namespaces: Api<Namespace> = Api::all(client.clone());
    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => println!("✓ Deleted namespace: {name}"),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {}
        Err(e) => eprintln!("⚠ Failed to delete namespace {name}: {e}"),
    }
}

fn ignore_conflict<T>(result: Result<T, kube::Error>) -> Result<(), kube::Error> {
    match result {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()),
        Err(e) => Err(e),
    }
}
