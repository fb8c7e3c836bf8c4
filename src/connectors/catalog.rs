use super::errors::{ensure_success, ConnectorError};
use crate::models::InstanceType;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Upper bound on followed `NextToken` pages, guards against a service that
/// keeps handing back the same token.
const MAX_PAGES: usize = 500;

/// Source of available compute instance types. Fetched fresh on every
/// pipeline run, never cached here.
#[async_trait]
pub trait InstanceCatalog: Send + Sync {
    async fn list_instance_types(&self) -> Result<Vec<InstanceType>, ConnectorError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Static catalog (file or in-memory)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    vcpus: u32,
    memory_mib: u64,
}

#[derive(Debug, Clone, Default)]
pub struct StaticInstanceCatalog {
    instances: Vec<InstanceType>,
}

impl StaticInstanceCatalog {
    pub fn new(instances: Vec<InstanceType>) -> Self {
        Self { instances }
    }

    /// Parse a YAML (or JSON) document mapping instance name to
    /// `{vcpus, memory_mib}`.
    pub fn from_yaml(document: &str) -> Result<Self, ConnectorError> {
        let entries: BTreeMap<String, CatalogEntry> = serde_yaml::from_str(document)
            .map_err(|err| ConnectorError::InvalidResponse(format!("instance catalog: {}", err)))?;

        let instances = entries
            .into_iter()
            .map(|(name, entry)| InstanceType::from_mib(name, entry.vcpus, entry.memory_mib))
            .collect();

        Ok(Self { instances })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConnectorError> {
        let document = std::fs::read_to_string(path).map_err(|err| {
            ConnectorError::Internal(format!(
                "Failed to read instance catalog {}: {}",
                path.display(),
                err
            ))
        })?;
        Self::from_yaml(&document)
    }
}

#[async_trait]
impl InstanceCatalog for StaticInstanceCatalog {
    async fn list_instance_types(&self) -> Result<Vec<InstanceType>, ConnectorError> {
        Ok(self.instances.clone())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP catalog (describe-instance-types document)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
struct DescribeInstanceTypesPage {
    #[serde(rename = "InstanceTypes", default)]
    instance_types: Vec<InstanceTypeInfo>,
    #[serde(rename = "NextToken", default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstanceTypeInfo {
    #[serde(rename = "InstanceType")]
    instance_type: String,
    #[serde(rename = "VCpuInfo")]
    vcpu_info: VCpuInfo,
    #[serde(rename = "MemoryInfo")]
    memory_info: MemoryInfo,
}

#[derive(Debug, Deserialize)]
struct VCpuInfo {
    #[serde(rename = "DefaultVCpus")]
    default_vcpus: u32,
}

#[derive(Debug, Deserialize)]
struct MemoryInfo {
    #[serde(rename = "SizeInMiB")]
    size_in_mib: u64,
}

pub struct HttpInstanceCatalog {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpInstanceCatalog {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, ConnectorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|err| ConnectorError::Internal(format!("HTTP client error: {}", err)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            http_client,
        })
    }

    async fn fetch_page(
        &self,
        next_token: Option<&str>,
    ) -> Result<DescribeInstanceTypesPage, ConnectorError> {
        let mut request = self.http_client.get(&self.endpoint);
        if let Some(token) = next_token {
            request = request.query(&[("NextToken", token)]);
        }

        let response = ensure_success(request.send().await?).await?;
        response
            .json::<DescribeInstanceTypesPage>()
            .await
            .map_err(|err| ConnectorError::InvalidResponse(format!("instance catalog: {}", err)))
    }
}

#[async_trait]
impl InstanceCatalog for HttpInstanceCatalog {
    #[tracing::instrument(name = "Fetch instance catalog.", skip(self), fields(endpoint = %self.endpoint))]
    async fn list_instance_types(&self) -> Result<Vec<InstanceType>, ConnectorError> {
        let mut instances = Vec::new();
        let mut next_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page = self.fetch_page(next_token.as_deref()).await?;
            instances.extend(page.instance_types.into_iter().map(|info| {
                InstanceType::from_mib(
                    info.instance_type,
                    info.vcpu_info.default_vcpus,
                    info.memory_info.size_in_mib,
                )
            }));

            match page.next_token.filter(|token| !token.is_empty()) {
                Some(token) => next_token = Some(token),
                None => {
                    tracing::debug!(count = instances.len(), "Instance catalog fetched");
                    return Ok(instances);
                }
            }
        }

        tracing::warn!(pages = MAX_PAGES, "Instance catalog pagination limit reached");
        Ok(instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_catalog_from_yaml_converts_mib() {
        let catalog = StaticInstanceCatalog::from_yaml(
            r#"
t3.large: { vcpus: 2, memory_mib: 8192 }
t3.micro: { vcpus: 2, memory_mib: 1024 }
"#,
        )
        .unwrap();

        let instances = catalog.list_instance_types().await.unwrap();
        assert_eq!(
            instances,
            vec![
                InstanceType::from_mib("t3.large", 2, 8192),
                InstanceType::from_mib("t3.micro", 2, 1024),
            ]
        );
        assert_eq!(instances[0].memory_gb, 8);
    }

    #[test]
    fn test_static_catalog_rejects_malformed_document() {
        let result = StaticInstanceCatalog::from_yaml("t3.micro: { vcpus: two }");
        assert!(matches!(result, Err(ConnectorError::InvalidResponse(_))));
    }

    #[test]
    fn test_describe_page_deserializes() {
        let page: DescribeInstanceTypesPage = serde_json::from_str(
            r#"{"InstanceTypes":[{"InstanceType":"m5.xlarge","VCpuInfo":{"DefaultVCpus":4},"MemoryInfo":{"SizeInMiB":16384}}],"NextToken":"abc"}"#,
        )
        .unwrap();
        assert_eq!(page.instance_types.len(), 1);
        assert_eq!(page.instance_types[0].vcpu_info.default_vcpus, 4);
        assert_eq!(page.next_token.as_deref(), Some("abc"));
    }
}
