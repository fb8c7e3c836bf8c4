use serde::{Deserialize, Serialize};

const MIB_PER_GIB: u64 = 1024;

/// A named compute offering from the provider catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceType {
    pub name: String,
    pub vcpus: u32,
    pub memory_gb: u32,
}

impl InstanceType {
    /// Catalogs report memory in MiB; partial GiB are dropped.
    pub fn from_mib(name: impl Into<String>, vcpus: u32, memory_mib: u64) -> Self {
        let memory_gb = u32::try_from(memory_mib / MIB_PER_GIB).unwrap_or(u32::MAX);
        Self {
            name: name.into(),
            vcpus,
            memory_gb,
        }
    }
}

/// A requirement paired with the instance chosen for it. `cpu`/`ram` are
/// the instance's capacity, not the requested amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedInstance {
    #[serde(rename = "Server Name")]
    pub server_name: String,
    #[serde(rename = "CPU")]
    pub cpu: u32,
    #[serde(rename = "RAM")]
    pub ram: u32,
    #[serde(rename = "InstanceType")]
    pub instance_type: String,
    #[serde(rename = "Storage")]
    pub storage: String,
    #[serde(rename = "Database")]
    pub database: String,
}
