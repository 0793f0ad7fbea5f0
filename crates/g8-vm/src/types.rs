use std::fmt;
use std::str::FromStr;

use g8_api::{BootType, CreateVirtualMachineRequest, VirtualMachinePayload};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Customer + cloudspace pair every control-plane call is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cloudspace {
    pub customer_id: String,
    pub cloudspace_id: String,
}

impl fmt::Display for Cloudspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.customer_id, self.cloudspace_id)
    }
}

/// Lifecycle state the caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
    Change,
}

impl DesiredState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Change => "change",
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DesiredState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            "change" => Ok(Self::Change),
            other => Err(Error::Config(format!("state '{other}' unrecognized"))),
        }
    }
}

impl<'de> Deserialize<'de> for DesiredState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(Self::default()),
            Some(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// One external network interface to add to a new VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalNetwork {
    /// External network id.
    pub network: u64,
    /// Virtual interface model, e.g. `virtio`.
    pub kind: String,
    pub ip: String,
}

/// Treat an explicit JSON `null` like an absent field.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Like [`nullable`], but `null` falls back to a field-specific default.
fn nullable_or<'de, D, T>(deserializer: D, default: fn() -> T) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_else(default))
}

fn default_description() -> String {
    "VM created by gig-vm".into()
}

fn default_vcpus() -> u32 {
    1
}

fn default_memory() -> u64 {
    1024
}

fn default_disk_size() -> u32 {
    30
}

fn nullable_description<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    nullable_or(d, default_description)
}

fn nullable_vcpus<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    nullable_or(d, default_vcpus)
}

fn nullable_memory<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u64, D::Error> {
    nullable_or(d, default_memory)
}

fn nullable_disk_size<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    nullable_or(d, default_disk_size)
}

/// JSON that counts as "no user data": null, `{}`, `[]` or `""`.
fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Desired state of one VM, as handed over by the configuration loader.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VmDesiredConfig {
    pub customer_id: String,
    pub cloudspace_id: String,
    #[serde(default)]
    pub state: DesiredState,
    #[serde(default)]
    pub vm_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub image_id: Option<u64>,
    #[serde(default = "default_description", deserialize_with = "nullable_description")]
    pub description: String,
    #[serde(default = "default_vcpus", deserialize_with = "nullable_vcpus")]
    pub vcpus: u32,
    /// Memory in MB.
    #[serde(default = "default_memory", deserialize_with = "nullable_memory")]
    pub memory: u64,
    /// Boot disk size in GB.
    #[serde(default = "default_disk_size", deserialize_with = "nullable_disk_size")]
    pub disk_size: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub boot_type: BootType,
    #[serde(default)]
    pub user_data: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub enable_vm_agent: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub private_ip: String,

    /// Sizes in GB of data disks created with (and deleted with) the VM.
    #[serde(default, deserialize_with = "nullable")]
    pub ephemeral_disks: Vec<u32>,
    /// Ids of existing disks attached after create, detached before delete.
    #[serde(default, deserialize_with = "nullable")]
    pub persistent_disks: Vec<u64>,
    #[serde(default, deserialize_with = "nullable")]
    pub external_networks: Vec<ExternalNetwork>,
    #[serde(default, deserialize_with = "nullable")]
    pub permanently_delete: bool,
}

impl VmDesiredConfig {
    pub fn new(customer_id: impl Into<String>, cloudspace_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            cloudspace_id: cloudspace_id.into(),
            state: DesiredState::default(),
            vm_id: None,
            name: None,
            image_id: None,
            description: default_description(),
            vcpus: default_vcpus(),
            memory: default_memory(),
            disk_size: default_disk_size(),
            boot_type: BootType::default(),
            user_data: None,
            enable_vm_agent: false,
            private_ip: String::new(),
            ephemeral_disks: Vec::new(),
            persistent_disks: Vec::new(),
            external_networks: Vec::new(),
            permanently_delete: false,
        }
    }

    pub fn scope(&self) -> Cloudspace {
        Cloudspace {
            customer_id: self.customer_id.clone(),
            cloudspace_id: self.cloudspace_id.clone(),
        }
    }

    /// Build the create call from the inline creation fields.
    ///
    /// User data moves into the JSON payload and ephemeral disks become the
    /// inline `data_disks`. Persistent disks, external networks and the
    /// delete flag never reach the create call.
    pub fn creation_request(&self) -> Result<CreateVirtualMachineRequest> {
        let name = self
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::Config("Can't create a vm without a name configured.".into()))?;

        let image_id = self.image_id.ok_or_else(|| {
            Error::Config(format!(
                "Can't create vm with name {name} without an image_id configured."
            ))
        })?;

        let private_ip = Some(self.private_ip.clone()).filter(|ip| !ip.is_empty());

        Ok(CreateVirtualMachineRequest {
            name,
            description: self.description.clone(),
            image_id,
            vcpus: self.vcpus,
            memory: self.memory,
            disk_size: self.disk_size,
            data_disks: self.ephemeral_disks.clone(),
            boot_type: self.boot_type,
            private_ip,
            enable_vm_agent: self.enable_vm_agent,
            payload: VirtualMachinePayload {
                userdata: self.user_data.clone().filter(|v| !is_blank(v)),
            },
        })
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub changed: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_id: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
