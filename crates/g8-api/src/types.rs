use serde::{Deserialize, Serialize};

// ── Virtual machine types ───────────────────────────────────────────

/// Entry of a cloudspace VM listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualMachineSummary {
    pub vm_id: u64,
    pub name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListVirtualMachinesResponse {
    #[serde(default)]
    pub result: Vec<VirtualMachineSummary>,
}

/// Full VM detail as reported by the portal.
///
/// The common sizing fields are typed; everything else the portal reports is
/// kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub vm_id: u64,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vcpus: Option<u32>,
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub image_id: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootType {
    #[default]
    Bios,
    Uefi,
}

impl BootType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bios => "bios",
            Self::Uefi => "uefi",
        }
    }
}

/// JSON body of a create call. Only cloud-init user data travels here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VirtualMachinePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userdata: Option<serde_json::Value>,
}

/// Parameters of a create call.
///
/// Scalar fields go on the query string, `data_disks` as a repeated
/// parameter, and `payload` as the JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateVirtualMachineRequest {
    pub name: String,
    pub description: String,
    pub image_id: u64,
    pub vcpus: u32,
    pub memory: u64,
    pub disk_size: u32,
    pub data_disks: Vec<u32>,
    pub boot_type: BootType,
    pub private_ip: Option<String>,
    pub enable_vm_agent: bool,
    pub payload: VirtualMachinePayload,
}

impl CreateVirtualMachineRequest {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("name", self.name.clone()),
            ("description", self.description.clone()),
            ("image_id", self.image_id.to_string()),
            ("vcpus", self.vcpus.to_string()),
            ("memory", self.memory.to_string()),
            ("disk_size", self.disk_size.to_string()),
            ("boot_type", self.boot_type.as_str().to_string()),
            ("enable_vm_agent", self.enable_vm_agent.to_string()),
        ];
        if let Some(ip) = &self.private_ip {
            query.push(("private_ip", ip.clone()));
        }
        query.extend(self.data_disks.iter().map(|d| ("data_disks", d.to_string())));
        query
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedVirtualMachine {
    pub vm_id: u64,
}

// ── Attachment types ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachExternalNetworkRequest {
    pub external_network_id: u64,
    pub external_network_ip: String,
    pub model: String,
}
