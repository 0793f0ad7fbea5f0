//! Reconciles the desired state of a single VM against a G8 cloudspace.
//!
//! A pass resolves the VM once, plans a single action from
//! (desired state × found/not found), and applies it: create plus ordered
//! network/disk attachments, or disk detachment plus delete. Every
//! attach/detach step first waits for the VM to settle in a stable status.

pub mod attacher;
pub mod client;
pub mod poller;
pub mod reconciler;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod test_support;

use async_trait::async_trait;
use g8_api::{CreateVirtualMachineRequest, VirtualMachine, VirtualMachineSummary};

pub use attacher::{Attacher, Operation};
pub use poller::{PollPolicy, wait_stable};
pub use reconciler::{Action, Plan, Reconciler, Status};
pub use resolver::{Resolved, resolve};
pub use types::{Cloudspace, DesiredState, ExternalNetwork, ReconciliationResult, VmDesiredConfig};

/// Snapshot of a VM as last fetched from the portal.
pub type VmSnapshot = VirtualMachine;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("VM configuration is incorrect: {0}")]
    Config(String),

    #[error("VM {vm_id} not in a stable status after {attempts} attempts (last status: {last_status})")]
    Timeout {
        vm_id: u64,
        attempts: u32,
        last_status: String,
    },

    #[error("{operation} on VM {vm_id} stopped after {completed} of {total} steps: {source}")]
    PartiallyApplied {
        vm_id: u64,
        operation: Operation,
        completed: usize,
        total: usize,
        source: Box<Error>,
    },

    #[error("cloud api error: {0}")]
    Api(#[from] g8_api::Error),
}

impl Error {
    /// True if this error, or the step failure it wraps, is a poll timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::PartiallyApplied { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Whether the failed pass left remote changes behind.
    ///
    /// Attach sequences only run right after a create, so any failure there
    /// means a VM now exists. Detach sequences changed something only if at
    /// least one disk came off.
    pub fn left_changes(&self) -> bool {
        match self {
            Self::PartiallyApplied {
                operation: Operation::AttachNetwork | Operation::AttachDisk,
                ..
            } => true,
            Self::PartiallyApplied { completed, .. } => *completed > 0,
            _ => false,
        }
    }

    /// The VM a partially applied sequence was operating on.
    pub fn vm_id(&self) -> Option<u64> {
        match self {
            Self::Timeout { vm_id, .. } | Self::PartiallyApplied { vm_id, .. } => Some(*vm_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Result of a single control-plane call, before domain translation.
pub type ApiResult<T> = std::result::Result<T, g8_api::Error>;

/// Control-plane operations the reconciler depends on.
///
/// Implemented for [`g8_api::G8Client`]; tests substitute an in-memory double.
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn list_vms(&self, scope: &Cloudspace) -> ApiResult<Vec<VirtualMachineSummary>>;

    async fn get_vm(&self, scope: &Cloudspace, vm_id: u64) -> ApiResult<VmSnapshot>;

    /// Create a VM and return its new id.
    async fn create_vm(
        &self,
        scope: &Cloudspace,
        req: &CreateVirtualMachineRequest,
    ) -> ApiResult<u64>;

    async fn delete_vm(&self, scope: &Cloudspace, vm_id: u64, permanently: bool) -> ApiResult<()>;

    async fn attach_network(
        &self,
        scope: &Cloudspace,
        vm_id: u64,
        network: &ExternalNetwork,
    ) -> ApiResult<()>;

    async fn attach_disk(&self, scope: &Cloudspace, vm_id: u64, disk_id: u64) -> ApiResult<()>;

    async fn detach_disk(&self, scope: &Cloudspace, vm_id: u64, disk_id: u64) -> ApiResult<()>;
}

