use std::fmt;

use tracing::{info, warn};

use crate::poller::{PollPolicy, wait_stable};
use crate::types::{Cloudspace, ExternalNetwork};
use crate::{ApiResult, CloudApi, Error, Result};

/// Kind of sequence being applied to a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AttachNetwork,
    AttachDisk,
    DetachDisk,
    /// The delete call that follows a detach sequence.
    DeleteVm,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AttachNetwork => "attach external network",
            Self::AttachDisk => "attach disk",
            Self::DetachDisk => "detach disk",
            Self::DeleteVm => "delete vm",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Step<'a> {
    AttachNetwork(&'a ExternalNetwork),
    AttachDisk(u64),
    DetachDisk(u64),
}

impl fmt::Display for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttachNetwork(net) => {
                write!(f, "network {} ({}, {})", net.network, net.kind, net.ip)
            }
            Self::AttachDisk(disk_id) | Self::DetachDisk(disk_id) => write!(f, "disk {disk_id}"),
        }
    }
}

/// Applies attach/detach calls to one VM, one at a time, in the given order.
///
/// Each call waits for the VM to be stable first. The first failure stops the
/// sequence; calls that already went through are left in place.
pub struct Attacher<'a> {
    api: &'a dyn CloudApi,
    scope: &'a Cloudspace,
    vm_id: u64,
    policy: PollPolicy,
}

impl<'a> Attacher<'a> {
    pub fn new(api: &'a dyn CloudApi, scope: &'a Cloudspace, vm_id: u64, policy: PollPolicy) -> Self {
        Self {
            api,
            scope,
            vm_id,
            policy,
        }
    }

    pub async fn attach_networks(&self, networks: &[ExternalNetwork]) -> Result<()> {
        let steps = networks.iter().map(Step::AttachNetwork).collect();
        self.run(Operation::AttachNetwork, steps).await
    }

    pub async fn attach_disks(&self, disk_ids: &[u64]) -> Result<()> {
        let steps = disk_ids.iter().copied().map(Step::AttachDisk).collect();
        self.run(Operation::AttachDisk, steps).await
    }

    pub async fn detach_disks(&self, disk_ids: &[u64]) -> Result<()> {
        let steps = disk_ids.iter().copied().map(Step::DetachDisk).collect();
        self.run(Operation::DetachDisk, steps).await
    }

    async fn run(&self, operation: Operation, steps: Vec<Step<'_>>) -> Result<()> {
        let total = steps.len();

        for (completed, step) in steps.iter().enumerate() {
            if let Err(source) = self.apply(step).await {
                warn!(
                    vm_id = self.vm_id,
                    %operation,
                    completed,
                    total,
                    error = %source,
                    "aborting sequence, earlier steps stay applied"
                );
                return Err(Error::PartiallyApplied {
                    vm_id: self.vm_id,
                    operation,
                    completed,
                    total,
                    source: Box::new(source),
                });
            }
            info!(vm_id = self.vm_id, %operation, %step, "applied");
        }

        Ok(())
    }

    async fn apply(&self, step: &Step<'_>) -> Result<()> {
        wait_stable(self.api, self.scope, self.vm_id, &self.policy).await?;
        self.call(step).await?;
        Ok(())
    }

    async fn call(&self, step: &Step<'_>) -> ApiResult<()> {
        let (api, scope, vm_id) = (self.api, self.scope, self.vm_id);
        match step {
            Step::AttachNetwork(net) => api.attach_network(scope, vm_id, net).await,
            Step::AttachDisk(disk_id) => api.attach_disk(scope, vm_id, *disk_id).await,
            Step::DetachDisk(disk_id) => api.detach_disk(scope, vm_id, *disk_id).await,
        }
    }
}
