use std::time::Duration;

use tracing::debug;

use crate::types::Cloudspace;
use crate::{CloudApi, Error, Result, VmSnapshot};

/// Statuses in which the portal accepts attach/detach calls.
pub const STABLE_STATUSES: [&str; 2] = ["RUNNING", "HALTED"];

pub fn is_stable(status: &str) -> bool {
    STABLE_STATUSES.contains(&status)
}

/// How long to wait for a VM to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    /// 12 fetches, 5 seconds apart: about a minute.
    fn default() -> Self {
        Self {
            max_attempts: 12,
            interval: Duration::from_secs(5),
        }
    }
}

/// Fetch the VM until its status is stable or the attempt budget runs out.
///
/// Returns the snapshot that reported the stable status. Fetch errors are
/// not retried.
pub async fn wait_stable(
    api: &dyn CloudApi,
    scope: &Cloudspace,
    vm_id: u64,
    policy: &PollPolicy,
) -> Result<VmSnapshot> {
    let mut last_status = String::new();

    for attempt in 1..=policy.max_attempts {
        let vm = api.get_vm(scope, vm_id).await?;
        if is_stable(&vm.status) {
            debug!(vm_id, attempt, status = %vm.status, "vm is stable");
            return Ok(vm);
        }

        debug!(vm_id, attempt, status = %vm.status, "waiting for vm to settle");
        last_status = vm.status;

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(Error::Timeout {
        vm_id,
        attempts: policy.max_attempts,
        last_status,
    })
}
