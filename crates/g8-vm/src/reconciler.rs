use std::fmt;

use g8_api::CreateVirtualMachineRequest;
use tracing::{info, warn};

use crate::attacher::{Attacher, Operation};
use crate::poller::PollPolicy;
use crate::resolver::{Resolved, resolve};
use crate::types::{DesiredState, ReconciliationResult, VmDesiredConfig};
use crate::{CloudApi, Error, Result, VmSnapshot};

/// Status line reported at the end of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Created,
    PresentAlready,
    Deleted,
    AbsentAlready,
    Changed(String),
    Unchanged(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("VM CREATED"),
            Self::PresentAlready => f.write_str("VM PRESENT ALREADY"),
            Self::Deleted => f.write_str("VM DELETED"),
            Self::AbsentAlready => f.write_str("VM ABSENT ALREADY"),
            Self::Changed(vm) => write!(f, "VM {vm} CHANGED"),
            Self::Unchanged(vm) => write!(f, "VM {vm} DID NOT CHANGE"),
        }
    }
}

/// What a pass will do, decided from (desired state × resolved VM).
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Create(CreateVirtualMachineRequest),
    AlreadyPresent(VmSnapshot),
    Delete(VmSnapshot),
    AlreadyAbsent,
    /// Changing an existing VM is not supported; nothing is sent.
    Unsupported { target: String },
}

impl Action {
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Delete(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub action: Action,
    /// Drift that was detected but will not be acted on.
    pub warnings: Vec<String>,
}

impl Plan {
    /// The result applying this plan would report, without applying it.
    pub fn preview(&self) -> ReconciliationResult {
        let (status, vm_id) = match &self.action {
            Action::Create(_) => (Status::Created, None),
            Action::AlreadyPresent(vm) => (Status::PresentAlready, Some(vm.vm_id)),
            Action::Delete(vm) => (Status::Deleted, Some(vm.vm_id)),
            Action::AlreadyAbsent => (Status::AbsentAlready, None),
            Action::Unsupported { target } => (Status::Unchanged(target.clone()), None),
        };
        ReconciliationResult {
            changed: self.action.is_mutating(),
            status: status.to_string(),
            vm_id,
            warnings: self.warnings.clone(),
        }
    }
}

/// Drives a VM toward its desired state in one pass.
pub struct Reconciler<'a> {
    api: &'a dyn CloudApi,
    policy: PollPolicy,
}

impl<'a> Reconciler<'a> {
    pub fn new(api: &'a dyn CloudApi) -> Self {
        Self {
            api,
            policy: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve the VM once and decide what to do. Never mutates.
    ///
    /// Creation parameters are validated here, so an invalid config fails
    /// before any mutating call is made.
    pub async fn plan(&self, desired: &VmDesiredConfig) -> Result<Plan> {
        let resolved = resolve(self.api, desired).await?;
        let mut warnings = Vec::new();

        let action = match (desired.state, resolved) {
            (DesiredState::Present, Resolved::NotFound) => {
                Action::Create(desired.creation_request()?)
            }
            (DesiredState::Present, Resolved::Found(vm)) => {
                if let Some(name) = desired.name.as_deref()
                    && name != vm.name
                {
                    warn!(
                        vm_id = vm.vm_id,
                        actual = %vm.name,
                        requested = name,
                        "vm name differs, renaming is not supported"
                    );
                    warnings.push(format!(
                        "VM {} is named '{}' but '{}' was requested; renaming is not supported",
                        vm.vm_id, vm.name, name
                    ));
                }
                Action::AlreadyPresent(vm)
            }
            (DesiredState::Absent, Resolved::Found(vm)) => Action::Delete(vm),
            (DesiredState::Absent, Resolved::NotFound) => Action::AlreadyAbsent,
            (DesiredState::Change, resolved) => {
                let target = match resolved {
                    Resolved::Found(vm) => vm.vm_id.to_string(),
                    Resolved::NotFound => desired
                        .name
                        .clone()
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| "<unnamed>".into()),
                };
                warn!(vm = %target, "changing virtual machines is not implemented");
                Action::Unsupported { target }
            }
        };

        Ok(Plan { action, warnings })
    }

    /// Execute a plan produced by [`Reconciler::plan`] for the same config.
    pub async fn apply(&self, desired: &VmDesiredConfig, plan: Plan) -> Result<ReconciliationResult> {
        let mut result = plan.preview();

        match plan.action {
            Action::Create(req) => {
                result.vm_id = Some(self.create(desired, &req).await?);
            }
            Action::Delete(vm) => self.delete(desired, &vm).await?,
            Action::AlreadyPresent(_) | Action::AlreadyAbsent | Action::Unsupported { .. } => {}
        }

        Ok(result)
    }

    /// Plan and apply in one go.
    pub async fn reconcile(&self, desired: &VmDesiredConfig) -> Result<ReconciliationResult> {
        let plan = self.plan(desired).await?;
        self.apply(desired, plan).await
    }

    async fn create(&self, desired: &VmDesiredConfig, req: &CreateVirtualMachineRequest) -> Result<u64> {
        let scope = desired.scope();
        let vm_id = self.api.create_vm(&scope, req).await?;
        info!(vm_id, name = %req.name, cloudspace = %scope, "vm created");

        let attacher = Attacher::new(self.api, &scope, vm_id, self.policy);
        if !desired.external_networks.is_empty() {
            attacher.attach_networks(&desired.external_networks).await?;
        }
        if !desired.persistent_disks.is_empty() {
            attacher.attach_disks(&desired.persistent_disks).await?;
        }

        Ok(vm_id)
    }

    async fn delete(&self, desired: &VmDesiredConfig, vm: &VmSnapshot) -> Result<()> {
        let scope = desired.scope();

        let detached = desired.persistent_disks.len();
        if detached > 0 {
            Attacher::new(self.api, &scope, vm.vm_id, self.policy)
                .detach_disks(&desired.persistent_disks)
                .await?;
        }

        if let Err(e) = self
            .api
            .delete_vm(&scope, vm.vm_id, desired.permanently_delete)
            .await
        {
            if detached == 0 {
                return Err(e.into());
            }
            warn!(vm_id = vm.vm_id, detached, error = %e, "delete failed after detaching disks");
            return Err(Error::PartiallyApplied {
                vm_id: vm.vm_id,
                operation: Operation::DeleteVm,
                completed: detached,
                total: detached + 1,
                source: Box::new(e.into()),
            });
        }
        info!(
            vm_id = vm.vm_id,
            name = %vm.name,
            permanently = desired.permanently_delete,
            "vm deleted"
        );
        Ok(())
    }
}
