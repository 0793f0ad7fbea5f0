//! In-memory control plane that records every call.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use g8_api::{CreateVirtualMachineRequest, StatusCode, VirtualMachineSummary};

use crate::types::{Cloudspace, ExternalNetwork, VmDesiredConfig};
use crate::{ApiResult, CloudApi, VmSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    List,
    Get(u64),
    Create(String),
    Delete { vm_id: u64, permanently: bool },
    AttachNetwork { vm_id: u64, network: u64, ip: String },
    AttachDisk { vm_id: u64, disk_id: u64 },
    DetachDisk { vm_id: u64, disk_id: u64 },
}

impl Call {
    pub(crate) fn is_mutating(&self) -> bool {
        !matches!(self, Self::List | Self::Get(_))
    }
}

#[derive(Default)]
struct State {
    vms: Vec<VmSnapshot>,
    next_id: u64,
    calls: Vec<Call>,
    scripted_statuses: VecDeque<String>,
    stuck_status: Option<String>,
    fail_on: Option<Call>,
    get_error: Option<(StatusCode, String)>,
}

pub(crate) struct MockCloud {
    state: Mutex<State>,
}

pub(crate) fn vm(vm_id: u64, name: &str, status: &str) -> VmSnapshot {
    VmSnapshot {
        vm_id,
        name: name.into(),
        status: status.into(),
        description: None,
        vcpus: None,
        memory: None,
        image_id: None,
        extra: Default::default(),
    }
}

pub(crate) fn config() -> VmDesiredConfig {
    VmDesiredConfig::new("mycustomer_1", "mycloudspace")
}

pub(crate) fn api_error(endpoint: &'static str, status: StatusCode, body: &str) -> g8_api::Error {
    g8_api::Error::Api {
        endpoint,
        status,
        body: body.into(),
    }
}

impl MockCloud {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 100,
                ..State::default()
            }),
        }
    }

    pub(crate) fn with_vm(self, vm: VmSnapshot) -> Self {
        self.state.lock().unwrap().vms.push(vm);
        self
    }

    /// Statuses handed out by the next `get_vm` calls, before the stored one.
    pub(crate) fn with_statuses(self, statuses: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripted_statuses
            .extend(statuses.iter().map(|s| s.to_string()));
        self
    }

    /// Every `get_vm` reports this status.
    pub(crate) fn stuck_in(self, status: &str) -> Self {
        self.state.lock().unwrap().stuck_status = Some(status.into());
        self
    }

    /// The matching call fails with a 500.
    pub(crate) fn failing_on(self, call: Call) -> Self {
        self.state.lock().unwrap().fail_on = Some(call);
        self
    }

    /// Every `get_vm` fails with this status and body.
    pub(crate) fn get_fails_with(self, status: StatusCode, body: &str) -> Self {
        self.state.lock().unwrap().get_error = Some((status, body.into()));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    pub(crate) fn get_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Get(_)))
            .count()
    }

    pub(crate) fn has_vm(&self, vm_id: u64) -> bool {
        self.state.lock().unwrap().vms.iter().any(|v| v.vm_id == vm_id)
    }

    fn record(&self, call: Call, endpoint: &'static str) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        let failing = state.fail_on.as_ref() == Some(&call);
        state.calls.push(call);
        if failing {
            return Err(api_error(endpoint, StatusCode::INTERNAL_SERVER_ERROR, "boom"));
        }
        Ok(())
    }
}

#[async_trait]
impl CloudApi for MockCloud {
    async fn list_vms(&self, _scope: &Cloudspace) -> ApiResult<Vec<VirtualMachineSummary>> {
        self.record(Call::List, "list virtual machines")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .vms
            .iter()
            .map(|v| VirtualMachineSummary {
                vm_id: v.vm_id,
                name: v.name.clone(),
                status: v.status.clone(),
            })
            .collect())
    }

    async fn get_vm(&self, _scope: &Cloudspace, vm_id: u64) -> ApiResult<VmSnapshot> {
        self.record(Call::Get(vm_id), "get virtual machine")?;
        let mut state = self.state.lock().unwrap();
        if let Some((status, body)) = &state.get_error {
            return Err(api_error("get virtual machine", *status, body));
        }
        let Some(mut found) = state.vms.iter().find(|v| v.vm_id == vm_id).cloned() else {
            return Err(api_error("get virtual machine", StatusCode::NOT_FOUND, "not found"));
        };
        if let Some(status) = state.scripted_statuses.pop_front() {
            found.status = status;
        } else if let Some(status) = &state.stuck_status {
            found.status = status.clone();
        }
        Ok(found)
    }

    async fn create_vm(
        &self,
        _scope: &Cloudspace,
        req: &CreateVirtualMachineRequest,
    ) -> ApiResult<u64> {
        self.record(Call::Create(req.name.clone()), "create virtual machine")?;
        let mut state = self.state.lock().unwrap();
        let vm_id = state.next_id;
        state.next_id += 1;
        state.vms.push(vm(vm_id, &req.name, "RUNNING"));
        Ok(vm_id)
    }

    async fn delete_vm(&self, _scope: &Cloudspace, vm_id: u64, permanently: bool) -> ApiResult<()> {
        self.record(Call::Delete { vm_id, permanently }, "delete virtual machine")?;
        self.state.lock().unwrap().vms.retain(|v| v.vm_id != vm_id);
        Ok(())
    }

    async fn attach_network(
        &self,
        _scope: &Cloudspace,
        vm_id: u64,
        network: &ExternalNetwork,
    ) -> ApiResult<()> {
        self.record(
            Call::AttachNetwork {
                vm_id,
                network: network.network,
                ip: network.ip.clone(),
            },
            "attach external network",
        )
    }

    async fn attach_disk(&self, _scope: &Cloudspace, vm_id: u64, disk_id: u64) -> ApiResult<()> {
        self.record(Call::AttachDisk { vm_id, disk_id }, "attach disk")
    }

    async fn detach_disk(&self, _scope: &Cloudspace, vm_id: u64, disk_id: u64) -> ApiResult<()> {
        self.record(Call::DetachDisk { vm_id, disk_id }, "detach disk")
    }
}
