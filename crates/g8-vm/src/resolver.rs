use g8_api::StatusCode;
use tracing::debug;

use crate::types::{Cloudspace, VmDesiredConfig};
use crate::{CloudApi, Error, Result, VmSnapshot};

/// Actual state of the VM a desired config refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Found(VmSnapshot),
    NotFound,
}

/// Locate the VM by id, or by exact name when no id is given.
///
/// An id that does not exist is a configuration mistake, not a missing VM.
pub async fn resolve(api: &dyn CloudApi, desired: &VmDesiredConfig) -> Result<Resolved> {
    let scope = desired.scope();

    if let Some(vm_id) = desired.vm_id {
        return fetch_by_id(api, &scope, vm_id).await.map(Resolved::Found);
    }

    let Some(name) = desired.name.as_deref() else {
        debug!(cloudspace = %scope, "no vm_id or name given, nothing to look up");
        return Ok(Resolved::NotFound);
    };

    let vms = api.list_vms(&scope).await?;
    match vms.iter().find(|vm| vm.name == name) {
        Some(summary) => {
            debug!(
                cloudspace = %scope,
                vm_name = name,
                vm_id = summary.vm_id,
                "found vm by name"
            );
            fetch_by_id(api, &scope, summary.vm_id)
                .await
                .map(Resolved::Found)
        }
        None => {
            debug!(
                cloudspace = %scope,
                vm_name = name,
                listed = vms.len(),
                "no vm with that name"
            );
            Ok(Resolved::NotFound)
        }
    }
}

async fn fetch_by_id(api: &dyn CloudApi, scope: &Cloudspace, vm_id: u64) -> Result<VmSnapshot> {
    match api.get_vm(scope, vm_id).await {
        Ok(vm) => Ok(vm),
        Err(g8_api::Error::Api { status, .. }) if status == StatusCode::NOT_FOUND => Err(
            Error::Config(format!("VM with vm_id {vm_id} does not exist.")),
        ),
        Err(g8_api::Error::Api { status, body, .. }) if status == StatusCode::BAD_REQUEST => {
            Err(Error::Config(body))
        }
        Err(e) => Err(Error::Api(e)),
    }
}
