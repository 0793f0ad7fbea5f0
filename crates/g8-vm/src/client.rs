use async_trait::async_trait;
use g8_api::{
    AttachExternalNetworkRequest, CreateVirtualMachineRequest, G8Client, VirtualMachineSummary,
};

use crate::types::{Cloudspace, ExternalNetwork};
use crate::{ApiResult, CloudApi, VmSnapshot};

/// Delegates every operation to the portal REST client.
#[async_trait]
impl CloudApi for G8Client {
    async fn list_vms(&self, scope: &Cloudspace) -> ApiResult<Vec<VirtualMachineSummary>> {
        self.list_virtual_machines(&scope.customer_id, &scope.cloudspace_id)
            .await
    }

    async fn get_vm(&self, scope: &Cloudspace, vm_id: u64) -> ApiResult<VmSnapshot> {
        self.get_virtual_machine(&scope.customer_id, &scope.cloudspace_id, vm_id)
            .await
    }

    async fn create_vm(
        &self,
        scope: &Cloudspace,
        req: &CreateVirtualMachineRequest,
    ) -> ApiResult<u64> {
        let created = self
            .create_virtual_machine(&scope.customer_id, &scope.cloudspace_id, req)
            .await?;
        Ok(created.vm_id)
    }

    async fn delete_vm(&self, scope: &Cloudspace, vm_id: u64, permanently: bool) -> ApiResult<()> {
        self.delete_virtual_machine(&scope.customer_id, &scope.cloudspace_id, vm_id, permanently)
            .await
    }

    async fn attach_network(
        &self,
        scope: &Cloudspace,
        vm_id: u64,
        network: &ExternalNetwork,
    ) -> ApiResult<()> {
        let req = AttachExternalNetworkRequest {
            external_network_id: network.network,
            external_network_ip: network.ip.clone(),
            model: network.kind.clone(),
        };
        self.attach_external_network(&scope.customer_id, &scope.cloudspace_id, vm_id, &req)
            .await
    }

    async fn attach_disk(&self, scope: &Cloudspace, vm_id: u64, disk_id: u64) -> ApiResult<()> {
        G8Client::attach_disk(self, &scope.customer_id, &scope.cloudspace_id, vm_id, disk_id).await
    }

    async fn detach_disk(&self, scope: &Cloudspace, vm_id: u64, disk_id: u64) -> ApiResult<()> {
        G8Client::detach_disk(self, &scope.customer_id, &scope.cloudspace_id, vm_id, disk_id).await
    }
}
