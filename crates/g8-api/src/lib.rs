//! Typed Rust client for the G8 cloud portal API (GIG based clouds).
//!
//! Covers the subset needed for managing a single VM inside a cloudspace:
//! virtual machines (list, get, create, delete), external network
//! attachment and disk attach/detach.

mod types;

pub use reqwest::StatusCode;
pub use types::*;

const API_PREFIX: &str = "/api/1";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("g8 api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("g8 api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },
}

impl Error {
    /// HTTP status reported by the portal, if the request got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Request(e) => e.status(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the G8 portal REST API.
///
/// Authentication is a bearer JWT fixed at construction; one client is built
/// per invocation and passed around by reference.
#[derive(Clone)]
pub struct G8Client {
    api_url: String,
    jwt: String,
    http: reqwest::Client,
}

impl G8Client {
    pub fn new(api_url: impl Into<String>, jwt: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            jwt: jwt.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.api_url.trim_end_matches('/'))
    }

    fn vms_path(customer_id: &str, cloudspace_id: &str) -> String {
        format!("/customers/{customer_id}/cloudspaces/{cloudspace_id}/vms")
    }

    fn vm_path(customer_id: &str, cloudspace_id: &str, vm_id: u64) -> String {
        format!("{}/{vm_id}", Self::vms_path(customer_id, cloudspace_id))
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.jwt)
    }

    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api { endpoint, status, body });
        }
        Ok(resp)
    }

    // ── Virtual machines ────────────────────────────────────────────

    pub async fn list_virtual_machines(
        &self,
        customer_id: &str,
        cloudspace_id: &str,
    ) -> Result<Vec<VirtualMachineSummary>> {
        let resp = self
            .http
            .get(self.url(&Self::vms_path(customer_id, cloudspace_id)))
            .header("Authorization", self.auth())
            .send()
            .await?;

        let list: ListVirtualMachinesResponse = Self::check(resp, "list virtual machines")
            .await?
            .json()
            .await?;
        Ok(list.result)
    }

    pub async fn get_virtual_machine(
        &self,
        customer_id: &str,
        cloudspace_id: &str,
        vm_id: u64,
    ) -> Result<VirtualMachine> {
        let resp = self
            .http
            .get(self.url(&Self::vm_path(customer_id, cloudspace_id, vm_id)))
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check(resp, "get virtual machine")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn create_virtual_machine(
        &self,
        customer_id: &str,
        cloudspace_id: &str,
        req: &CreateVirtualMachineRequest,
    ) -> Result<CreatedVirtualMachine> {
        let resp = self
            .http
            .post(self.url(&Self::vms_path(customer_id, cloudspace_id)))
            .header("Authorization", self.auth())
            .query(&req.query())
            .json(&req.payload)
            .send()
            .await?;

        Self::check(resp, "create virtual machine")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn delete_virtual_machine(
        &self,
        customer_id: &str,
        cloudspace_id: &str,
        vm_id: u64,
        permanently: bool,
    ) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&Self::vm_path(customer_id, cloudspace_id, vm_id)))
            .header("Authorization", self.auth())
            .query(&[("permanently", permanently)])
            .send()
            .await?;

        Self::check(resp, "delete virtual machine").await?;
        Ok(())
    }

    // ── Attachments ─────────────────────────────────────────────────

    pub async fn attach_external_network(
        &self,
        customer_id: &str,
        cloudspace_id: &str,
        vm_id: u64,
        req: &AttachExternalNetworkRequest,
    ) -> Result<()> {
        let path = format!(
            "{}/external-networks",
            Self::vm_path(customer_id, cloudspace_id, vm_id)
        );
        let resp = self
            .http
            .post(self.url(&path))
            .header("Authorization", self.auth())
            .query(req)
            .send()
            .await?;

        Self::check(resp, "attach external network").await?;
        Ok(())
    }

    pub async fn attach_disk(
        &self,
        customer_id: &str,
        cloudspace_id: &str,
        vm_id: u64,
        disk_id: u64,
    ) -> Result<()> {
        let path = format!(
            "{}/disks/{disk_id}",
            Self::vm_path(customer_id, cloudspace_id, vm_id)
        );
        let resp = self
            .http
            .post(self.url(&path))
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check(resp, "attach disk").await?;
        Ok(())
    }

    pub async fn detach_disk(
        &self,
        customer_id: &str,
        cloudspace_id: &str,
        vm_id: u64,
        disk_id: u64,
    ) -> Result<()> {
        let path = format!(
            "{}/disks/{disk_id}",
            Self::vm_path(customer_id, cloudspace_id, vm_id)
        );
        let resp = self
            .http
            .delete(self.url(&path))
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check(resp, "detach disk").await?;
        Ok(())
    }
}
