use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use g8_vm::{PollPolicy, VmDesiredConfig};
use serde::Deserialize;

use crate::error::CliError;

/// Create or delete a VM on a GIG based cloud.
#[derive(Debug, Parser)]
#[command(name = "gig-vm", version)]
pub struct Cli {
    /// JSON file holding the module parameters.
    pub params: PathBuf,

    /// Portal URL, e.g. https://cloud.example.com
    #[arg(long, env = "G8_API_URL")]
    pub api_url: Option<String>,

    /// JWT used to authorize against the portal.
    #[arg(long, env = "G8_JWT", hide_env_values = true)]
    pub jwt: Option<String>,

    /// Report what would change without changing anything.
    #[arg(long)]
    pub check: bool,

    /// Status fetches before giving up on a VM that will not settle.
    #[arg(
        long,
        env = "G8_POLL_ATTEMPTS",
        default_value_t = 12,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub poll_attempts: u32,

    #[arg(long, env = "G8_POLL_INTERVAL_SECS", default_value_t = 5)]
    pub poll_interval_secs: u64,
}

/// Contents of the params file: the desired VM plus optional credentials.
#[derive(Debug, Deserialize)]
pub struct ModuleParams {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub jwt: Option<String>,
    #[serde(flatten)]
    pub vm: VmDesiredConfig,
}

impl ModuleParams {
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CliError::ReadParams {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| CliError::ParseParams {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub jwt: String,
    pub check_mode: bool,
    pub poll: PollPolicy,
    pub desired: VmDesiredConfig,
}

impl AppConfig {
    /// Merge flags and environment over the params file. Flags win.
    pub fn load(cli: Cli) -> Result<Self, CliError> {
        let params = ModuleParams::from_file(&cli.params)?;
        Self::merge(cli, params)
    }

    fn merge(cli: Cli, params: ModuleParams) -> Result<Self, CliError> {
        let api_url = cli
            .api_url
            .or(params.api_url)
            .filter(|s| !s.is_empty())
            .ok_or(CliError::Missing("api_url"))?;
        let jwt = cli
            .jwt
            .or(params.jwt)
            .filter(|s| !s.is_empty())
            .ok_or(CliError::Missing("jwt"))?;

        Ok(Self {
            api_url,
            jwt,
            check_mode: cli.check,
            poll: PollPolicy {
                max_attempts: cli.poll_attempts,
                interval: Duration::from_secs(cli.poll_interval_secs),
            },
            desired: params.vm,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use g8_vm::DesiredState;
    use serde_json::json;

    use super::*;

    fn params_file(value: serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{value}").unwrap();
        file
    }

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["gig-vm"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn loads_module_params_from_file() {
        let file = params_file(json!({
            "api_url": "https://cloud.example.com",
            "jwt": "myjwt",
            "customer_id": "mycustomer_1",
            "cloudspace_id": "mycloudspace",
            "state": "present",
            "name": "My Ansible VM",
            "image_id": 45,
            "vcpus": 2,
            "memory": 2048,
            "user_data": {"hostname": "AnsibleVM"},
            "external_networks": [{"network": 3, "kind": "virtio", "ip": "10.0.0.5"}],
            "persistent_disks": [4930, 4931],
            "ephemeral_disks": [30, 40, 50],
        }));
        let path = file.path().to_str().unwrap();

        let params = ModuleParams::from_file(file.path()).unwrap();
        let args = cli(&[path, "--api-url", "https://other.example.com"]);
        let config = AppConfig::merge(args, params).unwrap();

        assert_eq!(config.api_url, "https://other.example.com");
        assert_eq!(config.jwt, "myjwt");
        assert!(!config.check_mode);
        assert_eq!(config.desired.state, DesiredState::Present);
        assert_eq!(config.desired.image_id, Some(45));
        assert_eq!(config.desired.persistent_disks, vec![4930, 4931]);
        assert_eq!(config.desired.external_networks[0].kind, "virtio");
    }

    #[test]
    fn poll_policy_comes_from_flags() {
        let file = params_file(json!({
            "jwt": "myjwt",
            "api_url": "https://cloud.example.com",
            "customer_id": "c",
            "cloudspace_id": "s",
        }));
        let path = file.path().to_str().unwrap();
        let params = ModuleParams::from_file(file.path()).unwrap();

        let config = AppConfig::merge(
            cli(&[path, "--check", "--poll-attempts", "3", "--poll-interval-secs", "1"]),
            params,
        )
        .unwrap();

        assert!(config.check_mode);
        assert_eq!(config.poll.max_attempts, 3);
        assert_eq!(config.poll.interval, Duration::from_secs(1));
    }

    #[test]
    fn zero_poll_attempts_are_rejected() {
        let err = Cli::try_parse_from(["gig-vm", "params.json", "--poll-attempts", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(Cli::try_parse_from(["gig-vm", "params.json", "--poll-attempts", "1"]).is_ok());
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let file = params_file(json!({"customer_id": "c", "cloudspace_id": "s"}));
        let path = file.path().to_str().unwrap();
        let params = ModuleParams::from_file(file.path()).unwrap();

        let mut args = cli(&[path]);
        args.api_url = Some("https://cloud.example.com".into());
        args.jwt = None;

        let err = AppConfig::merge(args, params).unwrap_err();
        assert!(matches!(err, CliError::Missing("jwt")));
    }

    #[test]
    fn bad_state_is_a_parse_error() {
        let file = params_file(json!({
            "customer_id": "c",
            "cloudspace_id": "s",
            "state": "stopped",
        }));

        let err = ModuleParams::from_file(file.path()).unwrap_err();
        assert!(matches!(err, CliError::ParseParams { .. }));
        assert!(err.to_string().contains("state 'stopped' unrecognized"));
    }
}
