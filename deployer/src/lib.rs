use alloy::{
    providers::ProviderBuilder,
    transports::http::{
        reqwest::{Client, Url},
        Http,
    },
};
use clap::Parser;
use dotenv::dotenv;
use getset::Getters;
use jobboard_common::{config, logs};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::info;

pub mod accounts;
pub mod artifact;
mod error;
pub mod factory;
pub mod ledger;
pub mod runner;

pub use error::DeployError;
pub use factory::{Confirmation, Deployment};

use artifact::Artifacts;
use ledger::RpcLedger;
use runner::Job;

const PROGRAM_NAME: &str = "jobboard-deployer";
const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Parser, Debug, Default)]
#[command(version, about = "Deploys the DecentralizedJobBoard contract", long_about = None)]
pub struct Args {
    /// Config file to use instead of the one in the user config directory.
    #[arg(long, env = "JOBBOARD_CONFIG")]
    pub config: Option<PathBuf>,
    /// Network to deploy to, as named in the config file.
    #[arg(long, env = "JOBBOARD_NETWORK")]
    pub network: Option<String>,
    /// Contract to deploy, bare or fully qualified (`contracts/X.sol:X`).
    #[arg(long)]
    pub contract: Option<String>,
    /// Directory holding the compiled artifacts.
    #[arg(long)]
    pub artifacts: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct Network {
    url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
/// The deployer configuration.
pub struct Config {
    /// Network used when `--network` is not given.
    default_network: String,
    /// Name of the contract to deploy.
    contract: String,
    /// Compiled artifacts directory, relative to the working directory.
    artifacts: PathBuf,
    networks: BTreeMap<String, Network>,
    #[serde(default)]
    accounts: accounts::Config,
    #[serde(default)]
    confirmation: Confirmation,
}

impl Config {
    /// Loads `path` if given, otherwise the user config, creating it with defaults when missing.
    pub fn load(path: Option<&Path>) -> Result<Self, DeployError> {
        let config = match path {
            Some(path) => config::load_path(path)?,
            None => config::Loader::new(PROGRAM_NAME)?.load_or_create(DEFAULT_CONFIG)?,
        };
        Ok(config)
    }

    /// Applies the command-line overrides.
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(network) = &args.network {
            self.default_network = network.clone();
        }
        if let Some(contract) = &args.contract {
            self.contract = contract.clone();
        }
        if let Some(artifacts) = &args.artifacts {
            self.artifacts = artifacts.clone();
        }
        self
    }

    /// RPC endpoint of the selected network.
    pub fn rpc_url(&self) -> Result<Url, DeployError> {
        let network = self.networks.get(&self.default_network).ok_or_else(|| {
            DeployError::Configuration(format!(
                "network {:?} is not defined, known networks: {}",
                self.default_network,
                self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })?;
        Url::parse(&network.url).map_err(|e| {
            DeployError::Configuration(format!("invalid url {:?}: {e}", network.url))
        })
    }
}

/// Loads the configuration and deploys the configured contract, reporting on stdout.
pub async fn run() -> Result<Deployment, DeployError> {
    dotenv().ok();
    logs::setup();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?.with_args(&args);
    let rpc_url = config.rpc_url()?;
    info!(network = %config.default_network, %rpc_url, "connecting");

    let signers = accounts::from_env(&config.accounts)?;
    let artifacts = Artifacts::new(&config.artifacts);
    let job = Job {
        contract: &config.contract,
        artifacts: &artifacts,
        confirmation: &config.confirmation,
    };
    let mut out = std::io::stdout();

    match accounts::wallet(&signers) {
        Some(wallet) => {
            let provider = ProviderBuilder::new()
                .with_recommended_fillers()
                .wallet(wallet)
                .on_http(rpc_url);
            let ledger = RpcLedger::<_, Http<Client>>::with_local_signers(
                provider,
                accounts::addresses(&signers),
            );
            runner::deploy(&ledger, &job, &mut out).await
        },
        None => {
            let provider = ProviderBuilder::new().with_recommended_fillers().on_http(rpc_url);
            let ledger = RpcLedger::<_, Http<Client>>::with_node_accounts(provider);
            runner::deploy(&ledger, &job, &mut out).await
        },
    }
}
