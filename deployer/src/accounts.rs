use crate::DeployError;
use alloy::{
    network::EthereumWallet,
    primitives::{Address, B256},
    signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner},
};
use getset::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const SECRET_KEY_VAR: &str = "SECRET_KEY";
pub const MNEMONIC_VAR: &str = "MNEMONIC";

const DEFAULT_MNEMONIC_COUNT: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
/// How many accounts to derive when signing with a mnemonic.
pub struct Config {
    #[serde(default = "default_count")]
    count: u32,
    #[serde(default)]
    initial_index: u32,
}

fn default_count() -> u32 {
    DEFAULT_MNEMONIC_COUNT
}

impl Default for Config {
    fn default() -> Self {
        Self { count: DEFAULT_MNEMONIC_COUNT, initial_index: 0 }
    }
}

/// Reads the signing keys from the environment (`SECRET_KEY`, then `MNEMONIC`).
///
/// An empty result means no local key is configured; the node's own accounts are used then.
pub fn from_env(config: &Config) -> Result<Vec<PrivateKeySigner>, DeployError> {
    let secret_keys = std::env::var(SECRET_KEY_VAR).ok();
    let mnemonic = std::env::var(MNEMONIC_VAR).ok();
    local_signers(secret_keys.as_deref(), mnemonic.as_deref(), config)
}

/// Builds the local signers from comma-separated hex keys or, failing that, a mnemonic phrase.
///
/// Credentials that are set but yield no signer are an error, never a silent fallback to the
/// node's accounts.
pub fn local_signers(
    secret_keys: Option<&str>, mnemonic: Option<&str>, config: &Config,
) -> Result<Vec<PrivateKeySigner>, DeployError> {
    if let Some(keys) = secret_keys.filter(|k| !k.trim().is_empty()) {
        let signers = keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .enumerate()
            .map(|(i, key)| parse_secret_key(key, i))
            .collect::<Result<Vec<_>, _>>()?;
        if signers.is_empty() {
            return Err(DeployError::Configuration(format!("{SECRET_KEY_VAR} holds no key")));
        }
        info!(count = signers.len(), "using signers from {SECRET_KEY_VAR}");
        return Ok(signers);
    }

    if let Some(phrase) = mnemonic.filter(|m| !m.trim().is_empty()) {
        if config.count == 0 {
            return Err(DeployError::Configuration(format!(
                "accounts.count must be at least 1 to sign with {MNEMONIC_VAR}"
            )));
        }
        let start = config.initial_index;
        let signers = (start..start.saturating_add(config.count))
            .map(|index| {
                MnemonicBuilder::<English>::default()
                    .phrase(phrase.trim())
                    .index(index)
                    .and_then(|builder| builder.build())
                    .map_err(|e| {
                        DeployError::Configuration(format!(
                            "cannot derive account {index} from {MNEMONIC_VAR}: {e}"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!(count = signers.len(), "using signers derived from {MNEMONIC_VAR}");
        return Ok(signers);
    }

    debug!("no local signers configured");
    Ok(Vec::new())
}

fn parse_secret_key(key: &str, position: usize) -> Result<PrivateKeySigner, DeployError> {
    let invalid = |reason: String| {
        DeployError::Configuration(format!("invalid key #{position} in {SECRET_KEY_VAR}: {reason}"))
    };
    let bytes: B256 = key.parse().map_err(|e| invalid(format!("{e}")))?;
    PrivateKeySigner::from_bytes(&bytes).map_err(|e| invalid(e.to_string()))
}

/// Registers every signer in a wallet, the first one being the default.
pub fn wallet(signers: &[PrivateKeySigner]) -> Option<EthereumWallet> {
    let (first, rest) = signers.split_first()?;
    let mut wallet = EthereumWallet::from(first.clone());
    for signer in rest {
        wallet.register_signer(signer.clone());
    }
    Some(wallet)
}

pub fn addresses(signers: &[PrivateKeySigner]) -> Vec<Address> {
    signers.iter().map(|s| s.address()).collect()
}
