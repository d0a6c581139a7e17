use crate::artifact;
use alloy::primitives::TxHash;
use jobboard_common::config::LoadError;
use std::{io, time::Duration};

#[derive(thiserror::Error, Debug)]
/// Errors that can abort a deployment run.
pub enum DeployError {
    /// No usable signer, invalid credentials, unknown network or malformed settings.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The config file could not be loaded.
    #[error("configuration error: {0}")]
    ConfigLoad(LoadError),
    /// No compiled artifact matches the requested contract name.
    #[error("{0}")]
    NotFound(artifact::Error),
    /// The artifact exists but cannot be used for a no-argument deployment.
    #[error("{0}")]
    Artifact(artifact::Error),
    /// The ledger rejected or reverted the deployment, or the RPC call failed.
    #[error("transaction error: {0}")]
    Transaction(String),
    /// The deployment was submitted but not confirmed in time.
    #[error("deployment transaction {tx_hash} not confirmed within {timeout:?}")]
    Timeout { tx_hash: TxHash, timeout: Duration },
    /// Writing the status lines failed.
    #[error("cannot write output: {0}")]
    Io(io::Error),
}

impl DeployError {
    /// Process exit code reported for this error. Every failure is fatal and maps to `1`.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

impl From<artifact::Error> for DeployError {
    fn from(err: artifact::Error) -> Self {
        match err {
            artifact::Error::NotFound { .. } | artifact::Error::Ambiguous { .. } => {
                DeployError::NotFound(err)
            },
            err => DeployError::Artifact(err),
        }
    }
}

impl From<LoadError> for DeployError {
    fn from(err: LoadError) -> Self {
        DeployError::ConfigLoad(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_errors_split_by_kind() {
        let err: DeployError =
            artifact::Error::NotFound { name: "Board".into(), similar: vec![] }.into();
        assert!(matches!(err, DeployError::NotFound(_)));

        let err: DeployError = artifact::Error::AbstractContract("IBoard".into()).into();
        assert!(matches!(err, DeployError::Artifact(_)));
    }

    #[test]
    fn test_every_error_exits_with_one() {
        let errs = [
            DeployError::Configuration("no signer".into()),
            DeployError::Transaction("reverted".into()),
            DeployError::Timeout { tx_hash: TxHash::ZERO, timeout: Duration::from_secs(1) },
        ];
        for err in errs {
            assert_eq!(err.exit_code(), 1);
        }
    }

    #[test]
    fn test_reported_message_is_display() {
        // main prints `Error: {err}` once, so the message must read as one plain sentence
        let err = DeployError::Configuration("no signer available".into());
        assert_eq!(err.to_string(), "configuration error: no signer available");
        assert_ne!(err.to_string(), format!("{err:?}"));

        let err: DeployError = LoadError::NoUserDirs("jobboard-deployer".into()).into();
        assert_eq!(
            err.to_string(),
            "configuration error: user directories for \"jobboard-deployer\" cannot be determined"
        );
    }
}
