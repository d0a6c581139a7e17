use crate::{
    artifact::Artifacts,
    factory::{Confirmation, ContractFactory, Deployment},
    ledger::Ledger,
    DeployError,
};
use std::io::Write;
use tracing::info;

/// What to deploy and how long to wait for it.
pub struct Job<'a> {
    pub contract: &'a str,
    pub artifacts: &'a Artifacts,
    pub confirmation: &'a Confirmation,
}

/// Runs one deployment:
/// 1. Picks the first signer of the ledger.
/// 2. Resolves the contract factory from the compiled artifacts.
/// 3. Submits the no-argument deployment and waits for its confirmation.
///
/// Two status lines are written to `out`: the deploying account, right after the signer is
/// chosen, and the contract address once the deployment is confirmed.
pub async fn deploy<L: Ledger + ?Sized, W: Write>(
    ledger: &L, job: &Job<'_>, out: &mut W,
) -> Result<Deployment, DeployError> {
    let deployer = ledger
        .signers()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| DeployError::Configuration("no signer available".to_string()))?;

    writeln!(out, "Deploying {} contract with account: {}", job.contract, deployer)
        .map_err(DeployError::Io)?;

    let artifact = job.artifacts.read(job.contract)?;
    info!(
        artifact = %artifact.fully_qualified_name(),
        dir = job.artifacts.dir().to_str(),
        "resolved contract artifact"
    );
    let factory = ContractFactory::new(&artifact)?;

    let pending = factory.deploy(ledger, deployer).await?;
    let deployment = pending.deployed(ledger, job.confirmation).await?;

    writeln!(out, "{} deployed to: {}", job.contract, deployment.address())
        .map_err(DeployError::Io)?;
    Ok(deployment)
}
