use crate::{
    artifact::{self, Artifact},
    ledger::Ledger,
    DeployError,
};
use alloy::primitives::{Address, Bytes, TxHash};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_CONFIRMATIONS: u64 = 1;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
/// When a deployment counts as confirmed.
///
/// A deployment is confirmed once its receipt is mined and `confirmations` blocks
/// (including the inclusion block) exist on top of the chain. The receipt is polled
/// every `poll_interval_ms`, and the whole wait is bounded by `timeout_secs`.
pub struct Confirmation {
    #[serde(default = "default_confirmations")]
    confirmations: u64,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
}

fn default_confirmations() -> u64 {
    DEFAULT_CONFIRMATIONS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for Confirmation {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATIONS, DEFAULT_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_MS)
    }
}

impl Confirmation {
    pub fn new(confirmations: u64, timeout_secs: u64, poll_interval_ms: u64) -> Self {
        Self { confirmations, timeout_secs, poll_interval_ms }
    }

    /// Blocks required on top of the chain; inclusion itself is the minimum.
    pub fn required_blocks(&self) -> u64 {
        self.confirmations.max(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
/// Knows how to deploy one compiled contract with no constructor arguments.
pub struct ContractFactory {
    contract_name: String,
    code: Bytes,
}

impl ContractFactory {
    pub fn new(artifact: &Artifact) -> Result<Self, artifact::Error> {
        artifact.check_no_constructor_args()?;
        let code = artifact.creation_code()?;
        Ok(Self { contract_name: artifact.contract_name().clone(), code })
    }

    /// Submits the contract-creation transaction signed by `from`.
    pub async fn deploy<L: Ledger + ?Sized>(
        &self, ledger: &L, from: Address,
    ) -> Result<PendingDeployment, DeployError> {
        debug!(contract = %self.contract_name, %from, size = self.code.len(), "submitting deployment");
        let tx_hash = ledger.submit_deployment(from, self.code.clone()).await?;
        info!(contract = %self.contract_name, %tx_hash, "deployment submitted");
        Ok(PendingDeployment { contract_name: self.contract_name.clone(), from, tx_hash })
    }
}

#[derive(Debug, Clone, Getters, CopyGetters)]
/// A submitted deployment whose transaction is not yet confirmed.
pub struct PendingDeployment {
    #[getset(get = "pub")]
    contract_name: String,
    #[getset(get_copy = "pub")]
    from: Address,
    #[getset(get_copy = "pub")]
    tx_hash: TxHash,
}

impl PendingDeployment {
    /// Waits until the deployment is confirmed according to `policy`.
    pub async fn deployed<L: Ledger + ?Sized>(
        self, ledger: &L, policy: &Confirmation,
    ) -> Result<Deployment, DeployError> {
        let tx_hash = self.tx_hash;
        let timeout = policy.timeout();
        tokio::time::timeout(timeout, self.wait(ledger, policy))
            .await
            .map_err(|_| DeployError::Timeout { tx_hash, timeout })?
    }

    /// Polls until confirmed, pausing `poll_interval` after every poll that is not, however
    /// long the poll itself took.
    async fn wait<L: Ledger + ?Sized>(
        self, ledger: &L, policy: &Confirmation,
    ) -> Result<Deployment, DeployError> {
        let required = policy.required_blocks();
        loop {
            if let Some(deployment) = self.poll(ledger, required).await? {
                return Ok(deployment);
            }
            tokio::time::sleep(policy.poll_interval()).await;
        }
    }

    async fn poll<L: Ledger + ?Sized>(
        &self, ledger: &L, required: u64,
    ) -> Result<Option<Deployment>, DeployError> {
        let Some(receipt) = ledger.receipt(self.tx_hash).await? else {
            debug!(tx_hash = %self.tx_hash, "deployment pending");
            return Ok(None);
        };
        if !receipt.success() {
            return Err(DeployError::Transaction(format!(
                "deployment transaction {} reverted",
                self.tx_hash
            )));
        }
        let Some(included) = receipt.block_number() else {
            return Ok(None);
        };
        let address = receipt.contract_address().ok_or_else(|| {
            DeployError::Transaction(format!(
                "receipt of {} carries no contract address",
                self.tx_hash
            ))
        })?;

        let latest = ledger.block_number().await?;
        let confirmations = latest.saturating_sub(included) + 1;
        if confirmations < required {
            debug!(confirmations, required, "waiting for confirmations");
            return Ok(None);
        }
        info!(%address, block = included, confirmations, "deployment confirmed");
        Ok(Some(Deployment {
            contract_name: self.contract_name.clone(),
            address,
            from: self.from,
            tx_hash: self.tx_hash,
            block_number: included,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
/// A confirmed contract instance.
pub struct Deployment {
    #[getset(get = "pub")]
    contract_name: String,
    #[getset(get_copy = "pub")]
    address: Address,
    #[getset(get_copy = "pub")]
    from: Address,
    #[getset(get_copy = "pub")]
    tx_hash: TxHash,
    #[getset(get_copy = "pub")]
    block_number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Receipt;
    use alloy::primitives::{address, b256};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    const DEPLOYER: Address = address!("a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1");
    const CONTRACT: Address = address!("b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2");
    const TX: TxHash = b256!("1111111111111111111111111111111111111111111111111111111111111111");

    /// Replays a scripted sequence of receipt polls; the chain head grows by one per poll.
    struct ScriptedLedger {
        receipts: Mutex<Vec<Option<Receipt>>>,
        head: Mutex<u64>,
    }

    impl ScriptedLedger {
        fn new(mut receipts: Vec<Option<Receipt>>, head: u64) -> Self {
            receipts.reverse();
            Self { receipts: Mutex::new(receipts), head: Mutex::new(head) }
        }
    }

    #[async_trait]
    impl Ledger for ScriptedLedger {
        async fn signers(&self) -> Result<Vec<Address>, DeployError> {
            Ok(vec![DEPLOYER])
        }

        async fn submit_deployment(&self, _: Address, _: Bytes) -> Result<TxHash, DeployError> {
            Ok(TX)
        }

        async fn block_number(&self) -> Result<u64, DeployError> {
            Ok(*self.head.lock().unwrap())
        }

        async fn receipt(&self, _: TxHash) -> Result<Option<Receipt>, DeployError> {
            *self.head.lock().unwrap() += 1;
            let mut receipts = self.receipts.lock().unwrap();
            Ok(if receipts.len() > 1 { receipts.pop().flatten() } else { receipts[0] })
        }
    }

    fn pending() -> PendingDeployment {
        PendingDeployment { contract_name: "Board".into(), from: DEPLOYER, tx_hash: TX }
    }

    fn mined(block: u64) -> Option<Receipt> {
        Some(Receipt::new(Some(CONTRACT), Some(block), true))
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_receipt() {
        let ledger = ScriptedLedger::new(vec![None, None, mined(7)], 5);
        let deployment = pending().deployed(&ledger, &Confirmation::default()).await.unwrap();
        assert_eq!(deployment.address(), CONTRACT);
        assert_eq!(deployment.block_number(), 7);
        assert_eq!(deployment.from(), DEPLOYER);
        assert_eq!(deployment.tx_hash(), TX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_confirmations() {
        // included at block 10, head is 10 then grows by one per poll
        let ledger = ScriptedLedger::new(vec![mined(10)], 9);
        let policy = Confirmation::new(3, 60, 100);
        let deployment = pending().deployed(&ledger, &policy).await.unwrap();
        assert_eq!(deployment.block_number(), 10);
        assert!(*ledger.head.lock().unwrap() >= 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverted_deployment() {
        let ledger = ScriptedLedger::new(vec![Some(Receipt::new(None, Some(3), false))], 3);
        let err = pending().deployed(&ledger, &Confirmation::default()).await.unwrap_err();
        assert!(matches!(err, DeployError::Transaction(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_contract_address() {
        let ledger = ScriptedLedger::new(vec![Some(Receipt::new(None, Some(3), true))], 3);
        let err = pending().deployed(&ledger, &Confirmation::default()).await.unwrap_err();
        assert!(matches!(err, DeployError::Transaction(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let ledger = ScriptedLedger::new(vec![None], 1);
        let policy = Confirmation::new(1, 5, 250);
        let err = pending().deployed(&ledger, &policy).await.unwrap_err();
        match err {
            DeployError::Timeout { tx_hash, timeout } => {
                assert_eq!(tx_hash, TX);
                assert_eq!(timeout, Duration::from_secs(5));
            },
            e => panic!("unexpected error: {e}"),
        }
    }

    /// Answers every receipt request slowly and never with a receipt, recording when each began.
    struct SlowLedger {
        latency: Duration,
        started: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl Ledger for SlowLedger {
        async fn signers(&self) -> Result<Vec<Address>, DeployError> {
            Ok(vec![DEPLOYER])
        }

        async fn submit_deployment(&self, _: Address, _: Bytes) -> Result<TxHash, DeployError> {
            Ok(TX)
        }

        async fn block_number(&self) -> Result<u64, DeployError> {
            Ok(0)
        }

        async fn receipt(&self, _: TxHash) -> Result<Option<Receipt>, DeployError> {
            self.started.lock().unwrap().push(Instant::now());
            tokio::time::sleep(self.latency).await;
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_polls_still_pause_between_requests() {
        let ledger =
            SlowLedger { latency: Duration::from_secs(2), started: Mutex::new(Vec::new()) };
        let policy = Confirmation::new(1, 11, 500);
        let err = pending().deployed(&ledger, &policy).await.unwrap_err();
        assert!(matches!(err, DeployError::Timeout { .. }));

        let started = ledger.started.lock().unwrap();
        assert!(started.len() >= 3);
        for pair in started.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(2500));
        }
    }

    #[test]
    fn test_zero_confirmations_means_inclusion() {
        assert_eq!(Confirmation::new(0, 1, 1).required_blocks(), 1);
        let policy: Confirmation = toml::from_str("confirmations = 2").unwrap();
        assert_eq!(policy.required_blocks(), 2);
        assert_eq!(policy.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(policy.poll_interval(), Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
    }
}
