//! The ledger client the deployer talks to.

use crate::DeployError;
use alloy::{
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, Bytes, TxHash},
    providers::Provider,
    rpc::types::{TransactionReceipt, TransactionRequest},
    transports::Transport,
};
use async_trait::async_trait;
use getset::CopyGetters;
use std::marker::PhantomData;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
/// The parts of a transaction receipt a deployment cares about.
pub struct Receipt {
    contract_address: Option<Address>,
    block_number: Option<u64>,
    success: bool,
}

impl Receipt {
    pub fn new(contract_address: Option<Address>, block_number: Option<u64>, success: bool) -> Self {
        Self { contract_address, block_number, success }
    }
}

impl From<TransactionReceipt> for Receipt {
    fn from(receipt: TransactionReceipt) -> Self {
        Self::new(receipt.contract_address, receipt.block_number, receipt.status())
    }
}

/// A transaction-issuing client of an EVM ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Addresses of the identities able to sign, default signer first.
    async fn signers(&self) -> Result<Vec<Address>, DeployError>;

    /// Broadcasts a contract-creation transaction and returns its hash.
    async fn submit_deployment(&self, from: Address, code: Bytes) -> Result<TxHash, DeployError>;

    /// Latest block number.
    async fn block_number(&self) -> Result<u64, DeployError>;

    /// Receipt of a mined transaction, `None` while it is still pending.
    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, DeployError>;
}

/// JSON-RPC ledger backed by an alloy provider.
pub struct RpcLedger<P, T> {
    provider: P,
    /// Signers held in the provider's wallet; `None` defers to the node's own accounts.
    local_signers: Option<Vec<Address>>,
    _transport: PhantomData<fn() -> T>,
}

impl<P, T> RpcLedger<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    /// Ledger whose transactions are signed locally by the provider's wallet.
    pub fn with_local_signers(provider: P, signers: Vec<Address>) -> Self {
        Self { provider, local_signers: Some(signers), _transport: PhantomData }
    }

    /// Ledger whose transactions are signed by the node (`eth_accounts`).
    pub fn with_node_accounts(provider: P) -> Self {
        Self { provider, local_signers: None, _transport: PhantomData }
    }
}

#[async_trait]
impl<P, T> Ledger for RpcLedger<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    async fn signers(&self) -> Result<Vec<Address>, DeployError> {
        if let Some(signers) = &self.local_signers {
            return Ok(signers.clone());
        }
        let accounts = self.provider.get_accounts().await.map_err(|e| {
            DeployError::Configuration(format!("cannot list node accounts: {e}"))
        })?;
        debug!(count = accounts.len(), "node accounts");
        Ok(accounts)
    }

    async fn submit_deployment(&self, from: Address, code: Bytes) -> Result<TxHash, DeployError> {
        let tx = TransactionRequest::default().with_from(from).with_deploy_code(code);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| DeployError::Transaction(e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn block_number(&self) -> Result<u64, DeployError> {
        self.provider.get_block_number().await.map_err(|e| DeployError::Transaction(e.to_string()))
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, DeployError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| DeployError::Transaction(e.to_string()))?;
        Ok(receipt.map(Receipt::from))
    }
}
