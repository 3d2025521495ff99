//! Liquidation transaction submission and outcome classification.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{PendingTransactionError, Provider, ProviderBuilder, WatchTxError};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::contract::ILendingProtocol;
use crate::error::ChainError;
use crate::gas::{GasError, GasStrategy};
use crate::revert::{classify_revert, RevertKind};
use crate::signer::SigningAccount;

/// Why a submission counts as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Contract or node rejected the call for a classified reason.
    Rejected(RevertKind),
    /// Network price above the configured cap; nothing was sent.
    GasPriceAboveCap,
    /// Transport failure before or while sending.
    Rpc,
    /// Sent, but no receipt within the timeout. State unknown.
    ConfirmationTimeout,
    /// Mined with status 0 and no recoverable reason.
    Reverted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Rejected(kind) => write!(f, "rejected:{kind}"),
            FailureKind::GasPriceAboveCap => f.write_str("gas_price_above_cap"),
            FailureKind::Rpc => f.write_str("rpc"),
            FailureKind::ConfirmationTimeout => f.write_str("confirmation_timeout"),
            FailureKind::Reverted => f.write_str("reverted"),
        }
    }
}

/// Result of one liquidation attempt. Exactly one per `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Transaction confirmed successfully.
    Liquidated {
        tx_hash: B256,
        block_number: Option<u64>,
        gas_used: u64,
    },
    /// Loan is no longer Funded (lost race or repaid). Expected, not an error.
    AlreadyResolved { reason: String },
    /// Anything else.
    Failed {
        kind: FailureKind,
        reason: String,
        tx_hash: Option<B256>,
    },
}

impl SubmitOutcome {
    /// Map a revert reason onto an outcome. Unrecognised reasons are failures.
    pub fn from_revert(reason: impl Into<String>, tx_hash: Option<B256>) -> Self {
        let reason = reason.into();
        match classify_revert(&reason) {
            RevertKind::AlreadyResolved => SubmitOutcome::AlreadyResolved { reason },
            kind => SubmitOutcome::Failed {
                kind: FailureKind::Rejected(kind),
                reason,
                tx_hash,
            },
        }
    }

    /// Map a chain error onto an outcome. Unrecognised RPC errors stay `Rpc`.
    pub fn from_chain_error(err: ChainError, tx_hash: Option<B256>) -> Self {
        match err {
            ChainError::Reverted { reason } => Self::from_revert(reason, tx_hash),
            // Node rejections such as "nonce too low" arrive as RPC errors
            ChainError::Rpc(message) if classify_revert(&message) != RevertKind::Unknown => {
                Self::from_revert(message, tx_hash)
            }
            other => SubmitOutcome::Failed {
                kind: FailureKind::Rpc,
                reason: other.to_string(),
                tx_hash,
            },
        }
    }

    /// Short label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            SubmitOutcome::Liquidated { .. } => "liquidated",
            SubmitOutcome::AlreadyResolved { .. } => "already_resolved",
            SubmitOutcome::Failed { .. } => "failed",
        }
    }

    /// Transaction hash, if one was sent.
    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            SubmitOutcome::Liquidated { tx_hash, .. } => Some(*tx_hash),
            SubmitOutcome::AlreadyResolved { .. } => None,
            SubmitOutcome::Failed { tx_hash, .. } => *tx_hash,
        }
    }
}

/// Executes the liquidation operation for a single loan.
///
/// Implementations send at most one state-changing transaction per call and
/// never retry; retry and pacing belong to the caller.
#[async_trait]
pub trait LiquidationSubmitter: Send + Sync {
    async fn submit(&self, loan_id: u64) -> SubmitOutcome;
}

/// Submission settings.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Simulate with `eth_call` before sending
    pub simulate_first: bool,
    /// Blocks to wait for after inclusion
    pub confirmations: u64,
    /// Give up waiting for a receipt after this long
    pub confirmation_timeout: Duration,
    /// Fixed gas limit; estimated by the node when `None`
    pub gas_limit: Option<u64>,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            simulate_first: true,
            confirmations: 1,
            confirmation_timeout: Duration::from_secs(180),
            gas_limit: None,
        }
    }
}

/// Receipt fields the submitter classifies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinedTx {
    pub tx_hash: B256,
    /// Receipt status; `false` means the transaction reverted on-chain
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Why a send did not end in a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Rejected before broadcast. Nothing is pending.
    NotSent(ChainError),
    /// Broadcast, but no receipt before the timeout. State unknown.
    Timeout(B256),
    /// Broadcast, then watching for the receipt failed.
    Watch { tx_hash: B256, reason: String },
}

/// Chain access used by [`ContractSubmitter`].
#[async_trait]
pub trait TxBackend: Send + Sync {
    /// `eth_call` of `liquidateLoan` from the keeper address against latest state.
    async fn simulate(&self, loan_id: u64) -> Result<(), ChainError>;

    /// Sign and broadcast `tx` once, then wait for its receipt.
    async fn send_and_confirm(
        &self,
        tx: TransactionRequest,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<MinedTx, SendError>;
}

/// [`TxBackend`] over HTTP JSON-RPC, signing with the keeper account.
#[derive(Debug)]
pub struct RpcBackend {
    contract: Address,
    account: SigningAccount,
}

impl RpcBackend {
    pub fn new(contract: Address, account: SigningAccount) -> Self {
        Self { contract, account }
    }
}

#[async_trait]
impl TxBackend for RpcBackend {
    async fn simulate(&self, loan_id: u64) -> Result<(), ChainError> {
        let provider = ProviderBuilder::new().on_http(self.account.rpc_url().clone());
        let lending = ILendingProtocol::new(self.contract, &provider);

        lending
            .liquidateLoan(U256::from(loan_id))
            .from(self.account.address())
            .call()
            .await?;
        Ok(())
    }

    async fn send_and_confirm(
        &self,
        tx: TransactionRequest,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<MinedTx, SendError> {
        let provider = ProviderBuilder::new()
            .wallet(self.account.wallet())
            .on_http(self.account.rpc_url().clone());

        let submit_start = Instant::now();
        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| SendError::NotSent(ChainError::from(e)))?;
        let tx_hash = *pending.tx_hash();

        info!(
            tx_hash = %tx_hash,
            submit_ms = submit_start.elapsed().as_millis(),
            "Liquidation submitted, waiting for confirmation"
        );

        let receipt = pending
            .with_required_confirmations(confirmations)
            .with_timeout(Some(timeout))
            .get_receipt()
            .await
            .map_err(|err| match err {
                PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
                    SendError::Timeout(tx_hash)
                }
                other => SendError::Watch {
                    tx_hash,
                    reason: other.to_string(),
                },
            })?;

        Ok(MinedTx {
            tx_hash,
            success: receipt.status(),
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }
}

/// Submits `liquidateLoan` to the lending contract from the keeper account.
pub struct ContractSubmitter {
    /// Lending contract address
    contract: Address,
    /// Keeper address
    from: Address,
    /// Endpoint gas quotes are fetched from
    rpc_url: Url,
    backend: Arc<dyn TxBackend>,
    /// Gas pricing strategy
    gas_strategy: Box<dyn GasStrategy>,
    config: SubmitterConfig,
}

impl ContractSubmitter {
    pub fn new(
        contract: Address,
        account: SigningAccount,
        gas_strategy: Box<dyn GasStrategy>,
        config: SubmitterConfig,
    ) -> Self {
        Self {
            contract,
            from: account.address(),
            rpc_url: account.rpc_url().clone(),
            backend: Arc::new(RpcBackend::new(contract, account)),
            gas_strategy,
            config,
        }
    }

    /// Replace the chain backend.
    pub fn with_backend(mut self, backend: Arc<dyn TxBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Keeper address.
    pub fn address(&self) -> Address {
        self.from
    }

    /// Gas strategy name.
    pub fn gas_strategy_name(&self) -> &'static str {
        self.gas_strategy.strategy_name()
    }

    /// Unsigned liquidation transaction (no gas pricing applied).
    pub fn build_request(&self, loan_id: u64) -> TransactionRequest {
        let calldata = ILendingProtocol::liquidateLoanCall {
            loanId: U256::from(loan_id),
        }
        .abi_encode();

        let mut tx = TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.contract)
            .with_input(Bytes::from(calldata));

        if let Some(limit) = self.config.gas_limit {
            tx.set_gas_limit(limit);
        }
        tx
    }

    /// Classify a transaction that was mined with status 0.
    ///
    /// An exhausted fixed gas limit is a fault of ours whatever the loan's
    /// state is now. Otherwise replay against current state to recover a reason.
    async fn explain_revert(&self, loan_id: u64, mined: &MinedTx, gas_limit: Option<u64>) -> SubmitOutcome {
        if let Some(limit) = gas_limit {
            if mined.gas_used >= limit {
                return SubmitOutcome::Failed {
                    kind: FailureKind::Rejected(RevertKind::GasTooLow),
                    reason: format!("out of gas: used {} of limit {limit}", mined.gas_used),
                    tx_hash: Some(mined.tx_hash),
                };
            }
        }

        match self.backend.simulate(loan_id).await {
            Err(ChainError::Reverted { reason }) => {
                SubmitOutcome::from_revert(reason, Some(mined.tx_hash))
            }
            _ => SubmitOutcome::Failed {
                kind: FailureKind::Reverted,
                reason: format!(
                    "transaction reverted in block {}",
                    mined.block_number.unwrap_or_default()
                ),
                tx_hash: Some(mined.tx_hash),
            },
        }
    }
}

#[async_trait]
impl LiquidationSubmitter for ContractSubmitter {
    #[instrument(skip(self), fields(contract = %self.contract))]
    async fn submit(&self, loan_id: u64) -> SubmitOutcome {
        let total_start = Instant::now();

        if self.config.simulate_first {
            if let Err(err) = self.backend.simulate(loan_id).await {
                debug!(loan_id, error = %err, "Simulation rejected liquidation, not sending");
                return SubmitOutcome::from_chain_error(err, None);
            }
        }

        let gas_params = match self.gas_strategy.fetch_params(&self.rpc_url).await {
            Ok(params) => params,
            Err(err @ GasError::AboveCap { .. }) => {
                return SubmitOutcome::Failed {
                    kind: FailureKind::GasPriceAboveCap,
                    reason: err.to_string(),
                    tx_hash: None,
                }
            }
            Err(err) => {
                return SubmitOutcome::Failed {
                    kind: FailureKind::Rpc,
                    reason: err.to_string(),
                    tx_hash: None,
                }
            }
        };

        let mut tx = self.build_request(loan_id);
        self.gas_strategy.apply_gas(&mut tx, &gas_params);
        let gas_limit = tx.gas;

        debug!(
            loan_id,
            gas_strategy = self.gas_strategy.strategy_name(),
            gas_price_gwei = gas_params.effective_gas_price() / 1_000_000_000,
            gas_limit = ?gas_limit,
            "Sending liquidation"
        );

        let mined = match self
            .backend
            .send_and_confirm(tx, self.config.confirmations, self.config.confirmation_timeout)
            .await
        {
            Ok(mined) => mined,
            Err(SendError::NotSent(err)) => return SubmitOutcome::from_chain_error(err, None),
            Err(SendError::Timeout(tx_hash)) => {
                warn!(loan_id, tx_hash = %tx_hash, "No receipt before timeout");
                return SubmitOutcome::Failed {
                    kind: FailureKind::ConfirmationTimeout,
                    reason: format!(
                        "no receipt after {}s",
                        self.config.confirmation_timeout.as_secs()
                    ),
                    tx_hash: Some(tx_hash),
                };
            }
            Err(SendError::Watch { tx_hash, reason }) => {
                return SubmitOutcome::Failed {
                    kind: FailureKind::Rpc,
                    reason,
                    tx_hash: Some(tx_hash),
                }
            }
        };

        if !mined.success {
            return self.explain_revert(loan_id, &mined, gas_limit).await;
        }

        debug!(
            loan_id,
            tx_hash = %mined.tx_hash,
            block = mined.block_number.unwrap_or(0),
            gas_used = mined.gas_used,
            total_ms = total_start.elapsed().as_millis(),
            "Liquidation confirmed"
        );

        SubmitOutcome::Liquidated {
            tx_hash: mined.tx_hash,
            block_number: mined.block_number,
            gas_used: mined.gas_used,
        }
    }
}

impl fmt::Debug for ContractSubmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractSubmitter")
            .field("contract", &self.contract)
            .field("from", &self.from)
            .field("gas_strategy", &self.gas_strategy.strategy_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
