//! Bridge transaction status tracking
//!
//! Single-shot polls: each call reads the source chain once and derives a
//! fresh [`TransactionStatus`]. Persistence and cadence belong to the caller,
//! who hands back its last snapshot so regressions can be detected.
//!
//! ```text
//! Pending -> Confirming -> Attesting -> PresumedCompleted
//!                                  \-> Completed (confirm_completion only)
//! any non-terminal state -> Failed
//! ```

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use tracing::{debug, warn};

use crate::address_codec::ChainTag;
use crate::config::{BridgeConfig, ConfirmationPolicy};
use crate::error::{BridgeError, ChainQueryError, StatusError};
use crate::explorer::explorer_tx_url;
use crate::query::ChainQuery;
use crate::stacks::StacksTxStatus;
use crate::types::{BridgeDirection, BridgeState, TransactionStatus};

const EVM_REVERT_REASON: &str = "execution reverted";

/// What one poll of the source chain found
#[derive(Debug, Clone, PartialEq, Eq)]
enum Observation {
    /// Unknown to the chain or still in the mempool
    Pending,
    Included { confirmations: u64 },
    Failed { confirmations: u64, reason: String },
}

/// Normalise a transaction id to `0x` + 64 lowercase hex digits
pub fn normalize_tx_id(tx_id: &str) -> Result<String, StatusError> {
    let trimmed = tx_id.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(StatusError::InvalidTransactionId(tx_id.to_string()));
    }
    Ok(format!("0x{}", digits.to_ascii_lowercase()))
}

/// Confirmations of a transaction included at `height` given chain `tip`
fn confirmations_at(height: u64, tip: u64) -> u64 {
    tip.saturating_sub(height) + 1
}

fn blocks_to_duration(block_time: Duration, blocks: u64) -> Duration {
    u32::try_from(blocks)
        .ok()
        .and_then(|blocks| block_time.checked_mul(blocks))
        .unwrap_or(Duration::MAX)
}

/// Lifecycle state and ETA in seconds for an included transaction
fn derive_progress(confirmations: u64, policy: &ConfirmationPolicy) -> (BridgeState, u64) {
    let required = policy.required_confirmations;
    if confirmations < required {
        let remaining = blocks_to_duration(policy.block_time, required - confirmations);
        return (BridgeState::Confirming, remaining.as_secs());
    }

    // Attestation time is inferred from blocks mined since the threshold
    let elapsed = blocks_to_duration(policy.block_time, confirmations - required);
    if elapsed >= policy.max_attestation_wait {
        return (BridgeState::PresumedCompleted, 0);
    }
    let remaining = policy.attestation_eta.saturating_sub(elapsed);
    (BridgeState::Attesting, remaining.as_secs())
}

/// Polls either chain and maps its raw state onto [`BridgeState`]
pub struct StatusTracker<Q: ChainQuery> {
    config: Arc<BridgeConfig>,
    query: Arc<Q>,
}

impl<Q: ChainQuery> StatusTracker<Q> {
    pub fn new(config: Arc<BridgeConfig>, query: Arc<Q>) -> Self {
        Self { config, query }
    }

    /// Poll the status of `tx_id` on `chain`
    ///
    /// `previous` is the caller's last snapshot for the same transaction.
    /// A terminal snapshot is returned as-is without touching the network.
    pub async fn check_status(
        &self,
        tx_id: &str,
        chain: ChainTag,
        previous: Option<&TransactionStatus>,
    ) -> Result<TransactionStatus, BridgeError> {
        let tx_id = normalize_tx_id(tx_id)?;

        if let Some(previous) = previous {
            if previous.tx_id != tx_id || previous.chain != chain {
                return Err(StatusError::SnapshotMismatch {
                    snapshot: format!("{}:{}", previous.chain, previous.tx_id),
                    requested: format!("{}:{}", chain, tx_id),
                }
                .into());
            }
            if previous.state.is_terminal() {
                debug!(tx_id = %tx_id, state = %previous.state, "Snapshot is terminal, skipping poll");
                return Ok(previous.clone());
            }
        }

        let timeout = self.config.status.poll_timeout;
        let observation = tokio::time::timeout(timeout, self.observe(&tx_id, chain))
            .await
            .map_err(|_| ChainQueryError::Timeout {
                chain,
                after: timeout,
            })??;

        let status = self.build_status(tx_id, chain, observation);

        if let Some(previous) = previous {
            if status.confirmations < previous.confirmations {
                warn!(
                    tx_id = %status.tx_id,
                    previous = previous.confirmations,
                    observed = status.confirmations,
                    "Confirmation count regressed"
                );
                return Err(StatusError::AnomalousStateRegression {
                    tx_id: status.tx_id,
                    previous: previous.confirmations,
                    observed: status.confirmations,
                }
                .into());
            }
        }

        debug!(
            tx_id = %status.tx_id,
            chain = %chain,
            state = %status.state,
            confirmations = status.confirmations,
            "Polled transaction status"
        );
        Ok(status)
    }

    /// Record caller-supplied evidence that the destination chain credited funds
    ///
    /// Only `Attesting` and `PresumedCompleted` snapshots may complete;
    /// completing an already completed snapshot is a no-op.
    pub fn confirm_completion(
        &self,
        previous: &TransactionStatus,
    ) -> Result<TransactionStatus, StatusError> {
        match previous.state {
            BridgeState::Attesting | BridgeState::PresumedCompleted | BridgeState::Completed => {
                Ok(TransactionStatus {
                    state: BridgeState::Completed,
                    estimated_seconds_remaining: Some(0),
                    ..previous.clone()
                })
            }
            from => Err(StatusError::InvalidTransition {
                tx_id: previous.tx_id.clone(),
                from,
                to: BridgeState::Completed,
            }),
        }
    }

    async fn observe(&self, tx_id: &str, chain: ChainTag) -> Result<Observation, ChainQueryError> {
        match chain {
            ChainTag::Ethereum => self.observe_evm(tx_id).await,
            ChainTag::Stacks => self.observe_stacks(tx_id).await,
        }
    }

    async fn observe_evm(&self, tx_id: &str) -> Result<Observation, ChainQueryError> {
        let hash: B256 = tx_id
            .parse()
            .map_err(|e| ChainQueryError::malformed(ChainTag::Ethereum, format!("{}", e)))?;

        let Some(receipt) = self.query.evm_receipt(hash).await? else {
            return Ok(Observation::Pending);
        };
        let Some(height) = receipt.block_number else {
            return Ok(Observation::Pending);
        };

        let tip = self.query.evm_block_number().await?;
        let confirmations = confirmations_at(height, tip);
        if !receipt.success {
            return Ok(Observation::Failed {
                confirmations,
                reason: EVM_REVERT_REASON.to_string(),
            });
        }
        Ok(Observation::Included { confirmations })
    }

    async fn observe_stacks(&self, tx_id: &str) -> Result<Observation, ChainQueryError> {
        let Some(record) = self.query.stacks_transaction(tx_id).await? else {
            return Ok(Observation::Pending);
        };

        let confirmations = match record.block_height {
            Some(height) => confirmations_at(height, self.query.stacks_block_height().await?),
            None => 0,
        };

        let observation = match record.status {
            StacksTxStatus::Pending => Observation::Pending,
            StacksTxStatus::Success if confirmations == 0 => Observation::Pending,
            StacksTxStatus::Success => Observation::Included { confirmations },
            StacksTxStatus::AbortByResponse => Observation::Failed {
                confirmations,
                reason: record
                    .result_repr
                    .unwrap_or_else(|| "abort_by_response".to_string()),
            },
            StacksTxStatus::AbortByPostCondition => Observation::Failed {
                confirmations,
                reason: record
                    .result_repr
                    .map(|repr| format!("abort_by_post_condition: {}", repr))
                    .unwrap_or_else(|| "abort_by_post_condition".to_string()),
            },
            StacksTxStatus::Dropped(reason) => Observation::Failed {
                confirmations: 0,
                reason,
            },
        };
        Ok(observation)
    }

    fn build_status(&self, tx_id: String, chain: ChainTag, observation: Observation) -> TransactionStatus {
        let direction = BridgeDirection::originating_on(chain);
        let policy = self.config.status.policy_for(direction);
        let explorer_url = explorer_tx_url(&tx_id, chain, self.config.network);

        let (state, confirmations, eta, failure_reason) = match observation {
            Observation::Pending => (BridgeState::Pending, 0, None, None),
            Observation::Included { confirmations } => {
                let (state, eta) = derive_progress(confirmations, policy);
                (state, confirmations, Some(eta), None)
            }
            Observation::Failed {
                confirmations,
                reason,
            } => (BridgeState::Failed, confirmations, None, Some(reason)),
        };

        TransactionStatus {
            tx_id,
            chain,
            direction,
            state,
            confirmations,
            required_confirmations: policy.required_confirmations,
            explorer_url,
            estimated_seconds_remaining: eta,
            failure_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockChainQuery};

    fn tracker(query: MockChainQuery) -> (StatusTracker<MockChainQuery>, Arc<MockChainQuery>) {
        let query = Arc::new(query);
        let tracker = StatusTracker::new(Arc::new(fixtures::testnet_config()), query.clone());
        (tracker, query)
    }

    fn hash(fill: u8) -> B256 {
        B256::repeat_byte(fill)
    }

    #[test]
    fn test_normalize_tx_id() {
        let upper = format!("0X{}", "AB".repeat(32));
        assert_eq!(normalize_tx_id(&upper).unwrap(), format!("0x{}", "ab".repeat(32)));
        assert_eq!(
            normalize_tx_id(&"cd".repeat(32)).unwrap(),
            format!("0x{}", "cd".repeat(32))
        );
        assert!(normalize_tx_id("0x1234").is_err());
        assert!(normalize_tx_id(&format!("0x{}", "zz".repeat(32))).is_err());
    }

    #[test]
    fn test_derive_progress_deposit() {
        let policy = ConfirmationPolicy::deposit_default();
        assert_eq!(derive_progress(1, &policy), (BridgeState::Confirming, 11 * 12));
        assert_eq!(derive_progress(12, &policy), (BridgeState::Attesting, 15 * 60));
        // 25 blocks past the threshold = 300 s of attestation
        assert_eq!(derive_progress(37, &policy), (BridgeState::Attesting, 600));
        // 150 blocks = 30 min
        assert_eq!(derive_progress(162, &policy), (BridgeState::PresumedCompleted, 0));
    }

    #[test]
    fn test_derive_progress_attesting_eta_saturates() {
        let policy = ConfirmationPolicy::deposit_default();
        // 20 min elapsed, past the 15 min estimate but short of the 30 min cap
        assert_eq!(derive_progress(112, &policy), (BridgeState::Attesting, 0));
    }

    #[test]
    fn test_withdrawal_threshold_is_lower() {
        let policy = ConfirmationPolicy::withdrawal_default();
        assert_eq!(derive_progress(3, &policy).0, BridgeState::Attesting);
        assert_eq!(
            derive_progress(3, &ConfirmationPolicy::deposit_default()).0,
            BridgeState::Confirming
        );
    }

    #[tokio::test]
    async fn test_unknown_evm_tx_is_pending() {
        let (tracker, _) = tracker(MockChainQuery::new());
        let status = tracker
            .check_status(&fixtures::tx_id(0x11), ChainTag::Ethereum, None)
            .await
            .unwrap();

        assert_eq!(status.state, BridgeState::Pending);
        assert_eq!(status.confirmations, 0);
        assert_eq!(status.direction, BridgeDirection::Deposit);
        assert_eq!(status.required_confirmations, 12);
        assert!(status.explorer_url.starts_with("https://sepolia.etherscan.io/tx/0x1111"));
    }

    #[tokio::test]
    async fn test_evm_confirming_then_attesting() {
        let (tracker, query) = tracker(MockChainQuery::new());
        query.set_evm_receipt(hash(0x22), Some(100), true);
        query.set_evm_block(104);

        let first = tracker
            .check_status(&fixtures::tx_id(0x22), ChainTag::Ethereum, None)
            .await
            .unwrap();
        assert_eq!(first.state, BridgeState::Confirming);
        assert_eq!(first.confirmations, 5);
        assert_eq!(first.estimated_seconds_remaining, Some(7 * 12));

        query.set_evm_block(111);
        let second = tracker
            .check_status(&fixtures::tx_id(0x22), ChainTag::Ethereum, Some(&first))
            .await
            .unwrap();
        assert_eq!(second.state, BridgeState::Attesting);
        assert_eq!(second.confirmations, 12);
        assert_eq!(second.estimated_seconds_remaining, Some(900));
    }

    #[tokio::test]
    async fn test_evm_revert_is_failed() {
        let (tracker, query) = tracker(MockChainQuery::new());
        query.set_evm_receipt(hash(0x33), Some(50), false);
        query.set_evm_block(50);

        let status = tracker
            .check_status(&fixtures::tx_id(0x33), ChainTag::Ethereum, None)
            .await
            .unwrap();
        assert_eq!(status.state, BridgeState::Failed);
        assert_eq!(status.failure_reason.as_deref(), Some("execution reverted"));
    }

    #[tokio::test]
    async fn test_regression_is_reported() {
        let (tracker, query) = tracker(MockChainQuery::new());
        query.set_evm_receipt(hash(0x44), Some(100), true);
        query.set_evm_block(109);

        let first = tracker
            .check_status(&fixtures::tx_id(0x44), ChainTag::Ethereum, None)
            .await
            .unwrap();
        assert_eq!(first.confirmations, 10);

        // Reorg: the node now reports a lower tip
        query.set_evm_block(105);
        let err = tracker
            .check_status(&fixtures::tx_id(0x44), ChainTag::Ethereum, Some(&first))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::Status(StatusError::AnomalousStateRegression {
                tx_id: fixtures::tx_id(0x44),
                previous: 10,
                observed: 6,
            })
        );
    }

    #[tokio::test]
    async fn test_terminal_snapshot_skips_network() {
        let (tracker, query) = tracker(MockChainQuery::new());
        query.set_evm_receipt(hash(0x55), Some(10), false);
        query.set_evm_block(10);

        let failed = tracker
            .check_status(&fixtures::tx_id(0x55), ChainTag::Ethereum, None)
            .await
            .unwrap();
        let calls = query.total_calls();

        let again = tracker
            .check_status(&fixtures::tx_id(0x55), ChainTag::Ethereum, Some(&failed))
            .await
            .unwrap();
        assert_eq!(again, failed);
        assert_eq!(query.total_calls(), calls);
    }

    #[tokio::test]
    async fn test_snapshot_must_match() {
        let (tracker, _) = tracker(MockChainQuery::new());
        let snapshot = tracker
            .check_status(&fixtures::tx_id(0x66), ChainTag::Ethereum, None)
            .await
            .unwrap();

        let err = tracker
            .check_status(&fixtures::tx_id(0x77), ChainTag::Ethereum, Some(&snapshot))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Status(StatusError::SnapshotMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_stacks_abort_by_response() {
        let (tracker, query) = tracker(MockChainQuery::new());
        let tx_id = fixtures::tx_id(0x88);
        query.set_stacks_tx(&tx_id, StacksTxStatus::AbortByResponse, Some(200));
        query.set_stacks_height(201);

        let status = tracker
            .check_status(&tx_id, ChainTag::Stacks, None)
            .await
            .unwrap();
        assert_eq!(status.state, BridgeState::Failed);
        assert_eq!(status.direction, BridgeDirection::Withdrawal);
        assert_eq!(status.failure_reason.as_deref(), Some("(err u1)"));
        assert!(status.explorer_url.ends_with("?chain=testnet"));
    }

    #[tokio::test]
    async fn test_stacks_abort_by_post_condition() {
        let (tracker, query) = tracker(MockChainQuery::new());
        let tx_id = fixtures::tx_id(0x89);
        query.set_stacks_tx(&tx_id, StacksTxStatus::AbortByPostCondition, Some(300));
        query.set_stacks_height(300);

        let status = tracker
            .check_status(&tx_id, ChainTag::Stacks, None)
            .await
            .unwrap();
        assert_eq!(status.state, BridgeState::Failed);
        assert_eq!(status.confirmations, 1);
        assert_eq!(status.estimated_seconds_remaining, None);
        assert_eq!(
            status.failure_reason.as_deref(),
            Some("abort_by_post_condition: (ok true)")
        );
    }

    #[tokio::test]
    async fn test_stacks_success_without_height_is_pending() {
        let (tracker, query) = tracker(MockChainQuery::new());
        let tx_id = fixtures::tx_id(0x8a);
        query.set_stacks_tx(&tx_id, StacksTxStatus::Success, None);
        query.set_stacks_height(900);

        let status = tracker
            .check_status(&tx_id, ChainTag::Stacks, None)
            .await
            .unwrap();
        assert_eq!(status.state, BridgeState::Pending);
        assert_eq!(status.confirmations, 0);
        assert_eq!(status.failure_reason, None);
        assert_eq!(query.call_count("stacks_block_height"), 0);
    }

    #[tokio::test]
    async fn test_stacks_success_reaches_attesting() {
        let (tracker, query) = tracker(MockChainQuery::new());
        let tx_id = fixtures::tx_id(0x99);
        query.set_stacks_tx(&tx_id, StacksTxStatus::Success, Some(500));
        query.set_stacks_height(502);

        let status = tracker
            .check_status(&tx_id, ChainTag::Stacks, None)
            .await
            .unwrap();
        assert_eq!(status.confirmations, 3);
        assert_eq!(status.state, BridgeState::Attesting);
        assert_eq!(status.estimated_seconds_remaining, Some(25 * 60));
    }

    #[tokio::test]
    async fn test_stacks_mempool_and_dropped() {
        let (tracker, query) = tracker(MockChainQuery::new());
        let pending = fixtures::tx_id(0xaa);
        let dropped = fixtures::tx_id(0xbb);
        query.set_stacks_tx(&pending, StacksTxStatus::Pending, None);
        query.set_stacks_tx(
            &dropped,
            StacksTxStatus::Dropped("dropped_replace_by_fee".to_string()),
            None,
        );

        let status = tracker.check_status(&pending, ChainTag::Stacks, None).await.unwrap();
        assert_eq!(status.state, BridgeState::Pending);
        assert_eq!(query.call_count("stacks_block_height"), 0);

        let status = tracker.check_status(&dropped, ChainTag::Stacks, None).await.unwrap();
        assert_eq!(status.state, BridgeState::Failed);
        assert_eq!(status.failure_reason.as_deref(), Some("dropped_replace_by_fee"));
    }

    #[tokio::test]
    async fn test_poll_timeout() {
        let (tracker, _) = tracker(MockChainQuery::new().with_delay(Duration::from_secs(5)));
        let err = tracker
            .check_status(&fixtures::tx_id(0xcc), ChainTag::Ethereum, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BridgeError::ChainQuery(ChainQueryError::Timeout {
                chain: ChainTag::Ethereum,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_confirm_completion() {
        let (tracker, query) = tracker(MockChainQuery::new());
        query.set_evm_receipt(hash(0xdd), Some(1), true);
        query.set_evm_block(20);

        let attesting = tracker
            .check_status(&fixtures::tx_id(0xdd), ChainTag::Ethereum, None)
            .await
            .unwrap();
        assert_eq!(attesting.state, BridgeState::Attesting);

        let completed = tracker.confirm_completion(&attesting).unwrap();
        assert_eq!(completed.state, BridgeState::Completed);
        assert_eq!(completed.confirmations, attesting.confirmations);
        assert!(completed.state.is_terminal());
    }

    #[tokio::test]
    async fn test_confirm_completion_rejects_pending() {
        let (tracker, _) = tracker(MockChainQuery::new());
        let pending = tracker
            .check_status(&fixtures::tx_id(0xee), ChainTag::Ethereum, None)
            .await
            .unwrap();

        let err = tracker.confirm_completion(&pending).unwrap_err();
        assert!(matches!(
            err,
            StatusError::InvalidTransition {
                from: BridgeState::Pending,
                to: BridgeState::Completed,
                ..
            }
        ));
    }
}
