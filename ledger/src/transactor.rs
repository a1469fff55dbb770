//! The ledger transactor: batch submission of staged votes.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use votekiosk_store::{
    CommitStore, JournalEntry, JournalEvent, JournalStore, QuarantinedEntry, SecretStore,
};
use votekiosk_types::{Clock, TxHash, VoterId};

use crate::abi::{self, Token};
use crate::reconcile::reconcile;
use crate::{
    Address, AttemptStatus, LedgerClient, LedgerError, LedgerSigner, LegacyTransaction, Receipt,
    RetryPolicy, RevealError, TransactionAttempt,
};

/// Fallback gas price when the node cannot report one: 20 gwei.
pub const FALLBACK_GAS_PRICE_WEI: u128 = 20_000_000_000;

#[derive(Clone, Debug)]
pub struct TransactorConfig {
    pub contract: Address,
    pub chain_id: u64,
    pub gas_limit: u64,
    /// Percentage added on top of the node's gas price.
    pub gas_price_buffer_percent: u32,
    pub fallback_gas_price: u128,
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub retry: RetryPolicy,
}

impl TransactorConfig {
    /// Defaults for the Polygon Amoy test network.
    pub fn new(contract: Address) -> Self {
        Self {
            contract,
            chain_id: 80002,
            gas_limit: 500_000,
            gas_price_buffer_percent: 10,
            fallback_gas_price: FALLBACK_GAS_PRICE_WEI,
            receipt_timeout: Duration::from_secs(120),
            receipt_poll_interval: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

/// A contract call that made it on-ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedTransaction {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub attempts: Vec<TransactionAttempt>,
}

/// Outcome of a once-per-election call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhaseResult {
    Submitted(SubmittedTransaction),
    /// The journal already holds a confirmation; nothing was sent.
    AlreadyRecorded(JournalEntry),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyJournaled,
    /// `checkIfVoted` is already true for the voter.
    AlreadyOnLedger,
}

/// Per-voter outcome of a commit or reveal batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub confirmed: Vec<(VoterId, TxHash)>,
    pub skipped: Vec<(VoterId, SkipReason)>,
    /// Transactions that exhausted their retries.
    pub failed: Vec<(VoterId, String)>,
    /// Integrity failures found before submission.
    pub rejected: Vec<RevealError>,
    pub quarantined: Vec<QuarantinedEntry>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.rejected.is_empty() && self.quarantined.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateTally {
    pub name: String,
    pub votes: u64,
}

/// Submits staged commitments and secrets to the election contract.
pub struct LedgerTransactor<L, S, J> {
    client: L,
    stores: S,
    journal: J,
    signer: LedgerSigner,
    config: TransactorConfig,
    clock: Arc<dyn Clock>,
}

impl<L, S, J> LedgerTransactor<L, S, J>
where
    L: LedgerClient,
    S: CommitStore + SecretStore,
    J: JournalStore,
{
    pub fn new(
        client: L,
        stores: S,
        journal: J,
        signer: LedgerSigner,
        config: TransactorConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            stores,
            journal,
            signer,
            config,
            clock,
        }
    }

    pub fn account(&self) -> Address {
        self.signer.address()
    }

    pub fn config(&self) -> &TransactorConfig {
        &self.config
    }

    pub async fn add_candidates(&self, names: &[String]) -> Result<PhaseResult, LedgerError> {
        if names.is_empty() {
            return Err(LedgerError::NoStagedRecords("candidate names"));
        }
        let data = abi::encode_call(abi::ADD_CANDIDATES, &[Token::StringArray(names.to_vec())]);
        self.run_phase("addCandidates", data, JournalEvent::CandidatesAdded, |j| {
            j.candidates_added.clone()
        })
        .await
    }

    pub async fn start_reveal_phase(&self) -> Result<PhaseResult, LedgerError> {
        let data = abi::encode_call(abi::START_REVEAL_PHASE, &[]);
        self.run_phase("startRevealPhase", data, JournalEvent::RevealPhaseStarted, |j| {
            j.reveal_started.clone()
        })
        .await
    }

    pub async fn end_election(&self) -> Result<PhaseResult, LedgerError> {
        let data = abi::encode_call(abi::END_ELECTION, &[]);
        self.run_phase("endElection", data, JournalEvent::ElectionEnded, |j| {
            j.election_ended.clone()
        })
        .await
    }

    /// Submit `commitVoteFor` for every staged commit not yet on-ledger.
    ///
    /// The commit store is re-read before each voter so records added while
    /// the batch runs are picked up. A voter whose transaction fails is
    /// reported and the batch moves on.
    pub async fn commit_votes(&self) -> Result<BatchReport, LedgerError> {
        let initial = self.stores.load_commits()?;
        if initial.records.is_empty() {
            return Err(LedgerError::NoStagedRecords("staged commits"));
        }

        let mut report = BatchReport {
            quarantined: initial.quarantined,
            ..Default::default()
        };
        let mut seen = BTreeSet::new();

        loop {
            let current = self.stores.load_commits()?;
            let Some((voter, commit)) = current
                .records
                .into_iter()
                .find(|(voter, _)| !seen.contains(voter))
            else {
                break;
            };
            seen.insert(voter.clone());

            if self.journal.load_journal()?.is_committed(&voter) {
                report.skipped.push((voter, SkipReason::AlreadyJournaled));
                continue;
            }
            match self.check_if_voted(&voter).await {
                Ok(true) => {
                    tracing::info!(voter_id = %voter, "commit already on ledger; skipping");
                    report.skipped.push((voter, SkipReason::AlreadyOnLedger));
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(voter_id = %voter, error = %e, "checkIfVoted failed; submitting anyway");
                }
            }

            let data = abi::encode_call(
                abi::COMMIT_VOTE_FOR,
                &[
                    Token::Bytes32(*commit.vote_hash.as_bytes()),
                    Token::String(commit.content_cid.to_string()),
                    Token::String(voter.to_string()),
                ],
            );
            match self.submit("commitVoteFor", data).await {
                Ok(tx) => {
                    self.journal_confirmed(JournalEvent::CommitConfirmed(voter.clone()), &tx)?;
                    tracing::info!(voter_id = %voter, tx = %tx.tx_hash, "commit confirmed");
                    report.confirmed.push((voter, tx.tx_hash));
                }
                Err(e) => {
                    tracing::error!(voter_id = %voter, error = %e, "commit submission failed");
                    report.failed.push((voter, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Submit `revealVote` for every voter whose commit and secret reconcile.
    ///
    /// Requires a journalled `startRevealPhase`. Voters with a missing half
    /// or a secret that does not open the commit are excluded and reported.
    pub async fn reveal_votes(&self) -> Result<BatchReport, LedgerError> {
        if !self.journal.load_journal()?.reveal_phase_open() {
            return Err(LedgerError::RevealPhaseNotStarted);
        }
        let initial = self.stores.load_secrets()?;
        if initial.records.is_empty() {
            return Err(LedgerError::NoStagedRecords("staged secrets"));
        }

        let mut report = BatchReport {
            quarantined: initial.quarantined,
            ..Default::default()
        };
        let mut seen = BTreeSet::new();

        loop {
            let commits = self.stores.load_commits()?;
            let secrets = self.stores.load_secrets()?;
            let Some(voter) = commits
                .records
                .keys()
                .chain(secrets.records.keys())
                .filter(|voter| !seen.contains(*voter))
                .min()
                .cloned()
            else {
                break;
            };
            seen.insert(voter.clone());

            let plan = match reconcile(
                &voter,
                commits.records.get(&voter),
                secrets.records.get(&voter),
            ) {
                Ok(plan) => plan,
                Err(e) => {
                    tracing::error!(voter_id = %voter, code = e.code(), error = %e, "reveal excluded");
                    report.rejected.push(e);
                    continue;
                }
            };

            if self.journal.load_journal()?.is_revealed(&voter) {
                report.skipped.push((voter, SkipReason::AlreadyJournaled));
                continue;
            }

            let data = abi::encode_call(
                abi::REVEAL_VOTE,
                &[
                    Token::Bytes32(*plan.vote_hash.as_bytes()),
                    Token::String(plan.candidate_id.to_string()),
                    Token::String(plan.secret.expose().to_string()),
                ],
            );
            match self.submit("revealVote", data).await {
                Ok(tx) => {
                    self.journal_confirmed(JournalEvent::RevealConfirmed(voter.clone()), &tx)?;
                    tracing::info!(voter_id = %voter, tx = %tx.tx_hash, "reveal confirmed");
                    report.confirmed.push((voter, tx.tx_hash));
                }
                Err(e) => {
                    tracing::error!(voter_id = %voter, error = %e, "reveal submission failed");
                    report.failed.push((voter, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// `checkIfVoted(voterId)` on the contract.
    pub async fn check_if_voted(&self, voter_id: &VoterId) -> Result<bool, LedgerError> {
        let data = abi::encode_call(abi::CHECK_IF_VOTED, &[Token::String(voter_id.to_string())]);
        let output = self.client.call(&self.config.contract, &data).await?;
        abi::decode_bool(&output)
    }

    /// `getResults()` on the contract.
    pub async fn results(&self) -> Result<Vec<CandidateTally>, LedgerError> {
        let data = abi::encode_call(abi::GET_RESULTS, &[]);
        let output = self.client.call(&self.config.contract, &data).await?;
        let (names, counts) = abi::decode_results(&output)?;
        if names.len() != counts.len() {
            return Err(LedgerError::Abi(format!(
                "{} names but {} counts",
                names.len(),
                counts.len()
            )));
        }
        Ok(names
            .into_iter()
            .zip(counts)
            .map(|(name, votes)| CandidateTally { name, votes })
            .collect())
    }

    async fn run_phase(
        &self,
        label: &'static str,
        data: Vec<u8>,
        event: JournalEvent,
        recorded: impl Fn(&votekiosk_store::LedgerJournal) -> Option<JournalEntry>,
    ) -> Result<PhaseResult, LedgerError> {
        if let Some(entry) = recorded(&self.journal.load_journal()?) {
            tracing::info!(call = label, tx = %entry.tx_hash, "already confirmed; not resubmitting");
            return Ok(PhaseResult::AlreadyRecorded(entry));
        }
        let tx = self.submit(label, data).await?;
        self.journal_confirmed(event, &tx)?;
        tracing::info!(call = label, tx = %tx.tx_hash, "confirmed");
        Ok(PhaseResult::Submitted(tx))
    }

    fn journal_confirmed(
        &self,
        event: JournalEvent,
        tx: &SubmittedTransaction,
    ) -> Result<(), LedgerError> {
        self.journal.record(
            event,
            JournalEntry {
                tx_hash: tx.tx_hash,
                confirmed_at: self.clock.now(),
                block_number: tx.block_number,
            },
        )?;
        Ok(())
    }

    /// Get one contract call mined, retrying under the policy.
    ///
    /// Each attempt fetches a fresh nonce and gas price. Before a retry, the
    /// receipts of every hash broadcast so far are checked once more, so a
    /// transaction that landed late ends the loop instead of being sent
    /// again.
    async fn submit(
        &self,
        label: &'static str,
        data: Vec<u8>,
    ) -> Result<SubmittedTransaction, LedgerError> {
        let policy = self.config.retry;
        let mut attempts: Vec<TransactionAttempt> = Vec::new();
        let mut last_error = String::new();

        for attempt in 1..=policy.max_attempts {
            if attempt > 1 {
                let delay = policy.delay_after(attempt - 1);
                tracing::warn!(call = label, attempt, ?delay, error = %last_error, "retrying transaction");
                tokio::time::sleep(delay).await;

                if let Some(receipt) = self.find_landed(&attempts).await {
                    for a in &mut attempts {
                        if a.tx_hash == Some(receipt.tx_hash) {
                            a.status = AttemptStatus::Confirmed;
                        }
                    }
                    return Ok(SubmittedTransaction {
                        tx_hash: receipt.tx_hash,
                        block_number: receipt.block_number,
                        attempts,
                    });
                }
            }

            let mut record = TransactionAttempt {
                nonce: 0,
                gas_price: 0,
                retry_count: attempt - 1,
                status: AttemptStatus::Pending,
                tx_hash: None,
            };
            let outcome = self.attempt_once(label, &data, &mut record).await;
            match outcome {
                Ok(receipt) => {
                    record.status = AttemptStatus::Confirmed;
                    attempts.push(record);
                    return Ok(SubmittedTransaction {
                        tx_hash: receipt.tx_hash,
                        block_number: receipt.block_number,
                        attempts,
                    });
                }
                Err(e) => {
                    record.status = AttemptStatus::Failed;
                    attempts.push(record);
                    last_error = e.to_string();
                }
            }
        }

        tracing::error!(call = label, attempts = policy.max_attempts, error = %last_error, "transaction failed");
        Err(LedgerError::TransactionFailed {
            attempts: policy.max_attempts,
            last_error,
        })
    }

    async fn attempt_once(
        &self,
        label: &'static str,
        data: &[u8],
        record: &mut TransactionAttempt,
    ) -> Result<Receipt, LedgerError> {
        let nonce = self.client.transaction_count(&self.signer.address()).await?;
        record.nonce = nonce;

        let base_price = match self.client.gas_price().await {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!(error = %e, "gas price unavailable; using fallback");
                self.config.fallback_gas_price
            }
        };
        let gas_price =
            base_price.saturating_mul(100 + u128::from(self.config.gas_price_buffer_percent)) / 100;
        record.gas_price = gas_price;

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit: self.config.gas_limit,
            to: self.config.contract,
            value: 0,
            data: data.to_vec(),
            chain_id: self.config.chain_id,
        };
        let signed = tx.sign(&self.signer)?;
        tracing::debug!(call = label, nonce, gas_price, tx = %signed.hash, "broadcasting transaction");

        let hash = self.client.send_raw_transaction(&signed.raw).await?;
        record.tx_hash = Some(hash);

        let receipt = self.await_receipt(&hash).await?;
        if !receipt.success {
            return Err(LedgerError::Reverted(hash.to_string()));
        }
        Ok(receipt)
    }

    async fn await_receipt(&self, hash: &TxHash) -> Result<Receipt, LedgerError> {
        let deadline = Instant::now() + self.config.receipt_timeout;
        loop {
            match self.client.transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                Err(e) => tracing::debug!(tx = %hash, error = %e, "receipt poll failed"),
            }
            if Instant::now() >= deadline {
                return Err(LedgerError::Timeout(format!(
                    "no receipt for {hash} within {:?}",
                    self.config.receipt_timeout
                )));
            }
            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
    }

    async fn find_landed(&self, attempts: &[TransactionAttempt]) -> Option<Receipt> {
        for hash in attempts.iter().filter_map(|a| a.tx_hash) {
            if let Ok(Some(receipt)) = self.client.transaction_receipt(&hash).await {
                if receipt.success {
                    tracing::info!(tx = %hash, "earlier broadcast was mined; not resubmitting");
                    return Some(receipt);
                }
            }
        }
        None
    }
}
