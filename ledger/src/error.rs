use thiserror::Error;
use votekiosk_store::StoreError;
use votekiosk_types::VoterId;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("timed out: {0}")]
    Timeout(String),

    /// The transaction was mined with a failed status.
    #[error("transaction {0} reverted")]
    Reverted(String),

    #[error("transaction failed after {attempts} attempts: {last_error}")]
    TransactionFailed { attempts: u32, last_error: String },

    #[error("reveal phase has not been started")]
    RevealPhaseNotStarted,

    #[error("nothing to submit: no {0}")]
    NoStagedRecords(&'static str),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a single voter's reveal was excluded from a batch.
///
/// These are integrity failures: they are reported and never corrected
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevealError {
    #[error("secret for voter {0} has no matching commit")]
    MissingCommit(VoterId),

    #[error("commit for voter {0} has no matching secret")]
    MissingSecret(VoterId),

    #[error("secret for voter {0} does not open the committed hash")]
    HashMismatch(VoterId),

    #[error("inconsistent records for voter {voter}: {reason}")]
    Malformed { voter: VoterId, reason: String },
}

impl RevealError {
    /// Stable short code for logs and operator reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCommit(_) => "E_MISSING_COMMIT",
            Self::MissingSecret(_) => "E_MISSING_SECRET",
            Self::HashMismatch(_) => "E_HASH_MISMATCH",
            Self::Malformed { .. } => "E_MALFORMED",
        }
    }

    pub fn voter(&self) -> &VoterId {
        match self {
            Self::MissingCommit(v) | Self::MissingSecret(v) | Self::HashMismatch(v) => v,
            Self::Malformed { voter, .. } => voter,
        }
    }
}
