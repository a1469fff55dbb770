//! Kiosk configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::Zeroizing;

use votekiosk_content_store::{IpfsClient, DEFAULT_API_URL};
use votekiosk_ledger::{Address, LedgerError, LedgerSigner, RetryPolicy, TransactorConfig};
use votekiosk_store::Strictness;
use votekiosk_types::{Candidate, CandidateRegistry, ElectionId};
use votekiosk_utils::LogFormat;
use votekiosk_verification::{EuclideanFaceMatcher, SessionConfig, DEFAULT_FACE_TOLERANCE};

use crate::KioskError;

/// Environment variable holding the ledger signing key.
pub const PRIVATE_KEY_VAR: &str = "VOTEKIOSK_PRIVATE_KEY";
pub const RPC_URL_VAR: &str = "VOTEKIOSK_RPC_URL";
pub const CONTRACT_ADDRESS_VAR: &str = "VOTEKIOSK_CONTRACT_ADDRESS";
pub const CHAIN_ID_VAR: &str = "VOTEKIOSK_CHAIN_ID";

/// Configuration for a voting kiosk and its ledger batch jobs.
///
/// Can be loaded from a TOML file via [`KioskConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). The signing key is never part
/// of this struct.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KioskConfig {
    #[serde(default)]
    pub election_id: ElectionId,

    /// Root of the kiosk's local data.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding `commit.json` and `secrets.json`.
    #[serde(default = "default_data_dir")]
    pub votes_dir: PathBuf,

    /// Registered voters, written by the registration station.
    #[serde(default = "default_voters_file")]
    pub voters_file: PathBuf,

    #[serde(default = "default_face_db_file")]
    pub face_db_file: PathBuf,

    /// What to do with malformed commit or secret entries.
    #[serde(default)]
    pub strictness: Strictness,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub candidates: Vec<Candidate>,

    #[serde(default)]
    pub content_store: ContentStoreSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentStoreSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_card_poll_timeout_ms")]
    pub card_poll_timeout_ms: u64,
    #[serde(default = "default_fingerprint_timeout_secs")]
    pub fingerprint_timeout_secs: u64,
    #[serde(default = "default_max_session_secs")]
    pub max_session_secs: u64,
    #[serde(default = "default_max_factor_attempts")]
    pub max_factor_attempts: u32,
    #[serde(default = "default_face_tolerance")]
    pub face_tolerance: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerSettings {
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    #[serde(default = "default_gas_price_buffer_percent")]
    pub gas_price_buffer_percent: u32,
    #[serde(default = "default_fallback_gas_price_wei")]
    pub fallback_gas_price_wei: u64,
    /// Journal of confirmed ledger transactions.
    #[serde(default = "default_journal_file")]
    pub journal_file: PathBuf,
}

/// Everything needed to talk to the election contract.
#[derive(Debug)]
pub struct LedgerConnection {
    pub rpc_url: String,
    pub signer: LedgerSigner,
    pub transactor: TransactorConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_voters_file() -> PathBuf {
    PathBuf::from("data/voters.json")
}

fn default_face_db_file() -> PathBuf {
    PathBuf::from("data/face_encodings.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_card_poll_timeout_ms() -> u64 {
    500
}

fn default_fingerprint_timeout_secs() -> u64 {
    10
}

fn default_max_session_secs() -> u64 {
    180
}

fn default_max_factor_attempts() -> u32 {
    3
}

fn default_face_tolerance() -> f64 {
    DEFAULT_FACE_TOLERANCE
}

fn default_chain_id() -> u64 {
    80002
}

fn default_gas_limit() -> u64 {
    500_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_receipt_timeout_secs() -> u64 {
    120
}

fn default_receipt_poll_interval_ms() -> u64 {
    1000
}

fn default_gas_price_buffer_percent() -> u32 {
    10
}

fn default_fallback_gas_price_wei() -> u64 {
    20_000_000_000
}

fn default_journal_file() -> PathBuf {
    PathBuf::from("data/ledger_journal.json")
}

// ── Impl ───────────────────────────────────────────────────────────────

impl KioskConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, KioskError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KioskError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, KioskError> {
        let config: Self = toml::from_str(s).map_err(|e| KioskError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, KioskError> {
        toml::to_string_pretty(self).map_err(|e| KioskError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<(), KioskError> {
        let registry = self.candidate_registry();
        if registry.len() != self.candidates.len() {
            return Err(KioskError::Config("candidate ids must be unique".into()));
        }
        let tolerance = self.session.face_tolerance;
        if tolerance.is_nan() || tolerance <= 0.0 {
            return Err(KioskError::Config(format!(
                "face_tolerance must be positive, got {tolerance}"
            )));
        }
        Ok(())
    }

    pub fn candidate_registry(&self) -> CandidateRegistry {
        CandidateRegistry::new(self.candidates.iter().cloned())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            card_poll_timeout: Duration::from_millis(self.session.card_poll_timeout_ms),
            fingerprint_timeout: Duration::from_secs(self.session.fingerprint_timeout_secs),
            max_session_secs: self.session.max_session_secs,
            max_factor_attempts: self.session.max_factor_attempts,
        }
    }

    pub fn face_matcher(&self) -> EuclideanFaceMatcher {
        EuclideanFaceMatcher::new(self.session.face_tolerance)
    }

    pub fn ipfs_client(&self) -> IpfsClient {
        IpfsClient::with_timeouts(
            self.content_store.api_url.clone(),
            Duration::from_secs(self.content_store.request_timeout_secs),
            Duration::from_secs(self.content_store.probe_timeout_secs),
        )
    }
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            election_id: ElectionId::default(),
            data_dir: default_data_dir(),
            votes_dir: default_data_dir(),
            voters_file: default_voters_file(),
            face_db_file: default_face_db_file(),
            strictness: Strictness::default(),
            candidates: Vec::new(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            content_store: ContentStoreSettings::default(),
            session: SessionSettings::default(),
            ledger: LedgerSettings::default(),
        }
    }
}

impl Default for ContentStoreSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            card_poll_timeout_ms: default_card_poll_timeout_ms(),
            fingerprint_timeout_secs: default_fingerprint_timeout_secs(),
            max_session_secs: default_max_session_secs(),
            max_factor_attempts: default_max_factor_attempts(),
            face_tolerance: default_face_tolerance(),
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            rpc_url: None,
            contract_address: None,
            chain_id: default_chain_id(),
            gas_limit: default_gas_limit(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            gas_price_buffer_percent: default_gas_price_buffer_percent(),
            fallback_gas_price_wei: default_fallback_gas_price_wei(),
            journal_file: default_journal_file(),
        }
    }
}

impl LedgerSettings {
    /// Combine these settings with the signing key into a connection.
    ///
    /// Every missing required value is named in a single error.
    pub fn resolve(
        &self,
        private_key: Option<&Zeroizing<String>>,
    ) -> Result<LedgerConnection, LedgerError> {
        let private_key = private_key.filter(|k| !k.trim().is_empty());
        let rpc_url = self.rpc_url.as_deref().filter(|u| !u.trim().is_empty());
        let contract = self
            .contract_address
            .as_deref()
            .filter(|a| !a.trim().is_empty());

        let mut missing = Vec::new();
        if private_key.is_none() {
            missing.push(PRIVATE_KEY_VAR);
        }
        if rpc_url.is_none() {
            missing.push(RPC_URL_VAR);
        }
        if contract.is_none() {
            missing.push(CONTRACT_ADDRESS_VAR);
        }
        let (Some(private_key), Some(rpc_url), Some(contract)) = (private_key, rpc_url, contract)
        else {
            return Err(LedgerError::Config(format!(
                "missing ledger settings: {}",
                missing.join(", ")
            )));
        };

        let signer = LedgerSigner::from_hex(private_key)?;
        let contract: Address = contract.parse()?;
        let transactor = TransactorConfig {
            contract,
            chain_id: self.chain_id,
            gas_limit: self.gas_limit,
            gas_price_buffer_percent: self.gas_price_buffer_percent,
            fallback_gas_price: u128::from(self.fallback_gas_price_wei),
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
            retry: RetryPolicy::new(
                self.max_attempts,
                Duration::from_millis(self.retry_base_delay_ms),
            ),
        };
        Ok(LedgerConnection {
            rpc_url: rpc_url.to_string(),
            signer,
            transactor,
        })
    }
}
