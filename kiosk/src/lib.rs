//! The voting kiosk.
//!
//! Ties the pieces together for one unattended kiosk:
//! - Loads configuration and the registration data
//! - Refuses voters while the content store is unreachable
//! - Runs each verification session on a blocking worker with freshly
//!   opened devices
//! - Hands the verified voter's choice to the vote commitment engine

pub mod config;
pub mod error;
pub mod kiosk;
pub mod metrics;
pub mod shutdown;

pub use config::{
    ContentStoreSettings, KioskConfig, LedgerConnection, LedgerSettings, SessionSettings,
    CHAIN_ID_VAR, CONTRACT_ADDRESS_VAR, PRIVATE_KEY_VAR, RPC_URL_VAR,
};
pub use error::KioskError;
pub use kiosk::{Kiosk, VerificationParts, VisitOutcome};
pub use metrics::KioskMetrics;
pub use shutdown::ShutdownController;
