//! votekiosk: operator commands for a voting kiosk's data and its ledger.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use zeroize::Zeroizing;

use votekiosk_ballot::vote_statistics;
use votekiosk_content_store::ContentStore;
use votekiosk_kiosk::{
    KioskConfig, CHAIN_ID_VAR, CONTRACT_ADDRESS_VAR, PRIVATE_KEY_VAR, RPC_URL_VAR,
};
use votekiosk_ledger::{
    audit_records, BatchReport, JsonRpcLedger, LedgerTransactor, PhaseResult,
};
use votekiosk_store::{CommitStore, SecretStore};
use votekiosk_store_json::{JsonJournalStore, JsonVoteStore};
use votekiosk_types::{SystemClock, VoterId};
use votekiosk_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "votekiosk", about = "Voting kiosk operator tool")]
struct Cli {
    /// Path to the kiosk TOML configuration. Defaults apply when omitted.
    #[arg(long, env = "VOTEKIOSK_CONFIG")]
    config: Option<PathBuf>,

    /// Log output: "human" or "json".
    #[arg(long, env = "VOTEKIOSK_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "VOTEKIOSK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Ledger node JSON-RPC URL.
    #[arg(long, env = RPC_URL_VAR)]
    rpc_url: Option<String>,

    /// Election contract address.
    #[arg(long, env = CONTRACT_ADDRESS_VAR)]
    contract_address: Option<String>,

    /// EIP-155 chain id.
    #[arg(long, env = CHAIN_ID_VAR)]
    chain_id: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Probe the content store and report its identity and version.
    CheckStore,
    /// Load the vote stores and report commit/secret pairing problems.
    Validate,
    /// Print vote counts from the local stores.
    Stats,
    /// Print the effective configuration as TOML.
    ShowConfig,
    /// Election contract operations.
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
}

#[derive(clap::Subcommand)]
enum LedgerAction {
    /// Register the configured candidates, in id order.
    AddCandidates,
    /// Submit every staged commitment.
    Commit,
    /// Open the reveal phase.
    StartReveal,
    /// Reveal every staged vote.
    Reveal,
    /// Close the election.
    End,
    /// Print the contract's tallies.
    Results,
    /// Ask the contract whether a voter has committed.
    CheckVoted { voter_id: String },
}

fn load_config(cli: &Cli) -> anyhow::Result<KioskConfig> {
    let mut config = match &cli.config {
        Some(path) => KioskConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => KioskConfig::default(),
    };
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(url) = &cli.rpc_url {
        config.ledger.rpc_url = Some(url.clone());
    }
    if let Some(address) = &cli.contract_address {
        config.ledger.contract_address = Some(address.clone());
    }
    if let Some(chain_id) = cli.chain_id {
        config.ledger.chain_id = chain_id;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::CheckStore => check_store(&config).await,
        Command::Validate => validate(&config),
        Command::Stats => stats(&config),
        Command::ShowConfig => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Ledger { action } => ledger(&config, action).await,
    }
}

async fn check_store(config: &KioskConfig) -> anyhow::Result<()> {
    let client = config.ipfs_client();
    let identity = client
        .check_liveness()
        .await
        .with_context(|| format!("content store at {} is not reachable", client.api_url()))?;
    println!("node id: {}", identity.node_id);
    println!(
        "version: {}",
        identity.version.as_deref().unwrap_or("unknown")
    );
    Ok(())
}

fn validate(config: &KioskConfig) -> anyhow::Result<()> {
    let stores = JsonVoteStore::open(&config.votes_dir, config.strictness);
    let commits = stores.load_commits()?;
    let secrets = stores.load_secrets()?;

    let problems = audit_records(&commits.records, &secrets.records);
    println!(
        "{} commits, {} secrets",
        commits.records.len(),
        secrets.records.len()
    );
    for entry in commits.quarantined.iter().chain(&secrets.quarantined) {
        println!("quarantined {}: {}", entry.key, entry.reason);
    }
    for problem in &problems {
        println!("{}: {problem}", problem.code());
    }

    let bad = problems.len() + commits.quarantined.len() + secrets.quarantined.len();
    if bad > 0 {
        anyhow::bail!("{bad} record problems found");
    }
    println!("all records consistent");
    Ok(())
}

fn stats(config: &KioskConfig) -> anyhow::Result<()> {
    let stores = JsonVoteStore::open(&config.votes_dir, config.strictness);
    let commits = stores.load_commits()?;
    let secrets = stores.load_secrets()?;
    let stats = vote_statistics(&commits.records, &secrets.records);
    let candidates = config.candidate_registry();

    println!("total votes:    {}", stats.total_votes);
    println!("verified votes: {}", stats.verified_votes);
    for (id, count) in &stats.candidate_votes {
        let name = candidates.name(*id).unwrap_or("<unknown candidate>");
        println!("  {id:>3} {name}: {count}");
    }
    Ok(())
}

async fn ledger(config: &KioskConfig, action: LedgerAction) -> anyhow::Result<()> {
    let private_key = std::env::var(PRIVATE_KEY_VAR).ok().map(Zeroizing::new);
    let connection = config.ledger.resolve(private_key.as_ref())?;
    let client = JsonRpcLedger::new(connection.rpc_url)?;
    let transactor = LedgerTransactor::new(
        client,
        JsonVoteStore::open(&config.votes_dir, config.strictness),
        JsonJournalStore::new(&config.ledger.journal_file),
        connection.signer,
        connection.transactor,
        Arc::new(SystemClock),
    );
    tracing::info!(account = %transactor.account(), contract = %transactor.config().contract, "ledger connection ready");

    match action {
        LedgerAction::AddCandidates => {
            let names: Vec<String> = config
                .candidate_registry()
                .iter()
                .map(|c| c.name)
                .collect();
            print_phase("add candidates", transactor.add_candidates(&names).await?);
        }
        LedgerAction::StartReveal => {
            print_phase("start reveal", transactor.start_reveal_phase().await?);
        }
        LedgerAction::End => print_phase("end election", transactor.end_election().await?),
        LedgerAction::Commit => return print_batch("commit", transactor.commit_votes().await?),
        LedgerAction::Reveal => return print_batch("reveal", transactor.reveal_votes().await?),
        LedgerAction::Results => {
            for tally in transactor.results().await? {
                println!("{}: {}", tally.name, tally.votes);
            }
        }
        LedgerAction::CheckVoted { voter_id } => {
            let voter_id = VoterId::new(voter_id)?;
            let voted = transactor.check_if_voted(&voter_id).await?;
            println!("{voter_id}: {}", if voted { "committed" } else { "not committed" });
        }
    }
    Ok(())
}

fn print_phase(label: &str, result: PhaseResult) {
    match result {
        PhaseResult::Submitted(tx) => println!(
            "{label}: confirmed in {} after {} attempt(s)",
            tx.tx_hash,
            tx.attempts.len()
        ),
        PhaseResult::AlreadyRecorded(entry) => {
            println!("{label}: already recorded in {}", entry.tx_hash)
        }
    }
}

fn print_batch(label: &str, report: BatchReport) -> anyhow::Result<()> {
    for (voter, tx) in &report.confirmed {
        println!("{label} {voter}: {tx}");
    }
    for (voter, reason) in &report.skipped {
        println!("{label} {voter}: skipped ({reason:?})");
    }
    for (voter, error) in &report.failed {
        println!("{label} {voter}: FAILED {error}");
    }
    for problem in &report.rejected {
        println!("{label}: rejected {}: {problem}", problem.code());
    }
    for entry in &report.quarantined {
        println!("{label}: quarantined {}: {}", entry.key, entry.reason);
    }
    println!(
        "{label}: {} confirmed, {} skipped, {} failed, {} rejected",
        report.confirmed.len(),
        report.skipped.len(),
        report.failed.len(),
        report.rejected.len()
    );
    if !report.is_clean() {
        anyhow::bail!("{label} batch finished with problems");
    }
    Ok(())
}
