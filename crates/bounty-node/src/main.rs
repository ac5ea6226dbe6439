//! bounty-node: command-line front end for a local bounty ledger.
//!
//! Every invocation opens the ledger database in `--data-dir`, performs one
//! operation as the given caller, and exits. Identities are base-58 account
//! ids, or `@label` for a deterministic identity derived from a label.
//!
//! Usage:
//!   bounty-node init      --params <file> | --owner <id> --validator <id> [--low ..] [--deposit <n>]
//!   bounty-node identity  [--label <name>]
//!   bounty-node deposit   --from <id> --amount <n>
//!   bounty-node submit    --submitter <id> --description <text> --poc <text> --severity <sev>
//!   bounty-node update-status --caller <id> --report <n> --status <status> [--severity <sev>]
//!   bounty-node pay       --caller <id> --report <n>
//!   bounty-node report    --id <n>
//!   bounty-node status

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use bounty_core::{AccountId, Balance, LedgerEvent, ReportId, ReportStatus, Severity};
use bounty_genesis::{initialize_ledger, LedgerParams, RewardTierParams};
use bounty_state::{BountyLedger, StateDb};

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "bounty-node",
    version,
    about = "Bounty ledger: submit, review and pay vulnerability reports"
)]
struct Args {
    /// Directory for the persistent ledger database.
    #[arg(long, global = true, default_value = "~/.bounty/data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new ledger: owner, first validator, reward tiers, opening pool.
    Init {
        /// Ledger params JSON. When given, the other flags are ignored.
        #[arg(long)]
        params: Option<PathBuf>,
        #[arg(long, required_unless_present = "params")]
        owner: Option<String>,
        #[arg(long, required_unless_present = "params")]
        validator: Option<String>,
        /// Reward tiers; all four must be given together.
        #[arg(long, requires_all = ["medium", "high", "critical"])]
        low: Option<Balance>,
        #[arg(long, requires = "low")]
        medium: Option<Balance>,
        #[arg(long, requires = "low")]
        high: Option<Balance>,
        #[arg(long, requires = "low")]
        critical: Option<Balance>,
        /// Opening deposit made by the owner.
        #[arg(long)]
        deposit: Option<Balance>,
    },

    /// Print an account id: derived from --label, or freshly random.
    Identity {
        #[arg(long)]
        label: Option<String>,
    },

    /// Add funds to the reward pool.
    Deposit {
        #[arg(long)]
        from: String,
        #[arg(long)]
        amount: Balance,
    },

    /// File a vulnerability report.
    Submit {
        #[arg(long)]
        submitter: String,
        #[arg(long)]
        description: String,
        /// Proof of concept (opaque text).
        #[arg(long)]
        poc: String,
        /// low | medium | high | critical
        #[arg(long)]
        severity: Severity,
    },

    /// Move a report through review (validators only).
    UpdateStatus {
        #[arg(long)]
        caller: String,
        #[arg(long)]
        report: ReportId,
        /// submitted | under-review | accepted | rejected
        #[arg(long)]
        status: ReportStatus,
        /// Severity the reward is computed from when accepting.
        #[arg(long, default_value = "none")]
        severity: Severity,
    },

    /// Pay an accepted report's reward to its submitter (validators only).
    Pay {
        #[arg(long)]
        caller: String,
        #[arg(long)]
        report: ReportId,
    },

    /// Authorize a validator (owner only).
    AddValidator {
        #[arg(long)]
        caller: String,
        #[arg(long)]
        validator: String,
    },

    /// Revoke a validator (owner only).
    RemoveValidator {
        #[arg(long)]
        caller: String,
        #[arg(long)]
        validator: String,
    },

    /// Replace the reward schedule (owner only).
    SetTiers {
        #[arg(long)]
        caller: String,
        #[arg(long)]
        low: Balance,
        #[arg(long)]
        medium: Balance,
        #[arg(long)]
        high: Balance,
        #[arg(long)]
        critical: Balance,
    },

    /// Show one report.
    Report {
        #[arg(long)]
        id: ReportId,
    },

    /// List the report ids filed by a submitter.
    Submissions {
        #[arg(long)]
        submitter: String,
    },

    /// Amount paid out to an account.
    Balance {
        #[arg(long)]
        account: String,
    },

    /// Ledger summary: owner, validators, tiers, pool.
    Status,

    /// Dump the event log.
    Events {
        #[arg(long, default_value_t = 0)]
        from: u64,
    },
}

// ── Main ─────────────────────────────────────────────────────────────────────

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "warn,bounty_state=info,bounty_genesis=info";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    if let Command::Identity { label } = &args.command {
        let id = match label {
            Some(l) => AccountId::derive(l),
            None => AccountId::from_bytes(rand::random()),
        };
        println!("{id}");
        return Ok(());
    }

    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db = Arc::new(StateDb::open(&data_dir).context("opening ledger database")?);

    if let Command::Init { params, owner, validator, low, medium, high, critical, deposit } = args.command {
        let params = match params {
            Some(path) => load_params(&path)?,
            None => LedgerParams {
                owner: resolve_account(owner.as_deref().unwrap_or_default())?.to_b58(),
                validator: resolve_account(validator.as_deref().unwrap_or_default())?.to_b58(),
                reward_tiers: match (low, medium, high, critical) {
                    (Some(low), Some(medium), Some(high), Some(critical)) => {
                        Some(RewardTierParams { low, medium, high, critical })
                    }
                    _ => None,
                },
                initial_deposit: deposit,
            },
        };
        let ledger = initialize_ledger(db, &params).context("initializing ledger")?;
        println!("owner: {}", ledger.owner()?);
        println!("pool: {}", ledger.pool_balance()?);
        return Ok(());
    }

    let ledger = BountyLedger::open(db).context("opening ledger (run `init` first)")?;
    run(&ledger, args.command)?;
    ledger.flush()?;
    Ok(())
}

fn run(ledger: &BountyLedger, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Init { .. } | Command::Identity { .. } => bail!("handled before the ledger is opened"),

        Command::Deposit { from, amount } => {
            let pool = ledger.deposit(&resolve_account(&from)?, amount)?;
            println!("pool: {pool}");
        }

        Command::Submit { submitter, description, poc, severity } => {
            let now = chrono::Utc::now().timestamp();
            let id = ledger.submit(&resolve_account(&submitter)?, description, poc, severity, now)?;
            println!("report: {id}");
        }

        Command::UpdateStatus { caller, report, status, severity } => {
            ledger.update_status(&resolve_account(&caller)?, report, status, severity)?;
            let r = ledger.get_report(report)?;
            println!("status: {}", r.status);
            println!("reward: {}", r.reward);
        }

        Command::Pay { caller, report } => {
            let amount = ledger.pay_reward(&resolve_account(&caller)?, report)?;
            println!("paid: {amount}");
            println!("pool: {}", ledger.pool_balance()?);
        }

        Command::AddValidator { caller, validator } => {
            let v = resolve_account(&validator)?;
            ledger.add_validator(&resolve_account(&caller)?, &v)?;
            println!("validator added: {v}");
        }

        Command::RemoveValidator { caller, validator } => {
            let v = resolve_account(&validator)?;
            ledger.remove_validator(&resolve_account(&caller)?, &v)?;
            println!("validator removed: {v}");
        }

        Command::SetTiers { caller, low, medium, high, critical } => {
            ledger.update_reward_tiers(&resolve_account(&caller)?, low, medium, high, critical)?;
            println!("tiers: {low} {medium} {high} {critical}");
        }

        Command::Report { id } => {
            let r = ledger.get_report(id)?;
            println!("id: {}", r.id);
            println!("submitter: {}", r.submitter);
            println!("severity: {}", r.severity);
            println!("status: {}", r.status);
            println!("reward: {}", r.reward);
            println!("submitted_at: {}", format_time(r.submission_time));
            println!("description: {}", r.description);
            println!("proof_of_concept: {}", r.proof_of_concept);
        }

        Command::Submissions { submitter } => {
            let ids = ledger.get_submissions(&resolve_account(&submitter)?)?;
            let list: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            println!("submissions: [{}]", list.join(", "));
        }

        Command::Balance { account } => {
            println!("balance: {}", ledger.balance_of(&resolve_account(&account)?)?);
        }

        Command::Status => {
            let tiers = ledger.reward_tier()?;
            println!("owner: {}", ledger.owner()?);
            for v in ledger.validators()? {
                println!("validator: {v}");
            }
            println!(
                "tiers: {} {} {} {}",
                tiers.low(),
                tiers.medium(),
                tiers.high(),
                tiers.critical()
            );
            println!("reports: {}", ledger.report_count()?);
            println!("pool: {}", ledger.pool_balance()?);
            println!("total_paid: {}", ledger.total_paid()?);
        }

        Command::Events { from } => {
            for record in ledger.events_since(from)? {
                println!("{} {}", record.seq, describe_event(&record.event));
            }
        }
    }
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// `@label` derives a deterministic identity; anything else must be base-58.
fn resolve_account(s: &str) -> anyhow::Result<AccountId> {
    if let Some(label) = s.strip_prefix('@') {
        if label.is_empty() {
            bail!("empty identity label");
        }
        return Ok(AccountId::derive(label));
    }
    AccountId::from_b58(s).with_context(|| format!("invalid account id {s:?}"))
}

fn load_params(path: &Path) -> anyhow::Result<LedgerParams> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading ledger params from {}", path.display()))?;
    let params = serde_json::from_str(&json).context("parsing ledger params JSON")?;
    info!(path = %path.display(), "loaded ledger params");
    Ok(params)
}

fn describe_event(event: &LedgerEvent) -> String {
    match event {
        LedgerEvent::BugReported { report_id, submitter, severity } => {
            format!("BugReported report={report_id} submitter={submitter} severity={severity}")
        }
        LedgerEvent::ReportStatusUpdated { report_id, status } => {
            format!("ReportStatusUpdated report={report_id} status={status}")
        }
        LedgerEvent::RewardPaid { report_id, submitter, amount } => {
            format!("RewardPaid report={report_id} submitter={submitter} amount={amount}")
        }
        LedgerEvent::ValidatorAdded { validator } => format!("ValidatorAdded validator={validator}"),
        LedgerEvent::ValidatorRemoved { validator } => format!("ValidatorRemoved validator={validator}"),
        LedgerEvent::RewardTierUpdated { low, medium, high, critical } => {
            format!("RewardTierUpdated low={low} medium={medium} high={high} critical={critical}")
        }
        LedgerEvent::FundsDeposited { from, amount } => {
            format!("FundsDeposited from={from} amount={amount}")
        }
    }
}

fn format_time(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
