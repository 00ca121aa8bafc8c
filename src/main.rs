use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use croco_token::{
    format_units, parse_units, Address, CallOutput, CrocoToken, ReceiptId, TokenCall,
};

mod config;
mod store;

use config::CliConfig;
use store::StateStore;

//==================== Command line ====================//

#[derive(Parser, Debug)]
#[command(name = "croco", version)]
#[command(about = "Croco token ledger with multi-level referral bonuses")]
struct Cli {
    /// Path to croco.toml (defaults to ./croco.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ledger state file, overrides `state_path` from the config
    #[arg(short, long, value_name = "FILE")]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Signer {
    /// Account sending the call (0x-hex, or @label)
    #[arg(long = "caller", value_parser = parse_account)]
    caller: Address,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy a fresh ledger from the [token] section of the config
    Init {
        #[arg(long, value_parser = parse_account)]
        owner: Address,
        /// Replace an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Name, symbol, supply, roles and referral settings
    Info,
    Balance {
        #[arg(value_parser = parse_account)]
        account: Address,
    },
    Allowance {
        #[arg(value_parser = parse_account)]
        owner: Address,
        #[arg(value_parser = parse_account)]
        spender: Address,
    },
    Referrer {
        #[arg(value_parser = parse_account)]
        account: Address,
    },
    /// Size of the account's whole downline
    ReferredCount {
        #[arg(value_parser = parse_account)]
        account: Address,
    },
    /// Bonuses a purchase of AMOUNT by ACCOUNT would pay up its chain
    ReferralAmount {
        #[arg(value_parser = parse_account)]
        account: Address,
        amount: String,
    },
    Permils,
    /// Full state with its merkle root, as JSON
    Snapshot,
    /// Recorded events, oldest first
    Events {
        /// Only show the last N
        #[arg(long)]
        last: Option<usize>,
    },

    Mint {
        #[command(flatten)]
        signer: Signer,
        #[arg(value_parser = parse_account)]
        to: Address,
        amount: String,
    },
    Burn {
        #[command(flatten)]
        signer: Signer,
        amount: String,
    },
    Transfer {
        #[command(flatten)]
        signer: Signer,
        #[arg(value_parser = parse_account)]
        to: Address,
        amount: String,
    },
    Approve {
        #[command(flatten)]
        signer: Signer,
        #[arg(value_parser = parse_account)]
        spender: Address,
        /// Token amount, or `max` for an unlimited allowance
        amount: String,
    },
    TransferFrom {
        #[command(flatten)]
        signer: Signer,
        #[arg(value_parser = parse_account)]
        from: Address,
        #[arg(value_parser = parse_account)]
        to: Address,
        amount: String,
    },
    AddOperator {
        #[command(flatten)]
        signer: Signer,
        #[arg(value_parser = parse_account)]
        account: Address,
    },
    RemoveOperator {
        #[command(flatten)]
        signer: Signer,
        #[arg(value_parser = parse_account)]
        account: Address,
    },
    TransferOwnership {
        #[command(flatten)]
        signer: Signer,
        #[arg(value_parser = parse_account)]
        owner: Address,
    },
    /// Account bonuses are paid from; the zero address mints them instead
    SetPool {
        #[command(flatten)]
        signer: Signer,
        #[arg(value_parser = parse_account)]
        pool: Address,
    },
    ToggleReferral {
        #[command(flatten)]
        signer: Signer,
    },
    /// Per-level bonus shares in units of 1/10000
    SetPermils {
        #[command(flatten)]
        signer: Signer,
        #[arg(required = true, num_args = 1..)]
        permils: Vec<u32>,
    },
    /// Register REFERRER for USER unless USER already has one
    Refer {
        #[command(flatten)]
        signer: Signer,
        #[arg(value_parser = parse_account)]
        referrer: Address,
        #[arg(value_parser = parse_account)]
        user: Address,
    },
    /// Spend FROM's allowance to pay TO and reward TO's referral chain
    TransferReferral {
        #[command(flatten)]
        signer: Signer,
        #[arg(value_parser = parse_account)]
        from: Address,
        #[arg(value_parser = parse_account)]
        to: Address,
        amount: String,
        #[arg(value_parser = parse_account)]
        referrer: Address,
    },
    /// Apply a JSON array of calls as one all-or-nothing batch
    Apply {
        #[command(flatten)]
        signer: Signer,
        batch: PathBuf,
    },
}

/// `@name` derives a stable address from a label, anything else is hex.
fn parse_account(s: &str) -> Result<Address, String> {
    match s.strip_prefix('@') {
        Some(label) if !label.is_empty() => Ok(Address::from_label(label)),
        Some(_) => Err("empty account label".into()),
        None => s.parse().map_err(|e| format!("{e}")),
    }
}

fn parse_amount(s: &str, decimals: u8) -> Result<u128> {
    parse_units(s, decimals).with_context(|| format!("invalid amount {s:?}"))
}

//==================== Planning ====================//

/// What a command asks of the ledger once parsed against its decimals.
enum Plan {
    Print(String),
    Call { caller: Address, call: TokenCall },
    Batch { caller: Address, calls: Vec<TokenCall>, receipt: ReceiptId },
}

fn plan(command: Command, token: &CrocoToken) -> Result<Plan> {
    let decimals = token.decimals();
    let amount = |s: &str| parse_amount(s, decimals);
    let call = |signer: Signer, call: TokenCall| Plan::Call { caller: signer.caller, call };

    let plan = match command {
        Command::Init { .. } => bail!("init does not run against an existing ledger"),

        Command::Info => Plan::Print(describe(token)),
        Command::Balance { account } => Plan::Print(show_amount(token, token.balance_of(&account))),
        Command::Allowance { owner, spender } => {
            Plan::Print(show_amount(token, token.allowance(&owner, &spender)))
        }
        Command::Referrer { account } => Plan::Print(token.get_referrer(&account).to_string()),
        Command::ReferredCount { account } => {
            Plan::Print(token.get_referred_number(&account).to_string())
        }
        Command::ReferralAmount { account, amount: a } => {
            let bonuses = token.get_referral_amount(&account, amount(&a)?);
            Plan::Print(show_bonuses(token, &bonuses))
        }
        Command::Permils => Plan::Print(
            token
                .permils()
                .as_slice()
                .iter()
                .enumerate()
                .map(|(depth, p)| format!("level {}: {p}/10000", depth + 1))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Command::Snapshot => Plan::Print(serde_json::to_string_pretty(&token.snapshot())?),
        Command::Events { last } => {
            let events = token.events();
            let skip = last.map_or(0, |n| events.len().saturating_sub(n));
            let mut out = String::new();
            for event in &events[skip..] {
                writeln!(out, "{}", serde_json::to_string(event)?)?;
            }
            Plan::Print(out.trim_end().to_string())
        }

        Command::Mint { signer, to, amount: a } => {
            call(signer, TokenCall::Mint { to, amount: amount(&a)? })
        }
        Command::Burn { signer, amount: a } => call(signer, TokenCall::Burn { amount: amount(&a)? }),
        Command::Transfer { signer, to, amount: a } => {
            call(signer, TokenCall::Transfer { to, amount: amount(&a)? })
        }
        Command::Approve { signer, spender, amount: a } => {
            let amount = if a.eq_ignore_ascii_case("max") { u128::MAX } else { amount(&a)? };
            call(signer, TokenCall::Approve { spender, amount })
        }
        Command::TransferFrom { signer, from, to, amount: a } => {
            call(signer, TokenCall::TransferFrom { from, to, amount: amount(&a)? })
        }
        Command::AddOperator { signer, account } => call(signer, TokenCall::AddOperator { account }),
        Command::RemoveOperator { signer, account } => {
            call(signer, TokenCall::RemoveOperator { account })
        }
        Command::TransferOwnership { signer, owner } => {
            call(signer, TokenCall::TransferOwnership { owner })
        }
        Command::SetPool { signer, pool } => call(signer, TokenCall::SetReferralPool { pool }),
        Command::ToggleReferral { signer } => call(signer, TokenCall::ToggleReferralActive),
        Command::SetPermils { signer, permils } => {
            call(signer, TokenCall::SetReferralPermils { permils })
        }
        Command::Refer { signer, referrer, user } => {
            call(signer, TokenCall::AddOrGetReferrer { referrer, user })
        }
        Command::TransferReferral { signer, from, to, amount: a, referrer } => call(
            signer,
            TokenCall::TransferReferral { from, to, amount: amount(&a)?, referrer },
        ),
        Command::Apply { signer, batch } => {
            let bytes = fs::read(&batch)
                .with_context(|| format!("cannot read batch {}", batch.display()))?;
            let calls: Vec<TokenCall> = serde_json::from_slice(&bytes)
                .with_context(|| format!("invalid batch {}", batch.display()))?;
            Plan::Batch {
                caller: signer.caller,
                calls,
                receipt: ReceiptId::digest(&bytes),
            }
        }
    };
    Ok(plan)
}

//==================== Output ====================//

fn show_amount(token: &CrocoToken, amount: u128) -> String {
    format!("{} {}", format_units(amount, token.decimals()), token.symbol())
}

fn show_bonuses(token: &CrocoToken, bonuses: &[croco_token::ReferralBonus<Address>]) -> String {
    if bonuses.is_empty() {
        return "no referrer".to_string();
    }
    bonuses
        .iter()
        .map(|b| format!("level {}: {} → {}", b.depth + 1, show_amount(token, b.bonus), b.to))
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe(token: &CrocoToken) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "name:            {} ({})", token.name(), token.symbol());
    let _ = writeln!(out, "decimals:        {}", token.decimals());
    let _ = writeln!(out, "total supply:    {}", show_amount(token, token.total_supply()));
    let _ = writeln!(out, "owner:           {}", token.owner());
    for operator in token.roles().operators() {
        let _ = writeln!(out, "operator:        {operator}");
    }
    let _ = writeln!(out, "referral pool:   {}", token.referral_pool());
    let _ = writeln!(out, "referral active: {}", token.referral_active());
    let _ = writeln!(out, "permils:         {:?}", token.permils().as_slice());
    let _ = writeln!(out, "referral edges:  {}", token.referrals().len());
    let _ = write!(out, "height:          {}", token.height());
    out
}

fn show_output(token: &CrocoToken, output: &CallOutput) -> String {
    match output {
        CallOutput::Done => format!("ok (height {})", token.height()),
        CallOutput::Referrer { referrer } => format!("referrer: {referrer}"),
        CallOutput::ReferralActive { active } => format!("referral active: {active}"),
        CallOutput::Bonuses { bonuses } => show_bonuses(token, bonuses),
    }
}

//==================== Main ====================//

fn run(cli: Cli) -> Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let store = StateStore::new(cli.state.unwrap_or(config.state_path));

    if let Command::Init { owner, force } = cli.command {
        let token = CrocoToken::new(owner, config.token).context("invalid [token] config")?;
        store.create(&token, force)?;
        info!("deployed {} owned by {}", token.symbol(), owner);
        println!("ledger {} ({}) → {}", token.name(), token.symbol(), store.path().display());
        return Ok(());
    }

    let mut token = store.load()?;
    match plan(cli.command, &token)? {
        Plan::Print(text) => println!("{text}"),
        Plan::Call { caller, call } => {
            let output = token
                .execute(caller, &call)
                .with_context(|| format!("call from {caller} rejected"))?;
            store.save(&token)?;
            println!("{}", show_output(&token, &output));
        }
        Plan::Batch { caller, calls, receipt } => {
            let outputs = token
                .apply_calls(caller, &calls, receipt)
                .with_context(|| format!("batch {receipt} rejected"))?;
            store.save(&token)?;
            for output in &outputs {
                println!("{}", show_output(&token, output));
            }
            println!("batch {receipt} applied → {}", store.path().display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    run(Cli::parse())
}
