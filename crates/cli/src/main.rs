mod config;
mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use identity::{AccountId, Directory, ResolverSession};
use predicate::{
    ApprovalContext, Evaluator, PatchSet, PatchSetApproval, PatchSetId, Predicate, simplify,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "rulecheck.toml";

#[derive(Parser)]
#[command(name = "rulecheck")]
#[command(about = "Evaluate approval rules against a group directory", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Directory file, overriding the config
    #[arg(short, long, global = true)]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a rule against one approval
    Eval {
        /// Rule file (JSON predicate tree)
        #[arg(short, long)]
        rule: PathBuf,
        /// Uploader of the patch set
        #[arg(long)]
        uploader: AccountId,
        #[arg(long, default_value = "1")]
        change: u32,
        #[arg(long, default_value = "1")]
        patch_set: u32,
        /// Account that cast the vote
        #[arg(long, requires = "value")]
        approver: Option<AccountId>,
        #[arg(long, default_value = "Code-Review")]
        label: String,
        #[arg(long, requires = "approver", allow_negative_numbers = true)]
        value: Option<i16>,
    },
    /// Print a rule in simplified form
    Simplify {
        /// Rule file (JSON predicate tree)
        #[arg(short, long)]
        rule: PathBuf,
    },
    /// Show the effective groups of an account
    Groups { account: AccountId },
    /// List the SSH keys of an account
    Keys { account: AccountId },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Eval {
            rule,
            uploader,
            change,
            patch_set,
            approver,
            label,
            value,
        } => {
            let mut ctx = ApprovalContext::new(PatchSet {
                id: PatchSetId {
                    change,
                    number: patch_set,
                },
                uploader,
            });
            if let (Some(account_id), Some(value)) = (approver, value) {
                ctx = ctx.with_approval(PatchSetApproval {
                    account_id,
                    label,
                    value,
                });
            }
            let directory = load_directory(&config, cli.directory)?;
            cmd_eval(&config, directory, &rule, &ctx).await
        }
        Commands::Simplify { rule } => cmd_simplify(&rule),
        Commands::Groups { account } => {
            let directory = load_directory(&config, cli.directory)?;
            cmd_groups(&config, directory, account).await
        }
        Commands::Keys { account } => {
            let directory = load_directory(&config, cli.directory)?;
            cmd_keys(&directory, account)
        }
    }
}

fn load_directory(config: &Config, flag: Option<PathBuf>) -> Result<Directory> {
    let path = config.directory_path(flag)?;
    debug!(path = %path.display(), "loading directory");
    Ok(Directory::load(path)?)
}

fn load_rule(path: &Path) -> Result<Predicate> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

async fn cmd_eval(
    config: &Config,
    directory: Directory,
    rule: &Path,
    ctx: &ApprovalContext,
) -> Result<()> {
    let rule = Arc::new(load_rule(rule)?);
    let session = Arc::new(ResolverSession::from_config(directory, &config.resolver));
    let evaluator = Evaluator::from_config(session, &config.evaluation);

    let matched = evaluator.matches(&rule, ctx).await?;
    println!("{}", if matched { "match" } else { "no match" });

    let stats = evaluator.session().stats();
    debug!(hits = stats.hits, misses = stats.misses, "resolver stats");
    Ok(())
}

fn cmd_simplify(rule: &Path) -> Result<()> {
    let rule = load_rule(rule)?;
    let simple = simplify(&rule)?;
    println!("{}", serde_json::to_string_pretty(&simple)?);
    println!("{simple}");
    Ok(())
}

async fn cmd_groups(config: &Config, directory: Directory, account: AccountId) -> Result<()> {
    let session = ResolverSession::from_config(directory, &config.resolver);
    let groups = session.effective_groups(account).await?;

    for uuid in groups.iter() {
        let name = session
            .directory()
            .group(uuid)
            .and_then(|g| g.name.as_deref())
            .unwrap_or("");
        println!("{:<40}  {name}", uuid.as_str());
    }
    Ok(())
}

fn cmd_keys(directory: &Directory, account: AccountId) -> Result<()> {
    let account = directory
        .account(account)
        .ok_or(Error::AccountNotFound(account))?;

    if account.ssh_keys.is_empty() {
        println!("No SSH keys.");
        return Ok(());
    }

    println!("{:<4}  {:<20}  {:<8}  COMMENT", "SEQ", "ALGORITHM", "VALID");
    println!("{}", "-".repeat(60));
    for key in &account.ssh_keys {
        println!(
            "{:<4}  {:<20}  {:<8}  {}",
            key.id.seq,
            key.algorithm(),
            if key.valid { "yes" } else { "no" },
            key.comment()
        );
    }
    Ok(())
}
