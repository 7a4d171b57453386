/*!
 * Sheetgate - Command Line Entry Point
 *
 * Inspect gate decisions and the allowed roots:
 * - check: decide one or more paths for an intent
 * - roots: print the canonical registry
 * - list: workbook metadata for a directory
 */

use clap::{Parser, Subcommand, ValueEnum};
use miette::Report;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use sheetgate::config::expand_user_config;
use sheetgate::monitoring::log_startup;
use sheetgate::{
    init_tracing, AccessDecision, AccessGate, CaseSensitivity, ConfigResult, ExpectedKind,
    GateConfig, GuardedFs, Intent, PathRequest,
};

#[derive(Parser, Debug)]
#[command(name = "sheetgate", version, about = "Path sandboxing gate for spreadsheet workspaces")]
struct Cli {
    /// Allowed root directory; repeat or comma-separate for several
    #[arg(long = "root", env = "SHEETGATE_ROOTS", value_delimiter = ',', global = true)]
    roots: Vec<String>,

    /// Compare path segments case-insensitively
    #[arg(long, global = true)]
    case_insensitive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one JSON decision per path; exits 1 if any path is denied
    Check {
        /// read, write, create, delete or list
        intent: Intent,

        #[arg(required = true)]
        paths: Vec<String>,

        #[arg(long, value_enum, default_value_t = KindArg::Any)]
        kind: KindArg,
    },

    /// Print the canonical allowed roots
    Roots,

    /// Print workbook metadata for a directory as JSON
    List {
        #[arg(default_value = ".")]
        dir: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum KindArg {
    Any,
    Dir,
    Spreadsheet,
}

impl KindArg {
    fn expected(self, config: &GateConfig) -> ExpectedKind {
        match self {
            KindArg::Any => ExpectedKind::Any,
            KindArg::Dir => ExpectedKind::Directory,
            KindArg::Spreadsheet => config.spreadsheet_kind(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    log_startup(env!("CARGO_PKG_VERSION"));

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:?}", Report::new(e));
            return Ok(ExitCode::from(2));
        }
    };
    config.log_summary();

    let gate = match AccessGate::from_config(&config) {
        Ok(gate) => gate,
        Err(e) => {
            eprintln!("{:?}", Report::new(e));
            return Ok(ExitCode::from(2));
        }
    };

    match cli.command {
        Command::Check {
            intent,
            paths,
            kind,
        } => {
            let kind = kind.expected(&config);
            let mut denied = 0usize;
            for raw in paths {
                let decision = gate
                    .check_async(PathRequest::new(raw.clone(), intent), kind.clone())
                    .await;
                if matches!(decision, AccessDecision::Denied(_)) {
                    denied += 1;
                }
                let line = serde_json::json!({ "path": raw, "result": decision });
                println!("{}", serde_json::to_string(&line)?);
            }
            info!(denied = denied, "Check finished");
            Ok(if denied > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Roots => {
            for root in gate.registry().roots() {
                println!("{}", root.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::List { dir } => {
            let workspace = GuardedFs::from_config(Arc::new(gate), &config);
            match workspace.list_workbooks(&dir) {
                Ok(workbooks) => {
                    println!("{}", serde_json::to_string_pretty(&workbooks)?);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("{:?}", Report::new(e));
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

/// Environment configuration with command-line roots and case policy layered on top
fn build_config(cli: &Cli) -> ConfigResult<GateConfig> {
    let mut config = GateConfig::from_env()?;

    if !cli.roots.is_empty() {
        let roots = cli
            .roots
            .iter()
            .filter(|root| !root.trim().is_empty())
            .map(|root| expand_user_config(root, |key| std::env::var(key).ok()))
            .collect::<ConfigResult<Vec<_>>>()?;
        config = config.with_roots(roots);
    }
    if cli.case_insensitive {
        config = config.with_case_sensitivity(CaseSensitivity::Insensitive);
    }

    config.validate()?;
    Ok(config)
}
