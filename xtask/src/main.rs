use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for lumen")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates, warnings denied
    Clippy,
    /// Run all tests
    Test,
    /// Run the bucket sort benchmark
    Bench,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
}

impl Commands {
    fn cargo_args(self) -> &'static [&'static str] {
        match self {
            Commands::Check => &[],
            Commands::Fmt => &["fmt", "--all", "--", "--check"],
            Commands::Clippy => &[
                "clippy",
                "--workspace",
                "--all-targets",
                "--",
                "-D",
                "warnings",
            ],
            Commands::Test => &["test", "--workspace"],
            Commands::Bench => &["bench", "-p", "lumen-render", "--bench", "bench_bucket_sort"],
            Commands::Doc => &["doc", "--workspace", "--no-deps"],
            Commands::Build => &["build", "--workspace"],
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let steps: &[Commands] = match cli.command {
        Commands::Check => &[
            Commands::Fmt,
            Commands::Clippy,
            Commands::Test,
            Commands::Doc,
        ],
        _ => std::slice::from_ref(&cli.command),
    };
    for step in steps {
        run_cargo(step.cargo_args())?;
    }

    Ok(())
}

fn run_cargo(args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {} failed", args[0]);
    }
    Ok(())
}
