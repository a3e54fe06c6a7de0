// This software is licensed under a dual license model:
//
// GNU Affero General Public License v3 (AGPLv3): You may use, modify, and
// distribute this software under the terms of the AGPLv3.
//
// Elastic License v2 (ELv2): You may also use, modify, and distribute this
// software under the Elastic License v2, which has specific restrictions.
//
// We welcome any commercial collaboration or support. For inquiries
// regarding the licenses, please contact us at:
// vectorchord-inquiry@tensorchord.ai
//
// Copyright (c) 2025 TensorChord Inc.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gatedot::{Harness, HarnessOptions};
use std::path::PathBuf;
use validator::Validate;

#[derive(Parser)]
#[command(about = "Cross-check every gated dot product kernel against the scalar oracle")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fixed example and a randomized pool through every kernel.
    Check(CheckArgs),
    /// Print the kernels that run on this machine.
    List,
}

#[derive(Args)]
struct CheckArgs {
    #[arg(long, env = "GATEDOT_OPTIONS")]
    options: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    rounds: Option<u32>,
}

fn check(args: CheckArgs) -> Result<()> {
    let mut options = match &args.options {
        Some(path) => HarnessOptions::load(path)
            .with_context(|| format!("failed to load options from {}", path.display()))?,
        None => HarnessOptions::default(),
    };
    if let Some(seed) = args.seed {
        options.seed = Some(seed);
    }
    if let Some(rounds) = args.rounds {
        options.rounds = rounds;
    }
    options.validate().context("invalid options")?;
    let harness = Harness::new();
    let report = harness.run(&options).context("kernels disagree")?;
    println!(
        "ok: {} kernels, {} pairs, {} elements",
        report.kernels, report.pairs, report.elements
    );
    Ok(())
}

fn list() {
    println!("cpus: {}", simd::detected_cpus().join(", "));
    for kernel in Harness::new().kernels() {
        println!("{}", kernel.name);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Check(args) => check(args)?,
        Commands::List => list(),
    }
    Ok(())
}
