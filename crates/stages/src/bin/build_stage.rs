//! Build allow-list trees from address lists and publish them.
//!
//! Usage:
//!   build-stage guaranteed=lists/guaranteed.txt whitelist=lists/fcfs.txt
//!   build-stage --store ./stages --dry-run whitelist=lists/fcfs.txt
//!
//! Every stage is built before anything is written; the roots printed at the
//! end are the values to commit on-chain.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use allowlist_stages::{
    build_stages, logging, publish, read_address_list, StageError, StageId, StageInput,
    StageStore, DEFAULT_STAGES_DIR,
};

#[derive(Parser)]
#[command(name = "build-stage")]
#[command(about = "Build and persist per-stage allow-list Merkle trees", long_about = None)]
struct Args {
    /// Directory holding one <stage>.json per stage
    #[arg(long, env = "ALLOWLIST_STAGES_DIR", default_value = DEFAULT_STAGES_DIR)]
    store: PathBuf,

    /// Build and print roots without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Stages to build, as STAGE=ADDRESS_LIST_FILE
    #[arg(required = true, value_parser = parse_stage_arg)]
    stages: Vec<(StageId, PathBuf)>,
}

fn parse_stage_arg(arg: &str) -> Result<(StageId, PathBuf), String> {
    let (stage, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected STAGE=FILE, got {:?}", arg))?;
    let stage = StageId::new(stage).map_err(|e| e.to_string())?;
    Ok((stage, PathBuf::from(path)))
}

fn run(args: Args) -> Result<(), StageError> {
    let mut inputs = Vec::with_capacity(args.stages.len());
    for (stage, path) in args.stages {
        let addresses = read_address_list(&path)?;
        println!("{:20} {:>8} addresses from {}", stage, addresses.len(), path.display());
        inputs.push(StageInput { stage, addresses });
    }

    let built = build_stages(inputs)?;

    if !args.dry_run {
        let store = StageStore::open(&args.store)?;
        for path in publish(&store, &built)? {
            println!("Wrote {}", path.display());
        }
    }

    println!("\n=== Stage Roots ===\n");
    for b in &built {
        println!("{:20} {}", b.stage, b.tree.root());
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("build-stage failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
