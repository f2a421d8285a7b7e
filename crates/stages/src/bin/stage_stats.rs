//! Stage statistics - lists persisted stages with size, depth and root.
//!
//! Usage:
//!   stage-stats                     # every stage in ./stages
//!   stage-stats --render guaranteed # also draw that stage's tree

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use allowlist_stages::{logging, StageError, StageId, StageStore, DEFAULT_STAGES_DIR};

#[derive(Parser)]
#[command(name = "stage-stats")]
#[command(about = "Report on persisted allow-list stages", long_about = None)]
struct Args {
    /// Directory holding one <stage>.json per stage
    #[arg(long, env = "ALLOWLIST_STAGES_DIR", default_value = DEFAULT_STAGES_DIR)]
    store: PathBuf,

    /// Render the tree of these stages
    #[arg(long)]
    render: Vec<StageId>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: Args) -> Result<bool, StageError> {
    let store = StageStore::open(&args.store)?;
    let stages = store.list()?;

    println!("Store: {}", store.dir().display());
    println!("Stages: {}\n", stages.len());

    println!("{:20} {:>8} {:>6}  ROOT", "STAGE", "LEAVES", "DEPTH");
    println!("{}", "─".repeat(104));

    let mut all_valid = true;
    for stage in &stages {
        match store.load(stage) {
            Ok(tree) => println!(
                "{:20} {:>8} {:>6}  {}",
                stage,
                tree.len(),
                tree.depth(),
                tree.root()
            ),
            Err(e) => {
                all_valid = false;
                println!("{:20} INVALID: {}", stage, e);
            }
        }
    }

    for stage in &args.render {
        let tree = store.load(stage)?;
        println!("\n=== {} ===\n", stage);
        print!("{}", tree.render());
    }

    Ok(all_valid)
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("stage-stats failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
