use anyhow::Context;
use clap::Parser;
use tracing::info;

mod mutex;

use mutex::Ownership;

#[derive(Parser)]
#[command(name = "vinegar-mutexer")]
#[command(about = "Hold the Roblox singleton mutex so more than one client can run")]
#[command(version)]
struct Cli {
    /// Name of the mutex to hold
    #[arg(short, long, default_value = "ROBLOX_singletonMutex")]
    name: String,
}

fn main() -> anyhow::Result<()> {
    vinegar_common::init_logging();
    let cli = Cli::parse();

    let ownership =
        mutex::acquire(&cli.name).with_context(|| format!("cannot hold mutex {:?}", cli.name))?;

    match ownership {
        Ownership::Acquired(held) => {
            info!(name = held.name(), "mutex locked");
            // Nothing left to do; the mutex is released when we are killed.
            loop {
                std::thread::park();
            }
        }
        Ownership::HeldElsewhere => {
            info!(name = %cli.name, "mutex is already locked by another process");
            Ok(())
        }
    }
}
