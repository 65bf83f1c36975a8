use anyhow::Result;
use clap::Parser;
use phaser_core::errors::PhaseError;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let parsed = cli::Cli::parse();

    match parsed.dispatch().await {
        Ok(()) => Ok(()),
        Err(err) => {
            // Mirror the phase's own exit status when it ran to completion
            if let Some(code) = err.downcast_ref::<PhaseError>().and_then(PhaseError::exit_code) {
                eprintln!("Error: {}", err);
                std::process::exit(i32::try_from(code).unwrap_or(1).clamp(1, 255));
            }
            Err(err)
        }
    }
}
