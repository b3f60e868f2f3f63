//! Entry point for the workflows command-line application.

use anyhow::Result;
use clap::Parser;

use workflows::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_tracing();

    #[cfg(feature = "shutdown")]
    let result = tokio::select! {
        result = cli.run() => result,
        _ = workflows::shutdown::signal() => Err(anyhow::anyhow!("interrupted")),
    };
    #[cfg(not(feature = "shutdown"))]
    let result = cli.run().await;

    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}
