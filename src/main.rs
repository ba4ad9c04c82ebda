use anyhow::Result;
use clap::Parser;

use solace::{
    app::get_data_dir,
    backend::GatewayFactory,
    cli::{Cli, Commands},
    constants::LOG_FILE_NAME,
    runtime::{resolve_config, NonInteractiveRunner, Orchestrator},
    utils::{init_logger, LogTarget},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so its logs go to a file
    let interactive =
        cli.prompt.is_none() && matches!(cli.command, None | Some(Commands::Chat));
    let log_path = if interactive {
        get_data_dir().ok().map(|dir| dir.join(LOG_FILE_NAME))
    } else {
        None
    };
    let target = match &log_path {
        Some(path) => LogTarget::File(path),
        None => LogTarget::Stderr,
    };
    if let Err(err) = init_logger(cli.verbose, target) {
        eprintln!("Failed to initialize logging: {}", err);
    }

    if let Some(prompt) = cli.prompt.clone() {
        run_non_interactive(cli, prompt).await
    } else {
        let orchestrator = Orchestrator::new(cli)?;
        orchestrator.run().await
    }
}

/// Send one prompt, print the exchange and exit
async fn run_non_interactive(cli: Cli, prompt: String) -> Result<()> {
    let config = resolve_config(&cli)?;
    let gateway = GatewayFactory::create(&config)?;
    let runner = NonInteractiveRunner::new(gateway, &config);

    let result = runner.execute(prompt).await?;

    let formatted = runner.format_result(&result, cli.output_format);
    println!("{}", formatted);

    if !result.errors.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
