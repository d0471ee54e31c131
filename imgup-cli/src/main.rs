// ABOUTME: Main entry point for the imgup CLI application
// ABOUTME: Loads environment and config, dispatches commands, reports errors as one line

use anyhow::Result;
use clap::Parser;
use imgup_cli::cli::{Cli, Commands, ConfigAction};
use imgup_cli::cli_output::CliOutput;
use imgup_cli::config::{self, ConfigStore};
use imgup_cli::constants::paths;
use imgup_cli::upload;
use imgup_sdk::ImgupError;
use std::env;

fn load_env_files() {
    let _ = dotenvy::from_filename(paths::LOCAL_ENV_FILE);
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(paths::HOME_ENV_FILE));
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() {
    load_env_files();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let use_color = !cli.no_color
        && env::var("NO_COLOR").is_err()
        && env::var("TERM").unwrap_or_default() != "dumb";
    let output = if use_color {
        CliOutput::new()
    } else {
        CliOutput::with_color(false)
    };

    if let Err(err) = run(cli.command, &output).await {
        match err.downcast_ref::<ImgupError>() {
            Some(sdk_error) => output.sdk_error(sdk_error),
            None => output.error(&format!("{err:#}")),
        }
        std::process::exit(1);
    }
}

async fn run(command: Commands, output: &CliOutput) -> Result<()> {
    let store = ConfigStore::locate()?;
    log::debug!("Using config file {}", store.path().display());

    match command {
        Commands::Upload(args) => {
            let config = store.load()?;
            upload::run(&args, &config, output).await?;
        }
        Commands::Setup { target } => {
            #[cfg(feature = "oauth")]
            imgup_cli::setup::run(target, &store, output).await?;
            #[cfg(not(feature = "oauth"))]
            anyhow::bail!("imgup was built without the oauth feature; cannot set up {target:?}");
        }
        Commands::Metadata { image, json } => {
            if !image.is_file() {
                anyhow::bail!("Image not found: {}", image.display());
            }
            let metadata = imgup_sdk::metadata::extract(&image);
            if json {
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            } else {
                output.metadata(&metadata);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::SetBackend { backend } => {
                store.update(|c| config::set_default_backend(c, backend))?;
                output.success(&format!(
                    "Default backend saved as '{backend}' in {}",
                    store.path().display()
                ));
            }
            ConfigAction::SetFormat { format } => {
                store.update(|c| config::set_default_format(c, format))?;
                output.success(&format!(
                    "Default format saved as '{format}' in {}",
                    store.path().display()
                ));
            }
            ConfigAction::Show => {
                let shown = config::redacted(&store.load()?);
                if shown.is_empty() {
                    output.info(&format!("No config at {}", store.path().display()));
                } else {
                    print!("{}", toml::to_string(&shown)?);
                }
            }
            ConfigAction::Clear { backend } => {
                let mut removed = 0;
                store.update(|c| removed = config::clear_backend(c, backend))?;
                output.success(&format!("Removed {removed} {backend} key(s)"));
            }
        },
    }

    Ok(())
}
