mod bless;
mod booter;
mod cli;
mod error;
mod firmware;
mod label;
mod platform;
mod preboot;
mod record;
mod resolve;
mod volume;

#[cfg(test)]
mod mock;

use anyhow::Result;
use clap::Parser;
use cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Ensure we're running on macOS
    #[cfg(not(target_os = "macos"))]
    {
        anyhow::bail!("bless only supports macOS");
    }

    #[cfg(target_os = "macos")]
    {
        let request = volume::BlessRequest::from_args(&args);
        if let Err(err) = bless::run(&platform::darwin::DarwinHost::new(), request) {
            log::error!("{err}");
            std::process::exit(err.status());
        }
    }

    Ok(())
}
