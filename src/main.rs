use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use secrecy::SecretString;
use tracing::{error, info, warn};

use dockhand::cli::{Cli, Mode, TOKEN_ENV};
use dockhand::logging::{self, LogOptions};
use dockhand::prompt::{self, Console, LineConsole, Terminal};
use dockhand::{Pipeline, SshSession, interrupt, pipeline};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let options = LogOptions {
        dir: cli.log_dir.clone(),
        verbose: cli.verbose,
    };
    let _guard = match logging::init(&options) {
        Ok((guard, path)) => {
            info!("Logging to {}", path.display());
            guard
        }
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = interrupt::install() {
        warn!("Interrupts will not trigger cleanup: {e}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut console: Box<dyn Console> = if io::stdin().is_terminal() {
        Box::new(Terminal)
    } else {
        Box::new(LineConsole::new(io::stdin().lock(), io::stderr()))
    };

    let token = std::env::var(TOKEN_ENV).ok().map(SecretString::from);

    match cli.mode() {
        Mode::Deploy => {
            let config = prompt::collect_deployment(console.as_mut(), cli, token)
                .context("collecting deployment parameters")?;
            if let Err(e) = Pipeline::new(config).run() {
                if e.is_precondition() {
                    info!("Nothing on the host was changed");
                }
                return Err(e.into());
            }
        }
        Mode::DryRun => {
            let config = prompt::collect_deployment(console.as_mut(), cli, token)
                .context("collecting deployment parameters")?;
            Pipeline::new(config).dry_run()?;
        }
        Mode::Cleanup => {
            let target = prompt::collect_target(console.as_mut(), cli)
                .context("collecting SSH target")?;
            pipeline::run_cleanup(&SshSession::new(target), &cli.remote_dir)?;
        }
        Mode::Status => {
            let target = prompt::collect_target(console.as_mut(), cli)
                .context("collecting SSH target")?;
            pipeline::run_status(&SshSession::new(target), &cli.remote_dir)?;
        }
    }
    Ok(())
}
