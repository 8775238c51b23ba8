use std::io::{self, BufRead, Write};

use secrecy::SecretString;
use tracing::info;

use crate::cli::Cli;
use crate::config::{DEFAULT_BRANCH, DeploymentConfig, SshTarget, check_remote_dir};
use crate::error::{DeployError, DeployResult};

/// Source of answers for interactive prompts.
pub trait Console {
    /// Ask a question and return the answer without its line ending.
    fn ask(&mut self, prompt: &str) -> io::Result<String>;

    /// Ask for a secret. Implementations on a terminal must not echo
    /// the input.
    fn ask_secret(&mut self, prompt: &str) -> io::Result<String>;
}

/// The controlling terminal. Prompts go to stderr, secrets are read
/// with echo turned off.
pub struct Terminal;

impl Console for Terminal {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        let mut stderr = io::stderr();
        stderr.write_all(prompt.as_bytes())?;
        stderr.flush()?;
        read_answer(&mut io::stdin().lock())
    }

    fn ask_secret(&mut self, prompt: &str) -> io::Result<String> {
        rpassword::prompt_password(prompt)
    }
}

/// Line-oriented console over any reader and writer, for piped
/// input and tests. Secrets are read like any other line.
pub struct LineConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConsole<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Console for LineConsole<R, W> {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        self.output.write_all(prompt.as_bytes())?;
        self.output.flush()?;
        read_answer(&mut self.input)
    }

    fn ask_secret(&mut self, prompt: &str) -> io::Result<String> {
        self.ask(prompt)
    }
}

fn read_answer(input: &mut dyn BufRead) -> io::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed while waiting for an answer",
        ));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Fills in whatever the command line left out, by prompting or, in
/// non-interactive mode, by failing.
struct Collector<'a> {
    console: &'a mut dyn Console,
    interactive: bool,
}

impl Collector<'_> {
    fn required(&mut self, given: Option<&str>, prompt: &str, flag: &str) -> DeployResult<String> {
        let value = match given {
            Some(v) => v.to_string(),
            None if self.interactive => self.console.ask(prompt)?,
            None => return Err(DeployError::Config(format!("{flag} is required"))),
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(DeployError::Config(format!("{flag} must not be empty")));
        }
        Ok(value.to_string())
    }

    fn optional(&mut self, given: Option<&str>, prompt: &str) -> DeployResult<Option<String>> {
        let value = match given {
            Some(v) => v.to_string(),
            None if self.interactive => self.console.ask(prompt)?,
            None => return Ok(None),
        };
        let value = value.trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    fn port(&mut self, given: Option<u16>, prompt: &str, flag: &str) -> DeployResult<u16> {
        if let Some(port) = given {
            return check_port(port, flag);
        }
        let raw = self.required(None, prompt, flag)?;
        raw.parse::<u16>()
            .map_err(|_| invalid_port(flag, &raw))
            .and_then(|port| check_port(port, flag))
    }

    fn target(&mut self, cli: &Cli) -> DeployResult<SshTarget> {
        let user = self.required(cli.user.as_deref(), "SSH username: ", "--user")?;
        let host = self.required(cli.host.as_deref(), "Server IP address: ", "--host")?;
        let key_given = cli.key.as_ref().map(|k| k.display().to_string());
        let key = self.optional(
            key_given.as_deref(),
            "SSH key path (blank for ssh defaults): ",
        )?;

        let ssh_port = check_port(cli.ssh_port, "--ssh-port")?;
        let mut target = SshTarget::new(&user, &host).port(ssh_port);
        if let Some(key) = key {
            target = target.key(key);
        }
        Ok(target)
    }
}

fn check_port(port: u16, flag: &str) -> DeployResult<u16> {
    if port == 0 {
        return Err(invalid_port(flag, "0"));
    }
    Ok(port)
}

fn invalid_port(flag: &str, raw: &str) -> DeployError {
    DeployError::Config(format!("{flag}: '{raw}' is not a valid port"))
}

/// Collect everything a full deployment needs.
///
/// `token` is the access token from the environment, if any; when
/// absent it is asked for with a masked prompt (blank means
/// anonymous access).
pub fn collect_deployment(
    console: &mut dyn Console,
    cli: &Cli,
    token: Option<SecretString>,
) -> DeployResult<DeploymentConfig> {
    check_remote_dir(&cli.remote_dir)?;
    let mut c = Collector {
        console,
        interactive: !cli.non_interactive,
    };

    let repo = c.required(cli.repo.as_deref(), "Git repository URL: ", "--repo")?;

    let token = match token {
        Some(t) => Some(t),
        None if c.interactive => Some(SecretString::from(
            c.console
                .ask_secret("Personal access token (blank for public repos): ")?,
        )),
        None => None,
    };

    let branch = c
        .optional(
            cli.branch.as_deref(),
            &format!("Branch [{DEFAULT_BRANCH}]: "),
        )?
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string());

    let target = c.target(cli)?;
    let port = c.port(cli.port, "Application port (inside the container): ", "--port")?;

    let mut config = DeploymentConfig::new(&repo, target, port)
        .branch(&branch)
        .remote_dir(&cli.remote_dir)
        .workspace(&cli.workspace)
        .mirror_deletions(cli.mirror_deletions);
    if let Some(token) = token {
        config = config.access_token(token);
    }

    // Fail on an unusable URL now rather than halfway through.
    config.repo_name()?;

    info!(
        "Deploying {} (branch {}) to {} on port {}",
        config.repo_url,
        config.branch,
        config.target.destination(),
        config.app_port
    );
    Ok(config)
}

/// Collect only the SSH target, for cleanup and status runs.
pub fn collect_target(console: &mut dyn Console, cli: &Cli) -> DeployResult<SshTarget> {
    check_remote_dir(&cli.remote_dir)?;
    let mut c = Collector {
        console,
        interactive: !cli.non_interactive,
    };
    c.target(cli)
}
