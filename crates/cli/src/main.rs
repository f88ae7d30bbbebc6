mod logging;

use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result, bail},
    clap::{Args, Parser, Subcommand},
    tracing::info,
};

use {
    sluice_config::{DEFAULT_CONFIG_FILE, EXAMPLE_CONFIG, SluiceConfig},
    sluice_relay::Relay,
};

/// Download accelerator for GitHub, GitLab and Hugging Face.
///
/// Put the full platform URL after the server address:
/// `wget http://HOST:8080/https://github.com/owner/repo/blob/main/file.txt`
#[derive(Parser, Debug)]
#[command(name = "sluice", version)]
struct Cli {
    /// Path to the TOML config file. A missing file means defaults.
    #[arg(long, short, global = true, env = "SLUICE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Command-line values that take precedence over the config file.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Address to bind the HTTP server to.
    #[arg(long, global = true, env = "SLUICE_HOST")]
    host: Option<String>,

    /// Port to listen on.
    #[arg(long, global = true, env = "SLUICE_PORT")]
    port: Option<u16>,

    /// Largest upstream file to relay, in MB.
    #[arg(long, global = true)]
    size_limit_mb: Option<u64>,
}

impl Overrides {
    fn apply(self, config: &mut SluiceConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(size) = self.size_limit_mb {
            config.server.size_limit_mb = size;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the proxy server (default).
    Serve,
    /// Resolve a target offline and print the upstream URL it maps to.
    Check {
        /// A platform URL, or a request path such as `/https:/github.com/...`.
        target: String,
    },
    /// Print a documented example config file.
    ExampleConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Command::ExampleConfig)) {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    let config = load_config(&cli.config, cli.overrides)?;
    logging::init(&config.log);

    match cli.command {
        Some(Command::Check { target }) => check(&config, &target),
        Some(Command::Serve) | None => {
            info!(
                config = %cli.config.display(),
                bind = %config.server.bind_addr(),
                log_format = %config.log.format,
                extra_hosts = config.guard.extra_hosts.len(),
                "starting sluice"
            );
            sluice_gateway::serve(&config).await
        },
        Some(Command::ExampleConfig) => Ok(()),
    }
}

fn load_config(path: &Path, overrides: Overrides) -> Result<SluiceConfig> {
    let mut config = sluice_config::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn check(config: &SluiceConfig, target: &str) -> Result<()> {
    let relay = Relay::from_config(config).context("failed to build relay")?;
    let raw = if target.starts_with('/') {
        target.to_string()
    } else {
        format!("/{target}")
    };
    match relay.resolve(&raw) {
        Ok(url) => {
            println!("{url}");
            Ok(())
        },
        Err(e) => bail!("rejected ({}): {e}", e.status().as_u16()),
    }
}
