use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use env_logger::{Builder, Env, Target};
use eyefi_ctl::{
    card_client::{EyeFiCardClient, NetworkIntent},
    config::{AppConfig, DiagnosticsConfig},
    services::{
        card_info::CardInfoService,
        join::{JoinTarget, NetworkJoin},
        network::{AddOutcome, NetworkService},
        pacing::CancelToken,
        progress::ProgressReporter,
    },
};
use log::{debug, error};
use std::{
    io::{self, Write},
    process::ExitCode,
};

#[derive(Debug, Parser)]
#[command(name = "eyefi-ctl", version)]
#[command(about = "Configure, query and join wireless networks on an Eye-Fi card")]
#[command(arg_required_else_help = true)]
#[command(group(ArgGroup::new("network").args(["add", "test", "remove"])))]
struct Cli {
    /// add network (implies test unless --force)
    #[arg(short = 'a', value_name = "ESSID")]
    add: Option<String>,

    /// test network
    #[arg(short = 't', value_name = "ESSID")]
    test: Option<String>,

    /// set WPA key for add/test
    #[arg(short = 'p', value_name = "KEY")]
    passphrase: Option<String>,

    /// remove network
    #[arg(short = 'r', value_name = "ESSID")]
    remove: Option<String>,

    /// scan for networks
    #[arg(short = 's')]
    scan: bool,

    /// list configured networks
    #[arg(short = 'c')]
    configured: bool,

    /// reboot card
    #[arg(short = 'b')]
    reboot: bool,

    /// print information about card firmware
    #[arg(short = 'f')]
    firmware: bool,

    /// set debugging level (default: 1)
    #[arg(short = 'd', value_name = "LEVEL")]
    debug_level: Option<u8>,

    /// print card unique key
    #[arg(short = 'k')]
    key: bool,

    /// dump card log
    #[arg(short = 'l')]
    log: bool,

    /// print card mac
    #[arg(short = 'm')]
    mac: bool,

    /// add without testing the network first
    #[arg(long)]
    force: bool,
}

impl Cli {
    fn network_action(&self) -> Option<(NetworkIntent, &str)> {
        [
            (NetworkIntent::Add, &self.add),
            (NetworkIntent::Test, &self.test),
            (NetworkIntent::Remove, &self.remove),
        ]
        .into_iter()
        .find_map(|(intent, essid)| essid.as_deref().map(|essid| (intent, essid)))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config.with_verbosity(cli.debug_level),
        Err(e) => {
            eprintln!("failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    initialize(&config.diagnostics);

    match run(&cli, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!("application error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn initialize(diagnostics: &DiagnosticsConfig) {
    log_panics::init();

    let mut builder =
        Builder::from_env(Env::default().default_filter_or(diagnostics.verbosity.log_filter()));

    builder.format(|f, record| match record.level() {
        log::Level::Error | log::Level::Warn => writeln!(
            f,
            "{}: {}",
            record.level().as_str().to_lowercase(),
            record.args()
        ),
        _ => writeln!(f, "{}", record.args()),
    });

    builder.target(Target::Stderr).init();

    debug!("{} version: {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    debug!("configuration: {diagnostics:?}");
}

async fn run(cli: &Cli, config: &AppConfig) -> Result<ExitCode> {
    let client =
        EyeFiCardClient::new(&config.device).context("failed to create card client")?;
    let mut stdout = io::stdout();

    if cli.scan {
        CardInfoService::print_scan(&client, &mut stdout).await?;
    }
    if cli.configured {
        CardInfoService::print_configured(&client, &mut stdout).await?;
    }
    if cli.firmware {
        CardInfoService::print_firmware_info(&client, &mut stdout).await?;
    }
    if cli.key {
        CardInfoService::print_card_key(&client, &mut stdout).await?;
    }
    if cli.mac {
        CardInfoService::print_mac(&client, &mut stdout).await?;
    }
    if cli.log {
        CardInfoService::print_log(&client, &mut stdout).await?;
    }
    if cli.reboot {
        CardInfoService::reboot(&client).await?;
    }

    let Some((intent, essid)) = cli.network_action() else {
        return Ok(ExitCode::SUCCESS);
    };

    if intent == NetworkIntent::Remove {
        let target = JoinTarget::new(essid, None)?;
        NetworkService::remove(&client, &target).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let target = JoinTarget::new(essid, cli.passphrase.clone())?;

    let cancel = CancelToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            debug!("ctrl-c received, cancelling network test");
            cancel.cancel();

            if tokio::signal::ctrl_c().await.is_ok() {
                error!("interrupted");
                std::process::exit(130);
            }
        })
    };

    let join = NetworkJoin::new(&client, &config.join).with_cancel_token(cancel);
    let mut reporter = ProgressReporter::new(io::stdout(), config.diagnostics.verbosity);

    let joined = match intent {
        NetworkIntent::Test => NetworkService::test(&join, &target, &mut reporter)
            .await
            .is_success(),
        _ => matches!(
            NetworkService::add(&client, &join, &target, cli.force, &mut reporter, &mut stdout)
                .await?,
            AddOutcome::Added
        ),
    };

    interrupt.abort();

    Ok(if joined {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
