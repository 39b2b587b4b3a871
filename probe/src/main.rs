//! h323-probe — register with a gatekeeper and stay registered until Ctrl-C.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use h323_network::UdpTransport;
use h323_protocol::RasTransport;
use h323_ras::{AuthenticatorSet, Endpoint, HmacAuthenticator, RasConfig, RasEngine, RasEvent};
use h323_types::{AliasAddress, TransportAddress};
use h323_utils::{format_duration, init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "h323-probe", about = "H.323 gatekeeper registration probe")]
struct Cli {
    /// Gatekeeper RAS address (`host:port`, or a bare IP for port 1719).
    /// Without it the probe discovers a gatekeeper by multicast.
    #[arg(long, env = "H323_GATEKEEPER")]
    gatekeeper: Option<String>,

    /// Only accept a gatekeeper with this identifier.
    #[arg(long, env = "H323_GATEKEEPER_ID")]
    gatekeeper_id: Option<String>,

    /// Local address to bind the RAS socket to.
    #[arg(long, default_value = "0.0.0.0:0", env = "H323_BIND")]
    bind: SocketAddr,

    /// RAS address to advertise when the bind address is not reachable
    /// from the gatekeeper.
    #[arg(long, env = "H323_ADVERTISE")]
    advertise: Option<String>,

    /// Aliases to register (comma-separated; `e164:`, `h323id:`, `url:`,
    /// `email:` prefixes select the kind).
    #[arg(long, env = "H323_ALIASES", value_delimiter = ',', default_value = "h323-probe")]
    alias: Vec<String>,

    /// Call signalling address advertised in the RRQ. Defaults to the RAS
    /// address on port 1720.
    #[arg(long, env = "H323_CALL_SIGNAL")]
    call_signal: Option<String>,

    /// Shared secret for H.235-style message authentication.
    #[arg(long, env = "H323_PASSWORD")]
    password: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "H323_LOG_LEVEL")]
    log_level: String,

    /// Log format: "human" or "json".
    #[arg(long, default_value = "human", env = "H323_LOG_FORMAT")]
    log_format: LogFormat,

    /// Path to a TOML engine configuration. `--gatekeeper` and
    /// `--gatekeeper-id` override its `[gatekeeper]` table.
    #[arg(long)]
    config: Option<PathBuf>,
}

struct ProbeEndpoint {
    aliases: Vec<AliasAddress>,
    call_signal: TransportAddress,
    authenticators: AuthenticatorSet,
}

impl Endpoint for ProbeEndpoint {
    fn aliases(&self) -> Vec<AliasAddress> {
        self.aliases.clone()
    }

    fn call_signal_addresses(&self) -> Vec<TransportAddress> {
        vec![self.call_signal]
    }

    fn authenticators(&self) -> AuthenticatorSet {
        self.authenticators.clone()
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<RasConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            let config = RasConfig::from_toml_file(&path)
                .with_context(|| format!("loading config from {path}"))?;
            tracing::info!("Loaded config from {path}");
            config
        }
        None => RasConfig::default(),
    };
    if cli.gatekeeper.is_some() {
        config.gatekeeper.address = cli.gatekeeper.clone();
    }
    if cli.gatekeeper_id.is_some() {
        config.gatekeeper.identifier = cli.gatekeeper_id.clone();
    }
    config.validate()?;
    Ok(config)
}

fn build_endpoint(cli: &Cli, ras_address: TransportAddress) -> anyhow::Result<ProbeEndpoint> {
    let aliases = cli
        .alias
        .iter()
        .map(|a| a.parse::<AliasAddress>().with_context(|| format!("alias {a:?}")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let call_signal = match &cli.call_signal {
        Some(s) => s
            .parse::<TransportAddress>()
            .with_context(|| format!("call signal address {s:?}"))?,
        None => TransportAddress::from_ip(ras_address.ip(), 1720),
    };
    let authenticators = match &cli.password {
        Some(password) => {
            let sender = aliases
                .first()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "h323-probe".to_string());
            AuthenticatorSet::empty().with(Arc::new(HmacAuthenticator::new(
                sender,
                password.as_bytes().to_vec(),
            )))
        }
        None => AuthenticatorSet::empty(),
    };
    Ok(ProbeEndpoint {
        aliases,
        call_signal,
        authenticators,
    })
}

fn log_event(event: &RasEvent) {
    match event {
        RasEvent::GatekeeperDiscovered {
            address,
            identifier,
        } => tracing::info!(%address, ?identifier, "gatekeeper found"),
        RasEvent::Registered {
            endpoint_identifier,
            lightweight,
        } => tracing::info!(%endpoint_identifier, lightweight, "registered"),
        RasEvent::RegistrationLost { reason } => {
            tracing::warn!(?reason, "registration lost")
        }
        RasEvent::FailedOver { from, to } => {
            tracing::warn!(?from, %to, "failed over to alternate gatekeeper")
        }
        other => tracing::debug!(event = ?other, "RAS event"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level);

    let config = load_config(&cli)?;

    let transport = Arc::new(UdpTransport::bind(cli.bind).await?);
    if let Some(advertise) = &cli.advertise {
        let address = advertise
            .parse::<TransportAddress>()
            .with_context(|| format!("advertised address {advertise:?}"))?;
        transport.set_advertised_address(address);
    }
    let endpoint = Arc::new(build_endpoint(&cli, transport.local_address())?);

    let engine = RasEngine::new(config, transport, endpoint)?;
    engine.subscribe(Box::new(log_event));

    engine
        .connect()
        .await
        .context("registering with the gatekeeper")?;
    if let (Some(gk), Some(next)) = (engine.gatekeeper(), engine.next_refresh_in()) {
        tracing::info!(
            gatekeeper = %gk.ras_address,
            "registered; next refresh in {}",
            format_duration(next)
        );
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    tracing::info!("Shutdown signal received, unregistering");

    if let Err(e) = engine.unregister().await {
        tracing::warn!(error = %e, "unregistration failed");
    }
    engine.close().await;

    tracing::info!("h323-probe exited cleanly");
    Ok(())
}
