//! Weaver Fleet Server
//!
//! HTTP control plane that registers hosts, collects their telemetry, and
//! dispatches work to them.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use weaver_server::actor::Actor;
use weaver_server::auth::{JwtManager, OperatorKeyring};
use weaver_server::checkin::CheckinProcessor;
use weaver_server::directory::AccountDirectory;
use weaver_server::dispatch::WorkDispatcher;
use weaver_server::ratelimit::{RateLimitConfig, RateLimiter};
use weaver_server::registration::RegistrationManager;
use weaver_server::registry::HostRegistry;
use weaver_server::server::{AppState, build_router};
use weaver_server::storage::FleetDb;
use weaver_server::token::TokenIssuer;

#[derive(Parser, Debug)]
#[command(name = "weaver-server")]
#[command(version, about = "Weaver fleet server - host registry and work dispatcher")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JWT secret key for host access tokens.
    #[arg(long, env = "WEAVER_JWT_SECRET", default_value = "dev-secret-change-me")]
    jwt_secret: String,

    /// Access token TTL in seconds.
    #[arg(long, default_value_t = 3600)]
    token_ttl: i64,

    /// Operator API key as `name:key`. Repeatable.
    #[arg(long = "operator-key")]
    operator_keys: Vec<String>,

    /// Known owner account as `id:name`. Repeatable.
    #[arg(long = "owner")]
    owners: Vec<String>,

    /// Public base URL advertised in confirmation links.
    #[arg(long, default_value = "http://localhost:8080")]
    public_url: String,

    /// Maximum work items delivered per check-in.
    #[arg(long, default_value_t = 10)]
    checkin_batch: i64,

    /// Seconds without a check-in before an online host is marked offline.
    #[arg(long, default_value_t = 180)]
    offline_after: i64,

    /// Retention for unconfirmed registrations, in seconds.
    #[arg(long, default_value_t = 604_800)]
    registration_retention: i64,

    /// Retention for check-in telemetry, in seconds.
    #[arg(long, default_value_t = 2_592_000)]
    checkin_retention: i64,

    /// Retention for finished work items, in seconds.
    #[arg(long, default_value_t = 2_592_000)]
    work_retention: i64,

    /// Confirmation attempts allowed per source per minute.
    #[arg(long, default_value_t = 10)]
    confirm_rate_limit: u32,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    weaver_core::init_tracing("weaver_server=info", args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting weaver-server"
    );

    let db = match &args.db_path {
        Some(path) => {
            info!(path = %path.display(), "Opening fleet database");
            FleetDb::open(path).await?
        }
        None => {
            let default_path = default_db_path()?;
            info!(path = %default_path.display(), "Opening fleet database (default path)");
            FleetDb::open(&default_path).await?
        }
    };

    let operators = Arc::new(OperatorKeyring::new(parse_pairs(&args.operator_keys)?));
    if operators.is_empty() {
        warn!("No operator keys configured; operator endpoints will reject every request");
    }

    let directory = AccountDirectory::new(parse_pairs(&args.owners)?);
    if directory.is_empty() {
        warn!("No owner accounts configured; registrations cannot be created");
    }

    let jwt = Arc::new(JwtManager::new(args.jwt_secret.as_bytes(), args.token_ttl));

    let dispatcher = WorkDispatcher::new(db.clone());
    let registry = HostRegistry::new(db.clone());
    let registrations =
        RegistrationManager::new(db.clone(), directory, args.public_url.clone());
    let checkins = CheckinProcessor::new(db.clone(), dispatcher.clone(), args.checkin_batch);
    let tokens = TokenIssuer::new(db.clone(), Arc::clone(&jwt));
    let confirm_limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        max_requests: args.confirm_rate_limit,
        ..RateLimitConfig::default()
    }));

    // Flip hosts that stopped checking in to offline (every minute)
    let liveness_registry = registry.clone();
    let offline_after = args.offline_after;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        interval.tick().await; // Skip first immediate tick
        loop {
            interval.tick().await;
            let cutoff = weaver_core::unix_timestamp() - offline_after;
            if let Err(e) = liveness_registry
                .mark_stale_offline(cutoff, &Actor::System)
                .await
            {
                warn!(error = %e, "Liveness sweep failed");
            }
        }
    });

    // Retention sweeps (hourly)
    let sweep_registrations = registrations.clone();
    let sweep_checkins = checkins.clone();
    let sweep_dispatcher = dispatcher.clone();
    let registration_retention = args.registration_retention;
    let checkin_retention = args.checkin_retention;
    let work_retention = args.work_retention;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        interval.tick().await; // Skip first immediate tick
        loop {
            interval.tick().await;
            let now = weaver_core::unix_timestamp();

            match sweep_registrations
                .purge_abandoned(now - registration_retention, &Actor::System)
                .await
            {
                Ok((regs, hosts)) if regs > 0 => {
                    info!(registrations = regs, hosts, "Registration retention sweep completed");
                }
                Err(e) => {
                    warn!(error = %e, "Registration retention sweep failed");
                }
                _ => {}
            }

            match sweep_checkins
                .purge_older_than(now - checkin_retention, None, &Actor::System)
                .await
            {
                Ok(removed) if removed > 0 => {
                    info!(removed, "Check-in retention sweep completed");
                }
                Err(e) => {
                    warn!(error = %e, "Check-in retention sweep failed");
                }
                _ => {}
            }

            match sweep_dispatcher
                .purge_older_than(now - work_retention, &Actor::System)
                .await
            {
                Ok(removed) if removed > 0 => {
                    info!(removed, "Work retention sweep completed");
                }
                Err(e) => {
                    warn!(error = %e, "Work retention sweep failed");
                }
                _ => {}
            }
        }
    });

    let state = AppState {
        registrations,
        registry,
        tokens,
        checkins,
        dispatcher,
        jwt,
        operators,
        confirm_limiter,
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "Fleet server listening");

    tokio::select! {
        result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        ) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Fleet server stopped");
    Ok(())
}

fn parse_pairs(raw: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once(':')
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .ok_or_else(|| anyhow::anyhow!("Expected name:value, got '{entry}'"))
        })
        .collect()
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".weaver").join("fleet.db"))
}
