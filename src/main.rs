use anyhow::{Context, Result};
use arkhe_lib::app::{SharedFieldCoordinator, ShutdownManager, SimulationWorker};
use arkhe_lib::model::config::AppConfig;
use arkhe_lib::model::engine::SimulationEngine;
use arkhe_lib::model::metrics::init_logging;
use arkhe_lib::server::{self, AppState, ControlPlane};
use clap::Parser;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "arkhe.toml")]
    config: String,

    /// Run the simulation without the control plane
    #[arg(long)]
    headless: bool,

    /// Control-plane listen address, overrides the config file
    #[arg(long)]
    bind: Option<String>,

    /// RNG seed, overrides the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Agent population, overrides the config file
    #[arg(long)]
    agents: Option<usize>,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            config.control.bind = bind.clone();
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
        }
        if let Some(agents) = self.agents {
            config.simulation.agent_count = agents;
        }
        if self.headless {
            config.control.enabled = false;
        }
    }
}

/// Starts the simulation worker. Failure leaves the control plane to run in
/// degraded mode.
fn start_simulation(
    config: &AppConfig,
) -> Result<(Arc<SharedFieldCoordinator>, SimulationWorker)> {
    let engine = SimulationEngine::new(config).context("building simulation engine")?;
    let coordinator = Arc::new(
        SharedFieldCoordinator::for_engine(&engine, config.control.telemetry_capacity)
            .with_queue_limit(config.control.max_pending_injections),
    );
    let worker = SimulationWorker::spawn(engine, Arc::clone(&coordinator), config.into())
        .context("spawning simulation thread")?;
    Ok((coordinator, worker))
}

fn stop_simulation(worker: Option<SimulationWorker>) {
    if let Some(worker) = worker {
        if let Some(engine) = worker.shutdown() {
            tracing::info!(
                ticks = engine.tick_count(),
                sim_time = engine.sim_time(),
                "Simulation stopped"
            );
        }
    }
}

#[tokio::main]
async fn main() {
    init_logging("arkhe=info,arkhe_lib=info,arkhe_core=info");

    let args = Args::parse();
    tracing::info!("Arkhe core booting");

    let (mut config, config_error) = match AppConfig::load(&args.config) {
        Ok(config) => (config, None),
        Err(e) => {
            tracing::error!("Failed to load config {}: {:#}", args.config, e);
            (AppConfig::default(), Some(format!("{e:#}")))
        }
    };
    args.apply(&mut config);

    let (coordinator, worker) = match config_error {
        Some(e) => (None, Err(e)),
        None => match start_simulation(&config) {
            Ok((coordinator, worker)) => (Some(coordinator), Ok(worker)),
            Err(e) => {
                tracing::error!("Simulation disabled: {:#}", e);
                (None, Err(format!("{e:#}")))
            }
        },
    };
    let (worker, startup_error) = match worker {
        Ok(worker) => (Some(worker), None),
        Err(e) => (None, Some(e)),
    };

    let shutdown = Arc::new(ShutdownManager::new());
    {
        let shutdown = Arc::clone(&shutdown);
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
            tracing::info!("Ctrl+C received, initiating graceful shutdown...");
            if let Some(coordinator) = coordinator {
                coordinator.begin_shutdown();
            }
            shutdown.request_shutdown();
        });
    }

    if !config.control.enabled {
        if worker.is_none() {
            tracing::error!("Neither the simulation nor the control plane is running");
            std::process::exit(1);
        }
        tracing::warn!("Control plane disabled; simulation running headless");
        shutdown.wait().await;
        let _ = tokio::task::spawn_blocking(move || stop_simulation(worker)).await;
        std::process::exit(shutdown.exit_code());
    }

    let control = match (&coordinator, startup_error) {
        (Some(coordinator), _) => ControlPlane::new(Arc::clone(coordinator)),
        (None, Some(e)) => ControlPlane::degraded(e),
        (None, None) => ControlPlane::degraded("simulation not started"),
    };

    let api_key = std::env::var("ARKHE_API_KEY")
        .ok()
        .filter(|k| !k.is_empty());
    if api_key.is_some() {
        tracing::info!("API key authentication enabled for injections");
    } else {
        tracing::warn!("No ARKHE_API_KEY set; injection endpoint is open");
    }

    let state = Arc::new(AppState::new(control, api_key, Arc::clone(&shutdown)));

    let listener = match tokio::net::TcpListener::bind(&config.control.bind).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", config.control.bind, e);
            let _ = tokio::task::spawn_blocking(move || stop_simulation(worker)).await;
            std::process::exit(1);
        }
    };

    tracing::info!("Arkhe control plane listening on {}", config.control.bind);
    tracing::info!("    Status API: http://{}/api/status", config.control.bind);
    tracing::info!("    Inject API: http://{}/api/inject", config.control.bind);
    tracing::info!("    Telemetry:  ws://{}/ws", config.control.bind);

    if let Err(e) = server::serve(listener, state).await {
        tracing::error!("Server error: {:#}", e);
        shutdown.set_exit_code(1);
    }

    if let Some(coordinator) = &coordinator {
        coordinator.begin_shutdown();
    }
    let _ = tokio::task::spawn_blocking(move || stop_simulation(worker)).await;
    std::process::exit(shutdown.exit_code());
}
