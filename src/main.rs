mod autopilot;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use one_more_task::protocol::WorldSnapshot;
use one_more_task::{SimConfig, Simulation};

const SAVE_EVERY: Duration = Duration::from_secs(30);
const STATUS_EVERY: Duration = Duration::from_secs(10);

/// On-disk save envelope.
#[derive(Serialize, Deserialize)]
struct SaveFile {
    /// Unix seconds at save time, used for the offline estimate.
    saved_at: u64,
    snapshot: WorldSnapshot,
}

fn save_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("one-more-task").join("save.msgpack"))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

async fn load(path: &Path, config: &SimConfig) -> anyhow::Result<Option<Simulation>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let save: SaveFile = rmp_serde::from_slice(&bytes)
        .with_context(|| format!("decoding {}", path.display()))?;

    let mut sim = Simulation::restore(save.snapshot, config.clone())?;
    let away = unix_now().saturating_sub(save.saved_at) as f64;
    if let Some(report) = sim.project_offline_progress(away) {
        info!(
            seconds = report.seconds,
            earned = report.earned,
            expenses = report.expenses,
            runs = report.scheduled_runs,
            "Welcome back"
        );
        sim.credit_offline(&report);
    }
    Ok(Some(sim))
}

async fn save(path: &Path, sim: &Simulation) -> anyhow::Result<()> {
    let file = SaveFile {
        saved_at: unix_now(),
        snapshot: sim.snapshot(),
    };
    let bytes = rmp_serde::to_vec_named(&file).context("encoding save")?;
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!("Saved to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = SimConfig::load().context("loading config")?;
    let fresh = std::env::args().any(|a| a == "--fresh");
    let path = save_path();

    let mut sim = match (&path, fresh) {
        (Some(path), false) => match load(path, &config).await {
            Ok(Some(sim)) => sim,
            Ok(None) => Simulation::new(config.clone())?,
            Err(e) => {
                warn!("Ignoring unreadable save: {:#}", e);
                Simulation::new(config.clone())?
            }
        },
        _ => Simulation::new(config.clone())?,
    };
    info!(seed = config.seed, tick = config.tick_seconds, "Simulation running");

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(config.tick_seconds));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last = Instant::now();
    let mut last_save = Instant::now();
    let mut last_status = Instant::now();
    let mut seen = sim.state().log.written();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("Interrupted");
                break;
            }
        }

        let now = Instant::now();
        sim.advance(now.duration_since(last).as_secs_f64());
        last = now;

        if let Some(intent) = autopilot::next_intent(&sim) {
            // Rejections are already logged by the simulation.
            let _ = sim.apply(intent);
        }

        for entry in sim.state().log.since(seen) {
            println!("[{:>8.1}s] {}", entry.at, entry.text);
        }
        seen = sim.state().log.written();
        for notice in sim.drain_notices() {
            println!("\n== {} ==\n{}\n", notice.title, notice.body);
        }

        if last_status.elapsed() >= STATUS_EVERY {
            let economy = sim.economy();
            info!(
                phase = sim.state().phase,
                cash = economy.cash,
                tokens = economy.tokens,
                income = economy.income_per_sec,
                expenses = economy.expenditure_per_sec,
                "status"
            );
            last_status = Instant::now();
        }

        if sim.state().flags.retired {
            info!("Run complete");
            break;
        }

        if let Some(path) = &path {
            if last_save.elapsed() >= SAVE_EVERY {
                if let Err(e) = save(path, &sim).await {
                    warn!("Save failed: {:#}", e);
                }
                last_save = Instant::now();
            }
        }
    }

    if let Some(path) = &path {
        save(path, &sim).await?;
    }
    Ok(())
}
