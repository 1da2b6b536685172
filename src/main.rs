//! transfer_lab - scenario runner
//!
//! ```text
//! ┌──────────┐    ┌─────────────────┐    ┌──────────────────┐
//! │  Config  │───▶│ Unguarded run   │───▶│ Deadlock report  │
//! │  (YAML)  │    │ (thread/xfer)   │    │ (monitor+watch)  │
//! └──────────┘    └─────────────────┘    └──────────────────┘
//!      │          ┌─────────────────┐    ┌──────────────────┐
//!      └─────────▶│ Serialized run  │───▶│ Final balances   │
//!                 │ (one gate)      │    │ (conserved)      │
//!                 └─────────────────┘    └──────────────────┘
//! ```
//!
//! Usage: `transfer_lab [--env dev] [--scenario unguarded|serialized|race|all] [--json]`
//!
//! Deadlocked transfer threads from the unguarded run are left blocked;
//! returning from `main` ends the process regardless.

use std::sync::Arc;
use std::thread;

use anyhow::Context;
use tracing::info;

use transfer_lab::bank::{Bank, Snapshot};
use transfer_lab::collections::{LockFreeLog, SharedMap, SnapshotList, SyncList};
use transfer_lab::config::{AppConfig, ScenarioConfig};
use transfer_lab::lock::{DeadlockWatchdog, LockMonitor};
use transfer_lab::race::{AtomicCounter, RacyAccount, RacyCounter};
use transfer_lab::scenario::{SerialExecutor, UnguardedRunner};

fn get_arg(flag: &str, short: Option<&str>) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == flag || Some(args[i].as_str()) == short) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    get_arg("--env", Some("-e")).unwrap_or_else(|| "dev".to_string())
}

fn get_scenario() -> String {
    get_arg("--scenario", Some("-s")).unwrap_or_else(|| "all".to_string())
}

fn use_json_output() -> bool {
    std::env::args().any(|a| a == "--json")
}

fn print_snapshot(snapshot: &Snapshot, expected_total: i64) {
    for (name, balance) in &snapshot.balances {
        println!("  {:<8} {:>6}", name, balance);
    }
    println!(
        "  {:<8} {:>6}  (expected {})",
        "total",
        snapshot.total(),
        expected_total
    );
}

// ============================================================
// SCENARIOS
// ============================================================

fn run_unguarded(scenario: &ScenarioConfig, json: bool) -> anyhow::Result<()> {
    println!("\n=== Unguarded: one thread per transfer, per-account locks ===");

    let monitor = Arc::new(LockMonitor::new());
    let bank = Bank::monitored(scenario, &monitor)?;
    let watchdog = DeadlockWatchdog::spawn(monitor.clone(), scenario.watchdog_interval())?;

    let report = UnguardedRunner::new(&bank)
        .with_monitor(monitor)
        .with_settle(scenario.settle())
        .run(&scenario.plans())?;

    let cycles = watchdog.stop();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for outcome in &report.outcomes {
        let status = match (outcome.joined_in_time, outcome.finished) {
            (true, _) => "joined in time",
            (false, true) => "finished late",
            (false, false) => "STUCK",
        };
        println!("  {:<32} {}", outcome.thread, status);
    }
    match &report.snapshot {
        Some(snapshot) => print_snapshot(snapshot, report.expected_total),
        None => println!("  balances unavailable: transfers still hold account locks"),
    }
    for deadlock in &report.deadlocks {
        println!("  Deadlock cycle:");
        for blocked in &deadlock.threads {
            println!(
                "    {} waits on {} held by {}",
                blocked.thread,
                blocked.lock_label,
                blocked.owner.as_deref().unwrap_or("?")
            );
        }
    }
    info!(cycles, "Unguarded scenario done");
    Ok(())
}

fn run_serialized(scenario: &ScenarioConfig) -> anyhow::Result<()> {
    println!("\n=== Serialized: one external gate around every transfer ===");

    let bank = Bank::plain(scenario)?;
    let gate = Arc::new(tokio::sync::Mutex::new(()));
    let executor = SerialExecutor::new(gate);

    let rt = tokio::runtime::Runtime::new().context("Failed to build tokio runtime")?;
    let snapshot = rt.block_on(executor.run(&bank, &scenario.plans()))?;

    print_snapshot(&snapshot, bank.expected_total());
    Ok(())
}

fn run_race_demos() -> anyhow::Result<()> {
    println!("\n=== Races: check-then-act and lost updates ===");

    let source = Arc::new(
        RacyAccount::new("Hangga", 100).with_check_delay(std::time::Duration::from_millis(20)),
    );
    let target = Arc::new(RacyAccount::new("John", 0));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let (source, target) = (source.clone(), target.clone());
            thread::spawn(move || source.transfer(&target, 100))
        })
        .collect();
    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("racy transfer thread panicked"))?;
    }
    println!(
        "  racy account: {}={} {}={} (sum {})",
        source.name(),
        source.balance(),
        target.name(),
        target.balance(),
        source.balance() + target.balance()
    );

    let racy = Arc::new(RacyCounter::new());
    let atomic = Arc::new(AtomicCounter::new());
    let sync_list = Arc::new(SyncList::new());
    let log = Arc::new(LockFreeLog::new());
    let handles: Vec<_> = (0..3)
        .map(|t| {
            let (racy, atomic, sync_list, log) =
                (racy.clone(), atomic.clone(), sync_list.clone(), log.clone());
            thread::spawn(move || {
                for i in (t * 100 + 1)..=(t * 100 + 100) {
                    racy.increment();
                    atomic.increment();
                    sync_list.push(i);
                    log.append(i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("counter thread panicked"))?;
    }
    println!("  racy counter:   {} / 300", racy.get());
    println!("  atomic counter: {} / 300", atomic.get());
    println!("  sync list:      {} / 300", sync_list.len());
    println!("  lock-free log:  {} / 300", log.len());

    let list: SnapshotList<i32> = (1..=5).collect();
    for item in list.snapshot().iter() {
        if *item == 3 {
            list.remove(item);
        }
    }
    println!("  copy-on-write list after removal: {:?}", list.snapshot());

    let map = Arc::new(SharedMap::new());
    let handles: Vec<_> = (0..2)
        .map(|t| {
            let map = map.clone();
            thread::spawn(move || {
                for i in (t * 100)..(t * 100 + 100) {
                    map.insert(i, i * 2);
                }
            })
        })
        .collect();
    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("map writer thread panicked"))?;
    }
    map.remove(&0);
    println!("  shared map:     {} / 199 after one removal", map.len());
    Ok(())
}

// ============================================================
// MAIN
// ============================================================

fn main() -> anyhow::Result<()> {
    let env = get_env();
    let scenario_name = get_scenario();
    let json = use_json_output();

    let app_config = AppConfig::load(&env)?;
    let _log_guard = transfer_lab::logging::init_logging(&app_config)?;

    info!("Starting transfer_lab in {} mode", env);
    let scenario = &app_config.scenario;

    match scenario_name.as_str() {
        "unguarded" => run_unguarded(scenario, json)?,
        "serialized" => run_serialized(scenario)?,
        "race" => run_race_demos()?,
        "all" => {
            run_serialized(scenario)?;
            run_race_demos()?;
            // Last: may leave threads deadlocked
            run_unguarded(scenario, json)?;
        }
        other => anyhow::bail!("Unknown scenario: {}", other),
    }

    Ok(())
}
