use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use query_bench_core::prelude::DelegatedShutdownListener;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

const WARNING_INTERVAL: Duration = Duration::from_secs(10);

/// Monitor the CPU usage of the harness and report high usage.
///
/// This won't stop the experiment, it logs a warning so the user knows that client side load may
/// be inflating the measured latencies. Usage is sampled every [sysinfo::MINIMUM_CPU_UPDATE_INTERVAL]
/// and a warning is logged, at most every few seconds, when it is above 10% of all cores.
pub(crate) fn start_monitor(shutdown_listener: DelegatedShutdownListener) {
    let spawned = std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            let this_process_pid = Pid::from_u32(std::process::id());
            let cpu_count = std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1);
            let mut sys = System::new();
            let mut last_warning: Option<Instant> = None;

            loop {
                if shutdown_listener.should_shutdown() {
                    log::trace!("Monitor thread shutting down");
                    break;
                }

                sys.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[this_process_pid]),
                    true,
                    ProcessRefreshKind::nothing().with_cpu(),
                );

                if let Some(process) = sys.process(this_process_pid) {
                    let usage = process.cpu_usage() / cpu_count as f32;
                    let due = last_warning.map_or(true, |at| at.elapsed() >= WARNING_INTERVAL);
                    if usage > 10.0 && due {
                        log::warn!(
                            "High CPU usage detected. The benchmark is using {:.2}% of the CPU, with {} available cores",
                            usage,
                            cpu_count
                        );
                        last_warning = Some(Instant::now());
                    }
                }

                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            }
        });

    if let Err(e) = spawned {
        log::error!("Failed to start monitor thread: {e}");
    }
}
