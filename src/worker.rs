use futures::future::join_all;
use log::{error, info, warn};
use std::{fs, path::Path};
use tokio::{select, sync::Semaphore, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::checker::{CheckOutcome, Probe};
use crate::config::MonitorConfig;
use crate::registry::TargetRegistry;

/// Tally of the outcomes of one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub accessible: usize,
    pub alerted: usize,
    pub timed_out: usize,
    pub errored: usize,
}

impl RoundSummary {
    fn record(&mut self, outcome: &CheckOutcome) {
        match outcome {
            CheckOutcome::Accessible { .. } => self.accessible += 1,
            CheckOutcome::AlertedInaccessible { .. } => self.alerted += 1,
            CheckOutcome::TimedOut => self.timed_out += 1,
            CheckOutcome::RequestError(_) => self.errored += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.accessible + self.alerted + self.timed_out + self.errored
    }
}

/// Runs rounds of checks over every monitored target.
pub struct Scheduler<P> {
    config: MonitorConfig,
    registry: TargetRegistry,
    probe: P,
}

impl<P: Probe> Scheduler<P> {
    pub fn new(config: MonitorConfig, registry: TargetRegistry, probe: P) -> Self {
        Self {
            config,
            registry,
            probe,
        }
    }

    /// Runs the configured number of rounds, or until `token` is cancelled
    /// when the run count is unbounded.
    ///
    /// Cancellation is only honoured between rounds and during the delay, a
    /// started round always finishes. Returns the number of completed rounds.
    pub async fn run(&self, token: &CancellationToken) -> u64 {
        let limit = self.config.run_limit();
        let delay = self.config.iteration_delay;

        // Initial configuration logging
        info!("Starting website monitoring...");
        match limit {
            Some(n) => info!("Rounds: {n}"),
            None => info!("Rounds: unbounded"),
        }
        info!("Iteration delay: {delay} seconds");
        info!("Timeout: {} seconds", self.config.timeout);
        info!("Concurrent requests: {}", self.config.concurrent_requests);
        if self.config.send_alerts {
            info!("Alerts are enabled, a notification will be sent on failure");
        } else {
            warn!("Alerts are disabled, no notifications will be sent");
        }
        info!(
            "Monitoring {} websites ({} excluded)",
            self.registry.monitored().count(),
            self.registry.len() - self.registry.monitored().count()
        );

        let mut completed = 0;
        while limit.is_none_or(|n| completed < n) {
            if token.is_cancelled() {
                info!("Shutdown requested, stopping monitor");
                break;
            }

            let summary = self.run_round().await;
            info!(
                "Iteration {}: {} accessible, {} alerted, {} timed out, {} failed",
                completed + 1,
                summary.accessible,
                summary.alerted,
                summary.timed_out,
                summary.errored
            );
            completed += 1;

            for line in progress_lines(completed, limit, delay) {
                progress(&line);
            }
            if limit == Some(completed) {
                break;
            }

            if delay > 0.0 {
                select! {
                    () = sleep(self.config.iteration_delay_duration()) => {
                        progress(&format!(
                            "Delay of {delay} seconds completed. Starting the next iteration."
                        ));
                    },
                    () = token.cancelled() => {
                        info!("Shutdown requested during sleep");
                        break;
                    }
                }
            }
        }

        if self.config.check_file_size {
            prune_log(&self.config.log_file, self.config.max_log_bytes());
        }

        info!("Website monitoring stopped after {completed} iterations");
        completed
    }

    /// Checks every monitored target once, at most `concurrent_requests` at
    /// a time, and waits for all of them.
    pub async fn run_round(&self) -> RoundSummary {
        let limiter = Semaphore::new(self.config.concurrent_requests);

        let checks = self.registry.monitored().map(|target| {
            let limiter = &limiter;
            async move {
                let _permit = match limiter.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("{}: check skipped, limiter unavailable: {e}", target.url);
                        return None;
                    }
                };
                Some(self.probe.check(target).await)
            }
        });

        let mut summary = RoundSummary::default();
        for outcome in join_all(checks).await.into_iter().flatten() {
            summary.record(&outcome);
        }
        summary
    }
}

/// Lines reported once round number `completed` has finished, before any
/// delay. The last finite round only reports when a delay is configured.
fn progress_lines(completed: u64, limit: Option<u64>, delay: f64) -> Vec<String> {
    match limit {
        Some(n) if completed < n => vec![format!(
            "Iteration {completed}/{n} completed. Delaying for {delay} seconds."
        )],
        Some(_) if delay > 0.0 => vec!["Last iteration completed.".to_string()],
        Some(_) => Vec::new(),
        None => vec![format!(
            "Iteration {completed} completed. Delaying for {delay} seconds."
        )],
    }
}

fn progress(line: &str) {
    println!("{line}");
    info!("{line}");
}

/// Deletes the log file once it has grown past `max_bytes`.
///
/// Returns whether the file was removed.
pub fn prune_log(path: &Path, max_bytes: u64) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() || metadata.len() <= max_bytes {
        return false;
    }

    log::logger().flush();
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to remove log file {}: {e}", path.display());
            false
        }
    }
}
