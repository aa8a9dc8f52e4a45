//! Bounded probe execution. Every probe is re-checked against the safety
//! gate, spawned through `bash -lc` in its own process group, and killed
//! with its whole group on timeout or interrupt.

use std::process::Stdio;
use std::time::{Duration, Instant};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::process::Command;
use tokio::time::timeout;

use crate::safety;

/// Wall-clock limit per probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// Overall limit for the whole scout phase.
pub const PHASE_BUDGET: Duration = Duration::from_secs(60);

pub const RC_TIMEOUT: i32 = 124;
pub const RC_GATE_REJECTED: i32 = 126;
pub const RC_INTERRUPTED: i32 = 130;

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub cmd: String,
    pub stdout: String,
    pub stderr: String,
    pub rc: i32,
    pub reason: Option<String>,
}

impl ProbeResult {
    fn unexecuted(cmd: &str, rc: i32, stderr: &str, reason: &str) -> ProbeResult {
        ProbeResult {
            cmd: cmd.to_string(),
            stdout: String::new(),
            stderr: stderr.to_string(),
            rc,
            reason: Some(reason.to_string()),
        }
    }
}

/// Run probes sequentially with the standard limits. Result order matches
/// input order.
pub async fn execute(probes: &[String]) -> Vec<ProbeResult> {
    execute_with_limits(probes, PROBE_TIMEOUT, PHASE_BUDGET).await
}

pub async fn execute_with_limits(
    probes: &[String],
    probe_timeout: Duration,
    budget: Duration,
) -> Vec<ProbeResult> {
    let started = Instant::now();
    let mut results = Vec::with_capacity(probes.len());
    let mut interrupted = false;

    for probe in probes {
        if interrupted {
            results.push(ProbeResult::unexecuted(
                probe,
                RC_INTERRUPTED,
                "INTERRUPTED",
                "interrupted by user",
            ));
            continue;
        }
        if started.elapsed() >= budget {
            results.push(ProbeResult::unexecuted(
                probe,
                RC_TIMEOUT,
                "TIMEOUT",
                "scout budget exhausted",
            ));
            continue;
        }
        if let Err(reason) = safety::vet(probe) {
            tracing::warn!(%probe, %reason, "safety gate rejected probe");
            results.push(ProbeResult {
                cmd: probe.clone(),
                stdout: String::new(),
                stderr: String::new(),
                rc: RC_GATE_REJECTED,
                reason: Some(reason),
            });
            continue;
        }

        let (result, hit_interrupt) = run_probe(probe, probe_timeout).await;
        tracing::debug!(%probe, rc = result.rc, "probe finished");
        interrupted = hit_interrupt;
        results.push(result);
    }

    results
}

async fn run_probe(probe: &str, probe_timeout: Duration) -> (ProbeResult, bool) {
    let mut command = Command::new("bash");
    command
        .arg("-lc")
        .arg(probe)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            return (
                ProbeResult::unexecuted(probe, 1, &e.to_string(), "spawn failed"),
                false,
            );
        }
    };
    let pid = child.id();

    tokio::select! {
        waited = timeout(probe_timeout, child.wait_with_output()) => {
            let result = match waited {
                Ok(Ok(output)) => ProbeResult {
                    cmd: probe.to_string(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    rc: output.status.code().unwrap_or(1),
                    reason: None,
                },
                Ok(Err(e)) => ProbeResult::unexecuted(probe, 1, &e.to_string(), "wait failed"),
                Err(_) => {
                    kill_process_group(pid);
                    ProbeResult::unexecuted(probe, RC_TIMEOUT, "TIMEOUT", "probe timeout")
                }
            };
            (result, false)
        }
        _ = tokio::signal::ctrl_c() => {
            kill_process_group(pid);
            (
                ProbeResult::unexecuted(probe, RC_INTERRUPTED, "INTERRUPTED", "interrupted by user"),
                true,
            )
        }
    }
}

fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout_and_rc() {
        let results = execute(&["echo hello".to_string()]).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rc, 0);
        assert_eq!(results[0].stdout.trim(), "hello");
        assert!(results[0].stderr.is_empty());
    }

    #[tokio::test]
    async fn test_streams_never_merged() {
        let results = execute(&["ls /definitely-not-a-real-dir-xyz".to_string()]).await;
        assert_ne!(results[0].rc, 0);
        assert!(results[0].stdout.is_empty());
        assert!(!results[0].stderr.is_empty());
    }

    #[tokio::test]
    async fn test_gate_rejection_never_spawns() {
        let results = execute(&["rm -rf /tmp/x".to_string()]).await;
        assert_eq!(results[0].rc, RC_GATE_REJECTED);
        assert!(results[0].reason.as_deref().unwrap().contains("rm"));
        assert!(results[0].stdout.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_kills_probe() {
        let results = execute_with_limits(
            &["sleep 5".to_string()],
            Duration::from_millis(200),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(results[0].rc, RC_TIMEOUT);
        assert_eq!(results[0].stderr, "TIMEOUT");
    }

    #[tokio::test]
    async fn test_budget_skips_remaining_probes() {
        let probes = vec!["sleep 5".to_string(), "echo after".to_string()];
        let results =
            execute_with_limits(&probes, Duration::from_millis(200), Duration::from_millis(100))
                .await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rc, RC_TIMEOUT);
        assert_eq!(results[1].rc, RC_TIMEOUT);
        assert_eq!(results[1].reason.as_deref(), Some("scout budget exhausted"));
    }

    #[tokio::test]
    async fn test_result_order_matches_input() {
        let probes = vec![
            "echo one".to_string(),
            "rm -rf /".to_string(),
            "echo three".to_string(),
        ];
        let results = execute(&probes).await;
        assert_eq!(results[0].stdout.trim(), "one");
        assert_eq!(results[1].rc, RC_GATE_REJECTED);
        assert_eq!(results[2].stdout.trim(), "three");
    }
}
