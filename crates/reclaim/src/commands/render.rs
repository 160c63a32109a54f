//! Shared output helpers for `who` and `unlock`.

use reclaim_core::process::{AppKind, AppStatus, LockingProcess};

/// Human-readable status, e.g. "running" or "stopped, restart failed".
pub fn status_label(status: AppStatus) -> String {
    if status.is_empty() {
        return "unknown".to_string();
    }
    let mut parts = Vec::new();
    for (flag, label) in [
        (AppStatus::RUNNING, "running"),
        (AppStatus::STOPPED, "stopped"),
        (AppStatus::STOPPED_OTHER, "stopped externally"),
        (AppStatus::RESTARTED, "restarted"),
        (AppStatus::ERROR_ON_STOP, "shutdown failed"),
        (AppStatus::ERROR_ON_RESTART, "restart failed"),
        (AppStatus::SHUTDOWN_MASKED, "shutdown masked"),
        (AppStatus::RESTART_MASKED, "restart masked"),
    ] {
        if status.contains(flag) {
            parts.push(label);
        }
    }
    parts.join(", ")
}

pub fn kind_label(kind: AppKind) -> &'static str {
    match kind {
        AppKind::Unknown => "unknown",
        AppKind::MainWindow => "application",
        AppKind::OtherWindow => "background app",
        AppKind::Service => "service",
        AppKind::Explorer => "explorer",
        AppKind::Console => "console",
        AppKind::Critical => "critical",
    }
}

/// One line per process: PID, kind, status, name.
pub fn print_process(proc: &LockingProcess) {
    let restart = if proc.restartable {
        "restartable"
    } else {
        "not restartable"
    };
    println!(
        "  {:>7}  {:<14} {:<24} {} ({restart})",
        proc.pid,
        kind_label(proc.kind),
        status_label(proc.status),
        proc.app_name,
    );
}

/// The whole snapshot as a JSON array.
pub fn to_json(procs: &[LockingProcess]) -> serde_json::Value {
    serde_json::Value::Array(
        procs
            .iter()
            .map(|p| {
                serde_json::json!({
                    "pid": p.pid,
                    "app_name": p.app_name,
                    "service_name": p.service_name,
                    "kind": kind_label(p.kind),
                    "status": status_label(p.status),
                    "restartable": p.restartable,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_label_joins_set_bits() {
        assert_eq!(status_label(AppStatus::empty()), "unknown");
        assert_eq!(status_label(AppStatus::RUNNING), "running");
        assert_eq!(
            status_label(AppStatus::STOPPED | AppStatus::ERROR_ON_RESTART),
            "stopped, restart failed"
        );
    }

    #[test]
    fn json_carries_the_snapshot_fields() {
        let proc = LockingProcess {
            pid: 1234,
            start_time: 0,
            app_name: "App".into(),
            service_name: String::new(),
            kind: AppKind::MainWindow,
            status: AppStatus::RUNNING,
            restartable: false,
        };
        let value = to_json(std::slice::from_ref(&proc));
        assert_eq!(value[0]["pid"], 1234);
        assert_eq!(value[0]["status"], "running");
        assert_eq!(value[0]["kind"], "application");
    }
}
