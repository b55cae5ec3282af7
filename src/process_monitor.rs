use sysinfo::System;

#[derive(Debug, Clone)]
pub struct RunningProcess {
    pub pid: u32,
    pub name: String,
}

/// 실행 중인 모든 프로세스 목록 가져오기
pub fn get_running_processes() -> Vec<RunningProcess> {
    let mut sys = System::new();
    sys.refresh_processes();

    let processes: Vec<RunningProcess> = sys
        .processes()
        .iter()
        .map(|(pid, process)| RunningProcess {
            pid: pid.as_u32(),
            name: process.name().to_string(),
        })
        .collect();

    tracing::debug!("Found {} running processes", processes.len());
    processes
}

/// Compare a process name with a wanted executable name, ignoring case and
/// a trailing `.exe` on either side.
pub fn name_matches(actual: &str, wanted: &str) -> bool {
    fn stem(name: &str) -> &str {
        let cut = name.len().saturating_sub(4);
        match (name.get(..cut), name.get(cut..)) {
            (Some(head), Some(ext)) if !head.is_empty() && ext.eq_ignore_ascii_case(".exe") => head,
            _ => name,
        }
    }
    stem(actual).eq_ignore_ascii_case(stem(wanted))
}

/// Liveness source for the supervisor.
pub trait ProcessProbe: Send + Sync + 'static {
    /// True when any process with one of `names` is running.
    fn any_running(&self, names: &[String]) -> bool;
}

/// Reads the OS process table through sysinfo.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn any_running(&self, names: &[String]) -> bool {
        // 프로세스 테이블은 한 번만 스캔
        let processes = get_running_processes();
        names.iter().any(|wanted| {
            processes.iter().any(|p| {
                let found = name_matches(&p.name, wanted);
                if found {
                    tracing::debug!("Found '{}' (PID: {})", p.name, p.pid);
                }
                found
            })
        })
    }
}

// sysinfo 스캔은 동기 호출이므로 spawn_blocking 으로 런타임 블로킹을 피한다.

/// `ProcessProbe::any_running`의 비동기 래퍼.
///
/// A scan that panics counts as "running": a broken probe must not start a
/// second server next to a live one.
pub async fn any_running_async<P: ProcessProbe>(probe: std::sync::Arc<P>, names: Vec<String>) -> bool {
    match tokio::task::spawn_blocking(move || probe.any_running(&names)).await {
        Ok(running) => running,
        Err(e) => {
            tracing::warn!("Process scan failed, assuming the server is running: {}", e);
            true
        }
    }
}
