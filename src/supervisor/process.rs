//! Handing the launch command to a shell.
//!
//! The shell is spawned with a piped stdin, receives the command line,
//! and is then left alone. No handle to the game server is kept: liveness is
//! always re-derived from the process table, because the server may also be
//! started or stopped outside the watchdog.

use std::io::Write;
use std::process::{Command, Stdio};

use super::error::StartupError;

/// Something that can start the server from a command line.
pub trait Launcher: Send + Sync {
    fn launch(&self, command: &str) -> Result<(), StartupError>;
}

/// Writes the command to a shell's stdin (`cmd.exe` by default) and detaches.
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    shell: String,
}

impl ShellLauncher {
    pub fn new(shell: &str) -> Self {
        Self {
            shell: shell.to_string(),
        }
    }
}

impl Launcher for ShellLauncher {
    fn launch(&self, command: &str) -> Result<(), StartupError> {
        let mut cmd = Command::new(&self.shell);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Windows: hide console window
        crate::utils::apply_creation_flags(&mut cmd);

        let mut child = cmd.spawn().map_err(|source| StartupError::Spawn {
            shell: self.shell.clone(),
            source,
        })?;
        tracing::debug!("Spawned '{}' (PID: {})", self.shell, child.id());

        if let Some(mut stdin) = child.stdin.take() {
            let written = writeln!(stdin, "{}", command).and_then(|_| stdin.flush());
            if let Err(source) = written {
                // 셸이 이미 종료되었을 수 있음. 좀비가 남지 않도록 정리
                let _ = child.kill();
                let _ = child.wait();
                return Err(StartupError::Stdin {
                    shell: self.shell.clone(),
                    source,
                });
            }
            // stdin drop → EOF, 셸은 명령 실행 후 종료
        }

        // 셸의 종료 코드만 회수한다 (서버 추적 용도가 아님)
        let shell = self.shell.clone();
        std::thread::spawn(move || match child.wait() {
            Ok(status) => tracing::debug!("Shell '{}' exited with {}", shell, status),
            Err(e) => tracing::debug!("Failed to wait on shell '{}': {}", shell, e),
        });

        Ok(())
    }
}
