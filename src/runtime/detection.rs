// ABOUTME: Runtime detection for the local host.
// ABOUTME: Honours overrides and DOCKER_HOST, then checks Podman sockets before Docker.

use super::types::{RuntimeConfig, RuntimeSocket, RuntimeType};
use std::path::Path;

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("unsupported DOCKER_HOST '{0}': only unix:// sockets are supported")]
    UnsupportedHost(String),
}

/// Host facts detection depends on, so tests can supply their own.
pub struct HostProbe<'a> {
    pub docker_host: Option<String>,
    pub uid: Option<String>,
    pub exists: &'a dyn Fn(&Path) -> bool,
}

/// Detect the container runtime on this host.
///
/// Detection order (when not explicitly configured):
/// 1. `DOCKER_HOST` when it names a `unix://` socket
/// 2. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 3. Rootful Podman socket (`/run/podman/podman.sock`)
/// 4. Docker socket (`/var/run/docker.sock`)
pub fn detect_runtime(config: Option<&RuntimeConfig>) -> Result<RuntimeSocket, DetectionError> {
    let probe = HostProbe {
        docker_host: std::env::var("DOCKER_HOST").ok(),
        uid: get_uid(),
        exists: &|p: &Path| p.exists(),
    };
    detect_with(config, &probe)
}

pub fn detect_with(
    config: Option<&RuntimeConfig>,
    probe: &HostProbe<'_>,
) -> Result<RuntimeSocket, DetectionError> {
    if let Some(cfg) = config {
        match (cfg.runtime, &cfg.socket) {
            (Some(runtime_type), socket) => {
                return Ok(RuntimeSocket {
                    runtime_type,
                    socket_path: socket
                        .clone()
                        .unwrap_or_else(|| default_socket_path(runtime_type)),
                });
            }
            (None, Some(socket)) => {
                return Ok(RuntimeSocket {
                    runtime_type: guess_type(socket),
                    socket_path: socket.clone(),
                });
            }
            (None, None) => {}
        }
    }

    if let Some(host) = probe.docker_host.as_deref().filter(|h| !h.is_empty()) {
        let socket = host
            .strip_prefix("unix://")
            .ok_or_else(|| DetectionError::UnsupportedHost(host.to_string()))?;
        return Ok(RuntimeSocket {
            runtime_type: guess_type(socket),
            socket_path: socket.to_string(),
        });
    }

    if let Some(uid) = &probe.uid {
        let rootless = format!("/run/user/{uid}/podman/podman.sock");
        if (probe.exists)(Path::new(&rootless)) {
            return Ok(RuntimeSocket {
                runtime_type: RuntimeType::Podman,
                socket_path: rootless,
            });
        }
    }

    if (probe.exists)(Path::new(ROOTFUL_PODMAN)) {
        return Ok(RuntimeSocket {
            runtime_type: RuntimeType::Podman,
            socket_path: ROOTFUL_PODMAN.to_string(),
        });
    }

    if (probe.exists)(Path::new(DOCKER_SOCKET)) {
        return Ok(RuntimeSocket {
            runtime_type: RuntimeType::Docker,
            socket_path: DOCKER_SOCKET.to_string(),
        });
    }

    Err(DetectionError::NoRuntimeFound)
}

fn guess_type(socket: &str) -> RuntimeType {
    if socket.contains("podman") {
        RuntimeType::Podman
    } else {
        RuntimeType::Docker
    }
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        // Fall back to reading /proc/self/status
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(str::to_string)
            })
    })
}

fn default_socket_path(runtime: RuntimeType) -> String {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET.to_string(),
        RuntimeType::Podman => ROOTFUL_PODMAN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe<'a>(
        docker_host: Option<&str>,
        exists: &'a dyn Fn(&Path) -> bool,
    ) -> HostProbe<'a> {
        HostProbe {
            docker_host: docker_host.map(str::to_string),
            uid: Some("1000".to_string()),
            exists,
        }
    }

    #[test]
    fn explicit_runtime_wins() {
        let config = RuntimeConfig {
            runtime: Some(RuntimeType::Podman),
            socket: None,
        };
        let found = detect_with(Some(&config), &probe(None, &|_| true)).unwrap();
        assert_eq!(found.runtime_type, RuntimeType::Podman);
        assert_eq!(found.socket_path, ROOTFUL_PODMAN);
    }

    #[test]
    fn docker_host_unix_socket_is_used() {
        let found =
            detect_with(None, &probe(Some("unix:///tmp/docker.sock"), &|_| false)).unwrap();
        assert_eq!(found.socket_path, "/tmp/docker.sock");
        assert_eq!(found.runtime_type, RuntimeType::Docker);
    }

    #[test]
    fn docker_host_tcp_is_rejected() {
        let err = detect_with(None, &probe(Some("tcp://10.0.0.1:2375"), &|_| true)).unwrap_err();
        assert!(matches!(err, DetectionError::UnsupportedHost(_)));
    }

    #[test]
    fn rootless_podman_preferred_over_docker() {
        let found = detect_with(None, &probe(None, &|_| true)).unwrap();
        assert_eq!(found.socket_path, "/run/user/1000/podman/podman.sock");
    }

    #[test]
    fn falls_back_to_docker_socket() {
        let only_docker = |p: &Path| p == Path::new(DOCKER_SOCKET);
        let found = detect_with(None, &probe(None, &only_docker)).unwrap();
        assert_eq!(found.runtime_type, RuntimeType::Docker);
    }

    #[test]
    fn nothing_found() {
        let err = detect_with(None, &probe(None, &|_| false)).unwrap_err();
        assert!(matches!(err, DetectionError::NoRuntimeFound));
    }
}
