// ABOUTME: Config scaffolding for new installations.
// ABOUTME: Writes a commented skiff.yml template populated with the defaults.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use humantime_serde::re::humantime::format_duration;

use super::{CONFIG_FILENAME, Config};

/// Write a `skiff.yml` template into `dir`, returning its path.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(&Config::default());
    std::fs::write(&config_path, yaml)?;

    Ok(config_path)
}

fn generate_template_yaml(config: &Config) -> String {
    let t = &config.timeouts;
    format!(
        r#"# Where deployment workspaces are cloned (one directory per deployment id)
repos_root: {repos_root}
# Where deployment records are kept
state_dir: {state_dir}
# Deployment urls are <container prefix>.<domain>
domain: {domain}
default_branch: {branch}
# Base image for repositories without a Dockerfile
base_image: {base_image}
# no | always | unless-stopped | on-failure[:N]
restart: {restart}

# Runtime is auto-detected (rootless Podman, rootful Podman, Docker) unless set here
# runtime:
#   runtime: docker
#   socket: /var/run/docker.sock

timeouts:
  clone: {clone}
  build: {build}
  start: {start}
  restart: {restart_timeout}
  stop: {stop}
stop_grace: {stop_grace}

# Accept file:// repository urls (clones straight from this host's filesystem)
allow_local_repos: {allow_local_repos}
"#,
        repos_root = config.repos_root.display(),
        state_dir = config.state_dir.display(),
        domain = config.domain,
        branch = config.default_branch,
        base_image = config.base_image,
        restart = config.restart,
        clone = format_duration(t.clone),
        build = format_duration(t.build),
        start = format_duration(t.start),
        restart_timeout = format_duration(t.restart),
        stop = format_duration(t.stop),
        stop_grace = format_duration(config.stop_grace),
        allow_local_repos = config.allow_local_repos,
    )
}
