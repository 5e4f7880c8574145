// ABOUTME: Config scaffolding for new installations.
// ABOUTME: Writes a commented bridgekeeper.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

/// Commented template; every value shown is the default.
pub const TEMPLATE: &str = r#"# Container to manage, by name or ID.
# Can also be set with --container or BRIDGEKEEPER_CONTAINER.
# container: proxy

log_level: info

# Runtime override. Auto-detected when omitted.
# runtime:
#   runtime: docker
#   socket: /var/run/docker.sock

# What makes a container routable.
markers:
  env: VIRTUAL_HOST
  label_prefix: "traefik."

# members: inspect every running member of a network
# topology: any network shared with another container
discovery: members

default_bridge:
  name: bridge
  option: com.docker.network.bridge.default_bridge

retry:
  attempts: 3
  delay: 500ms

stabilization: 1s
reconnect_delay: 5s
shutdown_grace: 10s
"#;

pub fn init_config(dir: &Path, container: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = match container.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => TEMPLATE.replacen("# container: proxy", &format!("container: {c}"), 1),
        None => TEMPLATE.to_string(),
    };
    std::fs::write(&config_path, yaml)?;

    Ok(())
}
