//! Configuration file – reads/writes `~/.simbridge/config.toml`.

use serde::{Deserialize, Serialize};
use simbridge_middleware::BridgeConfig;
use simbridge_runtime::AgentConfig;
use simbridge_types::DEFAULT_PORT;
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted configuration: one `[bridge]` and one `[agent]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bridge: BridgeConfig,
    pub agent: AgentConfig,
}

/// Return the path to `~/.simbridge/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".simbridge").join("config.toml")
}

/// Load the config at `path` (or the default location) with environment
/// overrides applied.  A missing file yields the defaults.
pub fn load(path: Option<&Path>) -> Result<Config, String> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let mut cfg = load_from(&path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the file at `path` as written.  Returns `None` if it does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SIMBRIDGE_PROTOCOL` | `bridge.protocol` |
/// | `SIMBRIDGE_ADDRESS` | `bridge.address` |
/// | `SIMBRIDGE_TICK_HZ` | `agent.tick_hz` |
/// | `ROS_BRIDGE_HOST` | host part of `bridge.address` |
///
/// `ROS_BRIDGE_HOST` is applied last and keeps the configured port.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SIMBRIDGE_PROTOCOL") {
        cfg.bridge.protocol = v;
    }
    if let Ok(v) = std::env::var("SIMBRIDGE_ADDRESS") {
        cfg.bridge.address = v;
    }
    if let Ok(v) = std::env::var("SIMBRIDGE_TICK_HZ")
        && let Ok(hz) = v.parse::<f64>()
        && hz > 0.0
    {
        cfg.agent.tick_hz = hz;
    }
    if let Ok(host) = std::env::var("ROS_BRIDGE_HOST") {
        let host = host.trim();
        if !host.is_empty() {
            cfg.bridge.address = format!("{}:{}", host, port_of(&cfg.bridge.address));
        }
    }
}

fn port_of(address: &str) -> u16 {
    address
        .rsplit_once(':')
        .and_then(|(_, port)| port.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Save the config to `path`, creating its directory if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use simbridge_runtime::Stack;

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600, "config file must have 0o600 permissions");

        let dir_mode = std::fs::metadata(path.parent().unwrap()).expect("dir metadata").permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700, "config directory must have 0o700 permissions");
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("[bridge]"));
        assert!(raw.contains("[agent]"));

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bridge]\nprotocol = \"cyber\"\n\n[agent]\nstack = \"lgsvl\"\n").unwrap();

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.bridge.protocol, "cyber");
        assert_eq!(loaded.bridge.address, "localhost:9090");
        assert_eq!(loaded.agent.stack, Stack::Lgsvl);
        assert_eq!(loaded.agent.tick_hz, 50.0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bridge\n").unwrap();
        assert!(load_from(&path).unwrap_err().starts_with("Failed to parse config"));
    }

    #[test]
    fn config_path_points_to_simbridge_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".simbridge"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn apply_env_overrides_changes_protocol() {
        // SAFETY: only this test writes this variable.
        unsafe { std::env::set_var("SIMBRIDGE_PROTOCOL", "ros2") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.bridge.protocol, "ros2");
        unsafe { std::env::remove_var("SIMBRIDGE_PROTOCOL") };
    }

    #[test]
    fn apply_env_overrides_changes_address_then_host() {
        // SAFETY: only this test writes these variables.
        unsafe { std::env::set_var("SIMBRIDGE_ADDRESS", "sim-host:9191") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.bridge.address, "sim-host:9191");

        unsafe { std::env::set_var("ROS_BRIDGE_HOST", "10.0.0.7") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.bridge.address, "10.0.0.7:9191");

        unsafe { std::env::remove_var("SIMBRIDGE_ADDRESS") };
        let mut cfg = Config::default();
        cfg.bridge.address = "localhost".to_string();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.bridge.address, "10.0.0.7:9090");
        unsafe { std::env::remove_var("ROS_BRIDGE_HOST") };
    }

    #[test]
    fn apply_env_overrides_tick_hz() {
        // SAFETY: only this test writes this variable.
        unsafe { std::env::set_var("SIMBRIDGE_TICK_HZ", "100") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.agent.tick_hz, 100.0);

        unsafe { std::env::set_var("SIMBRIDGE_TICK_HZ", "fast") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.agent.tick_hz, 50.0);
        unsafe { std::env::remove_var("SIMBRIDGE_TICK_HZ") };
    }
}
