//! Client configuration with TOML preset support.
//!
//! Connection endpoints, remote launch settings and server scene settings
//! are consolidated here. Options serialize to/from TOML so a host
//! application can persist them next to its own preferences.

mod connection;
mod remote;
mod server;

use std::path::Path;

pub use connection::{
    ConnectionOptions, ENV_NAME_CAM, ENV_NAME_DATA, ENV_PORT_CAM,
    ENV_PORT_DATA,
};
pub use remote::{RemoteOptions, COMMAND_PLACEHOLDER};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use server::ServerOptions;

use crate::error::ClientError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[connection]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct ClientOptions {
    /// Server endpoint and retry policy.
    pub connection: ConnectionOptions,
    /// SSH launch settings.
    pub remote: RemoteOptions,
    /// Server command and scene settings.
    pub server: ServerOptions,
}

impl ClientOptions {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(ClientOptions)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`ClientError::Io`] if the file cannot be read, or
    /// [`ClientError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let content = std::fs::read_to_string(path).map_err(ClientError::Io)?;
        let options = toml::from_str(&content)
            .map_err(|e| ClientError::OptionsParse(e.to_string()))?;
        log::info!("Loaded client options from {}", path.display());
        Ok(options)
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// [`ClientError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ClientError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ClientError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ClientError::Io)?;
        }
        std::fs::write(path, content).map_err(ClientError::Io)
    }

    /// Set one option edited in a host UI panel. `section` and `field` are
    /// the property names of [`json_schema`](Self::json_schema). On error
    /// `self` is left unchanged.
    ///
    /// # Errors
    ///
    /// [`ClientError::OptionsParse`] for an unknown section or field, or a
    /// value of the wrong type.
    pub fn set_field(
        &mut self,
        section: &str,
        field: &str,
        value: serde_json::Value,
    ) -> Result<(), ClientError> {
        let parse_err = |e: serde_json::Error| {
            ClientError::OptionsParse(format!("{section}.{field}: {e}"))
        };
        let mut root = serde_json::to_value(&*self).map_err(parse_err)?;
        let slot = root
            .get_mut(section)
            .and_then(|s| s.get_mut(field))
            .ok_or_else(|| {
                ClientError::OptionsParse(format!(
                    "unknown option {section}.{field}"
                ))
            })?;
        *slot = value;
        *self = serde_json::from_value(root).map_err(parse_err)?;
        log::debug!("Set option {section}.{field}");
        Ok(())
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = ClientOptions::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: ClientOptions = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[connection]
host = "node042"
cam_port = 6004
"#;
        let opts: ClientOptions = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.connection.host, "node042");
        assert_eq!(opts.connection.cam_port, 6004);
        // Everything else should be default
        assert_eq!(opts.connection.data_port, 7001);
        assert_eq!(opts.server.timesteps, 1);
        assert!(!opts.remote.enabled);
    }

    #[test]
    fn env_overrides_ports_and_host() {
        let mut conn = ConnectionOptions::default();
        conn.apply_env_with(|key| match key {
            ENV_PORT_CAM => Some("6004".to_owned()),
            ENV_PORT_DATA => Some("not-a-port".to_owned()),
            ENV_NAME_DATA => Some("cluster".to_owned()),
            _ => None,
        });
        assert_eq!(conn.cam_port, 6004);
        assert_eq!(conn.data_port, 7001);
        assert_eq!(conn.host, "cluster");
    }

    #[test]
    fn job_template_substitution() {
        let mut remote = RemoteOptions::default();
        assert_eq!(remote.job_for("haystack a.raw"), "haystack a.raw");

        remote.job_command = "srun -N 2 {haystack_command} -v".to_owned();
        assert_eq!(
            remote.job_for("haystack a.raw"),
            "srun -N 2 haystack a.raw -v"
        );

        remote.job_command = "mpirun".to_owned();
        assert_eq!(remote.job_for("haystack"), "mpirun haystack");
    }

    #[test]
    fn zero_timeout_disables_socket_timeout() {
        let mut conn = ConnectionOptions::default();
        assert_eq!(conn.io_timeout().map(|d| d.as_secs()), Some(60));
        conn.io_timeout_secs = 0;
        assert!(conn.io_timeout().is_none());
    }

    #[test]
    fn save_then_load_and_list() {
        let dir = std::env::temp_dir()
            .join(format!("haywire-options-{}", std::process::id()));
        let mut opts = ClientOptions::default();
        opts.server.timesteps = 4;
        opts.save(&dir.join("cluster.toml")).unwrap();

        let loaded = ClientOptions::load(&dir.join("cluster.toml")).unwrap();
        assert_eq!(loaded.server.timesteps, 4);
        assert_eq!(ClientOptions::list_presets(&dir), vec!["cluster"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn panel_edits_set_single_fields() {
        let mut opts = ClientOptions::default();
        opts.set_field("connection", "host", serde_json::json!("node7"))
            .unwrap();
        opts.set_field("server", "timesteps", serde_json::json!(8))
            .unwrap();
        assert_eq!(opts.connection.host, "node7");
        assert_eq!(opts.server.timesteps, 8);

        let before = opts.clone();
        assert!(matches!(
            opts.set_field("server", "nope", serde_json::json!(1)),
            Err(ClientError::OptionsParse(_))
        ));
        assert!(matches!(
            opts.set_field("connection", "cam_port", serde_json::json!("x")),
            Err(ClientError::OptionsParse(_))
        ));
        assert_eq!(opts, before);
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(ClientOptions::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();

        assert!(props.contains_key("connection"));
        assert!(props.contains_key("remote"));
        assert!(props.contains_key("server"));

        let connection = &props["connection"]["properties"];
        assert!(connection.get("cam_port").is_some());
        assert!(connection.get("retry_interval_ms").is_none());
    }
}
