use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use web_time::Duration;

/// Environment variable overriding the camera-channel port.
pub const ENV_PORT_CAM: &str = "SOCKET_SERVER_PORT_CAM";
/// Environment variable overriding the data-channel port.
pub const ENV_PORT_DATA: &str = "SOCKET_SERVER_PORT_DATA";
/// Environment variable overriding the camera-channel host name.
pub const ENV_NAME_CAM: &str = "SOCKET_SERVER_NAME_CAM";
/// Environment variable overriding the data-channel host name.
pub const ENV_NAME_DATA: &str = "SOCKET_SERVER_NAME_DATA";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Connection", inline)]
#[serde(default)]
/// Where the render server listens and how patiently to reach it.
pub struct ConnectionOptions {
    /// Host name of the render server (or of the local tunnel end).
    #[schemars(title = "Server Name")]
    pub host: String,
    /// Port of the camera channel.
    #[schemars(title = "Port Cam", range(min = 1, max = 65535))]
    pub cam_port: u16,
    /// Port of the data channel.
    #[schemars(title = "Port Data", range(min = 1, max = 65535))]
    pub data_port: u16,
    /// Connect attempts per channel before giving up (0 = forever).
    #[schemars(title = "Connect Attempts", range(min = 0, max = 1000))]
    pub connect_attempts: u32,
    /// Delay between connect attempts in milliseconds.
    #[schemars(skip)]
    pub retry_interval_ms: u64,
    /// Read/write timeout of one round trip in seconds.
    #[schemars(skip)]
    pub io_timeout_secs: u64,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            cam_port: 7000,
            data_port: 7001,
            connect_attempts: 30,
            retry_interval_ms: 2000,
            io_timeout_secs: 60,
        }
    }
}

impl ConnectionOptions {
    /// Delay between connect attempts.
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Socket read/write timeout, `None` when disabled.
    #[must_use]
    pub fn io_timeout(&self) -> Option<Duration> {
        (self.io_timeout_secs > 0)
            .then(|| Duration::from_secs(self.io_timeout_secs))
    }

    /// Override host and ports from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Override host and ports from `lookup`. Unparseable ports are
    /// ignored with a warning.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let host = lookup(ENV_NAME_CAM).or_else(|| lookup(ENV_NAME_DATA));
        if let Some(host) = host {
            self.host = host;
        }
        for (key, port) in [
            (ENV_PORT_CAM, &mut self.cam_port),
            (ENV_PORT_DATA, &mut self.data_port),
        ] {
            if let Some(value) = lookup(key) {
                match value.trim().parse() {
                    Ok(parsed) => *port = parsed,
                    Err(_) => log::warn!("Ignoring {key}='{value}'"),
                }
            }
        }
    }
}
