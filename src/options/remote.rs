use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Placeholder in [`RemoteOptions::job_command`] replaced by the server
/// command line.
pub const COMMAND_PLACEHOLDER: &str = "{haystack_command}";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Remote", inline)]
#[serde(default)]
/// Remote execution of the render server through SSH.
pub struct RemoteOptions {
    /// Launch the server on a remote host instead of locally.
    #[schemars(title = "Remote")]
    pub enabled: bool,
    /// SSH destination (`user@host` or an ssh config alias).
    #[schemars(title = "SSH Server Name")]
    pub ssh_host: String,
    /// Compute node the server runs on, as seen from `ssh_host`.
    #[schemars(title = "SSH Server Node Name")]
    pub node: String,
    /// Private key passed to `ssh -i`, empty for the agent default.
    #[schemars(title = "Key File")]
    pub key_file: String,
    /// Job template run on `ssh_host`.
    #[schemars(title = "Job Command")]
    pub job_command: String,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            ssh_host: String::new(),
            node: "localhost".to_owned(),
            key_file: String::new(),
            job_command: COMMAND_PLACEHOLDER.to_owned(),
        }
    }
}

impl RemoteOptions {
    /// Substitute `command` into the job template.
    #[must_use]
    pub fn job_for(&self, command: &str) -> String {
        if self.job_command.contains(COMMAND_PLACEHOLDER) {
            self.job_command.replace(COMMAND_PLACEHOLDER, command)
        } else if self.job_command.trim().is_empty() {
            command.to_owned()
        } else {
            format!("{} {command}", self.job_command)
        }
    }
}
