//! Launching the render server and the SSH tunnel to it.
//!
//! Locally the server command runs through the platform shell with the
//! `SOCKET_SERVER_*` variables describing where to listen. Remotely the
//! job template is run through `ssh`, and an `ssh -N -L` tunnel forwards
//! both channel ports from the compute node to this machine.

mod child;

use std::process::{Command, ExitStatus};

pub use child::LoggedChild;

use crate::error::ClientError;
use crate::options::{
    ClientOptions, ConnectionOptions, RemoteOptions, ENV_NAME_CAM,
    ENV_NAME_DATA, ENV_PORT_CAM, ENV_PORT_DATA,
};

/// Anything that can tell whether the render server is up.
pub trait ServerStatus {
    /// Whether the server process is running.
    fn is_running(&mut self) -> bool;
}

impl ServerStatus for bool {
    fn is_running(&mut self) -> bool {
        *self
    }
}

/// `SOCKET_SERVER_*` assignments for a server listening per `conn`.
#[must_use]
pub fn server_env(conn: &ConnectionOptions) -> Vec<(&'static str, String)> {
    vec![
        (ENV_PORT_CAM, conn.cam_port.to_string()),
        (ENV_PORT_DATA, conn.data_port.to_string()),
        (ENV_NAME_CAM, conn.host.clone()),
        (ENV_NAME_DATA, conn.host.clone()),
    ]
}

/// Arguments of the `ssh` invocation running `command` as a remote job.
#[must_use]
pub fn remote_job_args(
    remote: &RemoteOptions,
    conn: &ConnectionOptions,
    command: &str,
) -> Vec<String> {
    let env: Vec<String> = server_env(conn)
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    let job = format!("env {} {}", env.join(" "), remote.job_for(command));

    let mut args = key_args(remote);
    args.push(remote.ssh_host.clone());
    args.push(job);
    args
}

/// Arguments of the `ssh` invocation forwarding both channel ports.
#[must_use]
pub fn tunnel_args(
    remote: &RemoteOptions,
    conn: &ConnectionOptions,
) -> Vec<String> {
    let mut args = vec!["-N".to_owned()];
    args.extend(key_args(remote));
    for port in [conn.cam_port, conn.data_port] {
        args.push("-L".to_owned());
        args.push(format!("{port}:{}:{port}", remote.node));
    }
    args.push(remote.ssh_host.clone());
    args
}

fn key_args(remote: &RemoteOptions) -> Vec<String> {
    if remote.key_file.is_empty() {
        Vec::new()
    } else {
        vec!["-i".to_owned(), remote.key_file.clone()]
    }
}

fn shell(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut shell = Command::new("cmd");
        let _ = shell.arg("/C").arg(command);
        shell
    }
    #[cfg(not(windows))]
    {
        let mut shell = Command::new("sh");
        let _ = shell.arg("-c").arg(command);
        shell
    }
}

/// A running render server.
pub struct ServerProcess {
    child: LoggedChild,
}

impl ServerProcess {
    /// Run `command` locally, listening where `conn` says.
    ///
    /// # Errors
    ///
    /// [`ClientError::ProcessNotStarted`] for an empty command or a failed
    /// spawn.
    pub fn spawn_local(
        command: &str,
        conn: &ConnectionOptions,
    ) -> Result<Self, ClientError> {
        let command = non_empty(command)?;
        let mut shell = shell(command);
        let _ = shell.envs(server_env(conn));
        log::info!("Launching render server: {command}");
        Ok(Self {
            child: LoggedChild::spawn("haystack", shell)?,
        })
    }

    /// Run `command` as a job on `remote.ssh_host`.
    ///
    /// # Errors
    ///
    /// [`ClientError::ProcessNotStarted`] for an empty command or a failed
    /// spawn.
    pub fn spawn_remote(
        command: &str,
        remote: &RemoteOptions,
        conn: &ConnectionOptions,
    ) -> Result<Self, ClientError> {
        let command = non_empty(command)?;
        if remote.ssh_host.is_empty() {
            return Err(ClientError::ProcessNotStarted(
                "no SSH host configured".to_owned(),
            ));
        }
        let mut ssh = Command::new("ssh");
        let _ = ssh.args(remote_job_args(remote, conn, command));
        log::info!("Launching render server on {}: {command}", remote.ssh_host);
        Ok(Self {
            child: LoggedChild::spawn("haystack-remote", ssh)?,
        })
    }

    /// Block until the server exits.
    ///
    /// # Errors
    ///
    /// [`ClientError::Io`] if waiting fails.
    pub fn wait(&mut self) -> Result<ExitStatus, ClientError> {
        self.child.wait()
    }

    /// Terminate the server.
    pub fn stop(&mut self) {
        self.child.stop();
    }
}

impl ServerStatus for ServerProcess {
    fn is_running(&mut self) -> bool {
        self.child.is_running()
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

/// `ssh -N -L` port forwarding to the compute node.
pub struct SshTunnel {
    child: LoggedChild,
}

impl SshTunnel {
    /// Forward the camera and data ports of `conn` through `remote`.
    ///
    /// # Errors
    ///
    /// [`ClientError::ProcessNotStarted`] if `ssh` cannot be spawned or no
    /// host is configured.
    pub fn open(
        remote: &RemoteOptions,
        conn: &ConnectionOptions,
    ) -> Result<Self, ClientError> {
        if remote.ssh_host.is_empty() {
            return Err(ClientError::ProcessNotStarted(
                "no SSH host configured".to_owned(),
            ));
        }
        let mut ssh = Command::new("ssh");
        let _ = ssh.args(tunnel_args(remote, conn));
        Ok(Self {
            child: LoggedChild::spawn("ssh-tunnel", ssh)?,
        })
    }

    /// Whether the tunnel process is alive.
    pub fn is_open(&mut self) -> bool {
        self.child.is_running()
    }

    /// Tear the tunnel down.
    pub fn close(&mut self) {
        self.child.stop();
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Keeps at most one server (and its tunnel) alive.
#[derive(Default)]
pub struct Launcher {
    server: Option<ServerProcess>,
    tunnel: Option<SshTunnel>,
}

impl Launcher {
    /// Start the server described by `options`, stopping any previous one.
    /// Remote mode also opens the tunnel.
    ///
    /// # Errors
    ///
    /// [`ClientError::ProcessNotStarted`] if the server or tunnel cannot be
    /// spawned.
    pub fn start(
        &mut self,
        options: &ClientOptions,
    ) -> Result<(), ClientError> {
        self.stop();
        let command = &options.server.command;
        let conn = &options.connection;
        if options.remote.enabled {
            self.server = Some(ServerProcess::spawn_remote(
                command,
                &options.remote,
                conn,
            )?);
            self.tunnel = Some(SshTunnel::open(&options.remote, conn)?);
        } else {
            self.server = Some(ServerProcess::spawn_local(command, conn)?);
        }
        Ok(())
    }

    /// Stop the server and tunnel, if any.
    pub fn stop(&mut self) {
        if let Some(mut tunnel) = self.tunnel.take() {
            tunnel.close();
        }
        if let Some(mut server) = self.server.take() {
            server.stop();
        }
    }

    /// The running server, if any.
    pub fn server_mut(&mut self) -> Option<&mut ServerProcess> {
        self.server.as_mut()
    }
}

impl ServerStatus for Launcher {
    fn is_running(&mut self) -> bool {
        self.server.as_mut().is_some_and(ServerStatus::is_running)
    }
}

fn non_empty(command: &str) -> Result<&str, ClientError> {
    let command = command.trim();
    if command.is_empty() {
        Err(ClientError::ProcessNotStarted(
            "empty server command".to_owned(),
        ))
    } else {
        Ok(command)
    }
}
