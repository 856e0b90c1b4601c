use crate::sink::Sink;
use anyhow::{bail, Context};
use log::{info, trace, warn};
use ssh2::Session;
use std::{
    env,
    io::Write,
    net::{TcpStream, ToSocketAddrs},
    path::Path,
    time::Duration,
};

/// SSH connection parameters. These are read from the environment rather
/// than the config file, so the password never lands on disk.
#[derive(Clone, PartialEq)]
pub struct SshParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub auth: SshAuth,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SshAuth {
    Password(String),
    Key(String),
    /// Neither was provided. Connecting will fail
    Missing,
}

impl SshParams {
    const DEFAULT_HOST: &'static str = "127.0.0.1";
    const DEFAULT_PORT: u16 = 22;
    const DEFAULT_USER: &'static str = "pi";

    /// Load parameters from `SSH_HOST`, `SSH_PORT`, `SSH_USER`,
    /// `SSH_PASSWORD` and `SSH_KEY_PATH`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = match lookup("SSH_PORT") {
            Some(port) => port.parse().unwrap_or_else(|_| {
                warn!(
                    "Invalid SSH_PORT `{port}`, using {}",
                    Self::DEFAULT_PORT
                );
                Self::DEFAULT_PORT
            }),
            None => Self::DEFAULT_PORT,
        };
        // Password wins if both are given
        let auth = match (lookup("SSH_PASSWORD"), lookup("SSH_KEY_PATH")) {
            (Some(password), _) if !password.is_empty() => {
                SshAuth::Password(password)
            }
            (_, Some(key_path)) if !key_path.is_empty() => {
                SshAuth::Key(key_path)
            }
            _ => SshAuth::Missing,
        };
        Self {
            host: lookup("SSH_HOST")
                .unwrap_or_else(|| Self::DEFAULT_HOST.into()),
            port,
            user: lookup("SSH_USER")
                .unwrap_or_else(|| Self::DEFAULT_USER.into()),
            auth,
        }
    }
}

// Hand-rolled to keep the password out of logs
impl std::fmt::Debug for SshParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match &self.auth {
            SshAuth::Password(_) => "password",
            SshAuth::Key(_) => "key",
            SshAuth::Missing => "none",
        };
        f.debug_struct("SshParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("auth", &auth)
            .finish()
    }
}

/// Mirror frames to a file on a remote host. The session is opened once and
/// reused for every frame.
pub struct SshSink {
    name: String,
    session: Session,
    remote_path: String,
}

impl SshSink {
    /// Permissions for the remote file
    const FILE_MODE: i32 = 0o644;
    /// Upper bound on connecting and on every blocking call in the session
    const TIMEOUT: Duration = Duration::from_secs(5);

    pub fn connect(
        params: SshParams,
        remote_path: &str,
    ) -> anyhow::Result<Self> {
        Self::connect_with_timeout(params, remote_path, Self::TIMEOUT)
    }

    fn connect_with_timeout(
        params: SshParams,
        remote_path: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        info!("Connecting to {params:?}");
        let tcp = connect_tcp(&params.host, params.port, timeout)?;
        let mut session = Session::new().context("Error creating session")?;
        session.set_tcp_stream(tcp);
        session.set_timeout(
            u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX),
        );
        session.handshake().context("SSH handshake failed")?;

        match &params.auth {
            SshAuth::Password(password) => session
                .userauth_password(&params.user, password)
                .context("Password authentication failed")?,
            SshAuth::Key(key_path) => session
                .userauth_pubkey_file(
                    &params.user,
                    None,
                    Path::new(key_path),
                    None,
                )
                .with_context(|| {
                    format!("Key authentication with {key_path} failed")
                })?,
            SshAuth::Missing => bail!(
                "No authentication method given. \
                Set SSH_PASSWORD or SSH_KEY_PATH"
            ),
        }
        if !session.authenticated() {
            bail!("Not authenticated as {}", params.user);
        }

        info!("SSH connection to {} established", params.host);
        Ok(Self {
            name: format!("ssh://{}@{}", params.user, params.host),
            session,
            remote_path: remote_path.to_owned(),
        })
    }
}

/// Try each address the host resolves to, giving each one `timeout`
fn connect_tcp(
    host: &str,
    port: u16,
    timeout: Duration,
) -> anyhow::Result<TcpStream> {
    let addresses = (host, port)
        .to_socket_addrs()
        .with_context(|| format!("Error resolving {host}"))?;
    let mut last_error = None;
    for address in addresses {
        match TcpStream::connect_timeout(&address, timeout) {
            Ok(tcp) => return Ok(tcp),
            Err(err) => {
                warn!("Error connecting to {address}: {err}");
                last_error = Some(err);
            }
        }
    }
    match last_error {
        Some(err) => Err(anyhow::Error::new(err)
            .context(format!("Error connecting to {host}:{port}"))),
        None => bail!("{host} did not resolve to any address"),
    }
}

impl Sink for SshSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, frame: &str) -> anyhow::Result<()> {
        // Trailing newline so the remote file ends like a text file should
        let contents = format!("{frame}\n");
        trace!("Writing {} bytes to {}", contents.len(), self.remote_path);
        let mut channel = self
            .session
            .scp_send(
                Path::new(&self.remote_path),
                Self::FILE_MODE,
                contents.len() as u64,
                None,
            )
            .with_context(|| {
                format!("Error opening {} on {}", self.remote_path, self.name)
            })?;
        channel
            .write_all(contents.as_bytes())
            .with_context(|| format!("Error writing to {}", self.name))?;
        channel.send_eof()?;
        channel.wait_eof()?;
        channel.close()?;
        channel.wait_close()?;
        Ok(())
    }
}

impl Drop for SshSink {
    fn drop(&mut self) {
        info!("Closing {}", self.name);
        if let Err(err) = self.session.disconnect(None, "Bye", None) {
            warn!("Error disconnecting from {}: {err}", self.name);
        }
    }
}
