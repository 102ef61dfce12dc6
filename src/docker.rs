//! Binding to [Docker engine API](https://docs.docker.com/engine/api/)
//!
//! The daemon is reached over HTTP(S) with [ureq], or over its Unix domain socket.

use crate::{
    auth::{AuthToken, Credential, LoginStatus},
    engine::*,
    error::*,
};
use std::{
    io::Read,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

mod chunked;
#[cfg(test)]
mod test_daemon;
#[cfg(unix)]
mod unix;

pub const DOCKER_HOST: &str = "DOCKER_HOST";
pub const DOCKER_API_VERSION: &str = "DOCKER_API_VERSION";

/// Daemon address used when `DOCKER_HOST` is not set
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

/// Connecting to a daemon over TCP gives up after this
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Root of API endpoints served on a Unix domain socket
const SOCKET_API_ROOT: &str = "http://localhost/";

/// Body of a request to the daemon
pub(crate) enum Body {
    Empty,
    Json(Vec<u8>),
    /// Streamed as is, in chunks
    Tar(Box<dyn Read + Send>),
}

enum Transport {
    Http(ureq::Agent),
    #[cfg(unix)]
    Unix(PathBuf),
}

/// A blocking client of the Docker daemon
///
/// Only connecting over TCP is bounded, by [CONNECT_TIMEOUT].
/// Reads and writes wait until the daemon responds.
pub struct DockerClient {
    transport: Transport,
    /// Root of API endpoints, always ends with `/`
    url: Url,
}

impl DockerClient {
    /// Client of the daemon serving HTTP(S) at `url`
    pub fn new(url: Url) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .build();
        Self::with_agent(agent, url)
    }

    pub fn with_agent(agent: ureq::Agent, mut url: Url) -> Self {
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        DockerClient {
            transport: Transport::Http(agent),
            url,
        }
    }

    /// Client of the daemon listening on the Unix domain socket at `socket`
    #[cfg(unix)]
    pub fn unix(socket: impl Into<PathBuf>) -> Result<Self> {
        Ok(DockerClient {
            transport: Transport::Unix(socket.into()),
            url: Url::parse(SOCKET_API_ROOT)?,
        })
    }

    /// Client of the daemon at `host`, a value of `DOCKER_HOST`, speaking the API `version` if given
    ///
    /// `tcp://` is read as `http://`. Nothing is connected until the first request.
    ///
    /// ```
    /// use docker_publish::docker::DockerClient;
    ///
    /// let client = DockerClient::connect(Some("tcp://127.0.0.1:2376"), Some("1.41")).unwrap();
    /// assert_eq!(client.url().as_str(), "http://127.0.0.1:2376/v1.41/");
    /// assert!(client.socket().is_none());
    /// ```
    pub fn connect(host: Option<&str>, version: Option<&str>) -> Result<Self> {
        let host = match host {
            Some(host) if !host.is_empty() => host,
            _ => DEFAULT_DOCKER_HOST,
        };
        let mut client = if let Some(addr) = host.strip_prefix("tcp://") {
            Self::new(Url::parse(&format!("http://{}", addr))?)
        } else if host.starts_with("http://") || host.starts_with("https://") {
            Self::new(Url::parse(host)?)
        } else if let Some(socket) = host.strip_prefix("unix://") {
            Self::unix_host(host, socket)?
        } else {
            return Err(Error::UnsupportedDockerHost(host.to_string()));
        };
        match version {
            Some(version) if !version.is_empty() => {
                client.url = client
                    .url
                    .join(&format!("v{}/", version.trim_start_matches('v')))?;
            }
            _ => {}
        }
        Ok(client)
    }

    #[cfg(unix)]
    fn unix_host(host: &str, socket: &str) -> Result<Self> {
        if socket.is_empty() {
            return Err(Error::UnsupportedDockerHost(host.to_string()));
        }
        Self::unix(socket)
    }

    #[cfg(not(unix))]
    fn unix_host(host: &str, _socket: &str) -> Result<Self> {
        Err(Error::UnsupportedDockerHost(host.to_string()))
    }

    /// Connect to the daemon specified by `DOCKER_HOST` and `DOCKER_API_VERSION`
    pub fn from_env() -> Result<Self> {
        let host = std::env::var(DOCKER_HOST).ok();
        let version = std::env::var(DOCKER_API_VERSION).ok();
        Self::connect(host.as_deref(), version.as_deref())
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Path of the Unix domain socket, `None` if the daemon is reached over HTTP(S)
    pub fn socket(&self) -> Option<&Path> {
        match &self.transport {
            Transport::Http(_) => None,
            #[cfg(unix)]
            Transport::Unix(socket) => Some(socket),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.url.join(path)?)
    }

    /// Send a `POST`, and returns the response body if the status is successful
    fn post(&self, url: &Url, headers: &[(&str, &str)], body: Body) -> Result<LogStream> {
        log::info!("POST {}", url);
        match &self.transport {
            Transport::Http(agent) => {
                let mut req = agent.post(url.as_str());
                for (key, value) in headers {
                    req = req.set(key, value);
                }
                let res = match body {
                    Body::Empty => req.call()?,
                    Body::Json(json) => req
                        .set("Content-Type", "application/json")
                        .send_bytes(&json)?,
                    Body::Tar(context) => req.send(context)?,
                };
                let stream: LogStream = Box::new(res.into_reader());
                Ok(stream)
            }
            #[cfg(unix)]
            Transport::Unix(socket) => unix::post(socket, url, headers, body),
        }
    }
}

/// Split `<repository>[:<tag>]`, where `:` in the registry host part is not a tag separator
///
/// ```
/// use docker_publish::docker::split_reference;
///
/// assert_eq!(split_reference("docker.io/my/app:latest"), ("docker.io/my/app", Some("latest")));
/// assert_eq!(split_reference("localhost:5000/app"), ("localhost:5000/app", None));
/// ```
pub fn split_reference(reference: &str) -> (&str, Option<&str>) {
    let name_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    match reference[name_start..].rfind(':') {
        Some(i) => {
            let sep = name_start + i;
            (&reference[..sep], Some(&reference[sep + 1..]))
        }
        None => (reference, None),
    }
}

impl Engine for DockerClient {
    /// ```text
    /// POST /auth
    /// ```
    fn registry_login(&mut self, credential: &Credential) -> Result<LoginStatus> {
        let url = self.endpoint("auth")?;
        let res = self.post(&url, &[], Body::Json(serde_json::to_vec(credential)?))?;
        Ok(serde_json::from_reader(res)?)
    }

    /// ```text
    /// POST /images/create?fromImage=<repository>&tag=<tag>
    /// ```
    fn image_pull(&mut self, reference: &str, auth: &AuthToken) -> Result<LogStream> {
        let (repository, tag) = split_reference(reference);
        let mut url = self.endpoint("images/create")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("fromImage", repository);
            if let Some(tag) = tag {
                query.append_pair("tag", tag);
            }
        }
        self.post(&url, &[("X-Registry-Auth", auth.as_str())], Body::Empty)
    }

    /// ```text
    /// POST /build?t=<tag>&cachefrom=<json array>&dockerfile=<path>
    /// ```
    ///
    /// The build context is sent as a tar archive.
    fn image_build(
        &mut self,
        context: Box<dyn Read + Send>,
        options: &BuildOptions,
    ) -> Result<LogStream> {
        let mut url = self.endpoint("build")?;
        {
            let mut query = url.query_pairs_mut();
            for tag in &options.tags {
                query.append_pair("t", tag);
            }
            if !options.cache_from.is_empty() {
                query.append_pair("cachefrom", &serde_json::to_string(&options.cache_from)?);
            }
            query.append_pair("dockerfile", options.dockerfile_path());
        }
        self.post(
            &url,
            &[("Content-Type", "application/x-tar")],
            Body::Tar(context),
        )
    }

    /// ```text
    /// POST /images/<repository>/push?tag=<tag>
    /// ```
    fn image_push(&mut self, reference: &str, auth: &AuthToken) -> Result<LogStream> {
        let (repository, tag) = split_reference(reference);
        let mut url = self.endpoint(&format!("images/{}/push", repository))?;
        if let Some(tag) = tag {
            url.query_pairs_mut().append_pair("tag", tag);
        }
        self.post(&url, &[("X-Registry-Auth", auth.as_str())], Body::Empty)
    }
}
