//! Downloading the PLAN database from the game server.
//!
//! Hosting panels are inconsistent about hostnames and about where the plugin keeps its
//! database, and operators copy whatever the panel shows into the config. So instead of one
//! connection attempt we walk a list of candidates: every plausible spelling of the host, every
//! protocol the port might speak, and every well-known database location. The first file we get
//! wins.
//!
//! The actual network clients are blocking; [`download()`] is meant to be run on the blocking
//! thread pool.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use derive_more::{Debug, Display};
use itertools::Itertools;
use thiserror::Error;

use crate::config::TransportConfig;

mod ftp;
mod sftp;

/// Where the PLAN plugin usually keeps its database, relative to the server root.
const WELL_KNOWN_PATHS: &[&str] = &[
	"/plugins/Plan/database.db",
	"/plugins/Plan/Plan.db",
	"plugins/Plan/database.db",
];

/// Ports that usually speak SFTP.
const SFTP_PORTS: &[u16] = &[22, 2022];

/// Ports file access is commonly exposed on, besides the configured one.
const COMMON_PORTS: &[u16] = &[21, 22, 2022, 2121, 8021];

/// How long to wait for a TCP connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Boxed error of a network client.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A file transfer protocol.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
	/// Plain FTP.
	#[display("ftp")]
	Ftp,

	/// SFTP (over SSH).
	#[display("sftp")]
	Sftp,
}

/// A host to connect to.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{protocol}://{host}:{port}")]
pub struct Endpoint {
	/// Hostname or IP address.
	pub host: String,

	/// TCP port.
	pub port: u16,

	/// Protocol to speak.
	pub protocol: Protocol,
}

/// Errors of a single download attempt.
#[derive(Debug, Error)]
pub enum FetchError {
	/// We could not connect; no other path on this endpoint will work either.
	#[error("failed to connect: {0}")]
	Connect(#[source] BoxError),

	/// The server rejected our credentials.
	#[error("failed to log in: {0}")]
	Login(#[source] BoxError),

	/// We are logged in but could not read the file.
	#[error("failed to download file: {0}")]
	File(#[source] BoxError),
}

/// Something that can download a file from an [`Endpoint`].
pub trait Transport {
	/// Downloads the file at `path`.
	fn fetch(&self, endpoint: &Endpoint, path: &str) -> Result<Vec<u8>, FetchError>;

	/// Logs in and out again without transferring anything.
	fn login(&self, endpoint: &Endpoint) -> Result<(), FetchError>;
}

/// Errors that can occur while downloading the snapshot.
#[derive(Debug, Error)]
pub enum Error {
	/// No host was configured.
	#[error("no host configured (set `GGSERVERS_HOST` or use dev mode)")]
	MissingHost,

	/// Every candidate failed.
	#[error("could not download the PLAN database ({attempts} attempts failed)")]
	Exhausted {
		/// How many downloads were attempted.
		attempts: usize,
	},
}

/// A successful download.
#[derive(Debug)]
pub struct Downloaded {
	/// Where we got it from.
	pub endpoint: Endpoint,

	/// Remote path of the file.
	pub path: String,

	/// The file's contents.
	#[debug("{} bytes", bytes.len())]
	pub bytes: Vec<u8>,
}

/// The real network [`Transport`]: FTP via `suppaftp`, SFTP via `ssh2`.
#[derive(Debug, Clone)]
pub struct Network {
	/// Login name.
	username: String,

	/// Login password.
	#[debug("*****")]
	password: String,
}

impl Network {
	/// Creates a transport that logs in with the configured credentials.
	pub fn new(config: &TransportConfig) -> Self {
		Self { username: config.username.clone(), password: config.password.clone() }
	}
}

impl Transport for Network {
	fn fetch(&self, endpoint: &Endpoint, path: &str) -> Result<Vec<u8>, FetchError> {
		match endpoint.protocol {
			Protocol::Ftp => ftp::fetch(endpoint, &self.username, &self.password, path),
			Protocol::Sftp => sftp::fetch(endpoint, &self.username, &self.password, path),
		}
	}

	fn login(&self, endpoint: &Endpoint) -> Result<(), FetchError> {
		match endpoint.protocol {
			Protocol::Ftp => ftp::login(endpoint, &self.username, &self.password),
			Protocol::Sftp => sftp::login(endpoint, &self.username, &self.password),
		}
	}
}

/// Resolves `endpoint` to the first address its host points at.
fn resolve(endpoint: &Endpoint) -> Result<SocketAddr, FetchError> {
	(endpoint.host.as_str(), endpoint.port)
		.to_socket_addrs()
		.map_err(|error| FetchError::Connect(error.into()))?
		.next()
		.ok_or_else(|| FetchError::Connect(format!("`{}` has no addresses", endpoint.host).into()))
}

/// Spellings of `host` worth trying, the configured one first.
///
/// Covers pasted URLs, a doubled provider domain, a bare server name, and the `mc-` prefix some
/// panels put in front of it.
pub fn candidate_hosts(host: &str, suffix: &str) -> Vec<String> {
	let host = host.trim();
	let stripped = host
		.trim_start_matches("https://")
		.trim_start_matches("http://")
		.trim_end_matches('/');

	let mut candidates = vec![host.to_owned(), stripped.to_owned()];
	let suffix = suffix.trim().trim_start_matches('.');

	if !suffix.is_empty() {
		let dotted = format!(".{suffix}");
		let doubled = format!(".{suffix}.{suffix}");
		let mut bare = stripped;

		while let Some(shorter) = bare.strip_suffix(dotted.as_str()) {
			bare = shorter;
		}

		candidates.push(stripped.replace(&doubled, &dotted));
		candidates.push(format!("{bare}{dotted}"));
		candidates.push(format!("mc-{}{dotted}", bare.trim_start_matches("mc-")));
	}

	candidates
		.into_iter()
		.filter(|candidate| !candidate.is_empty())
		.unique()
		.collect()
}

/// Remote paths worth trying, the configured one first.
pub fn candidate_paths(configured: Option<&str>) -> Vec<String> {
	configured
		.map(str::trim)
		.filter(|path| !path.is_empty())
		.into_iter()
		.chain(WELL_KNOWN_PATHS.iter().copied())
		.map(ToOwned::to_owned)
		.unique()
		.collect()
}

/// Protocols worth trying on `port`, most likely first.
pub fn protocols(port: u16) -> &'static [Protocol] {
	if SFTP_PORTS.contains(&port) {
		&[Protocol::Sftp, Protocol::Ftp]
	} else {
		&[Protocol::Ftp]
	}
}

/// Ports worth probing, the configured one first.
pub fn candidate_ports(port: u16) -> Vec<u16> {
	std::iter::once(port)
		.chain(COMMON_PORTS.iter().copied())
		.unique()
		.collect()
}

/// Downloads the PLAN database, trying every candidate until one works.
///
/// Candidates are tried host by host, then protocol by protocol, then path by path. A failed
/// login skips the remaining paths of that endpoint.
#[tracing::instrument(skip_all, err(Display))]
pub fn download<T>(config: &TransportConfig, transport: &T) -> Result<Downloaded, Error>
where
	T: Transport + ?Sized,
{
	let host = config.host.as_deref().ok_or(Error::MissingHost)?;
	let hosts = candidate_hosts(host, &config.host_suffix);
	let paths = candidate_paths(config.remote_path.as_deref());
	let mut attempts = 0_usize;

	tracing::debug!(?hosts, ?paths, "trying download candidates");

	for host in &hosts {
		for &protocol in protocols(config.port) {
			let endpoint = Endpoint { host: host.clone(), port: config.port, protocol };

			for path in &paths {
				attempts += 1;

				match transport.fetch(&endpoint, path) {
					Ok(bytes) => {
						if hosts.first() == Some(host) {
							tracing::info!(%endpoint, path, bytes = bytes.len(), "downloaded snapshot");
						} else {
							tracing::warn!(
								%endpoint,
								path,
								bytes = bytes.len(),
								"downloaded snapshot from an alternate host; consider updating the config",
							);
						}

						return Ok(Downloaded { endpoint, path: path.clone(), bytes });
					},
					Err(error @ (FetchError::Connect(_) | FetchError::Login(_))) => {
						tracing::warn!(%endpoint, %error, "endpoint unavailable");
						break;
					},
					Err(error @ FetchError::File(_)) => {
						tracing::debug!(%endpoint, path, %error, "file unavailable");
					},
				}
			}
		}
	}

	Err(Error::Exhausted { attempts })
}

/// The outcome of logging in to one [`Endpoint`].
#[derive(Debug)]
pub struct LoginAttempt {
	/// Where we tried to log in.
	pub endpoint: Endpoint,

	/// Why it failed, if it did.
	pub error: Option<FetchError>,
}

impl LoginAttempt {
	/// Whether the login worked.
	pub const fn is_ok(&self) -> bool {
		self.error.is_none()
	}
}

/// Diagnoses the configured connection details.
///
/// Logs in to every candidate host on every common port with every protocol that port might
/// speak, and stops at the first endpoint that accepts the credentials. Returns every attempt
/// in order.
#[tracing::instrument(skip_all, err(Display))]
pub fn check_connection<T>(
	config: &TransportConfig,
	transport: &T,
) -> Result<Vec<LoginAttempt>, Error>
where
	T: Transport + ?Sized,
{
	let host = config.host.as_deref().ok_or(Error::MissingHost)?;
	let mut logins = Vec::new();

	for host in candidate_hosts(host, &config.host_suffix) {
		for port in candidate_ports(config.port) {
			for &protocol in protocols(port) {
				let endpoint = Endpoint { host: host.clone(), port, protocol };
				let error = transport.login(&endpoint).err();

				match &error {
					None => tracing::info!(%endpoint, "login succeeded"),
					Some(error) => tracing::info!(%endpoint, %error, "login failed"),
				}

				let done = error.is_none();

				logins.push(LoginAttempt { endpoint, error });

				if done {
					return Ok(logins);
				}
			}
		}
	}

	Ok(logins)
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use super::{
		candidate_hosts,
		candidate_paths,
		candidate_ports,
		check_connection,
		download,
		protocols,
		Endpoint,
		Error,
		FetchError,
		Protocol,
		Transport,
	};
	use crate::config::TransportConfig;

	/// Records every attempt; only `host` + `path` succeeds.
	struct Fake {
		host: &'static str,
		path: &'static str,
		attempts: RefCell<Vec<String>>,
	}

	impl Fake {
		fn new(host: &'static str, path: &'static str) -> Self {
			Self { host, path, attempts: RefCell::default() }
		}
	}

	impl Transport for Fake {
		fn fetch(&self, endpoint: &Endpoint, path: &str) -> Result<Vec<u8>, FetchError> {
			self.attempts.borrow_mut().push(format!("{endpoint}{path}"));

			if endpoint.host != self.host {
				return Err(FetchError::Connect("no such host".into()));
			}

			if path != self.path {
				return Err(FetchError::File("no such file".into()));
			}

			Ok(b"SQLite format 3\0".to_vec())
		}

		fn login(&self, endpoint: &Endpoint) -> Result<(), FetchError> {
			self.attempts.borrow_mut().push(endpoint.to_string());

			if endpoint.host != self.host {
				return Err(FetchError::Connect("no such host".into()));
			}

			if endpoint.protocol != Protocol::Ftp {
				return Err(FetchError::Login("wrong password".into()));
			}

			Ok(())
		}
	}

	fn config(host: &str, port: u16, remote_path: Option<&str>) -> TransportConfig {
		TransportConfig {
			host: Some(host.to_owned()),
			username: String::from("user"),
			password: String::from("hunter2"),
			port,
			remote_path: remote_path.map(ToOwned::to_owned),
			host_suffix: String::from("ggservers.com"),
		}
	}

	#[test]
	fn hosts() {
		assert_eq!(
			candidate_hosts("https://refuge/", "ggservers.com"),
			["https://refuge/", "refuge", "refuge.ggservers.com", "mc-refuge.ggservers.com"],
			"pasted URL",
		);
		assert_eq!(
			candidate_hosts("x.ggservers.com.ggservers.com", "ggservers.com"),
			["x.ggservers.com.ggservers.com", "x.ggservers.com", "mc-x.ggservers.com"],
			"doubled suffix",
		);
		assert_eq!(
			candidate_hosts("mc-refuge.ggservers.com", "ggservers.com"),
			["mc-refuge.ggservers.com"],
			"already canonical",
		);
		assert_eq!(candidate_hosts("10.0.0.1", ""), ["10.0.0.1"], "no suffix, no guessing");
	}

	#[test]
	fn paths() {
		assert_eq!(
			candidate_paths(Some(" /srv/Plan.db ")),
			["/srv/Plan.db", "/plugins/Plan/database.db", "/plugins/Plan/Plan.db", "plugins/Plan/database.db"],
			"configured path first",
		);
		assert_eq!(candidate_paths(Some("/plugins/Plan/Plan.db")).len(), 3, "deduplicated");
		assert_eq!(candidate_paths(None).len(), 3, "well-known paths only");
	}

	#[test]
	fn protocol_order() {
		assert_eq!(protocols(21), [Protocol::Ftp], "ftp port");
		assert_eq!(protocols(22), [Protocol::Sftp, Protocol::Ftp], "ssh port");
		assert_eq!(protocols(2022), [Protocol::Sftp, Protocol::Ftp], "panel sftp port");
	}

	#[test]
	fn alternate_host_succeeds() -> anyhow::Result<()> {
		let transport = Fake::new("refuge.ggservers.com", "/plugins/Plan/database.db");
		let downloaded = download(&config("https://refuge", 21, Some("/custom/Plan.db")), &transport)?;

		assert_eq!(downloaded.endpoint.host, "refuge.ggservers.com", "alternate host");
		assert_eq!(downloaded.path, "/plugins/Plan/database.db", "well-known path");
		assert!(downloaded.bytes.starts_with(b"SQLite"), "file contents");
		assert_eq!(
			*transport.attempts.borrow(),
			[
				"ftp://https://refuge:21/custom/Plan.db",
				"ftp://refuge:21/custom/Plan.db",
				"ftp://refuge.ggservers.com:21/custom/Plan.db",
				"ftp://refuge.ggservers.com:21/plugins/Plan/database.db",
			],
			"failed logins skip the remaining paths",
		);

		Ok(())
	}

	#[test]
	fn sftp_first_on_ssh_ports() -> anyhow::Result<()> {
		let transport = Fake::new("mc-refuge.ggservers.com", "/plugins/Plan/Plan.db");
		let downloaded = download(&config("mc-refuge.ggservers.com", 2022, None), &transport)?;

		assert_eq!(downloaded.endpoint.protocol, Protocol::Sftp, "sftp is tried first");
		assert_eq!(transport.attempts.borrow().len(), 2, "two paths on the first endpoint");

		Ok(())
	}

	#[test]
	fn exhausted() {
		let transport = Fake::new("elsewhere", "/plugins/Plan/database.db");
		let result = download(&config("refuge", 22, None), &transport);

		assert!(
			matches!(result, Err(Error::Exhausted { attempts: 6 })),
			"3 hosts × 2 protocols, one login each: {result:?}",
		);
	}

	#[test]
	fn missing_host() {
		let config = TransportConfig { host: None, ..config("", 21, None) };

		assert!(matches!(download(&config, &Fake::new("", "")), Err(Error::MissingHost)), "no host");
	}

	#[test]
	fn ports() {
		assert_eq!(candidate_ports(21), [21, 22, 2022, 2121, 8021], "configured port first");
		assert_eq!(candidate_ports(25565), [25565, 21, 22, 2022, 2121, 8021], "unusual port");
	}

	#[test]
	fn connection_check_stops_at_first_login() -> anyhow::Result<()> {
		let transport = Fake::new("refuge.ggservers.com", "");
		let logins = check_connection(&config("refuge", 2022, None), &transport)?;
		let last = logins.last().expect("at least one login");

		assert!(last.is_ok(), "alternate host logs in: {logins:?}");
		assert_eq!(
			last.endpoint.to_string(),
			"ftp://refuge.ggservers.com:2022",
			"sftp was rejected, ftp on the same port works",
		);
		assert!(logins.iter().rev().skip(1).all(|login| !login.is_ok()), "only the last one works");
		assert_eq!(
			transport.attempts.borrow().first().map(String::as_str),
			Some("sftp://refuge:2022"),
			"configured host and port first",
		);

		// 2022, 21, 22, 2121, 8021 on `refuge`: 2 + 1 + 2 + 1 + 1, then sftp + ftp on 2022
		assert_eq!(logins.len(), 9, "login count: {logins:?}");

		Ok(())
	}

	#[test]
	fn connection_check_needs_host() {
		let config = TransportConfig { host: None, ..config("", 21, None) };

		assert!(
			matches!(check_connection(&config, &Fake::new("", "")), Err(Error::MissingHost)),
			"no host",
		);
	}
}
