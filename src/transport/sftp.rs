//! SFTP downloads.

use std::io::Read;
use std::net::TcpStream;
use std::path::Path;

use ssh2::Session;

use super::{resolve, Endpoint, FetchError, CONNECT_TIMEOUT};

/// Downloads `path` over SFTP with password authentication.
pub(super) fn fetch(
	endpoint: &Endpoint,
	username: &str,
	password: &str,
	path: &str,
) -> Result<Vec<u8>, FetchError> {
	let session = connect(endpoint, username, password)?;
	let sftp = session.sftp().map_err(|error| FetchError::Connect(error.into()))?;

	let mut file = sftp
		.open(Path::new(path))
		.map_err(|error| FetchError::File(error.into()))?;

	let mut bytes = Vec::new();

	file.read_to_end(&mut bytes)
		.map_err(|error| FetchError::File(error.into()))?;

	Ok(bytes)
}

/// Performs the SSH handshake and password authentication.
pub(super) fn login(endpoint: &Endpoint, username: &str, password: &str) -> Result<(), FetchError> {
	connect(endpoint, username, password).map(drop)
}

/// An authenticated SSH session.
fn connect(endpoint: &Endpoint, username: &str, password: &str) -> Result<Session, FetchError> {
	let connect = |error: ssh2::Error| FetchError::Connect(error.into());

	let tcp = TcpStream::connect_timeout(&resolve(endpoint)?, CONNECT_TIMEOUT)
		.map_err(|error| FetchError::Connect(error.into()))?;

	let mut session = Session::new().map_err(connect)?;

	session.set_tcp_stream(tcp);
	session.handshake().map_err(connect)?;
	session
		.userauth_password(username, password)
		.map_err(|error| FetchError::Login(error.into()))?;

	Ok(session)
}
