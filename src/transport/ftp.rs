//! Plain FTP downloads.

use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};

use super::{resolve, Endpoint, FetchError, CONNECT_TIMEOUT};

/// Downloads `path` over FTP in passive binary mode.
pub(super) fn fetch(
	endpoint: &Endpoint,
	username: &str,
	password: &str,
	path: &str,
) -> Result<Vec<u8>, FetchError> {
	let mut ftp = connect(endpoint, username, password)?;

	let result = ftp
		.transfer_type(FileType::Binary)
		.and_then(|()| ftp.retr_as_buffer(path))
		.map(|buffer| buffer.into_inner())
		.map_err(|error| FetchError::File(error.into()));

	quit(ftp);

	result
}

/// Logs in and out again.
pub(super) fn login(endpoint: &Endpoint, username: &str, password: &str) -> Result<(), FetchError> {
	quit(connect(endpoint, username, password)?);

	Ok(())
}

/// Connects and logs in, in passive mode.
fn connect(endpoint: &Endpoint, username: &str, password: &str) -> Result<FtpStream, FetchError> {
	let mut ftp = FtpStream::connect_timeout(resolve(endpoint)?, CONNECT_TIMEOUT)
		.map_err(|error| FetchError::Connect(error.into()))?;

	ftp.set_mode(Mode::Passive);
	ftp.login(username, password)
		.map_err(|error| FetchError::Login(error.into()))?;

	Ok(ftp)
}

/// Closes the session; failing to do so is harmless.
fn quit(mut ftp: FtpStream) {
	if let Err(error) = ftp.quit() {
		tracing::debug!(%error, "failed to close ftp session");
	}
}
