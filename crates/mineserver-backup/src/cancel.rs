//! Cancellation checks at blocking I/O boundaries.

use crate::error::{BackupError, Result};
use std::io::{self, Read};
use tokio_util::sync::CancellationToken;

/// Returns `Err(Cancelled)` once the token has been triggered.
pub(crate) fn check(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(BackupError::Cancelled);
    }
    Ok(())
}

/// Maps an error to `Cancelled` when the token fired, so a read aborted by
/// [`CancellableReader`] is reported as a cancellation rather than an I/O failure.
pub(crate) fn or_cancelled(token: &CancellationToken, err: BackupError) -> BackupError {
    if token.is_cancelled() {
        BackupError::Cancelled
    } else {
        err
    }
}

/// Reader that fails the next `read` after cancellation.
pub(crate) struct CancellableReader<'a, R> {
    inner: R,
    token: &'a CancellationToken,
}

impl<'a, R: Read> CancellableReader<'a, R> {
    pub(crate) fn new(inner: R, token: &'a CancellationToken) -> Self {
        Self { inner, token }
    }
}

impl<R: Read> Read for CancellableReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.token.is_cancelled() {
            // Not ErrorKind::Interrupted: io::copy would retry it.
            return Err(io::Error::new(io::ErrorKind::Other, "operation cancelled"));
        }
        self.inner.read(buf)
    }
}
