//! Dial targets and the connected streams they produce.

use std::fmt;
use std::io;
use std::mem::MaybeUninit;
use std::path::{Path, PathBuf};

use socket2::SockRef;
use tokio::net::{TcpStream, UnixStream};

/// Where a peer can be dialed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// TCP `host:port`.
    Tcp(String),
    /// Unix domain socket path.
    Unix(PathBuf),
}

impl Target {
    /// TCP target for `address` (`host:port`).
    #[must_use]
    pub fn tcp(address: impl Into<String>) -> Self {
        Self::Tcp(address.into())
    }

    /// Unix socket target for `path`.
    #[must_use]
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::Unix(path.into())
    }

    /// Returns the socket path for Unix targets.
    #[must_use]
    pub fn socket_path(&self) -> Option<&Path> {
        match self {
            Self::Unix(path) => Some(path),
            Self::Tcp(_) => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(address) => write!(f, "tcp://{address}"),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// A connected stream, ready to carry RPC traffic.
#[derive(Debug)]
pub enum Transport {
    /// TCP connection.
    Tcp(TcpStream),
    /// Unix domain socket connection.
    Unix(UnixStream),
}

impl Transport {
    /// Returns `true` once the peer has closed or reset the connection.
    ///
    /// Peeks one byte without consuming it and never blocks. Unread data
    /// means the peer is still there.
    #[must_use]
    pub fn peer_closed(&self) -> bool {
        let socket = match self {
            Self::Tcp(stream) => SockRef::from(stream),
            Self::Unix(stream) => SockRef::from(stream),
        };
        let mut buf = [MaybeUninit::<u8>::uninit(); 1];
        match socket.peek(&mut buf) {
            Ok(0) => true,
            Ok(_) => false,
            Err(e) => !matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[test]
    fn display_carries_scheme() {
        assert_eq!(Target::tcp("127.0.0.1:5000").to_string(), "tcp://127.0.0.1:5000");
        assert_eq!(
            Target::unix("/var/lib/networkservicemesh/nsm.io.sock").to_string(),
            "unix:///var/lib/networkservicemesh/nsm.io.sock"
        );
    }

    #[test]
    fn socket_path_only_for_unix() {
        assert!(Target::tcp("127.0.0.1:5000").socket_path().is_none());
        assert_eq!(
            Target::unix("/tmp/a.sock").socket_path(),
            Some(Path::new("/tmp/a.sock"))
        );
    }

    #[tokio::test]
    async fn idle_stream_is_open() {
        let Ok((local, _peer)) = UnixStream::pair() else {
            panic!("socket pair");
        };
        assert!(!Transport::Unix(local).peer_closed());
    }

    #[tokio::test]
    async fn hangup_is_seen_without_reading() {
        let Ok((local, peer)) = UnixStream::pair() else {
            panic!("socket pair");
        };
        let transport = Transport::Unix(local);
        drop(peer);
        assert!(transport.peer_closed());
    }

    #[tokio::test]
    async fn pending_data_is_left_in_place() {
        let Ok((local, mut peer)) = UnixStream::pair() else {
            panic!("socket pair");
        };
        let Ok(()) = peer.write_all(b"hi").await else {
            panic!("write");
        };
        let transport = Transport::Unix(local);
        assert!(!transport.peer_closed());

        let Transport::Unix(mut local) = transport else {
            panic!("unix transport");
        };
        let mut buf = [0u8; 2];
        assert!(local.read_exact(&mut buf).await.is_ok());
        assert_eq!(&buf, b"hi");
    }
}
