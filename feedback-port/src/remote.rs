use std::path::{Path, PathBuf};

use tokio::net::UnixStream;

/// Location of a port on disk.
///
/// Trusted and untrusted ports live side by side under the application
/// directory with different file names, so a trusted sender can only ever
/// reach a trusted receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortAddress {
    pub app_id: Box<str>,
    pub port_name: Box<str>,
    pub trusted: bool,
}

impl PortAddress {
    pub fn new(app_id: impl Into<Box<str>>, port_name: impl Into<Box<str>>, trusted: bool) -> Self {
        Self {
            app_id: app_id.into(),
            port_name: port_name.into(),
            trusted,
        }
    }

    pub fn socket_path(&self, runtime_dir: &Path) -> PathBuf {
        let file = if self.trusted {
            format!("{}.trusted.sock", self.port_name)
        } else {
            format!("{}.sock", self.port_name)
        };
        runtime_dir.join(&*self.app_id).join(file)
    }
}

/// `$XDG_RUNTIME_DIR/sensor-feedback`, or the same under the temp dir.
pub fn default_runtime_dir() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join("sensor-feedback")
}

/// Handle to a port owned by another application.
#[derive(Debug, Clone)]
pub struct RemotePort {
    address: PortAddress,
    path: PathBuf,
}

impl RemotePort {
    pub fn new(runtime_dir: impl AsRef<Path>, address: PortAddress) -> Self {
        let path = address.socket_path(runtime_dir.as_ref());
        Self { address, path }
    }

    pub fn app_id(&self) -> &str {
        &self.address.app_id
    }

    pub fn port_name(&self) -> &str {
        &self.address.port_name
    }

    pub fn address(&self) -> &PortAddress {
        &self.address
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the remote side is listening right now. Never cached.
    pub async fn is_running(&self) -> bool {
        self.connect().await.is_ok()
    }

    pub(crate) async fn connect(&self) -> std::io::Result<UnixStream> {
        UnixStream::connect(&self.path).await
    }
}
