//! TCP listener plugin: one bound socket per running listener.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use picket_entity::listener::options::PORT;
use picket_listener::prelude::*;

use crate::acceptor;

/// Option holding the local address to bind.
pub const BIND_IP: &str = "BindIP";

/// Manifest kind handled by [`TcpListenerFactory`].
pub const KIND: &str = "tcp";

#[derive(Debug)]
struct Running {
    addr: SocketAddr,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Listener plugin that holds a TCP port open.
#[derive(Debug, Default)]
pub struct TcpListenerPlugin {
    running: DashMap<String, Running>,
}

impl TcpListenerPlugin {
    /// Create a plugin with no running listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Address a running listener is bound to.
    pub fn local_addr(&self, name: &str) -> Option<SocketAddr> {
        self.running.get(name).map(|r| r.addr)
    }

    /// Number of running listeners.
    pub fn running_count(&self) -> usize {
        self.running.len()
    }
}

fn bind_ip(options: &ListenerOptions) -> Result<IpAddr, String> {
    match options.value(BIND_IP).trim() {
        "" => Ok(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        raw => raw
            .parse()
            .map_err(|_| format!("'{raw}' is not a valid bind address")),
    }
}

#[async_trait]
impl ListenerPlugin for TcpListenerPlugin {
    async fn start(&self, name: &str, options: &ListenerOptions) -> Result<bool, String> {
        let Ok(port) = options.value(PORT).trim().parse::<u16>() else {
            tracing::warn!(listener = %name, port = %options.value(PORT), "No usable port configured");
            return Ok(false);
        };

        if self.running.contains_key(name) {
            return Err(format!("listener '{name}' is already bound"));
        }

        let addr = SocketAddr::new(bind_ip(options)?, port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| format!("failed to bind {addr}: {e}"))?;
        let addr = listener.local_addr().map_err(|e| e.to_string())?;

        let (cancel, rx) = watch::channel(false);
        let task = tokio::spawn(acceptor::run(name.to_string(), listener, rx));

        self.running
            .insert(name.to_string(), Running { addr, cancel, task });

        tracing::info!(listener = %name, addr = %addr, "TCP listener bound");
        Ok(true)
    }

    async fn shutdown(&self, name: &str) {
        let Some((_, running)) = self.running.remove(name) else {
            tracing::warn!(listener = %name, "TCP listener is not running");
            return;
        };

        let _ = running.cancel.send(true);
        if let Err(e) = running.task.await {
            tracing::error!(listener = %name, error = %e, "TCP accept loop ended abnormally");
        }
        tracing::info!(listener = %name, addr = %running.addr, "TCP listener closed");
    }
}

/// Factory for the `tcp` kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpListenerFactory;

impl ListenerFactory for TcpListenerFactory {
    fn kind(&self) -> &str {
        KIND
    }

    fn create(&self, _manifest: &ListenerManifest) -> Result<Arc<dyn ListenerPlugin>, String> {
        Ok(Arc::new(TcpListenerPlugin::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(port: &str) -> ListenerOptions {
        let mut options = ListenerOptions::new();
        options.insert("Name", OptionValue::new("tcp", true, ""));
        options.insert("Host", OptionValue::new("http://127.0.0.1", true, ""));
        options.insert("Port", OptionValue::new(port, true, ""));
        options.insert(BIND_IP, OptionValue::new("127.0.0.1", true, ""));
        options
    }

    #[tokio::test]
    async fn test_start_accept_and_shutdown() {
        let plugin = TcpListenerPlugin::new();
        assert!(plugin.start("tcp", &options("0")).await.unwrap());

        let addr = plugin.local_addr("tcp").unwrap();
        assert_ne!(addr.port(), 0);
        tokio::net::TcpStream::connect(addr).await.unwrap();

        plugin.shutdown("tcp").await;
        assert_eq!(plugin.running_count(), 0);
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_port_declines() {
        let plugin = TcpListenerPlugin::new();
        assert!(!plugin.start("tcp", &options("")).await.unwrap());
        assert!(!plugin.start("tcp", &options("http")).await.unwrap());
        assert_eq!(plugin.running_count(), 0);
    }

    #[tokio::test]
    async fn test_port_in_use_is_an_error() {
        let plugin = TcpListenerPlugin::new();
        assert!(plugin.start("first", &options("0")).await.unwrap());
        let port = plugin.local_addr("first").unwrap().port().to_string();

        let err = plugin.start("second", &options(&port)).await.unwrap_err();
        assert!(err.contains("failed to bind"));

        let err = plugin.start("first", &options("0")).await.unwrap_err();
        assert!(err.contains("already bound"));

        plugin.shutdown("first").await;
    }

    #[tokio::test]
    async fn test_invalid_bind_ip() {
        let plugin = TcpListenerPlugin::new();
        let mut opts = options("0");
        opts.set_value(BIND_IP, "not-an-ip");
        assert!(plugin.start("tcp", &opts).await.is_err());
    }

    #[test]
    fn test_factory_set() {
        let factories = crate::factories().unwrap();
        assert_eq!(factories.kinds(), vec!["tcp"]);
    }
}
