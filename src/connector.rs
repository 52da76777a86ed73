use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::store::{RemoteStore, ServerInfo};

/// Outcome of a connectivity probe, shaped for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Why the check failed. Always `None` on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConnectionReport {
    fn success(info: ServerInfo) -> Self {
        Self {
            ok: true,
            server_version: Some(info.version),
            vendor: info.vendor,
            message: None,
        }
    }

    fn failure(err: &StoreError) -> Self {
        Self {
            ok: false,
            server_version: None,
            vendor: None,
            message: Some(err.to_string()),
        }
    }
}

/// Owns the remote connection attempt. Holds a live handle only after a
/// successful [`Connector::connect`].
pub struct Connector {
    uri: Option<String>,
    db_name: String,
    timeout: Duration,
    handle: Option<Rc<dyn RemoteStore>>,
}

impl Connector {
    pub fn new(uri: Option<String>, db_name: &str, timeout: Duration) -> Self {
        Self {
            uri,
            db_name: db_name.to_string(),
            timeout,
            handle: None,
        }
    }

    /// Wraps an already established store.
    #[allow(dead_code)]
    pub fn with_handle(store: Rc<dyn RemoteStore>) -> Self {
        Self {
            uri: None,
            db_name: String::new(),
            timeout: Duration::ZERO,
            handle: Some(store),
        }
    }

    /// Attempts the connection, replacing any previous handle. Failures are
    /// logged and leave the connector disconnected; they never propagate.
    pub fn connect(&mut self) -> bool {
        self.handle = None;
        let Some(uri) = self.uri.as_deref() else {
            debug!("no remote URI configured, using local store only");
            return false;
        };

        match dial(uri, &self.db_name, self.timeout) {
            Ok((store, info)) => {
                info!(version = %info.version, db = %self.db_name, "connected to remote store");
                self.handle = Some(store);
                true
            }
            Err(err) => {
                warn!(error = %err, "remote store unavailable, falling back to local store");
                false
            }
        }
    }

    #[allow(dead_code)]
    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<Rc<dyn RemoteStore>> {
        self.handle.clone()
    }

    /// Probes the server identity. Uses the live handle when there is one,
    /// otherwise asks the server for its identity without creating anything.
    /// Never performs a network call without a configured URI.
    pub fn test_connection(&self) -> ConnectionReport {
        let probe = match (&self.handle, self.uri.as_deref()) {
            (Some(store), _) => store.server_info(),
            (None, None) => Err(StoreError::NoRemoteUri),
            (None, Some(uri)) => server_info(uri, &self.db_name, self.timeout),
        };
        match probe {
            Ok(info) => ConnectionReport::success(info),
            Err(err) => ConnectionReport::failure(&err),
        }
    }
}

#[cfg(feature = "remote")]
fn dial(
    uri: &str,
    db_name: &str,
    timeout: Duration,
) -> Result<(Rc<dyn RemoteStore>, ServerInfo), StoreError> {
    let (store, info) = crate::couch::CouchStore::open(uri, db_name, timeout)?;
    let store: Rc<dyn RemoteStore> = Rc::new(store);
    Ok((store, info))
}

#[cfg(feature = "remote")]
fn server_info(uri: &str, db_name: &str, timeout: Duration) -> Result<ServerInfo, StoreError> {
    crate::couch::CouchStore::new(uri, db_name, timeout)?.server_info()
}

#[cfg(not(feature = "remote"))]
fn server_info(_uri: &str, _db_name: &str, _timeout: Duration) -> Result<ServerInfo, StoreError> {
    Err(StoreError::ClientUnavailable)
}

#[cfg(not(feature = "remote"))]
fn dial(
    _uri: &str,
    _db_name: &str,
    _timeout: Duration,
) -> Result<(Rc<dyn RemoteStore>, ServerInfo), StoreError> {
    Err(StoreError::ClientUnavailable)
}
