//! Unified persistence facade.
//!
//! Every write lands in the local CSV file first. While the remote store is
//! active it receives the same write and serves reads. The first remote
//! failure of any kind demotes the session to local-only for good.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use serde::Serialize;
use tracing::warn;

use crate::config::StoreConfig;
use crate::connector::{ConnectionReport, Connector};
use crate::error::StoreError;
use crate::local::LocalStore;
use crate::models::{NewApplication, Record};
use crate::store::{ListQuery, RecordStore, RemoteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServedBy {
    #[serde(rename = "remote+local")]
    RemoteAndLocal,
    #[serde(rename = "local-only")]
    LocalOnly,
}

impl fmt::Display for ServedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServedBy::RemoteAndLocal => "remote+local",
            ServedBy::LocalOnly => "local-only",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveBackend {
    Remote,
    Local,
}

impl fmt::Display for ActiveBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActiveBackend::Remote => "remote",
            ActiveBackend::Local => "local",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertReceipt {
    pub ok: bool,
    pub backend: ServedBy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl InsertReceipt {
    fn local_only() -> Self {
        Self {
            ok: true,
            backend: ServedBy::LocalOnly,
            id: None,
        }
    }
}

pub struct DataStore {
    connector: Connector,
    remote: Option<Rc<dyn RemoteStore>>,
    local: LocalStore,
}

impl DataStore {
    /// Connects to the remote store if one is configured and prepares the
    /// local file. Only a failure to prepare the local file is an error.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut connector = Connector::new(
            config.remote_uri.clone(),
            &config.db_name,
            config.connect_timeout,
        );
        connector.connect();
        Self::from_parts(connector, LocalStore::new(&config.csv_path))
    }

    /// The remote store is active exactly when `connector` is connected.
    pub fn from_parts(connector: Connector, local: LocalStore) -> Result<Self, StoreError> {
        local.ensure_schema()?;
        let remote = connector.handle();
        Ok(Self {
            connector,
            remote,
            local,
        })
    }

    pub fn active_backend(&self) -> ActiveBackend {
        if self.remote.is_some() {
            ActiveBackend::Remote
        } else {
            ActiveBackend::Local
        }
    }

    pub fn local_path(&self) -> &Path {
        self.local.path()
    }

    /// Writes locally, then remotely while the remote store is active. An
    /// error means the local write itself failed and nothing was stored.
    pub fn insert(&mut self, application: &NewApplication) -> Result<InsertReceipt, StoreError> {
        self.local.insert(application)?;

        let Some(remote) = self.remote.clone() else {
            return Ok(InsertReceipt::local_only());
        };
        match remote.insert(application) {
            Ok(id) => Ok(InsertReceipt {
                ok: true,
                backend: ServedBy::RemoteAndLocal,
                id,
            }),
            Err(err) => {
                self.demote("insert", &err);
                Ok(InsertReceipt::local_only())
            }
        }
    }

    /// Records ordered by date, at most `query.limit` of them. Served by the
    /// remote store while it is active, otherwise by the local file.
    pub fn list(&mut self, query: &ListQuery) -> Result<Vec<Record>, StoreError> {
        let mut records = match self.remote.clone() {
            Some(remote) => match remote.list(query) {
                Ok(records) => records,
                Err(err) => {
                    self.demote("list", &err);
                    self.local.list(query)?
                }
            },
            None => self.local.list(query)?,
        };
        if let Some(limit) = query.effective_limit() {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Probes the remote server regardless of which backend is active.
    pub fn connection_status(&self) -> ConnectionReport {
        self.connector.test_connection()
    }

    fn demote(&mut self, operation: &str, err: &StoreError) {
        warn!(
            operation,
            error = %err,
            "remote store failed, using local store for the rest of the session"
        );
        self.remote = None;
    }
}
