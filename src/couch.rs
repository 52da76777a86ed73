//! Remote document store speaking the CouchDB HTTP API.
//!
//! Documents use the same field names as the CSV columns. `data` is written as
//! an RFC 3339 timestamp so the server can sort on it through a JSON index.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::dates;
use crate::error::StoreError;
use crate::models::{NewApplication, Record};
use crate::store::{ListQuery, RecordStore, RemoteStore, ServerInfo};

const DATE_INDEX: &str = "data-idx";

/// `_find` silently caps results at 25 without an explicit limit.
const FIND_ALL_LIMIT: usize = 1_000_000;

#[derive(Debug, Serialize)]
struct NewDocument<'a> {
    empresa: &'a str,
    cargo: &'a str,
    data: String,
    tipo: &'a str,
    status: &'a str,
    observacoes: &'a str,
    link: &'a str,
}

impl<'a> From<&'a NewApplication> for NewDocument<'a> {
    fn from(app: &'a NewApplication) -> Self {
        Self {
            empresa: app.company(),
            cargo: app.role(),
            data: dates::to_remote(app.date()),
            tipo: app.mode_label(),
            status: app.status.label(),
            observacoes: &app.notes,
            link: &app.link,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    docs: Vec<Map<String, Value>>,
    #[serde(default)]
    warning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Vendor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Welcome {
    version: String,
    #[serde(default)]
    vendor: Option<Vendor>,
}

#[derive(Debug, Clone)]
pub struct CouchStore {
    client: Client,
    base: Url,
    credentials: Option<(String, Option<String>)>,
    db_name: String,
}

impl CouchStore {
    /// Builds the client without touching the network. Credentials embedded
    /// in `uri` are moved out of the URL and sent as basic auth.
    pub fn new(uri: &str, db_name: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut base = Url::parse(uri.trim())
            .map_err(|e| StoreError::Remote(format!("invalid remote URI: {e}")))?;

        let credentials = if base.username().is_empty() {
            None
        } else {
            Some((
                base.username().to_string(),
                base.password().map(str::to_string),
            ))
        };
        let _ = base.set_username("");
        let _ = base.set_password(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base,
            credentials,
            db_name: db_name.to_string(),
        })
    }

    /// Probes the server, then makes sure the database and its date index
    /// exist.
    pub fn open(uri: &str, db_name: &str, timeout: Duration) -> Result<(Self, ServerInfo), StoreError> {
        let store = Self::new(uri, db_name, timeout)?;
        let info = store.server_info()?;
        store.ensure_database()?;
        store.ensure_date_index()?;
        Ok((store, info))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, StoreError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| StoreError::Remote(format!("invalid path '{path}': {e}")))?;
        let builder = self.client.request(method, url);
        Ok(match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, password.as_ref()),
            None => builder,
        })
    }

    fn db_path(&self, rest: &str) -> String {
        format!("{}/{}", self.db_name, rest)
    }

    /// Creating a database needs server-admin rights. Without them the
    /// database is assumed to exist; the first insert fails if it does not.
    fn ensure_database(&self) -> Result<(), StoreError> {
        let response = self.request(Method::PUT, &self.db_name)?.send()?;
        match response.status() {
            StatusCode::PRECONDITION_FAILED => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!(db = %self.db_name, "not allowed to create remote database, assuming it exists");
                Ok(())
            }
            status if status.is_success() => {
                debug!(db = %self.db_name, "created remote database");
                Ok(())
            }
            _ => Err(status_error(response)),
        }
    }

    fn ensure_date_index(&self) -> Result<(), StoreError> {
        let body = json!({
            "index": { "fields": ["data"] },
            "ddoc": DATE_INDEX,
            "name": DATE_INDEX,
            "type": "json",
        });
        let response = self
            .request(Method::POST, &self.db_path("_index"))?
            .json(&body)
            .send()?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!(db = %self.db_name, "not allowed to create date index");
                Ok(())
            }
            _ => checked(response).map(|_| ()),
        }
    }
}

impl RecordStore for CouchStore {
    fn insert(&self, application: &NewApplication) -> Result<Option<String>, StoreError> {
        let document = NewDocument::from(application);
        let response = self
            .request(Method::POST, &self.db_name)?
            .json(&document)
            .send()?;
        let created: InsertResponse = checked(response)?.json()?;
        Ok(Some(created.id))
    }

    fn list(&self, query: &ListQuery) -> Result<Vec<Record>, StoreError> {
        let response = self
            .request(Method::POST, &self.db_path("_find"))?
            .json(&find_body(query))
            .send()?;
        let found: FindResponse = checked(response)?.json()?;
        if let Some(warning) = &found.warning {
            debug!(%warning, "remote find warning");
        }
        Ok(found.docs.iter().map(record_from_document).collect())
    }
}

impl RemoteStore for CouchStore {
    fn server_info(&self) -> Result<ServerInfo, StoreError> {
        let response = self.request(Method::GET, "")?.send()?;
        let welcome: Welcome = checked(response)?.json()?;
        Ok(ServerInfo {
            version: welcome.version,
            vendor: welcome.vendor.map(|v| v.name),
        })
    }
}

fn checked(response: Response) -> Result<Response, StoreError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response))
    }
}

fn status_error(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    StoreError::RemoteStatus { status, body }
}

fn find_body(query: &ListQuery) -> Value {
    let direction = if query.descending { "desc" } else { "asc" };
    json!({
        "selector": { "data": { "$gt": null } },
        "sort": [{ "data": direction }],
        "limit": query.effective_limit().unwrap_or(FIND_ALL_LIMIT),
        "use_index": DATE_INDEX,
    })
}

fn record_from_document(doc: &Map<String, Value>) -> Record {
    let text = |name: &str| match doc.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    Record {
        company: text("empresa"),
        role: text("cargo"),
        date: doc.get("data").map(dates::normalize_remote).unwrap_or_default(),
        mode: text("tipo"),
        status: text("status"),
        notes: text("observacoes"),
        link: text("link"),
    }
}
