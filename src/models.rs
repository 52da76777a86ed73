use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::error::ValidationError;

/// Column order of the CSV file and wire names of remote documents.
pub const FIELDS: [&str; 7] = [
    "empresa",
    "cargo",
    "data",
    "tipo",
    "status",
    "observacoes",
    "link",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WorkMode {
    OnSite,
    Remote,
    Hybrid,
}

impl WorkMode {
    pub fn label(self) -> &'static str {
        match self {
            WorkMode::OnSite => "Presencial",
            WorkMode::Remote => "Remoto",
            WorkMode::Hybrid => "Híbrido",
        }
    }
}

impl FromStr for WorkMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on-site" | "onsite" | "presencial" => Ok(WorkMode::OnSite),
            "remote" | "remoto" => Ok(WorkMode::Remote),
            "hybrid" | "híbrido" | "hibrido" => Ok(WorkMode::Hybrid),
            _ => Err(ValidationError::UnknownMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Status {
    #[default]
    Applied,
    Interview,
    Rejected,
    Hired,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Applied => "Inscrito",
            Status::Interview => "Entrevista",
            Status::Rejected => "Rejeitado",
            Status::Hired => "Contratado",
        }
    }
}

impl FromStr for Status {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "applied" | "inscrito" => Ok(Status::Applied),
            "interview" | "entrevista" => Ok(Status::Interview),
            "rejected" | "rejeitado" => Ok(Status::Rejected),
            "hired" | "contratado" => Ok(Status::Hired),
            _ => Err(ValidationError::UnknownStatus(s.to_string())),
        }
    }
}

/// A validated application waiting to be persisted. Company and role are
/// guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    company: String,
    role: String,
    date: NaiveDate,
    pub mode: Option<WorkMode>,
    pub status: Status,
    pub notes: String,
    pub link: String,
}

impl NewApplication {
    /// `date` must be ISO `YYYY-MM-DD`. Text fields are trimmed.
    pub fn new(company: &str, role: &str, date: &str) -> Result<Self, ValidationError> {
        let company = company.trim();
        let role = role.trim();
        if company.is_empty() {
            return Err(ValidationError::EmptyCompany);
        }
        if role.is_empty() {
            return Err(ValidationError::EmptyRole);
        }
        let date = dates::parse_iso(date)
            .ok_or_else(|| ValidationError::InvalidDate(date.to_string()))?;

        Ok(Self {
            company: company.to_string(),
            role: role.to_string(),
            date,
            mode: None,
            status: Status::default(),
            notes: String::new(),
            link: String::new(),
        })
    }

    pub fn with_mode(mut self, mode: Option<WorkMode>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.trim().to_string();
        self
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.link = link.trim().to_string();
        self
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn mode_label(&self) -> &'static str {
        self.mode.map(WorkMode::label).unwrap_or("")
    }

    /// Row in [`FIELDS`] order, date in display form.
    pub fn to_row(&self) -> [String; 7] {
        [
            self.company.clone(),
            self.role.clone(),
            dates::to_display(self.date),
            self.mode_label().to_string(),
            self.status.label().to_string(),
            self.notes.clone(),
            self.link.clone(),
        ]
    }
}

/// A record as read back from either backend. Every field is present; missing
/// values are empty strings and `date` is always in display form (or the raw
/// stored text when it could not be understood).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "empresa")]
    pub company: String,
    #[serde(rename = "cargo")]
    pub role: String,
    #[serde(rename = "data")]
    pub date: String,
    #[serde(rename = "tipo")]
    pub mode: String,
    pub status: String,
    #[serde(rename = "observacoes")]
    pub notes: String,
    pub link: String,
}

impl Record {
    pub fn from_fields<'a>(mut get: impl FnMut(&str) -> Option<&'a str>) -> Self {
        let mut field = |name: &str| get(name).unwrap_or("").to_string();
        Self {
            company: field("empresa"),
            role: field("cargo"),
            date: field("data"),
            mode: field("tipo"),
            status: field("status"),
            notes: field("observacoes"),
            link: field("link"),
        }
    }

    pub fn to_row(&self) -> [&str; 7] {
        [
            &self.company,
            &self.role,
            &self.date,
            &self.mode,
            &self.status,
            &self.notes,
            &self.link,
        ]
    }

    pub fn is_blank(&self) -> bool {
        self.to_row().iter().all(|f| f.trim().is_empty())
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        dates::parse_display(&self.date)
    }

    pub fn has_openable_link(&self) -> bool {
        self.link.starts_with("http")
    }
}

impl From<&NewApplication> for Record {
    fn from(app: &NewApplication) -> Self {
        let [company, role, date, mode, status, notes, link] = app.to_row();
        Self {
            company,
            role,
            date,
            mode,
            status,
            notes,
            link,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} ({})", self.role, self.company, self.date)
    }
}
