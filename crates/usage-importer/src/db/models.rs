//! Rows of the billing database

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DbError;

/// Status shared by collection jobs and steps, stored as text
macro_rules! text_status {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            #[serde(rename = "IN PROGRESS")]
            InProgress,
            #[serde(rename = "FINISHED")]
            Finished,
            #[serde(rename = "ERROR")]
            Error,
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    Self::InProgress => "IN PROGRESS",
                    Self::Finished => "FINISHED",
                    Self::Error => "ERROR",
                }
            }
        }

        impl FromStr for $name {
            type Err = DbError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    "IN PROGRESS" => Ok(Self::InProgress),
                    "FINISHED" => Ok(Self::Finished),
                    "ERROR" => Ok(Self::Error),
                    other => Err(DbError::Validation(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = DbError;

            fn try_from(value: String) -> Result<Self, DbError> {
                value.parse()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_status!(JobStatus);
text_status!(StepStatus);

/// Stage names of the usage collection pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepTypeName {
    Download,
    Summarize,
    Translate,
    Import,
    Archive,
}

impl StepTypeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "DOWNLOAD",
            Self::Summarize => "SUMMARIZE",
            Self::Translate => "TRANSLATE",
            Self::Import => "IMPORT",
            Self::Archive => "ARCHIVE",
        }
    }
}

impl FromStr for StepTypeName {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DOWNLOAD" => Ok(Self::Download),
            "SUMMARIZE" => Ok(Self::Summarize),
            "TRANSLATE" => Ok(Self::Translate),
            "IMPORT" => Ok(Self::Import),
            "ARCHIVE" => Ok(Self::Archive),
            other => Err(DbError::Validation(format!("unknown step type name '{}'", other))),
        }
    }
}

impl TryFrom<String> for StepTypeName {
    type Error = DbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for StepTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end-to-end collection run for a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CollectionJob {
    #[sqlx(rename = "collection_job_id")]
    pub id: i64,
    pub source_id: i64,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub current_step_type_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

/// One stage execution inside a collection job
///
/// A `Finished` step always carries a `file_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Step {
    #[sqlx(rename = "step_id")]
    pub id: i64,
    pub step_type_id: i64,
    pub collection_job_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub file_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: StepStatus,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StepType {
    #[sqlx(rename = "step_type_id")]
    pub id: i64,
    pub source_id: i64,
    #[sqlx(try_from = "String")]
    pub name: StepTypeName,
    pub step_order: i32,
}

/// Content-addressed artifact; the checksum is the dedup key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct File {
    #[sqlx(rename = "file_id")]
    pub id: i64,
    pub checksum: String,
    pub name: String,
    pub file_path: String,
}
