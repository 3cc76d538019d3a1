use crate::store::ArtifactLocation;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// What one stage consumed and produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: u8,
    pub artifact: &'static str,
    pub records_in: usize,
    pub records_out: usize,
}

/// Result of a completed pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    /// Where the final artifact was written
    pub location: ArtifactLocation,
    /// Logical filename to offer for download
    pub filename: String,
    /// The instant the inactivity window was measured from
    #[serde(serialize_with = "serialize_now")]
    pub now: NaiveDateTime,
    pub stages: Vec<StageReport>,
    /// Roster rows whose last-login value could not be parsed
    pub unparseable_logins: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunOutput {
    /// Number of providers in the final list
    pub fn flagged(&self) -> usize {
        self.stages.last().map(|s| s.records_out).unwrap_or(0)
    }
}

fn serialize_now<S: serde::Serializer>(now: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&now.format(crate::dataset::DATETIME_FORMAT).to_string())
}

impl fmt::Display for RunOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reference time: {}", self.now.format(crate::dataset::DATETIME_FORMAT))?;
        for stage in &self.stages {
            writeln!(
                f,
                "  Stage {}: {} -> {} records ({})",
                stage.stage, stage.records_in, stage.records_out, stage.artifact
            )?;
        }
        if self.unparseable_logins > 0 {
            writeln!(f, "  Unparseable last-login values: {}", self.unparseable_logins)?;
        }
        writeln!(f, "Flagged providers: {}", self.flagged())?;
        write!(f, "Output: {}", self.location)
    }
}
