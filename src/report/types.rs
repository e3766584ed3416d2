use crate::runner::state::{RunSessionReport, RunSummary, TableStateReport};
use serde::{Deserialize, Serialize};

/// Run results for report generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResults {
    pub session_id: String,
    pub tables: Vec<TableStateReport>,
    pub summary: RunSummary,
    pub generated_at: String,
}

impl RunResults {
    pub fn from_session(report: RunSessionReport) -> Self {
        Self {
            session_id: report.session_id,
            tables: report.tables,
            summary: report.summary,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
