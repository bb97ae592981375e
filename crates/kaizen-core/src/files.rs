use crate::error::{KaizenError, Result};
use crate::io;
use crate::paths;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Where an uploaded document belongs. Each category maps to its own
/// directory under `uploads/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadCategory {
    DepartmentKpi,
    LastSixMonthsTrend,
    IsoPlot,
    ConcentrationChart,
    ProcessFlowDiagram,
    PChart,
    SsvTool,
    MeasureAnalysis,
    Improvement,
    Control,
    ProjectClosure,
    Opportunity,
}

impl UploadCategory {
    pub fn dir(self) -> &'static str {
        match self {
            UploadCategory::DepartmentKpi => "uploads/define-phase/department-kpi",
            UploadCategory::LastSixMonthsTrend => "uploads/define-phase/last-six-trend",
            UploadCategory::IsoPlot => "uploads/define-phase/iso-plot",
            UploadCategory::ConcentrationChart => "uploads/define-phase/concentration-chart",
            UploadCategory::ProcessFlowDiagram => "uploads/define-phase/process-flow-diagram",
            UploadCategory::PChart => "uploads/define-phase/p-chart",
            UploadCategory::SsvTool => "uploads/ssv-tool",
            UploadCategory::MeasureAnalysis => "uploads/measure-analysis",
            UploadCategory::Improvement => "uploads/improvement",
            UploadCategory::Control => "uploads/control",
            UploadCategory::ProjectClosure => "uploads/project-closure",
            UploadCategory::Opportunity => "uploads/opportunity-category",
        }
    }
}

/// Blob storage for uploaded documents. Returns the stored path, which is what
/// the opportunity records.
pub trait FileStore: Send + Sync {
    fn save(&self, data: &[u8], category: UploadCategory, filename: &str) -> Result<String>;

    /// Delete a previously stored upload. Missing files are not an error.
    fn remove(&self, stored: &str) -> Result<()>;
}

/// Stores uploads on local disk under `.kaizen/`.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    base: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: &Path) -> Self {
        Self {
            base: paths::kaizen_dir(root),
        }
    }

    /// Absolute location of a path previously returned by `save`.
    pub fn resolve(&self, stored: &str) -> Result<PathBuf> {
        if stored.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(KaizenError::Validation(format!(
                "invalid stored path '{stored}'"
            )));
        }
        Ok(self.base.join(stored))
    }
}

impl FileStore for LocalFileStore {
    fn save(&self, data: &[u8], category: UploadCategory, filename: &str) -> Result<String> {
        if data.is_empty() {
            return Err(KaizenError::Validation("upload is empty".into()));
        }
        let name = paths::sanitize_filename(filename)?;
        let stored = format!("{}/{}-{}", category.dir(), Uuid::new_v4().simple(), name);
        io::atomic_write(&self.base.join(&stored), data)?;
        tracing::debug!(path = %stored, bytes = data.len(), "stored upload");
        Ok(stored)
    }

    fn remove(&self, stored: &str) -> Result<()> {
        match std::fs::remove_file(self.resolve(stored)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
