use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of an opportunity.
///
/// Variants are declared in workflow order so `Ord` reflects how far along an
/// opportunity is. The serialized form is the human-readable label shown in
/// reports and mails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Open for Assigning")]
    OpenForAssigning,
    #[serde(rename = "Project Assigned")]
    ProjectAssigned,
    #[serde(rename = "Details Updated")]
    DetailsUpdated,
    #[serde(rename = "Teams Updated")]
    TeamsUpdated,
    #[serde(rename = "Define Phase Completed")]
    DefinePhaseCompleted,
    #[serde(rename = "SSV's Tools Updated")]
    SsvToolsUpdated,
    #[serde(rename = "Measure & Analyze Phase Pending")]
    MeasureAnalyzePhasePending,
    #[serde(rename = "Measure & Analyze Phase Completed")]
    MeasureAnalyzePhaseCompleted,
    #[serde(rename = "Improvement Phase Pending")]
    ImprovePhasePending,
    #[serde(rename = "Improvement Phase Completed")]
    ImprovePhaseCompleted,
    #[serde(rename = "Control Phase Pending")]
    ControlPhasePending,
    #[serde(rename = "Control Phase Completed")]
    ControlPhaseCompleted,
    #[serde(rename = "Project Closure Pending (CIHead)")]
    ProjectClosurePendingCiHead,
    #[serde(rename = "Project Closure Pending (HOD)")]
    ProjectClosurePendingHod,
    #[serde(rename = "Project Closure Pending (LOF)")]
    ProjectClosurePendingLof,
    #[serde(rename = "Project Closure Pending (Costing Head)")]
    ProjectClosurePendingCostingHead,
    #[serde(rename = "Opportunity Completed")]
    OpportunityCompleted,
    #[serde(rename = "Project Completed")]
    ProjectCompleted,
    #[serde(rename = "Revoke")]
    Revoke,
    #[serde(rename = "Expired")]
    Expired,
}

impl Status {
    pub fn all() -> &'static [Status] {
        &[
            Status::OpenForAssigning,
            Status::ProjectAssigned,
            Status::DetailsUpdated,
            Status::TeamsUpdated,
            Status::DefinePhaseCompleted,
            Status::SsvToolsUpdated,
            Status::MeasureAnalyzePhasePending,
            Status::MeasureAnalyzePhaseCompleted,
            Status::ImprovePhasePending,
            Status::ImprovePhaseCompleted,
            Status::ControlPhasePending,
            Status::ControlPhaseCompleted,
            Status::ProjectClosurePendingCiHead,
            Status::ProjectClosurePendingHod,
            Status::ProjectClosurePendingLof,
            Status::ProjectClosurePendingCostingHead,
            Status::OpportunityCompleted,
            Status::ProjectCompleted,
            Status::Revoke,
            Status::Expired,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::OpenForAssigning => "Open for Assigning",
            Status::ProjectAssigned => "Project Assigned",
            Status::DetailsUpdated => "Details Updated",
            Status::TeamsUpdated => "Teams Updated",
            Status::DefinePhaseCompleted => "Define Phase Completed",
            Status::SsvToolsUpdated => "SSV's Tools Updated",
            Status::MeasureAnalyzePhasePending => "Measure & Analyze Phase Pending",
            Status::MeasureAnalyzePhaseCompleted => "Measure & Analyze Phase Completed",
            Status::ImprovePhasePending => "Improvement Phase Pending",
            Status::ImprovePhaseCompleted => "Improvement Phase Completed",
            Status::ControlPhasePending => "Control Phase Pending",
            Status::ControlPhaseCompleted => "Control Phase Completed",
            Status::ProjectClosurePendingCiHead => "Project Closure Pending (CIHead)",
            Status::ProjectClosurePendingHod => "Project Closure Pending (HOD)",
            Status::ProjectClosurePendingLof => "Project Closure Pending (LOF)",
            Status::ProjectClosurePendingCostingHead => "Project Closure Pending (Costing Head)",
            Status::OpportunityCompleted => "Opportunity Completed",
            Status::ProjectCompleted => "Project Completed",
            Status::Revoke => "Revoke",
            Status::Expired => "Expired",
        }
    }

    /// Snake-case identifier, accepted by `FromStr` alongside the label.
    pub fn code(self) -> &'static str {
        match self {
            Status::OpenForAssigning => "open_for_assigning",
            Status::ProjectAssigned => "project_assigned",
            Status::DetailsUpdated => "details_updated",
            Status::TeamsUpdated => "teams_updated",
            Status::DefinePhaseCompleted => "define_phase_completed",
            Status::SsvToolsUpdated => "ssv_tools_updated",
            Status::MeasureAnalyzePhasePending => "measure_analyze_phase_pending",
            Status::MeasureAnalyzePhaseCompleted => "measure_analyze_phase_completed",
            Status::ImprovePhasePending => "improve_phase_pending",
            Status::ImprovePhaseCompleted => "improve_phase_completed",
            Status::ControlPhasePending => "control_phase_pending",
            Status::ControlPhaseCompleted => "control_phase_completed",
            Status::ProjectClosurePendingCiHead => "project_closure_pending_cihead",
            Status::ProjectClosurePendingHod => "project_closure_pending_hod",
            Status::ProjectClosurePendingLof => "project_closure_pending_lof",
            Status::ProjectClosurePendingCostingHead => "project_closure_pending_costing_head",
            Status::OpportunityCompleted => "opportunity_completed",
            Status::ProjectCompleted => "project_completed",
            Status::Revoke => "revoke",
            Status::Expired => "expired",
        }
    }

    /// No lifecycle event applies once an opportunity reaches one of these.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::OpportunityCompleted
                | Status::ProjectCompleted
                | Status::Revoke
                | Status::Expired
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = crate::error::KaizenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Status::all()
            .iter()
            .copied()
            .find(|st| st.as_str().eq_ignore_ascii_case(needle) || st.code() == needle)
            .ok_or_else(|| crate::error::KaizenError::Validation(format!("unknown status '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// SubStatus
// ---------------------------------------------------------------------------

/// Caller-supplied completion flag on Measure/Analyze, Improve and Control
/// submissions. Anything other than "Pending" counts as completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubStatus {
    Pending,
    Completed,
}

impl SubStatus {
    pub fn parse(flag: &str) -> SubStatus {
        if flag.trim().eq_ignore_ascii_case("pending") {
            SubStatus::Pending
        } else {
            SubStatus::Completed
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubStatus::Pending => "Pending",
            SubStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for SubStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Organizational role of an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    CiHead,
    Admin,
    Hod,
    ProjectLeader,
    Lof,
    CsHead,
    #[default]
    Employee,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::CiHead => "ci_head",
            Role::Admin => "admin",
            Role::Hod => "hod",
            Role::ProjectLeader => "project_leader",
            Role::Lof => "lof",
            Role::CsHead => "cs_head",
            Role::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = crate::error::KaizenError;

    /// Accepts "CI Head", "ci-head" and "ci_head" alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "ci_head" => Ok(Role::CiHead),
            "admin" => Ok(Role::Admin),
            "hod" => Ok(Role::Hod),
            "project_leader" => Ok(Role::ProjectLeader),
            "lof" => Ok(Role::Lof),
            "cs_head" => Ok(Role::CsHead),
            "employee" | "" => Ok(Role::Employee),
            _ => Err(crate::error::KaizenError::Validation(format!(
                "unknown role '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
