use crate::error::{KaizenError, Result};
use crate::types::{Role, Status};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ApprovalStep
// ---------------------------------------------------------------------------

/// One sign-off in the closure approval chain. Steps run strictly in order:
/// CI head, HOD, LOF, costing head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStep {
    CiHead,
    Hod,
    Lof,
    CsHead,
}

impl ApprovalStep {
    pub fn chain() -> &'static [ApprovalStep] {
        &[
            ApprovalStep::CiHead,
            ApprovalStep::Hod,
            ApprovalStep::Lof,
            ApprovalStep::CsHead,
        ]
    }

    pub fn as_str(self) -> &'static str {
        self.required_role().as_str()
    }

    pub fn label(self) -> &'static str {
        match self {
            ApprovalStep::CiHead => "CI Head",
            ApprovalStep::Hod => "HOD",
            ApprovalStep::Lof => "LOF",
            ApprovalStep::CsHead => "Costing Head",
        }
    }

    pub fn required_role(self) -> Role {
        match self {
            ApprovalStep::CiHead => Role::CiHead,
            ApprovalStep::Hod => Role::Hod,
            ApprovalStep::Lof => Role::Lof,
            ApprovalStep::CsHead => Role::CsHead,
        }
    }

    /// The status an opportunity must be in for this step to be granted.
    pub fn entry_status(self) -> Status {
        match self {
            ApprovalStep::CiHead => Status::ProjectClosurePendingCiHead,
            ApprovalStep::Hod => Status::ProjectClosurePendingHod,
            ApprovalStep::Lof => Status::ProjectClosurePendingLof,
            ApprovalStep::CsHead => Status::ProjectClosurePendingCostingHead,
        }
    }

    pub fn exit_status(self) -> Status {
        match self.next() {
            Some(next) => next.entry_status(),
            None => Status::OpportunityCompleted,
        }
    }

    pub fn next(self) -> Option<ApprovalStep> {
        match self {
            ApprovalStep::CiHead => Some(ApprovalStep::Hod),
            ApprovalStep::Hod => Some(ApprovalStep::Lof),
            ApprovalStep::Lof => Some(ApprovalStep::CsHead),
            ApprovalStep::CsHead => None,
        }
    }

    /// Only the CI head must belong to the opportunity's plant.
    pub fn is_plant_bound(self) -> bool {
        matches!(self, ApprovalStep::CiHead)
    }

    pub fn for_role(role: Role) -> Option<ApprovalStep> {
        ApprovalStep::chain()
            .iter()
            .copied()
            .find(|step| step.required_role() == role)
    }
}

impl fmt::Display for ApprovalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApprovalStep {
    type Err = KaizenError;

    fn from_str(s: &str) -> Result<Self> {
        let role: Role = s.parse()?;
        ApprovalStep::for_role(role).ok_or_else(|| {
            KaizenError::Validation(format!("role '{s}' is not part of the approval chain"))
        })
    }
}

// ---------------------------------------------------------------------------
// Approvals
// ---------------------------------------------------------------------------

/// Per-step grant flags stored on the opportunity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approvals {
    #[serde(rename = "approved_by_ci_head", default)]
    pub ci_head: bool,
    #[serde(rename = "approved_by_hod", default)]
    pub hod: bool,
    #[serde(rename = "approved_by_lof", default)]
    pub lof: bool,
    #[serde(rename = "approved_by_cs_head", default)]
    pub cs_head: bool,
}

impl Approvals {
    pub fn is_granted(&self, step: ApprovalStep) -> bool {
        match step {
            ApprovalStep::CiHead => self.ci_head,
            ApprovalStep::Hod => self.hod,
            ApprovalStep::Lof => self.lof,
            ApprovalStep::CsHead => self.cs_head,
        }
    }

    pub fn grant(&mut self, step: ApprovalStep) {
        match step {
            ApprovalStep::CiHead => self.ci_head = true,
            ApprovalStep::Hod => self.hod = true,
            ApprovalStep::Lof => self.lof = true,
            ApprovalStep::CsHead => self.cs_head = true,
        }
    }

    /// Steps granted so far, in chain order.
    pub fn granted(&self) -> Vec<ApprovalStep> {
        ApprovalStep::chain()
            .iter()
            .copied()
            .filter(|s| self.is_granted(*s))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
