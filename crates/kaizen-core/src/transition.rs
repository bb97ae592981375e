//! The DMAIC status machine.
//!
//! `next_status` is pure: given where an opportunity is and what just
//! happened, it returns where the opportunity goes or why it cannot. Every
//! status write in the service layer goes through here.

use crate::approval::ApprovalStep;
use crate::error::{KaizenError, Result};
use crate::types::{Status, SubStatus};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    LeaderAssigned,
    DetailsUpdated,
    TeamMemberAdded { members_before: usize },
    DefineSubmitted,
    SsvToolsSubmitted,
    MeasureAnalyzeSubmitted(SubStatus),
    ImproveSubmitted(SubStatus),
    ControlSubmitted(SubStatus),
    ClosureCreated,
    Approved(ApprovalStep),
    Revoked,
    Expired,
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::LeaderAssigned => "leader_assigned",
            LifecycleEvent::DetailsUpdated => "details_updated",
            LifecycleEvent::TeamMemberAdded { .. } => "team_member_added",
            LifecycleEvent::DefineSubmitted => "define_submitted",
            LifecycleEvent::SsvToolsSubmitted => "ssv_tools_submitted",
            LifecycleEvent::MeasureAnalyzeSubmitted(_) => "measure_analyze_submitted",
            LifecycleEvent::ImproveSubmitted(_) => "improve_submitted",
            LifecycleEvent::ControlSubmitted(_) => "control_submitted",
            LifecycleEvent::ClosureCreated => "closure_created",
            LifecycleEvent::Approved(_) => "approved",
            LifecycleEvent::Revoked => "revoked",
            LifecycleEvent::Expired => "expired",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Approved(step) => write!(f, "approved({step})"),
            LifecycleEvent::MeasureAnalyzeSubmitted(sub)
            | LifecycleEvent::ImproveSubmitted(sub)
            | LifecycleEvent::ControlSubmitted(sub) => write!(f, "{}({sub})", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

/// Case-insensitive match against the configured flagship category.
pub fn is_flagship(category: &str, flagship_category: &str) -> bool {
    category.trim().eq_ignore_ascii_case(flagship_category.trim())
}

/// Flagship opportunities enter the workflow waiting for a leader; everything
/// else is recorded as already complete.
pub fn initial_status(category: &str, flagship_category: &str) -> Status {
    if is_flagship(category, flagship_category) {
        Status::OpenForAssigning
    } else {
        Status::OpportunityCompleted
    }
}

fn reject(current: Status, event: &LifecycleEvent, reason: impl Into<String>) -> KaizenError {
    KaizenError::InvalidTransition {
        from: current.to_string(),
        event: event.to_string(),
        reason: reason.into(),
    }
}

/// Compute the status that follows `event`.
pub fn next_status(current: Status, flagship: bool, event: &LifecycleEvent) -> Result<Status> {
    // Non-flagship opportunities never run the workflow; a leader and team may
    // still be recorded against them without disturbing the status.
    if !flagship
        && current == Status::OpportunityCompleted
        && matches!(
            event,
            LifecycleEvent::LeaderAssigned | LifecycleEvent::TeamMemberAdded { .. }
        )
    {
        return Ok(current);
    }

    if current.is_terminal() {
        return Err(reject(current, event, "opportunity is closed"));
    }

    use Status as S;
    match *event {
        LifecycleEvent::LeaderAssigned => match current {
            S::OpenForAssigning | S::ProjectAssigned => Ok(S::ProjectAssigned),
            _ => Err(reject(current, event, "work has already started")),
        },
        LifecycleEvent::DetailsUpdated => match current {
            S::ProjectAssigned | S::DetailsUpdated => Ok(S::DetailsUpdated),
            _ => Err(reject(current, event, "details follow leader assignment")),
        },
        LifecycleEvent::TeamMemberAdded { members_before } => {
            if current == S::OpenForAssigning {
                return Err(reject(current, event, "assign a project leader first"));
            }
            if members_before == 0 && current < S::TeamsUpdated {
                Ok(S::TeamsUpdated)
            } else {
                Ok(current)
            }
        }
        LifecycleEvent::DefineSubmitted => match current {
            S::TeamsUpdated | S::DefinePhaseCompleted => Ok(S::DefinePhaseCompleted),
            _ => Err(reject(current, event, "define needs a team")),
        },
        LifecycleEvent::SsvToolsSubmitted => match current {
            S::DefinePhaseCompleted | S::SsvToolsUpdated => Ok(S::SsvToolsUpdated),
            _ => Err(reject(current, event, "SSV tools follow the define phase")),
        },
        LifecycleEvent::MeasureAnalyzeSubmitted(sub) => phase_submission(
            current,
            event,
            sub,
            &[S::DefinePhaseCompleted, S::SsvToolsUpdated],
            S::MeasureAnalyzePhasePending,
            S::MeasureAnalyzePhaseCompleted,
        ),
        LifecycleEvent::ImproveSubmitted(sub) => phase_submission(
            current,
            event,
            sub,
            &[S::MeasureAnalyzePhaseCompleted],
            S::ImprovePhasePending,
            S::ImprovePhaseCompleted,
        ),
        LifecycleEvent::ControlSubmitted(sub) => phase_submission(
            current,
            event,
            sub,
            &[S::ImprovePhaseCompleted],
            S::ControlPhasePending,
            S::ControlPhaseCompleted,
        ),
        LifecycleEvent::ClosureCreated => match current {
            S::ControlPhaseCompleted => Ok(S::ProjectClosurePendingCiHead),
            _ => Err(reject(current, event, "control phase is not complete")),
        },
        LifecycleEvent::Approved(step) => {
            if current == step.entry_status() {
                Ok(step.exit_status())
            } else {
                Err(reject(
                    current,
                    event,
                    format!("{} approval needs '{}'", step.label(), step.entry_status()),
                ))
            }
        }
        LifecycleEvent::Revoked => Ok(S::Revoke),
        LifecycleEvent::Expired => Ok(S::Expired),
    }
}

/// Measure/Analyze, Improve and Control share one rule. A completed phase
/// only accepts completed resubmissions.
fn phase_submission(
    current: Status,
    event: &LifecycleEvent,
    sub: SubStatus,
    entry: &[Status],
    pending: Status,
    completed: Status,
) -> Result<Status> {
    let target = match sub {
        SubStatus::Pending => pending,
        SubStatus::Completed => completed,
    };
    if entry.contains(&current) || current == pending {
        Ok(target)
    } else if current == completed {
        match sub {
            SubStatus::Completed => Ok(completed),
            SubStatus::Pending => Err(reject(current, event, "phase is already completed")),
        }
    } else {
        let opens_at: Vec<&str> = entry.iter().map(|s| s.as_str()).collect();
        Err(reject(
            current,
            event,
            format!("phase opens at '{}'", opens_at.join("' or '")),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
