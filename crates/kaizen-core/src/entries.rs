//! Sub-entities embedded in an opportunity: action plans, schedules, team
//! members and monthly savings. Each carries its own id and is addressed
//! through [`Collection`](crate::collection::Collection).

use crate::collection::{Entry, Patch};
use crate::directory::EmployeeRef;
use crate::error::{KaizenError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(KaizenError::Validation(format!("{field} is required")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ActionPlan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionPlanStatus {
    #[default]
    #[serde(rename = "In Process")]
    InProcess,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Referred")]
    Referred,
    #[serde(rename = "For Info")]
    ForInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub id: Uuid,
    pub action: String,
    #[serde(default)]
    pub status: ActionPlanStatus,
    pub target_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findings: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewActionPlan {
    pub action: String,
    pub target_date: DateTime<Utc>,
}

impl From<NewActionPlan> for ActionPlan {
    fn from(req: NewActionPlan) -> Self {
        ActionPlan {
            id: Uuid::nil(),
            action: req.action,
            status: ActionPlanStatus::InProcess,
            target_date: req.target_date,
            findings: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionPlanUpdate {
    pub action: Option<String>,
    pub status: Option<ActionPlanStatus>,
    pub target_date: Option<DateTime<Utc>>,
    pub findings: Option<String>,
}

impl Entry for ActionPlan {
    const COLLECTION: &'static str = "action_plan";

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn validate(&self) -> Result<()> {
        require("action", &self.action)
    }
}

impl Patch<ActionPlan> for ActionPlanUpdate {
    fn apply_to(self, target: &mut ActionPlan) {
        if let Some(action) = self.action {
            target.action = action;
        }
        if let Some(status) = self.status {
            target.status = status;
        }
        if let Some(date) = self.target_date {
            target.target_date = date;
        }
        if let Some(findings) = self.findings {
            target.findings = Some(findings);
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub phase: String,
    pub planned_start_date: DateTime<Utc>,
    pub planned_end_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSchedule {
    pub phase: String,
    pub planned_start_date: DateTime<Utc>,
    pub planned_end_date: DateTime<Utc>,
}

impl From<NewSchedule> for Schedule {
    fn from(req: NewSchedule) -> Self {
        Schedule {
            id: Uuid::nil(),
            phase: req.phase,
            planned_start_date: req.planned_start_date,
            planned_end_date: req.planned_end_date,
            actual_start_date: None,
            actual_end_date: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleUpdate {
    pub phase: Option<String>,
    pub planned_start_date: Option<DateTime<Utc>>,
    pub planned_end_date: Option<DateTime<Utc>>,
    pub actual_start_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
}

impl Entry for Schedule {
    const COLLECTION: &'static str = "schedules";

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn validate(&self) -> Result<()> {
        require("phase", &self.phase)?;
        if self.planned_end_date < self.planned_start_date {
            return Err(KaizenError::Validation(
                "planned_end_date is before planned_start_date".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.actual_start_date, self.actual_end_date) {
            if end < start {
                return Err(KaizenError::Validation(
                    "actual_end_date is before actual_start_date".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Patch<Schedule> for ScheduleUpdate {
    fn apply_to(self, target: &mut Schedule) {
        if let Some(phase) = self.phase {
            target.phase = phase;
        }
        if let Some(d) = self.planned_start_date {
            target.planned_start_date = d;
        }
        if let Some(d) = self.planned_end_date {
            target.planned_end_date = d;
        }
        if let Some(d) = self.actual_start_date {
            target.actual_start_date = Some(d);
        }
        if let Some(d) = self.actual_end_date {
            target.actual_end_date = Some(d);
        }
    }
}

// ---------------------------------------------------------------------------
// TeamMember
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TeamMemberRole {
    #[serde(rename = "Project Mentor")]
    ProjectMentor,
    #[default]
    #[serde(rename = "Team Member")]
    TeamMember,
    #[serde(rename = "Project Sponsor")]
    ProjectSponsor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: Uuid,
    pub employee: EmployeeRef,
    #[serde(default)]
    pub role: TeamMemberRole,
}

impl TeamMember {
    pub fn new(employee: EmployeeRef, role: TeamMemberRole) -> Self {
        Self {
            id: Uuid::nil(),
            employee,
            role,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTeamMember {
    pub employee_id: String,
    #[serde(default)]
    pub role: TeamMemberRole,
}

/// Wire form of a team member update; the employee is resolved by the service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamMemberUpdate {
    pub employee_id: Option<String>,
    pub role: Option<TeamMemberRole>,
}

/// Resolved team member update.
#[derive(Debug, Clone, Default)]
pub struct TeamMemberPatch {
    pub employee: Option<EmployeeRef>,
    pub role: Option<TeamMemberRole>,
}

impl Entry for TeamMember {
    const COLLECTION: &'static str = "team_members";

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }
}

impl Patch<TeamMember> for TeamMemberPatch {
    fn apply_to(self, target: &mut TeamMember) {
        if let Some(employee) = self.employee {
            target.employee = employee;
        }
        if let Some(role) = self.role {
            target.role = role;
        }
    }
}

// ---------------------------------------------------------------------------
// MonthlySavings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySavings {
    pub id: Uuid,
    pub year: String,
    pub month: String,
    pub savings: String,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMonthlySavings {
    pub year: String,
    pub month: String,
    pub savings: String,
}

impl From<NewMonthlySavings> for MonthlySavings {
    fn from(req: NewMonthlySavings) -> Self {
        MonthlySavings {
            id: Uuid::nil(),
            year: req.year,
            month: req.month,
            savings: req.savings,
            is_approved: false,
            actual: None,
        }
    }
}

/// Approval is a separate operation; an update never flips `is_approved`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthlySavingsUpdate {
    pub year: Option<String>,
    pub month: Option<String>,
    pub savings: Option<String>,
    pub actual: Option<String>,
}

/// Marks a month approved and records the realised amount.
#[derive(Debug, Clone)]
pub(crate) struct SavingsApproval {
    pub actual: Option<String>,
}

impl Entry for MonthlySavings {
    const COLLECTION: &'static str = "monthly_savings";

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn validate(&self) -> Result<()> {
        require("year", &self.year)?;
        require("month", &self.month)?;
        require("savings", &self.savings)
    }
}

impl Patch<MonthlySavings> for MonthlySavingsUpdate {
    fn apply_to(self, target: &mut MonthlySavings) {
        if let Some(year) = self.year {
            target.year = year;
        }
        if let Some(month) = self.month {
            target.month = month;
        }
        if let Some(savings) = self.savings {
            target.savings = savings;
        }
        if let Some(actual) = self.actual {
            target.actual = Some(actual);
        }
    }
}

impl Patch<MonthlySavings> for SavingsApproval {
    fn apply_to(self, target: &mut MonthlySavings) {
        target.is_approved = true;
        if let Some(actual) = self.actual {
            target.actual = Some(actual);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use chrono::Duration;

    #[test]
    fn new_action_plan_starts_in_process() {
        let plan: ActionPlan = NewActionPlan {
            action: "Audit fixtures".into(),
            target_date: Utc::now(),
        }
        .into();
        assert_eq!(plan.status, ActionPlanStatus::InProcess);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["status"], "In Process");
    }

    #[test]
    fn blank_action_is_rejected() {
        let mut plans = Collection::new();
        let plan: ActionPlan = NewActionPlan {
            action: "  ".into(),
            target_date: Utc::now(),
        }
        .into();
        assert!(plans.append(plan).is_err());
        assert!(plans.is_empty());
    }

    #[test]
    fn schedule_dates_must_be_ordered() {
        let now = Utc::now();
        let mut schedules = Collection::new();
        let id = schedules
            .append(Schedule::from(NewSchedule {
                phase: "Define".into(),
                planned_start_date: now,
                planned_end_date: now + Duration::days(14),
            }))
            .unwrap();
        let err = schedules
            .update(
                id,
                ScheduleUpdate {
                    planned_end_date: Some(now - Duration::days(1)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, KaizenError::Validation(_)));
        assert_eq!(
            schedules.find(id).unwrap().planned_end_date,
            now + Duration::days(14)
        );
    }

    #[test]
    fn savings_update_never_approves() {
        let mut savings = Collection::new();
        let id = savings
            .append(MonthlySavings::from(NewMonthlySavings {
                year: "2025".into(),
                month: "April".into(),
                savings: "12000".into(),
            }))
            .unwrap();
        savings
            .update(
                id,
                MonthlySavingsUpdate {
                    actual: Some("11500".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let entry = savings.find(id).unwrap();
        assert!(!entry.is_approved);
        assert_eq!(entry.actual.as_deref(), Some("11500"));
    }

    #[test]
    fn team_member_role_defaults() {
        let req: NewTeamMember = serde_json::from_str(r#"{"employee_id":"e1"}"#).unwrap();
        assert_eq!(req.role, TeamMemberRole::TeamMember);
    }
}
