//! Identity-keyed CRUD over the opportunity's embedded lists.

use uuid::Uuid;

use super::OpportunityService;
use crate::collection::Patch;
use crate::entries::{
    ActionPlan, MonthlySavings, MonthlySavingsUpdate, NewActionPlan, NewMonthlySavings,
    NewSchedule, NewTeamMember, SavingsApproval, Schedule, TeamMember, TeamMemberPatch,
    TeamMemberUpdate,
};
use crate::error::{KaizenError, Result};
use crate::notify::Notification;
use crate::opportunity::Embedded;
use crate::transition::LifecycleEvent;
use crate::types::Role;

impl OpportunityService {
    // -----------------------------------------------------------------------
    // Generic
    // -----------------------------------------------------------------------

    pub(crate) fn add_entry<T: Embedded>(&self, id: Uuid, item: T) -> Result<T> {
        let (added, _) = self.mutate(id, |opp| {
            let list = T::list_mut(opp)?;
            let entry_id = list.append(item.clone())?;
            Ok(list.find(entry_id)?.clone())
        })?;
        Ok(added)
    }

    pub fn entries<T: Embedded>(&self, id: Uuid) -> Result<Vec<T>> {
        let opp = self.get(id)?;
        Ok(T::list(&opp)
            .map(|list| list.as_slice().to_vec())
            .unwrap_or_default())
    }

    pub fn entry<T: Embedded>(&self, id: Uuid, entry_id: Uuid) -> Result<T> {
        let opp = self.get(id)?;
        T::list(&opp)
            .and_then(|list| list.get(entry_id))
            .cloned()
            .ok_or_else(|| KaizenError::entry_not_found(T::COLLECTION, entry_id))
    }

    /// Apply `patch` to one entry. A missing entry fails the whole call and
    /// leaves the opportunity untouched.
    pub fn update_entry<T, P>(&self, id: Uuid, entry_id: Uuid, patch: P) -> Result<T>
    where
        T: Embedded,
        P: Patch<T> + Clone,
    {
        let (updated, _) = self.mutate(id, |opp| {
            let list = T::list_mut(opp)?;
            Ok(list.update(entry_id, patch.clone())?.clone())
        })?;
        Ok(updated)
    }

    pub fn remove_entry<T: Embedded>(&self, id: Uuid, entry_id: Uuid) -> Result<T> {
        let (removed, _) = self.mutate(id, |opp| T::list_mut(opp)?.remove(entry_id))?;
        tracing::debug!(%id, collection = T::COLLECTION, entry = %entry_id, "entry removed");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Action plans and schedules
    // -----------------------------------------------------------------------

    pub fn add_action_plan(&self, id: Uuid, req: NewActionPlan) -> Result<ActionPlan> {
        self.add_entry(id, ActionPlan::from(req))
    }

    pub fn add_schedule(&self, id: Uuid, req: NewSchedule) -> Result<Schedule> {
        self.add_entry(id, Schedule::from(req))
    }

    // -----------------------------------------------------------------------
    // Team members
    // -----------------------------------------------------------------------

    /// Add a team member. The first member moves the opportunity to
    /// "Teams Updated"; an employee can only be on the team once.
    pub fn add_team_member(&self, id: Uuid, req: NewTeamMember) -> Result<TeamMember> {
        let employee = self.employee(req.employee_id.trim())?;
        let member = TeamMember::new(employee.to_ref(), req.role);
        let (added, saved) = self.mutate(id, |opp| {
            if opp
                .team_members
                .iter()
                .any(|m| m.employee.id == member.employee.id)
            {
                return Err(KaizenError::DuplicateTeamMember(
                    member.employee.employee_code.clone(),
                ));
            }
            let members_before = opp.team_members.len();
            self.advance(opp, LifecycleEvent::TeamMemberAdded { members_before })?;
            let entry_id = opp.team_members.append(member.clone())?;
            Ok(opp.team_members.find(entry_id)?.clone())
        })?;

        self.notify(
            Notification::new(
                "team_member_added",
                format!("You joined opportunity {}", saved.opportunity_id),
            )
            .to(&employee.email)
            .with_context(serde_json::json!({
                "opportunity_id": saved.opportunity_id,
                "statement": saved.statement,
                "role": added.role,
            })),
        );
        Ok(added)
    }

    pub fn update_team_member(
        &self,
        id: Uuid,
        entry_id: Uuid,
        req: TeamMemberUpdate,
    ) -> Result<TeamMember> {
        let employee = match req.employee_id.as_deref() {
            Some(employee_id) => Some(self.employee(employee_id.trim())?.to_ref()),
            None => None,
        };
        let patch = TeamMemberPatch {
            employee,
            role: req.role,
        };
        let (updated, _) = self.mutate(id, |opp| {
            if let Some(employee) = &patch.employee {
                if opp
                    .team_members
                    .iter()
                    .any(|m| m.id != entry_id && m.employee.id == employee.id)
                {
                    return Err(KaizenError::DuplicateTeamMember(
                        employee.employee_code.clone(),
                    ));
                }
            }
            Ok(opp.team_members.update(entry_id, patch.clone())?.clone())
        })?;
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Monthly savings
    // -----------------------------------------------------------------------

    pub fn add_monthly_savings(&self, id: Uuid, req: NewMonthlySavings) -> Result<MonthlySavings> {
        self.add_entry(id, MonthlySavings::from(req))
    }

    /// Edit a month that has not been approved yet.
    pub fn update_monthly_savings(
        &self,
        id: Uuid,
        entry_id: Uuid,
        req: MonthlySavingsUpdate,
    ) -> Result<MonthlySavings> {
        let (updated, _) = self.mutate(id, |opp| {
            let month = opp.monthly_savings.find(entry_id)?;
            if month.is_approved {
                return Err(KaizenError::AlreadyApproved(format!(
                    "savings for {} {}",
                    month.month, month.year
                )));
            }
            Ok(opp.monthly_savings.update(entry_id, req.clone())?.clone())
        })?;
        Ok(updated)
    }

    /// Remove a month that has not been approved yet.
    pub fn remove_monthly_savings(&self, id: Uuid, entry_id: Uuid) -> Result<MonthlySavings> {
        let (removed, _) = self.mutate(id, |opp| {
            let month = opp.monthly_savings.find(entry_id)?;
            if month.is_approved {
                return Err(KaizenError::AlreadyApproved(format!(
                    "savings for {} {}",
                    month.month, month.year
                )));
            }
            opp.monthly_savings.remove(entry_id)
        })?;
        Ok(removed)
    }

    /// Approve one month's savings. Only the costing head or an administrator
    /// may approve, and only once. Administrators are notified.
    pub fn approve_monthly_savings(
        &self,
        id: Uuid,
        entry_id: Uuid,
        employee_id: &str,
        actual: Option<String>,
    ) -> Result<MonthlySavings> {
        let approver = self.employee(employee_id)?;
        if !matches!(approver.role, Role::CsHead | Role::Admin) {
            return Err(KaizenError::Unauthorized(format!(
                "{} cannot approve savings",
                approver.employee_code
            )));
        }
        let approval = SavingsApproval { actual };
        let (approved, saved) = self.mutate(id, |opp| {
            let month = opp.monthly_savings.find(entry_id)?;
            if month.is_approved {
                return Err(KaizenError::AlreadyApproved(format!(
                    "savings for {} {}",
                    month.month, month.year
                )));
            }
            Ok(opp
                .monthly_savings
                .update(entry_id, approval.clone())?
                .clone())
        })?;

        tracing::info!(
            code = %saved.opportunity_id,
            month = %approved.month,
            year = %approved.year,
            "monthly savings approved"
        );
        let mut note = Notification::new(
            "savings_approved",
            format!(
                "Savings for {} {} approved on {}",
                approved.month, approved.year, saved.opportunity_id
            ),
        )
        .with_context(serde_json::json!({
            "opportunity_id": saved.opportunity_id,
            "month": approved.month,
            "year": approved.year,
            "savings": approved.savings,
            "actual": approved.actual,
            "approved_by": approver.name,
        }));
        for email in self.admin_emails() {
            note = note.to(&email);
        }
        self.notify(note);
        Ok(approved)
    }
}

#[cfg(test)]
mod tests {
    use crate::entries::*;
    use crate::error::KaizenError;
    use crate::service::fixtures::*;
    use crate::types::Status;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn member(employee_id: &str) -> NewTeamMember {
        NewTeamMember {
            employee_id: employee_id.into(),
            role: TeamMemberRole::TeamMember,
        }
    }

    fn month(name: &str) -> NewMonthlySavings {
        NewMonthlySavings {
            year: "2025".into(),
            month: name.into(),
            savings: "20000".into(),
        }
    }

    #[test]
    fn first_team_member_moves_status_later_ones_do_not() {
        let h = harness();
        let opp = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        h.service.assign_leader(opp.id, "leader").unwrap();

        h.service.add_team_member(opp.id, member("member1")).unwrap();
        assert_eq!(h.service.get(opp.id).unwrap().status, Status::TeamsUpdated);

        h.service.add_team_member(opp.id, member("member2")).unwrap();
        let opp = h.service.get(opp.id).unwrap();
        assert_eq!(opp.status, Status::TeamsUpdated);
        assert_eq!(opp.team_members.len(), 2);
        assert_eq!(h.notifier.last().recipients, vec!["member2@example.com"]);
    }

    #[test]
    fn team_member_before_leader_is_rejected() {
        let h = harness();
        let opp = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        let err = h.service.add_team_member(opp.id, member("member1")).unwrap_err();
        assert!(matches!(err, KaizenError::InvalidTransition { .. }));
        assert!(h.service.get(opp.id).unwrap().team_members.is_empty());
    }

    #[test]
    fn duplicate_team_member_is_rejected() {
        let h = harness();
        let opp = staffed(&h);
        let err = h.service.add_team_member(opp.id, member("member1")).unwrap_err();
        assert!(matches!(err, KaizenError::DuplicateTeamMember(_)));

        let second = h.service.add_team_member(opp.id, member("member2")).unwrap();
        let err = h
            .service
            .update_team_member(
                opp.id,
                second.id,
                TeamMemberUpdate {
                    employee_id: Some("member1".into()),
                    role: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, KaizenError::DuplicateTeamMember(_)));
    }

    #[test]
    fn team_member_role_can_change() {
        let h = harness();
        let opp = staffed(&h);
        let entry = opp.team_members.iter().next().unwrap().id;
        let updated = h
            .service
            .update_team_member(
                opp.id,
                entry,
                TeamMemberUpdate {
                    employee_id: None,
                    role: Some(TeamMemberRole::ProjectMentor),
                },
            )
            .unwrap();
        assert_eq!(updated.role, TeamMemberRole::ProjectMentor);
        assert_eq!(updated.employee.id, "member1");
    }

    #[test]
    fn action_plans_are_addressed_by_id() {
        let h = harness();
        let opp = staffed(&h);
        let plan = h
            .service
            .add_action_plan(
                opp.id,
                NewActionPlan {
                    action: "Audit die cooling".into(),
                    target_date: Utc::now() + Duration::days(14),
                },
            )
            .unwrap();
        assert_ne!(plan.id, Uuid::nil());

        let updated: ActionPlan = h
            .service
            .update_entry(
                opp.id,
                plan.id,
                ActionPlanUpdate {
                    status: Some(ActionPlanStatus::Completed),
                    findings: Some("two channels blocked".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, ActionPlanStatus::Completed);
        assert_eq!(updated.action, "Audit die cooling");

        let fetched: ActionPlan = h.service.entry(opp.id, plan.id).unwrap();
        assert_eq!(fetched, updated);

        let (owner, located) = h.service.locate_entry::<ActionPlan>(plan.id).unwrap();
        assert_eq!(owner.id, opp.id);
        assert_eq!(located.id, plan.id);
    }

    #[test]
    fn missing_entry_fails_and_changes_nothing() {
        let h = harness();
        let opp = staffed(&h);
        let before = h.service.get(opp.id).unwrap();

        let err = h
            .service
            .update_entry::<Schedule, _>(opp.id, Uuid::new_v4(), ScheduleUpdate::default())
            .unwrap_err();
        assert!(matches!(err, KaizenError::EntryNotFound { .. }));
        let err = h
            .service
            .remove_entry::<TeamMember>(opp.id, Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, KaizenError::EntryNotFound { .. }));

        assert_eq!(h.service.get(opp.id).unwrap().version, before.version);
    }

    #[test]
    fn schedules_reject_inverted_dates() {
        let h = harness();
        let opp = staffed(&h);
        let now = Utc::now();
        let err = h
            .service
            .add_schedule(
                opp.id,
                NewSchedule {
                    phase: "Define".into(),
                    planned_start_date: now,
                    planned_end_date: now - Duration::days(1),
                },
            )
            .unwrap_err();
        assert!(matches!(err, KaizenError::Validation(_)));
    }

    #[test]
    fn savings_approval_is_one_way() {
        let h = harness();
        let opp = staffed(&h);
        let jan = h.service.add_monthly_savings(opp.id, month("January")).unwrap();
        assert!(!jan.is_approved);

        let err = h
            .service
            .approve_monthly_savings(opp.id, jan.id, "leader", None)
            .unwrap_err();
        assert!(matches!(err, KaizenError::Unauthorized(_)));

        let approved = h
            .service
            .approve_monthly_savings(opp.id, jan.id, "cs1", Some("18500".into()))
            .unwrap();
        assert!(approved.is_approved);
        assert_eq!(approved.actual.as_deref(), Some("18500"));
        let note = h.notifier.last();
        assert_eq!(note.template, "savings_approved");
        assert_eq!(note.recipients, vec!["admin@example.com"]);

        assert!(matches!(
            h.service.approve_monthly_savings(opp.id, jan.id, "admin", None),
            Err(KaizenError::AlreadyApproved(_))
        ));
        assert!(matches!(
            h.service.update_monthly_savings(
                opp.id,
                jan.id,
                MonthlySavingsUpdate {
                    savings: Some("1".into()),
                    ..Default::default()
                }
            ),
            Err(KaizenError::AlreadyApproved(_))
        ));
        assert!(matches!(
            h.service.remove_monthly_savings(opp.id, jan.id),
            Err(KaizenError::AlreadyApproved(_))
        ));
    }

    #[test]
    fn unapproved_savings_can_be_edited_and_removed() {
        let h = harness();
        let opp = staffed(&h);
        let feb = h.service.add_monthly_savings(opp.id, month("February")).unwrap();
        let edited = h
            .service
            .update_monthly_savings(
                opp.id,
                feb.id,
                MonthlySavingsUpdate {
                    savings: Some("21000".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(edited.savings, "21000");
        assert!(!edited.is_approved);

        h.service.remove_monthly_savings(opp.id, feb.id).unwrap();
        assert!(h
            .service
            .entries::<MonthlySavings>(opp.id)
            .unwrap()
            .is_empty());
    }
}
