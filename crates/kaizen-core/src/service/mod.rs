//! `OpportunityService` is the single authority that loads, mutates and saves
//! the opportunity aggregate.
//!
//! Every write is a closure run by [`OpportunityService::mutate`]: load the
//! current document, apply the change in memory, save with a version check.
//! When another writer got there first the closure is replayed against the
//! fresh copy, so mutation closures must be repeatable and side-effect free.
//! Notifications go out only after the save has committed.

mod entries;
mod phases;

pub use phases::{ControlSubmission, ImprovementSubmission};

use std::path::Path;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::approval::{ApprovalStep, Approvals};
use crate::collection::Collection;
use crate::config::Config;
use crate::db::OpportunityDb;
use crate::directory::{Directory, Employee, EmployeeDirectory, PlantDirectory};
use crate::error::{KaizenError, Result};
use crate::files::{FileStore, LocalFileStore, UploadCategory};
use crate::identifier::SequenceScope;
use crate::notify::{Notification, Notifier};
use crate::opportunity::{Embedded, NewOpportunity, Opportunity, OpportunityUpdate};
use crate::paths;
use crate::query::{OpportunityFilter, Page};
use crate::transition::{self, LifecycleEvent};
use crate::types::{Role, Status};

/// External systems the service depends on.
pub struct Collaborators {
    pub employees: Arc<dyn EmployeeDirectory>,
    pub plants: Arc<dyn PlantDirectory>,
    pub files: Arc<dyn FileStore>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct OpportunityService {
    db: Arc<OpportunityDb>,
    employees: Arc<dyn EmployeeDirectory>,
    plants: Arc<dyn PlantDirectory>,
    files: Arc<dyn FileStore>,
    notifier: Arc<dyn Notifier>,
    flagship: String,
    max_retries: u32,
    notifications_enabled: bool,
    subject_prefix: String,
}

impl OpportunityService {
    pub fn new(db: Arc<OpportunityDb>, with: Collaborators, config: &Config) -> Self {
        Self {
            db,
            employees: with.employees,
            plants: with.plants,
            files: with.files,
            notifier: with.notifier,
            flagship: config.flagship_category.clone(),
            max_retries: config.max_save_retries,
            notifications_enabled: config.notifications.enabled,
            subject_prefix: config.notifications.subject_prefix.clone(),
        }
    }

    /// Wire the service to an initialized project root: its config, its
    /// YAML directory, its database and its upload folder.
    pub fn open(root: &Path, notifier: Arc<dyn Notifier>) -> Result<Self> {
        paths::require_initialized(root)?;
        let config = Config::load(root)?;
        let directory = Arc::new(Directory::load(root)?);
        let db = Arc::new(OpportunityDb::open(&paths::db_path(root))?);
        Ok(Self::new(
            db,
            Collaborators {
                employees: directory.clone(),
                plants: directory,
                files: Arc::new(LocalFileStore::new(root)),
                notifier,
            },
            &config,
        ))
    }

    // -----------------------------------------------------------------------
    // Core plumbing
    // -----------------------------------------------------------------------

    /// Load, apply `f`, save. Replays `f` on a fresh copy when the save loses
    /// a race, up to the configured retry limit.
    pub(crate) fn mutate<T, F>(&self, id: Uuid, mut f: F) -> Result<(T, Opportunity)>
    where
        F: FnMut(&mut Opportunity) -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            let mut opp = self.db.load(id)?;
            let out = f(&mut opp)?;
            match self.db.save(&opp) {
                Ok(saved) => return Ok((out, saved)),
                Err(KaizenError::VersionConflict(_)) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(%id, attempt, "version conflict, replaying mutation");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run `event` through the state machine and record the new status.
    pub(crate) fn advance(&self, opp: &mut Opportunity, event: LifecycleEvent) -> Result<()> {
        let flagship = transition::is_flagship(&opp.category, &self.flagship);
        let next = transition::next_status(opp.status, flagship, &event)?;
        if next != opp.status {
            tracing::info!(
                code = %opp.opportunity_id,
                from = %opp.status,
                to = %next,
                %event,
                "status changed"
            );
            opp.status = next;
        }
        Ok(())
    }

    pub(crate) fn notify(&self, mut notification: Notification) {
        if !self.notifications_enabled || notification.recipients.is_empty() {
            return;
        }
        if !self.subject_prefix.is_empty() {
            notification.subject = format!("{} {}", self.subject_prefix, notification.subject);
        }
        self.notifier.dispatch(notification);
    }

    /// Lookup failures while routing a notification are logged, never raised.
    pub(crate) fn admin_emails(&self) -> Vec<String> {
        match self.employees.administrators() {
            Ok(admins) => admins.into_iter().map(|a| a.email).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "could not resolve administrators for notification");
                Vec::new()
            }
        }
    }

    pub(crate) fn employee_email(&self, id: &str) -> Option<String> {
        match self.employees.employee(id) {
            Ok(e) => Some(e.email),
            Err(e) => {
                tracing::warn!(employee = id, error = %e, "could not resolve notification recipient");
                None
            }
        }
    }

    pub(crate) fn employee(&self, id: &str) -> Result<Employee> {
        self.employees.employee(id)
    }

    fn require_admin(&self, actor_id: &str) -> Result<Employee> {
        let actor = self.employees.employee(actor_id)?;
        if actor.role != Role::Admin {
            return Err(KaizenError::Unauthorized(format!(
                "{} is not an administrator",
                actor.employee_code
            )));
        }
        Ok(actor)
    }

    // -----------------------------------------------------------------------
    // Create / read
    // -----------------------------------------------------------------------

    pub fn create(&self, req: NewOpportunity, created_by: &str) -> Result<Opportunity> {
        self.create_for_year(req, created_by, Utc::now().year())
    }

    /// Create an opportunity whose code is drawn from `year`'s sequence.
    pub fn create_for_year(
        &self,
        req: NewOpportunity,
        created_by: &str,
        year: i32,
    ) -> Result<Opportunity> {
        req.validate()?;
        let plant = self.plants.plant(req.plant.trim())?;
        let creator = self.employees.employee(created_by)?;
        let status = transition::initial_status(&req.category, &self.flagship);
        let scope = SequenceScope::new(&plant.name, &req.category, year);

        let opp = self.db.create_with(&scope, |code| {
            let now = Utc::now();
            Ok(Opportunity {
                id: Uuid::new_v4(),
                opportunity_id: code,
                version: 0,
                company: req.company.trim().to_string(),
                department: req.department.trim().to_string(),
                business_unit: req.business_unit.trim().to_string(),
                plant: plant.to_ref(),
                category: req.category.trim().to_string(),
                sub_category: req.sub_category,
                statement: req.statement,
                baseline: req.baseline,
                expected_savings: req.expected_savings,
                estimated_savings: req.estimated_savings.unwrap_or_default(),
                savings_type: req.savings_type,
                project_type: req.project_type,
                project_nature: req.project_nature,
                internal_customer_impact: req.internal_customer_impact,
                external_customer_impact: req.external_customer_impact,
                data_analysis: req.data_analysis,
                cross_ratio: req.cross_ratio,
                status,
                project_score: req.project_score.unwrap_or_default(),
                project_impact: req.project_impact,
                approvals: Approvals::default(),
                remarks: None,
                opportunity_year: scope.opportunity_year.clone(),
                created_by: creator.to_ref(),
                project_leader: None,
                action_plan: Collection::new(),
                team_members: Collection::new(),
                schedules: Collection::new(),
                define_phase: None,
                ssv_tools: None,
                measure_analysis_phase: None,
                improvement_phase: None,
                control_phase: None,
                project_closure: None,
                monthly_savings: Collection::new(),
                file: Vec::new(),
                a3_file: req.a3_file,
                start_date: req.start_date,
                end_date: req.end_date,
                created_at: now,
                updated_at: now,
            })
        })?;

        tracing::info!(code = %opp.opportunity_id, status = %opp.status, "opportunity created");
        let mut note = Notification::new(
            "opportunity_created",
            format!("New opportunity {}", opp.opportunity_id),
        )
        .with_context(serde_json::json!({
            "opportunity_id": opp.opportunity_id,
            "statement": opp.statement,
            "plant": opp.plant.name,
            "created_by": opp.created_by.name,
        }));
        for email in self.admin_emails() {
            note = note.to(&email);
        }
        self.notify(note);
        Ok(opp)
    }

    pub fn get(&self, id: Uuid) -> Result<Opportunity> {
        self.db.load(id)
    }

    pub fn get_by_code(&self, code: &str) -> Result<Opportunity> {
        self.db.load_by_code(code.trim())
    }

    /// All opportunities, newest first, one page at a time.
    pub fn list(&self, page: usize, page_size: usize) -> Result<Page<Opportunity>> {
        self.query(&OpportunityFilter::default(), page, page_size)
    }

    pub fn query(
        &self,
        filter: &OpportunityFilter,
        page: usize,
        page_size: usize,
    ) -> Result<Page<Opportunity>> {
        Page::paginate(self.export(filter)?, page, page_size)
    }

    /// Every opportunity matching `filter`, newest first, unpaginated.
    pub fn export(&self, filter: &OpportunityFilter) -> Result<Vec<Opportunity>> {
        let mut all = self.db.list_all()?;
        all.retain(|o| filter.matches(o));
        all.reverse();
        Ok(all)
    }

    /// Find the opportunity holding the entry `entry_id` when only the entry
    /// id is known.
    pub fn locate_entry<T: Embedded>(&self, entry_id: Uuid) -> Result<(Opportunity, T)> {
        for opp in self.db.list_all()? {
            let found = T::list(&opp).and_then(|list| list.get(entry_id)).cloned();
            if let Some(entry) = found {
                return Ok((opp, entry));
            }
        }
        Err(KaizenError::entry_not_found(T::COLLECTION, entry_id))
    }

    // -----------------------------------------------------------------------
    // Update / delete
    // -----------------------------------------------------------------------

    /// Update descriptive fields. The first update that changes something
    /// after leader assignment moves the opportunity to "Details Updated".
    pub fn update(&self, id: Uuid, req: OpportunityUpdate) -> Result<Opportunity> {
        let plant = match req.plant.as_deref() {
            Some(plant_id) => Some(self.plants.plant(plant_id.trim())?.to_ref()),
            None => None,
        };
        let (_, saved) = self.mutate(id, |opp| {
            let mut changed = req.clone().apply(opp)?;
            if let Some(plant) = &plant {
                if opp.plant.id != plant.id {
                    opp.plant = plant.clone();
                    changed = true;
                }
            }
            if changed && opp.status == Status::ProjectAssigned {
                self.advance(opp, LifecycleEvent::DetailsUpdated)?;
            }
            Ok(())
        })?;
        Ok(saved)
    }

    /// Administrative removal of the whole aggregate. Its code is never
    /// reissued.
    pub fn delete(&self, id: Uuid, actor_id: &str) -> Result<Opportunity> {
        let actor = self.require_admin(actor_id)?;
        let removed = self.db.delete(id)?;
        tracing::info!(
            code = %removed.opportunity_id,
            by = %actor.employee_code,
            "opportunity deleted"
        );
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Workflow
    // -----------------------------------------------------------------------

    pub fn assign_leader(&self, id: Uuid, employee_id: &str) -> Result<Opportunity> {
        let leader = self.employees.employee(employee_id)?;
        if !leader.is_active {
            return Err(KaizenError::Validation(format!(
                "employee {} is inactive",
                leader.employee_code
            )));
        }
        let leader_ref = leader.to_ref();
        let (_, saved) = self.mutate(id, |opp| {
            self.advance(opp, LifecycleEvent::LeaderAssigned)?;
            opp.project_leader = Some(leader_ref.clone());
            Ok(())
        })?;

        self.notify(
            Notification::new(
                "leader_assigned",
                format!("You lead opportunity {}", saved.opportunity_id),
            )
            .to(&leader.email)
            .to(&saved.created_by.email)
            .with_context(serde_json::json!({
                "opportunity_id": saved.opportunity_id,
                "statement": saved.statement,
                "leader": leader.name,
            })),
        );
        Ok(saved)
    }

    /// Grant the approval step that `claimed_role` owns.
    ///
    /// Checks run in order: the employee must hold the claimed role, the CI
    /// head must belong to the opportunity's plant, the step must not have
    /// been granted already, and the opportunity must be waiting on it.
    pub fn approve(&self, id: Uuid, employee_id: &str, claimed_role: Role) -> Result<Opportunity> {
        let approver = self.employees.employee(employee_id)?;
        if approver.role != claimed_role {
            return Err(KaizenError::Unauthorized(format!(
                "{} does not hold role {claimed_role}",
                approver.employee_code
            )));
        }
        let step = ApprovalStep::for_role(claimed_role).ok_or_else(|| {
            KaizenError::Validation(format!(
                "role {claimed_role} is not part of the approval chain"
            ))
        })?;

        let (plant, saved) = self.mutate(id, |opp| {
            let plant = self.plants.plant(&opp.plant.id)?;
            if step.is_plant_bound()
                && !approver.works_at(&plant)
                && plant.roles.holder(step.required_role()) != Some(approver.id.as_str())
            {
                return Err(KaizenError::Unauthorized(format!(
                    "{} is not the {} of plant {}",
                    approver.employee_code,
                    step.label(),
                    plant.name
                )));
            }
            if opp.approvals.is_granted(step) {
                return Err(KaizenError::AlreadyApproved(format!(
                    "{} approval on {}",
                    step.label(),
                    opp.opportunity_id
                )));
            }
            self.advance(opp, LifecycleEvent::Approved(step))?;
            opp.approvals.grant(step);
            Ok(plant)
        })?;

        tracing::info!(
            code = %saved.opportunity_id,
            step = %step,
            approver = %approver.employee_code,
            "approval granted"
        );

        let mut note = match step.next() {
            Some(next) => {
                let mut note = Notification::new(
                    "approval_request",
                    format!(
                        "{} approval needed for {}",
                        next.label(),
                        saved.opportunity_id
                    ),
                );
                match plant.roles.holder(next.required_role()) {
                    Some(holder) => {
                        if let Some(email) = self.employee_email(holder) {
                            note = note.to(&email);
                        }
                    }
                    None => tracing::warn!(
                        plant = %plant.name,
                        role = %next,
                        "plant has no employee in the next approval slot"
                    ),
                }
                note
            }
            None => Notification::new(
                "opportunity_completed",
                format!("Opportunity {} completed", saved.opportunity_id),
            )
            .to(&saved.created_by.email),
        };
        if let Some(leader) = &saved.project_leader {
            note = note.to(&leader.email);
        }
        for email in self.admin_emails() {
            note = note.to(&email);
        }
        self.notify(note.with_context(serde_json::json!({
            "opportunity_id": saved.opportunity_id,
            "approved_step": step.label(),
            "approved_by": approver.name,
            "status": saved.status,
        })));
        Ok(saved)
    }

    /// Administrative withdrawal. Allowed from any open status.
    pub fn revoke(&self, id: Uuid, actor_id: &str) -> Result<Opportunity> {
        self.close_administratively(id, actor_id, LifecycleEvent::Revoked)
    }

    /// Administrative expiry. Allowed from any open status.
    pub fn expire(&self, id: Uuid, actor_id: &str) -> Result<Opportunity> {
        self.close_administratively(id, actor_id, LifecycleEvent::Expired)
    }

    fn close_administratively(
        &self,
        id: Uuid,
        actor_id: &str,
        event: LifecycleEvent,
    ) -> Result<Opportunity> {
        let actor = self.require_admin(actor_id)?;
        let (_, saved) = self.mutate(id, |opp| self.advance(opp, event))?;

        let mut note = Notification::new(
            "opportunity_closed",
            format!("Opportunity {} is now {}", saved.opportunity_id, saved.status),
        )
        .to(&saved.created_by.email)
        .with_context(serde_json::json!({
            "opportunity_id": saved.opportunity_id,
            "status": saved.status,
            "by": actor.name,
        }));
        if let Some(leader) = &saved.project_leader {
            note = note.to(&leader.email);
        }
        self.notify(note);
        Ok(saved)
    }

    // -----------------------------------------------------------------------
    // Opportunity-level files
    // -----------------------------------------------------------------------

    /// Store an upload and append its path to the opportunity's file list.
    pub fn attach_file(&self, id: Uuid, data: &[u8], filename: &str) -> Result<Opportunity> {
        self.db.load(id)?;
        self.with_upload(data, UploadCategory::Opportunity, filename, |stored| {
            let (_, saved) = self.mutate(id, |opp| {
                opp.file.push(stored.to_string());
                Ok(())
            })?;
            Ok(saved)
        })
    }

    /// Store an upload as the opportunity's A3 summary, replacing any prior one.
    pub fn set_a3_file(&self, id: Uuid, data: &[u8], filename: &str) -> Result<Opportunity> {
        self.db.load(id)?;
        self.with_upload(data, UploadCategory::Opportunity, filename, |stored| {
            let (_, saved) = self.mutate(id, |opp| {
                opp.a3_file = Some(stored.to_string());
                Ok(())
            })?;
            Ok(saved)
        })
    }

    /// Store an upload and hand its path to `record`. When recording fails
    /// the stored file is deleted again.
    pub(crate) fn with_upload<T>(
        &self,
        data: &[u8],
        category: UploadCategory,
        filename: &str,
        record: impl FnOnce(&str) -> Result<T>,
    ) -> Result<T> {
        let stored = self.files.save(data, category, filename)?;
        record(&stored).inspect_err(|_| {
            if let Err(e) = self.files.remove(&stored) {
                tracing::warn!(path = %stored, error = %e, "could not remove orphaned upload");
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::directory::{Plant, PlantRoles};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};
    use tempfile::TempDir;

    /// Keeps every dispatched notification for assertions. A broken one
    /// fails every delivery and keeps nothing.
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub sent: Mutex<Vec<Notification>>,
        pub failed: AtomicUsize,
        broken: bool,
    }

    impl RecordingNotifier {
        pub fn broken() -> Self {
            Self {
                broken: true,
                ..Default::default()
            }
        }

        pub fn failures(&self) -> usize {
            self.failed.load(Ordering::SeqCst)
        }

        pub fn templates(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.template.clone())
                .collect()
        }

        pub fn last(&self) -> Notification {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Notifier for RecordingNotifier {
        fn dispatch(&self, notification: Notification) {
            if self.broken {
                let (tx, rx) = mpsc::channel();
                drop(rx);
                if let Err(e) = tx.send(notification) {
                    tracing::warn!(template = %e.0.template, "notification delivery failed");
                    self.failed.fetch_add(1, Ordering::SeqCst);
                }
                return;
            }
            self.sent.lock().unwrap().push(notification);
        }
    }

    pub(crate) fn employee(id: &str, plant: &str, role: Role) -> Employee {
        Employee {
            id: id.to_string(),
            employee_code: format!("EMP-{id}"),
            name: format!("Employee {id}"),
            email: format!("{id}@example.com"),
            plant: plant.to_string(),
            company: "Acme".into(),
            department: "Quality".into(),
            role,
            is_active: true,
        }
    }

    pub(crate) fn directory() -> Directory {
        Directory::default()
            .with_plant(Plant {
                id: "p1".into(),
                name: "P1".into(),
                plant_code: "P001".into(),
                roles: PlantRoles {
                    ci_head: Some("ci1".into()),
                    hod: Some("hod1".into()),
                    lof: Some("lof1".into()),
                    cs_head: Some("cs1".into()),
                    ci_team: None,
                },
            })
            .with_plant(Plant {
                id: "p2".into(),
                name: "P2".into(),
                plant_code: "P002".into(),
                roles: PlantRoles::default(),
            })
            .with_employee(employee("creator", "P1", Role::Employee))
            .with_employee(employee("leader", "P1", Role::ProjectLeader))
            .with_employee(employee("member1", "P1", Role::Employee))
            .with_employee(employee("member2", "P1", Role::Employee))
            .with_employee(employee("ci1", "P1", Role::CiHead))
            .with_employee(employee("ci2", "P2", Role::CiHead))
            .with_employee(employee("hod1", "P1", Role::Hod))
            .with_employee(employee("lof1", "P1", Role::Lof))
            .with_employee(employee("cs1", "P1", Role::CsHead))
            .with_employee(employee("admin", "P1", Role::Admin))
    }

    pub(crate) struct Harness {
        pub _dir: TempDir,
        pub service: OpportunityService,
        pub notifier: Arc<RecordingNotifier>,
    }

    pub(crate) fn harness() -> Harness {
        harness_with(RecordingNotifier::default())
    }

    pub(crate) fn harness_with(notifier: RecordingNotifier) -> Harness {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(OpportunityDb::open(&dir.path().join("test.db")).unwrap());
        let directory = Arc::new(directory());
        let notifier = Arc::new(notifier);
        let service = OpportunityService::new(
            db,
            Collaborators {
                employees: directory.clone(),
                plants: directory,
                files: Arc::new(LocalFileStore::new(dir.path())),
                notifier: notifier.clone(),
            },
            &Config::default(),
        );
        Harness {
            _dir: dir,
            service,
            notifier,
        }
    }

    pub(crate) fn new_opportunity(category: &str) -> NewOpportunity {
        NewOpportunity {
            company: "Acme".into(),
            department: "Machining".into(),
            business_unit: "Brakes".into(),
            plant: "p1".into(),
            category: category.into(),
            sub_category: None,
            statement: "Reduce caliper rejection".into(),
            baseline: Some("4.2%".into()),
            expected_savings: "250000".into(),
            estimated_savings: Some(250000.0),
            savings_type: Some("Tangible".into()),
            project_type: None,
            project_nature: None,
            internal_customer_impact: None,
            external_customer_impact: None,
            data_analysis: None,
            cross_ratio: None,
            project_score: None,
            project_impact: None,
            start_date: None,
            end_date: None,
            a3_file: None,
        }
    }

    /// A flagship opportunity with a leader and one team member.
    pub(crate) fn staffed(h: &Harness) -> Opportunity {
        let opp = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        h.service.assign_leader(opp.id, "leader").unwrap();
        h.service
            .add_team_member(
                opp.id,
                crate::entries::NewTeamMember {
                    employee_id: "member1".into(),
                    role: Default::default(),
                },
            )
            .unwrap();
        h.service.get(opp.id).unwrap()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn codes_follow_plant_category_year_sequence() {
        let h = harness();
        let first = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        let second = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        assert_eq!(first.opportunity_id, "P1/BB/2025-2026/001");
        assert_eq!(second.opportunity_id, "P1/BB/2025-2026/002");
        assert_eq!(first.status, Status::OpenForAssigning);
        assert_eq!(first.opportunity_year, "2025-2026");
        assert_eq!(first.created_by.id, "creator");
    }

    #[test]
    fn non_flagship_completes_on_creation() {
        let h = harness();
        let opp = h
            .service
            .create_for_year(new_opportunity("Kaizen"), "creator", 2025)
            .unwrap();
        assert_eq!(opp.opportunity_id, "P1/KAIZEN/2025-2026/001");
        assert_eq!(opp.status, Status::OpportunityCompleted);

        let led = h.service.assign_leader(opp.id, "leader").unwrap();
        assert_eq!(led.status, Status::OpportunityCompleted);
        assert!(led.is_led_by("leader"));
    }

    #[test]
    fn create_rejects_unknown_references() {
        let h = harness();
        let mut req = new_opportunity("Black Belt");
        req.plant = "nowhere".into();
        assert!(matches!(
            h.service.create_for_year(req, "creator", 2025),
            Err(KaizenError::PlantNotFound(_))
        ));
        assert!(matches!(
            h.service
                .create_for_year(new_opportunity("Black Belt"), "ghost", 2025),
            Err(KaizenError::EmployeeNotFound(_))
        ));
    }

    #[test]
    fn creation_notifies_administrators() {
        let h = harness();
        h.service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        let note = h.notifier.last();
        assert_eq!(note.template, "opportunity_created");
        assert_eq!(note.recipients, vec!["admin@example.com"]);
        assert!(note.subject.starts_with("[CI] "));
    }

    #[test]
    fn leader_then_details_then_team() {
        let h = harness();
        let opp = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        let opp = h.service.assign_leader(opp.id, "leader").unwrap();
        assert_eq!(opp.status, Status::ProjectAssigned);

        let opp = h
            .service
            .update(
                opp.id,
                OpportunityUpdate {
                    remarks: Some("charter signed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(opp.status, Status::DetailsUpdated);
        assert_eq!(opp.remarks.as_deref(), Some("charter signed"));
        assert_eq!(opp.version, 2);
    }

    #[test]
    fn empty_update_does_not_count_as_details() {
        let h = harness();
        let opp = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        h.service.assign_leader(opp.id, "leader").unwrap();

        let same = h
            .service
            .update(opp.id, OpportunityUpdate::default())
            .unwrap();
        assert_eq!(same.status, Status::ProjectAssigned);

        let repeated = h
            .service
            .update(
                opp.id,
                OpportunityUpdate {
                    statement: Some(same.statement.clone()),
                    plant: Some("p1".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(repeated.status, Status::ProjectAssigned);
    }

    #[test]
    fn category_is_fixed_after_creation() {
        let h = harness();
        let flagship = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        let err = h
            .service
            .update(
                flagship.id,
                OpportunityUpdate {
                    category: Some("Kaizen".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, KaizenError::Validation(_)));
        let led = h.service.assign_leader(flagship.id, "leader").unwrap();
        assert_eq!(led.category, "Black Belt");
        assert_eq!(led.status, Status::ProjectAssigned);

        let kaizen = h
            .service
            .create_for_year(new_opportunity("Kaizen"), "creator", 2025)
            .unwrap();
        let err = h
            .service
            .update(
                kaizen.id,
                OpportunityUpdate {
                    category: Some("Black Belt".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, KaizenError::Validation(_)));
        let stored = h.service.get(kaizen.id).unwrap();
        assert_eq!(stored.category, "Kaizen");
        assert_eq!(stored.opportunity_id, "P1/KAIZEN/2025-2026/001");
        assert_eq!(stored.version, kaizen.version);
        let led = h.service.assign_leader(kaizen.id, "leader").unwrap();
        assert_eq!(led.status, Status::OpportunityCompleted);

        // Restating the current category is not a change.
        h.service
            .update(
                kaizen.id,
                OpportunityUpdate {
                    category: Some("kaizen".into()),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn update_can_move_plant_but_not_code() {
        let h = harness();
        let opp = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        let moved = h
            .service
            .update(
                opp.id,
                OpportunityUpdate {
                    plant: Some("p2".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(moved.plant.name, "P2");
        assert_eq!(moved.opportunity_id, opp.opportunity_id);
        assert_eq!(moved.status, Status::OpenForAssigning);
    }

    #[test]
    fn get_by_code_and_delete() {
        let h = harness();
        let opp = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        assert_eq!(h.service.get_by_code("P1/BB/2025-2026/001").unwrap().id, opp.id);
        assert!(matches!(
            h.service.delete(opp.id, "creator"),
            Err(KaizenError::Unauthorized(_))
        ));
        h.service.delete(opp.id, "admin").unwrap();
        assert!(matches!(
            h.service.get(opp.id),
            Err(KaizenError::OpportunityNotFound(_))
        ));
        let next = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        assert_eq!(next.opportunity_id, "P1/BB/2025-2026/002");
    }

    #[test]
    fn list_is_paginated_newest_first() {
        let h = harness();
        for _ in 0..3 {
            h.service
                .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
                .unwrap();
        }
        let page = h.service.list(1, 2).unwrap();
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.remaining_items, 1);
        assert_eq!(page.data[0].opportunity_id, "P1/BB/2025-2026/003");
    }

    #[test]
    fn query_filters_by_status() {
        let h = harness();
        let flagship = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        h.service
            .create_for_year(new_opportunity("Kaizen"), "creator", 2025)
            .unwrap();
        let filter = OpportunityFilter {
            status: Some(Status::OpenForAssigning),
            ..Default::default()
        };
        let page = h.service.query(&filter, 1, 10).unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.data[0].id, flagship.id);
        assert_eq!(h.service.export(&OpportunityFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn revoke_requires_admin_and_is_terminal() {
        let h = harness();
        let opp = staffed(&h);
        assert!(matches!(
            h.service.revoke(opp.id, "leader"),
            Err(KaizenError::Unauthorized(_))
        ));
        let revoked = h.service.revoke(opp.id, "admin").unwrap();
        assert_eq!(revoked.status, Status::Revoke);
        assert!(matches!(
            h.service.expire(opp.id, "admin"),
            Err(KaizenError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn files_are_stored_and_recorded() {
        let h = harness();
        let opp = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        let opp = h.service.attach_file(opp.id, b"pdf", "charter.pdf").unwrap();
        let opp = h.service.set_a3_file(opp.id, b"a3", "a3 sheet.pdf").unwrap();
        assert_eq!(opp.file.len(), 1);
        assert!(opp.file[0].starts_with("uploads/opportunity-category/"));
        assert!(opp.a3_file.as_deref().unwrap().ends_with("-a3_sheet.pdf"));
    }

    #[test]
    fn failed_record_removes_the_stored_upload() {
        let h = harness();
        let store = LocalFileStore::new(h._dir.path());
        let mut stored_at = String::new();
        let err = h
            .service
            .with_upload(b"a3", UploadCategory::Opportunity, "a3.pdf", |stored| {
                stored_at = stored.to_string();
                Err::<(), _>(KaizenError::VersionConflict("P1/BB/2025-2026/001".into()))
            })
            .unwrap_err();
        assert!(matches!(err, KaizenError::VersionConflict(_)));
        assert!(stored_at.starts_with("uploads/opportunity-category/"));
        assert!(!store.resolve(&stored_at).unwrap().exists());
    }

    #[test]
    fn upload_to_unknown_opportunity_stores_nothing() {
        let h = harness();
        let err = h
            .service
            .attach_file(Uuid::new_v4(), b"pdf", "charter.pdf")
            .unwrap_err();
        assert!(matches!(err, KaizenError::OpportunityNotFound(_)));
        let dir = LocalFileStore::new(h._dir.path())
            .resolve(UploadCategory::Opportunity.dir())
            .unwrap();
        assert!(!dir.exists() || std::fs::read_dir(dir).unwrap().next().is_none());
    }

    #[test]
    fn concurrent_mutations_are_all_kept() {
        let h = Arc::new(harness());
        let opp = h
            .service
            .create_for_year(new_opportunity("Black Belt"), "creator", 2025)
            .unwrap();
        let threads: Vec<_> = (0..4)
            .map(|i| {
                let h = h.clone();
                std::thread::spawn(move || {
                    h.service
                        .add_action_plan(
                            opp.id,
                            crate::entries::NewActionPlan {
                                action: format!("action {i}"),
                                target_date: Utc::now(),
                            },
                        )
                        .unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(h.service.get(opp.id).unwrap().action_plan.len(), 4);
    }
}
