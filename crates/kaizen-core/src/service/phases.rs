//! Phase submissions, patches and document uploads.
//!
//! Submissions replace the phase wholesale (SSV tools excepted, which append)
//! and advance the status. Patches and uploads never touch the status.

use serde::Deserialize;
use uuid::Uuid;

use super::OpportunityService;
use crate::collection::{Collection, Patch};
use crate::error::{KaizenError, Result};
use crate::files::UploadCategory;
use crate::notify::Notification;
use crate::opportunity::Opportunity;
use crate::phase::{
    replace_phase, started, started_mut, ClosureDocument, ControlCost, ControlPhase,
    ControlResponse, ControlUpdate, DefineDocument, DefinePhase, DefinePhaseUpdate,
    ImprovementPhase, ImprovementUpdate, MeasureAnalysisPhase, NewControl, NewImprovement,
    NewMeasureAnalysis, NewSsvTool, PhaseRecord, ProjectClosure, ProjectClosureUpdate, SsvTools,
};
use crate::transition::LifecycleEvent;
use crate::types::{Role, SubStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct ImprovementSubmission {
    pub rows: Vec<NewImprovement>,
    #[serde(default)]
    pub is_b_vs_c: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlSubmission {
    pub rows: Vec<NewControl>,
    #[serde(default)]
    pub control_response: Option<ControlResponse>,
    #[serde(default)]
    pub control_cost: Option<ControlCost>,
}

fn require_rows<T>(phase: &str, rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        return Err(KaizenError::Validation(format!(
            "{phase} submission needs at least one row"
        )));
    }
    Ok(())
}

fn dangling(field: &str, id: Uuid, target: &str) -> KaizenError {
    KaizenError::Validation(format!("{field} {id} does not match any {target} row"))
}

/// Build a fresh row collection, assigning ids.
fn collect_rows<T, R>(rows: &[R]) -> Result<Collection<T>>
where
    T: crate::collection::Entry + From<R>,
    R: Clone,
{
    let mut data = Collection::new();
    for row in rows {
        data.append(T::from(row.clone()))?;
    }
    Ok(data)
}

impl OpportunityService {
    fn phase<P, F>(&self, id: Uuid, slot: F) -> Result<P>
    where
        P: PhaseRecord + Clone,
        F: Fn(&Opportunity) -> &Option<P>,
    {
        let opp = self.get(id)?;
        started(slot(&opp)).cloned()
    }

    /// Store an upload and record its path on a started phase. Nothing else
    /// on the phase changes.
    fn upload_phase_document<P, S, W>(
        &self,
        id: Uuid,
        category: UploadCategory,
        data: &[u8],
        filename: &str,
        slot: S,
        write: W,
    ) -> Result<P>
    where
        P: PhaseRecord + Clone,
        S: Fn(&mut Opportunity) -> &mut Option<P>,
        W: Fn(&mut P, String),
    {
        let mut current = self.get(id)?;
        started(slot(&mut current))?;
        self.with_upload(data, category, filename, |stored| {
            let (phase, _) = self.mutate(id, |opp| {
                let phase = started_mut(slot(opp))?;
                write(phase, stored.to_string());
                Ok(phase.clone())
            })?;
            tracing::debug!(%id, phase = P::NAME, path = %stored, "phase document stored");
            Ok(phase)
        })
    }

    // -----------------------------------------------------------------------
    // Define
    // -----------------------------------------------------------------------

    pub fn submit_define(&self, id: Uuid, phase: DefinePhase) -> Result<DefinePhase> {
        phase.validate()?;
        let (stored, _) = self.mutate(id, |opp| {
            self.advance(opp, LifecycleEvent::DefineSubmitted)?;
            Ok(replace_phase(&mut opp.define_phase, phase.clone()).clone())
        })?;
        Ok(stored)
    }

    pub fn update_define(&self, id: Uuid, patch: DefinePhaseUpdate) -> Result<DefinePhase> {
        let (stored, _) = self.mutate(id, |opp| {
            let mut next = started(&opp.define_phase)?.clone();
            patch.clone().apply_to(&mut next);
            next.validate()?;
            opp.define_phase = Some(next.clone());
            Ok(next)
        })?;
        Ok(stored)
    }

    pub fn define_phase(&self, id: Uuid) -> Result<DefinePhase> {
        self.phase(id, |o| &o.define_phase)
    }

    pub fn upload_define_document(
        &self,
        id: Uuid,
        document: DefineDocument,
        data: &[u8],
        filename: &str,
    ) -> Result<DefinePhase> {
        self.upload_phase_document(
            id,
            document.upload_category(),
            data,
            filename,
            |o| &mut o.define_phase,
            |p, path| document.set(p, path),
        )
    }

    // -----------------------------------------------------------------------
    // SSV tools
    // -----------------------------------------------------------------------

    /// Append a batch of SSV tool rows, opening the list on first use.
    pub fn submit_ssv_tools(&self, id: Uuid, rows: Vec<NewSsvTool>) -> Result<SsvTools> {
        require_rows(SsvTools::NAME, &rows)?;
        let (stored, _) = self.mutate(id, |opp| {
            self.advance(opp, LifecycleEvent::SsvToolsSubmitted)?;
            let tools = opp.ssv_tools.get_or_insert_with(SsvTools::default);
            for row in &rows {
                tools.data.append(row.clone().into())?;
            }
            Ok(tools.clone())
        })?;
        Ok(stored)
    }

    pub fn ssv_tools(&self, id: Uuid) -> Result<SsvTools> {
        self.phase(id, |o| &o.ssv_tools)
    }

    pub fn upload_ssv_document(&self, id: Uuid, data: &[u8], filename: &str) -> Result<SsvTools> {
        self.upload_phase_document(
            id,
            UploadCategory::SsvTool,
            data,
            filename,
            |o| &mut o.ssv_tools,
            |p, path| p.document = Some(path),
        )
    }

    // -----------------------------------------------------------------------
    // Measure / Analyze
    // -----------------------------------------------------------------------

    pub fn submit_measure_analysis(
        &self,
        id: Uuid,
        rows: Vec<NewMeasureAnalysis>,
        sub_status: SubStatus,
    ) -> Result<MeasureAnalysisPhase> {
        require_rows(MeasureAnalysisPhase::NAME, &rows)?;
        let (stored, _) = self.mutate(id, |opp| {
            for row in &rows {
                if let Some(tool_id) = row.tool_id {
                    let known = opp
                        .ssv_tools
                        .as_ref()
                        .is_some_and(|t| t.data.contains(tool_id));
                    if !known {
                        return Err(dangling("tool_id", tool_id, "SSV tool"));
                    }
                }
            }
            self.advance(opp, LifecycleEvent::MeasureAnalyzeSubmitted(sub_status))?;
            let next = MeasureAnalysisPhase {
                data: collect_rows(&rows)?,
                document: None,
            };
            Ok(replace_phase(&mut opp.measure_analysis_phase, next).clone())
        })?;
        Ok(stored)
    }

    pub fn measure_analysis(&self, id: Uuid) -> Result<MeasureAnalysisPhase> {
        self.phase(id, |o| &o.measure_analysis_phase)
    }

    pub fn upload_measure_analysis_document(
        &self,
        id: Uuid,
        data: &[u8],
        filename: &str,
    ) -> Result<MeasureAnalysisPhase> {
        self.upload_phase_document(
            id,
            UploadCategory::MeasureAnalysis,
            data,
            filename,
            |o| &mut o.measure_analysis_phase,
            |p, path| p.document = Some(path),
        )
    }

    // -----------------------------------------------------------------------
    // Improve
    // -----------------------------------------------------------------------

    pub fn submit_improvement(
        &self,
        id: Uuid,
        req: ImprovementSubmission,
        sub_status: SubStatus,
    ) -> Result<ImprovementPhase> {
        require_rows(ImprovementPhase::NAME, &req.rows)?;
        let (stored, _) = self.mutate(id, |opp| {
            for row in &req.rows {
                let known = opp
                    .measure_analysis_phase
                    .as_ref()
                    .is_some_and(|m| m.data.contains(row.measure_analysis_id));
                if !known {
                    return Err(dangling(
                        "measure_analysis_id",
                        row.measure_analysis_id,
                        "measure/analyze",
                    ));
                }
            }
            self.advance(opp, LifecycleEvent::ImproveSubmitted(sub_status))?;
            let next = ImprovementPhase {
                data: collect_rows(&req.rows)?,
                is_b_vs_c: req.is_b_vs_c,
                document: None,
            };
            Ok(replace_phase(&mut opp.improvement_phase, next).clone())
        })?;
        Ok(stored)
    }

    pub fn update_improvement(&self, id: Uuid, patch: ImprovementUpdate) -> Result<ImprovementPhase> {
        let (stored, _) = self.mutate(id, |opp| {
            let phase = started_mut(&mut opp.improvement_phase)?;
            patch.clone().apply_to(phase);
            Ok(phase.clone())
        })?;
        Ok(stored)
    }

    pub fn improvement(&self, id: Uuid) -> Result<ImprovementPhase> {
        self.phase(id, |o| &o.improvement_phase)
    }

    pub fn upload_improvement_document(
        &self,
        id: Uuid,
        data: &[u8],
        filename: &str,
    ) -> Result<ImprovementPhase> {
        self.upload_phase_document(
            id,
            UploadCategory::Improvement,
            data,
            filename,
            |o| &mut o.improvement_phase,
            |p, path| p.document = Some(path),
        )
    }

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------

    pub fn submit_control(
        &self,
        id: Uuid,
        req: ControlSubmission,
        sub_status: SubStatus,
    ) -> Result<ControlPhase> {
        require_rows(ControlPhase::NAME, &req.rows)?;
        let (stored, _) = self.mutate(id, |opp| {
            for row in &req.rows {
                let known = opp
                    .improvement_phase
                    .as_ref()
                    .is_some_and(|i| i.data.contains(row.improvement_id));
                if !known {
                    return Err(dangling("improvement_id", row.improvement_id, "improvement"));
                }
            }
            self.advance(opp, LifecycleEvent::ControlSubmitted(sub_status))?;
            let next = ControlPhase {
                data: collect_rows(&req.rows)?,
                control_response: req.control_response.clone(),
                control_cost: req.control_cost.clone(),
                document: None,
            };
            Ok(replace_phase(&mut opp.control_phase, next).clone())
        })?;
        Ok(stored)
    }

    pub fn update_control(&self, id: Uuid, patch: ControlUpdate) -> Result<ControlPhase> {
        let (stored, _) = self.mutate(id, |opp| {
            let phase = started_mut(&mut opp.control_phase)?;
            patch.clone().apply_to(phase);
            Ok(phase.clone())
        })?;
        Ok(stored)
    }

    pub fn control(&self, id: Uuid) -> Result<ControlPhase> {
        self.phase(id, |o| &o.control_phase)
    }

    pub fn upload_control_document(
        &self,
        id: Uuid,
        data: &[u8],
        filename: &str,
    ) -> Result<ControlPhase> {
        self.upload_phase_document(
            id,
            UploadCategory::Control,
            data,
            filename,
            |o| &mut o.control_phase,
            |p, path| p.document = Some(path),
        )
    }

    // -----------------------------------------------------------------------
    // Project closure
    // -----------------------------------------------------------------------

    /// Record the closure and open the approval chain. The plant's CI head
    /// and the administrators are asked to review.
    pub fn create_closure(&self, id: Uuid, closure: ProjectClosure) -> Result<ProjectClosure> {
        let (stored, saved) = self.mutate(id, |opp| {
            self.advance(opp, LifecycleEvent::ClosureCreated)?;
            Ok(replace_phase(&mut opp.project_closure, closure.clone()).clone())
        })?;

        let mut note = Notification::new(
            "approval_request",
            format!("CI Head approval needed for {}", saved.opportunity_id),
        )
        .with_context(serde_json::json!({
            "opportunity_id": saved.opportunity_id,
            "statement": saved.statement,
            "estimated_savings": stored.estimated_savings,
        }));
        match self.plants.plant(&saved.plant.id) {
            Ok(plant) => {
                if let Some(email) = plant
                    .roles
                    .holder(Role::CiHead)
                    .and_then(|holder| self.employee_email(holder))
                {
                    note = note.to(&email);
                }
            }
            Err(e) => tracing::warn!(plant = %saved.plant.id, error = %e, "could not resolve plant for notification"),
        }
        for email in self.admin_emails() {
            note = note.to(&email);
        }
        self.notify(note);
        Ok(stored)
    }

    pub fn update_closure(&self, id: Uuid, patch: ProjectClosureUpdate) -> Result<ProjectClosure> {
        let (stored, _) = self.mutate(id, |opp| {
            let closure = started_mut(&mut opp.project_closure)?;
            patch.clone().apply_to(closure);
            Ok(closure.clone())
        })?;
        Ok(stored)
    }

    pub fn closure(&self, id: Uuid) -> Result<ProjectClosure> {
        self.phase(id, |o| &o.project_closure)
    }

    pub fn upload_closure_document(
        &self,
        id: Uuid,
        document: ClosureDocument,
        data: &[u8],
        filename: &str,
    ) -> Result<ProjectClosure> {
        self.upload_phase_document(
            id,
            UploadCategory::ProjectClosure,
            data,
            filename,
            |o| &mut o.project_closure,
            |c, path| document.set(c, path),
        )
    }
}
