//! Per-phase technical data: Define, SSV tools, Measure/Analyze, Improve,
//! Control and the project closure record.
//!
//! Each phase is an optional singleton on the opportunity, created on first
//! submission. Submissions replace the whole phase but keep any stored
//! document path the new payload does not mention. Document uploads are a
//! narrower write that only touches the path.

use crate::collection::{Collection, Entry, Patch};
use crate::error::{KaizenError, Result};
use crate::files::UploadCategory;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A phase singleton stored on the opportunity.
pub trait PhaseRecord: Sized {
    const NAME: &'static str;

    /// Copy stored document paths (and other carried fields) from the value
    /// being replaced wherever `self` leaves them unset.
    fn carry_forward(&mut self, prior: &Self);
}

/// Install `next` into `slot`, carrying forward from any prior value.
pub fn replace_phase<P: PhaseRecord>(slot: &mut Option<P>, mut next: P) -> &mut P {
    if let Some(prior) = slot.as_ref() {
        next.carry_forward(prior);
    }
    slot.insert(next)
}

pub fn started<P: PhaseRecord>(slot: &Option<P>) -> Result<&P> {
    slot.as_ref()
        .ok_or_else(|| KaizenError::PhaseNotStarted(P::NAME.to_string()))
}

pub fn started_mut<P: PhaseRecord>(slot: &mut Option<P>) -> Result<&mut P> {
    slot.as_mut()
        .ok_or_else(|| KaizenError::PhaseNotStarted(P::NAME.to_string()))
}

fn keep(field: &mut Option<String>, prior: &Option<String>) {
    if field.is_none() {
        field.clone_from(prior);
    }
}

macro_rules! set_if_some {
    ($target:expr, $patch:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = $patch.$field {
                $target.$field = value;
            }
        )*
    };
}

macro_rules! row_entry {
    ($ty:ty, $name:literal) => {
        impl Entry for $ty {
            const COLLECTION: &'static str = $name;

            fn id(&self) -> Uuid {
                self.id
            }

            fn set_id(&mut self, id: Uuid) {
                self.id = id;
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Define
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinePhase {
    pub part_no: String,
    pub baseline: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_uom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_uom: Option<String>,
    pub part_having_problem: String,
    pub part_not_having_problem: String,
    pub suspected_phenomenon: String,
    pub last_manufacturing: String,
    pub no_machines: u32,
    pub no_streams: u32,
    pub response_type: String,
    pub process_stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification: Option<String>,
    pub max_value_of_baseline: i64,
    pub min_value_of_baseline: i64,
    pub conclusion: String,
    #[serde(default)]
    pub is_concentration: bool,
    #[serde(default)]
    pub is_audited: bool,
    pub max_month: String,
    pub min_month: String,
    #[serde(default)]
    pub is_iso_plot: bool,
    #[serde(default)]
    pub is_p_chart_done: bool,
    #[serde(default)]
    pub abnormalities: bool,
    #[serde(default)]
    pub abnormalities_audited_tool_conditions: bool,
    #[serde(default)]
    pub is_audited_tool_conditions: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_win_for_abnormalities: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_win_for_tool_conditions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_kpi_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_flow_diagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_six_months_trend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_plot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concentration_chart: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_chart: Option<String>,
}

impl PhaseRecord for DefinePhase {
    const NAME: &'static str = "define_phase";

    fn carry_forward(&mut self, prior: &Self) {
        for kind in DefineDocument::all() {
            keep(kind.slot_mut(self), kind.slot(prior));
        }
    }
}

impl DefinePhase {
    pub fn validate(&self) -> Result<()> {
        if self.part_no.trim().is_empty() {
            return Err(KaizenError::Validation("part_no is required".into()));
        }
        if self.min_value_of_baseline > self.max_value_of_baseline {
            return Err(KaizenError::Validation(
                "min_value_of_baseline exceeds max_value_of_baseline".into(),
            ));
        }
        Ok(())
    }
}

/// Partial update of the define phase. Document paths are only written
/// through [`DefineDocument`] uploads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefinePhaseUpdate {
    pub part_no: Option<String>,
    pub baseline: Option<String>,
    pub target: Option<String>,
    pub baseline_uom: Option<String>,
    pub target_uom: Option<String>,
    pub part_having_problem: Option<String>,
    pub part_not_having_problem: Option<String>,
    pub suspected_phenomenon: Option<String>,
    pub last_manufacturing: Option<String>,
    pub no_machines: Option<u32>,
    pub no_streams: Option<u32>,
    pub response_type: Option<String>,
    pub process_stage: Option<String>,
    pub specification: Option<String>,
    pub max_value_of_baseline: Option<i64>,
    pub min_value_of_baseline: Option<i64>,
    pub conclusion: Option<String>,
    pub is_concentration: Option<bool>,
    pub is_audited: Option<bool>,
    pub max_month: Option<String>,
    pub min_month: Option<String>,
    pub is_iso_plot: Option<bool>,
    pub is_p_chart_done: Option<bool>,
    pub abnormalities: Option<bool>,
    pub abnormalities_audited_tool_conditions: Option<bool>,
    pub is_audited_tool_conditions: Option<bool>,
    pub quick_win_for_abnormalities: Option<String>,
    pub quick_win_for_tool_conditions: Option<String>,
}

impl Patch<DefinePhase> for DefinePhaseUpdate {
    fn apply_to(self, target: &mut DefinePhase) {
        set_if_some!(
            target,
            self,
            [
                part_no,
                baseline,
                target,
                part_having_problem,
                part_not_having_problem,
                suspected_phenomenon,
                last_manufacturing,
                no_machines,
                no_streams,
                response_type,
                process_stage,
                max_value_of_baseline,
                min_value_of_baseline,
                conclusion,
                is_concentration,
                is_audited,
                max_month,
                min_month,
                is_iso_plot,
                is_p_chart_done,
                abnormalities,
                abnormalities_audited_tool_conditions,
                is_audited_tool_conditions,
            ]
        );
        if self.baseline_uom.is_some() {
            target.baseline_uom = self.baseline_uom;
        }
        if self.target_uom.is_some() {
            target.target_uom = self.target_uom;
        }
        if self.specification.is_some() {
            target.specification = self.specification;
        }
        if self.quick_win_for_abnormalities.is_some() {
            target.quick_win_for_abnormalities = self.quick_win_for_abnormalities;
        }
        if self.quick_win_for_tool_conditions.is_some() {
            target.quick_win_for_tool_conditions = self.quick_win_for_tool_conditions;
        }
    }
}

/// The six charts and diagrams attached to the define phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefineDocument {
    DepartmentKpi,
    ProcessFlowDiagram,
    LastSixMonthsTrend,
    IsoPlot,
    ConcentrationChart,
    PChart,
}

impl DefineDocument {
    pub fn all() -> &'static [DefineDocument] {
        &[
            DefineDocument::DepartmentKpi,
            DefineDocument::ProcessFlowDiagram,
            DefineDocument::LastSixMonthsTrend,
            DefineDocument::IsoPlot,
            DefineDocument::ConcentrationChart,
            DefineDocument::PChart,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DefineDocument::DepartmentKpi => "department-kpi",
            DefineDocument::ProcessFlowDiagram => "process-flow-diagram",
            DefineDocument::LastSixMonthsTrend => "last-six-months-trend",
            DefineDocument::IsoPlot => "iso-plot",
            DefineDocument::ConcentrationChart => "concentration-chart",
            DefineDocument::PChart => "p-chart",
        }
    }

    pub fn upload_category(self) -> UploadCategory {
        match self {
            DefineDocument::DepartmentKpi => UploadCategory::DepartmentKpi,
            DefineDocument::ProcessFlowDiagram => UploadCategory::ProcessFlowDiagram,
            DefineDocument::LastSixMonthsTrend => UploadCategory::LastSixMonthsTrend,
            DefineDocument::IsoPlot => UploadCategory::IsoPlot,
            DefineDocument::ConcentrationChart => UploadCategory::ConcentrationChart,
            DefineDocument::PChart => UploadCategory::PChart,
        }
    }

    fn slot(self, phase: &DefinePhase) -> &Option<String> {
        match self {
            DefineDocument::DepartmentKpi => &phase.department_kpi_path,
            DefineDocument::ProcessFlowDiagram => &phase.process_flow_diagram,
            DefineDocument::LastSixMonthsTrend => &phase.last_six_months_trend,
            DefineDocument::IsoPlot => &phase.iso_plot,
            DefineDocument::ConcentrationChart => &phase.concentration_chart,
            DefineDocument::PChart => &phase.p_chart,
        }
    }

    fn slot_mut(self, phase: &mut DefinePhase) -> &mut Option<String> {
        match self {
            DefineDocument::DepartmentKpi => &mut phase.department_kpi_path,
            DefineDocument::ProcessFlowDiagram => &mut phase.process_flow_diagram,
            DefineDocument::LastSixMonthsTrend => &mut phase.last_six_months_trend,
            DefineDocument::IsoPlot => &mut phase.iso_plot,
            DefineDocument::ConcentrationChart => &mut phase.concentration_chart,
            DefineDocument::PChart => &mut phase.p_chart,
        }
    }

    pub fn set(self, phase: &mut DefinePhase, path: String) {
        *self.slot_mut(phase) = Some(path);
    }
}

impl std::str::FromStr for DefineDocument {
    type Err = KaizenError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().replace('_', "-");
        DefineDocument::all()
            .iter()
            .copied()
            .find(|d| d.as_str() == needle)
            .ok_or_else(|| KaizenError::Validation(format!("unknown define document '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// SSV tools
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsvToolRow {
    pub id: Uuid,
    pub suspected_source: String,
    #[serde(default)]
    pub tools: Vec<String>,
    pub type_of_ssv: String,
}

row_entry!(SsvToolRow, "ssv_tools");

#[derive(Debug, Clone, Deserialize)]
pub struct NewSsvTool {
    pub suspected_source: String,
    #[serde(default)]
    pub tools: Vec<String>,
    pub type_of_ssv: String,
}

impl From<NewSsvTool> for SsvToolRow {
    fn from(req: NewSsvTool) -> Self {
        SsvToolRow {
            id: Uuid::nil(),
            suspected_source: req.suspected_source,
            tools: req.tools,
            type_of_ssv: req.type_of_ssv,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SsvToolUpdate {
    pub suspected_source: Option<String>,
    pub tools: Option<Vec<String>>,
    pub type_of_ssv: Option<String>,
}

impl Patch<SsvToolRow> for SsvToolUpdate {
    fn apply_to(self, target: &mut SsvToolRow) {
        set_if_some!(target, self, [suspected_source, tools, type_of_ssv]);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SsvTools {
    #[serde(default)]
    pub data: Collection<SsvToolRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl PhaseRecord for SsvTools {
    const NAME: &'static str = "ssv_tools";

    fn carry_forward(&mut self, prior: &Self) {
        keep(&mut self.document, &prior.document);
    }
}

// ---------------------------------------------------------------------------
// Measure / Analyze
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureAnalysisRow {
    pub id: Uuid,
    pub suspected_source: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
    /// SSV tool row this analysis follows up on. SSV tools are optional, so
    /// rows may stand alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<Uuid>,
}

row_entry!(MeasureAnalysisRow, "measure_analysis");

#[derive(Debug, Clone, Deserialize)]
pub struct NewMeasureAnalysis {
    pub suspected_source: String,
    #[serde(default)]
    pub tools: Vec<String>,
    pub root_cause: Option<String>,
    #[serde(default)]
    pub tool_id: Option<Uuid>,
}

impl From<NewMeasureAnalysis> for MeasureAnalysisRow {
    fn from(req: NewMeasureAnalysis) -> Self {
        MeasureAnalysisRow {
            id: Uuid::nil(),
            suspected_source: req.suspected_source,
            tools: req.tools,
            root_cause: req.root_cause,
            tool_id: req.tool_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasureAnalysisUpdate {
    pub suspected_source: Option<String>,
    pub tools: Option<Vec<String>>,
    pub root_cause: Option<String>,
}

impl Patch<MeasureAnalysisRow> for MeasureAnalysisUpdate {
    fn apply_to(self, target: &mut MeasureAnalysisRow) {
        set_if_some!(target, self, [suspected_source, tools]);
        if self.root_cause.is_some() {
            target.root_cause = self.root_cause;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasureAnalysisPhase {
    #[serde(default)]
    pub data: Collection<MeasureAnalysisRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl PhaseRecord for MeasureAnalysisPhase {
    const NAME: &'static str = "measure_analysis_phase";

    fn carry_forward(&mut self, prior: &Self) {
        keep(&mut self.document, &prior.document);
    }
}

// ---------------------------------------------------------------------------
// Improve
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementRow {
    pub id: Uuid,
    pub confirmed_cause: String,
    /// Measure/analyze row whose root cause this action addresses.
    pub measure_analysis_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_taken: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_of_action: Option<String>,
}

row_entry!(ImprovementRow, "improvement");

#[derive(Debug, Clone, Deserialize)]
pub struct NewImprovement {
    pub confirmed_cause: String,
    pub measure_analysis_id: Uuid,
    pub action_taken: Option<String>,
    pub type_of_action: Option<String>,
}

impl From<NewImprovement> for ImprovementRow {
    fn from(req: NewImprovement) -> Self {
        ImprovementRow {
            id: Uuid::nil(),
            confirmed_cause: req.confirmed_cause,
            measure_analysis_id: req.measure_analysis_id,
            action_taken: req.action_taken,
            type_of_action: req.type_of_action,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImprovementRowUpdate {
    pub confirmed_cause: Option<String>,
    pub action_taken: Option<String>,
    pub type_of_action: Option<String>,
}

impl Patch<ImprovementRow> for ImprovementRowUpdate {
    fn apply_to(self, target: &mut ImprovementRow) {
        set_if_some!(target, self, [confirmed_cause]);
        if self.action_taken.is_some() {
            target.action_taken = self.action_taken;
        }
        if self.type_of_action.is_some() {
            target.type_of_action = self.type_of_action;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImprovementPhase {
    #[serde(default)]
    pub data: Collection<ImprovementRow>,
    /// Whether a B-vs-C comparison was run to confirm the improvement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_b_vs_c: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl PhaseRecord for ImprovementPhase {
    const NAME: &'static str = "improvement_phase";

    fn carry_forward(&mut self, prior: &Self) {
        keep(&mut self.document, &prior.document);
        if self.is_b_vs_c.is_none() {
            self.is_b_vs_c = prior.is_b_vs_c;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImprovementUpdate {
    pub is_b_vs_c: Option<bool>,
}

impl Patch<ImprovementPhase> for ImprovementUpdate {
    fn apply_to(self, target: &mut ImprovementPhase) {
        if self.is_b_vs_c.is_some() {
            target.is_b_vs_c = self.is_b_vs_c;
        }
    }
}

// ---------------------------------------------------------------------------
// Control
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlRow {
    pub id: Uuid,
    pub confirmed_cause: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mechanism: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_tools: Option<String>,
    /// Improvement row this control sustains.
    pub improvement_id: Uuid,
}

row_entry!(ControlRow, "control");

#[derive(Debug, Clone, Deserialize)]
pub struct NewControl {
    pub confirmed_cause: String,
    pub mechanism: Option<String>,
    pub control_tools: Option<String>,
    pub improvement_id: Uuid,
}

impl From<NewControl> for ControlRow {
    fn from(req: NewControl) -> Self {
        ControlRow {
            id: Uuid::nil(),
            confirmed_cause: req.confirmed_cause,
            mechanism: req.mechanism,
            control_tools: req.control_tools,
            improvement_id: req.improvement_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlRowUpdate {
    pub confirmed_cause: Option<String>,
    pub mechanism: Option<String>,
    pub control_tools: Option<String>,
}

impl Patch<ControlRow> for ControlRowUpdate {
    fn apply_to(self, target: &mut ControlRow) {
        set_if_some!(target, self, [confirmed_cause]);
        if self.mechanism.is_some() {
            target.mechanism = self.mechanism;
        }
        if self.control_tools.is_some() {
            target.control_tools = self.control_tools;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub baseline: String,
    pub target: String,
    pub actual: String,
    pub uom: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCost {
    pub estimated: i64,
    pub actual: i64,
    pub uom: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlPhase {
    #[serde(default)]
    pub data: Collection<ControlRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_response: Option<ControlResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_cost: Option<ControlCost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl PhaseRecord for ControlPhase {
    const NAME: &'static str = "control_phase";

    fn carry_forward(&mut self, prior: &Self) {
        keep(&mut self.document, &prior.document);
        if self.control_response.is_none() {
            self.control_response.clone_from(&prior.control_response);
        }
        if self.control_cost.is_none() {
            self.control_cost.clone_from(&prior.control_cost);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlUpdate {
    pub control_response: Option<ControlResponse>,
    pub control_cost: Option<ControlCost>,
}

impl Patch<ControlPhase> for ControlUpdate {
    fn apply_to(self, target: &mut ControlPhase) {
        if self.control_response.is_some() {
            target.control_response = self.control_response;
        }
        if self.control_cost.is_some() {
            target.control_cost = self.control_cost;
        }
    }
}

// ---------------------------------------------------------------------------
// Project closure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectClosure {
    #[serde(default)]
    pub suspected_cause: Vec<String>,
    #[serde(default)]
    pub pin_pointed_root_cause: Vec<String>,
    #[serde(default)]
    pub actions_implemented: Vec<String>,
    #[serde(default)]
    pub tools_used: Vec<String>,
    pub tangible_benefits: String,
    pub intangible_benefits: String,
    pub horizontal_deployment: String,
    pub standardization: String,
    pub estimated_savings: String,
    pub success_rate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closure_document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_improvement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_improvement: Option<String>,
}

impl PhaseRecord for ProjectClosure {
    const NAME: &'static str = "project_closure";

    fn carry_forward(&mut self, prior: &Self) {
        for kind in ClosureDocument::all() {
            keep(kind.slot_mut(self), kind.slot(prior));
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectClosureUpdate {
    pub suspected_cause: Option<Vec<String>>,
    pub pin_pointed_root_cause: Option<Vec<String>>,
    pub actions_implemented: Option<Vec<String>>,
    pub tools_used: Option<Vec<String>>,
    pub tangible_benefits: Option<String>,
    pub intangible_benefits: Option<String>,
    pub horizontal_deployment: Option<String>,
    pub standardization: Option<String>,
    pub estimated_savings: Option<String>,
    pub success_rate: Option<String>,
}

impl Patch<ProjectClosure> for ProjectClosureUpdate {
    fn apply_to(self, target: &mut ProjectClosure) {
        set_if_some!(
            target,
            self,
            [
                suspected_cause,
                pin_pointed_root_cause,
                actions_implemented,
                tools_used,
                tangible_benefits,
                intangible_benefits,
                horizontal_deployment,
                standardization,
                estimated_savings,
                success_rate,
            ]
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClosureDocument {
    Closure,
    BeforeImprovement,
    AfterImprovement,
}

impl ClosureDocument {
    pub fn all() -> &'static [ClosureDocument] {
        &[
            ClosureDocument::Closure,
            ClosureDocument::BeforeImprovement,
            ClosureDocument::AfterImprovement,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClosureDocument::Closure => "closure",
            ClosureDocument::BeforeImprovement => "before-improvement",
            ClosureDocument::AfterImprovement => "after-improvement",
        }
    }

    fn slot(self, closure: &ProjectClosure) -> &Option<String> {
        match self {
            ClosureDocument::Closure => &closure.closure_document,
            ClosureDocument::BeforeImprovement => &closure.before_improvement,
            ClosureDocument::AfterImprovement => &closure.after_improvement,
        }
    }

    fn slot_mut(self, closure: &mut ProjectClosure) -> &mut Option<String> {
        match self {
            ClosureDocument::Closure => &mut closure.closure_document,
            ClosureDocument::BeforeImprovement => &mut closure.before_improvement,
            ClosureDocument::AfterImprovement => &mut closure.after_improvement,
        }
    }

    pub fn set(self, closure: &mut ProjectClosure, path: String) {
        *self.slot_mut(closure) = Some(path);
    }
}

impl std::str::FromStr for ClosureDocument {
    type Err = KaizenError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().replace('_', "-");
        ClosureDocument::all()
            .iter()
            .copied()
            .find(|d| d.as_str() == needle)
            .ok_or_else(|| KaizenError::Validation(format!("unknown closure document '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
