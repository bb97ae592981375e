use crate::approval::Approvals;
use crate::collection::{Collection, Entry};
use crate::directory::{EmployeeRef, PlantRef};
use crate::entries::{ActionPlan, MonthlySavings, Schedule, TeamMember};
use crate::error::{KaizenError, Result};
use crate::phase::{
    ControlPhase, ControlRow, DefinePhase, ImprovementPhase, ImprovementRow, MeasureAnalysisPhase,
    MeasureAnalysisRow, PhaseRecord, ProjectClosure, SsvToolRow, SsvTools,
};
use crate::types::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

/// A continuous-improvement project and everything recorded against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Uuid,
    /// Human-readable code, e.g. `P1/BB/2025-2026/001`. Immutable.
    pub opportunity_id: String,
    /// Incremented on every successful save; guards concurrent writers.
    #[serde(default)]
    pub version: u64,

    pub company: String,
    pub department: String,
    pub business_unit: String,
    pub plant: PlantRef,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    pub statement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<String>,
    pub expected_savings: String,
    #[serde(default)]
    pub estimated_savings: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savings_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_nature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_customer_impact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_customer_impact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_ratio: Option<String>,

    pub status: Status,
    #[serde(default)]
    pub project_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_impact: Option<String>,
    #[serde(flatten)]
    pub approvals: Approvals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub opportunity_year: String,

    pub created_by: EmployeeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_leader: Option<EmployeeRef>,

    #[serde(default)]
    pub action_plan: Collection<ActionPlan>,
    #[serde(default)]
    pub team_members: Collection<TeamMember>,
    #[serde(default)]
    pub schedules: Collection<Schedule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub define_phase: Option<DefinePhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssv_tools: Option<SsvTools>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_analysis_phase: Option<MeasureAnalysisPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement_phase: Option<ImprovementPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_phase: Option<ControlPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_closure: Option<ProjectClosure>,
    #[serde(default)]
    pub monthly_savings: Collection<MonthlySavings>,

    #[serde(default)]
    pub file: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a3_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    /// Whether `employee_id` leads this opportunity.
    pub fn is_led_by(&self, employee_id: &str) -> bool {
        self.project_leader
            .as_ref()
            .is_some_and(|leader| leader.id == employee_id)
    }

    /// Lowercased text that free-text queries match against.
    pub(crate) fn search_text(&self) -> String {
        let mut text = format!(
            "{} {} {} {}",
            self.opportunity_id, self.statement, self.category, self.plant.name
        );
        if let Some(leader) = &self.project_leader {
            text.push(' ');
            text.push_str(&leader.name);
        }
        text.to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NewOpportunity {
    pub company: String,
    pub department: String,
    pub business_unit: String,
    /// Plant id, resolved through the plant directory.
    pub plant: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub statement: String,
    pub baseline: Option<String>,
    pub expected_savings: String,
    pub estimated_savings: Option<f64>,
    pub savings_type: Option<String>,
    pub project_type: Option<String>,
    pub project_nature: Option<String>,
    pub internal_customer_impact: Option<String>,
    pub external_customer_impact: Option<String>,
    pub data_analysis: Option<String>,
    pub cross_ratio: Option<String>,
    pub project_score: Option<f64>,
    pub project_impact: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub a3_file: Option<String>,
}

impl NewOpportunity {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("company", &self.company),
            ("department", &self.department),
            ("business_unit", &self.business_unit),
            ("plant", &self.plant),
            ("category", &self.category),
            ("statement", &self.statement),
        ] {
            if value.trim().is_empty() {
                return Err(KaizenError::Validation(format!("{field} is required")));
            }
        }
        check_dates(self.start_date, self.end_date)
    }
}

fn check_dates(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(KaizenError::Validation(
                "end_date is before start_date".into(),
            ));
        }
    }
    Ok(())
}

/// Partial update of an opportunity's descriptive fields. Status, approvals,
/// the code and the leader have dedicated operations and cannot be set here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpportunityUpdate {
    pub company: Option<String>,
    pub department: Option<String>,
    pub business_unit: Option<String>,
    /// Plant id; the service resolves it to a reference.
    pub plant: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub statement: Option<String>,
    pub baseline: Option<String>,
    pub expected_savings: Option<String>,
    pub estimated_savings: Option<f64>,
    pub savings_type: Option<String>,
    pub project_type: Option<String>,
    pub project_nature: Option<String>,
    pub internal_customer_impact: Option<String>,
    pub external_customer_impact: Option<String>,
    pub data_analysis: Option<String>,
    pub cross_ratio: Option<String>,
    pub project_score: Option<f64>,
    pub project_impact: Option<String>,
    pub remarks: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

fn set<T: PartialEq>(target: &mut T, value: Option<T>) -> bool {
    match value {
        Some(v) if *target != v => {
            *target = v;
            true
        }
        _ => false,
    }
}

fn set_opt<T: PartialEq>(target: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) if target.as_ref() != Some(&v) => {
            *target = Some(v);
            true
        }
        _ => false,
    }
}

impl OpportunityUpdate {
    /// Apply every field except `plant`, which needs a directory lookup.
    /// Returns whether any stored value changed.
    ///
    /// The category decides both the workflow and the code segment, so it
    /// is fixed at creation; repeating the current value is accepted.
    pub(crate) fn apply(self, opp: &mut Opportunity) -> Result<bool> {
        if let Some(category) = self.category.as_deref() {
            if !category.trim().eq_ignore_ascii_case(opp.category.trim()) {
                return Err(KaizenError::Validation(format!(
                    "category of {} is fixed at '{}'",
                    opp.opportunity_id, opp.category
                )));
            }
        }

        let mut changed = false;
        changed |= set(&mut opp.company, self.company);
        changed |= set(&mut opp.department, self.department);
        changed |= set(&mut opp.business_unit, self.business_unit);
        changed |= set(&mut opp.statement, self.statement);
        changed |= set(&mut opp.expected_savings, self.expected_savings);
        changed |= set(&mut opp.estimated_savings, self.estimated_savings);
        changed |= set(&mut opp.project_score, self.project_score);
        changed |= set_opt(&mut opp.sub_category, self.sub_category);
        changed |= set_opt(&mut opp.baseline, self.baseline);
        changed |= set_opt(&mut opp.savings_type, self.savings_type);
        changed |= set_opt(&mut opp.project_type, self.project_type);
        changed |= set_opt(&mut opp.project_nature, self.project_nature);
        changed |= set_opt(&mut opp.internal_customer_impact, self.internal_customer_impact);
        changed |= set_opt(&mut opp.external_customer_impact, self.external_customer_impact);
        changed |= set_opt(&mut opp.data_analysis, self.data_analysis);
        changed |= set_opt(&mut opp.cross_ratio, self.cross_ratio);
        changed |= set_opt(&mut opp.project_impact, self.project_impact);
        changed |= set_opt(&mut opp.remarks, self.remarks);
        changed |= set_opt(&mut opp.start_date, self.start_date);
        changed |= set_opt(&mut opp.end_date, self.end_date);

        if opp.statement.trim().is_empty() {
            return Err(KaizenError::Validation("statement cannot be blank".into()));
        }
        check_dates(opp.start_date, opp.end_date)?;
        Ok(changed)
    }
}

// ---------------------------------------------------------------------------
// Embedded
// ---------------------------------------------------------------------------

/// An entry type that lives in one of the opportunity's embedded lists.
///
/// Lists that belong to a phase only exist once that phase has been
/// submitted, so access is fallible.
pub trait Embedded: Entry {
    fn list(opp: &Opportunity) -> Option<&Collection<Self>>;
    fn list_mut(opp: &mut Opportunity) -> Result<&mut Collection<Self>>;
}

macro_rules! embedded_root {
    ($ty:ty, $field:ident) => {
        impl Embedded for $ty {
            fn list(opp: &Opportunity) -> Option<&Collection<Self>> {
                Some(&opp.$field)
            }

            fn list_mut(opp: &mut Opportunity) -> Result<&mut Collection<Self>> {
                Ok(&mut opp.$field)
            }
        }
    };
}

macro_rules! embedded_phase {
    ($ty:ty, $phase:ty, $field:ident) => {
        impl Embedded for $ty {
            fn list(opp: &Opportunity) -> Option<&Collection<Self>> {
                opp.$field.as_ref().map(|p| &p.data)
            }

            fn list_mut(opp: &mut Opportunity) -> Result<&mut Collection<Self>> {
                opp.$field
                    .as_mut()
                    .map(|p| &mut p.data)
                    .ok_or_else(|| KaizenError::PhaseNotStarted(<$phase>::NAME.to_string()))
            }
        }
    };
}

embedded_root!(ActionPlan, action_plan);
embedded_root!(Schedule, schedules);
embedded_root!(TeamMember, team_members);
embedded_root!(MonthlySavings, monthly_savings);
embedded_phase!(SsvToolRow, SsvTools, ssv_tools);
embedded_phase!(MeasureAnalysisRow, MeasureAnalysisPhase, measure_analysis_phase);
embedded_phase!(ImprovementRow, ImprovementPhase, improvement_phase);
embedded_phase!(ControlRow, ControlPhase, control_phase);

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample(category: &str, status: Status) -> Opportunity {
        let now = Utc::now();
        Opportunity {
            id: Uuid::new_v4(),
            opportunity_id: "P1/BB/2025-2026/001".into(),
            version: 0,
            company: "Acme".into(),
            department: "Machining".into(),
            business_unit: "Brakes".into(),
            plant: PlantRef {
                id: "p1".into(),
                name: "P1".into(),
                plant_code: "P001".into(),
            },
            category: category.into(),
            sub_category: None,
            statement: "Reduce caliper rejection".into(),
            baseline: None,
            expected_savings: "250000".into(),
            estimated_savings: 0.0,
            savings_type: None,
            project_type: None,
            project_nature: None,
            internal_customer_impact: None,
            external_customer_impact: None,
            data_analysis: None,
            cross_ratio: None,
            status,
            project_score: 0.0,
            project_impact: None,
            approvals: Approvals::default(),
            remarks: None,
            opportunity_year: "2025-2026".into(),
            created_by: EmployeeRef {
                id: "e1".into(),
                employee_code: "EMP-1".into(),
                name: "Asha".into(),
                email: "asha@example.com".into(),
            },
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
            a3_file: None,
            start_date: None,
            end_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn json_keeps_flat_approval_flags() {
        let opp = sample("Black Belt", Status::OpenForAssigning);
        let json = serde_json::to_value(&opp).unwrap();
        assert_eq!(json["approved_by_ci_head"], false);
        assert_eq!(json["status"], "Open for Assigning");
        let back: Opportunity = serde_json::from_value(json).unwrap();
        assert_eq!(back, opp);
    }

    #[test]
    fn update_leaves_unset_fields() {
        let mut opp = sample("Black Belt", Status::OpenForAssigning);
        OpportunityUpdate {
            remarks: Some("kick-off held".into()),
            ..Default::default()
        }
        .apply(&mut opp)
        .unwrap();
        assert_eq!(opp.remarks.as_deref(), Some("kick-off held"));
        assert_eq!(opp.statement, "Reduce caliper rejection");
    }

    #[test]
    fn update_reports_whether_anything_changed() {
        let mut opp = sample("Black Belt", Status::ProjectAssigned);
        assert!(!OpportunityUpdate::default().apply(&mut opp).unwrap());
        let same = OpportunityUpdate {
            company: Some("Acme".into()),
            category: Some("Black Belt".into()),
            ..Default::default()
        };
        assert!(!same.apply(&mut opp).unwrap());
        let changed = OpportunityUpdate {
            baseline: Some("3.1%".into()),
            ..Default::default()
        };
        assert!(changed.apply(&mut opp).unwrap());
    }

    #[test]
    fn update_rejects_category_change() {
        let mut opp = sample("Black Belt", Status::OpenForAssigning);
        let err = OpportunityUpdate {
            category: Some("Kaizen".into()),
            remarks: Some("switch".into()),
            ..Default::default()
        }
        .apply(&mut opp)
        .unwrap_err();
        assert!(matches!(err, KaizenError::Validation(_)));
        assert_eq!(opp.category, "Black Belt");
        assert!(opp.remarks.is_none());
    }

    #[test]
    fn update_rejects_blank_statement() {
        let mut opp = sample("Black Belt", Status::OpenForAssigning);
        let err = OpportunityUpdate {
            statement: Some("  ".into()),
            ..Default::default()
        }
        .apply(&mut opp)
        .unwrap_err();
        assert!(matches!(err, KaizenError::Validation(_)));
    }

    #[test]
    fn phase_rows_need_started_phase() {
        let mut opp = sample("Black Belt", Status::TeamsUpdated);
        assert!(SsvToolRow::list(&opp).is_none());
        assert!(matches!(
            ControlRow::list_mut(&mut opp),
            Err(KaizenError::PhaseNotStarted(_))
        ));
        assert!(ActionPlan::list_mut(&mut opp).is_ok());
    }
}
