use crate::error::{KaizenError, Result};
use crate::opportunity::Opportunity;
use crate::types::Status;
use serde::{Deserialize, Serialize};

/// One page of results plus the counters list views need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total_items: usize,
    pub total_pages: usize,
    pub page: usize,
    pub page_size: usize,
    pub remaining_items: usize,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// Slice `items` into page `page` (1-based) of `page_size`.
    pub fn paginate(items: Vec<T>, page: usize, page_size: usize) -> Result<Self> {
        if page == 0 || page_size == 0 {
            return Err(KaizenError::Validation(
                "page and page_size must be at least 1".into(),
            ));
        }
        let total_items = items.len();
        let total_pages = total_items.div_ceil(page_size);
        let skip = (page - 1).saturating_mul(page_size);
        let data: Vec<T> = items.into_iter().skip(skip).take(page_size).collect();
        let remaining_items = total_items.saturating_sub(skip + data.len());
        Ok(Self {
            total_items,
            total_pages,
            page,
            page_size,
            remaining_items,
            data,
        })
    }
}

/// Structured filter for opportunity queries and exports. Every set field
/// must match; text fields compare case-insensitively.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpportunityFilter {
    /// Plant id or plant name.
    pub plant: Option<String>,
    pub category: Option<String>,
    pub status: Option<Status>,
    /// Either `2025` or `2025-2026`.
    pub year: Option<String>,
    pub company: Option<String>,
    pub department: Option<String>,
    /// Employee id of the creator.
    pub created_by: Option<String>,
    /// Employee id of the project leader.
    pub project_leader: Option<String>,
    /// Free text matched against code, statement, category, plant and leader.
    pub text: Option<String>,
}

fn eq(field: &str, wanted: &Option<String>) -> bool {
    match wanted {
        Some(w) => field.trim().eq_ignore_ascii_case(w.trim()),
        None => true,
    }
}

impl OpportunityFilter {
    pub fn is_empty(&self) -> bool {
        self.plant.is_none()
            && self.category.is_none()
            && self.status.is_none()
            && self.year.is_none()
            && self.company.is_none()
            && self.department.is_none()
            && self.created_by.is_none()
            && self.project_leader.is_none()
            && self.text.is_none()
    }

    pub fn matches(&self, opp: &Opportunity) -> bool {
        if let Some(plant) = &self.plant {
            let plant = plant.trim();
            if opp.plant.id != plant && !opp.plant.name.eq_ignore_ascii_case(plant) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if opp.status != status {
                return false;
            }
        }
        if let Some(year) = &self.year {
            let year = year.trim();
            if opp.opportunity_year != year && !opp.opportunity_year.starts_with(&format!("{year}-"))
            {
                return false;
            }
        }
        if let Some(creator) = &self.created_by {
            if opp.created_by.id != *creator {
                return false;
            }
        }
        if let Some(leader) = &self.project_leader {
            if !opp.is_led_by(leader) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.trim().to_lowercase();
            if !needle.is_empty() && !opp.search_text().contains(&needle) {
                return false;
            }
        }
        eq(&opp.category, &self.category)
            && eq(&opp.company, &self.company)
            && eq(&opp.department, &self.department)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::EmployeeRef;
    use crate::opportunity::tests::sample;

    #[test]
    fn paginate_reports_counters() {
        let page = Page::paginate((1..=23).collect::<Vec<_>>(), 2, 10).unwrap();
        assert_eq!(page.total_items, 23);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.data, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.remaining_items, 3);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = Page::paginate(vec![1, 2, 3], 5, 2).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.remaining_items, 0);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(Page::paginate(Vec::<u8>::new(), 1, 0).is_err());
        assert!(Page::paginate(Vec::<u8>::new(), 0, 10).is_err());
    }

    #[test]
    fn filter_combines_fields() {
        let mut opp = sample("Black Belt", Status::TeamsUpdated);
        opp.project_leader = Some(EmployeeRef {
            id: "e9".into(),
            employee_code: "EMP-9".into(),
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
        });

        let by_plant_and_year = OpportunityFilter {
            plant: Some("p1".into()),
            year: Some("2025".into()),
            category: Some("black belt".into()),
            ..Default::default()
        };
        assert!(by_plant_and_year.matches(&opp));

        let by_leader_text = OpportunityFilter {
            project_leader: Some("e9".into()),
            text: Some("CALIPER".into()),
            ..Default::default()
        };
        assert!(by_leader_text.matches(&opp));

        let wrong_status = OpportunityFilter {
            status: Some(Status::Expired),
            ..Default::default()
        };
        assert!(!wrong_status.matches(&opp));

        let wrong_year = OpportunityFilter {
            year: Some("2024".into()),
            ..Default::default()
        };
        assert!(!wrong_year.matches(&opp));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = OpportunityFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&sample("Kaizen", Status::OpportunityCompleted)));
    }
}
