//! Human-readable opportunity codes: `{plant}/{initials}/{year}-{year+1}/{seq}`.
//!
//! Formatting lives here; sequence reservation happens inside the same store
//! transaction that inserts the opportunity (see `db::OpportunityDb::create_with`).

use regex::Regex;
use std::sync::OnceLock;

/// The (plant, category, year) triple a sequence number is unique within.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceScope {
    pub plant: String,
    pub category: String,
    pub opportunity_year: String,
}

impl SequenceScope {
    pub fn new(plant: &str, category: &str, year: i32) -> Self {
        Self {
            plant: plant.trim().to_string(),
            category: category.trim().to_string(),
            opportunity_year: opportunity_year(year),
        }
    }

    /// Storage key for the scope's counter.
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.plant, self.category, self.opportunity_year)
    }

    pub fn code_for(&self, seq: u64) -> String {
        format!(
            "{}/{}/{}/{:03}",
            self.plant,
            category_initials(&self.category),
            self.opportunity_year,
            seq
        )
    }
}

/// `2025` → `"2025-2026"`.
pub fn opportunity_year(year: i32) -> String {
    format!("{}-{}", year, year + 1)
}

fn word_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s-]+").expect("valid regex"))
}

/// Single-word categories are uppercased verbatim; multi-word categories
/// (split on spaces or hyphens) collapse to their uppercased first letters.
pub fn category_initials(category: &str) -> String {
    let category = category.trim();
    if !category.contains(|c: char| c.is_whitespace() || c == '-') {
        return category.to_uppercase();
    }
    word_separator()
        .split(category)
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}
