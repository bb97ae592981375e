use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::{Args, Subcommand};
use kaizen_core::notify::NullNotifier;
use kaizen_core::opportunity::NewOpportunity;
use kaizen_core::query::OpportunityFilter;
use kaizen_core::{Opportunity, OpportunityService, Status};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum OpportunitySubcommand {
    /// List opportunities, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = "1")]
        page: usize,
        #[arg(long, default_value = "20")]
        page_size: usize,
    },

    /// Show one opportunity by id or code
    Show { key: String },

    /// Dump every matching opportunity as JSON
    Export {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Create an opportunity from a JSON request file
    Create {
        /// Path to the request JSON
        #[arg(long)]
        file: PathBuf,
        /// Employee id of the creator
        #[arg(long = "as", value_name = "EMPLOYEE")]
        actor: String,
    },

    /// Withdraw an opportunity (administrators only)
    Revoke {
        key: String,
        #[arg(long = "as", value_name = "EMPLOYEE")]
        actor: String,
    },

    /// Mark an opportunity expired (administrators only)
    Expire {
        key: String,
        #[arg(long = "as", value_name = "EMPLOYEE")]
        actor: String,
    },
}

#[derive(Args, Default)]
pub struct FilterArgs {
    /// Plant id or name
    #[arg(long)]
    plant: Option<String>,
    #[arg(long)]
    category: Option<String>,
    /// Status label or snake_case code
    #[arg(long)]
    status: Option<String>,
    /// `2025` or `2025-2026`
    #[arg(long)]
    year: Option<String>,
    #[arg(long)]
    leader: Option<String>,
    /// Free-text search
    #[arg(long, short = 'q')]
    query: Option<String>,
}

impl FilterArgs {
    fn into_filter(self) -> anyhow::Result<OpportunityFilter> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<Status>)
            .transpose()?;
        Ok(OpportunityFilter {
            plant: self.plant,
            category: self.category,
            status,
            year: self.year,
            project_leader: self.leader,
            text: self.query,
            ..Default::default()
        })
    }
}

pub fn run(root: &Path, subcmd: OpportunitySubcommand, json: bool) -> anyhow::Result<()> {
    // The CLI has no delivery channel; notifications raised here are dropped.
    let service = OpportunityService::open(root, Arc::new(NullNotifier))
        .context("failed to open opportunity store")?;

    match subcmd {
        OpportunitySubcommand::List {
            filter,
            page,
            page_size,
        } => list(&service, filter.into_filter()?, page, page_size, json),
        OpportunitySubcommand::Show { key } => {
            let opp = lookup(&service, &key)?;
            if json {
                print_json(&opp)
            } else {
                print_detail(&opp);
                Ok(())
            }
        }
        OpportunitySubcommand::Export { filter } => {
            print_json(&service.export(&filter.into_filter()?)?)
        }
        OpportunitySubcommand::Create { file, actor } => {
            let data = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let req: NewOpportunity =
                serde_json::from_str(&data).context("invalid opportunity request")?;
            let opp = service.create(req, &actor)?;
            report(&opp, "created", json)
        }
        OpportunitySubcommand::Revoke { key, actor } => {
            let id = lookup(&service, &key)?.id;
            report(&service.revoke(id, &actor)?, "revoked", json)
        }
        OpportunitySubcommand::Expire { key, actor } => {
            let id = lookup(&service, &key)?.id;
            report(&service.expire(id, &actor)?, "expired", json)
        }
    }
}

/// Accept either the UUID or the human-readable code.
fn lookup(service: &OpportunityService, key: &str) -> anyhow::Result<Opportunity> {
    let opp = match Uuid::parse_str(key.trim()) {
        Ok(id) => service.get(id)?,
        Err(_) => service.get_by_code(key)?,
    };
    Ok(opp)
}

fn report(opp: &Opportunity, verb: &str, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(opp)
    } else {
        println!("{verb}: {} [{}]", opp.opportunity_id, opp.status);
        Ok(())
    }
}

fn list(
    service: &OpportunityService,
    filter: OpportunityFilter,
    page: usize,
    page_size: usize,
    json: bool,
) -> anyhow::Result<()> {
    let result = service.query(&filter, page, page_size)?;
    if json {
        return print_json(&result);
    }
    if result.data.is_empty() {
        println!("No opportunities.");
        return Ok(());
    }

    let rows = result
        .data
        .iter()
        .map(|o| {
            vec![
                o.opportunity_id.clone(),
                o.status.to_string(),
                o.plant.name.clone(),
                o.project_leader
                    .as_ref()
                    .map(|l| l.name.clone())
                    .unwrap_or_else(|| "-".to_string()),
                truncate(&o.statement, 48),
            ]
        })
        .collect();
    print_table(&["CODE", "STATUS", "PLANT", "LEADER", "STATEMENT"], rows);
    println!(
        "\npage {}/{} ({} total, {} remaining)",
        result.page, result.total_pages, result.total_items, result.remaining_items
    );
    Ok(())
}

fn print_detail(opp: &Opportunity) {
    println!("{}  [{}]", opp.opportunity_id, opp.status);
    println!("  id:        {}", opp.id);
    println!("  plant:     {}", opp.plant.name);
    println!("  category:  {}", opp.category);
    println!("  statement: {}", opp.statement);
    println!("  created:   {} by {}", opp.created_at.format("%Y-%m-%d"), opp.created_by.name);
    if let Some(leader) = &opp.project_leader {
        println!("  leader:    {}", leader.name);
    }
    println!(
        "  team: {}  actions: {}  schedules: {}  savings months: {}",
        opp.team_members.len(),
        opp.action_plan.len(),
        opp.schedules.len(),
        opp.monthly_savings.len()
    );
    let granted = opp.approvals.granted();
    if !granted.is_empty() {
        let labels: Vec<&str> = granted.iter().map(|s| s.label()).collect();
        println!("  approvals: {}", labels.join(", "));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
