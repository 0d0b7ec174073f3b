//! Plan, outcome and inventory rendering
//!
//! Renderers return strings so the binary decides where they go (stdout) and
//! tests can assert on the exact text. Text and JSON carry the same content
//! and neither includes timestamps, so identical inputs give identical output.

use crate::graph::DependencyGraph;
use crate::planner::DeletionPlan;
use agentcore_sweep_common::{Inventory, Outcome, OutcomeStatus, ResourceKind, ResourceRef};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;

/// Clean, previewed or cancelled
pub const EXIT_OK: i32 = 0;

/// At least one resource ended `Failed`
pub const EXIT_FAILED: i32 = 1;

/// Pre-flight failure; nothing was deleted
pub const EXIT_FATAL: i32 = 2;

/// Report rendering format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Outcome counts for a live run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub deleted: usize,
    pub already_absent: usize,
    pub failed: usize,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut acc, outcome| {
                match outcome.status {
                    OutcomeStatus::Deleted => acc.deleted += 1,
                    OutcomeStatus::AlreadyAbsent => acc.already_absent += 1,
                    OutcomeStatus::Failed => acc.failed += 1,
                }
                acc
            })
    }

    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 { EXIT_OK } else { EXIT_FAILED }
    }
}

#[derive(Serialize)]
struct Entry<'a> {
    kind: ResourceKind,
    id: &'a str,
    name: &'a str,
}

impl<'a> From<&'a ResourceRef> for Entry<'a> {
    fn from(r: &'a ResourceRef) -> Self {
        Self {
            kind: r.kind,
            id: &r.id,
            name: &r.display_name,
        }
    }
}

#[derive(Serialize)]
struct PlanDocument<'a> {
    scope: &'a str,
    count: usize,
    steps: Vec<Entry<'a>>,
}

#[derive(Serialize)]
struct OutcomeEntry<'a> {
    #[serde(flatten)]
    resource: Entry<'a>,
    status: OutcomeStatus,
    #[serde(skip_serializing_if = "str::is_empty")]
    detail: &'a str,
    attempts: u32,
}

#[derive(Serialize)]
struct RunDocument<'a> {
    scope: &'a str,
    outcomes: Vec<OutcomeEntry<'a>>,
    summary: Summary,
}

#[derive(Serialize)]
struct InventoryEntry<'a> {
    #[serde(flatten)]
    resource: Entry<'a>,
    deletes_before: Vec<String>,
}

#[derive(Serialize)]
struct InventoryDocument<'a> {
    scope: &'a str,
    count: usize,
    resources: Vec<InventoryEntry<'a>>,
}

fn describe(r: &ResourceRef) -> String {
    format!("{}, {}, {}", r.kind, r.id, r.display_name)
}

/// Dry-run listing of the plan
pub fn render_preview(plan: &DeletionPlan, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&PlanDocument {
            scope: plan.scope(),
            count: plan.len(),
            steps: plan.steps().iter().map(Entry::from).collect(),
        }),
        OutputFormat::Text => {
            let mut out = format!(
                "plan for scope {}: {} resource(s)\n",
                plan.scope(),
                plan.len()
            );
            if plan.is_empty() {
                out.push_str("nothing to delete\n");
            }
            for step in plan.steps() {
                out.push_str(&format!("would delete: {}\n", describe(step)));
            }
            Ok(out)
        }
    }
}

/// Per-resource results of a live run, then the summary line
pub fn render_outcomes(
    scope: &str,
    outcomes: &[Outcome],
    format: OutputFormat,
) -> serde_json::Result<String> {
    let summary = Summary::from_outcomes(outcomes);
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&RunDocument {
            scope,
            outcomes: outcomes
                .iter()
                .map(|o| OutcomeEntry {
                    resource: Entry::from(&o.resource),
                    status: o.status,
                    detail: &o.detail,
                    attempts: o.attempts,
                })
                .collect(),
            summary,
        }),
        OutputFormat::Text => {
            let mut out = String::new();
            for outcome in outcomes {
                out.push_str(&format!(
                    "{}: {}",
                    outcome.status,
                    describe(&outcome.resource)
                ));
                if !outcome.detail.is_empty() {
                    out.push_str(&format!(": {}", outcome.detail));
                }
                out.push('\n');
            }
            out.push_str(&format!(
                "summary: {} deleted, {} already absent, {} failed\n",
                summary.deleted, summary.already_absent, summary.failed
            ));
            Ok(out)
        }
    }
}

/// Scanned inventory with the resources each entry must be deleted before
pub fn render_inventory(
    inventory: &Inventory,
    graph: &DependencyGraph,
    format: OutputFormat,
) -> serde_json::Result<String> {
    let deletes_before = |r: &ResourceRef| -> Vec<String> {
        graph.successors(&r.key()).map(|k| k.to_string()).collect()
    };

    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&InventoryDocument {
            scope: inventory.scope(),
            count: inventory.len(),
            resources: inventory
                .iter()
                .map(|r| InventoryEntry {
                    resource: Entry::from(r),
                    deletes_before: deletes_before(r),
                })
                .collect(),
        }),
        OutputFormat::Text => {
            if inventory.is_empty() {
                return Ok(format!(
                    "no resources found for scope {}\n",
                    inventory.scope()
                ));
            }

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL_CONDENSED)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    Cell::new("Kind"),
                    Cell::new("ID"),
                    Cell::new("Name"),
                    Cell::new("Deletes before"),
                ]);
            for r in inventory.iter() {
                table.add_row(vec![
                    Cell::new(r.kind.as_str()),
                    Cell::new(&r.id),
                    Cell::new(&r.display_name),
                    Cell::new(deletes_before(r).join("\n")),
                ]);
            }

            Ok(format!(
                "inventory for scope {}: {} resource(s)\n{table}\n",
                inventory.scope(),
                inventory.len()
            ))
        }
    }
}
