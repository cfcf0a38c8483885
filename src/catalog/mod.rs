//! Read-only assignment catalog, loaded once at startup from a TOML seed
//! file and immutable afterwards.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SandboxError};

/// Assignment difficulty rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    /// Introductory single-table queries.
    Easy,
    /// Aggregates, grouping, simple joins.
    Medium,
    /// Multi-join and subquery work.
    Hard,
}

/// One column in a displayed table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Declared SQL type, for display only.
    #[serde(rename = "type")]
    pub column_type: String,
    /// Optional human description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Table layout and sample rows shown alongside an assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Table name in the sandbox database.
    pub table_name: String,
    /// Ordered column specs.
    pub columns: Vec<ColumnSpec>,
    /// Representative rows for display.
    #[serde(default)]
    pub sample_data: Vec<serde_json::Value>,
}

/// A practice assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// Stable identifier used in URLs and attempt records.
    pub id: String,
    /// Short display title.
    pub title: String,
    /// One-line summary shown in listings.
    pub description: String,
    /// Difficulty rating.
    pub difficulty: Difficulty,
    /// The task the learner must solve.
    pub question: String,
    /// Constraints the solution must satisfy.
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Tables available to the learner, with sample rows.
    #[serde(default)]
    pub table_schemas: Vec<TableSchema>,
    /// Prose description of the expected result.
    #[serde(default)]
    pub expected_output: String,
    /// Progressive hints.
    #[serde(default)]
    pub hints: Vec<String>,
    /// Free-form topic tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Shortened assignment projection for list responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    /// Stable identifier.
    pub id: String,
    /// Short display title.
    pub title: String,
    /// One-line summary.
    pub description: String,
    /// Difficulty rating.
    pub difficulty: Difficulty,
    /// Topic tags.
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "assignment")]
    assignments: Vec<Assignment>,
}

/// In-memory catalog of assignments.
#[derive(Debug, Clone, Default)]
pub struct AssignmentCatalog {
    assignments: Vec<Assignment>,
}

impl AssignmentCatalog {
    /// Empty catalog, used when no seed file is configured.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads assignments from a TOML seed file of `[[assignment]]` tables.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: CatalogFile =
            toml::from_str(&raw).map_err(|err| SandboxError::Catalog(err.to_string()))?;

        {
            let mut seen = HashSet::new();
            for assignment in &file.assignments {
                if !seen.insert(assignment.id.as_str()) {
                    return Err(SandboxError::Catalog(format!(
                        "duplicate assignment id `{}`",
                        assignment.id
                    )));
                }
            }
        }

        Ok(Self {
            assignments: file.assignments,
        })
    }

    /// Summaries of every assignment, in file order.
    pub fn summaries(&self) -> Vec<AssignmentSummary> {
        self.assignments
            .iter()
            .map(|a| AssignmentSummary {
                id: a.id.clone(),
                title: a.title.clone(),
                description: a.description.clone(),
                difficulty: a.difficulty,
                tags: a.tags.clone(),
            })
            .collect()
    }

    /// Looks up a single assignment by id.
    pub fn get(&self, id: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.id == id)
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the catalog holds no assignments.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
