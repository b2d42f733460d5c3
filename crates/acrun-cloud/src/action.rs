//! Record of the mutating decisions a workflow took

use serde::{Deserialize, Serialize};

/// A mutating call a workflow issued, or would have issued under dry-run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Type of action
    pub action_type: ActionType,

    /// Kind of entity the action targets
    pub target: Target,

    /// Runtime or endpoint name
    pub name: String,

    /// Version involved, when one is known
    pub version: Option<String>,

    /// False when the call was skipped under dry-run
    pub applied: bool,
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Runtime,
    Endpoint,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Runtime => write!(f, "runtime"),
            Target::Endpoint => write!(f, "endpoint"),
        }
    }
}

/// Ordered list of actions taken by one workflow run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub actions: Vec<Action>,
    pub dry_run: bool,
}

impl Report {
    pub fn new(dry_run: bool) -> Self {
        Self {
            actions: Vec::new(),
            dry_run,
        }
    }

    pub fn record(
        &mut self,
        action_type: ActionType,
        target: Target,
        name: impl Into<String>,
        version: Option<String>,
    ) {
        let applied = !self.dry_run && action_type != ActionType::NoOp;
        self.actions.push(Action {
            action_type,
            target,
            name: name.into(),
            version,
            applied,
        });
    }

    /// Whether anything other than no-ops was decided
    pub fn has_changes(&self) -> bool {
        self.actions
            .iter()
            .any(|a| a.action_type != ActionType::NoOp)
    }

    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Counts of recorded actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}
