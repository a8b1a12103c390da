//! Curriculum tree: levels, areas, subcategories and tasks.
//!
//! # Invariants
//! - Task ids are unique across all levels.
//! - A subcategory's `goal` counts mandatory and optional tasks together.

use serde::{Deserialize, Serialize};

pub type LevelId = String;
pub type AreaId = String;
pub type TaskId = String;

/// Leaf unit a member completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub mandatory: bool,
    /// Task-specific reward. Falls back to the scoring table when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub title: String,
    /// Number of tasks a member is expected to complete in this subcategory.
    pub goal: u32,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Subcategory {
    pub fn mandatory_count(&self) -> u32 {
        self.tasks.iter().filter(|task| task.mandatory).count() as u32
    }

    /// Maximum number of concurrently active optional tasks.
    pub fn optional_quota(&self) -> u32 {
        self.goal.saturating_sub(self.mandatory_count())
    }

    pub fn contains_task(&self, task_id: &str) -> bool {
        self.tasks.iter().any(|task| task.id == task_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub title: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
}

/// Top-level curriculum track with its own point pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub id: LevelId,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub areas: Vec<Area>,
}

impl Level {
    /// Finds a task together with the subcategory that owns it.
    pub fn find_task(&self, task_id: &str) -> Option<(&Subcategory, &Task)> {
        self.areas
            .iter()
            .flat_map(|area| area.subcategories.iter())
            .find_map(|sub| {
                sub.tasks
                    .iter()
                    .find(|task| task.id == task_id)
                    .map(|task| (sub, task))
            })
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.areas
            .iter()
            .flat_map(|area| area.subcategories.iter())
            .flat_map(|sub| sub.tasks.iter())
    }

    pub fn area_mut(&mut self, area_id: &str) -> Option<&mut Area> {
        self.areas.iter_mut().find(|area| area.id == area_id)
    }
}
