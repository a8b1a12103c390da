//! The whole troop document: roster, games, settings and curriculum.
//!
//! # Responsibility
//! - Bundle the four independently persisted values into one in-memory graph.
//! - Provide lookups shared by services.

use crate::model::curriculum::{Level, LevelId, Subcategory, Task};
use crate::model::game::Game;
use crate::model::member::Member;
use crate::model::settings::{Settings, DEFAULT_LEVEL_ID};
use serde::{Deserialize, Serialize};

/// Owned view of a task together with its owning level and subcategory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    pub level_id: LevelId,
    pub subcategory: Subcategory,
    pub task: Task,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopDocument {
    pub members: Vec<Member>,
    pub games: Vec<Game>,
    pub settings: Settings,
    pub levels: Vec<Level>,
}

impl Default for TroopDocument {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            games: Vec::new(),
            settings: Settings::default(),
            levels: default_levels(),
        }
    }
}

/// Curriculum used when no levels were persisted yet.
pub fn default_levels() -> Vec<Level> {
    vec![Level {
        id: DEFAULT_LEVEL_ID.to_string(),
        name: "Earth Trail".to_string(),
        color: "#3b5a3b".to_string(),
        icon: "🌱".to_string(),
        areas: Vec::new(),
    }]
}

impl TroopDocument {
    pub fn member(&self, member_id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == member_id)
    }

    pub fn member_mut(&mut self, member_id: &str) -> Option<&mut Member> {
        self.members.iter_mut().find(|member| member.id == member_id)
    }

    pub fn game(&self, game_id: &str) -> Option<&Game> {
        self.games.iter().find(|game| game.id == game_id)
    }

    pub fn level(&self, level_id: &str) -> Option<&Level> {
        self.levels.iter().find(|level| level.id == level_id)
    }

    pub fn level_mut(&mut self, level_id: &str) -> Option<&mut Level> {
        self.levels.iter_mut().find(|level| level.id == level_id)
    }

    /// Finds a task anywhere in the curriculum.
    pub fn find_task(&self, task_id: &str) -> Option<TaskRef> {
        self.levels.iter().find_map(|level| {
            level.find_task(task_id).map(|(subcategory, task)| TaskRef {
                level_id: level.id.clone(),
                subcategory: subcategory.clone(),
                task: task.clone(),
            })
        })
    }

    /// Case-insensitive nickname lookup, optionally ignoring one member.
    pub fn nickname_taken(&self, nickname: &str, except_member_id: Option<&str>) -> bool {
        self.members.iter().any(|member| {
            Some(member.id.as_str()) != except_member_id && member.nickname_matches(nickname)
        })
    }
}
