//! Game-state snapshot consumed by retrieval and prompt assembly
//!
//! The core never persists this state; it receives a snapshot per request
//! and reads it. The only field it mutates is the single-slot retrieval
//! context cache, which lives here so continuations within one player turn
//! can reuse the previous retrieval verbatim.

use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: QuestStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub description: String,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
            description: String::new(),
        }
    }
}

/// A player character with its current dynamic status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyMember {
    pub id: String,
    pub name: String,
    pub race: String,
    pub class_name: String,
    pub level: u32,
    pub current_hp: i32,
    pub max_hp: i32,
    #[serde(default)]
    pub temp_hp: i32,
    #[serde(default)]
    pub conditions: Vec<String>,
}

/// One participant in the initiative order. Player combatants resolve their
/// status through the party roster; NPC combatants carry it inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: String,
    pub name: String,
    pub initiative: i32,
    #[serde(default)]
    pub is_player: bool,
    pub current_hp: i32,
    pub max_hp: i32,
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl Combatant {
    /// Defeated when out of hit points or explicitly marked
    pub fn is_defeated(&self) -> bool {
        self.current_hp <= 0 || self.conditions.iter().any(|c| c.eq_ignore_ascii_case("defeated"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub round_number: u32,
    #[serde(default)]
    pub current_turn_index: usize,
    #[serde(default)]
    pub combatants: Vec<Combatant>,
}

/// Snapshot of one campaign's state at prompt-assembly time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameState {
    pub campaign_id: String,
    #[serde(default)]
    pub campaign_goal: String,
    #[serde(default)]
    pub world_lore: Vec<String>,
    #[serde(default)]
    pub active_quests: Vec<Quest>,
    #[serde(default)]
    pub known_npcs: Vec<Npc>,
    #[serde(default)]
    pub event_summary: Vec<String>,
    #[serde(default)]
    pub party: Vec<PartyMember>,
    #[serde(default)]
    pub current_location: Location,
    #[serde(default)]
    pub combat: CombatState,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    /// Single-slot retrieval context cache; never persisted
    #[serde(skip)]
    pub last_rag_context: Option<String>,
}

impl GameState {
    pub fn new(campaign_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            ..Self::default()
        }
    }

    /// Drop the cached retrieval context. Called when a new player action
    /// arrives or the situation changes materially (combat ends, scene
    /// shifts).
    pub fn clear_rag_context(&mut self) {
        self.last_rag_context = None;
    }

    /// Look up a party member by combatant id
    pub fn party_member(&self, id: &str) -> Option<&PartyMember> {
        self.party.iter().find(|m| m.id == id)
    }
}
