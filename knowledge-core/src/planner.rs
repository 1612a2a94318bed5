//! Rule-based query planner
//!
//! Turns a raw player action plus the game-state snapshot into an ordered
//! list of retrieval queries. Extraction is deterministic: fixed verb
//! patterns, a curated spell list, the 18 canonical skills, and NPC-name
//! carryover from recent chat.

use regex::Regex;

use crate::chat::{ChatMessage, Role};
use crate::kb::KbType;
use crate::state::GameState;

/// Category of a planned query; drives execution priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    SpellCasting,
    Combat,
    SkillCheck,
    Social,
    Exploration,
    RulesLookup,
    General,
}

impl QueryKind {
    /// Lower sorts first
    pub fn priority(self) -> u8 {
        match self {
            QueryKind::SpellCasting => 1,
            QueryKind::Combat => 2,
            QueryKind::SkillCheck => 3,
            QueryKind::Social => 4,
            QueryKind::Exploration => 5,
            QueryKind::RulesLookup => 6,
            QueryKind::General => 7,
        }
    }
}

/// Entities extracted from the action, passed along for downstream use
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryHints {
    pub spell: Option<String>,
    pub creature: Option<String>,
    pub skill: Option<String>,
    pub npc: Option<String>,
    pub location: Option<String>,
    pub in_combat: bool,
}

/// One retrieval query in priority order
#[derive(Debug, Clone)]
pub struct PlannedQuery {
    pub text: String,
    pub kind: QueryKind,
    pub hints: QueryHints,
    pub kb_filter: Option<Vec<KbType>>,
}

/// Common spells players reference by name
const COMMON_SPELLS: [&str; 20] = [
    "fireball",
    "magic missile",
    "cure wounds",
    "healing word",
    "shield",
    "mage armor",
    "detect magic",
    "light",
    "prestidigitation",
    "eldritch blast",
    "sacred flame",
    "guidance",
    "thaumaturgy",
    "minor illusion",
    "toll the dead",
    "ice knife",
    "burning hands",
    "thunderwave",
    "misty step",
    "counterspell",
];

/// The 18 canonical skills
const SKILLS: [&str; 18] = [
    "acrobatics",
    "animal handling",
    "arcana",
    "athletics",
    "deception",
    "history",
    "insight",
    "intimidation",
    "investigation",
    "medicine",
    "nature",
    "perception",
    "performance",
    "persuasion",
    "religion",
    "sleight of hand",
    "stealth",
    "survival",
];

const MAX_SPELLS: usize = 3;
const MAX_CREATURES: usize = 2;
const MAX_SKILLS: usize = 2;
const MAX_NPCS: usize = 3;

/// How many trailing chat messages NPC carryover scans
const NPC_SCAN_WINDOW: usize = 10;

pub struct QueryPlanner {
    spell_patterns: Vec<Regex>,
    creature_patterns: Vec<Regex>,
    skill_check_pattern: Regex,
    npc_patterns: Vec<Regex>,
    combat_verbs: Regex,
    social_verbs: Regex,
    exploration_verbs: Regex,
    rules_pattern: Regex,
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryPlanner {
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("planner pattern is valid");
        Self {
            // Capture at most two capitalized words after the verb so spell
            // names stop before prose like "on the goblin".
            spell_patterns: vec![
                compile(r"(?i:\bcast(?:s|ing)?\s+)([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)"),
                compile(r"(?i:\binvokes?\s+)([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)"),
                compile(r"(?i:\buse(?:s|ing)?\s+the\s+spell\s+)([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)"),
            ],
            creature_patterns: vec![
                compile(r"(?i)\b(?:attack|strike|fight|hit|stab|shoot)(?:s|es|ing)?\s+(?:the\s+)?([a-z][a-z]{2,20})"),
                compile(r"(?i)\b(?:at|on)\s+the\s+([a-z][a-z]{2,20})\b"),
                compile(r"(?i)\bthe\s+([a-z]{3,20})\s+attacks?\b"),
            ],
            skill_check_pattern: compile(r"(?i)\b([a-z][a-z ]{2,20})\s+check\b"),
            npc_patterns: vec![
                compile(r"([A-Z][a-z]+)\s+(?:says?|tells?|nods|shakes|smiles|frowns|whispers)"),
                compile(r"(?i)talk(?:s|ing)?\s+to\s+([A-Z][a-z]+)"),
                compile(r"(?i)speak(?:s|ing)?\s+(?:to|with)\s+([A-Z][a-z]+)"),
            ],
            combat_verbs: compile(r"(?i)\b(attack|strike|fight|hit|stab|shoot|swing|charge)\b"),
            social_verbs: compile(r"(?i)\b(persuade|talk|speak|convince|negotiate|intimidate|ask|greet)\b"),
            exploration_verbs: compile(
                r"(?i)\b(explore|search|investigate|examine|look around|travel|scout)\b",
            ),
            rules_pattern: compile(r"(?i)\b(rule|rules|how does|how do)\b"),
        }
    }

    /// Plan the retrieval queries for a player action. Always ends with a
    /// `general` query carrying the raw action.
    pub fn plan(&self, action: &str, state: &GameState) -> Vec<PlannedQuery> {
        let mut base_hints = QueryHints {
            in_combat: state.combat.is_active,
            location: (!state.current_location.name.is_empty())
                .then(|| state.current_location.name.clone()),
            ..QueryHints::default()
        };
        if let Some(npc) = self.extract_npcs(&state.chat_history).into_iter().next() {
            base_hints.npc = Some(npc);
        }

        let mut queries = Vec::new();
        let trimmed = action.trim();

        if !trimmed.is_empty() {
            for spell in self.extract_spells(trimmed) {
                let mut hints = base_hints.clone();
                hints.spell = Some(spell.clone());
                queries.push(PlannedQuery {
                    text: format!("{spell} spell mechanics and effects"),
                    kind: QueryKind::SpellCasting,
                    hints,
                    kb_filter: Some(vec![KbType::Spells]),
                });
            }

            let creatures = self.extract_creatures(trimmed);
            if self.combat_verbs.is_match(trimmed) {
                queries.push(PlannedQuery {
                    text: format!("combat rules {trimmed}"),
                    kind: QueryKind::Combat,
                    hints: base_hints.clone(),
                    kb_filter: Some(vec![KbType::Rules, KbType::Mechanics]),
                });
            }
            for creature in creatures {
                let mut hints = base_hints.clone();
                hints.creature = Some(creature.clone());
                queries.push(PlannedQuery {
                    text: format!("{creature} monster statistics and abilities"),
                    kind: QueryKind::Combat,
                    hints,
                    kb_filter: Some(vec![KbType::Monsters]),
                });
            }

            for skill in self.extract_skills(trimmed) {
                let mut hints = base_hints.clone();
                hints.skill = Some(skill.clone());
                queries.push(PlannedQuery {
                    text: format!("{skill} skill check rules"),
                    kind: QueryKind::SkillCheck,
                    hints,
                    kb_filter: Some(vec![KbType::Mechanics, KbType::Rules]),
                });
            }

            if self.social_verbs.is_match(trimmed) {
                queries.push(PlannedQuery {
                    text: format!("social interaction {trimmed}"),
                    kind: QueryKind::Social,
                    hints: base_hints.clone(),
                    kb_filter: None,
                });
            }

            if self.exploration_verbs.is_match(trimmed) {
                queries.push(PlannedQuery {
                    text: format!("exploration {trimmed}"),
                    kind: QueryKind::Exploration,
                    hints: base_hints.clone(),
                    kb_filter: None,
                });
            }

            if self.rules_pattern.is_match(trimmed) {
                queries.push(PlannedQuery {
                    text: trimmed.to_string(),
                    kind: QueryKind::RulesLookup,
                    hints: base_hints.clone(),
                    kb_filter: Some(vec![KbType::Rules]),
                });
            }
        }

        // Fallthrough query with the raw action
        queries.push(PlannedQuery {
            text: trimmed.to_string(),
            kind: QueryKind::General,
            hints: base_hints,
            kb_filter: None,
        });

        queries.sort_by_key(|q| q.kind.priority());
        queries
    }

    /// Spell names cited in the action, canonical title case, at most three
    pub fn extract_spells(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut found = Vec::new();

        for spell in COMMON_SPELLS {
            if lower.contains(spell) {
                push_unique(&mut found, title_case(spell));
            }
        }

        for pattern in &self.spell_patterns {
            for capture in pattern.captures_iter(text) {
                if let Some(m) = capture.get(1) {
                    let candidate = m.as_str().trim();
                    if candidate.len() > 2 {
                        push_unique(&mut found, title_case(candidate));
                    }
                }
            }
        }

        found.truncate(MAX_SPELLS);
        found
    }

    /// Creature names targeted by the action, lowercase, at most two
    pub fn extract_creatures(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        for pattern in &self.creature_patterns {
            for capture in pattern.captures_iter(text) {
                if let Some(m) = capture.get(1) {
                    let candidate = m.as_str().trim().to_lowercase();
                    if candidate.len() > 2 && !is_stopword(&candidate) {
                        push_unique(&mut found, candidate);
                    }
                }
            }
        }
        found.truncate(MAX_CREATURES);
        found
    }

    /// Canonical skills referenced by the action, title case, at most two
    pub fn extract_skills(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut found = Vec::new();

        for skill in SKILLS {
            if lower.contains(skill) {
                push_unique(&mut found, title_case(skill));
            }
        }

        for capture in self.skill_check_pattern.captures_iter(text) {
            if let Some(m) = capture.get(1) {
                let candidate = m.as_str().trim().to_lowercase();
                if SKILLS.contains(&candidate.as_str()) {
                    push_unique(&mut found, title_case(&candidate));
                }
            }
        }

        found.truncate(MAX_SKILLS);
        found
    }

    /// NPC names cited in the trailing chat window, most recent first
    pub fn extract_npcs(&self, messages: &[ChatMessage]) -> Vec<String> {
        let recent: Vec<&str> = messages
            .iter()
            .rev()
            .take(NPC_SCAN_WINDOW)
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .map(|m| m.content.as_str())
            .collect();

        let mut matches = Vec::new();
        // `recent` is newest-first already, so first hit wins
        for content in recent {
            for pattern in &self.npc_patterns {
                for capture in pattern.captures_iter(content) {
                    if let Some(m) = capture.get(1) {
                        let name = m.as_str().trim().to_string();
                        if name.len() > 2 && !matches!(name.as_str(), "You" | "The" | "And") {
                            push_unique(&mut matches, name);
                        }
                    }
                }
            }
        }

        matches.truncate(MAX_NPCS);
        matches
    }
}

fn push_unique(items: &mut Vec<String>, candidate: String) {
    if !items.contains(&candidate) {
        items.push(candidate);
    }
}

fn is_stopword(word: &str) -> bool {
    matches!(word, "the" | "and" | "with" | "ground" | "floor" | "door" | "wall")
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> QueryPlanner {
        QueryPlanner::new()
    }

    #[test]
    fn fireball_on_goblin_plans_spell_and_monster_queries() {
        let plan = planner().plan("Cast Fireball on the goblin", &GameState::new("c1"));

        let spell = plan
            .iter()
            .find(|q| q.kind == QueryKind::SpellCasting)
            .expect("spell query");
        assert_eq!(spell.hints.spell.as_deref(), Some("Fireball"));
        assert_eq!(spell.kb_filter.as_deref(), Some(&[KbType::Spells][..]));

        let combat = plan
            .iter()
            .find(|q| q.kind == QueryKind::Combat)
            .expect("combat query");
        assert_eq!(combat.hints.creature.as_deref(), Some("goblin"));

        // Spell casting outranks everything else
        assert_eq!(plan[0].kind, QueryKind::SpellCasting);
        assert_eq!(plan.last().map(|q| q.kind), Some(QueryKind::General));
    }

    #[test]
    fn empty_action_emits_exactly_one_general_query() {
        let plan = planner().plan("", &GameState::new("c1"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, QueryKind::General);
        assert_eq!(plan[0].text, "");
    }

    #[test]
    fn skill_check_is_detected_by_name_and_pattern() {
        let p = planner();
        assert_eq!(p.extract_skills("I make a stealth check"), vec!["Stealth"]);
        assert_eq!(
            p.extract_skills("rolling Perception to spot the ambush"),
            vec!["Perception"]
        );
        assert!(p.extract_skills("I open the door").is_empty());
    }

    #[test]
    fn spell_candidates_are_capped_at_three() {
        let spells = planner().extract_spells(
            "I could cast fireball, magic missile, burning hands or thunderwave",
        );
        assert_eq!(spells.len(), 3);
    }

    #[test]
    fn npc_carryover_prefers_most_recent() {
        let mut state = GameState::new("c1");
        state
            .chat_history
            .push(ChatMessage::assistant("Aldric says the pass is blocked."));
        state
            .chat_history
            .push(ChatMessage::assistant("Mira tells you about the vault."));

        let npcs = planner().extract_npcs(&state.chat_history);
        assert_eq!(npcs.first().map(String::as_str), Some("Mira"));
        assert!(npcs.contains(&"Aldric".to_string()));
    }

    #[test]
    fn attack_action_emits_combat_rules_query() {
        let plan = planner().plan("I attack the orc with my axe", &GameState::new("c1"));
        let kinds: Vec<QueryKind> = plan.iter().map(|q| q.kind).collect();
        assert!(kinds.contains(&QueryKind::Combat));
        let monster_query = plan
            .iter()
            .find(|q| q.hints.creature.is_some())
            .expect("creature-scoped query");
        assert_eq!(monster_query.hints.creature.as_deref(), Some("orc"));
    }

    #[test]
    fn social_verbs_plan_a_social_query() {
        let plan = planner().plan("I persuade the guard to let us in", &GameState::new("c1"));
        assert!(plan.iter().any(|q| q.kind == QueryKind::Social));
    }
}
