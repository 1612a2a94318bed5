//! Game-state rendering for the context blocks

use tracing::error;

use crate::state::{CombatState, GameState, Npc, PartyMember, Quest, QuestStatus};

/// Render one party member with its current status
pub fn format_party_member(member: &PartyMember) -> String {
    let mut status = format!("HP: {}/{}", member.current_hp, member.max_hp);
    if member.temp_hp > 0 {
        status.push_str(&format!(", Temp HP: {}", member.temp_hp));
    }
    if !member.conditions.is_empty() {
        status.push_str(&format!(", Conditions: {}", member.conditions.join(", ")));
    }
    format!(
        "- ID: {}, Name: {} ({} {} {}) | Status: {}",
        member.id, member.name, member.race, member.class_name, member.level, status
    )
}

/// Render the initiative order with the active-combatant marker.
///
/// Player combatants resolve HP and conditions through the party roster;
/// NPC combatants carry theirs inline and gain a `[Defeated]` tag at 0 HP
/// or on an explicit condition.
pub fn format_combat_state(combat: &CombatState, state: &GameState) -> String {
    if !combat.is_active {
        return "Combat Status: Not Active".to_string();
    }

    let mut lines = vec![
        "Combat Status: Active".to_string(),
        format!("Round: {}", combat.round_number),
    ];

    if combat.combatants.is_empty() {
        lines.push("Combatants: None (Error or Pre-Initiative?)".to_string());
        return lines.join("\n");
    }

    let mut current_index = combat.current_turn_index;
    if current_index >= combat.combatants.len() {
        error!(
            current_index,
            combatants = combat.combatants.len(),
            "combat turn index out of range; resetting to 0"
        );
        current_index = 0;
    }

    let current = &combat.combatants[current_index];
    lines.push(format!("Current Turn: {} (ID: {})", current.name, current.id));
    lines.push("Turn Order (Highest Initiative First):".to_string());

    for (i, combatant) in combat.combatants.iter().enumerate() {
        let prefix = if i == current_index { "-> " } else { "   " };
        let mut status_parts = Vec::new();

        if let Some(member) = state.party_member(&combatant.id) {
            status_parts.push(format!("HP: {}/{}", member.current_hp, member.max_hp));
            if !member.conditions.is_empty() {
                status_parts.push(format!("Cond: {}", member.conditions.join(", ")));
            }
        } else {
            status_parts.push(format!(
                "HP: {}/{}",
                combatant.current_hp, combatant.max_hp
            ));
            let active_conditions: Vec<&String> = combatant
                .conditions
                .iter()
                .filter(|c| !c.eq_ignore_ascii_case("defeated"))
                .collect();
            if !active_conditions.is_empty() {
                let rendered: Vec<&str> =
                    active_conditions.iter().map(|c| c.as_str()).collect();
                status_parts.push(format!("Cond: {}", rendered.join(", ")));
            }
            if combatant.is_defeated() {
                status_parts.push("[Defeated]".to_string());
            }
        }

        let status = if status_parts.is_empty() {
            String::new()
        } else {
            format!(" ({})", status_parts.join(", "))
        };
        lines.push(format!(
            "{prefix}{} (ID: {}, Init: {}){status}",
            combatant.name, combatant.id, combatant.initiative
        ));
    }

    lines.join("\n")
}

pub fn format_known_npcs(npcs: &[Npc]) -> String {
    if npcs.is_empty() {
        return "Known NPCs: None".to_string();
    }
    let mut lines = vec!["Known NPCs:".to_string()];
    for npc in npcs {
        lines.push(format!(
            "- {} (ID: {}): {} (Last Seen: {})",
            npc.name,
            npc.id,
            npc.description,
            npc.last_location.as_deref().unwrap_or("Unknown")
        ));
    }
    lines.join("\n")
}

pub fn format_active_quests(quests: &[Quest]) -> String {
    let active: Vec<&Quest> = quests
        .iter()
        .filter(|q| q.status == QuestStatus::Active)
        .collect();
    if active.is_empty() {
        return "Active Quests: None".to_string();
    }
    let mut lines = vec!["Active Quests:".to_string()];
    for quest in active {
        lines.push(format!(
            "- {} (ID: {}): {}",
            quest.title, quest.id, quest.description
        ));
    }
    lines.join("\n")
}

pub fn format_list_context(title: &str, items: &[String]) -> String {
    if items.is_empty() {
        return format!("{title}: None");
    }
    let mut lines = vec![format!("{title}:")];
    lines.extend(items.iter().map(|item| format!("- {item}")));
    lines.join("\n")
}

/// Campaign goal, lore, quests, NPCs, and event summary; empty sections are
/// dropped
pub fn static_context(state: &GameState) -> String {
    let mut parts = vec![format!("Campaign Goal: {}", state.campaign_goal)];

    let lore = format_list_context("World Lore", &state.world_lore);
    if lore != "World Lore: None" {
        parts.push(lore);
    }
    let quests = format_active_quests(&state.active_quests);
    if quests != "Active Quests: None" {
        parts.push(quests);
    }
    let npcs = format_known_npcs(&state.known_npcs);
    if npcs != "Known NPCs: None" {
        parts.push(npcs);
    }
    let events = format_list_context("Event Summary", &state.event_summary);
    if events != "Event Summary: None" {
        parts.push(events);
    }

    parts.join("\n\n")
}

/// Party roster, location, and combat block
pub fn dynamic_context(state: &GameState) -> String {
    let party_lines: Vec<String> = state.party.iter().map(format_party_member).collect();
    let party = format!("Party Members & Status:\n{}", party_lines.join("\n"));

    let location = format!(
        "Current Location: {}\nDescription: {}",
        state.current_location.name, state.current_location.description
    );

    let combat = format_combat_state(&state.combat, state);

    [party, location, combat].join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Combatant;

    fn combat_fixture() -> GameState {
        let mut state = GameState::new("c1");
        state.party.push(PartyMember {
            id: "pc-1".into(),
            name: "Thorin".into(),
            race: "Dwarf".into(),
            class_name: "Fighter".into(),
            level: 3,
            current_hp: 24,
            max_hp: 30,
            temp_hp: 0,
            conditions: vec![],
        });
        state.combat = CombatState {
            is_active: true,
            round_number: 2,
            current_turn_index: 1,
            combatants: vec![
                Combatant {
                    id: "pc-1".into(),
                    name: "Thorin".into(),
                    initiative: 15,
                    is_player: true,
                    current_hp: 24,
                    max_hp: 30,
                    conditions: vec![],
                },
                Combatant {
                    id: "orc-1".into(),
                    name: "Orc".into(),
                    initiative: 12,
                    is_player: false,
                    current_hp: 0,
                    max_hp: 15,
                    conditions: vec!["defeated".into()],
                },
            ],
        };
        state
    }

    #[test]
    fn active_combatant_is_marked() {
        let state = combat_fixture();
        let rendered = format_combat_state(&state.combat, &state);
        assert!(rendered.contains("-> Orc (ID: orc-1, Init: 12)"));
        assert!(rendered.contains("   Thorin (ID: pc-1, Init: 15)"));
        assert!(rendered.contains("[Defeated]"));
        // The defeated marker condition is not repeated in the list
        assert!(!rendered.contains("Cond: defeated"));
    }

    #[test]
    fn out_of_range_turn_index_resets_to_first() {
        let mut state = combat_fixture();
        state.combat.current_turn_index = 99;
        let rendered = format_combat_state(&state.combat, &state);
        assert!(rendered.contains("Current Turn: Thorin"));
    }

    #[test]
    fn pc_status_reads_from_party_roster() {
        let mut state = combat_fixture();
        state.party[0].current_hp = 3;
        state.party[0].conditions.push("poisoned".into());
        let rendered = format_combat_state(&state.combat, &state);
        assert!(rendered.contains("Thorin (ID: pc-1, Init: 15) (HP: 3/30, Cond: poisoned)"));
    }

    #[test]
    fn inactive_combat_renders_one_line() {
        let state = GameState::new("c1");
        assert_eq!(
            format_combat_state(&state.combat, &state),
            "Combat Status: Not Active"
        );
    }

    #[test]
    fn static_context_skips_empty_sections() {
        let mut state = GameState::new("c1");
        state.campaign_goal = "Recover the shattered crown".into();
        let rendered = static_context(&state);
        assert!(rendered.starts_with("Campaign Goal: Recover the shattered crown"));
        assert!(!rendered.contains("World Lore"));
        assert!(!rendered.contains("Known NPCs"));

        state.world_lore.push("The crown was forged in Emberfall".into());
        let rendered = static_context(&state);
        assert!(rendered.contains("World Lore:\n- The crown was forged in Emberfall"));
    }
}
