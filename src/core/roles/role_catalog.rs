// Self-assign game roles offered on the role panel.
//
// Buttons carry the `custom_id` below. The role itself is looked up on the
// server by its exact name, so renaming a role on Discord means updating it here.

/// Button colour, mirrored onto serenity's `ButtonStyle` by the Discord layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRole {
    pub custom_id: &'static str,
    pub label: &'static str,
    pub role_name: &'static str,
    pub emoji: &'static str,
    pub style: PanelStyle,
}

pub const BUTTONS_PER_ROW: usize = 4;

pub const GAME_ROLES: [GameRole; 8] = [
    GameRole {
        custom_id: "role_rpg",
        label: "RPG",
        role_name: "🗡️ Sword Hero (RPG)",
        emoji: "🗡️",
        style: PanelStyle::Primary,
    },
    GameRole {
        custom_id: "role_mmo",
        label: "MMO",
        role_name: "🎒 World Wanderer (MMO)",
        emoji: "🎒",
        style: PanelStyle::Success,
    },
    GameRole {
        custom_id: "role_shooter",
        label: "Shooter",
        role_name: "🎯 Sharpshooter (Shooter)",
        emoji: "🎯",
        style: PanelStyle::Primary,
    },
    GameRole {
        custom_id: "role_moba",
        label: "MOBA",
        role_name: "⚡ Arena Warrior (MOBA)",
        emoji: "⚡",
        style: PanelStyle::Danger,
    },
    GameRole {
        custom_id: "role_rts",
        label: "RTS",
        role_name: "♟️ Realm Tactician (RTS)",
        emoji: "♟️",
        style: PanelStyle::Secondary,
    },
    GameRole {
        custom_id: "role_ccg",
        label: "CCG (Cards)",
        role_name: "🃏 Deck Master (CCG)",
        emoji: "🃏",
        style: PanelStyle::Secondary,
    },
    GameRole {
        custom_id: "role_platformer",
        label: "Platformer",
        role_name: "🦘 Bouncy Platformer",
        emoji: "🦘",
        style: PanelStyle::Secondary,
    },
    GameRole {
        custom_id: "role_sandbox",
        label: "Sandbox",
        role_name: "🧱 Realm Builder",
        emoji: "🧱",
        style: PanelStyle::Primary,
    },
];

pub fn find_by_custom_id(custom_id: &str) -> Option<&'static GameRole> {
    GAME_ROLES.iter().find(|role| role.custom_id == custom_id)
}

/// Roles grouped into button rows, in panel order.
pub fn panel_rows() -> Vec<&'static [GameRole]> {
    GAME_ROLES.chunks(BUTTONS_PER_ROW).collect()
}

/// Whether a click should add or remove the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Add,
    Remove,
}

pub fn toggle_for(has_role: bool) -> Toggle {
    if has_role {
        Toggle::Remove
    } else {
        Toggle::Add
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_roles_in_two_rows() {
        let rows = panel_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 4);
        assert_eq!(rows[0][0].custom_id, "role_rpg");
        assert_eq!(rows[1][3].custom_id, "role_sandbox");
    }

    #[test]
    fn custom_ids_are_unique_and_resolvable() {
        for role in &GAME_ROLES {
            assert_eq!(find_by_custom_id(role.custom_id), Some(role));
        }
        assert!(find_by_custom_id("role_unknown").is_none());
    }

    #[test]
    fn toggle_flips() {
        assert_eq!(toggle_for(true), Toggle::Remove);
        assert_eq!(toggle_for(false), Toggle::Add);
    }
}
