use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Which physical hand a tracked controller reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn other(self) -> Handedness {
        match self {
            Handedness::Left => Handedness::Right,
            Handedness::Right => Handedness::Left,
        }
    }
}

bitflags! {
    /// Set of hands a feature applies to.
    pub struct HandSet: u8 {
        const LEFT = 0b01;
        const RIGHT = 0b10;
    }
}

impl HandSet {
    pub fn contains_hand(self, hand: Handedness) -> bool {
        match hand {
            Handedness::Left => self.contains(HandSet::LEFT),
            Handedness::Right => self.contains(HandSet::RIGHT),
        }
    }
}

impl From<Handedness> for HandSet {
    fn from(hand: Handedness) -> HandSet {
        match hand {
            Handedness::Left => HandSet::LEFT,
            Handedness::Right => HandSet::RIGHT,
        }
    }
}

/// Hand selection as it appears in options files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnabledHands {
    Left,
    Right,
    Both,
}

impl EnabledHands {
    pub fn to_set(self) -> HandSet {
        match self {
            EnabledHands::Left => HandSet::LEFT,
            EnabledHands::Right => HandSet::RIGHT,
            EnabledHands::Both => HandSet::LEFT | HandSet::RIGHT,
        }
    }
}

/// Semantic names of the mapped gamepad buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonName {
    Trigger,
    Grip,
    Joystick,
    ButtonX,
    ButtonY,
    ButtonA,
    ButtonB,
}

// Index-aligned to the hardware button array of the supported controller
// profile; `None` entries are unmapped reserved slots.
const LEFT_BUTTONS: [Option<ButtonName>; 8] = [
    Some(ButtonName::Trigger),
    Some(ButtonName::Grip),
    None,
    Some(ButtonName::Joystick),
    Some(ButtonName::ButtonX),
    Some(ButtonName::ButtonY),
    None,
    None,
];

const RIGHT_BUTTONS: [Option<ButtonName>; 8] = [
    Some(ButtonName::Trigger),
    Some(ButtonName::Grip),
    None,
    Some(ButtonName::Joystick),
    Some(ButtonName::ButtonA),
    Some(ButtonName::ButtonB),
    None,
    None,
];

/// The button mapping for one hand.
pub fn buttons_mapping(handedness: Handedness) -> &'static [Option<ButtonName>; 8] {
    match handedness {
        Handedness::Left => &LEFT_BUTTONS,
        Handedness::Right => &RIGHT_BUTTONS,
    }
}

/// Options for the controllers manager.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerOptions {
    /// The user's dominant hand; `skilled_hand()` resolves to it.
    pub user_handedness: Handedness,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        ManagerOptions {
            user_handedness: Handedness::Right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mappings_are_index_aligned() {
        assert_eq!(LEFT_BUTTONS.len(), RIGHT_BUTTONS.len());
        assert_eq!(
            buttons_mapping(Handedness::Left)[4],
            Some(ButtonName::ButtonX)
        );
        assert_eq!(
            buttons_mapping(Handedness::Right)[4],
            Some(ButtonName::ButtonA)
        );
        assert_eq!(buttons_mapping(Handedness::Right)[2], None);
    }

    #[test]
    fn test_enabled_hands_to_set() {
        assert!(EnabledHands::Both.to_set().contains_hand(Handedness::Left));
        assert!(EnabledHands::Both.to_set().contains_hand(Handedness::Right));
        assert!(!EnabledHands::Right.to_set().contains_hand(Handedness::Left));
    }

    #[test]
    fn test_enabled_hands_deserializes_lowercase() {
        let parsed: EnabledHands = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(parsed, EnabledHands::Both);
    }
}
