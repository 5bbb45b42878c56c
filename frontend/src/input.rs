use std::collections::HashMap;

use phosphor_core::core::machine::InputButton;
use sdl2::keyboard::Scancode;

/// Maps SDL scancodes to machine button IDs.
pub struct KeyMap {
    map: HashMap<Scancode, u8>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Bind a scancode to a machine button ID.
    pub fn bind(&mut self, scancode: Scancode, button_id: u8) {
        self.map.insert(scancode, button_id);
    }

    /// Look up the machine button ID for a scancode.
    pub fn get(&self, scancode: Scancode) -> Option<u8> {
        self.map.get(&scancode).copied()
    }
}

/// Build a default key map for a machine's input buttons.
/// Uses name-based matching: common button names across machines
/// get consistent default bindings without game-specific knowledge.
pub fn default_key_map(buttons: &[InputButton]) -> KeyMap {
    let mut km = KeyMap::new();

    for button in buttons {
        let scancode = match button.name {
            // Player 1 joystick + buttons
            "P1 Left" => Some(Scancode::Left),
            "P1 Right" => Some(Scancode::Right),
            "P1 Up" => Some(Scancode::Up),
            "P1 Down" => Some(Scancode::Down),
            "P1 A" => Some(Scancode::Z),
            "P1 B" => Some(Scancode::X),
            "P1 C" => Some(Scancode::C),
            "P1 D" => Some(Scancode::V),
            "P1 Start" => Some(Scancode::Num1),
            "P1 Select" => Some(Scancode::Num3),

            // Player 2 joystick + buttons
            "P2 Left" => Some(Scancode::J),
            "P2 Right" => Some(Scancode::L),
            "P2 Up" => Some(Scancode::I),
            "P2 Down" => Some(Scancode::K),
            "P2 A" => Some(Scancode::N),
            "P2 B" => Some(Scancode::M),
            "P2 C" => Some(Scancode::Comma),
            "P2 D" => Some(Scancode::Period),
            "P2 Start" => Some(Scancode::Num2),
            "P2 Select" => Some(Scancode::Num4),

            // System
            "Coin" => Some(Scancode::Num5),

            _ => None,
        };

        if let Some(sc) = scancode {
            km.bind(sc, button.id);
        }
    }

    km
}
