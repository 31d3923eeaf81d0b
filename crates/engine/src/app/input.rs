use super::movement::MovementFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Quit,
}

const ACTION_COUNT: usize = 5;

/// Level-triggered key state. Auto-repeated key-down events simply re-assert
/// a flag that is already set, so movement never restarts from repeats.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    /// The four directional flags as seen by the boundary resolver on the
    /// next tick. Chords are preserved as independent booleans.
    pub(crate) fn movement_flags(&self) -> MovementFlags {
        MovementFlags {
            up: self.is_down(InputAction::MoveUp),
            down: self.is_down(InputAction::MoveDown),
            left: self.is_down(InputAction::MoveLeft),
            right: self.is_down(InputAction::MoveRight),
        }
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Quit => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_flags_mirror_action_state() {
        let mut states = ActionStates::default();
        states.set(InputAction::MoveUp, true);
        states.set(InputAction::MoveRight, true);

        let flags = states.movement_flags();
        assert!(flags.up);
        assert!(flags.right);
        assert!(!flags.down);
        assert!(!flags.left);
    }

    #[test]
    fn repeated_set_is_idempotent() {
        let mut states = ActionStates::default();
        states.set(InputAction::MoveLeft, true);
        states.set(InputAction::MoveLeft, true);
        assert!(states.movement_flags().left);

        states.set(InputAction::MoveLeft, false);
        assert!(!states.movement_flags().left);
    }
}
