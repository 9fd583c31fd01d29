use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Everything the simulator can be asked to do from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimAction {
    Quit,
    /// Connects or disconnects the screen in the given slot.
    ToggleScreen(usize),
    CyclePrimary,
    AddPrimaryPanel,
    AddPinnedPanel,
    RemovePanel,
    SelectNext,
    CycleMode,
    TogglePin,
    RaiseTemporarily,
    ToggleBlockHiding,
    ToggleDrag,
    ToggleEdges,
    RecreateView,
    ToggleActiveWindow,
    ToggleMaximized,
    ToggleOtherWindow,
    DesktopChanged,
    ActivityChanged,
    ToggleLayoutActive,
}

pub const HELP: &str = "q quit | 1-4 screen | p primary | a/n add | d del | tab sel | v mode | o pin | r raise | b block | g drag | e edges | c recreate | w/m/x windows | k desk | t activity | l layout";

pub fn action_for(key: KeyEvent) -> Option<SimAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => Some(SimAction::Quit),
            _ => None,
        };
    }
    let action = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => SimAction::Quit,
        KeyCode::Char(c @ '1'..='4') => SimAction::ToggleScreen(usize::from(c as u8 - b'1')),
        KeyCode::Char('p') => SimAction::CyclePrimary,
        KeyCode::Char('a') => SimAction::AddPrimaryPanel,
        KeyCode::Char('n') => SimAction::AddPinnedPanel,
        KeyCode::Char('d') | KeyCode::Delete => SimAction::RemovePanel,
        KeyCode::Tab => SimAction::SelectNext,
        KeyCode::Char('v') => SimAction::CycleMode,
        KeyCode::Char('o') => SimAction::TogglePin,
        KeyCode::Char('r') => SimAction::RaiseTemporarily,
        KeyCode::Char('b') => SimAction::ToggleBlockHiding,
        KeyCode::Char('g') => SimAction::ToggleDrag,
        KeyCode::Char('e') => SimAction::ToggleEdges,
        KeyCode::Char('c') => SimAction::RecreateView,
        KeyCode::Char('w') => SimAction::ToggleActiveWindow,
        KeyCode::Char('m') => SimAction::ToggleMaximized,
        KeyCode::Char('x') => SimAction::ToggleOtherWindow,
        KeyCode::Char('k') => SimAction::DesktopChanged,
        KeyCode::Char('t') => SimAction::ActivityChanged,
        KeyCode::Char('l') => SimAction::ToggleLayoutActive,
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn digits_map_to_screen_slots() {
        assert_eq!(
            action_for(key(KeyCode::Char('1'))),
            Some(SimAction::ToggleScreen(0))
        );
        assert_eq!(
            action_for(key(KeyCode::Char('4'))),
            Some(SimAction::ToggleScreen(3))
        );
        assert_eq!(action_for(key(KeyCode::Char('5'))), None);
    }

    #[test]
    fn ctrl_c_quits_but_plain_c_recreates() {
        assert_eq!(
            action_for(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(SimAction::Quit)
        );
        assert_eq!(
            action_for(key(KeyCode::Char('c'))),
            Some(SimAction::RecreateView)
        );
    }
}
