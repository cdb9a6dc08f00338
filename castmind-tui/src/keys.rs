//! Keybinding definitions for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextView,
    PrevView,
    SwitchView(usize),
    MoveUp,
    MoveDown,
    PrevPage,
    NextPage,
    Select,
    SelectAll,
    MarkRead,
    MarkUnread,
    FetchFeed,
    FetchAll,
    DeleteItem,
    NewItem,
    EditItem,
    CycleStatus,
    CycleTemplate,
    ExportTemplate,
    OpenSearch,
    StartScheduler,
    StopScheduler,
    ProcessAll,
    NextTab,
    Refresh,
    Confirm,
    Cancel,
}

/// Keys while the search box or the feed form has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Char(char),
    Backspace,
    NextField,
    PrevField,
    /// Left/right on a choice field.
    Adjust(bool),
    Submit,
    Cancel,
}

pub fn map_key(event: KeyEvent) -> Option<Action> {
    let KeyEvent { code, modifiers, .. } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Some(Action::Quit),
            KeyCode::Char('r') => Some(Action::Refresh),
            _ => None,
        };
    }

    match code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('/') => Some(Action::OpenSearch),
        KeyCode::Char('n') => Some(Action::NewItem),
        KeyCode::Char('e') => Some(Action::EditItem),
        KeyCode::Char('d') => Some(Action::DeleteItem),
        KeyCode::Char('f') => Some(Action::FetchFeed),
        KeyCode::Char('F') => Some(Action::FetchAll),
        KeyCode::Char('r') => Some(Action::MarkRead),
        KeyCode::Char('u') => Some(Action::MarkUnread),
        KeyCode::Char('a') => Some(Action::SelectAll),
        KeyCode::Char('s') => Some(Action::CycleStatus),
        KeyCode::Char('t') => Some(Action::CycleTemplate),
        KeyCode::Char('c') => Some(Action::ExportTemplate),
        KeyCode::Char('S') => Some(Action::StartScheduler),
        KeyCode::Char('X') => Some(Action::StopScheduler),
        KeyCode::Char('P') => Some(Action::ProcessAll),
        KeyCode::Char('o') => Some(Action::NextTab),
        KeyCode::Char('[') => Some(Action::PrevPage),
        KeyCode::Char(']') => Some(Action::NextPage),
        KeyCode::Enter | KeyCode::Char('y') => Some(Action::Confirm),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Tab => Some(Action::NextView),
        KeyCode::BackTab => Some(Action::PrevView),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::MoveDown),
        KeyCode::Left | KeyCode::Char('h') => Some(Action::PrevPage),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::NextPage),
        KeyCode::Char(' ') => Some(Action::Select),
        KeyCode::Char(c) if c.is_ascii_digit() => {
            let idx = match c {
                '1' => 0,
                '2' => 1,
                '3' => 2,
                '4' => 3,
                '5' => 4,
                _ => return None,
            };
            Some(Action::SwitchView(idx))
        }
        _ => None,
    }
}

pub fn map_input_key(event: KeyEvent) -> Option<InputAction> {
    let KeyEvent { code, modifiers, .. } = event;
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Some(InputAction::Cancel),
            _ => None,
        };
    }
    match code {
        KeyCode::Char(c) => Some(InputAction::Char(c)),
        KeyCode::Backspace => Some(InputAction::Backspace),
        KeyCode::Tab | KeyCode::Down => Some(InputAction::NextField),
        KeyCode::BackTab | KeyCode::Up => Some(InputAction::PrevField),
        KeyCode::Left => Some(InputAction::Adjust(false)),
        KeyCode::Right => Some(InputAction::Adjust(true)),
        KeyCode::Enter => Some(InputAction::Submit),
        KeyCode::Esc => Some(InputAction::Cancel),
        _ => None,
    }
}
