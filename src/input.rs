use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::model::View;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Quit,
    SetView(View),
    NextView,
    PrevView,
    InputChar(char),
    InputBackspace,
    Submit,
    Refresh,
    StopPolling,
    ExportReport,
    ClearMessage,
}

pub(crate) fn map_key(view: View, key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    // The Input view owns the keyboard for text entry, so navigation there
    // is arrows/Tab only and letters land in the location buffer.
    if view == View::Input {
        return match key.code {
            KeyCode::Enter => Some(Action::Submit),
            KeyCode::Esc => Some(Action::Quit),
            KeyCode::Backspace => Some(Action::InputBackspace),
            KeyCode::Left => Some(Action::PrevView),
            KeyCode::Right | KeyCode::Tab => Some(Action::NextView),
            KeyCode::Char(ch) if !ch.is_control() => Some(Action::InputChar(ch)),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Left => Some(Action::PrevView),
        KeyCode::Right | KeyCode::Tab => Some(Action::NextView),
        KeyCode::Char('1') => Some(Action::SetView(View::Input)),
        KeyCode::Char('2') => Some(Action::SetView(View::Predictions)),
        KeyCode::Char('3') => Some(Action::SetView(View::Statistics)),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::Refresh),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(Action::StopPolling),
        KeyCode::Char('e') | KeyCode::Char('E') => Some(Action::ExportReport),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(Action::ClearMessage),
        _ => None,
    }
}
