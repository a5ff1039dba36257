//! Terminal viewer for styled tables, one tab per table.

mod components;
mod state;

use std::io;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Direction, Layout, Rect},
};

use components::{StatusBar, TabBar, TableView};
pub use state::ViewerState;

/// Result of handling an event
#[derive(Debug, Clone, PartialEq)]
pub enum EventResult {
    /// Event was handled, continue
    Handled,
    /// Event was not handled, pass to the next component
    NotHandled,
    /// Request viewer exit
    Exit,
}

/// Trait for components that can handle input and render
pub trait Component {
    fn handle_key(&mut self, key: KeyEvent, state: &mut ViewerState) -> EventResult;

    fn render(&mut self, frame: &mut Frame, area: Rect, state: &ViewerState);
}

pub struct Viewer {
    state: ViewerState,
    tab_bar: TabBar,
    table_view: TableView,
    status_bar: StatusBar,
}

impl Viewer {
    pub fn new(state: ViewerState) -> Self {
        Self {
            state,
            tab_bar: TabBar,
            table_view: TableView,
            status_bar: StatusBar,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// runs the viewer's main loop until the user quits
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> color_eyre::Result<()> {
        while !self.state.exit {
            terminal.draw(|frame| self.draw(frame))?;
            self.handle_events()?;
        }
        Ok(())
    }

    pub fn draw(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Tab bar
                Constraint::Min(0),    // Table
                Constraint::Length(2), // Status bar
            ])
            .split(frame.area());

        self.tab_bar.render(frame, chunks[0], &self.state);
        self.table_view.render(frame, chunks[1], &self.state);
        self.status_bar.render(frame, chunks[2], &self.state);
    }

    fn handle_events(&mut self) -> io::Result<()> {
        if let Event::Key(key_event) = event::read()?
            && key_event.kind == KeyEventKind::Press
        {
            self.handle_key_event(key_event);
        }
        Ok(())
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) {
        let quit = matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL));
        if quit {
            self.state.exit = true;
            return;
        }

        for component in [
            &mut self.tab_bar as &mut dyn Component,
            &mut self.table_view,
            &mut self.status_bar,
        ] {
            match component.handle_key(key, &mut self.state) {
                EventResult::Handled => return,
                EventResult::Exit => {
                    self.state.exit = true;
                    return;
                }
                EventResult::NotHandled => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};
    use sensitivity_core::{ModelError, Params, SensitivityAnalyzer, SensitivityValues};

    fn viewer() -> Viewer {
        let values = SensitivityValues::new()
            .with("value1", [1.0, 2.0])
            .with("value2", [4.0, 5.0])
            .with("value3", [6.0, 7.0]);
        let analyzer = SensitivityAnalyzer::builder(values, |p: &Params| -> Result<f64, ModelError> {
            Ok(p.value("value1")? + p.value("value2")? + p.value("value3")? + 10.0)
        })
        .result_name("my_res")
        .build()
        .unwrap();
        Viewer::new(ViewerState::from_analyzer(&analyzer).unwrap())
    }

    fn press(viewer: &mut Viewer, code: KeyCode) {
        viewer.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_tab_navigation_wraps() {
        let mut viewer = viewer();
        assert_eq!(viewer.state().tables.len(), 3);

        press(&mut viewer, KeyCode::Right);
        assert_eq!(viewer.state().active, 1);
        press(&mut viewer, KeyCode::Tab);
        press(&mut viewer, KeyCode::Tab);
        assert_eq!(viewer.state().active, 0, "wraps past the last table");
        press(&mut viewer, KeyCode::Left);
        assert_eq!(viewer.state().active, 2, "wraps before the first table");
        press(&mut viewer, KeyCode::Char('2'));
        assert_eq!(viewer.state().active, 1);
        press(&mut viewer, KeyCode::Char('9'));
        assert_eq!(viewer.state().active, 1, "out of range jump is ignored");
    }

    #[test]
    fn test_scroll_resets_on_tab_change() {
        let mut viewer = viewer();
        press(&mut viewer, KeyCode::Down);
        assert_eq!(viewer.state().scroll, 1);
        press(&mut viewer, KeyCode::Down);
        assert_eq!(viewer.state().scroll, 1, "last row stays visible");
        press(&mut viewer, KeyCode::Right);
        assert_eq!(viewer.state().scroll, 0);
        press(&mut viewer, KeyCode::Up);
        assert_eq!(viewer.state().scroll, 0);
    }

    #[test]
    fn test_quit_keys() {
        for key in [
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE),
            KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE),
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        ] {
            let mut viewer = viewer();
            viewer.handle_key_event(key);
            assert!(viewer.state().exit, "{key:?} quits");
        }

        let mut viewer = viewer();
        press(&mut viewer, KeyCode::Char('c'));
        assert!(!viewer.state().exit);
    }

    #[test]
    fn test_draw_shows_active_table() {
        let mut viewer = viewer();
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| viewer.draw(frame)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("value1 vs. value2"));
        assert!(text.contains("21.5"));
        assert!(text.contains("q: quit"));
    }
}
