use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs},
};
use sensitivity_core::{Rgb, StyledCell, StyledTable};

use super::state::ViewerState;
use super::{Component, EventResult};

const HELP_TEXT: &str = "←/→/Tab: switch table | 1-9: jump | j/k: scroll | q: quit";

fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

fn cell_style(cell: &StyledCell) -> Style {
    match cell.background {
        Some(background) => Style::default().bg(rgb(background)).fg(rgb(cell.foreground)),
        None => Style::default(),
    }
}

pub struct TabBar;

impl Component for TabBar {
    fn handle_key(&mut self, key: KeyEvent, state: &mut ViewerState) -> EventResult {
        match key.code {
            KeyCode::Right | KeyCode::Tab | KeyCode::Char('l') => {
                state.next_tab();
                EventResult::Handled
            }
            KeyCode::Left | KeyCode::BackTab | KeyCode::Char('h') => {
                state.previous_tab();
                EventResult::Handled
            }
            KeyCode::Char(c @ '1'..='9') => {
                state.select(c as usize - '1' as usize);
                EventResult::Handled
            }
            _ => EventResult::NotHandled,
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, state: &ViewerState) {
        let titles: Vec<Line> = state
            .tables
            .iter()
            .enumerate()
            .map(|(idx, (key, _))| {
                let content = format!("[{}] {}", idx + 1, key);
                if idx == state.active {
                    Line::from(Span::styled(
                        content,
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(Span::styled(content, Style::default().fg(Color::Gray)))
                }
            })
            .collect();

        let tabs = Tabs::new(titles)
            .block(
                Block::default()
                    .borders(Borders::BOTTOM)
                    .title(state.title.clone()),
            )
            .select(state.active)
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );

        frame.render_widget(tabs, area);
    }
}

pub struct TableView;

impl TableView {
    fn widths(table: &StyledTable) -> Vec<Constraint> {
        let label_width = table
            .row_labels
            .iter()
            .map(|l| l.chars().count())
            .chain(std::iter::once(table.row_title.chars().count()))
            .max()
            .unwrap_or(0);
        let mut widths = vec![Constraint::Length(label_width as u16 + 1)];
        for (col, label) in table.column_labels.iter().enumerate() {
            let width = table
                .cells
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.text.chars().count())
                .chain(std::iter::once(label.chars().count()))
                .max()
                .unwrap_or(0);
            widths.push(Constraint::Length(width as u16 + 2));
        }
        widths
    }
}

impl Component for TableView {
    fn handle_key(&mut self, key: KeyEvent, state: &mut ViewerState) -> EventResult {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                state.scroll_down();
                EventResult::Handled
            }
            KeyCode::Up | KeyCode::Char('k') => {
                state.scroll_up();
                EventResult::Handled
            }
            _ => EventResult::NotHandled,
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, state: &ViewerState) {
        let Some(table) = state.active_table() else {
            frame.render_widget(Paragraph::new("No tables to show"), area);
            return;
        };

        let header = Row::new(
            std::iter::once(Cell::from(table.row_title.clone()))
                .chain(table.column_labels.iter().map(|l| Cell::from(l.clone()))),
        )
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

        let rows = table
            .row_labels
            .iter()
            .zip(&table.cells)
            .skip(state.scroll)
            .map(|(label, cells)| {
                Row::new(
                    std::iter::once(
                        Cell::from(label.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
                    )
                    .chain(cells.iter().map(|cell| {
                        Cell::from(Line::from(cell.text.clone()).right_aligned())
                            .style(cell_style(cell))
                    })),
                )
            });

        let title = match &table.column_title {
            Some(column_title) => format!("{} (columns: {column_title})", table.caption),
            None => table.caption.clone(),
        };
        let widget = Table::new(rows, Self::widths(table))
            .header(header)
            .column_spacing(0)
            .block(Block::default().borders(Borders::ALL).title(title));

        frame.render_widget(widget, area);
    }
}

pub struct StatusBar;

impl Component for StatusBar {
    fn handle_key(&mut self, _key: KeyEvent, _state: &mut ViewerState) -> EventResult {
        EventResult::NotHandled
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, _state: &ViewerState) {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            HELP_TEXT,
            Style::default().fg(Color::DarkGray),
        )))
        .block(Block::default().borders(Borders::TOP));
        frame.render_widget(paragraph, area);
    }
}
