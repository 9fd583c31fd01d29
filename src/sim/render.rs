use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph, Widget};

use super::Simulator;
use super::keymap::HELP;
use crate::log_buffer::LogBuffer;

const STATUS_ROWS: u16 = 2;
const LOG_ROWS: u16 = 8;

/// Part of the terminal given to the simulated screens.
pub fn desktop_area(area: Rect) -> Rect {
    let [desktop, _, _] = split(area);
    desktop
}

fn split(area: Rect) -> [Rect; 3] {
    Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(STATUS_ROWS),
        Constraint::Length(LOG_ROWS),
    ])
    .areas(area)
}

pub fn draw(frame: &mut Frame<'_>, sim: &Simulator, log: Option<&LogBuffer>) {
    let area = frame.area();
    render(area, frame.buffer_mut(), sim, log);
}

pub fn render(area: Rect, buffer: &mut Buffer, sim: &Simulator, log: Option<&LogBuffer>) {
    let [desktop, status, log_area] = split(area);
    render_desktop(desktop, buffer, sim);
    render_status(status, buffer, sim);
    if let Some(log) = log {
        let lines: Vec<Line> = log
            .tail(usize::from(LOG_ROWS.saturating_sub(2)))
            .into_iter()
            .map(Line::from)
            .collect();
        Paragraph::new(lines)
            .block(Block::bordered().title(" log "))
            .render(log_area, buffer);
    }
}

fn fill(buffer: &mut Buffer, rect: Rect, style: Style) -> Option<Rect> {
    let clipped = rect.intersection(buffer.area);
    if clipped.is_empty() {
        return None;
    }
    buffer.set_style(clipped, style);
    Some(clipped)
}

fn label(buffer: &mut Buffer, rect: Rect, text: &str, style: Style) {
    let Some(clipped) = fill(buffer, rect, style) else {
        return;
    };
    let y = clipped.y + clipped.height / 2;
    buffer.set_stringn(clipped.x, y, text, usize::from(clipped.width), style);
}

fn render_desktop(area: Rect, buffer: &mut Buffer, sim: &Simulator) {
    let screens = sim.layout().screens().borrow();
    for (index, screen) in screens.connected().enumerate() {
        let shade = if index % 2 == 0 {
            Color::Rgb(24, 24, 32)
        } else {
            Color::Rgb(32, 32, 40)
        };
        let marker = if screens.is_primary(screen.id()) {
            " *primary"
        } else {
            ""
        };
        let text = format!(" {} #{}{}", screen.connector(), screen.id(), marker);
        let geometry = screen.geometry().intersection(area);
        if let Some(clipped) = fill(buffer, geometry, Style::default().bg(shade)) {
            buffer.set_stringn(
                clipped.x,
                clipped.y + clipped.height / 2,
                text,
                usize::from(clipped.width),
                Style::default().bg(shade).fg(Color::Gray),
            );
        }
    }
    drop(screens);

    for window in sim.windows() {
        let (text, color) = match (window.active, window.maximized) {
            (true, true) => (" active (max)", Color::Blue),
            (true, false) => (" active", Color::Blue),
            _ => (" window", Color::DarkGray),
        };
        label(
            buffer,
            window.geometry.intersection(area),
            text,
            Style::default().bg(color).fg(Color::White),
        );
    }

    for view in sim.layout().views() {
        let selected = sim.selected() == Some(view.panel());
        if view.is_visible() {
            let mode = view
                .machine()
                .mode()
                .map_or_else(|| "starting".to_string(), |m| m.to_string());
            let mut style = Style::default().add_modifier(Modifier::REVERSED);
            if selected {
                style = style.fg(Color::Yellow);
            }
            let text = format!(" #{} {} ", view.panel(), mode);
            let geometry = view.geometry().intersection(area);
            if let Some(clipped) = fill(buffer, geometry, style) {
                buffer.set_stringn(clipped.x, clipped.y, text, usize::from(clipped.width), style);
            }
        } else if let Some(sentinel) = view.machine().sentinel().filter(|s| s.is_active()) {
            let mut style = Style::default().add_modifier(Modifier::DIM).bg(Color::DarkGray);
            if selected {
                style = style.fg(Color::Yellow);
            }
            fill(buffer, sentinel.geometry().intersection(area), style);
        }
    }
}

fn render_status(area: Rect, buffer: &mut Buffer, sim: &Simulator) {
    let selected = match sim.selected().and_then(|p| sim.layout().view(p)) {
        Some(view) => {
            let machine = view.machine();
            format!(
                "panel #{} on screen #{} {} | hidden={} block={} raised={} edges={} drag={} layout={}",
                view.panel(),
                view.screen(),
                view.edge(),
                machine.is_hidden(),
                machine.block_hiding(),
                machine.is_raised_temporarily(),
                machine.supports_edges(),
                sim.is_dragging(),
                sim.layout().is_active(),
            )
        }
        None => format!(
            "no panel selected | {} views, {} definitions",
            sim.layout().views_count(),
            sim.layout().registry().len()
        ),
    };
    Paragraph::new(vec![
        Line::from(selected),
        Line::styled(HELP, Style::default().fg(Color::DarkGray)),
    ])
    .render(area, buffer);
}
