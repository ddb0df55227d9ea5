//! Layout components (header, resume banner, status bar)

use crate::app::{App, Row};
use crate::platform::{GSTIN_SHORTCUT, SAVE_SHORTCUT, SEND_OTP_SHORTCUT, VERIFY_OTP_SHORTCUT};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use vendor_onboard::state::{names, FieldKind, NoticeLevel, Phase, RESUME_MESSAGE};

/// Screen regions of the wizard
pub struct WizardLayout {
    pub header: Rect,
    pub banner: Option<Rect>,
    pub body: Rect,
    pub status: Rect,
}

/// Split the screen, reserving room for the resume banner when it shows
pub fn create_layout(area: Rect, show_banner: bool) -> WizardLayout {
    let banner_height = if show_banner { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),             // Header
            Constraint::Length(banner_height), // Resume banner
            Constraint::Min(0),                // Form
            Constraint::Length(1),             // Status bar
        ])
        .split(area);

    WizardLayout {
        header: chunks[0],
        banner: show_banner.then_some(chunks[1]),
        body: chunks[2],
        status: chunks[3],
    }
}

/// Draw the step indicator
pub fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let current = app.wizard.current_step();
    let titles = app.wizard.schema().step_titles();

    let mut steps = Vec::new();
    for step in 1..=titles.len() {
        let style = if step == current {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else if step < current {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let marker = if step < current {
            format!(" ✓{step} ")
        } else {
            format!(" {step} ")
        };
        steps.push(Span::styled(marker, style));
        if step < titles.len() {
            steps.push(Span::styled("─", Style::default().fg(Color::DarkGray)));
        }
    }

    let title = app.wizard.schema().step_title(current).unwrap_or_default();
    let lines = vec![
        Line::from(steps),
        Line::from(vec![
            Span::styled(
                format!("Step {current} of {}: ", app.wizard.step_count()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                title,
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
    ];

    let block = Block::default()
        .title(" Vendor Onboarding ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Draw the restored-session banner
pub fn draw_banner(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Welcome back ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let text = Paragraph::new(Span::styled(RESUME_MESSAGE, Style::default().fg(Color::Blue)))
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(text, area);
}

/// Draw the status bar
pub fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![];

    let pending = app.wizard.pending();
    let activity = if app.wizard.phase() == Phase::Submitting {
        Some("Submitting application...")
    } else if pending.send_code {
        Some("Sending OTP...")
    } else if pending.verify_code {
        Some("Verifying OTP...")
    } else if pending.gstin_lookup {
        Some("Verifying GSTIN...")
    } else {
        None
    };

    match activity {
        Some(text) => {
            spans.push(Span::styled(" ◌ ", Style::default().fg(Color::Yellow)));
            spans.push(Span::styled(text, Style::default().fg(Color::Yellow)));
            spans.push(Span::raw("  "));
        }
        None => spans.push(Span::styled(" ● ", Style::default().fg(Color::Green))),
    }

    spans.push(Span::styled(
        get_row_hints(app),
        Style::default().fg(Color::DarkGray),
    ));

    if let Some(ref notice) = app.status {
        let color = match notice.level {
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Info => Color::Cyan,
            NoticeLevel::Error => Color::Red,
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{}: {}", notice.title, notice.message),
            Style::default().fg(color),
        ));
    }

    let status = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status, area);
}

/// Key hints for the focused row
fn get_row_hints(app: &App) -> String {
    let edit = match app.active() {
        Some(Row::OtpCode) => {
            format!("0-9: code | {SEND_OTP_SHORTCUT}: send | {VERIFY_OTP_SHORTCUT}: verify")
        }
        Some(Row::Field(name)) => match app.wizard.schema().field(name).map(|f| &f.kind) {
            Some(FieldKind::Boolean) => "Space: toggle".to_string(),
            Some(FieldKind::Choice(_)) => "←/→: choose".to_string(),
            Some(FieldKind::ChoiceSet(_)) => "←/→: move | Space: select".to_string(),
            _ if name == names::GSTIN => format!("type | {GSTIN_SHORTCUT}: verify GSTIN"),
            _ => "type to edit".to_string(),
        },
        None => String::new(),
    };
    let back = if app.wizard.current_step() > 1 {
        " | Esc: back"
    } else {
        ""
    };
    let next = if app.wizard.current_step() == app.wizard.step_count() {
        "Enter: submit"
    } else {
        "Enter: next"
    };
    format!("{edit} | Tab: field | {next}{back} | {SAVE_SHORTCUT}: save")
}
