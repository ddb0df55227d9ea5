//! Form for the current wizard step

use super::field_renderer::{
    checkbox_content, choice_content, choice_set_content, draw_field, text_content, FieldView,
};
use crate::app::{App, Row};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    Frame,
};
use vendor_onboard::state::{names, FieldKind, FieldValue};

/// Height of a single-line field including borders
const ROW_HEIGHT: u16 = 3;

/// Draw the visible rows of the current step, scrolled to keep the focus on screen
pub fn draw_form(frame: &mut Frame, area: Rect, app: &App) {
    let rows = app.rows();
    let active = app.active();
    let inner_width = area.width.saturating_sub(2);
    let heights: Vec<u16> = rows
        .iter()
        .map(|row| row_height(app, *row, inner_width))
        .collect();
    let active_index = active
        .and_then(|a| rows.iter().position(|r| *r == a))
        .unwrap_or(0);
    let start = first_visible(&heights, active_index, area.height);

    let mut y = area.y;
    for (row, height) in rows.iter().zip(&heights).skip(start) {
        if y + height > area.bottom() {
            break;
        }
        let row_area = Rect {
            x: area.x,
            y,
            width: area.width,
            height: *height,
        };
        draw_row(frame, row_area, app, *row, active == Some(*row));
        y += height;
    }
}

/// First row to draw so that the active row fits in `available` lines
fn first_visible(heights: &[u16], active: usize, available: u16) -> usize {
    let mut start = 0;
    while start < active && heights[start..=active].iter().sum::<u16>() > available {
        start += 1;
    }
    start
}

fn row_height(app: &App, row: Row, inner_width: u16) -> u16 {
    let Row::Field(name) = row else {
        return ROW_HEIGHT;
    };
    match app.wizard.schema().field(name).map(|f| &f.kind) {
        Some(FieldKind::ChoiceSet(options)) => {
            // "[x] " prefix plus two spaces of separation per option
            let widths = options.iter().map(|o| o.chars().count() + 6);
            2 + packed_lines(widths, inner_width)
        }
        _ => ROW_HEIGHT,
    }
}

/// Lines needed to lay out items of the given widths left to right
fn packed_lines(widths: impl Iterator<Item = usize>, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let mut lines = 1;
    let mut used = 0;
    for item in widths {
        if used > 0 && used + item > width {
            lines += 1;
            used = 0;
        }
        used += item;
    }
    lines
}

fn draw_row(frame: &mut Frame, area: Rect, app: &App, row: Row, is_active: bool) {
    let view = match row {
        Row::OtpCode => otp_view(app, is_active),
        Row::Field(name) => match field_view(app, name, is_active) {
            Some(view) => view,
            None => return,
        },
    };
    draw_field(frame, area, view);
}

fn field_view<'a>(app: &'a App, name: &str, is_active: bool) -> Option<FieldView<'a>> {
    let spec = app.wizard.schema().field(name)?;
    let value = app.wizard.value(name).cloned().unwrap_or_default();

    let content = match &spec.kind {
        FieldKind::Boolean if spec.read_only => verified_content(value.as_bool()),
        FieldKind::Boolean => checkbox_content(value.as_bool(), is_active),
        FieldKind::Choice(_) => choice_content(value.as_text(), is_active),
        FieldKind::ChoiceSet(options) => choice_set_content(
            options,
            value.as_list(),
            is_active.then_some(app.option_cursor),
        ),
        _ if spec.read_only => derived_content(&value),
        _ => text_content(&value.display_value(), is_active),
    };

    let mut label = spec.label.to_string();
    if spec.required && !spec.read_only {
        label.push_str(" *");
    }
    if name == names::GSTIN && app.wizard.pending().gstin_lookup {
        label.push_str(" (verifying...)");
    }

    Some(FieldView {
        label,
        content,
        is_active,
        error: app.wizard.errors().get(name),
        read_only: spec.read_only,
    })
}

fn otp_view(app: &App, is_active: bool) -> FieldView<'static> {
    let pending = app.wizard.pending();
    let note = if pending.send_code {
        Some("sending OTP...".to_string())
    } else if pending.verify_code {
        Some("verifying...".to_string())
    } else {
        app.wizard
            .code_sent_to()
            .map(|phone| format!("code sent to {phone}"))
    };

    let mut content = text_content(&app.otp_input, is_active);
    if let Some(note) = note {
        content.spans.push(Span::styled(
            format!("   {note}"),
            Style::default().fg(Color::DarkGray),
        ));
    }

    FieldView {
        label: "OTP Code".to_string(),
        content,
        is_active,
        error: None,
        read_only: false,
    }
}

fn verified_content(verified: bool) -> Line<'static> {
    if verified {
        Line::from(Span::styled("✓ Verified", Style::default().fg(Color::Green)))
    } else {
        Line::from(Span::styled(
            "Not verified",
            Style::default().fg(Color::DarkGray),
        ))
    }
}

fn derived_content(value: &FieldValue) -> Line<'static> {
    if value.is_blank() {
        Line::from(Span::styled(
            "(filled in by verification)",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(Span::styled(
            value.display_value(),
            Style::default().fg(Color::White),
        ))
    }
}
