//! Field rendering utilities for forms

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Everything needed to draw one bordered field
pub struct FieldView<'a> {
    pub label: String,
    pub content: Line<'a>,
    pub is_active: bool,
    pub error: Option<&'a str>,
    pub read_only: bool,
}

/// Draw a form field, with its validation message on the bottom border
pub fn draw_field(frame: &mut Frame, area: Rect, field: FieldView) {
    let border_style = if field.is_active {
        Style::default().fg(Color::Cyan)
    } else if field.error.is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let label_style = if field.read_only {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC)
    } else {
        border_style
    };

    let mut block = Block::default()
        .title(Span::styled(format!(" {} ", field.label), label_style))
        .borders(Borders::ALL)
        .border_style(border_style);

    if let Some(error) = field.error {
        block = block.title_bottom(Line::from(Span::styled(
            format!(" {error} "),
            Style::default().fg(Color::Red),
        )));
    }

    let content = Paragraph::new(field.content)
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(content, area);
}

/// Content line for a typed value, with placeholder and cursor
pub fn text_content(value: &str, is_active: bool) -> Line<'static> {
    let style = if is_active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let display_value = if value.is_empty() && !is_active {
        "(empty)".to_string()
    } else {
        value.to_string()
    };

    let cursor = if is_active { "▌" } else { "" };

    Line::from(vec![
        Span::styled(display_value, style),
        Span::styled(cursor, Style::default().fg(Color::Cyan)),
    ])
}

/// Content line for a checkbox
pub fn checkbox_content(checked: bool, is_active: bool) -> Line<'static> {
    let (mark, color) = if checked {
        ("[x] Yes", Color::Green)
    } else {
        ("[ ] No", Color::DarkGray)
    };
    let style = if is_active {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(color)
    };
    Line::from(Span::styled(mark, style))
}

/// Content line for a single choice
pub fn choice_content(selected: &str, is_active: bool) -> Line<'static> {
    let value = if selected.is_empty() {
        Span::styled("(select)", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(selected.to_string(), Style::default().fg(Color::White))
    };
    if is_active {
        Line::from(vec![
            Span::styled("◀ ", Style::default().fg(Color::Cyan)),
            value,
            Span::styled(" ▶", Style::default().fg(Color::Cyan)),
        ])
    } else {
        Line::from(value)
    }
}

/// Content line for a multi-select, highlighting the option under the cursor
pub fn choice_set_content(
    options: &[&'static str],
    selected: &[String],
    cursor: Option<usize>,
) -> Line<'static> {
    let mut spans = Vec::new();
    for (index, option) in options.iter().enumerate() {
        let checked = selected.iter().any(|s| s == option);
        let mark = if checked { "[x]" } else { "[ ]" };
        let mut style = if checked {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if cursor == Some(index) {
            style = style.fg(Color::Cyan).add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(format!("{mark} {option}"), style));
        spans.push(Span::raw("  "));
    }
    Line::from(spans)
}
