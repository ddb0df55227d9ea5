//! UI module for rendering the TUI

mod components;
mod forms;
mod layout;
mod success;

use crate::app::App;
use ratatui::Frame;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.wizard.is_submitted() {
        success::draw(frame, area, app);
        return;
    }

    let areas = layout::create_layout(area, app.resume_banner);
    layout::draw_header(frame, areas.header, app);
    if let Some(banner) = areas.banner {
        layout::draw_banner(frame, banner);
    }
    forms::draw_form(frame, areas.body, app);
    layout::draw_status_bar(frame, areas.status, app);

    // Error dialog overlay (modal)
    if let Some(notice) = app.dialogs.front() {
        components::render_notice_dialog(frame, notice, app.dialogs.len() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Duration;
    use vendor_onboard::gateway::{CallPolicy, Gateways};
    use vendor_onboard::state::{GstinGate, Persistence, Schema, Wizard};

    fn app() -> App {
        let wizard = Wizard::start(
            Schema::vendor_onboarding(GstinGate::FormatOnly),
            Persistence::in_memory(),
            Gateways::demo(Duration::ZERO),
            CallPolicy::default(),
        );
        App::new(wizard)
    }

    fn render(app: &App) -> String {
        let backend = TestBackend::new(100, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_first_step_renders_header_and_fields() {
        let screen = render(&app());
        assert!(screen.contains("Vendor Onboarding"));
        assert!(screen.contains("Step 1 of 7"));
        assert!(screen.contains("Business Name *"));
        assert!(screen.contains("Enter: next"));
    }

    #[test]
    fn test_validation_errors_render_dialog() {
        let mut app = app();
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));

        let screen = render(&app);
        assert!(screen.contains("Validation Error"));
        assert!(screen.contains("Business name is required"));
        assert!(screen.contains("to dismiss"));
    }
}
