//! Application state and key handling

use crate::platform::is_shortcut;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use vendor_onboard::config::OnboardConfig;
use vendor_onboard::gateway::{
    call_with_timeout, submit_with_retry, GatewayError, Gateways, GstinDetails, SubmissionReceipt,
};
use vendor_onboard::state::{
    names, FieldKind, FieldValue, FormValues, NextOutcome, Notice, SubmissionOutcome,
    ValidationResult, Wizard, WizardError,
};

/// Maximum length of an OTP code
const OTP_LENGTH: usize = 4;

/// A gateway call that finished in the background
#[derive(Debug)]
pub enum Completion {
    CodeSent {
        phone: String,
        result: Result<bool, GatewayError>,
    },
    CodeChecked {
        phone: String,
        result: Result<bool, GatewayError>,
    },
    GstinChecked {
        gstin: String,
        result: Result<GstinDetails, GatewayError>,
    },
    Submitted(Result<SubmissionReceipt, GatewayError>),
}

/// One row of the current step's form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Field(&'static str),
    /// OTP entry box shown under the primary phone until it is verified
    OtpCode,
}

/// Main application struct
pub struct App {
    pub wizard: Wizard,
    /// Index into [`App::focusable_rows`]
    pub active_row: usize,
    /// Highlighted option of the active multi-select field
    pub option_cursor: usize,
    pub otp_input: String,
    /// Latest non-error notice, shown in the status bar
    pub status: Option<Notice>,
    /// Error notices waiting to be dismissed, oldest first
    pub dialogs: VecDeque<Notice>,
    /// Whether the restored-session banner is showing
    pub resume_banner: bool,
    /// Confirmation from an accepted submission
    pub receipt: Option<String>,
    tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    quit: bool,
}

impl App {
    pub fn new(mut wizard: Wizard) -> Self {
        let (tx, completions) = mpsc::unbounded_channel();
        let resume_banner = wizard.take_resume_notice();
        Self {
            wizard,
            active_row: 0,
            option_cursor: 0,
            otp_input: String::new(),
            status: None,
            dialogs: VecDeque::new(),
            resume_banner,
            receipt: None,
            tx,
            completions,
            quit: false,
        }
    }

    /// Build the wizard described by the user's configuration
    pub fn from_config(config: &OnboardConfig) -> Self {
        let wizard = Wizard::start(
            config.schema(),
            config.persistence(),
            Gateways::demo(config.demo_latency()),
            config.call_policy(),
        );
        Self::new(wizard)
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Rows of the current step, in display order
    pub fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        let step = self.wizard.current_step();
        for field in self.wizard.schema().visible_fields(step, self.wizard.values()) {
            rows.push(Row::Field(field.name));
            if field.name == names::PHONE_PRIMARY && !self.wizard.is_phone_verified() {
                rows.push(Row::OtpCode);
            }
        }
        rows
    }

    /// Rows that take keyboard focus. Read-only fields are skipped.
    pub fn focusable_rows(&self) -> Vec<Row> {
        self.rows()
            .into_iter()
            .filter(|row| match row {
                Row::Field(name) => self
                    .wizard
                    .schema()
                    .field(name)
                    .is_some_and(|f| !f.read_only),
                Row::OtpCode => true,
            })
            .collect()
    }

    /// The row that has focus
    pub fn active(&self) -> Option<Row> {
        self.focusable_rows().get(self.active_row).copied()
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        // Error dialogs are modal
        if !self.dialogs.is_empty() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.dialogs.pop_front();
            }
            return;
        }

        if self.wizard.is_submitted() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q')) {
                self.quit = true;
            }
            return;
        }

        self.resume_banner = false;

        if is_shortcut(&key, 's') {
            let result = self.wizard.save_progress();
            self.report(result);
        } else if is_shortcut(&key, 'o') {
            self.request_code();
        } else if is_shortcut(&key, 'v') {
            self.submit_code();
        } else if is_shortcut(&key, 'g') {
            self.lookup_gstin();
        } else {
            match key.code {
                KeyCode::Tab | KeyCode::Down => self.next_row(),
                KeyCode::BackTab | KeyCode::Up => self.prev_row(),
                KeyCode::Enter => self.next_step(),
                KeyCode::Esc => self.prev_step(),
                _ => self.edit_active(key),
            }
        }

        self.collect_notices();
    }

    /// Apply every gateway result that has arrived since the last call
    pub fn drain_completions(&mut self) {
        while let Ok(completion) = self.completions.try_recv() {
            self.apply(completion);
        }
        self.collect_notices();
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::CodeSent { phone, result } => {
                self.wizard.finish_request_code(&phone, result);
            }
            Completion::CodeChecked { phone, result } => {
                if self.wizard.finish_submit_code(&phone, result) {
                    self.otp_input.clear();
                    self.clamp_focus();
                }
            }
            Completion::GstinChecked { gstin, result } => {
                self.wizard.finish_gstin_lookup(&gstin, result);
            }
            Completion::Submitted(result) => match self.wizard.finish_submission(result) {
                Ok(SubmissionOutcome::Accepted(message)) => self.receipt = Some(message),
                Ok(_) => self.reset_focus(),
                Err(e) => warn!("Ignoring submission result: {e}"),
            },
        }
    }

    /// Move wizard notices to the status bar or the dialog queue
    fn collect_notices(&mut self) {
        for notice in self.wizard.drain_notices() {
            if notice.is_error() {
                self.dialogs.push_back(notice);
            } else {
                self.status = Some(notice);
            }
        }
    }

    /// Show a rejected operation to the user
    fn report<T>(&mut self, result: Result<T, WizardError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Operation rejected: {e}");
                self.dialogs.push_back(Notice::from(&e));
                None
            }
        }
    }

    fn next_row(&mut self) {
        let count = self.focusable_rows().len();
        if count > 0 {
            self.active_row = (self.active_row + 1) % count;
            self.option_cursor = 0;
        }
    }

    fn prev_row(&mut self) {
        let count = self.focusable_rows().len();
        if count > 0 {
            self.active_row = (self.active_row + count - 1) % count;
            self.option_cursor = 0;
        }
    }

    fn reset_focus(&mut self) {
        self.active_row = 0;
        self.option_cursor = 0;
    }

    /// Keep focus in range after rows appear or disappear
    fn clamp_focus(&mut self) {
        let count = self.focusable_rows().len();
        if self.active_row >= count {
            self.active_row = count.saturating_sub(1);
            self.option_cursor = 0;
        }
    }

    /// Focus the row of a named field. Returns false if it has no focusable row.
    pub fn focus_field(&mut self, name: &str) -> bool {
        let target = if name == names::PHONE_VERIFIED {
            Row::OtpCode
        } else {
            match self.wizard.schema().field(name) {
                Some(field) => Row::Field(field.name),
                None => return false,
            }
        };
        match self.focusable_rows().iter().position(|row| *row == target) {
            Some(index) => {
                self.active_row = index;
                self.option_cursor = 0;
                true
            }
            None => false,
        }
    }

    fn focus_first_error(&mut self, errors: &ValidationResult) {
        if let Some(field) = errors.first_invalid_field(self.wizard.schema()) {
            self.focus_field(field);
        }
    }

    fn next_step(&mut self) {
        let result = self.wizard.begin_next();
        match self.report(result) {
            Some(NextOutcome::Blocked(errors)) => {
                self.reset_focus();
                self.focus_first_error(&errors);
            }
            Some(NextOutcome::Advanced(_)) => self.reset_focus(),
            Some(NextOutcome::Submit(values)) => self.spawn_submission(values),
            None => {}
        }
    }

    fn prev_step(&mut self) {
        match self.wizard.prev() {
            Ok(_) => self.reset_focus(),
            Err(WizardError::AtFirstStep) => {}
            Err(e) => self.dialogs.push_back(Notice::from(&e)),
        }
    }

    fn request_code(&mut self) {
        let result = self.wizard.begin_request_code();
        let Some(phone) = self.report(result) else {
            return;
        };
        let otp = self.wizard.gateways().otp.clone();
        let limit = self.wizard.policy().timeout;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = call_with_timeout(limit, otp.send_code(&phone)).await;
            let _ = tx.send(Completion::CodeSent { phone, result });
        });
    }

    fn submit_code(&mut self) {
        let result = self.wizard.begin_submit_code(&self.otp_input);
        let Some(phone) = self.report(result) else {
            return;
        };
        let code = self.otp_input.clone();
        let otp = self.wizard.gateways().otp.clone();
        let limit = self.wizard.policy().timeout;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = call_with_timeout(limit, otp.verify_code(&phone, &code)).await;
            let _ = tx.send(Completion::CodeChecked { phone, result });
        });
    }

    fn lookup_gstin(&mut self) {
        let result = self.wizard.begin_gstin_lookup();
        let Some(gstin) = self.report(result) else {
            return;
        };
        let gateway = self.wizard.gateways().gstin.clone();
        let limit = self.wizard.policy().timeout;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = call_with_timeout(limit, gateway.verify(&gstin)).await;
            let _ = tx.send(Completion::GstinChecked { gstin, result });
        });
    }

    fn spawn_submission(&mut self, values: FormValues) {
        let gateway = self.wizard.gateways().submission.clone();
        let policy = self.wizard.policy();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = submit_with_retry(gateway.as_ref(), &values, policy).await;
            let _ = tx.send(Completion::Submitted(result));
        });
    }

    fn edit_active(&mut self, key: KeyEvent) {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
        {
            return;
        }
        match self.active() {
            Some(Row::OtpCode) => match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() && self.otp_input.len() < OTP_LENGTH => {
                    self.otp_input.push(c);
                }
                KeyCode::Backspace => {
                    self.otp_input.pop();
                }
                _ => {}
            },
            Some(Row::Field(name)) => self.edit_field(name, key.code),
            None => {}
        }
    }

    fn edit_field(&mut self, name: &'static str, code: KeyCode) {
        let Some(kind) = self.wizard.schema().field(name).map(|f| f.kind.clone()) else {
            return;
        };
        let current = self.wizard.value(name).cloned().unwrap_or_default();

        let updated = match (kind, code) {
            (FieldKind::Boolean, KeyCode::Char(' ')) => Some(FieldValue::Bool(!current.as_bool())),
            (FieldKind::Choice(options), KeyCode::Char(' ') | KeyCode::Right) => {
                Some(cycle(options, current.as_text(), true))
            }
            (FieldKind::Choice(options), KeyCode::Left) => {
                Some(cycle(options, current.as_text(), false))
            }
            (FieldKind::ChoiceSet(options), KeyCode::Right) if !options.is_empty() => {
                self.option_cursor = (self.option_cursor + 1) % options.len();
                None
            }
            (FieldKind::ChoiceSet(options), KeyCode::Left) if !options.is_empty() => {
                self.option_cursor = (self.option_cursor + options.len() - 1) % options.len();
                None
            }
            (FieldKind::ChoiceSet(options), KeyCode::Char(' ')) => options
                .get(self.option_cursor)
                .map(|option| toggle(options, current.as_list(), option)),
            (FieldKind::Text | FieldKind::File, KeyCode::Char(c)) => {
                let mut text = current.as_text().to_string();
                text.push(c);
                Some(FieldValue::text(text))
            }
            (FieldKind::Text | FieldKind::File, KeyCode::Backspace) => {
                let mut text = current.as_text().to_string();
                text.pop();
                Some(FieldValue::text(text))
            }
            (FieldKind::Number, KeyCode::Char(c)) if c.is_ascii_digit() => {
                let mut digits = current.display_value();
                digits.push(c);
                Some(parse_number(&digits))
            }
            (FieldKind::Number, KeyCode::Backspace) => {
                let mut digits = current.display_value();
                digits.pop();
                Some(parse_number(&digits))
            }
            _ => None,
        };

        if let Some(value) = updated {
            let result = self.wizard.set_field(name, value);
            self.report(result);
            self.clamp_focus();
        }
    }
}

/// Step through single-choice options, starting from the ends when unset
fn cycle(options: &'static [&'static str], current: &str, forward: bool) -> FieldValue {
    let len = options.len();
    if len == 0 {
        return FieldValue::Empty;
    }
    let index = match options.iter().position(|o| *o == current) {
        Some(i) if forward => (i + 1) % len,
        Some(i) => (i + len - 1) % len,
        None if forward => 0,
        None => len - 1,
    };
    FieldValue::text(options[index])
}

/// Add or remove `option`, keeping the declared option order
fn toggle(options: &'static [&'static str], selected: &[String], option: &str) -> FieldValue {
    let was_selected = selected.iter().any(|s| s == option);
    FieldValue::list(options.iter().copied().filter(|o| {
        if *o == option {
            !was_selected
        } else {
            selected.iter().any(|s| s == o)
        }
    }))
}

fn parse_number(digits: &str) -> FieldValue {
    digits.parse::<f64>().map_or(FieldValue::Empty, FieldValue::Number)
}
