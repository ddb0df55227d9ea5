//! Wizard state machine
//!
//! Owns the current step and the field values. Every edit is saved through
//! the [`Persistence`] adapter, `next` only advances past a step whose
//! required, visible fields pass validation, and the last step hands the
//! values to the submission gateway.
//!
//! Gateway interactions are split in two: a synchronous `begin_*` half that
//! checks preconditions and marks the operation pending, and a `finish_*`
//! half that applies the result. The async helpers compose both for callers
//! that can await in place; the terminal front end spawns the call instead
//! and feeds the result back when it completes.

use crate::gateway::{
    call_with_timeout, submit_with_retry, CallPolicy, GatewayError, Gateways, GstinDetails,
    SubmissionReceipt,
};
use crate::state::{
    names, validate_all, validate_step, FieldValue, FormValues, Notice, Pattern, Persistence,
    Schema, ValidationResult,
};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Shown once when a saved session was restored
pub const RESUME_MESSAGE: &str =
    "We've restored your previous application progress. You can continue where you left off.";

/// Where the wizard is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Editing the given step (1-based)
    Editing(usize),
    /// Waiting for the submission gateway
    Submitting,
    /// Terminal
    Submitted,
}

/// Gateway operations currently in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingOps {
    pub send_code: bool,
    pub verify_code: bool,
    pub gstin_lookup: bool,
}

impl PendingOps {
    pub fn is_idle(&self) -> bool {
        !(self.send_code || self.verify_code || self.gstin_lookup)
    }
}

/// Rejected wizard operations. None of these change any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("The form is not being edited")]
    NotEditing,
    #[error("No submission is in progress")]
    NotSubmitting,
    #[error("Unknown field `{0}`")]
    UnknownField(String),
    #[error("`{0}` is filled in by verification and cannot be edited")]
    ReadOnlyField(String),
    #[error("Value does not fit field `{0}`")]
    InvalidValue(String),
    #[error("Already at the first step")]
    AtFirstStep,
    #[error("{0} is already in progress")]
    Busy(&'static str),
    #[error("Please enter a valid 10-digit phone number")]
    InvalidPhone,
    #[error("Your phone number is already verified")]
    AlreadyVerified,
    #[error("Send an OTP to this phone number first")]
    CodeNotRequested,
    #[error("Please enter a valid 4-digit OTP")]
    InvalidCode,
    #[error("Please enter a valid 15-character GSTIN")]
    InvalidGstin,
}

impl WizardError {
    /// Short heading for showing the error to the user
    pub fn title(&self) -> &'static str {
        match self {
            WizardError::InvalidPhone => "Invalid Phone Number",
            WizardError::InvalidCode | WizardError::CodeNotRequested => "Invalid OTP",
            WizardError::InvalidGstin => "Invalid GSTIN",
            WizardError::Busy(_) => "Please Wait",
            WizardError::AlreadyVerified => "Phone Verified",
            _ => "Not Allowed",
        }
    }
}

impl From<&WizardError> for Notice {
    fn from(err: &WizardError) -> Self {
        Notice::error(err.title(), err.to_string())
    }
}

/// Result of the synchronous half of `next`
#[derive(Debug, Clone, PartialEq)]
pub enum NextOutcome {
    /// Validation failed; the wizard stays on (or returns to) a step
    Blocked(ValidationResult),
    /// Moved to the given step
    Advanced(usize),
    /// The last step passed; these values must be handed to the gateway
    Submit(FormValues),
}

/// How a submission ended
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Accepted(String),
    Rejected(String),
    Failed(GatewayError),
}

/// Result of a full `next`, submission included
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Blocked(ValidationResult),
    Advanced(usize),
    Submission(SubmissionOutcome),
}

/// The onboarding wizard
#[derive(Debug)]
pub struct Wizard {
    schema: Schema,
    persistence: Persistence,
    gateways: Gateways,
    policy: CallPolicy,
    phase: Phase,
    values: FormValues,
    errors: ValidationResult,
    pending: PendingOps,
    /// Phone number the outstanding OTP was sent to
    code_sent_to: Option<String>,
    resumed: bool,
    resume_unseen: bool,
    notices: VecDeque<Notice>,
}

impl Wizard {
    /// Start the wizard, resuming the saved session if there is one
    pub fn start(
        schema: Schema,
        persistence: Persistence,
        gateways: Gateways,
        policy: CallPolicy,
    ) -> Self {
        let mut values = schema.initial_values();
        let mut step = 1;
        let saved = persistence.load();
        let resumed = saved.is_some();

        if let Some(saved) = saved {
            restore_values(&schema, &mut values, saved.values);
            step = saved.step.clamp(1, schema.step_count());
            if step != saved.step {
                debug!(saved = saved.step, step, "Saved step out of range, clamped");
            }
            info!(step, saved_at = ?saved.saved_at, "Resuming saved onboarding session");
        } else {
            info!("Starting new onboarding session");
        }

        Self {
            schema,
            persistence,
            gateways,
            policy,
            phase: Phase::Editing(step),
            values,
            errors: ValidationResult::default(),
            pending: PendingOps::default(),
            code_sent_to: None,
            resumed,
            resume_unseen: resumed,
            notices: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Step being edited; the last step while submitting or submitted
    pub fn current_step(&self) -> usize {
        match self.phase {
            Phase::Editing(step) => step,
            Phase::Submitting | Phase::Submitted => self.schema.step_count(),
        }
    }

    pub fn step_count(&self) -> usize {
        self.schema.step_count()
    }

    pub fn is_submitted(&self) -> bool {
        self.phase == Phase::Submitted
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Whether a field is currently shown
    pub fn is_visible(&self, name: &str) -> bool {
        self.schema.is_visible(name, &self.values)
    }

    /// Errors from the last blocked `next`, kept current as fields are corrected
    pub fn errors(&self) -> &ValidationResult {
        &self.errors
    }

    pub fn pending(&self) -> PendingOps {
        self.pending
    }

    pub fn gateways(&self) -> &Gateways {
        &self.gateways
    }

    pub fn policy(&self) -> CallPolicy {
        self.policy
    }

    pub fn is_phone_verified(&self) -> bool {
        self.values
            .get(names::PHONE_VERIFIED)
            .is_some_and(FieldValue::as_bool)
    }

    /// Phone number an unverified OTP is outstanding for
    pub fn code_sent_to(&self) -> Option<&str> {
        self.code_sent_to.as_deref()
    }

    /// Whether this session was restored from a saved one
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    /// True the first time it is called after a resumed start, false afterwards
    pub fn take_resume_notice(&mut self) -> bool {
        std::mem::take(&mut self.resume_unseen)
    }

    /// Hand over queued notices, oldest first
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    fn editing_step(&self) -> Result<usize, WizardError> {
        match self.phase {
            Phase::Editing(step) => Ok(step),
            _ => Err(WizardError::NotEditing),
        }
    }

    fn text_value(&self, name: &str) -> &str {
        self.values.get(name).map_or("", FieldValue::as_text).trim()
    }

    fn write(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    fn save(&self) {
        self.persistence.save(&self.values, self.current_step());
    }

    /// Set a field from user input and save the session
    pub fn set_field(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<(), WizardError> {
        let step = self.editing_step()?;
        let value = value.into();
        let spec = self
            .schema
            .field(name)
            .ok_or_else(|| WizardError::UnknownField(name.to_string()))?;
        if spec.read_only {
            return Err(WizardError::ReadOnlyField(name.to_string()));
        }
        if !spec.kind.accepts(&value) {
            return Err(WizardError::InvalidValue(name.to_string()));
        }

        let changed = self.values.get(name) != Some(&value);
        self.values.insert(name.to_string(), value);
        if changed {
            match name {
                names::PHONE_PRIMARY => self.reset_phone_verification(),
                names::GSTIN => self.reset_gstin_details(),
                _ => {}
            }
        }

        self.refresh_errors(step);
        self.persistence.save(&self.values, step);
        Ok(())
    }

    fn reset_phone_verification(&mut self) {
        if self.is_phone_verified() || self.code_sent_to.is_some() {
            debug!("Phone number changed, verification reset");
        }
        self.write(names::PHONE_VERIFIED, false);
        self.code_sent_to = None;
    }

    fn reset_gstin_details(&mut self) {
        self.write(names::GST_REGISTRATION_TYPE, FieldValue::Empty);
        self.write(names::GST_TAX_SLAB, FieldValue::Empty);
        self.write(names::REGISTERED_STATE, FieldValue::Empty);
        self.write(names::GSTIN_VERIFIED, false);
    }

    /// Re-check the fields that currently show an error
    fn refresh_errors(&mut self, step: usize) {
        if self.errors.is_empty() {
            return;
        }
        let current = validate_step(&self.schema, step, &self.values);
        let shown: Vec<String> = self.errors.iter().map(|(field, _)| field.to_string()).collect();
        for field in shown {
            match current.get(&field) {
                Some(message) => self.errors.insert(field.clone(), message),
                None => {
                    self.errors.remove(&field);
                }
            }
        }
    }

    fn block(&mut self, result: ValidationResult) -> NextOutcome {
        self.errors = result.clone();
        self.notify(Notice::error(
            "Validation Error",
            "Please correct the errors before proceeding.",
        ));
        NextOutcome::Blocked(result)
    }

    /// Validate the current step and advance, or ask for submission on the last one
    pub fn begin_next(&mut self) -> Result<NextOutcome, WizardError> {
        let step = self.editing_step()?;
        let result = validate_step(&self.schema, step, &self.values);
        if !result.is_valid() {
            debug!(step, failed = result.len(), "Step blocked by validation");
            return Ok(self.block(result));
        }
        self.errors = ValidationResult::default();

        if step < self.schema.step_count() {
            let next = step + 1;
            self.phase = Phase::Editing(next);
            self.persistence.save(&self.values, next);
            info!(from = step, to = next, "Advanced to next step");
            return Ok(NextOutcome::Advanced(next));
        }

        let all = validate_all(&self.schema, &self.values);
        if let Some(field) = all.first_invalid_field(&self.schema) {
            let target = self.schema.field(field).map_or(step, |f| f.step);
            warn!(step = target, field, "Earlier step no longer valid, returning to it");
            self.phase = Phase::Editing(target);
            let result = validate_step(&self.schema, target, &self.values);
            return Ok(self.block(result));
        }

        self.phase = Phase::Submitting;
        info!("Submitting vendor application");
        Ok(NextOutcome::Submit(self.values.clone()))
    }

    /// Apply the submission gateway's answer
    pub fn finish_submission(
        &mut self,
        result: Result<SubmissionReceipt, GatewayError>,
    ) -> Result<SubmissionOutcome, WizardError> {
        if self.phase != Phase::Submitting {
            return Err(WizardError::NotSubmitting);
        }
        let last = self.schema.step_count();

        let outcome = match result {
            Ok(receipt) if receipt.success => {
                self.persistence.clear();
                self.phase = Phase::Submitted;
                self.code_sent_to = None;
                info!("Vendor application submitted");
                self.notify(Notice::success("Application Submitted", receipt.message.clone()));
                SubmissionOutcome::Accepted(receipt.message)
            }
            Ok(receipt) => {
                warn!("Submission rejected: {}", receipt.message);
                self.phase = Phase::Editing(last);
                self.notify(Notice::error("Submission Error", receipt.message.clone()));
                SubmissionOutcome::Rejected(receipt.message)
            }
            Err(e) => {
                warn!("Submission failed: {e}");
                self.phase = Phase::Editing(last);
                self.notify(Notice::error(
                    "Submission Error",
                    "An error occurred while submitting your application. Please try again.",
                ));
                SubmissionOutcome::Failed(e)
            }
        };
        Ok(outcome)
    }

    /// Validate and advance, submitting from the last step
    pub async fn next(&mut self) -> Result<Transition, WizardError> {
        match self.begin_next()? {
            NextOutcome::Blocked(errors) => Ok(Transition::Blocked(errors)),
            NextOutcome::Advanced(step) => Ok(Transition::Advanced(step)),
            NextOutcome::Submit(values) => {
                let result =
                    submit_with_retry(self.gateways.submission.as_ref(), &values, self.policy)
                        .await;
                self.finish_submission(result).map(Transition::Submission)
            }
        }
    }

    /// Go back one step without validating
    pub fn prev(&mut self) -> Result<usize, WizardError> {
        let step = self.editing_step()?;
        if step <= 1 {
            return Err(WizardError::AtFirstStep);
        }
        self.phase = Phase::Editing(step - 1);
        self.errors = ValidationResult::default();
        Ok(step - 1)
    }

    /// Save explicitly and confirm to the user
    pub fn save_progress(&mut self) -> Result<(), WizardError> {
        let step = self.editing_step()?;
        self.persistence.save(&self.values, step);
        self.notify(Notice::info(
            "Progress Saved",
            "Your application progress has been saved. You can return to complete it later.",
        ));
        Ok(())
    }

    /// Check the phone number and mark an OTP send as pending. Returns the number.
    pub fn begin_request_code(&mut self) -> Result<String, WizardError> {
        self.editing_step()?;
        if self.pending.send_code {
            return Err(WizardError::Busy("Sending the OTP"));
        }
        if self.is_phone_verified() {
            return Err(WizardError::AlreadyVerified);
        }
        let phone = self.text_value(names::PHONE_PRIMARY).to_string();
        if !Pattern::IndianMobile.is_match(&phone) {
            return Err(WizardError::InvalidPhone);
        }
        self.pending.send_code = true;
        Ok(phone)
    }

    pub fn finish_request_code(&mut self, phone: &str, result: Result<bool, GatewayError>) {
        self.pending.send_code = false;
        if self.is_submitted() {
            return;
        }
        match result {
            Ok(true) if self.text_value(names::PHONE_PRIMARY) == phone => {
                self.code_sent_to = Some(phone.to_string());
                self.notify(Notice::success(
                    "OTP Sent",
                    "A verification code has been sent to your phone number",
                ));
            }
            Ok(true) => debug!("Phone number changed while the OTP was being sent"),
            Ok(false) => self.notify(Notice::error("Error", "Failed to send OTP. Please try again.")),
            Err(e) => {
                warn!("Failed to send OTP: {e}");
                self.notify(Notice::error("Error", "Failed to send OTP. Please try again."));
            }
        }
    }

    /// Check a typed code and mark its verification as pending. Returns the phone number.
    pub fn begin_submit_code(&mut self, code: &str) -> Result<String, WizardError> {
        self.editing_step()?;
        if self.pending.verify_code {
            return Err(WizardError::Busy("OTP verification"));
        }
        if self.is_phone_verified() {
            return Err(WizardError::AlreadyVerified);
        }
        let phone = match &self.code_sent_to {
            Some(sent_to) if sent_to == self.text_value(names::PHONE_PRIMARY) => sent_to.clone(),
            _ => return Err(WizardError::CodeNotRequested),
        };
        if !Pattern::OtpCode.is_match(code.trim()) {
            return Err(WizardError::InvalidCode);
        }
        self.pending.verify_code = true;
        Ok(phone)
    }

    /// Apply an OTP verification answer; true when the phone is now verified
    pub fn finish_submit_code(&mut self, phone: &str, result: Result<bool, GatewayError>) -> bool {
        self.pending.verify_code = false;
        if self.is_submitted() {
            return false;
        }
        match result {
            Ok(true) if self.text_value(names::PHONE_PRIMARY) == phone => {
                self.write(names::PHONE_VERIFIED, true);
                self.code_sent_to = None;
                self.errors.remove(names::PHONE_VERIFIED);
                self.save();
                info!("Phone number verified");
                self.notify(Notice::success(
                    "Phone Verified",
                    "Your phone number has been verified successfully",
                ));
                true
            }
            Ok(true) => {
                debug!("Phone number changed during verification, result discarded");
                false
            }
            Ok(false) => {
                self.notify(Notice::error(
                    "Invalid OTP",
                    "The OTP you entered is incorrect. Please try again.",
                ));
                false
            }
            Err(e) => {
                warn!("OTP verification failed: {e}");
                self.notify(Notice::error(
                    "Verification Error",
                    "An error occurred during verification. Please try again.",
                ));
                false
            }
        }
    }

    /// Check the GSTIN format and mark a lookup as pending. Returns the GSTIN.
    pub fn begin_gstin_lookup(&mut self) -> Result<String, WizardError> {
        self.editing_step()?;
        if self.pending.gstin_lookup {
            return Err(WizardError::Busy("GSTIN lookup"));
        }
        let gstin = self.text_value(names::GSTIN).to_string();
        if gstin.len() != 15 || !Pattern::Gstin.is_match(&gstin) {
            return Err(WizardError::InvalidGstin);
        }
        self.pending.gstin_lookup = true;
        Ok(gstin)
    }

    /// Apply a GSTIN lookup; true when the derived fields were filled in
    pub fn finish_gstin_lookup(
        &mut self,
        gstin: &str,
        result: Result<GstinDetails, GatewayError>,
    ) -> bool {
        self.pending.gstin_lookup = false;
        if self.is_submitted() {
            return false;
        }
        if self.text_value(names::GSTIN) != gstin {
            debug!("GSTIN changed during lookup, result discarded");
            return false;
        }

        match result {
            Ok(details) if details.valid => {
                self.write(names::GST_REGISTRATION_TYPE, optional_text(details.registration_type));
                self.write(names::GST_TAX_SLAB, optional_text(details.tax_slab));
                self.write(names::REGISTERED_STATE, optional_text(details.registered_state));
                self.write(names::GSTIN_VERIFIED, true);
                self.errors.remove(names::GSTIN_VERIFIED);
                self.save();
                info!("GSTIN verified");
                self.notify(Notice::success(
                    "GSTIN Verified",
                    "Your GSTIN has been verified successfully",
                ));
                true
            }
            Ok(_) => {
                self.reset_gstin_details();
                self.save();
                self.notify(Notice::error("Invalid GSTIN", "The GSTIN could not be verified"));
                false
            }
            Err(e) => {
                warn!("GSTIN lookup failed: {e}");
                self.notify(Notice::error(
                    "Verification Error",
                    "An error occurred while verifying GSTIN",
                ));
                false
            }
        }
    }

    /// Send an OTP to the primary phone
    pub async fn request_code(&mut self) -> Result<(), WizardError> {
        let phone = self.begin_request_code()?;
        let result =
            call_with_timeout(self.policy.timeout, self.gateways.otp.send_code(&phone)).await;
        self.finish_request_code(&phone, result);
        Ok(())
    }

    /// Verify a typed OTP; true when the phone is now verified
    pub async fn submit_code(&mut self, code: &str) -> Result<bool, WizardError> {
        let phone = self.begin_submit_code(code)?;
        let result = call_with_timeout(
            self.policy.timeout,
            self.gateways.otp.verify_code(&phone, code.trim()),
        )
        .await;
        Ok(self.finish_submit_code(&phone, result))
    }

    /// Look up the GSTIN and fill in the derived fields
    pub async fn lookup_gstin(&mut self) -> Result<bool, WizardError> {
        let gstin = self.begin_gstin_lookup()?;
        let result = call_with_timeout(self.policy.timeout, self.gateways.gstin.verify(&gstin)).await;
        Ok(self.finish_gstin_lookup(&gstin, result))
    }
}

fn optional_text(value: Option<String>) -> FieldValue {
    value.map_or(FieldValue::Empty, FieldValue::Text)
}

/// Copy saved values over the defaults, dropping anything the schema does not accept
fn restore_values(schema: &Schema, values: &mut FormValues, saved: FormValues) {
    for (name, value) in saved {
        match schema.field(&name) {
            Some(spec) if spec.kind.accepts(&value) => {
                values.insert(name, value);
            }
            Some(_) => debug!(field = %name, "Dropping saved value of the wrong shape"),
            None => debug!(field = %name, "Dropping saved value of unknown field"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{
        DemoBackend, MockGstinGateway, MockOtpGateway, MockSubmissionGateway, SUBMISSION_MESSAGE,
    };
    use crate::state::{GstinGate, NoticeLevel};
    use mockall::predicate::eq;
    use std::sync::Arc;
    use std::time::Duration;

    const PHONE: &str = "9876543210";
    const GSTIN: &str = "27AAAAA0000A1Z5";

    fn schema() -> Schema {
        Schema::vendor_onboarding(GstinGate::FormatOnly)
    }

    fn start(persistence: Persistence, gateways: Gateways) -> Wizard {
        Wizard::start(schema(), persistence, gateways, CallPolicy::default())
    }

    fn demo_wizard() -> Wizard {
        start(Persistence::in_memory(), Gateways::demo(Duration::ZERO))
    }

    fn with_otp(otp: MockOtpGateway) -> Wizard {
        let demo = Arc::new(DemoBackend::default());
        start(
            Persistence::in_memory(),
            Gateways::new(Arc::new(otp), demo.clone(), demo),
        )
    }

    fn with_gstin(gstin: MockGstinGateway) -> Wizard {
        let demo = Arc::new(DemoBackend::default());
        start(
            Persistence::in_memory(),
            Gateways::new(demo.clone(), Arc::new(gstin), demo),
        )
    }

    fn fill_step_one(wizard: &mut Wizard) {
        wizard.set_field("business_name", "Acme Traders").unwrap();
        wizard
            .set_field("business_type", FieldValue::list(["Manufacturer"]))
            .unwrap();
        wizard.set_field("address_street", "12 MG Road").unwrap();
        wizard.set_field("address_city", "Pune").unwrap();
        wizard.set_field("address_state", "Maharashtra").unwrap();
        wizard.set_field("address_pin_code", "411001").unwrap();
        wizard.set_field("contact_person_name", "Asha Rao").unwrap();
        wizard.set_field("email_address", "asha@acme.test").unwrap();
        wizard.set_field("phone_primary", PHONE).unwrap();
    }

    /// Every required field filled in, phone verified
    fn complete_values() -> FormValues {
        let mut values = schema().initial_values();
        let mut set = |name: &str, value: FieldValue| {
            values.insert(name.to_string(), value);
        };
        set("business_name", FieldValue::text("Acme Traders"));
        set("business_type", FieldValue::list(["Manufacturer"]));
        set("address_street", FieldValue::text("12 MG Road"));
        set("address_city", FieldValue::text("Pune"));
        set("address_state", FieldValue::text("Maharashtra"));
        set("address_pin_code", FieldValue::text("411001"));
        set("contact_person_name", FieldValue::text("Asha Rao"));
        set("email_address", FieldValue::text("asha@acme.test"));
        set("phone_primary", FieldValue::text(PHONE));
        set("phone_primary_verified", FieldValue::Bool(true));
        set("gstin", FieldValue::text(GSTIN));
        set("account_number", FieldValue::text("123456789012"));
        set("bank_name", FieldValue::text("HDFC Bank"));
        set("ifsc_code", FieldValue::text("HDFC0001234"));
        set("payment_terms_agreement", FieldValue::Bool(true));
        set("payment_terms_satisfaction", FieldValue::Bool(true));
        set("agreement_terms", FieldValue::text("Asha Rao"));
        values
    }

    /// A saved session sitting on `step` with a complete form
    fn completed_session(step: usize) -> Persistence {
        let persistence = Persistence::in_memory();
        persistence.save(&complete_values(), step);
        persistence
    }

    fn notice_titles(wizard: &mut Wizard) -> Vec<String> {
        wizard.drain_notices().into_iter().map(|n| n.title).collect()
    }

    mod start {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_fresh_session_starts_at_first_step() {
            let mut wizard = demo_wizard();
            assert_eq!(wizard.phase(), Phase::Editing(1));
            assert_eq!(wizard.values(), &schema().initial_values());
            assert!(!wizard.is_resumed());
            assert!(!wizard.take_resume_notice());
        }

        #[test]
        fn test_resumes_saved_step_and_values() {
            let persistence = completed_session(4);
            let mut wizard = start(persistence, Gateways::demo(Duration::ZERO));

            assert_eq!(wizard.phase(), Phase::Editing(4));
            assert_eq!(wizard.value("business_name"), Some(&FieldValue::text("Acme Traders")));
            assert!(wizard.is_phone_verified());
            assert!(wizard.is_resumed());
            assert!(wizard.take_resume_notice());
            assert!(!wizard.take_resume_notice());
            assert!(wizard.is_resumed());
        }

        #[test]
        fn test_saved_step_out_of_range_is_clamped() {
            let persistence = Persistence::in_memory();
            persistence.save(&FormValues::new(), 12);
            let wizard = start(persistence.clone(), Gateways::demo(Duration::ZERO));
            assert_eq!(wizard.current_step(), 7);

            persistence.save(&FormValues::new(), 0);
            let wizard = start(persistence, Gateways::demo(Duration::ZERO));
            assert_eq!(wizard.current_step(), 1);
        }

        #[test]
        fn test_unknown_and_misshapen_values_dropped() {
            let mut saved = FormValues::new();
            saved.insert("favourite_colour".into(), FieldValue::text("teal"));
            saved.insert("msme_status".into(), FieldValue::text("yes"));
            saved.insert("address_state".into(), FieldValue::text("Atlantis"));
            saved.insert("address_city".into(), FieldValue::text("Pune"));
            let persistence = Persistence::in_memory();
            persistence.save(&saved, 1);

            let wizard = start(persistence, Gateways::demo(Duration::ZERO));
            assert_eq!(wizard.value("favourite_colour"), None);
            assert_eq!(wizard.value("msme_status"), Some(&FieldValue::Bool(false)));
            assert_eq!(wizard.value("address_state"), Some(&FieldValue::Empty));
            assert_eq!(wizard.value("address_city"), Some(&FieldValue::text("Pune")));
        }
    }

    mod editing {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_set_field_saves_session() {
            let persistence = Persistence::in_memory();
            let mut wizard = start(persistence.clone(), Gateways::demo(Duration::ZERO));
            wizard.set_field("address_city", "Pune").unwrap();

            let saved = persistence.load().unwrap();
            assert_eq!(saved.step, 1);
            assert_eq!(saved.values["address_city"], FieldValue::text("Pune"));
        }

        #[test]
        fn test_rejected_writes() {
            let mut wizard = demo_wizard();
            assert_eq!(
                wizard.set_field("favourite_colour", "teal"),
                Err(WizardError::UnknownField("favourite_colour".into()))
            );
            assert_eq!(
                wizard.set_field("phone_primary_verified", true),
                Err(WizardError::ReadOnlyField("phone_primary_verified".into()))
            );
            assert_eq!(
                wizard.set_field("msme_status", "yes"),
                Err(WizardError::InvalidValue("msme_status".into()))
            );
            assert_eq!(
                wizard.set_field("production_capacity", "Huge"),
                Err(WizardError::InvalidValue("production_capacity".into()))
            );
        }

        #[test]
        fn test_hidden_values_retained() {
            let mut wizard = demo_wizard();
            wizard.set_field("requires_warehousing", true).unwrap();
            wizard.set_field("warehouse_location", "Plot 4, Chakan").unwrap();
            wizard.set_field("requires_warehousing", false).unwrap();

            assert!(!wizard.is_visible("warehouse_location"));
            assert_eq!(
                wizard.value("warehouse_location"),
                Some(&FieldValue::text("Plot 4, Chakan"))
            );
        }

        #[test]
        fn test_corrected_field_loses_its_error() {
            let mut wizard = demo_wizard();
            wizard.begin_next().unwrap();
            assert_eq!(wizard.errors().get("address_city"), Some("City is required"));

            wizard.set_field("address_city", "Pune").unwrap();
            assert_eq!(wizard.errors().get("address_city"), None);
            assert!(wizard.errors().get("business_name").is_some());

            wizard.set_field("address_pin_code", "0110").unwrap();
            assert_eq!(
                wizard.errors().get("address_pin_code"),
                Some("Enter a valid 6-digit PIN code")
            );
        }

        #[test]
        fn test_changing_gstin_clears_derived_fields() {
            let persistence = completed_session(2);
            let mut wizard = start(persistence, Gateways::demo(Duration::ZERO));
            tokio_test::block_on(wizard.lookup_gstin()).unwrap();
            assert_eq!(
                wizard.value("registered_state"),
                Some(&FieldValue::text("Maharashtra"))
            );

            wizard.set_field("gstin", "29ABCDE1234F2ZX").unwrap();
            assert_eq!(wizard.value("registered_state"), Some(&FieldValue::Empty));
            assert_eq!(wizard.value("gstin_verified"), Some(&FieldValue::Bool(false)));
        }
    }

    mod navigation {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_blocked_next_stays_and_reports() {
            let persistence = Persistence::in_memory();
            let mut wizard = start(persistence.clone(), Gateways::demo(Duration::ZERO));

            let outcome = wizard.begin_next().unwrap();
            let NextOutcome::Blocked(errors) = outcome else {
                panic!("expected blocked, got {outcome:?}");
            };
            assert_eq!(errors.len(), 10);
            assert_eq!(wizard.phase(), Phase::Editing(1));
            assert_eq!(wizard.errors(), &errors);
            assert_eq!(notice_titles(&mut wizard), vec!["Validation Error"]);
            assert!(persistence.load().is_none());
        }

        #[test]
        fn test_unverified_phone_blocks_step_one() {
            let mut wizard = demo_wizard();
            fill_step_one(&mut wizard);

            let NextOutcome::Blocked(errors) = wizard.begin_next().unwrap() else {
                panic!("phone gate should block");
            };
            assert_eq!(errors.len(), 1);
            assert!(errors.get("phone_primary_verified").is_some());
        }

        #[test]
        fn test_advance_saves_next_step() {
            let persistence = completed_session(2);
            let mut wizard = start(persistence.clone(), Gateways::demo(Duration::ZERO));

            assert_eq!(wizard.begin_next().unwrap(), NextOutcome::Advanced(3));
            assert_eq!(wizard.phase(), Phase::Editing(3));
            assert_eq!(persistence.load().unwrap().step, 3);
            assert!(wizard.errors().is_empty());
        }

        #[test]
        fn test_prev_skips_validation() {
            let persistence = Persistence::in_memory();
            persistence.save(&FormValues::new(), 3);
            let mut wizard = start(persistence.clone(), Gateways::demo(Duration::ZERO));

            assert_eq!(wizard.prev(), Ok(2));
            assert_eq!(wizard.prev(), Ok(1));
            assert_eq!(wizard.prev(), Err(WizardError::AtFirstStep));
            assert_eq!(persistence.load().unwrap().step, 3);
        }

        #[test]
        fn test_save_progress_is_idempotent() {
            let persistence = Persistence::in_memory();
            let mut wizard = start(persistence.clone(), Gateways::demo(Duration::ZERO));
            wizard.set_field("business_name", "Acme Traders").unwrap();

            wizard.save_progress().unwrap();
            let first = persistence.load().unwrap();
            wizard.save_progress().unwrap();
            let second = persistence.load().unwrap();

            assert_eq!(first.values, second.values);
            assert_eq!(first.step, second.step);
            let notices = wizard.drain_notices();
            assert_eq!(notices.len(), 2);
            assert_eq!(notices[0].level, NoticeLevel::Info);
            assert_eq!(notices[0].title, "Progress Saved");
        }
    }

    mod phone {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_request_then_verify() {
            let mut otp = MockOtpGateway::new();
            otp.expect_send_code()
                .with(eq(PHONE))
                .times(1)
                .returning(|_| Ok(true));
            otp.expect_verify_code()
                .with(eq(PHONE), eq("1234"))
                .times(1)
                .returning(|_, _| Ok(true));
            let mut wizard = with_otp(otp);
            fill_step_one(&mut wizard);

            wizard.request_code().await.unwrap();
            assert_eq!(wizard.code_sent_to(), Some(PHONE));
            assert!(wizard.submit_code(" 1234 ").await.unwrap());
            assert!(wizard.is_phone_verified());
            assert_eq!(wizard.code_sent_to(), None);
            assert_eq!(notice_titles(&mut wizard), vec!["OTP Sent", "Phone Verified"]);
            assert_eq!(wizard.begin_next().unwrap(), NextOutcome::Advanced(2));
        }

        #[tokio::test]
        async fn test_padded_phone_verifies_and_advances() {
            let mut otp = MockOtpGateway::new();
            otp.expect_send_code()
                .with(eq(PHONE))
                .times(1)
                .returning(|_| Ok(true));
            otp.expect_verify_code().returning(|_, _| Ok(true));
            let mut wizard = with_otp(otp);
            fill_step_one(&mut wizard);
            wizard
                .set_field("phone_primary", format!(" {PHONE} "))
                .unwrap();

            wizard.request_code().await.unwrap();
            assert!(wizard.submit_code("1234").await.unwrap());
            assert_eq!(wizard.begin_next().unwrap(), NextOutcome::Advanced(2));
        }

        #[tokio::test]
        async fn test_wrong_code_keeps_phone_unverified() {
            let mut otp = MockOtpGateway::new();
            otp.expect_send_code().returning(|_| Ok(true));
            otp.expect_verify_code().returning(|_, _| Ok(false));
            let mut wizard = with_otp(otp);
            wizard.set_field("phone_primary", PHONE).unwrap();

            wizard.request_code().await.unwrap();
            assert!(!wizard.submit_code("9999").await.unwrap());
            assert!(!wizard.is_phone_verified());
            assert_eq!(wizard.code_sent_to(), Some(PHONE));
            assert_eq!(notice_titles(&mut wizard), vec!["OTP Sent", "Invalid OTP"]);
        }

        #[tokio::test]
        async fn test_invalid_phone_never_reaches_gateway() {
            let mut wizard = with_otp(MockOtpGateway::new());
            wizard.set_field("phone_primary", "12345").unwrap();
            assert_eq!(wizard.request_code().await, Err(WizardError::InvalidPhone));
            assert!(wizard.pending().is_idle());
        }

        #[test]
        fn test_code_checks_before_gateway() {
            let mut wizard = demo_wizard();
            wizard.set_field("phone_primary", PHONE).unwrap();
            assert_eq!(
                wizard.begin_submit_code("1234"),
                Err(WizardError::CodeNotRequested)
            );

            let phone = wizard.begin_request_code().unwrap();
            wizard.finish_request_code(&phone, Ok(true));
            assert_eq!(wizard.begin_submit_code("12a4"), Err(WizardError::InvalidCode));
            assert_eq!(wizard.begin_submit_code("12345"), Err(WizardError::InvalidCode));
        }

        #[test]
        fn test_pending_send_is_busy_and_resend_allowed() {
            let mut wizard = demo_wizard();
            wizard.set_field("phone_primary", PHONE).unwrap();

            let phone = wizard.begin_request_code().unwrap();
            assert!(wizard.pending().send_code);
            assert_eq!(
                wizard.begin_request_code(),
                Err(WizardError::Busy("Sending the OTP"))
            );
            wizard.finish_request_code(&phone, Ok(true));
            assert!(wizard.pending().is_idle());

            assert_eq!(wizard.begin_request_code(), Ok(PHONE.to_string()));
        }

        #[test]
        fn test_send_failure_becomes_notice() {
            let mut wizard = demo_wizard();
            wizard.set_field("phone_primary", PHONE).unwrap();
            let phone = wizard.begin_request_code().unwrap();
            wizard.finish_request_code(&phone, Err(GatewayError::Timeout(Duration::from_secs(10))));

            assert_eq!(wizard.code_sent_to(), None);
            let notices = wizard.drain_notices();
            assert_eq!(notices.len(), 1);
            assert!(notices[0].is_error());
        }

        #[tokio::test]
        async fn test_changing_phone_resets_verification() {
            let mut wizard = demo_wizard();
            fill_step_one(&mut wizard);
            wizard.request_code().await.unwrap();
            wizard.submit_code("1234").await.unwrap();
            assert!(wizard.is_phone_verified());

            wizard.set_field("phone_primary", PHONE).unwrap();
            assert!(wizard.is_phone_verified());

            wizard.set_field("phone_primary", "9123456780").unwrap();
            assert!(!wizard.is_phone_verified());
            assert_eq!(wizard.begin_submit_code("1234"), Err(WizardError::CodeNotRequested));
        }

        #[tokio::test]
        async fn test_verified_phone_rejects_new_requests() {
            let mut wizard = demo_wizard();
            wizard.set_field("phone_primary", PHONE).unwrap();
            wizard.request_code().await.unwrap();
            wizard.submit_code("4321").await.unwrap();
            assert_eq!(wizard.request_code().await, Err(WizardError::AlreadyVerified));
        }

        #[test]
        fn test_stale_verification_discarded() {
            let mut wizard = demo_wizard();
            wizard.set_field("phone_primary", PHONE).unwrap();
            let phone = wizard.begin_request_code().unwrap();
            wizard.finish_request_code(&phone, Ok(true));
            let phone = wizard.begin_submit_code("1234").unwrap();

            wizard.set_field("phone_primary", "9123456780").unwrap();
            assert!(!wizard.finish_submit_code(&phone, Ok(true)));
            assert!(!wizard.is_phone_verified());
        }
    }

    mod gstin {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_lookup_fills_derived_fields() {
            let mut gateway = MockGstinGateway::new();
            gateway.expect_verify().with(eq(GSTIN)).times(1).returning(|_| {
                Ok(GstinDetails {
                    valid: true,
                    registration_type: Some("Regular".into()),
                    tax_slab: Some("IGST".into()),
                    registered_state: Some("Maharashtra".into()),
                })
            });
            let mut wizard = with_gstin(gateway);
            wizard.set_field("gstin", GSTIN).unwrap();

            assert!(wizard.lookup_gstin().await.unwrap());
            assert_eq!(wizard.value("gst_registration_type"), Some(&FieldValue::text("Regular")));
            assert_eq!(wizard.value("gst_tax_slab"), Some(&FieldValue::text("IGST")));
            assert_eq!(wizard.value("registered_state"), Some(&FieldValue::text("Maharashtra")));
            assert_eq!(wizard.value("gstin_verified"), Some(&FieldValue::Bool(true)));
            assert_eq!(notice_titles(&mut wizard), vec!["GSTIN Verified"]);
        }

        #[tokio::test]
        async fn test_invalid_lookup_does_not_gate_step() {
            let mut gateway = MockGstinGateway::new();
            gateway
                .expect_verify()
                .returning(|_| Ok(GstinDetails::invalid()));
            let persistence = completed_session(2);
            let demo = Arc::new(DemoBackend::default());
            let mut wizard = start(
                persistence,
                Gateways::new(demo.clone(), Arc::new(gateway), demo),
            );

            assert!(!wizard.lookup_gstin().await.unwrap());
            assert_eq!(notice_titles(&mut wizard), vec!["Invalid GSTIN"]);
            assert_eq!(wizard.begin_next().unwrap(), NextOutcome::Advanced(3));
        }

        #[tokio::test]
        async fn test_require_verified_gate_needs_lookup() {
            let persistence = completed_session(2);
            let mut wizard = Wizard::start(
                Schema::vendor_onboarding(GstinGate::RequireVerified),
                persistence,
                Gateways::demo(Duration::ZERO),
                CallPolicy::default(),
            );

            assert!(matches!(wizard.begin_next().unwrap(), NextOutcome::Blocked(_)));
            assert!(wizard.errors().get("gstin_verified").is_some());

            assert!(wizard.lookup_gstin().await.unwrap());
            assert!(wizard.errors().get("gstin_verified").is_none());
            assert_eq!(wizard.begin_next().unwrap(), NextOutcome::Advanced(3));
        }

        #[test]
        fn test_malformed_gstin_rejected_locally() {
            let mut wizard = with_gstin(MockGstinGateway::new());
            wizard.set_field("gstin", "27AAAAA0000A1Z").unwrap();
            assert_eq!(wizard.begin_gstin_lookup(), Err(WizardError::InvalidGstin));
            wizard.set_field("gstin", "27AAAAA0000A0Z5").unwrap();
            assert_eq!(wizard.begin_gstin_lookup(), Err(WizardError::InvalidGstin));
        }

        #[test]
        fn test_edits_allowed_while_lookup_pending() {
            let mut wizard = demo_wizard();
            wizard.set_field("gstin", GSTIN).unwrap();
            let gstin = wizard.begin_gstin_lookup().unwrap();

            assert_eq!(wizard.begin_gstin_lookup(), Err(WizardError::Busy("GSTIN lookup")));
            wizard.set_field("bank_name", "HDFC Bank").unwrap();
            wizard.set_field("gstin", "29ABCDE1234F2ZX").unwrap();

            let details = GstinDetails {
                valid: true,
                registered_state: Some("Maharashtra".into()),
                ..GstinDetails::default()
            };
            assert!(!wizard.finish_gstin_lookup(&gstin, Ok(details)));
            assert_eq!(wizard.value("registered_state"), Some(&FieldValue::Empty));
            assert!(wizard.pending().is_idle());
        }
    }

    mod submission {
        use super::*;
        use pretty_assertions::assert_eq;

        fn with_submission(persistence: Persistence, gateway: MockSubmissionGateway) -> Wizard {
            let demo = Arc::new(DemoBackend::default());
            start(
                persistence,
                Gateways::new(demo.clone(), demo, Arc::new(gateway)),
            )
        }

        #[tokio::test]
        async fn test_accepted_submission_clears_session() {
            let persistence = completed_session(7);
            let mut wizard = start(persistence.clone(), Gateways::demo(Duration::ZERO));

            let transition = wizard.next().await.unwrap();
            assert_eq!(
                transition,
                Transition::Submission(SubmissionOutcome::Accepted(SUBMISSION_MESSAGE.into()))
            );
            assert_eq!(wizard.phase(), Phase::Submitted);
            assert!(persistence.load().is_none());
            assert_eq!(wizard.set_field("bank_name", "SBI"), Err(WizardError::NotEditing));
            assert_eq!(wizard.prev(), Err(WizardError::NotEditing));
        }

        #[tokio::test]
        async fn test_rejection_returns_to_last_step() {
            let mut gateway = MockSubmissionGateway::new();
            gateway.expect_submit().times(1).returning(|_| {
                Ok(SubmissionReceipt {
                    success: false,
                    message: "Duplicate application".into(),
                })
            });
            let persistence = completed_session(7);
            let mut wizard = with_submission(persistence.clone(), gateway);

            let transition = wizard.next().await.unwrap();
            assert_eq!(
                transition,
                Transition::Submission(SubmissionOutcome::Rejected("Duplicate application".into()))
            );
            assert_eq!(wizard.phase(), Phase::Editing(7));
            assert_eq!(persistence.load().unwrap().values, complete_values());
        }

        #[tokio::test]
        async fn test_transport_failure_keeps_data() {
            let mut gateway = MockSubmissionGateway::new();
            gateway
                .expect_submit()
                .times(1)
                .returning(|_| Err(GatewayError::Transport("connection refused".into())));
            let persistence = completed_session(7);
            let mut wizard = with_submission(persistence.clone(), gateway);

            let transition = wizard.next().await.unwrap();
            assert!(matches!(
                transition,
                Transition::Submission(SubmissionOutcome::Failed(GatewayError::Transport(_)))
            ));
            assert_eq!(wizard.phase(), Phase::Editing(7));
            assert!(persistence.load().is_some());
            assert_eq!(notice_titles(&mut wizard), vec!["Submission Error"]);
        }

        #[test]
        fn test_submitting_phase_blocks_edits() {
            let mut wizard = start(completed_session(7), Gateways::demo(Duration::ZERO));
            assert!(matches!(wizard.begin_next().unwrap(), NextOutcome::Submit(_)));
            assert_eq!(wizard.phase(), Phase::Submitting);
            assert_eq!(wizard.begin_next(), Err(WizardError::NotEditing));
            assert_eq!(wizard.save_progress(), Err(WizardError::NotEditing));
        }

        #[test]
        fn test_finish_without_submit() {
            let mut wizard = demo_wizard();
            let receipt = SubmissionReceipt {
                success: true,
                message: String::new(),
            };
            assert_eq!(
                wizard.finish_submission(Ok(receipt)),
                Err(WizardError::NotSubmitting)
            );
        }

        #[test]
        fn test_final_guard_returns_to_failing_step() {
            let mut values = complete_values();
            values.insert("account_number".into(), FieldValue::text("12"));
            let persistence = Persistence::in_memory();
            persistence.save(&values, 7);
            let mut wizard = start(persistence, Gateways::demo(Duration::ZERO));

            let NextOutcome::Blocked(errors) = wizard.begin_next().unwrap() else {
                panic!("submission should be guarded");
            };
            assert_eq!(wizard.phase(), Phase::Editing(6));
            assert_eq!(errors.get("account_number"), Some("Enter a valid account number"));
        }
    }

    mod errors {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_notice_from_error() {
            let notice = Notice::from(&WizardError::InvalidPhone);
            assert_eq!(notice.level, NoticeLevel::Error);
            assert_eq!(notice.title, "Invalid Phone Number");
            assert_eq!(notice.message, "Please enter a valid 10-digit phone number");
        }
    }
}
