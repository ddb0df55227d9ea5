//! Deterministic stand-in for the verification and submission backend

use super::traits::{
    GatewayError, GstinDetails, GstinGateway, OtpGateway, SubmissionGateway, SubmissionReceipt,
};
use crate::state::{FormValues, Pattern};
use async_trait::async_trait;
use std::time::Duration;

const REGISTRATION_TYPES: &[&str] = &["Regular", "Composition"];
const TAX_SLABS: &[&str] = &["CGST", "SGST", "IGST"];

/// Confirmation returned for every accepted application
pub const SUBMISSION_MESSAGE: &str = "Vendor registration submitted successfully! Our team will review your application and contact you shortly.";

/// State named by the two-digit GST state code
pub fn state_for_code(code: &str) -> Option<&'static str> {
    let state = match code {
        "01" => "Jammu and Kashmir",
        "02" => "Himachal Pradesh",
        "03" => "Punjab",
        "04" => "Chandigarh",
        "05" => "Uttarakhand",
        "06" => "Haryana",
        "07" => "Delhi",
        "08" => "Rajasthan",
        "09" => "Uttar Pradesh",
        "10" => "Bihar",
        "11" => "Sikkim",
        "12" => "Arunachal Pradesh",
        "13" => "Nagaland",
        "14" => "Manipur",
        "15" => "Mizoram",
        "16" => "Tripura",
        "17" => "Meghalaya",
        "18" => "Assam",
        "19" => "West Bengal",
        "20" => "Jharkhand",
        "21" => "Odisha",
        "22" => "Chhattisgarh",
        "23" => "Madhya Pradesh",
        "24" => "Gujarat",
        "27" => "Maharashtra",
        "29" => "Karnataka",
        "32" => "Kerala",
        "33" => "Tamil Nadu",
        "36" => "Telangana",
        "37" => "Andhra Pradesh",
        _ => return None,
    };
    Some(state)
}

/// Accepts every well-formed request after a fixed delay
#[derive(Debug, Clone, Default)]
pub struct DemoBackend {
    latency: Duration,
}

impl DemoBackend {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl OtpGateway for DemoBackend {
    async fn send_code(&self, phone: &str) -> Result<bool, GatewayError> {
        tracing::info!("Sending OTP to {phone}");
        self.simulate_latency().await;
        Ok(true)
    }

    async fn verify_code(&self, phone: &str, code: &str) -> Result<bool, GatewayError> {
        tracing::info!("Verifying OTP for {phone}");
        self.simulate_latency().await;
        Ok(Pattern::OtpCode.is_match(code))
    }
}

#[async_trait]
impl GstinGateway for DemoBackend {
    async fn verify(&self, gstin: &str) -> Result<GstinDetails, GatewayError> {
        tracing::info!("Verifying GSTIN {gstin}");
        self.simulate_latency().await;

        if !Pattern::Gstin.is_match(gstin) {
            return Ok(GstinDetails::invalid());
        }

        let state = state_for_code(&gstin[..2]).unwrap_or("Unknown");
        let checksum: usize = gstin.bytes().map(usize::from).sum();

        Ok(GstinDetails {
            valid: true,
            registration_type: Some(REGISTRATION_TYPES[checksum % REGISTRATION_TYPES.len()].to_string()),
            tax_slab: Some(TAX_SLABS[checksum % TAX_SLABS.len()].to_string()),
            registered_state: Some(state.to_string()),
        })
    }
}

#[async_trait]
impl SubmissionGateway for DemoBackend {
    async fn submit(&self, values: &FormValues) -> Result<SubmissionReceipt, GatewayError> {
        tracing::info!(fields = values.len(), "Submitting vendor application");
        self.simulate_latency().await;
        Ok(SubmissionReceipt {
            success: true,
            message: SUBMISSION_MESSAGE.to_string(),
        })
    }
}
