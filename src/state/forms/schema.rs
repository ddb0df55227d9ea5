//! Field schema: which fields exist, which step owns them, and when they are shown

use super::field::{FieldKind, FieldValue};
use super::rules::{Length, Pattern, Rule};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Current value of every field, keyed by field name
pub type FormValues = BTreeMap<String, FieldValue>;

pub const BUSINESS_TYPES: &[&str] = &[
    "Manufacturer",
    "Corporate Gifting",
    "Reseller",
    "Wholesaler",
    "Other",
];

pub const BRANDING_CAPABILITIES: &[&str] = &[
    "Logo Printing",
    "Custom Packaging",
    "Stickers/Decals",
    "Embroidery",
    "Others",
];

pub const PRODUCT_TYPES: &[&str] = &[
    "Apparel",
    "Gifts/Accessories",
    "Electronics",
    "Custom Products (Non-branded)",
    "Others",
];

pub const CAPACITY_SIZES: &[&str] = &["Small", "Medium", "Large"];

pub const WAREHOUSE_LOCATIONS: &[&str] = &[
    "Delhi",
    "Mumbai",
    "Bangalore",
    "Chennai",
    "Hyderabad",
    "Pune",
    "Kolkata",
    "Other",
];

pub const BANK_ACCOUNT_TYPES: &[&str] = &["Savings", "Current"];

pub const PAYMENT_METHODS: &[&str] = &[
    "Bank Transfer",
    "PayPal",
    "Digital Wallet (Razorpay, Paytm)",
];

pub const INDIAN_STATES: &[&str] = &[
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chhattisgarh",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
    "Andaman and Nicobar Islands",
    "Chandigarh",
    "Dadra and Nagar Haveli and Daman and Diu",
    "Delhi",
    "Jammu and Kashmir",
    "Ladakh",
    "Lakshadweep",
    "Puducherry",
];

/// Fields the wizard reads or writes outside of plain edits
pub mod names {
    pub const PHONE_PRIMARY: &str = "phone_primary";
    pub const PHONE_VERIFIED: &str = "phone_primary_verified";
    pub const GSTIN: &str = "gstin";
    pub const GSTIN_VERIFIED: &str = "gstin_verified";
    pub const GST_REGISTRATION_TYPE: &str = "gst_registration_type";
    pub const GST_TAX_SLAB: &str = "gst_tax_slab";
    pub const REGISTERED_STATE: &str = "registered_state";
}

/// Titles of the onboarding steps, in order
pub const VENDOR_STEPS: &[&str] = &[
    "Basic Info",
    "MSME & GST",
    "KYC",
    "Production",
    "Warehousing",
    "Banking",
    "Agreement",
];

/// What must hold about the GSTIN before step 2 can be left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GstinGate {
    /// A well-formed GSTIN is enough; the lookup is advisory
    #[default]
    FormatOnly,
    /// The lookup must have confirmed the current GSTIN
    RequireVerified,
}

/// When a field is shown (and therefore validated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Always,
    /// Shown only while the named boolean field is checked
    WhenTrue(&'static str),
}

/// Declaration of a single form field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub step: usize,
    pub kind: FieldKind,
    /// Required fields have their rule applied when visible
    pub required: bool,
    pub rule: Rule,
    pub visibility: Visibility,
    /// Written only by verification sub-flows, never by direct edits
    pub read_only: bool,
    pub default: Option<FieldValue>,
}

impl FieldSpec {
    pub fn new(step: usize, name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            step,
            kind,
            required: false,
            rule: Rule::Any,
            visibility: Visibility::Always,
            read_only: false,
            default: None,
        }
    }

    pub fn text(step: usize, name: &'static str, label: &'static str) -> Self {
        Self::new(step, name, label, FieldKind::Text)
    }

    pub fn checkbox(step: usize, name: &'static str, label: &'static str) -> Self {
        Self::new(step, name, label, FieldKind::Boolean)
    }

    pub fn choice(
        step: usize,
        name: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self::new(step, name, label, FieldKind::Choice(options))
    }

    pub fn choice_set(
        step: usize,
        name: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self::new(step, name, label, FieldKind::ChoiceSet(options))
    }

    pub fn file(step: usize, name: &'static str, label: &'static str) -> Self {
        Self::new(step, name, label, FieldKind::File)
    }

    pub fn number(step: usize, name: &'static str, label: &'static str) -> Self {
        Self::new(step, name, label, FieldKind::Number)
    }

    /// Mark the field required and attach its rule
    pub fn required(mut self, rule: Rule) -> Self {
        self.required = true;
        self.rule = rule;
        self
    }

    /// Show the field only while `field` is checked
    pub fn when(mut self, field: &'static str) -> Self {
        self.visibility = Visibility::WhenTrue(field);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Value the field starts with in a fresh session
    pub fn initial_value(&self) -> FieldValue {
        self.default
            .clone()
            .unwrap_or_else(|| self.kind.default_value())
    }
}

/// Structural problems in a schema declaration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema declares no steps")]
    NoSteps,
    #[error("field `{0}` is declared more than once")]
    DuplicateField(&'static str),
    #[error("field `{field}` belongs to step {step}, outside 1..={steps}")]
    StepOutOfRange {
        field: &'static str,
        step: usize,
        steps: usize,
    },
    #[error("step {0} has no fields")]
    EmptyStep(usize),
    #[error("field `{field}` depends on `{depends_on}`, which is not a checkbox in this schema")]
    InvalidVisibility {
        field: &'static str,
        depends_on: &'static str,
    },
    #[error("default value of `{0}` does not fit its kind")]
    InvalidDefault(&'static str),
}

/// The full set of fields across all steps
#[derive(Debug, Clone)]
pub struct Schema {
    step_titles: Vec<&'static str>,
    fields: Vec<FieldSpec>,
    index: HashMap<&'static str, usize>,
}

impl Schema {
    /// Build a schema, checking that steps are contiguous and fields well-formed
    pub fn new(step_titles: &[&'static str], fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        let steps = step_titles.len();
        if steps == 0 {
            return Err(SchemaError::NoSteps);
        }

        let mut index = HashMap::new();
        for (i, field) in fields.iter().enumerate() {
            if index.insert(field.name, i).is_some() {
                return Err(SchemaError::DuplicateField(field.name));
            }
            if field.step == 0 || field.step > steps {
                return Err(SchemaError::StepOutOfRange {
                    field: field.name,
                    step: field.step,
                    steps,
                });
            }
            if !field.kind.accepts(&field.initial_value()) {
                return Err(SchemaError::InvalidDefault(field.name));
            }
        }

        for field in &fields {
            if let Visibility::WhenTrue(depends_on) = field.visibility {
                let is_checkbox = index
                    .get(depends_on)
                    .is_some_and(|&i| fields[i].kind == FieldKind::Boolean);
                if !is_checkbox {
                    return Err(SchemaError::InvalidVisibility {
                        field: field.name,
                        depends_on,
                    });
                }
            }
        }

        if let Some(empty) = (1..=steps).find(|step| fields.iter().all(|f| f.step != *step)) {
            return Err(SchemaError::EmptyStep(empty));
        }

        Ok(Self::from_parts(step_titles, fields))
    }

    fn from_parts(step_titles: &[&'static str], fields: Vec<FieldSpec>) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.name, i))
            .collect();
        Self {
            step_titles: step_titles.to_vec(),
            fields,
            index,
        }
    }

    /// The seven-step marketplace vendor onboarding form
    pub fn vendor_onboarding(gstin_gate: GstinGate) -> Self {
        Self::from_parts(VENDOR_STEPS, vendor_fields(gstin_gate))
    }

    pub fn step_count(&self) -> usize {
        self.step_titles.len()
    }

    pub fn step_title(&self, step: usize) -> Option<&'static str> {
        step.checked_sub(1)
            .and_then(|i| self.step_titles.get(i))
            .copied()
    }

    pub fn step_titles(&self) -> &[&'static str] {
        &self.step_titles
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Fields of one step in declaration order
    pub fn fields_for_step(&self, step: usize) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(move |f| f.step == step)
    }

    /// Fields of one step that are currently shown
    pub fn visible_fields<'a>(
        &'a self,
        step: usize,
        values: &'a FormValues,
    ) -> impl Iterator<Item = &'a FieldSpec> {
        self.fields_for_step(step)
            .filter(move |f| self.is_visible(f.name, values))
    }

    /// Whether a field is shown given the sibling values. Unknown fields are never visible.
    pub fn is_visible(&self, name: &str, values: &FormValues) -> bool {
        match self.field(name).map(|f| f.visibility) {
            None => false,
            Some(Visibility::Always) => true,
            Some(Visibility::WhenTrue(depends_on)) => {
                values.get(depends_on).is_some_and(FieldValue::as_bool)
            }
        }
    }

    /// Default values for a fresh session
    pub fn initial_values(&self) -> FormValues {
        self.fields
            .iter()
            .map(|f| (f.name.to_string(), f.initial_value()))
            .collect()
    }
}

/// Field declarations of the vendor onboarding form
pub fn vendor_fields(gstin_gate: GstinGate) -> Vec<FieldSpec> {
    let mut gstin_verified = FieldSpec::checkbox(2, "gstin_verified", "GSTIN Verified").read_only();
    if gstin_gate == GstinGate::RequireVerified {
        gstin_verified =
            gstin_verified.required(Rule::MustBeTrue("Verify your GSTIN before continuing"));
    }

    vec![
        // Step 1: Basic vendor information
        FieldSpec::text(1, "business_name", "Business Name").required(Rule::Matches {
            pattern: Pattern::BusinessName,
            required: "Business name is required",
            length: None,
            invalid: "Business name can only contain letters, numbers, spaces, dots, and hyphens",
        }),
        FieldSpec::choice_set(1, "business_type", "Business Type", BUSINESS_TYPES)
            .required(Rule::AtLeastOne("Please select at least one business type")),
        FieldSpec::text(1, "address_street", "Street Address")
            .required(Rule::NonEmpty("Street address is required")),
        FieldSpec::text(1, "address_city", "City").required(Rule::NonEmpty("City is required")),
        FieldSpec::choice(1, "address_state", "State", INDIAN_STATES)
            .required(Rule::NonEmpty("State is required")),
        FieldSpec::text(1, "address_pin_code", "PIN Code").required(Rule::Matches {
            pattern: Pattern::PinCode,
            required: "PIN code is required",
            length: None,
            invalid: "Enter a valid 6-digit PIN code",
        }),
        FieldSpec::text(1, "address_country", "Country").default_value("India"),
        FieldSpec::text(1, "contact_person_name", "Contact Person Name")
            .required(Rule::NonEmpty("Contact person name is required")),
        FieldSpec::text(1, "email_address", "Email Address").required(Rule::Matches {
            pattern: Pattern::Email,
            required: "Email address is required",
            length: None,
            invalid: "Enter a valid email address",
        }),
        FieldSpec::text(1, "phone_primary", "Primary Phone").required(Rule::Matches {
            pattern: Pattern::IndianMobile,
            required: "Phone number is required",
            length: Some(Length::AtLeast(10, "Phone number must be at least 10 digits")),
            invalid: "Enter a valid Indian mobile number",
        }),
        FieldSpec::checkbox(1, "phone_primary_verified", "Phone Verified")
            .required(Rule::MustBeTrue("Please verify your phone number with OTP"))
            .read_only(),
        FieldSpec::text(1, "phone_secondary", "Secondary Phone (optional)"),
        // Step 2: MSME & GST
        FieldSpec::checkbox(2, "msme_status", "Registered MSME"),
        FieldSpec::text(2, "msme_registration_number", "MSME Registration Number")
            .when("msme_status"),
        FieldSpec::text(2, "gstin", "GSTIN").required(Rule::Matches {
            pattern: Pattern::Gstin,
            required: "GSTIN is required",
            length: Some(Length::Exactly(15, "GSTIN must be 15 characters")),
            invalid: "Enter a valid GSTIN",
        }),
        gstin_verified,
        FieldSpec::text(2, "gst_registration_type", "GST Registration Type").read_only(),
        FieldSpec::text(2, "gst_tax_slab", "GST Tax Slab").read_only(),
        FieldSpec::text(2, "registered_state", "Registered State").read_only(),
        // Step 3: KYC documents
        FieldSpec::file(3, "upload_pan_card", "PAN Card (file path)"),
        FieldSpec::file(3, "upload_aadhaar_card", "Aadhaar Card (file path)"),
        FieldSpec::file(3, "upload_selfie", "Selfie (file path)"),
        // Step 4: Production & branding
        FieldSpec::checkbox(4, "in_house_production", "In-house Production"),
        FieldSpec::choice(4, "production_capacity", "Production Capacity", CAPACITY_SIZES)
            .when("in_house_production"),
        FieldSpec::text(4, "lead_time_for_production", "Production Lead Time")
            .when("in_house_production"),
        FieldSpec::choice_set(
            4,
            "products_manufactured_in_house",
            "Products Manufactured In-house",
            PRODUCT_TYPES,
        )
        .when("in_house_production"),
        FieldSpec::checkbox(4, "in_house_branding", "In-house Branding"),
        FieldSpec::choice_set(
            4,
            "branding_capabilities",
            "Branding Capabilities",
            BRANDING_CAPABILITIES,
        )
        .when("in_house_branding"),
        FieldSpec::choice(4, "branding_capacity", "Branding Capacity", CAPACITY_SIZES)
            .when("in_house_branding"),
        // Step 5: Warehousing
        FieldSpec::checkbox(5, "requires_warehousing", "Requires Warehousing"),
        FieldSpec::choice(
            5,
            "preferred_warehouse_location",
            "Preferred Warehouse Location",
            WAREHOUSE_LOCATIONS,
        )
        .when("requires_warehousing"),
        FieldSpec::text(5, "warehouse_location", "Warehouse Address / Map Link")
            .when("requires_warehousing"),
        FieldSpec::number(5, "storage_volume", "Storage Volume (cu. ft.)")
            .when("requires_warehousing"),
        FieldSpec::text(5, "storage_duration", "Storage Duration").when("requires_warehousing"),
        // Step 6: Banking & payment
        FieldSpec::choice(6, "bank_account_type", "Bank Account Type", BANK_ACCOUNT_TYPES)
            .required(Rule::NonEmpty("Select an account type"))
            .default_value("Current"),
        FieldSpec::text(6, "account_number", "Account Number").required(Rule::Matches {
            pattern: Pattern::AccountNumber,
            required: "Account number is required",
            length: None,
            invalid: "Enter a valid account number",
        }),
        FieldSpec::text(6, "bank_name", "Bank Name")
            .required(Rule::NonEmpty("Bank name is required")),
        FieldSpec::text(6, "ifsc_code", "IFSC Code").required(Rule::Matches {
            pattern: Pattern::Ifsc,
            required: "IFSC code is required",
            length: Some(Length::Exactly(11, "IFSC code must be 11 characters")),
            invalid: "Enter a valid IFSC code",
        }),
        FieldSpec::choice(6, "payment_method", "Payment Method", PAYMENT_METHODS)
            .required(Rule::NonEmpty("Select a payment method"))
            .default_value("Bank Transfer"),
        FieldSpec::checkbox(6, "payment_terms_agreement", "I agree to the payment terms")
            .required(Rule::MustBeTrue("You must agree to the payment terms")),
        FieldSpec::checkbox(
            6,
            "payment_terms_satisfaction",
            "I agree to the customer satisfaction terms",
        )
        .required(Rule::MustBeTrue(
            "You must agree to the customer satisfaction terms",
        )),
        // Step 7: Cross-listing & agreement
        FieldSpec::checkbox(7, "branding_offer", "Offer Branding Services"),
        FieldSpec::checkbox(7, "cross_listing_permission", "Allow Cross-listing")
            .when("branding_offer"),
        FieldSpec::checkbox(7, "cross_listing_agreement", "Accept Cross-listing Agreement")
            .when("branding_offer"),
        FieldSpec::text(7, "agreement_terms", "Digital Signature (full name)")
            .required(Rule::NonEmpty("Digital signature is required to accept the agreement")),
        FieldSpec::text(7, "digital_signature", "Authorized Signatory (optional)"),
    ]
}
