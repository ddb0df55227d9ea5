//! Form rendering module
//!
//! - `field_renderer`: bordered field widgets
//! - `wizard_form`: the rows of the current step

mod field_renderer;
mod wizard_form;

pub use wizard_form::draw_form;
