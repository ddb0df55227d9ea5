//! Reusable UI components

mod notice_dialog;

pub use notice_dialog::render_notice_dialog;
