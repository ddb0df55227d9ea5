//! Wizard state: form schema, validation, persistence and the state machine

mod forms;
mod notice;
mod persistence;
mod wizard;

pub use forms::*;
pub use notice::*;
pub use persistence::*;
pub use wizard::*;
