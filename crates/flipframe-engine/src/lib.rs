//! flipframe engine crate.
//!
//! Window lifecycle, presentation surface negotiation, input translation,
//! input-method control and the frame loop that ties them together.

pub mod device;
pub mod window;
pub mod input;
pub mod ime;
pub mod time;
pub mod core;
pub mod runtime;

pub mod logging;
