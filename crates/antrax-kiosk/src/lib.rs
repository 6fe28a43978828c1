//! Capture kiosk.
//!
//! Wires the capture engine to the styling service: a camera feed is
//! watched until the ideal moment, the photo is analysed, and every
//! suggested look is rendered through the single-flight generation queue.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod operator;
pub mod session;
pub mod source;

pub use config::KioskConfig;
pub use error::{KioskError, KioskResult};
pub use logging::SessionLogger;
pub use session::{KioskSession, SessionSummary, StyleFailure, StyledOutput};
pub use source::DirectorySource;
