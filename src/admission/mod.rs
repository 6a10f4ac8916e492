//! PAC admission - declarations, events, and the orchestrating gate
//!
//! A declaration goes in, exactly one immutable admission event comes out.
//! Denials re-raise the stage's violation after the event is recorded.

pub mod declaration;
pub mod events;
pub mod gate;

pub use declaration::{DeclarationError, PACDeclaration};
pub use events::{AdmissionEvent, AdmissionOutcome, AuditLog, ViolationEvent};
pub use gate::AdmissionGate;
