//! Execution gate state
//!
//! Ordered progress flags for one validation attempt: activation → color
//! gateway → admission. The value is owned by the attempt and torn down with
//! it. The value is deliberately not `Clone` and must never be shared across
//! concurrently running attempts. Downstream tool execution may only proceed
//! once every gate has been marked passed, in order.

use crate::error::{GovernanceResult, Violation};

/// Per-attempt gate state. Create one at pipeline start, drop it after.
#[derive(Debug, Default)]
pub struct ExecutionGates {
    activation_validated: bool,
    color_gateway_validated: bool,
    admission_validated: bool,
}

impl ExecutionGates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_activation_validated(&mut self) {
        self.activation_validated = true;
    }

    pub fn mark_color_gateway_validated(&mut self) {
        self.color_gateway_validated = true;
    }

    pub fn mark_admission_validated(&mut self) {
        self.admission_validated = true;
    }

    pub fn is_activation_validated(&self) -> bool {
        self.activation_validated
    }

    /// GATE: activation must precede the color gateway check.
    pub fn require_activation_before_color_gateway(&self) -> GovernanceResult<()> {
        if !self.activation_validated {
            return Err(Violation::ExecutionGate {
                gate: "PRE_COLOR_GATEWAY".to_string(),
                reason: "activation block must be validated before color gateway check"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// GATE: activation must precede PAC admission.
    pub fn require_activation_before_admission(&self) -> GovernanceResult<()> {
        if !self.activation_validated {
            return Err(Violation::ExecutionGate {
                gate: "PRE_PAC_ADMISSION".to_string(),
                reason: "activation block must be validated before PAC admission".to_string(),
            });
        }
        Ok(())
    }

    /// GATE: the full chain must have passed before any tool execution.
    pub fn require_all_passed(&self) -> GovernanceResult<()> {
        let (gate, reason) = if !self.activation_validated {
            ("FULL_CHAIN", "activation block not validated")
        } else if !self.color_gateway_validated {
            ("FULL_CHAIN", "color gateway not validated")
        } else if !self.admission_validated {
            ("FULL_CHAIN", "PAC admission not validated")
        } else {
            return Ok(());
        };
        Err(Violation::ExecutionGate {
            gate: gate.to_string(),
            reason: reason.to_string(),
        })
    }
}
