use tracing::{info_span, Span};

/// Per-run identity handed to every component that logs on behalf of a vehicle.
#[derive(Debug, Clone)]
pub struct RunContext {
    vehicle_id: u64,
    span: Span,
}

impl RunContext {
    pub fn new(vehicle_id: u64) -> Self {
        Self {
            vehicle_id,
            span: info_span!("monitor", vehicle_id),
        }
    }

    pub fn vehicle_id(&self) -> u64 {
        self.vehicle_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
