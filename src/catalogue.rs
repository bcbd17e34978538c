//! Named properties evaluated on every run.

use serde::{Deserialize, Serialize};

/// Id given to the synthesized envelope property unless configured otherwise.
pub const ENVELOPE_PROPERTY_ID: u32 = 4;

pub const ENVELOPE_PROPERTY_NAME: &str = "envelope";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub id: u32,
    pub formula: String,
}

impl Property {
    pub fn new(name: impl Into<String>, id: u32, formula: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id,
            formula: formula.into(),
        }
    }
}

/// Properties of the reference vehicle deployment.
pub fn reference() -> Vec<Property> {
    vec![
        Property::new(
            "speed",
            0,
            "out = always((speed > 100) implies eventually[0:5](speed <= 100))",
        ),
        Property::new("acc", 1, "out = always[0:5](acceleration >= -20 and acceleration <= 20)"),
        Property::new(
            "xpos",
            2,
            "out = always((x < 0 or x > 600) implies eventually[0:5](x >= 0 and x <= 600))",
        ),
        Property::new(
            "all",
            3,
            "out = always((speed > 100 or acceleration < -20 or acceleration > 20 or x < 0 or x > 600) \
             implies eventually[0:5](speed <= 100 and acceleration >= -20 and acceleration <= 20 \
             and x >= 0 and x <= 600))",
        ),
    ]
}
