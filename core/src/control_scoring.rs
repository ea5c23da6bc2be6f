//! Control scoring model.
//!
//! Converts a control's five categorical attributes into a 0–100 score
//! and the number of matrix quadrants the control is allowed to remove.
//!
//! Point table (maximum of each row sums to 100):
//!   controlType          PREVENTIVE 10 | DETECTIVE 8 | CORRECTIVE 3
//!   applicationCriteria  ALWAYS 10     | RANDOM 5
//!   isDocumented         YES 15        | PARTIAL 7   | NO 0
//!   effectiveness        EFFECTIVE 50  | NEEDS_IMPROVEMENT 25 | NOT_EFFECTIVE 0
//!   automation           AUTOMATIC 15  | MANUAL 10
//!
//! Pure and stateless: identical attributes always give identical output.

use crate::control::{
    ApplicationCriteria, AutomationLevel, ControlAttributes, ControlType, DocumentationLevel,
    EffectivenessLevel,
};
use serde::{Deserialize, Serialize};

pub const MAX_CONTROL_SCORE: u8 = 100;

/// Lowest score that earns two quadrants of reduction.
pub const TWO_QUADRANT_FLOOR: u8 = 81;

/// Lowest score that earns one quadrant of reduction.
pub const ONE_QUADRANT_FLOOR: u8 = 61;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlScore {
    pub score: u8,
    pub reduction_quadrants: u8,
}

impl ControlType {
    pub fn points(self) -> u8 {
        match self {
            Self::Preventive => 10,
            Self::Detective => 8,
            Self::Corrective => 3,
        }
    }
}

impl ApplicationCriteria {
    pub fn points(self) -> u8 {
        match self {
            Self::Always => 10,
            Self::Random => 5,
        }
    }
}

impl DocumentationLevel {
    pub fn points(self) -> u8 {
        match self {
            Self::Yes => 15,
            Self::Partial => 7,
            Self::No => 0,
        }
    }
}

impl EffectivenessLevel {
    pub fn points(self) -> u8 {
        match self {
            Self::Effective => 50,
            Self::NeedsImprovement => 25,
            Self::NotEffective => 0,
        }
    }
}

impl AutomationLevel {
    pub fn points(self) -> u8 {
        match self {
            Self::Automatic => 15,
            Self::Manual => 10,
        }
    }
}

pub fn score_control(attributes: &ControlAttributes) -> ControlScore {
    let score = attributes.control_type.points()
        + attributes.application_criteria.points()
        + attributes.is_documented.points()
        + attributes.effectiveness.points()
        + attributes.automation.points();

    ControlScore {
        score,
        reduction_quadrants: quadrants_for_score(score),
    }
}

/// 81+ → 2, 61..=80 → 1, anything lower → 0.
pub fn quadrants_for_score(score: u8) -> u8 {
    if score >= TWO_QUADRANT_FLOOR {
        2
    } else if score >= ONE_QUADRANT_FLOOR {
        1
    } else {
        0
    }
}
