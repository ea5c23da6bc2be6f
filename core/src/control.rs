//! Risk controls and their categorical attributes.
//!
//! Every attribute is a closed enum. Free-form strings coming off the
//! wire are parsed through `FromStr` (or `RawControlAttributes`), and an
//! unknown value is rejected with `InvalidInput` instead of falling back
//! to some default.

use crate::{
    control_scoring::{score_control, ControlScore},
    error::{QuantError, QuantResult},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Declares a closed attribute enum with its wire spelling.
macro_rules! attribute_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = QuantError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(QuantError::InvalidInput {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

attribute_enum! {
    /// What the control does about the risk event.
    ControlType, "controlType" {
        Preventive => "PREVENTIVE",
        Detective => "DETECTIVE",
        Corrective => "CORRECTIVE",
    }
}

attribute_enum! {
    /// How consistently the control is applied.
    ApplicationCriteria, "applicationCriteria" {
        Always => "ALWAYS",
        Random => "RANDOM",
    }
}

attribute_enum! {
    DocumentationLevel, "isDocumented" {
        Yes => "YES",
        Partial => "PARTIAL",
        No => "NO",
    }
}

attribute_enum! {
    EffectivenessLevel, "effectiveness" {
        Effective => "EFFECTIVE",
        NeedsImprovement => "NEEDS_IMPROVEMENT",
        NotEffective => "NOT_EFFECTIVE",
    }
}

attribute_enum! {
    AutomationLevel, "automation" {
        Automatic => "AUTOMATIC",
        Manual => "MANUAL",
    }
}

/// The five validated attributes of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlAttributes {
    pub control_type: ControlType,
    pub application_criteria: ApplicationCriteria,
    pub is_documented: DocumentationLevel,
    pub effectiveness: EffectivenessLevel,
    pub automation: AutomationLevel,
}

/// Attributes exactly as the collaborator sent them, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawControlAttributes {
    pub control_type: String,
    pub application_criteria: String,
    pub is_documented: String,
    pub effectiveness: String,
    pub automation: String,
}

impl TryFrom<&RawControlAttributes> for ControlAttributes {
    type Error = QuantError;

    fn try_from(raw: &RawControlAttributes) -> QuantResult<Self> {
        Ok(Self {
            control_type: raw.control_type.parse()?,
            application_criteria: raw.application_criteria.parse()?,
            is_documented: raw.is_documented.parse()?,
            effectiveness: raw.effectiveness.parse()?,
            automation: raw.automation.parse()?,
        })
    }
}

/// A scored control attached to one risk assessment.
///
/// `score` and `reduction_quadrants` are derived; the only way to change
/// them is to change the attributes through `edit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskControl {
    #[serde(flatten)]
    attributes: ControlAttributes,
    score: u8,
    reduction_quadrants: u8,
}

impl RiskControl {
    pub fn new(attributes: ControlAttributes) -> Self {
        let ControlScore {
            score,
            reduction_quadrants,
        } = score_control(&attributes);
        Self {
            attributes,
            score,
            reduction_quadrants,
        }
    }

    pub fn from_raw(raw: &RawControlAttributes) -> QuantResult<Self> {
        Ok(Self::new(ControlAttributes::try_from(raw)?))
    }

    /// Replace the attributes and re-score.
    pub fn edit(&mut self, attributes: ControlAttributes) {
        *self = Self::new(attributes);
    }

    pub fn attributes(&self) -> &ControlAttributes {
        &self.attributes
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn reduction_quadrants(&self) -> u8 {
        self.reduction_quadrants
    }
}
