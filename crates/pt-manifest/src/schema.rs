//! Module manifest schema definitions.
//!
//! The manifest is the declarative description of one installation: a flat
//! list of firmware modules (sensor and actuator drivers) and a flat list
//! of software modules (controllers). The schema stays permissive and
//! mirrors the file format exactly; rule enforcement lives in
//! [`validate`](crate::validate).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level module manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ModuleManifest {
    #[serde(default)]
    pub firmware_module: Vec<FirmwareModuleDef>,
    #[serde(default)]
    pub software_module: Vec<SoftwareModuleDef>,
}

/// One declared firmware module (sensor or actuator driver).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FirmwareModuleDef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Environment this module serves. Infrastructure modules (serial
    /// bridges) legitimately omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Positional, kind-specific arguments (pin numbers, flags, ports).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgValue>,
    /// Named input slots consuming commanded variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, InputBindingDef>,
}

/// One declared software module (controller).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SoftwareModuleDef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Controllers are always environment-scoped; the schema keeps the
    /// field optional so validation can report the omission by module id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, ParamValue>,
}

/// A variable binding on an input slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputBindingDef {
    /// Variable name, resolved on the commanded plane of the module's
    /// environment.
    pub variable: String,
    /// Scale applied by the consuming module at dispatch.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

/// Positional argument value.
///
/// Untagged so declarations read naturally (`arguments: [27, true]`).
/// Variant order matters: integers must be tried before general numbers so
/// pin numbers stay integral.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ArgValue {
    Flag(bool),
    Int(i64),
    Num(f64),
    Text(String),
}

impl ArgValue {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ArgValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            ArgValue::Int(i) => Some(*i as f64),
            ArgValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Flag(_) => "boolean",
            ArgValue::Int(_) => "integer",
            ArgValue::Num(_) => "number",
            ArgValue::Text(_) => "string",
        }
    }
}

/// Named controller parameter value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Num(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ParamValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            ParamValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Flag(_) => "boolean",
            ParamValue::Num(_) => "number",
            ParamValue::Text(_) => "string",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firmware_module_parses_positional_arguments() {
        let yaml = r#"
firmware_module:
  - _id: heater_1
    type: binary_actuator
    environment: environment_1
    arguments: [7, true]
    inputs:
      command:
        variable: air_temperature
"#;
        let manifest: ModuleManifest = serde_yaml::from_str(yaml).unwrap();
        let heater = &manifest.firmware_module[0];
        assert_eq!(heater.id, "heater_1");
        assert_eq!(heater.kind, "binary_actuator");
        assert_eq!(heater.arguments[0].as_int(), Some(7));
        assert_eq!(heater.arguments[1].as_flag(), Some(true));

        let binding = &heater.inputs["command"];
        assert_eq!(binding.variable, "air_temperature");
        // Omitted multiplier defaults to 1.0.
        assert_eq!(binding.multiplier, 1.0);
    }

    #[test]
    fn untagged_arguments_keep_their_types() {
        let yaml = r#"[true, 27, 2.5, "/dev/ttyACM0"]"#;
        let args: Vec<ArgValue> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(args[0].as_flag(), Some(true));
        assert_eq!(args[1].as_int(), Some(27));
        assert_eq!(args[1].as_num(), Some(27.0));
        assert_eq!(args[2].as_num(), Some(2.5));
        assert_eq!(args[2].as_int(), None);
        assert_eq!(args[3].as_text(), Some("/dev/ttyACM0"));
    }

    #[test]
    fn software_module_parses_mixed_parameters() {
        let yaml = r#"
software_module:
  - _id: air_temperature_controller_1
    type: pid
    environment: environment_1
    parameters:
      variable: air_temperature
      Kp: 1
      Ki: 0.25
      upper_limit: 1
      lower_limit: -1
"#;
        let manifest: ModuleManifest = serde_yaml::from_str(yaml).unwrap();
        let pid = &manifest.software_module[0];
        assert_eq!(pid.kind, "pid");
        assert_eq!(
            pid.parameters["variable"].as_text(),
            Some("air_temperature")
        );
        // Integer-looking numbers still come out as numbers.
        assert_eq!(pid.parameters["Kp"].as_num(), Some(1.0));
        assert_eq!(pid.parameters["Ki"].as_num(), Some(0.25));
        assert_eq!(pid.parameters["lower_limit"].as_num(), Some(-1.0));
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let manifest: ModuleManifest = serde_yaml::from_str("{}").unwrap();
        assert!(manifest.firmware_module.is_empty());
        assert!(manifest.software_module.is_empty());
    }
}
