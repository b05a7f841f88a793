//! Manifest validation logic.
//!
//! Structural rules only: id uniqueness, required fields, value sanity.
//! Whether a declared type exists and whether bindings resolve to producers
//! is decided later, at plan resolution, where the registries live.

use crate::schema::{FirmwareModuleDef, ModuleManifest, SoftwareModuleDef};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing field: {field} in {context}")]
    MissingField { field: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

pub fn validate_manifest(manifest: &ModuleManifest) -> Result<(), ValidationError> {
    // Firmware and software modules share one id namespace.
    let mut ids = HashSet::new();
    for module in &manifest.firmware_module {
        if module.id.is_empty() {
            return Err(ValidationError::MissingField {
                field: "_id".to_string(),
                context: "firmware_module".to_string(),
            });
        }
        if !ids.insert(&module.id) {
            return Err(ValidationError::DuplicateId {
                id: module.id.clone(),
                context: "modules".to_string(),
            });
        }
        validate_firmware_module(module)?;
    }
    for module in &manifest.software_module {
        if module.id.is_empty() {
            return Err(ValidationError::MissingField {
                field: "_id".to_string(),
                context: "software_module".to_string(),
            });
        }
        if !ids.insert(&module.id) {
            return Err(ValidationError::DuplicateId {
                id: module.id.clone(),
                context: "modules".to_string(),
            });
        }
        validate_software_module(module)?;
    }

    Ok(())
}

fn validate_firmware_module(module: &FirmwareModuleDef) -> Result<(), ValidationError> {
    if module.kind.is_empty() {
        return Err(ValidationError::MissingField {
            field: "type".to_string(),
            context: format!("firmware module '{}'", module.id),
        });
    }
    if let Some(env) = &module.environment
        && env.is_empty()
    {
        return Err(ValidationError::InvalidValue {
            field: format!("firmware module '{}' environment", module.id),
            value: String::new(),
            reason: "must not be empty".to_string(),
        });
    }
    if !module.inputs.is_empty() && module.environment.is_none() {
        return Err(ValidationError::MissingField {
            field: "environment".to_string(),
            context: format!(
                "firmware module '{}' (inputs bind within an environment)",
                module.id
            ),
        });
    }
    for (slot, binding) in &module.inputs {
        if slot.is_empty() {
            return Err(ValidationError::MissingField {
                field: "input slot name".to_string(),
                context: format!("firmware module '{}'", module.id),
            });
        }
        if binding.variable.is_empty() {
            return Err(ValidationError::MissingField {
                field: "variable".to_string(),
                context: format!("firmware module '{}' input '{}'", module.id, slot),
            });
        }
        if !binding.multiplier.is_finite() {
            return Err(ValidationError::InvalidValue {
                field: format!("firmware module '{}' input '{}' multiplier", module.id, slot),
                value: binding.multiplier.to_string(),
                reason: "must be finite".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_software_module(module: &SoftwareModuleDef) -> Result<(), ValidationError> {
    if module.kind.is_empty() {
        return Err(ValidationError::MissingField {
            field: "type".to_string(),
            context: format!("software module '{}'", module.id),
        });
    }
    // Controllers act on one environment's variables; a global controller
    // has nothing well-defined to act on.
    match &module.environment {
        None => {
            return Err(ValidationError::MissingField {
                field: "environment".to_string(),
                context: format!("software module '{}'", module.id),
            });
        }
        Some(env) if env.is_empty() => {
            return Err(ValidationError::InvalidValue {
                field: format!("software module '{}' environment", module.id),
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }
        Some(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ArgValue, InputBindingDef};
    use std::collections::BTreeMap;

    fn firmware(id: &str) -> FirmwareModuleDef {
        FirmwareModuleDef {
            id: id.to_string(),
            kind: "am2315".to_string(),
            environment: Some("environment_1".to_string()),
            arguments: Vec::new(),
            inputs: BTreeMap::new(),
        }
    }

    fn software(id: &str) -> SoftwareModuleDef {
        SoftwareModuleDef {
            id: id.to_string(),
            kind: "pid".to_string(),
            environment: Some("environment_1".to_string()),
            parameters: BTreeMap::new(),
        }
    }

    #[test]
    fn accepts_minimal_manifest() {
        let manifest = ModuleManifest {
            firmware_module: vec![firmware("am2315_1")],
            software_module: vec![software("controller_1")],
        };
        validate_manifest(&manifest).unwrap();
    }

    #[test]
    fn rejects_duplicate_ids_across_lists() {
        let manifest = ModuleManifest {
            firmware_module: vec![firmware("dup_1")],
            software_module: vec![software("dup_1")],
        };
        let err = validate_manifest(&manifest).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateId { id, .. } if id == "dup_1"));
    }

    #[test]
    fn rejects_software_module_without_environment() {
        let mut module = software("controller_1");
        module.environment = None;
        let manifest = ModuleManifest {
            firmware_module: vec![],
            software_module: vec![module],
        };
        let err = validate_manifest(&manifest).unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("environment"));
        assert!(msg.contains("controller_1"));
    }

    #[test]
    fn rejects_inputs_without_environment() {
        let mut module = firmware("heater_1");
        module.kind = "binary_actuator".to_string();
        module.environment = None;
        module.arguments = vec![ArgValue::Int(7), ArgValue::Flag(false)];
        module.inputs.insert(
            "command".to_string(),
            InputBindingDef {
                variable: "air_temperature".to_string(),
                multiplier: 1.0,
            },
        );
        let manifest = ModuleManifest {
            firmware_module: vec![module],
            software_module: vec![],
        };
        assert!(validate_manifest(&manifest).is_err());
    }

    #[test]
    fn rejects_non_finite_multiplier() {
        let mut module = firmware("cooler_1");
        module.kind = "binary_actuator".to_string();
        module.inputs.insert(
            "command".to_string(),
            InputBindingDef {
                variable: "air_temperature".to_string(),
                multiplier: f64::NAN,
            },
        );
        let manifest = ModuleManifest {
            firmware_module: vec![module],
            software_module: vec![],
        };
        let err = validate_manifest(&manifest).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_empty_ids_and_types() {
        let manifest = ModuleManifest {
            firmware_module: vec![firmware("")],
            software_module: vec![],
        };
        assert!(validate_manifest(&manifest).is_err());

        let mut module = firmware("ok_1");
        module.kind = String::new();
        let manifest = ModuleManifest {
            firmware_module: vec![module],
            software_module: vec![],
        };
        assert!(validate_manifest(&manifest).is_err());
    }
}
