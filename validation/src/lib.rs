//! Structural validation for a decoded [`Module`].
//!
//! Kept as its own crate, split out from the interpreter the same way the
//! teacher splits `wasmi-validation` out from `wasmi`: a module can be
//! checked for structural soundness without pulling in anything about
//! execution. Only the three structural checks named in the core's scope
//! are performed here — deep instruction-level type checking is a
//! non-goal, left to whatever runs the module.

use std::fmt;
use wasmi_mvp_core::{ExportKind, Module};

/// A structural validation failure. Named variants rather than one opaque
/// "invalid" marker so a failing conformance run can say which check
/// tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    /// The function section and code section declared different numbers of
    /// entries.
    FuncCodeCountMismatch { funcs: usize, code: usize },
    /// A function's declared type index names no entry in the type
    /// section.
    TypeIndexOutOfRange { func_idx: u32, type_idx: u32 },
    /// An export's index names no entry in its kind's index space.
    ExportIndexOutOfRange { export_idx: u32, index: u32 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::FuncCodeCountMismatch { funcs, code } => write!(
                f,
                "function section has {funcs} entries but code section has {code}"
            ),
            ValidationError::TypeIndexOutOfRange { func_idx, type_idx } => write!(
                f,
                "function {func_idx} names out-of-range type index {type_idx}"
            ),
            ValidationError::ExportIndexOutOfRange { export_idx, index } => write!(
                f,
                "export {export_idx} names out-of-range index {index}"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Runs the core's three structural checks over `module`:
///
/// 1. the function section and code section have the same length,
/// 2. every function's type index is in range of the type section, and
/// 3. every export's index is in range of its kind's space (only `func` is
///    a supported export kind in the core, so this is the function index
///    space).
pub fn validate_module(module: &Module) -> Result<(), ValidationError> {
    if module.func_type_idxs.len() != module.code.len() {
        return Err(ValidationError::FuncCodeCountMismatch {
            funcs: module.func_type_idxs.len(),
            code: module.code.len(),
        });
    }

    for (func_idx, &type_idx) in module.func_type_idxs.iter().enumerate() {
        if module.types.get(type_idx as usize).is_none() {
            return Err(ValidationError::TypeIndexOutOfRange {
                func_idx: func_idx as u32,
                type_idx,
            });
        }
    }

    for (export_idx, export) in module.exports.iter().enumerate() {
        let in_range = match export.kind {
            ExportKind::Func => (export.index as usize) < module.num_funcs(),
        };
        if !in_range {
            return Err(ValidationError::ExportIndexOutOfRange {
                export_idx: export_idx as u32,
                index: export.index,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wasmi_mvp_core::{Export, FuncBody, FuncType, ValueType};

    fn func_type() -> FuncType {
        FuncType::new(vec![ValueType::I32], vec![ValueType::I32])
    }

    #[test]
    fn accepts_well_formed_module() {
        let module = Module {
            types: vec![func_type()],
            func_type_idxs: vec![0],
            code: vec![FuncBody::default()],
            exports: vec![Export {
                name: "f".into(),
                kind: ExportKind::Func,
                index: 0,
            }],
        };
        assert_eq!(validate_module(&module), Ok(()));
    }

    #[test]
    fn rejects_func_code_count_mismatch() {
        let module = Module {
            types: vec![func_type()],
            func_type_idxs: vec![0],
            code: vec![],
            exports: vec![],
        };
        assert_matches!(
            validate_module(&module),
            Err(ValidationError::FuncCodeCountMismatch { funcs: 1, code: 0 })
        );
    }

    #[test]
    fn rejects_out_of_range_type_index() {
        let module = Module {
            types: vec![],
            func_type_idxs: vec![0],
            code: vec![FuncBody::default()],
            exports: vec![],
        };
        assert_matches!(
            validate_module(&module),
            Err(ValidationError::TypeIndexOutOfRange { func_idx: 0, type_idx: 0 })
        );
    }

    #[test]
    fn rejects_out_of_range_export_index() {
        let module = Module {
            types: vec![func_type()],
            func_type_idxs: vec![0],
            code: vec![FuncBody::default()],
            exports: vec![Export {
                name: "missing".into(),
                kind: ExportKind::Func,
                index: 5,
            }],
        };
        assert_matches!(
            validate_module(&module),
            Err(ValidationError::ExportIndexOutOfRange { export_idx: 0, index: 5 })
        );
    }
}
