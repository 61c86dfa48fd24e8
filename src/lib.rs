//! A minimal WebAssembly interpreter core: decode, validate, instantiate,
//! and execute the Wasm 1.0 MVP subset described in the core's scope (a
//! handful of numeric, local, and structured control instructions; no
//! memories, tables, globals, or imports).
//!
//! The binary decoder and static module model live in `wasmi-mvp-core`,
//! structural validation in `wasmi-mvp-validation`; this crate owns
//! instantiation and execution, and re-exports the pieces of both a caller
//! needs to go from raw bytes to a running function call. [`load`] is the
//! usual entry point.

pub mod engine;
mod error;
pub mod instance;
pub mod invoke;

pub use error::{Error, RuntimeError};
pub use instance::{FuncAddr, ModuleInstance, Store};
pub use invoke::{invoke, lookup_func_by_name};
pub use wasmi_mvp_core::{
    BlockType, DecodeError, Export, ExportKind, FuncBody, FuncType, Instr, InstrIdx, LocalGroup,
    Module, Reader, Value, ValueType,
};
pub use wasmi_mvp_validation::ValidationError;

use std::rc::Rc;

/// Decodes, validates, and instantiates a Wasm binary in one step.
pub fn load(bytes: &[u8]) -> Result<Store, Error> {
    let module = wasmi_mvp_core::decode_module(bytes)?;
    wasmi_mvp_validation::validate_module(&module)?;
    Ok(instance::instantiate(Rc::new(module)))
}
