//! Binary decoder and static module model for a minimal WebAssembly runtime.
//!
//! This crate owns everything downstream consumers (the validator, and the
//! runtime's instantiator/interpreter) agree on: the decoded [`Module`]
//! representation and the binary parser that produces it. It deliberately
//! knows nothing about validation rules or execution — those live one
//! layer up, the same way the full-featured `wasmi` crate keeps its binary
//! representation (there, `parity_wasm::elements::Module`) independent of
//! both its validator and its interpreter.

mod decode;
mod error;
mod module;
mod reader;
mod types;
mod value;

pub use decode::decode_module;
pub use error::DecodeError;
pub use module::{Export, ExportKind, FuncBody, Instr, InstrIdx, LocalGroup, Module};
pub use reader::Reader;
pub use types::{BlockType, FuncType, ValueType};
pub use value::Value;
