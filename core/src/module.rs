//! The static, decoded representation of a Wasm binary.
//!
//! Structured control instructions (`block`/`loop`/`if`) are represented as
//! a flat, linearly-addressed instruction array per function rather than a
//! tree of heap-allocated nodes linked through `next`/`in1`/`in2` pointers:
//! every jump target the interpreter ever needs (a label's branch target,
//! its natural-exit target, an `if`'s else-arm) is precomputed by the
//! decoder into a plain array index. This is the representation the design
//! notes call out as preferred over pointer-chasing a linked chain, and it
//! falls out naturally once the nested bodies are appended to one vector in
//! source order instead of being parsed into their own chains.

use crate::types::{BlockType, FuncType, ValueType};

/// Index of an [`Instr`] within a [`Func`]'s body.
pub type InstrIdx = u32;

/// A decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instr {
    I32Const(i32),
    I32Add,
    I32GeS,
    LocalGet(u32),
    LocalSet(u32),
    /// `block bt ... end`. `exit` is the index just past the matching `end`.
    Block { block_type: BlockType, exit: InstrIdx },
    /// `loop bt ... end`. `exit` is the index just past the matching `end`;
    /// the loop's own index (not stored here — the interpreter has it as
    /// its current `ip`) is the branch target.
    Loop { block_type: BlockType, exit: InstrIdx },
    /// `if bt ... [else ...] end`. `else_` is the index of the `else`
    /// marker when one is present; `exit` is the index just past the
    /// matching `end`.
    If {
        block_type: BlockType,
        else_: Option<InstrIdx>,
        exit: InstrIdx,
    },
    /// Marks the boundary between an `if`'s then-arm and else-arm. Reached
    /// during normal forward execution only when the then-arm falls through
    /// without branching.
    Else,
    /// Terminates every instruction sequence (function body, or a
    /// `block`/`loop`/`if` arm).
    End,
    Br(u32),
    BrIf(u32),
    Call(u32),
}

/// One local-variable group declaration: `count` locals all of `value_type`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LocalGroup {
    pub count: u32,
    pub value_type: ValueType,
}

/// A function's static body: its declared locals (beyond parameters) and
/// its flattened instruction sequence.
#[derive(Clone, Debug, Default)]
pub struct FuncBody {
    pub locals: Vec<LocalGroup>,
    pub instrs: Vec<Instr>,
}

impl FuncBody {
    /// Total number of declared locals (not counting parameters).
    pub fn num_locals(&self) -> u32 {
        self.locals.iter().map(|l| l.count).sum()
    }
}

/// The kind of entity an [`Export`] refers to. Core only ever sees `Func`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExportKind {
    Func,
}

/// Name, kind tag, and referenced index of one export entry.
#[derive(Clone, Debug)]
pub struct Export {
    pub name: String,
    pub kind: ExportKind,
    pub index: u32,
}

/// The static, decoded form of a Wasm binary: everything the validator and
/// instantiator need, and nothing the core subset doesn't support (no
/// tables, memories, globals, imports, or a start section).
///
/// The function and code sections are kept as two separate vectors rather
/// than eagerly zipped into one `Func` list: a module whose code section is
/// short (or missing) relative to its function section decodes successfully
/// as data — decoding doesn't enforce semantic typing — and is only
/// rejected once the validator checks their lengths match.
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub types: Vec<FuncType>,
    /// `func_type_idxs[i]` is the type index of the module-defined function
    /// at index `i` (the function section).
    pub func_type_idxs: Vec<u32>,
    /// `code[i]` is the body of the module-defined function at index `i`
    /// (the code section), when the code section has an entry for it.
    pub code: Vec<FuncBody>,
    pub exports: Vec<Export>,
}

impl Module {
    /// Size of the function index space, as declared by the function
    /// section (independent of how many code entries actually followed).
    pub fn num_funcs(&self) -> usize {
        self.func_type_idxs.len()
    }

    pub fn func_type_idx(&self, func_idx: u32) -> Option<u32> {
        self.func_type_idxs.get(func_idx as usize).copied()
    }

    pub fn func_type(&self, func_idx: u32) -> Option<&FuncType> {
        self.types.get(self.func_type_idx(func_idx)? as usize)
    }

    pub fn func_code(&self, func_idx: u32) -> Option<&FuncBody> {
        self.code.get(func_idx as usize)
    }

    pub fn lookup_export(&self, name: &str, kind: ExportKind) -> Option<u32> {
        self.exports
            .iter()
            .find(|e| e.kind == kind && e.name == name)
            .map(|e| e.index)
    }
}
