//! Instantiation: turning a static [`Module`] into a runnable [`Store`].
//!
//! The core subset has no imports, memories, tables, or globals, so
//! instantiation here only has to do with functions: allocate one
//! `FuncInstance` per module-defined function and hand back their addresses.
//! `FuncAddr` allocation is local to the `Store` rather than a process-wide
//! counter, so more than one module can be instantiated in a process without
//! their function addresses colliding.

use std::rc::Rc;

use wasmi_mvp_core::Module;

use crate::engine::stack::{Stack, DEFAULT_STACK_CAPACITY};

/// Opaque index into a [`Store`]'s function table.
pub type FuncAddr = u32;

/// The module-level state shared by every `FuncInstance` it owns: the
/// static module it was instantiated from, and the function addresses of
/// its module-defined functions in index order (`funcaddrs[i]` is the
/// address of function `i`).
pub struct ModuleInstance {
    pub module: Rc<Module>,
    pub funcaddrs: Vec<FuncAddr>,
}

/// A single callable function: which module instance owns it, and which of
/// that module's function indices it is.
pub struct FuncInstance {
    pub module_instance: Rc<ModuleInstance>,
    pub func_idx: u32,
}

/// Runtime state for one instantiated module: its function table and the
/// call stack executions run against.
pub struct Store {
    pub funcs: Vec<FuncInstance>,
    pub stack: Stack,
    /// The single module instance this store was instantiated for. Kept
    /// directly so callers can look up exports without reaching through a
    /// `FuncInstance` (and so it's still available for a module with no
    /// functions at all).
    pub module_instance: Rc<ModuleInstance>,
}

/// Instantiates `module`, allocating one `FuncInstance` per module-defined
/// function. Since the core subset has no imports, the function index space
/// and the `FuncAddr` space coincide: `funcaddrs[i] == i`.
pub fn instantiate(module: Rc<Module>) -> Store {
    let num_funcs = module.num_funcs() as u32;
    let module_instance = Rc::new(ModuleInstance {
        module: Rc::clone(&module),
        funcaddrs: (0..num_funcs).collect(),
    });

    let funcs = (0..num_funcs)
        .map(|func_idx| FuncInstance {
            module_instance: Rc::clone(&module_instance),
            func_idx,
        })
        .collect();

    Store {
        funcs,
        stack: Stack::new(DEFAULT_STACK_CAPACITY),
        module_instance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmi_mvp_core::{FuncBody, FuncType};

    #[test]
    fn allocates_one_funcaddr_per_function_in_index_order() {
        let module = Rc::new(Module {
            types: vec![FuncType::default()],
            func_type_idxs: vec![0, 0],
            code: vec![FuncBody::default(), FuncBody::default()],
            exports: vec![],
        });
        let store = instantiate(module);
        assert_eq!(store.funcs.len(), 2);
        assert_eq!(store.funcs[0].func_idx, 0);
        assert_eq!(store.funcs[1].func_idx, 1);
        assert_eq!(store.funcs[0].module_instance.funcaddrs, vec![0, 1]);
    }
}
