//! The public entry point for running a function: argument checking, the
//! dummy bottom frame that anchors a top-level call, and function lookup by
//! export name.

use wasmi_mvp_core::{ExportKind, Value};

use crate::engine::interpreter::{activation_label, run};
use crate::engine::stack::Frame;
use crate::error::RuntimeError;
use crate::instance::{FuncAddr, ModuleInstance, Store};

/// Looks up a function export by name, for use as a [`FuncAddr`] with
/// [`invoke`]. Returns `None` if no export of that name (and function kind)
/// exists.
pub fn lookup_func_by_name(module_instance: &ModuleInstance, name: &str) -> Option<FuncAddr> {
    let func_idx = module_instance.module.lookup_export(name, ExportKind::Func)?;
    module_instance.funcaddrs.get(func_idx as usize).copied()
}

/// Calls the function at `funcaddr` with `args`, replacing `args` in place
/// with its results on success.
///
/// Checks arity and argument value types before touching the stack —
/// These are checked before any fatal, unrecoverable stack operation could
/// run.
pub fn invoke(store: &mut Store, funcaddr: FuncAddr, args: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let func_inst = store
        .funcs
        .get(funcaddr as usize)
        .ok_or(RuntimeError::NoSuchFunction { funcaddr })?;
    let module = std::rc::Rc::clone(&func_inst.module_instance.module);
    let func_idx = func_inst.func_idx;
    let func_type = module
        .func_type(func_idx)
        .expect("instantiated function always has a type")
        .clone();

    if args.len() != func_type.params.len() {
        return Err(RuntimeError::ArityMismatch {
            expected: func_type.params.len(),
            found: args.len(),
        });
    }
    for (index, (arg, expected)) in args.iter().zip(&func_type.params).enumerate() {
        if arg.value_type() != *expected {
            return Err(RuntimeError::ArgumentTypeMismatch { index });
        }
    }

    // Anchors the call stack so the callee's own frame/label pops land on
    // something, and is popped again below so the stack returns to empty
    // between top-level invocations — unlike the reference C source, which
    // leaves this frame in place and would grow the stack by one frame per
    // call (see DESIGN.md).
    store.stack.push_frame(Frame { arity: 0, locals: Vec::new(), module: None });
    store.stack.push_vals(args.drain(..));

    invoke_func(store, funcaddr);

    let mut results = store.stack.pop_vals();
    store.stack.pop_frame();

    args.clear();
    args.append(&mut results);
    Ok(())
}

/// Runs one function activation: pushes its frame and wrapping label,
/// executes its body, and leaves the results on the stack above the popped
/// frame's former position. Recursively invoked for `call`.
pub(crate) fn invoke_func(store: &mut Store, funcaddr: FuncAddr) {
    let func_inst = &store.funcs[funcaddr as usize];
    let module_instance = std::rc::Rc::clone(&func_inst.module_instance);
    let func_idx = func_inst.func_idx;
    let module = std::rc::Rc::clone(&module_instance.module);

    let func_type = module
        .func_type(func_idx)
        .expect("instantiated function always has a type");
    let body = module
        .func_code(func_idx)
        .expect("instantiated function always has a body");

    let mut locals = Vec::with_capacity(func_type.params.len() + body.num_locals() as usize);
    let mut params = vec![Value::I32(0); func_type.params.len()];
    for slot in params.iter_mut().rev() {
        *slot = store.stack.pop_val();
    }
    locals.extend(params);
    locals.extend(std::iter::repeat(Value::I32(0)).take(body.num_locals() as usize));

    let arity = func_type.results.len() as u32;
    store.stack.push_frame(Frame { arity, locals, module: Some(module_instance) });
    store.stack.push_label(activation_label(arity));

    run(body, store);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use wasmi_mvp_core::{Export, FuncBody, FuncType, Instr, Module, ValueType};

    fn identity_module() -> Rc<Module> {
        Rc::new(Module {
            types: vec![FuncType::new(vec![ValueType::I32], vec![ValueType::I32])],
            func_type_idxs: vec![0],
            code: vec![FuncBody {
                locals: vec![],
                instrs: vec![Instr::LocalGet(0), Instr::End],
            }],
            exports: vec![Export { name: "identity".into(), kind: ExportKind::Func, index: 0 }],
        })
    }

    #[test]
    fn invoke_by_looked_up_export_round_trips_and_restores_quiescence() {
        let mut store = crate::instance::instantiate(identity_module());
        let module_instance = Rc::clone(&store.funcs[0].module_instance);
        let funcaddr = lookup_func_by_name(&module_instance, "identity").unwrap();

        let mut args = vec![Value::I32(7)];
        invoke(&mut store, funcaddr, &mut args).unwrap();
        assert_eq!(args, vec![Value::I32(7)]);
        assert!(store.stack.is_empty());

        // Calling again on the same store must not leak stack state.
        let mut args = vec![Value::I32(8)];
        invoke(&mut store, funcaddr, &mut args).unwrap();
        assert_eq!(args, vec![Value::I32(8)]);
        assert!(store.stack.is_empty());
    }

    #[test]
    fn rejects_wrong_arity() {
        let mut store = crate::instance::instantiate(identity_module());
        let mut args = vec![];
        let err = invoke(&mut store, 0, &mut args).unwrap_err();
        assert_eq!(err, RuntimeError::ArityMismatch { expected: 1, found: 0 });
    }

    #[test]
    fn rejects_unknown_funcaddr() {
        let mut store = crate::instance::instantiate(identity_module());
        let mut args = vec![];
        let err = invoke(&mut store, 9, &mut args).unwrap_err();
        assert_eq!(err, RuntimeError::NoSuchFunction { funcaddr: 9 });
    }

    #[test]
    fn lookup_func_by_name_misses_unknown_export() {
        let store = crate::instance::instantiate(identity_module());
        let module_instance = Rc::clone(&store.funcs[0].module_instance);
        assert_eq!(lookup_func_by_name(&module_instance, "nope"), None);
    }
}
