//! The stack-machine interpreter.
//!
//! Dispatch walks a function's flat `Vec<Instr>` with a plain `usize`
//! instruction pointer; every structured-control jump target the decoder
//! precomputed (`Instr::Block::exit`, `Instr::If::else_`, ...) is already an
//! index into that same vector, so branching is just `ip = target` with no
//! pointer-chasing.
//!
//! `end`/`else` and `br`/`br_if` share one core operation: pop some result
//! values, unwind zero or more labels, and resume either at an instruction
//! index or — once the function-entry label is reached — by returning from
//! the activation. The reference C implementation this was distilled from
//! folds the "return from function" case into the same uniform `end`
//! handling as a literal pointer to a synthetic end-of-function opcode,
//! requiring a second trip around its dispatch loop to notice the frame
//! underneath; [`Target::Return`] makes that case an explicit, immediate
//! outcome instead (see DESIGN.md).

use wasmi_mvp_core::{FuncBody, Instr, InstrIdx, Value};

use crate::instance::Store;
use crate::invoke::invoke_func;

use super::stack::{Frame, Label, Target};

/// Where control goes after an `end`/`else`/`br`/`br_if` resolves.
enum Flow {
    Jump(InstrIdx),
    Return,
}

/// Runs `body` to completion against `store`'s current top frame, which the
/// caller (`invoke_func`) has already pushed along with its wrapping
/// function-entry label.
pub(crate) fn run(body: &FuncBody, store: &mut Store) {
    let instrs = &body.instrs;
    let mut ip: usize = 0;

    loop {
        match &instrs[ip] {
            Instr::I32Const(c) => {
                store.stack.push_val(Value::I32(*c));
                ip += 1;
            }
            Instr::I32Add => {
                let b = store.stack.pop_val().as_i32();
                let a = store.stack.pop_val().as_i32();
                store.stack.push_val(Value::I32(a.wrapping_add(b)));
                ip += 1;
            }
            Instr::I32GeS => {
                let b = store.stack.pop_val().as_i32();
                let a = store.stack.pop_val().as_i32();
                store.stack.push_val(Value::I32((a >= b) as i32));
                ip += 1;
            }
            Instr::LocalGet(idx) => {
                let v = store.stack.current_frame().locals[*idx as usize];
                store.stack.push_val(v);
                ip += 1;
            }
            Instr::LocalSet(idx) => {
                let v = store.stack.pop_val();
                store.stack.current_frame_mut().locals[*idx as usize] = v;
                ip += 1;
            }
            Instr::Block { block_type, exit } => {
                let target = Target::Instr(*exit);
                store.stack.push_label(Label {
                    arity: block_type.arity(),
                    continuation: target,
                    exit: target,
                });
                ip += 1;
            }
            Instr::Loop { block_type, exit } => {
                store.stack.push_label(Label {
                    arity: block_type.arity(),
                    // Branching re-enters the loop header; falling off the
                    // end exits past it — the two targets genuinely differ.
                    continuation: Target::Instr(ip as InstrIdx),
                    exit: Target::Instr(*exit),
                });
                ip += 1;
            }
            Instr::If { block_type, else_, exit } => {
                let cond = store.stack.pop_val().as_i32();
                let target = Target::Instr(*exit);
                store.stack.push_label(Label {
                    arity: block_type.arity(),
                    continuation: target,
                    exit: target,
                });
                ip = if cond != 0 {
                    ip + 1
                } else {
                    match else_ {
                        Some(else_idx) => *else_idx as usize + 1,
                        // No else-arm: the condition being false skips
                        // straight to the matching `end`.
                        None => *exit as usize - 1,
                    }
                };
            }
            Instr::Else | Instr::End => match end_label(store) {
                Flow::Jump(target) => ip = target as usize,
                Flow::Return => return,
            },
            Instr::Br(l) => match branch(store, *l) {
                Flow::Jump(target) => ip = target as usize,
                Flow::Return => return,
            },
            Instr::BrIf(l) => {
                let cond = store.stack.pop_val().as_i32();
                if cond != 0 {
                    match branch(store, *l) {
                        Flow::Jump(target) => ip = target as usize,
                        Flow::Return => return,
                    }
                } else {
                    ip += 1;
                }
            }
            Instr::Call(func_idx) => {
                let funcaddr = {
                    let frame = store.stack.current_frame();
                    let module_instance = frame
                        .module
                        .as_ref()
                        .expect("call executed outside a module-owned frame");
                    module_instance.funcaddrs[*func_idx as usize]
                };
                invoke_func(store, funcaddr);
                ip += 1;
            }
        }
    }
}

/// Shared `end`/`else` handling: pop the carried result values, pop the
/// label they're carried across, and resume at its `exit` target.
fn end_label(store: &mut Store) -> Flow {
    let vals = store.stack.pop_vals();
    let label = store
        .stack
        .try_pop_label()
        .expect("every activation is wrapped in a function-entry label");
    resume(store, label.exit, vals)
}

/// `br`/`br_if` with label depth `l`: pop the carried values, then unwind
/// `l + 1` labels (discarding the values between them), and resume at the
/// innermost-unwound label's `continuation` target.
fn branch(store: &mut Store, l: u32) -> Flow {
    let vals = store.stack.pop_vals();
    let mut label = None;
    for _ in 0..=l {
        store.stack.pop_vals();
        label = Some(
            store
                .stack
                .try_pop_label()
                .expect("branch depth exceeds the active label nesting"),
        );
    }
    let label = label.expect("loop runs at least once");
    resume(store, label.continuation, vals)
}

/// Resumes at `target`, restoring `vals` above whatever's left on the stack.
/// A [`Target::Return`] additionally pops the current frame: this is always
/// the function-entry label's own target, so nothing but that frame remains
/// beneath the unwound labels.
fn resume(store: &mut Store, target: Target, vals: Vec<Value>) -> Flow {
    match target {
        Target::Instr(idx) => {
            store.stack.push_vals(vals);
            Flow::Jump(idx)
        }
        Target::Return => {
            store.stack.pop_frame();
            store.stack.push_vals(vals);
            Flow::Return
        }
    }
}

/// A synthetic [`Label`] every activation is wrapped in before its body
/// runs, so `end_label`/`branch` never need to special-case "no label left,
/// just a frame".
pub(crate) fn activation_label(arity: u32) -> Label {
    Label {
        arity,
        continuation: Target::Return,
        exit: Target::Return,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use wasmi_mvp_core::{BlockType, LocalGroup, ValueType};

    fn bare_store() -> Store {
        crate::instance::instantiate(Rc::new(wasmi_mvp_core::Module::default()))
    }

    /// Runs `instrs` as a function body against a fresh frame, returning its
    /// results. `run`'s `Target::Return` path (taken once control reaches
    /// the function-entry label pushed here) already pops the frame and
    /// leaves results as plain `Value`s above it, so there's nothing left
    /// for the caller to pop afterwards.
    fn run_body(instrs: Vec<Instr>, locals: Vec<Value>, arity: u32) -> Vec<Value> {
        let body = FuncBody { locals: vec![], instrs };
        let mut store = bare_store();
        store.stack.push_frame(Frame { arity, locals, module: None });
        store.stack.push_label(activation_label(arity));
        run(&body, &mut store);
        let results = store.stack.pop_vals();
        assert!(store.stack.is_empty());
        results
    }

    #[test]
    fn identity_returns_its_single_local() {
        let results = run_body(vec![Instr::LocalGet(0), Instr::End], vec![Value::I32(42)], 1);
        assert_eq!(results, vec![Value::I32(42)]);
    }

    #[test]
    fn add_wraps_on_overflow() {
        let results = run_body(
            vec![Instr::LocalGet(0), Instr::LocalGet(1), Instr::I32Add, Instr::End],
            vec![Value::I32(i32::MAX), Value::I32(1)],
            1,
        );
        assert_eq!(results, vec![Value::I32(i32::MIN)]);
    }

    #[test]
    fn if_else_picks_the_taken_arm() {
        let instrs = vec![
            /* 0 */ Instr::LocalGet(0),
            /* 1 */ Instr::If { block_type: BlockType::Value(ValueType::I32), else_: Some(3), exit: 6 },
            /* 2 */ Instr::I32Const(10),
            /* 3 */ Instr::Else,
            /* 4 */ Instr::I32Const(20),
            /* 5 */ Instr::End,
            /* 6 */ Instr::End,
        ];
        let results = run_body(instrs, vec![Value::I32(0)], 1);
        assert_eq!(results, vec![Value::I32(20)]);

        let results = run_body(
            vec![
                Instr::LocalGet(0),
                Instr::If { block_type: BlockType::Value(ValueType::I32), else_: Some(3), exit: 6 },
                Instr::I32Const(10),
                Instr::Else,
                Instr::I32Const(20),
                Instr::End,
                Instr::End,
            ],
            vec![Value::I32(1)],
            1,
        );
        assert_eq!(results, vec![Value::I32(10)]);
    }

    #[test]
    fn loop_with_br_if_sums_to_n() {
        // locals: [0]=n (param), [1]=acc, [2]=i, both locals zero-init.
        // A single loop label, no wrapping block: each pass adds the
        // current `i` into `acc`, increments `i`, and `br_if 0`s back to
        // the loop header exactly while the new `i` is still less than
        // `n` — falling off the loop's own `end` once it isn't, which
        // needs the loop label's `exit` (not its `continuation`) target.
        let instrs = vec![
            /* 0 */ Instr::Loop { block_type: BlockType::Empty, exit: 16 },
            /* 1 */ Instr::LocalGet(1),
            /* 2 */ Instr::LocalGet(2),
            /* 3 */ Instr::I32Add,
            /* 4 */ Instr::LocalSet(1),
            /* 5 */ Instr::LocalGet(2),
            /* 6 */ Instr::I32Const(1),
            /* 7 */ Instr::I32Add,
            /* 8 */ Instr::LocalSet(2),
            /* 9 */ Instr::LocalGet(0),
            /* 10 */ Instr::LocalGet(2),
            /* 11 */ Instr::I32Const(1),
            /* 12 */ Instr::I32Add,
            /* 13 */ Instr::I32GeS,
            /* 14 */ Instr::BrIf(0),
            /* 15 */ Instr::End,
            /* 16 */ Instr::LocalGet(1),
            /* 17 */ Instr::End,
        ];
        let results = run_body(instrs, vec![Value::I32(5), Value::I32(0), Value::I32(0)], 1);
        assert_eq!(results, vec![Value::I32(0 + 1 + 2 + 3 + 4)]);
    }

    #[test]
    fn block_br_is_equivalent_to_falling_off_its_end() {
        let branching = run_body(
            vec![
                Instr::Block { block_type: BlockType::Value(ValueType::I32), exit: 3 },
                Instr::I32Const(9),
                Instr::Br(0),
                Instr::End,
                Instr::End,
            ],
            vec![],
            1,
        );
        let falling_through = run_body(
            vec![
                Instr::Block { block_type: BlockType::Value(ValueType::I32), exit: 2 },
                Instr::I32Const(9),
                Instr::End,
                Instr::End,
            ],
            vec![],
            1,
        );
        assert_eq!(branching, falling_through);
    }

    #[test]
    fn ge_s_compares_signed_not_unsigned() {
        // -1 as an i32 bit pattern is the largest possible u32, so a signed
        // comparison must still find it less than 1.
        let results = run_body(
            vec![Instr::LocalGet(0), Instr::LocalGet(1), Instr::I32GeS, Instr::End],
            vec![Value::I32(-1), Value::I32(1)],
            1,
        );
        assert_eq!(results, vec![Value::I32(0)]);

        let results = run_body(
            vec![Instr::LocalGet(0), Instr::LocalGet(1), Instr::I32GeS, Instr::End],
            vec![Value::I32(-1), Value::I32(-2)],
            1,
        );
        assert_eq!(results, vec![Value::I32(1)]);
    }

    #[test]
    fn num_locals_accounts_for_declared_groups() {
        let body = FuncBody {
            locals: vec![LocalGroup { count: 3, value_type: ValueType::I32 }],
            instrs: vec![Instr::End],
        };
        assert_eq!(body.num_locals(), 3);
    }
}
