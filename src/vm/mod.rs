//! Stack-based bytecode virtual machine.
//!
//! Executes compiled event handlers against the reactive state. Fixed
//! limits per VM: stack ≤ 256, state entries ≤ 64, locals ≤ 32, host
//! functions ≤ 128. See [`machine::Vm`] for the execution loop and
//! [`loader`] for the typed-instruction assembler.

pub mod loader;
pub mod machine;
pub mod opcode;

pub use loader::{assemble, disassemble, Instruction};
pub use machine::{
    HostFn, StateCallback, Vm, VmError, VmValue, HOST_LIMIT, LOCALS_LIMIT, STACK_LIMIT,
    STATE_LIMIT,
};
pub use opcode::Opcode;

#[cfg(test)]
mod tests {
    use super::*;

    /// Bytecode increment end to end: raw bytes in, callback observed,
    /// stack empty on HALT.
    #[test]
    fn test_bytecode_increment_scenario() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut vm = Vm::new();
        vm.set_state_value(100, VmValue::Int(0)).unwrap();

        let calls: Rc<RefCell<Vec<(u32, VmValue)>>> = Rc::default();
        let sink = Rc::clone(&calls);
        vm.set_state_callback(Box::new(move |id, value| {
            sink.borrow_mut().push((id, value.clone()));
        }));

        let bytecode = [
            0x50, 100, 0, 0, 0, // GET_STATE 100
            0x01, 1, 0, 0, 0, 0, 0, 0, 0, // PUSH_INT 1
            0x10, // ADD
            0x51, 100, 0, 0, 0, // SET_STATE 100
            0xFF, // HALT
        ];
        vm.execute(&bytecode).unwrap();

        assert_eq!(vm.state_value(100), Some(&VmValue::Int(1)));
        assert_eq!(vm.stack_depth(), 0);
        let calls = calls.borrow();
        assert_eq!(calls.as_slice(), &[(100, VmValue::Int(1))]);
    }

    /// pc increases strictly across successful steps, observed through the
    /// side effects of sequential state writes.
    #[test]
    fn test_sequential_state_writes_ordered() {
        let mut vm = Vm::new();
        let bytecode = assemble(&[
            Instruction::PushInt(1),
            Instruction::SetState(1),
            Instruction::PushInt(2),
            Instruction::SetState(2),
            Instruction::PushInt(3),
            Instruction::SetState(3),
            Instruction::Halt,
        ]);
        let order: std::rc::Rc<std::cell::RefCell<Vec<u32>>> = Default::default();
        let sink = std::rc::Rc::clone(&order);
        vm.set_state_callback(Box::new(move |id, _| sink.borrow_mut().push(id)));
        vm.execute(&bytecode).unwrap();
        assert_eq!(order.borrow().as_slice(), &[1, 2, 3]);
    }
}
