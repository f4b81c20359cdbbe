//! The stack machine.
//!
//! Single-threaded and cooperative: instructions run to completion, `HALT`
//! or a runtime error ends a run. The first error is recorded and the VM
//! halts; the VM stays usable after the error is inspected and a new
//! `execute` is started.

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::opcode::Opcode;

/// Maximum operand stack depth.
pub const STACK_LIMIT: usize = 256;
/// Maximum distinct state entries.
pub const STATE_LIMIT: usize = 64;
/// Maximum local slots.
pub const LOCALS_LIMIT: usize = 32;
/// Maximum registered host functions.
pub const HOST_LIMIT: usize = 128;

/// A runtime value. Strings are owned; every overwrite drops the prior
/// buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum VmValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl VmValue {
    pub fn tag(&self) -> &'static str {
        match self {
            VmValue::Int(_) => "INT",
            VmValue::Float(_) => "FLOAT",
            VmValue::Str(_) => "STRING",
            VmValue::Bool(_) => "BOOL",
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            VmValue::Int(i) => Some(*i as f64),
            VmValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Runtime faults. The first one halts the current run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("Stack overflow")]
    StackOverflow,
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Modulo by zero")]
    ModuloByZero,
    #[error("Type mismatch in {op}: {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("Unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    #[error("Unexpected end of bytecode")]
    UnexpectedEnd,
    #[error("State table full ({STATE_LIMIT} entries)")]
    StateTableFull,
    #[error("Local table full ({LOCALS_LIMIT} slots)")]
    LocalTableFull,
    #[error("Host function table full ({HOST_LIMIT} entries)")]
    HostTableFull,
    #[error("{0} is reserved until the call-frame design is finalized")]
    ReservedOpcode(&'static str),
    #[error("Jump target {0} out of bounds")]
    JumpOutOfBounds(i64),
    #[error("Unknown function {0}")]
    UnknownFunction(u32),
    #[error("Invalid string immediate")]
    BadStringImmediate,
}

/// Callback invoked after every successful `SET_STATE`. The renderer uses
/// it to mark dirty; captured state carries any user data.
pub type StateCallback = Box<dyn FnMut(u32, &VmValue)>;

/// A registered host function. The entry is moved out of the table for the
/// duration of the call, so a host function cannot recursively invoke
/// itself.
pub type HostFn = Box<dyn FnMut(&mut Vm)>;

struct HostEntry {
    name: String,
    callback: HostFn,
}

/// The virtual machine.
#[derive(Default)]
pub struct Vm {
    stack: Vec<VmValue>,
    state: FxHashMap<u32, VmValue>,
    locals: Vec<Option<VmValue>>,
    hosts: FxHashMap<u32, HostEntry>,
    functions: FxHashMap<u32, Vec<u8>>,
    state_callback: Option<StateCallback>,
    pc: usize,
    halted: bool,
    error: Option<VmError>,
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("stack_depth", &self.stack.len())
            .field("state_entries", &self.state.len())
            .field("pc", &self.pc)
            .field("halted", &self.halted)
            .field("error", &self.error)
            .finish()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Host-facing state and configuration
    // =========================================================================

    /// Seed or overwrite a state entry from the host side.
    pub fn set_state_value(&mut self, id: u32, value: VmValue) -> Result<(), VmError> {
        if !self.state.contains_key(&id) && self.state.len() >= STATE_LIMIT {
            return Err(VmError::StateTableFull);
        }
        self.state.insert(id, value);
        Ok(())
    }

    /// Read a state entry. Unregistered ids read as `None` here; inside
    /// bytecode `GET_STATE` yields `INT 0` instead.
    pub fn state_value(&self, id: u32) -> Option<&VmValue> {
        self.state.get(&id)
    }

    pub fn set_state_callback(&mut self, callback: StateCallback) {
        self.state_callback = Some(callback);
    }

    pub fn clear_state_callback(&mut self) {
        self.state_callback = None;
    }

    /// Register a host function under an id and name.
    pub fn register_host(
        &mut self,
        id: u32,
        name: impl Into<String>,
        callback: HostFn,
    ) -> Result<(), VmError> {
        if !self.hosts.contains_key(&id) && self.hosts.len() >= HOST_LIMIT {
            return Err(VmError::HostTableFull);
        }
        self.hosts.insert(
            id,
            HostEntry {
                name: name.into(),
                callback,
            },
        );
        Ok(())
    }

    pub fn host_name(&self, id: u32) -> Option<&str> {
        self.hosts.get(&id).map(|e| e.name.as_str())
    }

    /// Store a compiled function's bytecode under an id.
    pub(super) fn store_function(&mut self, id: u32, bytecode: Vec<u8>) {
        self.functions.insert(id, bytecode);
    }

    /// Look up a function by id and execute its stream.
    pub fn call_function(&mut self, id: u32) -> Result<(), VmError> {
        let bytecode = self
            .functions
            .get(&id)
            .cloned()
            .ok_or(VmError::UnknownFunction(id))?;
        self.execute(&bytecode)
    }

    /// The first error of the last run, if any.
    pub fn last_error(&self) -> Option<&VmError> {
        self.error.as_ref()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Current operand stack depth.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Pop a value from the host side (host functions consume arguments).
    pub fn pop_value(&mut self) -> Option<VmValue> {
        self.stack.pop()
    }

    /// Push a value from the host side (host functions produce results).
    pub fn push_value(&mut self, value: VmValue) -> Result<(), VmError> {
        self.push(value)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run a bytecode stream to `HALT` or the first error. The stack is
    /// cleared; state, locals, and registrations persist across runs.
    pub fn execute(&mut self, bytecode: &[u8]) -> Result<(), VmError> {
        self.pc = 0;
        self.halted = false;
        self.error = None;
        self.stack.clear();

        while !self.halted {
            if self.pc >= bytecode.len() {
                return self.fail(VmError::UnexpectedEnd);
            }
            if let Err(e) = self.step(bytecode) {
                return self.fail(e);
            }
        }
        Ok(())
    }

    fn fail(&mut self, error: VmError) -> Result<(), VmError> {
        tracing::debug!(%error, pc = self.pc, "vm halted on error");
        self.error = Some(error.clone());
        self.halted = true;
        Err(error)
    }

    /// Execute one instruction: read opcode, advance pc, read immediates,
    /// dispatch.
    fn step(&mut self, bytecode: &[u8]) -> Result<(), VmError> {
        let byte = bytecode[self.pc];
        self.pc += 1;
        let op = Opcode::from_byte(byte).ok_or(VmError::UnknownOpcode(byte))?;

        match op {
            Opcode::PushInt => {
                let v = self.read_i64(bytecode)?;
                self.push(VmValue::Int(v))?;
            }
            Opcode::PushFloat => {
                let v = self.read_f64(bytecode)?;
                self.push(VmValue::Float(v))?;
            }
            Opcode::PushString => {
                let len = self.read_u32(bytecode)? as usize;
                if self.pc + len > bytecode.len() {
                    return Err(VmError::UnexpectedEnd);
                }
                let bytes = &bytecode[self.pc..self.pc + len];
                let s = std::str::from_utf8(bytes)
                    .map_err(|_| VmError::BadStringImmediate)?
                    .to_string();
                self.pc += len;
                self.push(VmValue::Str(s))?;
            }
            Opcode::PushBool => {
                let v = self.read_u8(bytecode)?;
                self.push(VmValue::Bool(v != 0))?;
            }
            Opcode::Pop => {
                self.pop()?;
            }
            Opcode::Dup => {
                let top = self.peek()?.clone();
                self.push(top)?;
            }

            Opcode::Add => self.binary_arith("ADD", |a, b| a.checked_add(b), |a, b| a + b)?,
            Opcode::Sub => self.binary_arith("SUB", |a, b| a.checked_sub(b), |a, b| a - b)?,
            Opcode::Mul => self.binary_arith("MUL", |a, b| a.checked_mul(b), |a, b| a * b)?,
            Opcode::Div => {
                let (a, b) = self.pop_pair()?;
                let result = match (&a, &b) {
                    (VmValue::Int(_), VmValue::Int(0)) => return Err(VmError::DivisionByZero),
                    (VmValue::Int(x), VmValue::Int(y)) => VmValue::Int(x / y),
                    _ => {
                        let (x, y) = numeric_pair("DIV", &a, &b)?;
                        if y == 0.0 {
                            return Err(VmError::DivisionByZero);
                        }
                        VmValue::Float(x / y)
                    }
                };
                self.push(result)?;
            }
            Opcode::Mod => {
                let (a, b) = self.pop_pair()?;
                match (&a, &b) {
                    (VmValue::Int(_), VmValue::Int(0)) => return Err(VmError::ModuloByZero),
                    (VmValue::Int(x), VmValue::Int(y)) => self.push(VmValue::Int(x % y))?,
                    _ => {
                        return Err(VmError::TypeMismatch {
                            op: "MOD",
                            left: a.tag(),
                            right: b.tag(),
                        });
                    }
                }
            }
            Opcode::Neg => {
                let v = self.pop()?;
                match v {
                    VmValue::Int(i) => self.push(VmValue::Int(-i))?,
                    VmValue::Float(f) => self.push(VmValue::Float(-f))?,
                    other => {
                        return Err(VmError::TypeMismatch {
                            op: "NEG",
                            left: other.tag(),
                            right: "-",
                        });
                    }
                }
            }

            Opcode::Eq => self.binary_eq(false)?,
            Opcode::Ne => self.binary_eq(true)?,
            Opcode::Lt => self.binary_ord("LT", |a, b| a < b)?,
            Opcode::Gt => self.binary_ord("GT", |a, b| a > b)?,
            Opcode::Le => self.binary_ord("LE", |a, b| a <= b)?,
            Opcode::Ge => self.binary_ord("GE", |a, b| a >= b)?,

            Opcode::And => self.binary_bool("AND", |a, b| a && b)?,
            Opcode::Or => self.binary_bool("OR", |a, b| a || b)?,
            Opcode::Not => {
                let v = self.pop()?;
                match v {
                    VmValue::Bool(b) => self.push(VmValue::Bool(!b))?,
                    other => {
                        return Err(VmError::TypeMismatch {
                            op: "NOT",
                            left: other.tag(),
                            right: "-",
                        });
                    }
                }
            }

            Opcode::Concat => {
                let (a, b) = self.pop_pair()?;
                match (a, b) {
                    (VmValue::Str(mut x), VmValue::Str(y)) => {
                        x.push_str(&y);
                        self.push(VmValue::Str(x))?;
                    }
                    (a, b) => {
                        return Err(VmError::TypeMismatch {
                            op: "CONCAT",
                            left: a.tag(),
                            right: b.tag(),
                        });
                    }
                }
            }

            Opcode::GetState => {
                let id = self.read_u32(bytecode)?;
                let value = self.state.get(&id).cloned().unwrap_or(VmValue::Int(0));
                self.push(value)?;
            }
            Opcode::SetState => {
                let id = self.read_u32(bytecode)?;
                let value = self.pop()?;
                if !self.state.contains_key(&id) && self.state.len() >= STATE_LIMIT {
                    return Err(VmError::StateTableFull);
                }
                self.state.insert(id, value.clone());
                // Take the callback out for the call so it sees a coherent VM
                if let Some(mut callback) = self.state_callback.take() {
                    callback(id, &value);
                    self.state_callback = Some(callback);
                }
            }
            Opcode::GetLocal => {
                let id = self.read_u32(bytecode)? as usize;
                let value = self
                    .locals
                    .get(id)
                    .and_then(|slot| slot.clone())
                    .unwrap_or(VmValue::Int(0));
                self.push(value)?;
            }
            Opcode::SetLocal => {
                let id = self.read_u32(bytecode)? as usize;
                if id >= LOCALS_LIMIT {
                    return Err(VmError::LocalTableFull);
                }
                if self.locals.len() <= id {
                    self.locals.resize(id + 1, None);
                }
                let value = self.pop()?;
                self.locals[id] = Some(value);
            }

            Opcode::Jump => {
                let imm_start = self.pc;
                let offset = self.read_i32(bytecode)?;
                self.jump_to(bytecode, imm_start, offset)?;
            }
            Opcode::JumpIfFalse => {
                let imm_start = self.pc;
                let offset = self.read_i32(bytecode)?;
                let cond = self.pop()?;
                match cond {
                    VmValue::Bool(true) => {}
                    VmValue::Bool(false) => self.jump_to(bytecode, imm_start, offset)?,
                    other => {
                        return Err(VmError::TypeMismatch {
                            op: "JUMP_IF_FALSE",
                            left: other.tag(),
                            right: "BOOL",
                        });
                    }
                }
            }

            Opcode::CallHost => {
                let id = self.read_u32(bytecode)?;
                match self.hosts.remove(&id) {
                    Some(mut entry) => {
                        (entry.callback)(self);
                        self.hosts.insert(id, entry);
                    }
                    None => {
                        // Graceful degradation: log and continue
                        tracing::warn!(id, "CALL_HOST: unknown host function");
                    }
                }
            }

            Opcode::Call => return Err(VmError::ReservedOpcode("CALL")),
            Opcode::Return => return Err(VmError::ReservedOpcode("RETURN")),
            Opcode::GetProp => return Err(VmError::ReservedOpcode("GET_PROP")),
            Opcode::SetProp => return Err(VmError::ReservedOpcode("SET_PROP")),

            Opcode::Halt => self.halted = true,
        }
        Ok(())
    }

    /// Both jump opcodes apply their signed offset relative to the first
    /// byte of the immediate.
    fn jump_to(&mut self, bytecode: &[u8], imm_start: usize, offset: i32) -> Result<(), VmError> {
        let target = imm_start as i64 + offset as i64;
        if target < 0 || target > bytecode.len() as i64 {
            return Err(VmError::JumpOutOfBounds(target));
        }
        self.pc = target as usize;
        Ok(())
    }

    // =========================================================================
    // Stack and immediate helpers
    // =========================================================================

    fn push(&mut self, value: VmValue) -> Result<(), VmError> {
        if self.stack.len() >= STACK_LIMIT {
            return Err(VmError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<VmValue, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    fn peek(&self) -> Result<&VmValue, VmError> {
        self.stack.last().ok_or(VmError::StackUnderflow)
    }

    fn pop_pair(&mut self) -> Result<(VmValue, VmValue), VmError> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    fn binary_arith(
        &mut self,
        op: &'static str,
        int_op: impl Fn(i64, i64) -> Option<i64>,
        float_op: impl Fn(f64, f64) -> f64,
    ) -> Result<(), VmError> {
        let (a, b) = self.pop_pair()?;
        let result = match (&a, &b) {
            (VmValue::Int(x), VmValue::Int(y)) => match int_op(*x, *y) {
                Some(v) => VmValue::Int(v),
                // Overflow widens to float, matching the numeric path
                None => VmValue::Float(float_op(*x as f64, *y as f64)),
            },
            _ => {
                let (x, y) = numeric_pair(op, &a, &b)?;
                VmValue::Float(float_op(x, y))
            }
        };
        self.push(result)
    }

    fn binary_eq(&mut self, negate: bool) -> Result<(), VmError> {
        let (a, b) = self.pop_pair()?;
        let equal = match (&a, &b) {
            (VmValue::Int(x), VmValue::Int(y)) => x == y,
            (VmValue::Float(x), VmValue::Float(y)) => x == y,
            (VmValue::Str(x), VmValue::Str(y)) => x == y,
            (VmValue::Bool(x), VmValue::Bool(y)) => x == y,
            _ => {
                return Err(VmError::TypeMismatch {
                    op: if negate { "NE" } else { "EQ" },
                    left: a.tag(),
                    right: b.tag(),
                });
            }
        };
        self.push(VmValue::Bool(equal != negate))
    }

    /// Ordering is integer-only.
    fn binary_ord(
        &mut self,
        op: &'static str,
        cmp: impl Fn(i64, i64) -> bool,
    ) -> Result<(), VmError> {
        let (a, b) = self.pop_pair()?;
        match (&a, &b) {
            (VmValue::Int(x), VmValue::Int(y)) => self.push(VmValue::Bool(cmp(*x, *y))),
            _ => Err(VmError::TypeMismatch {
                op,
                left: a.tag(),
                right: b.tag(),
            }),
        }
    }

    fn binary_bool(
        &mut self,
        op: &'static str,
        logic: impl Fn(bool, bool) -> bool,
    ) -> Result<(), VmError> {
        let (a, b) = self.pop_pair()?;
        match (&a, &b) {
            (VmValue::Bool(x), VmValue::Bool(y)) => self.push(VmValue::Bool(logic(*x, *y))),
            _ => Err(VmError::TypeMismatch {
                op,
                left: a.tag(),
                right: b.tag(),
            }),
        }
    }

    fn read_u8(&mut self, bytecode: &[u8]) -> Result<u8, VmError> {
        let byte = *bytecode.get(self.pc).ok_or(VmError::UnexpectedEnd)?;
        self.pc += 1;
        Ok(byte)
    }

    fn read_u32(&mut self, bytecode: &[u8]) -> Result<u32, VmError> {
        let bytes: [u8; 4] = bytecode
            .get(self.pc..self.pc + 4)
            .ok_or(VmError::UnexpectedEnd)?
            .try_into()
            .unwrap();
        self.pc += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_i32(&mut self, bytecode: &[u8]) -> Result<i32, VmError> {
        self.read_u32(bytecode).map(|v| v as i32)
    }

    fn read_i64(&mut self, bytecode: &[u8]) -> Result<i64, VmError> {
        let bytes: [u8; 8] = bytecode
            .get(self.pc..self.pc + 8)
            .ok_or(VmError::UnexpectedEnd)?
            .try_into()
            .unwrap();
        self.pc += 8;
        Ok(i64::from_le_bytes(bytes))
    }

    fn read_f64(&mut self, bytecode: &[u8]) -> Result<f64, VmError> {
        self.read_i64(bytecode).map(|v| f64::from_bits(v as u64))
    }
}

fn numeric_pair(
    op: &'static str,
    a: &VmValue,
    b: &VmValue,
) -> Result<(f64, f64), VmError> {
    match (a.as_float(), b.as_float()) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(VmError::TypeMismatch {
            op,
            left: a.tag(),
            right: b.tag(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::loader::Instruction;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn run(instructions: &[Instruction]) -> Vm {
        let mut vm = Vm::new();
        let bytecode = crate::vm::loader::assemble(instructions);
        vm.execute(&bytecode).expect("execution failed");
        vm
    }

    fn run_err(instructions: &[Instruction]) -> VmError {
        let mut vm = Vm::new();
        let bytecode = crate::vm::loader::assemble(instructions);
        vm.execute(&bytecode).expect_err("expected an error")
    }

    #[test]
    fn test_int_arithmetic() {
        use Instruction::*;
        let vm = run(&[PushInt(7), PushInt(3), Sub, SetState(1), Halt]);
        assert_eq!(vm.state_value(1), Some(&VmValue::Int(4)));
    }

    #[test]
    fn test_mixed_arithmetic_widens_to_float() {
        use Instruction::*;
        let vm = run(&[PushInt(1), PushFloat(0.5), Add, SetState(1), Halt]);
        assert_eq!(vm.state_value(1), Some(&VmValue::Float(1.5)));
    }

    #[test]
    fn test_div_by_zero_halts() {
        use Instruction::*;
        assert_eq!(run_err(&[PushInt(1), PushInt(0), Div, Halt]), VmError::DivisionByZero);
        assert_eq!(run_err(&[PushInt(1), PushInt(0), Mod, Halt]), VmError::ModuloByZero);
    }

    #[test]
    fn test_string_eq_by_content_and_concat() {
        use Instruction::*;
        let vm = run(&[
            PushString("ab".into()),
            PushString("cd".into()),
            Concat,
            PushString("abcd".into()),
            Eq,
            SetState(1),
            Halt,
        ]);
        assert_eq!(vm.state_value(1), Some(&VmValue::Bool(true)));
    }

    #[test]
    fn test_concat_identity_laws() {
        use Instruction::*;
        let vm = run(&[
            PushString(String::new()),
            PushString("s".into()),
            Concat,
            SetState(1),
            PushString("s".into()),
            PushString(String::new()),
            Concat,
            SetState(2),
            Halt,
        ]);
        assert_eq!(vm.state_value(1), Some(&VmValue::Str("s".into())));
        assert_eq!(vm.state_value(2), Some(&VmValue::Str("s".into())));
    }

    #[test]
    fn test_ordering_is_integer_only() {
        use Instruction::*;
        let err = run_err(&[PushFloat(1.0), PushFloat(2.0), Lt, Halt]);
        assert!(matches!(err, VmError::TypeMismatch { op: "LT", .. }));
    }

    #[test]
    fn test_add_mul_commute() {
        use Instruction::*;
        let vm = run(&[
            PushInt(3), PushInt(7), Add, SetState(1),
            PushInt(7), PushInt(3), Add, SetState(2),
            PushFloat(1.5), PushFloat(2.5), Mul, SetState(3),
            PushFloat(2.5), PushFloat(1.5), Mul, SetState(4),
            Halt,
        ]);
        assert_eq!(vm.state_value(1), vm.state_value(2));
        assert_eq!(vm.state_value(3), vm.state_value(4));
    }

    #[test]
    fn test_sub_self_is_zero() {
        use Instruction::*;
        let vm = run(&[PushInt(41), Dup, Sub, SetState(1), Halt]);
        assert_eq!(vm.state_value(1), Some(&VmValue::Int(0)));
    }

    #[test]
    fn test_not_involution() {
        use Instruction::*;
        let vm = run(&[PushBool(true), Not, Not, SetState(1), Halt]);
        assert_eq!(vm.state_value(1), Some(&VmValue::Bool(true)));
    }

    #[test]
    fn test_neg_involution() {
        use Instruction::*;
        let vm = run(&[PushInt(42), Neg, Neg, SetState(1), Halt]);
        assert_eq!(vm.state_value(1), Some(&VmValue::Int(42)));
    }

    #[test]
    fn test_get_state_unregistered_yields_zero() {
        use Instruction::*;
        let vm = run(&[GetState(99), SetState(1), Halt]);
        assert_eq!(vm.state_value(1), Some(&VmValue::Int(0)));
    }

    #[test]
    fn test_get_set_state_roundtrip() {
        use Instruction::*;
        let vm = run(&[PushInt(7), SetState(5), GetState(5), SetState(6), Halt]);
        assert_eq!(vm.state_value(6), Some(&VmValue::Int(7)));
    }

    #[test]
    fn test_locals_auto_extend_and_default() {
        use Instruction::*;
        let vm = run(&[
            PushInt(9),
            SetLocal(10),
            GetLocal(10),
            SetState(1),
            GetLocal(3), // unset slot
            SetState(2),
            Halt,
        ]);
        assert_eq!(vm.state_value(1), Some(&VmValue::Int(9)));
        assert_eq!(vm.state_value(2), Some(&VmValue::Int(0)));
    }

    #[test]
    fn test_local_limit() {
        use Instruction::*;
        let err = run_err(&[PushInt(1), SetLocal(LOCALS_LIMIT as u32), Halt]);
        assert_eq!(err, VmError::LocalTableFull);
    }

    #[test]
    fn test_stack_overflow_boundary() {
        use Instruction::*;
        // Fill to the limit: 255 pushes + DUP reaches 256 exactly
        let mut program: Vec<Instruction> = vec![PushInt(1); STACK_LIMIT - 1];
        program.push(Dup);
        program.push(Halt);
        let vm = run(&program);
        assert_eq!(vm.stack_depth(), STACK_LIMIT);

        // One more push fails with "Stack overflow"
        let mut program: Vec<Instruction> = vec![PushInt(1); STACK_LIMIT];
        program.push(PushInt(2));
        program.push(Halt);
        let err = run_err(&program);
        assert_eq!(err, VmError::StackOverflow);
        assert_eq!(err.to_string(), "Stack overflow");
    }

    #[test]
    fn test_state_table_boundary() {
        let mut vm = Vm::new();
        for id in 0..STATE_LIMIT as u32 {
            vm.set_state_value(id, VmValue::Int(0)).unwrap();
        }
        // Updating an existing id still works
        assert!(vm.set_state_value(3, VmValue::Int(1)).is_ok());
        // A new id is rejected
        assert_eq!(
            vm.set_state_value(STATE_LIMIT as u32, VmValue::Int(0)),
            Err(VmError::StateTableFull)
        );
    }

    #[test]
    fn test_unknown_opcode_is_fatal() {
        let mut vm = Vm::new();
        let err = vm.execute(&[0x07, 0xFF]).unwrap_err();
        assert_eq!(err, VmError::UnknownOpcode(0x07));
        assert!(vm.is_halted());
        assert_eq!(vm.last_error(), Some(&VmError::UnknownOpcode(0x07)));
    }

    #[test]
    fn test_missing_halt_is_unexpected_end() {
        let mut vm = Vm::new();
        let bytecode = crate::vm::loader::assemble(&[Instruction::PushInt(1), Instruction::Pop]);
        assert_eq!(vm.execute(&bytecode), Err(VmError::UnexpectedEnd));
    }

    #[test]
    fn test_vm_usable_after_error() {
        use Instruction::*;
        let mut vm = Vm::new();
        let bad = crate::vm::loader::assemble(&[PushInt(1), PushInt(0), Div, Halt]);
        assert!(vm.execute(&bad).is_err());
        assert!(vm.last_error().is_some());

        let good = crate::vm::loader::assemble(&[PushInt(2), SetState(1), Halt]);
        assert!(vm.execute(&good).is_ok());
        assert!(vm.last_error().is_none());
        assert_eq!(vm.state_value(1), Some(&VmValue::Int(2)));
    }

    #[test]
    fn test_jump_skips_forward() {
        use Instruction::*;
        // JUMP over a PUSH_INT(99)/SET_STATE(1) pair.
        // Offset base is the first immediate byte: 4 (the immediate)
        // + 9 (PUSH_INT) + 5 (SET_STATE) = 18.
        let vm = run(&[
            Jump(18),
            PushInt(99),
            SetState(1),
            PushInt(7),
            SetState(2),
            Halt,
        ]);
        assert_eq!(vm.state_value(1), None);
        assert_eq!(vm.state_value(2), Some(&VmValue::Int(7)));
    }

    #[test]
    fn test_jump_if_false_same_base_as_jump() {
        use Instruction::*;
        // false → skip the then-branch (same 18-byte distance as above)
        let vm = run(&[
            PushBool(false),
            JumpIfFalse(18),
            PushInt(1),
            SetState(1),
            PushInt(2),
            SetState(2),
            Halt,
        ]);
        assert_eq!(vm.state_value(1), None);
        assert_eq!(vm.state_value(2), Some(&VmValue::Int(2)));

        // true → fall through into the then-branch
        let vm = run(&[
            PushBool(true),
            JumpIfFalse(18),
            PushInt(1),
            SetState(1),
            PushInt(2),
            SetState(2),
            Halt,
        ]);
        assert_eq!(vm.state_value(1), Some(&VmValue::Int(1)));
    }

    #[test]
    fn test_jump_out_of_bounds() {
        use Instruction::*;
        let err = run_err(&[Jump(-100), Halt]);
        assert!(matches!(err, VmError::JumpOutOfBounds(_)));
    }

    #[test]
    fn test_reserved_opcodes_fail() {
        let mut vm = Vm::new();
        assert_eq!(
            vm.execute(&[0x62, 0xFF]),
            Err(VmError::ReservedOpcode("CALL"))
        );
        assert_eq!(
            vm.execute(&[0x71, 0xFF]),
            Err(VmError::ReservedOpcode("GET_PROP"))
        );
    }

    #[test]
    fn test_state_callback_fires_per_set() {
        use Instruction::*;
        let seen: Rc<RefCell<Vec<(u32, VmValue)>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut vm = Vm::new();
        vm.set_state_callback(Box::new(move |id, value| {
            sink.borrow_mut().push((id, value.clone()));
        }));
        let bytecode = crate::vm::loader::assemble(&[
            PushInt(1),
            SetState(4),
            PushInt(2),
            SetState(4),
            Halt,
        ]);
        vm.execute(&bytecode).unwrap();
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], (4, VmValue::Int(2)));
    }

    #[test]
    fn test_unknown_host_function_degrades_gracefully() {
        use Instruction::*;
        // Must not fail the run
        let vm = run(&[CallHost(42), PushInt(1), SetState(1), Halt]);
        assert_eq!(vm.state_value(1), Some(&VmValue::Int(1)));
    }

    #[test]
    fn test_host_function_invocation() {
        use Instruction::*;
        let mut vm = Vm::new();
        vm.register_host(
            7,
            "double_top",
            Box::new(|vm| {
                if let Some(VmValue::Int(v)) = vm.pop_value() {
                    let _ = vm.push_value(VmValue::Int(v * 2));
                }
            }),
        )
        .unwrap();
        let bytecode = crate::vm::loader::assemble(&[
            PushInt(21),
            CallHost(7),
            SetState(1),
            Halt,
        ]);
        vm.execute(&bytecode).unwrap();
        assert_eq!(vm.state_value(1), Some(&VmValue::Int(42)));
        assert_eq!(vm.host_name(7), Some("double_top"));
    }

    #[test]
    fn test_host_limit() {
        let mut vm = Vm::new();
        for id in 0..HOST_LIMIT as u32 {
            vm.register_host(id, format!("h{id}"), Box::new(|_| {})).unwrap();
        }
        assert_eq!(
            vm.register_host(HOST_LIMIT as u32, "extra", Box::new(|_| {})),
            Err(VmError::HostTableFull)
        );
    }
}
