//! Typed-instruction assembler and disassembler.
//!
//! `load_function` serializes an in-memory instruction list into the
//! opcode stream the machine executes; `call_function` looks a function up
//! by id and runs it. The disassembler exists so tests can pin the
//! encoding byte-for-byte.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::machine::{Vm, VmError};
use super::opcode::Opcode;

/// A typed instruction with its immediate.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    PushInt(i64),
    PushFloat(f64),
    PushString(String),
    PushBool(bool),
    Pop,
    Dup,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    Not,
    Concat,
    GetState(u32),
    SetState(u32),
    GetLocal(u32),
    SetLocal(u32),
    Jump(i32),
    JumpIfFalse(i32),
    CallHost(u32),
    Halt,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::PushInt(_) => Opcode::PushInt,
            Instruction::PushFloat(_) => Opcode::PushFloat,
            Instruction::PushString(_) => Opcode::PushString,
            Instruction::PushBool(_) => Opcode::PushBool,
            Instruction::Pop => Opcode::Pop,
            Instruction::Dup => Opcode::Dup,
            Instruction::Add => Opcode::Add,
            Instruction::Sub => Opcode::Sub,
            Instruction::Mul => Opcode::Mul,
            Instruction::Div => Opcode::Div,
            Instruction::Mod => Opcode::Mod,
            Instruction::Neg => Opcode::Neg,
            Instruction::Eq => Opcode::Eq,
            Instruction::Ne => Opcode::Ne,
            Instruction::Lt => Opcode::Lt,
            Instruction::Gt => Opcode::Gt,
            Instruction::Le => Opcode::Le,
            Instruction::Ge => Opcode::Ge,
            Instruction::And => Opcode::And,
            Instruction::Or => Opcode::Or,
            Instruction::Not => Opcode::Not,
            Instruction::Concat => Opcode::Concat,
            Instruction::GetState(_) => Opcode::GetState,
            Instruction::SetState(_) => Opcode::SetState,
            Instruction::GetLocal(_) => Opcode::GetLocal,
            Instruction::SetLocal(_) => Opcode::SetLocal,
            Instruction::Jump(_) => Opcode::Jump,
            Instruction::JumpIfFalse(_) => Opcode::JumpIfFalse,
            Instruction::CallHost(_) => Opcode::CallHost,
            Instruction::Halt => Opcode::Halt,
        }
    }
}

/// Serialize instructions into the executable byte stream.
pub fn assemble(instructions: &[Instruction]) -> Vec<u8> {
    let mut out = Vec::with_capacity(instructions.len() * 4);
    for instruction in instructions {
        out.push(instruction.opcode() as u8);
        match instruction {
            Instruction::PushInt(v) => out.write_i64::<LittleEndian>(*v).unwrap(),
            Instruction::PushFloat(v) => out.write_f64::<LittleEndian>(*v).unwrap(),
            Instruction::PushString(s) => {
                out.write_u32::<LittleEndian>(s.len() as u32).unwrap();
                out.extend_from_slice(s.as_bytes());
            }
            Instruction::PushBool(v) => out.push(*v as u8),
            Instruction::GetState(id)
            | Instruction::SetState(id)
            | Instruction::GetLocal(id)
            | Instruction::SetLocal(id)
            | Instruction::CallHost(id) => out.write_u32::<LittleEndian>(*id).unwrap(),
            Instruction::Jump(offset) | Instruction::JumpIfFalse(offset) => {
                out.write_i32::<LittleEndian>(*offset).unwrap()
            }
            _ => {}
        }
    }
    out
}

impl Vm {
    /// Assemble and store a function's instruction list under `id`.
    pub fn load_function(&mut self, id: u32, instructions: &[Instruction]) {
        let bytecode = assemble(instructions);
        tracing::debug!(id, bytes = bytecode.len(), "load function");
        self.store_function(id, bytecode);
    }
}

/// Render a bytecode stream as one instruction per line.
pub fn disassemble(bytecode: &[u8]) -> Result<String, VmError> {
    let mut cursor = std::io::Cursor::new(bytecode);
    let mut out = String::new();
    while (cursor.position() as usize) < bytecode.len() {
        let at = cursor.position();
        let byte = cursor.read_u8().map_err(|_| VmError::UnexpectedEnd)?;
        let op = Opcode::from_byte(byte).ok_or(VmError::UnknownOpcode(byte))?;
        out.push_str(&format!("{at:04} {}", op.mnemonic()));
        match op {
            Opcode::PushInt => {
                let v = cursor
                    .read_i64::<LittleEndian>()
                    .map_err(|_| VmError::UnexpectedEnd)?;
                out.push_str(&format!(" {v}"));
            }
            Opcode::PushFloat => {
                let v = cursor
                    .read_f64::<LittleEndian>()
                    .map_err(|_| VmError::UnexpectedEnd)?;
                out.push_str(&format!(" {v}"));
            }
            Opcode::PushString => {
                let len = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|_| VmError::UnexpectedEnd)? as usize;
                let start = cursor.position() as usize;
                let bytes = bytecode
                    .get(start..start + len)
                    .ok_or(VmError::UnexpectedEnd)?;
                let text =
                    std::str::from_utf8(bytes).map_err(|_| VmError::BadStringImmediate)?;
                out.push_str(&format!(" {text:?}"));
                cursor.set_position((start + len) as u64);
            }
            Opcode::PushBool => {
                let v = cursor.read_u8().map_err(|_| VmError::UnexpectedEnd)?;
                out.push_str(if v != 0 { " true" } else { " false" });
            }
            Opcode::GetState
            | Opcode::SetState
            | Opcode::GetLocal
            | Opcode::SetLocal
            | Opcode::CallHost => {
                let id = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|_| VmError::UnexpectedEnd)?;
                out.push_str(&format!(" {id}"));
            }
            Opcode::Jump | Opcode::JumpIfFalse => {
                let offset = cursor
                    .read_i32::<LittleEndian>()
                    .map_err(|_| VmError::UnexpectedEnd)?;
                out.push_str(&format!(" {offset:+}"));
            }
            _ => {}
        }
        out.push('\n');
    }
    Ok(out)
}
