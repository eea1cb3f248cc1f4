//! `EsChunk`: the EBC bytecode container and its binary (de)serialization
//! (`spec.md §4.7`/§6, "EBC file format").

use std::io::{self, Read, Write};

/// Byte-coded EBC opcode set (`spec.md §4.7`). Opcodes at and above
/// [`EsOpCode::LoadPtr`] are not named in `spec.md §4.7`'s listed set — the
/// documented set is a bare numeric stack VM with no heap, array, or
/// non-core arithmetic model. They cover the class/array/string features
/// `spec.md §3`/§4.5 require; see `DESIGN.md`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EsOpCode {
    Constant = 0,
    Null = 1,
    True = 2,
    False = 3,
    Pop = 4,
    GetLocal = 5,
    SetLocal = 6,
    GetGlobal = 7,
    DefineGlobal = 8,
    SetGlobal = 9,
    Equal = 10,
    Greater = 11,
    Less = 12,
    Add = 13,
    Sub = 14,
    Mul = 15,
    Div = 16,
    Not = 17,
    Negate = 18,
    Print = 19,
    Jump = 20,
    JumpIfFalse = 21,
    Loop = 22,
    Call = 23,
    Return = 24,
    StkAdj = 25,
    IntToString = 26,
    Halt = 27,
    LoadPtr = 28,
    StorePtr = 29,
    ArrayLoad = 30,
    ArrayStore = 31,
    StrCat = 32,
    Mod = 33,
    Pow = 34,
    BitAnd = 35,
    BitOr = 36,
    BitXor = 37,
    Shl = 38,
    Shr = 39,
    LogAnd = 40,
    LogOr = 41,
    BitNot = 42,
    DoubleToString = 43,
}

impl EsOpCode {
    pub fn from_byte(b: u8) -> Option<Self> {
        use EsOpCode::*;
        const TABLE: &[EsOpCode] = &[
            Constant, Null, True, False, Pop, GetLocal, SetLocal, GetGlobal, DefineGlobal,
            SetGlobal, Equal, Greater, Less, Add, Sub, Mul, Div, Not, Negate, Print, Jump,
            JumpIfFalse, Loop, Call, Return, StkAdj, IntToString, Halt, LoadPtr, StorePtr,
            ArrayLoad, ArrayStore, StrCat, Mod, Pow, BitAnd, BitOr, BitXor, Shl, Shr, LogAnd,
            LogOr, BitNot, DoubleToString,
        ];
        TABLE.get(b as usize).copied()
    }
}

/// A tagged constant-pool value (`spec.md §4.7`: `Bool/Null/Number/Obj/
/// StringLiteral`; `Obj` is not produced by this backend but is kept in the
/// tag space so the format stays forward-compatible with a future heap
/// object constant).
#[derive(Debug, Clone, PartialEq)]
pub enum EsValue {
    Null,
    Bool(bool),
    Number(f64),
    StringLiteral(String),
}

impl EsValue {
    fn tag(&self) -> u32 {
        match self {
            EsValue::Null => 0,
            EsValue::Bool(_) => 1,
            EsValue::Number(_) => 2,
            EsValue::StringLiteral(_) => 3,
        }
    }
}

const MAGIC: u32 = 0x4553_4243;
const VERSION: u16 = 1;

/// A complete EBC program: flat code bytes, per-byte source lines, and the
/// constant pool (`spec.md §4.7`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EsChunk {
    pub code: Vec<u8>,
    pub lines: Vec<i32>,
    pub constants: Vec<EsValue>,
}

impl EsChunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_byte(&mut self, byte: u8, line: i32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: EsOpCode, line: i32) {
        self.write_byte(op as u8, line);
    }

    /// Intern a constant, returning its index (no deduplication: the EBC
    /// format has no need for it since each constant is only ever loaded by
    /// the single `CONSTANT` instruction that introduced it).
    pub fn add_constant(&mut self, value: EsValue) -> u32 {
        self.constants.push(value);
        (self.constants.len() - 1) as u32
    }

    /// Serialize per `spec.md §6`'s EBC file format.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&MAGIC.to_le_bytes())?;
        out.write_all(&VERSION.to_le_bytes())?;
        out.write_all(&(self.code.len() as u32).to_le_bytes())?;
        out.write_all(&self.code)?;
        for line in &self.lines {
            out.write_all(&line.to_le_bytes())?;
        }
        out.write_all(&(self.constants.len() as u32).to_le_bytes())?;
        for constant in &self.constants {
            out.write_all(&constant.tag().to_le_bytes())?;
            match constant {
                EsValue::Null => {}
                EsValue::Bool(b) => out.write_all(&[*b as u8])?,
                EsValue::Number(n) => out.write_all(&n.to_le_bytes())?,
                EsValue::StringLiteral(s) => {
                    let bytes = s.as_bytes();
                    out.write_all(&(bytes.len() as u16).to_le_bytes())?;
                    out.write_all(bytes)?;
                }
            }
        }
        Ok(())
    }

    pub fn read_from<R: Read>(input: &mut R) -> io::Result<Self> {
        let mut u32_buf = [0u8; 4];
        let mut u16_buf = [0u8; 2];

        input.read_exact(&mut u32_buf)?;
        let magic = u32::from_le_bytes(u32_buf);
        if magic != MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad EBC magic"));
        }

        input.read_exact(&mut u16_buf)?;
        let version = u16::from_le_bytes(u16_buf);
        if version != VERSION {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "unsupported EBC version"));
        }

        input.read_exact(&mut u32_buf)?;
        let code_count = u32::from_le_bytes(u32_buf) as usize;
        let mut code = vec![0u8; code_count];
        input.read_exact(&mut code)?;

        let mut lines = Vec::with_capacity(code_count);
        for _ in 0..code_count {
            input.read_exact(&mut u32_buf)?;
            lines.push(i32::from_le_bytes(u32_buf));
        }

        input.read_exact(&mut u32_buf)?;
        let constant_count = u32::from_le_bytes(u32_buf);
        let mut constants = Vec::with_capacity(constant_count as usize);
        for _ in 0..constant_count {
            input.read_exact(&mut u32_buf)?;
            let tag = u32::from_le_bytes(u32_buf);
            let value = match tag {
                0 => EsValue::Null,
                1 => {
                    let mut b = [0u8; 1];
                    input.read_exact(&mut b)?;
                    EsValue::Bool(b[0] != 0)
                }
                2 => {
                    let mut b = [0u8; 8];
                    input.read_exact(&mut b)?;
                    EsValue::Number(f64::from_le_bytes(b))
                }
                3 => {
                    input.read_exact(&mut u16_buf)?;
                    let len = u16::from_le_bytes(u16_buf) as usize;
                    let mut bytes = vec![0u8; len];
                    input.read_exact(&mut bytes)?;
                    EsValue::StringLiteral(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => return Err(io::Error::new(io::ErrorKind::InvalidData, "bad constant tag")),
            };
            constants.push(value);
        }

        Ok(EsChunk { code, lines, constants })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_round_trips_through_bytes() {
        let mut chunk = EsChunk::new();
        let idx = chunk.add_constant(EsValue::StringLiteral("hi".to_string()));
        chunk.write_op(EsOpCode::Constant, 1);
        chunk.write_byte(idx as u8, 1);
        chunk.write_op(EsOpCode::Call, 1);
        chunk.write_byte(1, 1);
        chunk.write_op(EsOpCode::Halt, 2);

        let mut bytes = Vec::new();
        chunk.write_to(&mut bytes).unwrap();
        let read_back = EsChunk::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(chunk, read_back);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let bytes = [0u8; 4];
        assert!(EsChunk::read_from(&mut bytes.as_slice()).is_err());
    }

    #[test]
    fn opcode_round_trips_through_byte() {
        assert_eq!(EsOpCode::from_byte(EsOpCode::Halt as u8), Some(EsOpCode::Halt));
        assert_eq!(EsOpCode::from_byte(255), None);
    }
}
