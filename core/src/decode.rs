//! Parses a Wasm binary into a [`Module`].

use crate::{
    error::DecodeError,
    module::{Export, ExportKind, FuncBody, Instr, LocalGroup, Module},
    reader::Reader,
    types::{BlockType, FuncType, ValueType},
};

const MAGIC: [u8; 4] = *b"\0asm";
const VERSION: u32 = 1;

const SEC_TYPE: u8 = 1;
const SEC_IMPORT: u8 = 2;
const SEC_FUNCTION: u8 = 3;
const SEC_TABLE: u8 = 4;
const SEC_MEMORY: u8 = 5;
const SEC_GLOBAL: u8 = 6;
const SEC_EXPORT: u8 = 7;
const SEC_START: u8 = 8;
const SEC_ELEMENT: u8 = 9;
const SEC_CODE: u8 = 10;
const SEC_DATA: u8 = 11;

/// Parse a Wasm binary into an owned [`Module`].
///
/// Byte syntax is checked; semantic typing (e.g. that the function and
/// code sections agree in length) is the validator's job.
pub fn decode_module(bytes: &[u8]) -> Result<Module, DecodeError> {
    let mut reader = Reader::new(bytes);
    decode_preamble(&mut reader)?;

    let mut module = Module::default();
    let mut last_section_id: u8 = 0;

    while !reader.eof() {
        let id = reader.read_u8()?;
        let size = reader.read_u32_leb128()? as usize;
        let mut section = reader.read_bytes(size)?;

        if id == 0 {
            // Custom sections carry no ordering constraint and are skipped
            // entirely; their contents (including the name subfield) are of
            // no interest to the core.
            continue;
        }
        if id > SEC_DATA {
            return Err(DecodeError::BadSectionOrder { id });
        }
        if id <= last_section_id {
            return Err(DecodeError::BadSectionOrder { id });
        }
        last_section_id = id;

        match id {
            SEC_TYPE => module.types = decode_type_section(&mut section)?,
            SEC_FUNCTION => module.func_type_idxs = decode_function_section(&mut section)?,
            SEC_EXPORT => module.exports = decode_export_section(&mut section)?,
            SEC_CODE => module.code = decode_code_section(&mut section)?,
            // Table, memory, global, start, import, and element sections
            // are structurally out of the core's scope: parsed just enough
            // to be skipped (the byte reader already consumed exactly
            // `size` bytes above), contributing nothing to the Module.
            SEC_IMPORT | SEC_TABLE | SEC_MEMORY | SEC_GLOBAL | SEC_START | SEC_ELEMENT => {}
            _ => unreachable!("id already range-checked above"),
        }

        if !section.eof() {
            return Err(DecodeError::SectionSizeMismatch { id });
        }
    }

    Ok(module)
}

fn decode_preamble(reader: &mut Reader<'_>) -> Result<(), DecodeError> {
    let mut magic = [0u8; 4];
    for slot in &mut magic {
        *slot = reader.read_u8()?;
    }
    if magic != MAGIC {
        return Err(DecodeError::BadPreamble);
    }
    let version = reader.read_u32_le()?;
    if version != VERSION {
        return Err(DecodeError::BadPreamble);
    }
    Ok(())
}

fn decode_value_type(reader: &mut Reader<'_>) -> Result<ValueType, DecodeError> {
    let byte = reader.read_u8()?;
    ValueType::from_byte(byte).ok_or(DecodeError::BadValueType { found: byte })
}

fn decode_block_type(reader: &mut Reader<'_>) -> Result<BlockType, DecodeError> {
    let byte = reader.read_u8()?;
    if byte == 0x40 {
        return Ok(BlockType::Empty);
    }
    ValueType::from_byte(byte)
        .map(BlockType::Value)
        .ok_or(DecodeError::BadValueType { found: byte })
}

fn decode_vec<T>(
    reader: &mut Reader<'_>,
    mut elem: impl FnMut(&mut Reader<'_>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let n = reader.read_u32_leb128()? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(elem(reader)?);
    }
    Ok(out)
}

fn decode_type_section(reader: &mut Reader<'_>) -> Result<Vec<FuncType>, DecodeError> {
    decode_vec(reader, |r| {
        let form = r.read_u8()?;
        if form != 0x60 {
            return Err(DecodeError::BadFuncTypeForm { found: form });
        }
        let params = decode_vec(r, decode_value_type)?;
        let results = decode_vec(r, decode_value_type)?;
        Ok(FuncType::new(params, results))
    })
}

fn decode_function_section(reader: &mut Reader<'_>) -> Result<Vec<u32>, DecodeError> {
    decode_vec(reader, |r| r.read_u32_leb128())
}

fn decode_export_section(reader: &mut Reader<'_>) -> Result<Vec<Export>, DecodeError> {
    decode_vec(reader, |r| {
        let name = r.read_name()?;
        let kind_byte = r.read_u8()?;
        let kind = match kind_byte {
            0x00 => ExportKind::Func,
            _ => return Err(DecodeError::UnsupportedExportKind { found: kind_byte }),
        };
        let index = r.read_u32_leb128()?;
        Ok(Export { name, kind, index })
    })
}

fn decode_code_section(reader: &mut Reader<'_>) -> Result<Vec<FuncBody>, DecodeError> {
    decode_vec(reader, |r| {
        let body_size = r.read_u32_leb128()? as usize;
        let mut body_reader = r.read_bytes(body_size)?;

        let locals = decode_vec(&mut body_reader, |r| {
            let count = r.read_u32_leb128()?;
            let value_type = decode_value_type(r)?;
            Ok(LocalGroup { count, value_type })
        })?;

        let mut instrs = Vec::new();
        decode_instr_seq(&mut body_reader, &mut instrs)?;

        Ok(FuncBody { locals, instrs })
    })
}

/// Opcode bytes for the core instruction subset.
mod op {
    pub const BLOCK: u8 = 0x02;
    pub const LOOP: u8 = 0x03;
    pub const IF: u8 = 0x04;
    pub const ELSE: u8 = 0x05;
    pub const END: u8 = 0x0b;
    pub const BR: u8 = 0x0c;
    pub const BR_IF: u8 = 0x0d;
    pub const CALL: u8 = 0x10;
    pub const LOCAL_GET: u8 = 0x20;
    pub const LOCAL_SET: u8 = 0x21;
    pub const I32_CONST: u8 = 0x41;
    pub const I32_GE_S: u8 = 0x4e;
    pub const I32_ADD: u8 = 0x6a;
}

/// Recursive-descent parse of one instruction sequence (a function body, or
/// a `block`/`loop`/`if` arm), appending onto the function's shared, flat
/// instruction vector. Terminates by pushing the [`Instr::End`] or
/// [`Instr::Else`] that ended the sequence; its caller inspects which one
/// it was to decide whether an else-arm follows.
fn decode_instr_seq(reader: &mut Reader<'_>, out: &mut Vec<Instr>) -> Result<(), DecodeError> {
    loop {
        let opcode = reader.read_u8()?;
        match opcode {
            op::END => {
                out.push(Instr::End);
                return Ok(());
            }
            op::ELSE => {
                out.push(Instr::Else);
                return Ok(());
            }
            op::BLOCK => {
                let block_type = decode_block_type(reader)?;
                let idx = out.len();
                out.push(Instr::Block { block_type, exit: 0 });
                decode_instr_seq(reader, out)?;
                patch_exit(out, idx);
            }
            op::LOOP => {
                let block_type = decode_block_type(reader)?;
                let idx = out.len();
                out.push(Instr::Loop { block_type, exit: 0 });
                decode_instr_seq(reader, out)?;
                patch_exit(out, idx);
            }
            op::IF => {
                let block_type = decode_block_type(reader)?;
                let idx = out.len();
                out.push(Instr::If {
                    block_type,
                    else_: None,
                    exit: 0,
                });
                decode_instr_seq(reader, out)?;
                match out.last() {
                    Some(Instr::Else) => {
                        let else_idx = (out.len() - 1) as u32;
                        decode_instr_seq(reader, out)?;
                        let exit = out.len() as u32;
                        if let Instr::If { else_, exit: e, .. } = &mut out[idx] {
                            *else_ = Some(else_idx);
                            *e = exit;
                        }
                    }
                    Some(Instr::End) => patch_exit(out, idx),
                    _ => unreachable!("decode_instr_seq always ends in Else or End"),
                }
            }
            op::BR => out.push(Instr::Br(reader.read_u32_leb128()?)),
            op::BR_IF => out.push(Instr::BrIf(reader.read_u32_leb128()?)),
            op::CALL => out.push(Instr::Call(reader.read_u32_leb128()?)),
            op::LOCAL_GET => out.push(Instr::LocalGet(reader.read_u32_leb128()?)),
            op::LOCAL_SET => out.push(Instr::LocalSet(reader.read_u32_leb128()?)),
            op::I32_CONST => out.push(Instr::I32Const(reader.read_i32_leb128()?)),
            op::I32_GE_S => out.push(Instr::I32GeS),
            op::I32_ADD => out.push(Instr::I32Add),
            other => return Err(DecodeError::UnsupportedOpcode { opcode: other }),
        }
    }
}

/// Sets `exit` on the `Block`/`Loop`/`If` instruction at `idx` to just past
/// the `End`/`Else` that the nested call to [`decode_instr_seq`] just
/// appended.
fn patch_exit(out: &mut [Instr], idx: usize) {
    let exit = out.len() as u32;
    match &mut out[idx] {
        Instr::Block { exit: e, .. } | Instr::Loop { exit: e, .. } | Instr::If { exit: e, .. } => {
            *e = exit;
        }
        _ => unreachable!("idx always points at a Block/Loop/If"),
    }
}
