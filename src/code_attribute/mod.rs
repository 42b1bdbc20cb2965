mod types;

pub use self::types::*;

use std::io::Cursor;

use binrw::{BinRead, BinResult, BinWrite};

/// Serialize an instruction sequence into a code array.
pub fn encode_instructions(instructions: &[Instruction]) -> BinResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    for instruction in instructions {
        instruction.write(&mut out)?;
    }
    Ok(out.into_inner())
}

/// Decode a code array made only of opcodes in [`Instruction`].
pub fn decode_instructions(code: &[u8]) -> BinResult<Vec<Instruction>> {
    let mut cursor = Cursor::new(code);
    let mut instructions = Vec::new();
    while (cursor.position() as usize) < code.len() {
        instructions.push(Instruction::read(&mut cursor)?);
    }
    Ok(instructions)
}
