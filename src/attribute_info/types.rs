use std::io::Cursor;

use binrw::{binrw, BinRead, BinResult, BinWrite};

/// An attribute kept in its raw form. Only `Code` is ever decoded; everything
/// else round-trips through `info` untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
#[brw(big)]
pub struct AttributeInfo {
    pub attribute_name_index: u16,
    pub attribute_length: u32,
    #[br(count = attribute_length)]
    pub info: Vec<u8>,
}

impl AttributeInfo {
    pub fn new(attribute_name_index: u16, info: Vec<u8>) -> Self {
        AttributeInfo {
            attribute_name_index,
            attribute_length: info.len() as u32,
            info,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
#[brw(big)]
pub struct ExceptionEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
#[brw(big)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_length: u32,
    #[br(count = code_length)]
    pub code: Vec<u8>,
    pub exception_table_length: u16,
    #[br(count = exception_table_length)]
    pub exception_table: Vec<ExceptionEntry>,
    pub attributes_count: u16,
    #[br(count = attributes_count)]
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    /// A body with no exception handlers and no sub-attributes.
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        CodeAttribute {
            max_stack,
            max_locals,
            code_length: code.len() as u32,
            code,
            exception_table_length: 0,
            exception_table: Vec::new(),
            attributes_count: 0,
            attributes: Vec::new(),
        }
    }

    /// Decode the payload of a `Code` attribute.
    pub fn from_info(info: &[u8]) -> BinResult<Self> {
        CodeAttribute::read(&mut Cursor::new(info))
    }

    /// Encode back into an attribute payload, fixing up the length fields.
    pub fn to_info(&self) -> BinResult<Vec<u8>> {
        let mut synced = self.clone();
        synced.code_length = synced.code.len() as u32;
        synced.exception_table_length = synced.exception_table.len() as u16;
        synced.attributes_count = synced.attributes.len() as u16;
        let mut out = Cursor::new(Vec::new());
        synced.write(&mut out)?;
        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_attribute_round_trips_with_fixed_lengths() {
        let mut code = CodeAttribute::new(1, 2, vec![0x2b, 0xb0]);
        code.attributes.push(AttributeInfo::new(9, vec![0, 1, 0, 0, 0, 3]));
        code.code_length = 0;
        let info = code.to_info().unwrap();
        // max_stack, max_locals, code_length, code, exception table length,
        // attribute count, one attribute of 6 + 6 bytes
        assert_eq!(info.len(), 2 + 2 + 4 + 2 + 2 + 2 + 12);

        let decoded = CodeAttribute::from_info(&info).unwrap();
        assert_eq!(decoded.code, vec![0x2b, 0xb0]);
        assert_eq!(decoded.code_length, 2);
        assert_eq!(decoded.attributes.len(), 1);
        assert_eq!(decoded.attributes[0].attribute_length, 6);
    }

    #[test]
    fn truncated_code_attribute_is_an_error() {
        let info = CodeAttribute::new(1, 1, vec![0xb1]).to_info().unwrap();
        assert!(CodeAttribute::from_info(&info[..info.len() - 1]).is_err());
    }
}
