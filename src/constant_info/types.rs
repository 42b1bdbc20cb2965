use std::borrow::Cow;
use std::io::{Read, Seek, Write};

use binrw::{binrw, BinRead, BinResult, BinWrite, Endian};

#[derive(Clone, Debug)]
pub enum ConstantInfo {
    Utf8(Utf8Constant),
    Integer(IntegerConstant),
    Float(FloatConstant),
    Long(LongConstant),
    Double(DoubleConstant),
    Class(ClassConstant),
    String(StringConstant),
    FieldRef(FieldRefConstant),
    MethodRef(MethodRefConstant),
    InterfaceMethodRef(InterfaceMethodRefConstant),
    NameAndType(NameAndTypeConstant),
    MethodHandle(MethodHandleConstant),
    MethodType(MethodTypeConstant),
    Dynamic(DynamicConstant),
    InvokeDynamic(InvokeDynamicConstant),
    Module(ModuleConstant),
    Package(PackageConstant),
    /// Second slot of a `Long` or `Double`; occupies an index but no bytes.
    Unusable,
}

impl ConstantInfo {
    /// The `tag` byte that introduces this constant, if it has one.
    pub fn tag(&self) -> Option<u8> {
        let tag = match self {
            ConstantInfo::Utf8(_) => 1,
            ConstantInfo::Integer(_) => 3,
            ConstantInfo::Float(_) => 4,
            ConstantInfo::Long(_) => 5,
            ConstantInfo::Double(_) => 6,
            ConstantInfo::Class(_) => 7,
            ConstantInfo::String(_) => 8,
            ConstantInfo::FieldRef(_) => 9,
            ConstantInfo::MethodRef(_) => 10,
            ConstantInfo::InterfaceMethodRef(_) => 11,
            ConstantInfo::NameAndType(_) => 12,
            ConstantInfo::MethodHandle(_) => 15,
            ConstantInfo::MethodType(_) => 16,
            ConstantInfo::Dynamic(_) => 17,
            ConstantInfo::InvokeDynamic(_) => 18,
            ConstantInfo::Module(_) => 19,
            ConstantInfo::Package(_) => 20,
            ConstantInfo::Unusable => return None,
        };
        Some(tag)
    }

    /// Long and double constants take two pool slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, ConstantInfo::Long(_) | ConstantInfo::Double(_))
    }
}

impl BinRead for ConstantInfo {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pos = reader.stream_position()?;
        let tag = u8::read_options(reader, endian, ())?;
        let constant = match tag {
            1 => ConstantInfo::Utf8(Utf8Constant::read_options(reader, endian, ())?),
            3 => ConstantInfo::Integer(IntegerConstant::read_options(reader, endian, ())?),
            4 => ConstantInfo::Float(FloatConstant::read_options(reader, endian, ())?),
            5 => ConstantInfo::Long(LongConstant::read_options(reader, endian, ())?),
            6 => ConstantInfo::Double(DoubleConstant::read_options(reader, endian, ())?),
            7 => ConstantInfo::Class(ClassConstant::read_options(reader, endian, ())?),
            8 => ConstantInfo::String(StringConstant::read_options(reader, endian, ())?),
            9 => ConstantInfo::FieldRef(FieldRefConstant::read_options(reader, endian, ())?),
            10 => ConstantInfo::MethodRef(MethodRefConstant::read_options(reader, endian, ())?),
            11 => ConstantInfo::InterfaceMethodRef(InterfaceMethodRefConstant::read_options(
                reader,
                endian,
                (),
            )?),
            12 => ConstantInfo::NameAndType(NameAndTypeConstant::read_options(reader, endian, ())?),
            15 => {
                ConstantInfo::MethodHandle(MethodHandleConstant::read_options(reader, endian, ())?)
            }
            16 => ConstantInfo::MethodType(MethodTypeConstant::read_options(reader, endian, ())?),
            17 => ConstantInfo::Dynamic(DynamicConstant::read_options(reader, endian, ())?),
            18 => ConstantInfo::InvokeDynamic(InvokeDynamicConstant::read_options(
                reader,
                endian,
                (),
            )?),
            19 => ConstantInfo::Module(ModuleConstant::read_options(reader, endian, ())?),
            20 => ConstantInfo::Package(PackageConstant::read_options(reader, endian, ())?),
            other => {
                return Err(binrw::Error::AssertFail {
                    pos,
                    message: format!("unknown constant pool tag {other}"),
                })
            }
        };
        Ok(constant)
    }
}

impl BinWrite for ConstantInfo {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        let Some(tag) = self.tag() else {
            return Ok(());
        };
        tag.write_options(writer, endian, ())?;
        match self {
            ConstantInfo::Utf8(c) => c.write_options(writer, endian, ()),
            ConstantInfo::Integer(c) => c.write_options(writer, endian, ()),
            ConstantInfo::Float(c) => c.write_options(writer, endian, ()),
            ConstantInfo::Long(c) => c.write_options(writer, endian, ()),
            ConstantInfo::Double(c) => c.write_options(writer, endian, ()),
            ConstantInfo::Class(c) => c.write_options(writer, endian, ()),
            ConstantInfo::String(c) => c.write_options(writer, endian, ()),
            ConstantInfo::FieldRef(c) => c.write_options(writer, endian, ()),
            ConstantInfo::MethodRef(c) => c.write_options(writer, endian, ()),
            ConstantInfo::InterfaceMethodRef(c) => c.write_options(writer, endian, ()),
            ConstantInfo::NameAndType(c) => c.write_options(writer, endian, ()),
            ConstantInfo::MethodHandle(c) => c.write_options(writer, endian, ()),
            ConstantInfo::MethodType(c) => c.write_options(writer, endian, ()),
            ConstantInfo::Dynamic(c) => c.write_options(writer, endian, ()),
            ConstantInfo::InvokeDynamic(c) => c.write_options(writer, endian, ()),
            ConstantInfo::Module(c) => c.write_options(writer, endian, ()),
            ConstantInfo::Package(c) => c.write_options(writer, endian, ()),
            ConstantInfo::Unusable => Ok(()),
        }
    }
}

/// A `CONSTANT_Utf8` entry. The bytes are kept in their on-disk "modified
/// UTF-8" form so untouched entries are written back unchanged.
#[binrw]
#[brw(big)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utf8Constant {
    #[br(temp)]
    #[bw(try_calc(u16::try_from(bytes.len())))]
    length: u16,
    #[br(count = length)]
    pub bytes: Vec<u8>,
}

impl Utf8Constant {
    pub fn new(value: &str) -> Self {
        Utf8Constant {
            bytes: encode_modified_utf8(value),
        }
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        decode_modified_utf8(&self.bytes)
    }
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct IntegerConstant {
    pub value: i32,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct FloatConstant {
    pub value: f32,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct LongConstant {
    pub value: i64,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct DoubleConstant {
    pub value: f64,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct ClassConstant {
    pub name_index: u16,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct StringConstant {
    pub string_index: u16,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct FieldRefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct MethodRefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct InterfaceMethodRefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct NameAndTypeConstant {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct MethodHandleConstant {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct MethodTypeConstant {
    pub descriptor_index: u16,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct DynamicConstant {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct InvokeDynamicConstant {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct ModuleConstant {
    pub name_index: u16,
}

#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct PackageConstant {
    pub name_index: u16,
}

/// Encode a string in the JVM's modified UTF-8: NUL is two bytes and
/// supplementary characters are written as surrogate pairs.
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                out.push(0xc0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    out
}

/// Decode modified UTF-8. Malformed sequences become U+FFFD.
pub fn decode_modified_utf8(bytes: &[u8]) -> Cow<'_, str> {
    if bytes.iter().all(|&b| b != 0 && b < 0x80) {
        // Plain ASCII is identical in both encodings.
        if let Ok(s) = std::str::from_utf8(bytes) {
            return Cow::Borrowed(s);
        }
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let (unit, width) = if b & 0x80 == 0 {
            (b as u16, 1)
        } else if b & 0xe0 == 0xc0 && i + 1 < bytes.len() && bytes[i + 1] & 0xc0 == 0x80 {
            ((((b & 0x1f) as u16) << 6) | (bytes[i + 1] & 0x3f) as u16, 2)
        } else if b & 0xf0 == 0xe0
            && i + 2 < bytes.len()
            && bytes[i + 1] & 0xc0 == 0x80
            && bytes[i + 2] & 0xc0 == 0x80
        {
            (
                (((b & 0x0f) as u16) << 12)
                    | (((bytes[i + 1] & 0x3f) as u16) << 6)
                    | (bytes[i + 2] & 0x3f) as u16,
                3,
            )
        } else {
            (0xfffd, 1)
        };
        units.push(unit);
        i += width;
    }
    Cow::Owned(String::from_utf16_lossy(&units))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_borrowed() {
        let decoded = decode_modified_utf8(b"lookup");
        assert!(matches!(decoded, Cow::Borrowed("lookup")));
    }

    #[test]
    fn nul_uses_two_bytes() {
        assert_eq!(encode_modified_utf8("a\0b"), vec![b'a', 0xc0, 0x80, b'b']);
        assert_eq!(decode_modified_utf8(&[b'a', 0xc0, 0x80, b'b']), "a\0b");
    }

    #[test]
    fn supplementary_characters_become_surrogate_pairs() {
        let encoded = encode_modified_utf8("\u{1F600}");
        assert_eq!(encoded.len(), 6);
        assert_eq!(decode_modified_utf8(&encoded), "\u{1F600}");
    }

    #[test]
    fn two_and_three_byte_forms() {
        let value = "caf\u{e9} \u{20ac}";
        assert_eq!(encode_modified_utf8(value), value.as_bytes());
        assert_eq!(decode_modified_utf8(value.as_bytes()), value);
    }

    #[test]
    fn utf8_constant_round_trip() {
        use binrw::{BinRead, BinWrite};
        use std::io::Cursor;

        let constant = Utf8Constant::new("caf\u{e9}\0\u{20ac}");
        let mut out = Cursor::new(Vec::new());
        constant.write(&mut out).unwrap();
        let bytes = out.into_inner();
        // u16 length prefix, then e9 and NUL as two bytes each, euro as three
        assert_eq!(&bytes[..2], &[0, 10]);
        assert_eq!(&bytes[2..], b"caf\xc3\xa9\xc0\x80\xe2\x82\xac");

        let read = Utf8Constant::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(read, constant);
        assert_eq!(read.as_str(), "caf\u{e9}\0\u{20ac}");
    }

    #[test]
    fn truncated_sequence_is_replaced() {
        assert_eq!(decode_modified_utf8(&[b'x', 0xe2, 0x82]), "x\u{fffd}\u{fffd}");
    }
}
