use std::borrow::Cow;
use std::io::Cursor;

use binrw::{binrw, BinRead, BinResult, BinWrite};

use crate::attribute_info::AttributeInfo;
use crate::constant_info::{
    read_const_pool, write_const_pool, ClassConstant, ConstantInfo, DoubleConstant,
    FloatConstant, IntegerConstant, LongConstant, MethodRefConstant, NameAndTypeConstant,
    StringConstant, Utf8Constant,
};
use crate::field_info::FieldInfo;
use crate::method_info::MethodInfo;

/// Raised when a new constant would push the pool past its `u16` index space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("constant pool is full")]
pub struct ConstantPoolFull;

#[derive(Clone, Debug)]
#[binrw]
#[brw(big, magic = b"\xca\xfe\xba\xbe")]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub const_pool_size: u16,
    #[br(parse_with = read_const_pool, args(const_pool_size))]
    #[bw(write_with = write_const_pool)]
    pub const_pool: Vec<ConstantInfo>,
    pub access_flags: ClassAccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces_count: u16,
    #[br(count = interfaces_count)]
    pub interfaces: Vec<u16>,
    pub fields_count: u16,
    #[br(count = fields_count)]
    pub fields: Vec<FieldInfo>,
    pub methods_count: u16,
    #[br(count = methods_count)]
    pub methods: Vec<MethodInfo>,
    pub attributes_count: u16,
    #[br(count = attributes_count)]
    pub attributes: Vec<AttributeInfo>,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[binrw]
pub struct ClassAccessFlags(u16);

bitflags! {
    impl ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;     //	Declared public; may be accessed from outside its package.
        const FINAL = 0x0010;      //	Declared final; no subclasses allowed.
        const SUPER = 0x0020;      //	Treat superclass methods specially when invoked by the invokespecial instruction.
        const INTERFACE = 0x0200;  //	Is an interface, not a class.
        const ABSTRACT = 0x0400;   //	Declared abstract; must not be instantiated.
        const SYNTHETIC = 0x1000;  //	Declared synthetic; not present in the source code.
        const ANNOTATION = 0x2000; //	Declared as an annotation type.
        const ENUM = 0x4000;       //	Declared as an enum type.
        const MODULE = 0x8000;     //	Declared as a module type.
    }
}

impl ClassFile {
    /// An empty Java 8 class, for building classes programmatically.
    pub fn new(this_class: &str, super_class: &str) -> Result<Self, ConstantPoolFull> {
        let mut class_file = ClassFile {
            minor_version: 0,
            major_version: 52,
            const_pool_size: 1,
            const_pool: Vec::new(),
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            this_class: 0,
            super_class: 0,
            interfaces_count: 0,
            interfaces: Vec::new(),
            fields_count: 0,
            fields: Vec::new(),
            methods_count: 0,
            methods: Vec::new(),
            attributes_count: 0,
            attributes: Vec::new(),
        };
        class_file.this_class = class_file.get_or_add_class(this_class)?;
        class_file.super_class = class_file.get_or_add_class(super_class)?;
        Ok(class_file)
    }

    /// Parse a class file from its raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> BinResult<Self> {
        ClassFile::read(&mut Cursor::new(bytes))
    }

    /// Serialize the class file. Counts are written as stored, so call
    /// [`ClassFile::sync_counts`] after structural edits.
    pub fn to_bytes(&self) -> BinResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.write(&mut out)?;
        Ok(out.into_inner())
    }

    /// Recompute every `*_count` field from the collections it describes.
    pub fn sync_counts(&mut self) {
        self.const_pool_size = (self.const_pool.len() + 1) as u16;
        self.interfaces_count = self.interfaces.len() as u16;
        self.fields_count = self.fields.len() as u16;
        self.methods_count = self.methods.len() as u16;
        self.attributes_count = self.attributes.len() as u16;
        for method in &mut self.methods {
            method.attributes_count = method.attributes.len() as u16;
        }
        for field in &mut self.fields {
            field.attributes_count = field.attributes.len() as u16;
        }
    }

    /// Constant at a 1-based pool index.
    pub fn constant(&self, index: u16) -> Option<&ConstantInfo> {
        if index == 0 {
            return None;
        }
        self.const_pool.get(index as usize - 1)
    }

    pub fn get_utf8(&self, index: u16) -> Option<Cow<'_, str>> {
        match self.constant(index)? {
            ConstantInfo::Utf8(u) => Some(u.as_str()),
            _ => None,
        }
    }

    /// Internal name of a `CONSTANT_Class` entry.
    pub fn class_name(&self, index: u16) -> Option<Cow<'_, str>> {
        match self.constant(index)? {
            ConstantInfo::Class(c) => self.get_utf8(c.name_index),
            _ => None,
        }
    }

    pub fn this_class_name(&self) -> Option<Cow<'_, str>> {
        self.class_name(self.this_class)
    }

    /// Index of the method with exactly this name and descriptor.
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<usize> {
        self.methods.iter().position(|m| {
            self.get_utf8(m.name_index).as_deref() == Some(name)
                && self.get_utf8(m.descriptor_index).as_deref() == Some(descriptor)
        })
    }

    /// Name of an attribute as recorded in the constant pool.
    pub fn attribute_name(&self, attribute: &AttributeInfo) -> Option<Cow<'_, str>> {
        self.get_utf8(attribute.attribute_name_index)
    }

    // -- Constant pool construction --

    fn push_constant(&mut self, constant: ConstantInfo) -> Result<u16, ConstantPoolFull> {
        let wide = constant.is_wide();
        let slots = if wide { 2 } else { 1 };
        // Highest usable index is 65534; the count field is one past it.
        if self.const_pool.len() + slots > u16::MAX as usize - 1 {
            return Err(ConstantPoolFull);
        }
        self.const_pool.push(constant);
        let index = self.const_pool.len() as u16;
        if wide {
            self.const_pool.push(ConstantInfo::Unusable);
        }
        self.const_pool_size = (self.const_pool.len() + 1) as u16;
        Ok(index)
    }

    fn position_of(&self, pred: impl Fn(&ConstantInfo) -> bool) -> Option<u16> {
        self.const_pool
            .iter()
            .position(pred)
            .map(|i| (i + 1) as u16)
    }

    pub fn get_or_add_utf8(&mut self, value: &str) -> Result<u16, ConstantPoolFull> {
        let encoded = Utf8Constant::new(value);
        if let Some(index) =
            self.position_of(|c| matches!(c, ConstantInfo::Utf8(u) if u.bytes == encoded.bytes))
        {
            return Ok(index);
        }
        self.push_constant(ConstantInfo::Utf8(encoded))
    }

    pub fn get_or_add_class(&mut self, internal_name: &str) -> Result<u16, ConstantPoolFull> {
        let name_index = self.get_or_add_utf8(internal_name)?;
        if let Some(index) = self.position_of(
            |c| matches!(c, ConstantInfo::Class(k) if k.name_index == name_index),
        ) {
            return Ok(index);
        }
        self.push_constant(ConstantInfo::Class(ClassConstant { name_index }))
    }

    pub fn get_or_add_string(&mut self, value: &str) -> Result<u16, ConstantPoolFull> {
        let string_index = self.get_or_add_utf8(value)?;
        if let Some(index) = self.position_of(
            |c| matches!(c, ConstantInfo::String(s) if s.string_index == string_index),
        ) {
            return Ok(index);
        }
        self.push_constant(ConstantInfo::String(StringConstant { string_index }))
    }

    pub fn get_or_add_integer(&mut self, value: i32) -> Result<u16, ConstantPoolFull> {
        if let Some(index) =
            self.position_of(|c| matches!(c, ConstantInfo::Integer(i) if i.value == value))
        {
            return Ok(index);
        }
        self.push_constant(ConstantInfo::Integer(IntegerConstant { value }))
    }

    pub fn get_or_add_float(&mut self, value: f32) -> Result<u16, ConstantPoolFull> {
        if let Some(index) = self.position_of(
            |c| matches!(c, ConstantInfo::Float(f) if f.value.to_bits() == value.to_bits()),
        ) {
            return Ok(index);
        }
        self.push_constant(ConstantInfo::Float(FloatConstant { value }))
    }

    pub fn get_or_add_long(&mut self, value: i64) -> Result<u16, ConstantPoolFull> {
        if let Some(index) =
            self.position_of(|c| matches!(c, ConstantInfo::Long(l) if l.value == value))
        {
            return Ok(index);
        }
        self.push_constant(ConstantInfo::Long(LongConstant { value }))
    }

    pub fn get_or_add_double(&mut self, value: f64) -> Result<u16, ConstantPoolFull> {
        if let Some(index) = self.position_of(
            |c| matches!(c, ConstantInfo::Double(d) if d.value.to_bits() == value.to_bits()),
        ) {
            return Ok(index);
        }
        self.push_constant(ConstantInfo::Double(DoubleConstant { value }))
    }

    pub fn get_or_add_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ConstantPoolFull> {
        let name_index = self.get_or_add_utf8(name)?;
        let descriptor_index = self.get_or_add_utf8(descriptor)?;
        if let Some(index) = self.position_of(|c| {
            matches!(c, ConstantInfo::NameAndType(nt)
                if nt.name_index == name_index && nt.descriptor_index == descriptor_index)
        }) {
            return Ok(index);
        }
        self.push_constant(ConstantInfo::NameAndType(NameAndTypeConstant {
            name_index,
            descriptor_index,
        }))
    }

    pub fn get_or_add_method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ConstantPoolFull> {
        let class_index = self.get_or_add_class(class)?;
        let name_and_type_index = self.get_or_add_name_and_type(name, descriptor)?;
        if let Some(index) = self.position_of(|c| {
            matches!(c, ConstantInfo::MethodRef(m)
                if m.class_index == class_index && m.name_and_type_index == name_and_type_index)
        }) {
            return Ok(index);
        }
        self.push_constant(ConstantInfo::MethodRef(MethodRefConstant {
            class_index,
            name_and_type_index,
        }))
    }
}
