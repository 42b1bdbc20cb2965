mod types;

pub use self::types::*;

/// Code sub-attributes that index into the bytecode array and therefore
/// cannot survive a body replacement.
pub const OFFSET_BEARING_CODE_ATTRIBUTES: &[&str] = &[
    "LineNumberTable",
    "LocalVariableTable",
    "LocalVariableTypeTable",
    "StackMapTable",
    "RuntimeVisibleTypeAnnotations",
    "RuntimeInvisibleTypeAnnotations",
];
