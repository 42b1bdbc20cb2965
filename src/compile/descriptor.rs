/// JVM field and method descriptor parsing.

/// Represents a JVM type from a descriptor string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JvmType {
    Int,
    Long,
    Float,
    Double,
    Byte,
    Char,
    Short,
    Boolean,
    Void,
    Reference(String),
    Array(Box<JvmType>),
}

impl JvmType {
    /// Returns true if this type occupies two local-variable or stack slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, JvmType::Long | JvmType::Double)
    }

    /// Local-variable slots taken by a parameter of this type.
    pub fn slot_width(&self) -> u16 {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    /// Returns the Java source spelling of this type, for diagnostics.
    pub fn source_name(&self) -> String {
        match self {
            JvmType::Int => "int".into(),
            JvmType::Long => "long".into(),
            JvmType::Float => "float".into(),
            JvmType::Double => "double".into(),
            JvmType::Byte => "byte".into(),
            JvmType::Char => "char".into(),
            JvmType::Short => "short".into(),
            JvmType::Boolean => "boolean".into(),
            JvmType::Void => "void".into(),
            JvmType::Reference(name) => internal_to_source_name(name),
            JvmType::Array(inner) => format!("{}[]", inner.source_name()),
        }
    }
}

/// Parse a single type descriptor starting at position `pos` in `desc`.
/// Returns (JvmType, next_position).
pub fn parse_type_at(desc: &str, pos: usize) -> Option<(JvmType, usize)> {
    let bytes = desc.as_bytes();
    match *bytes.get(pos)? {
        b'B' => Some((JvmType::Byte, pos + 1)),
        b'C' => Some((JvmType::Char, pos + 1)),
        b'D' => Some((JvmType::Double, pos + 1)),
        b'F' => Some((JvmType::Float, pos + 1)),
        b'I' => Some((JvmType::Int, pos + 1)),
        b'J' => Some((JvmType::Long, pos + 1)),
        b'S' => Some((JvmType::Short, pos + 1)),
        b'Z' => Some((JvmType::Boolean, pos + 1)),
        b'V' => Some((JvmType::Void, pos + 1)),
        b'L' => {
            let semi = desc[pos + 1..].find(';')?;
            let class_name = &desc[pos + 1..pos + 1 + semi];
            if class_name.is_empty() {
                return None;
            }
            Some((JvmType::Reference(class_name.to_string()), pos + 1 + semi + 1))
        }
        b'[' => {
            let (inner, next) = parse_type_at(desc, pos + 1)?;
            if inner == JvmType::Void {
                return None;
            }
            Some((JvmType::Array(Box::new(inner)), next))
        }
        _ => None,
    }
}

/// Parse a method descriptor, e.g. "(II)V" -> ([Int, Int], Void)
pub fn parse_method_descriptor(desc: &str) -> Option<(Vec<JvmType>, JvmType)> {
    if !desc.starts_with('(') {
        return None;
    }
    let close = desc.find(')')?;
    let mut params = Vec::new();
    let mut pos = 1;
    while pos < close {
        let (ty, next) = parse_type_at(desc, pos)?;
        if ty == JvmType::Void {
            return None;
        }
        params.push(ty);
        pos = next;
    }
    let (ret, end) = parse_type_at(desc, close + 1)?;
    if end != desc.len() {
        return None;
    }
    Some((params, ret))
}

/// Convert internal class name to source name.
pub fn internal_to_source_name(name: &str) -> String {
    name.replace('/', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_descriptor() {
        let (params, ret) = parse_method_descriptor("(Ljava/lang/String;)Ljava/lang/String;").unwrap();
        assert_eq!(params, vec![JvmType::Reference("java/lang/String".into())]);
        assert_eq!(ret, JvmType::Reference("java/lang/String".into()));

        let (params, ret) = parse_method_descriptor("(IJ[B)V").unwrap();
        assert_eq!(
            params,
            vec![JvmType::Int, JvmType::Long, JvmType::Array(Box::new(JvmType::Byte))]
        );
        assert_eq!(ret, JvmType::Void);
    }

    #[test]
    fn test_rejects_malformed_descriptors() {
        assert_eq!(parse_method_descriptor("Ljava/lang/String;"), None);
        assert_eq!(parse_method_descriptor("(V)V"), None);
        assert_eq!(parse_method_descriptor("(I)"), None);
        assert_eq!(parse_method_descriptor("(I)VX"), None);
        assert_eq!(parse_method_descriptor("(L;)V"), None);
    }

    #[test]
    fn test_slot_widths() {
        assert_eq!(JvmType::Long.slot_width(), 2);
        assert_eq!(JvmType::Double.slot_width(), 2);
        assert_eq!(JvmType::Reference("java/lang/Object".into()).slot_width(), 1);
    }

    #[test]
    fn test_source_names() {
        assert_eq!(
            JvmType::Array(Box::new(JvmType::Reference("java/lang/String".into()))).source_name(),
            "java.lang.String[]"
        );
    }
}
