//! Replacing one method body inside a compiled class.

use tracing::debug;

use crate::attribute_info::{AttributeInfo, CodeAttribute, OFFSET_BEARING_CODE_ATTRIBUTES};
use crate::compile::{BodyCompiler, CompileError, MethodContext};
use crate::method_info::MethodAccessFlags;
use crate::ClassFile;

#[derive(Debug, thiserror::Error)]
pub enum ClassPatchError {
    #[error("malformed class file: {0}")]
    Malformed(String),
    #[error("method {name}{descriptor} not found")]
    MethodNotFound { name: String, descriptor: String },
    #[error(transparent)]
    CompileFailed(#[from] CompileError),
}

impl From<binrw::Error> for ClassPatchError {
    fn from(e: binrw::Error) -> Self {
        ClassPatchError::Malformed(e.to_string())
    }
}

/// Compile `source` and install it as the body of the method matching
/// `method_name` and `method_signature` exactly, returning the new class bytes.
///
/// Every other method, field and attribute is carried over unchanged. New
/// constants are appended to the pool; identical existing ones are reused.
pub fn patch_class(
    class_bytes: &[u8],
    method_name: &str,
    method_signature: &str,
    source: &str,
    compiler: &dyn BodyCompiler,
) -> Result<Vec<u8>, ClassPatchError> {
    let mut class_file = ClassFile::from_bytes(class_bytes)?;

    let method_idx = class_file
        .find_method(method_name, method_signature)
        .ok_or_else(|| ClassPatchError::MethodNotFound {
            name: method_name.to_string(),
            descriptor: method_signature.to_string(),
        })?;

    let is_static = class_file.methods[method_idx]
        .access_flags
        .contains(MethodAccessFlags::STATIC);
    let context = MethodContext {
        name: method_name.to_string(),
        descriptor: method_signature.to_string(),
        is_static,
    };

    let generated = compiler.compile(&mut class_file, &context, source)?;
    let code = generated.code_bytes()?;
    let code_name_idx = class_file.get_or_add_utf8("Code").map_err(CompileError::from)?;

    // Find or create the Code attribute
    let code_attr_idx = class_file.methods[method_idx]
        .attributes
        .iter()
        .position(|a| class_file.attribute_name(a).as_deref() == Some("Code"));

    let code_attr = match code_attr_idx {
        Some(attr_idx) => {
            let mut existing =
                CodeAttribute::from_info(&class_file.methods[method_idx].attributes[attr_idx].info)?;
            existing.max_stack = generated.max_stack;
            existing.max_locals = generated.max_locals;
            existing.code = code;
            existing.exception_table.clear();
            // Sub-attributes that index into the old bytecode cannot be kept
            existing.attributes.retain(|a| {
                class_file
                    .attribute_name(a)
                    .map_or(true, |name| !OFFSET_BEARING_CODE_ATTRIBUTES.contains(&name.as_ref()))
            });
            debug!(
                method = method_name,
                kept_attributes = existing.attributes.len(),
                "replacing existing Code attribute"
            );
            existing
        }
        None => {
            debug!(method = method_name, "method had no body, adding Code attribute");
            CodeAttribute::new(generated.max_stack, generated.max_locals, code)
        }
    };

    let info = code_attr.to_info()?;
    let method = &mut class_file.methods[method_idx];
    match code_attr_idx {
        Some(attr_idx) => method.attributes[attr_idx] = AttributeInfo::new(code_name_idx, info),
        None => {
            method.access_flags.remove(MethodAccessFlags::ABSTRACT | MethodAccessFlags::NATIVE);
            method.attributes.push(AttributeInfo::new(code_name_idx, info));
        }
    }

    class_file.sync_counts();
    Ok(class_file.to_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_attribute::{decode_instructions, Instruction};
    use crate::compile::StubCompiler;
    use crate::method_info::MethodInfo;

    const LOOKUP: &str = "(Ljava/lang/String;)Ljava/lang/String;";

    fn abstract_class() -> Vec<u8> {
        let mut cf = ClassFile::new("demo/Lookup", "java/lang/Object").unwrap();
        let name_index = cf.get_or_add_utf8("lookup").unwrap();
        let descriptor_index = cf.get_or_add_utf8(LOOKUP).unwrap();
        cf.methods.push(MethodInfo {
            access_flags: MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
            name_index,
            descriptor_index,
            attributes_count: 0,
            attributes: Vec::new(),
        });
        cf.sync_counts();
        cf.to_bytes().unwrap()
    }

    #[test]
    fn abstract_method_gains_a_body() {
        let patched = patch_class(
            &abstract_class(),
            "lookup",
            LOOKUP,
            r#"return "stub";"#,
            &StubCompiler,
        )
        .unwrap();

        let cf = ClassFile::from_bytes(&patched).unwrap();
        let method = &cf.methods[0];
        assert!(!method.access_flags.contains(MethodAccessFlags::ABSTRACT));
        assert_eq!(method.attributes.len(), 1);
        assert_eq!(cf.attribute_name(&method.attributes[0]).as_deref(), Some("Code"));

        let code = CodeAttribute::from_info(&method.attributes[0].info).unwrap();
        let instructions = decode_instructions(&code.code).unwrap();
        assert_eq!(instructions.last(), Some(&Instruction::Areturn));
        assert_eq!(code.max_locals, 2);
    }

    #[test]
    fn descriptor_must_match_exactly() {
        let err = patch_class(
            &abstract_class(),
            "lookup",
            "(Ljava/lang/Object;)Ljava/lang/String;",
            r#"return "stub";"#,
            &StubCompiler,
        )
        .unwrap_err();
        assert!(matches!(err, ClassPatchError::MethodNotFound { .. }));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = patch_class(b"not a class", "lookup", LOOKUP, "return null;", &StubCompiler)
            .unwrap_err();
        assert!(matches!(err, ClassPatchError::Malformed(_)));
    }

    #[test]
    fn compile_errors_surface() {
        let err =
            patch_class(&abstract_class(), "lookup", LOOKUP, "return 1;", &StubCompiler).unwrap_err();
        assert!(matches!(err, ClassPatchError::CompileFailed(CompileError::TypeError { .. })));
    }
}
