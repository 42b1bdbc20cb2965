mod common;

use lookup_patch::class_patch::{patch_class, ClassPatchError};
use lookup_patch::compile::{
    BodyCompiler, CompileError, GeneratedCode, MethodContext, StubCompiler,
};
use lookup_patch::target::{resolve_mode, PatchTarget};
use lookup_patch::ClassFile;

use common::*;

fn script_target() -> PatchTarget {
    resolve_mode(0).unwrap().remove(0)
}

fn patch(bytes: &[u8], target: &PatchTarget) -> Result<Vec<u8>, ClassPatchError> {
    patch_class(
        bytes,
        &target.method_name,
        &target.method_signature,
        &target.replacement_source,
        &StubCompiler,
    )
}

#[test]
fn test_lookup_returns_the_stub() {
    let target = script_target();
    let patched = patch(&lookup_class_bytes(SCRIPT), &target).unwrap();
    let cf = ClassFile::from_bytes(&patched).unwrap();

    let value = returned_string(&cf, "lookup", LOOKUP_DESCRIPTOR);
    assert_eq!(
        value,
        "org/apache/commons/text/lookup/ScriptStringLookup.lookup method called; \
         this overrides the output <patch Text4Shell>"
    );
    assert!(value.contains("ScriptStringLookup"));
    assert!(value.contains("lookup"));

    let code = method_code(&cf, "lookup", LOOKUP_DESCRIPTOR);
    assert_eq!(code.max_stack, 1);
    assert_eq!(code.max_locals, 2);
    assert!(code.exception_table.is_empty());
    // The old LineNumberTable pointed into the replaced bytecode.
    assert!(code.attributes.is_empty());
}

#[test]
fn test_everything_else_is_untouched() {
    let original_bytes = lookup_class_bytes(SCRIPT);
    let original = ClassFile::from_bytes(&original_bytes).unwrap();
    let patched = ClassFile::from_bytes(&patch(&original_bytes, &script_target()).unwrap()).unwrap();

    assert_eq!(patched.methods.len(), original.methods.len());
    for (idx, (before, after)) in original.methods.iter().zip(&patched.methods).enumerate() {
        if idx == 1 {
            assert_eq!(before.name_index, after.name_index);
            assert_eq!(before.descriptor_index, after.descriptor_index);
            assert_eq!(before.access_flags, after.access_flags);
            continue;
        }
        assert_eq!(before, after, "method {idx} changed");
    }
    assert_eq!(patched.fields, original.fields);
    assert_eq!(patched.attributes, original.attributes);
    assert_eq!(patched.this_class, original.this_class);
    assert_eq!(patched.super_class, original.super_class);

    // The pool only grows; every existing index still means the same thing.
    assert!(patched.const_pool.len() >= original.const_pool.len());
    for idx in 1..=original.const_pool.len() as u16 {
        assert_eq!(
            format!("{:?}", original.constant(idx)),
            format!("{:?}", patched.constant(idx))
        );
    }
}

#[test]
fn test_repatching_is_byte_identical() {
    let target = script_target();
    let once = patch(&lookup_class_bytes(SCRIPT), &target).unwrap();
    let twice = patch(&once, &target).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_signature_mismatch_is_method_not_found() {
    let err = patch(&wrong_signature_class_bytes(SCRIPT), &script_target()).unwrap_err();
    match err {
        ClassPatchError::MethodNotFound { name, descriptor } => {
            assert_eq!(name, "lookup");
            assert_eq!(descriptor, LOOKUP_DESCRIPTOR);
        }
        other => panic!("expected MethodNotFound, got {other:?}"),
    }
}

#[test]
fn test_compile_failure_is_reported() {
    let err = patch_class(
        &lookup_class_bytes(SCRIPT),
        "lookup",
        LOOKUP_DESCRIPTOR,
        "return 42;",
        &StubCompiler,
    )
    .unwrap_err();
    assert!(matches!(err, ClassPatchError::CompileFailed(CompileError::TypeError { .. })));
    assert!(err.to_string().contains("incompatible types"));
}

/// A compiler that always refuses, to check the patcher relies only on the trait.
struct Refusing;

impl BodyCompiler for Refusing {
    fn compile(
        &self,
        _class_file: &mut ClassFile,
        method: &MethodContext,
        _source: &str,
    ) -> Result<GeneratedCode, CompileError> {
        Err(CompileError::CodegenError {
            message: format!("refusing {}", method.name),
        })
    }
}

#[test]
fn test_injected_compiler() {
    let err = patch_class(
        &lookup_class_bytes(SCRIPT),
        "lookup",
        LOOKUP_DESCRIPTOR,
        "anything",
        &Refusing,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "codegen error: refusing lookup");
}
