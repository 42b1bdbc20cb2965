use crate::code_attribute::Instruction;
use crate::constant_info::ConstantInfo;
use crate::ClassFile;

use super::descriptor::parse_method_descriptor;

/// Compute max_stack by walking instructions and tracking stack depth.
///
/// Generated bodies are straight-line, so the linear walk is exact.
pub fn compute_max_stack(instructions: &[Instruction], class_file: &ClassFile) -> u16 {
    let mut depth: i32 = 0;
    let mut max_depth: i32 = 0;

    for instr in instructions {
        depth += stack_delta(instr, class_file);
        if depth > max_depth {
            max_depth = depth;
        }
        if depth < 0 {
            depth = 0;
        }
    }

    max_depth as u16
}

/// Returns the net stack depth change for an instruction.
fn stack_delta(instr: &Instruction, class_file: &ClassFile) -> i32 {
    match instr {
        // Constants: push 1
        Instruction::Aconstnull
        | Instruction::Iconstm1
        | Instruction::Iconst0
        | Instruction::Iconst1
        | Instruction::Iconst2
        | Instruction::Iconst3
        | Instruction::Iconst4
        | Instruction::Iconst5
        | Instruction::Fconst0
        | Instruction::Fconst1
        | Instruction::Fconst2
        | Instruction::Bipush(_)
        | Instruction::Sipush(_)
        | Instruction::Ldc(_)
        | Instruction::LdcW(_)
        | Instruction::Aload0
        | Instruction::Aload1
        | Instruction::New(_)
        | Instruction::Dup => 1,

        // Long/Double constants take two slots
        Instruction::Lconst0
        | Instruction::Lconst1
        | Instruction::Dconst0
        | Instruction::Dconst1
        | Instruction::Ldc2W(_) => 2,

        Instruction::Ireturn | Instruction::Freturn | Instruction::Areturn | Instruction::Athrow => -1,
        Instruction::Lreturn | Instruction::Dreturn => -2,

        Instruction::Invokespecial(index) => invoke_delta(class_file, *index),

        Instruction::Nop | Instruction::Return => 0,
    }
}

/// Receiver and arguments are popped, the return value (if any) pushed.
fn invoke_delta(class_file: &ClassFile, method_ref: u16) -> i32 {
    let descriptor = match class_file.constant(method_ref) {
        Some(ConstantInfo::MethodRef(m)) => match class_file.constant(m.name_and_type_index) {
            Some(ConstantInfo::NameAndType(nt)) => class_file.get_utf8(nt.descriptor_index),
            _ => None,
        },
        _ => None,
    };
    let Some((params, ret)) = descriptor.as_deref().and_then(parse_method_descriptor) else {
        return -1;
    };
    let popped: i32 = 1 + params.iter().map(|p| p.slot_width() as i32).sum::<i32>();
    let pushed = match ret {
        super::descriptor::JvmType::Void => 0,
        other => other.slot_width() as i32,
    };
    pushed - popped
}
