use crate::code_attribute::Instruction;
use crate::constant_info::encode_modified_utf8;
use crate::ClassFile;

use super::ast::*;
use super::descriptor::{parse_method_descriptor, JvmType};
use super::fold::{fold, Constant};
use super::stack_calc::compute_max_stack;
use super::{CompileError, GeneratedCode, MethodContext};

/// Largest code array a method may carry.
const MAX_CODE_LENGTH: usize = 65535;

/// Reference types a `String` constant may be returned as.
const STRING_ASSIGNABLE: &[&str] = &[
    "java/lang/String",
    "java/lang/Object",
    "java/lang/CharSequence",
    "java/lang/Comparable",
    "java/io/Serializable",
];

pub struct CodeGenerator<'a> {
    class_file: &'a mut ClassFile,
    instructions: Vec<Instruction>,
    return_type: JvmType,
    max_locals: u16,
    /// Set once a `return` or `throw` has been emitted.
    terminated: bool,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(class_file: &'a mut ClassFile, method: &MethodContext) -> Result<Self, CompileError> {
        let (params, return_type) =
            parse_method_descriptor(&method.descriptor).ok_or_else(|| {
                CompileError::CodegenError {
                    message: format!("invalid method descriptor: {}", method.descriptor),
                }
            })?;

        let receiver = if method.is_static { 0 } else { 1 };
        let max_locals = params
            .iter()
            .fold(receiver, |slots: u16, p| slots.saturating_add(p.slot_width()));

        Ok(CodeGenerator {
            class_file,
            instructions: Vec::new(),
            return_type,
            max_locals,
            terminated: false,
        })
    }

    pub fn generate_body(&mut self, stmts: &[CStmt]) -> Result<(), CompileError> {
        for stmt in stmts {
            if self.terminated {
                return Err(type_error("unreachable statement"));
            }
            self.gen_stmt(stmt)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<GeneratedCode, CompileError> {
        if !self.terminated {
            if self.return_type != JvmType::Void {
                return Err(type_error("missing return statement"));
            }
            self.emit(Instruction::Return);
        }

        let code_length: usize = self.instructions.iter().map(Instruction::byte_size).sum();
        if code_length > MAX_CODE_LENGTH {
            return Err(CompileError::CodegenError {
                message: format!("code too large: {} bytes", code_length),
            });
        }

        let max_stack = compute_max_stack(&self.instructions, self.class_file);
        Ok(GeneratedCode {
            instructions: self.instructions,
            max_stack,
            max_locals: self.max_locals,
        })
    }

    fn emit(&mut self, instr: Instruction) {
        self.terminated = instr.is_terminal();
        self.instructions.push(instr);
    }

    fn gen_stmt(&mut self, stmt: &CStmt) -> Result<(), CompileError> {
        match stmt {
            CStmt::Return(None) => {
                if self.return_type != JvmType::Void {
                    return Err(type_error("missing return value"));
                }
                self.emit(Instruction::Return);
            }
            CStmt::Return(Some(expr)) => {
                if self.return_type == JvmType::Void {
                    return Err(type_error("incompatible types: unexpected return value"));
                }
                let value = fold(expr)?;
                let return_type = self.return_type.clone();
                let ret = self.gen_coerced(value, &return_type)?;
                self.emit(ret);
            }
            CStmt::Throw(expr) => self.gen_throw(expr)?,
        }
        Ok(())
    }

    /// `throw new X(msg?)`: new, dup, optional message, <init>, athrow.
    fn gen_throw(&mut self, expr: &CExpr) -> Result<(), CompileError> {
        let CExpr::New { class, args } = expr else {
            return Err(CompileError::CodegenError {
                message: "only 'throw new <Throwable>(...)' is supported".into(),
            });
        };

        let internal = resolve_class_name(class);
        let init_descriptor = match args.as_slice() {
            [] => "()V",
            [_] => "(Ljava/lang/String;)V",
            _ => {
                return Err(CompileError::CodegenError {
                    message: format!(
                        "constructor {} with {} arguments is not supported",
                        class,
                        args.len()
                    ),
                })
            }
        };

        let class_idx = self.class_file.get_or_add_class(&internal)?;
        self.emit(Instruction::New(class_idx));
        self.emit(Instruction::Dup);
        if let Some(message) = args.first() {
            match fold(message)? {
                Constant::Str(s) => self.emit_string(&s)?,
                Constant::Null => self.emit(Instruction::Aconstnull),
                other => {
                    return Err(type_error(format!(
                        "incompatible types: {} cannot be converted to String",
                        other.type_name()
                    )))
                }
            }
        }
        let init = self
            .class_file
            .get_or_add_method_ref(&internal, "<init>", init_descriptor)?;
        self.emit(Instruction::Invokespecial(init));
        self.emit(Instruction::Athrow);
        Ok(())
    }

    /// Push `value` converted to `target`, returning the matching return opcode.
    fn gen_coerced(
        &mut self,
        value: Constant,
        target: &JvmType,
    ) -> Result<Instruction, CompileError> {
        let mismatch = |value: &Constant| {
            type_error(format!(
                "incompatible types: {} cannot be converted to {}",
                value.type_name(),
                target.source_name()
            ))
        };

        match target {
            JvmType::Reference(name) => {
                match value {
                    Constant::Null => self.emit(Instruction::Aconstnull),
                    Constant::Str(ref s) if STRING_ASSIGNABLE.contains(&name.as_str()) => {
                        self.emit_string(s)?
                    }
                    other => return Err(mismatch(&other)),
                }
                Ok(Instruction::Areturn)
            }
            JvmType::Array(_) => match value {
                Constant::Null => {
                    self.emit(Instruction::Aconstnull);
                    Ok(Instruction::Areturn)
                }
                other => Err(mismatch(&other)),
            },
            JvmType::Boolean => match value {
                Constant::Bool(b) => {
                    self.emit_int(b as i32)?;
                    Ok(Instruction::Ireturn)
                }
                other => Err(mismatch(&other)),
            },
            JvmType::Int => match value {
                Constant::Int(v) => {
                    self.emit_int(v)?;
                    Ok(Instruction::Ireturn)
                }
                Constant::Char(c) => {
                    self.emit_int(c as i32)?;
                    Ok(Instruction::Ireturn)
                }
                other => Err(mismatch(&other)),
            },
            JvmType::Byte | JvmType::Short | JvmType::Char => {
                let (lo, hi) = match target {
                    JvmType::Byte => (i8::MIN as i32, i8::MAX as i32),
                    JvmType::Short => (i16::MIN as i32, i16::MAX as i32),
                    _ => (0, u16::MAX as i32),
                };
                let v = match value {
                    Constant::Int(v) => v,
                    Constant::Char(c) => c as i32,
                    ref other => return Err(mismatch(other)),
                };
                if v < lo || v > hi {
                    return Err(type_error(format!(
                        "incompatible types: possible lossy conversion from int to {}",
                        target.source_name()
                    )));
                }
                self.emit_int(v)?;
                Ok(Instruction::Ireturn)
            }
            JvmType::Long => {
                let v = match value {
                    Constant::Int(v) => v as i64,
                    Constant::Char(c) => c as i64,
                    Constant::Long(v) => v,
                    other => return Err(mismatch(&other)),
                };
                self.emit_long(v)?;
                Ok(Instruction::Lreturn)
            }
            JvmType::Float => {
                let v = match value {
                    Constant::Int(v) => v as f32,
                    Constant::Char(c) => c as f32,
                    Constant::Long(v) => v as f32,
                    Constant::Float(v) => v,
                    other => return Err(mismatch(&other)),
                };
                self.emit_float(v)?;
                Ok(Instruction::Freturn)
            }
            JvmType::Double => {
                let v = match value {
                    Constant::Int(v) => v as f64,
                    Constant::Char(c) => c as f64,
                    Constant::Long(v) => v as f64,
                    Constant::Float(v) => v as f64,
                    Constant::Double(v) => v,
                    other => return Err(mismatch(&other)),
                };
                self.emit_double(v)?;
                Ok(Instruction::Dreturn)
            }
            JvmType::Void => Err(type_error("incompatible types: unexpected return value")),
        }
    }

    // --- Instruction emission helpers ---

    fn emit_int(&mut self, value: i32) -> Result<(), CompileError> {
        match value {
            -1 => self.emit(Instruction::Iconstm1),
            0 => self.emit(Instruction::Iconst0),
            1 => self.emit(Instruction::Iconst1),
            2 => self.emit(Instruction::Iconst2),
            3 => self.emit(Instruction::Iconst3),
            4 => self.emit(Instruction::Iconst4),
            5 => self.emit(Instruction::Iconst5),
            v if i8::try_from(v).is_ok() => self.emit(Instruction::Bipush(v as i8)),
            v if i16::try_from(v).is_ok() => self.emit(Instruction::Sipush(v as i16)),
            v => {
                let cp_idx = self.class_file.get_or_add_integer(v)?;
                self.emit_ldc(cp_idx);
            }
        }
        Ok(())
    }

    fn emit_long(&mut self, value: i64) -> Result<(), CompileError> {
        match value {
            0 => self.emit(Instruction::Lconst0),
            1 => self.emit(Instruction::Lconst1),
            _ => {
                let cp_idx = self.class_file.get_or_add_long(value)?;
                self.emit(Instruction::Ldc2W(cp_idx));
            }
        }
        Ok(())
    }

    fn emit_float(&mut self, value: f32) -> Result<(), CompileError> {
        // Bit comparison keeps -0.0 out of fconst_0.
        if value.to_bits() == 0.0f32.to_bits() {
            self.emit(Instruction::Fconst0);
        } else if value == 1.0 {
            self.emit(Instruction::Fconst1);
        } else if value == 2.0 {
            self.emit(Instruction::Fconst2);
        } else {
            let cp_idx = self.class_file.get_or_add_float(value)?;
            self.emit_ldc(cp_idx);
        }
        Ok(())
    }

    fn emit_double(&mut self, value: f64) -> Result<(), CompileError> {
        if value.to_bits() == 0.0f64.to_bits() {
            self.emit(Instruction::Dconst0);
        } else if value == 1.0 {
            self.emit(Instruction::Dconst1);
        } else {
            let cp_idx = self.class_file.get_or_add_double(value)?;
            self.emit(Instruction::Ldc2W(cp_idx));
        }
        Ok(())
    }

    fn emit_string(&mut self, value: &str) -> Result<(), CompileError> {
        if encode_modified_utf8(value).len() > u16::MAX as usize {
            return Err(CompileError::CodegenError {
                message: "constant string too long".into(),
            });
        }
        let cp_idx = self.class_file.get_or_add_string(value)?;
        self.emit_ldc(cp_idx);
        Ok(())
    }

    fn emit_ldc(&mut self, cp_idx: u16) {
        if cp_idx <= 255 {
            self.emit(Instruction::Ldc(cp_idx as u8));
        } else {
            self.emit(Instruction::LdcW(cp_idx));
        }
    }
}

/// Resolve a simple or dotted class name to JVM internal form. Simple names
/// are taken to live in `java.lang`.
pub fn resolve_class_name(name: &str) -> String {
    if name.contains('.') {
        name.replace('.', "/")
    } else {
        format!("java/lang/{}", name)
    }
}

fn type_error(message: impl Into<String>) -> CompileError {
    CompileError::TypeError {
        message: message.into(),
    }
}
