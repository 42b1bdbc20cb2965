pub mod ast;
pub mod codegen;
pub mod descriptor;
pub mod fold;
pub mod lexer;
pub mod parser;
pub mod stack_calc;

use crate::code_attribute::{encode_instructions, Instruction};
use crate::{ClassFile, ConstantPoolFull};

use self::ast::CStmt;
use self::codegen::CodeGenerator;
use self::lexer::Lexer;
use self::parser::Parser;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("parse error at {line}:{column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("type error: {message}")]
    TypeError { message: String },
    #[error("codegen error: {message}")]
    CodegenError { message: String },
}

impl From<ConstantPoolFull> for CompileError {
    fn from(err: ConstantPoolFull) -> Self {
        CompileError::CodegenError {
            message: err.to_string(),
        }
    }
}

/// The method whose body is being generated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodContext {
    pub name: String,
    pub descriptor: String,
    pub is_static: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedCode {
    pub instructions: Vec<Instruction>,
    pub max_stack: u16,
    pub max_locals: u16,
}

impl GeneratedCode {
    /// The encoded code array.
    pub fn code_bytes(&self) -> Result<Vec<u8>, CompileError> {
        encode_instructions(&self.instructions).map_err(|e| CompileError::CodegenError {
            message: e.to_string(),
        })
    }
}

/// Turns replacement source text into bytecode for one method.
///
/// Implementations may append constants to `class_file`'s pool but must not
/// otherwise modify it.
pub trait BodyCompiler: Send + Sync {
    fn compile(
        &self,
        class_file: &mut ClassFile,
        method: &MethodContext,
        source: &str,
    ) -> Result<GeneratedCode, CompileError>;
}

/// Compiles the inert `return`/`throw` bodies used as patch stubs.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubCompiler;

impl BodyCompiler for StubCompiler {
    fn compile(
        &self,
        class_file: &mut ClassFile,
        method: &MethodContext,
        source: &str,
    ) -> Result<GeneratedCode, CompileError> {
        let stmts = parse_method_body(source)?;
        generate_bytecode(&stmts, class_file, method)
    }
}

/// Parse a Java method body into AST statements.
pub fn parse_method_body(source: &str) -> Result<Vec<CStmt>, CompileError> {
    let lexer = Lexer::new(source);
    let tokens = lexer.tokenize()?;
    let mut parser = Parser::new(tokens);
    parser.parse_method_body()
}

/// Generate bytecode from AST statements.
pub fn generate_bytecode(
    stmts: &[CStmt],
    class_file: &mut ClassFile,
    method: &MethodContext,
) -> Result<GeneratedCode, CompileError> {
    let mut codegen = CodeGenerator::new(class_file, method)?;
    codegen.generate_body(stmts)?;
    codegen.finish()
}
