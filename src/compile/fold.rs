//! Compile-time evaluation of replacement-body expressions.
//!
//! Every expression a stub may contain is a constant expression, so the
//! whole tree collapses to a single [`Constant`] before any code is emitted.

use super::ast::CExpr;
use super::CompileError;

const INT_MIN_MAGNITUDE: u64 = 1 << 31;
const LONG_MIN_MAGNITUDE: u64 = 1 << 63;

#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Str(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Char(u16),
    Null,
}

impl Constant {
    /// Java spelling of the constant's static type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::Str(_) => "String",
            Constant::Int(_) => "int",
            Constant::Long(_) => "long",
            Constant::Float(_) => "float",
            Constant::Double(_) => "double",
            Constant::Bool(_) => "boolean",
            Constant::Char(_) => "char",
            Constant::Null => "<null>",
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self,
            Constant::Int(_)
                | Constant::Long(_)
                | Constant::Float(_)
                | Constant::Double(_)
                | Constant::Char(_)
        )
    }

    /// String conversion as performed by `+` concatenation.
    fn to_java_string(&self) -> Result<String, CompileError> {
        match self {
            Constant::Str(s) => Ok(s.clone()),
            Constant::Int(v) => Ok(v.to_string()),
            Constant::Long(v) => Ok(v.to_string()),
            Constant::Bool(b) => Ok(b.to_string()),
            Constant::Char(c) => Ok(String::from_utf16_lossy(&[*c])),
            Constant::Null => Ok("null".into()),
            // Java's shortest-repr float formatting differs from Rust's in
            // exponent notation, so these are refused rather than guessed.
            Constant::Float(_) | Constant::Double(_) => Err(CompileError::CodegenError {
                message: format!(
                    "concatenating a {} constant with a String is not supported",
                    self.type_name()
                ),
            }),
        }
    }
}

/// Reduce an expression to the constant it denotes.
pub fn fold(expr: &CExpr) -> Result<Constant, CompileError> {
    match expr {
        CExpr::StringLit(s) => Ok(Constant::Str(s.clone())),
        CExpr::CharLit(c) => Ok(Constant::Char(*c)),
        CExpr::IntLit(v) => i32::try_from(*v)
            .map(Constant::Int)
            .map_err(|_| type_error(format!("integer number too large: {}", v))),
        CExpr::LongLit(v) => i64::try_from(*v)
            .map(Constant::Long)
            .map_err(|_| type_error(format!("long number too large: {}", v))),
        CExpr::FloatLit(v) => Ok(Constant::Float(*v)),
        CExpr::DoubleLit(v) => Ok(Constant::Double(*v)),
        CExpr::BoolLit(b) => Ok(Constant::Bool(*b)),
        CExpr::Null => Ok(Constant::Null),
        CExpr::Neg(inner) => fold_neg(inner),
        CExpr::Add(lhs, rhs) => fold_add(fold(lhs)?, fold(rhs)?),
        CExpr::New { class, .. } => Err(CompileError::CodegenError {
            message: format!(
                "'new {}(...)' is only supported as the operand of throw",
                class
            ),
        }),
    }
}

fn fold_neg(inner: &CExpr) -> Result<Constant, CompileError> {
    // The literal magnitudes of MIN_VALUE are only legal directly under '-'.
    match inner {
        CExpr::IntLit(INT_MIN_MAGNITUDE) => return Ok(Constant::Int(i32::MIN)),
        CExpr::LongLit(LONG_MIN_MAGNITUDE) => return Ok(Constant::Long(i64::MIN)),
        _ => {}
    }
    match fold(inner)? {
        Constant::Int(v) => Ok(Constant::Int(v.wrapping_neg())),
        Constant::Char(c) => Ok(Constant::Int(-(c as i32))),
        Constant::Long(v) => Ok(Constant::Long(v.wrapping_neg())),
        Constant::Float(v) => Ok(Constant::Float(-v)),
        Constant::Double(v) => Ok(Constant::Double(-v)),
        other => Err(type_error(format!(
            "bad operand type {} for unary operator '-'",
            other.type_name()
        ))),
    }
}

fn fold_add(lhs: Constant, rhs: Constant) -> Result<Constant, CompileError> {
    if matches!(lhs, Constant::Str(_)) || matches!(rhs, Constant::Str(_)) {
        let mut joined = lhs.to_java_string()?;
        joined.push_str(&rhs.to_java_string()?);
        return Ok(Constant::Str(joined));
    }
    if !lhs.is_numeric() || !rhs.is_numeric() {
        return Err(type_error(format!(
            "bad operand types for binary operator '+': {} and {}",
            lhs.type_name(),
            rhs.type_name()
        )));
    }

    // Binary numeric promotion.
    let result = match (lhs, rhs) {
        (a @ Constant::Double(_), b) | (b, a @ Constant::Double(_)) => {
            Constant::Double(as_f64(&a) + as_f64(&b))
        }
        (a @ Constant::Float(_), b) | (b, a @ Constant::Float(_)) => {
            Constant::Float(as_f32(&a) + as_f32(&b))
        }
        (a @ Constant::Long(_), b) | (b, a @ Constant::Long(_)) => {
            Constant::Long(as_i64(&a).wrapping_add(as_i64(&b)))
        }
        (a, b) => Constant::Int((as_i64(&a) as i32).wrapping_add(as_i64(&b) as i32)),
    };
    Ok(result)
}

fn as_i64(c: &Constant) -> i64 {
    match c {
        Constant::Int(v) => *v as i64,
        Constant::Char(v) => *v as i64,
        Constant::Long(v) => *v,
        Constant::Float(v) => *v as i64,
        Constant::Double(v) => *v as i64,
        _ => 0,
    }
}

fn as_f32(c: &Constant) -> f32 {
    match c {
        Constant::Float(v) => *v,
        Constant::Double(v) => *v as f32,
        other => as_i64(other) as f32,
    }
}

fn as_f64(c: &Constant) -> f64 {
    match c {
        Constant::Double(v) => *v,
        Constant::Float(v) => *v as f64,
        other => as_i64(other) as f64,
    }
}

fn type_error(message: String) -> CompileError {
    CompileError::TypeError { message }
}
