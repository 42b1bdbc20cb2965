//! Syntax tree for the statement forms a replacement body may contain.

#[derive(Clone, Debug, PartialEq)]
pub enum CExpr {
    StringLit(String),
    CharLit(u16),
    /// Magnitude as written; range is checked when folding so that
    /// `-2147483648` stays legal.
    IntLit(u64),
    LongLit(u64),
    FloatLit(f32),
    DoubleLit(f64),
    BoolLit(bool),
    Null,
    Neg(Box<CExpr>),
    Add(Box<CExpr>, Box<CExpr>),
    /// `new pkg.Type(args)`; `class` is the dotted name as written.
    New { class: String, args: Vec<CExpr> },
}

#[derive(Clone, Debug, PartialEq)]
pub enum CStmt {
    Return(Option<CExpr>),
    Throw(CExpr),
}
