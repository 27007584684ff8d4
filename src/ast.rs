// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Data types to represent a parsed S840D part program.
//!
//! Each block corresponds to one source line.  The `Display` impls
//! reconstruct a normalized form of the source, cleaned of comments and
//! surplus whitespace.

use std::fmt::{self, Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumString};

use crate::value::{Value, ValueType};

/// A whole part program, consisting of blocks.  Each block corresponds to a
/// line in the source code.
#[derive(Debug, Default)]
pub struct Program {
    pub blocks: Vec<Block>,
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for block in &self.blocks {
            writeln!(f, "{}", block)?;
        }
        Ok(())
    }
}

/// A parsed block (source line).
#[derive(Debug, Default, PartialEq)]
pub struct Block {
    /// Content nodes in source order.
    pub content: Vec<BlockContent>,
    /// Optional `N123` / `:123` block number.
    pub number: Option<BlockNumber>,
    /// Optional `name:` jump label.
    pub label: Option<String>,
    /// Skip level for data blocks, nesting depth for control blocks.
    pub level: BlockLevel,
}

/// Per-block level information.  A block is either a data block (optionally
/// carrying a `/n` skip level) or a control-structure block carrying its
/// nesting depth; it is never both (alarm 12630).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLevel {
    Data { skip: Option<u8> },
    Control { nesting: i32 },
}

impl Default for BlockLevel {
    fn default() -> Self {
        BlockLevel::Data { skip: None }
    }
}

/// A block number: `N123` (regular) or `:123` (main).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNumber {
    pub digits: String,
    pub kind: BlockNumberKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockNumberKind {
    Regular,
    Main,
}

/// Per-address coordinate override, e.g. `X=AC(10)`.  Only `IC` makes an
/// address incremental; every other override is absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum CoordType {
    Ac,
    Ic,
    Dc,
    Acn,
    Acp,
}

/// One content node of a block.
#[derive(Debug, PartialEq)]
pub enum BlockContent {
    /// `X10`, `F=100`, `CR=5.5`, `X=AC(10)` ...
    Address(AddressAssign),
    /// `G[8]=57`, `M[2]=6` ...
    ExtAddress(ExtAddressAssign),
    /// `R1=5`, `VAR=1+2`, `ARR[1,2]=0` ...
    Assign(LValueAssign),
    /// A named G command like `TRANS` or `CIP`.
    GCommand(GCommand),
    Goto(GotoStmt),
    CondGoto(CondGoto),
    For(ForStmt),
    EndFor,
    If(IfStmt),
    Else,
    EndIf,
    Def(DefStmt),
}

/// Assignment of a value to an address letter (plus optional axis extension,
/// which is folded into the address string, e.g. `X1`).
#[derive(Debug, PartialEq)]
pub struct AddressAssign {
    pub address: String,
    pub expr: Expr,
    pub coord_type: Option<CoordType>,
}

/// Assignment through a bracketed address extension, e.g. `G[8]=57`.
#[derive(Debug, PartialEq)]
pub struct ExtAddressAssign {
    pub address: String,
    pub ext: Expr,
    pub expr: Expr,
}

/// Assignment to a variable or array element.
#[derive(Debug, PartialEq)]
pub struct LValueAssign {
    pub lvalue: LValue,
    pub expr: Expr,
}

#[derive(Debug, PartialEq)]
pub enum LValue {
    Var(String),
    Array(String, Vec<Expr>),
}

/// Named G commands.  Each writes a designated modal group when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum GCommand {
    Trans,
    Atrans,
    Rot,
    Arot,
    Scale,
    Ascale,
    Mirror,
    Amirror,
    Rots,
    Arots,
    Cip,
    Aspline,
    Bspline,
    Cspline,
    Ct,
    Poly,
    Invcw,
    Invccw,
    Startfifo,
    Stopfifo,
    Fifoctrl,
    Supa,
    Cfc,
    Cftcp,
    Cfin,
    Norm,
    Kont,
    Kontt,
    Kontc,
    Ffwof,
    Ffwon,
    Diamof,
    Diamon,
    Diam90,
    Diamcycof,
    Fnorm,
    Flin,
    Fcub,
}

/// The four jump statement flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum GotoKind {
    /// Forward, then backward search.
    Goto,
    /// Backward search only.
    Gotob,
    /// Forward search only.
    Gotof,
    /// Like `GOTO`, but a missing target is not an alarm.
    Gotoc,
}

#[derive(Debug, PartialEq)]
pub struct GotoStmt {
    pub kind: GotoKind,
    pub target: Expr,
}

/// An `IF cond GOTOx target` chain.  Conditions are tried in order; the
/// first true one jumps.
#[derive(Debug, PartialEq)]
pub struct CondGoto {
    pub branches: Vec<(Expr, GotoStmt)>,
}

/// `FOR R1=1 TO 10` — initializer plus inclusive upper bound.
#[derive(Debug, PartialEq)]
pub struct ForStmt {
    pub init: LValueAssign,
    pub to: Expr,
}

#[derive(Debug, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
}

/// `DEF INT A, B=2, ARR[3,4]`.
#[derive(Debug, PartialEq)]
pub struct DefStmt {
    pub var_type: ValueType,
    pub scalars: Vec<ScalarDef>,
    pub arrays: Vec<ArrayDef>,
}

#[derive(Debug, PartialEq)]
pub struct ScalarDef {
    pub name: String,
    pub init: Option<Value>,
}

#[derive(Debug, PartialEq)]
pub struct ArrayDef {
    pub name: String,
    pub dims: Vec<i32>,
}

/// An S840D expression.
#[derive(Debug, PartialEq)]
pub enum Expr {
    /// A literal value.
    Lit(Value),
    /// A scalar variable reference.
    Var(String),
    /// An array element reference with 1 to 3 index expressions.
    Index(String, Vec<Expr>),
    /// A unary operator.
    Unary(UnOp, Box<Expr>),
    /// A binary operator.
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// A one-argument arithmetic function.
    Func1(Func1, Box<Expr>),
    /// A two-argument arithmetic function.
    Func2(Func2, Box<Expr>, Box<Expr>),
}

/// Binary operators, in S840D notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    /// `/` — always floating.
    Div,
    /// `DIV` — truncating.
    IntDiv,
    Mod,
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Minus,
    Not,
    BitNot,
}

/// One-argument arithmetic functions.  Trigonometry works in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Func1 {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Sqrt,
    Abs,
    Pot,
    Trunc,
    Round,
    Ln,
    Exp,
}

/// Two-argument arithmetic functions.  `ATAN2` yields degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Func2 {
    Atan2,
    Minval,
    Maxval,
}

fn wrap_op(f: &mut Formatter, ex: &Expr) -> fmt::Result {
    if let Expr::Binary(..) = ex {
        write!(f, "({})", ex)
    } else {
        Display::fmt(ex, f)
    }
}

fn fmt_indices(f: &mut Formatter, name: &str, indices: &[Expr]) -> fmt::Result {
    write!(f, "{}[", name)?;
    for (i, index) in indices.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        Display::fmt(index, f)?;
    }
    f.write_str("]")
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let mut space = "";
        if let BlockLevel::Data { skip: Some(n) } = self.level {
            write!(f, "/{}", n)?;
            space = " ";
        }
        if let Some(num) = &self.number {
            write!(f, "{}{}", space, num)?;
            space = " ";
        }
        if let Some(label) = &self.label {
            write!(f, "{}{}:", space, label)?;
            space = " ";
        }
        for content in &self.content {
            write!(f, "{}{}", space, content)?;
            space = " ";
        }
        Ok(())
    }
}

impl Display for BlockNumber {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.kind {
            BlockNumberKind::Regular => write!(f, "N{}", self.digits),
            BlockNumberKind::Main => write!(f, ":{}", self.digits),
        }
    }
}

impl Display for BlockContent {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            BlockContent::Address(a) => Display::fmt(a, f),
            BlockContent::ExtAddress(a) => write!(f, "{}[{}]={}", a.address, a.ext, a.expr),
            BlockContent::Assign(a) => Display::fmt(a, f),
            BlockContent::GCommand(c) => Display::fmt(c, f),
            BlockContent::Goto(g) => Display::fmt(g, f),
            BlockContent::CondGoto(c) => {
                let mut space = "";
                for (cond, goto) in &c.branches {
                    write!(f, "{}IF {} {}", space, cond, goto)?;
                    space = " ";
                }
                Ok(())
            }
            BlockContent::For(s) => write!(f, "FOR {} TO {}", s.init, s.to),
            BlockContent::EndFor => f.write_str("ENDFOR"),
            BlockContent::If(s) => write!(f, "IF {}", s.condition),
            BlockContent::Else => f.write_str("ELSE"),
            BlockContent::EndIf => f.write_str("ENDIF"),
            BlockContent::Def(d) => Display::fmt(d, f),
        }
    }
}

impl Display for AddressAssign {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match (&self.coord_type, &self.expr) {
            (Some(ct), ex) => write!(f, "{}={}({})", self.address, ct, ex),
            (None, Expr::Lit(v @ (Value::Int(_) | Value::Real(_)))) => {
                write!(f, "{}{}", self.address, v)
            }
            (None, ex) => write!(f, "{}={}", self.address, ex),
        }
    }
}

impl Display for LValueAssign {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}={}", self.lvalue, self.expr)
    }
}

impl Display for LValue {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            LValue::Var(name) => f.write_str(name),
            LValue::Array(name, indices) => fmt_indices(f, name, indices),
        }
    }
}

impl Display for GotoStmt {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        // Jump targets are stored as strings but written bare in source.
        match &self.target {
            Expr::Lit(Value::Str(s)) => write!(f, "{} {}", self.kind, s),
            target => write!(f, "{} {}", self.kind, target),
        }
    }
}

impl Display for DefStmt {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "DEF {}", self.var_type)?;
        let mut sep = " ";
        for def in &self.scalars {
            match &def.init {
                Some(v) => write!(f, "{}{}={}", sep, def.name, v)?,
                None => write!(f, "{}{}", sep, def.name)?,
            }
            sep = ", ";
        }
        for def in &self.arrays {
            write!(f, "{}{}[", sep, def.name)?;
            for (i, dim) in def.dims.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                Display::fmt(dim, f)?;
            }
            f.write_str("]")?;
            sep = ", ";
        }
        Ok(())
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Expr::Lit(v) => Display::fmt(v, f),
            Expr::Var(name) => f.write_str(name),
            Expr::Index(name, indices) => fmt_indices(f, name, indices),
            Expr::Unary(op, arg) => {
                Display::fmt(op, f)?;
                wrap_op(f, arg)
            }
            Expr::Binary(op, lhs, rhs) => {
                wrap_op(f, lhs)?;
                write!(f, " {} ", op)?;
                wrap_op(f, rhs)
            }
            Expr::Func1(func, arg) => write!(f, "{}({})", func, arg),
            Expr::Func2(func, arg1, arg2) => write!(f, "{}({}, {})", func, arg1, arg2),
        }
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::IntDiv => "DIV",
            BinOp::Mod => "MOD",
            BinOp::And => "AND",
            BinOp::Or => "OR",
            BinOp::Xor => "XOR",
            BinOp::Eq => "==",
            BinOp::Ne => "<>",
            BinOp::Gt => ">",
            BinOp::Lt => "<",
            BinOp::Ge => ">=",
            BinOp::Le => "<=",
            BinOp::BitAnd => "B_AND",
            BinOp::BitOr => "B_OR",
            BinOp::BitXor => "B_XOR",
        })
    }
}

impl Display for UnOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            UnOp::Minus => "-",
            UnOp::Not => "NOT ",
            UnOp::BitNot => "B_NOT ",
        })
    }
}
