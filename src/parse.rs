// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Parsing S840D part programs into the AST.
//!
//! A block is parsed in two steps.  A hand-written pre-pass strips the
//! inline comment (tracking string literals) and reads the optional `/n`
//! skip level, `N`/`:` block number and `label:` prefix.  The remaining
//! content goes through the pest grammar in `s840d.pest` and the resulting
//! pairs are folded into [`crate::ast`] nodes.

use std::str::FromStr;

use itertools::Itertools;
use pest::iterators::Pair;
use pest::Parser as _;
use pest_derive::Parser;

use crate::alarm::Alarm;
use crate::ast::*;
use crate::value::{Value, ValueType};

#[derive(Parser)]
#[grammar = "s840d.pest"]
struct BlockParser;

/// Identifiers are limited to 30 characters after the two-letter prefix.
const MAX_IDENT_LEN: usize = 32;

/// A parse failure, locating the alarm on its source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    /// Zero-based index of the offending line.
    pub lineno: usize,
    pub alarm: Alarm,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "error in line {}: {}", self.lineno + 1, self.alarm)
    }
}

impl std::error::Error for ParseError {}

/// Parse a whole program.  The first alarm aborts the parse.
pub fn parse(input: &str) -> Result<Program, ParseError> {
    let mut parser = Parser::new();
    let mut prog = Program::default();
    for (lineno, line) in input.lines().enumerate() {
        let block = parser.parse_block(line).map_err(|alarm| ParseError { lineno, alarm })?;
        prog.blocks.push(block);
    }
    Ok(prog)
}

/// The block parser.  It carries the control-structure nesting depth across
/// blocks, so a program must go through a single `Parser` (after `reset`).
#[derive(Debug, Default)]
pub struct Parser {
    nesting_level: i32,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart nesting tracking for a new program.
    pub fn reset(&mut self) {
        self.nesting_level = 0;
    }

    /// Parse one source line into a block.
    pub fn parse_block(&mut self, line: &str) -> Result<Block, Alarm> {
        let content = &line[..find_comment_start(line)];

        let mut block = Block::default();

        let (skip, rest) = read_skip_level(content)?;
        if let Some(skip) = skip {
            if skip >= 10 {
                return Err(Alarm::InvalidSkipLevel);
            }
            block.level = BlockLevel::Data { skip: Some(skip as u8) };
        }
        let (number, rest) = read_block_number(rest)?;
        if let Some(number) = number {
            if number.digits.len() > 30 {
                return Err(Alarm::IdentifierTooLong);
            }
            block.number = Some(number);
        }
        let (label, rest) = read_label(rest);
        block.label = label;

        let parsed = BlockParser::parse(Rule::content, rest).map_err(|_| Alarm::SyntaxError)?;
        for pair in parsed.into_iter().next().expect("content").into_inner() {
            match pair.as_rule() {
                Rule::words => {
                    for word in pair.into_inner() {
                        block.content.push(build_word(word)?);
                    }
                }
                Rule::EOI => (),
                _ => block.content.push(build_stmt(pair)?),
            }
        }

        self.enter_control_levels(&mut block)?;
        Ok(block)
    }

    /// Control-structure blocks get their nesting depth and must not carry a
    /// label or skip level.
    fn enter_control_levels(&mut self, block: &mut Block) -> Result<(), Alarm> {
        let kind = match block.content.as_slice() {
            [single] => match single {
                BlockContent::If(_) | BlockContent::For(_) => ControlKind::Open,
                BlockContent::Else => ControlKind::Middle,
                BlockContent::EndIf | BlockContent::EndFor => ControlKind::Close,
                _ => return Ok(()),
            },
            _ => return Ok(()),
        };
        if block.label.is_some() || block.level != (BlockLevel::Data { skip: None }) {
            return Err(Alarm::LabelInControlStructure);
        }
        let nesting = match kind {
            ControlKind::Open => {
                self.nesting_level += 1;
                self.nesting_level
            }
            ControlKind::Middle => self.nesting_level,
            ControlKind::Close => {
                let level = self.nesting_level;
                self.nesting_level -= 1;
                level
            }
        };
        block.level = BlockLevel::Control { nesting };
        Ok(())
    }
}

enum ControlKind {
    Open,
    Middle,
    Close,
}

// ----- pre-pass over the raw line

/// Position of the comment-starting semicolon, or the line length if there
/// is none.  Semicolons inside string literals do not count; the `'"'`
/// escape form inside a literal is skipped.  If a literal is left unclosed,
/// the last semicolon seen inside it is used after all.
fn find_comment_start(line: &str) -> usize {
    let bytes = line.as_bytes();
    let mut inside_quotes = false;
    let mut fallback_pos = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' if inside_quotes
                && i + 2 < bytes.len()
                && bytes[i + 1] == b'"'
                && bytes[i + 2] == b'\'' =>
            {
                i += 3;
                continue;
            }
            b'"' => {
                inside_quotes = !inside_quotes;
                fallback_pos = 0;
            }
            b';' => {
                if inside_quotes {
                    fallback_pos = i;
                } else {
                    return i;
                }
            }
            _ => (),
        }
        i += 1;
    }
    if fallback_pos != 0 {
        fallback_pos
    } else {
        i
    }
}

fn read_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn read_skip_level(s: &str) -> Result<(Option<u32>, &str), Alarm> {
    let s = s.trim_start();
    let Some(rest) = s.strip_prefix('/') else {
        return Ok((None, s));
    };
    let (digits, rest) = read_digits(rest.trim_start());
    if digits.is_empty() {
        return Ok((Some(0), rest));
    }
    match digits.parse() {
        Ok(level) => Ok((Some(level), rest)),
        Err(_) => Err(Alarm::ValueOutOfRange),
    }
}

fn read_block_number(s: &str) -> Result<(Option<BlockNumber>, &str), Alarm> {
    let s = s.trim_start();
    let (kind, rest) = match s.as_bytes().first() {
        Some(b':') => (BlockNumberKind::Main, &s[1..]),
        Some(b'N' | b'n') => (BlockNumberKind::Regular, &s[1..]),
        _ => return Ok((None, s)),
    };
    let (digits, rest) = read_digits(rest.trim_start());
    if digits.is_empty() {
        return match kind {
            // A bare colon cannot start anything else.
            BlockNumberKind::Main => Err(Alarm::SyntaxError),
            // `N` without digits starts a word or name instead.
            BlockNumberKind::Regular => Ok((None, s)),
        };
    }
    Ok((Some(BlockNumber { digits: digits.into(), kind }), rest))
}

fn read_label(s: &str) -> (Option<String>, &str) {
    let trimmed = s.trim_start();
    let bytes = trimmed.as_bytes();
    let is_start = |b: u8| b.is_ascii_alphabetic() || b == b'_';
    let is_tail = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    if bytes.len() < 3 || !is_start(bytes[0]) || !is_start(bytes[1]) {
        return (None, s);
    }
    let mut end = 2;
    while end < bytes.len() && is_tail(bytes[end]) {
        end += 1;
    }
    if bytes.get(end) == Some(&b':') {
        (Some(trimmed[..end].into()), &trimmed[end + 1..])
    } else {
        (None, s)
    }
}

// ----- AST building from pest pairs

fn build_word(pair: Pair<Rule>) -> Result<BlockContent, Alarm> {
    Ok(match pair.as_rule() {
        Rule::g_ext_assign => {
            let (_, ext, expr) = pair.into_inner().collect_tuple().expect("children");
            BlockContent::ExtAddress(ExtAddressAssign {
                address: "G".into(),
                ext: Expr::Lit(Value::Int(parse_int(ext.as_str(), Alarm::ValueOutOfRange)?)),
                expr: build_expr(expr)?,
            })
        }
        Rule::aux_ext_assign => {
            let (letter, ext, expr) = pair.into_inner().collect_tuple().expect("children");
            BlockContent::ExtAddress(ExtAddressAssign {
                address: letter.as_str().to_ascii_uppercase(),
                ext: build_expr(ext)?,
                expr: build_expr(expr)?,
            })
        }
        Rule::d_word => {
            let (_, arg) = pair.into_inner().collect_tuple().expect("children");
            let expr = match arg.as_rule() {
                Rule::integer => {
                    Expr::Lit(Value::Int(parse_int(arg.as_str(), Alarm::UnknownGFunction)?))
                }
                _ => build_expr(arg)?,
            };
            BlockContent::Address(AddressAssign { address: "D".into(), expr, coord_type: None })
        }
        Rule::g_word => {
            let (_, num) = pair.into_inner().collect_tuple().expect("children");
            BlockContent::Address(AddressAssign {
                address: "G".into(),
                expr: Expr::Lit(Value::Int(parse_int(num.as_str(), Alarm::UnknownGFunction)?)),
                coord_type: None,
            })
        }
        Rule::no_ax_assign => {
            let (name, expr) = pair.into_inner().collect_tuple().expect("children");
            BlockContent::Address(AddressAssign {
                address: name.as_str().to_ascii_uppercase(),
                expr: build_expr(expr)?,
                coord_type: None,
            })
        }
        Rule::r_assign | Rule::array_assign | Rule::var_assign => {
            BlockContent::Assign(build_lvalue_assign(pair)?)
        }
        Rule::g_command => BlockContent::GCommand(
            GCommand::from_str(pair.as_str()).map_err(|_| Alarm::SyntaxError)?,
        ),
        Rule::addr_assign => {
            let mut inner = pair.into_inner();
            let mut address = inner.next().expect("letter").as_str().to_ascii_uppercase();
            let mut value = inner.next().expect("value");
            if value.as_rule() == Rule::integer {
                address.push_str(value.as_str());
                value = inner.next().expect("value");
            }
            let (coord_type, expr) = if value.as_rule() == Rule::coord_call {
                let (ct, expr) = value.into_inner().collect_tuple().expect("children");
                let ct = CoordType::from_str(ct.as_str()).map_err(|_| Alarm::SyntaxError)?;
                (Some(ct), build_expr(expr)?)
            } else {
                (None, build_expr(value)?)
            };
            BlockContent::Address(AddressAssign { address, expr, coord_type })
        }
        Rule::addr_num => {
            let mut inner = pair.into_inner();
            let address = inner.next().expect("letter").as_str().to_ascii_uppercase();
            let mut value = inner.next().expect("value");
            let negative = if value.as_rule() == Rule::sign {
                let neg = value.as_str() == "-";
                value = inner.next().expect("num");
                neg
            } else {
                false
            };
            let lit = Expr::Lit(build_num(value)?);
            let expr =
                if negative { Expr::Unary(UnOp::Minus, Box::new(lit)) } else { lit };
            BlockContent::Address(AddressAssign { address, expr, coord_type: None })
        }
        rule => unreachable!("word rule {:?}", rule),
    })
}

fn build_stmt(pair: Pair<Rule>) -> Result<BlockContent, Alarm> {
    Ok(match pair.as_rule() {
        Rule::if_stmt => {
            let (_, cond) = pair.into_inner().collect_tuple().expect("children");
            BlockContent::If(IfStmt { condition: build_expr(cond)? })
        }
        Rule::else_stmt => BlockContent::Else,
        Rule::endif_stmt => BlockContent::EndIf,
        Rule::endfor_stmt => BlockContent::EndFor,
        Rule::for_stmt => {
            let (_, init, _, to) = pair.into_inner().collect_tuple().expect("children");
            BlockContent::For(ForStmt { init: build_lvalue_assign(init)?, to: build_expr(to)? })
        }
        Rule::goto_stmt => BlockContent::Goto(build_goto(pair)?),
        Rule::cond_gotos => {
            let mut branches = vec![];
            for cond_goto in pair.into_inner() {
                let (_, cond, goto) = cond_goto.into_inner().collect_tuple().expect("children");
                branches.push((build_expr(cond)?, build_goto(goto)?));
            }
            BlockContent::CondGoto(CondGoto { branches })
        }
        Rule::def_stmt => build_def(pair)?,
        rule => unreachable!("stmt rule {:?}", rule),
    })
}

fn build_goto(pair: Pair<Rule>) -> Result<GotoStmt, Alarm> {
    let (kind, target) = pair.into_inner().collect_tuple().expect("children");
    let kind = GotoKind::from_str(kind.as_str()).map_err(|_| Alarm::SyntaxError)?;
    let target = match target.as_rule() {
        Rule::goto_block_num => {
            let (digits,) = target.into_inner().collect_tuple().expect("child");
            Expr::Lit(Value::Str(digits.as_str().into()))
        }
        _ => match build_expr(target)? {
            // A bare name is a label target, not a variable read.
            Expr::Var(name) => Expr::Lit(Value::Str(name)),
            expr => expr,
        },
    };
    Ok(GotoStmt { kind, target })
}

fn build_def(pair: Pair<Rule>) -> Result<BlockContent, Alarm> {
    let mut inner = pair.into_inner();
    let _kw = inner.next().expect("DEF");
    let type_pair = inner.next().expect("type");
    let type_name =
        type_pair.into_inner().next().expect("type name").as_str().to_ascii_uppercase();
    let var_type = ValueType::from_keyword(&type_name).ok_or(Alarm::SyntaxError)?;

    let mut scalars = vec![];
    let mut arrays = vec![];
    for item in inner {
        let mut parts = item.into_inner();
        let name = build_ident(parts.next().expect("name"))?;
        match parts.next() {
            None => scalars.push(ScalarDef { name, init: None }),
            Some(extra) if extra.as_rule() == Rule::def_dims => {
                let dims = extra
                    .into_inner()
                    .map(|dim| parse_int(dim.as_str(), Alarm::InvalidIndex))
                    .collect::<Result<Vec<_>, _>>()?;
                arrays.push(ArrayDef { name, dims });
            }
            Some(init) => {
                let (lit,) = init.into_inner().collect_tuple().expect("literal");
                scalars.push(ScalarDef { name, init: Some(build_literal(lit)?) });
            }
        }
    }
    Ok(BlockContent::Def(DefStmt { var_type, scalars, arrays }))
}

fn build_lvalue_assign(pair: Pair<Rule>) -> Result<LValueAssign, Alarm> {
    Ok(match pair.as_rule() {
        Rule::r_assign => {
            let (r_param, expr) = pair.into_inner().collect_tuple().expect("children");
            let index = build_r_index(r_param)?;
            LValueAssign { lvalue: LValue::Array("R".into(), vec![index]), expr: build_expr(expr)? }
        }
        Rule::array_assign => {
            let (array, expr) = pair.into_inner().collect_tuple().expect("children");
            let (name, indices) = build_array_ref(array)?;
            LValueAssign { lvalue: LValue::Array(name, indices), expr: build_expr(expr)? }
        }
        Rule::var_assign => {
            let (name, expr) = pair.into_inner().collect_tuple().expect("children");
            LValueAssign { lvalue: LValue::Var(build_ident(name)?), expr: build_expr(expr)? }
        }
        rule => unreachable!("assignment rule {:?}", rule),
    })
}

/// The index expression of an `R10` / `$R[n]` parameter access.
fn build_r_index(pair: Pair<Rule>) -> Result<Expr, Alarm> {
    let (_, index) = pair.into_inner().collect_tuple().expect("children");
    Ok(match index.as_rule() {
        Rule::integer => Expr::Lit(Value::Int(parse_int(index.as_str(), Alarm::ValueOutOfRange)?)),
        _ => build_expr(index)?,
    })
}

fn build_array_ref(pair: Pair<Rule>) -> Result<(String, Vec<Expr>), Alarm> {
    let mut inner = pair.into_inner();
    let name = build_ident(inner.next().expect("name"))?;
    let indices = inner.map(build_expr).collect::<Result<Vec<_>, _>>()?;
    Ok((name, indices))
}

fn build_ident(pair: Pair<Rule>) -> Result<String, Alarm> {
    let name = pair.as_str();
    if name.len() > MAX_IDENT_LEN {
        return Err(Alarm::IdentifierTooLong);
    }
    Ok(name.into())
}

fn build_expr(pair: Pair<Rule>) -> Result<Expr, Alarm> {
    match pair.as_rule() {
        // Left-associative binary levels all share one shape.
        Rule::expr
        | Rule::expr_or
        | Rule::expr_xor
        | Rule::expr_and
        | Rule::expr_bor
        | Rule::expr_bxor
        | Rule::expr_band
        | Rule::expr_add
        | Rule::expr_mul => {
            let mut inner = pair.into_inner();
            let mut lhs = build_expr(inner.next().expect("operand"))?;
            while let Some(op) = inner.next() {
                let rhs = build_expr(inner.next().expect("operand"))?;
                lhs = Expr::Binary(build_bin_op(&op), Box::new(lhs), Box::new(rhs));
            }
            Ok(lhs)
        }
        Rule::expr_unary => {
            let mut inner = pair.into_inner();
            let first = inner.next().expect("child");
            if first.as_rule() == Rule::op_unary {
                let arg = build_expr(inner.next().expect("operand"))?;
                Ok(match first.as_str() {
                    "-" => Expr::Unary(UnOp::Minus, Box::new(arg)),
                    "+" => arg,
                    op if op.eq_ignore_ascii_case("NOT") => Expr::Unary(UnOp::Not, Box::new(arg)),
                    _ => Expr::Unary(UnOp::BitNot, Box::new(arg)),
                })
            } else {
                build_expr(first)
            }
        }
        Rule::expr_atom => {
            let inner = pair.into_inner().next().expect("child");
            match inner.as_rule() {
                Rule::func_call => build_func_call(inner),
                Rule::expr => build_expr(inner),
                Rule::literal => Ok(Expr::Lit(build_literal(inner)?)),
                Rule::r_param => Ok(Expr::Index("R".into(), vec![build_r_index(inner)?])),
                Rule::array_ref => {
                    let (name, indices) = build_array_ref(inner)?;
                    Ok(Expr::Index(name, indices))
                }
                Rule::ident => Ok(Expr::Var(build_ident(inner)?)),
                rule => unreachable!("atom rule {:?}", rule),
            }
        }
        rule => unreachable!("expr rule {:?}", rule),
    }
}

fn build_bin_op(pair: &Pair<Rule>) -> BinOp {
    match pair.as_rule() {
        Rule::op_cmp => match pair.as_str() {
            "==" => BinOp::Eq,
            "<>" => BinOp::Ne,
            ">=" => BinOp::Ge,
            "<=" => BinOp::Le,
            ">" => BinOp::Gt,
            _ => BinOp::Lt,
        },
        Rule::op_or => BinOp::Or,
        Rule::op_xor => BinOp::Xor,
        Rule::op_and => BinOp::And,
        Rule::op_bor => BinOp::BitOr,
        Rule::op_bxor => BinOp::BitXor,
        Rule::op_band => BinOp::BitAnd,
        Rule::op_add => {
            if pair.as_str() == "+" {
                BinOp::Add
            } else {
                BinOp::Sub
            }
        }
        Rule::op_mul => match pair.as_str() {
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            op if op.eq_ignore_ascii_case("DIV") => BinOp::IntDiv,
            _ => BinOp::Mod,
        },
        rule => unreachable!("operator rule {:?}", rule),
    }
}

fn build_func_call(pair: Pair<Rule>) -> Result<Expr, Alarm> {
    let mut inner = pair.into_inner();
    let name = inner.next().expect("name").as_str();
    let mut args = inner
        .map(|arg| arg.into_inner().next().map(build_expr).transpose())
        .collect::<Result<Vec<Option<Expr>>, _>>()?;
    match args.len() {
        1 => {
            let func = Func1::from_str(name).map_err(|_| Alarm::BadFunctionArguments)?;
            let arg = args.pop().flatten().ok_or(Alarm::BadFunctionArguments)?;
            Ok(Expr::Func1(func, Box::new(arg)))
        }
        2 => {
            let func = Func2::from_str(name).map_err(|_| Alarm::BadFunctionArguments)?;
            let arg2 = args.pop().flatten().ok_or(Alarm::BadFunctionArguments)?;
            // A skipped first argument defaults to zero, as in `ATAN2(, X)`.
            let arg1 = args.pop().flatten().unwrap_or(Expr::Lit(Value::Int(0)));
            Ok(Expr::Func2(func, Box::new(arg1), Box::new(arg2)))
        }
        _ => Err(Alarm::BadFunctionArguments),
    }
}

fn build_literal(pair: Pair<Rule>) -> Result<Value, Alarm> {
    let inner = pair.into_inner().next().expect("child");
    match inner.as_rule() {
        Rule::num => build_num(inner),
        Rule::string_lit => {
            let s = inner.as_str();
            Ok(Value::Str(s[1..s.len() - 1].into()))
        }
        rule => unreachable!("literal rule {:?}", rule),
    }
}

fn build_num(pair: Pair<Rule>) -> Result<Value, Alarm> {
    let inner = pair.into_inner().next().expect("child");
    let text = inner.as_str();
    Ok(match inner.as_rule() {
        Rule::int_dec => match text.parse::<i32>() {
            Ok(i) => Value::Int(i),
            // Too large for INT; keep the value as REAL.
            Err(_) => Value::Real(parse_real(text)?),
        },
        Rule::int_bin => Value::Int(
            i32::from_str_radix(&text[2..text.len() - 1], 2).map_err(|_| Alarm::ValueOutOfRange)?,
        ),
        Rule::int_hex => Value::Int(
            i32::from_str_radix(&text[2..text.len() - 1], 16)
                .map_err(|_| Alarm::ValueOutOfRange)?,
        ),
        Rule::float => Value::Real(parse_real(text)?),
        Rule::float_ex => {
            let pos = text
                .as_bytes()
                .windows(2)
                .position(|w| w.eq_ignore_ascii_case(b"EX"))
                .expect("exponent marker");
            let mantissa = parse_real(&text[..pos])?;
            let exp: i32 = text[pos + 2..].parse().map_err(|_| Alarm::ValueOutOfRange)?;
            let value = mantissa * 10f64.powi(exp);
            if !value.is_finite() {
                return Err(Alarm::ValueOutOfRange);
            }
            Value::Real(value)
        }
        rule => unreachable!("num rule {:?}", rule),
    })
}

fn parse_real(text: &str) -> Result<f64, Alarm> {
    let value: f64 = text.parse().map_err(|_| Alarm::ValueOutOfRange)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Alarm::ValueOutOfRange)
    }
}

fn parse_int(text: &str, alarm: Alarm) -> Result<i32, Alarm> {
    text.parse().map_err(|_| alarm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_start() {
        assert_eq!(find_comment_start("X1 Y2"), 5);
        assert_eq!(find_comment_start("X1 ; comment"), 3);
        assert_eq!(find_comment_start("; all comment"), 0);
        // Semicolons inside string literals are content.
        assert_eq!(find_comment_start("A1=\"x;y\" ; c"), 9);
        // The '"' escape form does not close the literal.
        assert_eq!(find_comment_start("A1=\"a'\"'b;c\" ; c"), 13);
        // An unclosed literal falls back to the last semicolon inside it.
        assert_eq!(find_comment_start("A1=\"x;y"), 5);
    }

    #[test]
    fn skip_level_prefix() {
        assert_eq!(read_skip_level("X1"), Ok((None, "X1")));
        assert_eq!(read_skip_level("/ X1"), Ok((Some(0), "X1")));
        assert_eq!(read_skip_level("/7 X1"), Ok((Some(7), " X1")));
        assert_eq!(read_skip_level("/99999999999 X1"), Err(Alarm::ValueOutOfRange));
    }

    #[test]
    fn block_number_prefix() {
        let (num, rest) = read_block_number("N120 X1").unwrap();
        assert_eq!(num.unwrap().digits, "120");
        assert_eq!(rest, " X1");

        let (num, _) = read_block_number(":7").unwrap();
        assert_eq!(num.unwrap().kind, BlockNumberKind::Main);

        assert_eq!(read_block_number("X1").unwrap().0, None);
        assert_eq!(read_block_number("NORM").unwrap().0, None);
        assert_eq!(read_block_number(":"), Err(Alarm::SyntaxError));
    }

    #[test]
    fn label_prefix() {
        let (label, rest) = read_label("abc_1: X1");
        assert_eq!(label.as_deref(), Some("abc_1"));
        assert_eq!(rest, " X1");

        // Too short, digit in the prefix, or no colon.
        assert_eq!(read_label("a: X1").0, None);
        assert_eq!(read_label("a1bc: X1").0, None);
        assert_eq!(read_label("abc X1").0, None);
    }
}
