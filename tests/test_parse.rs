// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use snc::alarm::Alarm;
use snc::ast::{BlockLevel, BlockNumberKind};
use snc::parse;

#[test]
fn test_parse() {
    let src = r#"; Try to exercise as much of the syntax as possible.
/1 N10 start1: G1 X10 y-2.5 F100 ; skip level, number, label
:20 X=(10+2*3)
R1=5 $R2=R[1]
X1.5 Y.5 Z5.
X'HFF' Y'B101' Z1.5EX2
G17 g2 x10 i10 CR=5.5 TURN=2
X=AC(5) Y=IC(-1)
TRANS X10 Y-5
GOTOF end_lbl
DEF INT CNT=3, ARR[2,3]
M30
"#;

    let parsed = r#"
/1 N10 start1: G1 X10 Y=-2.5 F100
:20 X=10 + (2 * 3)
R[1]=5 R[2]=R[1]
X1.5 Y0.5 Z5
X255 Y5 Z150
G17 G2 X10 I10 CR=5.5 TURN=2
X=AC(5) Y=IC(-1)
TRANS X10 Y=-5
GOTOF end_lbl
DEF INT CNT=3, ARR[2, 3]
M30
"#;

    let prog = parse::parse(src).unwrap();
    assert_eq!(prog.to_string(), parsed);
}

#[test]
fn test_invalid() {
    for snippet in &[
        "$",        // invalid characters
        "GG",       // missing values
        "(",        // unclosed expression
        "IF",       // condition required
        "PROC ABC", // subprograms are not supported
        "G17 ENDIF",// statement inside a word block
        ":",        // main block number without digits
        "X=",       // missing value
    ] {
        let mut parser = parse::Parser::new();
        assert_eq!(parser.parse_block(snippet), Err(Alarm::SyntaxError), "snippet {:?}", snippet);
    }
}

#[test]
fn test_block_prefix() {
    let mut parser = parse::Parser::new();

    let block = parser.parse_block("/2 N15 lbl_a: X1").unwrap();
    assert_eq!(block.level, BlockLevel::Data { skip: Some(2) });
    let number = block.number.unwrap();
    assert_eq!(number.digits, "15");
    assert_eq!(number.kind, BlockNumberKind::Regular);
    assert_eq!(block.label.as_deref(), Some("lbl_a"));
    assert_eq!(block.content.len(), 1);

    let block = parser.parse_block(":5 X1").unwrap();
    assert_eq!(block.number.unwrap().kind, BlockNumberKind::Main);

    // `N` without digits is a name, not a block number.
    let block = parser.parse_block("NAME=5").unwrap();
    assert!(block.number.is_none());
    assert_eq!(block.content.len(), 1);

    // A label alone is a valid block.
    let block = parser.parse_block("ab:").unwrap();
    assert_eq!(block.label.as_deref(), Some("ab"));
    assert!(block.content.is_empty());
}

#[test]
fn test_comments_and_strings() {
    let mut parser = parse::Parser::new();

    let block = parser.parse_block("X1 ; first ; second").unwrap();
    assert_eq!(block.to_string(), "X1");

    // Semicolons inside string literals do not start a comment.
    let block = parser.parse_block("MSGVAR=\"a;b\" ; comment").unwrap();
    assert_eq!(block.to_string(), "MSGVAR=\"a;b\"");
}

#[test]
fn test_nesting_levels() {
    let src = "FOR R1=1 TO 3\nIF R1==2\nELSE\nENDIF\nENDFOR\n";
    let prog = parse::parse(src).unwrap();
    let levels: Vec<_> = prog.blocks.iter().map(|b| b.level).collect();
    assert_eq!(
        levels,
        vec![
            BlockLevel::Control { nesting: 1 },
            BlockLevel::Control { nesting: 2 },
            BlockLevel::Control { nesting: 2 },
            BlockLevel::Control { nesting: 2 },
            BlockLevel::Control { nesting: 1 },
        ]
    );
}

#[test]
fn test_parse_alarms() {
    let mut parser = parse::Parser::new();

    // Skip levels only go up to 9.
    assert_eq!(parser.parse_block("/12 X1"), Err(Alarm::InvalidSkipLevel));

    // Control structure blocks take neither labels nor skip levels.
    assert_eq!(parser.parse_block("lab_1: ENDIF"), Err(Alarm::LabelInControlStructure));
    assert_eq!(parser.parse_block("/1 FOR R1=1 TO 2"), Err(Alarm::LabelInControlStructure));

    // Identifiers are limited to 30 characters after the prefix.
    let long = format!("AB{}=1", "X".repeat(31));
    assert_eq!(parser.parse_block(&long), Err(Alarm::IdentifierTooLong));

    // So are block numbers.
    let long = format!("N{} X1", "1".repeat(31));
    assert_eq!(parser.parse_block(&long), Err(Alarm::IdentifierTooLong));

    // Out-of-range literals.
    assert_eq!(parser.parse_block("R1='HFFFFFFFFF'"), Err(Alarm::ValueOutOfRange));

    // Wrong function arity.
    assert_eq!(parser.parse_block("R1=SIN(1,2)"), Err(Alarm::BadFunctionArguments));
    assert_eq!(parser.parse_block("R1=ATAN2(1)"), Err(Alarm::BadFunctionArguments));
}

#[test]
fn test_goto_forms() {
    let mut parser = parse::Parser::new();
    assert_eq!(parser.parse_block("GOTOB start1").unwrap().to_string(), "GOTOB start1");
    assert_eq!(parser.parse_block("GOTO N120").unwrap().to_string(), "GOTO 120");
    assert_eq!(
        parser.parse_block("IF R1==1 GOTOF aa IF R1==2 GOTOC bb").unwrap().to_string(),
        "IF R[1] == 1 GOTOF aa IF R[1] == 2 GOTOC bb"
    );
}

#[test]
fn test_case_insensitivity() {
    let mut parser = parse::Parser::new();
    assert_eq!(parser.parse_block("g17 trans x10").unwrap().to_string(), "G17 TRANS X10");
    assert_eq!(parser.parse_block("if 1==1").unwrap().to_string(), "IF 1 == 1");
}
