// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! A G-Code interpretation library aiming for compatibility with the
//! Siemens SINUMERIK 840D dialect.
//!
//! The library parses part programs into an AST, evaluates them with the
//! S840D typed expression semantics and modal G-group state, and produces a
//! geometric toolpath: a stream of linear, circular and helical motion
//! events in machine coordinates.
//!
//! ## Basic usage
//!
//! Use `snc::parse::parse` to get an AST and work with the abstract syntax
//! tree datastructures from `snc::ast`, or feed whole programs through
//! `snc::eval::Controller`, which evaluates expressions, threads the modal
//! state through the blocks and reports the toolpath to a
//! `ControllerListener`.
//!
//! The following code (the same as the "snc" demo binary, minus the bounding
//! box) takes a file as an argument, interprets it and prints every motion:
//!
//! ```rust,no_run
//! use std::{env, fs};
//! use glam::DVec3;
//! use snc::eval::{Controller, ControllerListener, LinearMotion, CircularMotion, HelicalMotion};
//!
//! struct Print;
//!
//! impl ControllerListener for Print {
//!     fn start_point(&mut self, point: DVec3) { println!("start {}", point); }
//!     fn block_change(&mut self, _block: usize) {}
//!     fn linear_motion(&mut self, m: &LinearMotion) { println!("line to {}", m.end_point); }
//!     fn circular_motion(&mut self, _m: &CircularMotion) { println!("arc"); }
//!     fn helical_motion(&mut self, _m: &HelicalMotion) { println!("helix"); }
//!     fn end_of_program(&mut self) { println!("end"); }
//! }
//!
//! fn main() {
//!     let input = fs::read_to_string(env::args().nth(1).unwrap()).unwrap();
//!     let mut controller = Controller::new();
//!     for line in input.lines() {
//!         controller.add_line(line);
//!     }
//!     controller.run(&mut Print);
//! }
//! ```
//!
//! ## Unsupported features
//!
//! Machining semantics beyond geometry (tool compensation, spindle control,
//! cycles) and subprogram calls (PROC/RET) are not interpreted.

pub mod alarm;
pub mod ast;
pub mod eval;
pub mod geom;
pub mod parse;
pub mod value;
pub mod vars;
