// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! The controller: evaluates a parsed part program block by block and emits
//! the resulting toolpath through a [`ControllerListener`].
//!
//! Evaluation is two-phase.  First every stored source line is parsed (an
//! alarm stops parsing but keeps the blocks so far).  Then the blocks are
//! evaluated in order with the modal G-group state, the active frame and the
//! current position threaded through; structured control flow and GOTOs
//! rewrite the index of the next block to run.

mod enums;
pub mod expr;

use std::collections::HashMap;

use glam::{DMat4, DVec3};

use crate::alarm::{Alarm, Error};
use crate::ast::*;
use crate::geom::{ArcDirection, DirectedArc2, DirectedArc3, Helix};
use crate::parse;
use crate::value::{assign_cast, assign_cast_int, assign_cast_real, Value, ValueType};
use crate::vars::{DefineError, Variables};

pub use self::enums::*;

/// A straight move to `end_point` (machine coordinates).  `feed == 0` means
/// rapid traverse.
#[derive(Debug, Clone, Copy)]
pub struct LinearMotion {
    pub end_point: DVec3,
    pub feed: f64,
}

/// A circular move along `arc3` (machine coordinates).
#[derive(Debug, Clone, Copy)]
pub struct CircularMotion {
    pub arc3: DirectedArc3,
    pub feed: f64,
}

/// A helical move along `helix` (machine coordinates).
#[derive(Debug, Clone, Copy)]
pub struct HelicalMotion {
    pub helix: Helix,
    pub feed: f64,
}

/// Consumer of the interpreted toolpath.  Callbacks arrive synchronously in
/// program order; implementations must not reenter the controller.
pub trait ControllerListener {
    fn start_point(&mut self, point: DVec3);
    fn block_change(&mut self, block: usize);
    fn linear_motion(&mut self, motion: &LinearMotion);
    fn circular_motion(&mut self, motion: &CircularMotion);
    fn helical_motion(&mut self, motion: &HelicalMotion);
    fn end_of_program(&mut self);
}

/// Names of the geometry axes and circle center addresses.
#[derive(Debug, Clone)]
pub struct AxisConfig {
    geo_axes: [String; 3],
    circle_addresses: [String; 3],
}

impl Default for AxisConfig {
    fn default() -> Self {
        AxisConfig {
            geo_axes: ["X".into(), "Y".into(), "Z".into()],
            circle_addresses: ["I".into(), "J".into(), "K".into()],
        }
    }
}

impl AxisConfig {
    pub fn geo_axis(&self, index: usize) -> &str {
        &self.geo_axes[index]
    }

    pub fn set_geo_axis(&mut self, index: usize, name: impl Into<String>) {
        self.geo_axes[index] = name.into();
    }

    pub fn circle_address(&self, index: usize) -> &str {
        &self.circle_addresses[index]
    }

    pub fn set_circle_address(&mut self, index: usize, name: impl Into<String>) {
        self.circle_addresses[index] = name.into();
    }

    /// Address of the intermediate-point coordinate for CIP, e.g. `I1`.
    fn intermediate_address(&self, index: usize) -> String {
        format!("{}1", self.circle_addresses[index]).to_ascii_uppercase()
    }
}

/// One programmed coordinate with its per-address override.
#[derive(Debug, Clone, Copy)]
struct CoordValue {
    value: f64,
    coord_type: Option<CoordType>,
}

impl CoordValue {
    fn apply(&self, target: &mut f64, default_ct: CoordType) {
        let ct = self.coord_type.unwrap_or(default_ct);
        if ct == CoordType::Ic {
            *target += self.value;
        } else {
            *target = self.value;
        }
    }
}

/// Up to three programmed coordinates of one block.
#[derive(Debug, Clone, Copy, Default)]
struct CoordVector {
    x: Option<CoordValue>,
    y: Option<CoordValue>,
    z: Option<CoordValue>,
}

impl CoordVector {
    fn has_any(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.z.is_some()
    }

    fn count(&self) -> usize {
        [self.x, self.y, self.z].iter().filter(|c| c.is_some()).count()
    }

    fn component_mut(&mut self, index: usize) -> &mut Option<CoordValue> {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }

    /// The raw programmed values, zeros for unset components.
    fn to_dvec3(&self) -> DVec3 {
        DVec3::new(
            self.x.map_or(0.0, |c| c.value),
            self.y.map_or(0.0, |c| c.value),
            self.z.map_or(0.0, |c| c.value),
        )
    }

    fn apply(&self, v: &mut DVec3, default_ct: CoordType) {
        if let Some(x) = &self.x {
            x.apply(&mut v.x, default_ct);
        }
        if let Some(y) = &self.y {
            y.apply(&mut v.y, default_ct);
        }
        if let Some(z) = &self.z {
            z.apply(&mut v.z, default_ct);
        }
    }
}

/// The current frame: translations and rotations composed into one affine
/// transform from workpiece to machine coordinates.
#[derive(Debug, Clone, Copy)]
struct Frame {
    mat: DMat4,
}

impl Default for Frame {
    fn default() -> Self {
        Frame { mat: DMat4::IDENTITY }
    }
}

impl Frame {
    fn matrix(&self) -> DMat4 {
        self.mat
    }

    fn add_trans(&mut self, trans: &CoordVector) {
        self.mat *= DMat4::from_translation(trans.to_dvec3());
    }

    fn set_trans(&mut self, trans: &CoordVector) {
        self.mat = DMat4::IDENTITY;
        self.add_trans(trans);
    }

    fn add_rot(&mut self, rot: &CoordVector) {
        if let Some(z) = &rot.z {
            self.mat *= DMat4::from_axis_angle(DVec3::Z, z.value.to_radians());
        }
        if let Some(y) = &rot.y {
            self.mat *= DMat4::from_axis_angle(DVec3::Y, y.value.to_radians());
        }
        if let Some(x) = &rot.x {
            self.mat *= DMat4::from_axis_angle(DVec3::X, x.value.to_radians());
        }
    }

    fn set_rot(&mut self, rot: &CoordVector) {
        self.mat = DMat4::IDENTITY;
        self.add_rot(rot);
    }
}

/// Scratch state collected while visiting the nodes of one block.
#[derive(Debug, Default)]
struct BlockState {
    xyz: CoordVector,
    ijk: CoordVector,
    coord_addr: HashMap<String, CoordValue>,
    real_addr: HashMap<String, f64>,
    int_addr: HashMap<String, i32>,
    g: GCommands,
}

/// Where evaluation continues after the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextBlock {
    Unset,
    Index(usize),
    EndOfProgram,
}

/// An S840D controller.
///
/// Lines are added with [`add_line`](Controller::add_line);
/// [`run`](Controller::run) parses and evaluates them, reporting the
/// toolpath to the listener.
pub struct Controller {
    axis_config: AxisConfig,
    variables: Variables,
    source_blocks: Vec<String>,
    parsed_blocks: Vec<Block>,
    parser: parse::Parser,

    first_point: DVec3,
    current_point_wcs: DVec3,
    current_point_mcs: DVec3,

    feed: f64,
    arc_tolerance: f64,
    max_jump_count: usize,
    active_skip_levels: [bool; 10],

    def_allowed: bool,
    g_commands: GCommands,
    act_frame: Frame,

    current_block: usize,
    next_block: NextBlock,
    endfor_jump: bool,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        let mut controller = Controller {
            axis_config: AxisConfig::default(),
            variables: Variables::new(),
            source_blocks: vec![],
            parsed_blocks: vec![],
            parser: parse::Parser::new(),
            first_point: DVec3::ZERO,
            current_point_wcs: DVec3::ZERO,
            current_point_mcs: DVec3::ZERO,
            feed: 0.0,
            arc_tolerance: 0.015,
            max_jump_count: 1_000_000,
            active_skip_levels: [false; 10],
            def_allowed: true,
            g_commands: GCommands::default(),
            act_frame: Frame::default(),
            current_block: 0,
            next_block: NextBlock::Unset,
            endfor_jump: false,
        };
        controller.init_variables();
        controller
    }

    pub fn add_line(&mut self, line: impl Into<String>) {
        self.source_blocks.push(line.into());
    }

    /// Drop the program and all variables; reseed the predefined arrays.
    pub fn reset(&mut self) {
        self.source_blocks.clear();
        self.variables.clear();
        self.init_variables();
        self.def_allowed = true;
    }

    pub fn axis_config_mut(&mut self) -> &mut AxisConfig {
        &mut self.axis_config
    }

    pub fn set_arc_tolerance(&mut self, tolerance: f64) {
        self.arc_tolerance = tolerance;
    }

    pub fn set_max_jump_count(&mut self, count: usize) {
        self.max_jump_count = count;
    }

    /// Activate or deactivate one of the skip levels 0..=9.  Data blocks
    /// whose `/n` level is active are not evaluated.
    pub fn set_skip_level(&mut self, level: u8, active: bool) {
        if let Some(slot) = self.active_skip_levels.get_mut(level as usize) {
            *slot = active;
        }
    }

    /// Parse and evaluate the stored program, reporting to `listener`.
    pub fn run(&mut self, listener: &mut dyn ControllerListener) {
        // Phase 1: parse everything.  An alarm stops parsing, already parsed
        // blocks stay evaluable.
        self.parser.reset();
        self.parsed_blocks.clear();
        let sources = std::mem::take(&mut self.source_blocks);
        for source in &sources {
            match self.parser.parse_block(source) {
                Ok(block) => self.parsed_blocks.push(block),
                Err(alarm) => {
                    tracing::error!(code = alarm.code(), "parse: {}", alarm);
                    break;
                }
            }
        }
        self.source_blocks = sources;

        // Phase 2: evaluate.
        let blocks = std::mem::take(&mut self.parsed_blocks);
        self.evaluate(&blocks, listener);
        self.parsed_blocks = blocks;
    }

    fn evaluate(&mut self, blocks: &[Block], listener: &mut dyn ControllerListener) {
        self.gcode_reset_values();
        self.current_point_wcs = self.first_point;
        self.current_point_mcs = self.first_point;
        self.act_frame = Frame::default();
        listener.start_point(self.current_point_wcs);

        let mut jump_count = 0;
        self.current_block = 0;
        while self.current_block < blocks.len() {
            let block = &blocks[self.current_block];
            if let BlockLevel::Data { skip: Some(level) } = block.level {
                if self.active_skip_levels[level as usize] {
                    self.current_block += 1;
                    continue;
                }
            }

            listener.block_change(self.current_block);
            self.next_block = NextBlock::Unset;

            match self.evaluate_block(blocks, block, listener) {
                Ok(()) => (),
                Err(Error::Alarm(alarm)) => {
                    tracing::error!(code = alarm.code(), block = self.current_block, "{}", alarm);
                    return;
                }
                Err(Error::Bug(msg)) => {
                    tracing::warn!(block = self.current_block, "evaluation failed: {}", msg);
                }
            }

            match self.next_block {
                NextBlock::EndOfProgram => break,
                NextBlock::Index(index) => {
                    self.current_block = index;
                    jump_count += 1;
                    // infinite loop protection
                    if jump_count > self.max_jump_count {
                        tracing::warn!(max = self.max_jump_count, "jump count exceeded, stopping");
                        return;
                    }
                }
                NextBlock::Unset => self.current_block += 1,
            }
        }
        listener.end_of_program();
    }

    fn init_variables(&mut self) {
        let _ = self.variables.define_array("R", ValueType::Real, &[100]);
        let _ = self.variables.define_array("$P_GG", ValueType::Int, &[65]);
    }

    /// Reset the modal vector (and its `$P_GG` mirror) to the MD20150
    /// power-on defaults.
    fn gcode_reset_values(&mut self) {
        for index in 1..MD20150.len() {
            let _ = self.g_commands.set(index, MD20150[index]);
            let _ = self.variables.set_array_value(
                "$P_GG",
                Value::Int(MD20150[index] as i32),
                &[index as i32],
            );
        }
    }

    fn evaluate_block(
        &mut self,
        blocks: &[Block],
        block: &Block,
        listener: &mut dyn ControllerListener,
    ) -> Result<(), Error> {
        let mut state = BlockState::default();

        // DEF statements are only allowed in the definition section at the
        // top of the program.  Blocks without content (comment lines) do not
        // end the section.
        let is_def = matches!(block.content.as_slice(), [BlockContent::Def(_)]);
        if self.def_allowed {
            if !is_def && !block.content.is_empty() {
                self.def_allowed = false;
            }
        } else if is_def {
            return Err(Alarm::IllegalDefStatement.into());
        }

        for content in &block.content {
            self.visit_content(content, &mut state, blocks, block)?;
        }

        let set_groups = (state.g.group1() != Group1::Undef) as u32
            + (state.g.group2() != Group2::Undef) as u32
            + (state.g.group3() != Group3::Undef) as u32;
        if set_groups > 1 {
            return Err(Alarm::SyntaxDefiningGConflict.into());
        }

        self.g_commands.merge_defined(&state.g);
        // Groups 2, 3, 9 and 11 act blockwise only.
        for group in [2, 3, 9, 11] {
            let _ = self.g_commands.set(group, 0);
        }

        if state.g.group3() != Group3::Undef {
            match state.g.group3() {
                Group3::Trans => self.act_frame.set_trans(&state.xyz),
                Group3::Rot => self.act_frame.set_rot(&state.xyz),
                Group3::Atrans => self.act_frame.add_trans(&state.xyz),
                Group3::Arot => self.act_frame.add_rot(&state.xyz),
                // TODO: SCALE/ASCALE and MIRROR/AMIRROR are accepted but not
                // yet applied to the frame.
                _ => (),
            }
        } else if state.g.group2() != Group2::Undef {
            // dwell and repositioning produce no geometry
        } else if self.g_commands.group1() != Group1::Undef {
            self.execute_motion(&state, listener)?;
        }
        Ok(())
    }

    fn visit_content(
        &mut self,
        content: &BlockContent,
        state: &mut BlockState,
        blocks: &[Block],
        block: &Block,
    ) -> Result<(), Error> {
        match content {
            BlockContent::Address(assign) => self.visit_address(assign, state),
            BlockContent::ExtAddress(assign) => self.visit_ext_address(assign, state),
            BlockContent::Assign(assign) => {
                let value = expr::eval(&assign.expr, &self.variables)?;
                expr::write_lvalue(&assign.lvalue, value, &mut self.variables)
            }
            BlockContent::GCommand(command) => self.visit_g_command(*command, state),
            BlockContent::Goto(stmt) => self.visit_goto(stmt, blocks),
            BlockContent::CondGoto(stmt) => {
                for (condition, goto) in &stmt.branches {
                    let value = expr::eval(condition, &self.variables)?;
                    if expr::to_bool(&value)? {
                        self.visit_goto(goto, blocks)?;
                        break;
                    }
                }
                Ok(())
            }
            BlockContent::For(stmt) => self.visit_for(stmt, blocks, block),
            BlockContent::EndFor => self.visit_endfor(blocks, block),
            BlockContent::If(stmt) => self.visit_if(stmt, blocks, block),
            BlockContent::Else => self.visit_else(blocks, block),
            // ENDIF only serves as a branch target.
            BlockContent::EndIf => Ok(()),
            BlockContent::Def(stmt) => self.visit_def(stmt),
        }
    }

    fn visit_address(&mut self, assign: &AddressAssign, state: &mut BlockState) -> Result<(), Error> {
        let address = assign.address.as_str();

        for index in 0..3 {
            if address.eq_ignore_ascii_case(self.axis_config.geo_axis(index)) {
                if state.xyz.component_mut(index).is_some() {
                    return Err(Alarm::AxisRepeated.into());
                }
                let value = assign_cast_real(&expr::eval(&assign.expr, &self.variables)?)?;
                *state.xyz.component_mut(index) =
                    Some(CoordValue { value, coord_type: assign.coord_type });
                return Ok(());
            }
        }
        for index in 0..3 {
            if address.eq_ignore_ascii_case(self.axis_config.circle_address(index)) {
                if state.ijk.component_mut(index).is_some() {
                    return Err(Alarm::AxisRepeated.into());
                }
                let value = assign_cast_real(&expr::eval(&assign.expr, &self.variables)?)?;
                *state.ijk.component_mut(index) =
                    Some(CoordValue { value, coord_type: assign.coord_type });
                return Ok(());
            }
        }

        if address.eq_ignore_ascii_case("F") {
            let value = assign_cast_real(&expr::eval(&assign.expr, &self.variables)?)?;
            if value <= 0.0 {
                return Err(Alarm::InvalidFeedValue.into());
            }
            if state.real_addr.contains_key("F") {
                return Err(Alarm::AddressRepeated.into());
            }
            state.real_addr.insert("F".into(), value);
            self.feed = value;
        } else if address.eq_ignore_ascii_case("G") {
            let gcode = assign_cast_int(&expr::eval(&assign.expr, &self.variables)?)?;
            let handled = handle_group1(&mut state.g, gcode)
                || handle_group6(&mut state.g, gcode)
                || handle_group7(&mut state.g, gcode)
                || handle_group8(&mut state.g, gcode)
                || handle_group9(&mut state.g, gcode)
                || handle_group14(&mut state.g, gcode)
                || handle_group15(&mut state.g, gcode);
            if !handled {
                // TODO: unhandled plain G codes are silently ignored; raise
                // 12470 once the remaining groups are dispatched.
            }
        } else if address.eq_ignore_ascii_case("M") {
            let mcode = assign_cast_int(&expr::eval(&assign.expr, &self.variables)?)?;
            if let 2 | 17 | 30 = mcode {
                self.next_block = NextBlock::EndOfProgram;
            }
        } else if (0..3).any(|i| address.eq_ignore_ascii_case(&self.axis_config.intermediate_address(i)))
        {
            let value = assign_cast_real(&expr::eval(&assign.expr, &self.variables)?)?;
            state.coord_addr.insert(
                address.to_ascii_uppercase(),
                CoordValue { value, coord_type: assign.coord_type },
            );
        } else if address.eq_ignore_ascii_case("CR") {
            let value = assign_cast_real(&expr::eval(&assign.expr, &self.variables)?)?;
            state.real_addr.insert("CR".into(), value);
        } else if address.eq_ignore_ascii_case("TURN") {
            let value = assign_cast_int(&expr::eval(&assign.expr, &self.variables)?)?;
            state.int_addr.insert("TURN".into(), value);
        }
        Ok(())
    }

    fn visit_ext_address(
        &mut self,
        assign: &ExtAddressAssign,
        state: &mut BlockState,
    ) -> Result<(), Error> {
        if !assign.address.eq_ignore_ascii_case("G") {
            return Ok(());
        }
        let group = assign_cast_int(&expr::eval(&assign.ext, &self.variables)?)?;
        if (2..=5).contains(&group) {
            // Syntax-defining groups cannot be set through G[n].
            return Err(Alarm::UnknownGFunction.into());
        }
        let value = expr::eval(&assign.expr, &self.variables)?;
        let int_value = assign_cast_int(&value)?;
        if !(0..=u8::MAX as i32).contains(&int_value) {
            return Err(Alarm::InvalidGFunctionNumber.into());
        }
        if group < 0 {
            return Err(Alarm::UnknownGFunction.into());
        }
        match state.g.set(group as usize, int_value as u8) {
            Err(GSetError::InvalidIndex) => return Err(Alarm::UnknownGFunction.into()),
            Err(GSetError::InvalidValue) => return Err(Alarm::InvalidGFunctionNumber.into()),
            Ok(()) => (),
        }
        let _ = self.variables.set_array_value("$P_GG", value, &[group]);
        Ok(())
    }

    fn visit_g_command(&mut self, command: GCommand, state: &mut BlockState) -> Result<(), Error> {
        use GCommand::*;
        match command {
            Trans | Rot | Scale | Mirror | Atrans | Arot | Ascale | Amirror | Rots | Arots => {
                if state.g.group3() != Group3::Undef {
                    return Err(Alarm::SyntaxDefiningGConflict.into());
                }
                state.g.set_group3(match command {
                    Trans => Group3::Trans,
                    Rot => Group3::Rot,
                    Scale => Group3::Scale,
                    Mirror => Group3::Mirror,
                    Atrans => Group3::Atrans,
                    Arot => Group3::Arot,
                    Ascale => Group3::Ascale,
                    Amirror => Group3::Amirror,
                    Rots => Group3::Rots,
                    _ => Group3::Arots,
                });
            }
            Cip | Aspline | Bspline | Cspline | Ct | Poly | Invcw | Invccw => {
                state.g.set_group1(match command {
                    Cip => Group1::Cip,
                    Aspline => Group1::Aspline,
                    Bspline => Group1::Bspline,
                    Cspline => Group1::Cspline,
                    Ct => Group1::Ct,
                    Poly => Group1::Poly,
                    Invcw => Group1::Invcw,
                    _ => Group1::Invccw,
                });
            }
            Startfifo => set_raw(state, 4, 1)?,
            Stopfifo => set_raw(state, 4, 2)?,
            Fifoctrl => set_raw(state, 4, 3)?,
            Supa => set_raw(state, 9, 2)?,
            Cfc => set_raw(state, 16, 1)?,
            Cftcp => set_raw(state, 16, 2)?,
            Cfin => set_raw(state, 16, 3)?,
            Norm => set_raw(state, 17, 1)?,
            Kont => set_raw(state, 17, 2)?,
            Kontt => set_raw(state, 17, 3)?,
            Kontc => set_raw(state, 17, 4)?,
            Ffwof => set_raw(state, 24, 1)?,
            Ffwon => set_raw(state, 24, 2)?,
            Diamof => set_raw(state, 29, 1)?,
            Diamon => set_raw(state, 29, 2)?,
            Diam90 => set_raw(state, 29, 3)?,
            Diamcycof => set_raw(state, 29, 4)?,
            // Feed interpolation words have no geometric effect here.
            Fnorm | Flin | Fcub => (),
        }
        Ok(())
    }

    fn visit_goto(&mut self, stmt: &GotoStmt, blocks: &[Block]) -> Result<(), Error> {
        let target = expr::eval(&stmt.target, &self.variables)?;
        let Value::Str(target) = target else {
            return Err(Alarm::IncompatibleType.into());
        };
        // A target starting with a digit names a block number, otherwise a
        // label.
        let is_block_number = target.chars().next().is_some_and(|c| c.is_ascii_digit());
        let condition = |block: &Block| {
            if is_block_number {
                block.number.as_ref().is_some_and(|n| n.digits == target)
            } else {
                block.label.as_deref() == Some(target.as_str())
            }
        };

        let (index, missing_is_alarm) = match stmt.kind {
            GotoKind::Gotob => (self.search_back(blocks, &condition), true),
            GotoKind::Gotof => (self.search_fwd(blocks, &condition), true),
            GotoKind::Goto => (self.search_fwd_then_back(blocks, &condition), true),
            GotoKind::Gotoc => (self.search_fwd_then_back(blocks, &condition), false),
        };

        match index {
            Some(index) => {
                self.next_block = NextBlock::Index(index);
                Ok(())
            }
            None if missing_is_alarm => Err(Alarm::JumpTargetNotFound.into()),
            None => Ok(()),
        }
    }

    fn visit_for(&mut self, stmt: &ForStmt, blocks: &[Block], block: &Block) -> Result<(), Error> {
        if self.endfor_jump {
            self.endfor_jump = false;
            // Increment the loop variable (only after the first iteration).
            let current = expr::read_lvalue(&stmt.init.lvalue, &self.variables)?;
            let incremented = expr::binary_op(BinOp::Add, &current, &Value::Int(1))?;
            expr::write_lvalue(&stmt.init.lvalue, incremented, &mut self.variables)?;
        } else {
            // Assign the initial value (only before the first iteration).
            let value = expr::eval(&stmt.init.expr, &self.variables)?;
            expr::write_lvalue(&stmt.init.lvalue, value, &mut self.variables)?;
        }

        let current = expr::read_lvalue(&stmt.init.lvalue, &self.variables)?;
        let bound = expr::eval(&stmt.to, &self.variables)?;
        let continue_loop = match expr::binary_op(BinOp::Le, &current, &bound)? {
            Value::Bool(b) => b,
            _ => return Err(Error::bug("FOR condition did not yield BOOL")),
        };

        if !continue_loop {
            let level = nesting_of(block)?;
            let end = self.search_fwd(blocks, &|b: &Block| {
                matches!(b.content.as_slice(), [BlockContent::EndFor])
                    && b.level == (BlockLevel::Control { nesting: level })
            });
            match end {
                Some(index) => self.next_block = NextBlock::Index(index + 1),
                None => return Err(Alarm::InvalidNesting.into()),
            }
        }
        Ok(())
    }

    fn visit_endfor(&mut self, blocks: &[Block], block: &Block) -> Result<(), Error> {
        let level = nesting_of(block)?;
        let start = self.search_back(blocks, &|b: &Block| {
            matches!(b.content.as_slice(), [BlockContent::For(_)])
                && b.level == (BlockLevel::Control { nesting: level })
        });
        match start {
            Some(index) => {
                self.next_block = NextBlock::Index(index);
                self.endfor_jump = true;
                Ok(())
            }
            None => Err(Alarm::InvalidNesting.into()),
        }
    }

    fn visit_if(&mut self, stmt: &IfStmt, blocks: &[Block], block: &Block) -> Result<(), Error> {
        let value = expr::eval(&stmt.condition, &self.variables)?;
        if !expr::to_bool(&value)? {
            let level = nesting_of(block)?;
            let target = self.search_fwd(blocks, &|b: &Block| {
                matches!(b.content.as_slice(), [BlockContent::Else] | [BlockContent::EndIf])
                    && b.level == (BlockLevel::Control { nesting: level })
            });
            match target {
                Some(index) => self.next_block = NextBlock::Index(index + 1),
                None => return Err(Alarm::InvalidNesting.into()),
            }
        }
        Ok(())
    }

    fn visit_else(&mut self, blocks: &[Block], block: &Block) -> Result<(), Error> {
        // Reached after a taken IF branch: skip to the matching ENDIF.
        let level = nesting_of(block)?;
        let target = self.search_fwd(blocks, &|b: &Block| {
            matches!(b.content.as_slice(), [BlockContent::EndIf])
                && b.level == (BlockLevel::Control { nesting: level })
        });
        match target {
            Some(index) => {
                self.next_block = NextBlock::Index(index);
                Ok(())
            }
            None => Err(Alarm::InvalidNesting.into()),
        }
    }

    fn visit_def(&mut self, stmt: &DefStmt) -> Result<(), Error> {
        for def in &stmt.scalars {
            let init = def.init.clone().unwrap_or_else(|| stmt.var_type.default_value());
            let value = assign_cast(&init, stmt.var_type)?;
            define_result(self.variables.define(&def.name, value))?;
        }
        for def in &stmt.arrays {
            define_result(self.variables.define_array(&def.name, stmt.var_type, &def.dims))?;
        }
        Ok(())
    }

    fn execute_motion(
        &mut self,
        state: &BlockState,
        listener: &mut dyn ControllerListener,
    ) -> Result<(), Error> {
        let group1 = self.g_commands.group1();
        let has_motion = match group1 {
            Group1::G0 | Group1::G1 | Group1::Cip => state.xyz.has_any(),
            Group1::G2 | Group1::G3 => {
                state.ijk.has_any() || (state.real_addr.contains_key("CR") && state.xyz.has_any())
            }
            _ => false,
        };
        if !has_motion {
            return Ok(());
        }

        let is_rapid = group1 == Group1::G0;
        if !is_rapid && self.feed == 0.0 {
            return Err(Alarm::NoFeedProgrammed.into());
        }

        let act = self.act_frame.matrix();
        let act_inv = act.inverse();
        self.current_point_wcs = act_inv.transform_point3(self.current_point_mcs);
        let prev_wcs = self.current_point_wcs;
        let prev_mcs = self.current_point_mcs;
        let default_ct = if self.g_commands.group14() == Group14::G90 {
            CoordType::Ac
        } else {
            CoordType::Ic
        };
        state.xyz.apply(&mut self.current_point_wcs, default_ct);
        self.current_point_mcs = act.transform_point3(self.current_point_wcs);

        match group1 {
            Group1::G0 | Group1::G1 => {
                let motion = LinearMotion {
                    end_point: self.current_point_mcs,
                    feed: if is_rapid { 0.0 } else { self.feed },
                };
                listener.linear_motion(&motion);
            }
            Group1::G2 | Group1::G3 => {
                let dir = if group1 == Group1::G2 { ArcDirection::Clw } else { ArcDirection::Cclw };

                // With exactly two programmed axes the plane follows the
                // axis pair, otherwise the modal working plane.
                let wp = if state.xyz.count() == 2 {
                    if state.xyz.x.is_some() && state.xyz.y.is_some() {
                        Group6::G17
                    } else if state.xyz.x.is_some() && state.xyz.z.is_some() {
                        Group6::G18
                    } else {
                        Group6::G19
                    }
                } else {
                    self.g_commands.group6()
                };
                let force_helix = state.xyz.count() == 3;

                let arc2 = if let Some(&radius) = state.real_addr.get("CR") {
                    DirectedArc2::from_radius(
                        wp_xy(prev_wcs, wp)?,
                        wp_xy(self.current_point_wcs, wp)?,
                        radius,
                        dir,
                        self.arc_tolerance,
                    )
                } else {
                    let mut center_wcs = prev_wcs;
                    state.ijk.apply(&mut center_wcs, CoordType::Ic);
                    DirectedArc2::from_center(
                        wp_xy(center_wcs, wp)?,
                        wp_xy(prev_wcs, wp)?,
                        wp_xy(self.current_point_wcs, wp)?,
                        dir,
                        self.arc_tolerance,
                    )
                };
                let arc2 = arc2.ok_or(Alarm::CircleEndPointError)?;
                let transform = act * wp_rot(wp)?;

                let turn_addr = state.int_addr.get("TURN").copied();
                if turn_addr.is_some() || force_helix {
                    let turn = match turn_addr {
                        Some(turn) if turn < 0 => return Err(Alarm::BadTurnCount.into()),
                        Some(turn) => turn as u32,
                        None => 0,
                    };
                    let helix = Helix {
                        arc2,
                        transform,
                        z_start: wp_z(prev_wcs, wp)?,
                        z_end: wp_z(self.current_point_wcs, wp)?,
                        turn,
                    };
                    listener.helical_motion(&HelicalMotion { helix, feed: self.feed });
                } else {
                    let arc3 =
                        DirectedArc3 { arc2, transform, z: wp_z(self.current_point_wcs, wp)? };
                    listener.circular_motion(&CircularMotion { arc3, feed: self.feed });
                }
            }
            Group1::Cip => {
                let mut intermediate_wcs = prev_wcs;
                for index in 0..3 {
                    let key = self.axis_config.intermediate_address(index);
                    if let Some(coord) = state.coord_addr.get(&key) {
                        let component = match index {
                            0 => &mut intermediate_wcs.x,
                            1 => &mut intermediate_wcs.y,
                            _ => &mut intermediate_wcs.z,
                        };
                        coord.apply(component, default_ct);
                    }
                }
                let intermediate_mcs = act.transform_point3(intermediate_wcs);

                let arc3 = DirectedArc3::from_three_points(
                    prev_mcs,
                    intermediate_mcs,
                    self.current_point_mcs,
                    0.0,
                )
                .ok_or(Alarm::CircleEndPointError)?;
                listener.circular_motion(&CircularMotion { arc3, feed: self.feed });
            }
            _ => (),
        }
        Ok(())
    }

    // ----- block search for jumps

    fn search_fwd(&self, blocks: &[Block], condition: &dyn Fn(&Block) -> bool) -> Option<usize> {
        (self.current_block + 1..blocks.len()).find(|&index| condition(&blocks[index]))
    }

    fn search_back(&self, blocks: &[Block], condition: &dyn Fn(&Block) -> bool) -> Option<usize> {
        (0..self.current_block).rev().find(|&index| condition(&blocks[index]))
    }

    fn search_fwd_then_back(
        &self,
        blocks: &[Block],
        condition: &dyn Fn(&Block) -> bool,
    ) -> Option<usize> {
        self.search_fwd(blocks, condition).or_else(|| self.search_back(blocks, condition))
    }
}

fn nesting_of(block: &Block) -> Result<i32, Error> {
    match block.level {
        BlockLevel::Control { nesting } => Ok(nesting),
        BlockLevel::Data { .. } => Err(Error::bug("control statement in a data block")),
    }
}

fn set_raw(state: &mut BlockState, group: usize, value: u8) -> Result<(), Error> {
    state.g.set(group, value).map_err(|_| Error::bug("named command outside its group range"))
}

fn define_result(result: Result<(), DefineError>) -> Result<(), Error> {
    match result {
        Ok(()) => Ok(()),
        Err(DefineError::AlreadyExists) => Err(Alarm::NameRedefined.into()),
        Err(DefineError::OutOfMemory) => Err(Alarm::MemoryExhausted.into()),
        Err(DefineError::InvalidArraySize) | Err(DefineError::InvalidDimensionCount) => {
            Err(Alarm::InvalidIndex.into())
        }
    }
}

// ----- numeric G code dispatch per group

fn handle_group1(g: &mut GCommands, gcode: i32) -> bool {
    let code = match gcode {
        0 => Group1::G0,
        1 => Group1::G1,
        2 => Group1::G2,
        3 => Group1::G3,
        33 => Group1::G33,
        331 => Group1::G331,
        332 => Group1::G332,
        34 => Group1::G34,
        35 => Group1::G35,
        335 => Group1::G335,
        336 => Group1::G336,
        _ => Group1::Undef,
    };
    if code != Group1::Undef {
        g.set_group1(code);
        true
    } else {
        false
    }
}

fn handle_group6(g: &mut GCommands, gcode: i32) -> bool {
    let code = match gcode {
        17 => Group6::G17,
        18 => Group6::G18,
        19 => Group6::G19,
        _ => Group6::Undef,
    };
    if code != Group6::Undef {
        g.set_group6(code);
        true
    } else {
        false
    }
}

fn handle_group7(g: &mut GCommands, gcode: i32) -> bool {
    let value = match gcode {
        40 => 1,
        41 => 2,
        42 => 3,
        _ => 0,
    };
    if value != 0 {
        let _ = g.set(7, value);
        true
    } else {
        false
    }
}

fn handle_group8(g: &mut GCommands, gcode: i32) -> bool {
    // TODO: verify the offsets of the settable zero systems against the MD
    // documentation; the short G54-G57 range and the extended G505+ range
    // share this table.
    let value = match gcode {
        500 => 1,
        54..=57 => (gcode - 52) as u8,
        505..=599 => (gcode - 499) as u8,
        _ => 0,
    };
    if value != 0 {
        let _ = g.set(8, value);
        true
    } else {
        false
    }
}

fn handle_group9(g: &mut GCommands, gcode: i32) -> bool {
    let value = match gcode {
        53 => 1,
        153 => 3,
        _ => 0,
    };
    if value != 0 {
        let _ = g.set(9, value);
        true
    } else {
        false
    }
}

fn handle_group14(g: &mut GCommands, gcode: i32) -> bool {
    let code = match gcode {
        90 => Group14::G90,
        91 => Group14::G91,
        _ => Group14::Undef,
    };
    if code != Group14::Undef {
        g.set_group14(code);
        true
    } else {
        false
    }
}

fn handle_group15(g: &mut GCommands, gcode: i32) -> bool {
    let code = match gcode {
        93 => Group15::G93,
        931 => Group15::G931,
        94 => Group15::G94,
        95 => Group15::G95,
        96 => Group15::G96,
        961 => Group15::G961,
        97 => Group15::G97,
        971 => Group15::G971,
        973 => Group15::G973,
        // The toggling codes resolve against the current group state.
        942 => {
            let next =
                if spindle_speed_type(g.group15()) == SpindleSpeedType::Rpm { 94 } else { 961 };
            return handle_group15(g, next);
        }
        962 => {
            let next = if feed_type(g.group15()) == FeedType::PerMinute { 961 } else { 96 };
            return handle_group15(g, next);
        }
        972 => {
            let next = if feed_type(g.group15()) == FeedType::PerMinute { 971 } else { 97 };
            return handle_group15(g, next);
        }
        _ => Group15::Undef,
    };
    if code != Group15::Undef {
        g.set_group15(code);
        true
    } else {
        false
    }
}
