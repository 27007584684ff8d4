// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Modal G-group bookkeeping.
//!
//! The controller keeps 30 modal groups as a dense byte array; group 0 does
//! not exist, so all indices are 1-based.  Only the groups the interpreter
//! acts on get a typed enum view; the rest are validated against the
//! per-group maximum table.

use glam::{DMat3, DMat4, DVec2, DVec3};

use crate::alarm::Error;

macro_rules! modal_group {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        #[repr(u8)]
        pub enum $name {
            #[default]
            Undef = 0,
            $($variant),+
        }

        impl $name {
            const VARIANTS: &'static [$name] = &[$name::Undef, $($name::$variant),+];

            pub const MAX: u8 = ($name::VARIANTS.len() - 1) as u8;

            pub fn from_u8(value: u8) -> Self {
                Self::VARIANTS.get(value as usize).copied().unwrap_or($name::Undef)
            }
        }
    };
}

modal_group! {
    /// Group 1: motion commands.
    Group1 {
        G0, G1, G2, G3, Cip, Aspline, Bspline, Cspline, Poly,
        G33, G331, G332, Oemipo1, Oemipo2, Ct, G34, G35,
        Invcw, Invccw, G335, G336,
    }
}

modal_group! {
    /// Group 2: non-modal motions, dwell and repositioning.
    Group2 {
        G4, G63, G74, G75, Reposl, Reposq, Reposh, Reposa, Reposqa, Reposha,
        G147, G247, G347, G148, G248, G348, G5, G7,
    }
}

modal_group! {
    /// Group 3: programmable frames.
    Group3 {
        Trans, Rot, Scale, Mirror, Atrans, Arot, Ascale, Amirror,
        Reserved, G25, G26, G110, G111, G112, G58, G59, Rots, Arots,
    }
}

modal_group! {
    /// Group 6: working plane selection.
    Group6 { G17, G18, G19 }
}

modal_group! {
    /// Group 14: absolute / incremental dimensioning.
    Group14 { G90, G91 }
}

modal_group! {
    /// Group 15: feed and spindle-speed types.
    Group15 {
        G93, G94, G95, G96, G97, G931, G961, G971,
        G942, G952, G962, G972, G973,
    }
}

/// How a programmed F value is interpreted (group 15).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedType {
    PerMinute,
    PerRevolution,
    /// 1/minute.
    InvTime,
    /// Seconds.
    Time,
}

/// How a programmed S value is interpreted (group 15).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpindleSpeedType {
    Rpm,
    SurfaceSpeed,
}

pub fn spindle_speed_type(gcode: Group15) -> SpindleSpeedType {
    match gcode {
        Group15::G96 | Group15::G961 => SpindleSpeedType::SurfaceSpeed,
        _ => SpindleSpeedType::Rpm,
    }
}

pub fn feed_type(gcode: Group15) -> FeedType {
    match gcode {
        Group15::G93 => FeedType::InvTime,
        Group15::G931 => FeedType::Time,
        Group15::G95 | Group15::G96 | Group15::G97 => FeedType::PerRevolution,
        _ => FeedType::PerMinute,
    }
}

/// Result of setting a modal group by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GSetError {
    InvalidIndex,
    InvalidValue,
}

/// The 30 modal groups as a dense vector, indexed 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GCommands([u8; GCommands::SIZE]);

impl GCommands {
    pub const SIZE: usize = 30;

    /// Largest legal value per group; group 5 is unused on this control.
    const MAX_VALUES: [u8; GCommands::SIZE] = [
        Group1::MAX,
        Group2::MAX,
        Group3::MAX,
        3,
        0,
        Group6::MAX,
        3,
        100,
        3,
        7,
        1,
        3,
        4,
        Group14::MAX,
        Group15::MAX,
        3,
        4,
        2,
        3,
        3,
        3,
        11,
        3,
        2,
        2,
        4,
        2,
        2,
        4,
        5,
    ];

    pub fn set(&mut self, group: usize, value: u8) -> Result<(), GSetError> {
        if group == 0 || group > Self::SIZE {
            return Err(GSetError::InvalidIndex);
        }
        if value > Self::MAX_VALUES[group - 1] {
            return Err(GSetError::InvalidValue);
        }
        self.0[group - 1] = value;
        Ok(())
    }

    pub fn get(&self, group: usize) -> Option<u8> {
        if group == 0 || group > Self::SIZE {
            return None;
        }
        Some(self.0[group - 1])
    }

    /// Copy every group that is set in `other` over this vector.
    pub fn merge_defined(&mut self, other: &GCommands) {
        for (slot, &value) in self.0.iter_mut().zip(&other.0) {
            if value != 0 {
                *slot = value;
            }
        }
    }

    pub fn group1(&self) -> Group1 {
        Group1::from_u8(self.0[0])
    }

    pub fn set_group1(&mut self, g: Group1) {
        self.0[0] = g as u8;
    }

    pub fn group2(&self) -> Group2 {
        Group2::from_u8(self.0[1])
    }

    pub fn group3(&self) -> Group3 {
        Group3::from_u8(self.0[2])
    }

    pub fn set_group3(&mut self, g: Group3) {
        self.0[2] = g as u8;
    }

    pub fn group6(&self) -> Group6 {
        Group6::from_u8(self.0[5])
    }

    pub fn set_group6(&mut self, g: Group6) {
        self.0[5] = g as u8;
    }

    pub fn group14(&self) -> Group14 {
        Group14::from_u8(self.0[13])
    }

    pub fn set_group14(&mut self, g: Group14) {
        self.0[13] = g as u8;
    }

    pub fn group15(&self) -> Group15 {
        Group15::from_u8(self.0[14])
    }

    pub fn set_group15(&mut self, g: Group15) {
        self.0[14] = g as u8;
    }
}

/// Power-on defaults per group, as configured by MD20150.  Index 0 is
/// padding; entries beyond the 30 groups exist on real controls and are
/// ignored here.
pub const MD20150: [u8; 70] = [
    0, 2, 0, 0, 2, 0, 1, 1, 1, 0, 1, 0, 1, 2, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1,
];

/// Project a point onto the working plane's 2-D coordinates.
pub fn wp_xy(v: DVec3, wp: Group6) -> Result<DVec2, Error> {
    match wp {
        Group6::G17 => Ok(DVec2::new(v.x, v.y)),
        Group6::G18 => Ok(DVec2::new(v.z, v.x)),
        Group6::G19 => Ok(DVec2::new(v.y, v.z)),
        Group6::Undef => Err(Error::bug("illegal working plane")),
    }
}

/// The out-of-plane coordinate for the working plane.
pub fn wp_z(v: DVec3, wp: Group6) -> Result<f64, Error> {
    match wp {
        Group6::G17 => Ok(v.z),
        Group6::G18 => Ok(v.y),
        Group6::G19 => Ok(v.x),
        Group6::Undef => Err(Error::bug("illegal working plane")),
    }
}

/// Rotation mapping plane coordinates back into machine axes.
pub fn wp_rot(wp: Group6) -> Result<DMat4, Error> {
    let mat3 = match wp {
        Group6::G17 => DMat3::IDENTITY,
        Group6::G18 => DMat3::from_cols(
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ),
        Group6::G19 => DMat3::from_cols(
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(1.0, 0.0, 0.0),
        ),
        Group6::Undef => return Err(Error::bug("illegal working plane")),
    };
    Ok(DMat4::from_mat3(mat3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_bounds() {
        let mut g = GCommands::default();
        assert_eq!(g.set(0, 1), Err(GSetError::InvalidIndex));
        assert_eq!(g.set(31, 1), Err(GSetError::InvalidIndex));
        assert_eq!(g.set(6, 4), Err(GSetError::InvalidValue));
        assert_eq!(g.set(6, 3), Ok(()));
        assert_eq!(g.group6(), Group6::G19);
    }

    #[test]
    fn reset_defaults() {
        let mut g = GCommands::default();
        for group in 1..=GCommands::SIZE {
            let _ = g.set(group, MD20150[group]);
        }
        assert_eq!(g.group1(), Group1::G1);
        assert_eq!(g.group6(), Group6::G17);
        assert_eq!(g.group14(), Group14::G90);
        assert_eq!(g.group15(), Group15::G94);
    }
}
