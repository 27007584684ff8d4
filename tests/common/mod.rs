// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Shared test listener recording the controller's event stream.

#![allow(dead_code)]

use glam::DVec3;
use snc::eval::{
    CircularMotion, Controller, ControllerListener, HelicalMotion, LinearMotion,
};

#[derive(Debug)]
pub enum Event {
    Line { end: DVec3, feed: f64 },
    Arc(CircularMotion),
    Helix(HelicalMotion),
    End,
}

#[derive(Default)]
pub struct Recorder {
    pub start: Option<DVec3>,
    pub blocks: Vec<usize>,
    pub events: Vec<Event>,
}

impl ControllerListener for Recorder {
    fn start_point(&mut self, point: DVec3) {
        self.start = Some(point);
    }

    fn block_change(&mut self, block: usize) {
        self.blocks.push(block);
    }

    fn linear_motion(&mut self, motion: &LinearMotion) {
        self.events.push(Event::Line { end: motion.end_point, feed: motion.feed });
    }

    fn circular_motion(&mut self, motion: &CircularMotion) {
        self.events.push(Event::Arc(*motion));
    }

    fn helical_motion(&mut self, motion: &HelicalMotion) {
        self.events.push(Event::Helix(*motion));
    }

    fn end_of_program(&mut self) {
        self.events.push(Event::End);
    }
}

impl Recorder {
    /// End points and feeds of the linear motions, in order.
    pub fn lines(&self) -> Vec<(DVec3, f64)> {
        self.events
            .iter()
            .filter_map(|ev| match ev {
                Event::Line { end, feed } => Some((*end, *feed)),
                _ => None,
            })
            .collect()
    }

    /// X coordinates of the linear motions, in order.
    pub fn line_xs(&self) -> Vec<f64> {
        self.lines().iter().map(|(p, _)| p.x).collect()
    }

    pub fn arcs(&self) -> Vec<&CircularMotion> {
        self.events
            .iter()
            .filter_map(|ev| match ev {
                Event::Arc(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn helices(&self) -> Vec<&HelicalMotion> {
        self.events
            .iter()
            .filter_map(|ev| match ev {
                Event::Helix(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// Whether the program reported a normal end.
    pub fn ended(&self) -> bool {
        matches!(self.events.last(), Some(Event::End))
    }
}

pub fn run(lines: &[&str]) -> Recorder {
    run_with(lines, |_| ())
}

pub fn run_with(lines: &[&str], configure: impl FnOnce(&mut Controller)) -> Recorder {
    let mut controller = Controller::new();
    configure(&mut controller);
    for line in lines {
        controller.add_line(*line);
    }
    let mut recorder = Recorder::default();
    controller.run(&mut recorder);
    recorder
}

pub fn close(a: DVec3, b: DVec3) -> bool {
    (a - b).abs().max_element() < 1e-9
}
