// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use glam::DVec3;
use snc::eval::{
    CircularMotion, Controller, ControllerListener, HelicalMotion, LinearMotion,
};
use snc::geom::{BoundingBox, DirectedArc3Sampler, HelixSampler};

/// Prints each toolpath event and collects the path extents by sampling.
#[derive(Default)]
struct PrintListener {
    bbox: BoundingBox,
}

const SAMPLES: usize = 32;

impl ControllerListener for PrintListener {
    fn start_point(&mut self, point: DVec3) {
        println!("start  {}", point);
        self.bbox.include(point);
    }

    fn block_change(&mut self, _block: usize) {}

    fn linear_motion(&mut self, motion: &LinearMotion) {
        if motion.feed == 0.0 {
            println!("rapid  {}", motion.end_point);
        } else {
            println!("line   {}  F{}", motion.end_point, motion.feed);
        }
        self.bbox.include(motion.end_point);
    }

    fn circular_motion(&mut self, motion: &CircularMotion) {
        let sampler = DirectedArc3Sampler::new(&motion.arc3);
        println!("arc    {}  F{}", sampler.sample(1.0), motion.feed);
        for i in 0..=SAMPLES {
            self.bbox.include(sampler.sample(i as f64 / SAMPLES as f64));
        }
    }

    fn helical_motion(&mut self, motion: &HelicalMotion) {
        let sampler = HelixSampler::new(&motion.helix);
        println!("helix  {}  F{}", sampler.sample(1.0), motion.feed);
        let samples = SAMPLES * (motion.helix.turn as usize + 1);
        for i in 0..=samples {
            self.bbox.include(sampler.sample(i as f64 / samples as f64));
        }
    }

    fn end_of_program(&mut self) {
        println!("end of program");
    }
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let filename = std::env::args().nth(1).expect("usage: snc <program>");
    let input = std::fs::read_to_string(&filename).unwrap();

    let mut controller = Controller::new();
    for line in input.lines() {
        controller.add_line(line);
    }
    let mut listener = PrintListener::default();
    controller.run(&mut listener);

    if listener.bbox.is_defined() {
        println!("extent {} .. {}", listener.bbox.lower(), listener.bbox.upper());
    }
}
