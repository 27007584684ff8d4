// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Whole-program scenarios combining variables, expressions, control flow,
//! frames and geometry.

mod common;

use common::{close, run};
use glam::DVec3;
use snc::geom::{BoundingBox, DirectedArc3Sampler};

#[test]
fn expressions_drive_the_toolpath() {
    let rec = run(&[
        "DEF REAL WIDTH=40, HEIGHT=20",
        "G0 X0 Y0",
        "G1 F=2*50 X=WIDTH/2 Y=HEIGHT-5*2",
        "X=WIDTH DIV 3",
        "Y=MINVAL(HEIGHT, 15)+ABS(-5)",
    ]);
    let points: Vec<DVec3> = rec.lines().iter().map(|(p, _)| *p).collect();
    assert_eq!(
        points,
        vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(20.0, 10.0, 0.0),
            DVec3::new(13.0, 10.0, 0.0),
            DVec3::new(13.0, 20.0, 0.0),
        ]
    );
    // F took the computed feed.
    assert_eq!(rec.lines()[1].1, 100.0);
    assert!(rec.ended());
}

#[test]
fn backward_jump_with_counter() {
    let rec = run(&[
        "R1=0",
        "G0 X0 Y0",
        "AGAIN: R1=R1+1",
        "G1 F100 X=R1",
        "IF R1<3 GOTOB AGAIN",
        "M30",
    ]);
    let xs: Vec<f64> = rec.line_xs();
    assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
    assert!(rec.ended());
}

#[test]
fn arc_under_a_translated_frame() {
    let rec = run(&[
        "TRANS X10",
        "G0 X0 Y0",
        "G17 G2 F100 X10 Y0 I5 J0",
    ]);
    let arcs = rec.arcs();
    assert_eq!(arcs.len(), 1);
    let sampler = DirectedArc3Sampler::new(&arcs[0].arc3);
    // The whole half circle is shifted by the frame translation.
    assert!(close(sampler.sample(0.0), DVec3::new(10.0, 0.0, 0.0)));
    assert!(close(sampler.sample(0.5), DVec3::new(15.0, 5.0, 0.0)));
    assert!(close(sampler.sample(1.0), DVec3::new(20.0, 0.0, 0.0)));
}

#[test]
fn arc_in_the_g18_plane() {
    let rec = run(&["G0 X0 Y0 Z0", "G18 G2 F100 X10 Z0 I5 K0"]);
    let arcs = rec.arcs();
    assert_eq!(arcs.len(), 1);
    let sampler = DirectedArc3Sampler::new(&arcs[0].arc3);
    assert!(close(sampler.sample(0.0), DVec3::ZERO));
    assert!(close(sampler.sample(0.5), DVec3::new(5.0, 0.0, -5.0)));
    assert!(close(sampler.sample(1.0), DVec3::new(10.0, 0.0, 0.0)));
}

#[test]
fn two_dimensional_array() {
    let rec = run(&[
        "DEF REAL PTS[2,2]",
        "PTS[0,0]=3 PTS[0,1]=4",
        "PTS[1,0]=PTS[0,0]*2 PTS[1,1]=PTS[0,1]*2",
        "G0 X=PTS[1,0] Y=PTS[1,1]",
    ]);
    assert_eq!(rec.lines(), vec![(DVec3::new(6.0, 8.0, 0.0), 0.0)]);
}

#[test]
fn string_comparison_controls_flow() {
    let rec = run(&[
        "DEF STRING[20] MSG_A",
        "MSG_A=\"half\"",
        "IF MSG_A==\"half\" GOTOF SKIP1",
        "X999",
        "SKIP1: G0 X1",
    ]);
    assert_eq!(rec.line_xs(), vec![1.0]);
    assert!(rec.ended());
}

#[test]
fn bounding_box_of_a_program() {
    let rec = run(&[
        "G0 X0 Y0 Z0",
        "G1 F100 X10",
        "Y5",
        "Z-2",
        "X0 Y0 Z0",
    ]);
    let mut bbox = BoundingBox::new();
    assert!(!bbox.is_defined());
    for (point, _) in rec.lines() {
        bbox.include(point);
    }
    assert!(bbox.is_defined());
    assert!(close(bbox.lower(), DVec3::new(0.0, 0.0, -2.0)));
    assert!(close(bbox.upper(), DVec3::new(10.0, 5.0, 0.0)));
    assert!(close(bbox.center(), DVec3::new(5.0, 2.5, -1.0)));
}

#[test]
fn demo_programs_interpret_cleanly() {
    let lines: Vec<&str> = include_str!("../demos/spiral.mpf").lines().collect();
    let rec = run(&lines);
    assert_eq!(rec.helices().len(), 1);
    assert_eq!(rec.helices()[0].helix.turn, 3);
    assert_eq!(rec.arcs().len(), 1);
    assert_eq!(rec.lines().len(), 2);
    assert!(rec.ended());

    let lines: Vec<&str> = include_str!("../demos/grid.mpf").lines().collect();
    let rec = run(&lines);
    // 4x3 holes, each a rapid approach, a feed plunge and a rapid retract.
    assert_eq!(rec.lines().len(), 36);
    assert!(rec.ended());
}

#[test]
fn pocket_rows_with_nested_loops() {
    // A 3x2 grid of rapid positioning moves driven by two loop counters.
    let rec = run(&[
        "DEF REAL STEPX=10, STEPY=5",
        "G0 X0 Y0",
        "FOR R1=0 TO 1",
        "FOR R2=0 TO 2",
        "X=R2*STEPX Y=R1*STEPY",
        "ENDFOR",
        "ENDFOR",
    ]);
    let points: Vec<DVec3> = rec.lines().iter().map(|(p, _)| *p).collect();
    assert_eq!(
        points,
        vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(10.0, 0.0, 0.0),
            DVec3::new(20.0, 0.0, 0.0),
            DVec3::new(0.0, 5.0, 0.0),
            DVec3::new(10.0, 5.0, 0.0),
            DVec3::new(20.0, 5.0, 0.0),
        ]
    );
    assert!(rec.ended());
}
