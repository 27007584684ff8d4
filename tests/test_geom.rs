// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use glam::{DMat4, DVec2, DVec3};
use snc::geom::{
    ArcDirection, DirectedArc2, DirectedArc2Sampler, DirectedArc3, DirectedArc3Sampler, Helix,
    HelixSampler,
};

fn close2(a: DVec2, b: DVec2, eps: f64) -> bool {
    (a - b).abs().max_element() <= eps
}

fn close3(a: DVec3, b: DVec3, eps: f64) -> bool {
    (a - b).abs().max_element() <= eps
}

fn rot2(v: DVec2, angle: f64) -> DVec2 {
    DVec2::from_angle(angle).rotate(v)
}

#[test]
fn arc2_from_center() {
    let arc = DirectedArc2::from_center(
        DVec2::new(0.0, 0.0),
        DVec2::new(1.0, 0.0),
        DVec2::new(0.0, 1.0),
        ArcDirection::Clw,
        0.0,
    );
    assert!(arc.is_some());

    // End points at different radii beyond the tolerance.
    let arc = DirectedArc2::from_center(
        DVec2::new(0.0, 0.0),
        DVec2::new(1.1, 0.0),
        DVec2::new(0.0, 1.0),
        ArcDirection::Clw,
        0.09,
    );
    assert!(arc.is_none());
}

#[test]
fn arc2_from_radius() {
    let eps = 1e-14;
    let p1 = DVec2::new(5.0, 5.0);
    let p2 = DVec2::new(10.0, 10.0);

    let arc = DirectedArc2::from_radius(p1, p2, 5.0, ArcDirection::Clw, 0.0).unwrap();
    assert!(close2(arc.center, DVec2::new(10.0, 5.0), eps));

    let arc = DirectedArc2::from_radius(p1, p2, -5.0, ArcDirection::Clw, 0.0).unwrap();
    assert!(close2(arc.center, DVec2::new(5.0, 10.0), eps));

    let arc = DirectedArc2::from_radius(p1, p2, 5.0, ArcDirection::Cclw, 0.0).unwrap();
    assert!(close2(arc.center, DVec2::new(5.0, 10.0), eps));

    let arc = DirectedArc2::from_radius(p1, p2, -5.0, ArcDirection::Cclw, 0.0).unwrap();
    assert!(close2(arc.center, DVec2::new(10.0, 5.0), eps));

    // Diameter smaller than the end point distance.
    let arc = DirectedArc2::from_radius(
        DVec2::new(5.0, 5.0),
        DVec2::new(5.0, 10.0),
        2.49,
        ArcDirection::Clw,
        0.0,
    );
    assert!(arc.is_none());

    // Zero radius never works.
    let arc = DirectedArc2::from_radius(p1, p2, 0.0, ArcDirection::Clw, 0.0);
    assert!(arc.is_none());
}

#[test]
fn arc2_radius_center_is_equidistant() {
    let p1 = DVec2::new(-3.0, 7.0);
    let p2 = DVec2::new(4.0, 1.5);
    for radius in [4.0, -4.0, 20.0] {
        for dir in [ArcDirection::Clw, ArcDirection::Cclw] {
            let arc = DirectedArc2::from_radius(p1, p2, radius, dir, f64::INFINITY).unwrap();
            assert!((arc.center.distance(p1) - arc.center.distance(p2)).abs() < 1e-9);
        }
    }
}

#[test]
fn arc2_from_three_points() {
    let eps = 1e-14;
    let center = DVec2::new(5.0, 10.0);
    let rad = DVec2::new(3.0, 0.0);

    let arc = DirectedArc2::from_three_points(
        center + rot2(rad, 1.0),
        center + rot2(rad, 3.0),
        center + rot2(rad, 6.0),
        0.0,
    )
    .unwrap();
    assert_eq!(arc.dir, ArcDirection::Cclw);
    assert!(close2(arc.center, center, eps));

    let arc = DirectedArc2::from_three_points(
        center + rot2(rad, -1.0),
        center + rot2(rad, -3.0),
        center + rot2(rad, -6.0),
        0.0,
    )
    .unwrap();
    assert_eq!(arc.dir, ArcDirection::Clw);
    assert!(close2(arc.center, center, eps));

    // Collinear points have no circle.
    let arc = DirectedArc2::from_three_points(
        DVec2::new(0.0, 0.0),
        DVec2::new(1.0, 1.0),
        DVec2::new(2.0, 2.0),
        0.0,
    );
    assert!(arc.is_none());
}

#[test]
fn arc2_sampling() {
    let eps = 1e-12;
    let sqrt2_half = std::f64::consts::SQRT_2 * 0.5;

    // Half circle counter-clockwise.
    let arc = DirectedArc2::from_center(
        DVec2::ZERO,
        DVec2::new(1.0, 0.0),
        DVec2::new(-1.0, 0.0),
        ArcDirection::Cclw,
        0.0,
    )
    .unwrap();
    let s = DirectedArc2Sampler::new(&arc);
    assert!(close2(s.sample(0.5), DVec2::new(0.0, 1.0), eps));
    assert!(close2(s.sample(0.25), DVec2::new(sqrt2_half, sqrt2_half), eps));
    assert!(close2(s.sample(0.75), DVec2::new(-sqrt2_half, sqrt2_half), eps));

    // Three quarters counter-clockwise.
    let arc = DirectedArc2::from_center(
        DVec2::ZERO,
        DVec2::new(1.0, 0.0),
        DVec2::new(0.0, -1.0),
        ArcDirection::Cclw,
        0.0,
    )
    .unwrap();
    let s = DirectedArc2Sampler::new(&arc);
    assert!(close2(s.sample(1.0 / 3.0), DVec2::new(0.0, 1.0), eps));
    assert!(close2(s.sample(2.0 / 3.0), DVec2::new(-1.0, 0.0), eps));

    // Coincident end points make a full circle either way.
    let arc = DirectedArc2::from_center(
        DVec2::ZERO,
        DVec2::new(1.0, 0.0),
        DVec2::new(1.0, 0.0),
        ArcDirection::Cclw,
        0.0,
    )
    .unwrap();
    let s = DirectedArc2Sampler::new(&arc);
    assert!(close2(s.sample(0.5), DVec2::new(-1.0, 0.0), eps));
    assert!(close2(s.sample(0.25), DVec2::new(0.0, 1.0), eps));

    let arc = DirectedArc2::from_center(
        DVec2::ZERO,
        DVec2::new(1.0, 0.0),
        DVec2::new(1.0, 0.0),
        ArcDirection::Clw,
        0.0,
    )
    .unwrap();
    let s = DirectedArc2Sampler::new(&arc);
    assert!(close2(s.sample(0.5), DVec2::new(-1.0, 0.0), eps));
    assert!(close2(s.sample(0.25), DVec2::new(0.0, -1.0), eps));

    // Off-center quarter arc.
    let arc = DirectedArc2::from_center(
        DVec2::new(5.0, 2.0),
        DVec2::new(10.0, 2.0),
        DVec2::new(5.0, 7.0),
        ArcDirection::Cclw,
        0.0,
    )
    .unwrap();
    let s = DirectedArc2Sampler::new(&arc);
    assert!(close2(
        s.sample(0.5),
        DVec2::new(5.0 + 5.0 * sqrt2_half, 2.0 + 5.0 * sqrt2_half),
        eps
    ));

    // Major arc with the center below the chord.
    let r: f64 = 20.0;
    let h = r * 30f64.to_radians().cos();
    let arc = DirectedArc2::from_center(
        DVec2::new(r * 0.5, -h),
        DVec2::new(0.0, 0.0),
        DVec2::new(r, 0.0),
        ArcDirection::Cclw,
        0.0,
    )
    .unwrap();
    let s = DirectedArc2Sampler::new(&arc);
    assert!(close2(s.sample(0.5), DVec2::new(r * 0.5, -(r + h)), eps));
}

#[test]
fn arc2_sampler_hits_end_points() {
    let arcs = [
        DirectedArc2::from_radius(
            DVec2::new(5.0, 5.0),
            DVec2::new(10.0, 10.0),
            5.0,
            ArcDirection::Clw,
            0.0,
        )
        .unwrap(),
        DirectedArc2::from_three_points(
            DVec2::new(1.0, 0.0),
            DVec2::new(0.0, 1.0),
            DVec2::new(-1.0, 0.0),
            0.0,
        )
        .unwrap(),
    ];
    for arc in arcs {
        let s = DirectedArc2Sampler::new(&arc);
        assert!(close2(s.sample(0.0), arc.point1, 1e-12));
        assert!(close2(s.sample(1.0), arc.point2, 1e-12));
    }
}

#[test]
fn arc3_from_three_points() {
    let eps = 1e-10;
    let arc = DirectedArc3::from_three_points(
        DVec3::new(5.0, 10.0, 0.0),
        DVec3::new(0.0, 0.0, 20.0),
        DVec3::new(25.0, 1.0, 0.0),
        0.0,
    )
    .unwrap();
    let s = DirectedArc3Sampler::new(&arc);
    assert!(close3(
        s.sample(0.5),
        DVec3::new(9.45778790622, -6.81602687507, 24.17962827310),
        eps
    ));

    let arc = DirectedArc3::from_three_points(
        DVec3::new(10.0, 0.0, 0.0),
        DVec3::new(5.0, 5.0, 0.0),
        DVec3::new(0.0, 0.0, 0.0),
        0.0,
    )
    .unwrap();
    let s = DirectedArc3Sampler::new(&arc);
    assert!(close3(s.sample(0.5), DVec3::new(5.0, 5.0, 0.0), eps));
}

#[test]
fn helix_sampling() {
    let eps = 1e-12;
    let arc = DirectedArc2::from_radius(
        DVec2::new(5.0, 5.0),
        DVec2::new(10.0, 10.0),
        5.0,
        ArcDirection::Clw,
        0.0,
    )
    .unwrap();
    let helix = Helix { arc2: arc, transform: DMat4::IDENTITY, z_start: 0.0, z_end: 5.0, turn: 1 };
    let s = HelixSampler::new(&helix);
    assert!(close3(s.sample(0.2), DVec3::new(10.0, 10.0, 1.0), eps));
    assert!(close3(s.sample(0.4), DVec3::new(15.0, 5.0, 2.0), eps));
    assert!(close3(s.sample(0.6), DVec3::new(10.0, 0.0, 3.0), eps));
    assert!(close3(s.sample(0.8), DVec3::new(5.0, 5.0, 4.0), eps));
    assert!(close3(s.sample(1.0), DVec3::new(10.0, 10.0, 5.0), eps));
}

#[test]
fn helix_planes() {
    // The sampler starts on the z_start plane and ends on the z_end plane,
    // whatever the turn count.
    let arc = DirectedArc2::from_radius(
        DVec2::new(1.0, 0.0),
        DVec2::new(0.0, 1.0),
        1.0,
        ArcDirection::Cclw,
        0.0,
    )
    .unwrap();
    for turn in [0, 1, 4] {
        let helix =
            Helix { arc2: arc, transform: DMat4::IDENTITY, z_start: -2.0, z_end: 3.0, turn };
        let s = HelixSampler::new(&helix);
        assert!((s.sample(0.0).z - -2.0).abs() < 1e-12);
        assert!((s.sample(1.0).z - 3.0).abs() < 1e-12);
        assert!(close2(
            DVec2::new(s.sample(1.0).x, s.sample(1.0).y),
            DVec2::new(0.0, 1.0),
            1e-9
        ));
    }
}
