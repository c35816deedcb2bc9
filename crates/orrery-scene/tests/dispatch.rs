//! Per-mode draw dispatch and pass ordering.

use glam::{DAffine3, DVec3};
use orrery_scene::{
    BodyCatalog, BodyIndex, BodyNode, BodyRecord, BodyTree, RenderMode, RenderSettings,
    RenderVisitor, ScreenMetrics, Shading, draw_all, draw_scene, id_to_color, sort_near_to_far,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Axis(String, f64),
    Sphere(String, Shading),
    Ring(String, Shading),
    Orbit(String, f32),
    Point(String, Shading),
    Label(String, Shading),
}

#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
}

impl RenderVisitor for Recorder {
    fn axis(&mut self, body: &BodyNode, _frame: &DAffine3, length: f64) {
        self.calls.push(Call::Axis(body.name().into(), length));
    }
    fn sphere(&mut self, body: &BodyNode, _frame: &DAffine3, shading: Shading) {
        self.calls.push(Call::Sphere(body.name().into(), shading));
    }
    fn ring(&mut self, body: &BodyNode, _frame: &DAffine3, shading: Shading) {
        self.calls.push(Call::Ring(body.name().into(), shading));
    }
    fn orbit(&mut self, body: &BodyNode, _frame: &DAffine3, alpha: f32) {
        self.calls.push(Call::Orbit(body.name().into(), alpha));
    }
    fn point(&mut self, body: &BodyNode, _frame: &DAffine3, shading: Shading) {
        self.calls.push(Call::Point(body.name().into(), shading));
    }
    fn label(&mut self, body: &BodyNode, _frame: &DAffine3, shading: Shading) {
        self.calls.push(Call::Label(body.name().into(), shading));
    }
}

fn tree() -> BodyTree {
    let mut c = BodyCatalog::new();
    c.insert(
        "sun",
        BodyRecord {
            radius: Some(700.0),
            light_source: Some(true),
            satellites: Some("saturn:rock".into()),
            ..Default::default()
        },
    );
    c.insert(
        "saturn",
        BodyRecord {
            radius: Some(60.0),
            ring_texture: Some("rings.png".into()),
            inner_radius: Some(70.0),
            outer_radius: Some(140.0),
            semi_major_axis: Some(10_000.0),
            sidereal_revolution: Some(100.0),
            ..Default::default()
        },
    );
    c.insert(
        "rock",
        BodyRecord {
            radius: Some(1.0),
            semi_major_axis: Some(20_000.0),
            sidereal_revolution: Some(200.0),
            ..Default::default()
        },
    );
    let mut tree = BodyTree::build(&c, "sun").unwrap();
    tree.set_time(DAffine3::IDENTITY, 0.0);
    tree
}

fn set_screen(tree: &mut BodyTree, name: &str, radius: i32, distance_to_parent: i32) -> BodyIndex {
    let index = tree.find(name).unwrap();
    tree.get_mut(index).unwrap().set_screen(ScreenMetrics {
        radius,
        distance_to_parent,
    });
    index
}

fn render(tree: &BodyTree, index: BodyIndex, mode: RenderMode, settings: &RenderSettings) -> Vec<Call> {
    let mut rec = Recorder::default();
    tree[index].render(mode, settings, &mut rec);
    rec.calls
}

#[test]
fn opaque_large_body_draws_sphere_and_optional_axis() {
    let mut t = tree();
    let saturn = set_screen(&mut t, "saturn", 50, 500);
    let mut settings = RenderSettings::default();
    assert_eq!(
        render(&t, saturn, RenderMode::Opaque, &settings),
        vec![Call::Sphere("saturn".into(), Shading::OPAQUE)]
    );
    settings.show_axis = true;
    assert_eq!(
        render(&t, saturn, RenderMode::Opaque, &settings),
        vec![
            Call::Axis("saturn".into(), 120.0),
            Call::Sphere("saturn".into(), Shading::OPAQUE)
        ]
    );
}

#[test]
fn opaque_small_body_draws_nothing() {
    let mut t = tree();
    let rock = set_screen(&mut t, "rock", 3, 500);
    assert!(render(&t, rock, RenderMode::Opaque, &RenderSettings::default()).is_empty());
}

#[test]
fn translucent_large_body_draws_orbit_and_ring() {
    let mut t = tree();
    let saturn = set_screen(&mut t, "saturn", 50, 500);
    let mut settings = RenderSettings::default();
    assert_eq!(
        render(&t, saturn, RenderMode::Translucent, &settings),
        vec![
            Call::Orbit("saturn".into(), 1.0),
            Call::Ring("saturn".into(), Shading::OPAQUE)
        ]
    );
    settings.show_orbits = false;
    assert_eq!(
        render(&t, saturn, RenderMode::Translucent, &settings),
        vec![Call::Ring("saturn".into(), Shading::OPAQUE)]
    );
}

#[test]
fn translucent_small_body_crossfades_point_orbit_label() {
    let mut t = tree();
    let rock = set_screen(&mut t, "rock", 3, 30);
    let half = Shading::Standard { alpha: 0.5 };
    assert_eq!(
        render(&t, rock, RenderMode::Translucent, &RenderSettings::default()),
        vec![
            Call::Point("rock".into(), half),
            Call::Orbit("rock".into(), 0.5),
            Call::Label("rock".into(), half),
        ]
    );
}

#[test]
fn root_point_is_fully_opaque_and_has_no_orbit() {
    let mut t = tree();
    let sun = set_screen(&mut t, "sun", 2, -1);
    assert_eq!(
        render(&t, sun, RenderMode::Translucent, &RenderSettings::default()),
        vec![
            Call::Point("sun".into(), Shading::OPAQUE),
            Call::Label("sun".into(), Shading::OPAQUE),
        ]
    );
}

#[test]
fn body_crowding_its_parent_is_skipped_in_every_mode() {
    let mut t = tree();
    let rock = set_screen(&mut t, "rock", 50, 19);
    for mode in [
        RenderMode::Opaque,
        RenderMode::Translucent,
        RenderMode::Picking,
        RenderMode::LightSource,
    ] {
        assert!(render(&t, rock, mode, &RenderSettings::default()).is_empty(), "{mode:?}");
    }
}

#[test]
fn picking_uses_id_color() {
    let mut t = tree();
    let saturn = set_screen(&mut t, "saturn", 50, 500);
    let rock = set_screen(&mut t, "rock", 3, 500);
    let settings = RenderSettings::default();

    let saturn_color = Shading::Solid(id_to_color(t[saturn].id()));
    assert_eq!(
        render(&t, saturn, RenderMode::Picking, &settings),
        vec![Call::Sphere("saturn".into(), saturn_color)]
    );

    let rock_color = Shading::Solid(id_to_color(t[rock].id()));
    assert_eq!(
        render(&t, rock, RenderMode::Picking, &settings),
        vec![
            Call::Point("rock".into(), rock_color),
            Call::Label("rock".into(), rock_color),
        ]
    );
}

#[test]
fn light_source_pass_draws_silhouettes() {
    let mut t = tree();
    let sun = set_screen(&mut t, "sun", 1, -1);
    let saturn = set_screen(&mut t, "saturn", 0, 500);
    let rock = set_screen(&mut t, "rock", 2, 500);
    let settings = RenderSettings::default();

    assert_eq!(
        render(&t, sun, RenderMode::LightSource, &settings),
        vec![Call::Sphere("sun".into(), Shading::OPAQUE)]
    );
    // Rings draw even when the body itself is sub-pixel.
    assert_eq!(
        render(&t, saturn, RenderMode::LightSource, &settings),
        vec![Call::Ring("saturn".into(), Shading::BLACK)]
    );
    assert_eq!(
        render(&t, rock, RenderMode::LightSource, &settings),
        vec![Call::Sphere("rock".into(), Shading::BLACK)]
    );
}

#[test]
fn scene_draws_opaque_near_to_far_then_translucent_far_to_near() {
    let mut t = tree();
    for name in ["sun", "saturn", "rock"] {
        let dist = if name == "sun" { -1 } else { 500 };
        set_screen(&mut t, name, 50, dist);
    }
    // Camera beside the rock: rock, then saturn, then the sun.
    let rock_center = t[t.find("rock").unwrap()].center();
    let camera = rock_center + rock_center.normalize() * 10.0;
    let order = sort_near_to_far(&t, camera);
    let names: Vec<_> = order.iter().map(|&i| t[i].name().to_owned()).collect();
    assert_eq!(names, ["rock", "saturn", "sun"]);

    let mut rec = Recorder::default();
    draw_scene(&t, &order, &RenderSettings::default(), &mut rec);
    let spheres: Vec<_> = rec
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Sphere(n, _) => Some(n.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(spheres, ["rock", "saturn", "sun"]);
    let orbits: Vec<_> = rec
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Orbit(n, _) => Some(n.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(orbits, ["saturn", "rock"]);
}

#[test]
fn screen_metrics_follow_camera_distance() {
    let mut t = tree();
    let saturn = t.find("saturn").unwrap();
    let center = t[saturn].center();
    let near = center + DVec3::new(0.0, 0.0, 1_000.0);
    t.update_screen_metrics(near, std::f64::consts::FRAC_PI_4, 720.0);
    let close = t[saturn].screen();
    t.update_screen_metrics(near * 10.0, std::f64::consts::FRAC_PI_4, 720.0);
    let far = t[saturn].screen();
    assert!(close.radius > far.radius);
    assert_eq!(t[t.root().unwrap()].screen().distance_to_parent, -1);
    assert!(close.distance_to_parent >= 0);

    let mut rec = Recorder::default();
    draw_all(&t, RenderMode::Picking, &RenderSettings::default(), &mut rec);
    assert!(!rec.calls.is_empty());
}
