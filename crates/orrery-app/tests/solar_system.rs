//! The shipped catalog driven through the viewer without a window.

use std::path::PathBuf;

use orrery_app::{DragMode, Timeline, Viewer, load_scene};
use orrery_config::{Config, TimelineConfig};

const DAY: f64 = 86_400.0;

fn config() -> Config {
    let mut config = Config::default();
    config.scene.catalog =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/bodies.ron");
    config
}

fn viewer() -> Viewer {
    let config = config();
    let (tree, _) = load_scene(&config).unwrap();
    let viewer = Viewer::new(&config);
    viewer.add_bodies(tree, &config.scene.frame_body, 0.0);
    viewer
}

#[test]
fn catalog_builds_the_whole_system() {
    let (tree, texture_root) = load_scene(&config()).unwrap();
    assert_eq!(tree.len(), 10);
    assert!(texture_root.ends_with("assets"));

    let earth = tree.find("earth").unwrap();
    let moon = tree.find("moon").unwrap();
    assert_eq!(tree[moon].parent(), Some(earth));

    let saturn = tree.find("saturn").unwrap();
    assert!(tree[saturn].has_ring());
    assert_eq!(tree[saturn].bounding_radius(), 140_220.0);
}

#[test]
fn moon_stays_with_earth_over_a_year() {
    let v = viewer();
    for day in (0..365).step_by(7) {
        v.animate(f64::from(day) * DAY);
        let separation = v.with_scene(|tree, _, _| {
            let earth = tree.find("earth").unwrap();
            let moon = tree.find("moon").unwrap();
            (tree[moon].center() - tree[earth].center()).length()
        });
        // Perigee and apogee of an e = 0.0549 orbit.
        assert!(
            (363_000.0..406_000.0).contains(&separation),
            "day {day}: {separation} km"
        );
    }
}

#[test]
fn flying_to_each_planet_frames_it() {
    let v = viewer();
    let names: Vec<String> = v.with_scene(|tree, _, _| tree.names().map(str::to_owned).collect());
    for name in names {
        assert!(v.go_to_object(&name));
        for _ in 0..400 {
            v.advance_camera(0.01);
        }
        assert!(!v.with_camera(|c| c.is_animating()), "{name}");
        assert_eq!(v.selection().as_deref(), Some(name.as_str()));
        assert!(v.distance_to_ground() > 0.0, "{name}");
    }
}

#[test]
fn camera_follows_selection_while_time_runs() {
    let v = viewer();
    let mut timeline = Timeline::starting_at(0.0, &TimelineConfig::default());
    v.go_to_object("mars");
    for _ in 0..300 {
        v.advance_camera(0.01);
    }
    v.drag(40.0, -10.0, DragMode::AroundCenter);
    let altitude = v.distance_to_ground();

    for _ in 0..6 {
        timeline.speed_up();
    }
    for _ in 0..100 {
        timeline.advance(0.02);
        v.animate(timeline.current_time());
    }
    let drift = (v.distance_to_ground() - altitude).abs();
    assert!(drift / altitude < 1e-6, "altitude drifted by {drift} m");
}
