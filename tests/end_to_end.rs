use std::time::Duration;

use anyhow::anyhow;
use glam::{vec2, vec3, Vec3};
use splatwalk::{
    animation::{AnimationClip, IDLE, WALK},
    asset::{LoadResult, LoadingAsset},
    avatar::{Avatar, Material, ModelNode, ModelTree, NodeKind, Surface},
    config::{ControlMode, ViewerConfig},
    placement::Framing,
    Aabb, Color, InputCommand, PhysicalSize, SplatCloud, Transform, Viewer,
};

fn walking() -> InputCommand {
    InputCommand {
        move_axis: vec2(0.0, -1.0),
        movement_held: true,
        ..InputCommand::IDLE
    }
}

fn box_avatar(height: f32) -> Avatar {
    let mut tree = ModelTree::new();
    tree.push(
        None,
        ModelNode {
            name: "Body".into(),
            kind: NodeKind::SkinnedMesh(smallvec::smallvec![Surface {
                bounds: Aabb::new(vec3(-0.3, 0.0, -0.2), vec3(0.3, height, 0.2)),
                material: Material {
                    base_color: Color::WHITE,
                    roughness: 1.0,
                    metalness: 0.0,
                    textured: false,
                },
                shadows: false,
            }]),
            local: Transform::IDENTITY,
            children: vec![],
        },
    );
    Avatar::new(tree)
}

fn third_person_with_avatar() -> Viewer {
    let mut viewer = Viewer::new(
        ViewerConfig::new(ControlMode::ThirdPerson),
        PhysicalSize::new(1280, 720),
    );
    let (avatar_tx, avatar) = LoadingAsset::channel("avatar");
    viewer.track_avatar(avatar);
    avatar_tx.finish(LoadResult::Ready(box_avatar(180.0)));
    viewer.step(&InputCommand::IDLE, Duration::ZERO);
    viewer
}

#[test]
fn walking_forward_for_one_second_moves_two_units() {
    let mut viewer = third_person_with_avatar();
    let start = viewer.controller.avatar.map(|a| a.position).unwrap_or(Vec3::NAN);
    assert_eq!(start, Vec3::ZERO);

    for _ in 0..10 {
        viewer.step(&walking(), Duration::from_millis(100));
    }
    let end = viewer.controller.avatar.map(|a| a.position).unwrap_or(Vec3::NAN);
    let moved = end - start;
    assert!((moved.length() - 2.0).abs() < 1e-4, "moved {moved}");
    assert!((moved - vec3(0.0, 0.0, -2.0)).length() < 1e-4);
    assert_eq!(end.y, 0.0);

    // the scene node follows the pose and the avatar stands 1.8 tall on the ground
    let node = viewer.avatar_node().and_then(|id| viewer.scene.node(id)).map(|n| n.world_bounds());
    let bounds = node.unwrap_or(Aabb::EMPTY);
    assert!((bounds.size().y - 1.8).abs() < 1e-4);
    assert!(bounds.min.y.abs() < 1e-4);
    assert!((bounds.center().z - end.z).abs() < 1e-4);
}

#[test]
fn auto_frame_places_camera_above_and_behind() {
    let mut viewer = Viewer::new(ViewerConfig::default().without_avatar(), PhysicalSize::new(800, 600));
    let (splat_tx, splat) = LoadingAsset::channel("splat");
    viewer.track_splat(splat);
    // symmetric around the origin, so the flip leaves the box unchanged
    splat_tx.finish(LoadResult::Ready(SplatCloud::new(vec![
        vec3(-5.0, -2.0, -5.0),
        vec3(5.0, 2.0, 5.0),
    ])));
    viewer.step(&InputCommand::IDLE, Duration::from_millis(16));

    assert!(matches!(viewer.framing(), Some(Framing::Framed { .. })));
    assert!((viewer.camera.position - vec3(0.0, 6.0, 15.0)).length() < 1e-4);
    let to_center = (Vec3::ZERO - viewer.camera.position).normalize();
    assert!((viewer.camera.forward() - to_center).length() < 1e-4);

    // mouse-look picks up from the framed orientation
    let forward = viewer.camera.forward();
    viewer.step(&InputCommand::IDLE, Duration::from_millis(16));
    assert!((viewer.camera.forward() - forward).length() < 1e-4);
}

#[test]
fn crossfade_to_unloaded_clip_is_ignored() {
    let mut viewer = third_person_with_avatar();
    let (idle_tx, idle) = LoadingAsset::channel("idle");
    let (walk_tx, walk) = LoadingAsset::channel("walk");
    viewer.track_clip(IDLE, idle);
    viewer.track_clip(WALK, walk);
    idle_tx.finish(LoadResult::Ready(AnimationClip::new(IDLE, 2.0)));
    walk_tx.finish(LoadResult::<AnimationClip>::Failed(anyhow!("no such file")));
    viewer.step(&InputCommand::IDLE, Duration::from_millis(16));
    assert_eq!(viewer.controller.animation.active_clip_name(), Some(IDLE));

    for _ in 0..5 {
        viewer.step(&walking(), Duration::from_millis(50));
        assert_eq!(viewer.controller.animation.active_clip_name(), Some(IDLE));
        assert!(!viewer.controller.animation.crossfade_in_progress());
    }
    // the avatar still walks even though the clip is missing
    let z = viewer.controller.avatar.map(|a| a.position.z).unwrap_or_default();
    assert!(z < 0.0);
}

#[test]
fn walking_crossfades_and_hands_blend_to_the_avatar_node() {
    let mut viewer = third_person_with_avatar();
    for name in [IDLE, WALK] {
        let (tx, loading) = LoadingAsset::channel(name);
        viewer.track_clip(name, loading);
        tx.finish(LoadResult::Ready(AnimationClip::new(name, 1.0)));
    }
    viewer.step(&InputCommand::IDLE, Duration::from_millis(16));
    viewer.step(&walking(), Duration::from_millis(100));

    let blend = viewer
        .avatar_node()
        .and_then(|id| viewer.scene.node(id))
        .map(|node| match &node.content {
            splatwalk::NodeContent::Avatar(avatar) => avatar.blend.clone(),
            splatwalk::NodeContent::Splat(_) => Default::default(),
        })
        .unwrap_or_default();
    assert_eq!(blend.len(), 2);
    let total: f32 = blend.iter().map(|s| s.weight).sum();
    assert!((total - 1.0).abs() < 1e-5);
}
