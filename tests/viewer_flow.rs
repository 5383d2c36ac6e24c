// tests/viewer_flow.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chunkmap_viewer::{
    ChunkCoord, ChunkViewer, DeletionResult, DeletionState, FsGateway, Key, Modifiers, Notice,
    PointerButton, ViewCamera, ViewerConfig, ViewerEvent,
};
use macroquad::prelude::*;

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

fn temp_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let n = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("chunkmap_flow_{nanos}_{n}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_chunk(save: &Path, rel: &str, bytes: usize) {
    let path = save.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, vec![7u8; bytes]).unwrap();
}

/// `saves/alpha` with five chunks: a row of three at y=0, one at (0,1) and a
/// stray at (5,5) inside a sub-folder.
fn fixture() -> (PathBuf, FsGateway) {
    let root = temp_dir();
    let alpha = root.join("saves").join("alpha");
    write_chunk(&alpha, "map_0_0.bin", 100);
    write_chunk(&alpha, "map_1_0.bin", 100);
    write_chunk(&alpha, "map_2_0.bin", 100);
    write_chunk(&alpha, "map_0_1.bin", 50);
    write_chunk(&alpha, "caves/map_5_5.bin", 10);
    fs::create_dir_all(root.join("saves").join("empty")).unwrap();
    let gw = FsGateway::new(root.join("saves"), root.join("backups"));
    (root, gw)
}

fn viewer() -> ChunkViewer<()> {
    ChunkViewer::new(ViewerConfig::default(), vec2(800.0, 600.0))
}

fn open(gw: &mut FsGateway, name: &str) -> ChunkViewer<()> {
    let mut v = viewer();
    v.open_save(name).unwrap();
    v.run_requests(gw);
    v
}

fn screen_of(v: &ChunkViewer<()>, x: f32, y: f32) -> Vec2 {
    v.camera().world_to_screen(vec2(x, y))
}

fn drag(v: &mut ChunkViewer<()>, from: Vec2, to: Vec2, mods: Modifiers) {
    let a = screen_of(v, from.x, from.y);
    let b = screen_of(v, to.x, to.y);
    v.pointer_down(PointerButton::Primary, a, mods);
    v.pointer_move(b, mods);
    v.pointer_up(PointerButton::Primary, b, mods);
}

#[test]
fn opening_a_save_loads_and_fits() {
    let (_root, mut gw) = fixture();
    let mut v = viewer();

    v.refresh_saves();
    assert!(v.saves().is_empty());
    v.run_requests(&mut gw);
    let names: Vec<&str> = v.saves().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["alpha", "empty"]);

    v.open_save("alpha").unwrap();
    // nothing changes until the listing is answered
    assert_eq!(v.opening(), Some("alpha"));
    assert_eq!(v.current_save(), None);

    v.run_requests(&mut gw);
    assert_eq!(v.opening(), None);
    assert_eq!(v.current_save(), Some("alpha"));
    assert_eq!(v.index().len(), 5);
    assert!(!v.limit_reached());
    assert!(v.notice().is_none());

    let stats = v.stats().expect("stats loaded with the save");
    assert_eq!(stats.total_size_bytes, 360);
    assert_eq!(stats.per_folder["caves"].files, 1);

    // every chunk lands inside the viewport after the fit
    for chunk in v.index().iter() {
        let p = screen_of(&v, chunk.x as f32 + 0.5, chunk.y as f32 + 0.5);
        assert!(p.x > 0.0 && p.x < 800.0 && p.y > 0.0 && p.y < 600.0, "{:?}", p);
    }
}

#[test]
fn failed_open_keeps_previous_save() {
    let (_root, mut gw) = fixture();
    let mut v = open(&mut gw, "alpha");

    v.open_save("missing").unwrap();
    v.run_requests(&mut gw);
    assert_eq!(v.current_save(), Some("alpha"));
    assert_eq!(v.index().len(), 5);
    assert!(matches!(v.notice(), Some(Notice::Error(_))));
}

#[test]
fn click_toggles_and_drag_adds_then_subtracts() {
    let (_root, mut gw) = fixture();
    let mut v = open(&mut gw, "alpha");
    let none = Modifiers::default();
    let sub = Modifiers { subtract: true };

    // click on (5,5)
    let p = screen_of(&v, 5.5, 5.5);
    v.pointer_down(PointerButton::Primary, p, none);
    v.pointer_up(PointerButton::Primary, p, none);
    assert!(v.selection().contains(ChunkCoord::new(5, 5)));

    drag(&mut v, vec2(-0.2, -0.2), vec2(2.5, 0.5), none);
    assert_eq!(v.selection().len(), 4);

    drag(&mut v, vec2(1.2, -0.5), vec2(2.5, 0.5), sub);
    assert_eq!(v.selection().keys(), ["0_0", "5_5"]);
}

#[test]
fn panning_does_not_touch_selection() {
    let (_root, mut gw) = fixture();
    let mut v = open(&mut gw, "alpha");
    let before = v.camera().offset;

    v.pointer_down(PointerButton::Middle, vec2(100.0, 100.0), Modifiers::default());
    v.pointer_move(vec2(130.0, 90.0), Modifiers::default());
    v.pointer_up(PointerButton::Middle, vec2(130.0, 90.0), Modifiers::default());

    assert_eq!(v.camera().offset, before + vec2(30.0, -10.0));
    assert!(v.selection().is_empty());
}

#[test]
fn escape_clears_and_select_all_covers_index() {
    let (_root, mut gw) = fixture();
    let mut v = open(&mut gw, "alpha");

    v.key(Key::Char('a'), false);
    assert_eq!(v.selection().len(), 5);
    v.key(Key::Escape, false);
    assert!(v.selection().is_empty());

    // keys are ignored while an input field has focus
    v.key(Key::Char('a'), true);
    assert!(v.selection().is_empty());
}

#[test]
fn truncated_listing_warns_on_open_and_select_all() {
    let (_root, gw) = fixture();
    let mut gw = gw.with_max_chunks(3);
    let mut v = open(&mut gw, "alpha");

    assert!(v.limit_reached());
    assert_eq!(v.index().len(), 3);
    assert!(matches!(v.notice(), Some(Notice::Warning(_))));

    v.dismiss_notice();
    v.key(Key::Char('a'), false);
    assert_eq!(v.selection().len(), 3);
    match v.notice() {
        Some(Notice::Warning(msg)) => assert!(msg.contains("3 loaded chunks"), "{msg}"),
        other => panic!("expected a warning, got {:?}", other),
    }
}

#[test]
fn delete_with_backup_removes_files_and_reloads() {
    let (root, mut gw) = fixture();
    let mut v = open(&mut gw, "alpha");

    drag(&mut v, vec2(-0.2, -0.2), vec2(2.5, 0.5), Modifiers::default());
    assert_eq!(v.selection().len(), 3);

    v.key(Key::Delete, false);
    match v.deletion().state() {
        DeletionState::Confirming { summary, backup } => {
            assert_eq!(summary.count, 3);
            assert_eq!(summary.total_bytes, 300);
            assert!(backup);
        }
        other => panic!("expected confirmation, got {:?}", other),
    }

    // selection keys do nothing while the dialog is open
    v.key(Key::Char('a'), false);
    assert_eq!(v.selection().len(), 3);

    assert_eq!(v.key(Key::Enter, false), ViewerEvent::ConfirmDelete);
    v.confirm_delete().unwrap();
    assert!(v.deletion().is_pending());
    assert!(root.join("saves/alpha/map_1_0.bin").exists());

    let settled = v.run_requests(&mut gw);
    assert_eq!(settled, [DeletionResult::Deleted { count: 3 }]);
    assert!(v.selection().is_empty());
    assert_eq!(v.index().len(), 2);
    assert_eq!(v.deletion().state(), DeletionState::Idle);
    assert!(!root.join("saves/alpha/map_1_0.bin").exists());
    assert!(root.join("saves/alpha/map_0_1.bin").exists());

    let backups: Vec<_> = fs::read_dir(root.join("backups")).unwrap().collect();
    assert_eq!(backups.len(), 1);
    let backup = backups[0].as_ref().unwrap().path();
    assert!(backup.join("map_1_0.bin").exists());
}

#[test]
fn backup_can_be_switched_off() {
    let (root, mut gw) = fixture();
    let mut v = open(&mut gw, "alpha");

    v.key(Key::Char('a'), false);
    v.key(Key::Delete, false);
    v.key(Key::Char('b'), false);
    assert!(matches!(
        v.deletion().state(),
        DeletionState::Confirming { backup: false, .. }
    ));

    v.confirm_delete().unwrap();
    assert_eq!(v.run_requests(&mut gw), [DeletionResult::Deleted { count: 5 }]);
    assert!(v.index().is_empty());
    assert!(!root.join("backups").exists());
}

#[test]
fn cancelled_dialog_keeps_everything() {
    let (root, mut gw) = fixture();
    let mut v = open(&mut gw, "alpha");

    v.key(Key::Char('a'), false);
    v.key(Key::Delete, false);
    assert!(v.deletion().is_open());
    v.key(Key::Escape, false);

    assert_eq!(v.deletion().state(), DeletionState::Idle);
    assert_eq!(v.selection().len(), 5);
    assert!(root.join("saves/alpha/map_0_0.bin").exists());
}

#[test]
fn delete_key_without_selection_opens_nothing() {
    let (_root, mut gw) = fixture();
    let mut v = open(&mut gw, "alpha");

    v.key(Key::Delete, false);
    assert_eq!(v.deletion().state(), DeletionState::Idle);
}

#[test]
fn resize_refits_until_the_camera_moves() {
    let (_root, mut gw) = fixture();
    let mut v = open(&mut gw, "alpha");

    v.resize(vec2(400.0, 300.0));
    let scale_small = v.camera().scale();
    let mut fitted = ViewCamera::default();
    fitted.fit_to_bounds(&v.index().bounds().unwrap(), vec2(400.0, 300.0), 40.0);
    assert!((scale_small - fitted.scale()).abs() < 1e-4);

    v.wheel(vec2(200.0, 150.0), 1.0);
    let scale = v.camera().scale();
    let center = v.camera().screen_to_world(vec2(200.0, 150.0));
    v.resize(vec2(1000.0, 700.0));

    assert!((v.camera().scale() - scale).abs() < 1e-4);
    let after = v.camera().screen_to_world(vec2(500.0, 350.0));
    assert!((after - center).length() < 1e-3);
}

#[test]
fn delete_pressed_mid_drag_waits_for_the_release() {
    let (root, mut gw) = fixture();
    let mut v = open(&mut gw, "alpha");
    let none = Modifiers::default();

    let p = screen_of(&v, 0.5, 0.5);
    v.pointer_down(PointerButton::Primary, p, none);
    v.pointer_up(PointerButton::Primary, p, none);
    assert_eq!(v.selection().keys(), ["0_0"]);

    v.pointer_down(PointerButton::Primary, screen_of(&v, 1.2, 0.2), none);
    v.pointer_move(screen_of(&v, 2.8, 0.8), none);
    v.key(Key::Delete, false);
    assert_eq!(v.deletion().state(), DeletionState::Idle);

    v.pointer_up(PointerButton::Primary, screen_of(&v, 2.8, 0.8), none);
    assert_eq!(v.selection().len(), 3);
    assert!(v.confirm_delete().is_err());
    v.run_requests(&mut gw);
    assert!(root.join("saves/alpha/map_0_0.bin").exists());
    assert!(root.join("saves/alpha/map_2_0.bin").exists());
}

#[test]
fn dialog_opened_mid_drag_deletes_only_what_it_showed() {
    let (root, mut gw) = fixture();
    let mut v = open(&mut gw, "alpha");
    let none = Modifiers::default();

    let p = screen_of(&v, 0.5, 0.5);
    v.pointer_down(PointerButton::Primary, p, none);
    v.pointer_up(PointerButton::Primary, p, none);

    v.pointer_down(PointerButton::Primary, screen_of(&v, 1.2, 0.2), none);
    v.pointer_move(screen_of(&v, 2.8, 0.8), none);
    let summary = v.open_delete_confirm().expect("dialog opens");
    assert_eq!(summary.count, 1);
    assert!(v.controller().drag().is_none());

    // the release lands while the dialog is up and commits nothing
    v.pointer_up(PointerButton::Primary, screen_of(&v, 2.8, 0.8), none);
    assert_eq!(v.selection().keys(), ["0_0"]);

    v.confirm_delete().unwrap();
    assert_eq!(v.run_requests(&mut gw), [DeletionResult::Deleted { count: 1 }]);
    assert!(!root.join("saves/alpha/map_0_0.bin").exists());
    assert!(root.join("saves/alpha/map_1_0.bin").exists());
    assert!(root.join("saves/alpha/map_2_0.bin").exists());
}

#[test]
fn other_button_release_does_not_commit_a_drag() {
    let (_root, mut gw) = fixture();
    let mut v = open(&mut gw, "alpha");
    let none = Modifiers::default();

    v.pointer_down(PointerButton::Primary, screen_of(&v, -0.2, -0.2), none);
    v.pointer_move(screen_of(&v, 1.5, 0.5), none);
    v.pointer_up(PointerButton::Secondary, screen_of(&v, 1.5, 0.5), none);
    assert!(v.selection().is_empty());
    assert!(v.controller().drag().is_some());

    v.pointer_move(screen_of(&v, 2.5, 0.5), none);
    v.pointer_up(PointerButton::Primary, screen_of(&v, 2.5, 0.5), none);
    assert_eq!(v.selection().len(), 3);
}
