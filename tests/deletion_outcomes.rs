// tests/deletion_outcomes.rs

use std::collections::HashSet;

use chunkmap_viewer::gateway::worker::serve;
use chunkmap_viewer::{
    Bounds, Chunk, ChunkCoord, ChunkListing, ChunkViewer, DataGateway, DeleteOutcome,
    DeletionResult, DeletionState, FileRef, GatewayRequest, Key, ListPurpose, Modifiers, Notice,
    PointerButton, Save, SaveStats, ViewerConfig, ViewerError,
};
use macroquad::prelude::*;

/// In-memory gateway; refs in `stuck` survive deletion, `fail` rejects it outright.
#[derive(Default)]
struct MemGateway {
    chunks: Vec<Chunk>,
    stuck: HashSet<FileRef>,
    fail: bool,
    calls: usize,
    deleted: Vec<FileRef>,
}

impl MemGateway {
    fn with_row(n: i32) -> Self {
        MemGateway {
            chunks: (0..n)
                .map(|x| Chunk {
                    x,
                    y: 0,
                    size_bytes: 10,
                    source_tag: ".".into(),
                    file_ref: FileRef(format!("map_{x}_0.bin")),
                })
                .collect(),
            ..MemGateway::default()
        }
    }
}

impl DataGateway for MemGateway {
    fn list_saves(&self) -> Result<Vec<Save>, ViewerError> {
        Ok(vec![Save {
            name: "mem".into(),
            modified: 0,
            chunk_count: self.chunks.len(),
            size_bytes: self.chunks.iter().map(|c| c.size_bytes).sum(),
        }])
    }

    fn list_chunks(&self, save: &str) -> Result<ChunkListing, ViewerError> {
        if save != "mem" {
            return Err(ViewerError::SaveNotFound(save.into()));
        }
        Ok(ChunkListing {
            chunks: self.chunks.clone(),
            bounds: Bounds::from_coords(self.chunks.iter().map(Chunk::coord)),
            limit_reached: false,
        })
    }

    fn get_stats(&self, _save: &str) -> Result<SaveStats, ViewerError> {
        Ok(SaveStats {
            total_size_bytes: self.chunks.iter().map(|c| c.size_bytes).sum(),
            ..SaveStats::default()
        })
    }

    fn delete_chunks(
        &mut self,
        _save: &str,
        refs: &[FileRef],
        _create_backup: bool,
    ) -> Result<DeleteOutcome, ViewerError> {
        self.calls += 1;
        if self.fail {
            return Err(ViewerError::InvalidChunkRef("disk on fire".into()));
        }
        let mut outcome = DeleteOutcome::default();
        for r in refs {
            if self.stuck.contains(r) {
                outcome.failed.push(r.clone());
            } else {
                self.chunks.retain(|c| &c.file_ref != r);
                self.deleted.push(r.clone());
                outcome.deleted_count += 1;
            }
        }
        Ok(outcome)
    }
}

fn open(gw: &mut MemGateway) -> ChunkViewer<()> {
    let mut v = ChunkViewer::new(ViewerConfig::default(), vec2(640.0, 480.0));
    v.open_save("mem").unwrap();
    v.run_requests(gw);
    v
}

#[test]
fn gateway_failure_keeps_selection_and_reports() {
    let mut gw = MemGateway::with_row(4);
    gw.fail = true;
    let mut v = open(&mut gw);

    v.key(Key::Char('a'), false);
    v.key(Key::Delete, false);
    v.confirm_delete().unwrap();
    let settled = v.run_requests(&mut gw);

    assert!(matches!(settled.as_slice(), [DeletionResult::Failed(msg)] if msg.contains("disk on fire")));
    assert_eq!(v.selection().len(), 4);
    assert_eq!(v.index().len(), 4);
    assert_eq!(v.deletion().state(), DeletionState::Idle);
    assert!(matches!(v.notice(), Some(Notice::Error(_))));
}

#[test]
fn partial_deletion_keeps_failed_chunks_selected() {
    let mut gw = MemGateway::with_row(4);
    gw.stuck.insert(FileRef("map_2_0.bin".into()));
    let mut v = open(&mut gw);

    v.key(Key::Char('a'), false);
    v.key(Key::Delete, false);
    v.confirm_delete().unwrap();
    let settled = v.run_requests(&mut gw);

    assert_eq!(settled, [DeletionResult::Partial { deleted: 3, failed: 1 }]);
    assert_eq!(v.index().len(), 1);
    assert_eq!(v.selection().keys(), ["2_0"]);
    assert!(matches!(v.notice(), Some(Notice::Warning(_))));
}

#[test]
fn second_confirm_while_pending_is_rejected() {
    let mut gw = MemGateway::with_row(2);
    let mut v = open(&mut gw);

    v.key(Key::Char('a'), false);
    v.open_delete_confirm().expect("selection is not empty");
    let request = v.begin_delete().unwrap();
    assert_eq!(request.refs.len(), 2);
    assert!(v.deletion().is_pending());

    assert!(matches!(v.begin_delete(), Err(ViewerError::DeleteInProgress)));
    assert!(v.open_delete_confirm().is_none());
    assert_eq!(v.deletion().state(), DeletionState::Pending);
}

#[test]
fn confirm_without_dialog_never_reaches_gateway() {
    let mut gw = MemGateway::with_row(2);
    let mut v = open(&mut gw);
    v.key(Key::Char('a'), false);

    assert!(matches!(v.confirm_delete(), Err(ViewerError::NotConfirming)));
    v.run_requests(&mut gw);
    assert_eq!(gw.calls, 0);
    assert_eq!(v.selection().len(), 2);
}

#[test]
fn stale_selection_entries_are_not_sent() {
    let mut gw = MemGateway::with_row(3);
    let mut v = open(&mut gw);

    v.key(Key::Char('a'), false);
    // chunk vanishes on the server; the viewer reloads and prunes
    gw.chunks.retain(|c| c.coord() != ChunkCoord::new(1, 0));
    v.reload();
    v.run_requests(&mut gw);
    assert_eq!(v.selection().len(), 2);

    v.key(Key::Delete, false);
    v.confirm_delete().unwrap();
    assert_eq!(v.run_requests(&mut gw), [DeletionResult::Deleted { count: 2 }]);
    assert!(gw.chunks.is_empty());
}

#[test]
fn stats_are_polled_on_the_interval() {
    let mut gw = MemGateway::with_row(3);
    let mut v = open(&mut gw);
    assert_eq!(v.stats().unwrap().total_size_bytes, 30);

    gw.chunks.pop();
    v.tick(1.0);
    v.run_requests(&mut gw);
    assert_eq!(v.stats().unwrap().total_size_bytes, 30);

    v.tick(16.0);
    v.run_requests(&mut gw);
    assert_eq!(v.stats().unwrap().total_size_bytes, 20);

    v.teardown();
    gw.chunks.pop();
    v.tick(60.0);
    assert!(v.take_requests().is_empty());
    assert_eq!(v.stats().unwrap().total_size_bytes, 20);
}

#[test]
fn delete_pressed_during_a_drag_never_widens_the_deletion() {
    let mut gw = MemGateway::with_row(10);
    let mut v = open(&mut gw);
    let none = Modifiers::default();
    let at = |v: &ChunkViewer<()>, x: f32, y: f32| v.camera().world_to_screen(vec2(x, y));

    let p = at(&v, 0.5, 0.5);
    v.pointer_down(PointerButton::Primary, p, none);
    v.pointer_up(PointerButton::Primary, p, none);

    v.pointer_down(PointerButton::Primary, at(&v, 1.2, 0.2), none);
    v.pointer_move(at(&v, 9.8, 0.8), none);
    v.key(Key::Delete, false);
    v.pointer_up(PointerButton::Primary, at(&v, 9.8, 0.8), none);

    // the dialog never opened, so there is nothing to confirm
    assert!(v.confirm_delete().is_err());
    v.run_requests(&mut gw);
    assert_eq!(gw.calls, 0);

    // asked again with the settled selection, the dialog and the request agree
    let summary = v.open_delete_confirm().expect("dialog opens");
    v.confirm_delete().unwrap();
    v.run_requests(&mut gw);
    assert_eq!(summary.count, 10);
    assert_eq!(gw.deleted.len(), summary.count);
}

#[test]
fn gateway_work_is_queued_not_run() {
    let mut gw = MemGateway::with_row(2);
    let mut v = ChunkViewer::<()>::new(ViewerConfig::default(), vec2(640.0, 480.0));

    v.open_save("mem").unwrap();
    v.open_save("elsewhere").unwrap();
    let requests = v.take_requests();
    assert_eq!(
        requests,
        [
            GatewayRequest::ListChunks { save: "mem".into(), purpose: ListPurpose::Open },
            GatewayRequest::ListChunks { save: "elsewhere".into(), purpose: ListPurpose::Open },
        ]
    );

    // the first answer is stale: a newer open replaced it
    let mut requests = requests.into_iter();
    v.apply(serve(&mut gw, requests.next().unwrap()));
    assert_eq!(v.current_save(), None);
    assert_eq!(v.opening(), Some("elsewhere"));

    v.apply(serve(&mut gw, requests.next().unwrap()));
    assert_eq!(v.current_save(), None);
    assert_eq!(v.opening(), None);
    assert!(matches!(v.notice(), Some(Notice::Error(_))));
}

#[test]
fn slow_stats_polls_do_not_pile_up() {
    let mut gw = MemGateway::with_row(3);
    let mut v = open(&mut gw);

    v.tick(16.0);
    v.tick(31.0);
    v.tick(46.0);
    let requests = v.take_requests();
    assert_eq!(requests, [GatewayRequest::Stats { save: "mem".into() }]);

    for request in requests {
        v.apply(serve(&mut gw, request));
    }
    v.tick(61.0);
    assert_eq!(v.take_requests().len(), 1);
}

#[test]
fn rendering_goes_on_while_a_deletion_is_out() {
    let mut gw = MemGateway::with_row(3);
    let mut v = open(&mut gw);
    v.key(Key::Char('a'), false);
    v.key(Key::Delete, false);
    v.confirm_delete().unwrap();

    let requests = v.take_requests();
    assert!(matches!(requests.as_slice(), [GatewayRequest::Delete(r)] if r.refs.len() == 3));
    assert_eq!(v.deletion().state(), DeletionState::Pending);
    assert!(matches!(v.open_save("mem"), Err(ViewerError::DeleteInProgress)));

    let frame = v.render();
    assert!(frame.iter().filter_map(|c| c.text()).any(|t| t == "Deleting chunks..."));

    for request in requests {
        let settled = v.apply(serve(&mut gw, request));
        assert_eq!(settled, Some(DeletionResult::Deleted { count: 3 }));
    }
    v.run_requests(&mut gw);
    assert!(v.index().is_empty());
}
