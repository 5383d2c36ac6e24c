//! The chunk map viewer: one owner for camera, index, selection, tiles and
//! the redraw loop.
//!
//! Input goes in through the pointer/key methods, tile completions through
//! [`ChunkViewer::deliver_tiles`]. The viewer never calls the gateway: it
//! queues requests ([`ChunkViewer::take_requests`]) and takes the answers in
//! through [`ChunkViewer::apply`], so a slow listing or deletion never holds
//! up a frame. [`ChunkViewer::frame`] returns a command list only when
//! something asked for a redraw since the last frame.

use crate::camera::ViewCamera;
use crate::command::DrawCommand;
use crate::config::ViewerConfig;
use crate::controller::{
    ControllerAction, InteractionController, Key, KeyContext, Modifiers, PointerButton, ViewContext,
};
use crate::deletion::{DeleteRequest, DeleteSummary, DeletionResult, DeletionWorkflow};
use crate::error::ViewerError;
use crate::gateway::worker::{serve, GatewayReply, GatewayRequest, ListPurpose};
use crate::gateway::{ChunkListing, DataGateway, DeleteOutcome, Save, SaveStats};
use crate::render::hud::HudState;
use crate::render::viewport::hover_target;
use crate::render::{render_viewport, PointerSnapshot, RenderInput};
use crate::scheduler::{RedrawScheduler, TimerId};
use crate::selection::Selection;
use crate::spatial::index::ChunkIndex;
use crate::tile_cache::{TileCache, TileFetcher, TileLoad};
use macroquad::prelude::*;

/// Message shown to the operator until replaced or dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Something finished as asked
    Info(String),
    /// Worked, but not completely
    Warning(String),
    /// An operation failed; state was left as it was
    Error(String),
}

impl Notice {
    /// Text shown in the HUD
    pub fn message(&self) -> &str {
        match self {
            Notice::Info(m) | Notice::Warning(m) | Notice::Error(m) => m,
        }
    }
}

/// Something the embedding application must do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    /// Nothing beyond what the viewer already did
    None,
    /// Operator confirmed the delete dialog; call [`ChunkViewer::confirm_delete`]
    ConfirmDelete,
}

/// Chunk map viewer over images of type `I`.
pub struct ChunkViewer<I> {
    config: ViewerConfig,
    camera: ViewCamera,
    index: ChunkIndex,
    selection: Selection,
    tiles: TileCache<I>,
    controller: InteractionController,
    redraw: RedrawScheduler,
    deletion: DeletionWorkflow,
    viewport: Vec2,
    save: Option<String>,
    saves: Vec<Save>,
    stats: Option<SaveStats>,
    limit_reached: bool,
    notice: Option<Notice>,
    stats_timer: Option<TimerId>,
    stats_in_flight: Option<String>,
    opening: Option<String>,
    outbox: Vec<GatewayRequest>,
    now: f64,
}

impl<I> ChunkViewer<I> {
    /// Empty viewer with a `viewport`-sized canvas; the first frame paints.
    pub fn new(config: ViewerConfig, viewport: Vec2) -> Self {
        let mut redraw = RedrawScheduler::new();
        redraw.request();
        ChunkViewer {
            camera: ViewCamera::new(config.min_scale, config.max_scale),
            index: ChunkIndex::new(),
            selection: Selection::new(),
            tiles: TileCache::new(config.tile_base_url.clone(), config.tile_span),
            controller: InteractionController::new(config.click_threshold, config.wheel_zoom_step),
            redraw,
            deletion: DeletionWorkflow::new(),
            viewport,
            save: None,
            saves: Vec::new(),
            stats: None,
            limit_reached: false,
            notice: None,
            stats_timer: None,
            stats_in_flight: None,
            opening: None,
            outbox: Vec::new(),
            now: 0.0,
            config,
        }
    }

    /// World to screen transform
    pub fn camera(&self) -> &ViewCamera {
        &self.camera
    }

    /// Chunks of the open save
    pub fn index(&self) -> &ChunkIndex {
        &self.index
    }

    /// Selected chunk coordinates
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Pointer and key state
    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// Delete dialog state
    pub fn deletion(&self) -> &DeletionWorkflow {
        &self.deletion
    }

    /// Background tiles
    pub fn tiles(&self) -> &TileCache<I> {
        &self.tiles
    }

    /// Canvas size, pixels
    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// Name of the open save
    pub fn current_save(&self) -> Option<&str> {
        self.save.as_deref()
    }

    /// Last save list received
    pub fn saves(&self) -> &[Save] {
        &self.saves
    }

    /// Last stats received for the open save
    pub fn stats(&self) -> Option<&SaveStats> {
        self.stats.as_ref()
    }

    /// The loaded index is a truncated view of the save.
    pub fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    /// Message on screen, if any
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Remove the message
    pub fn dismiss_notice(&mut self) {
        if self.notice.take().is_some() {
            self.redraw.request();
        }
    }

    /// Paint on the next frame
    pub fn request_redraw(&mut self) {
        self.redraw.request();
    }

    /// A paint is scheduled
    pub fn redraw_pending(&self) -> bool {
        self.redraw.is_pending()
    }

    fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.redraw.request();
    }

    fn report<T>(&mut self, what: &str, result: Result<T, ViewerError>) -> Result<T, ViewerError> {
        if let Err(e) = &result {
            log::error!("{} failed: {}", what, e);
            self.set_notice(Notice::Error(format!("{what} failed: {e}")));
        }
        result
    }

    fn send(&mut self, request: GatewayRequest) {
        if self.redraw.is_shut_down() {
            return;
        }
        log::trace!("queued {:?}", request);
        self.outbox.push(request);
    }

    /// Gateway work queued since the last call, oldest first. Each request
    /// must be answered through [`Self::apply`].
    pub fn take_requests(&mut self) -> Vec<GatewayRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// Answer every queued request with `gateway` on this thread, including
    /// the follow-ups the answers queue (a reload after a deletion, say).
    /// Returns the deletions that settled.
    pub fn run_requests(&mut self, gateway: &mut dyn DataGateway) -> Vec<DeletionResult> {
        let mut settled = Vec::new();
        loop {
            let requests = self.take_requests();
            if requests.is_empty() {
                return settled;
            }
            for request in requests {
                settled.extend(self.apply(serve(gateway, request)));
            }
        }
    }

    /// Save being opened, until its listing arrives
    pub fn opening(&self) -> Option<&str> {
        self.opening.as_deref()
    }

    /// Ask for the save list. On failure the previous list is kept.
    pub fn refresh_saves(&mut self) {
        self.send(GatewayRequest::ListSaves);
    }

    /// Ask to switch to `name`. The current save stays until the listing
    /// arrives, and stays for good if listing fails.
    pub fn open_save(&mut self, name: &str) -> Result<(), ViewerError> {
        if self.deletion.is_pending() {
            return self.report("Opening save", Err(ViewerError::DeleteInProgress));
        }
        self.deletion.cancel();
        self.opening = Some(name.to_owned());
        self.send(GatewayRequest::ListChunks {
            save: name.to_owned(),
            purpose: ListPurpose::Open,
        });
        Ok(())
    }

    /// Ask to re-list the current save, keeping still-present chunks selected.
    pub fn reload(&mut self) {
        if let Some(save) = self.save.clone() {
            self.send(GatewayRequest::ListChunks {
                save,
                purpose: ListPurpose::Reload,
            });
        }
    }

    /// Ask for fresh stats of the current save.
    pub fn refresh_stats(&mut self) {
        if let Some(save) = self.save.clone() {
            self.stats_in_flight = Some(save.clone());
            self.send(GatewayRequest::Stats { save });
        }
    }

    /// Advance the clock and run due timers. A stats poll is skipped while
    /// the previous one is unanswered.
    pub fn tick(&mut self, now: f64) {
        self.now = now;
        let due = self.redraw.poll_timers(now);
        if !self.stats_timer.is_some_and(|id| due.contains(&id)) {
            return;
        }
        if self.stats_in_flight.is_some() && self.stats_in_flight == self.save {
            log::debug!("stats poll skipped; previous one still running");
        } else {
            self.refresh_stats();
        }
    }

    /// Take in a gateway answer. Returns the outcome when `reply` settles a
    /// deletion.
    pub fn apply(&mut self, reply: GatewayReply) -> Option<DeletionResult> {
        match reply {
            GatewayReply::Saves(result) => {
                if let Ok(saves) = self.report("Listing saves", result) {
                    log::debug!("{} saves listed", saves.len());
                    self.saves = saves;
                    self.redraw.request();
                }
            }
            GatewayReply::Chunks {
                save,
                purpose: ListPurpose::Open,
                result,
            } => self.apply_open(save, result),
            GatewayReply::Chunks {
                save,
                purpose: ListPurpose::Reload,
                result,
            } => self.apply_reload(save, result),
            GatewayReply::Stats { save, result } => self.apply_stats(save, result),
            GatewayReply::Deleted(result) => return Some(self.finish_delete(result)),
        }
        None
    }

    fn apply_open(&mut self, name: String, result: Result<ChunkListing, ViewerError>) {
        if self.opening.as_deref() != Some(name.as_str()) {
            log::debug!("dropping listing of '{}'; another save was asked for since", name);
            return;
        }
        self.opening = None;
        let Ok(listing) = self.report("Loading chunks", result) else {
            return;
        };
        log::info!(
            "opened save '{}' with {} chunks{}",
            name,
            listing.chunks.len(),
            if listing.limit_reached { " (truncated)" } else { "" }
        );

        self.index.load(listing.chunks);
        self.selection.clear();
        self.controller.reset();
        self.deletion.cancel();
        self.limit_reached = listing.limit_reached;
        self.notice = listing.limit_reached.then(|| {
            Notice::Warning(format!(
                "Only the first {} chunks of '{}' are loaded",
                self.index.len(),
                name
            ))
        });
        self.save = Some(name);
        self.stats = None;
        self.fit();

        if let Some(id) = self.stats_timer.take() {
            self.redraw.cancel(id);
        }
        self.stats_timer = self.redraw.add_interval(self.config.stats_refresh_secs, self.now);
        self.refresh_stats();
    }

    fn apply_reload(&mut self, name: String, result: Result<ChunkListing, ViewerError>) {
        if self.save.as_deref() != Some(name.as_str()) {
            log::debug!("dropping reload of '{}'; it is no longer open", name);
            return;
        }
        let Ok(listing) = self.report("Reloading chunks", result) else {
            return;
        };
        self.index.load(listing.chunks);
        self.selection.retain_loaded(&self.index);
        self.limit_reached = listing.limit_reached;
        if !self.controller.camera_moved() {
            self.fit();
        }
        self.redraw.request();
    }

    fn apply_stats(&mut self, name: String, result: Result<SaveStats, ViewerError>) {
        if self.stats_in_flight.as_deref() == Some(name.as_str()) {
            self.stats_in_flight = None;
        }
        if self.save.as_deref() != Some(name.as_str()) {
            return;
        }
        // display-only; a failure keeps the old numbers
        if let Ok(stats) = self.report("Loading stats", result) {
            self.stats = Some(stats);
            self.redraw.request();
        }
    }

    /// Fit the camera to the loaded bounds.
    pub fn fit(&mut self) {
        if let Some(bounds) = self.index.bounds() {
            self.camera
                .fit_to_bounds(&bounds, self.viewport, self.config.fit_padding);
        }
        self.controller.mark_fitted();
        self.redraw.request();
    }

    /// Canvas size changed. Refits unless the operator has moved the camera,
    /// in which case the world point at the centre stays put.
    pub fn resize(&mut self, viewport: Vec2) {
        if viewport == self.viewport {
            return;
        }
        let center = self.camera.screen_to_world(self.viewport * 0.5);
        self.viewport = viewport;
        if self.controller.camera_moved() {
            self.camera.center_on(center, viewport);
            self.redraw.request();
        } else {
            self.fit();
        }
    }

    fn drive<R>(&mut self, f: impl FnOnce(&mut InteractionController, &mut ViewContext<'_>) -> R) -> R {
        let mut cx = ViewContext {
            camera: &mut self.camera,
            index: &self.index,
            selection: &mut self.selection,
            redraw: &mut self.redraw,
        };
        f(&mut self.controller, &mut cx)
    }

    fn modal_open(&self) -> bool {
        self.deletion.is_open()
    }

    /// Button pressed over the canvas; ignored while the dialog is open.
    pub fn pointer_down(&mut self, button: PointerButton, screen: Vec2, mods: Modifiers) {
        if self.modal_open() {
            return;
        }
        let action = self.drive(|c, cx| c.pointer_down(cx, button, screen, mods));
        self.handle(action);
    }

    /// Pointer moved over the canvas
    pub fn pointer_move(&mut self, screen: Vec2, mods: Modifiers) {
        self.drive(|c, cx| c.pointer_move(cx, screen, mods));
    }

    /// Button released. While the dialog is open nothing is committed.
    pub fn pointer_up(&mut self, button: PointerButton, screen: Vec2, mods: Modifiers) {
        if self.modal_open() {
            self.controller.abandon_drag();
            return;
        }
        let action = self.drive(|c, cx| c.pointer_up(cx, button, screen, mods));
        self.handle(action);
    }

    /// Pointer left the canvas; a drag is committed unless the dialog is open.
    pub fn pointer_leave(&mut self) {
        if self.modal_open() {
            self.controller.abandon_drag();
        }
        let action = self.drive(|c, cx| c.pointer_leave(cx));
        self.handle(action);
    }

    /// Wheel over the canvas; positive `delta` zooms in.
    pub fn wheel(&mut self, screen: Vec2, delta: f32) {
        if self.modal_open() {
            return;
        }
        self.drive(|c, cx| c.wheel(cx, screen, delta));
    }

    /// Keyboard input. While the delete dialog is open only its own keys work.
    pub fn key(&mut self, key: Key, input_focused: bool) -> ViewerEvent {
        if input_focused {
            return ViewerEvent::None;
        }
        if self.deletion.is_open() {
            match key {
                Key::Escape => {
                    self.deletion.cancel();
                    self.redraw.request();
                }
                Key::Char('b') | Key::Char('B') => {
                    self.deletion.toggle_backup();
                    self.redraw.request();
                }
                Key::Enter if !self.deletion.is_pending() => return ViewerEvent::ConfirmDelete,
                _ => {}
            }
            return ViewerEvent::None;
        }

        let focus = KeyContext {
            modal_open: self.modal_open(),
            input_focused,
        };
        let action = self.drive(|c, cx| c.key(cx, key, focus));
        self.handle(action);
        ViewerEvent::None
    }

    fn handle(&mut self, action: ControllerAction) {
        match action {
            ControllerAction::SelectedAll | ControllerAction::Inverted if self.limit_reached => {
                self.set_notice(Notice::Warning(format!(
                    "Selection covers only the {} loaded chunks; this save has more that are not loaded",
                    self.index.len()
                )));
            }
            ControllerAction::OpenDeleteConfirm => {
                self.open_delete_confirm();
            }
            ControllerAction::FitRequested => self.fit(),
            _ => {}
        }
    }

    /// Show the delete confirmation for the current selection. A drag in
    /// progress is dropped, so the dialog shows a settled selection.
    pub fn open_delete_confirm(&mut self) -> Option<DeleteSummary> {
        if self.opening.is_some() {
            return None;
        }
        self.save.as_ref()?;
        if self.deletion.is_open() {
            return None;
        }
        self.controller.abandon_drag();
        let summary = self.deletion.open(&self.selection, &self.index)?;
        self.redraw.request();
        Some(summary)
    }

    /// Flip the dialog's backup flag
    pub fn toggle_backup(&mut self) {
        self.deletion.toggle_backup();
        self.redraw.request();
    }

    /// Close the dialog without deleting
    pub fn cancel_delete(&mut self) {
        self.deletion.cancel();
        self.redraw.request();
    }

    /// Confirm the dialog and mark the deletion pending. The request must be
    /// answered with [`Self::finish_delete`].
    pub fn begin_delete(&mut self) -> Result<DeleteRequest, ViewerError> {
        let Some(save) = self.save.clone() else {
            return Err(ViewerError::NotConfirming);
        };
        let request = self.deletion.confirm(&save)?;
        log::info!(
            "deleting {} chunks from '{}' (backup: {})",
            request.refs.len(),
            save,
            request.create_backup
        );
        self.redraw.request();
        Ok(request)
    }

    /// Settle a pending deletion, then ask for a reload when anything changed
    /// and for fresh stats.
    pub fn finish_delete(&mut self, result: Result<DeleteOutcome, ViewerError>) -> DeletionResult {
        let outcome = self.deletion.complete(result, &mut self.selection);
        match &outcome {
            DeletionResult::Deleted { count } => {
                self.set_notice(Notice::Info(format!("Deleted {count} chunks")));
                self.reload();
            }
            DeletionResult::Partial { deleted, failed } => {
                log::warn!("partial deletion: {} deleted, {} failed", deleted, failed);
                self.set_notice(Notice::Warning(format!(
                    "Deleted {deleted} chunks; {failed} could not be deleted and stay selected"
                )));
                self.reload();
            }
            DeletionResult::Failed(msg) => {
                self.set_notice(Notice::Error(format!("Delete failed: {msg}")));
            }
        }
        self.refresh_stats();
        self.redraw.request();
        outcome
    }

    /// Confirm the dialog and queue the deletion for the gateway.
    pub fn confirm_delete(&mut self) -> Result<(), ViewerError> {
        let request = self.begin_delete()?;
        self.send(GatewayRequest::Delete(request));
        Ok(())
    }

    /// Feed finished tile fetches into the cache.
    pub fn deliver_tiles<L: IntoIterator<Item = TileLoad<I>>>(&mut self, loads: L) {
        for load in loads {
            if self.tiles.resolve(load) {
                self.redraw.request();
            }
        }
    }

    /// Paint if a redraw is pending: request missing tiles for the visible
    /// area, then render. Returns `None` when nothing changed.
    pub fn frame<F: TileFetcher<I> + ?Sized>(&mut self, fetcher: &mut F) -> Option<Vec<DrawCommand>> {
        if !self.redraw.take() {
            return None;
        }
        if self.tiles.visible_at(self.camera.scale()) {
            let view = self.camera.visible_world_rect(self.viewport);
            self.tiles.request_visible(&view, fetcher);
        }
        Some(self.render())
    }

    /// Render the current state unconditionally.
    pub fn render(&self) -> Vec<DrawCommand> {
        let input = RenderInput {
            camera: &self.camera,
            index: &self.index,
            tiles: &self.tiles,
            selection: &self.selection,
            pointer: PointerSnapshot {
                hover: self.controller.hover(),
                drag: self.controller.drag(),
                subtract: self.controller.subtracting(),
            },
            viewport: self.viewport,
            hud: HudState {
                save: self.save.as_deref(),
                tool: self.controller.tool(),
                loaded: self.index.len(),
                selected: self.selection.len(),
                selected_bytes: self.index.total_selected_size(&self.selection),
                hover: hover_target(&self.index, self.controller.hover()),
                stats: self.stats.as_ref(),
                limit_reached: self.limit_reached,
                notice: self.notice.as_ref(),
                deletion: self.deletion.state(),
            },
        };
        render_viewport(&input)
    }

    /// Release the pending frame, timers and unsent requests. The viewer
    /// paints and queues nothing afterwards.
    pub fn teardown(&mut self) {
        self.redraw.shutdown();
        self.stats_timer = None;
        self.outbox.clear();
    }
}
