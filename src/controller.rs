//! Pointer and keyboard handling for the chunk map.
//!
//! `Idle -> Panning -> Idle` moves the camera, `Idle -> Selecting -> Idle`
//! tracks a drag rectangle and commits it on release or when the pointer
//! leaves the canvas. The wheel zooms in any state.

use crate::camera::ViewCamera;
use crate::scheduler::RedrawScheduler;
use crate::selection::{CommitOutcome, DragRect, Selection, DEFAULT_CLICK_THRESHOLD};
use crate::spatial::index::ChunkIndex;
use macroquad::prelude::*;

/// Discrete tool picked with the digit keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    /// Primary drag selects
    #[default]
    Select,
    /// Primary drag pans
    Pan,
}

impl ToolMode {
    /// `1` selects, `2` pans.
    pub fn from_digit(d: u8) -> Option<Self> {
        match d {
            1 => Some(ToolMode::Select),
            2 => Some(ToolMode::Pan),
            _ => None,
        }
    }

    /// Name shown in the HUD
    pub fn label(self) -> &'static str {
        match self {
            ToolMode::Select => "select",
            ToolMode::Pan => "pan",
        }
    }
}

/// Mouse button, independent of the windowing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Left button; selects in the select tool
    Primary,
    /// Always pans
    Middle,
    /// Always pans
    Secondary,
}

/// Held modifier keys relevant to selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Subtract from the selection instead of adding / toggling
    pub subtract: bool,
}

/// Keys the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Clear the selection, or close the delete dialog
    Escape,
    /// Confirm the delete dialog
    Enter,
    /// Ask to delete the selection
    Delete,
    /// Tool switch
    Digit(u8),
    /// Letter shortcuts, matched case-insensitively
    Char(char),
}

/// Where keyboard focus currently is; keys are ignored unless the map has it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyContext {
    /// A dialog owns the keyboard
    pub modal_open: bool,
    /// A text field owns the keyboard
    pub input_focused: bool,
}

/// Pointer gesture in progress. Each gesture remembers the button that
/// started it; only that button's release ends it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    /// No button held
    Idle,
    /// Camera follows the pointer
    Panning {
        /// Last pointer position, screen pixels
        last: Vec2,
        /// Button that started the pan
        button: PointerButton,
    },
    /// Rubber-band selection
    Selecting {
        /// Rectangle in world units
        drag: DragRect,
        /// Button that started the drag
        button: PointerButton,
    },
}

impl DragState {
    fn button(&self) -> Option<PointerButton> {
        match *self {
            DragState::Idle => None,
            DragState::Panning { button, .. } | DragState::Selecting { button, .. } => Some(button),
        }
    }
}

/// Side effect the owner of the controller has to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerAction {
    /// Nothing to do
    None,
    /// A click or drag changed the selection
    Committed(CommitOutcome),
    /// Selection cleared with `Escape`
    Cleared,
    /// Every loaded chunk selected
    SelectedAll,
    /// Selection inverted over the loaded chunks
    Inverted,
    /// Tool switched with a digit key
    ToolChanged(ToolMode),
    /// `Delete` pressed with a non-empty selection and no gesture in progress
    OpenDeleteConfirm,
    /// `f` pressed
    FitRequested,
}

/// Mutable state the controller drives.
pub struct ViewContext<'a> {
    /// Camera panned and zoomed by gestures
    pub camera: &'a mut ViewCamera,
    /// Loaded chunks, for commits and select-all
    pub index: &'a ChunkIndex,
    /// Selection edited by commits and keys
    pub selection: &'a mut Selection,
    /// Redraw requests land here
    pub redraw: &'a mut RedrawScheduler,
}

/// Turns pointer, wheel and key events into camera moves and selection edits.
#[derive(Debug, Clone)]
pub struct InteractionController {
    tool: ToolMode,
    state: DragState,
    hover: Option<Vec2>,
    modifiers: Modifiers,
    click_threshold: f32,
    wheel_step: f32,
    camera_moved: bool,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(DEFAULT_CLICK_THRESHOLD, 1.15)
    }
}

impl InteractionController {
    /// `click_threshold` in world units, `wheel_step` as a zoom factor per notch.
    pub fn new(click_threshold: f32, wheel_step: f32) -> Self {
        InteractionController {
            tool: ToolMode::Select,
            state: DragState::Idle,
            hover: None,
            modifiers: Modifiers::default(),
            click_threshold,
            wheel_step,
            camera_moved: false,
        }
    }

    /// Active tool
    pub fn tool(&self) -> ToolMode {
        self.tool
    }

    /// Switch tool
    pub fn set_tool(&mut self, tool: ToolMode) {
        self.tool = tool;
    }

    /// Gesture in progress
    pub fn state(&self) -> DragState {
        self.state
    }

    /// World point under the pointer while idle; display only.
    pub fn hover(&self) -> Option<Vec2> {
        self.hover
    }

    /// In-progress selection rectangle
    pub fn drag(&self) -> Option<DragRect> {
        match self.state {
            DragState::Selecting { drag, .. } => Some(drag),
            _ => None,
        }
    }

    /// Whether subtract is currently held
    pub fn subtracting(&self) -> bool {
        self.modifiers.subtract
    }

    /// Operator panned or zoomed since the last [`Self::mark_fitted`].
    pub fn camera_moved(&self) -> bool {
        self.camera_moved
    }

    /// The camera was just fitted; resize may refit again.
    pub fn mark_fitted(&mut self) {
        self.camera_moved = false;
    }

    /// Drop any drag and hover, e.g. when the underlying save changes.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
        self.hover = None;
    }

    /// Drop an in-progress gesture without committing it.
    pub fn abandon_drag(&mut self) {
        if self.state != DragState::Idle {
            log::debug!("abandoning {:?}", self.state);
            self.state = DragState::Idle;
        }
    }

    /// Button pressed: start panning or a selection drag.
    pub fn pointer_down(
        &mut self,
        cx: &mut ViewContext<'_>,
        button: PointerButton,
        screen: Vec2,
        mods: Modifiers,
    ) -> ControllerAction {
        self.modifiers = mods;
        if self.state != DragState::Idle {
            return ControllerAction::None;
        }

        if self.tool == ToolMode::Pan || button != PointerButton::Primary {
            self.state = DragState::Panning { last: screen, button };
        } else {
            let world = cx.camera.screen_to_world(screen);
            self.state = DragState::Selecting {
                drag: DragRect::at(world),
                button,
            };
            self.hover = None;
            cx.redraw.request();
        }
        ControllerAction::None
    }

    /// Pointer moved: pan, stretch the drag, or track hover.
    pub fn pointer_move(&mut self, cx: &mut ViewContext<'_>, screen: Vec2, mods: Modifiers) {
        self.modifiers = mods;
        match &mut self.state {
            DragState::Panning { last, .. } => {
                let delta = screen - *last;
                *last = screen;
                if delta != Vec2::ZERO {
                    cx.camera.pan_by(delta);
                    self.camera_moved = true;
                    cx.redraw.request();
                }
            }
            DragState::Selecting { drag, .. } => {
                drag.end = cx.camera.screen_to_world(screen);
                cx.redraw.request();
            }
            DragState::Idle => {
                self.hover = Some(cx.camera.screen_to_world(screen));
                cx.redraw.request();
            }
        }
    }

    /// Button released. Only the button that started the gesture ends it.
    pub fn pointer_up(
        &mut self,
        cx: &mut ViewContext<'_>,
        button: PointerButton,
        screen: Vec2,
        mods: Modifiers,
    ) -> ControllerAction {
        self.modifiers = mods;
        if self.state.button() != Some(button) {
            return ControllerAction::None;
        }
        match self.state {
            DragState::Idle => ControllerAction::None,
            DragState::Panning { .. } => {
                self.state = DragState::Idle;
                ControllerAction::None
            }
            DragState::Selecting { mut drag, .. } => {
                drag.end = cx.camera.screen_to_world(screen);
                self.commit(cx, drag)
            }
        }
    }

    /// Pointer left the canvas: panning ends, a selection drag is committed.
    pub fn pointer_leave(&mut self, cx: &mut ViewContext<'_>) -> ControllerAction {
        self.hover = None;
        cx.redraw.request();
        match self.state {
            DragState::Selecting { drag, .. } => self.commit(cx, drag),
            _ => {
                self.state = DragState::Idle;
                ControllerAction::None
            }
        }
    }

    /// Zoom around `screen`; positive `delta` zooms in.
    pub fn wheel(&mut self, cx: &mut ViewContext<'_>, screen: Vec2, delta: f32) {
        if delta == 0.0 || !delta.is_finite() {
            return;
        }
        let factor = if delta > 0.0 {
            self.wheel_step
        } else {
            1.0 / self.wheel_step
        };
        cx.camera.zoom_at(screen, factor);
        self.camera_moved = true;

        // keep an active drag anchored to where the pointer now points
        if let DragState::Selecting { drag, .. } = &mut self.state {
            drag.end = cx.camera.screen_to_world(screen);
        }
        cx.redraw.request();
    }

    /// Keyboard shortcut, ignored unless the map has focus.
    pub fn key(&mut self, cx: &mut ViewContext<'_>, key: Key, focus: KeyContext) -> ControllerAction {
        if focus.modal_open || focus.input_focused {
            return ControllerAction::None;
        }
        match key {
            Key::Escape => {
                if matches!(self.state, DragState::Selecting { .. }) {
                    self.state = DragState::Idle;
                }
                cx.selection.clear();
                cx.redraw.request();
                ControllerAction::Cleared
            }
            // the dialog summarizes a settled selection, never a live drag
            Key::Delete if self.state == DragState::Idle && !cx.selection.is_empty() => {
                ControllerAction::OpenDeleteConfirm
            }
            Key::Delete | Key::Enter => ControllerAction::None,
            Key::Digit(d) => match ToolMode::from_digit(d) {
                Some(tool) => {
                    self.tool = tool;
                    cx.redraw.request();
                    ControllerAction::ToolChanged(tool)
                }
                None => ControllerAction::None,
            },
            Key::Char(c) => match c.to_ascii_lowercase() {
                'a' => {
                    cx.selection.select_all(cx.index);
                    cx.redraw.request();
                    ControllerAction::SelectedAll
                }
                'i' => {
                    cx.selection.invert(cx.index);
                    cx.redraw.request();
                    ControllerAction::Inverted
                }
                'f' => ControllerAction::FitRequested,
                _ => ControllerAction::None,
            },
        }
    }

    fn commit(&mut self, cx: &mut ViewContext<'_>, drag: DragRect) -> ControllerAction {
        self.state = DragState::Idle;
        let outcome = cx
            .selection
            .commit(cx.index, &drag, self.modifiers.subtract, self.click_threshold);
        log::debug!("selection commit: {:?} -> {} selected", outcome, cx.selection.len());
        cx.redraw.request();
        ControllerAction::Committed(outcome)
    }
}
