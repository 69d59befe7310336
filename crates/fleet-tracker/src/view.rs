//! Selection and view options, mutated only by user actions

use fleet_core::Registration;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Operator toggles that parameterize the map view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOptions {
    /// Hide every path and marker except the selected drone's
    pub show_selected_path_only: bool,
    /// Dragging the map clears the selection
    pub cancel_selection_on_drag: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            show_selected_path_only: false,
            cancel_selection_on_drag: true,
        }
    }
}

/// A user-driven change to the view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ViewAction {
    /// Select a drone, or clear the selection with `None`
    Select(Option<Registration>),
    /// Select a drone, or clear if it is already selected
    ToggleSelection(Registration),
    SetShowSelectedPathOnly(bool),
    SetCancelSelectionOnDrag(bool),
}

/// What an applied action changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewChange {
    pub selection_changed: bool,
    pub options_changed: bool,
}

impl ViewChange {
    pub fn any(&self) -> bool {
        self.selection_changed || self.options_changed
    }
}

/// Current selection plus view options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub selected: Option<Registration>,
    pub options: ViewOptions,
}

impl ViewState {
    pub fn new(options: ViewOptions) -> Self {
        Self {
            selected: None,
            options,
        }
    }

    pub fn selected(&self) -> Option<&Registration> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, registration: &Registration) -> bool {
        self.selected.as_ref() == Some(registration)
    }

    pub fn apply(&mut self, action: ViewAction) -> ViewChange {
        let mut change = ViewChange::default();

        match action {
            ViewAction::Select(selection) => {
                change.selection_changed = self.selected != selection;
                self.selected = selection;
            }
            ViewAction::ToggleSelection(registration) => {
                if self.is_selected(&registration) {
                    self.selected = None;
                } else {
                    self.selected = Some(registration);
                }
                change.selection_changed = true;
            }
            ViewAction::SetShowSelectedPathOnly(value) => {
                change.options_changed = self.options.show_selected_path_only != value;
                self.options.show_selected_path_only = value;
            }
            ViewAction::SetCancelSelectionOnDrag(value) => {
                change.options_changed = self.options.cancel_selection_on_drag != value;
                self.options.cancel_selection_on_drag = value;
            }
        }

        debug!("View state now {:?} ({:?})", self, change);
        change
    }
}
