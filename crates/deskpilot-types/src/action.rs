//! The closed remote-desktop action vocabulary and its validator.
//!
//! Every vendor protocol is normalized into [`Action`] before anything is
//! executed. Coordinates are in model space until the executor scales them.
//! Validation is a pure function over an action and the model resolution, so
//! adapters can reject malformed actions without touching the sandbox.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Resolution};

/// Maximum length of a shell command, in bytes.
pub const MAX_COMMAND_BYTES: usize = 4096;

/// Default scroll amount when the model omits one.
const DEFAULT_SCROLL_AMOUNT: u32 = 3;

/// Default wait duration when the model omits one.
const DEFAULT_WAIT_MS: u64 = 1000;

fn default_scroll_amount() -> u32 {
    DEFAULT_SCROLL_AMOUNT
}

fn default_wait_ms() -> u64 {
    DEFAULT_WAIT_MS
}

/// Mouse button for click actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Scroll direction. Defaults to `Down` when the model omits one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl std::fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
            ScrollDirection::Left => "left",
            ScrollDirection::Right => "right",
        };
        write!(f, "{s}")
    }
}

/// A remote-desktop action requested by the model.
///
/// This is a closed set: unknown tags are rejected at parse time by
/// [`Action::from_json`], never silently ignored. All coordinates are in
/// model space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Click at a point with the given button.
    Click {
        x: f64,
        y: f64,
        #[serde(default)]
        button: MouseButton,
    },
    /// Double-click at a point.
    DoubleClick { x: f64, y: f64 },
    /// Right-click at a point.
    RightClick { x: f64, y: f64 },
    /// Type a string of text.
    Type { text: String },
    /// Press one or more keys as a single chord.
    Keypress { keys: Vec<String> },
    /// Scroll the view, optionally after moving the pointer to a point.
    Scroll {
        #[serde(default)]
        direction: ScrollDirection,
        #[serde(default = "default_scroll_amount")]
        amount: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        x: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y: Option<f64>,
    },
    /// Move the pointer to a point.
    Move { x: f64, y: f64 },
    /// Drag along a path. Only the first and last points are used.
    Drag { path: Vec<Point> },
    /// Pause for a duration.
    Wait {
        #[serde(default = "default_wait_ms")]
        duration_ms: u64,
    },
    /// Capture the current screen.
    Screenshot,
    /// Run a shell command inside the sandbox.
    ShellExec {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
}

impl Action {
    /// The wire tag for this action, used in error messages and logs.
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Click { .. } => "click",
            Action::DoubleClick { .. } => "double_click",
            Action::RightClick { .. } => "right_click",
            Action::Type { .. } => "type",
            Action::Keypress { .. } => "keypress",
            Action::Scroll { .. } => "scroll",
            Action::Move { .. } => "move",
            Action::Drag { .. } => "drag",
            Action::Wait { .. } => "wait",
            Action::Screenshot => "screenshot",
            Action::ShellExec { .. } => "shell_exec",
        }
    }

    /// Parse an action from loose JSON (a tool-call input or fallback reply).
    ///
    /// Rejects unknown tags explicitly and distinguishes missing/non-numeric
    /// coordinates ([`ActionError::CoordinatesInvalid`]) from structurally
    /// malformed input ([`ActionError::Malformed`]). Bounds are checked
    /// separately by [`validate_action`].
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ActionError> {
        let tag = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or(ActionError::Malformed {
                detail: "missing 'type' tag".to_string(),
            })?;

        const KNOWN: &[&str] = &[
            "click",
            "double_click",
            "right_click",
            "type",
            "keypress",
            "scroll",
            "move",
            "drag",
            "wait",
            "screenshot",
            "shell_exec",
        ];
        if !KNOWN.contains(&tag) {
            return Err(ActionError::UnknownAction {
                tag: tag.to_string(),
            });
        }

        // Coordinate-bearing tags get a targeted check so a missing or
        // non-numeric coordinate is reported as such, not as a serde error.
        let coord_tag = match tag {
            "click" => Some("click"),
            "double_click" => Some("double_click"),
            "right_click" => Some("right_click"),
            "move" => Some("move"),
            _ => None,
        };
        if let Some(action) = coord_tag {
            require_finite_coord(value, "x", action)?;
            require_finite_coord(value, "y", action)?;
        }

        serde_json::from_value(value.clone()).map_err(|e| ActionError::Malformed {
            detail: e.to_string(),
        })
    }
}

fn require_finite_coord(
    value: &serde_json::Value,
    field: &'static str,
    action: &'static str,
) -> Result<(), ActionError> {
    match value.get(field).and_then(|v| v.as_f64()) {
        Some(n) if n.is_finite() => Ok(()),
        _ => Err(ActionError::CoordinatesInvalid { action, field }),
    }
}

/// Why an action failed validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    /// The action tag is not part of the vocabulary.
    #[error("unknown action '{tag}'")]
    UnknownAction { tag: String },

    /// The input could not be decoded into the action's shape.
    #[error("malformed action: {detail}")]
    Malformed { detail: String },

    /// A required coordinate is missing or not a finite number.
    #[error("{action}: coordinate '{field}' is missing or not a finite number")]
    CoordinatesInvalid {
        action: &'static str,
        field: &'static str,
    },

    /// A coordinate is present but outside the model viewport.
    #[error("{action}: point ({x}, {y}) is outside the {width}x{height} viewport")]
    CoordinatesOutOfBounds {
        action: &'static str,
        x: f64,
        y: f64,
        width: u32,
        height: u32,
    },

    /// A drag was supplied with fewer than two path points.
    #[error("drag requires at least 2 path points, got {got}")]
    DragTooFewPoints { got: usize },

    /// A type action with empty text.
    #[error("type requires non-empty text")]
    EmptyText,

    /// A keypress action with no keys.
    #[error("keypress requires at least one key")]
    EmptyKeys,

    /// A shell command longer than [`MAX_COMMAND_BYTES`].
    #[error("shell command is {len} bytes, exceeding the {max} byte limit")]
    CommandTooLong { len: usize, max: usize },
}

/// Validate an action against the model resolution.
///
/// Pure: performs no I/O and never touches the sandbox. Coordinate checks are
/// against `[0, axis)` in model space; non-finite values are reported as
/// [`ActionError::CoordinatesInvalid`], out-of-viewport values as
/// [`ActionError::CoordinatesOutOfBounds`].
pub fn validate_action(action: &Action, model: Resolution) -> Result<(), ActionError> {
    let check_point = |x: f64, y: f64| -> Result<(), ActionError> {
        if !x.is_finite() {
            return Err(ActionError::CoordinatesInvalid {
                action: action.tag(),
                field: "x",
            });
        }
        if !y.is_finite() {
            return Err(ActionError::CoordinatesInvalid {
                action: action.tag(),
                field: "y",
            });
        }
        if !model.contains(Point::new(x, y)) {
            return Err(ActionError::CoordinatesOutOfBounds {
                action: action.tag(),
                x,
                y,
                width: model.width,
                height: model.height,
            });
        }
        Ok(())
    };

    match action {
        Action::Click { x, y, .. }
        | Action::DoubleClick { x, y }
        | Action::RightClick { x, y }
        | Action::Move { x, y } => check_point(*x, *y),
        Action::Scroll { x, y, .. } => match (x, y) {
            (Some(x), Some(y)) => check_point(*x, *y),
            (None, None) => Ok(()),
            // One coordinate without the other is as useless as none at all.
            _ => Err(ActionError::CoordinatesInvalid {
                action: action.tag(),
                field: if x.is_none() { "x" } else { "y" },
            }),
        },
        Action::Drag { path } => {
            if path.len() < 2 {
                return Err(ActionError::DragTooFewPoints { got: path.len() });
            }
            let first = path[0];
            let last = path[path.len() - 1];
            check_point(first.x, first.y)?;
            check_point(last.x, last.y)
        }
        Action::Type { text } => {
            if text.is_empty() {
                Err(ActionError::EmptyText)
            } else {
                Ok(())
            }
        }
        Action::Keypress { keys } => {
            if keys.is_empty() || keys.iter().all(|k| k.trim().is_empty()) {
                Err(ActionError::EmptyKeys)
            } else {
                Ok(())
            }
        }
        Action::ShellExec { command, .. } => {
            if command.len() > MAX_COMMAND_BYTES {
                Err(ActionError::CommandTooLong {
                    len: command.len(),
                    max: MAX_COMMAND_BYTES,
                })
            } else {
                Ok(())
            }
        }
        Action::Wait { .. } | Action::Screenshot => Ok(()),
    }
}

/// Output of a shell command executed in the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// The structured result of executing an action.
///
/// Exactly one of the two shapes per execution; the executor never lets an
/// error escape as anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The action was applied to the device.
    Done {
        action: Action,
        /// Shell output, echoed for `shell_exec` actions.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<CommandOutput>,
        /// Raw screenshot bytes, present for `screenshot` actions.
        #[serde(skip)]
        screenshot: Option<Vec<u8>>,
    },
    /// The action failed; `message` names the action tag and the cause.
    Failed { action: Action, message: String },
}

impl ActionOutcome {
    /// Whether this outcome is a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, ActionOutcome::Failed { .. })
    }

    /// Short text to report back into the model's conversation history.
    pub fn report_for_model(&self) -> String {
        match self {
            ActionOutcome::Done {
                action,
                output: Some(out),
                ..
            } => format!(
                "{} completed (exit {}).\nstdout:\n{}\nstderr:\n{}",
                action.tag(),
                out.exit_code,
                out.stdout,
                out.stderr
            ),
            ActionOutcome::Done { action, .. } => format!("{} completed.", action.tag()),
            ActionOutcome::Failed { message, .. } => format!("Action failed: {message}"),
        }
    }
}
