//! Instruction text handed to the model.
//!
//! Kept short and declarative; the viewport dimensions baked into each
//! system prompt are the *model* resolution, never the device one.

use deskpilot_types::Resolution;

/// Caption for the seed screenshot at session start.
pub const INITIAL_INSTRUCTION: &str = "This is the current state of the screen. Use the \
     computer tool to accomplish the task described above, one action at a time. When the \
     task is complete, reply in plain text without calling any tools.";

/// Caption for the fresh screenshot injected before each step.
pub const STEP_CAPTION: &str = "Current screenshot of the screen after the previous action.";

/// Seed instruction for models that cannot see images.
pub const TEXT_ONLY_INSTRUCTION: &str = "You cannot see the screen. Use the computer tool to \
     accomplish the task described above, one action at a time; each action's outcome is \
     reported back to you as text. When the task is complete, reply in plain text without \
     calling any tools.";

/// Follow-up sent when the fallback model replied with unparsable JSON.
pub const JSON_CORRECTIVE: &str = "Your last reply was not a valid JSON object. Respond with \
     exactly one JSON object of the form {\"reasoning\": \"...\", \"action\": {\"type\": \"...\"}} \
     and nothing else. No prose outside the JSON.";

/// Continuation instruction for the fallback protocol.
pub const JSON_CONTINUATION: &str = "Reply with the next JSON object, or a \"done\" action if \
     the task is complete.";

/// Completion sentinel for the fallback protocol's `action.type`.
pub const DONE_SENTINEL: &str = "done";

/// System prompt for the generic tool-calling loop.
///
/// `vision` selects how the model observes the screen: attached screenshots,
/// or text-only outcome reports.
pub fn toolcall_system(model: Resolution, vision: bool) -> String {
    let observe = if vision {
        "A fresh screenshot of the screen is attached to each of your turns. Work step by \
         step, verify the effect of each action on the next screenshot,"
    } else {
        "You cannot see the screen; the outcome of each action is reported back to you as \
         text. Work step by step,"
    };
    format!(
        "You are operating a remote computer with a {model} screen through the `computer` \
         tool. Coordinates are 0-based pixels with the origin at the top left; x must be \
         below {w} and y below {h}. {observe} and stop calling tools once the task is done.",
        w = model.width,
        h = model.height,
    )
}

/// System prompt for the free-text JSON fallback protocol.
pub fn json_system(model: Resolution) -> String {
    format!(
        "You are operating a remote computer with a {model} screen. You cannot call tools; \
         instead, answer every turn with exactly one JSON object and nothing else:\n\
         {{\"reasoning\": \"why you are doing this\", \"action\": {{\"type\": \"...\"}}}}\n\
         Action types: click (x, y, button), double_click (x, y), right_click (x, y), \
         type (text), keypress (keys), scroll (direction, amount), move (x, y), \
         drag (path of points), wait (duration_ms), screenshot, shell_exec (command), \
         and done (message) when the task is complete. Coordinates are 0-based pixels; \
         x must be below {w} and y below {h}.",
        w = model.width,
        h = model.height,
    )
}
