//! Wire encodings for the event stream.
//!
//! One JSON object per event; newline-delimited for raw HTTP streaming,
//! `data:`-framed for Server-Sent Events. The two encodings carry the exact
//! same payload.

use deskpilot_types::Event;

fn to_json(event: &Event) -> String {
    serde_json::to_string(event).unwrap_or_else(|e| {
        format!(
            r#"{{"type":"error","message":"event serialization failed: {}"}}"#,
            e.to_string().replace('"', "'")
        )
    })
}

/// Encode an event as one NDJSON line, trailing newline included.
pub fn to_ndjson(event: &Event) -> String {
    let mut line = to_json(event);
    line.push('\n');
    line
}

/// Encode an event as one SSE frame, blank-line terminator included.
pub fn to_sse_frame(event: &Event) -> String {
    format!("data: {}\n\n", to_json(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndjson_is_one_line_per_event() {
        let line = to_ndjson(&Event::Reasoning {
            text: "opening the browser".into(),
        });
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.starts_with(r#"{"type":"reasoning""#));
    }

    #[test]
    fn done_without_message_omits_the_field() {
        assert_eq!(to_ndjson(&Event::Done { message: None }), "{\"type\":\"done\"}\n");
    }

    #[test]
    fn sse_frame_shape() {
        let frame = to_sse_frame(&Event::Done {
            message: Some("finished".into()),
        });
        assert!(frame.starts_with("data: {"));
        assert!(frame.ends_with("\n\n"));
    }
}
