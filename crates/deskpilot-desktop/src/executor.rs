//! Applies validated actions to a desktop surface.
//!
//! Every surface call is wrapped: on failure the executor returns a
//! [`ActionOutcome::Failed`] carrying the action tag and the underlying
//! cause. It never propagates an error to the caller, and it never captures
//! screenshots on its own -- the observe policy belongs to the adapters
//! (the `screenshot` action itself being the one explicit exception).

use std::sync::Arc;

use tracing::{debug, warn};

use deskpilot_types::{Action, ActionOutcome, CommandOutput, Point};

use crate::scaler::ResolutionScaler;
use crate::surface::{DesktopError, DesktopSurface};

/// Execution bounds applied uniformly to model-requested actions.
#[derive(Debug, Clone, Copy)]
pub struct ExecLimits {
    /// Lower clamp for `shell_exec` timeouts.
    pub min_shell_timeout_ms: u64,
    /// Upper clamp for `shell_exec` timeouts.
    pub max_shell_timeout_ms: u64,
    /// Timeout used when the model omits one.
    pub default_shell_timeout_ms: u64,
    /// Upper bound on `wait` so the model cannot stall a session.
    pub max_wait_ms: u64,
    /// Characters per `write` call; long text is split for reliability.
    pub type_chunk_chars: usize,
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self {
            min_shell_timeout_ms: 1_000,
            max_shell_timeout_ms: 600_000,
            default_shell_timeout_ms: 30_000,
            max_wait_ms: 30_000,
            type_chunk_chars: 512,
        }
    }
}

/// Executes actions against one session's desktop surface.
#[derive(Clone)]
pub struct ActionExecutor {
    surface: Arc<dyn DesktopSurface>,
    scaler: ResolutionScaler,
    limits: ExecLimits,
}

impl ActionExecutor {
    /// Create an executor with default limits.
    pub fn new(surface: Arc<dyn DesktopSurface>, scaler: ResolutionScaler) -> Self {
        Self {
            surface,
            scaler,
            limits: ExecLimits::default(),
        }
    }

    /// Create an executor with explicit limits.
    pub fn with_limits(
        surface: Arc<dyn DesktopSurface>,
        scaler: ResolutionScaler,
        limits: ExecLimits,
    ) -> Self {
        Self {
            surface,
            scaler,
            limits,
        }
    }

    /// The session's coordinate scaler.
    pub fn scaler(&self) -> ResolutionScaler {
        self.scaler
    }

    /// The underlying surface, for adapters that capture screenshots.
    pub fn surface(&self) -> Arc<dyn DesktopSurface> {
        Arc::clone(&self.surface)
    }

    /// Apply a validated action, returning a structured outcome.
    pub async fn execute(&self, action: &Action) -> ActionOutcome {
        debug!(action = action.tag(), "executing action");
        match self.apply(action).await {
            Ok((output, screenshot)) => ActionOutcome::Done {
                action: action.clone(),
                output,
                screenshot,
            },
            Err(e) => {
                warn!(action = action.tag(), error = %e, "action failed");
                ActionOutcome::Failed {
                    action: action.clone(),
                    message: format!("{} failed: {e}", action.tag()),
                }
            }
        }
    }

    async fn apply(
        &self,
        action: &Action,
    ) -> Result<(Option<CommandOutput>, Option<Vec<u8>>), DesktopError> {
        match action {
            Action::Click { x, y, button } => {
                let (dx, dy) = self.scaler.to_device_pixels(Point::new(*x, *y));
                match button {
                    deskpilot_types::MouseButton::Left => self.surface.left_click(dx, dy).await?,
                    deskpilot_types::MouseButton::Right => self.surface.right_click(dx, dy).await?,
                    deskpilot_types::MouseButton::Middle => {
                        self.surface.middle_click(dx, dy).await?
                    }
                }
                Ok((None, None))
            }
            Action::DoubleClick { x, y } => {
                let (dx, dy) = self.scaler.to_device_pixels(Point::new(*x, *y));
                self.surface.double_click(dx, dy).await?;
                Ok((None, None))
            }
            Action::RightClick { x, y } => {
                let (dx, dy) = self.scaler.to_device_pixels(Point::new(*x, *y));
                self.surface.right_click(dx, dy).await?;
                Ok((None, None))
            }
            Action::Move { x, y } => {
                let (dx, dy) = self.scaler.to_device_pixels(Point::new(*x, *y));
                self.surface.move_mouse(dx, dy).await?;
                Ok((None, None))
            }
            Action::Type { text } => {
                // Chunked so a long paste cannot overwhelm the input bridge.
                let chars: Vec<char> = text.chars().collect();
                for chunk in chars.chunks(self.limits.type_chunk_chars.max(1)) {
                    let piece: String = chunk.iter().collect();
                    self.surface.write(&piece).await?;
                }
                Ok((None, None))
            }
            Action::Keypress { keys } => {
                let chord = keys
                    .iter()
                    .map(|k| k.trim())
                    .filter(|k| !k.is_empty())
                    .collect::<Vec<_>>()
                    .join("+");
                self.surface.press(&chord).await?;
                Ok((None, None))
            }
            Action::Scroll {
                direction,
                amount,
                x,
                y,
            } => {
                if let (Some(x), Some(y)) = (x, y) {
                    let (dx, dy) = self.scaler.to_device_pixels(Point::new(*x, *y));
                    self.surface.move_mouse(dx, dy).await?;
                }
                self.surface.scroll(*direction, *amount).await?;
                Ok((None, None))
            }
            Action::Drag { path } => {
                // Validation guarantees at least two points.
                let from = path.first().copied().unwrap_or(Point::new(0.0, 0.0));
                let to = path.last().copied().unwrap_or(from);
                let from = self.scaler.to_device_pixels(from);
                let to = self.scaler.to_device_pixels(to);
                self.surface.drag(from, to).await?;
                Ok((None, None))
            }
            Action::Wait { duration_ms } => {
                let ms = (*duration_ms).min(self.limits.max_wait_ms);
                tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                Ok((None, None))
            }
            Action::Screenshot => {
                let bytes = self.surface.screenshot().await?;
                Ok((None, Some(bytes)))
            }
            Action::ShellExec {
                command,
                timeout_ms,
            } => {
                let timeout = timeout_ms
                    .unwrap_or(self.limits.default_shell_timeout_ms)
                    .clamp(
                        self.limits.min_shell_timeout_ms,
                        self.limits.max_shell_timeout_ms,
                    );
                let output = self.surface.run_command(command, timeout).await?;
                Ok((Some(output), None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use deskpilot_types::{MouseButton, Resolution, ScrollDirection};

    use super::*;

    /// Recording surface double; every call is appended as a formatted line.
    #[derive(Default)]
    struct MockSurface {
        calls: Mutex<Vec<String>>,
        fail_clicks: bool,
    }

    impl MockSurface {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait::async_trait]
    impl DesktopSurface for MockSurface {
        async fn left_click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
            if self.fail_clicks {
                return Err(DesktopError::Transport {
                    detail: "device unreachable".into(),
                });
            }
            self.record(format!("left_click({x},{y})"));
            Ok(())
        }
        async fn right_click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
            self.record(format!("right_click({x},{y})"));
            Ok(())
        }
        async fn middle_click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
            self.record(format!("middle_click({x},{y})"));
            Ok(())
        }
        async fn double_click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
            self.record(format!("double_click({x},{y})"));
            Ok(())
        }
        async fn move_mouse(&self, x: i32, y: i32) -> Result<(), DesktopError> {
            self.record(format!("move_mouse({x},{y})"));
            Ok(())
        }
        async fn drag(&self, from: (i32, i32), to: (i32, i32)) -> Result<(), DesktopError> {
            self.record(format!(
                "drag(({},{})->({},{}))",
                from.0, from.1, to.0, to.1
            ));
            Ok(())
        }
        async fn scroll(
            &self,
            direction: ScrollDirection,
            amount: u32,
        ) -> Result<(), DesktopError> {
            self.record(format!("scroll({direction},{amount})"));
            Ok(())
        }
        async fn write(&self, text: &str) -> Result<(), DesktopError> {
            self.record(format!("write({})", text.len()));
            Ok(())
        }
        async fn press(&self, keys: &str) -> Result<(), DesktopError> {
            self.record(format!("press({keys})"));
            Ok(())
        }
        async fn screenshot(&self) -> Result<Vec<u8>, DesktopError> {
            self.record("screenshot".into());
            Ok(vec![0xAB, 0xCD])
        }
        async fn run_command(
            &self,
            command: &str,
            timeout_ms: u64,
        ) -> Result<CommandOutput, DesktopError> {
            self.record(format!("run_command({command},{timeout_ms})"));
            Ok(CommandOutput {
                stdout: "ok".into(),
                stderr: String::new(),
                exit_code: 0,
            })
        }
    }

    fn executor(surface: Arc<MockSurface>) -> ActionExecutor {
        // Device is exactly twice the model viewport on each axis.
        let scaler = ResolutionScaler::new(Resolution::new(3840, 2160), Resolution::new(1920, 1080));
        ActionExecutor::new(surface, scaler)
    }

    #[tokio::test]
    async fn click_scales_two_to_one() {
        let surface = Arc::new(MockSurface::default());
        let exec = executor(Arc::clone(&surface));

        let outcome = exec
            .execute(&Action::Click {
                x: 10.0,
                y: 15.0,
                button: MouseButton::Left,
            })
            .await;

        assert!(!outcome.is_failure());
        assert_eq!(surface.calls(), vec!["left_click(20,30)".to_string()]);
    }

    #[tokio::test]
    async fn failure_is_wrapped_never_thrown() {
        let surface = Arc::new(MockSurface {
            fail_clicks: true,
            ..Default::default()
        });
        let exec = executor(Arc::clone(&surface));

        let outcome = exec
            .execute(&Action::Click {
                x: 10.0,
                y: 15.0,
                button: MouseButton::Left,
            })
            .await;

        match outcome {
            ActionOutcome::Failed { message, .. } => {
                assert!(message.starts_with("click failed:"));
                assert!(message.contains("device unreachable"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(surface.calls().is_empty());
    }

    #[tokio::test]
    async fn long_text_is_chunked() {
        let surface = Arc::new(MockSurface::default());
        let exec = executor(Arc::clone(&surface));

        let outcome = exec
            .execute(&Action::Type {
                text: "a".repeat(1200),
            })
            .await;

        assert!(!outcome.is_failure());
        assert_eq!(
            surface.calls(),
            vec!["write(512)", "write(512)", "write(176)"]
        );
    }

    #[tokio::test]
    async fn custom_limits_override_defaults() {
        let surface = Arc::new(MockSurface::default());
        let scaler = ResolutionScaler::new(Resolution::new(1920, 1080), Resolution::new(1920, 1080));
        let exec = ActionExecutor::with_limits(
            Arc::<MockSurface>::clone(&surface),
            scaler,
            ExecLimits {
                min_shell_timeout_ms: 10,
                max_shell_timeout_ms: 100,
                default_shell_timeout_ms: 50,
                max_wait_ms: 5,
                type_chunk_chars: 5,
            },
        );

        exec.execute(&Action::Type {
            text: "a".repeat(12),
        })
        .await;
        exec.execute(&Action::ShellExec {
            command: "ls".into(),
            timeout_ms: None,
        })
        .await;
        exec.execute(&Action::ShellExec {
            command: "ls".into(),
            timeout_ms: Some(10_000),
        })
        .await;

        assert_eq!(
            surface.calls(),
            vec![
                "write(5)",
                "write(5)",
                "write(2)",
                "run_command(ls,50)",
                "run_command(ls,100)",
            ]
        );
    }

    #[tokio::test]
    async fn keypress_joins_chord() {
        let surface = Arc::new(MockSurface::default());
        let exec = executor(Arc::clone(&surface));

        exec.execute(&Action::Keypress {
            keys: vec!["ctrl".into(), " shift ".into(), "t".into()],
        })
        .await;

        assert_eq!(surface.calls(), vec!["press(ctrl+shift+t)"]);
    }

    #[tokio::test]
    async fn shell_timeout_defaulted_and_clamped() {
        let surface = Arc::new(MockSurface::default());
        let exec = executor(Arc::clone(&surface));

        exec.execute(&Action::ShellExec {
            command: "ls".into(),
            timeout_ms: None,
        })
        .await;
        exec.execute(&Action::ShellExec {
            command: "ls".into(),
            timeout_ms: Some(50),
        })
        .await;
        exec.execute(&Action::ShellExec {
            command: "ls".into(),
            timeout_ms: Some(10_000_000),
        })
        .await;

        assert_eq!(
            surface.calls(),
            vec![
                "run_command(ls,30000)",
                "run_command(ls,1000)",
                "run_command(ls,600000)",
            ]
        );
    }

    #[tokio::test]
    async fn shell_output_echoed_in_outcome() {
        let surface = Arc::new(MockSurface::default());
        let exec = executor(surface);

        let outcome = exec
            .execute(&Action::ShellExec {
                command: "echo hi".into(),
                timeout_ms: None,
            })
            .await;

        match outcome {
            ActionOutcome::Done {
                output: Some(out), ..
            } => assert_eq!(out.stdout, "ok"),
            other => panic!("expected shell output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn drag_uses_first_and_last_points() {
        let surface = Arc::new(MockSurface::default());
        let exec = executor(Arc::clone(&surface));

        exec.execute(&Action::Drag {
            path: vec![
                Point::new(10.0, 10.0),
                Point::new(500.0, 500.0),
                Point::new(100.0, 50.0),
            ],
        })
        .await;

        assert_eq!(surface.calls(), vec!["drag((20,20)->(200,100))"]);
    }

    #[tokio::test]
    async fn scroll_moves_pointer_when_targeted() {
        let surface = Arc::new(MockSurface::default());
        let exec = executor(Arc::clone(&surface));

        exec.execute(&Action::Scroll {
            direction: ScrollDirection::Down,
            amount: 3,
            x: Some(100.0),
            y: Some(100.0),
        })
        .await;

        assert_eq!(
            surface.calls(),
            vec!["move_mouse(200,200)", "scroll(down,3)"]
        );
    }

    #[tokio::test]
    async fn screenshot_action_returns_bytes() {
        let surface = Arc::new(MockSurface::default());
        let exec = executor(surface);

        match exec.execute(&Action::Screenshot).await {
            ActionOutcome::Done {
                screenshot: Some(bytes),
                ..
            } => assert_eq!(bytes, vec![0xAB, 0xCD]),
            other => panic!("expected screenshot bytes, got {other:?}"),
        }
    }
}
