// Executes parsed actions against the device.
use std::sync::OnceLock;

use regex::Regex;

use crate::agent_engine::state::{Action, Field, NormalizedPoint, StepOutcome};
use crate::executor::coordinator::normalized_to_physical;
use crate::executor::input::DeviceControl;
use crate::perception::screenshot::Viewport;

pub const DEFAULT_LONG_PRESS_MS: u64 = 3000;
pub const DEFAULT_WAIT_SECS: f64 = 2.0;

/// Run one action and classify the result.
///
/// Invalid arguments fail the step without touching the device. `Finish` is
/// normally intercepted by the session controller before this point; it is
/// mapped to a finishing outcome here only so the match stays exhaustive.
pub async fn dispatch(
    action: &Action,
    viewport: Viewport,
    device: &dyn DeviceControl,
) -> StepOutcome {
    tracing::info!(action = %action.kind(), "dispatching action");

    let outcome = match action {
        Action::Launch { app } => match app {
            Ok(app) => {
                let ok = device.launch(app).await;
                StepOutcome::from_flag(
                    ok,
                    format!("launched {app}"),
                    format!("failed to launch {app}"),
                )
            }
            Err(e) => StepOutcome::failed(e.to_string()),
        },

        Action::Tap { element, .. } => match pixel(element, viewport) {
            Ok((x, y)) => {
                let ok = device.tap(x, y).await;
                StepOutcome::from_flag(ok, format!("tapped ({x}, {y})"), "tap failed")
            }
            Err(outcome) => outcome,
        },

        Action::DoubleTap { element } => match pixel(element, viewport) {
            Ok((x, y)) => {
                let ok = device.double_tap(x, y).await;
                StepOutcome::from_flag(ok, format!("double-tapped ({x}, {y})"), "double tap failed")
            }
            Err(outcome) => outcome,
        },

        Action::LongPress { element, duration_ms } => match pixel(element, viewport) {
            Ok((x, y)) => {
                let ms = duration_ms.unwrap_or(DEFAULT_LONG_PRESS_MS);
                let ok = device.long_press(x, y, ms).await;
                StepOutcome::from_flag(
                    ok,
                    format!("long-pressed ({x}, {y}) for {ms}ms"),
                    "long press failed",
                )
            }
            Err(outcome) => outcome,
        },

        Action::Swipe { start, end, duration_ms } => {
            match (pixel(start, viewport), pixel(end, viewport)) {
                (Ok((x1, y1)), Ok((x2, y2))) => {
                    let ok = device.swipe(x1, y1, x2, y2, *duration_ms).await;
                    StepOutcome::from_flag(
                        ok,
                        format!("swiped ({x1}, {y1}) -> ({x2}, {y2})"),
                        "swipe failed",
                    )
                }
                (Err(outcome), _) | (_, Err(outcome)) => outcome,
            }
        }

        Action::Type { text } => match text {
            Ok(text) => {
                let ok = device.type_text(text).await;
                StepOutcome::from_flag(ok, format!("typed: {text}"), "text input failed")
            }
            Err(e) => StepOutcome::failed(e.to_string()),
        },

        Action::Wait { duration } => {
            let secs = wait_seconds(duration.as_deref());
            let ok = device.wait(secs).await;
            StepOutcome::from_flag(ok, format!("waited {secs} seconds"), "wait failed")
        }

        Action::Back => {
            let ok = device.back().await;
            StepOutcome::from_flag(ok, "pressed back", "back failed")
        }

        Action::Home => {
            let ok = device.home().await;
            StepOutcome::from_flag(ok, "pressed home", "home failed")
        }

        Action::Note { message } => {
            tracing::info!(note = %message, "page content noted");
            StepOutcome::ok("page content noted")
        }

        Action::CallApi { instruction } => {
            tracing::info!(instruction = %instruction, "call API requested");
            StepOutcome::ok(format!("API call: {instruction}"))
        }

        Action::Interact { message } => {
            tracing::warn!(message = ?message, "user choice required");
            StepOutcome::ok("user interaction required")
        }

        Action::TakeOver { message } => {
            tracing::warn!(message = %message, "take-over requested");
            StepOutcome::ok(format!("waiting for user: {message}"))
        }

        Action::Unknown { name } => {
            tracing::error!(action = %name, "unknown action");
            StepOutcome::failed(format!("unknown action: {name}"))
        }

        Action::Finish { message } => StepOutcome::finished(message.clone()),
    };

    if outcome.success {
        tracing::debug!(message = %outcome.message, "action succeeded");
    } else {
        tracing::warn!(message = %outcome.message, "action failed");
    }
    outcome
}

fn pixel(point: &Field<NormalizedPoint>, viewport: Viewport) -> Result<(i32, i32), StepOutcome> {
    match point {
        Ok(p) => Ok(normalized_to_physical(*p, viewport)),
        Err(e) => Err(StepOutcome::failed(e.to_string())),
    }
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+\.?\d*)").expect("valid regex"))
}

/// First number in a free-text duration such as "3 seconds" or "about 1.5s".
/// Missing descriptors and descriptors without a number fall back to 2 seconds.
pub fn wait_seconds(descriptor: Option<&str>) -> f64 {
    let Some(text) = descriptor else {
        return DEFAULT_WAIT_SECS;
    };
    match number_regex()
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        Some(secs) => secs,
        None => {
            tracing::warn!(duration = %text, "cannot parse wait duration, using default");
            DEFAULT_WAIT_SECS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::action_parser::parse_action;
    use crate::testing::RecordingDevice;

    const PHONE: Viewport = Viewport {
        width: 1080,
        height: 2400,
    };

    async fn run(text: &str, device: &RecordingDevice) -> StepOutcome {
        dispatch(&parse_action(text), PHONE, device).await
    }

    #[tokio::test]
    async fn tap_is_converted_to_pixels() {
        let device = RecordingDevice::new();
        let outcome = run("do(action=\"Tap\", element=[500,500])", &device).await;
        assert!(outcome.success);
        assert!(!outcome.should_finish);
        assert_eq!(device.calls(), vec!["tap 540 1200"]);
    }

    #[tokio::test]
    async fn invalid_coordinates_never_reach_device() {
        let device = RecordingDevice::new();
        for text in [
            "do(action=\"Tap\", element=[1,2,3])",
            "do(action=\"Tap\")",
            "do(action=\"Double Tap\", element=\"center\")",
            "do(action=\"Long Press\", element=[1])",
            "do(action=\"Swipe\", start=[1,2], end=[3])",
            "do(action=\"Launch\")",
            "do(action=\"Type\", text=\"\")",
        ] {
            let outcome = run(text, &device).await;
            assert!(!outcome.success, "{text}");
            assert!(!outcome.should_finish, "{text}");
        }
        assert!(device.calls().is_empty());
    }

    #[tokio::test]
    async fn capability_failure_is_a_non_terminal_failed_step() {
        let device = RecordingDevice::failing();
        let outcome = run("do(action=\"Back\")", &device).await;
        assert_eq!(outcome, StepOutcome::failed("back failed"));
        assert_eq!(device.calls(), vec!["back"]);
    }

    #[tokio::test]
    async fn unknown_action_message() {
        let device = RecordingDevice::new();
        let outcome = run("do(action=\"Pinch\")", &device).await;
        assert_eq!(outcome, StepOutcome::failed("unknown action: Pinch"));
        assert!(device.calls().is_empty());
    }

    #[tokio::test]
    async fn signalling_actions_do_not_touch_device() {
        let device = RecordingDevice::new();
        for text in [
            "do(action=\"Note\", message=\"True\")",
            "do(action=\"Call_API\", instruction=\"summarize\")",
            "do(action=\"Interact\")",
            "do(action=\"Take_over\", message=\"please log in\")",
        ] {
            let outcome = run(text, &device).await;
            assert!(outcome.success, "{text}");
            assert!(!outcome.should_finish, "{text}");
        }
        assert!(device.calls().is_empty());
    }

    #[tokio::test]
    async fn swipe_and_long_press_durations() {
        let device = RecordingDevice::new();
        run("do(action=\"Swipe\", start=[500,800], end=[500,200])", &device).await;
        run("do(action=\"Swipe\", start=[0,0], end=[999,999], duration_ms=400)", &device).await;
        run("do(action=\"Long Press\", element=[100,100])", &device).await;
        assert_eq!(
            device.calls(),
            vec![
                "swipe 540 1920 540 480 None",
                "swipe 0 0 1078 2397 Some(400)",
                "long_press 108 240 3000",
            ]
        );
    }

    #[tokio::test]
    async fn launch_type_and_wait() {
        let device = RecordingDevice::new();
        run("do(action=\"Launch\", app=\"微信\")", &device).await;
        run("do(action=\"Type_Name\", text=\"张三\")", &device).await;
        let waited = run("do(action=\"Wait\", duration=\"3 seconds\")", &device).await;
        assert_eq!(waited.message, "waited 3 seconds");
        assert_eq!(device.calls(), vec!["launch 微信", "type 张三", "wait 3"]);
    }

    #[tokio::test]
    async fn finish_maps_to_finishing_outcome() {
        let device = RecordingDevice::new();
        let outcome = run("finish(message=\"done\")", &device).await;
        assert_eq!(outcome, StepOutcome::finished("done"));
    }

    #[test]
    fn wait_duration_parsing() {
        assert_eq!(wait_seconds(Some("3 seconds")), 3.0);
        assert_eq!(wait_seconds(Some("about 1.5s")), 1.5);
        assert_eq!(wait_seconds(Some("a little while")), DEFAULT_WAIT_SECS);
        assert_eq!(wait_seconds(None), DEFAULT_WAIT_SECS);
    }
}
