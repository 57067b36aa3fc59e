use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag for cooperative cancellation; polled only between steps.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        tracing::info!("stop requested");
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Why the loop must not start another step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    StepLimit,
}

/// Step budget and cancellation for one session.
pub struct LoopController {
    max_steps: u32,
    step_count: u32,
    stop: StopHandle,
}

impl LoopController {
    pub fn new(max_steps: u32) -> Self {
        Self {
            max_steps,
            step_count: 0,
            stop: StopHandle::new(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Zero the counter and clear any earlier stop request.
    pub fn reset(&mut self) {
        self.step_count = 0;
        self.stop.clear();
    }

    /// Consume one step of budget, returning the 1-based step number.
    pub fn begin_step(&mut self) -> u32 {
        self.step_count += 1;
        self.step_count
    }

    /// Checked at every step boundary. Cancellation wins over the step limit.
    pub fn should_stop(&self) -> Option<StopReason> {
        if self.stop.is_stopped() {
            Some(StopReason::Cancelled)
        } else if self.step_count >= self.max_steps {
            Some(StopReason::StepLimit)
        } else {
            None
        }
    }
}
