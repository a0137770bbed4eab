//! Keeping the scheduler away from the bit-sampling loop.
//!
//! A preemption inside a 26-70us pulse turns a 0 into a 1, so the process asks
//! for real-time priority once at startup. This narrows the window but cannot
//! close it; the checksum catches what slips through.

use anyhow::Result;

pub trait Realtime {
    fn elevate(&mut self) -> Result<()>;
}

/// Leaves scheduling alone (`--no-realtime`).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRealtime;

impl Realtime for NoRealtime {
    fn elevate(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(target_os = "linux")]
pub use self::linux::FifoScheduler;

#[cfg(target_os = "linux")]
mod linux {
    use std::io;

    use anyhow::{bail, Result};
    use log::{info, warn};

    use super::Realtime;

    /// `SCHED_FIFO` for the whole process plus locked memory so page faults
    /// don't land mid-frame. Needs root or CAP_SYS_NICE.
    #[derive(Debug, Clone, Copy)]
    pub struct FifoScheduler {
        priority: i32,
    }

    impl FifoScheduler {
        pub fn new(priority: i32) -> Self {
            Self { priority }
        }
    }

    impl Realtime for FifoScheduler {
        fn elevate(&mut self) -> Result<()> {
            // SAFETY: zeroed sched_param is valid on every libc; only the
            // priority field is meaningful for SCHED_FIFO.
            let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
            param.sched_priority = self.priority;
            if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } != 0 {
                bail!(
                    "sched_setscheduler(SCHED_FIFO, {}) failed: {}",
                    self.priority,
                    io::Error::last_os_error()
                );
            }

            if unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) } != 0 {
                warn!("mlockall failed: {}", io::Error::last_os_error());
            }

            info!("Running with SCHED_FIFO priority {}", self.priority);
            Ok(())
        }
    }
}

#[cfg(target_os = "espidf")]
pub use self::esp::TaskPriority;

#[cfg(target_os = "espidf")]
mod esp {
    use anyhow::Result;
    use esp_idf_sys as sys;
    use log::info;

    use super::Realtime;

    pub const DEFAULT_PRIORITY: u32 = 10;

    /// Raises the calling FreeRTOS task above the default application tasks.
    #[derive(Debug, Clone, Copy)]
    pub struct TaskPriority {
        priority: u32,
    }

    impl Default for TaskPriority {
        fn default() -> Self {
            Self {
                priority: DEFAULT_PRIORITY,
            }
        }
    }

    impl Realtime for TaskPriority {
        fn elevate(&mut self) -> Result<()> {
            // A null handle selects the calling task.
            unsafe { sys::vTaskPrioritySet(core::ptr::null_mut(), self.priority) };
            info!("Sampling task priority raised to {}", self.priority);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_realtime_always_succeeds() {
        let mut realtime: Box<dyn Realtime> = Box::new(NoRealtime);
        assert!(realtime.elevate().is_ok());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn fifo_rejects_priority_outside_range() {
        // SCHED_FIFO priorities are 1..=99, so 0 fails with or without privileges.
        let err = FifoScheduler::new(0).elevate().unwrap_err();
        assert!(err.to_string().contains("sched_setscheduler(SCHED_FIFO, 0)"));
    }
}
