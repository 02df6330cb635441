/// Runtime knobs for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// A handler that keeps failing is dead-lettered (marked done with an
    /// error log) once its row has accumulated this many attempts. Without
    /// a cap, a past-due crashing action would refire on every restart.
    pub max_crash_attempts: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_crash_attempts: 5,
        }
    }
}
