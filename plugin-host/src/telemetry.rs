use std::time::Duration;

/// Structured per-plugin counters, in the shape of the teacher's resource
/// usage struct but without any OS-level sampling: invocation/error/
/// violation counts and cumulative RPC duration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PluginTelemetry {
    pub invocations: u64,
    pub errors: u64,
    pub violations: u64,
    pub cumulative_duration: Duration,
}

impl PluginTelemetry {
    pub fn record_invocation(&mut self, duration: Duration, succeeded: bool) {
        self.invocations += 1;
        self.cumulative_duration += duration;
        if !succeeded {
            self.errors += 1;
        }
    }

    pub fn record_violation(&mut self) {
        self.violations += 1;
    }

    #[must_use]
    pub fn average_duration(&self) -> Duration {
        if self.invocations == 0 {
            Duration::ZERO
        } else {
            self.cumulative_duration / u32::try_from(self.invocations).unwrap_or(u32::MAX)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_duration_is_zero_with_no_invocations() {
        assert_eq!(PluginTelemetry::default().average_duration(), Duration::ZERO);
    }

    #[test]
    fn errors_and_violations_accumulate_independently() {
        let mut telemetry = PluginTelemetry::default();
        telemetry.record_invocation(Duration::from_millis(10), true);
        telemetry.record_invocation(Duration::from_millis(20), false);
        telemetry.record_violation();
        assert_eq!(telemetry.invocations, 2);
        assert_eq!(telemetry.errors, 1);
        assert_eq!(telemetry.violations, 1);
        assert_eq!(telemetry.average_duration(), Duration::from_millis(15));
    }
}
