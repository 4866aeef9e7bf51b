use std::os::fd::RawFd;

/// Write side of the poller's wake-up descriptor.
///
/// Handles on other threads hold this to interrupt a blocking poll when
/// they submit work. The descriptor is owned and closed on drop.
pub(crate) struct Waker(pub(crate) RawFd);

impl Drop for Waker {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.0);
        }
    }
}

/// Converts an optional timeout into whole milliseconds for the OS call.
///
/// Rounds up so the reactor never wakes just before a timer deadline and
/// spins on a zero timeout. `None` blocks indefinitely (`-1`).
pub(crate) fn timeout_millis(timeout: Option<std::time::Duration>) -> i32 {
    match timeout {
        Some(t) => {
            let millis = t.as_nanos().div_ceil(1_000_000);
            millis.min(i32::MAX as u128) as i32
        }
        None => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::timeout_millis;
    use std::time::Duration;

    #[test]
    fn rounds_partial_millis_up() {
        assert_eq!(timeout_millis(None), -1);
        assert_eq!(timeout_millis(Some(Duration::ZERO)), 0);
        assert_eq!(timeout_millis(Some(Duration::from_micros(1))), 1);
        assert_eq!(timeout_millis(Some(Duration::from_micros(1500))), 2);
        assert_eq!(timeout_millis(Some(Duration::from_secs(u64::MAX))), i32::MAX);
    }
}
