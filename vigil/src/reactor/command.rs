use std::time::Instant;

/// A unit of work executed on the reactor thread.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Messages sent from reactor handles to the reactor loop.
pub(crate) enum Command {
    /// Run the job on the next loop turn.
    Schedule(Job),
    /// Run the job once `deadline` has passed.
    SetTimer { deadline: Instant, job: Job },
}
