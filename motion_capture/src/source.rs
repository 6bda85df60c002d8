use core::fmt::Debug;

use crate::reading::Reading;

/// Produces one reading per tick. A failed read skips that tick.
pub trait SampleSource {
    type Error: Debug;

    fn read(&mut self) -> Result<Reading, Self::Error>;
}

impl<F, E> SampleSource for F
where
    F: FnMut() -> Result<Reading, E>,
    E: Debug,
{
    type Error = E;

    fn read(&mut self) -> Result<Reading, E> {
        self()
    }
}
