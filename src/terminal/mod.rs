//! Terminal output: a [`Surface`](crate::target::Surface) backed by a
//! true-color terminal.

mod output;
mod region;
mod surface;

pub use output::OutputBuffer;
pub use region::Region;
pub use surface::TerminalSurface;
