mod poller;
mod source;
mod verdict;

pub use poller::*;
pub use source::*;
pub use verdict::*;
