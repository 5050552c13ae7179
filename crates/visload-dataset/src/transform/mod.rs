mod mapper;
mod options;
mod shuffle;

pub use mapper::*;
pub use options::*;
pub use shuffle::*;
