mod resolver;
mod signature;
mod table;

pub use resolver::*;
pub use signature::*;
pub use table::*;
