pub mod batch;
pub mod message;
pub mod owner;
mod util;

pub use batch::*;
pub use message::*;
pub use owner::*;
pub use util::*;
