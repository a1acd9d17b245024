mod cycle;
mod interface;
mod keyed;
mod lock;

pub use interface::*;
pub use keyed::*;
pub use lock::*;
