#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod allocator;
mod counter;
mod error;
mod floor;
mod mutex;
mod scope;
mod store;

pub use crate::allocator::*;
pub use crate::counter::*;
pub use crate::error::*;
pub use crate::floor::*;
pub use crate::scope::*;
pub use crate::store::*;
