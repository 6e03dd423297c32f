//! Primitives shared by every pipeline stage
//!
//! Stages talk only through [`BlockingQueue`]s carrying encoded records (see
//! [`message`]), and every byte sitting in a queue is accounted for in one
//! shared [`ByteBudget`].

mod budget;
pub mod message;
mod queue;

pub use budget::ByteBudget;
pub use message::{FetchedPage, ParsedPage};
pub use queue::BlockingQueue;
