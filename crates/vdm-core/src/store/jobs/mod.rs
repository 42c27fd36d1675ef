//! Job row reads and writes.

mod read;
mod write;
