//! Repository implementations

pub mod post_records;
