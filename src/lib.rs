#![doc = include_str!("RUSTDOC.md")]

pub mod logger;
pub mod resource;

#[cfg(test)]
pub mod test_support;
