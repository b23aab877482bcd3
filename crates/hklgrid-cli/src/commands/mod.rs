pub mod bin;
pub mod columns;
pub mod map;
pub mod scale;

#[cfg(test)]
pub(crate) mod test_support;
