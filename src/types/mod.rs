pub mod digest;
pub mod identifiers;
