pub mod roster;
pub mod validate;
