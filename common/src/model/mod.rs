pub mod generation;
pub mod layout;
pub mod replacement;
pub mod resync;
pub mod row;
