pub mod cursor;
pub mod node;
pub mod ops;
