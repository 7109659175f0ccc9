mod number;

pub mod compare;

pub use compare::json_cmp;
pub use number::Number;
