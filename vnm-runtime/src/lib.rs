pub mod error;
pub mod interp;
pub mod value;
