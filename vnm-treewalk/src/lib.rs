pub mod interp;
mod stack;
