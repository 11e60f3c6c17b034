pub mod fixed;
pub mod yahoo;
