pub mod artifact;
pub mod linear;
pub mod trainer;
