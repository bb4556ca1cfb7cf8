pub mod buffer;
pub mod check;
pub mod evaluate;
pub mod forecast;
pub mod live;
pub mod window;
