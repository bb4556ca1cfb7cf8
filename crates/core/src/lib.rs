pub mod common;
pub mod config;

pub mod market {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod forecast {
    pub mod entity;
    pub mod error;
    pub mod normalizer;
    pub mod port;
}

pub mod model {
    pub mod error;
}

pub mod store {
    pub mod error;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
