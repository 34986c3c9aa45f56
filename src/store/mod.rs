pub mod credentials;
pub mod lock;
