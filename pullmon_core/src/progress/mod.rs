pub mod channel;
pub mod observer;
