pub mod server;
pub mod sse_stream;
pub mod types;
