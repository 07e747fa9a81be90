pub mod poller;
pub mod sampler;
