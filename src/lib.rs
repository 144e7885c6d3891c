pub mod record;
pub mod message;
pub mod context;
pub mod attachment;
pub mod payload;
pub mod transport;
pub mod error;
pub mod slack;
pub mod sink;
pub mod layer;

pub mod env;
pub mod init;
