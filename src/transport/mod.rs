mod communicator;
mod message;
pub mod protocol;

pub use communicator::{Communicator, Delivery};
pub use message::{Inbound, Message};
