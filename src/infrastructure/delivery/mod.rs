mod console;
mod email;
mod socket;

pub use console::ConsoleDelivery;
pub use email::EmailDelivery;
pub use socket::{SocketDelivery, SocketFrame};
