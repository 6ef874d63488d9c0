pub mod message;
pub mod session;

pub use message::{Citation, Message, Role};
pub use session::{Session, UploadHandle};
