pub mod errors;
pub mod message;
pub mod smtp;

pub use errors::NotifyError;
pub use message::render_body;
pub use smtp::SmtpNotifier;
