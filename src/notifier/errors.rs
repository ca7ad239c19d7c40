use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("invalid address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("email service returned {status}: {detail}")]
    Remote { status: u16, detail: String },

    #[error("email service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}
