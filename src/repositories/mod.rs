pub mod document;
pub mod firestore;
pub mod listing;
pub mod memory;
pub mod token;

pub use document::{DocumentStore, StoreError};
pub use firestore::FirestoreStore;
pub use listing::{ListingRepository, POSTS_COLLECTION};
pub use memory::MemoryStore;
pub use token::{ServiceAccountTokens, StaticToken, TokenSource};
