pub mod capture_log;
pub mod classifier;
pub mod progress;
pub mod signature_catalog;
pub mod types;

pub use capture_log::CaptureLog;
pub use classifier::PacketClassifier;
pub use signature_catalog::{SignatureCatalog, SignatureEntry};
pub use types::{CaptureRecord, Endpoint, ProtocolGuess, SignatureMatch};
