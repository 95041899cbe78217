/**
 * Adapters for the content-addressed stores documents
 *  are pinned to: a hosted pinning service, a local
 *  IPFS node (with gateway fallback) and an in-memory
 *  store for tests and development.
 */
pub mod content_store;
/**
 * Optional password sealing of documents before
 *  they reach the content store.
 */
pub mod encryption;
/**
 * Derivation of the string a document is registered
 *  under on the ledger.
 */
pub mod fingerprint;
/**
 * Client for the on-chain document registry.
 *  JSON-RPC transport, ABI codec and legacy
 *  transaction signing.
 */
pub mod ledger;
/**
 * Upload and verification flows over a content store
 *  and a ledger.
 */
pub mod registry;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::content_store::{
        ContentId, ContentStore, ContentStoreConfig, ContentStoreError, DynContentStore,
    };
    pub use crate::encryption::{EncryptionError, Password};
    pub use crate::fingerprint::{Fingerprint, FingerprintError, FingerprintScheme};
    pub use crate::ledger::{
        Address, DynLedger, Ledger, LedgerConfig, LedgerError, Registration, Signer, TxHash,
    };
    pub use crate::registry::{
        Document, DocumentService, RetrievalError, UploadResult, VerificationResult,
    };
    pub use crate::version::build_info;
}
