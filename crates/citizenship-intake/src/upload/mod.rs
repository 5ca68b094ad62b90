//! Upload relay: base64 payload in, blob storage URL out.

pub mod path;
pub mod relay;
pub mod router;
pub mod storage;

pub use path::{extension_of, sanitize_segment, storage_path};
pub use relay::{UploadError, UploadReceipt, UploadRelay, UploadRequest};
pub use router::upload_router;
pub use storage::{
    BlobStore, BlobStoreError, FilesystemBlobStore, MemoryBlobStore, PutOptions, StoredBlob,
};
