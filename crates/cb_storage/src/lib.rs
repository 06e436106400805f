use std::sync::Arc;

use cb_core::{ArticleStore, Error, JobStore, NewsletterArchive, Result};

pub mod backends;

pub use backends::*;

/// The full persistence surface the pipeline coordinates through.
pub trait Storage: ArticleStore + NewsletterArchive + JobStore {}

impl<T: ArticleStore + NewsletterArchive + JobStore> Storage for T {}

/// Instantiate a storage backend by name.
#[cfg_attr(not(feature = "sqlite"), allow(unused_variables))]
pub async fn create_storage(kind: &str, path: Option<&str>) -> Result<Arc<dyn Storage>> {
    match kind {
        "memory" => Ok(Arc::new(backends::memory::MemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = std::path::PathBuf::from(path.unwrap_or("campus_brief.db"));
            Ok(Arc::new(
                backends::sqlite::SqliteStorage::new_with_path(&path).await?,
            ))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(Error::Storage(
            "built without the sqlite feature".to_string(),
        )),
        other => Err(Error::Storage(format!("unknown storage backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::backends::memory::MemoryStorage;
    pub use super::{create_storage, Storage};
}
