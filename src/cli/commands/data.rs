//! Stored data maintenance

use tracing::info;

use crate::cli::args::DataClearArgs;
use crate::error::FormWardenError;
use crate::store::{FileStore, clear_all};

/// Deletes every link, event and analytics entry.
///
/// # Errors
///
/// Returns `FormWardenError::Usage` without `--yes`, or a store error if
/// the file cannot be written.
pub fn clear(args: &DataClearArgs) -> Result<(), FormWardenError> {
    if !args.yes {
        return Err(FormWardenError::Usage(
            "refusing to delete all links, events and analytics without --yes".to_string(),
        ));
    }
    let store = FileStore::open(&args.store.path);
    clear_all(&store)?;
    info!(path = %store.path().display(), "store cleared");
    println!("All data cleared.");
    Ok(())
}
