//! File actions taken on a reconciliation result.
//!
//! Currently one action: copying the missing source files into the target
//! tree so a second run finds them.
//!
//! ```no_run
//! use hashrecon::actions::copy_missing;
//! use std::path::{Path, PathBuf};
//!
//! let missing = vec![PathBuf::from("/photos/2019/beach.jpg")];
//! let result = copy_missing(&missing, Path::new("/photos"), Path::new("/mnt/backup"), None);
//! println!("{}", result.summary());
//! ```

pub mod copy;

pub use copy::{
    copy_missing, copy_one, destination_for, BatchCopyResult, CopyError, CopyResult, COPY_PHASE,
    MISSED_FILES_DIR,
};
