pub mod layout;
pub mod toc;

pub use layout::{ensure_directory, Layout};
pub use toc::{build as build_toc, read_manifest, touch_manifest, Toc};
