//! Integration tests for the recsort library.
//!
//! These tests validate end-to-end workflows that span multiple modules:
//! generate → index → sort → rewrite → verify, on both execution backends
//! and on the distributed merge tree.

mod helpers;
mod test_distributed;
mod test_error_paths;
mod test_sort_pipeline;
