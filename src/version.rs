use std::sync::LazyLock;

/// Version string reported by `--version` and the startup banner.
pub static VERSION: LazyLock<String> =
    LazyLock::new(|| env!("CARGO_PKG_VERSION").to_string());
