//! Opt-in embedded PostgreSQL for the Diesel adapter suite.
//!
//! The suite is `#[ignore]`d and additionally gated on `RUN_PG_EMBEDDED`, so
//! `cargo test -- --ignored` alone does not download PostgreSQL binaries.
//! Cluster directories live under the target directory so the bootstrap
//! works in sandboxes that block `/var/tmp`.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use pg_embedded_setup_unpriv::TestCluster;
use uuid::Uuid;

static BOOTSTRAP_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Whether `RUN_PG_EMBEDDED` is set to a truthy value.
pub fn pg_embedded_requested() -> bool {
    std::env::var("RUN_PG_EMBEDDED")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn cluster_dirs() -> Result<(PathBuf, PathBuf), std::io::Error> {
    let base = std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../target"))
        .join("pg-embed")
        .join(format!("mandalart-{}-{}", std::process::id(), Uuid::new_v4()));
    let runtime_dir = base.join("install");
    let data_dir = base.join("data");
    std::fs::create_dir_all(&runtime_dir)?;
    std::fs::create_dir_all(&data_dir)?;
    Ok((runtime_dir, data_dir))
}

/// Start a throwaway cluster, overriding its directories unless the caller
/// already set `PG_RUNTIME_DIR` and `PG_DATA_DIR`.
pub fn test_cluster() -> Result<TestCluster, String> {
    let _bootstrap = BOOTSTRAP_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let needs_override =
        std::env::var_os("PG_RUNTIME_DIR").is_none() || std::env::var_os("PG_DATA_DIR").is_none();
    let _env = if needs_override {
        let (runtime_dir, data_dir) = cluster_dirs().map_err(|err| err.to_string())?;
        Some(env_lock::lock_env([
            ("PG_RUNTIME_DIR", Some(runtime_dir.to_string_lossy().into_owned())),
            ("PG_DATA_DIR", Some(data_dir.to_string_lossy().into_owned())),
        ]))
    } else {
        None
    };

    TestCluster::new().map_err(|err| format!("{err:?}"))
}
