//! Common test utilities and fixtures

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use replaxy::memory::MemoryBridge;
use replaxy::orchestrator::{CallMetadata, Orchestrator, OrchestratorBuilder};
use replaxy::persona::PersonaCatalog;
use replaxy::runtime::MockRuntime;
use replaxy::session::SessionStore;
use replaxy::CallSession;

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get a path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn valid_config_fixture() -> PathBuf {
    fixture_path("valid_config.toml")
}

pub fn invalid_config_fixture() -> PathBuf {
    fixture_path("invalid_config.toml")
}

pub fn valid_agents_fixture() -> PathBuf {
    fixture_path("valid_agents.toml")
}

pub fn invalid_agents_fixture() -> PathBuf {
    fixture_path("invalid_agents.toml")
}

/// A call on the mock runtime plus handles to inspect it
pub struct TestCall {
    pub call: CallSession,
    pub runtime: Arc<MockRuntime>,
    pub store: Arc<SessionStore>,
}

pub fn builder(catalog: PersonaCatalog, runtime: &Arc<MockRuntime>) -> OrchestratorBuilder {
    Orchestrator::builder(Arc::new(catalog), runtime.clone())
}

/// Start a call with the built-in personas and no memory
pub async fn start_builtin(call_id: &str) -> TestCall {
    start_with(PersonaCatalog::builtin(), call_id, CallMetadata::default(), MemoryBridge::disabled()).await
}

pub async fn start_with(
    catalog: PersonaCatalog,
    call_id: &str,
    metadata: CallMetadata,
    memory: MemoryBridge,
) -> TestCall {
    let runtime = Arc::new(MockRuntime::new(call_id));
    let store = Arc::new(SessionStore::new());
    let orchestrator = builder(catalog, &runtime).metadata(metadata).build();
    let call = CallSession::start(orchestrator, Some(store.clone()), memory)
        .await
        .unwrap();
    TestCall { call, runtime, store }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_dir_exists() {
        assert!(fixtures_dir().exists(), "Fixtures directory should exist");
    }

    #[test]
    fn test_fixture_files_exist() {
        for path in [
            valid_config_fixture(),
            invalid_config_fixture(),
            valid_agents_fixture(),
            invalid_agents_fixture(),
        ] {
            assert!(path.exists(), "{} should exist", path.display());
        }
    }
}
