//! Shared fixtures for daemon tests.

use crate::bridge;
use crate::config::Config;
use crate::ctx::HostCtx;
use crate::host_tools;
use crate::providers::{Provider, ProviderRegistry};
use berth_core::{Outcome, Session, ToolContext};
use berth_store::{Db, DbLayout};
use berth_tools::Invocation;
use berth_wire::{FrameReader, Message};
use std::path::Path;
use std::sync::Arc;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixStream;

pub fn test_ctx(root: &Path) -> Arc<HostCtx> {
    test_ctx_with_providers(root, ProviderRegistry::new())
}

pub fn test_ctx_with_providers(root: &Path, providers: ProviderRegistry) -> Arc<HostCtx> {
    let mut config = Config::default();
    config.root = root.to_path_buf();
    let db = Db::open(DbLayout::new(root)).unwrap();
    let ctx = Arc::new(HostCtx::new(config, db, providers));
    ctx.set_registry(Arc::new(host_tools::host_registry()));
    ctx
}

pub fn test_ctx_with_provider(root: &Path, provider: Arc<dyn Provider>) -> Arc<HostCtx> {
    let mut providers = ProviderRegistry::new();
    providers.register(provider);
    test_ctx_with_providers(root, providers)
}

/// Seed a session record directly into the store.
pub fn seed_session(ctx: &HostCtx, session: Session) {
    ctx.db.lock().sessions.create(session).unwrap();
}

/// Wire a fake child onto a session: the host side goes through
/// `spawn_connection`, the returned halves play the child.
pub fn attach_fake_child(
    ctx: &Arc<HostCtx>,
    session_id: u64,
) -> (FrameReader<tokio::net::unix::OwnedReadHalf>, OwnedWriteHalf) {
    let (host_side, child_side) = UnixStream::pair().unwrap();
    bridge::spawn_connection(Arc::clone(ctx), ctx.registry(), session_id, host_side);
    let (read_half, write_half) = child_side.into_split();
    (FrameReader::new(read_half), write_half)
}

/// Run a host tool handler by name.
pub async fn invoke(ctx: &Arc<HostCtx>, tool: &str, args: serde_json::Value) -> Outcome {
    let registry = ctx.registry();
    let handler = registry.handler(tool).unwrap_or_else(|| panic!("no handler for {tool}"));
    let invocation = Invocation::first(
        args,
        ToolContext { session_id: 0, tool_call_id: format!("test_{tool}") },
    );
    handler.execute(ctx, invocation).await
}

/// Send one framed message as the child.
pub async fn child_send(writer: &mut OwnedWriteHalf, message: &Message) {
    berth_wire::write_frame(writer, message).await.unwrap();
}
