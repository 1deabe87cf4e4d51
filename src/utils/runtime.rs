use anyhow::Result;

/// All tracker mutations are serialized on one thread, so the binary never needs more.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
