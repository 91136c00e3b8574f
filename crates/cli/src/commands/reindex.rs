//! `ferrochat reindex` — Rebuild the documentation vector index.

use crate::runtime::Runtime;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::bring_up().await?;

    println!(
        "  Reindexing {} ...",
        runtime.config.rag.docs_dir.display()
    );

    let chunks = runtime.index_builder().reindex().await?;

    println!("  Indexed {chunks} chunks.");
    println!("  Index:    {}", runtime.config.rag.index_path.display());
    println!("  Metadata: {}", runtime.config.rag.metadata_path.display());
    Ok(())
}
