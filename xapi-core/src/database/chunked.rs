//! Split one wide page into consecutive sub-pages fetched concurrently.

use futures::future::try_join_all;
use tracing::debug;

use crate::{
    asset::Asset,
    database::ports::{AssetRepository, Page},
    error::Result,
    filter::AssetFilter,
};

/// Consecutive sub-pages covering `page`, each at most `chunk_size` wide.
pub fn plan_chunks(page: Page, chunk_size: u32) -> Vec<Page> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut offset = 0u32;
    while offset < page.limit {
        let width = chunk_size.min(page.limit - offset);
        chunks.push(Page::new(page.skip + u64::from(offset), width));
        offset += width;
    }
    chunks
}

/// Fetch `page` as parallel chunks and concatenate them in offset order.
///
/// Any failing chunk fails the whole fetch. Chunks are independent reads, so
/// rows inserted or deleted mid-fetch may shift between them.
pub async fn fetch_in_chunks(
    repository: &dyn AssetRepository,
    filter: &AssetFilter,
    page: Page,
    chunk_size: u32,
) -> Result<Vec<Asset>> {
    let chunks = plan_chunks(page, chunk_size);
    debug!(
        skip = page.skip,
        limit = page.limit,
        chunks = chunks.len(),
        "fetching assets in chunks"
    );

    let pages = try_join_all(
        chunks
            .into_iter()
            .map(|chunk| repository.list(filter, chunk)),
    )
    .await?;

    Ok(pages.into_iter().flatten().collect())
}
