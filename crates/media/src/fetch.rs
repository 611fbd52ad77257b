//! Streaming download into a candidate's input store.

use {futures::StreamExt, tracing::debug, webp2u_config::MediaConfig};

use crate::{
    Error, Result,
    candidate::MediaCandidate,
    http::{MediaClient, parse_url},
};

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: MediaClient,
    chunk_size: usize,
}

impl Fetcher {
    #[must_use]
    pub fn new(client: MediaClient, chunk_size: usize) -> Self {
        Self {
            client,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn from_config(client: MediaClient, config: &MediaConfig) -> Self {
        Self::new(client, config.chunk_size)
    }

    /// Download the candidate's URL into its input store and rewind the store.
    ///
    /// Returns the number of bytes stored. The body is consumed in pieces of
    /// at most `chunk_size` bytes; a declared or actual size above the store
    /// ceiling aborts the download.
    pub async fn fetch(&self, candidate: &mut MediaCandidate) -> Result<u64> {
        let url = parse_url(candidate.url())?;
        let fetch_error = |source| Error::Fetch {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(&url).await.map_err(fetch_error)?;

        let store = &mut candidate.input;
        if let Some(declared) = response.content_length()
            && declared > store.max_bytes()
        {
            return Err(Error::TooLarge {
                limit: store.max_bytes(),
            });
        }

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(fetch_error)?;
            for piece in chunk.chunks(self.chunk_size) {
                store.write_chunk(piece)?;
            }
        }
        store.rewind()?;

        debug!(url = %url, bytes = store.len(), on_disk = store.path().is_some(), "media fetched");
        Ok(store.len())
    }
}
