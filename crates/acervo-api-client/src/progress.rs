use acervo_core::models::TransferProgress;
use acervo_core::ProgressSender;
use bytes::Bytes;
use futures::stream::{self, StreamExt};

const CHUNK_SIZE: usize = 64 * 1024;

/// Split a payload into chunks for a streamed request body.
pub(crate) fn chunks(data: &Bytes) -> Vec<Bytes> {
    (0..data.len())
        .step_by(CHUNK_SIZE)
        .map(|start| data.slice(start..(start + CHUNK_SIZE).min(data.len())))
        .collect()
}

/// Request body that reports cumulative bytes handed to the connection.
pub(crate) fn progress_body(data: Bytes, progress: ProgressSender) -> reqwest::Body {
    let total = data.len() as u64;
    let mut sent = 0u64;
    let body = stream::iter(chunks(&data)).map(move |chunk| {
        sent += chunk.len() as u64;
        // A closed receiver only means nobody is watching anymore
        let _ = progress.send(TransferProgress { sent, total });
        Ok::<Bytes, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(body)
}
