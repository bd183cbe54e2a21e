use bytes::Bytes;
use futures::Stream;
use multer::{Constraints, Field, Multipart, SizeLimit};
use std::path::Path;
use tempfile::TempPath;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Filename prefix of staged video uploads in the temp dir.
pub const VIDEO_STAGING_PREFIX: &str = "tubely-upload-";
/// Filename prefix of staged thumbnails inside the assets root.
pub const THUMBNAIL_STAGING_PREFIX: &str = ".tubely-thumbnail-";

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("missing Content-Type header")]
    MissingContentType,

    #[error("invalid multipart request: {0}")]
    Multipart(multer::Error),

    #[error("upload exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to write staged file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<multer::Error> for StagingError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::FieldSizeExceeded { limit, .. } => StagingError::TooLarge { limit },
            multer::Error::StreamSizeExceeded { limit } => StagingError::TooLarge { limit },
            other => StagingError::Multipart(other),
        }
    }
}

/// Wrap a raw request body in a streaming multipart parser capped at
/// `max_bytes`. Nothing is read until fields are requested.
pub fn open_multipart<S, O, E>(
    content_type: Option<&str>,
    body: S,
    max_bytes: u64,
) -> Result<Multipart<'static>, StagingError>
where
    S: Stream<Item = Result<O, E>> + Send + 'static,
    O: Into<Bytes> + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let content_type = content_type.ok_or(StagingError::MissingContentType)?;
    let boundary = multer::parse_boundary(content_type)?;

    let constraints = Constraints::new().size_limit(
        SizeLimit::new()
            .whole_stream(max_bytes)
            .per_field(max_bytes),
    );

    Ok(Multipart::with_constraints(body, boundary, constraints))
}

/// Advance to the first field called `name`, draining any other fields.
pub async fn find_field<'r>(
    multipart: &mut Multipart<'r>,
    name: &str,
) -> Result<Option<Field<'r>>, StagingError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() == Some(name) {
            return Ok(Some(field));
        }
        while field.chunk().await?.is_some() {}
    }
    Ok(None)
}

/// Stream a field's bytes into a new temp file under `dir`.
///
/// The returned [`TempPath`] deletes the file when dropped, so an error or a
/// dropped request future reclaims whatever was partially written.
pub async fn stage_field(
    field: &mut Field<'_>,
    dir: &Path,
    prefix: &str,
    suffix: &str,
) -> Result<(TempPath, u64), StagingError> {
    let named = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)?;
    let (file, path) = named.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;

    Ok((path, written))
}
