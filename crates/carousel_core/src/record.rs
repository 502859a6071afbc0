use thiserror::Error;

/// Column width of the result store.
pub const MAX_COLUMN_CHARS: usize = 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("{column} exceeds the column width")]
    TooLong { column: &'static str },
}

/// One selection, ready to be positioned and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestedImage {
    pub image_url: String,
    pub manifest_url: String,
    pub related_url: Option<String>,
    pub label: Option<String>,
}

impl HarvestedImage {
    /// Fits a selection into the store's columns.
    ///
    /// URLs cannot be shortened: an over-long image or manifest URL rejects
    /// the record, and an over-long related URL is replaced by the manifest
    /// URL. Labels are cut at the column width.
    pub fn new(
        image_url: String,
        manifest_url: String,
        related_url: Option<String>,
        label: Option<String>,
    ) -> Result<Self, RecordError> {
        if image_url.chars().count() > MAX_COLUMN_CHARS {
            return Err(RecordError::TooLong { column: "image_url" });
        }
        if manifest_url.chars().count() > MAX_COLUMN_CHARS {
            return Err(RecordError::TooLong {
                column: "manifest_url",
            });
        }
        let related_url = match related_url {
            Some(url) if url.chars().count() > MAX_COLUMN_CHARS => Some(manifest_url.clone()),
            other => other,
        };
        let label = label.map(|text| truncate_chars(&text, MAX_COLUMN_CHARS));
        Ok(Self {
            image_url,
            manifest_url,
            related_url,
            label,
        })
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(len: usize) -> String {
        format!("https://example.org/{}", "a".repeat(len - "https://example.org/".len()))
    }

    #[test]
    fn long_label_is_truncated_on_char_boundary() {
        let label = "画".repeat(MAX_COLUMN_CHARS + 5);
        let image = HarvestedImage::new(url(40), url(40), None, Some(label)).unwrap();
        assert_eq!(image.label.unwrap().chars().count(), MAX_COLUMN_CHARS);
    }

    #[test]
    fn long_related_url_falls_back_to_manifest() {
        let manifest = url(50);
        let image =
            HarvestedImage::new(url(40), manifest.clone(), Some(url(2000)), None).unwrap();
        assert_eq!(image.related_url, Some(manifest));
    }

    #[test]
    fn long_image_url_is_rejected() {
        let err = HarvestedImage::new(url(1025), url(40), None, None).unwrap_err();
        assert_eq!(err, RecordError::TooLong { column: "image_url" });
    }
}
