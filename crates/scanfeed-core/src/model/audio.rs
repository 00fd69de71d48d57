use bytes::Bytes;

/// A call recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub data: Bytes,
    pub content_type: String,
    pub filename: Option<String>,
}

impl AudioClip {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension matching the content type, for saving to disk.
    pub fn extension(&self) -> &'static str {
        extension_for(&self.content_type)
    }
}

/// File extension for an audio MIME type; mp3 when unrecognised.
pub fn extension_for(content_type: &str) -> &'static str {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    match mime {
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "audio/aac" => "m4a",
        "audio/ogg" | "audio/opus" => "ogg",
        _ => "mp3",
    }
}
