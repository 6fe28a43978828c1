//! Encoded capture output.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// An encoded raster image (the capture output or a generated image).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, width: u32, height: u32, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            width,
            height,
            bytes,
        }
    }

    /// Base64 payload without any `data:` prefix.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:<mime>;base64,<payload>` URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Suggested file extension for the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        let image = EncodedImage::new("image/jpeg", 1, 1, vec![0xff, 0xd8, 0xff]);
        assert_eq!(image.to_data_url(), "data:image/jpeg;base64,/9j/");
        assert_eq!(image.extension(), "jpg");
    }

    #[test]
    fn test_debug_hides_payload() {
        let image = EncodedImage::new("image/png", 2, 3, vec![1; 64]);
        let debug = format!("{:?}", image);
        assert!(debug.contains("bytes: 64"));
        assert_eq!(image.extension(), "png");
    }

    #[test]
    fn test_serde_uses_base64_payload() {
        let image = EncodedImage::new("image/png", 2, 3, vec![1, 2, 3]);
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["bytes"], "AQID");
        let back: EncodedImage = serde_json::from_value(json).unwrap();
        assert_eq!(back, image);
    }
}
