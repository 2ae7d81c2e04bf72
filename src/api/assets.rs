//! Static asset URLs: patient photos, doctor signatures, placeholder avatars.

use reqwest::Url;

use super::client::ApiClient;

const AVATAR_SERVICE: &str = "https://ui-avatars.com/api/";
const AVATAR_BACKGROUND: &str = "0d6efd";
const AVATAR_COLOR: &str = "fff";
const AVATAR_SIZE: &str = "128";

/// Where a patient's photo is served from. Only the file name of the
/// stored path matters.
pub fn photo_url(origin: &str, stored_path: &str) -> Option<String> {
    let file_name = stored_path
        .rsplit(['/', '\\'])
        .next()
        .filter(|f| !f.is_empty())?;
    Some(format!(
        "{}/patient-image/{file_name}",
        origin.trim_end_matches('/')
    ))
}

/// Signatures are served at their stored path relative to the origin.
pub fn signature_url(origin: &str, stored_path: &str) -> Option<String> {
    let path = stored_path.trim().trim_start_matches('/');
    if path.is_empty() {
        return None;
    }
    Some(format!("{}/{path}", origin.trim_end_matches('/')))
}

/// Generated initials avatar for `name`.
pub fn placeholder_avatar_url(name: &str) -> String {
    Url::parse_with_params(
        AVATAR_SERVICE,
        &[
            ("name", name),
            ("background", AVATAR_BACKGROUND),
            ("color", AVATAR_COLOR),
            ("size", AVATAR_SIZE),
        ],
    )
    .map(String::from)
    .unwrap_or_else(|_| AVATAR_SERVICE.to_string())
}

/// An image ready for display: either the real asset or the placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedImage {
    Asset { url: String, bytes: Vec<u8> },
    Placeholder { url: String },
}

impl ResolvedImage {
    pub fn url(&self) -> &str {
        match self {
            Self::Asset { url, .. } | Self::Placeholder { url } => url,
        }
    }
}

/// Which kind of stored asset a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    PatientPhoto,
    Signature,
}

impl AssetKind {
    pub fn url(self, origin: &str, stored_path: &str) -> Option<String> {
        match self {
            Self::PatientPhoto => photo_url(origin, stored_path),
            Self::Signature => signature_url(origin, stored_path),
        }
    }
}

/// Fetch a stored image, falling back to the placeholder avatar for `name`
/// when there is none or the load fails.
pub async fn resolve_image(
    client: &ApiClient,
    kind: AssetKind,
    name: &str,
    stored_path: Option<&str>,
) -> ResolvedImage {
    let placeholder = || ResolvedImage::Placeholder {
        url: placeholder_avatar_url(name),
    };
    let Some(url) = stored_path.and_then(|p| kind.url(client.origin(), p)) else {
        return placeholder();
    };
    match client.fetch_absolute(&url).await {
        Ok(bytes) => ResolvedImage::Asset { url, bytes },
        Err(e) => {
            tracing::debug!(%url, ?kind, error = %e, "Image unavailable, using placeholder");
            placeholder()
        }
    }
}
