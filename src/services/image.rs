// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Face-photo upload pipeline: presign, direct PUT, object URL.

use serde::Serialize;

use crate::error::{ApiError, Result};
use crate::services::backend::FortuneClient;

/// Upload size cap enforced before any network call (5 MB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Image formats the analysis backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Derive the backend enum from a file name's extension.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "jpg" | "jpeg" => Ok(ImageKind::Jpeg),
            "png" => Ok(ImageKind::Png),
            _ => Err(ApiError::Validation(
                "지원하지 않는 이미지 형식입니다. (허용: JPEG, PNG)".to_string(),
            )),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }
}

/// Strip the signature query from a presigned URL to get the object URL the
/// analysis endpoint should reference.
pub fn object_url(presigned_url: &str) -> &str {
    presigned_url
        .split('?')
        .next()
        .unwrap_or(presigned_url)
}

/// Run the full upload: validate locally, obtain a presigned URL, PUT the
/// bytes, and return the object URL plus the wire image type.
pub async fn upload_face_image(
    client: &FortuneClient,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<(String, ImageKind)> {
    let kind = ImageKind::from_file_name(file_name)?;
    if bytes.is_empty() {
        return Err(ApiError::Validation("얼굴 사진을 업로드해주세요.".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::Validation(
            "파일 크기는 5MB를 초과할 수 없습니다.".to_string(),
        ));
    }

    let presigned_url = client.request_presigned_url(file_name).await?;
    client
        .upload_image(&presigned_url, bytes, kind.content_type())
        .await?;

    tracing::info!(file_name, "Face photo uploaded");
    Ok((object_url(&presigned_url).to_string(), kind))
}
