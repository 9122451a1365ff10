// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fortune K.I backend client.
//!
//! Handles:
//! - Credential login / signup / logout
//! - Fortune computations and per-result detail fetches
//! - History index and profile-name lookup
//! - Presigned image upload for the face-reading service
//!
//! Authenticated calls attach the stored bearer token. A 401/403 response
//! clears the token store before surfacing [`ApiError::AuthExpired`], so the
//! session layer only has to drop its in-memory state.

use chrono::{NaiveDate, NaiveTime};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::services::aggregator::{
    DailyFortuneData, DreamData, FaceReadingData, LifeFortuneData,
};
use crate::services::image::ImageKind;
use crate::store::{TokenPair, TokenStore};

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Response envelope shared by every backend endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: Code,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// `code` arrives as a number from some backend revisions and as a string
/// from others; both spell success as 200.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Code {
    Number(i64),
    Text(String),
}

impl Code {
    pub fn is_success(&self) -> bool {
        match self {
            Code::Number(code) => *code == 200,
            Code::Text(code) => code == "200",
        }
    }
}

impl<T> Envelope<T> {
    /// Success = code 200 (either spelling) and a data payload present.
    fn into_data(self, status: u16) -> Result<T> {
        match self.data {
            Some(data) if self.code.is_success() => Ok(data),
            _ => Err(ApiError::RequestFailed {
                status: Some(status),
                message: if self.message.is_empty() {
                    "unexpected response".to_string()
                } else {
                    self.message
                },
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

/// App-wide statistics (`/api/fortune/statistics`, unauthenticated).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatisticsData {
    pub total_users: u64,
    pub face_result_count: u64,
    pub life_long_result_count: u64,
    pub daily_fortune_result_count: u64,
    pub dream_interpretation_result_count: u64,
}

/// One entry of the result-history index (`/api/fortune/statistics/findAll`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultIndexEntry {
    pub result_type: String,
    pub result_id: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ResultIndexData {
    results: Vec<ResultIndexEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct PresignData {
    url: String,
}

/// Signup request body (`POST /api/user`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub year: String,
    pub month: String,
    pub day: String,
    pub birth_time: BirthHour,
}

/// Traditional two-hour birth slots the signup endpoint expects, plus the
/// explicit `Missing` sentinel for an unknown birth time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BirthHour {
    Missing,
    Ja,   // 23:30 ~ 01:30
    Chuk, // 01:30 ~ 03:30
    In,   // 03:30 ~ 05:30
    Myo,  // 05:30 ~ 07:30
    Jin,  // 07:30 ~ 09:30
    Sa,   // 09:30 ~ 11:30
    #[serde(rename = "OH")]
    Oh, // 11:30 ~ 13:30
    Mi,   // 13:30 ~ 15:30
    Sin,  // 15:30 ~ 17:30
    Yu,   // 17:30 ~ 19:30
    Sul,  // 19:30 ~ 21:30
    Hae,  // 21:30 ~ 23:30
}

impl BirthHour {
    const SLOTS: [BirthHour; 12] = [
        BirthHour::Ja,
        BirthHour::Chuk,
        BirthHour::In,
        BirthHour::Myo,
        BirthHour::Jin,
        BirthHour::Sa,
        BirthHour::Oh,
        BirthHour::Mi,
        BirthHour::Sin,
        BirthHour::Yu,
        BirthHour::Sul,
        BirthHour::Hae,
    ];

    /// Map a clock time to its slot; `None` maps to `Missing`.
    pub fn from_time(time: Option<NaiveTime>) -> Self {
        use chrono::Timelike;

        let Some(time) = time else {
            return BirthHour::Missing;
        };
        // Slots are offset half an hour from the even hours: 23:30 opens Ja.
        let minutes = time.hour() * 60 + time.minute();
        let index = ((minutes + 30) % 1440) / 120;
        Self::SLOTS[index as usize]
    }
}

/// Chinese zodiac sign selected for the daily fortune.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Zodiac {
    Rat,
    Ox,
    Tiger,
    Rabbit,
    Dragon,
    Snake,
    Horse,
    Goat,
    Monkey,
    Rooster,
    Dog,
    Pig,
}

/// Face analysis request (`POST /api/fortune/face`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceAnalyzeRequest {
    pub image_url: String,
    pub image_type: ImageKind,
}

/// Daily fortune request (`POST /api/fortune/daily`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyFortuneRequest {
    pub birth_date: NaiveDate,
    pub zodiac_sign: Zodiac,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concern: Option<String>,
}

/// Dream interpretation request (`POST /api/fortune/dream`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamRequest {
    pub dream_description: String,
}

/// Life-long fortune request (`POST /api/fortune/total`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeFortuneRequest {
    pub birth_date: NaiveDate,
    pub birth_time: NaiveTime,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client for the Fortune K.I backend.
#[derive(Clone)]
pub struct FortuneClient {
    http: reqwest::Client,
    base_url: String,
    store: TokenStore,
}

impl FortuneClient {
    pub fn new(config: &Config, store: TokenStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base.clone(),
            store,
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ─── Auth ────────────────────────────────────────────────────────────────

    /// Exchange credentials for a token pair. Does not persist them; the
    /// session layer owns the store write so a failed login leaves no state.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .send_unauthed(self.http.post(self.url("/api/security/email/login")).json(&body))
            .await?;
        let tokens: TokenResponse = Self::decode_envelope(response).await?;

        if tokens.access_token.is_empty() || tokens.refresh_token.is_empty() {
            return Err(ApiError::RequestFailed {
                status: Some(200),
                message: "토큰이 응답에 없습니다.".to_string(),
            });
        }

        Ok(TokenPair {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// Create an account; returns the created user id.
    pub async fn signup(&self, request: &SignupRequest) -> Result<String> {
        let response = self
            .send_unauthed(self.http.post(self.url("/api/user")).json(request))
            .await?;
        let created: serde_json::Value = Self::decode_envelope(response).await?;
        Ok(match created {
            serde_json::Value::String(id) => id,
            other => other.to_string(),
        })
    }

    /// Server-side logout. Best-effort from the caller's point of view; the
    /// local teardown never depends on this succeeding.
    pub async fn logout(&self) -> Result<()> {
        let response = self
            .send_authed(self.http.post(self.url("/api/security/common/logout")))
            .await?;
        Self::expect_ok(response).await
    }

    // ─── Profile & statistics ────────────────────────────────────────────────

    /// App-wide statistics; unauthenticated.
    pub async fn fetch_statistics(&self) -> Result<StatisticsData> {
        let response = self
            .send_unauthed(self.http.get(self.url("/api/fortune/statistics")))
            .await?;
        Self::decode_envelope(response).await
    }

    /// The server-side display name for the logged-in user.
    pub async fn fetch_profile_name(&self) -> Result<String> {
        let response = self
            .send_authed(self.http.get(self.url("/api/info/me")))
            .await?;
        Self::decode_envelope(response).await
    }

    // ─── Result history ──────────────────────────────────────────────────────

    pub async fn fetch_result_index(&self) -> Result<Vec<ResultIndexEntry>> {
        let response = self
            .send_authed(self.http.get(self.url("/api/fortune/statistics/findAll")))
            .await?;
        let data: ResultIndexData = Self::decode_envelope(response).await?;
        Ok(data.results)
    }

    pub async fn fetch_face_detail(&self, result_id: &str) -> Result<FaceReadingData> {
        self.fetch_detail("/api/fortune/face", result_id).await
    }

    pub async fn fetch_dream_detail(&self, result_id: &str) -> Result<DreamData> {
        self.fetch_detail("/api/fortune/dream", result_id).await
    }

    pub async fn fetch_daily_detail(&self, result_id: &str) -> Result<DailyFortuneData> {
        self.fetch_detail("/api/fortune/daily", result_id).await
    }

    pub async fn fetch_life_detail(&self, result_id: &str) -> Result<LifeFortuneData> {
        self.fetch_detail("/api/fortune/total", result_id).await
    }

    async fn fetch_detail<T: DeserializeOwned>(&self, prefix: &str, result_id: &str) -> Result<T> {
        let path = format!("{}/{}", prefix, urlencoding::encode(result_id));
        let response = self.send_authed(self.http.get(self.url(&path))).await?;
        Self::decode_envelope(response).await
    }

    // ─── Fortune computations ────────────────────────────────────────────────

    pub async fn analyze_face(&self, request: &FaceAnalyzeRequest) -> Result<FaceReadingData> {
        let response = self
            .send_authed(self.http.post(self.url("/api/fortune/face")).json(request))
            .await?;
        Self::decode_envelope(response).await
    }

    pub async fn daily_fortune(&self, request: &DailyFortuneRequest) -> Result<DailyFortuneData> {
        let response = self
            .send_authed(self.http.post(self.url("/api/fortune/daily")).json(request))
            .await?;
        Self::decode_envelope(response).await
    }

    pub async fn interpret_dream(&self, request: &DreamRequest) -> Result<DreamData> {
        let response = self
            .send_authed(self.http.post(self.url("/api/fortune/dream")).json(request))
            .await?;
        Self::decode_envelope(response).await
    }

    pub async fn life_fortune(&self, request: &LifeFortuneRequest) -> Result<LifeFortuneData> {
        let response = self
            .send_authed(self.http.post(self.url("/api/fortune/total")).json(request))
            .await?;
        Self::decode_envelope(response).await
    }

    // ─── Image upload ────────────────────────────────────────────────────────

    /// Obtain a presigned upload URL for a face photo.
    pub async fn request_presigned_url(&self, file_name: &str) -> Result<String> {
        let body = serde_json::json!({ "fileName": file_name });
        let response = self
            .send_authed(self.http.post(self.url("/api/fortune/face/picture")).json(&body))
            .await?;
        let presign: PresignData = Self::decode_envelope(response).await?;
        Ok(presign.url)
    }

    /// Upload image bytes straight to the presigned URL. The URL is already
    /// signed, so no bearer token is attached.
    pub async fn upload_image(
        &self,
        presigned_url: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let response = self
            .http
            .put(presigned_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::RequestFailed {
                status: Some(status.as_u16()),
                message: "이미지 업로드 실패".to_string(),
            });
        }
        Ok(())
    }

    // ─── Generic request plumbing (also used by the admin client) ────────────

    pub(crate) async fn get_authed<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send_authed(self.http.get(self.url(path))).await?;
        Self::decode_envelope(response).await
    }

    pub(crate) async fn post_authed<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .send_authed(self.http.post(self.url(path)).json(body))
            .await?;
        Self::decode_envelope(response).await
    }

    pub(crate) async fn post_authed_ok<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let response = self
            .send_authed(self.http.post(self.url(path)).json(body))
            .await?;
        Self::expect_ok(response).await
    }

    pub(crate) async fn delete_authed_ok<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let response = self
            .send_authed(self.http.delete(self.url(path)).json(body))
            .await?;
        Self::expect_ok(response).await
    }

    /// Attach the stored bearer token and send. No token is a terminal
    /// client-side error; 401/403 clears the store.
    async fn send_authed(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let tokens = self.store.get().ok_or(ApiError::NoToken)?;

        let response = request
            .bearer_auth(&tokens.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.store.clear();
            tracing::warn!(status = status.as_u16(), "Authenticated call rejected; session cleared");
            return Err(ApiError::AuthExpired);
        }

        Ok(response)
    }

    async fn send_unauthed(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)
    }

    /// Decode the envelope, requiring success code and present data.
    async fn decode_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            // Pull the backend message out of the error body when there is one
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .map(|envelope| envelope.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(ApiError::RequestFailed {
                status: Some(status.as_u16()),
                message,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            ApiError::RequestFailed {
                status: Some(status.as_u16()),
                message: format!("invalid response body: {}", e),
            }
        })?;
        envelope.into_data(status.as_u16())
    }

    /// Like `decode_envelope` but for action endpoints whose `data` may be
    /// null on success; only the status and envelope code are checked.
    async fn expect_ok(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .map(|envelope| envelope.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(ApiError::RequestFailed {
                status: Some(status.as_u16()),
                message,
            });
        }

        if let Ok(envelope) = serde_json::from_str::<Envelope<serde_json::Value>>(&body) {
            if !envelope.code.is_success() {
                return Err(ApiError::RequestFailed {
                    status: Some(status.as_u16()),
                    message: if envelope.message.is_empty() {
                        "unexpected response".to_string()
                    } else {
                        envelope.message
                    },
                });
            }
        }
        Ok(())
    }
}

fn transport_error(error: reqwest::Error) -> ApiError {
    ApiError::RequestFailed {
        status: None,
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_accepts_number_and_string() {
        let numeric: Envelope<String> =
            serde_json::from_str(r#"{"code":200,"message":"OK","data":"x"}"#).unwrap();
        assert!(numeric.code.is_success());

        let text: Envelope<String> =
            serde_json::from_str(r#"{"code":"200","message":"OK","data":"x"}"#).unwrap();
        assert!(text.code.is_success());

        let failure: Envelope<String> =
            serde_json::from_str(r#"{"code":"500","message":"err","data":null}"#).unwrap();
        assert!(!failure.code.is_success());
    }

    #[test]
    fn test_envelope_success_requires_data() {
        let envelope: Envelope<String> =
            serde_json::from_str(r#"{"code":200,"message":"OK","data":null}"#).unwrap();
        assert!(envelope.into_data(200).is_err());
    }

    fn hms(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_birth_hour_slots() {
        assert_eq!(BirthHour::from_time(None), BirthHour::Missing);
        // Noon sentinel lands in the Oh slot (11:30 ~ 13:30)
        assert_eq!(BirthHour::from_time(Some(hms(12, 0))), BirthHour::Oh);
        // Slot boundaries wrap at midnight: 23:30 opens Ja
        assert_eq!(BirthHour::from_time(Some(hms(23, 30))), BirthHour::Ja);
        assert_eq!(BirthHour::from_time(Some(hms(0, 15))), BirthHour::Ja);
        assert_eq!(BirthHour::from_time(Some(hms(1, 30))), BirthHour::Chuk);
        assert_eq!(BirthHour::from_time(Some(hms(21, 29))), BirthHour::Sul);
        assert_eq!(BirthHour::from_time(Some(hms(22, 0))), BirthHour::Hae);
    }

    #[test]
    fn test_birth_hour_wire_names() {
        assert_eq!(serde_json::to_string(&BirthHour::Oh).unwrap(), "\"OH\"");
        assert_eq!(
            serde_json::to_string(&BirthHour::Missing).unwrap(),
            "\"Missing\""
        );
    }

    #[test]
    fn test_daily_request_omits_absent_concern() {
        let request = DailyFortuneRequest {
            birth_date: NaiveDate::from_ymd_opt(1995, 3, 14).unwrap(),
            zodiac_sign: Zodiac::Pig,
            concern: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["zodiacSign"], "pig");
        assert!(json.get("concern").is_none());
    }
}
