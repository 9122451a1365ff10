// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: login, profile completion, service invocation and
//! logout.
//!
//! The controller owns the one mutable session record. Transitions:
//!
//! ```text
//! Anonymous ──login──▶ Active                  (email provider)
//! Anonymous ──login──▶ AwaitingProfile ──complete_profile──▶ Active
//! any state ──logout / auth expiry──▶ Anonymous
//! ```
//!
//! History hydration after login is fire-and-forget: it merges server
//! results into the session when it lands and is never allowed to fail or
//! delay the login transition.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use futures_util::future::join_all;
use tokio::sync::Mutex;
use validator::Validate;

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{BirthProfile, FortuneResult, LoginProvider, ServiceKind, User};
use crate::services::aggregator::{self, FortunePayload};
use crate::services::backend::{
    BirthHour, DailyFortuneRequest, DreamRequest, FaceAnalyzeRequest, FortuneClient,
    LifeFortuneRequest, ResultIndexEntry, SignupRequest, StatisticsData, Zodiac,
};
use crate::services::entitlement::{self, UsageGrant};
use crate::services::image::{self, ImageKind};
use crate::store::TokenStore;

/// Fallback shown when no acceptable display name exists.
pub const DEFAULT_DISPLAY_NAME: &str = "사용자";

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    /// Authenticated, but the birth profile is still missing (social logins)
    AwaitingProfile,
    Active,
}

/// Login form.
#[derive(Debug, Clone, Validate)]
pub struct Credentials {
    #[validate(email(message = "유효한 이메일 형식이 아닙니다."))]
    pub email: String,
    #[validate(length(min = 1, message = "비밀번호는 필수입니다."))]
    pub password: String,
    /// Provider-supplied display name, if the provider has one
    pub name: Option<String>,
    pub provider: LoginProvider,
}

impl Credentials {
    pub fn email_login(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            name: None,
            provider: LoginProvider::Email,
        }
    }
}

/// Signup form.
#[derive(Debug, Clone, Validate)]
pub struct SignupForm {
    #[validate(length(min = 1, message = "사용자 이름은 필수입니다."))]
    pub name: String,
    #[validate(email(message = "유효한 이메일 형식이 아닙니다."))]
    pub email: String,
    #[validate(length(min = 1, message = "비밀번호는 필수입니다."))]
    pub password: String,
    pub birth_date: NaiveDate,
    /// `None` = birth time unknown, normalized to noon on submission
    pub birth_time: Option<NaiveTime>,
}

/// Input for one fortune-service invocation.
#[derive(Debug, Clone)]
pub enum ServiceRequest {
    /// Photo already uploaded via [`SessionController::upload_face_photo`]
    FaceReading {
        image_url: String,
        image_kind: ImageKind,
    },
    /// Uses the session's birth profile
    LifeFortune,
    DailyFortune {
        zodiac: Zodiac,
        concern: Option<String>,
    },
    Dream {
        description: String,
    },
}

/// Outcome of a completed service invocation.
#[derive(Debug, Clone)]
pub enum ServiceOutcome {
    /// Granted on today's free allowance; already appended to the history.
    Free(FortuneResult),
    /// Allowance spent: the result is held pending until
    /// [`SessionController::confirm_payment`] appends it.
    PaymentRequired(FortuneResult),
}

/// App-wide usage statistics shown on the login and dashboard screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppStats {
    pub total_users: u64,
    pub total_readings: u64,
    pub face_reading: u64,
    pub life_fortune: u64,
    pub daily_fortune: u64,
    pub dream: u64,
}

impl AppStats {
    /// Fixed defaults substituted whenever the statistics fetch fails.
    pub fn fallback() -> Self {
        Self {
            total_users: 12_847,
            total_readings: 89_235,
            face_reading: 28_459,
            life_fortune: 18_237,
            daily_fortune: 32_146,
            dream: 10_393,
        }
    }

    fn from_statistics(data: StatisticsData) -> Self {
        let total_readings = data.face_result_count
            + data.life_long_result_count
            + data.daily_fortune_result_count
            + data.dream_interpretation_result_count;
        Self {
            total_users: data.total_users,
            total_readings,
            face_reading: data.face_result_count,
            life_fortune: data.life_long_result_count,
            daily_fortune: data.daily_fortune_result_count,
            dream: data.dream_interpretation_result_count,
        }
    }
}

struct SessionInner {
    state: SessionState,
    user: Option<User>,
    /// Paid-path result held back until payment confirmation
    pending: Option<FortuneResult>,
}

/// Owner of the current session and the single mutation point for the
/// user record and its entitlement ledger.
#[derive(Clone)]
pub struct SessionController {
    client: FortuneClient,
    store: TokenStore,
    inner: Arc<Mutex<SessionInner>>,
}

impl SessionController {
    pub fn new(config: &Config, store: TokenStore) -> Self {
        Self {
            client: FortuneClient::new(config, store.clone()),
            store,
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Anonymous,
                user: None,
                pending: None,
            })),
        }
    }

    pub fn client(&self) -> &FortuneClient {
        &self.client
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn current_user(&self) -> Option<User> {
        self.inner.lock().await.user.clone()
    }

    pub async fn pending_payment(&self) -> Option<FortuneResult> {
        self.inner.lock().await.pending.clone()
    }

    // ─── Login / signup / logout ─────────────────────────────────────────────

    /// Authenticate and open a session.
    ///
    /// On success the tokens are persisted, the user record is built, and a
    /// background hydration task is spawned. A failed login leaves the
    /// controller exactly as it was.
    pub async fn login(&self, credentials: &Credentials) -> Result<User> {
        credentials.validate().map_err(validation_error)?;

        let tokens = self
            .client
            .login(&credentials.email, &credentials.password)
            .await?;
        self.store.set(&tokens)?;

        let saved_name = self.store.display_name();
        let display_name = resolve_display_name(
            credentials.name.as_deref(),
            saved_name.as_deref(),
            &credentials.email,
        );

        let now = Utc::now();
        let user = User::new(
            now.timestamp_millis().to_string(),
            display_name,
            credentials.email.clone(),
            credentials.provider,
            None,
            now.date_naive(),
        );

        // Email logins go straight to the dashboard; social logins still owe
        // us a birth profile.
        let state = match credentials.provider {
            LoginProvider::Email => SessionState::Active,
            LoginProvider::Kakao | LoginProvider::Google => SessionState::AwaitingProfile,
        };

        {
            let mut inner = self.inner.lock().await;
            inner.user = Some(user.clone());
            inner.pending = None;
            inner.state = state;
        }

        tracing::info!(email = %credentials.email, provider = ?credentials.provider, "Login successful");

        let controller = self.clone();
        tokio::spawn(async move {
            controller.hydrate().await;
        });

        Ok(user)
    }

    /// Create an account, then log in with the new credentials.
    pub async fn signup(&self, form: &SignupForm) -> Result<User> {
        form.validate().map_err(validation_error)?;

        let request = SignupRequest {
            name: form.name.clone(),
            email: form.email.clone(),
            password: form.password.clone(),
            year: form.birth_date.format("%Y").to_string(),
            month: form.birth_date.format("%m").to_string(),
            day: form.birth_date.format("%d").to_string(),
            birth_time: BirthHour::from_time(form.birth_time),
        };
        let created_id = self.client.signup(&request).await?;
        tracing::info!(user_id = %created_id, "Signup complete; logging in");

        let credentials = Credentials {
            email: form.email.clone(),
            password: form.password.clone(),
            name: Some(form.name.clone()),
            provider: LoginProvider::Email,
        };
        let mut user = self.login(&credentials).await?;

        // The signup form already collected the birth profile
        let birth = BirthProfile::new(form.birth_date, form.birth_time);
        let mut inner = self.inner.lock().await;
        if let Some(session_user) = inner.user.as_mut() {
            session_user.birth = Some(birth);
            user = session_user.clone();
        }
        Ok(user)
    }

    /// Submit the birth profile; only valid from `AwaitingProfile`.
    pub async fn complete_profile(
        &self,
        birth_date: NaiveDate,
        birth_time: Option<NaiveTime>,
    ) -> Result<User> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::AwaitingProfile {
            return Err(ApiError::Validation(
                "프로필 입력 단계가 아닙니다.".to_string(),
            ));
        }

        {
            let user = inner.user.as_mut().ok_or(ApiError::NoToken)?;
            user.birth = Some(BirthProfile::new(birth_date, birth_time));
        }
        inner.state = SessionState::Active;
        inner.user.clone().ok_or(ApiError::NoToken)
    }

    /// End the session. Safe to call when already logged out; the server
    /// call is best-effort and local teardown happens regardless.
    pub async fn logout(&self) {
        if self.store.get().is_some() {
            if let Err(error) = self.client.logout().await {
                tracing::debug!(error = %error, "Logout request failed");
            }
        }
        self.store.clear();
        self.drop_session().await;
        tracing::info!("Logged out");
    }

    // ─── History hydration ───────────────────────────────────────────────────

    /// Pull the server-side result history (and profile name) into the
    /// session. Runs in the background after login; also callable directly
    /// to refresh. Failures are logged and swallowed.
    pub async fn hydrate(&self) {
        if let Err(error) = self.try_hydrate().await {
            if error.requires_login() {
                self.drop_session().await;
            }
            tracing::warn!(error = %error, "History hydration failed; continuing without it");
        }
    }

    async fn try_hydrate(&self) -> Result<()> {
        let index = self.client.fetch_result_index().await?;

        let details = join_all(index.iter().map(|entry| self.hydrate_entry(entry))).await;
        let hydrated: Vec<FortuneResult> = details.into_iter().flatten().collect();

        // Best-effort profile name; the session keeps its current name on
        // any failure
        let profile_name = match self.client.fetch_profile_name().await {
            Ok(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    None
                } else {
                    if let Err(error) = self.store.set_display_name(&name) {
                        tracing::debug!(error = %error, "Could not cache display name");
                    }
                    Some(name)
                }
            }
            Err(error) => {
                tracing::debug!(error = %error, "Profile name fetch failed");
                None
            }
        };

        let mut inner = self.inner.lock().await;
        if let Some(user) = inner.user.as_mut() {
            user.results = aggregator::merge_history(&user.results, &hydrated);
            if let Some(name) = profile_name {
                if acceptable_display_name(&name, &user.email) {
                    user.display_name = name;
                }
            }
            tracing::info!(results = user.results.len(), "History hydrated");
        }
        Ok(())
    }

    /// Resolve one index entry to a full result. A failed detail fetch
    /// degrades to a stub whose content a later hydration can fill in.
    async fn hydrate_entry(&self, entry: &ResultIndexEntry) -> Option<FortuneResult> {
        let kind = ServiceKind::from_wire_code(&entry.result_type)?;

        let payload = match kind {
            ServiceKind::FaceReading => self
                .client
                .fetch_face_detail(&entry.result_id)
                .await
                .map(FortunePayload::FaceReading),
            ServiceKind::LifeFortune => self
                .client
                .fetch_life_detail(&entry.result_id)
                .await
                .map(FortunePayload::LifeFortune),
            ServiceKind::DailyFortune => self
                .client
                .fetch_daily_detail(&entry.result_id)
                .await
                .map(FortunePayload::DailyFortune),
            ServiceKind::Dream => self
                .client
                .fetch_dream_detail(&entry.result_id)
                .await
                .map(FortunePayload::Dream),
        };

        match payload {
            Ok(payload) => Some(aggregator::normalize(
                entry.result_id.clone(),
                &entry.created_at,
                true,
                &payload,
            )),
            Err(error) => {
                tracing::debug!(
                    error = %error,
                    result_id = %entry.result_id,
                    "Detail fetch failed; keeping stub"
                );
                Some(FortuneResult {
                    id: entry.result_id.clone(),
                    kind,
                    title: kind.result_title().to_string(),
                    content: String::new(),
                    date: aggregator::display_date(&entry.created_at),
                    paid: true,
                })
            }
        }
    }

    // ─── Service invocation ──────────────────────────────────────────────────

    /// Upload a face photo and return the object URL + wire type for a
    /// subsequent [`ServiceRequest::FaceReading`] invocation.
    pub async fn upload_face_photo(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(String, ImageKind)> {
        let result = image::upload_face_image(&self.client, file_name, bytes).await;
        self.guard_auth(result).await
    }

    /// Run a fortune service end to end: compute on the backend, normalize
    /// the payload, then route through the entitlement ledger.
    ///
    /// The ledger decision and its side effects happen under one lock
    /// acquisition, so two racing invocations can never both take the free
    /// path for the same service and day.
    pub async fn invoke(&self, request: ServiceRequest) -> Result<ServiceOutcome> {
        let birth = {
            let inner = self.inner.lock().await;
            match inner.state {
                SessionState::Anonymous => return Err(ApiError::NoToken),
                SessionState::AwaitingProfile => {
                    return Err(ApiError::Validation(
                        "생년월일 정보를 먼저 입력해주세요.".to_string(),
                    ))
                }
                SessionState::Active => {}
            }
            inner.user.as_ref().ok_or(ApiError::NoToken)?.birth
        };

        // The network round trip happens outside the session lock
        let computed = self.compute(&request, birth).await;
        let payload = self.guard_auth(computed).await?;

        let now = Utc::now();
        let id = payload
            .server_id()
            .map(str::to_string)
            .unwrap_or_else(|| now.timestamp_millis().to_string());
        let created_at = now.format("%Y-%m-%dT%H:%M:%S").to_string();
        let mut result = aggregator::normalize(id, &created_at, false, &payload);

        let today = now.date_naive();
        let mut inner = self.inner.lock().await;
        let grant = {
            let user = inner.user.as_mut().ok_or(ApiError::NoToken)?;
            entitlement::record_usage(user, result.kind, today)
        };

        match grant {
            UsageGrant::Free => {
                if let Some(user) = inner.user.as_mut() {
                    user.results.push(result.clone());
                }
                tracing::info!(kind = ?result.kind, "Service granted on daily free allowance");
                Ok(ServiceOutcome::Free(result))
            }
            UsageGrant::Paid => {
                // Held back until payment confirmation appends it as paid
                result.paid = false;
                inner.pending = Some(result.clone());
                tracing::info!(kind = ?result.kind, "Free allowance spent; payment required");
                Ok(ServiceOutcome::PaymentRequired(result))
            }
        }
    }

    /// Append the held paid-path result after payment confirmation.
    pub async fn confirm_payment(&self) -> Result<FortuneResult> {
        let mut inner = self.inner.lock().await;
        let mut result = inner.pending.take().ok_or_else(|| {
            ApiError::Validation("결제 대기 중인 결과가 없습니다.".to_string())
        })?;
        result.paid = true;

        let user = inner.user.as_mut().ok_or(ApiError::NoToken)?;
        user.results.push(result.clone());
        tracing::info!(result_id = %result.id, "Payment confirmed; result stored");
        Ok(result)
    }

    /// Abandon the held paid-path result (user backed out of payment).
    pub async fn cancel_payment(&self) {
        self.inner.lock().await.pending = None;
    }

    /// Mark the session premium after a completed support purchase.
    pub async fn activate_premium(&self) -> Result<User> {
        let mut inner = self.inner.lock().await;
        let user = inner.user.as_mut().ok_or(ApiError::NoToken)?;
        user.is_premium = true;
        user.premium_expiry = Some("영구 프리미엄".to_string());
        tracing::info!("Premium activated");
        Ok(user.clone())
    }

    /// App-wide statistics with the fixed fallback on any failure; this
    /// fetch never blocks or breaks a user flow.
    pub async fn app_stats(&self) -> AppStats {
        match self.client.fetch_statistics().await {
            Ok(stats) => AppStats::from_statistics(stats),
            Err(error) => {
                tracing::warn!(error = %error, "Statistics fetch failed; using defaults");
                AppStats::fallback()
            }
        }
    }

    async fn compute(
        &self,
        request: &ServiceRequest,
        birth: Option<BirthProfile>,
    ) -> Result<FortunePayload> {
        match request {
            ServiceRequest::FaceReading {
                image_url,
                image_kind,
            } => {
                let data = self
                    .client
                    .analyze_face(&FaceAnalyzeRequest {
                        image_url: image_url.clone(),
                        image_type: *image_kind,
                    })
                    .await?;
                Ok(FortunePayload::FaceReading(data))
            }
            ServiceRequest::LifeFortune => {
                let birth = birth.ok_or_else(|| {
                    ApiError::Validation("생년월일 정보를 먼저 입력해주세요.".to_string())
                })?;
                let data = self
                    .client
                    .life_fortune(&LifeFortuneRequest {
                        birth_date: birth.date,
                        birth_time: birth.time,
                    })
                    .await?;
                Ok(FortunePayload::LifeFortune(data))
            }
            ServiceRequest::DailyFortune { zodiac, concern } => {
                let birth = birth.ok_or_else(|| {
                    ApiError::Validation("생년월일과 띠를 선택해주세요.".to_string())
                })?;
                let data = self
                    .client
                    .daily_fortune(&DailyFortuneRequest {
                        birth_date: birth.date,
                        zodiac_sign: *zodiac,
                        concern: concern.clone(),
                    })
                    .await?;
                Ok(FortunePayload::DailyFortune(data))
            }
            ServiceRequest::Dream { description } => {
                let description = description.trim();
                if description.is_empty() {
                    return Err(ApiError::Validation("꿈 내용을 입력해주세요.".to_string()));
                }
                let data = self
                    .client
                    .interpret_dream(&DreamRequest {
                        dream_description: description.to_string(),
                    })
                    .await?;
                Ok(FortunePayload::Dream(data))
            }
        }
    }

    /// Drop the in-memory session when an authenticated call reported the
    /// credential gone.
    async fn guard_auth<T>(&self, result: Result<T>) -> Result<T> {
        if matches!(result, Err(ApiError::AuthExpired)) {
            self.drop_session().await;
        }
        result
    }

    async fn drop_session(&self) {
        let mut inner = self.inner.lock().await;
        inner.user = None;
        inner.pending = None;
        inner.state = SessionState::Anonymous;
    }
}

// ─── Display-name resolution ─────────────────────────────────────────────────

/// A candidate is rejected when it looks like an email address or is just
/// the email's local part; some identity providers default the profile name
/// to the login email.
fn acceptable_display_name(candidate: &str, email: &str) -> bool {
    let candidate = candidate.trim();
    let local_part = email.split('@').next().unwrap_or("").trim();
    !candidate.is_empty()
        && !candidate.contains('@')
        && candidate.to_lowercase() != local_part.to_lowercase()
}

/// Provider-supplied name first, else the persisted display name, else the
/// fixed fallback.
pub fn resolve_display_name(
    provider_name: Option<&str>,
    saved_name: Option<&str>,
    email: &str,
) -> String {
    [provider_name, saved_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| acceptable_display_name(candidate, email))
        .map(String::from)
        .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string())
}

fn validation_error(errors: validator::ValidationErrors) -> ApiError {
    let message = errors
        .field_errors()
        .values()
        .flat_map(|field| field.iter())
        .find_map(|error| error.message.as_ref().map(ToString::to_string))
        .unwrap_or_else(|| "입력값을 확인해주세요.".to_string());
    ApiError::Validation(message)
}
