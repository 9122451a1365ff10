// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin panel client: user management against the `/admin` surface.
//!
//! Same envelope, same bearer handling and same error taxonomy as the
//! consumer endpoints; a 401/403 clears the operator's stored token just
//! like everywhere else.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::services::backend::FortuneClient;
use crate::store::TokenStore;

/// One page of the user list (`GET /admin/users?page&size`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPage {
    pub content: Vec<UserSummary>,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub sex: Option<String>,
    pub role: Option<String>,
    pub birth_info: Option<BirthInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BirthInfo {
    pub birth_year: Option<String>,
    pub birth_month: Option<String>,
    pub birth_day: Option<String>,
}

/// Full detail for one user (`POST /admin/user`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserDetail {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub sex: Option<String>,
    pub role: Option<String>,
    pub birth_info: Option<BirthInfo>,
    pub remaining_limit_count: Option<u32>,
    pub is_black_list: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserIdBody<'a> {
    user_id: &'a str,
}

/// Client for the admin user CRUD surface.
#[derive(Clone)]
pub struct AdminClient {
    client: FortuneClient,
}

impl AdminClient {
    pub fn new(config: &Config, store: TokenStore) -> Self {
        Self {
            client: FortuneClient::new(config, store),
        }
    }

    /// Log the operator in; admin accounts use the same credential endpoint
    /// as the app.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let tokens = self.client.login(email, password).await?;
        self.client.store().set(&tokens)?;
        tracing::info!(email, "Admin login successful");
        Ok(())
    }

    /// Paginated user list. Pages are zero-based.
    pub async fn list_users(&self, page: u32, size: u32) -> Result<UserPage> {
        let path = format!("/admin/users?page={}&size={}", page, size);
        self.client.get_authed(&path).await
    }

    pub async fn user_detail(&self, user_id: &str) -> Result<UserDetail> {
        self.client
            .post_authed("/admin/user", &UserIdBody { user_id })
            .await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.client
            .delete_authed_ok("/admin/user", &UserIdBody { user_id })
            .await?;
        tracing::info!(user_id, "User deleted");
        Ok(())
    }

    /// Invalidate the user's refresh token, forcing a re-login.
    pub async fn expire_refresh_token(&self, user_id: &str) -> Result<()> {
        self.client
            .post_authed_ok("/admin/refresh-expired", &UserIdBody { user_id })
            .await?;
        tracing::info!(user_id, "Refresh token expired");
        Ok(())
    }

    pub async fn add_to_blacklist(&self, user_id: &str) -> Result<()> {
        self.client
            .post_authed_ok("/admin/blacklist", &UserIdBody { user_id })
            .await?;
        tracing::info!(user_id, "User blacklisted");
        Ok(())
    }

    /// Grant extra free fortune readings to a user.
    pub async fn grant_free_uses(&self, user_id: &str, count: u32) -> Result<()> {
        let path = format!("/admin/add-free-fortune/{}", count);
        self.client
            .post_authed_ok(&path, &UserIdBody { user_id })
            .await?;
        tracing::info!(user_id, count, "Free uses granted");
        Ok(())
    }
}
