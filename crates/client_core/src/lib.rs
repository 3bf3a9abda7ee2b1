use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{AdminUser, Notification, NotificationDraft, NotificationId, SocialLink, Testimonial},
    error::{ApiError, ErrorCode, ValidationError},
    protocol::{
        ChangePasswordRequest, ListQuery, LoginRequest, LoginResponse, MessageResponse,
        NotificationPage, Page,
    },
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

pub mod carousel;
pub mod config;
pub mod error;
pub mod pagination;

pub use carousel::{AutoRotate, Carousel, DEFAULT_ROTATION_INTERVAL};
pub use config::{load_settings, ClientSettings};
pub use error::{ClientError, ClientResult};
pub use pagination::{
    compute_page_tokens, ListSnapshot, PageChange, PageFetcher, PageToken,
    PaginatedListController,
};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: AdminUser,
}

/// Typed wrapper over the admin REST API. Cheap to share behind `Arc`; the
/// session token is the only mutable state.
pub struct AdminClient {
    http: Client,
    server_url: String,
    page_size: u32,
    session: RwLock<Option<Session>>,
}

impl AdminClient {
    pub fn new(server_url: &str) -> ClientResult<Self> {
        Self::with_http(server_url, Client::new())
    }

    pub fn from_settings(settings: &ClientSettings) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        let mut client = Self::with_http(&settings.server_url, http)?;
        client.page_size = settings.page_size.max(1);
        Ok(client)
    }

    fn with_http(server_url: &str, http: Client) -> ClientResult<Self> {
        Ok(Self {
            http,
            server_url: normalize_server_url(server_url)?,
            page_size: ClientSettings::default().page_size,
            session: RwLock::new(None),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AdminUser> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }

        let res = self
            .http
            .post(self.endpoint("/api/auth/login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let body: LoginResponse = read_json(res).await?;

        info!(user = %body.user.email, "signed in");
        let user = body.user.clone();
        *self.session.write().await = Some(Session {
            token: body.token,
            user: body.user,
        });
        Ok(user)
    }

    pub async fn logout(&self) {
        if self.session.write().await.take().is_some() {
            info!("signed out");
        }
    }

    /// Validates locally, then asks the backend to replace the password.
    /// Returns the backend's confirmation message.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> ClientResult<String> {
        validate_password_change(current_password, new_password, confirm_password)?;
        let request = self
            .authorized(self.http.put(self.endpoint("/api/auth/change-password")))
            .await?;
        let res = request
            .json(&ChangePasswordRequest {
                current_password: current_password.to_string(),
                new_password: new_password.to_string(),
            })
            .send()
            .await?;
        let body: MessageResponse = read_json(res).await?;
        info!("password changed");
        Ok(body.message)
    }

    pub async fn list_notifications(
        &self,
        page: u32,
        limit: u32,
    ) -> ClientResult<NotificationPage> {
        let request = self
            .authorized(self.http.get(self.endpoint("/api/notifications")))
            .await?;
        let res = request
            .query(&ListQuery {
                page: page.max(1),
                limit: limit.clamp(1, 100),
            })
            .send()
            .await?;
        let page: NotificationPage = read_json(res).await?;
        debug!(
            page = page.pagination.page,
            pages = page.pagination.pages,
            count = page.items.len(),
            "fetched notifications"
        );
        Ok(page)
    }

    pub async fn create_notification(
        &self,
        draft: &NotificationDraft,
    ) -> ClientResult<Notification> {
        draft.validate()?;
        let request = self
            .authorized(self.http.post(self.endpoint("/api/notifications")))
            .await?;
        let created: Notification = read_json(request.json(draft).send().await?).await?;
        info!(id = %created.id, kind = %created.kind, "created notification");
        Ok(created)
    }

    pub async fn update_notification(
        &self,
        id: &NotificationId,
        draft: &NotificationDraft,
    ) -> ClientResult<Notification> {
        draft.validate()?;
        let request = self
            .authorized(self.http.put(self.endpoint(&format!("/api/notifications/{id}"))))
            .await?;
        let updated: Notification = read_json(request.json(draft).send().await?).await?;
        info!(id = %updated.id, "updated notification");
        Ok(updated)
    }

    pub async fn delete_notification(&self, id: &NotificationId) -> ClientResult<()> {
        let request = self
            .authorized(self.http.delete(self.endpoint(&format!("/api/notifications/{id}"))))
            .await?;
        ensure_success(request.send().await?).await?;
        info!(%id, "deleted notification");
        Ok(())
    }

    pub async fn list_testimonials(&self) -> ClientResult<Vec<Testimonial>> {
        let res = self
            .http
            .get(self.endpoint("/api/testimonials"))
            .send()
            .await?;
        read_json(res).await
    }

    pub async fn list_social_links(&self) -> ClientResult<Vec<SocialLink>> {
        let res = self
            .http
            .get(self.endpoint("/api/social-media"))
            .send()
            .await?;
        read_json(res).await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }

    async fn authorized(&self, request: RequestBuilder) -> ClientResult<RequestBuilder> {
        let guard = self.session.read().await;
        let session = guard.as_ref().ok_or(ClientError::NotAuthenticated)?;
        Ok(request.bearer_auth(&session.token))
    }
}

/// Feeds the notification list controller from the admin API using the
/// configured page size.
#[async_trait]
impl PageFetcher for AdminClient {
    type Item = Notification;

    async fn fetch_page(&self, page: u32) -> anyhow::Result<Page<Notification>> {
        Ok(self.list_notifications(page, self.page_size).await?)
    }
}

pub fn validate_password_change(
    current_password: &str,
    new_password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    if current_password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    if new_password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    if new_password == current_password {
        return Err(ValidationError::PasswordUnchanged);
    }
    Ok(())
}

fn normalize_server_url(raw: &str) -> ClientResult<String> {
    let raw = raw.trim();
    let parsed = Url::parse(raw).map_err(|err| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

async fn read_json<T: DeserializeOwned>(res: Response) -> ClientResult<T> {
    Ok(ensure_success(res).await?.json().await?)
}

/// Passes 2xx responses through; anything else becomes `ClientError::Api`
/// carrying the backend's message when the body has one.
async fn ensure_success(res: Response) -> ClientResult<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let code = ErrorCode::from_status(status.as_u16());
    let body = res.text().await.unwrap_or_default();
    let error = match serde_json::from_str::<ApiError>(&body) {
        Ok(mut parsed) => {
            if parsed.code == ErrorCode::default() {
                parsed.code = code;
            }
            parsed
        }
        Err(_) => ApiError::new(
            code,
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string(),
        ),
    };
    warn!(status = status.as_u16(), message = %error.message, "request rejected");
    Err(ClientError::Api {
        status: status.as_u16(),
        error,
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
