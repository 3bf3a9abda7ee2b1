use serde::{Deserialize, Serialize};

use crate::domain::{AdminUser, Notification};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AdminUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
}

/// Describes one paged result set: the current page, the page count and the
/// item count, all as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationDescriptor {
    pub page: u32,
    pub pages: u32,
    pub total: u64,
}

impl Default for PaginationDescriptor {
    fn default() -> Self {
        Self {
            page: 1,
            pages: 1,
            total: 0,
        }
    }
}

impl PaginationDescriptor {
    /// Forces `1 <= page <= pages`. Backends report `pages: 0` for an empty
    /// collection.
    pub fn normalized(self) -> Self {
        let pages = self.pages.max(1);
        Self {
            page: self.page.clamp(1, pages),
            pages,
            total: self.total,
        }
    }

    pub fn contains(&self, page: u32) -> bool {
        (1..=self.pages).contains(&page)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(alias = "notifications", alias = "data")]
    pub items: Vec<T>,
    pub pagination: PaginationDescriptor,
}

pub type NotificationPage = Page<Notification>;
