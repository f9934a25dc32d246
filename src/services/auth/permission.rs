//! Per-operation authorization: operation name → resource → UMA ticket grant.

use std::{fmt, sync::Arc};

use crate::error::AppError;
use crate::services::auth::authority::{AuthorityClient, AuthorityError};

/// Operations this service exposes and the authority resource guarding each.
const DEFAULT_RESOURCES: &[(&str, &str)] = &[
    ("GetVideosByKeyword", "resource-get-videos-by-keyword"),
    ("GetVideoById", "resource-get-video-by-id"),
    ("ListFavoriteVideos", "resource-list-favorite-videos"),
    ("AddFavoriteVideo", "resource-add-favorite-video"),
    ("RemoveFavoriteVideo", "resource-remove-favorite-video"),
    ("RecordEventLog", "resource-record-event-log"),
    ("WhoAmI", "resource-who-am-i"),
];

#[derive(Debug)]
pub enum PermissionError {
    NoMapping(String),
    Authority(AuthorityError),
    EmptyTicket,
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMapping(operation) => write!(f, "no resource mapping for {}", operation),
            Self::Authority(e) => write!(f, "permission check failed: {}", e),
            Self::EmptyTicket => write!(f, "authority returned an empty rpt"),
        }
    }
}

impl std::error::Error for PermissionError {}

impl From<PermissionError> for AppError {
    fn from(e: PermissionError) -> Self {
        AppError::permission_denied(e.to_string())
    }
}

/// Static operation → resource table. Unlisted operations are denied.
#[derive(Debug, Clone)]
pub struct ResourceMap {
    entries: Arc<[(String, String)]>,
}

impl Default for ResourceMap {
    fn default() -> Self {
        Self::new(DEFAULT_RESOURCES.iter().copied())
    }
}

impl ResourceMap {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(op, res)| (op.to_string(), res.to_string()))
                .collect(),
        }
    }

    /// Exact match first, then a suffix match that must start at a `/` or `.`
    /// boundary, so `video.v1.VideoService/GetVideosByKeyword` resolves while
    /// `XGetVideosByKeyword` does not.
    pub fn resolve(&self, operation: &str) -> Result<&str, PermissionError> {
        if let Some((_, resource)) = self.entries.iter().find(|(op, _)| op == operation) {
            return Ok(resource.as_str());
        }

        self.entries
            .iter()
            .find(|(op, _)| {
                operation
                    .strip_suffix(op.as_str())
                    .is_some_and(|head| head.ends_with('/') || head.ends_with('.'))
            })
            .map(|(_, resource)| resource.as_str())
            .ok_or_else(|| PermissionError::NoMapping(operation.to_string()))
    }
}

/// Asks the authority whether the caller holds the permission for a resource.
#[derive(Debug, Clone)]
pub struct PermissionChecker {
    authority: AuthorityClient,
}

impl PermissionChecker {
    pub fn new(authority: AuthorityClient) -> Self {
        Self { authority }
    }

    /// The RPT is only checked for presence and then dropped.
    pub async fn check(&self, token: &str, resource: &str) -> Result<(), PermissionError> {
        let rpt = self
            .authority
            .request_rpt(token, resource)
            .await
            .map_err(PermissionError::Authority)?;

        if rpt.access_token.is_empty() {
            return Err(PermissionError::EmptyTicket);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_exact_and_qualified_names() {
        let map = ResourceMap::default();
        assert_eq!(
            map.resolve("GetVideosByKeyword").unwrap(),
            "resource-get-videos-by-keyword"
        );
        assert_eq!(
            map.resolve("video.v1.VideoService/GetVideosByKeyword").unwrap(),
            "resource-get-videos-by-keyword"
        );
        assert_eq!(
            map.resolve("/favorite.v1.FavoriteService/AddFavoriteVideo")
                .unwrap(),
            "resource-add-favorite-video"
        );
    }

    #[test]
    fn suffix_must_start_on_a_boundary() {
        let map = ResourceMap::default();
        assert!(matches!(
            map.resolve("video.v1.VideoService/XGetVideosByKeyword"),
            Err(PermissionError::NoMapping(_))
        ));
    }

    #[test]
    fn unmapped_operation_is_denied_with_its_name() {
        let map = ResourceMap::default();
        let err = map.resolve("video.v1.VideoService/DeleteAllVideos").unwrap_err();
        assert_eq!(
            AppError::from(err),
            AppError::permission_denied(
                "no resource mapping for video.v1.VideoService/DeleteAllVideos"
            )
        );
    }

    #[test]
    fn empty_table_denies_everything() {
        let map = ResourceMap::new([]);
        assert!(map.resolve("GetVideosByKeyword").is_err());
    }
}
