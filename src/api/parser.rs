// src/api/parser.rs
//! Turns raw remote responses into domain values, classifying failures.

use super::client::ApiResponse;
use super::responses::{WirePost, WireTimeline, WireUser, WireUserPage};
use super::{FetchedPage, Timeline};
use crate::constants::WIRE_END_OF_LISTING_CURSOR;
use crate::error::CrawlError;
use crate::model::{EntityMetadata, NextCursor, Post};
use crate::types::{EntityId, EntityKey, PostId, ValidationError};

/// Maximum characters shown when previewing unparseable bodies.
const BODY_PREVIEW_LENGTH: usize = 200;

/// Parses a response body, or classifies the non-success status.
///
/// `subject` names the entity the request was about; it ends up in
/// access-denied errors.
pub fn parse_api_response<T>(result: ApiResponse<String>, subject: &str) -> Result<T, CrawlError>
where
    T: serde::de::DeserializeOwned,
{
    if !result.status.is_success() {
        log::debug!("HTTP {} from {}", result.status, result.url);
        return Err(CrawlError::from_status(
            result.status.as_u16(),
            subject,
            &result.url,
            result.retry_after_secs,
        ));
    }

    serde_json::from_str(&result.data).map_err(|e| {
        let preview: String = result.data.chars().take(BODY_PREVIEW_LENGTH).collect();
        CrawlError::MalformedResponse(format!("{} from {} (body: {})", e, result.url, preview))
    })
}

/// Parses the metadata-resolution response.
pub fn parse_entity_response(result: ApiResponse<String>, subject: &str) -> Result<EntityMetadata, CrawlError> {
    let user: WireUser = parse_api_response(result, subject)?;
    to_metadata(user)
}

/// Parses one page of a related-items listing.
pub fn parse_listing_response(result: ApiResponse<String>, subject: &str) -> Result<FetchedPage, CrawlError> {
    let page: WireUserPage = parse_api_response(result, subject)?;
    let items = page
        .users
        .into_iter()
        .map(to_metadata)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FetchedPage {
        items,
        next: parse_next_cursor(&page.next_cursor_str),
    })
}

/// Parses a timeline page. Posts come back newest first.
pub fn parse_timeline_response(result: ApiResponse<String>, subject: &str) -> Result<Timeline, CrawlError> {
    let timeline: WireTimeline = parse_api_response(result, subject)?;
    let objects = timeline.global_objects;

    let mut posts = objects
        .tweets
        .into_values()
        .map(to_post)
        .collect::<Result<Vec<_>, _>>()?;
    posts.sort_by(|a, b| b.id.cmp(&a.id));

    let authors = objects
        .users
        .into_values()
        .map(to_metadata)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Timeline { posts, authors })
}

/// Decodes the wire next-cursor: `"0"` (or nothing) ends the listing.
pub fn parse_next_cursor(raw: &str) -> NextCursor {
    let raw = raw.trim();
    if raw.is_empty() || raw == WIRE_END_OF_LISTING_CURSOR {
        NextCursor::End
    } else {
        NextCursor::More(raw.to_string())
    }
}

fn to_metadata(user: WireUser) -> Result<EntityMetadata, CrawlError> {
    let key = EntityKey::parse(&user.screen_name)
        .map_err(|e| CrawlError::MalformedResponse(format!("user {}: {}", user.id, e)))?;
    Ok(EntityMetadata {
        id: user.id.into(),
        key,
        name: user.name,
        related_count: user.followers_count,
    })
}

fn to_post(post: WirePost) -> Result<Post, CrawlError> {
    let malformed = |e: ValidationError| {
        CrawlError::MalformedResponse(format!("post {}: {}", post.id_str, e))
    };

    let id: PostId = post.id_str.parse().map_err(malformed)?;
    let author: EntityId = post.user_id_str.parse().map_err(malformed)?;
    let reshare_of = match post.retweeted_status_id_str.as_deref() {
        Some(raw) if !raw.is_empty() => Some(raw.parse::<PostId>().map_err(malformed)?),
        _ => None,
    };

    Ok(Post {
        id,
        author,
        text: post.full_text,
        created_at: post.created_at,
        lang: post.lang,
        reshare_of,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureClass;
    use crate::types::EntityId;
    use reqwest::StatusCode;

    fn response(status: u16, body: &str) -> ApiResponse<String> {
        ApiResponse {
            data: body.to_string(),
            status: StatusCode::from_u16(status).unwrap(),
            url: "https://remote.test/followers/list.json".to_string(),
            retry_after_secs: None,
        }
    }

    #[test]
    fn listing_with_more_pages() {
        let body = r#"{
            "users": [
                {"id": 11, "screen_name": "Bob", "name": "Bob B", "followers_count": 3},
                {"id": 12, "screen_name": "carol"}
            ],
            "next_cursor": 123,
            "next_cursor_str": "123"
        }"#;
        let page = parse_listing_response(response(200, body), "alice").unwrap();
        assert_eq!(page.next, NextCursor::More("123".into()));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, EntityId::new(11));
        assert_eq!(page.items[0].key.as_str(), "bob");
        assert_eq!(page.items[0].related_count, Some(3));
        assert_eq!(page.items[1].name, None);
    }

    #[test]
    fn terminal_cursor_ends_the_listing() {
        let body = r#"{"users": [], "next_cursor_str": "0"}"#;
        let page = parse_listing_response(response(200, body), "alice").unwrap();
        assert_eq!(page.next, NextCursor::End);
        assert!(page.items.is_empty());
    }

    #[test]
    fn statuses_are_classified() {
        let err = parse_listing_response(response(429, ""), "alice").unwrap_err();
        assert_eq!(err.class(), FailureClass::RateLimited);

        let err = parse_entity_response(response(401, "{}"), "alice").unwrap_err();
        assert_eq!(err.class(), FailureClass::AccessDenied);

        let err = parse_entity_response(response(500, "oops"), "alice").unwrap_err();
        assert_eq!(err.class(), FailureClass::Transient);
    }

    #[test]
    fn timeline_posts_come_back_newest_first() {
        let body = r#"{
            "globalObjects": {
                "tweets": {
                    "100": {"id_str": "100", "user_id_str": "1", "full_text": "first", "lang": "en"},
                    "300": {"id_str": "300", "user_id_str": "1", "full_text": "RT", "retweeted_status_id_str": "250"},
                    "200": {"id_str": "200", "user_id_str": "1", "full_text": "second"}
                },
                "users": {
                    "1": {"id": 1, "screen_name": "alice"},
                    "7": {"id": 7, "screen_name": "Dave"}
                }
            }
        }"#;
        let timeline = parse_timeline_response(response(200, body), "alice").unwrap();

        let ids: Vec<u64> = timeline.posts.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![300, 200, 100]);
        assert_eq!(timeline.posts[0].reshare_of, Some(PostId::new(250)));
        assert_eq!(timeline.posts[2].lang.as_deref(), Some("en"));
        assert_eq!(timeline.authors.len(), 2);
        assert_eq!(timeline.authors[1].key.as_str(), "dave");
    }

    #[test]
    fn timeline_with_bad_post_id_is_malformed() {
        let body = r#"{"globalObjects": {"tweets": {"x": {"id_str": "x", "user_id_str": "1"}}}}"#;
        let err = parse_timeline_response(response(200, body), "alice").unwrap_err();
        assert!(matches!(err, CrawlError::MalformedResponse(_)));
    }

    #[test]
    fn malformed_payload_is_transient() {
        let err = parse_listing_response(response(200, "<html>"), "alice").unwrap_err();
        assert!(matches!(err, CrawlError::MalformedResponse(_)));
        assert_eq!(err.class(), FailureClass::Transient);
    }
}
