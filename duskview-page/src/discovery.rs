//! Video discovery helpers and the cross-origin policy.
//!
//! Frames of a video served from another origin can only be read into a
//! texture when the element requests CORS. Any source on a foreign origin
//! gets `crossorigin="anonymous"`.

use url::Url;

use crate::host::{is_video, Mutation, NodeId, PageHost};

pub const VIDEO_SELECTOR: &str = "video";
const CROSSORIGIN: &str = "crossorigin";

/// `src` of the video plus `src` of each child `<source>`, resolved against the page
pub fn source_urls(host: &dyn PageHost, video: NodeId, page: &Url) -> Vec<Url> {
    let mut raw = Vec::new();
    if let Some(src) = host.attribute(video, "src") {
        raw.push(src);
    }
    for child in host.children(video) {
        if host.tag_name(child).eq_ignore_ascii_case("source") {
            if let Some(src) = host.attribute(child, "src") {
                raw.push(src);
            }
        }
    }

    raw.iter()
        .filter(|src| !src.trim().is_empty())
        .filter_map(|src| match page.join(src.trim()) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!("Unresolvable video source {}: {}", src, e);
                None
            }
        })
        .collect()
}

/// Does any source live on another origin. Opaque origins (`data:` and
/// friends) never count as foreign.
pub fn has_foreign_source(host: &dyn PageHost, video: NodeId, page: &Url) -> bool {
    let page_origin = page.origin();
    source_urls(host, video, page).iter().any(|url| {
        let origin = url.origin();
        origin.is_tuple() && origin != page_origin
    })
}

/// Set `crossorigin="anonymous"` when needed. Returns whether the attribute was added.
pub fn apply_cors_policy(host: &mut dyn PageHost, video: NodeId) -> bool {
    let page = match Url::parse(&host.page_url()) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Page URL unparsable, skipping CORS policy: {}", e);
            return false;
        }
    };

    if host.attribute(video, CROSSORIGIN).is_some() || !has_foreign_source(host, video, &page) {
        return false;
    }

    tracing::debug!("Video {:?} has cross-origin sources, requesting CORS", video);
    host.set_attribute(video, CROSSORIGIN, "anonymous");
    true
}

/// A mutation batch adds a node that is itself a video. Videos nested in an
/// added subtree do not count.
pub fn adds_video(host: &dyn PageHost, mutations: &[Mutation]) -> bool {
    mutations.iter().any(|mutation| match mutation {
        Mutation::ChildList { added, .. } => added.iter().any(|node| is_video(host, *node)),
        Mutation::Attribute { .. } => false,
    })
}

pub fn removes_nodes(mutations: &[Mutation]) -> bool {
    mutations.iter().any(|mutation| match mutation {
        Mutation::ChildList { removed, .. } => !removed.is_empty(),
        Mutation::Attribute { .. } => false,
    })
}
