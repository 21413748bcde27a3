// template.rs: Path templates: parameter-agnostic endpoint paths.
//
// A declared route path like "/users/:id/posts" becomes the template
// "/users/*/posts": every named (`:id`) or catch-all (`*rest`) parameter
// segment collapses to `*`, and the path is cleaned (rooted at `/`,
// duplicate slashes collapsed, `.` and `..` resolved, trailing slash
// dropped). Templates are what endpoint identity is computed from.
//
// Segment indexes follow the resource-id convention: index 0 is the empty
// segment before the leading `/`, so in "/users/:id/posts/:post_id" the
// parameters sit at indexes 2 and 4.

use std::fmt;

use uuid::Uuid;

use crate::error::EndpointError;

/// Marker a parameter segment collapses to.
pub const PARAM_WILDCARD: &str = "*";

/// Sigil introducing a named parameter segment (`:id`).
const NAMED_PARAM: char = ':';
/// Sigil introducing a catch-all parameter segment (`*path`).
const CATCH_ALL_PARAM: char = '*';

/// One segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A fixed path segment.
    Literal(String),
    /// A parameter slot, with its declared name (may be empty).
    Param(String),
}

impl Segment {
    fn rendered(&self) -> &str {
        match self {
            Segment::Literal(s) => s,
            Segment::Param(_) => PARAM_WILDCARD,
        }
    }

    pub fn is_param(&self) -> bool {
        matches!(self, Segment::Param(_))
    }
}

/// A cleaned, wildcarded route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTemplate {
    segments: Vec<Segment>,
    rendered: String,
}

impl PathTemplate {
    /// Parse a relative route path. Total: every input yields a template.
    pub fn parse(relative: &str) -> Self {
        let segments = clean_segments(strip_query(relative))
            .into_iter()
            .map(|seg| {
                if let Some(name) = seg.strip_prefix(NAMED_PARAM) {
                    Segment::Param(name.to_string())
                } else if let Some(name) = seg.strip_prefix(CATCH_ALL_PARAM) {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(seg.to_string())
                }
            })
            .collect();
        Self::from_segments(segments)
    }

    /// Build a template from a concrete request path by treating every
    /// second segment (indexes 2, 4, ...) as a resource-id slot.
    pub fn from_concrete(path: &str) -> Self {
        let segments = clean_segments(strip_query(path))
            .into_iter()
            .enumerate()
            .map(|(i, seg)| {
                // `i` is zero-based over non-empty segments, so convention
                // index = i + 1; even convention indexes are id slots.
                if i % 2 == 1 {
                    Segment::Param(String::new())
                } else {
                    Segment::Literal(seg.to_string())
                }
            })
            .collect();
        Self::from_segments(segments)
    }

    fn from_segments(segments: Vec<Segment>) -> Self {
        let rendered = render(segments.iter().map(Segment::rendered));
        Self { segments, rendered }
    }

    /// The template text, e.g. `/users/*/posts`.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segment at a convention index (0 is the empty root segment).
    pub fn segment_at(&self, index: usize) -> Option<&Segment> {
        index.checked_sub(1).and_then(|i| self.segments.get(i))
    }

    /// Number of segments counting the empty root segment.
    pub fn segment_count(&self) -> usize {
        self.segments.len() + 1
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|seg| match seg {
                Segment::Param(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    pub fn param_count(&self) -> usize {
        self.segments.iter().filter(|seg| seg.is_param()).count()
    }

    /// Substitute parameter values in declaration order, producing a concrete
    /// subset path.
    pub fn fill(&self, params: &[&str]) -> Result<String, EndpointError> {
        let expected = self.param_count();
        if params.len() != expected {
            return Err(EndpointError::ParamCountMismatch {
                template: self.rendered.clone(),
                expected,
                got: params.len(),
            });
        }

        let mut values = params.iter();
        Ok(render(self.segments.iter().map(|seg| match seg {
            Segment::Literal(s) => s.as_str(),
            Segment::Param(_) => values.next().copied().unwrap_or(PARAM_WILDCARD),
        })))
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// Drop anything after `?` or `#`.
fn strip_query(path: &str) -> &str {
    let end = path.find(|c| c == '?' || c == '#').unwrap_or(path.len());
    &path[..end]
}

/// Split a path into cleaned, non-empty segments, resolving `.` and `..`
/// without ever climbing above the root.
pub(crate) fn clean_segments(path: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out
}

fn render<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for seg in segments {
        out.push('/');
        out.push_str(seg);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// A concrete subset path of a privately owned resource, with the owner's
/// identifier at a known segment index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedSubset {
    segments: Vec<String>,
    owner_index: usize,
    owner_id: Uuid,
}

impl OwnedSubset {
    /// Parse `subset` (e.g. `/users/<uuid>/notes/7`) with the owner id at
    /// `owner_index` (convention index, so `2` in that example).
    pub fn parse(subset: &str, owner_index: usize) -> Result<Self, EndpointError> {
        let rooted = if subset.starts_with('/') {
            subset.to_string()
        } else {
            format!("/{}", subset)
        };
        let segments: Vec<String> = rooted.split('/').map(str::to_string).collect();

        if owner_index <= 1 || owner_index % 2 != 0 || owner_index >= segments.len() {
            return Err(EndpointError::OwnerIndexOutOfRange {
                subset: subset.to_string(),
                index: owner_index,
            });
        }

        let segment = &segments[owner_index];
        let owner_id = Uuid::parse_str(segment).map_err(|_| EndpointError::InvalidOwnerId {
            subset: subset.to_string(),
            segment: segment.clone(),
        })?;

        Ok(Self {
            segments,
            owner_index,
            owner_id,
        })
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    /// The same subset with the owner slot replaced by `requester`.
    pub fn rule_for(&self, requester: Uuid) -> String {
        let mut segments = self.segments.clone();
        segments[self.owner_index] = requester.to_string();
        segments.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_params_become_wildcards() {
        assert_eq!(PathTemplate::parse("/users/:id/posts").as_str(), "/users/*/posts");
        assert_eq!(PathTemplate::parse("users/:id").as_str(), "/users/*");
    }

    #[test]
    fn catch_all_param_becomes_wildcard() {
        let template = PathTemplate::parse("/files/*path");
        assert_eq!(template.as_str(), "/files/*");
        assert_eq!(template.param_names(), vec!["path"]);
    }

    #[test]
    fn path_is_cleaned() {
        assert_eq!(PathTemplate::parse("//users///:id/").as_str(), "/users/*");
        assert_eq!(PathTemplate::parse("/a/./b/../c").as_str(), "/a/c");
        assert_eq!(PathTemplate::parse("/../../x").as_str(), "/x");
    }

    #[test]
    fn empty_and_root_render_as_slash() {
        assert_eq!(PathTemplate::parse("").as_str(), "/");
        assert_eq!(PathTemplate::parse("/").as_str(), "/");
        assert_eq!(PathTemplate::parse("///").as_str(), "/");
    }

    #[test]
    fn query_and_fragment_are_dropped() {
        assert_eq!(PathTemplate::parse("/search?q=:term").as_str(), "/search");
        assert_eq!(PathTemplate::parse("/doc/:id#top").as_str(), "/doc/*");
    }

    #[test]
    fn parsing_a_rendered_template_is_stable() {
        let template = PathTemplate::parse("/orgs/:org/teams/:team");
        assert_eq!(PathTemplate::parse(template.as_str()).as_str(), template.as_str());
    }

    #[test]
    fn concrete_path_wildcards_alternate_segments() {
        assert_eq!(
            PathTemplate::from_concrete("/users/42/posts/9").as_str(),
            "/users/*/posts/*"
        );
        assert_eq!(PathTemplate::from_concrete("/users").as_str(), "/users");
        assert_eq!(PathTemplate::from_concrete("/users/42/").as_str(), "/users/*");
        assert_eq!(PathTemplate::from_concrete("").as_str(), "/");
    }

    #[test]
    fn concrete_and_declared_templates_agree() {
        let declared = PathTemplate::parse("/users/:id/posts/:post_id");
        let concrete = PathTemplate::from_concrete("/users/7f3a/posts/99");
        assert_eq!(declared.as_str(), concrete.as_str());
    }

    #[test]
    fn segment_indexes_count_the_root() {
        let template = PathTemplate::parse("/users/:id/notes");
        assert_eq!(template.segment_count(), 4);
        assert_eq!(template.segment_at(0), None);
        assert_eq!(template.segment_at(1), Some(&Segment::Literal("users".into())));
        assert!(template.segment_at(2).unwrap().is_param());
        assert_eq!(template.segment_at(4), None);
    }

    #[test]
    fn fill_substitutes_in_order() {
        let template = PathTemplate::parse("/orgs/:org/repos/:repo");
        assert_eq!(template.fill(&["acme", "api"]).unwrap(), "/orgs/acme/repos/api");
    }

    #[test]
    fn fill_rejects_wrong_arity() {
        let template = PathTemplate::parse("/orgs/:org");
        let err = template.fill(&[]).unwrap_err();
        assert!(err.is_validation());
        assert!(template.fill(&["a", "b"]).is_err());
    }

    #[test]
    fn owned_subset_swaps_owner_for_requester() {
        let owner = Uuid::new_v4();
        let requester = Uuid::new_v4();
        let subset = OwnedSubset::parse(&format!("/users/{}/notes/7", owner), 2).unwrap();
        assert_eq!(subset.owner_id(), owner);
        assert_eq!(subset.rule_for(requester), format!("/users/{}/notes/7", requester));
    }

    #[test]
    fn owned_subset_accepts_unrooted_paths() {
        let owner = Uuid::new_v4();
        let subset = OwnedSubset::parse(&format!("users/{}", owner), 2).unwrap();
        assert_eq!(subset.owner_id(), owner);
    }

    #[test]
    fn owned_subset_rejects_bad_indexes() {
        let path = format!("/users/{}", Uuid::new_v4());
        for index in [0, 1, 3, 4] {
            let err = OwnedSubset::parse(&path, index).unwrap_err();
            assert!(matches!(err, EndpointError::OwnerIndexOutOfRange { .. }), "{}", index);
        }
    }

    #[test]
    fn owned_subset_rejects_non_uuid_owner() {
        let err = OwnedSubset::parse("/users/not-a-uuid", 2).unwrap_err();
        assert!(matches!(err, EndpointError::InvalidOwnerId { .. }));
        assert!(err.is_validation());
    }
}
