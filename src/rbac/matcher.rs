//! Hierarchical resource matching.
//!
//! A rule registered on a resource also covers every descendant path. The
//! lookup strips one `/`-segment from the right per step until the path is
//! empty, so the walk is bounded by path depth.
//!
//! ```text
//! gleaner/api/items → gleaner/api → gleaner
//! /roles/{role}/resources → /roles/{role} → /roles
//! ```

/// Iterator over a resource and its ancestors, nearest first.
#[derive(Debug, Clone)]
pub struct Ancestry<'a> {
    next: Option<&'a str>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current
            .rfind('/')
            .map(|idx| &current[..idx])
            .filter(|parent| !parent.is_empty());
        Some(current)
    }
}

/// Walk `resource` and its ancestors.
pub fn ancestry(resource: &str) -> Ancestry<'_> {
    Ancestry {
        next: Some(resource).filter(|r| !r.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_resource() {
        let levels: Vec<_> = ancestry("gleaner/route1/items").collect();
        assert_eq!(levels, vec!["gleaner/route1/items", "gleaner/route1", "gleaner"]);
    }

    #[test]
    fn test_absolute_resource_stops_before_empty() {
        let levels: Vec<_> = ancestry("/roles/dev/resources").collect();
        assert_eq!(levels, vec!["/roles/dev/resources", "/roles/dev", "/roles"]);
    }

    #[test]
    fn test_trailing_slash_is_its_own_level() {
        let levels: Vec<_> = ancestry("app/dir/").collect();
        assert_eq!(levels, vec!["app/dir/", "app/dir", "app"]);
    }

    #[test]
    fn test_empty_resource() {
        assert_eq!(ancestry("").count(), 0);
        assert_eq!(ancestry("/").count(), 1);
    }
}
