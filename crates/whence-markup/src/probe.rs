//! Closing-tag capability probe.

use dashmap::DashMap;

use crate::serialize::is_void;

/// Answers whether elements of a given tag serialize with a closing tag.
pub trait ClosingTagProbe: Send + Sync {
    fn has_closing_tag(&self, tag: &str) -> bool;
}

/// Answers from the HTML void-element list. Unknown and custom elements
/// have closing tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidElements;

impl ClosingTagProbe for VoidElements {
    fn has_closing_tag(&self, tag: &str) -> bool {
        !is_void(tag)
    }
}

/// Caches another probe's answers per lowercase tag name.
pub struct MemoizedProbe<P> {
    inner: P,
    cache: DashMap<String, bool>,
}

impl<P: ClosingTagProbe> MemoizedProbe<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl<P: ClosingTagProbe> ClosingTagProbe for MemoizedProbe<P> {
    fn has_closing_tag(&self, tag: &str) -> bool {
        let key = tag.to_ascii_lowercase();
        if let Some(known) = self.cache.get(&key) {
            return *known;
        }
        let answer = self.inner.has_closing_tag(&key);
        self.cache.insert(key, answer);
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe(AtomicUsize);

    impl ClosingTagProbe for CountingProbe {
        fn has_closing_tag(&self, tag: &str) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            VoidElements.has_closing_tag(tag)
        }
    }

    #[test]
    fn test_void_elements() {
        assert!(!VoidElements.has_closing_tag("br"));
        assert!(!VoidElements.has_closing_tag("INPUT"));
        assert!(VoidElements.has_closing_tag("div"));
        assert!(VoidElements.has_closing_tag("my-widget"));
    }

    #[test]
    fn test_memoized_probe_asks_once_per_tag() {
        let probe = MemoizedProbe::new(CountingProbe(AtomicUsize::new(0)));
        assert!(!probe.has_closing_tag("IMG"));
        assert!(!probe.has_closing_tag("img"));
        assert!(probe.has_closing_tag("span"));
        assert_eq!(probe.inner.0.load(Ordering::SeqCst), 2);
        assert_eq!(probe.cached(), 2);
    }
}
