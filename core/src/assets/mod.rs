//! Asset cache.
//!
//! Resolution is asynchronous; tree mutation is not. A node is inserted with
//! its captured attribute value and an [`AttributeRewrite`] is produced once
//! the referenced url resolves. The replayer applies rewrites between frames
//! and drops any whose attribute changed in the meantime.

mod cacheable;
mod resolver;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture, Shared};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;

pub use cacheable::{
    attribute_urls, is_cacheable_attribute, is_cacheable_url, replace_srcset_url, srcset_urls,
};
pub use resolver::{AssetResolver, InlineResolver};

use crate::diagnostics::Diagnostics;
use crate::event::{AssetData, NodeId};
use crate::mirror::Mirror;
use crate::tree::{NodeRef, TreeTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStatus {
    Unknown,
    Loading,
    Loaded(String),
    Failed,
    /// The cache was reset while waiting.
    Reset,
}

/// A pending attribute update produced by [`AssetManager::manage_attribute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRewrite {
    pub node_id: NodeId,
    pub attribute: String,
    /// Value captured when the rewrite was scheduled.
    pub original: String,
    pub replacement: String,
    /// The original was moved to `rr_captured_<attribute>` meanwhile.
    pub hidden: bool,
}

type Task = LocalBoxFuture<'static, Option<AttributeRewrite>>;
type SharedStatus = Shared<LocalBoxFuture<'static, AssetStatus>>;

#[derive(Default)]
struct State {
    loaded: HashMap<String, String>,
    loading: HashSet<String>,
    failed: HashSet<String>,
    waiters: HashMap<String, Vec<oneshot::Sender<AssetStatus>>>,
    shared: HashMap<String, SharedStatus>,
    generation: u64,
}

impl State {
    fn status(&self, url: &str) -> AssetStatus {
        if let Some(local) = self.loaded.get(url) {
            return AssetStatus::Loaded(local.clone());
        }
        if self.failed.contains(url) {
            return AssetStatus::Failed;
        }
        if self.loading.contains(url) {
            return AssetStatus::Loading;
        }
        AssetStatus::Unknown
    }

    fn notify(&mut self, url: &str, status: AssetStatus) {
        self.shared.remove(url);
        for tx in self.waiters.remove(url).unwrap_or_default() {
            let _ = tx.send(status.clone());
        }
    }
}

pub struct AssetManager {
    state: Rc<RefCell<State>>,
    resolver: Rc<dyn AssetResolver>,
    resolving: RefCell<FuturesUnordered<LocalBoxFuture<'static, ()>>>,
    rewrites: RefCell<FuturesUnordered<Task>>,
    hide_uncached: bool,
    diag: Diagnostics,
}

impl AssetManager {
    pub fn new(resolver: Rc<dyn AssetResolver>, hide_uncached: bool, diag: Diagnostics) -> Self {
        Self {
            state: Rc::new(RefCell::new(State::default())),
            resolver,
            resolving: RefCell::new(FuturesUnordered::new()),
            rewrites: RefCell::new(FuturesUnordered::new()),
            hide_uncached,
            diag,
        }
    }

    pub fn set_hide_uncached(&mut self, hide: bool) {
        self.hide_uncached = hide;
    }

    /// Records an asset event. The returned future performs the resolution.
    ///
    /// A url that is already loading or loaded is not resolved again; a loaded
    /// url only re-notifies its waiters.
    pub fn add(&self, asset: AssetData) -> LocalBoxFuture<'static, ()> {
        let url = asset.url.clone();
        {
            let mut st = self.state.borrow_mut();
            if asset.failed {
                st.loading.remove(&url);
                st.failed.insert(url.clone());
                st.notify(&url, AssetStatus::Failed);
                return future::ready(()).boxed_local();
            }
            if let Some(local) = st.loaded.get(&url).cloned() {
                st.notify(&url, AssetStatus::Loaded(local));
                return future::ready(()).boxed_local();
            }
            if st.loading.contains(&url) {
                return future::ready(()).boxed_local();
            }
            st.loading.insert(url.clone());
            st.failed.remove(&url);
        }

        let state = Rc::clone(&self.state);
        let resolver = Rc::clone(&self.resolver);
        let diag = self.diag.clone();
        let generation = state.borrow().generation;
        async move {
            let result = resolver.resolve(&asset).await;
            let mut st = state.borrow_mut();
            if st.generation != generation {
                if let Ok(local) = result {
                    resolver.revoke(&local);
                }
                return;
            }
            st.loading.remove(&url);
            match result {
                Ok(local) => {
                    st.loaded.insert(url.clone(), local.clone());
                    st.notify(&url, AssetStatus::Loaded(local));
                }
                Err(e) => {
                    diag.warn(format!("asset {url} could not be resolved: {e}"));
                    st.failed.insert(url.clone());
                    st.notify(&url, AssetStatus::Failed);
                }
            }
        }
        .boxed_local()
    }

    /// Records an asset event and keeps its resolution on the pending queue.
    pub fn add_pending(&self, asset: AssetData) {
        let task = self.add(asset);
        self.resolving.borrow_mut().push(task);
    }

    pub fn get(&self, url: &str) -> AssetStatus {
        self.state.borrow().status(url)
    }

    /// Resolves immediately for loaded or failed urls, otherwise waits for
    /// the next notification for `url`.
    pub fn when_ready(&self, url: &str) -> LocalBoxFuture<'static, AssetStatus> {
        let mut st = self.state.borrow_mut();
        match st.status(url) {
            s @ (AssetStatus::Loaded(_) | AssetStatus::Failed) => future::ready(s).boxed_local(),
            _ => {
                let (tx, rx) = oneshot::channel();
                st.waiters.entry(url.to_string()).or_default().push(tx);
                rx.map(|r| r.unwrap_or(AssetStatus::Reset)).boxed_local()
            }
        }
    }

    /// One wait per url, shared by every attribute referencing it.
    fn shared_ready(&self, url: &str) -> SharedStatus {
        if let Some(s) = self.state.borrow().shared.get(url) {
            return s.clone();
        }
        let shared = self.when_ready(url).shared();
        if matches!(self.get(url), AssetStatus::Unknown | AssetStatus::Loading) {
            self.state
                .borrow_mut()
                .shared
                .insert(url.to_string(), shared.clone());
        }
        shared
    }

    /// Schedules a rewrite of `attribute` on `node` if it references cacheable
    /// urls. Returns whether anything was scheduled.
    pub fn manage_attribute(
        &self,
        tree: &mut dyn TreeTarget,
        node: NodeRef,
        node_id: NodeId,
        attribute: &str,
    ) -> bool {
        let Some(tag) = tree.describe(node).and_then(|s| s.tag().map(str::to_string)) else {
            return false;
        };
        if !is_cacheable_attribute(&tag, attribute) {
            return false;
        }
        let Some(original) = tree.get_attribute(node, attribute) else {
            return false;
        };
        let urls = attribute_urls(attribute, &original);
        if urls.is_empty() {
            return false;
        }

        let all_loaded = urls
            .iter()
            .all(|u| matches!(self.get(u), AssetStatus::Loaded(_)));
        let mut hidden = false;
        if self.hide_uncached && !all_loaded {
            let captured = format!("rr_captured_{attribute}");
            let moved = tree
                .set_attribute(node, &captured, &original)
                .and_then(|_| tree.remove_attribute(node, attribute));
            match moved {
                Ok(()) => hidden = true,
                Err(e) => self
                    .diag
                    .debug(format!("could not hide {attribute} of node {node_id}: {e}")),
            }
        }

        let waits: Vec<_> = urls
            .iter()
            .map(|u| self.shared_ready(u).map({
                let u = u.clone();
                move |s| (u, s)
            }))
            .collect();
        let attribute = attribute.to_string();
        let task = async move {
            let statuses = future::join_all(waits).await;
            if statuses.iter().any(|(_, s)| *s == AssetStatus::Reset) {
                return None;
            }
            let mut replacement = original.clone();
            for (url, status) in &statuses {
                if let AssetStatus::Loaded(local) = status {
                    replacement = if attribute == "srcset" {
                        replace_srcset_url(&replacement, url, local)
                    } else {
                        local.clone()
                    };
                }
            }
            if replacement == original && !hidden {
                return None;
            }
            Some(AttributeRewrite {
                node_id,
                attribute,
                original,
                replacement,
                hidden,
            })
        }
        .boxed_local();
        self.rewrites.borrow_mut().push(task);
        true
    }

    /// Polls pending work once without blocking and returns finished rewrites.
    pub fn poll_ready(&self) -> Vec<AttributeRewrite> {
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        {
            let mut resolving = self.resolving.borrow_mut();
            while let Poll::Ready(Some(())) = resolving.poll_next_unpin(&mut cx) {}
        }
        let mut out = Vec::new();
        let mut rewrites = self.rewrites.borrow_mut();
        while let Poll::Ready(Some(done)) = rewrites.poll_next_unpin(&mut cx) {
            out.extend(done);
        }
        out
    }

    /// Finishes every queued resolution, then collects the rewrites that
    /// became ready. Rewrites waiting on urls nobody added stay queued.
    pub async fn flush(&self) -> Vec<AttributeRewrite> {
        let resolving = std::mem::take(&mut *self.resolving.borrow_mut());
        resolving.collect::<Vec<()>>().await;
        self.poll_ready()
    }

    pub fn has_pending(&self) -> bool {
        !self.resolving.borrow().is_empty() || !self.rewrites.borrow().is_empty()
    }

    pub fn is_resolving(&self) -> bool {
        !self.resolving.borrow().is_empty()
    }

    /// Revokes every local reference and releases all waiters with
    /// [`AssetStatus::Reset`].
    pub fn reset(&self) {
        let mut st = self.state.borrow_mut();
        for local in st.loaded.values() {
            self.resolver.revoke(local);
        }
        st.loaded.clear();
        st.loading.clear();
        st.failed.clear();
        st.shared.clear();
        st.generation += 1;
        for (_, waiters) in st.waiters.drain() {
            for tx in waiters {
                let _ = tx.send(AssetStatus::Reset);
            }
        }
    }
}

/// Applies a rewrite if the attribute still holds the value it was scheduled
/// for. Returns whether the tree changed.
pub fn apply_rewrite(
    tree: &mut dyn TreeTarget,
    mirror: &Mirror,
    rewrite: &AttributeRewrite,
    diag: &Diagnostics,
) -> bool {
    let Some(node) = mirror.get_node(rewrite.node_id) else {
        return false;
    };
    let captured = format!("rr_captured_{}", rewrite.attribute);
    let source = if rewrite.hidden {
        &captured
    } else {
        &rewrite.attribute
    };
    if tree.get_attribute(node, source).as_deref() != Some(rewrite.original.as_str()) {
        diag.debug(format!(
            "dropping stale {} rewrite on node {}",
            rewrite.attribute, rewrite.node_id
        ));
        return false;
    }
    let mut result = tree.set_attribute(node, &rewrite.attribute, &rewrite.replacement);
    if rewrite.hidden && result.is_ok() {
        result = tree.remove_attribute(node, &captured);
    }
    match result {
        Ok(()) => true,
        Err(e) => {
            diag.warn(format!(
                "failed to rewrite {} on node {}: {e}",
                rewrite.attribute, rewrite.node_id
            ));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetError;
    use crate::tree::{NodeSpec, VirtualDocument};
    use async_trait::async_trait;
    use futures::executor::block_on;
    use std::cell::Cell;

    struct CountingResolver {
        calls: Rc<Cell<usize>>,
    }

    #[async_trait(?Send)]
    impl AssetResolver for CountingResolver {
        async fn resolve(&self, asset: &AssetData) -> Result<String, AssetError> {
            self.calls.set(self.calls.get() + 1);
            Ok(format!("local:{}", asset.url))
        }
    }

    fn asset(url: &str) -> AssetData {
        AssetData {
            url: url.into(),
            payload: Some(serde_json::Value::String("x".into())),
            failed: false,
        }
    }

    fn manager(calls: &Rc<Cell<usize>>, hide: bool) -> AssetManager {
        AssetManager::new(
            Rc::new(CountingResolver {
                calls: Rc::clone(calls),
            }),
            hide,
            Diagnostics::default(),
        )
    }

    #[test]
    fn concurrent_waiters_share_one_resolution() {
        let calls = Rc::new(Cell::new(0));
        let m = manager(&calls, false);
        let waiters: Vec<_> = (0..5).map(|_| m.when_ready("a.png")).collect();
        let first = m.add(asset("a.png"));
        let second = m.add(asset("a.png"));

        let (_, statuses) = block_on(future::join(
            future::join(first, second),
            future::join_all(waiters),
        ));
        assert_eq!(calls.get(), 1);
        assert!(statuses
            .iter()
            .all(|s| *s == AssetStatus::Loaded("local:a.png".into())));

        block_on(m.add(asset("a.png")));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failure_and_reset_release_waiters() {
        let calls = Rc::new(Cell::new(0));
        let m = manager(&calls, false);
        let failed = m.when_ready("gone.png");
        block_on(m.add(AssetData {
            url: "gone.png".into(),
            payload: None,
            failed: true,
        }));
        assert_eq!(block_on(failed), AssetStatus::Failed);
        assert_eq!(m.get("gone.png"), AssetStatus::Failed);

        let pending = m.when_ready("later.png");
        m.reset();
        assert_eq!(block_on(pending), AssetStatus::Reset);
        assert_eq!(m.get("gone.png"), AssetStatus::Unknown);
    }

    #[test]
    fn rewrite_applies_only_while_the_value_is_unchanged() {
        let calls = Rc::new(Cell::new(0));
        let m = manager(&calls, false);
        let mut doc = VirtualDocument::new();
        let img = doc
            .create_node(NodeSpec::Element {
                tag: "img".into(),
                svg: false,
            })
            .unwrap();
        doc.set_attribute(img, "src", "a.png").unwrap();
        let mut mirror = Mirror::new();
        mirror.add(img, 7);

        assert!(m.manage_attribute(&mut doc, img, 7, "src"));
        m.add_pending(asset("a.png"));
        let rewrites = block_on(m.flush());
        assert_eq!(rewrites.len(), 1);

        let diag = Diagnostics::default();
        assert!(apply_rewrite(&mut doc, &mirror, &rewrites[0], &diag));
        assert_eq!(doc.get_attribute(img, "src").as_deref(), Some("local:a.png"));

        doc.set_attribute(img, "src", "b.png").unwrap();
        assert!(!apply_rewrite(&mut doc, &mirror, &rewrites[0], &diag));
        assert_eq!(doc.get_attribute(img, "src").as_deref(), Some("b.png"));
    }

    #[test]
    fn hidden_values_are_restored_on_resolution() {
        let calls = Rc::new(Cell::new(0));
        let m = manager(&calls, true);
        let mut doc = VirtualDocument::new();
        let img = doc
            .create_node(NodeSpec::Element {
                tag: "img".into(),
                svg: false,
            })
            .unwrap();
        doc.set_attribute(img, "src", "a.png").unwrap();
        let mut mirror = Mirror::new();
        mirror.add(img, 3);

        m.manage_attribute(&mut doc, img, 3, "src");
        assert_eq!(doc.get_attribute(img, "src"), None);
        assert_eq!(
            doc.get_attribute(img, "rr_captured_src").as_deref(),
            Some("a.png")
        );

        m.add_pending(asset("a.png"));
        let rewrites = m.poll_ready();
        assert_eq!(rewrites.len(), 1);
        apply_rewrite(&mut doc, &mirror, &rewrites[0], &Diagnostics::default());
        assert_eq!(doc.get_attribute(img, "src").as_deref(), Some("local:a.png"));
        assert_eq!(doc.get_attribute(img, "rr_captured_src"), None);
    }
}
