//! Depth-first traversal of value trees.
//!
//! [`Value::walk_depth`] visits every present node of a tree, in pre- or post-order,
//! handing the callback the node's [`Path`] from the walk root (labels for SEQUENCE
//! fields, indices for array elements, `#variant` for the active CHOICE arm; tagged
//! wrappers add no segment). The callback gets `&mut Value`, so it can set marks
//! ([`Value::put_mark`]) or edit leaves; in pre-order the children visited are the
//! ones present after the callback returns.
//!
//! A callback error stops the walk and is returned unchanged. Every call starts from
//! the root again, so walks are restartable and marks left by a previous pass are
//! visible to the next one.
//!
//! ```
//! use ndn_asn::{ndn, codec};
//!
//! let ty = ndn::registry().get("TCP-CSAP").unwrap();
//! let (mut v, _) = codec::parse("{ local-port plain:80, remote-port plain:81 }", &ty).unwrap();
//! let mut leaves = Vec::new();
//! v.walk_depth(true, true, |path, _| {
//!     leaves.push(path.to_string());
//!     Ok::<_, ()>(())
//! })
//! .unwrap();
//! assert_eq!(leaves, ["local-port.#plain", "remote-port.#plain"]);
//! ```
//!
//! ## Profiling
//!
//! With the **`walk_profile`** feature, time spent per node syntax is accumulated per
//! thread; use [`reset_walk_profile`] before a run and [`get_walk_profile`] after it.
//! The `text_roundtrip` bench prints the breakdown when built with the feature.

use crate::path::{Path, Segment};
#[cfg(feature = "walk_profile")]
use crate::types::Syntax;
use crate::value::{Data, Value};
use std::collections::HashMap;

#[cfg(feature = "walk_profile")]
use std::cell::RefCell;
#[cfg(feature = "walk_profile")]
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct WalkOptions {
    pre_order: bool,
    leaves_only: bool,
}

#[cfg(feature = "walk_profile")]
fn syntax_label(syntax: Syntax) -> &'static str {
    match syntax {
        Syntax::Sequence => "Sequence",
        Syntax::SequenceOf => "SequenceOf",
        Syntax::Choice => "Choice",
        Syntax::Tagged => "Tagged",
        _ => "Leaf",
    }
}

fn walk_mut<F, E>(node: &mut Value, path: &mut Path, opts: WalkOptions, f: &mut F) -> Result<(), E>
where
    F: FnMut(&Path, &mut Value) -> Result<(), E>,
{
    #[cfg(feature = "walk_profile")]
    let _guard = ProfileGuard::new(syntax_label(node.syntax()));

    let leaf = matches!(node.data, Data::Scalar(_));
    let visit = leaf || !opts.leaves_only;
    if visit && opts.pre_order {
        f(path, node)?;
    }
    let ty = node.ty.clone();
    match &mut node.data {
        Data::Sequence(slots) => {
            for (i, slot) in slots.iter_mut().enumerate() {
                let (Some(child), Some(e)) = (slot.as_mut(), ty.entries().and_then(|e| e.by_index(i))) else {
                    continue;
                };
                path.push(Segment::Label(e.label.clone()));
                let r = walk_mut(child, path, opts, f);
                path.pop();
                r?;
            }
        }
        Data::Array(items) => {
            for (i, child) in items.iter_mut().enumerate() {
                path.push(Segment::Index(i));
                let r = walk_mut(child, path, opts, f);
                path.pop();
                r?;
            }
        }
        Data::Choice(Some((i, child))) => {
            let label = ty
                .entries()
                .and_then(|e| e.by_index(*i))
                .map(|e| e.label.clone())
                .unwrap_or_default();
            path.push(Segment::Variant(label));
            let r = walk_mut(child, path, opts, f);
            path.pop();
            r?;
        }
        Data::Tagged(Some(child)) => walk_mut(child, path, opts, f)?,
        Data::Choice(None) | Data::Tagged(None) | Data::Scalar(_) => {}
    }
    if visit && !opts.pre_order {
        f(path, node)?;
    }
    Ok(())
}

fn walk_ref<F, E>(node: &Value, path: &mut Path, opts: WalkOptions, f: &mut F) -> Result<(), E>
where
    F: FnMut(&Path, &Value) -> Result<(), E>,
{
    let visit = node.scalar().is_some() || !opts.leaves_only;
    if visit && opts.pre_order {
        f(path, node)?;
    }
    for (seg, child) in node.children() {
        let pushed = seg.is_some();
        if let Some(seg) = seg {
            path.push(seg);
        }
        let r = walk_ref(child, path, opts, f);
        if pushed {
            path.pop();
        }
        r?;
    }
    if visit && !opts.pre_order {
        f(path, node)?;
    }
    Ok(())
}

impl Value {
    /// Depth-first walk over every present node (or only scalar leaves when
    /// `leaves_only`), calling `f` before (`pre_order`) or after the node's children.
    pub fn walk_depth<F, E>(&mut self, pre_order: bool, leaves_only: bool, mut f: F) -> Result<(), E>
    where
        F: FnMut(&Path, &mut Value) -> Result<(), E>,
    {
        let opts = WalkOptions { pre_order, leaves_only };
        walk_mut(self, &mut Path::root(), opts, &mut f)
    }

    /// Read-only counterpart of [`Value::walk_depth`].
    pub fn visit<F, E>(&self, pre_order: bool, leaves_only: bool, mut f: F) -> Result<(), E>
    where
        F: FnMut(&Path, &Value) -> Result<(), E>,
    {
        let opts = WalkOptions { pre_order, leaves_only };
        walk_ref(self, &mut Path::root(), opts, &mut f)
    }

    /// Set the mark of every node in the tree to `mark`.
    pub fn reset_marks(&mut self, mark: i32) {
        let _ = self.walk_depth(true, false, |_, v| {
            v.put_mark(mark);
            Ok::<_, std::convert::Infallible>(())
        });
    }

    /// Paths of all scalar leaves, in declaration order.
    pub fn leaf_paths(&self) -> Vec<Path> {
        let mut out = Vec::new();
        let _ = self.visit(true, true, |p, _| {
            out.push(p.clone());
            Ok::<_, std::convert::Infallible>(())
        });
        out
    }
}

// --- Walk profiling (feature "walk_profile") ---

#[cfg(feature = "walk_profile")]
#[derive(Default)]
struct WalkProfileStats {
    ns_per_label: HashMap<String, u64>,
}

#[cfg(feature = "walk_profile")]
thread_local!(static WALK_PROFILE: RefCell<WalkProfileStats> = RefCell::new(WalkProfileStats::default()));

#[cfg(feature = "walk_profile")]
fn record_walk_profile(label: &'static str, d: std::time::Duration) {
    WALK_PROFILE.with(|p| {
        *p.borrow_mut().ns_per_label.entry(label.to_string()).or_insert(0) += d.as_nanos() as u64;
    });
}

/// Clear the per-thread walk profile.
#[cfg(feature = "walk_profile")]
pub fn reset_walk_profile() {
    WALK_PROFILE.with(|p| *p.borrow_mut() = WalkProfileStats::default());
}

/// Accumulated walk time: node syntax label (`"Sequence"`, `"Choice"`, `"Leaf"`, ...)
/// to total nanoseconds, inclusive of children.
#[cfg(feature = "walk_profile")]
pub fn get_walk_profile() -> HashMap<String, u64> {
    WALK_PROFILE.with(|p| p.borrow().ns_per_label.clone())
}

#[cfg(feature = "walk_profile")]
struct ProfileGuard {
    label: &'static str,
    start: Instant,
}

#[cfg(feature = "walk_profile")]
impl ProfileGuard {
    fn new(label: &'static str) -> Self {
        Self { label, start: Instant::now() }
    }
}

#[cfg(feature = "walk_profile")]
impl Drop for ProfileGuard {
    fn drop(&mut self) {
        record_walk_profile(self.label, self.start.elapsed());
    }
}

#[cfg(not(feature = "walk_profile"))]
/// No-op when the `walk_profile` feature is not enabled.
pub fn reset_walk_profile() {}

#[cfg(not(feature = "walk_profile"))]
/// Returns an empty map when the `walk_profile` feature is not enabled.
pub fn get_walk_profile() -> HashMap<String, u64> {
    HashMap::new()
}
