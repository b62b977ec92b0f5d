//! Generic tree framework driving every plan and expression rewrite.
//!
//! [`TreeNode`] abstracts over the two tree shapes in this crate
//! (`Expr` and `Arc<LogicalPlan>`) and provides the transform machinery on
//! top of three primitives: `children`, `with_new_children`, and
//! `node_label`. Rules are partial functions: `None` means "no match, keep
//! the node".
//!
//! Unchanged subtrees are passed through by identity. A transform that
//! matches nothing returns the original node wrapped in
//! [`Transformed::No`], so callers (in particular the fixed-point rules
//! executor) can detect convergence without a structural comparison.

pub mod transformed;

pub use transformed::Transformed;

pub trait TreeNode: Sized + Clone + PartialEq {
    /// Immediate children, in constructor order.
    fn children(&self) -> Vec<&Self>;

    /// Rebuild this node with substituted children.
    ///
    /// Panics if `children.len()` differs from the node's arity; passing the
    /// wrong number of children is a programmer error.
    fn with_new_children(&self, children: Vec<Self>) -> Self;

    /// One-line description used by [`TreeNode::pretty_tree`].
    fn node_label(&self) -> String;

    /// Reference identity, where the representation has one (`Arc` nodes).
    /// The default is `false`; `same_as` then falls back to value equality.
    fn ref_eq(&self, _other: &Self) -> bool {
        false
    }

    /// Reference OR value equality.
    fn same_as(&self, other: &Self) -> bool {
        self.ref_eq(other) || self == other
    }

    /// Apply `f` to each child, rebuilding this node only if at least one
    /// child changed.
    fn transform_children<F>(&self, f: &mut F) -> Transformed<Self>
    where
        F: FnMut(&Self) -> Transformed<Self>,
    {
        let children = self.children();
        if children.is_empty() {
            return Transformed::No(self.clone());
        }
        let mut changed = false;
        let mut new_children = Vec::with_capacity(children.len());
        for child in children {
            let tf = f(child);
            changed |= tf.is_yes();
            new_children.push(tf.into_inner());
        }
        if changed {
            Transformed::Yes(self.with_new_children(new_children))
        } else {
            Transformed::No(self.clone())
        }
    }

    /// Apply `rule` to this node first, then recurse into the children of
    /// the (possibly rewritten) node.
    fn transform_down<F>(&self, rule: &F) -> Transformed<Self>
    where
        F: Fn(&Self) -> Option<Self>,
    {
        match rule(self) {
            Some(rewritten) => {
                let tf = rewritten.transform_children(&mut |child| child.transform_down(rule));
                Transformed::Yes(tf.into_inner())
            }
            None => self.transform_children(&mut |child| child.transform_down(rule)),
        }
    }

    /// Recurse into children first, then apply `rule` to the rebuilt node.
    fn transform_up<F>(&self, rule: &F) -> Transformed<Self>
    where
        F: Fn(&Self) -> Option<Self>,
    {
        let tf = self.transform_children(&mut |child| child.transform_up(rule));
        let children_changed = tf.is_yes();
        let node = tf.into_inner();
        match rule(&node) {
            Some(rewritten) => Transformed::Yes(rewritten),
            None => {
                if children_changed {
                    Transformed::Yes(node)
                } else {
                    Transformed::No(node)
                }
            }
        }
    }

    /// Pre-order accumulation of every projection `matcher` produces.
    fn collect<T, F>(&self, matcher: &F) -> Vec<T>
    where
        F: Fn(&Self) -> Option<T>,
    {
        let mut out = Vec::new();
        self.collect_into(matcher, &mut out);
        out
    }

    fn collect_into<T, F>(&self, matcher: &F, out: &mut Vec<T>)
    where
        F: Fn(&Self) -> Option<T>,
    {
        if let Some(v) = matcher(self) {
            out.push(v);
        }
        for child in self.children() {
            child.collect_into(matcher, out);
        }
    }

    /// `true` iff `pred` holds somewhere in the tree. Short-circuits.
    fn exists<F>(&self, pred: &F) -> bool
    where
        F: Fn(&Self) -> bool,
    {
        pred(self) || self.children().into_iter().any(|c| c.exists(pred))
    }

    /// `true` iff `pred` holds everywhere in the tree. Short-circuits.
    fn for_all<F>(&self, pred: &F) -> bool
    where
        F: Fn(&Self) -> bool,
    {
        pred(self) && self.children().into_iter().all(|c| c.for_all(pred))
    }

    fn size(&self) -> usize {
        1 + self.children().into_iter().map(|c| c.size()).sum::<usize>()
    }

    fn depth(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(|c| c.depth())
            .max()
            .unwrap_or(0)
    }

    /// Render the tree with box-drawing characters:
    ///
    /// ```text
    /// Project [x#3]
    /// └── Filter [(a#1 > 1)]
    ///     └── LocalRelation [a#1: INT]
    /// ```
    fn pretty_tree(&self) -> String {
        let mut out = String::new();
        self.fmt_tree(&mut out, "", true, true);
        out
    }

    fn fmt_tree(&self, out: &mut String, prefix: &str, is_last: bool, is_root: bool) {
        let (branch, next_prefix) = if is_last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };

        if is_root {
            out.push_str(&self.node_label());
        } else {
            out.push_str(prefix);
            out.push_str(branch);
            out.push_str(&self.node_label());
        }
        out.push('\n');

        let children = self.children();
        let last = children.len().saturating_sub(1);
        for (i, child) in children.into_iter().enumerate() {
            let child_prefix = if is_root {
                String::new()
            } else {
                format!("{}{}", prefix, next_prefix)
            };
            child.fmt_tree(out, &child_prefix, i == last, false);
        }
    }
}
