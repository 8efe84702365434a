mod substitution;
mod translate;

pub use substitution::SubstitutionWalker;
pub use translate::{transfer, TermTranslator};

use crate::error::{Error, Result};
use crate::term::{Op, Term};
use log::debug;
use std::borrow::{Borrow, BorrowMut};
use std::collections::{HashMap, HashSet};

pub type TermMap = HashMap<Term, Term>;

/// What the walker does with a node after its children were resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalkerStep {
    /// Rebuild from the rewritten children, if any of them changed.
    Continue,
    /// Map the node to the given term.
    Replace(Term),
    /// Keep the node as it is, whatever happened to its children.
    Skip,
    /// Stop the traversal. The cache keeps whatever was resolved so far.
    Abort,
}

/// Where rewritten nodes get rebuilt.
pub trait TermBuilder {
    /// Whether terms built here expose their operator and children.
    fn can_iterate_terms(&self) -> bool;
    fn rebuild(&mut self, op: Op, children: &[Term]) -> Result<Term>;
}

/// Per-node hook. `children` are the already rewritten children of `term`.
pub trait Visitor<B: TermBuilder + ?Sized> {
    fn visit_term(&mut self, builder: &mut B, term: &Term, children: &[Term]) -> Result<WalkerStep>;
}

/// Always continues; walking with it rebuilds a term from its (possibly
/// pre-seeded) cache entries.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityVisitor;

impl<B: TermBuilder + ?Sized> Visitor<B> for IdentityVisitor {
    fn visit_term(&mut self, _: &mut B, _: &Term, _: &[Term]) -> Result<WalkerStep> {
        Ok(WalkerStep::Continue)
    }
}

/// Post-order rewriting over a term DAG, with an explicit stack and a
/// term-to-term cache. Each distinct node is visited once per cache
/// lifetime, however many parents share it.
///
/// The cache is either owned ([`TreeWalker::new`]) or borrowed from the
/// caller ([`TreeWalker::with_cache`]); a borrowed cache is never cleared.
pub struct TreeWalker<V = IdentityVisitor, C = TermMap> {
    visitor: V,
    cache: C,
    clear_cache: bool,
    aborted: bool,
}

impl<V> TreeWalker<V, TermMap> {
    /// With `clear_cache`, every `visit` starts from an empty cache.
    pub fn new(visitor: V, clear_cache: bool) -> Self {
        TreeWalker {
            visitor,
            cache: TermMap::new(),
            clear_cache,
            aborted: false,
        }
    }
}

impl<'a, V> TreeWalker<V, &'a mut TermMap> {
    pub fn with_cache(visitor: V, cache: &'a mut TermMap) -> Self {
        TreeWalker {
            visitor,
            cache,
            clear_cache: false,
            aborted: false,
        }
    }
}

impl<V, C: BorrowMut<TermMap>> TreeWalker<V, C> {
    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    pub fn visitor_mut(&mut self) -> &mut V {
        &mut self.visitor
    }

    pub fn cache(&self) -> &TermMap {
        self.cache.borrow()
    }

    pub fn in_cache(&self, key: &Term) -> bool {
        self.cache().contains_key(key)
    }

    pub fn query_cache(&self, key: &Term) -> Option<&Term> {
        self.cache().get(key)
    }

    /// Overwrites any existing entry.
    pub fn save_in_cache(&mut self, key: Term, value: Term) {
        let cache: &mut TermMap = self.cache.borrow_mut();
        cache.insert(key, value);
    }

    /// Whether the last `visit` stopped on [`WalkerStep::Abort`].
    pub fn was_aborted(&self) -> bool {
        self.aborted
    }

    pub fn visit<B>(&mut self, builder: &mut B, root: &Term) -> Result<Term>
    where
        B: TermBuilder + ?Sized,
        V: Visitor<B>,
    {
        if !builder.can_iterate_terms() {
            return Err(Error::unsupported("walking terms of a builder without term iteration"));
        }
        if self.clear_cache {
            let cache: &mut TermMap = self.cache.borrow_mut();
            cache.clear();
        }
        self.aborted = false;

        let mut visited: HashSet<Term> = HashSet::new();
        let mut stack = vec![root.clone()];
        while let Some(term) = stack.pop() {
            let cache: &mut TermMap = self.cache.borrow_mut();
            if cache.contains_key(&term) {
                continue;
            }
            if visited.insert(term.clone()) {
                stack.push(term.clone());
                stack.extend(term.children().iter().cloned());
                continue;
            }

            let children = term
                .children()
                .iter()
                .map(|c| {
                    cache.get(c).cloned().ok_or_else(|| {
                        Error::internal(format!("child {} of {} was not resolved", c, term))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let rewritten = match self.visitor.visit_term(builder, &term, &children)? {
                WalkerStep::Continue => {
                    let unchanged =
                        children.iter().zip(term.children()).all(|(new, old)| new == old);
                    if unchanged || term.is_value() {
                        term.clone()
                    } else {
                        builder.rebuild(term.op(), &children)?
                    }
                }
                WalkerStep::Replace(t) => t,
                WalkerStep::Skip => term.clone(),
                WalkerStep::Abort => {
                    debug!("walk of {:?} aborted at {:?}", root, term);
                    self.aborted = true;
                    return Ok(self.cache().get(root).cloned().unwrap_or_else(|| root.clone()));
                }
            };
            self.save_in_cache(term, rewritten);
        }

        self.cache()
            .get(root)
            .cloned()
            .ok_or_else(|| Error::internal(format!("{} was not resolved", root)))
    }
}
