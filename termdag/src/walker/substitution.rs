use super::{IdentityVisitor, TermBuilder, TermMap, TreeWalker};
use crate::error::Result;
use crate::term::Term;

/// Simultaneous substitution with a persistent cache.
///
/// Keys are seeded into the cache as already resolved, so they are never
/// entered and their replacements are not walked again.
pub struct SubstitutionWalker {
    walker: TreeWalker<IdentityVisitor, TermMap>,
}

impl SubstitutionWalker {
    pub fn new(map: &TermMap) -> Result<Self> {
        let mut walker = TreeWalker::new(IdentityVisitor, false);
        for (key, value) in map {
            key.sort().expect_same_as(value.sort())?;
            walker.save_in_cache(key.clone(), value.clone());
        }
        Ok(SubstitutionWalker { walker })
    }

    pub fn visit<B: TermBuilder + ?Sized>(&mut self, builder: &mut B, term: &Term) -> Result<Term> {
        self.walker.visit(builder, term)
    }

    pub fn cache(&self) -> &TermMap {
        self.walker.cache()
    }
}
