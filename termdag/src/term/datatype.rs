use super::Sort;
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    pub name: String,
    pub sort: Sort,
    /// False while `sort` is a placeholder for the datatype being declared.
    pub finalized: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorDecl {
    name: String,
    selectors: Vec<Selector>,
}

impl ConstructorDecl {
    pub fn new(name: impl Into<String>) -> Self {
        ConstructorDecl {
            name: name.into(),
            selectors: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn add_selector(&mut self, name: impl Into<String>, sort: Sort) -> Result<()> {
        self.push(Selector {
            name: name.into(),
            sort,
            finalized: true,
        })
    }

    /// Adds a selector whose sort is the datatype under declaration. Its sort
    /// is fixed later by [`DatatypeDecl::finalize`].
    pub fn add_selector_self(&mut self, name: impl Into<String>, datatype: &str) -> Result<()> {
        self.push(Selector {
            name: name.into(),
            sort: Sort::Unresolved(datatype.to_string()),
            finalized: false,
        })
    }

    fn push(&mut self, selector: Selector) -> Result<()> {
        if self.selectors.iter().any(|s| s.name == selector.name) {
            return Err(Error::Duplicate("selector", selector.name));
        }
        self.selectors.push(selector);
        Ok(())
    }
}

/// A datatype under declaration: a name, its sort parameters and an
/// insertion-ordered list of constructors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatatypeDecl {
    name: String,
    params: Vec<Sort>,
    constructors: Vec<ConstructorDecl>,
}

impl DatatypeDecl {
    pub fn new(name: impl Into<String>) -> Self {
        DatatypeDecl {
            name: name.into(),
            params: vec![],
            constructors: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Sort] {
        &self.params
    }

    pub fn constructors(&self) -> &[ConstructorDecl] {
        &self.constructors
    }

    pub fn add_constructor(&mut self, cons: ConstructorDecl) -> Result<()> {
        if self.constructors.iter().any(|c| c.name == cons.name) {
            return Err(Error::Duplicate("constructor", cons.name));
        }
        for selector in &cons.selectors {
            if let Sort::Param(_) = selector.sort {
                if !self.params.contains(&selector.sort) {
                    self.params.push(selector.sort.clone());
                }
            }
        }
        self.constructors.push(cons);
        Ok(())
    }

    /// Adds a selector to a constructor already in this declaration.
    pub fn add_selector(&mut self, cons: &str, selector: Selector) -> Result<()> {
        let target = self
            .constructors
            .iter_mut()
            .find(|c| c.name == cons)
            .ok_or_else(|| {
                Error::usage(format!("constructor {} is not a member of {}", cons, self.name))
            })?;
        if let Sort::Param(_) = selector.sort {
            if !self.params.contains(&selector.sort) {
                self.params.push(selector.sort.clone());
            }
        }
        target.push(selector)
    }

    pub fn num_constructors(&self) -> usize {
        self.constructors.len()
    }

    pub fn num_selectors(&self, cons: &str) -> Result<usize> {
        self.constructors
            .iter()
            .find(|c| c.name == cons)
            .map(|c| c.selectors.len())
            .ok_or_else(|| Error::usage(format!("constructor {} not found", cons)))
    }

    /// Replaces the sort of every unfinalized selector with `sort`. Already
    /// finalized selectors are left alone.
    pub fn finalize(&mut self, sort: &Sort) {
        for selector in self
            .constructors
            .iter_mut()
            .flat_map(|c| c.selectors.iter_mut())
            .filter(|s| !s.finalized)
        {
            selector.sort = sort.clone();
            selector.finalized = true;
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.constructors
            .iter()
            .all(|c| c.selectors.iter().all(|s| s.finalized))
    }
}
