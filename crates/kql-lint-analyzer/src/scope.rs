//! Name scopes for query analysis
//!
//! A scope holds the `let` bindings and `as` names visible to a statement.
//! Scopes nest the way the query language does: a block scope is the root, and
//! a function body or subquery would get a child scope of it.

use indexmap::IndexMap;

/// Column names of a tabular value
///
/// An open schema accepts any column name; it is the result of sources and
/// operators whose output columns cannot be known without running them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns {
    names: Option<Vec<String>>,
}

impl Columns {
    pub fn open() -> Self {
        Self { names: None }
    }

    pub fn known<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns = Self {
            names: Some(Vec::new()),
        };
        for name in names {
            columns.add(name.into());
        }
        columns
    }

    pub fn empty() -> Self {
        Self::known(Vec::<String>::new())
    }

    pub fn is_open(&self) -> bool {
        self.names.is_none()
    }

    /// Column names match case-insensitively; an open schema contains every name
    pub fn contains(&self, name: &str) -> bool {
        match &self.names {
            Some(names) => names.iter().any(|n| n.eq_ignore_ascii_case(name)),
            None => true,
        }
    }

    pub fn names(&self) -> &[String] {
        self.names.as_deref().unwrap_or_default()
    }

    /// Add a column, or keep the existing column of that name
    pub fn add(&mut self, name: String) {
        if let Some(names) = &mut self.names {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                names.push(name);
            }
        }
    }

    pub fn remove(&mut self, name: &str) {
        if let Some(names) = &mut self.names {
            names.retain(|n| !n.eq_ignore_ascii_case(name));
        }
    }

    pub fn rename(&mut self, from: &str, to: String) {
        if let Some(names) = &mut self.names {
            if let Some(existing) = names.iter_mut().find(|n| n.eq_ignore_ascii_case(from)) {
                *existing = to;
            }
        }
    }
}

/// What a `let` or `as` name is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Scalar,
    Tabular(Columns),
    /// A lambda: `(params) { body }`
    Function,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: IndexMap<String, Binding>,
    parent: Option<Box<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        Self {
            bindings: IndexMap::new(),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// Bind a name, shadowing any earlier binding of it
    pub fn define(&mut self, name: impl Into<String>, binding: Binding) {
        self.bindings.insert(name.into(), binding);
    }

    /// Look up a name here or in enclosing scopes. Names are case-sensitive.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings
            .get(name)
            .or_else(|| self.parent.as_ref().and_then(|p| p.lookup(name)))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns() {
        let mut columns = Columns::known(["State", "Count"]);
        assert!(columns.contains("state"));
        columns.add("STATE".to_string());
        assert_eq!(columns.names().len(), 2);
        columns.rename("count", "Total".to_string());
        columns.remove("State");
        assert_eq!(columns.names(), ["Total"]);
    }

    #[test]
    fn test_open_columns() {
        let mut columns = Columns::open();
        columns.add("x".to_string());
        assert!(columns.is_open());
        assert!(columns.contains("anything"));
        assert!(columns.names().is_empty());
    }

    #[test]
    fn test_scope_shadowing() {
        let mut outer = Scope::new();
        outer.define("x", Binding::Scalar);
        let mut inner = outer.child();
        inner.define("x", Binding::Tabular(Columns::empty()));

        assert_eq!(outer.lookup("x"), Some(&Binding::Scalar));
        assert_eq!(inner.lookup("x"), Some(&Binding::Tabular(Columns::empty())));
        assert!(!inner.is_defined("X"));
    }
}
