//! Path queries over config trees.
//!
//! A small XPath subset, enough for selecting subtrees and counting:
//!
//! - location steps separated by `/` (child) or `//` (descendant)
//! - name tests `name`, `prefix:name`, `prefix:*` and `*`; an unprefixed name
//!   matches in any namespace
//! - predicates `[key='value']`, `[prefix:key="value"]`, `[.='value']` and
//!   positional `[n]` (1-based, among siblings passing the name test)
//! - `count(path)` yields the number of matches instead of the nodes
//!
//! Matches are produced lazily, depth first.

use std::slice;
use std::sync::Arc;

use super::node::DataNode;
use crate::error::{DeltaError, Result};
use crate::schema::SchemaModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Namespace(String),
    Name {
        namespace: Option<String>,
        name: String,
    },
}

impl NameTest {
    fn matches(&self, node: &DataNode) -> bool {
        match self {
            Self::Any => true,
            Self::Namespace(ns) => node.namespace() == ns,
            Self::Name { namespace, name } => {
                node.name() == name && namespace.as_ref().is_none_or(|ns| node.namespace() == ns)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    /// `[.='v']` when `target` is `None`, `[name='v']` otherwise
    Equals {
        target: Option<NameTest>,
        value: String,
    },
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

/// A parsed path query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    expression: String,
    steps: Arc<[Step]>,
    count: bool,
}

/// Outcome of evaluating a query.
#[derive(Debug, Clone)]
pub enum QueryResult<'a> {
    Nodes(Matches<'a>),
    Count(usize),
}

impl<'a> QueryResult<'a> {
    /// Matched nodes, empty for a `count()` query.
    #[must_use]
    pub fn into_nodes(self) -> Vec<&'a DataNode> {
        match self {
            Self::Nodes(matches) => matches.collect(),
            Self::Count(_) => Vec::new(),
        }
    }

    /// Number of matches, for either kind of query.
    #[must_use]
    pub fn count(self) -> usize {
        match self {
            Self::Nodes(matches) => matches.count(),
            Self::Count(n) => n,
        }
    }
}

impl Query {
    /// Parse an expression, resolving prefixes through the schema's modules.
    pub fn parse(schema: &SchemaModel, expression: &str) -> Result<Self> {
        Parser {
            schema,
            expression,
            chars: expression.char_indices().peekable(),
        }
        .parse()
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether this is a `count()` query.
    #[must_use]
    pub const fn is_count(&self) -> bool {
        self.count
    }

    /// Evaluate against a forest of top-level nodes.
    ///
    /// The result only borrows the tree; the query can be run again.
    #[must_use]
    pub fn evaluate<'a>(&self, roots: &'a [DataNode]) -> QueryResult<'a> {
        let matches = Matches::new(Arc::clone(&self.steps), roots);
        if self.count {
            QueryResult::Count(matches.count())
        } else {
            QueryResult::Nodes(matches)
        }
    }
}

#[derive(Debug, Clone)]
struct Frame<'a> {
    nodes: slice::Iter<'a, DataNode>,
    step: usize,
    axis: Axis,
    counters: Vec<usize>,
}

/// Lazy iterator over the nodes selected by a query.
#[derive(Debug, Clone)]
pub struct Matches<'a> {
    steps: Arc<[Step]>,
    stack: Vec<Frame<'a>>,
}

impl<'a> Matches<'a> {
    fn new(steps: Arc<[Step]>, roots: &'a [DataNode]) -> Self {
        let first_axis = steps.first().map(|s| s.axis);
        let mut matches = Self {
            steps,
            stack: Vec::new(),
        };
        if let Some(axis) = first_axis {
            matches.push(roots, 0, axis);
        }
        matches
    }

    fn push(&mut self, nodes: &'a [DataNode], step: usize, axis: Axis) {
        if nodes.is_empty() {
            return;
        }
        self.stack.push(Frame {
            nodes: nodes.iter(),
            step,
            axis,
            counters: vec![0; self.steps[step].predicates.len()],
        });
    }
}

impl<'a> Iterator for Matches<'a> {
    type Item = &'a DataNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(node) = frame.nodes.next() else {
                self.stack.pop();
                continue;
            };
            let step_idx = frame.step;
            let axis = frame.axis;
            let step = &self.steps[step_idx];
            let matched = step.test.matches(node) && predicates_hold(step, node, &mut frame.counters);
            let next_axis = self.steps.get(step_idx + 1).map(|s| s.axis);

            if axis == Axis::Descendant {
                self.push(&node.children, step_idx, Axis::Descendant);
            }
            if matched {
                match next_axis {
                    None => return Some(node),
                    Some(next) => self.push(&node.children, step_idx + 1, next),
                }
            }
        }
    }
}

fn predicates_hold(step: &Step, node: &DataNode, counters: &mut [usize]) -> bool {
    for (idx, predicate) in step.predicates.iter().enumerate() {
        let holds = match predicate {
            Predicate::Position(n) => {
                counters[idx] += 1;
                counters[idx] == *n
            }
            Predicate::Equals { target: None, value } => {
                node.value().is_some_and(|v| v.to_string() == *value)
            }
            Predicate::Equals {
                target: Some(test),
                value,
            } => node.children().iter().any(|c| {
                test.matches(c) && c.value().is_some_and(|v| v.to_string() == *value)
            }),
        };
        if !holds {
            return false;
        }
    }
    true
}

// ============================================================================
// Parsing
// ============================================================================

struct Parser<'s> {
    schema: &'s SchemaModel,
    expression: &'s str,
    chars: std::iter::Peekable<std::str::CharIndices<'s>>,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> DeltaError {
        DeltaError::query(self.expression, message)
    }

    fn parse(mut self) -> Result<Query> {
        self.skip_ws();
        let rest = self.rest();
        let count = rest.starts_with("count(") || rest.starts_with("count (");
        if count {
            self.consume_word("count");
            self.skip_ws();
            self.expect('(')?;
        }
        let steps = self.parse_path()?;
        self.skip_ws();
        if count {
            self.expect(')')?;
            self.skip_ws();
        }
        if let Some((pos, c)) = self.chars.peek().copied() {
            return Err(self.error(format!("unexpected '{c}' at offset {pos}")));
        }
        Ok(Query {
            expression: self.expression.to_string(),
            steps: steps.into(),
            count,
        })
    }

    fn rest(&mut self) -> &str {
        let pos = self.chars.peek().map_or(self.expression.len(), |(p, _)| *p);
        &self.expression[pos..]
    }

    fn consume_word(&mut self, word: &str) {
        for _ in word.chars() {
            self.chars.next();
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(()),
            Some((pos, c)) => Err(self.error(format!("expected '{expected}' at offset {pos}, found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}' at end of expression"))),
        }
    }

    fn parse_path(&mut self) -> Result<Vec<Step>> {
        let mut steps = Vec::new();
        let mut axis = self.parse_separator().unwrap_or(Axis::Child);
        loop {
            let test = self.parse_name_test(true)?;
            let mut predicates = Vec::new();
            while self.chars.next_if(|(_, c)| *c == '[').is_some() {
                predicates.push(self.parse_predicate()?);
            }
            steps.push(Step {
                axis,
                test,
                predicates,
            });
            match self.parse_separator() {
                Some(next) => axis = next,
                None => break,
            }
        }
        Ok(steps)
    }

    fn parse_separator(&mut self) -> Option<Axis> {
        self.chars.next_if(|(_, c)| *c == '/')?;
        if self.chars.next_if(|(_, c)| *c == '/').is_some() {
            Some(Axis::Descendant)
        } else {
            Some(Axis::Child)
        }
    }

    fn parse_ncname(&mut self) -> String {
        let mut name = String::new();
        while let Some((_, c)) = self
            .chars
            .next_if(|(_, c)| c.is_alphanumeric() || matches!(*c, '-' | '_' | '.'))
        {
            name.push(c);
        }
        name
    }

    fn namespace_of(&self, prefix: &str) -> Result<String> {
        self.schema
            .module_by_prefix(prefix)
            .map(|m| m.namespace.clone())
            .ok_or_else(|| self.error(format!("unknown prefix '{prefix}'")))
    }

    fn parse_name_test(&mut self, allow_wildcard: bool) -> Result<NameTest> {
        if allow_wildcard && self.chars.next_if(|(_, c)| *c == '*').is_some() {
            return Ok(NameTest::Any);
        }
        let first = self.parse_ncname();
        if first.is_empty() {
            return Err(match self.chars.peek().copied() {
                Some((pos, c)) => self.error(format!("expected a name at offset {pos}, found '{c}'")),
                None => self.error("expected a name at end of expression"),
            });
        }
        if self.chars.next_if(|(_, c)| *c == ':').is_none() {
            return Ok(NameTest::Name {
                namespace: None,
                name: first,
            });
        }
        let namespace = self.namespace_of(&first)?;
        if allow_wildcard && self.chars.next_if(|(_, c)| *c == '*').is_some() {
            return Ok(NameTest::Namespace(namespace));
        }
        let name = self.parse_ncname();
        if name.is_empty() {
            return Err(self.error(format!("missing local name after '{first}:'")));
        }
        Ok(NameTest::Name {
            namespace: Some(namespace),
            name,
        })
    }

    fn parse_predicate(&mut self) -> Result<Predicate> {
        self.skip_ws();
        let predicate = if self.chars.peek().is_some_and(|(_, c)| c.is_ascii_digit()) {
            let mut digits = String::new();
            while let Some((_, c)) = self.chars.next_if(|(_, c)| c.is_ascii_digit()) {
                digits.push(c);
            }
            let n: usize = digits
                .parse()
                .map_err(|_| self.error(format!("invalid position '{digits}'")))?;
            if n == 0 {
                return Err(self.error("positions start at 1"));
            }
            Predicate::Position(n)
        } else {
            let target = if self.chars.next_if(|(_, c)| *c == '.').is_some() {
                None
            } else {
                Some(self.parse_name_test(false)?)
            };
            self.skip_ws();
            self.expect('=')?;
            self.skip_ws();
            let value = self.parse_literal()?;
            Predicate::Equals { target, value }
        };
        self.skip_ws();
        self.expect(']')?;
        Ok(predicate)
    }

    fn parse_literal(&mut self) -> Result<String> {
        let quote = match self.chars.next() {
            Some((_, q @ ('\'' | '"'))) => q,
            _ => return Err(self.error("expected a quoted literal")),
        };
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => return Ok(value),
                Some((_, c)) => value.push(c),
                None => return Err(self.error("unterminated literal")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_support::example_schema;

    #[test]
    fn test_parse_steps_and_predicates() {
        let schema = example_schema();
        let query = Query::parse(
            &schema,
            "/if:interfaces/interface[name='eth0'][2]/if:*",
        )
        .unwrap();
        assert_eq!(query.steps.len(), 3);
        assert_eq!(query.steps[1].predicates.len(), 2);
        assert_eq!(
            query.steps[2].test,
            NameTest::Namespace("urn:example:interfaces".to_string())
        );
        assert!(!query.is_count());
    }

    #[test]
    fn test_parse_count_and_descendant() {
        let schema = example_schema();
        let query = Query::parse(&schema, "count(//rt:route)").unwrap();
        assert!(query.is_count());
        assert_eq!(query.steps[0].axis, Axis::Descendant);
    }

    #[test]
    fn test_parse_errors() {
        let schema = example_schema();
        for bad in [
            "/nope:interfaces",
            "/if:interfaces[",
            "/if:interfaces[name='x]",
            "count(/if:interfaces",
            "/if:interfaces[0]",
            "/",
            "/a/b extra",
        ] {
            let err = Query::parse(&schema, bad).unwrap_err();
            assert!(matches!(err, DeltaError::Query { .. }), "{bad}: {err}");
        }
    }
}
