//! The XPath evaluator.
//!
//! A two-phase evaluator: the optimizer pre-pass classifies predicates
//! (see [`crate::optimizer`]), then a recursive walk of the AST produces a
//! typed [`Value`]. Paths evaluate step by step against a candidate set;
//! predicates run once per candidate with that candidate's 1-based position
//! and the candidate set size installed as the context. Results of
//! context-independent, non-numeric predicates are computed once and held
//! in an LRU cache keyed by predicate id.

use xylem_dom::{Document, NodeId, NodeKind};
use xylem_util::literal;
use xylem_util::{LruCache, OrderedSet};

use crate::ast::{
    AbbrevStep, Expr, ExprId, ExprNode, FunctionCall, NameTest, NodeTest, Op, Path, PathSpec,
    Predicate, RetType, Step, TypeTest,
};
use crate::error::XPathError;
use crate::optimizer;
use crate::parser;

/// An insertion-ordered node set, sorted by document position before it is
/// returned to the caller.
pub type NodeSet = OrderedSet<NodeId>;

/// The four XPath 1.0 value types.
#[derive(Debug)]
pub enum Value {
    NodeSet(NodeSet),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::NodeSet(set) => !set.is_empty(),
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
        }
    }

    pub fn to_number(&self, doc: &Document) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::String(s) => literal::to_number(s),
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::NodeSet(set) => match set.first() {
                Some(&node) => doc.number_value(node),
                None => f64::NAN,
            },
        }
    }

    pub fn to_xpath_string(&self, doc: &Document) -> String {
        match self {
            Value::NodeSet(set) => set
                .first()
                .map(|&node| doc.string_value(node))
                .unwrap_or_default(),
            Value::String(s) => s.clone(),
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Number(n) => {
                if n.is_nan() {
                    "NaN".to_string()
                } else {
                    format!("{n:.6}")
                }
            }
        }
    }
}

/// A parsed expression ready for repeated evaluation.
pub struct Compiled {
    expr: String,
    ast: ExprNode,
}

pub fn compile(expr: &str) -> Result<Compiled, XPathError> {
    let ast = parser::parse(expr)?;
    log::debug!("compiled xpath expression `{expr}`");
    Ok(Compiled {
        expr: expr.to_string(),
        ast,
    })
}

impl Compiled {
    pub fn evaluate(&self, doc: &Document) -> Result<Value, XPathError> {
        let mut evaluator = Evaluator::new(doc, &self.expr);
        evaluator.eval(&self.ast)
    }

    /// The node-set result; non-node-set results yield an empty set.
    pub fn select(&self, doc: &Document) -> Result<NodeSet, XPathError> {
        match self.evaluate(doc)? {
            Value::NodeSet(set) => Ok(set),
            _ => Ok(NodeSet::new()),
        }
    }
}

/// Parses and evaluates an expression against a document.
pub fn evaluate(doc: &Document, expr: &str) -> Result<Value, XPathError> {
    compile(expr)?.evaluate(doc)
}

/// The node-set query surface: `xpath(document, expression) -> node_set`.
pub fn xpath(doc: &Document, expr: &str) -> Result<NodeSet, XPathError> {
    compile(expr)?.select(doc)
}

#[derive(Clone, Copy)]
struct Context {
    node: NodeId,
    pos: usize,
    size: usize,
}

struct Evaluator<'d> {
    doc: &'d Document,
    expr: String,
    ctx: Context,
    ctx_stack: Vec<Context>,
    cache: LruCache<ExprId, bool>,
}

impl<'d> Evaluator<'d> {
    fn new(doc: &'d Document, expr: &str) -> Self {
        Evaluator {
            doc,
            expr: expr.to_string(),
            ctx: Context {
                node: doc.root(),
                pos: 1,
                size: 1,
            },
            ctx_stack: Vec::new(),
            cache: LruCache::default(),
        }
    }

    fn eval_error(&self, cause: &str) -> XPathError {
        XPathError::Eval {
            expr: self.expr.clone(),
            cause: cause.to_string(),
        }
    }

    fn push_context(&mut self, node: NodeId, pos: usize, size: usize) {
        self.ctx_stack.push(self.ctx);
        self.ctx = Context { node, pos, size };
    }

    fn pop_context(&mut self) {
        self.ctx = self
            .ctx_stack
            .pop()
            .expect("context stack pops match pushes");
    }

    fn eval(&mut self, node: &ExprNode) -> Result<Value, XPathError> {
        match &node.expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Literal(s) => Ok(Value::String(s.clone())),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?.to_number(self.doc);
                Ok(Value::Number(match op {
                    Op::Minus => -value,
                    _ => value,
                }))
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Path(path) => Ok(Value::NodeSet(self.eval_path(path)?)),
            Expr::FunctionCall(call) => self.eval_function(call),
        }
    }

    fn eval_binary(
        &mut self,
        op: Op,
        left: &ExprNode,
        right: &ExprNode,
    ) -> Result<Value, XPathError> {
        match op {
            Op::And | Op::Or => {
                let l = self.eval(left)?.to_boolean();
                // short-circuit: the right operand is not evaluated when the
                // left already decides
                if op == Op::Or && l {
                    return Ok(Value::Boolean(true));
                }
                if op == Op::And && !l {
                    return Ok(Value::Boolean(false));
                }
                let r = self.eval(right)?.to_boolean();
                Ok(Value::Boolean(if op == Op::And { l && r } else { l || r }))
            }
            Op::Plus | Op::Minus | Op::Mul | Op::Div | Op::Mod => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                self.arithmetic(op, &l, &r)
            }
            Op::Union => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                Ok(self.union(l, r))
            }
            _ => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                Ok(Value::Boolean(self.compare(op, &l, &r)))
            }
        }
    }

    fn arithmetic(&self, op: Op, left: &Value, right: &Value) -> Result<Value, XPathError> {
        let l = left.to_number(self.doc);
        let r = right.to_number(self.doc);
        if l.is_nan() || r.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        let result = match op {
            Op::Plus => l + r,
            Op::Minus => l - r,
            Op::Mul => l * r,
            Op::Div => {
                if l == 0.0 || r == 0.0 {
                    return Err(self.eval_error("Division operation by Zero."));
                }
                l / r
            }
            Op::Mod => {
                if l == 0.0 || r == 0.0 {
                    return Err(self.eval_error("Modulus operation on Zero."));
                }
                ((l as i64) % (r as i64)) as f64
            }
            _ => unreachable!("arithmetic is only entered on arithmetic ops"),
        };
        Ok(Value::Number(result))
    }

    /// Union merges the right set into the left and restores document order
    /// when the merge actually added members. Non-node-set operands behave
    /// as empty sets.
    fn union(&self, left: Value, right: Value) -> Value {
        match (left, right) {
            (Value::NodeSet(mut l), Value::NodeSet(r)) => {
                if l.is_empty() {
                    return Value::NodeSet(r);
                }
                if r.is_empty() {
                    return Value::NodeSet(l);
                }
                let before = l.len();
                l.extend(&r);
                if l.len() != before {
                    let doc = self.doc;
                    l.sort_by_key(|&n| doc.position(n));
                }
                Value::NodeSet(l)
            }
            (Value::NodeSet(l), _) => Value::NodeSet(l),
            (_, Value::NodeSet(r)) => Value::NodeSet(r),
            _ => Value::NodeSet(NodeSet::new()),
        }
    }

    fn num_cmp(op: Op, a: f64, b: f64) -> bool {
        match op {
            Op::Eq => a == b,
            Op::Neq => a != b,
            Op::Lt => a < b,
            Op::Leq => a <= b,
            Op::Gt => a > b,
            Op::Geq => a >= b,
            _ => false,
        }
    }

    fn str_cmp(op: Op, a: &str, b: &str) -> bool {
        match op {
            Op::Eq => a == b,
            _ => a != b,
        }
    }

    /// The XPath 1.0 comparison semantics over (left type, right type, op).
    fn compare(&self, op: Op, left: &Value, right: &Value) -> bool {
        use Value::*;
        let doc = self.doc;
        let equality = matches!(op, Op::Eq | Op::Neq);
        match (left, right) {
            (NodeSet(l), NodeSet(r)) => {
                // true iff some pair of nodes satisfies the comparison
                for &a in l.iter() {
                    for &b in r.iter() {
                        let hit = if equality {
                            Self::str_cmp(op, &doc.string_value(a), &doc.string_value(b))
                        } else {
                            Self::num_cmp(op, doc.number_value(a), doc.number_value(b))
                        };
                        if hit {
                            return true;
                        }
                    }
                }
                false
            }
            (NodeSet(l), String(s)) => {
                if equality {
                    l.iter().any(|&a| Self::str_cmp(op, &doc.string_value(a), s))
                } else {
                    let rn = literal::to_number(s);
                    l.iter().any(|&a| Self::num_cmp(op, doc.number_value(a), rn))
                }
            }
            (String(s), NodeSet(r)) => {
                if equality {
                    r.iter().any(|&b| Self::str_cmp(op, s, &doc.string_value(b)))
                } else {
                    let ln = literal::to_number(s);
                    r.iter().any(|&b| Self::num_cmp(op, ln, doc.number_value(b)))
                }
            }
            (NodeSet(l), Number(n)) => {
                l.iter().any(|&a| Self::num_cmp(op, doc.number_value(a), *n))
            }
            (Number(n), NodeSet(r)) => {
                r.iter().any(|&b| Self::num_cmp(op, *n, doc.number_value(b)))
            }
            (NodeSet(_), Boolean(b)) => {
                if equality {
                    Self::num_cmp(
                        op,
                        if left.to_boolean() { 1.0 } else { 0.0 },
                        if *b { 1.0 } else { 0.0 },
                    )
                } else {
                    Self::num_cmp(op, left.to_number(doc), if *b { 1.0 } else { 0.0 })
                }
            }
            (Boolean(b), NodeSet(_)) => {
                if equality {
                    Self::num_cmp(
                        op,
                        if *b { 1.0 } else { 0.0 },
                        if right.to_boolean() { 1.0 } else { 0.0 },
                    )
                } else {
                    Self::num_cmp(op, if *b { 1.0 } else { 0.0 }, right.to_number(doc))
                }
            }
            _ => {
                if equality {
                    if matches!(left, Boolean(_)) || matches!(right, Boolean(_)) {
                        Self::num_cmp(
                            op,
                            if left.to_boolean() { 1.0 } else { 0.0 },
                            if right.to_boolean() { 1.0 } else { 0.0 },
                        )
                    } else if matches!(left, Number(_)) || matches!(right, Number(_)) {
                        Self::num_cmp(op, left.to_number(doc), right.to_number(doc))
                    } else {
                        Self::str_cmp(
                            op,
                            &left.to_xpath_string(doc),
                            &right.to_xpath_string(doc),
                        )
                    }
                } else {
                    Self::num_cmp(op, left.to_number(doc), right.to_number(doc))
                }
            }
        }
    }

    // ---- paths ----

    fn eval_path(&mut self, path: &Path) -> Result<NodeSet, XPathError> {
        let absolute = path
            .steps
            .first()
            .is_some_and(|s| s.path_spec != PathSpec::None);
        let mut current = if absolute {
            vec![self.doc.root()]
        } else {
            vec![self.ctx.node]
        };
        for step in &path.steps {
            current = self.eval_step(step, &current)?;
        }
        Ok(current.into_iter().collect())
    }

    fn eval_step(&mut self, step: &Step, input: &[NodeId]) -> Result<Vec<NodeId>, XPathError> {
        let mut candidates: NodeSet = NodeSet::new();
        for &node in input {
            match step.abbrev {
                AbbrevStep::SelfNode => {
                    candidates.add(node);
                }
                AbbrevStep::Parent => {
                    if let Some(parent) = self.doc.parent(node) {
                        candidates.add(parent);
                    }
                }
                AbbrevStep::None => {
                    if step.has_attr_axis {
                        for attr in self.doc.attributes(node) {
                            candidates.add(attr);
                        }
                    } else if step.path_spec == PathSpec::DoubleSlash {
                        for descendant in self.doc.descendants(node) {
                            candidates.add(descendant);
                        }
                    } else {
                        for &child in self.doc.children(node) {
                            candidates.add(child);
                        }
                    }
                }
            }
        }
        let mut result: Vec<NodeId> = candidates
            .iter()
            .copied()
            .filter(|&n| self.matches_test(step, n))
            .collect();
        for pred in &step.predicates {
            result = self.apply_predicate(pred, result)?;
        }
        Ok(result)
    }

    fn matches_test(&self, step: &Step, node: NodeId) -> bool {
        let Some(test) = &step.node_test else {
            // abbreviated steps carry no test
            return true;
        };
        let doc = self.doc;
        match test {
            NodeTest::Kind(kind) => match kind {
                TypeTest::Node => true,
                TypeTest::Text => doc.kind(node) == NodeKind::Text,
                TypeTest::Comment => doc.kind(node) == NodeKind::Comment,
                TypeTest::Pi(target) => {
                    doc.kind(node) == NodeKind::ProcessingInstruction
                        && target
                            .as_deref()
                            .is_none_or(|t| doc.name(node) == Some(t))
                }
            },
            NodeTest::Name(name_test) => {
                let wanted_kind = if step.has_attr_axis {
                    NodeKind::Attribute
                } else {
                    NodeKind::Element
                };
                if doc.kind(node) != wanted_kind {
                    return false;
                }
                match name_test {
                    NameTest::Wildcard => true,
                    NameTest::Name(name) => doc.name(node) == Some(name.as_str()),
                    NameTest::WildcardLocal(local) => {
                        doc.local_name(node) == Some(local.as_str())
                    }
                    NameTest::PrefixWildcard(prefix) => {
                        doc.prefix(node) == Some(prefix.as_str())
                    }
                    NameTest::PrefixName { prefix, local } => {
                        doc.prefix(node) == Some(prefix.as_str())
                            && doc.local_name(node) == Some(local.as_str())
                    }
                }
            }
        }
    }

    /// Runs one predicate over the candidate set. A number result matches
    /// the candidate whose 1-based position equals it; everything else
    /// coerces to boolean. Context-independent, non-numeric predicates
    /// evaluate once and the boolean is reused through the cache.
    fn apply_predicate(
        &mut self,
        pred: &Predicate,
        input: Vec<NodeId>,
    ) -> Result<Vec<NodeId>, XPathError> {
        if let Some(ret) = optimizer::classify(&pred.expr) {
            if ret != RetType::Number {
                let cached = self.cache.get(&pred.id).copied();
                let keep = match cached {
                    Some(cached) => cached,
                    None => {
                        let keep = self.eval(&pred.expr)?.to_boolean();
                        self.cache.put(pred.id, keep);
                        keep
                    }
                };
                return Ok(if keep { input } else { Vec::new() });
            }
        }
        let size = input.len();
        let mut kept = Vec::new();
        for (i, &node) in input.iter().enumerate() {
            self.push_context(node, i + 1, size);
            let value = self.eval(&pred.expr);
            self.pop_context();
            let keep = match value? {
                Value::Number(n) => (i + 1) as f64 == n,
                other => other.to_boolean(),
            };
            if keep {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    // ---- function library ----

    fn eval_function(&mut self, call: &FunctionCall) -> Result<Value, XPathError> {
        match call.name.as_str() {
            "boolean" => {
                let v = self.eval(&call.args[0])?;
                Ok(Value::Boolean(v.to_boolean()))
            }
            "ceiling" => self.numeric_fn(call, f64::ceil),
            "floor" => self.numeric_fn(call, f64::floor),
            "round" => self.numeric_fn(call, |n| {
                if (-0.5..0.0).contains(&n) {
                    0.0
                } else {
                    n.round()
                }
            }),
            "concat" => {
                let mut out = String::new();
                for arg in &call.args {
                    let v = self.eval(arg)?;
                    out.push_str(&v.to_xpath_string(self.doc));
                }
                Ok(Value::String(out))
            }
            "contains" => {
                let haystack = self.string_arg(&call.args[0])?;
                let needle = self.string_arg(&call.args[1])?;
                Ok(Value::Boolean(haystack.contains(&needle)))
            }
            "starts-with" => {
                let haystack = self.string_arg(&call.args[0])?;
                let needle = self.string_arg(&call.args[1])?;
                Ok(Value::Boolean(haystack.starts_with(&needle)))
            }
            "count" => {
                let v = self.eval(&call.args[0])?;
                Ok(Value::Number(match v {
                    Value::NodeSet(set) => set.len() as f64,
                    _ => f64::NAN,
                }))
            }
            "false" => Ok(Value::Boolean(false)),
            "true" => Ok(Value::Boolean(true)),
            "not" => {
                let v = self.eval(&call.args[0])?;
                Ok(Value::Boolean(!v.to_boolean()))
            }
            "lang" => {
                let wanted = self.string_arg(&call.args[0])?.to_lowercase();
                Ok(Value::Boolean(self.context_lang_matches(&wanted)))
            }
            "last" => Ok(Value::Number(self.ctx.size as f64)),
            "position" => Ok(Value::Number(self.ctx.pos as f64)),
            "local-name" => self.name_fn(call, |doc, node| {
                doc.local_name(node).unwrap_or_default().to_string()
            }),
            "name" => self.name_fn(call, |doc, node| {
                doc.name(node).unwrap_or_default().to_string()
            }),
            "namespace-uri" => self.name_fn(call, |doc, node| {
                doc.bound_namespace(node)
                    .and_then(|ns| doc.namespace_uri(ns))
                    .unwrap_or_default()
                    .to_string()
            }),
            "number" => {
                if call.args.is_empty() {
                    Ok(Value::Number(self.doc.number_value(self.ctx.node)))
                } else {
                    let v = self.eval(&call.args[0])?;
                    Ok(Value::Number(v.to_number(self.doc)))
                }
            }
            "string" => {
                if call.args.is_empty() {
                    Ok(Value::String(self.doc.string_value(self.ctx.node)))
                } else {
                    let v = self.eval(&call.args[0])?;
                    Ok(Value::String(v.to_xpath_string(self.doc)))
                }
            }
            "string-length" => {
                let s = if call.args.is_empty() {
                    self.doc.string_value(self.ctx.node)
                } else {
                    self.string_arg(&call.args[0])?
                };
                Ok(Value::Number(s.chars().count() as f64))
            }
            "sum" => {
                let v = self.eval(&call.args[0])?;
                let Value::NodeSet(set) = v else {
                    return Ok(Value::Number(f64::NAN));
                };
                let mut total = 0.0;
                for &node in set.iter() {
                    let n = self.doc.number_value(node);
                    if n.is_nan() {
                        return Ok(Value::Number(f64::NAN));
                    }
                    total += n;
                }
                Ok(Value::Number(total))
            }
            other => Err(self.eval_error(&format!("Unknown function `{other}`."))),
        }
    }

    fn string_arg(&mut self, arg: &ExprNode) -> Result<String, XPathError> {
        let v = self.eval(arg)?;
        Ok(v.to_xpath_string(self.doc))
    }

    fn numeric_fn(
        &mut self,
        call: &FunctionCall,
        f: impl Fn(f64) -> f64,
    ) -> Result<Value, XPathError> {
        let n = self.eval(&call.args[0])?.to_number(self.doc);
        Ok(Value::Number(if n.is_nan() { n } else { f(n) }))
    }

    fn name_fn(
        &mut self,
        call: &FunctionCall,
        get: impl Fn(&Document, NodeId) -> String,
    ) -> Result<Value, XPathError> {
        if call.args.is_empty() {
            return Ok(Value::String(get(self.doc, self.ctx.node)));
        }
        let v = self.eval(&call.args[0])?;
        Ok(Value::String(match v {
            Value::NodeSet(set) => set
                .first()
                .map(|&node| get(self.doc, node))
                .unwrap_or_default(),
            _ => String::new(),
        }))
    }

    /// `lang()`: finds the nearest `xml:lang` on the context element or its
    /// element ancestors; matches the language exactly or as a prefix
    /// followed by `-`.
    fn context_lang_matches(&self, wanted: &str) -> bool {
        let doc = self.doc;
        if doc.kind(self.ctx.node) != NodeKind::Element {
            return false;
        }
        let mut node = self.ctx.node;
        loop {
            if let Some(attr) = doc.attribute(node, "xml:lang") {
                let lang = doc.value(attr).unwrap_or_default().to_lowercase();
                return lang.starts_with(wanted)
                    && (lang.len() == wanted.len() || lang.as_bytes()[wanted.len()] == b'-');
            }
            match doc.parent(node) {
                Some(parent) if doc.kind(parent) == NodeKind::Element => node = parent,
                _ => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xylem_dom::Document;

    fn names(doc: &Document, set: &NodeSet) -> Vec<String> {
        set.iter()
            .map(|&n| doc.name(n).unwrap_or("").to_string())
            .collect()
    }

    #[test]
    fn selects_descendants_by_name() {
        let doc = Document::parse_str("<bar><ball>A</ball><ball a=\"abcd\">B</ball></bar>").unwrap();
        let set = xpath(&doc, "//ball").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(doc.string_value(*set.get(1).unwrap()), "B");
    }

    #[test]
    fn union_results_come_back_in_document_order() {
        let doc = Document::parse_str("<r><a/><b/><c/></r>").unwrap();
        let set = xpath(&doc, "//c | //a").unwrap();
        assert_eq!(names(&doc, &set), vec!["a", "c"]);
    }

    #[test]
    fn union_of_non_nodesets_is_empty() {
        let doc = Document::parse_str("<r/>").unwrap();
        let set = xpath(&doc, "1 | 2").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn last_predicate_selects_the_final_candidate() {
        let doc = Document::parse_str("<r><x i=\"1\"/><x i=\"2\"/><x i=\"3\"/></r>").unwrap();
        let set = xpath(&doc, "//x[last()]").unwrap();
        assert_eq!(set.len(), 1);
        let attr = doc.attribute(*set.first().unwrap(), "i").unwrap();
        assert_eq!(doc.value(attr), Some("3"));
    }

    #[test]
    fn numeric_predicate_matches_position() {
        let doc = Document::parse_str("<r><x i=\"1\"/><x i=\"2\"/><x i=\"3\"/></r>").unwrap();
        let set = xpath(&doc, "/r/x[2]").unwrap();
        assert_eq!(set.len(), 1);
        let attr = doc.attribute(*set.first().unwrap(), "i").unwrap();
        assert_eq!(doc.value(attr), Some("2"));
    }

    #[test]
    fn attribute_axis_and_value_comparison() {
        let doc = Document::parse_str("<bar><ball>A</ball><ball a=\"abcd\">B</ball></bar>").unwrap();
        let set = xpath(&doc, "//ball[@a='abcd']").unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(doc.string_value(*set.first().unwrap()), "B");
        let attrs = xpath(&doc, "//ball/@a").unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(doc.value(*attrs.first().unwrap()), Some("abcd"));
    }

    #[test]
    fn parent_and_self_steps() {
        let doc = Document::parse_str("<r><a><b/></a></r>").unwrap();
        let set = xpath(&doc, "//b/..").unwrap();
        assert_eq!(names(&doc, &set), vec!["a"]);
        let set = xpath(&doc, "//a/.").unwrap();
        assert_eq!(names(&doc, &set), vec!["a"]);
    }

    #[test]
    fn lone_slash_selects_the_root() {
        let doc = Document::parse_str("<r/>").unwrap();
        let set = xpath(&doc, "/").unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(*set.first().unwrap(), doc.root());
    }

    #[test]
    fn kind_tests_select_text_comments_and_pis() {
        let doc =
            Document::parse_str("<r>t<!--c--><?p v?><![CDATA[d]]></r>").unwrap();
        assert_eq!(xpath(&doc, "//text()").unwrap().len(), 2); // text + cdata
        assert_eq!(xpath(&doc, "//comment()").unwrap().len(), 1);
        assert_eq!(xpath(&doc, "//processing-instruction()").unwrap().len(), 1);
        assert_eq!(xpath(&doc, "//processing-instruction('p')").unwrap().len(), 1);
        assert_eq!(xpath(&doc, "//processing-instruction('q')").unwrap().len(), 0);
        assert_eq!(xpath(&doc, "/r/node()").unwrap().len(), 4);
    }

    #[test]
    fn namespace_name_tests() {
        let doc =
            Document::parse_str("<r xmlns:x=\"u\"><x:a/><a/><x:b/></r>").unwrap();
        assert_eq!(xpath(&doc, "//x:a").unwrap().len(), 1);
        assert_eq!(xpath(&doc, "//x:*").unwrap().len(), 2);
        assert_eq!(xpath(&doc, "//*:a").unwrap().len(), 2);
        assert_eq!(xpath(&doc, "//a").unwrap().len(), 1);
        assert_eq!(xpath(&doc, "//*").unwrap().len(), 4);
    }

    #[test]
    fn result_sets_are_strictly_increasing_in_document_position() {
        let doc = Document::parse_str(
            "<r><a><b/></a><b/><a><b/><b/></a></r>",
        )
        .unwrap();
        let set = xpath(&doc, "//b | //a").unwrap();
        let positions: Vec<u32> = set.iter().map(|&n| doc.position(n)).collect();
        for pair in positions.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn string_and_number_coercions() {
        let doc = Document::parse_str("<r><n>4</n><n>6</n></r>").unwrap();
        let v = evaluate(&doc, "sum(//n)").unwrap();
        assert_eq!(v.to_number(&doc), 10.0);
        let v = evaluate(&doc, "string(//n)").unwrap();
        assert_eq!(v.to_xpath_string(&doc), "4");
        let v = evaluate(&doc, "count(//n) = 2").unwrap();
        assert!(v.to_boolean());
        let v = evaluate(&doc, "//n + 1").unwrap();
        assert_eq!(v.to_number(&doc), 5.0);
    }

    #[test]
    fn nan_text_makes_sums_nan() {
        let doc = Document::parse_str("<r><n>4</n><n>duck</n></r>").unwrap();
        let v = evaluate(&doc, "sum(//n)").unwrap();
        assert!(v.to_number(&doc).is_nan());
    }

    #[test]
    fn zero_division_and_modulus_error() {
        let doc = Document::parse_str("<r/>").unwrap();
        assert!(matches!(
            evaluate(&doc, "1 div 0"),
            Err(XPathError::Eval { .. })
        ));
        assert!(matches!(
            evaluate(&doc, "4 mod 0"),
            Err(XPathError::Eval { .. })
        ));
    }

    #[test]
    fn short_circuit_skips_the_failing_side() {
        let doc = Document::parse_str("<r/>").unwrap();
        // 1 div 0 would be fatal; the left operand decides first
        let v = evaluate(&doc, "true() or 1 div 0").unwrap();
        assert!(v.to_boolean());
        let v = evaluate(&doc, "false() and 1 div 0").unwrap();
        assert!(!v.to_boolean());
    }

    #[test]
    fn string_functions() {
        let doc = Document::parse_str("<r><w>hello</w></r>").unwrap();
        assert!(evaluate(&doc, "contains(//w, 'ell')").unwrap().to_boolean());
        assert!(evaluate(&doc, "starts-with(//w, 'he')").unwrap().to_boolean());
        assert_eq!(
            evaluate(&doc, "concat('a', 'b', 'c')").unwrap().to_xpath_string(&doc),
            "abc"
        );
        assert_eq!(
            evaluate(&doc, "string-length(//w)").unwrap().to_number(&doc),
            5.0
        );
    }

    #[test]
    fn name_functions() {
        let doc = Document::parse_str("<r xmlns:x=\"u\"><x:a k=\"1\"/></r>").unwrap();
        assert_eq!(
            evaluate(&doc, "name(//x:a)").unwrap().to_xpath_string(&doc),
            "x:a"
        );
        assert_eq!(
            evaluate(&doc, "local-name(//x:a)").unwrap().to_xpath_string(&doc),
            "a"
        );
        assert_eq!(
            evaluate(&doc, "namespace-uri(//x:a)").unwrap().to_xpath_string(&doc),
            "u"
        );
    }

    #[test]
    fn lang_matches_ancestor_declaration() {
        let doc =
            Document::parse_str("<r xml:lang=\"en\"><p><q/></p></r>").unwrap();
        let set = xpath(&doc, "//q[lang('en')]").unwrap();
        assert_eq!(set.len(), 1);
        let set = xpath(&doc, "//q[lang('de')]").unwrap();
        assert!(set.is_empty());
        // en matches en-GB but not the reverse
        let doc = Document::parse_str("<r xml:lang=\"en-GB\"><p/></r>").unwrap();
        assert_eq!(xpath(&doc, "//p[lang('en')]").unwrap().len(), 1);
        assert_eq!(xpath(&doc, "//p[lang('en-US')]").unwrap().len(), 0);
    }

    #[test]
    fn rounding_family() {
        let doc = Document::parse_str("<r/>").unwrap();
        assert_eq!(evaluate(&doc, "floor(2.7)").unwrap().to_number(&doc), 2.0);
        assert_eq!(evaluate(&doc, "ceiling(2.1)").unwrap().to_number(&doc), 3.0);
        assert_eq!(evaluate(&doc, "round(2.5)").unwrap().to_number(&doc), 3.0);
        assert_eq!(evaluate(&doc, "round(-0.4)").unwrap().to_number(&doc), 0.0);
        assert!(evaluate(&doc, "round(//missing)").unwrap().to_number(&doc).is_nan());
    }

    #[test]
    fn number_to_string_uses_fixed_notation() {
        let doc = Document::parse_str("<r/>").unwrap();
        assert_eq!(
            evaluate(&doc, "string(3)").unwrap().to_xpath_string(&doc),
            "3.000000"
        );
        assert_eq!(
            evaluate(&doc, "string(0 div 1)").is_err(),
            true // division by zero errors even with a zero numerator
        );
    }

    #[test]
    fn context_independent_predicate_filters_all_or_nothing() {
        let doc = Document::parse_str("<r><a><k/></a><b><k/></b></r>").unwrap();
        // //a exists, so every candidate passes
        let set = xpath(&doc, "//k[//a]").unwrap();
        assert_eq!(set.len(), 2);
        // //missing is empty, so nothing passes
        let set = xpath(&doc, "//k[//missing]").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn nodeset_comparisons() {
        let doc = Document::parse_str(
            "<r><p><v>1</v><v>5</v></p><q><v>5</v><v>9</v></q></r>",
        )
        .unwrap();
        assert!(evaluate(&doc, "/r/p/v = /r/q/v").unwrap().to_boolean());
        assert!(evaluate(&doc, "/r/p/v < /r/q/v").unwrap().to_boolean());
        assert!(evaluate(&doc, "//v = 9").unwrap().to_boolean());
        assert!(evaluate(&doc, "//v != 9").unwrap().to_boolean());
        assert!(!evaluate(&doc, "//v = 7").unwrap().to_boolean());
        assert!(evaluate(&doc, "//p = true()").unwrap().to_boolean());
    }

    #[test]
    fn boolean_comparison_has_highest_coercion_priority() {
        let doc = Document::parse_str("<r/>").unwrap();
        assert!(evaluate(&doc, "'x' = true()").unwrap().to_boolean());
        assert!(evaluate(&doc, "1 = true()").unwrap().to_boolean());
        assert!(evaluate(&doc, "'' = false()").unwrap().to_boolean());
    }

    #[test]
    fn compiled_expressions_can_be_reused() {
        let compiled = compile("//x").unwrap();
        let doc1 = Document::parse_str("<r><x/></r>").unwrap();
        let doc2 = Document::parse_str("<r><x/><x/></r>").unwrap();
        assert_eq!(compiled.select(&doc1).unwrap().len(), 1);
        assert_eq!(compiled.select(&doc2).unwrap().len(), 2);
    }
}
