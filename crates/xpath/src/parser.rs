//! The Pratt expression parser.
//!
//! Each token kind carries a binding power; `expression(rbp)` parses a
//! prefix form and then folds infix operators while their power exceeds
//! `rbp`. Paths are parsed by the location-path productions, which also
//! resolve the ambiguity between function calls and name steps: a name is
//! only a call when a `(` follows it.

use crate::ast::{
    AbbrevStep, Expr, ExprId, ExprNode, FunctionCall, NameTest, NodeTest, Op, Path, PathSpec,
    Predicate, Step, TypeTest,
};
use crate::error::XPathError;
use crate::functions::{self, FnLookupError};
use crate::lexer::{XpLexer, XpToken, XpTokenKind};

fn binding_power(kind: XpTokenKind) -> u8 {
    use XpTokenKind::*;
    match kind {
        Or => 20,
        And => 30,
        LessThan | GreaterThan | Equal | LessThanEqual | GreaterThanEqual | NotEqual => 40,
        Plus | Minus => 50,
        Star | Div | Mod => 60,
        Pipe => 70,
        Slash | DoubleSlash => 80,
        LeftBracket => 90,
        Name => 110,
        _ => 0,
    }
}

fn token_op(kind: XpTokenKind) -> Option<Op> {
    use XpTokenKind::*;
    Some(match kind {
        Plus => Op::Plus,
        Minus => Op::Minus,
        Star => Op::Mul,
        Div => Op::Div,
        Mod => Op::Mod,
        Equal => Op::Eq,
        NotEqual => Op::Neq,
        LessThan => Op::Lt,
        LessThanEqual => Op::Leq,
        GreaterThan => Op::Gt,
        GreaterThanEqual => Op::Geq,
        And => Op::And,
        Or => Op::Or,
        Pipe => Op::Union,
        _ => return None,
    })
}

pub(crate) struct XpParser<'e> {
    lexer: XpLexer<'e>,
    current: XpToken<'e>,
    prev: XpToken<'e>,
    from_predicate: bool,
    next_id: ExprId,
}

/// Compiles an expression string into its AST.
pub fn parse(expr: &str) -> Result<ExprNode, XPathError> {
    let mut parser = XpParser {
        lexer: XpLexer::new(expr),
        current: XpToken::end(),
        prev: XpToken::end(),
        from_predicate: false,
        next_id: 0,
    };
    parser.advance()?;
    let node = parser.expression(0)?;
    if parser.current.kind != XpTokenKind::End {
        return Err(parser.error_at_current("Token found at unexpected position."));
    }
    Ok(node)
}

impl<'e> XpParser<'e> {
    fn node(&mut self, expr: Expr) -> ExprNode {
        let id = self.next_id;
        self.next_id += 1;
        ExprNode { id, expr }
    }

    fn next_id(&mut self) -> ExprId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn advance(&mut self) -> Result<(), XPathError> {
        let token = self.lexer.get_token()?;
        self.prev = std::mem::replace(&mut self.current, token);
        Ok(())
    }

    fn consume(&mut self, kind: XpTokenKind) -> Result<(), XPathError> {
        if self.current.kind == kind {
            self.advance()
        } else {
            Err(self.error_at_current("Unexpected token."))
        }
    }

    fn error_at(&self, token: &XpToken<'_>, message: &str) -> XPathError {
        XPathError::Syntax {
            expr: self.lexer.expr().to_string(),
            token: token.text.to_string(),
            line: token.line,
            column: token.column,
            message: message.to_string(),
        }
    }

    fn error_at_current(&self, message: &str) -> XPathError {
        self.error_at(&self.current, message)
    }

    fn expression(&mut self, rbp: u8) -> Result<ExprNode, XPathError> {
        let mut left = self.prefix()?;
        while rbp < binding_power(self.current.kind) {
            left = self.infix(left)?;
        }
        Ok(left)
    }

    fn prefix(&mut self) -> Result<ExprNode, XPathError> {
        use XpTokenKind::*;
        match self.current.kind {
            Name | And | Or | Mod | Div => self.function_call(),
            Slash | DoubleSlash => self.absolute_location_path(),
            At | Dot | DoubleDot | Star | TextTest | NodeTest | CommentTest | PiTest => {
                self.relative_location_path()
            }
            LeftParen => self.group(),
            Number => self.number(),
            Literal => self.literal(),
            Plus | Minus => self.unary(),
            _ => Err(self.error_at_current("Token found at unexpected position.")),
        }
    }

    fn infix(&mut self, left: ExprNode) -> Result<ExprNode, XPathError> {
        if token_op(self.current.kind).is_some() {
            self.binary(left)
        } else {
            Err(self.error_at_current("Token found at unexpected position."))
        }
    }

    fn number(&mut self) -> Result<ExprNode, XPathError> {
        let value = xylem_util::literal::to_number(self.current.text);
        self.consume(XpTokenKind::Number)?;
        Ok(self.node(Expr::Number(value)))
    }

    fn literal(&mut self) -> Result<ExprNode, XPathError> {
        let text = self.current.text;
        let value = text[1..text.len() - 1].to_string();
        self.consume(XpTokenKind::Literal)?;
        Ok(self.node(Expr::Literal(value)))
    }

    fn group(&mut self) -> Result<ExprNode, XPathError> {
        self.consume(XpTokenKind::LeftParen)?;
        let inner = self.expression(0)?;
        self.consume(XpTokenKind::RightParen)?;
        Ok(inner)
    }

    fn unary(&mut self) -> Result<ExprNode, XPathError> {
        let kind = self.current.kind;
        let op = token_op(kind).expect("unary is only entered on + or -");
        self.consume(kind)?;
        let operand = self.expression(binding_power(kind) << 1)?;
        Ok(self.node(Expr::Unary {
            op,
            operand: Box::new(operand),
        }))
    }

    fn binary(&mut self, left: ExprNode) -> Result<ExprNode, XPathError> {
        let kind = self.current.kind;
        let op = token_op(kind).expect("infix is only entered on operators");
        self.consume(kind)?;
        let right = self.expression(binding_power(kind))?;
        Ok(self.node(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }))
    }

    // FunctionCall ::= FunctionName '(' ( Argument ( ',' Argument )* )? ')'
    fn function_call(&mut self) -> Result<ExprNode, XPathError> {
        let name_token = self.current.clone();
        // `and`, `or`, `div` and `mod` double as ordinary names here
        if self.current.kind.is_keyword_op() {
            self.current.kind = XpTokenKind::Name;
        }
        self.consume(XpTokenKind::Name)?;
        if self.current.kind != XpTokenKind::LeftParen {
            return self.relative_location_path();
        }
        self.consume(XpTokenKind::LeftParen)?;
        let mut args = Vec::new();
        if self.current.kind != XpTokenKind::RightParen {
            args.push(self.expression(0)?);
            while self.current.kind == XpTokenKind::Comma {
                self.consume(XpTokenKind::Comma)?;
                args.push(self.expression(0)?);
            }
        }
        self.consume(XpTokenKind::RightParen)?;

        let name = name_token.text.to_string();
        let (index, ret) = match functions::lookup(&name, args.len()) {
            Ok(found) => found,
            Err(FnLookupError::NotFound) => {
                return Err(XPathError::UnknownFunction {
                    name,
                    line: name_token.line,
                    column: name_token.column,
                });
            }
            Err(FnLookupError::Arity { expected }) => {
                return Err(XPathError::WrongArity {
                    name,
                    expected,
                    got: args.len(),
                    line: name_token.line,
                    column: name_token.column,
                });
            }
        };
        Ok(self.node(Expr::FunctionCall(FunctionCall {
            name,
            args,
            index,
            ret,
        })))
    }

    // Predicate ::= '[' Expr ']'
    fn predicate(&mut self) -> Result<Predicate, XPathError> {
        self.consume(XpTokenKind::LeftBracket)?;
        self.from_predicate = true;
        let expr = self.expression(0)?;
        self.from_predicate = false;
        self.consume(XpTokenKind::RightBracket)?;
        Ok(Predicate {
            id: self.next_id(),
            expr,
        })
    }

    fn name_test(&mut self, tok: &XpToken<'_>) -> Result<NameTest, XPathError> {
        if tok.kind == XpTokenKind::Star {
            if self.current.kind == XpTokenKind::Colon {
                // *:nm
                self.consume(XpTokenKind::Colon)?;
                self.consume(XpTokenKind::Name)?;
                Ok(NameTest::WildcardLocal(self.prev.text.to_string()))
            } else {
                Ok(NameTest::Wildcard)
            }
        } else if self.current.kind == XpTokenKind::Colon {
            self.consume(XpTokenKind::Colon)?;
            if self.current.kind == XpTokenKind::Star {
                // pf:*
                self.consume(XpTokenKind::Star)?;
                Ok(NameTest::PrefixWildcard(tok.text.to_string()))
            } else if self.current.kind == XpTokenKind::Name
                || self.current.kind.is_keyword_op()
            {
                // pf:nm
                let kind = self.current.kind;
                self.consume(kind)?;
                Ok(NameTest::PrefixName {
                    prefix: tok.text.to_string(),
                    local: self.prev.text.to_string(),
                })
            } else {
                Err(self.error_at_current("Expected node test."))
            }
        } else {
            Ok(NameTest::Name(tok.text.to_string()))
        }
    }

    fn type_test(&mut self) -> Result<TypeTest, XPathError> {
        if self.current.kind == XpTokenKind::PiTest {
            self.advance()?;
            self.consume(XpTokenKind::LeftParen)?;
            let target = if self.current.kind == XpTokenKind::Literal {
                let text = self.current.text;
                let target = text[1..text.len() - 1].to_string();
                self.advance()?;
                Some(target)
            } else {
                None
            };
            self.consume(XpTokenKind::RightParen)?;
            return Ok(TypeTest::Pi(target));
        }
        let test = match self.current.kind {
            XpTokenKind::TextTest => TypeTest::Text,
            XpTokenKind::CommentTest => TypeTest::Comment,
            _ => TypeTest::Node,
        };
        self.advance()?;
        self.consume(XpTokenKind::LeftParen)?;
        self.consume(XpTokenKind::RightParen)?;
        Ok(test)
    }

    fn node_test(&mut self) -> Result<NodeTest, XPathError> {
        // falling out of a would-be function call leaves the name behind
        if self.prev.kind == XpTokenKind::Name {
            let tok = self.prev.clone();
            return Ok(NodeTest::Name(self.name_test(&tok)?));
        }
        if self.current.kind == XpTokenKind::Name
            || self.current.kind == XpTokenKind::Star
            || self.current.kind.is_keyword_op()
        {
            let kind = self.current.kind;
            self.consume(kind)?;
            let tok = self.prev.clone();
            return Ok(NodeTest::Name(self.name_test(&tok)?));
        }
        if matches!(
            self.current.kind,
            XpTokenKind::NodeTest
                | XpTokenKind::CommentTest
                | XpTokenKind::TextTest
                | XpTokenKind::PiTest
        ) {
            return Ok(NodeTest::Kind(self.type_test()?));
        }
        let token = if self.current.text.is_empty() {
            self.prev.clone()
        } else {
            self.current.clone()
        };
        Err(self.error_at(&token, "Expected node test."))
    }

    fn path_spec_of(kind: XpTokenKind) -> PathSpec {
        match kind {
            XpTokenKind::Slash => PathSpec::Slash,
            XpTokenKind::DoubleSlash => PathSpec::DoubleSlash,
            _ => PathSpec::None,
        }
    }

    // Step ::= '@'? NodeTest Predicate* | ('.' | '..')
    fn step(&mut self) -> Result<Step, XPathError> {
        let mut step = Step {
            path_spec: Self::path_spec_of(self.prev.kind),
            has_attr_axis: false,
            abbrev: AbbrevStep::None,
            node_test: None,
            predicates: Vec::new(),
        };
        if matches!(self.current.kind, XpTokenKind::Dot | XpTokenKind::DoubleDot) {
            step.abbrev = if self.current.kind == XpTokenKind::Dot {
                AbbrevStep::SelfNode
            } else {
                AbbrevStep::Parent
            };
            let kind = self.current.kind;
            self.consume(kind)?;
        } else {
            if self.current.kind == XpTokenKind::At {
                self.consume(XpTokenKind::At)?;
                step.has_attr_axis = true;
            }
            step.node_test = Some(self.node_test()?);
            while self.current.kind == XpTokenKind::LeftBracket {
                step.predicates.push(self.predicate()?);
            }
        }
        Ok(step)
    }

    // RelativeLocationPath ::= Step | RelativeLocationPath ('/' | '//') Step
    fn relative_location_path(&mut self) -> Result<ExprNode, XPathError> {
        let mut path = Path {
            from_predicate: self.from_predicate,
            steps: Vec::new(),
        };
        path.steps.push(self.step()?);
        while matches!(
            self.current.kind,
            XpTokenKind::Slash | XpTokenKind::DoubleSlash
        ) {
            let kind = self.current.kind;
            self.consume(kind)?;
            path.steps.push(self.step()?);
        }
        Ok(self.node(Expr::Path(path)))
    }

    // AbsoluteLocationPath ::= '/' RelativeLocationPath? | '//' RelativeLocationPath
    fn absolute_location_path(&mut self) -> Result<ExprNode, XPathError> {
        if matches!(
            self.current.kind,
            XpTokenKind::Slash | XpTokenKind::DoubleSlash
        ) {
            let kind = self.current.kind;
            self.consume(kind)?;
            // a bare '/' (also inside '(...)' and '[...]') selects the root:
            // synthesize a '.' step anchored at it
            if self.prev.kind == XpTokenKind::Slash
                && matches!(
                    self.current.kind,
                    XpTokenKind::End
                        | XpTokenKind::Pipe
                        | XpTokenKind::RightParen
                        | XpTokenKind::RightBracket
                        | XpTokenKind::Comma
                )
            {
                let step = Step {
                    path_spec: PathSpec::Slash,
                    has_attr_axis: false,
                    abbrev: AbbrevStep::SelfNode,
                    node_test: None,
                    predicates: Vec::new(),
                };
                let path = Path {
                    from_predicate: self.from_predicate,
                    steps: vec![step],
                };
                return Ok(self.node(Expr::Path(path)));
            }
        }
        self.relative_location_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_path(expr: &str) -> Path {
        match parse(expr).unwrap().expr {
            Expr::Path(path) => path,
            other => panic!("expected a path, got {other:?}"),
        }
    }

    #[test]
    fn parses_relative_path_steps() {
        let path = parse_path("foo/bar");
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[0].path_spec, PathSpec::None);
        assert_eq!(path.steps[1].path_spec, PathSpec::Slash);
        assert_eq!(
            path.steps[1].node_test,
            Some(NodeTest::Name(NameTest::Name("bar".into())))
        );
    }

    #[test]
    fn parses_descendant_and_attribute_steps() {
        let path = parse_path("//ball/@a");
        assert_eq!(path.steps[0].path_spec, PathSpec::DoubleSlash);
        assert!(path.steps[1].has_attr_axis);
    }

    #[test]
    fn parses_abbreviated_steps() {
        let path = parse_path("../.");
        assert_eq!(path.steps[0].abbrev, AbbrevStep::Parent);
        assert_eq!(path.steps[1].abbrev, AbbrevStep::SelfNode);
    }

    #[test]
    fn lone_slash_becomes_a_self_step() {
        let path = parse_path("/");
        assert_eq!(path.steps.len(), 1);
        assert_eq!(path.steps[0].abbrev, AbbrevStep::SelfNode);
        assert_eq!(path.steps[0].path_spec, PathSpec::Slash);
    }

    #[test]
    fn parses_name_test_forms() {
        assert_eq!(
            parse_path("*").steps[0].node_test,
            Some(NodeTest::Name(NameTest::Wildcard))
        );
        assert_eq!(
            parse_path("*:b").steps[0].node_test,
            Some(NodeTest::Name(NameTest::WildcardLocal("b".into())))
        );
        assert_eq!(
            parse_path("p:*").steps[0].node_test,
            Some(NodeTest::Name(NameTest::PrefixWildcard("p".into())))
        );
        assert_eq!(
            parse_path("p:b").steps[0].node_test,
            Some(NodeTest::Name(NameTest::PrefixName {
                prefix: "p".into(),
                local: "b".into()
            }))
        );
    }

    #[test]
    fn parses_type_tests() {
        assert_eq!(
            parse_path("text()").steps[0].node_test,
            Some(NodeTest::Kind(TypeTest::Text))
        );
        assert_eq!(
            parse_path("processing-instruction('tgt')").steps[0].node_test,
            Some(NodeTest::Kind(TypeTest::Pi(Some("tgt".into()))))
        );
    }

    #[test]
    fn keywords_can_be_step_names() {
        let path = parse_path("div/mod");
        assert_eq!(
            path.steps[0].node_test,
            Some(NodeTest::Name(NameTest::Name("div".into())))
        );
    }

    #[test]
    fn operator_precedence_nests_correctly() {
        let node = parse("1 + 2 * 3").unwrap();
        let Expr::Binary { op, right, .. } = node.expr else {
            panic!("expected binary");
        };
        assert_eq!(op, Op::Plus);
        let Expr::Binary { op: inner, .. } = right.expr else {
            panic!("expected nested binary");
        };
        assert_eq!(inner, Op::Mul);
    }

    #[test]
    fn or_binds_weaker_than_and() {
        let node = parse("a = b or c = d and e = f").unwrap();
        let Expr::Binary { op, right, .. } = node.expr else {
            panic!("expected binary");
        };
        assert_eq!(op, Op::Or);
        let Expr::Binary { op: inner, .. } = right.expr else {
            panic!("expected nested binary");
        };
        assert_eq!(inner, Op::And);
    }

    #[test]
    fn union_of_paths() {
        let node = parse("//c | //a").unwrap();
        let Expr::Binary { op, .. } = node.expr else {
            panic!("expected binary");
        };
        assert_eq!(op, Op::Union);
    }

    #[test]
    fn predicates_attach_to_their_step() {
        let path = parse_path("foo[@a='x'][2]");
        assert_eq!(path.steps[0].predicates.len(), 2);
        assert!(path.steps[0].predicates[0].expr.id < path.steps[0].predicates[1].expr.id);
    }

    #[test]
    fn function_calls_resolve_against_the_table() {
        let node = parse("count(//a)").unwrap();
        let Expr::FunctionCall(call) = node.expr else {
            panic!("expected call");
        };
        assert_eq!(call.name, "count");
        assert_eq!(call.args.len(), 1);
    }

    #[test]
    fn unknown_function_reports_line_and_column() {
        let err = parse("blorb()").unwrap_err();
        match err {
            XPathError::UnknownFunction { name, line, column } => {
                assert_eq!(name, "blorb");
                assert_eq!(line, 1);
                assert_eq!(column, 0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn wrong_arity_reports_expectation() {
        let err = parse("count()").unwrap_err();
        match err {
            XPathError::WrongArity { name, expected, got, .. } => {
                assert_eq!(name, "count");
                assert_eq!(expected, 1);
                assert_eq!(got, 0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn dangling_operator_is_a_syntax_error() {
        assert!(matches!(parse("a ="), Err(XPathError::Syntax { .. })));
        assert!(matches!(parse("foo bar"), Err(XPathError::Syntax { .. })));
    }
}
