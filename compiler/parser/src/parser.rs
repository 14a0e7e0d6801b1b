use itertools::Itertools;

use ast::*;
use lexer::*;

use crate::symbols::SymbolTables;
use crate::{ParseError, ParseResult, SemanticError};

// Operator tiers, lowest to highest. Assignment shares the additive tier.
const LOWEST: i32 = 1;
const SUM: i32 = 2;
const PRODUCT: i32 = 3;
const CALL: i32 = 4;

/// Runtime print routine every program can call without declaring it
pub const BUILTIN_PRINTNUM: &str = "printnum";

pub fn builtin_prototypes() -> Vec<Prototype> {
    vec![Prototype::new(BUILTIN_PRINTNUM, vec!["i".to_string()])]
}

/// Single pass parser that checks declarations while it builds the tree.
///
/// A parser is consumed by `parse`, so symbol tables never outlive one compilation.
pub struct Parser {
    tokens: TokenStream,
    symbols: SymbolTables,
}

impl Parser {
    pub fn new(tokens: TokenStream) -> Self {
        Self {
            tokens,
            symbols: SymbolTables::new(),
        }
    }

    pub fn parse(mut self) -> ParseResult<TranslationUnit> {
        let mut unit = TranslationUnit::default();

        for proto in builtin_prototypes() {
            self.symbols
                .declare_prototype(&proto.name, proto.arity())
                .map_err(|kind| ParseError::semantic(0, kind))?;
            unit.prototypes.push(proto);
        }

        loop {
            match self.tokens.current_kind() {
                TokenType::Int => {
                    let line = self.tokens.current().line;
                    let proto = self.parse_prototype()?;

                    match self.tokens.current_kind() {
                        TokenType::Semicolon => {
                            self.symbols
                                .declare_prototype(&proto.name, proto.arity())
                                .map_err(|kind| ParseError::semantic(line, kind))?;
                            self.tokens.advance();
                            unit.prototypes.push(proto);
                        }
                        TokenType::OpenBrace => {
                            self.symbols
                                .check_definition(&proto.name, proto.arity())
                                .map_err(|kind| ParseError::semantic(line, kind))?;

                            let func = self.parse_function(proto)?;
                            self.symbols.define_function(func.name(), func.prototype.arity());
                            unit.functions.push(func);
                        }
                        _ => {
                            return Err(ParseError::unexpected(
                                "';' or '{'",
                                self.tokens.current(),
                            ))
                        }
                    }
                }
                TokenType::Eof => break,
                _ => {
                    return Err(ParseError::unexpected(
                        "a function declaration or definition",
                        self.tokens.current(),
                    ))
                }
            }
        }

        Ok(unit)
    }

    fn parse_prototype(&mut self) -> ParseResult<Prototype> {
        let line = self.tokens.current().line;
        self.expect(TokenType::Int)?;
        let name = self.parse_ident()?;
        self.expect(TokenType::OpenParen)?;

        let mut params = vec![];

        if self.tokens.current_kind() == TokenType::CloseParen {
            self.tokens.advance();
        } else {
            loop {
                self.expect(TokenType::Int)?;
                params.push(self.parse_ident()?);

                match self.tokens.current_kind() {
                    TokenType::Comma => {
                        self.tokens.advance();
                    }
                    TokenType::CloseParen => {
                        self.tokens.advance();
                        break;
                    }
                    _ => return Err(ParseError::unexpected("',' or ')'", self.tokens.current())),
                }
            }
        }

        if let Some(param) = params.iter().duplicates().next() {
            return Err(ParseError::semantic(
                line,
                SemanticError::DuplicateParameter {
                    func: name,
                    param: param.clone(),
                },
            ));
        }

        Ok(Prototype { name, params })
    }

    fn parse_function(&mut self, prototype: Prototype) -> ParseResult<FunctionDef> {
        self.expect(TokenType::OpenBrace)?;
        self.symbols.begin_function();

        let mut body = Body::default();

        for param in &prototype.params {
            self.symbols
                .declare_variable(param)
                .map_err(|kind| ParseError::semantic(self.tokens.current().line, kind))?;
            body.decls.push(Declaration {
                name: param.clone(),
                kind: DeclKind::Parameter,
            });
        }

        while self.tokens.current_kind() == TokenType::Int {
            body.decls.push(self.parse_local_decl()?);
        }

        while self.tokens.current_kind() != TokenType::CloseBrace {
            if self.tokens.current_kind() == TokenType::Eof {
                return Err(ParseError::expected_kind(
                    TokenType::CloseBrace,
                    self.tokens.current(),
                ));
            }

            body.stmts.push(self.parse_stmt()?);
        }

        if !matches!(body.stmts.last(), Some(Stmt::Return { .. })) {
            return Err(ParseError::semantic(
                self.tokens.current().line,
                SemanticError::MissingReturn(prototype.name),
            ));
        }

        self.expect(TokenType::CloseBrace)?;

        Ok(FunctionDef { prototype, body })
    }

    fn parse_local_decl(&mut self) -> ParseResult<Declaration> {
        let line = self.tokens.current().line;
        self.expect(TokenType::Int)?;
        let name = self.parse_ident()?;

        self.symbols
            .declare_variable(&name)
            .map_err(|kind| ParseError::semantic(line, kind))?;

        self.expect(TokenType::Semicolon)?;

        Ok(Declaration {
            name,
            kind: DeclKind::Local,
        })
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        match self.tokens.current_kind() {
            TokenType::Return => {
                self.tokens.advance();
                let expr = self.parse_expr(LOWEST)?;
                self.expect(TokenType::Semicolon)?;

                Ok(Stmt::Return { expr })
            }
            _ => {
                let expr = self.parse_expr(LOWEST)?;
                self.expect(TokenType::Semicolon)?;

                Ok(Stmt::Expression { expr })
            }
        }
    }

    /// Precedence climbing: binds every operator whose tier is above `floor`
    fn parse_expr(&mut self, floor: i32) -> ParseResult<Expr> {
        let mut left = self.parse_primary()?;

        while let Some(prec) = get_precedence(self.tokens.current_kind()) {
            if prec <= floor {
                break;
            }

            let op_token = self.tokens.current().clone();

            left = match op_token.kind {
                TokenType::OpenParen => self.parse_call(left)?,
                _ => {
                    self.tokens.advance();
                    let right = self.parse_expr(prec)?;
                    make_binary(&op_token, left, right)?
                }
            };
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.tokens.current().clone();

        match token.kind {
            TokenType::Constant => {
                // the lexer stores a sentinel for literals that overflow
                let val = token.literal.parse::<i32>().map_err(|_| {
                    ParseError::semantic(
                        token.line,
                        SemanticError::IntegerOutOfRange(token.literal.clone()),
                    )
                })?;
                self.tokens.advance();

                Ok(Expr::Constant(val))
            }
            TokenType::Identifier => {
                // a callee is resolved against functions by parse_call, not against variables
                if self.tokens.peek_kind() != TokenType::OpenParen
                    && !self.symbols.is_variable(&token.literal)
                {
                    return Err(ParseError::semantic(
                        token.line,
                        SemanticError::UndeclaredVariable(token.literal),
                    ));
                }
                self.tokens.advance();

                Ok(Expr::Var(token.literal))
            }
            _ => Err(ParseError::unexpected("an expression", &token)),
        }
    }

    fn parse_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let line = self.tokens.current().line;

        let func = match callee {
            Expr::Var(name) => name,
            other => {
                return Err(ParseError::semantic(
                    line,
                    SemanticError::InvalidCallee(other.to_string()),
                ))
            }
        };

        let mut args = vec![];

        if self.tokens.peek_kind() == TokenType::CloseParen {
            // skip "( )"
            self.tokens.advance();
            self.tokens.advance();
        } else {
            self.expect(TokenType::OpenParen)?;

            loop {
                args.push(self.parse_expr(LOWEST)?);

                match self.tokens.current_kind() {
                    TokenType::Comma => {
                        self.tokens.advance();
                    }
                    TokenType::CloseParen => {
                        self.tokens.advance();
                        break;
                    }
                    _ => return Err(ParseError::unexpected("',' or ')'", self.tokens.current())),
                }
            }
        }

        match self.symbols.resolve_call(&func) {
            None => Err(ParseError::semantic(
                line,
                SemanticError::UndefinedFunction(func),
            )),
            Some(arity) if arity != args.len() => Err(ParseError::semantic(
                line,
                SemanticError::CallArityMismatch {
                    name: func,
                    expected: arity,
                    found: args.len(),
                },
            )),
            Some(_) => Ok(Expr::Call { func, args }),
        }
    }

    fn parse_ident(&mut self) -> ParseResult<String> {
        let token = self.tokens.current();

        match token.kind {
            TokenType::Identifier => {
                let ident = token.literal.clone();
                self.tokens.advance();
                Ok(ident)
            }
            _ => Err(ParseError::expected_kind(TokenType::Identifier, token)),
        }
    }

    /// Checks that the current token is of the expected type and moves past it
    fn expect(&mut self, expected: TokenType) -> ParseResult<Token> {
        let token = self.tokens.current().clone();

        if token.kind != expected {
            return Err(ParseError::expected_kind(expected, &token));
        }

        self.tokens.advance();
        Ok(token)
    }
}

fn get_precedence(token: TokenType) -> Option<i32> {
    match token {
        TokenType::Equal | TokenType::Plus | TokenType::Minus => Some(SUM),
        TokenType::Star | TokenType::Slash => Some(PRODUCT),
        TokenType::OpenParen => Some(CALL),
        _ => None,
    }
}

fn make_binary(op_token: &Token, left: Expr, right: Expr) -> ParseResult<Expr> {
    let op = match op_token.kind {
        TokenType::Equal => BinaryOp::Assign,
        TokenType::Plus => BinaryOp::Add,
        TokenType::Minus => BinaryOp::Subtract,
        TokenType::Star => BinaryOp::Multiply,
        TokenType::Slash => BinaryOp::Divide,
        _ => return Err(ParseError::unexpected("a binary operator", op_token)),
    };

    if op == BinaryOp::Assign && !matches!(left, Expr::Var(_)) {
        return Err(ParseError::semantic(
            op_token.line,
            SemanticError::InvalidAssignmentTarget(left.to_string()),
        ));
    }

    Ok(Expr::binary(op, left, right))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ParseResult<TranslationUnit> {
        Parser::new(Lexer::new(src).tokenize()).parse()
    }

    fn parse_expr_with(src: &str, vars: &[&str]) -> ParseResult<Expr> {
        let mut parser = Parser::new(Lexer::new(src).tokenize());
        parser.symbols.begin_function();
        for var in vars {
            parser.symbols.declare_variable(var).unwrap();
        }

        parser.parse_expr(LOWEST)
    }

    fn semantic_err(src: &str) -> SemanticError {
        match parse(src) {
            Err(ParseError::Semantic { kind, .. }) => kind,
            other => panic!("expected a semantic error, got {:?}", other),
        }
    }

    #[test]
    fn simple_add() {
        let ast = parse_expr_with("3 + 5", &[]).unwrap();

        assert_eq!(
            ast,
            Expr::binary(BinaryOp::Add, Expr::Constant(3), Expr::Constant(5))
        )
    }

    #[test]
    fn triple_sub_is_left_associative() {
        let ast = parse_expr_with("3 - 5 - 6", &[]).unwrap();

        assert_eq!(
            ast,
            Expr::binary(
                BinaryOp::Subtract,
                Expr::binary(BinaryOp::Subtract, Expr::Constant(3), Expr::Constant(5)),
                Expr::Constant(6)
            )
        )
    }

    #[test]
    fn add_mul() {
        let ast = parse_expr_with("3 + 5 + 6 * 2 / a", &["a"]).unwrap();

        assert_eq!(
            ast,
            Expr::binary(
                BinaryOp::Add,
                Expr::binary(BinaryOp::Add, Expr::Constant(3), Expr::Constant(5)),
                Expr::binary(
                    BinaryOp::Divide,
                    Expr::binary(BinaryOp::Multiply, Expr::Constant(6), Expr::Constant(2)),
                    Expr::var("a")
                )
            )
        )
    }

    #[test]
    fn assignment_binds_like_addition() {
        let ast = parse_expr_with("i = 5 + 1", &["i"]).unwrap();

        assert_eq!(
            ast,
            Expr::binary(
                BinaryOp::Add,
                Expr::binary(BinaryOp::Assign, Expr::var("i"), Expr::Constant(5)),
                Expr::Constant(1)
            )
        );
        assert_eq!(ast.to_string(), "((i = 5) + 1)");
    }

    #[test]
    fn assignment_takes_products() {
        let ast = parse_expr_with("i = 5 * 2", &["i"]).unwrap();

        assert_eq!(
            ast,
            Expr::binary(
                BinaryOp::Assign,
                Expr::var("i"),
                Expr::binary(BinaryOp::Multiply, Expr::Constant(5), Expr::Constant(2))
            )
        );
    }

    #[test]
    fn chained_assignment_is_left_associative() {
        let ast = parse_expr_with("a = b = 1", &["a", "b"]);

        // "(a = b) = 1" has no variable on its left side
        assert!(matches!(
            ast,
            Err(ParseError::Semantic {
                kind: SemanticError::InvalidAssignmentTarget(_),
                ..
            })
        ));
    }

    #[test]
    fn subtraction_then_assignment() {
        let ast = parse_expr_with("a - b = 1", &["a", "b"]);

        assert!(matches!(
            ast,
            Err(ParseError::Semantic {
                kind: SemanticError::InvalidAssignmentTarget(target),
                ..
            }) if target == "(a - b)"
        ));
    }

    #[test]
    fn function_definition() {
        let unit = parse("int test(int j) { int i; i = j * 10; return i; }").unwrap();
        let func = &unit.functions[0];

        assert_eq!(func.prototype, Prototype::new("test", vec!["j".to_string()]));
        assert_eq!(
            func.body.decls,
            vec![
                Declaration {
                    name: "j".to_string(),
                    kind: DeclKind::Parameter
                },
                Declaration {
                    name: "i".to_string(),
                    kind: DeclKind::Local
                },
            ]
        );
        assert_eq!(
            func.body.stmts,
            vec![
                Stmt::Expression {
                    expr: Expr::binary(
                        BinaryOp::Assign,
                        Expr::var("i"),
                        Expr::binary(BinaryOp::Multiply, Expr::var("j"), Expr::Constant(10))
                    )
                },
                Stmt::Return {
                    expr: Expr::var("i")
                },
            ]
        );
    }

    #[test]
    fn builtin_printnum_comes_first() {
        let unit = parse("int f(int a); int main() { return printnum(3); }").unwrap();

        assert_eq!(
            unit.prototypes,
            vec![
                Prototype::new("printnum", vec!["i".to_string()]),
                Prototype::new("f", vec!["a".to_string()]),
            ]
        );
        assert_eq!(
            unit.functions[0].body.stmts[0],
            Stmt::Return {
                expr: Expr::Call {
                    func: "printnum".to_string(),
                    args: vec![Expr::Constant(3)]
                }
            }
        );
    }

    #[test]
    fn empty_source_still_has_builtin() {
        let unit = parse("").unwrap();

        assert_eq!(unit.prototypes.len(), 1);
        assert!(unit.functions.is_empty());
    }

    #[test]
    fn calls_in_expressions() {
        let unit = parse(
            "int add(int a, int b); int main() { int x; x = add(1, 2 * 3) + add(x = 4, x); return x; }",
        )
        .unwrap();

        assert_eq!(
            unit.functions[0].body.stmts[0].to_string(),
            "((x = add(1, (2 * 3))) + add((x = 4), x));"
        );
    }

    #[test]
    fn call_defined_function() {
        let unit = parse("int one() { return 1; } int main() { return one() + one(); }").unwrap();

        assert_eq!(unit.functions.len(), 2);
        assert_eq!(unit.functions[1].body.stmts[0].to_string(), "return (one() + one());");
    }

    #[test]
    fn recursion_needs_a_prototype() {
        assert_eq!(
            semantic_err("int f(int a) { return f(a); }"),
            SemanticError::UndefinedFunction("f".to_string())
        );
        assert!(parse("int f(int a); int f(int a) { return f(a); }").is_ok());
    }

    #[test]
    fn prototype_declared_twice() {
        assert_eq!(
            semantic_err("int f(int a); int f(int a);"),
            SemanticError::PrototypeRedeclared("f".to_string())
        );
    }

    #[test]
    fn builtin_cannot_be_redeclared() {
        assert_eq!(
            semantic_err("int printnum(int i);"),
            SemanticError::PrototypeRedeclared("printnum".to_string())
        );
    }

    #[test]
    fn definition_arity_against_prototype() {
        assert_eq!(
            semantic_err("int f(int a); int f(int a, int b) { return 0; }"),
            SemanticError::ArityMismatch {
                name: "f".to_string(),
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn duplicate_definition() {
        assert_eq!(
            semantic_err("int f(int a) { return a; } int f(int a) { return a; }"),
            SemanticError::FunctionRedefined("f".to_string())
        );
    }

    #[test]
    fn prototype_after_definition() {
        assert!(parse("int f(int a) { return a; } int f(int a);").is_ok());
        assert!(matches!(
            semantic_err("int f(int a) { return a; } int f();"),
            SemanticError::ArityMismatch { expected: 1, found: 0, .. }
        ));
    }

    #[test]
    fn call_arity() {
        assert_eq!(
            semantic_err("int f(int a); int main() { f(); return 0; }"),
            SemanticError::CallArityMismatch {
                name: "f".to_string(),
                expected: 1,
                found: 0
            }
        );
        assert!(matches!(
            semantic_err("int main() { return printnum(1, 2); }"),
            SemanticError::CallArityMismatch { expected: 1, found: 2, .. }
        ));
    }

    #[test]
    fn undefined_function() {
        assert_eq!(
            semantic_err("int main() { return g(1); }"),
            SemanticError::UndefinedFunction("g".to_string())
        );
    }

    #[test]
    fn calling_a_non_identifier() {
        assert!(matches!(
            semantic_err("int main() { return 5(1); }"),
            SemanticError::InvalidCallee(_)
        ));
    }

    #[test]
    fn terminal_return() {
        assert_eq!(
            semantic_err("int main() { int i; }"),
            SemanticError::MissingReturn("main".to_string())
        );
        assert_eq!(
            semantic_err("int main() { return 0; 1; }"),
            SemanticError::MissingReturn("main".to_string())
        );
        assert!(parse("int main() { return 0; }").is_ok());
    }

    #[test]
    fn duplicate_names() {
        assert_eq!(
            semantic_err("int f(int a, int a);"),
            SemanticError::DuplicateParameter {
                func: "f".to_string(),
                param: "a".to_string()
            }
        );
        assert_eq!(
            semantic_err("int f(int a) { int a; return a; }"),
            SemanticError::DuplicateVariable("a".to_string())
        );
        assert_eq!(
            semantic_err("int main() { int i; int i; return 0; }"),
            SemanticError::DuplicateVariable("i".to_string())
        );
    }

    #[test]
    fn variables_are_per_function() {
        assert!(parse("int f() { int i; return i; } int g() { int i; return i; }").is_ok());
        assert_eq!(
            semantic_err("int f() { int i; return i; } int g() { return i; }"),
            SemanticError::UndeclaredVariable("i".to_string())
        );
    }

    #[test]
    fn integer_out_of_range() {
        assert_eq!(
            semantic_err("int main() { return 2147483648; }"),
            SemanticError::IntegerOutOfRange("2147483648".to_string())
        );
        assert!(parse("int main() { return 2147483647; }").is_ok());
    }

    #[test]
    fn syntax_errors() {
        let cases = [
            "int main() { return 0 }",
            "int main() { return 0;",
            "int main() return 0;",
            "int main(int) { return 0; }",
            "int f(int a,);",
            "main() { return 0; }",
            "int main() { return 0; } }",
            "int main() { return # ; }",
            "int main() { return 0; int i; }",
            "int main(",
        ];

        for src in cases {
            assert!(
                matches!(parse(src), Err(ParseError::Syntax { .. })),
                "expected syntax error for {:?}",
                src
            );
        }
    }

    #[test]
    fn error_reports_line() {
        let err = parse("int main() {\n  int i;\n  i = 1\n}\n").unwrap_err();

        assert_eq!(
            err,
            ParseError::Syntax {
                line: 4,
                expected: "';'".to_string(),
                found: "'}'".to_string()
            }
        );
        assert_eq!(err.to_string(), "line 4: expected ';', but found '}'");
    }
}
