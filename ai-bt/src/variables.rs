//! Boolean behavior variables, their declarations, the signal bindings that drive them, and the
//! condition expressions that read them.

use std::collections::BTreeMap;
use std::fmt;

use ai_core::NameHash;

use crate::error::LoadError;
use crate::node::LoadResult;
use crate::xml::XmlNode;

pub type VariableId = NameHash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDeclaration {
    pub id: VariableId,
    pub name: String,
    pub default: bool,
}

/// The variables a template declares, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct VariableDeclarations {
    declarations: Vec<VariableDeclaration>,
    index: BTreeMap<VariableId, usize>,
}

impl VariableDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a `Variables` section: `Variable(name, default="false")` children.
    pub fn load_from_xml(&mut self, xml: &XmlNode) -> LoadResult {
        for child in &xml.children {
            if !child.is_tag("Variable") {
                return Err(LoadError::unexpected(xml, child));
            }
            let name = child.required_attr("name")?;
            let default = child.attr_bool("default")?.unwrap_or(false);
            if self.declare(name, default).is_none() {
                return Err(LoadError::Duplicate {
                    line: child.line,
                    what: "variable",
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Adds a declaration; `None` if the name (or its hash) is already declared.
    pub fn declare(&mut self, name: &str, default: bool) -> Option<VariableId> {
        let id = NameHash::of(name);
        if self.index.contains_key(&id) {
            return None;
        }
        self.index.insert(id, self.declarations.len());
        self.declarations.push(VariableDeclaration {
            id,
            name: name.to_string(),
            default,
        });
        Some(id)
    }

    pub fn id_of(&self, name: &str) -> Option<VariableId> {
        let id = NameHash::of(name);
        self.index.contains_key(&id).then_some(id)
    }

    pub fn is_declared(&self, id: VariableId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: VariableId) -> Option<&VariableDeclaration> {
        self.index.get(&id).map(|&i| &self.declarations[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableDeclaration> {
        self.declarations.iter()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// A collection holding every declared variable at its default value.
    pub fn default_collection(&self) -> VariableCollection {
        VariableCollection {
            values: self.declarations.iter().map(|d| (d.id, d.default)).collect(),
            changed: false,
        }
    }
}

/// One instance's current variable values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableCollection {
    values: BTreeMap<VariableId, bool>,
    changed: bool,
}

impl VariableCollection {
    pub fn get(&self, id: VariableId) -> Option<bool> {
        self.values.get(&id).copied()
    }

    /// Writes a declared variable. Returns `false` for undeclared ids.
    ///
    /// The changed flag is raised only when the stored value actually differs.
    pub fn set(&mut self, id: VariableId, value: bool) -> bool {
        match self.values.get_mut(&id) {
            Some(current) => {
                if *current != value {
                    *current = value;
                    self.changed = true;
                }
                true
            }
            None => false,
        }
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Returns the changed flag and clears it.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn ids(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariableId, bool)> + '_ {
        self.values.iter().map(|(id, value)| (*id, *value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SignalBinding {
    signal: NameHash,
    variable: VariableId,
    value: bool,
}

/// Maps incoming event hashes onto variable writes.
#[derive(Debug, Clone, Default)]
pub struct SignalHandler {
    bindings: Vec<SignalBinding>,
}

impl SignalHandler {
    /// Reads a `SignalVariables` section: `Signal(name, variable, value)` children.
    pub fn load_from_xml(&mut self, xml: &XmlNode, declarations: &VariableDeclarations) -> LoadResult {
        for child in &xml.children {
            if !child.is_tag("Signal") {
                return Err(LoadError::unexpected(xml, child));
            }
            let signal = child.required_attr("name")?;
            let variable_name = child.required_attr("variable")?;
            let value = child
                .attr_bool("value")?
                .ok_or_else(|| LoadError::missing_attribute(child, "value"))?;
            let variable =
                declarations
                    .id_of(variable_name)
                    .ok_or_else(|| LoadError::UnknownVariable {
                        line: child.line,
                        name: variable_name.to_string(),
                    })?;
            self.bindings.push(SignalBinding {
                signal: NameHash::of(signal),
                variable,
                value,
            });
        }
        Ok(())
    }

    /// Applies every binding for `signal`, in declaration order.
    pub fn process_signal(&self, signal: NameHash, variables: &mut VariableCollection) {
        for binding in self.bindings.iter().filter(|b| b.signal == signal) {
            variables.set(binding.variable, binding.value);
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A boolean condition over declared variables, compiled once at load time.
///
/// Grammar, loosest binding first: `or`/`||`, `xor`/`^`, `and`/`&&`, `==`/`!=`, `not`/`!`,
/// then identifiers, `true`, `false` and parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    root: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Const(bool),
    Var(VariableId),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Or,
    Xor,
    And,
    Eq,
    NotEq,
}

/// Deepest nesting of parentheses and negations a condition may use.
pub const MAX_EXPRESSION_NESTING: usize = 64;

/// Longest condition, in tokens.
pub const MAX_EXPRESSION_TOKENS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    #[error("unexpected '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("empty expression")]
    Empty,
    #[error("expression nested deeper than {} levels", MAX_EXPRESSION_NESTING)]
    TooDeep,
    #[error("expression longer than {} tokens", MAX_EXPRESSION_TOKENS)]
    TooLong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Not,
    And,
    Or,
    Xor,
    Eq,
    NotEq,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => f.write_str(s),
            Token::Not => f.write_str("!"),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::Xor => f.write_str("^"),
            Token::Eq => f.write_str("=="),
            Token::NotEq => f.write_str("!="),
            Token::Open => f.write_str("("),
            Token::Close => f.write_str(")"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '(' => Token::Open,
            ')' => Token::Close,
            '^' => Token::Xor,
            '!' => {
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    Token::NotEq
                } else {
                    Token::Not
                }
            }
            '=' | '&' | '|' => match chars.next_if(|&(_, n)| n == c) {
                Some(_) => match c {
                    '=' => Token::Eq,
                    '&' => Token::And,
                    _ => Token::Or,
                },
                None => return Err(ExpressionError::UnexpectedToken(c.to_string())),
            },
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut end = start + c.len_utf8();
                while let Some((i, n)) =
                    chars.next_if(|&(_, n)| n.is_alphanumeric() || n == '_' || n == '.')
                {
                    end = i + n.len_utf8();
                }
                let word = &text[start..end];
                match word.to_ascii_lowercase().as_str() {
                    "not" => Token::Not,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "xor" => Token::Xor,
                    _ => Token::Ident(word.to_string()),
                }
            }
            other => return Err(ExpressionError::UnexpectedToken(other.to_string())),
        };
        tokens.push(token);
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    declarations: &'a VariableDeclarations,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_EXPRESSION_NESTING {
            return Err(ExpressionError::TooDeep);
        }
        Ok(())
    }

    fn binary(
        &mut self,
        ops: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, ExpressionError>,
    ) -> Result<Expr, ExpressionError> {
        let mut lhs = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    let rhs = next(self)?;
                    lhs = Expr::Binary(*op, Box::new(lhs), Box::new(rhs));
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn or(&mut self) -> Result<Expr, ExpressionError> {
        self.binary(&[(Token::Or, BinaryOp::Or)], Self::xor)
    }

    fn xor(&mut self) -> Result<Expr, ExpressionError> {
        self.binary(&[(Token::Xor, BinaryOp::Xor)], Self::and)
    }

    fn and(&mut self) -> Result<Expr, ExpressionError> {
        self.binary(&[(Token::And, BinaryOp::And)], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr, ExpressionError> {
        self.binary(
            &[(Token::Eq, BinaryOp::Eq), (Token::NotEq, BinaryOp::NotEq)],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat(&Token::Not) {
            self.descend()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let token = self.peek().cloned().ok_or(ExpressionError::UnexpectedEnd)?;
        self.pos += 1;
        match token {
            Token::Open => {
                self.descend()?;
                let inner = self.or()?;
                self.depth -= 1;
                if self.eat(&Token::Close) {
                    Ok(inner)
                } else {
                    Err(match self.peek() {
                        Some(t) => ExpressionError::UnexpectedToken(t.to_string()),
                        None => ExpressionError::UnexpectedEnd,
                    })
                }
            }
            Token::Ident(name) => {
                if name.eq_ignore_ascii_case("true") {
                    Ok(Expr::Const(true))
                } else if name.eq_ignore_ascii_case("false") {
                    Ok(Expr::Const(false))
                } else {
                    self.declarations
                        .id_of(&name)
                        .map(Expr::Var)
                        .ok_or(ExpressionError::UnknownVariable(name))
                }
            }
            other => Err(ExpressionError::UnexpectedToken(other.to_string())),
        }
    }
}

impl Expression {
    pub fn constant(value: bool) -> Self {
        Self {
            root: Expr::Const(value),
        }
    }

    pub fn parse(text: &str, declarations: &VariableDeclarations) -> Result<Self, ExpressionError> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(ExpressionError::Empty);
        }
        if tokens.len() > MAX_EXPRESSION_TOKENS {
            return Err(ExpressionError::TooLong);
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
            declarations,
        };
        let root = parser.or()?;
        if let Some(extra) = parser.peek() {
            return Err(ExpressionError::UnexpectedToken(extra.to_string()));
        }
        Ok(Self { root })
    }

    /// Parses `text` for the element `xml`, mapping failures to load errors.
    pub fn load(
        text: &str,
        declarations: &VariableDeclarations,
        xml: &XmlNode,
    ) -> Result<Self, LoadError> {
        Self::parse(text, declarations).map_err(|err| match err {
            ExpressionError::UnknownVariable(name) => LoadError::UnknownVariable {
                line: xml.line,
                name,
            },
            other => LoadError::Condition {
                line: xml.line,
                expression: text.to_string(),
                reason: other.to_string(),
            },
        })
    }

    /// Undeclared variables read as `false`.
    pub fn evaluate(&self, variables: &VariableCollection) -> bool {
        fn eval(expr: &Expr, vars: &VariableCollection) -> bool {
            match expr {
                Expr::Const(b) => *b,
                Expr::Var(id) => vars.get(*id).unwrap_or(false),
                Expr::Not(inner) => !eval(inner, vars),
                Expr::Binary(op, lhs, rhs) => {
                    let l = eval(lhs, vars);
                    match op {
                        BinaryOp::And => l && eval(rhs, vars),
                        BinaryOp::Or => l || eval(rhs, vars),
                        BinaryOp::Xor => l != eval(rhs, vars),
                        BinaryOp::Eq => l == eval(rhs, vars),
                        BinaryOp::NotEq => l != eval(rhs, vars),
                    }
                }
            }
        }
        eval(&self.root, variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decls() -> VariableDeclarations {
        let mut d = VariableDeclarations::new();
        d.declare("HasTarget", false);
        d.declare("IsHurt", true);
        d.declare("canSee", false);
        d
    }

    fn eval(text: &str, set: &[(&str, bool)]) -> bool {
        let d = decls();
        let mut vars = d.default_collection();
        for (name, value) in set {
            vars.set(NameHash::of(name), *value);
        }
        Expression::parse(text, &d).unwrap().evaluate(&vars)
    }

    #[test]
    fn constants_and_identifiers() {
        assert!(eval("true", &[]));
        assert!(!eval("FALSE", &[]));
        assert!(eval("IsHurt", &[]));
        assert!(eval("ishurt", &[]));
        assert!(!eval("HasTarget", &[]));
    }

    #[test]
    fn not_binds_tighter_than_and() {
        assert!(eval("!HasTarget && IsHurt", &[]));
        assert!(eval("not HasTarget and IsHurt", &[]));
        assert!(!eval("!(HasTarget || IsHurt)", &[]));
    }

    #[test]
    fn and_binds_tighter_than_xor_and_or() {
        // true or (false and false)
        assert!(eval("IsHurt or HasTarget and canSee", &[]));
        // (true and true) xor true
        assert!(!eval("IsHurt && IsHurt ^ IsHurt", &[]));
        assert!(eval("HasTarget xor IsHurt", &[]));
    }

    #[test]
    fn equality_compares_booleans() {
        assert!(eval("HasTarget == canSee", &[]));
        assert!(eval("HasTarget != IsHurt", &[]));
        assert!(!eval("HasTarget == IsHurt", &[("IsHurt", true)]));
        assert!(eval("HasTarget == IsHurt", &[("HasTarget", true)]));
    }

    #[test]
    fn rejects_malformed_input() {
        let d = decls();
        assert_eq!(Expression::parse("", &d), Err(ExpressionError::Empty));
        assert_eq!(
            Expression::parse("Missing", &d),
            Err(ExpressionError::UnknownVariable("Missing".into()))
        );
        assert_eq!(
            Expression::parse("(IsHurt", &d),
            Err(ExpressionError::UnexpectedEnd)
        );
        assert_eq!(
            Expression::parse("IsHurt IsHurt", &d),
            Err(ExpressionError::UnexpectedToken("IsHurt".into()))
        );
        assert_eq!(
            Expression::parse("IsHurt & IsHurt", &d),
            Err(ExpressionError::UnexpectedToken("&".into()))
        );
    }

    #[test]
    fn nesting_and_length_are_bounded() {
        let d = decls();
        let nested = |depth: usize| format!("{}IsHurt{}", "(".repeat(depth), ")".repeat(depth));
        assert!(Expression::parse(&nested(MAX_EXPRESSION_NESTING), &d).is_ok());
        assert_eq!(
            Expression::parse(&nested(MAX_EXPRESSION_NESTING + 1), &d),
            Err(ExpressionError::TooDeep)
        );
        assert_eq!(
            Expression::parse(&format!("{}IsHurt", "!".repeat(10_000)), &d),
            Err(ExpressionError::TooDeep)
        );
        // Siblings do not add up.
        let wide = vec!["(IsHurt)"; 200].join(" or ");
        assert!(eval(&wide, &[]));

        let long = vec!["IsHurt"; MAX_EXPRESSION_TOKENS].join(" or ");
        assert_eq!(Expression::parse(&long, &d), Err(ExpressionError::TooLong));
    }

    #[test]
    fn collection_flags_only_real_changes() {
        let d = decls();
        let mut vars = d.default_collection();
        let hurt = NameHash::of("IsHurt");
        assert!(vars.set(hurt, true));
        assert!(!vars.changed());
        assert!(vars.set(hurt, false));
        assert!(vars.take_changed());
        assert!(!vars.changed());
        assert!(!vars.set(NameHash::of("Undeclared"), true));
    }
}
