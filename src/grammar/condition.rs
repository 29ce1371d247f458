//! SIGMA condition expression parsing.
//!
//! A condition string such as `selection and not 1 of filter*` is tokenized,
//! parsed by recursive descent into a [`ConditionExpr`], and then resolved
//! against the rule's named detections into a [`ConditionItem`] tree.

use super::ast::{AggregationItem, ConditionArg, ConditionItem};
use super::detection::{parse_number, DetectionSet};
use crate::error::GrammarError;

type Result<T> = std::result::Result<T, GrammarError>;

/// Tokens in a SIGMA condition expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Identifier(String),
    And,
    Or,
    Not,
    LeftParen,
    RightParen,
    Of,
    Them,
    All,
    Number(u32),
    Wildcard(String),
}

/// Target of an `N of ...` quantifier.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Selector {
    Them,
    Pattern(String),
}

/// Unresolved parse tree of a condition expression.
///
/// Runs of the same binary operator are flattened, so `a and b and c` is a
/// single `And` with three operands.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConditionExpr {
    Identifier(String),
    And(Vec<ConditionExpr>),
    Or(Vec<ConditionExpr>),
    Not(Box<ConditionExpr>),
    OneOf(Selector),
    AllOf(Selector),
}

/// Recursive descent parser for SIGMA conditions.
pub(crate) struct ConditionParser<'a> {
    tokens: &'a [Token],
    position: usize,
}

impl<'a> ConditionParser<'a> {
    pub(crate) fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.current_token().cloned();
        self.position += 1;
        token
    }

    /// Parse OR expressions (lowest precedence).
    pub(crate) fn parse_or_expression(&mut self) -> Result<ConditionExpr> {
        let mut operands = vec![self.parse_and_expression()?];

        while let Some(Token::Or) = self.current_token() {
            self.advance();
            operands.push(self.parse_and_expression()?);
        }

        Ok(collapse(operands, ConditionExpr::Or))
    }

    fn parse_and_expression(&mut self) -> Result<ConditionExpr> {
        let mut operands = vec![self.parse_not_expression()?];

        while let Some(Token::And) = self.current_token() {
            self.advance();
            operands.push(self.parse_not_expression()?);
        }

        Ok(collapse(operands, ConditionExpr::And))
    }

    fn parse_not_expression(&mut self) -> Result<ConditionExpr> {
        if let Some(Token::Not) = self.current_token() {
            self.advance();
            let operand = self.parse_not_expression()?;
            Ok(ConditionExpr::Not(Box::new(operand)))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<ConditionExpr> {
        match self.advance() {
            Some(Token::LeftParen) => {
                let expr = self.parse_or_expression()?;
                match self.advance() {
                    Some(Token::RightParen) => Ok(expr),
                    _ => Err(GrammarError::Condition(
                        "Expected closing parenthesis".to_string(),
                    )),
                }
            }
            Some(Token::Identifier(name)) => Ok(ConditionExpr::Identifier(name)),
            Some(Token::Number(count)) => {
                self.expect_of("number")?;
                let selector = self.parse_selector()?;
                if count == 1 {
                    Ok(ConditionExpr::OneOf(selector))
                } else {
                    Err(GrammarError::Condition(format!(
                        "Only '1 of' and 'all of' quantifiers are supported, found '{count} of'"
                    )))
                }
            }
            Some(Token::All) => {
                self.expect_of("'all'")?;
                Ok(ConditionExpr::AllOf(self.parse_selector()?))
            }
            Some(token) => Err(GrammarError::Condition(format!(
                "Unexpected token in condition: {token:?}"
            ))),
            None => Err(GrammarError::Condition(
                "Unexpected end of condition".to_string(),
            )),
        }
    }

    fn expect_of(&mut self, after: &str) -> Result<()> {
        match self.advance() {
            Some(Token::Of) => Ok(()),
            _ => Err(GrammarError::Condition(format!(
                "Expected 'of' after {after}"
            ))),
        }
    }

    fn parse_selector(&mut self) -> Result<Selector> {
        match self.advance() {
            Some(Token::Them) => Ok(Selector::Them),
            Some(Token::Wildcard(pattern)) => Ok(Selector::Pattern(pattern)),
            Some(Token::Identifier(name)) => Ok(Selector::Pattern(name)),
            _ => Err(GrammarError::Condition(
                "Expected 'them' or pattern after 'of'".to_string(),
            )),
        }
    }
}

fn collapse(
    mut operands: Vec<ConditionExpr>,
    wrap: fn(Vec<ConditionExpr>) -> ConditionExpr,
) -> ConditionExpr {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        wrap(operands)
    }
}

/// Tokenize a SIGMA condition string.
pub(crate) fn tokenize_condition(condition: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = condition.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LeftParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RightParen);
                chars.next();
            }
            '0'..='9' => {
                let mut number_str = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() {
                        number_str.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = number_str.parse::<u32>().map_err(|_| {
                    GrammarError::Condition(format!("Invalid count in condition: {number_str}"))
                })?;
                tokens.push(Token::Number(number));
            }
            'a'..='z' | 'A'..='Z' | '_' | '*' => {
                let mut identifier = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' || ch == '*' || ch == '-' {
                        identifier.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }

                match identifier.as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "not" => tokens.push(Token::Not),
                    "of" => tokens.push(Token::Of),
                    "them" => tokens.push(Token::Them),
                    "all" => tokens.push(Token::All),
                    _ if identifier.contains('*') => tokens.push(Token::Wildcard(identifier)),
                    _ => tokens.push(Token::Identifier(identifier)),
                }
            }
            _ => {
                return Err(GrammarError::Condition(format!(
                    "Unexpected character in condition: '{ch}'"
                )));
            }
        }
    }

    Ok(tokens)
}

/// Parse a condition string into its unresolved tree.
pub(crate) fn parse_condition(condition: &str) -> Result<ConditionExpr> {
    let tokens = tokenize_condition(condition)?;
    if tokens.is_empty() {
        return Err(GrammarError::Condition("Empty condition".to_string()));
    }

    let mut parser = ConditionParser::new(&tokens);
    let expr = parser.parse_or_expression()?;

    if parser.position < tokens.len() {
        return Err(GrammarError::Condition(format!(
            "Unexpected trailing token in condition: {:?}",
            tokens[parser.position]
        )));
    }

    Ok(expr)
}

/// Resolve a parsed expression into a condition tree.
///
/// Known identifiers are inlined with their detection's tree. Unknown ones
/// are kept as references: an [`ConditionArg::Unresolved`] child inside a
/// branch, or an [`ConditionItem::Identifier`] at the top.
pub(crate) fn resolve(expr: &ConditionExpr, detections: &DetectionSet) -> Result<ConditionItem> {
    match expr {
        ConditionExpr::Identifier(name) => match detections.resolve(name) {
            Some(item) => item,
            None => Ok(ConditionItem::Identifier(name.clone())),
        },
        ConditionExpr::And(operands) => Ok(ConditionItem::And(resolve_args(operands, detections)?)),
        ConditionExpr::Or(operands) => Ok(ConditionItem::Or(resolve_args(operands, detections)?)),
        ConditionExpr::Not(operand) => Ok(ConditionItem::Not(vec![resolve_arg(
            operand, detections,
        )?])),
        ConditionExpr::OneOf(selector) => {
            quantify(selector, detections, ConditionItem::Or)
        }
        ConditionExpr::AllOf(selector) => {
            quantify(selector, detections, ConditionItem::And)
        }
    }
}

fn resolve_arg(expr: &ConditionExpr, detections: &DetectionSet) -> Result<ConditionArg> {
    match expr {
        ConditionExpr::Identifier(name) if !detections.contains(name) => {
            Ok(ConditionArg::Unresolved(name.clone()))
        }
        _ => resolve(expr, detections).map(ConditionArg::Resolved),
    }
}

fn resolve_args(operands: &[ConditionExpr], detections: &DetectionSet) -> Result<Vec<ConditionArg>> {
    operands
        .iter()
        .map(|operand| resolve_arg(operand, detections))
        .collect()
}

fn quantify(
    selector: &Selector,
    detections: &DetectionSet,
    wrap: fn(Vec<ConditionArg>) -> ConditionItem,
) -> Result<ConditionItem> {
    let names: Vec<&str> = match selector {
        Selector::Them => detections
            .names()
            .filter(|name| !name.starts_with('_'))
            .collect(),
        Selector::Pattern(pattern) => detections
            .names()
            .filter(|name| matches_pattern(pattern, name))
            .collect(),
    };

    if names.is_empty() {
        return Err(GrammarError::Condition(format!(
            "Quantifier {selector:?} matches no detection"
        )));
    }

    let mut items = names
        .iter()
        .map(|name| {
            detections
                .resolve(name)
                .unwrap_or_else(|| Ok(ConditionItem::Identifier((*name).to_string())))
        })
        .collect::<Result<Vec<_>>>()?;

    if items.len() == 1 {
        return Ok(items.remove(0));
    }

    Ok(wrap(items.into_iter().map(ConditionArg::Resolved).collect()))
}

/// Glob match supporting `*` only, as used by detection name patterns.
fn matches_pattern(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }

    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !name.starts_with(first) || name.len() < first.len() + last.len() || !name.ends_with(last) {
        return false;
    }

    let mut rest = &name[first.len()..name.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    true
}

/// Parse the aggregation clause that follows `|` in a condition,
/// e.g. `count(user) by host > 5`.
pub(crate) fn parse_aggregation(clause: &str) -> Result<AggregationItem> {
    let invalid = |reason: &str| GrammarError::Aggregation(format!("{reason} in '{}'", clause.trim()));
    let clause = clause.trim();

    let open = clause.find('(').ok_or_else(|| invalid("Expected '('"))?;
    let close = clause.find(')').ok_or_else(|| invalid("Expected ')'"))?;
    if close < open {
        return Err(invalid("Unbalanced parentheses"));
    }

    let function = clause[..open].trim();
    if function.is_empty() || !function.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid("Expected aggregation function"));
    }
    let field = Some(clause[open + 1..close].trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string);

    let rest = clause[close + 1..].trim();
    let op_start = rest
        .find(['<', '>', '='])
        .ok_or_else(|| invalid("Expected comparison operator"))?;

    let group_by = match rest[..op_start].trim() {
        "" => None,
        grouping => match grouping.strip_prefix("by ") {
            Some(group) if !group.trim().is_empty() => Some(group.trim().to_string()),
            _ => return Err(invalid("Expected 'by <field>'")),
        },
    };

    let comparison = &rest[op_start..];
    let op_len = comparison
        .chars()
        .take_while(|c| matches!(c, '<' | '>' | '='))
        .count();
    let op = match &comparison[..op_len] {
        op @ ("<" | "<=" | ">" | ">=" | "==" | "=") => op.to_string(),
        _ => return Err(invalid("Unknown comparison operator")),
    };
    let threshold = parse_number(comparison[op_len..].trim()).ok_or_else(|| invalid("Expected numeric threshold"))?;

    Ok(AggregationItem {
        function: function.to_string(),
        field,
        group_by,
        op,
        threshold,
    })
}
