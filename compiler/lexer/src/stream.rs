use crate::{Token, TokenType};

/// Token sequence with a movable cursor
///
/// The cursor always points at a valid token: the sequence is never empty
/// and its last token is Eof.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    index: usize,
}

impl TokenStream {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(tokens.last().is_some_and(|t| t.kind == TokenType::Eof));

        Self { tokens, index: 0 }
    }

    /// Token under the cursor
    pub fn current(&self) -> &Token {
        &self.tokens[self.index]
    }

    pub fn current_kind(&self) -> TokenType {
        self.current().kind
    }

    /// Kind of the token after the cursor, Eof past the end
    pub fn peek_kind(&self) -> TokenType {
        self.tokens
            .get(self.index + 1)
            .map_or(TokenType::Eof, |t| t.kind)
    }

    /// Move one token forward. Stays on the final Eof token and returns false there.
    pub fn advance(&mut self) -> bool {
        if self.index + 1 >= self.tokens.len() {
            return false;
        }

        self.index += 1;
        true
    }

    /// Move `times` tokens back. Nothing moves if that would pass the start.
    pub fn retreat(&mut self, times: usize) -> bool {
        match self.index.checked_sub(times) {
            Some(index) => {
                self.index = index;
                true
            }
            None => false,
        }
    }

    /// Move to an absolute index. Nothing moves if the index is out of range.
    pub fn jump(&mut self, index: usize) -> bool {
        if index >= self.tokens.len() {
            return false;
        }

        self.index = index;
        true
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn kinds(&self) -> Vec<TokenType> {
        self.tokens.iter().map(|t| t.kind).collect()
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
