//! Lexer for field query text
//!
//! The syntax is deliberately small: bare terms, `"quoted phrases"`, `|` for
//! alternatives and parentheses for grouping. Juxtaposition means AND. The
//! lexer never fails; an unterminated quote runs to the end of input.

/// Token types for field query parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// An unquoted run of characters
    Term(String),
    /// The contents of a quoted string
    Phrase(String),
    /// `|`
    Pipe,
    LeftParen,
    RightParen,
    Eof,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        if self.is_eof() {
            return Token::Eof;
        }

        match self.current_char() {
            '|' => {
                self.advance();
                Token::Pipe
            }
            '(' => {
                self.advance();
                Token::LeftParen
            }
            ')' => {
                self.advance();
                Token::RightParen
            }
            '"' => {
                self.advance();
                self.read_phrase()
            }
            _ => self.read_term(),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn read_term(&mut self) -> Token {
        let mut term = String::new();
        while !self.is_eof() {
            let ch = self.current_char();
            if ch.is_whitespace() || matches!(ch, '|' | '(' | ')') {
                break;
            }
            term.push(ch);
            self.advance();
        }
        Token::Term(term)
    }

    fn read_phrase(&mut self) -> Token {
        let mut phrase = String::new();
        while !self.is_eof() {
            let ch = self.current_char();
            self.advance();
            if ch == '"' {
                break;
            }
            phrase.push(ch);
        }
        Token::Phrase(phrase)
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn advance(&mut self) {
        self.position += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            if token == Token::Eof {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn test_terms_and_operators() {
        assert_eq!(
            tokenize("chest (ct|mr)"),
            vec![
                Token::Term("chest".to_string()),
                Token::LeftParen,
                Token::Term("ct".to_string()),
                Token::Pipe,
                Token::Term("mr".to_string()),
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_phrase() {
        assert_eq!(
            tokenize(r#"  "chest x-ray" lung"#),
            vec![
                Token::Phrase("chest x-ray".to_string()),
                Token::Term("lung".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_phrase_runs_to_end() {
        assert_eq!(
            tokenize(r#"lung "left lobe"#),
            vec![
                Token::Term("lung".to_string()),
                Token::Phrase("left lobe".to_string()),
            ]
        );
    }

    #[test]
    fn test_quote_inside_term_is_kept() {
        assert_eq!(tokenize(r#"o"neil"#), vec![Token::Term(r#"o"neil"#.to_string())]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("   ").is_empty());
    }
}
