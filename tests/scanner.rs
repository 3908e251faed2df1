#[cfg(test)]
mod scanner_tests {
    use std::rc::Rc;

    use rox as lox;

    use lox::scanner::*;
    use lox::token::*;

    fn source(code: &str) -> Rc<SourceFile> {
        SourceFile::new("test.lox", code.to_string())
    }

    fn assert_token_sequence(code: &str, expected: &[(TokenType, &str)]) {
        let (tokens, errors) = lex(&source(code));

        assert!(errors.is_empty(), "unexpected errors: {}", errors);
        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_extended_symbols() {
        assert_token_sequence(
            "[]%?: != == <= >= ! < >",
            &[
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::PERCENT, "%"),
                (TokenType::QUESTION, "?"),
                (TokenType::COLON, ":"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::BANG, "!"),
                (TokenType::LESS, "<"),
                (TokenType::GREATER, ">"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "class static get set break continue getter _ _x",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::STATIC, "static"),
                (TokenType::GET, "get"),
                (TokenType::SET, "set"),
                (TokenType::BREAK, "break"),
                (TokenType::CONTINUE, "continue"),
                (TokenType::IDENTIFIER, "getter"),
                (TokenType::IDENTIFIER, "_"),
                (TokenType::IDENTIFIER, "_x"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_literals() {
        let (tokens, errors) = lex(&source("\"hi there\" 12 3.5 7."));
        assert!(errors.is_empty());

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hi there"),
            other => panic!("expected STRING, got {:?}", other),
        }
        match tokens[1].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 12.0),
            ref other => panic!("expected NUMBER, got {:?}", other),
        }
        match tokens[2].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 3.5),
            ref other => panic!("expected NUMBER, got {:?}", other),
        }

        // a trailing dot is not part of the number
        assert_eq!(tokens[3].lexeme, "7");
        assert_eq!(tokens[4].token_type, TokenType::DOT);
    }

    #[test]
    fn test_scanner_05_comments_nest() {
        assert_token_sequence(
            "a // line comment\n/* outer /* inner */ still outer */ b",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let (tokens, errors) = lex(&source("a /* /* */"));

        assert_eq!(errors.messages(), vec!["unterminated multi-line comment"]);
        assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
    }

    #[test]
    fn test_unterminated_string() {
        let (tokens, errors) = lex(&source("print \"bar;\nprint 1;"));

        assert_eq!(errors.messages(), vec!["unterminated string literal"]);
        assert_eq!(tokens[1].token_type, TokenType::ILLEGAL);
        assert_eq!(tokens[1].lexeme, "\"bar;");

        // scanning carries on with the next line
        assert_eq!(tokens[2].token_type, TokenType::PRINT);
        assert_eq!(tokens[2].start.line, 2);
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let (tokens, errors) = lex(&source(",.$(#"));

        let types: Vec<TokenType> = tokens.iter().map(|t| t.token_type.clone()).collect();
        assert_eq!(
            types,
            vec![
                TokenType::COMMA,
                TokenType::DOT,
                TokenType::ILLEGAL,
                TokenType::LEFT_PAREN,
                TokenType::ILLEGAL,
                TokenType::EOF,
            ]
        );

        assert_eq!(
            errors.messages(),
            vec!["illegal character U+0024 '$'", "illegal character U+0023 '#'"]
        );
    }

    #[test]
    fn test_multibyte_illegal_character() {
        let (tokens, errors) = lex(&source("a £ b"));

        assert_eq!(errors.messages(), vec!["illegal character U+00A3 '£'"]);
        assert_eq!(tokens[1].lexeme, "£");
        assert_eq!(tokens[2].lexeme, "b");
    }

    #[test]
    fn test_token_positions() {
        let file = source("var x = 1;\n  print x;");
        let (tokens, _) = lex(&file);

        for token in tokens.iter().filter(|t| t.token_type != TokenType::EOF) {
            let line: &str = file.line(token.start.line);
            assert_eq!(&line[token.start.column..token.end.column], token.lexeme);
        }

        let print = &tokens[5];
        assert_eq!(print.token_type, TokenType::PRINT);
        assert_eq!(print.start.to_string(), "test.lox:2:3");
    }

    #[test]
    fn test_scanner_is_fused() {
        let mut scanner = Scanner::new(&source("x"));

        assert!(scanner.next().is_some());
        assert_eq!(scanner.next().map(|t| t.token_type), Some(TokenType::EOF));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
