#[cfg(test)]
mod session_tests {
    use std::rc::Rc;

    use rox as lox;

    use lox::token::SourceFile;
    use lox::{LoxError, Session};

    fn printed(session: &Session<Vec<u8>>) -> String {
        String::from_utf8_lossy(session.interpreter().output()).into_owned()
    }

    #[test]
    fn test_syntax_errors_stop_before_running() {
        let mut session: Session<Vec<u8>> = Session::with_output(Vec::new());
        let error: LoxError = session
            .run_source("test.lox", "print 1;\nprint ;")
            .expect_err("syntax error");

        assert!(matches!(error, LoxError::Syntax(_)));
        assert_eq!(error.exit_code(), 65);
        assert_eq!(printed(&session), "");
    }

    #[test]
    fn test_semantic_errors_stop_before_running() {
        let mut session: Session<Vec<u8>> = Session::with_output(Vec::new());
        let error: LoxError = session
            .run_source("test.lox", "print 1;\nbreak;")
            .expect_err("semantic error");

        assert!(matches!(error, LoxError::Semantic(_)));
        assert_eq!(error.exit_code(), 65);
        assert_eq!(
            error.to_string(),
            "test.lox:2:1: error: 'break' can only be used inside a loop\nbreak;\n~~~~~~"
        );
        assert_eq!(printed(&session), "");
    }

    #[test]
    fn test_all_diagnostics_are_reported_together() {
        let mut session: Session<Vec<u8>> = Session::with_output(Vec::new());
        let error: LoxError = session
            .run_source("test.lox", "var a = 1;\nvar a = 2;\nprint b;")
            .expect_err("semantic errors");

        let LoxError::Semantic(diagnostics) = error else {
            panic!("expected semantic errors");
        };
        assert_eq!(
            diagnostics.messages(),
            vec!["'a' has already been declared", "'b' has not been declared"]
        );
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let mut session: Session<Vec<u8>> = Session::with_output(Vec::new());
        let file: Rc<SourceFile> = SourceFile::new("bad.lox", vec![b'p', 0xff, 0xfe]);

        let error: LoxError = session.run(&file).expect_err("invalid utf-8");

        assert!(matches!(error, LoxError::Utf8(_)));
        assert_eq!(error.exit_code(), 74);
    }

    #[test]
    fn test_repl_state_survives_errors() {
        let mut session: Session<Vec<u8>> = Session::repl_with_output(Vec::new());

        let inputs: [(&str, bool); 10] = [
            ("var a = 1;", true),
            ("a + 1;", true),
            ("print b;", false),
            ("fun f() { return a * 10; }", true),
            ("f();", true),
            ("var a = 5;", true),
            ("f();", true),
            ("fun g() { return 1 / 0; }", true),
            ("g();", false),
            ("a;", true),
        ];

        for (code, succeeds) in inputs {
            let result = session.run_source("", code);
            assert_eq!(result.is_ok(), succeeds, "{}: {:?}", code, result.err());
        }

        assert_eq!(printed(&session), "2\n10\n50\n5\n");
    }

    #[test]
    fn test_repl_locals_across_inputs() {
        let mut session: Session<Vec<u8>> = Session::repl_with_output(Vec::new());

        session
            .run_source("", "{ var x = 1; print x; }")
            .expect("first input runs");
        session
            .run_source("", "{ var y = 2; { print y; } }")
            .expect("second input runs");
        session
            .run_source("", "fun add(n) { return fun (m) { return n + m; }; }")
            .expect("third input runs");
        session
            .run_source("", "add(3)(4);")
            .expect("fourth input runs");

        assert_eq!(printed(&session), "1\n2\n7\n");
    }

    #[test]
    fn test_repl_reports_undeclared_names_at_runtime() {
        let mut session: Session<Vec<u8>> = Session::repl_with_output(Vec::new());

        let error: LoxError = session
            .run_source("", "print missing;")
            .expect_err("runtime error");

        let LoxError::Runtime(error) = error else {
            panic!("expected a runtime error");
        };
        assert_eq!(error.message(), "'missing' has not been declared");
    }

    #[test]
    fn test_repl_functions_may_name_later_globals() {
        let mut session: Session<Vec<u8>> = Session::repl_with_output(Vec::new());

        session
            .run_source("", "fun f() { return later; }")
            .expect("function declared");

        let error: LoxError = session.run_source("", "print f();").expect_err("not yet declared");
        let LoxError::Runtime(error) = error else {
            panic!("expected a runtime error");
        };
        assert_eq!(error.message(), "'later' has not been declared");

        session.run_source("", "var later = 1;").expect("global declared");
        session.run_source("", "print f();").expect("call resolves by name");

        session
            .run_source("", "fun isEven(n) { return n == 0 ? true : isOdd(n - 1); }")
            .expect("first half declared");
        session
            .run_source("", "fun isOdd(n) { return n == 0 ? false : isEven(n - 1); }")
            .expect("second half declared");
        session.run_source("", "print isEven(4);").expect("mutual recursion runs");

        assert_eq!(printed(&session), "1\ntrue\n");
    }

    #[test]
    fn test_script_globals_defined_out_of_order() {
        let mut session: Session<Vec<u8>> = Session::with_output(Vec::new());

        session
            .run_source(
                "test.lox",
                "fun show() { print Greeter().greet(); }\n\
                 class Greeter { greet() { return \"hi \" + who; } }\n\
                 var who = \"there\";\n\
                 show();",
            )
            .expect("script runs");

        assert_eq!(printed(&session), "hi there\n");
    }
}
