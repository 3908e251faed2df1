#[cfg(test)]
mod parser_tests {
    use std::rc::Rc;

    use rox as lox;

    use lox::ast::*;
    use lox::ast_printer::AstPrinter;
    use lox::parser::{parse, Parser};
    use lox::token::SourceFile;

    fn source(code: &str) -> Rc<SourceFile> {
        SourceFile::new("test.lox", code.to_string())
    }

    /// Parse without errors and render in prefix form.
    fn print(code: &str) -> String {
        let (program, errors) = parse(&source(code));
        assert!(errors.is_empty(), "unexpected errors:\n{}", errors);

        AstPrinter::print_program(&program)
    }

    fn error_messages(code: &str) -> Vec<String> {
        let (_, errors) = parse(&source(code));
        errors.messages().into_iter().map(String::from).collect()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(print("print 1 + 2 * 3;"), "(print (+ 1.0 (* 2.0 3.0)))");
        assert_eq!(print("print -a % 2 < 3 == !b;"), "(print (== (< (% (- a) 2.0) 3.0) (! b)))");
        assert_eq!(print("print a or b and c;"), "(print (or a (and b c)))");
    }

    #[test]
    fn test_ternary_is_right_associative() {
        assert_eq!(print("a ? b : c ? d : e;"), "(; (?: a b (?: c d e)))");
    }

    #[test]
    fn test_comma_binds_loosest() {
        assert_eq!(print("a = 1, 2;"), "(; (, (= a 1.0) 2.0))");
        assert_eq!(print("f(1, 2);"), "(; (call f 1.0 2.0))");
    }

    #[test]
    fn test_assignment_targets() {
        assert_eq!(print("a.b.c = 1;"), "(; (= (. (. a b) c) 1.0))");
        assert_eq!(print("a[0] = 1;"), "(; (= ([] a 0.0) 1.0))");
        assert_eq!(error_messages("1 = 2;"), vec!["invalid assignment target"]);
    }

    #[test]
    fn test_lists_allow_trailing_comma() {
        assert_eq!(print("print [1, 2,];"), "(print (list 1.0 2.0))");
        assert_eq!(print("print [];"), "(print (list))");
    }

    #[test]
    fn test_statements() {
        assert_eq!(
            print("for (var i = 0; i < 3; i = i + 1) { continue; }"),
            "(for (var i 0.0) (< i 3.0) (= i (+ i 1.0)) (block (continue)))"
        );
        assert_eq!(print("for (;;) break;"), "(for ; ; ; (break))");
        assert_eq!(print("if (a) print 1; else print 2;"), "(if a (print 1.0) (print 2.0))");
        assert_eq!(print("while (a) {}"), "(while a (block))");
    }

    #[test]
    fn test_function_literal_and_declaration() {
        assert_eq!(print("fun f(a, b) { return a; }"), "(fun f (a b) (return a))");
        assert_eq!(print("var g = fun () {};"), "(var g (fun ()))");
    }

    #[test]
    fn test_class_members() {
        let (program, errors) = parse(&source(
            "class A < B { init() {} static make() {} get size() { return 1; } set size(v) {} }",
        ));
        assert!(errors.is_empty());

        let StmtKind::Class(decl) = &program.stmts[0].kind else {
            panic!("expected a class declaration");
        };

        assert_eq!(decl.name.name, "A");
        assert_eq!(decl.superclass.as_ref().map(|s| s.name.as_str()), Some("B"));

        let summary: Vec<(bool, Option<Accessor>, &str)> = decl
            .methods
            .iter()
            .map(|m| (m.is_static, m.accessor, m.name.name.as_str()))
            .collect();

        assert_eq!(
            summary,
            vec![
                (false, None, "init"),
                (true, None, "make"),
                (false, Some(Accessor::Get), "size"),
                (false, Some(Accessor::Set), "size"),
            ]
        );
        assert!(decl.methods[0].is_init());
        assert!(!decl.methods[1].is_init());
    }

    #[test]
    fn test_synchronisation_reports_each_error_once() {
        let (program, errors) = parse(&source("var = 1;\nprint 2;\nprint ;\n"));

        assert_eq!(errors.messages(), vec!["expected variable name", "expected expression"]);
        assert_eq!(program.stmts.len(), 3);
        assert!(matches!(program.stmts[0].kind, StmtKind::Illegal));
        assert!(matches!(program.stmts[1].kind, StmtKind::Print(_)));
        assert!(matches!(program.stmts[2].kind, StmtKind::Illegal));
    }

    #[test]
    fn test_missing_left_operand() {
        assert_eq!(
            error_messages("print * 2;"),
            vec!["binary operator '*' must have left and right operands"]
        );
        assert_eq!(
            error_messages("print == 1 + 2;"),
            vec!["binary operator '==' must have left and right operands"]
        );
    }

    #[test]
    fn test_missing_tokens() {
        assert_eq!(error_messages("print 1"), vec!["expected ';'"]);
        assert_eq!(error_messages("if a) print 1;"), vec!["expected '('"]);
        assert_eq!(error_messages("class { }"), vec!["expected class name"]);
        assert_eq!(error_messages("fun f(1) {}"), vec!["expected parameter name"]);
    }

    #[test]
    fn test_diagnostic_rendering() {
        let (_, errors) = parse(&source("print \"bar;"));

        assert_eq!(
            errors.to_string(),
            "test.lox:1:7: error: unterminated string literal\nprint \"bar;\n      ~~~~~"
        );
    }

    #[test]
    fn test_columns_count_wide_characters_twice() {
        let (_, errors) = parse(&source("print \"日本\" 1;"));

        assert_eq!(
            errors.to_string(),
            "test.lox:1:14: error: expected ';'\nprint \"日本\" 1;\n             ~"
        );

        let (_, errors) = parse(&source("\tprint 1 2;"));

        assert_eq!(
            errors.to_string(),
            "test.lox:1:10: error: expected ';'\n\tprint 1 2;\n\t        ~"
        );
    }

    #[test]
    fn test_node_ids_are_unique_and_seeded() {
        let file = source("var a = b + c;");
        let mut parser = Parser::with_first_node_id(&file, 100);
        let (program, errors) = parser.parse();
        assert!(errors.is_empty());

        let StmtKind::Var { name, initializer } = &program.stmts[0].kind else {
            panic!("expected a var declaration");
        };
        let Some(Expr {
            kind: ExprKind::Binary { left, right, .. },
            ..
        }) = initializer
        else {
            panic!("expected a binary initializer");
        };
        let (ExprKind::Variable(b), ExprKind::Variable(c)) = (&left.kind, &right.kind) else {
            panic!("expected variable operands");
        };

        assert_eq!(name.id, NodeId(100));
        assert_eq!(b.id, NodeId(101));
        assert_eq!(c.id, NodeId(102));
        assert_eq!(parser.next_node_id(), 103);
    }

    #[test]
    fn test_ranges_cover_whole_nodes() {
        let file = source("print foo.bar(1)[2];");
        let (program, _) = parse(&file);

        let StmtKind::Print(expr) = &program.stmts[0].kind else {
            panic!("expected a print statement");
        };

        assert_eq!(expr.range.start.column, 6);
        assert_eq!(expr.range.end.column, 19);
        assert_eq!(program.stmts[0].range.end.column, 20);
    }

    #[test]
    fn test_json_dump() {
        let (program, _) = parse(&source("print 1;"));
        let json: serde_json::Value = serde_json::to_value(&program).expect("serialisable");

        assert!(json["stmts"][0]["kind"].get("Print").is_some());
        assert_eq!(json["stmts"][0]["range"]["start"]["line"], 1);
    }
}
