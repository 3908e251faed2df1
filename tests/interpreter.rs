#[cfg(test)]
mod interpreter_tests {
    use std::thread;

    use rox as lox;

    use lox::error::RuntimeError;
    use lox::value::Value;
    use lox::{LoxError, Session};

    /// Run a script, returning what it printed and the error it stopped with.
    fn run(code: &str) -> (String, Option<LoxError>) {
        let mut session: Session<Vec<u8>> = Session::with_output(Vec::new());
        let result = session.run_source("test.lox", code);
        let output: String = String::from_utf8_lossy(session.interpreter().output()).into_owned();

        (output, result.err())
    }

    fn output(code: &str) -> String {
        let (output, error) = run(code);
        if let Some(error) = error {
            panic!("unexpected error:\n{}", error);
        }

        output
    }

    fn runtime_error(code: &str) -> RuntimeError {
        match run(code).1 {
            Some(LoxError::Runtime(error)) => error,
            Some(other) => panic!("expected a runtime error, got:\n{}", other),
            None => panic!("expected a runtime error"),
        }
    }

    fn runtime_message(code: &str) -> String {
        runtime_error(code).message().to_string()
    }

    // ─── expressions ───

    #[test]
    fn test_arithmetic_and_concatenation() {
        assert_eq!(
            output(
                "print 1 + 2;\n\
                 print 7 / 2;\n\
                 print 7 % 3;\n\
                 print -(2 * 3);\n\
                 print \"a\" + \"b\";\n\
                 print \"ab\" * 3;\n\
                 print 2 * [0];\n\
                 print [1] + [2];"
            ),
            "3\n3.5\n1\n-6\nab\nababab\n[0, 0]\n[1, 2]\n"
        );
    }

    #[test]
    fn test_comparison_and_equality() {
        assert_eq!(
            output(
                "print 1 == 1.0;\n\
                 print nil == false;\n\
                 print \"1\" == 1;\n\
                 print \"a\" < \"b\";\n\
                 print 2 >= 3;\n\
                 var l = [1];\n\
                 print l == l;\n\
                 print [1] == [1];\n\
                 print [1, [\"a\", nil]] == [1, [\"a\", nil]];\n\
                 print [1, 2] == [2, 1];\n\
                 print [1] == [1, 1];\n\
                 print [1] != \"[1]\";"
            ),
            "true\nfalse\nfalse\ntrue\nfalse\ntrue\ntrue\ntrue\nfalse\nfalse\ntrue\n"
        );
    }

    #[test]
    fn test_truthiness_and_logic() {
        assert_eq!(
            output(
                "print !nil;\n\
                 print !0;\n\
                 print !\"\";\n\
                 print nil or \"x\";\n\
                 print 1 and 2;\n\
                 print false and error(\"not evaluated\");\n\
                 print true ? 1 : 2;\n\
                 print (1, 2);"
            ),
            "true\nfalse\nfalse\nx\n2\nfalse\n1\n2\n"
        );
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(
            output("print 10;\nprint 0.1 + 0.2;\nprint -0.5;\nprint 1000000 * 1000000000000;"),
            "10\n0.30000000000000004\n-0.5\n1000000000000000000\n"
        );
    }

    // ─── statements ───

    #[test]
    fn test_scopes_and_shadowing() {
        assert_eq!(
            output(
                "var a = \"global\";\n\
                 {\n\
                   var a = \"outer\";\n\
                   {\n\
                     var a = \"inner\";\n\
                     print a;\n\
                   }\n\
                   print a;\n\
                 }\n\
                 print a;"
            ),
            "inner\nouter\nglobal\n"
        );
    }

    #[test]
    fn test_while_break_continue() {
        assert_eq!(
            output(
                "var i = 0;\n\
                 while (true) {\n\
                   i = i + 1;\n\
                   if (i == 2) continue;\n\
                   if (i > 3) break;\n\
                   print i;\n\
                 }"
            ),
            "1\n3\n"
        );
    }

    #[test]
    fn test_for_loop_continue_runs_update() {
        assert_eq!(
            output(
                "for (var i = 0; i < 5; i = i + 1) {\n\
                   if (i % 2 == 0) continue;\n\
                   print i;\n\
                 }"
            ),
            "1\n3\n"
        );
    }

    #[test]
    fn test_for_loop_closures_capture_each_iteration() {
        assert_eq!(
            output(
                "var fns = [];\n\
                 for (var i = 0; i < 3; i = i + 1) {\n\
                   fns.push(fun () { return i; });\n\
                 }\n\
                 print fns[0]();\n\
                 print fns[2]();"
            ),
            "0\n2\n"
        );
    }

    // ─── functions ───

    #[test]
    fn test_closures_share_state() {
        assert_eq!(
            output(
                "fun makeCounter() {\n\
                   var i = 0;\n\
                   fun count() {\n\
                     i = i + 1;\n\
                     return i;\n\
                   }\n\
                   return count;\n\
                 }\n\
                 var c = makeCounter();\n\
                 print c();\n\
                 print c();\n\
                 print makeCounter()();"
            ),
            "1\n2\n1\n"
        );
    }

    #[test]
    fn test_recursion_and_forward_references() {
        assert_eq!(
            output(
                "fun isEven(n) { return n == 0 ? true : isOdd(n - 1); }\n\
                 fun isOdd(n) { return n == 0 ? false : isEven(n - 1); }\n\
                 print isEven(10);\n\
                 fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }\n\
                 print fib(15);"
            ),
            "true\n610\n"
        );
    }

    #[test]
    fn test_return_without_value() {
        assert_eq!(output("fun f() { return; }\nprint f();"), "nil\n");
        assert_eq!(output("fun f() {}\nprint f();"), "nil\n");
    }

    #[test]
    fn test_callable_display() {
        assert_eq!(
            output(
                "fun f() {}\n\
                 class A { m() {} }\n\
                 print f;\n\
                 print fun () {};\n\
                 print clock;\n\
                 print A().m;\n\
                 print [].push;\n\
                 print A;\n\
                 print A();"
            ),
            "[function f]\n\
             [function (anonymous)]\n\
             [built-in function clock]\n\
             [bound method A.m]\n\
             [built-in method list.push]\n\
             [class A]\n\
             [A object]\n"
        );
    }

    #[test]
    fn test_builtin_type() {
        assert_eq!(
            output(
                "class A {}\n\
                 print type(1);\n\
                 print type(\"s\");\n\
                 print type(nil);\n\
                 print type(true);\n\
                 print type([]);\n\
                 print type(clock);\n\
                 print type(A);\n\
                 print type(A());"
            ),
            "number\nstring\nnil\nbool\nlist\nfunction\nA class\nA\n"
        );
    }

    #[test]
    fn test_host_functions_can_be_replaced() {
        fn fixed_clock(_args: &[Value]) -> Result<Value, String> {
            Ok(Value::Number(42.0))
        }

        let mut session: Session<Vec<u8>> = Session::with_output(Vec::new());
        session.interpreter_mut().define_native("clock", &[], fixed_clock);
        session
            .run_source("test.lox", "print clock();")
            .expect("script runs");

        assert_eq!(session.interpreter().output().as_slice(), b"42\n");
    }

    // ─── classes ───

    #[test]
    fn test_inheritance_and_super() {
        assert_eq!(
            output(
                "class Animal {\n\
                   init(name) { this.name = name; }\n\
                   speak() { return this.name + \" makes a sound\"; }\n\
                 }\n\
                 class Dog < Animal {\n\
                   speak() { return super.speak() + \" (woof)\"; }\n\
                 }\n\
                 var d = Dog(\"Rex\");\n\
                 print d.speak();\n\
                 print d.name;"
            ),
            "Rex makes a sound (woof)\nRex\n"
        );
    }

    #[test]
    fn test_initializer_returns_instance() {
        assert_eq!(
            output(
                "class A {\n\
                   init() { this.x = 1; return; }\n\
                 }\n\
                 var a = A();\n\
                 print a.init() == a;\n\
                 print a.x;"
            ),
            "true\n1\n"
        );
    }

    #[test]
    fn test_fields_shadow_methods() {
        assert_eq!(
            output(
                "class A { m() { return \"method\"; } }\n\
                 var a = A();\n\
                 print a.m();\n\
                 a.m = fun () { return \"field\"; };\n\
                 print a.m();"
            ),
            "method\nfield\n"
        );
    }

    #[test]
    fn test_static_members_and_accessors() {
        assert_eq!(
            output(
                "class Circle {\n\
                   init(r) { this.r = r; }\n\
                   static unit() { return Circle(1); }\n\
                   static get name() { return \"circle\"; }\n\
                   get area() { return 3 * this.r * this.r; }\n\
                   get radius() { return this.r; }\n\
                   set radius(value) { this.r = value; }\n\
                 }\n\
                 var c = Circle.unit();\n\
                 print c.area;\n\
                 c.radius = 2;\n\
                 print c.radius;\n\
                 print c.area;\n\
                 print Circle.name;\n\
                 Circle.count = 5;\n\
                 print Circle.count;"
            ),
            "3\n2\n12\ncircle\n5\n"
        );
    }

    #[test]
    fn test_static_super_dispatch() {
        assert_eq!(
            output(
                "class A { static make() { return \"A\"; } }\n\
                 class B < A { static make() { return super.make() + \"B\"; } }\n\
                 print B.make();"
            ),
            "AB\n"
        );
    }

    // ─── lists ───

    #[test]
    fn test_list_operations() {
        assert_eq!(
            output(
                "var l = [1, 2];\n\
                 l.push(3);\n\
                 print l.length;\n\
                 print l.pop();\n\
                 print l;\n\
                 l[0] = \"a\";\n\
                 print l[0];\n\
                 print [[1], \"s\", nil];"
            ),
            "3\n3\n[1, 2]\na\n[[1], s, nil]\n"
        );
    }

    // ─── runtime errors ───

    #[test]
    fn test_operator_errors() {
        assert_eq!(runtime_message("print 1 / 0;"), "cannot divide by 0");
        assert_eq!(runtime_message("print 1 % 0;"), "cannot modulo by 0");
        assert_eq!(
            runtime_message("print -\"a\";"),
            "'-' operator cannot be used with type 'string'"
        );
        assert_eq!(
            runtime_message("print 1 + \"a\";"),
            "'+' operator cannot be used with types 'number' and 'string'"
        );
        assert_eq!(
            runtime_message("print \"ab\" * 1.5;"),
            "cannot multiply 'string' by non-integer 'number'"
        );
        assert_eq!(
            runtime_message("print [1] * -1;"),
            "cannot multiply 'list' by negative 'number'"
        );
    }

    #[test]
    fn test_error_position_after_wide_characters() {
        assert_eq!(
            runtime_error("print \"日本\" - 1;").to_string(),
            "test.lox:1:14: error: '-' operator cannot be used with types 'string' and 'number'\n\
             print \"日本\" - 1;\n             ~"
        );
    }

    #[test]
    fn test_oversized_repetition_is_an_error() {
        assert_eq!(
            runtime_message("print [1, 2] * 10000000000000000000;"),
            "cannot multiply 'list' by 'number': result too large"
        );
        assert_eq!(
            runtime_message("print \"ab\" * 10000000000000000000;"),
            "cannot multiply 'string' by 'number': result too large"
        );
        assert_eq!(
            runtime_message("print 3000000000 * \"ab\";"),
            "cannot multiply 'string' by 'number': result too large"
        );

        // nothing to repeat
        assert_eq!(
            output("print [] * 10000000000000000000;\nprint \"\" * 10000000000000000000 + \"!\";"),
            "[]\n!\n"
        );
    }

    #[test]
    fn test_index_errors() {
        assert_eq!(
            runtime_message("print [1][1];"),
            "index 1 out of bounds for list of length 1"
        );
        assert_eq!(
            runtime_message("print [1][-1];"),
            "index (-1) must not be negative"
        );
        assert_eq!(
            runtime_message("print [1][\"a\"];"),
            "index (\"a\") must be a non-negative integer"
        );
        assert_eq!(
            runtime_message("print [1][0.5];"),
            "index (0.5) must be a non-negative integer"
        );
        assert_eq!(runtime_message("print 1[0];"), "'number' object is not indexable");
        assert_eq!(runtime_message("[].pop();"), "pop from empty 'list'");
    }

    #[test]
    fn test_call_errors() {
        assert_eq!(
            runtime_message("print 1(2);"),
            "'number' object is not callable"
        );
        assert_eq!(
            runtime_message("fun f(a, b) { return a + b; }\nf();"),
            "f() missing 2 arguments: a and b"
        );
        assert_eq!(
            runtime_message("fun f(a, b, c) { return [a, b, c]; }\nf();"),
            "f() missing 3 arguments: a, b, and c"
        );
        assert_eq!(
            runtime_message("class P { init(x) { this.x = x; } }\nP();"),
            "P.init() missing 1 argument: x"
        );
        assert_eq!(
            runtime_message("fun f(a) { return a; }\nf(1, 2, 3);"),
            "f() accepts 1 arguments but 3 were given"
        );
        assert_eq!(runtime_message("error(\"boom\");"), "boom");
    }

    #[test]
    fn test_extra_arguments_are_highlighted() {
        let error: RuntimeError = runtime_error("fun f(a) { return a; }\nf(1, 2, 3);");

        assert_eq!(error.range().start.line, 2);
        assert_eq!(error.range().start.column, 5);
        assert_eq!(error.range().end.column, 9);
    }

    #[test]
    fn test_property_errors() {
        assert_eq!(
            runtime_message("print nil.x;"),
            "'nil' object has no property 'x'"
        );
        assert_eq!(
            runtime_message("class A {}\nprint A().x;"),
            "'A' object has no property 'x'"
        );
        assert_eq!(
            runtime_message("var a = 1;\na.x = 2;"),
            "property assignment is not valid for 'number' object"
        );
        assert_eq!(
            runtime_message("class A { get x() { return 1; } }\nvar a = A();\na.x = 2;"),
            "property 'x' of 'A' object is read-only"
        );
        assert_eq!(
            runtime_message("class A {}\nclass B < A { m() { return super.m(); } }\nB().m();"),
            "'A' class has no method 'm'"
        );
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        assert_eq!(
            runtime_message("var x = 1;\nclass A < x {}"),
            "superclass must be a class, not 'number'"
        );
    }

    #[test]
    fn test_forward_reference_read_too_early() {
        assert_eq!(
            runtime_message("fun f() { return g; }\nprint f();\nvar g = 1;"),
            "'g' has not been defined"
        );
    }

    #[test]
    fn test_output_before_an_error_is_kept() {
        let (output, error) = run("print 1;\nprint 1 / 0;\nprint 2;");

        assert_eq!(output, "1\n");
        assert_eq!(error.map(|e| e.exit_code()), Some(70));
    }

    // ─── stack traces ───

    #[test]
    fn test_top_level_errors_have_no_trace() {
        let error: RuntimeError = runtime_error("print 1 / 0;");

        assert!(error.trace.is_empty());
        assert_eq!(
            error.to_string(),
            "test.lox:1:9: error: cannot divide by 0\nprint 1 / 0;\n        ~"
        );
    }

    #[test]
    fn test_stack_trace() {
        let error: RuntimeError = runtime_error(
            "fun inner() {\n  return 1 / 0;\n}\nfun outer() {\n  return inner();\n}\nouter();",
        );

        let frames: Vec<(&str, usize, usize)> = error
            .trace
            .iter()
            .map(|f| (f.function.as_str(), f.location.line, f.location.column))
            .collect();

        assert_eq!(frames, vec![("inner", 2, 11), ("outer", 5, 9), ("", 7, 0)]);

        let rendered: String = error.to_string();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "test.lox:2:12: error: cannot divide by 0");
        assert_eq!(lines[3], "Stack Trace (most recent call first):");
        assert_eq!(lines[4], "  test.lox:2:12 in inner return 1 / 0;");
        assert_eq!(lines[5], "  test.lox:5:10 in outer return inner();");
        assert_eq!(lines[6].trim_end(), "  test.lox:7:1           outer();");
    }

    #[test]
    fn test_call_depth_is_limited() {
        let message: String = thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(|| runtime_message("fun f() { return f(); }\nf();"))
            .expect("spawn test thread")
            .join()
            .expect("test thread finished");

        assert_eq!(message, "maximum call stack depth exceeded");
    }
}
