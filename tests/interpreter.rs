mod common;

#[cfg(test)]
mod interpreter_tests {
    use super::common::{capture, output_of, run, runtime_error_of};

    #[test]
    fn test_print_stringifies_values() {
        assert_eq!(
            output_of(
                "print 1; print 2.5; print -0; print nil; print true; print \"s\";
                 print 1 / 3 * 3; print 10 / 4;"
            ),
            vec!["1", "2.5", "-0", "nil", "true", "s", "1", "2.5"]
        );
    }

    #[test]
    fn test_block_shadowing() {
        assert_eq!(
            output_of("var a = 1; { var a = a + 1; print a; } print a;"),
            vec!["2", "1"]
        );
    }

    #[test]
    fn test_initializer_reads_enclosing_local() {
        assert_eq!(
            output_of("{ var a = 10; { var a = a * 2; print a; } print a; }"),
            vec!["20", "10"]
        );
    }

    #[test]
    fn test_initializer_reading_missing_name_fails_at_runtime() {
        assert_eq!(runtime_error_of("{ var b = b; }"), "Undefined variable 'b'.");
    }

    #[test]
    fn test_shadowing_in_block_does_not_leak_assignment() {
        assert_eq!(
            output_of("var a = \"outer\"; { var a = \"inner\"; a = \"changed\"; } print a;"),
            vec!["outer"]
        );
    }

    #[test]
    fn test_recursive_fibonacci() {
        assert_eq!(
            output_of(
                "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
                 print fib(6);"
            ),
            vec!["8"]
        );
    }

    #[test]
    fn test_closures_keep_independent_state() {
        assert_eq!(
            output_of(
                "fun makeCounter() {
                   var i = 0;
                   fun count() { i = i + 1; return i; }
                   return count;
                 }
                 var a = makeCounter();
                 var b = makeCounter();
                 print a(); print a(); print b();"
            ),
            vec!["1", "2", "1"]
        );
    }

    #[test]
    fn test_closure_sees_later_assignments_to_captured_variables() {
        assert_eq!(
            output_of(
                "var x = 1;
                 fun f() { return x; }
                 x = 2;
                 print f();
                 {
                   var y = \"before\";
                   fun g() { return y; }
                   y = \"after\";
                   print g();
                 }"
            ),
            vec!["2", "after"]
        );
    }

    #[test]
    fn test_closure_binds_lexically_not_dynamically() {
        assert_eq!(
            output_of(
                "var a = \"global\";
                 {
                   fun show() { print a; }
                   show();
                   var a = \"block\";
                   show();
                 }"
            ),
            vec!["global", "global"]
        );
    }

    #[test]
    fn test_closures_created_in_loops_capture_each_iteration_scope() {
        assert_eq!(
            output_of(
                "var fs = Array();
                 for (var i = 0; i < 3; i = i + 1) {
                   var j = i;
                   fs.push(fun () { return j; });
                 }
                 print fs[0]() + fs[1]() + fs[2]();"
            ),
            vec!["3"]
        );
    }

    #[test]
    fn test_classes_fields_and_methods() {
        assert_eq!(
            output_of(
                "class Point {
                   init(x, y) { this.x = x; this.y = y; }
                   sum() { return this.x + this.y; }
                 }
                 var p = Point(1, 2);
                 print p.sum();
                 p.x = 10;
                 print p.sum();
                 print p;
                 print Point;"
            ),
            vec!["3", "12", "Point instance", "Point"]
        );
    }

    #[test]
    fn test_inheritance_and_this() {
        assert_eq!(
            output_of(
                "class A { name() { return \"A\"; } greet() { return \"hi \" + this.name(); } }
                 class B < A { name() { return \"B\"; } }
                 print B().greet();"
            ),
            vec!["hi B"]
        );
    }

    #[test]
    fn test_super_calls_superclass_method() {
        assert_eq!(
            output_of(
                "class A { m() { return \"A\"; } }
                 class B < A { m() { return \"B\" + super.m(); } }
                 class C < B { m() { return \"C\" + super.m(); } }
                 print C().m();"
            ),
            vec!["CBA"]
        );
    }

    #[test]
    fn test_bound_methods_remember_their_receiver() {
        assert_eq!(
            output_of(
                "class Box { init(v) { this.v = v; } get() { return this.v; } }
                 var a = Box(1);
                 var b = Box(2);
                 var ga = a.get;
                 var gb = b.get;
                 print ga(); print gb(); print ga();"
            ),
            vec!["1", "2", "1"]
        );
    }

    #[test]
    fn test_fields_shadow_methods() {
        assert_eq!(
            output_of(
                "class A { m() { return 1; } }
                 var a = A();
                 a.m = fun () { return 2; };
                 print a.m();"
            ),
            vec!["2"]
        );
    }

    #[test]
    fn test_initializer_returns_this() {
        assert_eq!(
            output_of(
                "class A { init() { this.v = 1; return; } }
                 var a = A();
                 print a.init() == a;
                 print a.v;"
            ),
            vec!["true", "1"]
        );
    }

    #[test]
    fn test_static_methods_and_fields() {
        assert_eq!(
            output_of(
                "class Counter {
                   static next() { Counter.count = Counter.count + 1; return Counter.count; }
                 }
                 Counter.count = 0;
                 Counter.next();
                 print Counter.next();
                 class Sub < Counter {}
                 print Sub.next();"
            ),
            vec!["2", "3"]
        );
    }

    #[test]
    fn test_static_method_sees_class_as_this() {
        assert_eq!(
            output_of("class A { static me() { return this; } } print A.me() == A;"),
            vec!["true"]
        );
    }

    #[test]
    fn test_break_and_continue() {
        assert_eq!(
            output_of(
                "var i = 0;
                 while (true) {
                   i = i + 1;
                   if (i == 2) continue;
                   if (i > 4) break;
                   print i;
                 }"
            ),
            vec!["1", "3", "4"]
        );
    }

    #[test]
    fn test_continue_in_for_runs_the_increment() {
        assert_eq!(
            output_of(
                "for (var i = 0; i < 5; i = i + 1) {
                   if (i == 1 or i == 3) continue;
                   print i;
                 }"
            ),
            vec!["0", "2", "4"]
        );
    }

    #[test]
    fn test_break_only_leaves_the_innermost_loop() {
        assert_eq!(
            output_of(
                "for (var i = 0; i < 2; i = i + 1) {
                   for (var j = 0; j < 10; j = j + 1) { if (j == 1) break; print i + j; }
                 }"
            ),
            vec!["0", "1"]
        );
    }

    #[test]
    fn test_return_from_inside_loop() {
        assert_eq!(
            output_of(
                "fun first(n) { for (var i = 0; ; i = i + 1) { if (i * i >= n) return i; } }
                 print first(10);"
            ),
            vec!["4"]
        );
    }

    #[test]
    fn test_ternary_and_comma() {
        assert_eq!(
            output_of(
                "print true ? 1 : 2;
                 print nil ? 1 : false ? 2 : 3;
                 var a = 0;
                 print (a = 1, a + 1);"
            ),
            vec!["1", "3", "2"]
        );
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(
            output_of("print nil or \"x\"; print 1 and 2; print false and boom;"),
            vec!["x", "2", "false"]
        );
    }

    #[test]
    fn test_string_concatenation_with_any_value() {
        assert_eq!(
            output_of("print \"a\" + 1; print 2 + \"b\"; print \"n\" + nil;"),
            vec!["a1", "2b", "nnil"]
        );
    }

    #[test]
    fn test_functions_print_with_their_names() {
        assert_eq!(
            output_of("fun f() {} print f; print fun () {}; print clock;"),
            vec!["<fn f>", "<fn>", "<native fn clock>"]
        );
    }

    #[test]
    fn test_runtime_errors() {
        assert_eq!(runtime_error_of("print -\"a\";"), "Operand must be a number.");
        assert_eq!(runtime_error_of("print 1 < \"a\";"), "Operands must be numbers.");
        assert_eq!(runtime_error_of("print 1 / 0;"), "Division by zero.");
        assert_eq!(runtime_error_of("print x;"), "Undefined variable 'x'.");
        assert_eq!(runtime_error_of("x = 1;"), "Undefined variable 'x'.");
        assert_eq!(runtime_error_of("\"s\"();"), "Can only call functions and classes.");
        assert_eq!(runtime_error_of("print 1.x;"), "Only instances have properties.");
        assert_eq!(runtime_error_of("var n = 1; n.x = 1;"), "Only instances have fields.");
        assert_eq!(
            runtime_error_of("class A {} print A().nope;"),
            "Undefined property 'nope'."
        );
        assert_eq!(
            runtime_error_of("var NotAClass = 1; class B < NotAClass {}"),
            "Superclass must be a class."
        );
    }

    #[test]
    fn test_arity_mismatch_reports_call_line() {
        let outcome = run("fun f(a, b) {}\n\nf(1);");

        assert!(outcome.had_runtime_error);
        assert_eq!(outcome.stderr, "Expected 2 arguments but got 1.\n[line 3]\n");
    }

    #[test]
    fn test_recursion_up_to_the_call_limit() {
        assert_eq!(
            output_of(
                "fun depth(n) { if (n == 0) return 0; return 1 + depth(n - 1); }
                 print depth(500);"
            ),
            vec!["500"]
        );
    }

    #[test]
    fn test_runaway_recursion_reports_stack_overflow() {
        assert_eq!(
            runtime_error_of(
                "fun depth(n) { if (n == 0) return 0; return 1 + depth(n - 1); }
                 print depth(600);"
            ),
            "Stack overflow."
        );
        assert_eq!(
            runtime_error_of("fun forever() { return forever(); } forever();"),
            "Stack overflow."
        );
    }

    #[test]
    fn test_class_arity_comes_from_init() {
        assert_eq!(
            runtime_error_of("class A { init(a) {} } A();"),
            "Expected 1 arguments but got 0."
        );
    }

    #[test]
    fn test_runtime_error_stops_the_program() {
        let outcome = run("print 1; print nil + 1; print 2;");

        assert_eq!(outcome.lines(), vec!["1"]);
        assert!(outcome.had_runtime_error);
        assert!(!outcome.had_error);
    }

    #[test]
    fn test_static_errors_prevent_execution() {
        let outcome = run("print 1;\nreturn 2;\nprint (;");

        assert!(outcome.had_error);
        assert!(!outcome.had_runtime_error);
        assert_eq!(outcome.stdout, "");
        assert_eq!(
            outcome.stderr,
            "[line 3] Error at ';': Expect expression.\n\
             [line 2] Error at 'return': Cannot return from top-level code.\n"
        );
    }

    #[test]
    fn test_state_persists_between_runs_and_flags_reset() {
        let (mut lox, out, _err) = capture();

        lox.run("var a = 1;");
        lox.run("print a + 1;");
        lox.run("print missing;");
        assert!(lox.had_runtime_error());
        assert_eq!(lox.exit_code(), 70);

        lox.reset_errors();
        lox.run("fun f() { return a; } print f();");

        assert!(!lox.had_runtime_error());
        assert_eq!(lox.exit_code(), 0);
        assert_eq!(out.contents(), "2\n1\n");
    }

    #[test]
    fn test_prompt_runs_each_line() {
        let (mut lox, out, err) = capture();
        let mut prompt: Vec<u8> = Vec::new();

        lox.run_prompt("var a = 2;\nprint a * 3;\nprint b;\nprint a;\n".as_bytes(), &mut prompt)
            .unwrap();

        assert_eq!(out.contents(), "6\n2\n");
        assert_eq!(err.contents(), "Undefined variable 'b'.\n[line 1]\n");
        assert!(!lox.had_runtime_error());
        assert!(String::from_utf8(prompt).unwrap().starts_with("> "));
    }
}
