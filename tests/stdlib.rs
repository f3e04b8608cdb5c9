mod common;

#[cfg(test)]
mod stdlib_tests {
    use super::common::{capture, output_of, runtime_error_of};

    use rox::callable::{NativeCallable, NativeFunction};
    use rox::error::RuntimeError;
    use rox::interpreter::Interpreter;
    use rox::token::Token;
    use rox::value::Value;

    #[test]
    fn test_clock_returns_seconds() {
        assert_eq!(
            output_of("var t = clock(); print t > 1000000000; print clock() >= t;"),
            vec!["true", "true"]
        );
    }

    #[test]
    fn test_array_methods() {
        assert_eq!(
            output_of(
                "var a = Array();
                 print a.push(1);
                 print a.push(\"two\");
                 a.push(3);
                 print a;
                 print a.length();
                 print a.pop();
                 print a.shift();
                 print a;
                 a.setAt(0, nil);
                 print a.getAt(0);"
            ),
            vec!["1", "2", "[1, two, 3]", "3", "3", "1", "[two]", "nil"]
        );
    }

    #[test]
    fn test_array_indexing() {
        assert_eq!(
            output_of(
                "var a = Array();
                 a.push(10); a.push(20);
                 a[1] = a[0] + 5;
                 print a[1];
                 print a;"
            ),
            vec!["15", "[10, 15]"]
        );
    }

    #[test]
    fn test_array_errors() {
        assert_eq!(
            runtime_error_of("Array().pop();"),
            "Cannot pop from empty array."
        );
        assert_eq!(
            runtime_error_of("Array().shift();"),
            "Cannot shift from empty array."
        );
        assert_eq!(
            runtime_error_of("var a = Array(); a.push(1); print a[1];"),
            "Index out of bounds: 1."
        );
        assert_eq!(
            runtime_error_of("var a = Array(); a.push(1); print a[\"0\"];"),
            "Index must be an integer, got string."
        );
        assert_eq!(
            runtime_error_of("var a = Array(); a.push(1); print a[0.5];"),
            "Index must be an integer, got number."
        );
        assert_eq!(
            runtime_error_of("var a = Array(); a.push(1); print a.getAt(-1);"),
            "Index out of bounds: -1."
        );
    }

    #[test]
    fn test_arrays_that_contain_themselves_print() {
        assert_eq!(
            output_of(
                "var a = Array();
                 a.push(a);
                 a.push(1);
                 print a;
                 var b = Array(); var c = Array();
                 b.push(c); c.push(b);
                 print b;
                 var shared = Array(); var twice = Array();
                 twice.push(shared); twice.push(shared);
                 print twice;"
            ),
            vec!["[[...], 1]", "[[[...]]]", "[[], []]"]
        );
    }

    #[test]
    fn test_native_methods_reject_foreign_receivers() {
        assert_eq!(
            runtime_error_of(
                "class MyList < Array {}
                 MyList().push(1);"
            ),
            "Method called on non-Array instance."
        );
    }

    #[test]
    fn test_native_methods_detach_from_their_receiver() {
        assert_eq!(
            output_of(
                "var a = Array(); var b = Array();
                 var pushA = a.push;
                 var pushB = b.push;
                 pushA(1); pushA(2); pushB(3);
                 print a; print b;"
            ),
            vec!["[1, 2]", "[3]"]
        );
    }

    #[test]
    fn test_string_methods_on_primitives_and_instances() {
        assert_eq!(
            output_of(
                "var s = \"Hello\";
                 print s.length();
                 print s.charAt(1);
                 print s.toUpperCase();
                 print s[4];
                 var w = String(\"MiXeD\");
                 print w.toLowerCase();
                 print w;
                 print w[0];
                 print String(12).length();"
            ),
            vec!["5", "e", "HELLO", "o", "mixed", "MiXeD", "M", "2"]
        );
    }

    #[test]
    fn test_string_index_errors() {
        assert_eq!(
            runtime_error_of("print \"abc\"[3];"),
            "Index out of bounds: 3."
        );
        assert_eq!(
            runtime_error_of("var s = \"abc\"; s[0] = \"x\";"),
            "Only arrays support index assignment."
        );
        assert_eq!(
            runtime_error_of("print 12[0];"),
            "Only arrays and strings can be indexed."
        );
        assert_eq!(
            runtime_error_of("print \"abc\".nope;"),
            "Undefined property 'nope'."
        );
    }

    #[test]
    fn test_math_statics() {
        assert_eq!(
            output_of(
                "print Math.abs(-3);
                 print Math.floor(2.7);
                 print Math.ceil(2.1);
                 print Math.sqrt(16);
                 print Math.min(3, 1);
                 print Math.max(3, 1);
                 print Math.PI > 3.14 and Math.PI < 3.15;
                 print Math.E > 2.71 and Math.E < 2.72;"
            ),
            vec!["3", "2", "3", "4", "1", "3", "true", "true"]
        );
    }

    #[test]
    fn test_math_errors() {
        assert_eq!(
            runtime_error_of("Math();"),
            "Cannot instantiate Math class."
        );
        assert_eq!(
            runtime_error_of("Math.abs(\"x\");"),
            "Argument to 'abs' must be a number, got string."
        );
        assert_eq!(
            runtime_error_of("Math.min(1);"),
            "Expected 2 arguments but got 1."
        );
    }

    #[test]
    fn test_native_values_print_their_kind() {
        assert_eq!(
            output_of("print Array; print Math; print Array().push;"),
            vec!["<native class Array>", "<native class Math>", "<native fn push>"]
        );
    }

    /// Host function calling its script-side argument twice.
    fn twice(
        _: Option<&Value>,
        args: &[Value],
        paren: &Token,
        interpreter: &mut Interpreter,
    ) -> Result<Value, RuntimeError> {
        interpreter.call_value(&args[0], Vec::new(), paren)?;
        interpreter.call_value(&args[0], Vec::new(), paren)
    }

    #[test]
    fn test_host_defined_natives_can_call_back_into_scripts() {
        let (mut lox, out, _err) = capture();
        lox.interpreter().define_global(
            "twice",
            Value::Native(NativeCallable::unbound(NativeFunction::new("twice", 1, twice))),
        );

        lox.run("var n = 0; print twice(fun () { n = n + 1; return n; }); var seen = n;");

        assert!(!lox.had_runtime_error());
        assert_eq!(out.contents(), "2\n");
        assert_eq!(lox.interpreter().global("seen"), Some(Value::Number(2.0)));
    }
}
