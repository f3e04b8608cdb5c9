#[cfg(test)]
mod resolver_tests {
    use rox as lox;

    use lox::ast::{Expr, Stmt};
    use lox::error::LoxError;
    use lox::parser::Parser;
    use lox::resolver::{Resolution, Resolver};
    use lox::scanner::Scanner;

    fn program(source: &str) -> Vec<Stmt> {
        let (tokens, errors) = Scanner::new(source).scan_tokens();
        assert!(errors.is_empty());
        let output = Parser::new(tokens).parse();
        assert!(output.errors.is_empty(), "parse errors: {:?}", output.errors);
        output.statements
    }

    fn resolve(source: &str) -> Resolution {
        Resolver::new().resolve(&program(source))
    }

    fn messages(source: &str) -> Vec<String> {
        resolve(source)
            .errors
            .iter()
            .map(LoxError::to_string)
            .collect()
    }

    #[test]
    fn test_globals_are_left_unresolved() {
        let resolution = resolve("var a = 1; print a;");
        assert!(resolution.errors.is_empty());
        assert!(resolution.locals.is_empty());
    }

    #[test]
    fn test_locals_record_scope_distance() {
        let statements = program("{ var a = 1; { print a; } }");
        let resolution = Resolver::new().resolve(&statements);

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected block");
        };
        let Stmt::Block(inner) = &outer[1] else {
            panic!("expected inner block");
        };
        let Stmt::Print {
            expression: Expr::Variable { id, .. },
            ..
        } = &inner[0]
        else {
            panic!("expected print of a variable");
        };

        assert_eq!(resolution.locals.get(id), Some(&1));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let statements = program(
            "fun outer() { var x = 1; fun inner() { return x; } return inner; }
             class A { m() { return this; } }",
        );

        let first = Resolver::new().resolve(&statements);
        let second = Resolver::new().resolve(&statements);

        assert!(first.errors.is_empty());
        assert_eq!(first.locals, second.locals);
    }

    #[test]
    fn test_initializer_reads_the_enclosing_binding() {
        let statements = program("{ var a = 1; { var a = a + 1; } }");
        let resolution = Resolver::new().resolve(&statements);
        assert!(resolution.errors.is_empty());

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected block");
        };
        let Stmt::Block(inner) = &outer[1] else {
            panic!("expected inner block");
        };
        let Stmt::Var {
            initializer: Some(Expr::Binary { left, .. }),
            ..
        } = &inner[0]
        else {
            panic!("expected var with binary initializer");
        };
        let Expr::Variable { id, .. } = left.as_ref() else {
            panic!("expected variable operand");
        };

        assert_eq!(resolution.locals.get(id), Some(&1));
    }

    #[test]
    fn test_initializer_without_enclosing_local_falls_back_to_global() {
        let resolution = resolve("{ var a = a; }");
        assert!(resolution.errors.is_empty());
        assert!(resolution.locals.is_empty());
    }

    #[test]
    fn test_redeclaration_in_same_local_scope() {
        assert_eq!(
            messages("fun f() { var a = 1; var a = 2; }"),
            vec!["[line 1] Error at 'a': Variable with this name already declared in this scope."]
        );

        assert!(messages("var a = 1; var a = 2;").is_empty());
    }

    #[test]
    fn test_invalid_returns() {
        assert_eq!(
            messages("return 1;"),
            vec!["[line 1] Error at 'return': Cannot return from top-level code."]
        );

        assert_eq!(
            messages("class A { init() { return 1; } }"),
            vec!["[line 1] Error at 'return': Cannot return a value from an initializer."]
        );

        // a bare return in an initializer is fine
        assert!(messages("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn test_misplaced_this_and_super() {
        assert_eq!(
            messages("print this;"),
            vec!["[line 1] Error at 'this': Cannot use 'this' outside of a class."]
        );

        assert_eq!(
            messages("fun f() { super.m(); }"),
            vec!["[line 1] Error at 'super': Cannot use 'super' outside of a class."]
        );

        assert_eq!(
            messages("class A { m() { super.m(); } }"),
            vec!["[line 1] Error at 'super': Cannot use 'super' in a class with no superclass."]
        );

        assert_eq!(
            messages("class A < B { static m() { super.m(); } }"),
            vec!["[line 1] Error at 'super': Cannot use 'super' in a static method."]
        );
    }

    #[test]
    fn test_self_inheritance() {
        assert_eq!(
            messages("class A < A {}"),
            vec!["[line 1] Error at 'A': A class cannot inherit from itself."]
        );
    }

    #[test]
    fn test_static_init_is_rejected() {
        assert_eq!(
            messages("class A { static init() {} }"),
            vec!["[line 1] Error at 'init': Cannot have static method with name 'init'."]
        );
    }

    #[test]
    fn test_every_error_is_collected() {
        let errors = messages("return 1;\nprint this;\n{ var b = b; }");
        assert_eq!(errors.len(), 3);
        assert!(errors[2].starts_with("[line 3]"));
    }
}
