use std::fmt::Display;

use crate::{
    codegen::{self, Target},
    lexer, parser, semantic,
    token::Spanned,
    util::fmt::tree,
};

pub fn format_errors<E: Display>(errors: &[Spanned<E>]) -> Vec<String> {
    errors.iter().map(|e| format!("{e:#}")).collect()
}

/// Each variant contains the input.
pub enum Test {
    Parser(&'static str),
    Semantic(&'static str),
    Codegen(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

/// Runs the source through the pipeline up to the stage under test,
/// returning the produced text (tree dump or assembly) and the formatted
/// diagnostics.
#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let (Test::Parser(input) | Test::Semantic(input) | Test::Codegen(input)) = test;

    let tokens = match lexer::tokenize(input) {
        Ok(tokens) => tokens,
        Err(error) => return (String::new(), format_errors(&[error])),
    };
    let program = match parser::parse(input, &tokens) {
        Ok(program) => program,
        Err(error) => return (String::new(), format_errors(&[error])),
    };
    if let Test::Parser(_) = test {
        return (tree::print_program_string(&program), vec![]);
    }

    let (analyzed, errors) = semantic::analyze_all(program);
    let errors = format_errors(&errors);
    match test {
        Test::Semantic(_) => (tree::print_analyzed_string(&analyzed), errors),
        _ if !errors.is_empty() => (String::new(), errors),
        _ => match codegen::generate(&analyzed, Target::Rv32im) {
            Ok(asm) => (asm, vec![]),
            Err(error) => (String::new(), format_errors(&[error])),
        },
    }
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_tree: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors)
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let program = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind), $source);
                let (formatted_actual_tree, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_tree, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, asm_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser), $source:expr) => {
        crate::util::test_utils::Test::Parser($source)
    };
    (@@get_test(semantic), $source:expr) => {
        crate::util::test_utils::Test::Semantic($source)
    };
    (@@get_test(codegen), $source:expr) => {
        crate::util::test_utils::Test::Codegen($source)
    };
}
pub(crate) use tree_tests;
