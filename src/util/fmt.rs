/// Indented tree dumps of the AST, used by `--emit ast` and by the tests.
pub mod tree;
