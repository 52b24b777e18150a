//! The core function table.
//!
//! Alphabetically sorted; calls resolve by binary search at parse time,
//! where arity is also validated. A negative arity is a variadic minimum;
//! `omittable` marks functions whose last argument defaults to the context
//! node. The optimizer consults the two context-dependence classifications
//! below when deciding whether a predicate can be evaluated once.

use crate::ast::RetType;

pub(crate) struct FnEntry {
    pub name: &'static str,
    pub arity: i8,
    pub omittable: bool,
    pub ret: RetType,
}

pub(crate) const FN_TABLE: [FnEntry; 21] = [
    FnEntry { name: "boolean", arity: 1, omittable: false, ret: RetType::Boolean },
    FnEntry { name: "ceiling", arity: 1, omittable: false, ret: RetType::Number },
    // variadic, at least two arguments
    FnEntry { name: "concat", arity: -2, omittable: false, ret: RetType::String },
    FnEntry { name: "contains", arity: 2, omittable: false, ret: RetType::Boolean },
    FnEntry { name: "count", arity: 1, omittable: false, ret: RetType::Number },
    FnEntry { name: "false", arity: 0, omittable: false, ret: RetType::Boolean },
    FnEntry { name: "floor", arity: 1, omittable: false, ret: RetType::Number },
    FnEntry { name: "lang", arity: 1, omittable: false, ret: RetType::Boolean },
    FnEntry { name: "last", arity: 0, omittable: false, ret: RetType::Number },
    FnEntry { name: "local-name", arity: 1, omittable: true, ret: RetType::String },
    FnEntry { name: "name", arity: 1, omittable: true, ret: RetType::String },
    FnEntry { name: "namespace-uri", arity: 1, omittable: true, ret: RetType::String },
    FnEntry { name: "not", arity: 1, omittable: false, ret: RetType::Boolean },
    FnEntry { name: "number", arity: 1, omittable: true, ret: RetType::Number },
    FnEntry { name: "position", arity: 0, omittable: false, ret: RetType::Number },
    FnEntry { name: "round", arity: 1, omittable: false, ret: RetType::Number },
    FnEntry { name: "starts-with", arity: 2, omittable: false, ret: RetType::Boolean },
    FnEntry { name: "string", arity: 1, omittable: true, ret: RetType::String },
    FnEntry { name: "string-length", arity: 1, omittable: true, ret: RetType::Number },
    FnEntry { name: "sum", arity: 1, omittable: false, ret: RetType::Number },
    FnEntry { name: "true", arity: 0, omittable: false, ret: RetType::Boolean },
];

pub(crate) enum FnLookupError {
    NotFound,
    /// Found by name but called with the wrong number of arguments.
    Arity { expected: i8 },
}

pub(crate) fn lookup(name: &str, arity: usize) -> Result<(usize, RetType), FnLookupError> {
    let index = FN_TABLE
        .binary_search_by(|entry| entry.name.cmp(name))
        .map_err(|_| FnLookupError::NotFound)?;
    let entry = &FN_TABLE[index];
    let matches = if entry.arity < 0 {
        arity >= entry.arity.unsigned_abs() as usize
    } else {
        arity == entry.arity as usize || (entry.omittable && arity + 1 == entry.arity as usize)
    };
    if matches {
        Ok((index, entry.ret))
    } else {
        Err(FnLookupError::Arity {
            expected: entry.arity,
        })
    }
}

/// Functions whose result reads the evaluation context directly:
/// `lang()`, `last()`, `position()`.
pub(crate) fn reads_context(index: usize) -> bool {
    matches!(FN_TABLE[index].name, "lang" | "last" | "position")
}

/// Functions that fall back to the context node when their argument is
/// omitted.
pub(crate) fn defaults_to_context(index: usize) -> bool {
    matches!(
        FN_TABLE[index].name,
        "local-name" | "name" | "namespace-uri" | "number" | "string" | "string-length"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_for_binary_search() {
        for pair in FN_TABLE.windows(2) {
            assert!(pair[0].name < pair[1].name);
        }
    }

    #[test]
    fn lookup_resolves_names_and_arities() {
        assert!(lookup("count", 1).is_ok());
        assert!(lookup("true", 0).is_ok());
        assert!(matches!(lookup("nope", 0), Err(FnLookupError::NotFound)));
        assert!(matches!(
            lookup("count", 2),
            Err(FnLookupError::Arity { expected: 1 })
        ));
    }

    #[test]
    fn omittable_arguments_allow_both_arities() {
        assert!(lookup("string", 0).is_ok());
        assert!(lookup("string", 1).is_ok());
        assert!(matches!(
            lookup("string", 2),
            Err(FnLookupError::Arity { .. })
        ));
    }

    #[test]
    fn concat_is_variadic_with_a_minimum() {
        assert!(matches!(
            lookup("concat", 1),
            Err(FnLookupError::Arity { expected: -2 })
        ));
        assert!(lookup("concat", 2).is_ok());
        assert!(lookup("concat", 7).is_ok());
    }
}
