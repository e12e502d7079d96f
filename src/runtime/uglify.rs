//! Name uglification: turning a pretty, multi-part method name into the
//! canonical string key used for method-table lookup, and back.
//!
//! `while()do()` uglifies to `while_do`; a bare operator keeps its value;
//! `self`, `super`, `outer`, `true`, `false`, `done` uglify to themselves;
//! an assignment method `name :=` keeps its embedded space.

/// One part of a signature, abstracted just enough to drive uglification —
/// shared between the parser's `Signature`/`RequestPart` nodes and runtime
/// `Method` records so both sides agree on the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartName {
    pub name: String,
    /// Whether this part carried a parenthesized parameter list in source,
    /// even an empty one — distinguishes a bare getter name (`self`, `foo`)
    /// from a zero-argument part of a multi-part signature (`part()`).
    pub has_params: bool,
    pub is_operator: bool,
    /// `prefix-` style unary operators uglify distinctly from the binary
    /// operator of the same symbol (spec.md §9, open question (b)).
    pub is_prefix: bool,
    pub is_assignment: bool,
}

impl PartName {
    pub fn plain(name: impl Into<String>, has_params: bool) -> Self {
        Self {
            name: name.into(),
            has_params,
            is_operator: false,
            is_prefix: false,
            is_assignment: false,
        }
    }

    pub fn operator(name: impl Into<String>, is_prefix: bool) -> Self {
        Self {
            name: name.into(),
            has_params: true,
            is_operator: true,
            is_prefix,
            is_assignment: false,
        }
    }

    pub fn assignment(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_params: true,
            is_operator: false,
            is_prefix: false,
            is_assignment: true,
        }
    }
}

pub fn pretty_name(parts: &[PartName]) -> String {
    parts
        .iter()
        .map(|part| {
            if part.is_assignment {
                format!("{} :=", part.name)
            } else if part.is_operator {
                if part.is_prefix {
                    format!("prefix{}", part.name)
                } else {
                    part.name.clone()
                }
            } else if part.has_params {
                format!("{}()", part.name)
            } else {
                part.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("")
}

pub fn uglify(parts: &[PartName]) -> String {
    if let [only] = parts {
        if only.is_assignment {
            return format!("{} :=", only.name);
        }
        if only.is_operator {
            return if only.is_prefix {
                format!("prefix{}", only.name)
            } else {
                only.name.clone()
            };
        }
        if !only.has_params {
            return only.name.clone();
        }
    }

    parts
        .iter()
        .map(|part| part.name.as_str())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_part_uglifies_with_underscore() {
        let parts = vec![PartName::plain("while", true), PartName::plain("do", true)];
        assert_eq!(uglify(&parts), "while_do");
        assert_eq!(pretty_name(&parts), "while()do()");
    }

    #[test]
    fn bare_name_round_trips() {
        let parts = vec![PartName::plain("self", false)];
        assert_eq!(uglify(&parts), "self");
        assert_eq!(pretty_name(&parts), "self");
    }

    #[test]
    fn operator_keeps_its_value() {
        let parts = vec![PartName::operator("+", false)];
        assert_eq!(uglify(&parts), "+");
    }

    #[test]
    fn prefix_operator_is_distinct_from_binary() {
        let binary = vec![PartName::operator("-", false)];
        let prefix = vec![PartName::operator("-", true)];
        assert_ne!(uglify(&binary), uglify(&prefix));
        assert_eq!(uglify(&prefix), "prefix-");
    }

    #[test]
    fn assignment_keeps_the_space() {
        let parts = vec![PartName::assignment("x")];
        assert_eq!(uglify(&parts), "x :=");
    }
}
