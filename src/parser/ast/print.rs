//! A structural pretty-printer, used by tests to check that parsing and
//! re-printing a program is stable — not a formatter meant to preserve the
//! original source's exact layout.

use super::{Declaration, Expression, RequestPart, Signature, Statement};

pub fn format_program(statements: &[Statement]) -> String {
    statements.iter().map(format_statement).collect::<Vec<_>>().join("\n")
}

pub fn format_statement(statement: &Statement) -> String {
    match statement {
        Statement::Declaration(d) => format_declaration(d),
        Statement::Expression(e) => format_expression(e),
        Statement::Return(r) => match &r.value {
            Some(v) => format!("return {}", format_expression(v)),
            None => "return".to_owned(),
        },
    }
}

fn format_declaration(declaration: &Declaration) -> String {
    match declaration {
        Declaration::Dialect(d) => format!("dialect {:?}", d.path),
        Declaration::Import(d) => {
            if d.names.is_empty() {
                format!("import {:?}", d.path)
            } else {
                let names = d.names.iter().map(|n| n.name.as_str()).collect::<Vec<_>>().join(", ");
                format!("import {:?} ({names})", d.path)
            }
        }
        Declaration::Def(d) => format!("def {} = {}", d.name.name, format_expression(&d.value)),
        Declaration::Var(d) => match &d.value {
            Some(v) => format!("var {} := {}", d.name.name, format_expression(v)),
            None => format!("var {}", d.name.name),
        },
        Declaration::TypeDecl(d) => format!("type {} = {}", d.name.name, format_expression(&d.value)),
        Declaration::Method(d) => {
            let prefix = if d.is_override { "override method " } else { "method " };
            format!("{prefix}{} = {{ .. }}", format_signature(&d.signature))
        }
        Declaration::Class(d) => format!("class {} {{ .. }}", d.name.name),
    }
}

fn format_signature(signature: &Signature) -> String {
    signature
        .parts
        .iter()
        .map(|part| {
            if part.params.is_empty() {
                part.name.clone()
            } else {
                let params = part.params.iter().map(|p| p.name.name.as_str()).collect::<Vec<_>>().join(", ");
                format!("{}({params})", part.name)
            }
        })
        .collect::<Vec<_>>()
        .join("")
}

fn format_parts(parts: &[RequestPart]) -> String {
    parts
        .iter()
        .map(|part| {
            if part.has_params {
                let args = part.args.iter().map(format_expression).collect::<Vec<_>>().join(", ");
                format!("{}({args})", part.name)
            } else {
                part.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("")
}

pub fn format_expression(expression: &Expression) -> String {
    match expression {
        Expression::NumberLiteral { value, .. } => value.to_string(),
        Expression::StringLiteral { value, .. } => format!("{value:?}"),
        Expression::BooleanLiteral { value, .. } => value.to_string(),
        Expression::DoneLiteral(_) => "done".to_owned(),
        Expression::SelfExpr(_) => "self".to_owned(),
        Expression::SuperExpr(_) => "super".to_owned(),
        Expression::OuterExpr(_) => "outer".to_owned(),
        Expression::UnqualifiedRequest(r) => format_parts(&r.parts),
        Expression::QualifiedRequest(r) => {
            format!("{}.{}", format_expression(&r.receiver), format_parts(&r.parts))
        }
        Expression::ObjectConstructor(o) => {
            let inherits = o
                .inherits
                .as_ref()
                .map(|i| format!("inherits {} ", format_expression(&i.parent)))
                .unwrap_or_default();
            format!("object {}{{ .. }}", inherits)
        }
        Expression::Block(b) => {
            let params = b.params.iter().map(|p| p.name.name.as_str()).collect::<Vec<_>>().join(", ");
            format!("[{params} | .. ]")
        }
        Expression::TypeLiteral(t) => match &t.name {
            Some(name) => format!("type {name}"),
            None => "type <anonymous>".to_owned(),
        },
        Expression::Assignment(a) => {
            format!("{} := {}", format_expression(&a.target), format_expression(&a.value))
        }
    }
}
